//! Navigation path tracking: the parent, children, and path views of the
//! discovery forest.
//!
//! The parent map records the first discoverer of each URL and never
//! changes afterwards. The seed has no parent entry; its path is the
//! single-element sequence `[seed]`. The children map is derived from the
//! parent map, so the two can never disagree.

use std::collections::{BTreeMap, BTreeSet};

/// Builds the three denormalized relationship views during a crawl.
#[derive(Debug, Clone)]
pub struct PathTracker {
    seed: String,
    parent_map: BTreeMap<String, String>,
    path_map: BTreeMap<String, Vec<String>>,
}

impl PathTracker {
    pub fn new(seed: &str) -> Self {
        let mut path_map = BTreeMap::new();
        path_map.insert(seed.to_string(), vec![seed.to_string()]);
        PathTracker {
            seed: seed.to_string(),
            parent_map: BTreeMap::new(),
            path_map,
        }
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Records that `child` was first discovered on `parent`.
    ///
    /// Self-edges, edges back to the seed, and repeat discoveries are
    /// ignored: the first discoverer wins. Returns `true` when the
    /// relationship was recorded.
    pub fn add_relationship(&mut self, parent: &str, child: &str) -> bool {
        if child == parent || child == self.seed || self.parent_map.contains_key(child) {
            return false;
        }

        let parent_path = match self.path_map.get(parent) {
            Some(path) => path.clone(),
            // Unknown parent: the caller handed us an unfetched page.
            None => return false,
        };

        self.parent_map
            .insert(child.to_string(), parent.to_string());
        let mut path = parent_path;
        path.push(child.to_string());
        self.path_map.insert(child.to_string(), path);
        true
    }

    pub fn parent_of(&self, url: &str) -> Option<&str> {
        self.parent_map.get(url).map(String::as_str)
    }

    /// Ordered ancestor sequence `[seed, ..., url]`. URLs never discovered
    /// get the degenerate single-element path.
    pub fn path_to(&self, url: &str) -> Vec<String> {
        self.path_map
            .get(url)
            .cloned()
            .unwrap_or_else(|| vec![url.to_string()])
    }

    /// Clicks from the seed; the seed itself is depth 0.
    pub fn depth_of(&self, url: &str) -> u32 {
        (self.path_to(url).len() as u32).saturating_sub(1)
    }

    pub fn parent_map(&self) -> &BTreeMap<String, String> {
        &self.parent_map
    }

    pub fn path_map(&self) -> &BTreeMap<String, Vec<String>> {
        &self.path_map
    }

    /// Children view derived from the parent map.
    pub fn children_map(&self) -> BTreeMap<String, Vec<String>> {
        let mut children: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (child, parent) in &self.parent_map {
            children
                .entry(parent.clone())
                .or_default()
                .insert(child.clone());
        }
        children
            .into_iter()
            .map(|(parent, set)| (parent, set.into_iter().collect()))
            .collect()
    }

    pub fn has_children(&self, url: &str) -> bool {
        self.parent_map.values().any(|parent| parent == url)
    }

    /// Consumes the tracker into its three maps.
    pub fn into_maps(
        self,
    ) -> (
        BTreeMap<String, String>,
        BTreeMap<String, Vec<String>>,
        BTreeMap<String, Vec<String>>,
    ) {
        let children = self.children_map();
        (self.parent_map, children, self.path_map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tracker_has_seed_path_only() {
        let tracker = PathTracker::new("https://a/");
        assert_eq!(tracker.path_to("https://a/"), vec!["https://a/"]);
        assert!(tracker.parent_map().is_empty());
        assert_eq!(tracker.depth_of("https://a/"), 0);
    }

    #[test]
    fn test_add_relationship_builds_path() {
        let mut tracker = PathTracker::new("https://a/");
        assert!(tracker.add_relationship("https://a/", "https://a/x"));
        assert!(tracker.add_relationship("https://a/x", "https://a/x/y"));

        assert_eq!(tracker.parent_of("https://a/x/y"), Some("https://a/x"));
        assert_eq!(
            tracker.path_to("https://a/x/y"),
            vec!["https://a/", "https://a/x", "https://a/x/y"]
        );
        assert_eq!(tracker.depth_of("https://a/x/y"), 2);
    }

    #[test]
    fn test_first_discoverer_wins() {
        let mut tracker = PathTracker::new("https://a/");
        tracker.add_relationship("https://a/", "https://a/x");
        tracker.add_relationship("https://a/", "https://a/y");
        tracker.add_relationship("https://a/x", "https://a/shared");
        // Second discovery of the same URL is a no-op.
        assert!(!tracker.add_relationship("https://a/y", "https://a/shared"));
        assert_eq!(tracker.parent_of("https://a/shared"), Some("https://a/x"));
    }

    #[test]
    fn test_seed_never_gets_a_parent() {
        let mut tracker = PathTracker::new("https://a/");
        tracker.add_relationship("https://a/", "https://a/x");
        assert!(!tracker.add_relationship("https://a/x", "https://a/"));
        assert!(tracker.parent_of("https://a/").is_none());
    }

    #[test]
    fn test_self_edges_ignored() {
        let mut tracker = PathTracker::new("https://a/");
        assert!(!tracker.add_relationship("https://a/x", "https://a/x"));
    }

    #[test]
    fn test_children_map_derived_from_parent_map() {
        let mut tracker = PathTracker::new("https://a/");
        tracker.add_relationship("https://a/", "https://a/x");
        tracker.add_relationship("https://a/", "https://a/y");
        tracker.add_relationship("https://a/x", "https://a/z");

        let children = tracker.children_map();
        assert_eq!(
            children.get("https://a/"),
            Some(&vec!["https://a/x".to_string(), "https://a/y".to_string()])
        );
        assert!(tracker.has_children("https://a/x"));
        assert!(!tracker.has_children("https://a/z"));
        assert_eq!(
            children.get("https://a/x"),
            Some(&vec!["https://a/z".to_string()])
        );
        assert!(children.get("https://a/z").is_none());

        // children_map[u] = { v : parent_map[v] = u } exactly.
        for (parent, kids) in &children {
            for kid in kids {
                assert_eq!(tracker.parent_of(kid), Some(parent.as_str()));
            }
        }
    }

    #[test]
    fn test_path_invariant_holds() {
        let mut tracker = PathTracker::new("https://a/");
        tracker.add_relationship("https://a/", "https://a/b");
        tracker.add_relationship("https://a/b", "https://a/b/c");

        // path_map[u] = path_map[parent_map[u]] ++ [u]
        for (child, parent) in tracker.parent_map() {
            let mut expected = tracker.path_to(parent);
            expected.push(child.clone());
            assert_eq!(tracker.path_to(child), expected);
        }
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let mut tracker = PathTracker::new("https://a/");
        assert!(!tracker.add_relationship("https://a/never-fetched", "https://a/x"));
        assert!(tracker.parent_of("https://a/x").is_none());
    }
}
