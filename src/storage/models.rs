//! Persisted record types and read-side views.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::classify::PageType;
use crate::validate::{EdgeRecord, LinkStatus};

/// Run lifecycle state: pending -> running -> {completed, failed}.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Pending => "pending",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "running" => RunState::Running,
            "completed" => RunState::Completed,
            "failed" => RunState::Failed,
            _ => RunState::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed)
    }
}

/// Run metadata plus aggregate counters.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub run_id: String,
    pub application_id: Option<String>,
    pub seed_url: Option<String>,
    pub status: RunState,
    pub max_crawl_depth: u32,
    pub created_at_ms: i64,
    pub started_at_ms: Option<i64>,
    pub completed_at_ms: Option<i64>,
    pub error_message: Option<String>,
    pub pages_analyzed: i64,
    pub links_found: i64,
    pub broken_links_count: i64,
    pub blank_pages_count: i64,
    pub content_pages_count: i64,
    pub overall_score: f64,
}

/// The per-fetched-URL summary produced by the classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub page_url: String,
    pub title: Option<String>,
    pub word_count: i64,
    pub page_type: PageType,
    pub has_header: bool,
    pub has_footer: bool,
    pub has_navigation: bool,
    pub structure_digest: String,
    pub depth: u32,
    /// Ordered ancestor sequence from the seed to this URL, inclusive.
    pub path: Vec<String>,
}

/// The three denormalized views of the discovery forest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParentChildMaps {
    /// child URL -> parent URL; the seed has no entry.
    pub parent_map: BTreeMap<String, String>,
    /// parent URL -> children; derived from `parent_map`.
    pub children_map: BTreeMap<String, Vec<String>>,
    /// URL -> ordered sequence [seed, ..., URL].
    pub path_map: BTreeMap<String, Vec<String>>,
}

/// Everything `get_run` returns.
#[derive(Debug)]
pub struct RunBundle {
    pub run: RunRecord,
    pub pages: Vec<PageRecord>,
    pub edges: Vec<EdgeRecord>,
    pub maps: ParentChildMaps,
}

/// Highlight category for a link found in a stored body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightKind {
    Broken,
    Working,
    Other,
}

impl HighlightKind {
    pub fn from_status(status: LinkStatus) -> Self {
        match status {
            LinkStatus::Broken => HighlightKind::Broken,
            LinkStatus::Valid => HighlightKind::Working,
            _ => HighlightKind::Other,
        }
    }
}

/// One link occurrence inside a stored body; offsets are bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightedLink {
    pub url: String,
    pub start: usize,
    pub end: usize,
    pub kind: HighlightKind,
    pub status_code: Option<u16>,
    pub status: LinkStatus,
}

/// Result of the hierarchical body read.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// The URL the caller asked for.
    pub page_url: String,
    pub source_code: String,
    pub parent_url: Option<String>,
    /// The page whose body was actually returned.
    pub actual_source_page: String,
    pub is_source_from_parent: bool,
    /// Upward walk from the requested URL to the source page, inclusive.
    pub traversal_path: Vec<String>,
    pub hierarchy_depth: u32,
    pub highlighted_links: Vec<HighlightedLink>,
    pub created_at_ms: i64,
}

/// Edge record enriched with parent context for the broken-link detail
/// read.
#[derive(Debug, Clone)]
pub struct BrokenLinkDetails {
    pub edge: EdgeRecord,
    pub parent_title: Option<String>,
    pub navigation_path: Vec<String>,
}

/// Summary row for run history queries.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    pub seed_url: Option<String>,
    pub status: RunState,
    pub started_at_ms: Option<i64>,
    pub completed_at_ms: Option<i64>,
    pub pages_analyzed: i64,
    pub links_found: i64,
    pub broken_links_count: i64,
    pub overall_score: f64,
}

/// One page as handed to `persist_run`: its record plus the in-memory body
/// and whether the fetch produced any HTTP response.
#[derive(Debug, Clone)]
pub struct PersistPage {
    pub record: PageRecord,
    pub body: Option<String>,
    pub fetched: bool,
}

/// Aggregate counters reported on the run row. Computed from the records
/// themselves so the stored totals always match recomputation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunCounters {
    pub pages_analyzed: i64,
    pub links_found: i64,
    pub broken_links: i64,
    pub blank_pages: i64,
    pub content_pages: i64,
    pub overall_score: f64,
}

impl RunCounters {
    /// Recomputes the aggregate counters from per-record data. The overall
    /// score deducts ten points per broken link or blank page.
    pub fn from_records(pages: &[PageRecord], edges: &[EdgeRecord]) -> Self {
        let broken = edges
            .iter()
            .filter(|e| e.status == LinkStatus::Broken)
            .count() as i64;
        let blank = pages
            .iter()
            .filter(|p| p.page_type == PageType::Blank)
            .count() as i64;
        let content = pages
            .iter()
            .filter(|p| p.page_type == PageType::Content)
            .count() as i64;
        let score = (100 - 10 * (broken + blank)).clamp(0, 100) as f64;

        RunCounters {
            pages_analyzed: pages.len() as i64,
            links_found: edges.len() as i64,
            broken_links: broken,
            blank_pages: blank,
            content_pages: content,
            overall_score: score,
        }
    }
}

/// Input to `persist_run`.
#[derive(Debug)]
pub struct RunArtifacts {
    pub seed_url: String,
    pub max_crawl_depth: u32,
    pub pages: Vec<PersistPage>,
    pub edges: Vec<EdgeRecord>,
    pub parent_map: BTreeMap<String, String>,
    pub path_map: BTreeMap<String, Vec<String>>,
}

impl RunArtifacts {
    /// Children view derived from the parent map.
    pub fn children_map(&self) -> BTreeMap<String, Vec<String>> {
        let mut children: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (child, parent) in &self.parent_map {
            children.entry(parent.clone()).or_default().push(child.clone());
        }
        for kids in children.values_mut() {
            kids.sort();
        }
        children
    }
}
