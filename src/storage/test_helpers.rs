//! Shared test helpers for storage module tests.

#![cfg(test)]

use std::collections::BTreeMap;

use sqlx::SqlitePool;

use crate::classify::PageType;
use crate::extract::LinkType;
use crate::storage::models::{PageRecord, PersistPage, RunArtifacts};
use crate::storage::run_migrations;
use crate::validate::{EdgeRecord, LinkStatus};

/// Creates an in-memory database pool with migrations applied.
pub async fn create_test_pool() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create test database pool");
    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

pub fn test_page(url: &str, depth: u32, path: Vec<&str>) -> PersistPage {
    PersistPage {
        record: PageRecord {
            page_url: url.to_string(),
            title: Some(format!("Title of {url}")),
            word_count: 120,
            page_type: PageType::Content,
            has_header: true,
            has_footer: true,
            has_navigation: false,
            structure_digest: "deadbeef".to_string(),
            depth,
            path: path.into_iter().map(String::from).collect(),
        },
        body: Some(format!("<html><body>page {url}</body></html>")),
        fetched: true,
    }
}

pub fn test_edge(url: &str, parent: &str, status: LinkStatus, position: usize) -> EdgeRecord {
    EdgeRecord {
        url: url.to_string(),
        parent_url: parent.to_string(),
        link_type: LinkType::StaticHtml,
        status,
        status_code: match status {
            LinkStatus::Valid => Some(200),
            LinkStatus::Broken => Some(404),
            _ => None,
        },
        response_time: Some(0.05),
        error_message: None,
        title: None,
        position,
    }
}

/// Artifacts for the trivial site: seed `https://a/` linking to `/x` and
/// `/y`, both fetched and childless.
pub fn artifacts_for_trivial_site() -> RunArtifacts {
    let seed = "https://a/";
    let pages = vec![
        test_page(seed, 0, vec![seed]),
        test_page("https://a/x", 1, vec![seed, "https://a/x"]),
        test_page("https://a/y", 1, vec![seed, "https://a/y"]),
    ];
    let edges = vec![
        test_edge("https://a/x", seed, LinkStatus::Valid, 0),
        test_edge("https://a/y", seed, LinkStatus::Valid, 1),
    ];

    let mut parent_map = BTreeMap::new();
    parent_map.insert("https://a/x".to_string(), seed.to_string());
    parent_map.insert("https://a/y".to_string(), seed.to_string());

    let mut path_map = BTreeMap::new();
    path_map.insert(seed.to_string(), vec![seed.to_string()]);
    path_map.insert(
        "https://a/x".to_string(),
        vec![seed.to_string(), "https://a/x".to_string()],
    );
    path_map.insert(
        "https://a/y".to_string(),
        vec![seed.to_string(), "https://a/y".to_string()],
    );

    RunArtifacts {
        seed_url: seed.to_string(),
        max_crawl_depth: 1,
        pages,
        edges,
        parent_map,
        path_map,
    }
}

/// Artifacts for the deep chain `a/ -> a/b -> a/b/c -> a/b/c/d` where only
/// the first two pages were fetched with bodies (scenario: hierarchical
/// read on a deep leaf).
pub fn artifacts_for_deep_chain() -> RunArtifacts {
    let seed = "https://a/";
    let b = "https://a/b";
    let c = "https://a/b/c";
    let d = "https://a/b/c/d";

    let mut pages = vec![
        test_page(seed, 0, vec![seed]),
        test_page(b, 1, vec![seed, b]),
        test_page(c, 2, vec![seed, b, c]),
        test_page(d, 3, vec![seed, b, c, d]),
    ];
    // c and d were fetched but are leaves-with-children-chain: c has a
    // child (d) in the map, so the write rule stores c's body as well
    // unless the body is absent. To model the scenario where only a/ and
    // a/b have stored bodies, c is marked unfetched (its child arrived as
    // an edge only).
    pages[2].fetched = false;
    pages[2].body = None;
    pages[3].body = Some("<html>leaf</html>".to_string());

    let edges = vec![
        test_edge(b, seed, LinkStatus::Valid, 0),
        test_edge(c, b, LinkStatus::Valid, 1),
        test_edge(d, c, LinkStatus::Valid, 2),
    ];

    let mut parent_map = BTreeMap::new();
    parent_map.insert(b.to_string(), seed.to_string());
    parent_map.insert(c.to_string(), b.to_string());
    parent_map.insert(d.to_string(), c.to_string());

    let mut path_map = BTreeMap::new();
    path_map.insert(seed.to_string(), vec![seed.to_string()]);
    path_map.insert(b.to_string(), vec![seed.to_string(), b.to_string()]);
    path_map.insert(
        c.to_string(),
        vec![seed.to_string(), b.to_string(), c.to_string()],
    );
    path_map.insert(
        d.to_string(),
        vec![
            seed.to_string(),
            b.to_string(),
            c.to_string(),
            d.to_string(),
        ],
    );

    RunArtifacts {
        seed_url: seed.to_string(),
        max_crawl_depth: 4,
        pages,
        edges,
        parent_map,
        path_map,
    }
}
