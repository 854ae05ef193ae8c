//! Read-side store operations: run bundles, relationship maps, the
//! hierarchical source read, broken-link details, run history, and the
//! cascading delete.

use std::collections::BTreeMap;

use sqlx::{Row, SqlitePool};

use crate::classify::PageType;
use crate::error_handling::StoreError;
use crate::extract::LinkType;
use crate::storage::models::{
    BrokenLinkDetails, HighlightKind, HighlightedLink, PageRecord, ParentChildMaps, RunBundle,
    RunRecord, RunState, RunSummary, SourceDocument,
};
use crate::validate::{EdgeRecord, LinkStatus};

/// Loads run metadata by id.
pub async fn get_run_record(pool: &SqlitePool, run_id: &str) -> Result<RunRecord, StoreError> {
    let row = sqlx::query(
        "SELECT run_id, application_id, seed_url, status, max_crawl_depth, created_at_ms,
                started_at_ms, completed_at_ms, error_message, pages_analyzed, links_found,
                broken_links_count, blank_pages_count, content_pages_count, overall_score
         FROM runs WHERE run_id = ?",
    )
    .bind(run_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| StoreError::RunNotFound(run_id.to_string()))?;

    Ok(RunRecord {
        run_id: row.get("run_id"),
        application_id: row.get("application_id"),
        seed_url: row.get("seed_url"),
        status: RunState::parse(row.get::<String, _>("status").as_str()),
        max_crawl_depth: row.get::<i64, _>("max_crawl_depth") as u32,
        created_at_ms: row.get("created_at_ms"),
        started_at_ms: row.get("started_at_ms"),
        completed_at_ms: row.get("completed_at_ms"),
        error_message: row.get("error_message"),
        pages_analyzed: row.get("pages_analyzed"),
        links_found: row.get("links_found"),
        broken_links_count: row.get("broken_links_count"),
        blank_pages_count: row.get("blank_pages_count"),
        content_pages_count: row.get("content_pages_count"),
        overall_score: row.get("overall_score"),
    })
}

/// Returns the full bundle for a run: metadata, page records, edge
/// records, and the three relationship maps.
pub async fn get_run(pool: &SqlitePool, run_id: &str) -> Result<RunBundle, StoreError> {
    let run = get_run_record(pool, run_id).await?;
    let pages = get_page_records(pool, run_id).await?;
    let edges = get_edge_records(pool, run_id).await?;
    let maps = get_parent_child(pool, run_id).await?;

    Ok(RunBundle {
        run,
        pages,
        edges,
        maps,
    })
}

/// Loads all page records for a run, ordered by URL.
pub async fn get_page_records(
    pool: &SqlitePool,
    run_id: &str,
) -> Result<Vec<PageRecord>, StoreError> {
    let rows = sqlx::query(
        "SELECT page_url, title, word_count, page_type, has_header, has_footer,
                has_navigation, structure_digest, depth, path
         FROM page_records WHERE run_id = ? ORDER BY page_url",
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let path: Vec<String> = serde_json::from_str(row.get::<String, _>("path").as_str())
                .map_err(|e| StoreError::CorruptRow(format!("page path: {e}")))?;
            Ok(PageRecord {
                page_url: row.get("page_url"),
                title: row.get("title"),
                word_count: row.get("word_count"),
                page_type: PageType::parse(row.get::<String, _>("page_type").as_str()),
                has_header: row.get("has_header"),
                has_footer: row.get("has_footer"),
                has_navigation: row.get("has_navigation"),
                structure_digest: row.get("structure_digest"),
                depth: row.get::<i64, _>("depth") as u32,
                path,
            })
        })
        .collect()
}

/// Loads all edge records for a run in discovery order.
pub async fn get_edge_records(
    pool: &SqlitePool,
    run_id: &str,
) -> Result<Vec<EdgeRecord>, StoreError> {
    let rows = sqlx::query(
        "SELECT url, parent_url, status_code, status, link_type, response_time,
                error_message, title, position
         FROM link_validations WHERE run_id = ? ORDER BY position",
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| EdgeRecord {
            url: row.get("url"),
            parent_url: row.get("parent_url"),
            link_type: LinkType::parse(row.get::<String, _>("link_type").as_str()),
            status: LinkStatus::parse(row.get::<String, _>("status").as_str()),
            status_code: row.get::<Option<i64>, _>("status_code").map(|c| c as u16),
            response_time: row.get("response_time"),
            error_message: row.get("error_message"),
            title: row.get("title"),
            position: row.get::<i64, _>("position") as usize,
        })
        .collect())
}

/// Returns the three relationship maps for a run. The children map is
/// reconstructed from the parent rows, so the two views cannot disagree.
pub async fn get_parent_child(
    pool: &SqlitePool,
    run_id: &str,
) -> Result<ParentChildMaps, StoreError> {
    let parent_rows = sqlx::query(
        "SELECT child_url, parent_url FROM page_parents WHERE run_id = ? ORDER BY child_url",
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    let mut parent_map = BTreeMap::new();
    let mut children_map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for row in parent_rows {
        let child: String = row.get("child_url");
        let parent: String = row.get("parent_url");
        children_map
            .entry(parent.clone())
            .or_default()
            .push(child.clone());
        parent_map.insert(child, parent);
    }

    let path_rows = sqlx::query("SELECT url, path FROM page_paths WHERE run_id = ? ORDER BY url")
        .bind(run_id)
        .fetch_all(pool)
        .await?;

    let mut path_map = BTreeMap::new();
    for row in path_rows {
        let url: String = row.get("url");
        let path: Vec<String> = serde_json::from_str(row.get::<String, _>("path").as_str())
            .map_err(|e| StoreError::CorruptRow(format!("path_map entry: {e}")))?;
        path_map.insert(url, path);
    }

    Ok(ParentChildMaps {
        parent_map,
        children_map,
        path_map,
    })
}

async fn load_body(
    pool: &SqlitePool,
    run_id: &str,
    page_url: &str,
) -> Result<Option<(String, Option<String>, i64)>, StoreError> {
    let row = sqlx::query(
        "SELECT source_code, parent_url, created_at_ms FROM page_sources
         WHERE run_id = ? AND page_url = ?",
    )
    .bind(run_id)
    .bind(page_url)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| {
        (
            row.get("source_code"),
            row.get("parent_url"),
            row.get("created_at_ms"),
        )
    }))
}

/// Hierarchical body read.
///
/// Returns the body stored at `page_url`, or walks the parent chain
/// upwards and returns the nearest ancestor's body. The walk is capped at
/// `max_crawl_depth + 1` steps; exceeding the cap, or reaching the root
/// without a hit, fails with `SourceNotFound`.
pub async fn get_source(
    pool: &SqlitePool,
    run_id: &str,
    page_url: &str,
) -> Result<SourceDocument, StoreError> {
    let run = get_run_record(pool, run_id).await?;
    let ceiling = run.max_crawl_depth + 1;

    if let Some((body, parent_url, created_at_ms)) = load_body(pool, run_id, page_url).await? {
        let highlighted = highlighted_links_for(pool, run_id, page_url, &body).await?;
        return Ok(SourceDocument {
            page_url: page_url.to_string(),
            source_code: body,
            parent_url,
            actual_source_page: page_url.to_string(),
            is_source_from_parent: false,
            traversal_path: vec![page_url.to_string()],
            hierarchy_depth: 0,
            highlighted_links: highlighted,
            created_at_ms,
        });
    }

    let maps = get_parent_child(pool, run_id).await?;
    let mut cursor = page_url.to_string();
    let mut traversal_path = vec![cursor.clone()];
    let mut depth: u32 = 0;

    while let Some(parent) = maps.parent_map.get(&cursor) {
        cursor = parent.clone();
        traversal_path.push(cursor.clone());
        depth += 1;
        if depth > ceiling {
            return Err(StoreError::SourceNotFound {
                run_id: run_id.to_string(),
                url: page_url.to_string(),
            });
        }

        if let Some((body, parent_url, created_at_ms)) = load_body(pool, run_id, &cursor).await? {
            let highlighted = highlighted_links_for(pool, run_id, &cursor, &body).await?;
            return Ok(SourceDocument {
                page_url: page_url.to_string(),
                source_code: body,
                parent_url,
                actual_source_page: cursor.clone(),
                is_source_from_parent: true,
                traversal_path,
                hierarchy_depth: depth,
                highlighted_links: highlighted,
                created_at_ms,
            });
        }
    }

    Err(StoreError::SourceNotFound {
        run_id: run_id.to_string(),
        url: page_url.to_string(),
    })
}

/// Computes highlights for all edges observed on `source_page`: the first
/// byte offset of each edge URL in the body. Overlapping occurrences are
/// resolved left-biased; edges not textually present are omitted.
async fn highlighted_links_for(
    pool: &SqlitePool,
    run_id: &str,
    source_page: &str,
    body: &str,
) -> Result<Vec<HighlightedLink>, StoreError> {
    let rows = sqlx::query(
        "SELECT url, status, status_code FROM link_validations
         WHERE run_id = ? AND parent_url = ? ORDER BY position",
    )
    .bind(run_id)
    .bind(source_page)
    .fetch_all(pool)
    .await?;

    let mut hits: Vec<HighlightedLink> = Vec::new();
    for row in rows {
        let url: String = row.get("url");
        let status = LinkStatus::parse(row.get::<String, _>("status").as_str());
        let status_code = row.get::<Option<i64>, _>("status_code").map(|c| c as u16);
        if let Some(start) = body.find(url.as_str()) {
            hits.push(HighlightedLink {
                end: start + url.len(),
                start,
                kind: HighlightKind::from_status(status),
                status_code,
                status,
                url,
            });
        }
    }

    hits.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));
    let mut out: Vec<HighlightedLink> = Vec::new();
    for hit in hits {
        match out.last() {
            Some(last) if hit.start < last.end => continue,
            _ => out.push(hit),
        }
    }

    Ok(out)
}

/// Edge record plus parent title and navigation path for one URL.
pub async fn get_broken_link_details(
    pool: &SqlitePool,
    run_id: &str,
    url: &str,
) -> Result<Option<BrokenLinkDetails>, StoreError> {
    let row = sqlx::query(
        "SELECT url, parent_url, status_code, status, link_type, response_time,
                error_message, title, position
         FROM link_validations WHERE run_id = ? AND url = ?",
    )
    .bind(run_id)
    .bind(url)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else { return Ok(None) };

    let edge = EdgeRecord {
        url: row.get("url"),
        parent_url: row.get("parent_url"),
        link_type: LinkType::parse(row.get::<String, _>("link_type").as_str()),
        status: LinkStatus::parse(row.get::<String, _>("status").as_str()),
        status_code: row.get::<Option<i64>, _>("status_code").map(|c| c as u16),
        response_time: row.get("response_time"),
        error_message: row.get("error_message"),
        title: row.get("title"),
        position: row.get::<i64, _>("position") as usize,
    };

    let parent_title: Option<String> = sqlx::query_scalar(
        "SELECT title FROM page_records WHERE run_id = ? AND page_url = ?",
    )
    .bind(run_id)
    .bind(&edge.parent_url)
    .fetch_optional(pool)
    .await?
    .flatten();

    let navigation_path: Vec<String> = match sqlx::query_scalar::<_, String>(
        "SELECT path FROM page_paths WHERE run_id = ? AND url = ?",
    )
    .bind(run_id)
    .bind(url)
    .fetch_optional(pool)
    .await?
    {
        Some(json) => serde_json::from_str(&json)
            .map_err(|e| StoreError::CorruptRow(format!("navigation path: {e}")))?,
        None => Vec::new(),
    };

    Ok(Some(BrokenLinkDetails {
        edge,
        parent_title,
        navigation_path,
    }))
}

/// Completed and failed runs, most recent first.
pub async fn query_run_history(
    pool: &SqlitePool,
    limit: Option<usize>,
) -> Result<Vec<RunSummary>, StoreError> {
    let base = "SELECT run_id, seed_url, status, started_at_ms, completed_at_ms,
                       pages_analyzed, links_found, broken_links_count, overall_score
                FROM runs WHERE completed_at_ms IS NOT NULL
                ORDER BY started_at_ms DESC";
    let query = match limit {
        Some(limit) => format!("{base} LIMIT {limit}"),
        None => base.to_string(),
    };

    let rows = sqlx::query(&query).fetch_all(pool).await?;

    Ok(rows
        .into_iter()
        .map(|row| RunSummary {
            run_id: row.get("run_id"),
            seed_url: row.get("seed_url"),
            status: RunState::parse(row.get::<String, _>("status").as_str()),
            started_at_ms: row.get("started_at_ms"),
            completed_at_ms: row.get("completed_at_ms"),
            pages_analyzed: row.get("pages_analyzed"),
            links_found: row.get("links_found"),
            broken_links_count: row.get("broken_links_count"),
            overall_score: row.get("overall_score"),
        })
        .collect())
}

/// Deletes a run and everything keyed by it. Deleting an absent run is a
/// no-op.
pub async fn delete_run(pool: &SqlitePool, run_id: &str) -> Result<(), StoreError> {
    let mut tx = pool.begin().await?;
    for table in [
        "page_sources",
        "page_paths",
        "page_parents",
        "link_validations",
        "page_records",
        "runs",
    ] {
        sqlx::query(&format!("DELETE FROM {table} WHERE run_id = ?"))
            .bind(run_id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::insert::{create_run, mark_run_completed, persist_run};
    use crate::storage::models::RunCounters;
    use crate::storage::test_helpers::{
        artifacts_for_deep_chain, artifacts_for_trivial_site, create_test_pool, test_edge,
    };

    #[tokio::test]
    async fn test_get_run_round_trips_persisted_artifacts() {
        let pool = create_test_pool().await;
        let artifacts = artifacts_for_trivial_site();
        create_run(&pool, "run-1", None, &artifacts.seed_url, 1)
            .await
            .unwrap();
        persist_run(&pool, "run-1", &artifacts).await.unwrap();

        let pages: Vec<_> = artifacts.pages.iter().map(|p| p.record.clone()).collect();
        let counters = RunCounters::from_records(&pages, &artifacts.edges);
        mark_run_completed(&pool, "run-1", &counters).await.unwrap();

        let bundle = get_run(&pool, "run-1").await.unwrap();
        assert_eq!(bundle.run.status, RunState::Completed);
        assert_eq!(bundle.pages.len(), 3);
        assert_eq!(bundle.edges.len(), 2);
        assert_eq!(bundle.maps.parent_map.len(), 2);
        assert_eq!(bundle.maps.path_map.len(), 3);

        // Write-then-read: records survive modulo ordering.
        let mut expected: Vec<_> = pages.clone();
        expected.sort_by(|a, b| a.page_url.cmp(&b.page_url));
        assert_eq!(bundle.pages, expected);

        // Counters on the run equal recomputation from the tables.
        let recomputed = RunCounters::from_records(&bundle.pages, &bundle.edges);
        assert_eq!(bundle.run.pages_analyzed, recomputed.pages_analyzed);
        assert_eq!(bundle.run.links_found, recomputed.links_found);
        assert_eq!(bundle.run.broken_links_count, recomputed.broken_links);
        assert_eq!(bundle.run.overall_score, recomputed.overall_score);
    }

    #[tokio::test]
    async fn test_get_run_missing_is_not_found() {
        let pool = create_test_pool().await;
        let err = get_run(&pool, "nope").await.unwrap_err();
        assert!(matches!(err, StoreError::RunNotFound(_)));
    }

    #[tokio::test]
    async fn test_children_map_matches_parent_map() {
        let pool = create_test_pool().await;
        let artifacts = artifacts_for_trivial_site();
        persist_run(&pool, "run-1", &artifacts).await.unwrap();

        let maps = get_parent_child(&pool, "run-1").await.unwrap();
        assert_eq!(
            maps.children_map.get("https://a/"),
            Some(&vec!["https://a/x".to_string(), "https://a/y".to_string()])
        );
        for (parent, children) in &maps.children_map {
            for child in children {
                assert_eq!(maps.parent_map.get(child), Some(parent));
            }
        }
    }

    #[tokio::test]
    async fn test_get_source_direct_hit() {
        let pool = create_test_pool().await;
        let artifacts = artifacts_for_trivial_site();
        persist_run(&pool, "run-1", &artifacts).await.unwrap();

        let doc = get_source(&pool, "run-1", "https://a/").await.unwrap();
        assert_eq!(doc.actual_source_page, "https://a/");
        assert!(!doc.is_source_from_parent);
        assert_eq!(doc.traversal_path, vec!["https://a/"]);
        assert_eq!(doc.hierarchy_depth, 0);
    }

    #[tokio::test]
    async fn test_get_source_resolves_leaf_from_parent() {
        let pool = create_test_pool().await;
        let artifacts = artifacts_for_trivial_site();
        persist_run(&pool, "run-1", &artifacts).await.unwrap();

        // Leaves carry no body row; the read walks up to the seed.
        let doc = get_source(&pool, "run-1", "https://a/x").await.unwrap();
        assert_eq!(doc.page_url, "https://a/x");
        assert_eq!(doc.actual_source_page, "https://a/");
        assert!(doc.is_source_from_parent);
        assert_eq!(doc.traversal_path, vec!["https://a/x", "https://a/"]);
        assert_eq!(doc.hierarchy_depth, 1);
        assert!(doc.source_code.contains("page https://a/"));
    }

    #[tokio::test]
    async fn test_get_source_deep_leaf_walks_to_nearest_ancestor() {
        let pool = create_test_pool().await;
        let artifacts = artifacts_for_deep_chain();
        persist_run(&pool, "run-1", &artifacts).await.unwrap();

        let doc = get_source(&pool, "run-1", "https://a/b/c/d").await.unwrap();
        assert_eq!(doc.actual_source_page, "https://a/b");
        assert_eq!(
            doc.traversal_path,
            vec!["https://a/b/c/d", "https://a/b/c", "https://a/b"]
        );
        assert_eq!(doc.hierarchy_depth, 2);
    }

    #[tokio::test]
    async fn test_get_source_unknown_url_fails() {
        let pool = create_test_pool().await;
        let artifacts = artifacts_for_trivial_site();
        persist_run(&pool, "run-1", &artifacts).await.unwrap();

        let err = get_source(&pool, "run-1", "https://a/unknown")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SourceNotFound { .. }));
    }

    #[tokio::test]
    async fn test_get_source_respects_traversal_ceiling() {
        let pool = create_test_pool().await;
        let mut artifacts = artifacts_for_deep_chain();
        // Remove every body except the seed's, and shrink the recorded
        // depth so the ceiling (max_depth + 1 = 2) is crossed before the
        // walk from d reaches the seed.
        artifacts.max_crawl_depth = 1;
        for page in &mut artifacts.pages[1..] {
            page.body = None;
            page.fetched = false;
        }
        persist_run(&pool, "run-1", &artifacts).await.unwrap();

        let err = get_source(&pool, "run-1", "https://a/b/c/d")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SourceNotFound { .. }));
    }

    #[tokio::test]
    async fn test_highlighted_links_byte_offsets() {
        let pool = create_test_pool().await;
        let mut artifacts = artifacts_for_trivial_site();
        let body = r#"<html><body><a href="https://a/x">x</a><a href="https://a/y">y</a></body></html>"#;
        artifacts.pages[0].body = Some(body.to_string());
        artifacts.edges[1] = test_edge("https://a/y", "https://a/", LinkStatus::Broken, 1);
        persist_run(&pool, "run-1", &artifacts).await.unwrap();

        let doc = get_source(&pool, "run-1", "https://a/").await.unwrap();
        assert_eq!(doc.highlighted_links.len(), 2);

        let first = &doc.highlighted_links[0];
        assert_eq!(first.url, "https://a/x");
        assert_eq!(first.start, body.find("https://a/x").unwrap());
        assert_eq!(first.end, first.start + "https://a/x".len());
        assert_eq!(first.kind, HighlightKind::Working);

        let second = &doc.highlighted_links[1];
        assert_eq!(second.kind, HighlightKind::Broken);
        assert_eq!(second.status_code, Some(404));
    }

    #[tokio::test]
    async fn test_highlighted_links_left_biased_non_overlapping() {
        let pool = create_test_pool().await;
        let mut artifacts = artifacts_for_trivial_site();
        // a/x is a byte-prefix of a/xy: their first occurrences overlap.
        let body = r#"<a href="https://a/xy">both</a>"#;
        artifacts.pages[0].body = Some(body.to_string());
        artifacts.edges = vec![
            test_edge("https://a/x", "https://a/", LinkStatus::Valid, 0),
            test_edge("https://a/xy", "https://a/", LinkStatus::Valid, 1),
        ];
        // Keep the maps consistent with the new edge set.
        artifacts.parent_map.remove("https://a/y");
        artifacts.path_map.remove("https://a/y");
        artifacts
            .parent_map
            .insert("https://a/xy".to_string(), "https://a/".to_string());
        artifacts.path_map.insert(
            "https://a/xy".to_string(),
            vec!["https://a/".to_string(), "https://a/xy".to_string()],
        );
        artifacts.pages.retain(|p| p.record.page_url != "https://a/y");
        persist_run(&pool, "run-1", &artifacts).await.unwrap();

        let doc = get_source(&pool, "run-1", "https://a/").await.unwrap();
        // Both URLs first match at the same byte; the shorter span wins and
        // the overlapping longer one is dropped.
        assert_eq!(doc.highlighted_links.len(), 1);
        assert_eq!(doc.highlighted_links[0].url, "https://a/x");
    }

    #[tokio::test]
    async fn test_edges_not_in_body_are_omitted() {
        let pool = create_test_pool().await;
        let mut artifacts = artifacts_for_trivial_site();
        artifacts.pages[0].body = Some("<html><body>no links here</body></html>".to_string());
        persist_run(&pool, "run-1", &artifacts).await.unwrap();

        let doc = get_source(&pool, "run-1", "https://a/").await.unwrap();
        assert!(doc.highlighted_links.is_empty());
    }

    #[tokio::test]
    async fn test_get_broken_link_details() {
        let pool = create_test_pool().await;
        let mut artifacts = artifacts_for_trivial_site();
        artifacts.edges[1] = test_edge("https://a/y", "https://a/", LinkStatus::Broken, 1);
        persist_run(&pool, "run-1", &artifacts).await.unwrap();

        let details = get_broken_link_details(&pool, "run-1", "https://a/y")
            .await
            .unwrap()
            .expect("details");
        assert_eq!(details.edge.status, LinkStatus::Broken);
        assert_eq!(details.edge.parent_url, "https://a/");
        assert_eq!(details.parent_title.as_deref(), Some("Title of https://a/"));
        assert_eq!(
            details.navigation_path,
            vec!["https://a/".to_string(), "https://a/y".to_string()]
        );
    }

    #[tokio::test]
    async fn test_get_broken_link_details_missing_is_none() {
        let pool = create_test_pool().await;
        let artifacts = artifacts_for_trivial_site();
        persist_run(&pool, "run-1", &artifacts).await.unwrap();

        let details = get_broken_link_details(&pool, "run-1", "https://a/none")
            .await
            .unwrap();
        assert!(details.is_none());
    }

    #[tokio::test]
    async fn test_delete_run_cascades_and_is_idempotent() {
        let pool = create_test_pool().await;
        let artifacts = artifacts_for_trivial_site();
        create_run(&pool, "run-1", None, &artifacts.seed_url, 1)
            .await
            .unwrap();
        persist_run(&pool, "run-1", &artifacts).await.unwrap();

        delete_run(&pool, "run-1").await.unwrap();
        for table in [
            "runs",
            "page_records",
            "link_validations",
            "page_parents",
            "page_paths",
            "page_sources",
        ] {
            let count: i64 =
                sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table} WHERE run_id = ?"))
                    .bind("run-1")
                    .fetch_one(&pool)
                    .await
                    .unwrap();
            assert_eq!(count, 0, "rows left in {table}");
        }

        // Second delete is a no-op.
        delete_run(&pool, "run-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_query_run_history_orders_recent_first() {
        let pool = create_test_pool().await;
        for (run_id, start) in [("run-old", 1_000i64), ("run-new", 2_000i64)] {
            create_run(&pool, run_id, None, "https://a/", 2).await.unwrap();
            sqlx::query(
                "UPDATE runs SET started_at_ms = ?, completed_at_ms = ?, status = 'completed'
                 WHERE run_id = ?",
            )
            .bind(start)
            .bind(start + 500)
            .bind(run_id)
            .execute(&pool)
            .await
            .unwrap();
        }

        let history = query_run_history(&pool, None).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].run_id, "run-new");
        assert_eq!(history[1].run_id, "run-old");

        let limited = query_run_history(&pool, Some(1)).await.unwrap();
        assert_eq!(limited.len(), 1);
    }
}
