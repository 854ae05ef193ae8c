//! Run lifecycle writes and the transactional artifact persist.
//!
//! `persist_run` validates the §3-style invariants before touching the
//! database, then rewrites all artifact rows for the run inside one
//! transaction. Re-issuing it with identical inputs yields an identical
//! store.

use std::collections::HashSet;

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error_handling::StoreError;
use crate::storage::models::{RunArtifacts, RunCounters};

/// Creates a run row in the `pending` state.
pub async fn create_run(
    pool: &SqlitePool,
    run_id: &str,
    application_id: Option<&str>,
    seed_url: &str,
    max_crawl_depth: u32,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO runs (run_id, application_id, seed_url, status, max_crawl_depth, created_at_ms)
         VALUES (?, ?, ?, 'pending', ?, ?)
         ON CONFLICT(run_id) DO UPDATE SET
             application_id = excluded.application_id,
             seed_url = excluded.seed_url,
             max_crawl_depth = excluded.max_crawl_depth",
    )
    .bind(run_id)
    .bind(application_id)
    .bind(seed_url)
    .bind(max_crawl_depth)
    .bind(Utc::now().timestamp_millis())
    .execute(pool)
    .await?;
    Ok(())
}

/// Transitions a run to `running` and stamps the start time.
pub async fn mark_run_running(pool: &SqlitePool, run_id: &str) -> Result<(), StoreError> {
    sqlx::query("UPDATE runs SET status = 'running', started_at_ms = ? WHERE run_id = ?")
        .bind(Utc::now().timestamp_millis())
        .bind(run_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Transitions a run to `completed` and stores its aggregate counters.
pub async fn mark_run_completed(
    pool: &SqlitePool,
    run_id: &str,
    counters: &RunCounters,
) -> Result<(), StoreError> {
    sqlx::query(
        "UPDATE runs
         SET status = 'completed', completed_at_ms = ?,
             pages_analyzed = ?, links_found = ?, broken_links_count = ?,
             blank_pages_count = ?, content_pages_count = ?, overall_score = ?
         WHERE run_id = ?",
    )
    .bind(Utc::now().timestamp_millis())
    .bind(counters.pages_analyzed)
    .bind(counters.links_found)
    .bind(counters.broken_links)
    .bind(counters.blank_pages)
    .bind(counters.content_pages)
    .bind(counters.overall_score)
    .bind(run_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Transitions a run to `failed` with a human-readable message.
pub async fn mark_run_failed(
    pool: &SqlitePool,
    run_id: &str,
    error_message: &str,
) -> Result<(), StoreError> {
    sqlx::query(
        "UPDATE runs SET status = 'failed', completed_at_ms = ?, error_message = ? WHERE run_id = ?",
    )
    .bind(Utc::now().timestamp_millis())
    .bind(error_message)
    .bind(run_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Atomically writes all artifacts for a run: page records, edge records,
/// the parent and path maps, and the deduplicated body store.
///
/// A body row is written for a page iff it was fetched and has at least
/// one child under this run; the seed's body is always written when the
/// seed was fetched. Existing artifact rows for the run are replaced, so
/// re-issuing the call with the same input is a no-op observationally.
///
/// # Errors
///
/// `StoreError::InvariantViolation` when the artifacts are inconsistent
/// (cycle or second root in the parent map, path mismatch, orphaned edge,
/// or a fetched interior page without a body); nothing is written in that
/// case.
pub async fn persist_run(
    pool: &SqlitePool,
    run_id: &str,
    artifacts: &RunArtifacts,
) -> Result<(), StoreError> {
    check_artifact_invariants(artifacts)?;

    let children_map = artifacts.children_map();
    let now_ms = Utc::now().timestamp_millis();

    let mut tx = pool.begin().await?;

    // Make sure a run row exists so reads can resolve the traversal
    // ceiling; an existing row keeps its lifecycle fields.
    sqlx::query(
        "INSERT INTO runs (run_id, seed_url, status, max_crawl_depth, created_at_ms)
         VALUES (?, ?, 'running', ?, ?)
         ON CONFLICT(run_id) DO NOTHING",
    )
    .bind(run_id)
    .bind(&artifacts.seed_url)
    .bind(artifacts.max_crawl_depth)
    .bind(now_ms)
    .execute(&mut *tx)
    .await?;

    for table in [
        "page_records",
        "link_validations",
        "page_parents",
        "page_paths",
        "page_sources",
    ] {
        sqlx::query(&format!("DELETE FROM {table} WHERE run_id = ?"))
            .bind(run_id)
            .execute(&mut *tx)
            .await?;
    }

    for page in &artifacts.pages {
        let record = &page.record;
        let path_json = serde_json::to_string(&record.path)
            .map_err(|e| StoreError::CorruptRow(e.to_string()))?;
        sqlx::query(
            "INSERT INTO page_records
                 (run_id, page_url, title, word_count, page_type,
                  has_header, has_footer, has_navigation, structure_digest, depth, path)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(run_id)
        .bind(&record.page_url)
        .bind(&record.title)
        .bind(record.word_count)
        .bind(record.page_type.as_str())
        .bind(record.has_header)
        .bind(record.has_footer)
        .bind(record.has_navigation)
        .bind(&record.structure_digest)
        .bind(record.depth)
        .bind(path_json)
        .execute(&mut *tx)
        .await?;
    }

    for edge in &artifacts.edges {
        sqlx::query(
            "INSERT INTO link_validations
                 (run_id, url, parent_url, status_code, status, link_type,
                  response_time, error_message, title, position)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(run_id)
        .bind(&edge.url)
        .bind(&edge.parent_url)
        .bind(edge.status_code)
        .bind(edge.status.as_str())
        .bind(edge.link_type.as_str())
        .bind(edge.response_time)
        .bind(&edge.error_message)
        .bind(&edge.title)
        .bind(edge.position as i64)
        .execute(&mut *tx)
        .await?;
    }

    for (child, parent) in &artifacts.parent_map {
        sqlx::query("INSERT INTO page_parents (run_id, child_url, parent_url) VALUES (?, ?, ?)")
            .bind(run_id)
            .bind(child)
            .bind(parent)
            .execute(&mut *tx)
            .await?;
    }

    for (url, path) in &artifacts.path_map {
        let path_json =
            serde_json::to_string(path).map_err(|e| StoreError::CorruptRow(e.to_string()))?;
        sqlx::query("INSERT INTO page_paths (run_id, url, path, depth) VALUES (?, ?, ?, ?)")
            .bind(run_id)
            .bind(url)
            .bind(path_json)
            .bind((path.len() as i64) - 1)
            .execute(&mut *tx)
            .await?;
    }

    // Hierarchical body write rule: interior pages only, seed included.
    for page in &artifacts.pages {
        let url = &page.record.page_url;
        let is_seed = *url == artifacts.seed_url;
        let has_children = children_map.contains_key(url);
        if !page.fetched || !(has_children || is_seed) {
            continue;
        }
        let Some(body) = &page.body else { continue };

        let parent_url = artifacts.parent_map.get(url);
        sqlx::query(
            "INSERT INTO page_sources (run_id, page_url, source_code, parent_url, created_at_ms)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(run_id)
        .bind(url)
        .bind(body)
        .bind(parent_url)
        .bind(now_ms)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Validates the discovery-forest invariants before anything is written.
fn check_artifact_invariants(artifacts: &RunArtifacts) -> Result<(), StoreError> {
    let seed = &artifacts.seed_url;

    if artifacts.parent_map.contains_key(seed) {
        return Err(StoreError::InvariantViolation(format!(
            "seed {seed} must not have a parent entry"
        )));
    }

    // Every chain must reach the seed without cycling.
    let max_steps = artifacts.parent_map.len() + 1;
    for child in artifacts.parent_map.keys() {
        let mut cursor = child;
        let mut steps = 0;
        while let Some(parent) = artifacts.parent_map.get(cursor) {
            cursor = parent;
            steps += 1;
            if steps > max_steps {
                return Err(StoreError::InvariantViolation(format!(
                    "cycle in parent map reachable from {child}"
                )));
            }
        }
        if cursor != seed {
            return Err(StoreError::InvariantViolation(format!(
                "parent chain of {child} terminates at {cursor}, not the seed"
            )));
        }
    }

    // Path map mirrors the parent map exactly.
    match artifacts.path_map.get(seed) {
        Some(path) if path.len() == 1 && path[0] == *seed => {}
        _ => {
            return Err(StoreError::InvariantViolation(format!(
                "path_map[{seed}] must be the single-element seed path"
            )))
        }
    }
    if artifacts.path_map.len() != artifacts.parent_map.len() + 1 {
        return Err(StoreError::InvariantViolation(
            "path_map keys must be the parent_map domain plus the seed".to_string(),
        ));
    }
    for (child, parent) in &artifacts.parent_map {
        let child_path = artifacts.path_map.get(child).ok_or_else(|| {
            StoreError::InvariantViolation(format!("missing path for discovered URL {child}"))
        })?;
        let parent_path = artifacts.path_map.get(parent).ok_or_else(|| {
            StoreError::InvariantViolation(format!("missing path for parent URL {parent}"))
        })?;
        let expected: Vec<String> = parent_path
            .iter()
            .cloned()
            .chain(std::iter::once(child.clone()))
            .collect();
        if *child_path != expected {
            return Err(StoreError::InvariantViolation(format!(
                "path of {child} does not extend its parent's path"
            )));
        }
    }

    // No edge may reference a parent that is not a page record.
    let page_urls: HashSet<&str> = artifacts
        .pages
        .iter()
        .map(|p| p.record.page_url.as_str())
        .collect();
    for edge in &artifacts.edges {
        if !page_urls.contains(edge.parent_url.as_str()) {
            return Err(StoreError::InvariantViolation(format!(
                "edge {} attributed to unknown parent {}",
                edge.url, edge.parent_url
            )));
        }
    }

    // Every fetched interior page must carry a body; the seed in
    // particular must never be silently skipped.
    let children_map = artifacts.children_map();
    for page in &artifacts.pages {
        let url = &page.record.page_url;
        let interior = children_map.contains_key(url) || *url == *seed;
        if page.fetched && interior && page.body.is_none() {
            return Err(StoreError::InvariantViolation(format!(
                "fetched non-leaf page {url} has no body to persist"
            )));
        }
    }

    Ok(())
}
