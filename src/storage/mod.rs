//! Persistence: run lifecycle rows, per-URL records, relationship maps,
//! and the hierarchical body store.
//!
//! All operations use SQLite with WAL mode enabled. Writes for a run are
//! transactional and idempotent; readers never observe partial state.

pub mod insert;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
#[cfg(test)]
pub mod test_helpers;

pub use insert::{
    create_run, mark_run_completed, mark_run_failed, mark_run_running, persist_run,
};
pub use migrations::run_migrations;
pub use models::{
    BrokenLinkDetails, HighlightKind, HighlightedLink, PageRecord, ParentChildMaps, PersistPage,
    RunArtifacts, RunBundle, RunCounters, RunRecord, RunState, RunSummary, SourceDocument,
};
pub use pool::init_db_pool_with_path;
pub use queries::{
    delete_run, get_broken_link_details, get_parent_child, get_run, get_run_record, get_source,
    query_run_history,
};
