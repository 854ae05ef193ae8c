//! Application-level utilities: logging, URL handling, and statistics.

pub mod logging;
pub mod statistics;
pub mod url;

pub use logging::init_logger_with;
pub use statistics::{log_progress, print_error_statistics};
pub use url::{
    canonical_string, canonicalize, has_resource_extension, is_external, registrable_host,
    same_origin, validate_and_normalize_url,
};
