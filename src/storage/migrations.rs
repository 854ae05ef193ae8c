//! Database migration management.
//!
//! SQLx migrations are embedded into the binary at compile time and
//! extracted to a temporary directory at runtime when the source tree is
//! not available, so distributed binaries migrate without shipping the
//! migrations directory.

use include_dir::{include_dir, Dir};
use sqlx::{Pool, Sqlite};
use tempfile::TempDir;

static MIGRATIONS_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/migrations");

/// Runs SQLx migrations embedded in the binary.
///
/// In development builds the source migrations directory is used directly;
/// otherwise the embedded files are extracted to a temp directory first.
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<(), anyhow::Error> {
    let source_migrations = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");

    if source_migrations.exists() {
        let migrator = sqlx::migrate::Migrator::new(source_migrations.as_path()).await?;
        migrator.run(pool).await?;
        Ok(())
    } else {
        // _temp_dir must stay in scope so the extracted files survive the
        // migrator run.
        let _temp_dir = TempDir::new()?;
        let migrations_path = _temp_dir.path().join("migrations");
        std::fs::create_dir_all(&migrations_path)?;

        for file in MIGRATIONS_DIR.files() {
            let file_path = migrations_path.join(file.path());
            if let Some(parent) = file_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&file_path, file.contents())?;
        }

        let migrator = sqlx::migrate::Migrator::new(migrations_path.as_path()).await?;
        migrator.run(pool).await?;
        Ok(())
    }
}
