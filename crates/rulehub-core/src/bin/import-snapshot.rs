//! One-shot loader that moves a JSON catalog snapshot into the SQL store.
//!
//! Usage: `import-snapshot [snapshot.json]` — the snapshot path defaults to
//! the configured one; the config file comes from `CONFIG_PATH`.

use std::{env, path::PathBuf};

use rulehub_core::catalog::import::{import_snapshot, read_snapshot};
use rulehub_core::{Config, Database, SqlCatalog, init_telemetry, migrations};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let config = Config::load(&config_path)?;

    let _guard = init_telemetry(&config.app, &config.telemetry)?;

    let snapshot_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| config.paths.snapshot.clone());

    let db = Database::new(&config.paths.database).await?;
    migrations::run_migrations(&db).await?;
    let catalog = SqlCatalog::new(db);

    info!("reading snapshot from {}", snapshot_path.display());
    let snapshot = read_snapshot(&snapshot_path).await?;

    let report = import_snapshot(&catalog, snapshot).await?;
    info!(
        total = report.total,
        migrated = report.migrated,
        failed = report.failed,
        slugs_renamed = report.slugs_renamed,
        "import finished"
    );

    if report.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
