use std::{env, net::SocketAddr, sync::Arc};

use rulehub_core::config::{AuthProvider, CatalogBackend};
use rulehub_core::{
    CatalogRepository, Config, Database, GitHubVerifier, LanguageMap, MemoryCatalog,
    SessionVerifier, SqlCatalog, StaticTokenVerifier, init_telemetry, migrations,
};
use rulehub_server::{AppState, router};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let config = Config::load(&config_path)?;

    let _guard = init_telemetry(&config.app, &config.telemetry)?;

    let catalog: Arc<dyn CatalogRepository> = match config.catalog.backend {
        CatalogBackend::Sql => {
            let db = Database::new(&config.paths.database).await?;
            migrations::run_migrations(&db).await?;
            info!("serving catalog from {}", config.paths.database.display());
            Arc::new(SqlCatalog::new(db))
        }
        CatalogBackend::Memory => {
            let catalog =
                MemoryCatalog::load(&config.paths.snapshot, config.catalog.search_threshold)
                    .await?;
            info!("serving catalog from {}", config.paths.snapshot.display());
            Arc::new(catalog)
        }
    };

    let sessions: Arc<dyn SessionVerifier> = match config.auth.provider {
        AuthProvider::Github => Arc::new(GitHubVerifier::from_config(&config.auth)),
        AuthProvider::Static => Arc::new(StaticTokenVerifier::new(&config.auth.tokens)),
    };

    let state = AppState {
        catalog,
        sessions,
        languages: Arc::new(LanguageMap::default()),
    };
    let app = router(state);

    let shutdown = CancellationToken::new();
    let addr = SocketAddr::from(([0, 0, 0, 0], config.app.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("rulehub listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("received ctrl+c, shutting down");
        }
        _ = terminate => {
            warn!("received terminate signal, shutting down");
        }
    }

    shutdown.cancel();
}
