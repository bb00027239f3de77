use std::{env, path::Path, sync::Arc};

use libsql::{Builder, Connection, Database as LibSqlDatabase};
use thiserror::Error;

/// Handle to the catalog database. Cheap to clone; connections are opened
/// per operation.
#[derive(Clone)]
pub struct Database {
    inner: Arc<LibSqlDatabase>,
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("failed to build database: {0}")]
    Build(libsql::Error),
    #[error("failed to open connection: {0}")]
    Connect(libsql::Error),
    #[error("failed to execute statement: {0}")]
    Statement(libsql::Error),
    #[error("missing required LIBSQL_AUTH_TOKEN for remote database")]
    MissingAuthToken,
}

impl Database {
    /// Open a local database file, or a remote one when the path looks like
    /// a `libsql://`/`http(s)://` URL. Remote databases require
    /// `LIBSQL_AUTH_TOKEN` in the environment.
    pub async fn new(database_path: &Path) -> Result<Self, DbError> {
        let path_str = database_path.to_string_lossy();
        let inner = if is_remote(&path_str) {
            let auth_token = env::var("LIBSQL_AUTH_TOKEN")
                .ok()
                .filter(|token| !token.is_empty())
                .ok_or(DbError::MissingAuthToken)?;

            Builder::new_remote(path_str.to_string(), auth_token)
                .build()
                .await
        } else {
            Builder::new_local(path_str.to_string()).build().await
        }
        .map_err(DbError::Build)?;

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    pub async fn connection(&self) -> Result<Connection, DbError> {
        self.inner.connect().map_err(DbError::Connect)
    }

    pub async fn health_check(&self) -> Result<(), DbError> {
        let conn = self.connection().await?;
        let mut rows = conn
            .query("SELECT 1", ())
            .await
            .map_err(DbError::Statement)?;
        let _ = rows.next().await.map_err(DbError::Statement)?;
        Ok(())
    }
}

fn is_remote(path: &str) -> bool {
    path.starts_with("libsql://") || path.starts_with("http://") || path.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::sync::Mutex;
    use tempfile::TempDir;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    #[tokio::test]
    async fn health_check_runs_simple_query() {
        let dir = TempDir::new().expect("temp dir");
        let db_path = dir.path().join("catalog.db");
        let db = Database::new(&db_path).await.expect("create db");

        db.health_check().await.expect("health check passes");
    }

    #[tokio::test]
    async fn remote_missing_auth_token_errors() {
        let _guard = ENV_LOCK.lock().expect("lock env");
        unsafe { env::remove_var("LIBSQL_AUTH_TOKEN") };
        let result = Database::new(Path::new("libsql://example.com/catalog")).await;
        match result {
            Ok(_) => panic!("remote db should require auth token"),
            Err(DbError::MissingAuthToken) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
}
