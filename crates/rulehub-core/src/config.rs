use serde::Deserialize;
use std::{env, path::Path, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    pub app: AppConfig,
    pub paths: PathsConfig,
    pub telemetry: TelemetryConfig,
    pub catalog: CatalogConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AppConfig {
    pub service_name: String,
    pub port: u16,
    pub env: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PathsConfig {
    pub database: PathBuf,
    pub snapshot: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TelemetryConfig {
    pub otlp_endpoint: Option<String>,
    pub export_traces: bool,
}

/// Which backend serves the catalog contract. The two are alternatives,
/// never composed in one deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogBackend {
    Sql,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CatalogConfig {
    pub backend: CatalogBackend,
    #[serde(default = "default_search_threshold")]
    pub search_threshold: f64,
}

fn default_search_threshold() -> f64 {
    0.4
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthProvider {
    Github,
    Static,
}

/// A pre-shared session token mapped to an identity, used by the static
/// verifier in dev and tests.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StaticToken {
    pub token: String,
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AuthConfig {
    pub provider: AuthProvider,
    #[serde(default = "default_github_api_base")]
    pub github_api_base: String,
    #[serde(default)]
    pub tokens: Vec<StaticToken>,
}

fn default_github_api_base() -> String {
    "https://api.github.com".to_string()
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    ConfigBuild(config::ConfigError),
    #[error("failed to parse configuration: {0}")]
    Deserialize(config::ConfigError),
    #[error("missing required environment variable {0}")]
    MissingEnvVar(String),
    #[error("invalid APP_PORT override: {0}")]
    InvalidPort(std::num::ParseIntError),
}

impl Config {
    /// Load configuration from the provided path, apply environment overrides,
    /// and resolve any `env:` indirections.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .build()
            .map_err(ConfigError::ConfigBuild)?;

        let mut cfg: Config = raw.try_deserialize().map_err(ConfigError::Deserialize)?;
        cfg.apply_env_overrides()?;
        cfg.resolve_env_markers()?;
        cfg.expand_paths();
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(port) = env::var("APP_PORT") {
            let port: u16 = port.parse().map_err(ConfigError::InvalidPort)?;
            self.app.port = port;
        }

        if let Ok(otlp) = env::var("OTLP_ENDPOINT") {
            self.telemetry.otlp_endpoint = Some(otlp);
        }

        Ok(())
    }

    fn resolve_env_markers(&mut self) -> Result<(), ConfigError> {
        apply_env_marker(&mut self.app.service_name)?;
        apply_env_marker(&mut self.app.env)?;
        apply_env_marker(&mut self.auth.github_api_base)?;
        for entry in &mut self.auth.tokens {
            apply_env_marker(&mut entry.token)?;
        }
        apply_env_marker_path(&mut self.paths.database)?;
        apply_env_marker_path(&mut self.paths.snapshot)?;
        if let Some(endpoint) = &mut self.telemetry.otlp_endpoint {
            apply_env_marker(endpoint)?;
        }
        Ok(())
    }

    fn expand_paths(&mut self) {
        expand_tilde(&mut self.paths.database);
        expand_tilde(&mut self.paths.snapshot);
    }
}

fn expand_tilde(path: &mut PathBuf) {
    let raw = path.to_string_lossy().to_string();
    let expanded = shellexpand::tilde(&raw);
    *path = PathBuf::from(expanded.as_ref());
}

fn apply_env_marker(value: &mut String) -> Result<(), ConfigError> {
    if let Some(rest) = value.strip_prefix("env:") {
        let resolved = env::var(rest).map_err(|_| ConfigError::MissingEnvVar(rest.to_string()))?;
        *value = resolved;
    }
    Ok(())
}

fn apply_env_marker_path(path: &mut PathBuf) -> Result<(), ConfigError> {
    let mut value = path.to_string_lossy().to_string();
    apply_env_marker(&mut value)?;
    *path = PathBuf::from(value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::{fs, sync::Mutex};
    use tempfile::TempDir;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    fn write_config(contents: &str) -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, contents).expect("write config");
        (dir, path)
    }

    fn with_env(vars: &[(&str, Option<&str>)], f: impl FnOnce()) {
        let _guard = ENV_LOCK.lock().expect("lock env");
        let saved: Vec<(String, Option<String>)> = vars
            .iter()
            .map(|(k, _)| (k.to_string(), env::var(k).ok()))
            .collect();

        for (key, value) in vars {
            match value {
                Some(v) => unsafe { env::set_var(key, v) },
                None => unsafe { env::remove_var(key) },
            }
        }

        f();

        for (key, value) in saved {
            match value {
                Some(v) => unsafe { env::set_var(&key, v) },
                None => unsafe { env::remove_var(&key) },
            }
        }
    }

    fn config_body(database: &str, snapshot: &str) -> String {
        format!(
            r#"
[app]
service_name = "rulehub"
port = 17900
env = "dev"

[paths]
database = "{database}"
snapshot = "{snapshot}"

[telemetry]
otlp_endpoint = "http://localhost:4318"
export_traces = true

[catalog]
backend = "sql"

[auth]
provider = "static"

[[auth.tokens]]
token = "env:RULEHUB_TOKEN"
id = "u1"
username = "alice"
email = "alice@example.com"
"#
        )
    }

    #[test]
    fn load_config_expands_tilde_and_resolves_env_markers() {
        let (dir, path) = write_config(&config_body("env:DB_PATH", "~/catalog.json"));
        let home_dir = dir.path().join("home");
        fs::create_dir_all(&home_dir).expect("create home dir");

        let expected_db = home_dir.join("db/catalog.db");
        let expected_snapshot = home_dir.join("catalog.json");
        with_env(
            &[
                ("APP_PORT", None),
                ("OTLP_ENDPOINT", None),
                ("HOME", Some(home_dir.to_str().unwrap())),
                ("DB_PATH", Some("~/db/catalog.db")),
                ("RULEHUB_TOKEN", Some("secret-token")),
            ],
            || {
                let cfg = Config::load(&path).expect("config loads");
                assert_eq!(cfg.app.service_name, "rulehub");
                assert_eq!(cfg.app.port, 17900);
                assert_eq!(cfg.paths.database, expected_db);
                assert_eq!(cfg.paths.snapshot, expected_snapshot);
                assert_eq!(cfg.catalog.backend, CatalogBackend::Sql);
                assert_eq!(cfg.catalog.search_threshold, 0.4);
                assert_eq!(cfg.auth.provider, AuthProvider::Static);
                assert_eq!(cfg.auth.tokens[0].token, "secret-token");
                assert_eq!(cfg.auth.tokens[0].username, "alice");
            },
        );
    }

    #[test]
    fn env_overrides_take_precedence() {
        let (_dir, path) = write_config(&config_body("/tmp/catalog.db", "/tmp/catalog.json"));

        with_env(
            &[
                ("APP_PORT", Some("19000")),
                ("OTLP_ENDPOINT", Some("http://override.local:4318")),
                ("RULEHUB_TOKEN", Some("t")),
            ],
            || {
                let cfg = Config::load(&path).expect("config loads");
                assert_eq!(cfg.app.port, 19000);
                assert_eq!(
                    cfg.telemetry.otlp_endpoint.as_deref(),
                    Some("http://override.local:4318")
                );
            },
        );
    }

    #[test]
    fn env_marker_without_variable_errors() {
        let (_dir, path) = write_config(&config_body("/tmp/catalog.db", "/tmp/catalog.json"));

        with_env(
            &[
                ("APP_PORT", None),
                ("OTLP_ENDPOINT", None),
                ("RULEHUB_TOKEN", None),
            ],
            || {
                let err = Config::load(&path).expect_err("missing env var should error");
                match err {
                    ConfigError::MissingEnvVar(name) => assert_eq!(name, "RULEHUB_TOKEN"),
                    other => panic!("unexpected error: {other}"),
                }
            },
        );
    }

    #[test]
    fn invalid_port_override_is_reported() {
        let (_dir, path) = write_config(&config_body("/tmp/catalog.db", "/tmp/catalog.json"));

        with_env(
            &[
                ("APP_PORT", Some("not-a-number")),
                ("RULEHUB_TOKEN", Some("t")),
            ],
            || {
                let err = Config::load(&path).expect_err("invalid port should error");
                assert!(matches!(err, ConfigError::InvalidPort(_)));
            },
        );
    }
}
