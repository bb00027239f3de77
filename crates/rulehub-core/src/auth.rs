use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{AuthConfig, StaticToken};

/// Identity attached to an authenticated submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("identity provider request failed: {0}")]
    Provider(#[from] reqwest::Error),
}

/// Seam between the HTTP layer and whatever identity provider backs
/// submissions. `Ok(None)` means the token did not resolve to a user.
#[async_trait]
pub trait SessionVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Option<AuthUser>, AuthError>;
}

/// Verifies bearer tokens against the GitHub user endpoint.
pub struct GitHubVerifier {
    client: reqwest::Client,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: i64,
    login: String,
    email: Option<String>,
    name: Option<String>,
}

impl GitHubVerifier {
    pub fn new(client: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into(),
        }
    }

    pub fn from_config(auth: &AuthConfig) -> Self {
        Self::new(reqwest::Client::new(), auth.github_api_base.clone())
    }
}

#[async_trait]
impl SessionVerifier for GitHubVerifier {
    async fn verify(&self, token: &str) -> Result<Option<AuthUser>, AuthError> {
        let response = self
            .client
            .get(format!("{}/user", self.api_base))
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {token}"))
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header(reqwest::header::USER_AGENT, "rulehub")
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let user: GitHubUser = response.json().await?;
            return Ok(Some(AuthUser {
                id: user.id.to_string(),
                username: user.login,
                email: user.email,
                name: user.name,
            }));
        }

        if !matches!(
            status,
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN
        ) {
            tracing::warn!("unexpected status {status} from identity provider");
        }
        Ok(None)
    }
}

/// Verifies bearer tokens against a pre-shared table from config. Used in
/// dev deployments and tests.
pub struct StaticTokenVerifier {
    tokens: HashMap<String, AuthUser>,
}

impl StaticTokenVerifier {
    pub fn new(entries: &[StaticToken]) -> Self {
        let tokens = entries
            .iter()
            .map(|entry| {
                (
                    entry.token.clone(),
                    AuthUser {
                        id: entry.id.clone(),
                        username: entry.username.clone(),
                        email: entry.email.clone(),
                        name: entry.name.clone(),
                    },
                )
            })
            .collect();
        Self { tokens }
    }
}

#[async_trait]
impl SessionVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Option<AuthUser>, AuthError> {
        Ok(self.tokens.get(token).cloned())
    }
}
