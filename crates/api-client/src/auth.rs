use crate::error::ApiError;
use crate::responses::TokenResponse;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Clone)]
struct Tokens {
    access: String,
    refresh: Option<String>,
}

/// Holds the current OAuth2 token pair and performs the `refresh_token` grant.
///
/// Readers take the access token under a shared lock; a refresh replaces the
/// whole pair at once. Refreshes are serialised: Etsy rotates the refresh
/// token on every grant, so two concurrent grants would invalidate each other.
#[derive(Debug)]
pub struct TokenStore {
    client_id: String,
    token_url: String,
    tokens: RwLock<Tokens>,
    refreshing: Mutex<()>,
}

impl TokenStore {
    pub fn new(
        client_id: impl Into<String>,
        token_url: impl Into<String>,
        access_token: Option<String>,
        refresh_token: Option<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            token_url: token_url.into(),
            tokens: RwLock::new(Tokens {
                access: access_token.unwrap_or_default(),
                refresh: refresh_token,
            }),
            refreshing: Mutex::new(()),
        }
    }

    pub async fn access_token(&self) -> String {
        self.tokens.read().await.access.clone()
    }

    /// Exchanges the refresh token for a new token pair, unless the access
    /// token has already moved on from `rejected` (another request refreshed
    /// while this one waited for the lock).
    ///
    /// Any failure (no refresh token, network error, rejected grant) is reported
    /// as `Unauthorized`, since the caller cannot proceed without a token.
    pub async fn refresh(&self, http: &reqwest::Client, rejected: &str) -> Result<(), ApiError> {
        let _guard = self.refreshing.lock().await;
        if self.tokens.read().await.access != rejected {
            tracing::debug!("Access token already refreshed by a concurrent request.");
            return Ok(());
        }

        let refresh_token = self
            .tokens
            .read()
            .await
            .refresh
            .clone()
            .ok_or_else(|| ApiError::Unauthorized("no refresh token available".to_string()))?;

        let response = http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.client_id.as_str()),
                ("refresh_token", refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ApiError::Unauthorized(format!("token refresh failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Unauthorized(format!(
                "token refresh rejected with status {}",
                status.as_u16()
            )));
        }

        let grant: TokenResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Unauthorized(format!("unreadable token response: {}", e)))?;

        let mut tokens = self.tokens.write().await;
        tokens.access = grant.access_token;
        if let Some(rotated) = grant.refresh_token {
            tokens.refresh = Some(rotated);
        }
        tracing::info!(expires_in = ?grant.expires_in, "Refreshed Etsy access token.");

        Ok(())
    }
}
