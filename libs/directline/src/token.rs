use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::error::AuthError;

/// Identity of the bot as registered with the token-issuing service.
/// Loaded once at process start and never mutated.
#[derive(Debug, Clone)]
pub struct BotIdentity {
    pub name: String,
    pub bot_id: String,
    pub tenant_id: String,
    pub token_endpoint: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: String,
}

/// Fetches a short-lived bearer token for the bot identity.
///
/// Tokens are not cached: every orchestrated call gets a fresh one, which
/// sidesteps expiry bookkeeping at the cost of one extra round trip.
pub struct TokenClient {
    http: reqwest::Client,
    identity: BotIdentity,
}

impl TokenClient {
    pub fn new(http: reqwest::Client, identity: BotIdentity) -> Self {
        Self { http, identity }
    }

    pub fn identity(&self) -> &BotIdentity {
        &self.identity
    }

    pub async fn acquire(&self) -> Result<String, AuthError> {
        debug!(endpoint = %self.identity.token_endpoint, "requesting bot token");
        let response = self
            .http
            .get(&self.identity.token_endpoint)
            .query(&[
                ("botId", self.identity.bot_id.as_str()),
                ("tenantId", self.identity.tenant_id.as_str()),
            ])
            .send()
            .await
            .map_err(AuthError::Request)?;

        let status = response.status();
        let body = response.text().await.map_err(AuthError::Request)?;
        if status != StatusCode::OK {
            return Err(AuthError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let payload: TokenResponse = serde_json::from_str(&body).map_err(AuthError::Decode)?;
        if payload.token.trim().is_empty() {
            return Err(AuthError::EmptyToken);
        }
        Ok(payload.token)
    }
}
