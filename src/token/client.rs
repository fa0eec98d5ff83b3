use std::fmt;

use reqwest::Client;
use tracing::{info, warn};

use super::messages::{TokenErrorBody, TokenRequest, TokenResponse};
use crate::config::TokenServiceConfig;
use crate::error::{Result, SessionError};

/// Short-lived credential authorizing one identity to join one room
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub identity: String,
    pub room_name: String,
    pub expires_at: Option<String>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("identity", &self.identity)
            .field("room_name", &self.room_name)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Requests session credentials. Implementations never retry internally.
#[async_trait::async_trait]
pub trait TokenClient: Send + Sync {
    async fn request_token(&self, identity: &str, session_id: &str) -> Result<Credential>;
}

/// Token client backed by the HTTP token issuing service
pub struct HttpTokenClient {
    client: Client,
    endpoint: String,
    role: Option<String>,
}

impl HttpTokenClient {
    pub fn new(config: &TokenServiceConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            role: config.role.clone(),
        })
    }
}

#[async_trait::async_trait]
impl TokenClient for HttpTokenClient {
    async fn request_token(&self, identity: &str, session_id: &str) -> Result<Credential> {
        info!("Requesting token for {} in {}", identity, session_id);

        let request = TokenRequest {
            identity: identity.to_string(),
            room_name: session_id.to_string(),
            role: self.role.clone(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| SessionError::token(format!("network error: {}", e), true))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            // Prefer the server's own message when the body carries one
            let message = serde_json::from_str::<TokenErrorBody>(&text)
                .map(|body| body.error)
                .unwrap_or_else(|_| format!("token service returned {}", status));
            warn!("Token request rejected ({}): {}", status, message);
            return Err(SessionError::token(message, status.is_server_error()));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| SessionError::token(format!("malformed token response: {}", e), false))?;

        Ok(Credential {
            token: body.token,
            identity: body.identity,
            room_name: body.room_name,
            expires_at: body.expires_at,
        })
    }
}
