//! Short-lived realtime credentials.
//!
//! The deployment secret never reaches the model transport. Each session
//! asks `POST {api_base}/realtime/sessions` for an ephemeral client secret
//! and connects with that instead.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use switchboard_contracts::{error::SwitchboardResult, session::SessionCredential};
use switchboard_core::{
    config::{Credentials, ModelConfig},
    traits::CredentialIssuer,
};

use crate::http::JsonClient;

#[derive(Debug, Serialize)]
struct SessionRequest<'a> {
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    client_secret: ClientSecret,
}

#[derive(Debug, Deserialize)]
struct ClientSecret {
    value: String,
    expires_at: Option<i64>,
}

impl From<SessionResponse> for SessionCredential {
    fn from(response: SessionResponse) -> Self {
        SessionCredential {
            token: response.client_secret.value,
            expires_at: response.client_secret.expires_at,
        }
    }
}

pub struct OpenAiCredentialIssuer {
    http: JsonClient,
    model: String,
}

impl OpenAiCredentialIssuer {
    pub fn new(config: &ModelConfig, credentials: &Credentials) -> SwitchboardResult<Self> {
        Ok(Self {
            http: JsonClient::new(&config.api_base, format!("Bearer {}", credentials.openai_api_key))?,
            model: config.realtime_model.clone(),
        })
    }
}

#[async_trait]
impl CredentialIssuer for OpenAiCredentialIssuer {
    async fn issue(&self) -> SwitchboardResult<SessionCredential> {
        let request = SessionRequest { model: &self.model };
        let response: SessionResponse = self
            .http
            .post("realtime/sessions", &request)
            .await
            .map_err(|e| {
                warn!(error = %e, "realtime credential request failed");
                e
            })?;

        info!(model = %self.model, expires_at = ?response.client_secret.expires_at, "realtime credential issued");
        Ok(response.into())
    }
}
