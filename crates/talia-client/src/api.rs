// HTTP collaborator client for the game server.
//
// Only the operations the session needs: state pulls, action submission,
// trick finalization and the two group votes. Bodies identify the acting
// participant; auth is an optional bearer token issued elsewhere.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use talia_core::consensus::LobbyChoice;
use talia_core::game::action::PlayerAction;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        source: reqwest::Error,
    },

    #[error("server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid response from {endpoint}: {message}")]
    InvalidResponse { endpoint: String, message: String },

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

impl ApiError {
    /// Text suitable for a one-shot user alert.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Game server operations consumed by a session.
#[async_trait]
pub trait GameApi: Send + Sync {
    /// Full authoritative snapshot, unparsed.
    async fn fetch_state(&self, session_id: &str) -> Result<Value, ApiError>;

    async fn submit_action(&self, session_id: &str, action: &PlayerAction) -> Result<(), ApiError>;

    async fn fetch_lobby(&self, session_id: &str) -> Result<Value, ApiError>;

    async fn finalize_trick(&self, session_id: &str) -> Result<(), ApiError>;

    async fn vote_next_round(&self, session_id: &str) -> Result<(), ApiError>;

    async fn vote_return_to_lobby(
        &self,
        session_id: &str,
        choice: LobbyChoice,
    ) -> Result<(), ApiError>;

    async fn leave_to_dashboard(&self, session_id: &str) -> Result<(), ApiError>;
}

// ---------------------------------------------------------------------------
// HttpGameApi
// ---------------------------------------------------------------------------

pub struct HttpGameApi {
    base_url: String,
    participant_id: String,
    client: reqwest::Client,
    token: Option<String>,
}

impl HttpGameApi {
    pub fn new(base_url: impl Into<String>, participant_id: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            participant_id: participant_id.into(),
            client: reqwest::Client::new(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn endpoint(&self, session_id: &str, op: &str) -> String {
        format!("{}/api/games/{session_id}/{op}", self.base_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn state_request(&self, session_id: &str) -> (String, reqwest::RequestBuilder) {
        let endpoint = self.endpoint(session_id, "state");
        let request = self
            .client
            .get(&endpoint)
            .query(&[("player_id", self.participant_id.as_str())]);
        (endpoint, request)
    }

    async fn get_json(
        &self,
        endpoint: String,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, ApiError> {
        debug!(%endpoint, "GET");
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;
        let response = check_status(response).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| ApiError::InvalidResponse {
                endpoint,
                message: e.to_string(),
            })
    }

    async fn post(&self, endpoint: String, body: Value) -> Result<(), ApiError> {
        debug!(%endpoint, "POST");
        let response = self
            .authorize(self.client.post(&endpoint))
            .json(&body)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;
        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|e| format!("failed to read error response: {e}"));
    Err(ApiError::Rejected {
        status: status.as_u16(),
        message: server_message(status, &body),
    })
}

/// Pull the human-readable message out of an error body.
///
/// Servers answer with `{"error": ..}`, `{"detail": ..}` or `{"message": ..}`;
/// anything else falls back to the raw body or the status reason.
pub fn server_message(status: StatusCode, body: &str) -> String {
    if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(body) {
        for key in ["error", "detail", "message"] {
            if let Some(text) = fields.get(key).and_then(Value::as_str) {
                return text.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string()
}

#[async_trait]
impl GameApi for HttpGameApi {
    async fn fetch_state(&self, session_id: &str) -> Result<Value, ApiError> {
        let (endpoint, request) = self.state_request(session_id);
        self.get_json(endpoint, request).await
    }

    async fn submit_action(&self, session_id: &str, action: &PlayerAction) -> Result<(), ApiError> {
        let mut body = serde_json::to_value(action).map_err(|e| ApiError::InvalidResponse {
            endpoint: self.endpoint(session_id, "action"),
            message: format!("unserializable action: {e}"),
        })?;
        if let Value::Object(fields) = &mut body {
            fields.insert("player_id".into(), json!(self.participant_id));
        }
        self.post(self.endpoint(session_id, "action"), body).await
    }

    async fn fetch_lobby(&self, session_id: &str) -> Result<Value, ApiError> {
        let endpoint = self.endpoint(session_id, "lobby");
        let request = self.client.get(&endpoint);
        self.get_json(endpoint, request).await
    }

    async fn finalize_trick(&self, session_id: &str) -> Result<(), ApiError> {
        self.post(self.endpoint(session_id, "finalize-trick"), json!({}))
            .await
    }

    async fn vote_next_round(&self, session_id: &str) -> Result<(), ApiError> {
        self.post(
            self.endpoint(session_id, "next-round"),
            json!({ "player_id": self.participant_id }),
        )
        .await
    }

    async fn vote_return_to_lobby(
        &self,
        session_id: &str,
        choice: LobbyChoice,
    ) -> Result<(), ApiError> {
        self.post(
            self.endpoint(session_id, "return-to-lobby"),
            json!({ "player_id": self.participant_id, "choice": choice }),
        )
        .await
    }

    async fn leave_to_dashboard(&self, session_id: &str) -> Result<(), ApiError> {
        self.post(
            self.endpoint(session_id, "leave"),
            json!({ "player_id": self.participant_id }),
        )
        .await
    }
}
