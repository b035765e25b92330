//! Typed HTTP client for the dinner-picker REST API.
//!
//! Inputs are validated locally before any request goes out; responses are
//! normalized (see [`envelope`]) and decoded into the shared models.

pub mod envelope;
mod error;
mod retry;
mod vote_gate;

pub use error::{default_message, ClientError};
pub use retry::{with_retry, RetryPolicy};
pub use vote_gate::{VoteGate, VotePermit};

use chrono::Utc;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::ClientConfig;
use crate::domain::{
    validate_group_input, validate_option_input, validate_session_input, ValidationErrors,
};
use crate::models::{Group, NewGroup, NewProposal, NewSession, Proposal, VotingSession};

/// HTTP client bound to one API base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

fn require_id(field: &str, label: &str, id: i64) -> Result<(), ClientError> {
    if id <= 0 {
        let mut errors = ValidationErrors::new();
        errors.add(field, format!("{} is required", label));
        return Err(ClientError::Validation(errors));
    }
    Ok(())
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request and return the raw decoded JSON body.
    ///
    /// Non-2xx responses become [`ClientError::Server`] with the body's
    /// message, or a status-based default.
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Value, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(method = %method, url = %url, "API request");

        let mut request = self.http.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::debug!(method = %method, url = %url, error = %e, "API request failed");
            ClientError::from(e)
        })?;

        let status = response.status();
        tracing::debug!(status = status.as_u16(), url = %url, "API response");

        let bytes = response.bytes().await?;
        let body: Option<Value> = if bytes.is_empty() {
            None
        } else {
            serde_json::from_slice(&bytes).ok()
        };

        if !status.is_success() {
            let message = body.as_ref().and_then(envelope::error_message);
            return Err(ClientError::from_status(status.as_u16(), message));
        }

        match body {
            Some(value) => Ok(value),
            None if bytes.is_empty() => Ok(Value::Null),
            None => Err(ClientError::Decode(format!(
                "{} {} returned a non-JSON body",
                method, path
            ))),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let body = self.send::<Value>(Method::GET, path, None).await?;
        envelope::decode(envelope::normalize(body))
    }

    async fn post_keyed<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        key: &str,
    ) -> Result<T, ClientError> {
        let body = self.send(Method::POST, path, Some(body)).await?;
        envelope::decode(envelope::extract_keyed(body, key))
    }

    /// `GET /api/health`
    pub async fn health(&self) -> Result<(), ClientError> {
        self.send::<Value>(Method::GET, "/api/health", None).await?;
        Ok(())
    }

    /// Current server revision; changes whenever anything is written.
    pub async fn revision(&self) -> Result<i64, ClientError> {
        let body = self.send::<Value>(Method::GET, "/api/revision", None).await?;
        envelope::revision_id(&envelope::normalize(body.clone()))
            .or_else(|| envelope::revision_id(&body))
            .ok_or_else(|| ClientError::Decode("missing revisionId".to_string()))
    }

    pub async fn list_groups(&self) -> Result<Vec<Group>, ClientError> {
        self.get("/api/groups").await
    }

    pub async fn user_groups(&self, user_id: i64) -> Result<Vec<Group>, ClientError> {
        require_id("userId", "User ID", user_id)?;
        self.get(&format!("/api/groups/user/{}", user_id)).await
    }

    pub async fn get_group(&self, id: i64) -> Result<Group, ClientError> {
        require_id("groupId", "Group ID", id)?;
        self.get(&format!("/api/groups/{}", id)).await
    }

    /// Create a group. Text fields are trimmed and blank icon/theme replaced
    /// by defaults before validation.
    pub async fn create_group(&self, request: &NewGroup) -> Result<Group, ClientError> {
        let request = request.sanitized();
        validate_group_input(
            &request.name,
            request.description.as_deref(),
            Some(&request.color_theme),
        )?;
        self.post_keyed("/api/groups", &request, "group").await
    }

    pub async fn delete_group(&self, id: i64) -> Result<(), ClientError> {
        require_id("groupId", "Group ID", id)?;
        self.send::<Value>(Method::DELETE, &format!("/api/groups/{}", id), None)
            .await?;
        Ok(())
    }

    /// Sessions of a group, newest first.
    pub async fn group_sessions(&self, group_id: i64) -> Result<Vec<VotingSession>, ClientError> {
        require_id("groupId", "Group ID", group_id)?;
        self.get(&format!("/api/sessions/group/{}", group_id)).await
    }

    pub async fn get_session(&self, id: i64) -> Result<VotingSession, ClientError> {
        require_id("sessionId", "Session ID", id)?;
        self.get(&format!("/api/sessions/{}", id)).await
    }

    pub async fn create_session(&self, request: &NewSession) -> Result<VotingSession, ClientError> {
        validate_session_input(&request.title, request.group_id, request.deadline, Utc::now())?;
        let request = NewSession {
            title: request.title.trim().to_string(),
            ..request.clone()
        };
        self.post_keyed("/api/sessions", &request, "session").await
    }

    pub async fn lock_session(&self, id: i64, locked: bool) -> Result<VotingSession, ClientError> {
        require_id("sessionId", "Session ID", id)?;
        self.post_keyed(
            &format!("/api/sessions/{}/lock", id),
            &json!({ "locked": locked }),
            "session",
        )
        .await
    }

    /// Options of a session, most votes first.
    pub async fn session_options(&self, session_id: i64) -> Result<Vec<Proposal>, ClientError> {
        require_id("sessionId", "Session ID", session_id)?;
        self.get(&format!("/api/sessions/{}/options", session_id))
            .await
    }

    pub async fn add_option(&self, request: &NewProposal) -> Result<Proposal, ClientError> {
        validate_option_input(
            &request.name,
            &request.link,
            request.image_url.as_deref(),
            request.price_range.as_deref(),
        )?;
        require_id("votingSessionId", "Session ID", request.voting_session_id)?;

        let trimmed = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let request = NewProposal {
            name: request.name.trim().to_string(),
            link: request.link.trim().to_string(),
            image_url: trimmed(&request.image_url),
            cuisine: trimmed(&request.cuisine),
            price_range: trimmed(&request.price_range),
            voting_session_id: request.voting_session_id,
        };
        self.post_keyed("/api/options", &request, "option").await
    }

    /// Change an option's vote count by `delta`. The server clamps at zero.
    pub async fn vote(&self, option_id: i64, delta: i32) -> Result<Proposal, ClientError> {
        require_id("optionId", "Option ID", option_id)?;
        if delta == 0 {
            let mut errors = ValidationErrors::new();
            errors.add("delta", "Vote delta is required");
            return Err(ClientError::Validation(errors));
        }
        self.post_keyed(
            &format!("/api/options/{}/vote", option_id),
            &json!({ "delta": delta }),
            "option",
        )
        .await
    }
}
