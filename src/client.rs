use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::NoteError;

const LOG_TARGET: &str = "flomo::client";

/// Outbound body of a note submission.
#[derive(Debug, Serialize)]
pub struct NoteRequest<'a> {
    pub content: &'a str,
}

/// A stored note as returned by flomo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Memo {
    pub slug: String,
    pub creator_id: i64,
    pub source: String,
    pub content: String,
    pub tags: Vec<String>,
    pub updated_at: String,
    pub created_at: String,
}

impl Memo {
    /// Public viewing URL of this memo under `view_base`.
    pub fn view_url(&self, view_base: &str) -> String {
        format!(
            "{}/mine/?memo_id={}",
            view_base.trim_end_matches('/'),
            self.slug
        )
    }
}

/// Response envelope of the flomo API. Decoded for every status code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceResponse {
    pub code: i64,
    pub message: String,
    pub memo: Option<Memo>,
}

/// Result of a successful submission. `memo.slug` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteReceipt {
    pub code: i64,
    pub message: String,
    pub memo: Memo,
}

/// HTTP client for the flomo incoming-webhook API.
///
/// Holds only immutable configuration, so one instance can be shared across
/// concurrent submissions.
#[derive(Debug, Clone)]
pub struct NoteClient {
    api_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl NoteClient {
    pub fn new(config: &Config) -> Result<Self, NoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| NoteError::Encoding(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_url: config.api_url.clone(),
            timeout: config.timeout(),
            client,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Send one note. A single attempt, never retried.
    pub async fn submit_note(&self, content: &str) -> Result<NoteReceipt, NoteError> {
        self.submit_note_with_cancel(content, &CancellationToken::new())
            .await
    }

    /// Send one note, aborting the in-flight request once `cancel` fires.
    pub async fn submit_note_with_cancel(
        &self,
        content: &str,
        cancel: &CancellationToken,
    ) -> Result<NoteReceipt, NoteError> {
        let start = Instant::now();
        log::info!(
            target: LOG_TARGET,
            "Starting to send note (length: {} characters)",
            content.chars().count()
        );

        if content.trim().is_empty() {
            log::warn!(target: LOG_TARGET, "Empty content provided");
            return Err(NoteError::Validation("content cannot be empty".to_string()));
        }

        let body = serde_json::to_vec(&NoteRequest { content }).map_err(|e| {
            NoteError::Encoding(format!("failed to marshal request body: {}", e))
        })?;
        log::debug!(target: LOG_TARGET, "Request body prepared (size: {} bytes)", body.len());

        let request = self
            .client
            .post(&self.api_url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body)
            .build()
            .map_err(|e| NoteError::Encoding(format!("failed to create request: {}", e)))?;

        log::info!(target: LOG_TARGET, "Sending request to {}", self.api_url);
        let exchange = async {
            let response = self
                .client
                .execute(request)
                .await
                .map_err(|e| self.classify(e))?;
            let status = response.status();
            let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
            Ok::<_, NoteError>((status, bytes))
        };

        let (status, bytes) = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::warn!(target: LOG_TARGET, "Request cancelled by caller");
                return Err(NoteError::Cancelled);
            }
            result = exchange => result?,
        };
        log::info!(target: LOG_TARGET, "Response received (status: {})", status);

        let mut response: ServiceResponse = serde_json::from_slice(&bytes).map_err(|e| {
            log::error!(target: LOG_TARGET, "Failed to decode response: {}", e);
            NoteError::Encoding(format!("failed to decode response: {}", e))
        })?;

        if status != StatusCode::OK {
            log::error!(
                target: LOG_TARGET,
                "Request failed with status {}: {}",
                status.as_u16(),
                response.message
            );
            return Err(NoteError::Status {
                status: status.as_u16(),
                response: Box::new(response),
            });
        }

        let memo = match response.memo.take() {
            Some(memo) if !memo.slug.is_empty() => memo,
            _ => {
                log::error!(
                    target: LOG_TARGET,
                    "No memo in response (code {}): {}",
                    response.code,
                    response.message
                );
                return Err(NoteError::MissingMemo {
                    response: Box::new(response),
                });
            }
        };

        log::info!(target: LOG_TARGET, "Note sent successfully (took {:?})", start.elapsed());
        log::info!(
            target: LOG_TARGET,
            "Memo details - CreatedAt: {}, Tags: {:?}",
            memo.created_at,
            memo.tags
        );

        Ok(NoteReceipt {
            code: response.code,
            message: response.message,
            memo,
        })
    }

    fn classify(&self, err: reqwest::Error) -> NoteError {
        if err.is_timeout() {
            NoteError::Timeout(self.timeout.as_secs())
        } else if err.is_builder() {
            NoteError::Encoding(format!("failed to create request: {}", err))
        } else {
            NoteError::Transport(err.to_string())
        }
    }
}
