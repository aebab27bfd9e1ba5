//! Wire types and the HTTP transport for the chat-completion endpoint.
//!
//! [`CompletionTransport`] is the seam between retry policy and the network:
//! one call is one attempt. The production implementation is
//! [`HttpTransport`]; tests substitute scripted transports.

use crate::config::RelayConfig;
use crate::content::ContentPart;
use crate::error::TransportFailure;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Value, json};
use std::fmt;
use tracing::debug;

/// Body substituted when the upstream response is not valid JSON.
pub fn invalid_json_sentinel() -> Value {
    json!({ "error": "Invalid JSON response" })
}

/// Request body for `POST <endpoint>`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

impl CompletionRequest {
    /// An optional system message followed by a single user message.
    pub fn new(
        model: impl Into<String>,
        system_prompt: Option<&str>,
        parts: Vec<ContentPart>,
    ) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_prompt {
            messages.push(ChatMessage {
                role: Role::System,
                content: MessageContent::Text(system.to_string()),
            });
        }
        messages.push(ChatMessage {
            role: Role::User,
            content: MessageContent::Parts(parts),
        });

        Self {
            model: model.into(),
            messages,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// An HTTP response from the upstream, whatever its status.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Value,
}

impl UpstreamResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs a single attempt against the completion endpoint.
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    /// Sends `request` once.
    ///
    /// Returns `Ok` whenever an HTTP response arrived, including error
    /// statuses. Returns `Err` only when the network layer failed.
    async fn send(
        &self,
        request: &CompletionRequest,
    ) -> Result<UpstreamResponse, TransportFailure>;
}

/// `reqwest`-backed transport with bearer auth and site identification headers.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    api_key: String,
    site_url: String,
    site_name: String,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint)
            .field("site_url", &self.site_url)
            .field("site_name", &self.site_name)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Creates a transport from configuration.
    ///
    /// # Errors
    ///
    /// Fails if the underlying HTTP client cannot be constructed.
    pub fn new(config: &RelayConfig) -> Result<Self, TransportFailure> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            site_url: config.site_url.clone(),
            site_name: config.site_name.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Builds the HTTP request without sending it.
    pub fn build_request(
        &self,
        body: &CompletionRequest,
    ) -> Result<reqwest::Request, reqwest::Error> {
        self.client
            .post(&self.endpoint)
            .header("Content-Type", "application/json; charset=UTF-8")
            .header("Accept", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", &self.site_url)
            .header("X-Title", &self.site_name)
            .json(body)
            .build()
    }
}

#[async_trait]
impl CompletionTransport for HttpTransport {
    async fn send(
        &self,
        request: &CompletionRequest,
    ) -> Result<UpstreamResponse, TransportFailure> {
        let http_request = self.build_request(request)?;
        let response = self.client.execute(http_request).await?;

        let status = response.status().as_u16();
        let body = match response.bytes().await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|err| {
                debug!(status, error = %err, "upstream body is not JSON");
                invalid_json_sentinel()
            }),
            Err(err) => {
                debug!(status, error = %err, "failed to read upstream body");
                invalid_json_sentinel()
            }
        };

        Ok(UpstreamResponse::new(status, body))
    }
}
