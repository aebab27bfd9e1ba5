//! Completion client: one request, bounded retries, no interpretation of
//! the upstream status beyond logging.

use crate::config::RelayConfig;
use crate::content::ContentPart;
use crate::error::RelayError;
use crate::retry::{RetryPolicy, retry_transport};
use crate::transport::{CompletionRequest, CompletionTransport, HttpTransport, UpstreamResponse};
use tracing::{debug, instrument, warn};

/// Sends assembled payloads to the chat-completion endpoint.
#[derive(Debug, Clone)]
pub struct CompletionClient<T = HttpTransport> {
    transport: T,
    model: String,
    policy: RetryPolicy,
}

impl CompletionClient<HttpTransport> {
    /// Creates a client that talks HTTP to the configured endpoint.
    pub fn from_config(config: &RelayConfig) -> Result<Self, RelayError> {
        let transport = HttpTransport::new(config)
            .map_err(|err| RelayError::Config(format!("Failed to create HTTP client: {err}")))?;
        Ok(Self::new(transport, config.model.clone()))
    }
}

impl<T: CompletionTransport> CompletionClient<T> {
    pub fn new(transport: T, model: impl Into<String>) -> Self {
        Self {
            transport,
            model: model.into(),
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends `parts` as one user message, preceded by an optional system message.
    ///
    /// Network failures are retried per the [`RetryPolicy`]. Any HTTP
    /// response, including 4xx/5xx, is returned on the first attempt that
    /// produces it.
    #[instrument(skip_all, fields(model = %self.model, parts = parts.len()))]
    pub async fn complete(
        &self,
        system_prompt: Option<&str>,
        parts: Vec<ContentPart>,
    ) -> Result<UpstreamResponse, RelayError> {
        let request = CompletionRequest::new(self.model.as_str(), system_prompt, parts);

        let response = retry_transport(&self.policy, |attempt| {
            debug!(attempt, "sending completion request");
            self.transport.send(&request)
        })
        .await?;

        if response.is_success() {
            debug!(status = response.status, "completion received");
        } else {
            warn!(status = response.status, "upstream rejected completion request");
        }

        Ok(response)
    }
}
