//! The chat request pipeline: request fields in, JSON-ready response out.
//!
//! One [`ChatPipeline`] serves every request of a given [`ChatProfile`].
//! Variants of the chat endpoint (a plain one, one with a system prompt and
//! a stricter upload filter, ...) are just different profiles over the same
//! pipeline.

use crate::attachment::Attachment;
use crate::builder::{Diagnostics, PayloadBuilder};
use crate::client::CompletionClient;
use crate::config::RelayConfig;
use crate::dataset::{DatasetLoader, NoDataset};
use crate::error::RelayError;
use crate::transport::{CompletionTransport, HttpTransport};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, instrument};

pub use crate::attachment::MediaTypeFilter;

/// Per-endpoint behaviour of the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatProfile {
    pub system_prompt: Option<String>,
    pub accepted_media_types: MediaTypeFilter,
}

impl ChatProfile {
    /// No system prompt, every upload accepted.
    pub fn general() -> Self {
        Self::default()
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_filter(mut self, filter: MediaTypeFilter) -> Self {
        self.accepted_media_types = filter;
        self
    }
}

/// Parses a form flag: case-insensitive `"true"` is true, anything else false.
pub fn parse_flag(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

/// Fields of one inbound chat request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
    pub include_dataset: bool,
    pub documents: Vec<Attachment>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Builds a request from raw form fields as delivered by the HTTP layer.
    ///
    /// `include_flag` is the `includeEmployees`/`includeDataset` field.
    pub fn from_form(
        message: Option<&str>,
        include_flag: Option<&str>,
        documents: Vec<Attachment>,
    ) -> Self {
        Self {
            message: message.unwrap_or_default().to_string(),
            include_dataset: parse_flag(include_flag),
            documents,
        }
    }

    pub fn with_dataset(mut self, include: bool) -> Self {
        self.include_dataset = include;
        self
    }

    pub fn with_document(mut self, document: Attachment) -> Self {
        self.documents.push(document);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRef {
    pub originalname: String,
}

/// JSON body returned to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FileRef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnostics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl ChatReply {
    fn failure(error: Value) -> Self {
        Self {
            ok: false,
            reply: None,
            files: None,
            diagnostics: None,
            error: Some(error),
        }
    }
}

/// Status code plus body, ready for the HTTP layer to write out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResponse {
    pub status: u16,
    pub body: ChatReply,
}

impl ChatResponse {
    /// A failed response carrying the error's message.
    pub fn from_error(err: &RelayError) -> Self {
        Self {
            status: err.status_code(),
            body: ChatReply::failure(Value::String(err.to_string())),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Assembles, sends and normalizes chat requests.
pub struct ChatPipeline<T = HttpTransport> {
    client: CompletionClient<T>,
    builder: PayloadBuilder,
    loader: Arc<dyn DatasetLoader + Send + Sync>,
    profile: ChatProfile,
}

impl ChatPipeline<HttpTransport> {
    /// Creates an HTTP-backed pipeline from configuration.
    pub fn from_config(config: &RelayConfig, profile: ChatProfile) -> Result<Self, RelayError> {
        Ok(Self::new(CompletionClient::from_config(config)?, profile))
    }
}

impl<T: CompletionTransport> ChatPipeline<T> {
    pub fn new(client: CompletionClient<T>, profile: ChatProfile) -> Self {
        Self {
            client,
            builder: PayloadBuilder::new().with_filter(profile.accepted_media_types.clone()),
            loader: Arc::new(NoDataset),
            profile,
        }
    }

    /// Replaces the payload builder. The profile's media type filter still applies.
    pub fn with_builder(mut self, builder: PayloadBuilder) -> Self {
        self.builder = builder.with_filter(self.profile.accepted_media_types.clone());
        self
    }

    pub fn with_dataset_loader(
        mut self,
        loader: impl DatasetLoader + Send + Sync + 'static,
    ) -> Self {
        self.loader = Arc::new(loader);
        self
    }

    pub fn profile(&self) -> &ChatProfile {
        &self.profile
    }

    pub fn client(&self) -> &CompletionClient<T> {
        &self.client
    }

    /// Handles one request. Never fails: every error becomes a response.
    ///
    /// On success `files` echoes every uploaded document, including those
    /// listed in `diagnostics.skippedFiles`.
    #[instrument(
        skip_all,
        fields(documents = request.documents.len(), include_dataset = request.include_dataset)
    )]
    pub async fn handle(&self, request: ChatRequest) -> ChatResponse {
        let files: Vec<FileRef> = request
            .documents
            .iter()
            .map(|d| FileRef {
                originalname: d.name.clone(),
            })
            .collect();

        let built = self.builder.build(
            &request.message,
            &request.documents,
            request.include_dataset,
            self.loader.as_ref(),
        );
        let (parts, diagnostics) = built.into_parts();

        let upstream = match self
            .client
            .complete(self.profile.system_prompt.as_deref(), parts)
            .await
        {
            Ok(upstream) => upstream,
            Err(err) => {
                error!(error = %err, "chat request failed");
                return ChatResponse::from_error(&err);
            }
        };

        if !upstream.is_success() {
            return ChatResponse {
                status: upstream.status,
                body: ChatReply::failure(upstream.body),
            };
        }

        let reply = upstream.reply_text();
        info!(reply_chars = reply.chars().count(), "chat request completed");

        ChatResponse {
            status: 200,
            body: ChatReply {
                ok: true,
                reply: Some(reply),
                files: Some(files),
                diagnostics: Some(diagnostics),
                error: None,
            },
        }
    }
}

/// A chat endpoint whose configuration may be unusable.
///
/// Missing credentials are detected once at startup; the endpoint then
/// answers every request with a 500 instead of bringing the process down.
pub enum ChatEndpoint<T = HttpTransport> {
    Ready(ChatPipeline<T>),
    Misconfigured(RelayError),
}

impl ChatEndpoint<HttpTransport> {
    /// Builds an endpoint from the process environment.
    pub fn from_env(profile: ChatProfile) -> Self {
        match RelayConfig::try_from_env().and_then(|c| ChatPipeline::from_config(&c, profile)) {
            Ok(pipeline) => Self::Ready(pipeline),
            Err(err) => {
                error!(error = %err, "chat endpoint is misconfigured");
                Self::Misconfigured(err)
            }
        }
    }
}

impl<T: CompletionTransport> ChatEndpoint<T> {
    pub async fn handle(&self, request: ChatRequest) -> ChatResponse {
        match self {
            Self::Ready(pipeline) => pipeline.handle(request).await,
            Self::Misconfigured(err) => ChatResponse::from_error(err),
        }
    }
}
