//! `chat-relay` - size-bounded multimodal payloads for chat-completion APIs.
//!
//! The crate sits between an HTTP front end that has already parsed a
//! multipart upload and an OpenAI-compatible chat-completion endpoint
//! (OpenRouter by default). For each request it:
//!
//! 1. assembles the user's message, an optional reference dataset and the
//!    uploaded files into content parts under a global text budget
//!    ([`builder`]),
//! 2. sends them with bounded, linearly backed-off retries ([`client`]),
//! 3. extracts a single reply string from whatever shape comes back
//!    ([`normalize`]).
//!
//! Lossy steps (skipped, truncated or reduced content) are reported in
//! [`Diagnostics`] rather than as errors.
//!
//! # Example
//!
//! ```rust,no_run
//! use chat_relay::{Attachment, ChatPipeline, ChatProfile, ChatRequest, RelayConfig};
//! use chat_relay::dataset::FileDatasetLoader;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RelayConfig::try_from_env()?;
//! let pipeline = ChatPipeline::from_config(&config, ChatProfile::general())?
//!     .with_dataset_loader(FileDatasetLoader::new("employees.json"));
//!
//! let request = ChatRequest::new("Who worked on Apollo?")
//!     .with_dataset(true)
//!     .with_document(Attachment::new("notes.txt", "text/plain", b"...".to_vec()));
//!
//! let response = pipeline.handle(request).await;
//! println!("{}", serde_json::to_string(&response.body)?);
//! # Ok(())
//! # }
//! ```

pub mod attachment;
pub mod budget;
pub mod builder;
pub mod client;
pub mod config;
pub mod content;
pub mod dataset;
pub mod error;
pub mod normalize;
pub mod observability;
pub mod pipeline;
pub mod retry;
pub mod transport;

pub use attachment::{Attachment, AttachmentKind, MediaTypeFilter, UploadReceipt};
pub use builder::{BuildLimits, BuiltPayload, Diagnostics, PayloadBuilder};
pub use client::CompletionClient;
pub use config::RelayConfig;
pub use content::ContentPart;
pub use dataset::{DatasetLoader, ReferenceDataset};
pub use error::{RelayError, TransportFailure};
pub use normalize::extract_reply;
pub use pipeline::{ChatEndpoint, ChatPipeline, ChatProfile, ChatReply, ChatRequest, ChatResponse};
pub use retry::RetryPolicy;
pub use transport::{CompletionTransport, HttpTransport, UpstreamResponse};
