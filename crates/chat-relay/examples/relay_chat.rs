//! Sends one chat request through the relay pipeline.
//!
//! # Run
//!
//! ```bash
//! export OPENROUTER_API_KEY=sk-or-...
//! cargo run --example relay_chat -- "Describe these files" notes.txt photo.png
//! ```
//!
//! Set `RELAY_DATASET=path/to/employees.json` to include a reference dataset.

use chat_relay::dataset::FileDatasetLoader;
use chat_relay::observability::{self, ObservabilityConfig};
use chat_relay::{Attachment, ChatEndpoint, ChatPipeline, ChatProfile, ChatRequest, RelayConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    observability::init(ObservabilityConfig::default())?;

    let mut args = std::env::args().skip(1);
    let message = args.next().unwrap_or_default();

    let mut documents = Vec::new();
    for path in args {
        match Attachment::from_path(&path).await {
            Ok(doc) => documents.push(doc),
            Err(err) => eprintln!("skipping {path}: {err}"),
        }
    }

    let dataset_path = std::env::var("RELAY_DATASET").ok();
    let request = ChatRequest::new(message).with_dataset(dataset_path.is_some());

    let endpoint = match RelayConfig::try_from_env()
        .and_then(|config| ChatPipeline::from_config(&config, ChatProfile::general()))
    {
        Ok(pipeline) => match dataset_path {
            Some(path) => {
                ChatEndpoint::Ready(pipeline.with_dataset_loader(FileDatasetLoader::new(path)))
            }
            None => ChatEndpoint::Ready(pipeline),
        },
        Err(err) => ChatEndpoint::Misconfigured(err),
    };

    let request = documents
        .into_iter()
        .fold(request, |request, doc| request.with_document(doc));
    let response = endpoint.handle(request).await;

    println!("HTTP {}", response.status);
    println!("{}", serde_json::to_string_pretty(&response.body)?);
    Ok(())
}
