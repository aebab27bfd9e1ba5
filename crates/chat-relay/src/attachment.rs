//! Uploaded files handed to the relay.
//!
//! The multipart layer that receives uploads is responsible for size limits
//! and for rejecting parts outright; by the time an [`Attachment`] reaches
//! this crate it is an in-memory buffer with a name and a declared media type.

use serde::Serialize;
use std::path::Path;
use std::str::Utf8Error;

/// Media type assumed when the uploader did not declare one.
pub const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

/// An uploaded file held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Original file name as sent by the client.
    pub name: String,
    /// Declared MIME type, e.g. `image/png` or `text/plain; charset=utf-8`.
    pub media_type: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

/// How an attachment is turned into content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    /// Sent as a base64 data URL, never truncated.
    Image,
    /// Decoded as UTF-8 and sent as a labelled text part.
    TextLike,
    /// Dropped and reported in `skippedFiles`.
    Unsupported,
}

impl Attachment {
    /// Creates an attachment. An empty media type falls back to
    /// [`DEFAULT_MEDIA_TYPE`].
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        let media_type = media_type.into();
        Self {
            name: name.into(),
            media_type: if media_type.trim().is_empty() {
                DEFAULT_MEDIA_TYPE.to_string()
            } else {
                media_type
            },
            bytes,
        }
    }

    /// Reads a local file, guessing its media type from the extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let media_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or(DEFAULT_MEDIA_TYPE);
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();

        Ok(Self::new(name, media_type, bytes))
    }

    /// The media type without parameters, lowercased (`Text/Plain; charset=x` → `text/plain`).
    pub fn essence(&self) -> String {
        media_type_essence(&self.media_type)
    }

    /// Classifies this attachment by its declared media type.
    pub fn kind(&self) -> AttachmentKind {
        let essence = self.essence();
        if essence.starts_with("image/") {
            AttachmentKind::Image
        } else if essence.starts_with("text/")
            || essence == "application/json"
            || essence == "application/xml"
        {
            AttachmentKind::TextLike
        } else {
            AttachmentKind::Unsupported
        }
    }

    /// Decodes the contents as UTF-8.
    pub fn decode_text(&self) -> Result<&str, Utf8Error> {
        std::str::from_utf8(&self.bytes)
    }

    /// Size of the contents in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

pub(crate) fn media_type_essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Which declared media types are let through to payload assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MediaTypeFilter {
    /// Everything is classified normally.
    #[default]
    Any,
    /// Only matching media types; entries may end in `/*` (e.g. `image/*`).
    Only(Vec<String>),
}

impl MediaTypeFilter {
    pub fn only<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(
            patterns
                .into_iter()
                .map(|p| p.into().trim().to_ascii_lowercase())
                .collect(),
        )
    }

    pub fn accepts(&self, media_type: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Only(patterns) => {
                let essence = media_type_essence(media_type);
                patterns.iter().any(|pattern| match pattern.strip_suffix("/*") {
                    Some(family) => essence
                        .split_once('/')
                        .is_some_and(|(top, _)| top == family),
                    None => *pattern == essence,
                })
            }
        }
    }
}

/// Metadata echoed back for an upload; file contents are never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedFile {
    pub originalname: String,
    pub size: usize,
    pub mimetype: String,
}

/// Acknowledgement of an upload request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReceipt {
    pub ok: bool,
    pub files: Vec<UploadedFile>,
    pub persisted: bool,
}

impl UploadReceipt {
    /// Describes the given attachments without touching their contents.
    pub fn from_attachments(attachments: &[Attachment]) -> Self {
        Self {
            ok: true,
            files: attachments
                .iter()
                .map(|a| UploadedFile {
                    originalname: a.name.clone(),
                    size: a.size(),
                    mimetype: a.media_type.clone(),
                })
                .collect(),
            persisted: false,
        }
    }
}
