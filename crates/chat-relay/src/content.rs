//! Content parts of a multimodal user message.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use serde::{Serialize, Serializer};

/// One atomic unit of a user message: either text or an inline image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    /// Plain text.
    Text { value: String },
    /// An image carried inline as base64.
    ImageRef {
        media_type: String,
        base64_data: String,
    },
}

impl ContentPart {
    /// Creates a text part.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text {
            value: value.into(),
        }
    }

    /// Creates an image part by base64-encoding raw bytes.
    pub fn image(media_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::ImageRef {
            media_type: media_type.into(),
            base64_data: BASE64_STANDARD.encode(bytes),
        }
    }

    /// Returns the text of a `Text` part.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { value } => Some(value),
            Self::ImageRef { .. } => None,
        }
    }

    /// Number of characters this part consumes from the text budget.
    pub fn text_chars(&self) -> usize {
        self.as_text().map_or(0, |t| t.chars().count())
    }

    /// `data:` URL form of an `ImageRef` part.
    pub fn data_url(&self) -> Option<String> {
        match self {
            Self::ImageRef {
                media_type,
                base64_data,
            } => Some(format!("data:{media_type};base64,{base64_data}")),
            Self::Text { .. } => None,
        }
    }
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

// Chat-completion wire shape: `{"type":"text","text":..}` or
// `{"type":"image_url","image_url":{"url":"data:..."}}`.
impl Serialize for ContentPart {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(2))?;

        match self {
            ContentPart::Text { value } => {
                map.serialize_entry("type", "text")?;
                map.serialize_entry("text", value)?;
            }
            ContentPart::ImageRef { .. } => {
                map.serialize_entry("type", "image_url")?;
                map.serialize_entry(
                    "image_url",
                    &ImageUrl {
                        url: self.data_url().unwrap_or_default(),
                    },
                )?;
            }
        }

        map.end()
    }
}
