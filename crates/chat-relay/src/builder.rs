//! Payload assembly under text budgets.
//!
//! [`PayloadBuilder::build`] turns a user message, an optional reference
//! dataset and a list of uploaded files into an ordered sequence of
//! [`ContentPart`]s:
//!
//! 1. the user message,
//! 2. the reference dataset (when requested and present),
//! 3. each attachment, in input order.
//!
//! All text shares one global character budget. Text files are additionally
//! capped per file. Images are never counted or truncated. Every lossy step
//! is reported in [`Diagnostics`].

use crate::attachment::{Attachment, AttachmentKind, MediaTypeFilter};
use crate::budget::{TextBudget, truncate_chars};
use crate::content::ContentPart;
use crate::dataset::{DatasetLoader, ReductionRule};
use serde::Serialize;
use tracing::{debug, info};

/// Total characters allowed across all text parts of one request.
pub const MAX_TOTAL_TEXT_CHARS: usize = 200_000;
/// Characters kept from a single text-like file.
pub const MAX_FILE_CHARS: usize = 30_000;
/// Serialized dataset length above which reduction is attempted.
pub const DATASET_REDUCE_THRESHOLD: usize = 200_000;
/// Label placed in front of the reference dataset.
pub const DEFAULT_DATASET_LABEL: &str = "Employees JSON:";

/// Size limits applied during one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildLimits {
    pub max_total_text_chars: usize,
    pub max_file_chars: usize,
    pub dataset_reduce_threshold: usize,
}

impl Default for BuildLimits {
    fn default() -> Self {
        Self {
            max_total_text_chars: MAX_TOTAL_TEXT_CHARS,
            max_file_chars: MAX_FILE_CHARS,
            dataset_reduce_threshold: DATASET_REDUCE_THRESHOLD,
        }
    }
}

/// Record of lossy reductions made while building one payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    /// Attachments that produced no content because of their media type,
    /// in input order.
    pub skipped_files: Vec<String>,
    /// Text attachments cut down to the per-file ceiling.
    pub truncated_files: Vec<String>,
    /// Whether the reference dataset was shrunk.
    pub reduced_dataset: bool,
}

impl Diagnostics {
    /// True when nothing was lost.
    pub fn is_clean(&self) -> bool {
        self.skipped_files.is_empty() && self.truncated_files.is_empty() && !self.reduced_dataset
    }
}

/// The result of a build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuiltPayload {
    pub parts: Vec<ContentPart>,
    pub diagnostics: Diagnostics,
}

impl BuiltPayload {
    /// Sum of characters across all text parts.
    pub fn text_chars(&self) -> usize {
        self.parts.iter().map(ContentPart::text_chars).sum()
    }

    pub fn into_parts(self) -> (Vec<ContentPart>, Diagnostics) {
        (self.parts, self.diagnostics)
    }
}

/// Assembles content parts. Stateless between builds; share it freely.
#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    limits: BuildLimits,
    reduction: ReductionRule,
    dataset_label: String,
    filter: MediaTypeFilter,
}

impl Default for PayloadBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PayloadBuilder {
    pub fn new() -> Self {
        Self {
            limits: BuildLimits::default(),
            reduction: ReductionRule::default(),
            dataset_label: DEFAULT_DATASET_LABEL.to_string(),
            filter: MediaTypeFilter::Any,
        }
    }

    pub fn with_limits(mut self, limits: BuildLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_reduction(mut self, rule: ReductionRule) -> Self {
        self.reduction = rule;
        self
    }

    pub fn with_dataset_label(mut self, label: impl Into<String>) -> Self {
        self.dataset_label = label.into();
        self
    }

    /// Attachments whose media type the filter rejects are skipped before
    /// classification.
    pub fn with_filter(mut self, filter: MediaTypeFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn limits(&self) -> &BuildLimits {
        &self.limits
    }

    /// Builds the content parts for one request.
    ///
    /// The loader is only consulted when `include_dataset` is true.
    /// Attachments that cannot be decoded are dropped without a diagnostic.
    pub fn build(
        &self,
        message: &str,
        attachments: &[Attachment],
        include_dataset: bool,
        loader: &dyn DatasetLoader,
    ) -> BuiltPayload {
        let mut parts = Vec::new();
        let mut diagnostics = Diagnostics::default();
        let mut budget = TextBudget::new(self.limits.max_total_text_chars);

        push_text(&mut parts, &mut budget, message);

        if include_dataset {
            if let Some(text) = self.dataset_text(loader, &mut diagnostics) {
                push_text(&mut parts, &mut budget, &text);
            }
        }

        for attachment in attachments {
            if !self.filter.accepts(&attachment.media_type) {
                debug!(
                    file = %attachment.name,
                    media_type = %attachment.media_type,
                    "media type not accepted by filter"
                );
                diagnostics.skipped_files.push(attachment.name.clone());
                continue;
            }

            match attachment.kind() {
                AttachmentKind::Image => {
                    let media_type = attachment.essence();
                    debug!(file = %attachment.name, %media_type, "attaching image");
                    parts.push(ContentPart::image(media_type, &attachment.bytes));
                }
                AttachmentKind::TextLike => {
                    let Ok(text) = attachment.decode_text() else {
                        debug!(file = %attachment.name, "dropping undecodable text attachment");
                        continue;
                    };

                    let (text, truncated) = truncate_chars(text, self.limits.max_file_chars);
                    if truncated {
                        info!(
                            file = %attachment.name,
                            max_chars = self.limits.max_file_chars,
                            "truncated text attachment"
                        );
                        diagnostics.truncated_files.push(attachment.name.clone());
                    }

                    let labelled = format!("File: {}\n{}", attachment.name, text);
                    push_text(&mut parts, &mut budget, &labelled);
                }
                AttachmentKind::Unsupported => {
                    debug!(
                        file = %attachment.name,
                        media_type = %attachment.media_type,
                        "skipping unsupported attachment"
                    );
                    diagnostics.skipped_files.push(attachment.name.clone());
                }
            }
        }

        debug!(
            parts = parts.len(),
            text_chars = budget.consumed(),
            "payload assembled"
        );

        BuiltPayload { parts, diagnostics }
    }

    fn dataset_text(
        &self,
        loader: &dyn DatasetLoader,
        diagnostics: &mut Diagnostics,
    ) -> Option<String> {
        let dataset = loader.load()?;

        let mut content = dataset.raw().to_string();
        if dataset.char_len() > self.limits.dataset_reduce_threshold {
            match dataset.reduce(&self.reduction) {
                Some(reduced) => {
                    info!(
                        original_chars = dataset.char_len(),
                        reduced_chars = reduced.chars().count(),
                        "reduced reference dataset"
                    );
                    diagnostics.reduced_dataset = true;
                    content = reduced;
                }
                None => debug!("reference dataset is not reducible, sending as is"),
            }
        }

        Some(format!("{}\n{}", self.dataset_label, content))
    }
}

fn push_text(parts: &mut Vec<ContentPart>, budget: &mut TextBudget, text: &str) {
    if let Some(admitted) = budget.admit(text) {
        parts.push(ContentPart::text(admitted));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{NoDataset, ReferenceDataset};
    use serde_json::{Value, json};

    fn text_file(name: &str, len: usize) -> Attachment {
        Attachment::new(name, "text/plain", "x".repeat(len).into_bytes())
    }

    #[test]
    fn test_empty_request_yields_no_parts() {
        let built = PayloadBuilder::new().build("", &[], false, &NoDataset);
        assert!(built.parts.is_empty());
        assert!(built.diagnostics.is_clean());
    }

    #[test]
    fn test_message_only() {
        let built = PayloadBuilder::new().build("hi there", &[], false, &NoDataset);
        assert_eq!(built.parts, vec![ContentPart::text("hi there")]);
    }

    #[test]
    fn test_order_message_dataset_attachments() {
        let loader = || Some(ReferenceDataset::new(r#"{"employees":[]}"#));
        let attachments = vec![
            Attachment::new("a.png", "image/png", vec![1, 2, 3]),
            Attachment::new("b.txt", "text/plain", b"bee".to_vec()),
        ];

        let built = PayloadBuilder::new().build("question", &attachments, true, &loader);

        assert_eq!(built.parts.len(), 4);
        assert_eq!(built.parts[0].as_text(), Some("question"));
        assert_eq!(
            built.parts[1].as_text(),
            Some("Employees JSON:\n{\"employees\":[]}")
        );
        assert!(matches!(built.parts[2], ContentPart::ImageRef { .. }));
        assert_eq!(built.parts[3].as_text(), Some("File: b.txt\nbee"));
    }

    #[test]
    fn test_dataset_excluded_when_not_requested() {
        let loader = || Some(ReferenceDataset::new("{}"));
        let built = PayloadBuilder::new().build("q", &[], false, &loader);
        assert_eq!(built.parts.len(), 1);
        assert!(!built.diagnostics.reduced_dataset);
    }

    #[test]
    fn test_dataset_requested_but_absent() {
        let built = PayloadBuilder::new().build("q", &[], true, &NoDataset);
        assert_eq!(built.parts.len(), 1);
    }

    #[test]
    fn test_per_file_truncation() {
        let attachments = [text_file("big.txt", 40_000)];
        let built = PayloadBuilder::new().build("", &attachments, false, &NoDataset);

        let expected = format!("File: big.txt\n{}", "x".repeat(MAX_FILE_CHARS));
        assert_eq!(built.parts[0].as_text(), Some(expected.as_str()));
        assert_eq!(built.diagnostics.truncated_files, vec!["big.txt".to_string()]);
    }

    #[test]
    fn test_file_at_ceiling_is_not_truncated() {
        let attachments = [text_file("exact.txt", MAX_FILE_CHARS)];
        let built = PayloadBuilder::new().build("", &attachments, false, &NoDataset);
        assert!(built.diagnostics.truncated_files.is_empty());
    }

    #[test]
    fn test_unsupported_files_are_skipped() {
        let attachments = vec![
            Attachment::new("doc.pdf", "application/pdf", vec![0x25, 0x50]),
            Attachment::new("bin", "", vec![0]),
        ];
        let built = PayloadBuilder::new().build("", &attachments, false, &NoDataset);

        assert!(built.parts.is_empty());
        assert_eq!(
            built.diagnostics.skipped_files,
            vec!["doc.pdf".to_string(), "bin".to_string()]
        );
    }

    #[test]
    fn test_filtered_and_unsupported_skips_keep_input_order() {
        let attachments = vec![
            Attachment::new("notes.txt", "text/plain", b"n".to_vec()),
            Attachment::new("face.jpg", "image/jpeg", vec![0xff, 0xd8]),
            Attachment::new("scan.tiff", "application/x-tiff", vec![0]),
            Attachment::new("data.json", "application/json", b"{}".to_vec()),
        ];
        let builder = PayloadBuilder::new()
            .with_filter(MediaTypeFilter::only(["image/*", "application/x-tiff"]));

        let built = builder.build("", &attachments, false, &NoDataset);

        assert_eq!(built.parts.len(), 1);
        assert!(matches!(built.parts[0], ContentPart::ImageRef { .. }));
        assert_eq!(
            built.diagnostics.skipped_files,
            vec![
                "notes.txt".to_string(),
                "scan.tiff".to_string(),
                "data.json".to_string()
            ]
        );
    }

    #[test]
    fn test_image_data_url_uses_media_type_essence() {
        let attachments = [Attachment::new("x.png", "Image/PNG; name=x", vec![1, 2, 3])];
        let built = PayloadBuilder::new().build("", &attachments, false, &NoDataset);

        assert_eq!(
            built.parts,
            vec![ContentPart::image("image/png", &[1, 2, 3])]
        );
        assert_eq!(
            serde_json::to_value(&built.parts[0]).unwrap()["image_url"]["url"],
            "data:image/png;base64,AQID"
        );
    }

    #[test]
    fn test_undecodable_text_is_dropped_silently() {
        let attachments = vec![
            Attachment::new("bad.txt", "text/plain", vec![0xff, 0xfe]),
            Attachment::new("good.txt", "text/plain", b"ok".to_vec()),
        ];
        let built = PayloadBuilder::new().build("", &attachments, false, &NoDataset);

        assert_eq!(built.parts, vec![ContentPart::text("File: good.txt\nok")]);
        assert!(built.diagnostics.is_clean());
    }

    #[test]
    fn test_global_budget_caps_text_but_not_images() {
        let limits = BuildLimits {
            max_total_text_chars: 20,
            ..BuildLimits::default()
        };
        let attachments = vec![
            text_file("a.txt", 50),
            Attachment::new("pic.png", "image/png", vec![9; 64]),
            text_file("b.txt", 50),
        ];

        let built = PayloadBuilder::new()
            .with_limits(limits)
            .build("0123456789", &attachments, false, &NoDataset);

        assert_eq!(built.text_chars(), 20);
        assert_eq!(built.parts.len(), 3);
        assert_eq!(built.parts[1].as_text(), Some("File: a.tx"));
        assert!(matches!(built.parts[2], ContentPart::ImageRef { .. }));
    }

    #[test]
    fn test_total_text_never_exceeds_ceiling() {
        let attachments: Vec<Attachment> =
            (0..10).map(|i| text_file(&format!("f{i}.txt"), 35_000)).collect();
        let message = "m".repeat(50_000);

        let built = PayloadBuilder::new().build(&message, &attachments, false, &NoDataset);

        assert_eq!(built.text_chars(), MAX_TOTAL_TEXT_CHARS);
        assert_eq!(built.diagnostics.truncated_files.len(), 10);
    }

    #[test]
    fn test_oversized_dataset_is_reduced() {
        let records: Vec<Value> = (0..2_000)
            .map(|i| {
                json!({
                    "eid": i,
                    "name": format!("Person {i}"),
                    "email": format!("p{i}@example.com"),
                    "bio": "lorem ipsum dolor sit amet ".repeat(5),
                })
            })
            .collect();
        let raw = json!({ "employees": records }).to_string();
        assert!(raw.len() > DATASET_REDUCE_THRESHOLD);
        let loader = move || Some(ReferenceDataset::new(raw.clone()));

        let built = PayloadBuilder::new().build("", &[], true, &loader);

        assert!(built.diagnostics.reduced_dataset);
        let text = built.parts[0].as_text().unwrap();
        let json_text = text.strip_prefix("Employees JSON:\n").unwrap();
        let parsed: Value = serde_json::from_str(json_text).unwrap();
        let kept = parsed["employees"].as_array().unwrap();
        assert_eq!(kept.len(), 10);
        assert!(kept.iter().all(|r| r.get("bio").is_none()));
    }

    #[test]
    fn test_oversized_unreducible_dataset_is_sent_truncated() {
        let raw = "z".repeat(DATASET_REDUCE_THRESHOLD + 10);
        let loader = move || Some(ReferenceDataset::new(raw.clone()));

        let built = PayloadBuilder::new().build("", &[], true, &loader);

        assert!(!built.diagnostics.reduced_dataset);
        assert_eq!(built.text_chars(), MAX_TOTAL_TEXT_CHARS);
    }

    #[test]
    fn test_diagnostics_serialize_camel_case() {
        let diagnostics = Diagnostics {
            skipped_files: vec!["a.pdf".into()],
            truncated_files: vec![],
            reduced_dataset: true,
        };
        assert_eq!(
            serde_json::to_value(&diagnostics).unwrap(),
            json!({"skippedFiles": ["a.pdf"], "truncatedFiles": [], "reducedDataset": true})
        );
    }
}
