//! Per-request text character budget.

/// Returns the prefix of `text` holding at most `max_chars` characters,
/// and whether anything was cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (&text[..byte_idx], true),
        None => (text, false),
    }
}

/// Running count of text characters a single request has consumed.
///
/// Created fresh for every build and dropped afterwards; it is never shared
/// between requests.
#[derive(Debug, Clone)]
pub struct TextBudget {
    ceiling: usize,
    consumed: usize,
}

impl TextBudget {
    pub fn new(ceiling: usize) -> Self {
        Self {
            ceiling,
            consumed: 0,
        }
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn remaining(&self) -> usize {
        self.ceiling.saturating_sub(self.consumed)
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Admits as much of `text` as the budget allows and charges for it.
    ///
    /// Returns `None` for empty text or when the budget is already spent, so
    /// callers never emit an empty part.
    pub fn admit(&mut self, text: &str) -> Option<String> {
        if text.is_empty() || self.is_exhausted() {
            return None;
        }

        let (slice, _) = truncate_chars(text, self.remaining());
        self.consumed += slice.chars().count();
        Some(slice.to_string())
    }
}
