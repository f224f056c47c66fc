//! Per-turn transcript accumulation and the interruption flag.

/// The current logical turn.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Turn {
    input_texts: Vec<String>,
    output_texts: Vec<String>,
    interrupted: bool,
}

impl Turn {
    pub fn push_input(&mut self, text: &str) {
        self.input_texts.push(text.to_string());
    }

    pub fn push_output(&mut self, text: &str) {
        self.output_texts.push(text.to_string());
    }

    /// Set the interrupted flag. Returns `true` only on the first call in a
    /// turn.
    pub const fn mark_interrupted(&mut self) -> bool {
        let first = !self.interrupted;
        self.interrupted = true;
        first
    }

    pub const fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    /// Input transcript, duplicates removed in first-seen order.
    pub fn input_transcript(&self) -> String {
        dedup_join(&self.input_texts)
    }

    /// Output transcript, duplicates removed in first-seen order.
    pub fn output_transcript(&self) -> String {
        dedup_join(&self.output_texts)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn dedup_join(texts: &[String]) -> String {
    let mut seen: Vec<&str> = Vec::with_capacity(texts.len());
    for text in texts {
        if !seen.contains(&text.as_str()) {
            seen.push(text);
        }
    }
    seen.join(" ")
}
