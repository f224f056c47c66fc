//! `[FILES: a.png, b.jpg]` markup in user text.
//!
//! References are stripped from the visible text and resolved best-effort
//! against the artifact store; the resulting user turn never drops the
//! user's words.

use std::sync::LazyLock;

use futures::future::join_all;
use regex::Regex;
use tracing::{debug, warn};

use crate::artifacts::ArtifactStore;
use crate::live::{Content, Part};

static FILES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[\s*files?\s*:([^\]]*)\]").expect("static regex is valid")
});

static SPACES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]{2,}").expect("static regex is valid"));

/// Text with its artifact references pulled out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedRefs {
    /// Text with every markup occurrence removed.
    pub cleaned: String,
    /// Referenced filenames, de-duplicated in first-seen order.
    pub filenames: Vec<String>,
}

/// Extract every `[FILE: ...]` / `[FILES: ...]` occurrence.
pub fn extract_references(text: &str) -> ExtractedRefs {
    let mut filenames: Vec<String> = Vec::new();
    for caps in FILES_RE.captures_iter(text) {
        for name in caps[1].split([',', ';']) {
            let name = name.trim().trim_matches(['"', '\'', '`']).trim();
            if !name.is_empty() && !filenames.iter().any(|n| n == name) {
                filenames.push(name.to_string());
            }
        }
    }

    let stripped = FILES_RE.replace_all(text, "");
    let cleaned = SPACES_RE.replace_all(&stripped, " ").trim().to_string();
    ExtractedRefs { cleaned, filenames }
}

/// Build the outbound user turn for a text message.
///
/// Parts are the cleaned text (if non-empty) followed by every artifact that
/// resolved. When that leaves nothing, the original text is sent verbatim.
/// Returns `None` only for empty input.
pub async fn build_user_turn(text: &str, artifacts: &dyn ArtifactStore) -> Option<Content> {
    if text.is_empty() {
        return None;
    }

    let refs = extract_references(text);
    let mut parts = Vec::with_capacity(refs.filenames.len() + 1);
    if !refs.cleaned.is_empty() {
        parts.push(Part::Text(refs.cleaned));
    }

    let loads = refs.filenames.iter().map(|name| artifacts.load(name));
    for (name, result) in refs.filenames.iter().zip(join_all(loads).await) {
        match result {
            Ok(Some(blob)) => {
                debug!(filename = %name, mime = %blob.mime_type, "Attached artifact");
                parts.push(Part::Inline(blob));
            }
            Ok(None) => warn!(filename = %name, "Referenced artifact not found"),
            Err(e) => warn!(filename = %name, error = %e, "Failed to load artifact"),
        }
    }

    if parts.is_empty() {
        parts.push(Part::Text(text.to_string()));
    }
    Some(Content::user(parts))
}
