//! Transient vs fatal classification of backend stream failures.
//!
//! Backends report failures as free text, so this matches on the message:
//! connection resets, timeouts, gateway errors and abnormal close codes are
//! worth retrying; anything else is fatal.

use std::sync::LazyLock;

use regex::Regex;

static TRANSIENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        connection\s+reset | reset\s+by\s+peer | connection\s+aborted | broken\s+pipe
        | timed?\s*out | timeout | deadline
        | \b50[234]\b | bad\s+gateway | service\s+unavailable
        | \b10(06|11)\b",
    )
    .expect("static regex is valid")
});

/// Outcome of classifying a stream failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Transient,
    Fatal,
}

impl FailureClass {
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::Transient)
    }
}

/// Classify an error by its display text.
pub fn classify(message: &str) -> FailureClass {
    if TRANSIENT_RE.is_match(message) {
        FailureClass::Transient
    } else {
        FailureClass::Fatal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_messages() {
        for msg in [
            "HTTP error: 503 Service Unavailable",
            "upstream returned 502",
            "gateway 504",
            "IO error: Connection reset by peer (os error 104)",
            "Connection reset without closing handshake",
            "operation timed out",
            "Deadline Exceeded",
            "Stream closed: close code 1011: internal error",
            "Stream closed: close code 1006: abnormal",
        ] {
            assert_eq!(classify(msg), FailureClass::Transient, "{msg}");
        }
    }

    #[test]
    fn fatal_messages() {
        for msg in [
            "invalid credentials",
            "Stream closed: close code 1008: policy violation",
            "Connection error: missing API key for live endpoint",
            "request 15031 rejected",
        ] {
            assert_eq!(classify(msg), FailureClass::Fatal, "{msg}");
        }
    }
}
