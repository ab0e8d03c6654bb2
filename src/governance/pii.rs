//! PII pattern table and sanitation, carried over in semantics from
//! `GobernanzaAgent.sanitize_prompt` (email / DNI-shaped / phone-shaped /
//! 16-digit card regexes), generalized into a small inspectable table in
//! the style of wg-bastion's `input::patterns::builtin_patterns()` (pack
//! sibling to the teacher).
//!
//! Per spec.md §9 Open Questions, the phone pattern is pinned to a
//! conservative digits-only, 8-12 character default with optional
//! separators; locale-aware detection is left to a future pluggable filter.

use std::sync::LazyLock;

use regex::Regex;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap());

static CARD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{4}[-.\s]?\d{4}[-.\s]?\d{4}[-.\s]?\d{4}\b").unwrap());

static DNI: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{7,8}\b").unwrap());

static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{2,4}[-.\s]?\d{4}[-.\s]?\d{4}\b").unwrap());

/// Order matters: the 16-digit card pattern and the 7-8 digit DNI pattern
/// would both match fragments of a phone-shaped number, so cards are
/// checked first (longest match wins), then DNI, then the looser phone
/// pattern last. Matches the order `sanitize_prompt` checks them in,
/// reordered so the most specific pattern consumes its text first.
fn patterns() -> [(&'static str, &'static LazyLock<Regex>, &'static str); 4] {
    [
        ("email", &EMAIL, "[EMAIL_REDACTED]"),
        ("credit_card", &CARD, "[CARD_REDACTED]"),
        ("dni", &DNI, "[DNI_REDACTED]"),
        ("phone", &PHONE, "[PHONE_REDACTED]"),
    ]
}

/// Replace every PII match with its fixed redaction token. Returns the
/// sanitized text and whether any substitution occurred. Never blocks —
/// sanitation only rewrites (spec.md §4.3).
#[must_use]
pub fn sanitize(text: &str) -> (String, bool) {
    let mut sanitized = text.to_string();
    let mut pii_found = false;

    for (_name, regex, replacement) in patterns() {
        if regex.is_match(&sanitized) {
            sanitized = regex.replace_all(&sanitized, replacement).to_string();
            pii_found = true;
        }
    }

    (sanitized, pii_found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_email() {
        let (out, found) = sanitize("contact me at juan@example.com please");
        assert!(found);
        assert!(out.contains("[EMAIL_REDACTED]"));
        assert!(!out.contains("juan@example.com"));
    }

    #[test]
    fn redacts_dni() {
        let (out, found) = sanitize("mi DNI es 12345678");
        assert!(found);
        assert!(out.contains("[DNI_REDACTED]"));
    }

    #[test]
    fn redacts_credit_card() {
        let (out, found) = sanitize("tarjeta 4111 1111 1111 1111");
        assert!(found);
        assert!(out.contains("[CARD_REDACTED]"));
        assert!(!out.contains("1111 1111 1111 1111"));
    }

    #[test]
    fn redacts_all_four_in_one_prompt() {
        let (out, found) = sanitize(
            "contact me at juan@example.com, DNI 12345678, tarjeta 4111 1111 1111 1111",
        );
        assert!(found);
        assert!(out.contains("[EMAIL_REDACTED]"));
        assert!(out.contains("[DNI_REDACTED]"));
        assert!(out.contains("[CARD_REDACTED]"));
    }

    #[test]
    fn leaves_clean_text_untouched() {
        let (out, found) = sanitize("what is a circular queue?");
        assert!(!found);
        assert_eq!(out, "what is a circular queue?");
    }
}
