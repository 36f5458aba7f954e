//! Log redaction.
//!
//! [`scrub`] masks personal data and credentials in free text before it is
//! written to the logs: email local parts, phone-number-like digit runs, and
//! the values of `password=`, `token=`, `secret=` and `api_key=` pairs.
//! Driver errors routinely echo connection parameters, so every error
//! message a handler logs goes through here first.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Replacement for secret values.
const REDACTED: &str = "[REDACTED]";

/// Replacement for phone numbers.
const PHONE: &str = "[PHONE]";

/// Digit runs with at least this many digits are treated as phone numbers.
const PHONE_MIN_DIGITS: usize = 7;

// Patterns are literals; a failure to compile is a programming error.
#[allow(clippy::expect_used)]
static SECRET_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([a-z0-9_-]*(?:password|passwd|token|secret|apikey|api_key))([=:])\S+")
        .expect("invalid secret pattern")
});

#[allow(clippy::expect_used)]
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Za-z0-9])[A-Za-z0-9._%+-]*@([A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)+)")
        .expect("invalid email pattern")
});

// The regex crate has no look-around, so the boundary characters on either
// side are captured and written back.
#[allow(clippy::expect_used)]
static PHONE_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[^A-Za-z0-9])(\+?\(?\d[\d\s().-]{5,}\d)($|[^A-Za-z0-9])")
        .expect("invalid phone pattern")
});

/// Mask personal data and secrets in `input`.
#[must_use]
pub fn scrub(input: &str) -> String {
    let mut out = Cow::Borrowed(input);

    if SECRET_PAIR.is_match(&out) {
        out = Cow::Owned(
            SECRET_PAIR
                .replace_all(&out, format!("${{1}}${{2}}{REDACTED}"))
                .into_owned(),
        );
    }
    if EMAIL.is_match(&out) {
        out = Cow::Owned(EMAIL.replace_all(&out, "${1}***@${2}").into_owned());
    }
    if PHONE_RUN.is_match(&out) {
        out = Cow::Owned(PHONE_RUN.replace_all(&out, mask_phone).into_owned());
    }

    out.into_owned()
}

fn mask_phone(caps: &Captures<'_>) -> String {
    let run = &caps[2];
    let digits = run.chars().filter(char::is_ascii_digit).count();
    if digits < PHONE_MIN_DIGITS {
        return caps[0].to_owned();
    }
    format!("{}{PHONE}{}", &caps[1], &caps[3])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_email_local_part() {
        assert_eq!(
            scrub("signup from jane.doe@greenfield.org failed"),
            "signup from j***@greenfield.org failed"
        );
        assert_eq!(scrub("<admin@school.ke>"), "<a***@school.ke>");
    }

    #[test]
    fn masks_phone_numbers_with_separators() {
        assert_eq!(scrub("call +254 712 345678 today"), "call [PHONE] today");
        assert_eq!(scrub("phone=(020) 555-0199."), "phone=[PHONE].");
    }

    #[test]
    fn keeps_short_numbers_and_identifiers() {
        assert_eq!(scrub("limit 75 of 120 students"), "limit 75 of 120 students");
        assert_eq!(
            scrub("school 6f1c2a5e-8d4b-4b7a-9c1e-2f3a4b5c6d7e"),
            "school 6f1c2a5e-8d4b-4b7a-9c1e-2f3a4b5c6d7e"
        );
        assert_eq!(scrub("at 2026-10-19T10:00:00Z"), "at 2026-10-19T10:00:00Z");
    }

    #[test]
    fn masks_secret_pairs() {
        assert_eq!(
            scrub("postgres connect password=hunter2 host=db"),
            "postgres connect password=[REDACTED] host=db"
        );
        assert_eq!(scrub("x-api_key:abc123"), "x-api_key:[REDACTED]");
    }

    #[test]
    fn leaves_plain_text_alone() {
        let text = "school store lookup by code failed: connection reset";
        assert_eq!(scrub(text), text);
    }
}
