//! Label normalization for HTTP method and status code.
//!
//! Both functions are total. Known values are returned as `&'static str`
//! without allocating.

use std::borrow::Cow;

/// Standard HTTP verbs recognised without a warning.
pub const STANDARD_METHODS: [&str; 9] = [
    "GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS", "TRACE", "CONNECT",
];

/// Label used when the method is missing entirely.
pub const UNKNOWN_METHOD: &str = "UNKNOWN";
/// Label used for out-of-range or unparsable status codes.
pub const UNKNOWN_STATUS: &str = "unknown";

/// Uppercase and trim a raw method. Unknown verbs are kept (uppercased) and
/// logged at warn.
pub fn normalize_method(raw: &str) -> Cow<'static, str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        tracing::debug!("empty HTTP method, using UNKNOWN");
        return Cow::Borrowed(UNKNOWN_METHOD);
    }

    if let Some(known) = STANDARD_METHODS
        .iter()
        .find(|m| m.eq_ignore_ascii_case(trimmed))
    {
        return Cow::Borrowed(known);
    }

    let upper = trimmed.to_uppercase();
    tracing::warn!(original_method = %raw, normalized_method = %upper, "unknown HTTP method encountered");
    Cow::Owned(upper)
}

/// Decimal status label for codes in `[100, 599]`, `"unknown"` otherwise.
pub fn normalize_status(code: i64) -> Cow<'static, str> {
    if (100..=599).contains(&code) {
        Cow::Owned(code.to_string())
    } else {
        tracing::warn!(status_code = code, "status code outside valid HTTP range (100-599)");
        Cow::Borrowed(UNKNOWN_STATUS)
    }
}

/// Status label from a textual code (headers, upstream strings).
pub fn normalize_status_str(raw: &str) -> Cow<'static, str> {
    match raw.trim().parse::<i64>() {
        Ok(code) => normalize_status(code),
        Err(_) => {
            tracing::warn!(status_code = %raw, "invalid status code string format");
            Cow::Borrowed(UNKNOWN_STATUS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_methods_are_borrowed() {
        assert!(matches!(normalize_method(" get "), Cow::Borrowed("GET")));
        assert!(matches!(normalize_method("Patch"), Cow::Borrowed("PATCH")));
    }

    #[test]
    fn unknown_method_is_uppercased_not_rejected() {
        assert_eq!(normalize_method("propfind"), "PROPFIND");
        assert_eq!(normalize_method("   "), UNKNOWN_METHOD);
    }

    #[test]
    fn status_range() {
        assert_eq!(normalize_status(200), "200");
        assert_eq!(normalize_status(100), "100");
        assert_eq!(normalize_status(599), "599");
        assert_eq!(normalize_status(99), UNKNOWN_STATUS);
        assert_eq!(normalize_status(600), UNKNOWN_STATUS);
        assert_eq!(normalize_status(-1), UNKNOWN_STATUS);
    }

    #[test]
    fn status_from_text() {
        assert_eq!(normalize_status_str(" 404 "), "404");
        assert_eq!(normalize_status_str("OK"), UNKNOWN_STATUS);
        assert_eq!(normalize_status_str(""), UNKNOWN_STATUS);
    }
}
