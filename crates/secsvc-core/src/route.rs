//! Route pattern classification.
//!
//! Collapses concrete request paths into a bounded set of patterns so that
//! the `path` label cannot grow without limit. Service routes are matched
//! against a static prefix table (longest prefix, segment aligned); anything
//! else goes through a generic sanitizer that replaces identifier-looking
//! segments with `{id}`.
//!
//! `classify` never fails: internal errors and oversized results both map to
//! [`UNKNOWN_ROUTE`].

use crate::error::ClassifyError;

/// Sentinel for unclassifiable or oversized paths.
pub const UNKNOWN_ROUTE: &str = "/unknown";
/// Placeholder for identifier segments.
pub const ID_TOKEN: &str = "{id}";
/// Hard cap on the final pattern length.
pub const MAX_PATTERN_LEN: usize = 200;
/// Non-identifier segments are truncated to this many characters.
pub const MAX_SEGMENT_LEN: usize = 50;
/// Segments kept by the generic sanitizer (and in rule tails).
pub const MAX_DEPTH: usize = 5;

/// Words that are never identifiers, whatever their shape.
const COMMON_WORDS: [&str; 33] = [
    "accounts", "users", "settings", "profile", "details", "history", "search",
    "advanced-search", "bulk", "export", "summary", "analytics", "related", "live",
    "ready", "startup", "metrics", "status", "health", "api", "docs", "openapi",
    "swagger", "admin", "public", "private", "create", "update", "delete", "list",
    "view", "edit", "new",
];

/// How the segments after a rule's prefix are turned into a pattern.
#[derive(Debug, Clone, Copy)]
pub enum RuleKind {
    /// Securities collection with optional `{id}` item and nested resources.
    /// `statics` are kept literally; `strict` maps any other single segment
    /// to `{id}` and malformed nesting to `<base>/unknown`.
    Securities {
        statics: &'static [&'static str],
        strict: bool,
    },
    /// The first segment after the prefix is always an identifier.
    Item,
    /// The first segment after the prefix is a health check type.
    Health,
    /// Fixed route; any tail goes through the generic sanitizer.
    Literal,
}

#[derive(Debug, Clone, Copy)]
pub struct RouteRule {
    pub prefix: &'static [&'static str],
    pub kind: RuleKind,
}

/// Route table of the security service.
pub const SERVICE_RULES: &[RouteRule] = &[
    RouteRule {
        prefix: &["api", "v1", "securities"],
        kind: RuleKind::Securities {
            statics: &["search", "types", "categories"],
            strict: true,
        },
    },
    RouteRule {
        prefix: &["api", "v2", "securities"],
        kind: RuleKind::Securities {
            statics: &["search", "advanced-search", "bulk", "export"],
            strict: false,
        },
    },
    RouteRule {
        prefix: &["api", "v1", "securityTypes"],
        kind: RuleKind::Literal,
    },
    RouteRule {
        prefix: &["api", "v1", "securityType"],
        kind: RuleKind::Item,
    },
    RouteRule {
        prefix: &["health"],
        kind: RuleKind::Health,
    },
    RouteRule {
        prefix: &["metrics"],
        kind: RuleKind::Literal,
    },
    RouteRule {
        prefix: &["docs"],
        kind: RuleKind::Literal,
    },
    RouteRule {
        prefix: &["openapi.json"],
        kind: RuleKind::Literal,
    },
];

/// Deterministic path → pattern classifier.
#[derive(Debug, Clone, Copy)]
pub struct RouteClassifier {
    rules: &'static [RouteRule],
}

impl Default for RouteClassifier {
    fn default() -> Self {
        Self::new(SERVICE_RULES)
    }
}

impl RouteClassifier {
    pub fn new(rules: &'static [RouteRule]) -> Self {
        Self { rules }
    }

    /// Classify a request path. Result length is always `<= MAX_PATTERN_LEN`.
    pub fn classify(&self, path: &str) -> String {
        match self.try_classify(path) {
            Ok(pattern) if pattern.len() <= MAX_PATTERN_LEN => pattern,
            Ok(pattern) => {
                tracing::debug!(len = pattern.len(), "route pattern over length cap");
                UNKNOWN_ROUTE.to_string()
            }
            Err(e) => {
                tracing::warn!(
                    path = %truncate(path, MAX_SEGMENT_LEN),
                    error = %e,
                    "failed to extract route pattern"
                );
                UNKNOWN_ROUTE.to_string()
            }
        }
    }

    fn try_classify(&self, path: &str) -> Result<String, ClassifyError> {
        let path = path.split(|c: char| c == '?' || c == '#').next().unwrap_or_default();
        if path.chars().any(char::is_control) {
            return Err(ClassifyError::ControlCharacter);
        }
        if path.is_empty() || path == "/" {
            return Ok("/".to_string());
        }
        if !path.starts_with('/') {
            return Err(ClassifyError::NotAbsolute);
        }

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return Ok("/".to_string());
        }

        match self.match_rule(&segments) {
            Some(rule) => Ok(apply_rule(rule, &segments[rule.prefix.len()..])),
            None => Ok(sanitize_unmatched(&segments)),
        }
    }

    /// Longest prefix, aligned on whole segments.
    fn match_rule(&self, segments: &[&str]) -> Option<&'static RouteRule> {
        self.rules
            .iter()
            .filter(|r| segments.len() >= r.prefix.len() && segments[..r.prefix.len()] == *r.prefix)
            .max_by_key(|r| r.prefix.len())
    }
}

fn apply_rule(rule: &RouteRule, rest: &[&str]) -> String {
    let mut out = join_literal(rule.prefix);
    match rule.kind {
        RuleKind::Securities { statics, strict } => match rest {
            [] => {}
            [segment] => {
                out.push('/');
                if statics.contains(segment) {
                    out.push_str(segment);
                } else if looks_like_id(segment) || strict {
                    out.push_str(ID_TOKEN);
                } else {
                    out.push_str(&sanitize_segment(segment));
                }
            }
            [first, tail @ ..] => {
                out.push('/');
                if looks_like_id(first) {
                    out.push_str(ID_TOKEN);
                } else if strict {
                    out.push_str("unknown");
                    return out;
                } else {
                    out.push_str(&sanitize_segment(first));
                }
                push_tail(&mut out, tail);
            }
        },
        RuleKind::Item => {
            if let [_, tail @ ..] = rest {
                out.push('/');
                out.push_str(ID_TOKEN);
                push_tail(&mut out, tail);
            }
        }
        RuleKind::Health => {
            if let [_, tail @ ..] = rest {
                out.push_str("/{check_type}");
                push_tail(&mut out, tail);
            }
        }
        RuleKind::Literal => push_tail(&mut out, rest),
    }
    out
}

fn join_literal(segments: &[&str]) -> String {
    let mut out = String::new();
    for s in segments {
        out.push('/');
        out.push_str(s);
    }
    out
}

/// Generic segments after a matched prefix, depth limited.
fn push_tail(out: &mut String, tail: &[&str]) {
    for segment in tail.iter().take(MAX_DEPTH) {
        out.push('/');
        if looks_like_id(segment) {
            out.push_str(ID_TOKEN);
        } else {
            out.push_str(&sanitize_segment(segment));
        }
    }
}

fn sanitize_unmatched(segments: &[&str]) -> String {
    if segments.len() > MAX_DEPTH {
        tracing::debug!(depth = segments.len(), "truncated long path");
    }
    let mut out = String::new();
    push_tail(&mut out, segments);
    out
}

/// Whether a segment looks like a generated identifier.
pub fn looks_like_id(segment: &str) -> bool {
    let len = segment.len();
    if len == 0 {
        return false;
    }
    if COMMON_WORDS.iter().any(|w| w.eq_ignore_ascii_case(segment)) {
        return false;
    }

    let all_hex = segment.bytes().all(|b| b.is_ascii_hexdigit());

    // database object id
    if len == 24 {
        return all_hex;
    }
    if len == 32 && all_hex {
        return true;
    }
    if len == 36 && is_hyphenated_uuid(segment) {
        return true;
    }
    if segment.bytes().all(|b| b.is_ascii_digit()) {
        return true;
    }

    // opaque token: needs a digit and a letter so long words stay literal
    // (see "Identifier rule (d)" in DESIGN.md)
    len > 8
        && segment
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        && segment.bytes().any(|b| b.is_ascii_digit())
        && segment.bytes().any(|b| b.is_ascii_alphabetic())
}

fn is_hyphenated_uuid(s: &str) -> bool {
    let expected = [8, 4, 4, 4, 12];
    let parts: Vec<&str> = s.split('-').collect();
    parts.len() == expected.len()
        && parts
            .iter()
            .zip(expected)
            .all(|(p, n)| p.len() == n && p.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// Keep `[A-Za-z0-9._-]`, map whitespace to `_`, drop the rest, cap length.
pub fn sanitize_segment(segment: &str) -> String {
    let mut out: String = segment
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') => Some(c),
            ' ' | '\t' => Some('_'),
            _ => None,
        })
        .collect();
    if out.is_empty() {
        return "unknown".to_string();
    }
    // ASCII only at this point, byte truncation is char safe.
    out.truncate(MAX_SEGMENT_LEN);
    out
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_shapes() {
        assert!(looks_like_id("60c72b2f9b1e8b3f8c8b4567"));
        assert!(looks_like_id("550e8400-e29b-41d4-a716-446655440000"));
        assert!(looks_like_id("550e8400e29b41d4a716446655440000"));
        assert!(looks_like_id("12345"));
        assert!(looks_like_id("7"));
        assert!(looks_like_id("order_2024_abc"));
        assert!(!looks_like_id("60c72b2f9b1e8b3f8c8b456z"));
        assert!(!looks_like_id("search"));
        assert!(!looks_like_id("advanced-search"));
        assert!(!looks_like_id("cleanup"));
        assert!(!looks_like_id("abc12"));
    }

    #[test]
    fn sanitize_drops_and_truncates() {
        assert_eq!(sanitize_segment("a b%c"), "a_bc");
        assert_eq!(sanitize_segment("%%%"), "unknown");
        assert_eq!(sanitize_segment(&"x".repeat(80)).len(), MAX_SEGMENT_LEN);
    }

    #[test]
    fn prefix_match_is_segment_aligned() {
        let c = RouteClassifier::default();
        assert_eq!(c.classify("/healthcheck"), "/healthcheck");
        assert_eq!(c.classify("/api/v1/securityType/abc"), "/api/v1/securityType/{id}");
        assert_eq!(c.classify("/api/v1/securityTypes"), "/api/v1/securityTypes");
    }

    #[test]
    fn internal_errors_map_to_unknown() {
        let c = RouteClassifier::default();
        assert_eq!(c.classify("relative/path"), UNKNOWN_ROUTE);
        assert_eq!(c.classify("/bad\u{0}path"), UNKNOWN_ROUTE);
    }
}
