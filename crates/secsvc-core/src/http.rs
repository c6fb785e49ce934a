//! Request/response descriptors for the downstream handler seam.
//!
//! The CRUD and search handlers live behind this boundary; the metrics
//! pipeline only needs the method, path and final status.

/// Inbound request as seen by the instrumentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
}

impl RequestDescriptor {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Response summary returned by the downstream handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseDescriptor {
    pub status: u16,
}

impl ResponseDescriptor {
    pub fn new(status: u16) -> Self {
        Self { status }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let req = RequestDescriptor::new("POST", "/api/v2/securities")
            .with_header("Content-Type", "application/json")
            .with_header("X-Request-Id", "abc");

        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("X-REQUEST-ID"), Some("abc"));
        assert_eq!(req.header("accept"), None);
    }
}
