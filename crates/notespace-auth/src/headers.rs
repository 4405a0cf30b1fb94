//! Case-insensitive request header access and request metadata.

use std::collections::HashMap;

/// A minimal case-insensitive header map.
///
/// The core is transport-agnostic: adapters copy whatever headers their
/// framework parsed into this map. Lookups ignore ASCII case.
#[derive(Debug, Clone, Default)]
pub struct RequestHeaders {
    values: HashMap<String, String>,
}

impl RequestHeaders {
    /// Create an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, replacing any previous value.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.values
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Look up a header value, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

impl<N: AsRef<str>, V: Into<String>> FromIterator<(N, V)> for RequestHeaders {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

/// Request metadata forwarded into audit events.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    /// HTTP method of the originating request.
    pub method: Option<String>,
    /// Path of the originating request.
    pub path: Option<String>,
    /// Correlation id (e.g. `X-Request-Id`).
    pub request_id: Option<String>,
}
