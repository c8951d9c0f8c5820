//! The server-held Gemini API key.
use axum::http::HeaderValue;

/// A secret API key. The value is never printed: `Debug` emits a redaction marker so the key can
/// sit inside configuration structs that get logged at startup.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    /// Returns `None` for blank values, which are treated the same as an unset variable.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_owned()))
        }
    }

    /// The key as a header value, flagged sensitive so that hyper and tracing layers skip it.
    pub fn header_value(&self) -> Result<HeaderValue, axum::http::header::InvalidHeaderValue> {
        let mut value = HeaderValue::from_str(&self.0)?;
        value.set_sensitive(true);
        Ok(value)
    }

    #[cfg(test)]
    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey([redacted])")
    }
}
