/// The 'upstream' is the generative-AI API that the relay forwards requests to. It is read once at
/// startup and never changes while the server runs.
///
/// Requests to `/api/gemini` are posted to `{base_url}models/{model}:generateContent`, with the
/// API key in the `x-goog-api-key` header. Keeping the key out of the query string means it never
/// shows up in logged URIs.
use crate::credential::ApiKey;
use bon::Builder;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Matches the 100kb default of the usual Node JSON body parser.
pub const DEFAULT_MAX_BODY_BYTES: usize = 100 * 1024;

pub const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Clone, Builder)]
pub struct Upstream {
    #[builder(default = default_base_url())]
    pub base_url: Url,
    #[builder(into, default = DEFAULT_MODEL.to_string())]
    pub model: String,
    pub key: Option<ApiKey>,
    #[builder(default = Duration::from_secs(DEFAULT_TIMEOUT_SECS))]
    pub timeout: Duration,
    #[builder(default = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,
}

fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("default base url is valid")
}

impl Upstream {
    /// The full URL of the generateContent call for the configured model.
    pub fn endpoint(&self) -> Result<Url, url::ParseError> {
        // Url::join drops the last path segment unless the base ends in a slash.
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(&format!("models/{}:generateContent", self.model))
    }
}
