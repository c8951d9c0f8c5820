/// Axum handlers for the relay server
use crate::AppState;
use crate::client::HttpClient;
use crate::errors::RelayError;
use crate::upstream::API_KEY_HEADER;
use axum::{
    body::{Body, Bytes},
    extract::{Request, State, rejection::BytesRejection},
    http::{
        HeaderValue, Method, StatusCode, Uri,
        header::{CONTENT_TYPE, HOST, ORIGIN},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, error, info, instrument, warn};

/// Upper bound on how much of a failed upstream response is read for logging.
const ERROR_BODY_LOG_LIMIT: usize = 16 * 1024;

/// Relays a JSON body to the upstream generateContent endpoint with the server-held key attached.
///
/// The body is forwarded byte-for-byte. On a 2xx answer the upstream status and body are returned
/// as-is; every failure becomes a generic JSON error.
#[instrument(skip(state, body))]
pub async fn gemini_handler<T>(
    State(state): State<AppState<T>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, RelayError>
where
    T: HttpClient + Clone + Send + Sync + 'static,
{
    let upstream = &state.upstream;

    // Checked first so that an unconfigured relay fails every call the same way.
    let key = upstream.key.as_ref().ok_or_else(|| {
        error!("Rejecting request: no upstream API key configured");
        RelayError::MissingCredential
    })?;

    let body = body.map_err(|rejection| {
        debug!("Request body rejected: {}", rejection.body_text());
        RelayError::Body {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    })?;
    debug!("Received request body of size: {}", body.len());

    match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(serde_json::Value::Object(_) | serde_json::Value::Array(_)) => {}
        Ok(_) => return Err(RelayError::NotAnObjectOrArray),
        Err(e) => return Err(RelayError::InvalidJson(e)),
    }

    let endpoint = upstream
        .endpoint()
        .map_err(|e| RelayError::InvalidUpstreamUri(e.to_string()))?;
    let upstream_uri = Uri::try_from(endpoint.as_str())
        .map_err(|_| RelayError::InvalidUpstreamUri(endpoint.to_string()))?;

    let key_header = key.header_value().map_err(|_| {
        error!("Configured upstream API key is not a valid header value");
        RelayError::InvalidCredential
    })?;

    let mut builder = axum::http::Request::builder()
        .method(Method::POST)
        .uri(upstream_uri.clone())
        .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .header(API_KEY_HEADER, key_header);

    // Set host explicitly to the upstream, some fronting CDNs refuse requests without it.
    if let Some(host) = upstream_uri.host() {
        let host_value = match upstream_uri.port_u16() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        builder = builder.header(HOST, host_value);
    }

    let req = builder
        .body(Body::from(body))
        .map_err(|e| RelayError::InvalidUpstreamUri(e.to_string()))?;

    info!("Forwarding request to {}", endpoint);

    // The timeout covers the whole exchange, body included: a 2xx status line followed by a
    // stalled or truncated body must not reach the caller as a success.
    let exchange = async {
        let response = state.http_client.request(req).await.map_err(|e| {
            error!("Error forwarding request to upstream {}: {}", endpoint, e);
            RelayError::Transport(e.to_string())
        })?;

        let (parts, body) = response.into_parts();
        if !parts.status.is_success() {
            let detail = axum::body::to_bytes(body, ERROR_BODY_LOG_LIMIT)
                .await
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            error!(
                "Upstream {} responded with {}: {}",
                endpoint, parts.status, detail
            );
            return Err(RelayError::UpstreamStatus(parts.status));
        }

        let bytes = axum::body::to_bytes(body, usize::MAX).await.map_err(|e| {
            error!("Error reading response body from upstream {}: {}", endpoint, e);
            RelayError::Transport(e.to_string())
        })?;
        Ok::<_, RelayError>((parts, bytes))
    };

    let (parts, bytes) = match tokio::time::timeout(upstream.timeout, exchange).await {
        Ok(result) => result?,
        Err(_) => {
            error!(
                "Upstream {} did not respond within {:?}",
                endpoint, upstream.timeout
            );
            return Err(RelayError::Timeout(upstream.timeout));
        }
    };

    debug!(
        "Upstream responded with {} ({} bytes)",
        parts.status,
        bytes.len()
    );
    Ok(relay_response(parts, bytes))
}

/// Keeps the upstream status, content type and body. Other upstream headers (connection
/// management, upstream cookies) are not the caller's business.
fn relay_response(parts: axum::http::response::Parts, body: Bytes) -> Response {
    let mut relayed = Response::new(Body::from(body));
    *relayed.status_mut() = parts.status;
    if let Some(content_type) = parts.headers.get(CONTENT_TYPE) {
        relayed
            .headers_mut()
            .insert(CONTENT_TYPE, content_type.clone());
    }
    relayed
}

/// Rejects browser requests coming from any origin other than the configured one. Requests with no
/// `Origin` header are not cross-origin browser calls and pass through.
pub async fn origin_guard(
    State(allowed_origin): State<HeaderValue>,
    req: Request,
    next: Next,
) -> Response {
    match req.headers().get(ORIGIN) {
        Some(origin) if *origin != allowed_origin => {
            warn!(
                "Rejecting request from disallowed origin {:?}",
                origin.to_str().unwrap_or("<non-ascii>")
            );
            StatusCode::FORBIDDEN.into_response()
        }
        _ => next.run(req).await,
    }
}
