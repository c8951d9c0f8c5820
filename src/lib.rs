//! Gemini Relay - a single-endpoint proxy for the Gemini API
//!
//! The relay exposes `POST /api/gemini`, attaches a server-held API key and forwards the JSON body
//! to the upstream generateContent endpoint, so the key never reaches the browser. The [`ui`]
//! module holds the page shell served by the companion UI binary.

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header::CONTENT_TYPE};
use axum::middleware::from_fn_with_state;
use axum::routing::post;
use axum_prometheus::{
    GenericMetricLayer, Handle, PrometheusMetricLayerBuilder,
    metrics_exporter_prometheus::PrometheusHandle,
};
use std::borrow::Cow;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

pub mod client;
pub mod credential;
pub mod errors;
pub mod handlers;
pub mod ui;
pub mod upstream;

use client::{HttpClient, HyperClient, PoolSettings};
use handlers::{gemini_handler, origin_guard};
use upstream::Upstream;

pub const GEMINI_ROUTE: &str = "/api/gemini";

/// The application state: the HTTP client, the upstream it talks to and the one origin allowed to
/// call it. Nothing in here changes after startup.
#[derive(Clone, Debug)]
pub struct AppState<T: HttpClient> {
    pub http_client: T,
    pub upstream: Upstream,
    pub allowed_origin: HeaderValue,
}

impl AppState<HyperClient> {
    /// Create a new AppState with the default Hyper client
    pub fn new(upstream: Upstream, allowed_origin: HeaderValue) -> Self {
        Self::with_client(
            upstream,
            allowed_origin,
            client::create_hyper_client(PoolSettings::default()),
        )
    }
}

impl<T: HttpClient> AppState<T> {
    /// Create a new AppState with a custom HTTP client (useful for testing)
    pub fn with_client(upstream: Upstream, allowed_origin: HeaderValue, http_client: T) -> Self {
        Self {
            http_client,
            upstream,
            allowed_origin,
        }
    }
}

/// Build the relay router.
///
/// `/api/gemini` accepts POST only. Requests from a foreign `Origin` are refused before they reach
/// the handler, and CORS headers only ever name the allowed origin.
#[instrument(skip(state))]
pub fn build_router<T: HttpClient + Clone + Send + Sync + 'static>(state: AppState<T>) -> Router {
    info!("Building router");
    let cors = CorsLayer::new()
        .allow_origin(state.allowed_origin.clone())
        .allow_methods([Method::POST])
        .allow_headers([CONTENT_TYPE]);
    let body_limit = DefaultBodyLimit::max(state.upstream.max_body_bytes);
    let allowed_origin = state.allowed_origin.clone();

    Router::new()
        .route(GEMINI_ROUTE, post(gemini_handler::<T>))
        .layer(body_limit)
        .layer(from_fn_with_state(allowed_origin, origin_guard))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Builds a router for the metrics endpoint.
#[instrument(skip(handle))]
pub fn build_metrics_router(handle: PrometheusHandle) -> Router {
    info!("Building metrics router");
    Router::new().route(
        "/metrics",
        axum::routing::get(move || async move { handle.render() }),
    )
}

type MetricsLayerAndHandle = (
    GenericMetricLayer<'static, PrometheusHandle, Handle>,
    PrometheusHandle,
);

/// Builds a layer and handle for prometheus metrics collection.
///
/// The prefix must be `'static` because the Prometheus layer keeps it for the life of the process.
pub fn build_metrics_layer_and_handle(
    prefix: impl Into<Cow<'static, str>>,
) -> MetricsLayerAndHandle {
    info!("Building metrics layer");
    PrometheusMetricLayerBuilder::new()
        .with_prefix(prefix)
        .enable_response_body_size(true)
        .with_endpoint_label_type(axum_prometheus::EndpointLabel::Exact)
        .with_default_metrics()
        .build_pair()
}

#[cfg(test)]
pub mod test_utils {
    use super::*;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    type ResponseBuilder =
        dyn Fn() -> Result<axum::response::Response, String> + Send + Sync;

    pub struct MockHttpClient {
        pub requests: Arc<Mutex<Vec<MockRequest>>>,
        response_builder: Arc<ResponseBuilder>,
        delay: Option<Duration>,
    }

    #[derive(Debug, Clone)]
    pub struct MockRequest {
        pub method: String,
        pub uri: String,
        pub headers: Vec<(String, String)>,
        pub body: Vec<u8>,
    }

    impl MockRequest {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str())
        }
    }

    impl MockHttpClient {
        pub fn new(status: StatusCode, body: &str) -> Self {
            let body = body.to_string();
            Self {
                requests: Arc::new(Mutex::new(Vec::new())),
                response_builder: Arc::new(move || {
                    Ok(axum::response::Response::builder()
                        .status(status)
                        .header("content-type", "application/json")
                        .header("x-upstream-trace", "abc")
                        .body(axum::body::Body::from(body.clone()))
                        .unwrap())
                }),
                delay: None,
            }
        }

        /// A client whose every request fails at the transport level.
        pub fn failing(message: &str) -> Self {
            let message = message.to_string();
            Self {
                requests: Arc::new(Mutex::new(Vec::new())),
                response_builder: Arc::new(move || Err(message.clone())),
                delay: None,
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn get_requests(&self) -> Vec<MockRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl std::fmt::Debug for MockHttpClient {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("MockHttpClient")
                .field("requests", &self.requests)
                .field("response_builder", &"<closure>")
                .field("delay", &self.delay)
                .finish()
        }
    }

    impl Clone for MockHttpClient {
        fn clone(&self) -> Self {
            Self {
                requests: Arc::clone(&self.requests),
                response_builder: Arc::clone(&self.response_builder),
                delay: self.delay,
            }
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn request(
            &self,
            req: axum::extract::Request,
        ) -> Result<axum::response::Response, Box<dyn std::error::Error + Send + Sync>> {
            let method = req.method().to_string();
            let uri = req.uri().to_string();
            let headers = req
                .headers()
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
                .collect();

            let body = axum::body::to_bytes(req.into_body(), usize::MAX)
                .await
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?
                .to_vec();

            self.requests.lock().unwrap().push(MockRequest {
                method,
                uri,
                headers,
                body,
            });

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            (self.response_builder)().map_err(|e| e.into())
        }
    }
}
