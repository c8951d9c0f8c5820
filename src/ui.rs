//! The UI shell: a static page tree resolved through a small router table.
//!
//! Each route pairs a path with a layout and the index view rendered inside it. Paths that match
//! no route get a not-found page.
use axum::{
    Router,
    http::{StatusCode, Uri},
    response::Html,
    routing::get,
};
use tracing::{debug, info, instrument};

/// A view renders an HTML fragment.
pub type View = fn() -> String;

/// A layout wraps the fragment of its child view.
pub type Layout = fn(&str) -> String;

pub struct Route {
    pub path: &'static str,
    pub layout: Layout,
    pub index: View,
}

pub const ROUTES: &[Route] = &[Route {
    path: "/",
    layout: app_layout,
    index: home,
}];

const TITLE: &str = "Gemini Relay";

fn app_layout(outlet: &str) -> String {
    format!(r#"<div class="app"><main>{outlet}</main></div>"#)
}

fn home() -> String {
    concat!(
        "<div>",
        "<h1>Welcome to the Home Component</h1>",
        r#"<button type="button" class="button button-link">Click me</button>"#,
        "</div>"
    )
    .to_string()
}

fn not_found() -> String {
    concat!(
        "<div>",
        "<h1>Unexpected Application Error!</h1>",
        "<p>404 Not Found</p>",
        "</div>"
    )
    .to_string()
}

fn document(body: &str) -> String {
    format!(
        concat!(
            "<!doctype html>\n",
            r#"<html lang="en">"#,
            "<head>",
            r#"<meta charset="UTF-8" />"#,
            r#"<meta name="viewport" content="width=device-width, initial-scale=1.0" />"#,
            "<title>{title}</title>",
            "</head>",
            "<body>",
            r#"<div id="root">{body}</div>"#,
            "</body>",
            "</html>\n"
        ),
        title = TITLE,
        body = body
    )
}

/// Renders the page for `path`, or `None` when no route matches.
pub fn render(path: &str) -> Option<String> {
    ROUTES
        .iter()
        .find(|route| route.path == path)
        .map(|route| document(&(route.layout)(&(route.index)())))
}

#[instrument]
async fn page(uri: Uri) -> (StatusCode, Html<String>) {
    match render(uri.path()) {
        Some(html) => (StatusCode::OK, Html(html)),
        None => {
            debug!("No route for {}", uri.path());
            (StatusCode::NOT_FOUND, Html(document(&not_found())))
        }
    }
}

/// Build the router serving the UI shell. Every path goes through the route table.
#[instrument]
pub fn build_ui_router() -> Router {
    info!("Building UI router with {} routes", ROUTES.len());
    Router::new()
        .route("/", get(page))
        .route("/{*path}", get(page))
}
