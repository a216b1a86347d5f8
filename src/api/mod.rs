//! HTTP surface: route table, shared layers and the API docs endpoints.

use crate::handlers::{self, AppState};
use axum::{
    http::header,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

const OPENAPI_YAML: &str = include_str!("../../openapi.yml");

const DOCS_PAGE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>Leads API docs</title>
<link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
</head>
<body>
<div id="docs"></div>
<script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
<script>
SwaggerUIBundle({ url: "/api-docs/openapi.yml", dom_id: "#docs" });
</script>
</body>
</html>
"##;

/// OpenAPI document, embedded at build time.
async fn openapi_yaml() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/yaml")], OPENAPI_YAML)
}

async fn docs_page() -> Html<&'static str> {
    Html(DOCS_PAGE)
}

/// The lead CRUD routes plus API docs, without state or outer layers.
///
/// `main` wraps these in rate limiting before handing them to [`finish`].
pub fn lead_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/docs", get(docs_page))
        .route("/api-docs/openapi.yml", get(openapi_yaml))
        // Lead CRUD
        .route(
            "/api/leads",
            get(handlers::list_leads).post(handlers::create_lead),
        )
        .route(
            "/api/leads/:id",
            get(handlers::get_lead)
                .put(handlers::update_lead)
                .delete(handlers::delete_lead),
        )
}

/// Adds the health check, state, tracing and CORS around already-layered routes.
pub fn finish(protected_routes: Router<Arc<AppState>>, state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Full application router without per-IP rate limiting.
///
/// Rate limiting needs the peer address, which only exists once the router is
/// served over a socket, so in-process callers (tests) use this.
pub fn router(state: Arc<AppState>, body_limit_bytes: usize) -> Router {
    finish(
        lead_routes().layer(RequestBodyLimitLayer::new(body_limit_bytes)),
        state,
    )
}
