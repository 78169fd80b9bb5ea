//! Bill API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Room for multipart boundaries and the non-file parts.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the bill API router.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn api_router(ctx: ApiContext) -> Router {
    let body_limit = ctx.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);

    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/bills", post(endpoints::bills::upload))
        .route("/bills/ingest", post(endpoints::bills::ingest))
        .route("/bills/:id", get(endpoints::bills::detail))
        .route("/bills/:id/extract", post(endpoints::bills::extract))
        .route("/bills/:id/consent", post(endpoints::bills::consent))
        .route("/bills/:id/process", post(endpoints::bills::process))
        .route("/bills/:id/report", get(endpoints::bills::report))
        .with_state(ctx);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
