use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::{
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::web::{AppState, landing, uploads};

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config().max_upload_bytes;
    let pdf_files = ServeDir::new(state.dispatcher().output_dir());

    Router::new()
        .route("/", get(landing::landing_page))
        .route(
            "/upload",
            post(uploads::upload_file).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/healthz", get(healthz))
        .nest_service(uploads::PDF_ROUTE, pdf_files)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}
