//! Route table and middleware stack.

use crate::routes::{admin, client, public};
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Multipart submissions carry up to five 10 MiB files plus form fields.
const BODY_LIMIT: usize = 5 * 10 * 1024 * 1024 + 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/api/health", get(public::health))
        .route("/api/contact", post(public::submit_case))
        .route("/api/asset-reclaim", post(public::submit_asset_reclaim))
        .route("/api/case/:case_id", get(public::get_case))
        .route(
            "/api/uploads/:case_id/:filename",
            get(public::download_attachment),
        )
        // Staff
        .route("/api/admin/login", post(admin::login))
        .route("/api/admin/cases", get(admin::list_cases))
        .route("/api/admin/cases/export/csv", get(admin::export_csv))
        .route("/api/admin/cases/bulk-update", put(admin::bulk_update))
        .route(
            "/api/admin/cases/:case_id",
            get(admin::get_case).put(admin::update_case),
        )
        .route("/api/admin/send-email", post(admin::send_email))
        // Client portal
        .route("/api/client/request-login", post(client::request_login))
        .route("/api/client/verify-otp", post(client::verify_otp))
        .route("/api/client/cases", get(client::list_cases))
        .route(
            "/api/client/cases/:case_id/download-all",
            get(client::download_links),
        )
        .route("/api/client/reply", post(client::reply))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(state)
}
