use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use super::{controls, decision, faces, handlers, middleware::metrics_middleware, session, ws};
use crate::state::AppState;

/// Upper bound on a multipart upload (a whole enrollment batch or a face
/// database import). Individual photos are checked again by the orchestrator.
const UPLOAD_BODY_LIMIT: usize = 256 * 1024 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let dashboard_dir = state.config().server.dashboard_dir.clone();

    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Detection session
        .route("/session/start", post(controls::start_session))
        .route("/session/pause", post(controls::pause_session))
        .route("/session/stop", post(controls::stop_session))
        .route("/stats", get(controls::get_stats))
        .route(
            "/settings",
            get(controls::get_settings).put(controls::update_settings),
        )
        // Face database
        .route("/faces", get(faces::list_faces))
        .route("/faces/{name}", delete(faces::delete_face))
        .route("/faces/capture", post(faces::capture_face))
        .route("/faces/export", get(faces::export_faces))
        .route("/faces/import", post(faces::import_faces))
        .route("/faces/acceleration", get(faces::acceleration_info))
        // Batch enrollment
        .route("/faces/enroll", post(faces::enroll_photos))
        .route("/faces/enroll/status", get(decision::enrollment_status))
        .route("/faces/enroll/decision", post(decision::submit_decision))
        // Operator flags
        .route(
            "/session-flags",
            get(session::get_session_flags).put(session::update_session_flags),
        )
        // Real-time updates
        .route("/ws", get(ws::ws_handler))
        .route_layer(middleware::from_fn(metrics_middleware))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT));

    // Serve dashboard with SPA fallback
    let index_path = dashboard_dir.join("index.html");
    let serve_dir = ServeDir::new(&dashboard_dir).fallback(ServeFile::new(index_path));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .fallback_service(serve_dir)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
