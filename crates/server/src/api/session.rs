//! Process-lifetime operator flags.

use std::sync::Arc;

use axum::{extract::State, Json};
use lookout_core::{SessionFlags, SessionFlagsUpdate};

use crate::state::AppState;

/// GET /api/v1/session-flags
pub async fn get_session_flags(State(state): State<Arc<AppState>>) -> Json<SessionFlags> {
    Json(state.session_flags())
}

/// PUT /api/v1/session-flags
pub async fn update_session_flags(
    State(state): State<Arc<AppState>>,
    Json(update): Json<SessionFlagsUpdate>,
) -> Json<SessionFlags> {
    Json(state.update_session_flags(update))
}
