pub mod api;
pub mod metrics;
pub mod state;

pub use api::{create_router, WsBroadcaster, WsDecisionChannel, WsMessage, WsNotifier};
pub use state::AppState;
