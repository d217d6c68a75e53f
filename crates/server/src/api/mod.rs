pub mod controls;
pub mod decision;
pub mod faces;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod session;
pub mod ws;

pub use decision::WsDecisionChannel;
pub use routes::create_router;
pub use ws::{WsBroadcaster, WsMessage, WsNotifier};
