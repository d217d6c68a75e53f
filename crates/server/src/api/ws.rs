//! WebSocket support for real-time dashboard updates.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use lookout_core::{
    BatchProgress, DecisionPrompt, Notification, NotificationSink, ProgressSink, Severity,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_LAG_EVENTS, WS_MESSAGES_SENT};
use crate::state::AppState;

/// Interval between heartbeats on an idle connection.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// WebSocket message sent to clients for real-time updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// Operator notification (toast).
    Notification { severity: Severity, message: String },
    /// One more photo of the running batch was dispatched.
    EnrollmentProgress {
        batch_id: Uuid,
        done: usize,
        total: usize,
    },
    /// Accelerated processing failed; the batch waits for an answer.
    DecisionRequired {
        batch_id: Uuid,
        person_name: String,
        remaining: usize,
        enrolled: usize,
        errors: usize,
    },
    /// The pending decision was answered.
    DecisionResolved {
        batch_id: Uuid,
        #[serde(rename = "continue")]
        resume: bool,
    },
    /// The enrolled people list changed and should be reloaded.
    FacesChanged,
    /// Server heartbeat (sent periodically to keep connection alive).
    Heartbeat { timestamp: i64 },
}

impl WsMessage {
    fn kind(&self) -> &'static str {
        match self {
            WsMessage::Notification { .. } => "notification",
            WsMessage::EnrollmentProgress { .. } => "enrollment_progress",
            WsMessage::DecisionRequired { .. } => "decision_required",
            WsMessage::DecisionResolved { .. } => "decision_resolved",
            WsMessage::FacesChanged => "faces_changed",
            WsMessage::Heartbeat { .. } => "heartbeat",
        }
    }
}

/// Broadcaster for WebSocket messages using tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct WsBroadcaster {
    sender: broadcast::Sender<WsMessage>,
}

impl WsBroadcaster {
    /// Create a new broadcaster with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Broadcast a message to all connected clients.
    pub fn broadcast(&self, msg: WsMessage) {
        // Ignore send errors - they just mean no one is listening
        let _ = self.sender.send(msg);
    }

    /// Subscribe to receive messages.
    pub fn subscribe(&self) -> broadcast::Receiver<WsMessage> {
        self.sender.subscribe()
    }

    pub fn notification(&self, notification: Notification) {
        self.broadcast(WsMessage::Notification {
            severity: notification.severity,
            message: notification.message,
        });
    }

    pub fn decision_required(&self, prompt: &DecisionPrompt) {
        self.broadcast(WsMessage::DecisionRequired {
            batch_id: prompt.batch_id,
            person_name: prompt.person_name.clone(),
            remaining: prompt.remaining,
            enrolled: prompt.enrolled,
            errors: prompt.errors,
        });
    }

    pub fn decision_resolved(&self, batch_id: Uuid, resume: bool) {
        self.broadcast(WsMessage::DecisionResolved { batch_id, resume });
    }

    pub fn faces_changed(&self) {
        self.broadcast(WsMessage::FacesChanged);
    }
}

impl Default for WsBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Notification and progress sink that forwards to every connected client.
#[derive(Debug, Clone)]
pub struct WsNotifier {
    broadcaster: WsBroadcaster,
}

impl WsNotifier {
    pub fn new(broadcaster: WsBroadcaster) -> Self {
        Self { broadcaster }
    }
}

impl NotificationSink for WsNotifier {
    fn notify(&self, notification: Notification) {
        debug!(
            "Notification ({:?}): {}",
            notification.severity, notification.message
        );
        self.broadcaster.notification(notification);
    }
}

impl ProgressSink for WsNotifier {
    fn progress(&self, update: BatchProgress) {
        self.broadcaster.broadcast(WsMessage::EnrollmentProgress {
            batch_id: update.batch_id,
            done: update.done,
            total: update.total,
        });
    }
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle a single WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe to broadcast messages
    let mut rx = state.ws_broadcaster().subscribe();

    // A client connecting mid-batch still needs to see the open question
    let pending = state.decisions().pending();

    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();

    info!("WebSocket client connected");

    let send_task = tokio::spawn(async move {
        if let Some(prompt) = pending {
            let msg = WsMessage::DecisionRequired {
                batch_id: prompt.batch_id,
                person_name: prompt.person_name,
                remaining: prompt.remaining,
                enrolled: prompt.enrolled,
                errors: prompt.errors,
            };
            if send_message(&mut sender, &msg).await.is_err() {
                return;
            }
        }

        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;

        loop {
            let msg = tokio::select! {
                result = rx.recv() => match result {
                    Ok(msg) => msg,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("WebSocket client lagged, skipped {} messages", n);
                        WS_LAG_EVENTS.inc();
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Broadcast channel closed");
                        break;
                    }
                },
                _ = heartbeat.tick() => WsMessage::Heartbeat {
                    timestamp: chrono::Utc::now().timestamp(),
                },
            };

            if send_message(&mut sender, &msg).await.is_err() {
                debug!("WebSocket send failed, client disconnected");
                break;
            }
        }
    });

    // Handle incoming messages from client (ping/pong, close)
    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Close(_)) => {
                debug!("WebSocket client requested close");
                break;
            }
            Ok(Message::Text(text)) => {
                // Decisions are answered over HTTP, nothing is expected here
                debug!("Received text message: {}", text);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        }
    }

    send_task.abort();
    WS_CONNECTIONS_ACTIVE.dec();
    info!("WebSocket client disconnected");
}

/// Serialize and send one message. Errors only when the client is gone.
async fn send_message<S>(sender: &mut S, msg: &WsMessage) -> Result<(), ()>
where
    S: futures::Sink<Message> + Unpin,
{
    WS_MESSAGES_SENT.with_label_values(&[msg.kind()]).inc();
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.map_err(|_| ()),
        Err(e) => {
            error!("Failed to serialize WsMessage: {}", e);
            Ok(())
        }
    }
}
