use crate::models::ToolCall;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::debug;

/// Notifications emitted while a turn is in flight.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Status(String),
    ContentDelta(String),
    ToolCalls(Vec<ToolCall>),
    Completed(String),
    Cancelled,
    Error(String),
}

/// Fans events out to every live subscriber. Closed receivers are dropped.
#[derive(Debug, Default)]
pub struct EventSink {
    subscribers: std::sync::Mutex<Vec<UnboundedSender<SessionEvent>>>,
}

impl EventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> UnboundedReceiver<SessionEvent> {
        let (tx, rx) = unbounded_channel();
        self.lock().push(tx);
        rx
    }

    pub fn emit(&self, event: SessionEvent) {
        if let SessionEvent::Status(status) = &event {
            debug!("status: {}", status);
        }
        self.lock().retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn status(&self, status: impl Into<String>) {
        self.emit(SessionEvent::Status(status.into()));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<UnboundedSender<SessionEvent>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
