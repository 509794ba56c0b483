use tracing::{error, info};

/// Lifecycle events reported while an encode runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeEvent {
    Start { command: String },
    Progress { percent: u8 },
    End,
    Error { message: String },
}

impl EncodeEvent {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Progress { .. } => "progress",
            Self::End => "end",
            Self::Error { .. } => "error",
        }
    }
}

/// Receives encoder lifecycle events as they happen.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: EncodeEvent);
}

/// Writes every event as a structured log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: EncodeEvent) {
        let tag = event.tag();
        match event {
            EncodeEvent::Start { command } => info!(event = tag, %command, "🎥 Encoder started"),
            EncodeEvent::Progress { percent } => info!(event = tag, percent, "Encoding"),
            EncodeEvent::End => info!(event = tag, "Encoder finished"),
            EncodeEvent::Error { message } => error!(event = tag, %message, "Encoder failed"),
        }
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: std::sync::Mutex<Vec<EncodeEvent>>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn events(&self) -> Vec<EncodeEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
impl EventSink for RecordingSink {
    fn emit(&self, event: EncodeEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
