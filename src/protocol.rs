use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    Closed,
    HostShutdown,
}

/// Events pushed to an open view over the SSE channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewEvent {
    Update { html: String },
    ViewClosed { reason: CloseReason },
    Heartbeat,
}

impl ViewEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Update { .. } => "update",
            Self::ViewClosed { .. } => "closed",
            Self::Heartbeat => "heartbeat",
        }
    }
}
