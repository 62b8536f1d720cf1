pub mod queue;

pub use queue::{EnqueueOutcome, InstallQueue};

use serde::Serialize;

use crate::models::QueueItem;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Ok,
    Busy,
    Error,
}

/// Status-line update for the active queue item. `value = -1` means
/// indeterminate; `value_end = 0` hides the progress display entirely.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct QueueStateUpdate {
    pub status: QueueStatus,
    pub action_text: String,
    pub details_text: String,
    pub value: i64,
    pub value_end: i64,
}

impl QueueStateUpdate {
    pub fn ready() -> Self {
        Self {
            status: QueueStatus::Ok,
            action_text: "Ready.".to_string(),
            details_text: String::new(),
            value: 0,
            value_end: 0,
        }
    }

    pub fn busy(action_text: impl Into<String>, value: i64, value_end: i64) -> Self {
        Self {
            status: QueueStatus::Busy,
            action_text: action_text.into(),
            details_text: String::new(),
            value,
            value_end,
        }
    }

    pub fn error(action_text: impl Into<String>, details_text: impl Into<String>) -> Self {
        Self {
            status: QueueStatus::Error,
            action_text: action_text.into(),
            details_text: details_text.into(),
            value: 0,
            value_end: 0,
        }
    }
}

/// Events emitted by the orchestrator. Consumers always receive the full
/// queue snapshot, never a delta; the channel gives one level of indirection
/// so no consumer runs while a transition is being applied.
#[derive(Clone, Debug, PartialEq)]
pub enum QueueEvent {
    QueueChanged(Vec<QueueItem>),
    StateChanged(QueueStateUpdate),
}
