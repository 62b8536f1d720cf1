use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueAction {
    Install,
    Remove,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueState {
    Pending,
    Processing,
    Processed,
}

/// One requested operation in flight. `id` is backend-qualified
/// (`"<backend>:<uuid>"`) so the same app installable through different
/// mechanisms never collides. `success` is meaningful only once the item
/// reaches `Processed`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: String,
    pub display_name: String,
    pub icon: String,
    pub action: QueueAction,
    pub state: QueueState,
    pub success: Option<bool>,
}
