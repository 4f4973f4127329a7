use serde::{Deserialize, Serialize};

use super::keys;

/// Liveness change for one task. Never stored on its own; it only flips the
/// health of the task record it points at.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub app_id: String,
    pub task_id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub alive: bool,
}

impl Health {
    pub fn task_key(&self) -> String {
        keys::task_key(&self.app_id, &self.task_id)
    }
}
