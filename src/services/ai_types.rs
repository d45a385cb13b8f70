use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub task_name: String,
    pub instructions: String,

    /// Optional selector for which backend should answer.
    #[serde(default)]
    pub target: Option<String>,
}
