use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TranslationStatus {
    #[default]
    Idle,
    Translating,
    Done,
    Error,
}

impl TranslationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TranslationStatus::Idle => "idle",
            TranslationStatus::Translating => "translating",
            TranslationStatus::Done => "done",
            TranslationStatus::Error => "error",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct TranslationState {
    pub status: TranslationStatus,

    #[serde(default)]
    pub last_attempt: Option<DateTime<Local>>,

    #[serde(default)]
    pub last_success: Option<DateTime<Local>>,

    #[serde(default)]
    pub error_message: Option<String>,

    #[serde(default)]
    pub language: Option<String>,
}

impl TranslationState {
    pub fn view(&self) -> Value {
        json!({
            "state": self.status.as_str(),
            "last_attempt": self.last_attempt.map(|t| t.to_rfc3339()),
            "last_success": self.last_success.map(|t| t.to_rfc3339()),
            "error_message": self.error_message,
            "language": self.language,
        })
    }
}
