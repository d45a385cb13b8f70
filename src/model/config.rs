use serde::{Deserialize, Serialize};

use crate::model::sign::BASE_URL;

pub const DEFAULT_UPDATE_INTERVAL: u64 = 3600;
pub const DEFAULT_SCHEDULED_TIMES: &str = "00:00,08:00";
pub const DEFAULT_TRANSLATION_LANGUAGE: &str = "en";
pub const MIN_UPDATE_INTERVAL: u64 = 300;
pub const MAX_UPDATE_INTERVAL: u64 = 86_400;
pub const MAX_TIMEOUT_SECS: u64 = 300;
pub const MAX_RETRIES: usize = 10;

fn default_base_url() -> String {
    BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> usize {
    2
}

fn default_user_agent() -> String {
    format!("horoskop-core/{}", env!("CARGO_PKG_VERSION"))
}

fn default_instance_name() -> String {
    "default".to_string()
}

fn default_update_interval() -> u64 {
    DEFAULT_UPDATE_INTERVAL
}

fn default_true() -> bool {
    true
}

fn default_scheduled_times() -> String {
    DEFAULT_SCHEDULED_TIMES.to_string()
}

fn default_translation_language() -> String {
    DEFAULT_TRANSLATION_LANGUAGE.to_string()
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HttpSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GeneratorSettings {
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct InstanceSettings {
    #[serde(default = "default_instance_name")]
    pub name: String,

    /// Seconds between refreshes when exact-time scheduling is off.
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,

    #[serde(default = "default_true")]
    pub use_scheduled_refresh: bool,

    /// Comma-separated `HH:MM` list.
    #[serde(default = "default_scheduled_times")]
    pub scheduled_times: String,

    #[serde(default)]
    pub translation_enabled: bool,

    #[serde(default = "default_translation_language")]
    pub translation_language: String,

    #[serde(default)]
    pub translation_target: Option<String>,
}

impl Default for InstanceSettings {
    fn default() -> Self {
        Self {
            name: default_instance_name(),
            update_interval: default_update_interval(),
            use_scheduled_refresh: true,
            scheduled_times: default_scheduled_times(),
            translation_enabled: false,
            translation_language: default_translation_language(),
            translation_target: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub http: HttpSettings,

    #[serde(default)]
    pub generator: Option<GeneratorSettings>,

    #[serde(default, rename = "instance")]
    pub instances: Vec<InstanceSettings>,
}
