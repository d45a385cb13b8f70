pub mod ai;
pub mod ai_types;
pub mod config;
pub mod encoding;
pub mod format;
pub mod http;
pub mod instance;
pub mod mojibake;
pub mod pipeline;
pub mod schedule;
pub mod translation;
