pub mod config;
pub mod sign;
pub mod snapshot;
pub mod translation;
