// src/models/mod.rs

//! Domain models for the watcher application.

mod config;
mod record;

// Re-export all public types
pub use config::{Config, EmailConfig, LoggingConfig, PathsConfig, WatchConfig};
pub use record::ResidenceRecord;
