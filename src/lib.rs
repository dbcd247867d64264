//! Proxy Harvest - subscription ingestion and proxy validation
//!
//! Decodes proxy descriptors from heterogeneous subscription content,
//! removes duplicates, checks every candidate with bounded concurrency and
//! ranks the live ones by latency.

pub mod config;
pub mod proxy;

pub use config::AppConfig;
pub use proxy::*;

/// Application result type
pub type Result<T> = anyhow::Result<T>;
