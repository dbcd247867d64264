//! Proxy module for ingesting and validating proxies
//!
//! This module provides functionality for:
//! - Decoding share links, bundle documents and base64 subscriptions
//! - Collapsing duplicate endpoints
//! - Checking liveness with bounded concurrency
//! - Ranking live proxies by latency and writing the results

pub mod checker;
pub mod dedup;
pub mod link;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod ranking;
pub mod source;
pub mod writer;

pub use checker::{CheckerConfig, ProxyChecker, TcpProbe, TransportProbe};
pub use dedup::Deduplicator;
pub use models::{
    DecodeError, IdentityOptions, Network, ProxyCheckResult, ProxyCheckStatus, ProxyKind,
    ProxyRecord,
};
pub use parser::ProxyParser;
pub use pipeline::{EmptyStage, Pipeline, PipelineOutcome};
pub use source::{ContentSource, FetchConfig, FileSource, HttpSource, RawContent, StaticSource};
pub use writer::OutputWriter;
