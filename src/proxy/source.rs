//! Content sources supplying raw subscription blobs
//!
//! This module provides:
//! - Fetching subscription URLs concurrently over HTTP
//! - Reading local subscription files
//! - In-memory blobs for library callers

use crate::Result;
use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, info, warn};
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;

/// Default timeout for HTTP requests in seconds
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Default user agent for HTTP requests
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// One blob of raw text and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawContent {
    pub content: String,
    /// URL, path or other label of the origin
    pub source: String,
}

impl RawContent {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
        }
    }
}

/// Something that yields raw content blobs.
///
/// A source that fails entirely yields no blobs; failures never abort the
/// whole fetch.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(&self) -> Vec<RawContent>;
}

/// Configuration for HTTP fetching
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Timeout for each HTTP request
    pub timeout: Duration,
    /// User agent for HTTP requests
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// Fetches a list of subscription URLs
pub struct HttpSource {
    urls: Vec<String>,
    client: Client,
}

impl HttpSource {
    /// Create a source with default configuration
    pub fn new(urls: Vec<String>) -> Result<Self> {
        Self::with_config(urls, FetchConfig::default())
    }

    /// Create a source with custom configuration
    pub fn with_config(urls: Vec<String>, config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { urls, client })
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Fetch a single URL
    pub async fn fetch_url(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl ContentSource for HttpSource {
    async fn fetch(&self) -> Vec<RawContent> {
        let fetches = self.urls.iter().map(|url| async move {
            match self.fetch_url(url).await {
                Ok(content) => {
                    debug!("Fetched {} ({} bytes)", url, content.len());
                    Some(RawContent::new(content, url.as_str()))
                }
                Err(e) => {
                    warn!("Failed to fetch {}: {}", url, e);
                    None
                }
            }
        });

        let contents: Vec<RawContent> = join_all(fetches).await.into_iter().flatten().collect();
        info!("Fetched {} of {} sources", contents.len(), self.urls.len());
        contents
    }
}

/// Reads local subscription files
#[derive(Debug, Clone)]
pub struct FileSource {
    paths: Vec<PathBuf>,
}

impl FileSource {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

#[async_trait]
impl ContentSource for FileSource {
    async fn fetch(&self) -> Vec<RawContent> {
        let mut contents = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            match tokio::fs::read_to_string(path).await {
                Ok(content) => contents.push(RawContent::new(content, path.display().to_string())),
                Err(e) => warn!("Failed to read {}: {}", path.display(), e),
            }
        }
        contents
    }
}

/// Blobs already held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    contents: Vec<RawContent>,
}

impl StaticSource {
    pub fn new(contents: Vec<RawContent>) -> Self {
        Self { contents }
    }
}

#[async_trait]
impl ContentSource for StaticSource {
    async fn fetch(&self) -> Vec<RawContent> {
        self.contents.clone()
    }
}
