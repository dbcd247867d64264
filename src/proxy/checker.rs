//! Proxy checker module for verifying that candidates are live
//!
//! Every record gets a transport check (a plain TCP connect with its own
//! deadline). Records whose kind can be driven as a generic forward proxy
//! additionally get an HTTP GET through the candidate when the application
//! check is enabled. Tunnelling kinds pass that phase untouched.

use crate::proxy::models::{ProxyCheckResult, ProxyCheckStatus, ProxyKind, ProxyRecord};
use crate::Result;
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, warn};
use reqwest::{Client, Proxy as ReqwestProxy};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Default transport check timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Default application check timeout in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Default number of concurrent checks
pub const DEFAULT_CONCURRENCY: usize = 50;

/// Default URL fetched through forward proxies
pub const DEFAULT_TEST_URL: &str = "https://www.google.com";

/// Configuration for proxy checker
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Deadline for establishing the transport connection
    pub timeout: Duration,
    /// Deadline for the request made through the proxy
    pub http_timeout: Duration,
    /// Number of checks in flight at once
    pub concurrency: usize,
    /// Whether forward proxies get the application check
    pub http_check: bool,
    /// URL to test forward proxies against
    pub test_url: String,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            concurrency: DEFAULT_CONCURRENCY,
            http_check: true,
            test_url: DEFAULT_TEST_URL.to_string(),
        }
    }
}

impl CheckerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Set the concurrency ceiling, never below one
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_http_check(mut self, enabled: bool) -> Self {
        self.http_check = enabled;
        self
    }

    pub fn with_test_url(mut self, url: String) -> Self {
        self.test_url = url;
        self
    }
}

/// Establishes a bare connection to an endpoint
#[async_trait]
pub trait TransportProbe: Send + Sync + 'static {
    async fn connect(&self, host: &str, port: u16) -> io::Result<()>;
}

/// Transport probe over TCP
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProbe;

#[async_trait]
impl TransportProbe for TcpProbe {
    async fn connect(&self, host: &str, port: u16) -> io::Result<()> {
        TcpStream::connect((host, port)).await.map(drop)
    }
}

/// Proxy checker for validating proxies
pub struct ProxyChecker<P: TransportProbe = TcpProbe> {
    config: CheckerConfig,
    probe: Arc<P>,
}

impl ProxyChecker<TcpProbe> {
    /// Create a new proxy checker with default configuration
    pub fn new() -> Self {
        Self::with_config(CheckerConfig::default())
    }

    /// Create a new proxy checker with custom configuration
    pub fn with_config(config: CheckerConfig) -> Self {
        Self::with_probe(config, Arc::new(TcpProbe))
    }
}

impl<P: TransportProbe> ProxyChecker<P> {
    /// Create a checker that uses the given transport probe
    pub fn with_probe(config: CheckerConfig, probe: Arc<P>) -> Self {
        Self { config, probe }
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Check a single proxy
    pub async fn check_proxy(&self, proxy: ProxyRecord) -> ProxyCheckResult {
        let start = Instant::now();
        let connected =
            tokio::time::timeout(self.config.timeout, self.probe.connect(&proxy.host, proxy.port))
                .await;
        let latency_ms = match connected {
            Ok(Ok(())) => start.elapsed().as_millis() as u64,
            Ok(Err(e)) => return ProxyCheckResult::failed(proxy, e.to_string()),
            Err(_) => return ProxyCheckResult::timeout(proxy),
        };

        if self.config.http_check && proxy.kind.is_forward_proxy() {
            match self.check_through(&proxy).await {
                ProxyCheckStatus::Working => {}
                ProxyCheckStatus::Failed(reason) => return ProxyCheckResult::failed(proxy, reason),
                ProxyCheckStatus::Timeout => return ProxyCheckResult::timeout(proxy),
            }
        }

        ProxyCheckResult::working(proxy, latency_ms, Utc::now())
    }

    /// Fetch the test URL through the candidate
    async fn check_through(&self, proxy: &ProxyRecord) -> ProxyCheckStatus {
        let client = match self.create_client(proxy) {
            Ok(client) => client,
            Err(e) => return ProxyCheckStatus::Failed(e.to_string()),
        };

        match tokio::time::timeout(self.config.http_timeout, client.get(&self.config.test_url).send())
            .await
        {
            Ok(Ok(response)) if response.status().is_success() => ProxyCheckStatus::Working,
            Ok(Ok(response)) => ProxyCheckStatus::Failed(format!("HTTP status: {}", response.status())),
            Ok(Err(e)) => ProxyCheckStatus::Failed(e.to_string()),
            Err(_) => ProxyCheckStatus::Timeout,
        }
    }

    /// Check every record, returning results in completion order
    pub async fn check_all(&self, proxies: Vec<ProxyRecord>) -> Vec<ProxyCheckResult> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for proxy in proxies {
            let semaphore = Arc::clone(&semaphore);
            let checker = self.clone();
            tasks.spawn(async move {
                // Held for the whole check; dropped on every exit path
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => return ProxyCheckResult::failed(proxy, e.to_string()),
                };
                checker.check_proxy(proxy).await
            });
        }

        let mut results = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => warn!("Proxy check task failed: {}", e),
            }
        }
        results
    }

    /// Check every record and keep only the live ones, in completion order
    pub async fn check_proxies(&self, proxies: Vec<ProxyRecord>) -> Vec<ProxyRecord> {
        self.check_all(proxies)
            .await
            .into_iter()
            .filter_map(|result| {
                if result.is_working() {
                    Some(result.proxy)
                } else {
                    debug!("{} is not usable: {:?}", result.proxy, result.status);
                    None
                }
            })
            .collect()
    }

    /// Create a reqwest client that routes through the proxy
    fn create_client(&self, proxy: &ProxyRecord) -> Result<Client> {
        let reqwest_proxy = ReqwestProxy::all(proxy_url(proxy))?;

        let client = Client::builder()
            .proxy(reqwest_proxy)
            .timeout(self.config.http_timeout)
            .build()?;

        Ok(client)
    }
}

impl<P: TransportProbe> Clone for ProxyChecker<P> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            probe: Arc::clone(&self.probe),
        }
    }
}

impl Default for ProxyChecker<TcpProbe> {
    fn default() -> Self {
        Self::new()
    }
}

/// Proxy URL in the form reqwest expects
fn proxy_url(proxy: &ProxyRecord) -> String {
    let scheme = match proxy.kind {
        ProxyKind::Socks5 => "socks5",
        ProxyKind::Socks4 => "socks4",
        ProxyKind::Https => "https",
        _ => "http",
    };
    match (&proxy.username, &proxy.password) {
        (Some(user), Some(pass)) => format!(
            "{}://{}:{}@{}",
            scheme,
            urlencoding::encode(user),
            urlencoding::encode(pass),
            proxy.address()
        ),
        _ => format!("{}://{}", scheme, proxy.address()),
    }
}
