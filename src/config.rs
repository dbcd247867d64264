//! Application configuration loaded from an optional TOML file

use crate::proxy::checker::{
    CheckerConfig, DEFAULT_CONCURRENCY, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_TEST_URL,
    DEFAULT_TIMEOUT_SECS,
};
use crate::proxy::models::IdentityOptions;
use crate::proxy::source::{FetchConfig, DEFAULT_FETCH_TIMEOUT_SECS};
use crate::proxy::writer::OutputWriter;
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Subscription lists fetched when no sources are configured
const DEFAULT_SOURCES: &[&str] = &[
    "https://raw.githubusercontent.com/mahdibland/ShadowsocksAggregator/master/sub/sub_merge.txt",
    "https://raw.githubusercontent.com/freefq/free/master/v2",
    "https://raw.githubusercontent.com/ermaozi/get_proxy/main/proxy_vless.txt",
    "https://raw.githubusercontent.com/ermaozi/get_proxy/main/proxy_vmess.txt",
    "https://raw.githubusercontent.com/ermaozi/get_proxy/main/proxy_ss.txt",
    "https://raw.githubusercontent.com/ermaozi/get_proxy/main/proxy_trojan.txt",
    "https://raw.githubusercontent.com/ermaozi/get_proxy/main/proxy_hy2.txt",
    "https://raw.githubusercontent.com/ermaozi/get_proxy/main/proxy_tuic.txt",
    "https://raw.githubusercontent.com/barry-far/V2ray-Configs/main/All.txt",
    "https://raw.githubusercontent.com/changfengoss/VPS/main/VLESS.txt",
    "https://raw.githubusercontent.com/changfengoss/VPS/main/VMess.txt",
    "https://raw.githubusercontent.com/changfengoss/VPS/main/SS.txt",
    "https://raw.githubusercontent.com/changfengoss/VPS/main/Trojan.txt",
];

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Subscription URLs to fetch
    pub sources: Vec<String>,
    pub fetch_timeout_secs: u64,
    /// Deadline for the transport check
    pub check_timeout_secs: u64,
    /// Deadline for the request made through forward proxies
    pub http_check_timeout_secs: u64,
    pub max_concurrent_checks: usize,
    pub enable_http_check: bool,
    pub test_url: String,
    /// Treat trojan endpoints with different passwords as distinct
    pub dedup_trojan_by_password: bool,
    /// Keep only the fastest N proxies; unset or 0 keeps all
    pub top_n: Option<usize>,
    pub output: OutputConfig,
}

/// Where the results are written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: String,
    pub plain_text: String,
    pub clash: String,
    pub json: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sources: DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            check_timeout_secs: DEFAULT_TIMEOUT_SECS,
            http_check_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            max_concurrent_checks: DEFAULT_CONCURRENCY,
            enable_http_check: true,
            test_url: DEFAULT_TEST_URL.to_string(),
            dedup_trojan_by_password: false,
            top_n: None,
            output: OutputConfig::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "output".to_string(),
            plain_text: "proxies.txt".to_string(),
            clash: "clash_config.yaml".to_string(),
            json: "proxies.json".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file; missing keys keep their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn checker_config(&self) -> CheckerConfig {
        CheckerConfig::new()
            .with_timeout(Duration::from_secs(self.check_timeout_secs))
            .with_http_timeout(Duration::from_secs(self.http_check_timeout_secs))
            .with_concurrency(self.max_concurrent_checks)
            .with_http_check(self.enable_http_check)
            .with_test_url(self.test_url.clone())
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig::new().with_timeout(Duration::from_secs(self.fetch_timeout_secs))
    }

    pub fn identity_options(&self) -> IdentityOptions {
        IdentityOptions {
            trojan_password: self.dedup_trojan_by_password,
        }
    }

    pub fn output_writer(&self) -> OutputWriter {
        OutputWriter::new(
            &self.output.dir,
            &self.output.plain_text,
            &self.output.clash,
            &self.output.json,
        )
    }
}
