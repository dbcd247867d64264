//! Proxy data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Protocol kind of a proxy endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyKind {
    Shadowsocks,
    Vmess,
    Vless,
    Trojan,
    Hysteria2,
    Tuic,
    Http,
    Https,
    Socks4,
    Socks5,
}

impl ProxyKind {
    /// Whether the kind can be driven as a generic forward proxy by an HTTP client
    pub fn is_forward_proxy(&self) -> bool {
        matches!(self, ProxyKind::Http | ProxyKind::Socks5)
    }
}

impl fmt::Display for ProxyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyKind::Shadowsocks => write!(f, "shadowsocks"),
            ProxyKind::Vmess => write!(f, "vmess"),
            ProxyKind::Vless => write!(f, "vless"),
            ProxyKind::Trojan => write!(f, "trojan"),
            ProxyKind::Hysteria2 => write!(f, "hysteria2"),
            ProxyKind::Tuic => write!(f, "tuic"),
            ProxyKind::Http => write!(f, "http"),
            ProxyKind::Https => write!(f, "https"),
            ProxyKind::Socks4 => write!(f, "socks4"),
            ProxyKind::Socks5 => write!(f, "socks5"),
        }
    }
}

/// Transport carried underneath the proxy protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Tcp,
    #[serde(rename = "ws")]
    WebSocket,
    Grpc,
}

impl Network {
    /// Map a transport token as found in share links and bundles
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "tcp" => Some(Network::Tcp),
            "ws" | "websocket" => Some(Network::WebSocket),
            "grpc" => Some(Network::Grpc),
            _ => None,
        }
    }

    pub fn as_token(&self) -> &'static str {
        match self {
            Network::Tcp => "tcp",
            Network::WebSocket => "ws",
            Network::Grpc => "grpc",
        }
    }
}

/// Reason a descriptor could not be turned into a record
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unsupported scheme")]
    UnsupportedScheme,
    #[error("invalid base64 payload")]
    InvalidBase64,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(String),
    #[error("invalid URI: {0}")]
    InvalidUri(String),
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("invalid port: {0}")]
    InvalidPort(String),
}

/// Options that decide which fields take part in the identity key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentityOptions {
    /// Distinguish trojan endpoints by password as well as address
    pub trojan_password: bool,
}

/// Canonical record of one candidate proxy endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyRecord {
    pub name: String,
    pub kind: ProxyKind,
    pub host: String,
    pub port: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cipher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alter_id: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<Network>,
    #[serde(default)]
    pub tls: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_cert_verify: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,
    /// Host header for websocket transports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_header: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grpc_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfs_password: Option<String>,

    // TUIC options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tuic_version: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub udp_relay_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub congestion_controller: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alpn: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_sni: Option<bool>,

    /// Descriptor the record was decoded from
    pub raw: String,
    /// Identifier of the source that supplied the descriptor
    pub source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<DateTime<Utc>>,
}

impl ProxyRecord {
    /// Create a record with only the mandatory fields set.
    ///
    /// Fails when the host is empty or the port is zero, so a record that
    /// exists always has a usable address.
    pub fn new(kind: ProxyKind, host: &str, port: u16) -> Result<Self, DecodeError> {
        let host = host.trim();
        if host.is_empty() {
            return Err(DecodeError::MissingField("host"));
        }
        if port == 0 {
            return Err(DecodeError::InvalidPort("0".to_string()));
        }

        Ok(Self {
            name: format!("{}-{}", kind, authority(host, port)),
            kind,
            host: host.to_string(),
            port,
            uuid: None,
            username: None,
            password: None,
            cipher: None,
            alter_id: None,
            network: None,
            tls: false,
            skip_cert_verify: None,
            sni: None,
            host_header: None,
            path: None,
            service_name: None,
            grpc_mode: None,
            flow: None,
            obfs: None,
            obfs_password: None,
            tuic_version: None,
            udp_relay_mode: None,
            congestion_controller: None,
            alpn: Vec::new(),
            disable_sni: None,
            raw: String::new(),
            source: String::new(),
            latency_ms: None,
            checked_at: None,
        })
    }

    /// Get the endpoint in host:port form, bracketing IPv6 literals
    pub fn address(&self) -> String {
        authority(&self.host, self.port)
    }

    /// Deterministic key identifying the logical endpoint.
    ///
    /// Only protocol-relevant fields contribute: kind, host, port and the
    /// per-protocol credential that distinguishes users on the same server.
    /// The display name, provenance and probe results never do.
    pub fn identity_key(&self, options: &IdentityOptions) -> String {
        let mut parts = vec![
            self.kind.to_string(),
            self.host.to_ascii_lowercase(),
            self.port.to_string(),
        ];

        let disambiguators = match self.kind {
            ProxyKind::Vmess | ProxyKind::Vless => [self.uuid.as_ref(), None],
            ProxyKind::Hysteria2 => [self.password.as_ref(), None],
            ProxyKind::Tuic => [self.uuid.as_ref(), self.password.as_ref()],
            ProxyKind::Trojan if options.trojan_password => [self.password.as_ref(), None],
            _ => [None, None],
        };
        for value in disambiguators.into_iter().flatten() {
            if !value.is_empty() {
                parts.push(value.clone());
            }
        }

        let digest = Sha256::digest(parts.join(":").as_bytes());
        format!("{:x}", digest)
    }

    /// Whether the record carries probe results
    pub fn is_checked(&self) -> bool {
        self.latency_ms.is_some()
    }
}

impl fmt::Display for ProxyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} {})", self.name, self.kind, self.address())
    }
}

/// Join host and port, wrapping IPv6 literals in brackets
pub fn authority(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Outcome of checking a single record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyCheckStatus {
    Working,
    Failed(String),
    Timeout,
}

/// Detailed result of a proxy check
#[derive(Debug, Clone)]
pub struct ProxyCheckResult {
    pub proxy: ProxyRecord,
    pub status: ProxyCheckStatus,
}

impl ProxyCheckResult {
    pub fn working(mut proxy: ProxyRecord, latency_ms: u64, checked_at: DateTime<Utc>) -> Self {
        proxy.latency_ms = Some(latency_ms);
        proxy.checked_at = Some(checked_at);
        Self {
            proxy,
            status: ProxyCheckStatus::Working,
        }
    }

    pub fn failed(mut proxy: ProxyRecord, error: String) -> Self {
        proxy.latency_ms = None;
        Self {
            proxy,
            status: ProxyCheckStatus::Failed(error),
        }
    }

    pub fn timeout(mut proxy: ProxyRecord) -> Self {
        proxy.latency_ms = None;
        Self {
            proxy,
            status: ProxyCheckStatus::Timeout,
        }
    }

    pub fn is_working(&self) -> bool {
        matches!(self.status, ProxyCheckStatus::Working)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: ProxyKind, host: &str, port: u16) -> ProxyRecord {
        ProxyRecord::new(kind, host, port).unwrap()
    }

    #[test]
    fn test_record_creation() {
        let proxy = record(ProxyKind::Trojan, "example.com", 443);
        assert_eq!(proxy.host, "example.com");
        assert_eq!(proxy.port, 443);
        assert_eq!(proxy.kind, ProxyKind::Trojan);
        assert_eq!(proxy.name, "trojan-example.com:443");
        assert!(proxy.latency_ms.is_none());
        assert!(proxy.checked_at.is_none());
    }

    #[test]
    fn test_record_rejects_missing_address() {
        assert_eq!(
            ProxyRecord::new(ProxyKind::Http, "  ", 80),
            Err(DecodeError::MissingField("host"))
        );
        assert!(ProxyRecord::new(ProxyKind::Http, "1.2.3.4", 0).is_err());
    }

    #[test]
    fn test_address_brackets_ipv6() {
        let proxy = record(ProxyKind::Socks5, "2001:db8::1", 1080);
        assert_eq!(proxy.address(), "[2001:db8::1]:1080");
    }

    #[test]
    fn test_identity_ignores_cosmetic_fields() {
        let mut a = record(ProxyKind::Vmess, "Example.com", 443);
        a.uuid = Some("b831381d-6324-4d53-ad4f-8cda48b30811".to_string());
        let mut b = a.clone();
        b.name = "another name".to_string();
        b.host = "example.com".to_string();
        b.raw = "vmess://something-else".to_string();
        b.source = "other".to_string();
        b.latency_ms = Some(42);

        let options = IdentityOptions::default();
        assert_eq!(a.identity_key(&options), b.identity_key(&options));
        assert_eq!(a.identity_key(&options).len(), 64);
    }

    #[test]
    fn test_identity_uses_uuid_for_vmess() {
        let mut a = record(ProxyKind::Vmess, "example.com", 443);
        a.uuid = Some("uuid-a".to_string());
        let mut b = a.clone();
        b.uuid = Some("uuid-b".to_string());

        let options = IdentityOptions::default();
        assert_ne!(a.identity_key(&options), b.identity_key(&options));
    }

    #[test]
    fn test_identity_tuic_uses_uuid_and_password() {
        let mut a = record(ProxyKind::Tuic, "example.com", 443);
        a.uuid = Some("u1".to_string());
        a.password = Some("pw".to_string());
        let mut b = a.clone();
        b.uuid = Some("u2".to_string());
        let mut c = a.clone();
        c.password = Some("other".to_string());

        let options = IdentityOptions::default();
        assert_ne!(a.identity_key(&options), b.identity_key(&options));
        assert_ne!(a.identity_key(&options), c.identity_key(&options));
        assert_eq!(a.identity_key(&options), a.clone().identity_key(&options));
    }

    #[test]
    fn test_identity_trojan_password_toggle() {
        let mut a = record(ProxyKind::Trojan, "example.com", 443);
        a.password = Some("one".to_string());
        let mut b = a.clone();
        b.password = Some("two".to_string());

        let ignore = IdentityOptions::default();
        assert_eq!(a.identity_key(&ignore), b.identity_key(&ignore));

        let include = IdentityOptions {
            trojan_password: true,
        };
        assert_ne!(a.identity_key(&include), b.identity_key(&include));
    }

    #[test]
    fn test_identity_separates_kinds() {
        let a = record(ProxyKind::Http, "10.0.0.1", 8080);
        let b = record(ProxyKind::Socks5, "10.0.0.1", 8080);
        let options = IdentityOptions::default();
        assert_ne!(a.identity_key(&options), b.identity_key(&options));
    }

    #[test]
    fn test_proxy_check_result() {
        let proxy = record(ProxyKind::Http, "127.0.0.1", 8080);

        let result = ProxyCheckResult::working(proxy.clone(), 100, Utc::now());
        assert!(result.is_working());
        assert_eq!(result.proxy.latency_ms, Some(100));
        assert!(result.proxy.checked_at.is_some());

        let result = ProxyCheckResult::failed(proxy.clone(), "Connection refused".to_string());
        assert!(!result.is_working());
        assert!(result.proxy.latency_ms.is_none());

        let result = ProxyCheckResult::timeout(proxy);
        assert!(!result.is_working());
    }

    #[test]
    fn test_network_tokens() {
        assert_eq!(Network::from_token("WS"), Some(Network::WebSocket));
        assert_eq!(Network::from_token("grpc"), Some(Network::Grpc));
        assert_eq!(Network::from_token("kcp"), None);
        assert_eq!(Network::WebSocket.as_token(), "ws");
    }
}
