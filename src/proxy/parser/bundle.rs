//! Clash-style bundle documents with a top-level `proxies` list

use super::parse_flag;
use crate::proxy::link;
use crate::proxy::models::{DecodeError, Network, ProxyKind, ProxyRecord};
use crate::proxy::parser::vmess::AUTO_CIPHER;
use log::{debug, warn};
use serde_yaml::Value;

/// Decode every usable entry of the bundle's `proxies` list
pub(super) fn parse_bundle(content: &str, source: &str) -> Vec<ProxyRecord> {
    let document: Value = match serde_yaml::from_str(content) {
        Ok(document) => document,
        Err(e) => {
            debug!("{}: not a valid bundle document: {}", source, e);
            return Vec::new();
        }
    };

    let Some(entries) = document.get("proxies").and_then(Value::as_sequence) else {
        debug!("{}: bundle has no proxies list", source);
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match decode_entry(entry) {
            Ok(mut record) => {
                record.raw = link::encode(&record);
                record.source = source.to_string();
                Some(record)
            }
            Err(e) => {
                warn!("{}: skipping bundle entry {}: {}", source, entry_label(entry), e);
                None
            }
        })
        .collect()
}

fn entry_label(entry: &Value) -> String {
    text(entry, "name").unwrap_or_else(|| "<unnamed>".to_string())
}

fn decode_entry(entry: &Value) -> Result<ProxyRecord, DecodeError> {
    if !entry.is_mapping() {
        return Err(DecodeError::MissingField("type"));
    }

    let kind_token = text(entry, "type").ok_or(DecodeError::MissingField("type"))?;
    let tls = flag(entry, "tls");
    let kind = match kind_token.to_ascii_lowercase().as_str() {
        "ss" | "shadowsocks" => ProxyKind::Shadowsocks,
        "vmess" => ProxyKind::Vmess,
        "vless" => ProxyKind::Vless,
        "trojan" => ProxyKind::Trojan,
        "hysteria2" | "hy2" => ProxyKind::Hysteria2,
        "tuic" => ProxyKind::Tuic,
        "http" if tls == Some(true) => ProxyKind::Https,
        "http" => ProxyKind::Http,
        "https" => ProxyKind::Https,
        "socks5" => ProxyKind::Socks5,
        "socks4" => ProxyKind::Socks4,
        _ => return Err(DecodeError::UnsupportedScheme),
    };

    let host = text(entry, "server").ok_or(DecodeError::MissingField("server"))?;
    let port_raw = text(entry, "port").ok_or(DecodeError::MissingField("port"))?;
    let port = super::parse_port(&port_raw)?;

    let mut record = ProxyRecord::new(kind, &host, port)?;
    if let Some(name) = text(entry, "name") {
        record.name = name;
    }

    record.uuid = text(entry, "uuid");
    record.username = text(entry, "username");
    record.password = text(entry, "password");
    record.cipher = text(entry, "cipher");
    record.alter_id = text(entry, "alterId").and_then(|aid| aid.parse().ok());
    record.tls = tls.unwrap_or(false);
    record.skip_cert_verify = flag(entry, "skip-cert-verify");
    record.sni = text(entry, "servername").or_else(|| text(entry, "sni"));
    record.flow = text(entry, "flow");
    record.obfs = text(entry, "obfs");
    record.obfs_password = text(entry, "obfs-password");

    record.network = text(entry, "network").and_then(|n| Network::from_token(&n));
    let ws_opts = entry.get("ws-opts");
    record.path = ws_opts
        .and_then(|opts| text(opts, "path"))
        .or_else(|| text(entry, "ws-path"));
    record.host_header = ws_opts
        .and_then(|opts| opts.get("headers"))
        .or_else(|| entry.get("ws-headers"))
        .and_then(|headers| text(headers, "Host").or_else(|| text(headers, "host")));
    let grpc_opts = entry.get("grpc-opts");
    record.service_name = grpc_opts
        .and_then(|opts| text(opts, "grpc-service-name"))
        .or_else(|| text(entry, "grpc-serviceName"));
    record.grpc_mode = text(entry, "grpc-mode");

    record.tuic_version = text(entry, "version")
        .or_else(|| text(entry, "tuic_version"))
        .and_then(|v| v.parse().ok());
    record.udp_relay_mode = text(entry, "udp-relay-mode");
    record.congestion_controller = text(entry, "congestion-controller");
    record.alpn = list(entry, "alpn");
    record.disable_sni = flag(entry, "disable-sni");

    match kind {
        ProxyKind::Shadowsocks => {
            if record.cipher.is_none() {
                return Err(DecodeError::MissingField("cipher"));
            }
            if record.password.is_none() {
                return Err(DecodeError::MissingField("password"));
            }
        }
        ProxyKind::Vmess => {
            if record.uuid.is_none() {
                return Err(DecodeError::MissingField("uuid"));
            }
            record.cipher.get_or_insert_with(|| AUTO_CIPHER.to_string());
        }
        ProxyKind::Vless => {
            if record.uuid.is_none() {
                return Err(DecodeError::MissingField("uuid"));
            }
        }
        ProxyKind::Trojan => {
            if record.password.is_none() {
                return Err(DecodeError::MissingField("password"));
            }
            record.tls = true;
        }
        ProxyKind::Hysteria2 | ProxyKind::Tuic => record.tls = true,
        ProxyKind::Https => record.tls = true,
        ProxyKind::Http | ProxyKind::Socks4 | ProxyKind::Socks5 => {}
    }

    Ok(record)
}

/// Scalar field as a non-empty string
fn text(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn flag(value: &Value, key: &str) -> Option<bool> {
    match value.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => Some(n.as_f64().is_some_and(|n| n != 0.0)),
        Value::String(s) => Some(parse_flag(s)),
        _ => None,
    }
}

/// Sequence of strings, or a comma-separated string
fn list(value: &Value, key: &str) -> Vec<String> {
    match value.get(key) {
        Some(Value::Sequence(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(|s| s.trim().to_string()))
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}
