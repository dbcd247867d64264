//! Descriptor parser turning raw subscription content into proxy records
//!
//! Content may be:
//! - a Clash-style bundle document with a top-level `proxies` list
//! - a list of share links, one per line (`ss://`, `vmess://`, `trojan://`,
//!   `vless://`, `hysteria2://`/`hy2://`, `tuic://`, and plain forward-proxy URLs)
//! - base64 of either of the above, possibly nested

mod bundle;
pub(crate) mod encoding;
mod forward;
mod hysteria2;
mod shadowsocks;
mod trojan;
mod tuic;
mod vless;
mod vmess;

use crate::proxy::models::{DecodeError, ProxyKind, ProxyRecord};
use crate::Result;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use url::Url;

/// How many levels of base64 wrapping are peeled off a blob
pub const MAX_UNWRAP_DEPTH: usize = 2;

static BUNDLE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:proxies|proxy-groups)\s*:").expect("Invalid bundle marker regex")
});

/// Share-link schemes the parser understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scheme {
    Shadowsocks,
    Vmess,
    Trojan,
    Vless,
    Hysteria2,
    Tuic,
    Forward(ProxyKind),
}

impl Scheme {
    /// Detect the scheme of a line, returning the remainder after `://`
    fn detect(line: &str) -> Option<(Scheme, &str)> {
        let (prefix, rest) = line.split_once("://")?;
        let scheme = match prefix.to_ascii_lowercase().as_str() {
            "ss" => Scheme::Shadowsocks,
            "vmess" => Scheme::Vmess,
            "trojan" => Scheme::Trojan,
            "vless" => Scheme::Vless,
            "hysteria2" | "hy2" => Scheme::Hysteria2,
            "tuic" => Scheme::Tuic,
            "http" => Scheme::Forward(ProxyKind::Http),
            "https" => Scheme::Forward(ProxyKind::Https),
            "socks4" => Scheme::Forward(ProxyKind::Socks4),
            "socks5" => Scheme::Forward(ProxyKind::Socks5),
            _ => return None,
        };
        Some((scheme, rest))
    }
}

/// Proxy parser for decoding raw content and share links
pub struct ProxyParser;

impl ProxyParser {
    /// Decode one raw content blob into records.
    ///
    /// Malformed lines, entries and payloads are skipped; the rest of the
    /// blob is still processed.
    pub fn parse_content(content: &str, source: &str) -> Vec<ProxyRecord> {
        Self::parse_at_depth(content, source, 0)
    }

    fn parse_at_depth(content: &str, source: &str, depth: usize) -> Vec<ProxyRecord> {
        if BUNDLE_MARKER.is_match(content) {
            let records = bundle::parse_bundle(content, source);
            if !records.is_empty() {
                return records;
            }
            debug!("{}: bundle markers present but no usable entries", source);
        }

        let lines: Vec<&str> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        if depth < MAX_UNWRAP_DEPTH && is_wrapped_base64(&lines) {
            if let Some(decoded) = encoding::decode_base64_text(&lines.concat()) {
                let records = Self::parse_at_depth(&decoded, source, depth + 1);
                if !records.is_empty() {
                    return records;
                }
            }
        }

        let mut records = Vec::new();
        for line in &lines {
            if Scheme::detect(line).is_some() {
                match Self::parse_line(line, source) {
                    Ok(record) => records.push(record),
                    Err(e) => debug!("{}: skipping descriptor {}: {}", source, preview(line), e),
                }
                continue;
            }

            if encoding::looks_like_base64(line) {
                if depth >= MAX_UNWRAP_DEPTH {
                    debug!("{}: unwrap depth reached at {}", source, preview(line));
                    continue;
                }
                if let Some(decoded) = encoding::decode_base64_text(line) {
                    records.extend(Self::parse_at_depth(&decoded, source, depth + 1));
                    continue;
                }
            }

            debug!("{}: unrecognized line {}", source, preview(line));
        }

        // Base64 wrapped across several lines only decodes as a whole
        if records.is_empty() && lines.len() > 1 && depth < MAX_UNWRAP_DEPTH {
            let joined: String = lines.concat();
            if encoding::looks_like_base64(&joined) {
                if let Some(decoded) = encoding::decode_base64_text(&joined) {
                    records = Self::parse_at_depth(&decoded, source, depth + 1);
                }
            }
        }

        records
    }

    /// Decode a single share link
    pub fn parse_line(line: &str, source: &str) -> std::result::Result<ProxyRecord, DecodeError> {
        let line = line.trim();
        let (scheme, rest) = Scheme::detect(line).ok_or(DecodeError::UnsupportedScheme)?;

        let mut record = match scheme {
            Scheme::Shadowsocks => shadowsocks::decode(rest)?,
            Scheme::Vmess => vmess::decode(rest)?,
            Scheme::Trojan => trojan::decode(line)?,
            Scheme::Vless => vless::decode(line)?,
            Scheme::Hysteria2 => hysteria2::decode(rest)?,
            Scheme::Tuic => tuic::decode(rest)?,
            Scheme::Forward(kind) => forward::decode(kind, line)?,
        };

        record.raw = line.to_string();
        record.source = source.to_string();
        Ok(record)
    }

    /// Decode records from a file
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Vec<ProxyRecord>> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Ok(Self::parse_content(&content, &path.display().to_string()))
    }
}

/// One base64 payload folded at a fixed column: every line but the last has
/// the same length and the last is no longer
fn is_wrapped_base64(lines: &[&str]) -> bool {
    let Some((last, folded)) = lines.split_last() else {
        return false;
    };
    let Some(width) = folded.first().map(|line| line.len()) else {
        return false;
    };

    width % 4 == 0
        && last.len() <= width
        && folded.iter().all(|line| line.len() == width)
        && lines.iter().all(|line| encoding::looks_like_base64(line))
}

fn preview(line: &str) -> String {
    line.chars().take(48).collect()
}

/// Coerce a boolean-like token.
///
/// `true`, `1`, `yes`, `on` and `tls` are true in any case; everything else,
/// including empty input, is false.
pub(crate) fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on" | "tls"
    )
}

pub(crate) fn json_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => parse_flag(s),
        _ => false,
    }
}

/// Read a JSON field as a non-empty string, accepting numbers too
pub(crate) fn json_string(object: &Value, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn json_port(object: &Value, key: &str) -> std::result::Result<u16, DecodeError> {
    let raw = json_string(object, key).ok_or(DecodeError::MissingField("port"))?;
    parse_port(&raw)
}

pub(crate) fn parse_port(raw: &str) -> std::result::Result<u16, DecodeError> {
    match raw.trim().parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(DecodeError::InvalidPort(raw.to_string())),
    }
}

/// Percent-decode, keeping the input as-is when it is not valid UTF-8 afterwards
pub(crate) fn percent_decode(value: &str) -> String {
    urlencoding::decode(value)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

/// Split off a `#fragment`, returning the decoded display name when present
pub(crate) fn split_fragment(value: &str) -> (&str, Option<String>) {
    match value.split_once('#') {
        Some((body, fragment)) => {
            let name = percent_decode(fragment).trim().to_string();
            (body, Some(name).filter(|n| !n.is_empty()))
        }
        None => (value, None),
    }
}

/// Split `host:port`, accepting bracketed IPv6 literals
pub(crate) fn split_host_port(value: &str) -> std::result::Result<(String, u16), DecodeError> {
    let value = value.trim().trim_end_matches('/');
    let (host, port) = if let Some(stripped) = value.strip_prefix('[') {
        let (host, rest) = stripped
            .split_once(']')
            .ok_or_else(|| DecodeError::InvalidUri(value.to_string()))?;
        let port = rest
            .strip_prefix(':')
            .ok_or(DecodeError::MissingField("port"))?;
        (host, port)
    } else {
        value
            .rsplit_once(':')
            .ok_or(DecodeError::MissingField("port"))?
    };

    if host.is_empty() {
        return Err(DecodeError::MissingField("host"));
    }
    Ok((host.to_string(), parse_port(port)?))
}

/// Parse a query string into a map, last value wins
pub(crate) fn parse_query(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

pub(crate) fn query_map(url: &Url) -> HashMap<String, String> {
    url.query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Non-empty value of a query parameter
pub(crate) fn query_value(query: &HashMap<String, String>, key: &str) -> Option<String> {
    query
        .get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Host of a parsed URL without IPv6 brackets
pub(crate) fn url_host(url: &Url) -> std::result::Result<String, DecodeError> {
    let host = url.host_str().ok_or(DecodeError::MissingField("host"))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return Err(DecodeError::MissingField("host"));
    }
    Ok(host.to_string())
}

pub(crate) fn parse_url(line: &str) -> std::result::Result<Url, DecodeError> {
    Url::parse(line).map_err(|e| DecodeError::InvalidUri(e.to_string()))
}

/// Percent-decoded URL user-info field, if non-empty
pub(crate) fn url_user(value: &str) -> Option<String> {
    Some(percent_decode(value)).filter(|v| !v.is_empty())
}

/// Percent-decoded fragment of a parsed URL
pub(crate) fn url_fragment(url: &Url) -> Option<String> {
    url.fragment()
        .map(|f| percent_decode(f).trim().to_string())
        .filter(|f| !f.is_empty())
}
