//! `hysteria2://` and `hy2://` share links
//!
//! Either a direct URI, `hy2://password@host:port?obfs=...&insecure=1#name`,
//! or base64 of a JSON object carrying `server`, `port`, `password` and a
//! nested `tls` object with `sni`/`insecure`.

use super::encoding::decode_base64_text;
use super::{
    json_flag, json_port, json_string, parse_flag, parse_url, percent_decode, query_map,
    query_value, split_fragment, url_fragment, url_host, url_user,
};
use crate::proxy::models::{DecodeError, ProxyKind, ProxyRecord};
use serde_json::Value;

/// Port assumed when a direct URI omits it
pub const DEFAULT_PORT: u16 = 443;

pub(super) fn decode(rest: &str) -> Result<ProxyRecord, DecodeError> {
    let (body, _) = split_fragment(rest);
    let authority = body.split(['?', '/']).next().unwrap_or_default();

    if authority.contains('@') {
        decode_uri(rest)
    } else {
        match decode_json(rest) {
            Err(DecodeError::InvalidBase64) | Err(DecodeError::InvalidJson(_)) => decode_uri(rest),
            decoded => decoded,
        }
    }
}

fn decode_uri(rest: &str) -> Result<ProxyRecord, DecodeError> {
    let url = parse_url(&format!("hysteria2://{}", rest))?;
    let host = url_host(&url)?;
    let port = url.port().unwrap_or(DEFAULT_PORT);
    let query = query_map(&url);

    let mut record = ProxyRecord::new(ProxyKind::Hysteria2, &host, port)?;
    record.name = url_fragment(&url).unwrap_or_else(|| format!("Hysteria2-{}", record.address()));
    record.password = match (url_user(url.username()), url.password()) {
        (Some(user), Some(pass)) => Some(format!("{}:{}", user, percent_decode(pass))),
        (user, _) => user,
    };
    record.tls = true;
    record.sni = query_value(&query, "sni");
    record.skip_cert_verify = query_value(&query, "insecure").map(|v| parse_flag(&v));
    record.obfs = query_value(&query, "obfs");
    record.obfs_password = query_value(&query, "obfs-password");
    Ok(record)
}

fn decode_json(rest: &str) -> Result<ProxyRecord, DecodeError> {
    let (body, fragment) = split_fragment(rest);
    let json = decode_base64_text(body.trim()).ok_or(DecodeError::InvalidBase64)?;
    let object: Value =
        serde_json::from_str(&json).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;

    let host = json_string(&object, "server").ok_or(DecodeError::MissingField("server"))?;
    let port = json_port(&object, "port")?;

    let mut record = ProxyRecord::new(ProxyKind::Hysteria2, &host, port)?;
    record.name = fragment.unwrap_or_else(|| format!("Hysteria2-{}", record.address()));
    record.password = json_string(&object, "password");
    record.tls = true;
    if let Some(tls) = object.get("tls").filter(|t| t.is_object()) {
        record.sni = json_string(tls, "sni");
        record.skip_cert_verify = tls.get("insecure").map(json_flag);
    }
    if let Some(obfs) = object.get("obfs").filter(|o| o.is_object()) {
        record.obfs = json_string(obfs, "type");
        record.obfs_password = json_string(obfs, "password");
    }
    Ok(record)
}
