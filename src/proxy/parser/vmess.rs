//! `vmess://` share links: base64 of a JSON object, optionally followed by `#name`

use super::encoding::decode_base64_text;
use super::{json_flag, json_port, json_string, split_fragment};
use crate::proxy::models::{DecodeError, Network, ProxyKind, ProxyRecord};
use serde_json::Value;

/// Cipher used when the descriptor does not name one
pub const AUTO_CIPHER: &str = "auto";

pub(super) fn decode(rest: &str) -> Result<ProxyRecord, DecodeError> {
    let (body, fragment) = split_fragment(rest);
    let json = decode_base64_text(body.trim()).ok_or(DecodeError::InvalidBase64)?;
    let object: Value =
        serde_json::from_str(&json).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;
    if !object.is_object() {
        return Err(DecodeError::InvalidJson("expected an object".to_string()));
    }

    let host = json_string(&object, "add").ok_or(DecodeError::MissingField("add"))?;
    let port = json_port(&object, "port")?;
    let uuid = json_string(&object, "id").ok_or(DecodeError::MissingField("id"))?;

    let mut record = ProxyRecord::new(ProxyKind::Vmess, &host, port)?;
    record.name = json_string(&object, "ps")
        .or(fragment)
        .unwrap_or_else(|| format!("VMess-{}", record.address()));
    record.uuid = Some(uuid);
    record.alter_id = json_string(&object, "aid").and_then(|aid| aid.parse().ok());
    record.cipher = Some(
        json_string(&object, "scy")
            .or_else(|| json_string(&object, "security"))
            .unwrap_or_else(|| AUTO_CIPHER.to_string()),
    );
    record.tls = object.get("tls").is_some_and(json_flag);
    record.sni = json_string(&object, "sni");

    record.network = json_string(&object, "net").and_then(|net| Network::from_token(&net));
    match record.network {
        Some(Network::Grpc) => {
            record.service_name =
                json_string(&object, "serviceName").or_else(|| json_string(&object, "path"));
        }
        _ => {
            record.host_header = json_string(&object, "host");
            record.path = json_string(&object, "path");
        }
    }

    Ok(record)
}
