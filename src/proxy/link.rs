//! Share-link encoder, the inverse of the descriptor parser
//!
//! Records decoded from bundle documents have no original link, so one is
//! rebuilt here for the plain-text output.

use crate::proxy::models::{Network, ProxyKind, ProxyRecord};
use crate::proxy::parser::encoding::{encode_standard, encode_url_safe};
use serde_json::{json, Map, Value};
use urlencoding::encode as percent_encode;

/// Build a share link for the record
pub fn encode(record: &ProxyRecord) -> String {
    match record.kind {
        ProxyKind::Shadowsocks => shadowsocks(record),
        ProxyKind::Vmess => vmess(record),
        ProxyKind::Trojan => trojan(record),
        ProxyKind::Vless => vless(record),
        ProxyKind::Hysteria2 => hysteria2(record),
        ProxyKind::Tuic => tuic(record),
        ProxyKind::Http | ProxyKind::Https | ProxyKind::Socks4 | ProxyKind::Socks5 => forward(record),
    }
}

fn fragment(record: &ProxyRecord) -> String {
    format!("#{}", percent_encode(&record.name))
}

fn query_string(params: &[(&str, Option<String>)]) -> String {
    let pairs: Vec<String> = params
        .iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| format!("{}={}", key, percent_encode(v))))
        .collect();
    if pairs.is_empty() {
        String::new()
    } else {
        format!("?{}", pairs.join("&"))
    }
}

fn flag(value: Option<bool>) -> Option<String> {
    value.map(|v| if v { "1" } else { "0" }.to_string())
}

/// Transport parameters shared by trojan and vless links
fn transport_params(record: &ProxyRecord) -> Vec<(&'static str, Option<String>)> {
    let mut params = vec![("type", record.network.map(|n| n.as_token().to_string()))];
    match record.network {
        Some(Network::WebSocket) => {
            params.push(("path", record.path.clone()));
            params.push(("host", record.host_header.clone()));
        }
        Some(Network::Grpc) => {
            params.push(("serviceName", record.service_name.clone()));
            params.push(("mode", record.grpc_mode.clone()));
        }
        _ => {}
    }
    params
}

fn shadowsocks(record: &ProxyRecord) -> String {
    let user_info = format!(
        "{}:{}",
        record.cipher.as_deref().unwrap_or_default(),
        record.password.as_deref().unwrap_or_default()
    );
    format!(
        "ss://{}@{}{}",
        encode_url_safe(user_info.as_bytes()),
        record.address(),
        fragment(record)
    )
}

fn vmess(record: &ProxyRecord) -> String {
    let mut object = Map::new();
    object.insert("v".into(), json!("2"));
    object.insert("ps".into(), json!(record.name));
    object.insert("add".into(), json!(record.host));
    object.insert("port".into(), json!(record.port.to_string()));
    object.insert("id".into(), json!(record.uuid.clone().unwrap_or_default()));
    object.insert("aid".into(), json!(record.alter_id.unwrap_or(0).to_string()));
    object.insert("tls".into(), json!(if record.tls { "tls" } else { "" }));

    let optional = [
        ("scy", record.cipher.clone()),
        ("net", record.network.map(|n| n.as_token().to_string())),
        ("sni", record.sni.clone()),
        ("host", record.host_header.clone()),
        (
            "path",
            match record.network {
                Some(Network::Grpc) => record.service_name.clone(),
                _ => record.path.clone(),
            },
        ),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            object.insert(key.into(), Value::String(value));
        }
    }

    format!("vmess://{}", encode_standard(Value::Object(object).to_string().as_bytes()))
}

fn trojan(record: &ProxyRecord) -> String {
    let mut params = vec![("sni", record.sni.clone())];
    params.extend(transport_params(record));
    params.push(("allowInsecure", flag(record.skip_cert_verify)));

    format!(
        "trojan://{}@{}{}{}",
        percent_encode(record.password.as_deref().unwrap_or_default()),
        record.address(),
        query_string(&params),
        fragment(record)
    )
}

fn vless(record: &ProxyRecord) -> String {
    let security = if record.tls { "tls" } else { "none" };
    let mut params = vec![
        ("encryption", Some("none".to_string())),
        ("security", Some(security.to_string())),
        ("sni", record.sni.clone()),
        ("flow", record.flow.clone()),
    ];
    params.extend(transport_params(record));
    params.push(("allowInsecure", flag(record.skip_cert_verify)));

    format!(
        "vless://{}@{}{}{}",
        percent_encode(record.uuid.as_deref().unwrap_or_default()),
        record.address(),
        query_string(&params),
        fragment(record)
    )
}

fn hysteria2(record: &ProxyRecord) -> String {
    let params = [
        ("sni", record.sni.clone()),
        ("insecure", flag(record.skip_cert_verify)),
        ("obfs", record.obfs.clone()),
        ("obfs-password", record.obfs_password.clone()),
    ];
    let user_info = record
        .password
        .as_deref()
        .map(|p| format!("{}@", percent_encode(p)))
        .unwrap_or_default();

    format!(
        "hysteria2://{}{}/{}{}",
        user_info,
        record.address(),
        query_string(&params),
        fragment(record)
    )
}

fn tuic(record: &ProxyRecord) -> String {
    let password = record.password.as_deref().unwrap_or_default();
    let alpn = Some(record.alpn.join(",")).filter(|a| !a.is_empty());
    let params = [
        ("version", record.tuic_version.map(|v| v.to_string())),
        ("udp_relay_mode", record.udp_relay_mode.clone()),
        ("congestion_controller", record.congestion_controller.clone()),
        ("alpn", alpn),
        ("sni", record.sni.clone()),
        ("disable_sni", flag(record.disable_sni)),
        ("skip_cert_verify", flag(record.skip_cert_verify)),
    ];

    // Only the clear-text form can carry a uuid next to the password
    if let Some(uuid) = &record.uuid {
        return format!(
            "tuic://{}:{}@{}{}{}",
            percent_encode(uuid),
            percent_encode(password),
            record.address(),
            query_string(&params),
            fragment(record)
        );
    }

    let body = format!(
        "{}@{}{}",
        percent_encode(password),
        record.address(),
        query_string(&params)
    );
    format!("tuic://{}{}", encode_url_safe(body.as_bytes()), fragment(record))
}

fn forward(record: &ProxyRecord) -> String {
    let user_info = match (&record.username, &record.password) {
        (Some(user), Some(pass)) => format!("{}:{}@", percent_encode(user), percent_encode(pass)),
        (Some(user), None) => format!("{}@", percent_encode(user)),
        (None, _) => String::new(),
    };
    format!("{}://{}{}{}", record.kind, user_info, record.address(), fragment(record))
}
