//! `vless://uuid@host:port?security=tls&type=ws&...#name`

use super::{parse_flag, parse_url, query_map, query_value, url_fragment, url_host, url_user};
use crate::proxy::models::{DecodeError, Network, ProxyKind, ProxyRecord};

pub(super) fn decode(line: &str) -> Result<ProxyRecord, DecodeError> {
    let url = parse_url(line)?;
    let host = url_host(&url)?;
    let port = url.port().ok_or(DecodeError::MissingField("port"))?;
    let uuid = url_user(url.username()).ok_or(DecodeError::MissingField("uuid"))?;
    let query = query_map(&url);

    let mut record = ProxyRecord::new(ProxyKind::Vless, &host, port)?;
    record.name = url_fragment(&url).unwrap_or_else(|| format!("VLESS-{}", record.address()));
    record.uuid = Some(uuid);
    record.tls = query_value(&query, "security").is_some_and(|s| parse_flag(&s));
    record.flow = query_value(&query, "flow");
    record.skip_cert_verify = query_value(&query, "allowInsecure")
        .or_else(|| query_value(&query, "insecure"))
        .map(|v| parse_flag(&v));

    record.network = query_value(&query, "type").and_then(|t| Network::from_token(&t));
    match record.network {
        Some(Network::WebSocket) => {
            record.path = query_value(&query, "path");
            record.host_header = query_value(&query, "host");
        }
        Some(Network::Grpc) => {
            record.service_name = query_value(&query, "serviceName");
            record.grpc_mode = query_value(&query, "mode");
        }
        _ => {}
    }

    // Outside websocket the `host` parameter names the TLS server
    record.sni = query_value(&query, "sni").or_else(|| {
        if record.network == Some(Network::WebSocket) {
            None
        } else {
            query_value(&query, "host")
        }
    });

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    const UUID: &str = "2c981164-9b93-4bca-94ff-b78d3f8498d7";

    #[test]
    fn test_decode_websocket() {
        let line = format!(
            "vless://{}@sg.example.com:443?encryption=none&security=tls&type=ws&path=%2Fvl&host=front.example.com#SG",
            UUID
        );
        let record = decode(&line).unwrap();
        assert_eq!(record.kind, ProxyKind::Vless);
        assert_eq!(record.uuid.as_deref(), Some(UUID));
        assert!(record.tls);
        assert_eq!(record.network, Some(Network::WebSocket));
        assert_eq!(record.path.as_deref(), Some("/vl"));
        assert_eq!(record.host_header.as_deref(), Some("front.example.com"));
        assert!(record.sni.is_none());
        assert_eq!(record.name, "SG");
    }

    #[test]
    fn test_sni_falls_back_to_host_outside_websocket() {
        let line = format!(
            "vless://{}@1.2.3.4:443?security=tls&type=tcp&host=sni.example.com&flow=xtls-rprx-vision",
            UUID
        );
        let record = decode(&line).unwrap();
        assert_eq!(record.network, Some(Network::Tcp));
        assert_eq!(record.sni.as_deref(), Some("sni.example.com"));
        assert_eq!(record.flow.as_deref(), Some("xtls-rprx-vision"));
        assert!(record.host_header.is_none());
    }

    #[test]
    fn test_explicit_sni_wins() {
        let line = format!("vless://{}@1.2.3.4:443?sni=a.example.com&host=b.example.com", UUID);
        let record = decode(&line).unwrap();
        assert_eq!(record.sni.as_deref(), Some("a.example.com"));
    }

    #[test]
    fn test_grpc_and_plain_security() {
        let line = format!(
            "vless://{}@1.2.3.4:8443?security=none&type=grpc&serviceName=svc&mode=multi",
            UUID
        );
        let record = decode(&line).unwrap();
        assert!(!record.tls);
        assert_eq!(record.network, Some(Network::Grpc));
        assert_eq!(record.service_name.as_deref(), Some("svc"));
        assert_eq!(record.grpc_mode.as_deref(), Some("multi"));
        assert_eq!(record.name, "VLESS-1.2.3.4:8443");
    }

    #[test]
    fn test_decode_failures() {
        assert!(decode("vless://1.2.3.4:443").is_err());
        assert!(decode(&format!("vless://{}@1.2.3.4", UUID)).is_err());
        assert!(decode("vless://").is_err());
    }
}
