//! `trojan://password@host:port?sni=...&type=...#name`

use super::{parse_flag, parse_url, query_map, query_value, url_fragment, url_host, url_user};
use crate::proxy::models::{DecodeError, Network, ProxyKind, ProxyRecord};

pub(super) fn decode(line: &str) -> Result<ProxyRecord, DecodeError> {
    let url = parse_url(line)?;
    let host = url_host(&url)?;
    let port = url.port().ok_or(DecodeError::MissingField("port"))?;
    let password = url_user(url.username()).ok_or(DecodeError::MissingField("password"))?;
    let query = query_map(&url);

    let mut record = ProxyRecord::new(ProxyKind::Trojan, &host, port)?;
    record.name = url_fragment(&url).unwrap_or_else(|| format!("Trojan-{}", record.address()));
    record.password = Some(password);
    record.tls = true;
    record.sni = query_value(&query, "sni").or_else(|| query_value(&query, "peer"));
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
        }
        _ => {}
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_basic() {
        let record = decode("trojan://p%40ss@example.com:443?sni=cdn.example.com#JP%20Trojan").unwrap();
        assert_eq!(record.kind, ProxyKind::Trojan);
        assert_eq!(record.host, "example.com");
        assert_eq!(record.port, 443);
        assert_eq!(record.password.as_deref(), Some("p@ss"));
        assert_eq!(record.sni.as_deref(), Some("cdn.example.com"));
        assert!(record.tls);
        assert_eq!(record.name, "JP Trojan");
    }

    #[test]
    fn test_legacy_peer_and_tls_always_on() {
        let record = decode("trojan://secret@1.2.3.4:8443?peer=legacy.example.com&security=none").unwrap();
        assert_eq!(record.sni.as_deref(), Some("legacy.example.com"));
        assert!(record.tls);
        assert_eq!(record.name, "Trojan-1.2.3.4:8443");
    }

    #[test]
    fn test_transport_parameters() {
        let record = decode(
            "trojan://secret@example.com:443?type=ws&path=%2Fws&host=front.example.com&allowInsecure=1",
        )
        .unwrap();
        assert_eq!(record.network, Some(Network::WebSocket));
        assert_eq!(record.path.as_deref(), Some("/ws"));
        assert_eq!(record.host_header.as_deref(), Some("front.example.com"));
        assert_eq!(record.skip_cert_verify, Some(true));

        let record = decode("trojan://secret@example.com:443?type=grpc&serviceName=tr").unwrap();
        assert_eq!(record.network, Some(Network::Grpc));
        assert_eq!(record.service_name.as_deref(), Some("tr"));
    }

    #[test]
    fn test_ipv6_host() {
        let record = decode("trojan://secret@[2001:db8::3]:443").unwrap();
        assert_eq!(record.host, "2001:db8::3");
    }

    #[test]
    fn test_decode_failures() {
        assert!(decode("trojan://secret@example.com").is_err());
        assert!(decode("trojan://example.com:443").is_err());
        assert!(decode("trojan://secret@:443").is_err());
    }
}
