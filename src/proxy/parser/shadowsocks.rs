//! `ss://` share links
//!
//! Two layouts are in circulation:
//! - SIP002: `ss://base64(method:password)@host:port[/?plugin=...]#name`
//! - legacy: `ss://base64(method:password@host:port)#name`

use super::encoding::decode_base64_text;
use super::{percent_decode, split_fragment, split_host_port};
use crate::proxy::models::{DecodeError, ProxyKind, ProxyRecord};

pub(super) fn decode(rest: &str) -> Result<ProxyRecord, DecodeError> {
    let (body, name) = split_fragment(rest);
    let body = body.split('?').next().unwrap_or_default();

    let (user_info, server) = match body.rsplit_once('@') {
        Some((user_info, server)) => (credentials(user_info)?, server.to_string()),
        None => {
            let decoded = decode_base64_text(body).ok_or(DecodeError::InvalidBase64)?;
            let (user_info, server) = decoded
                .rsplit_once('@')
                .ok_or(DecodeError::MissingField("server"))?;
            (split_method(user_info)?, server.to_string())
        }
    };

    let (host, port) = split_host_port(&server)?;
    let (method, password) = user_info;

    let mut record = ProxyRecord::new(ProxyKind::Shadowsocks, &host, port)?;
    record.name = name.unwrap_or_else(|| format!("Shadowsocks-{}", record.address()));
    record.cipher = Some(method);
    record.password = Some(password);
    Ok(record)
}

/// User-info is normally base64, but some publishers percent-encode it instead
fn credentials(user_info: &str) -> Result<(String, String), DecodeError> {
    if let Some(decoded) = decode_base64_text(user_info) {
        if let Ok(parsed) = split_method(&decoded) {
            return Ok(parsed);
        }
    }
    split_method(&percent_decode(user_info))
}

fn split_method(value: &str) -> Result<(String, String), DecodeError> {
    let (method, password) = value
        .split_once(':')
        .ok_or(DecodeError::MissingField("password"))?;
    let method = method.trim();
    if method.is_empty() {
        return Err(DecodeError::MissingField("cipher"));
    }
    Ok((method.to_string(), password.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::parser::encoding::{encode_standard, encode_url_safe};

    #[test]
    fn test_decode_sip002() {
        let record = decode("YWVzLTI1Ni1nY206cGFzcw==@1.2.3.4:8388#Test").unwrap();
        assert_eq!(record.kind, ProxyKind::Shadowsocks);
        assert_eq!(record.host, "1.2.3.4");
        assert_eq!(record.port, 8388);
        assert_eq!(record.cipher.as_deref(), Some("aes-256-gcm"));
        assert_eq!(record.password.as_deref(), Some("pass"));
        assert_eq!(record.name, "Test");
    }

    #[test]
    fn test_decode_url_safe_without_padding() {
        let user_info = encode_url_safe(b"chacha20-ietf-poly1305:p>?w~d");
        let record = decode(&format!("{}@example.com:443", user_info)).unwrap();
        assert_eq!(record.cipher.as_deref(), Some("chacha20-ietf-poly1305"));
        assert_eq!(record.password.as_deref(), Some("p>?w~d"));
    }

    #[test]
    fn test_default_name_from_address() {
        let record = decode("YWVzLTI1Ni1nY206cGFzcw@1.2.3.4:8388").unwrap();
        assert_eq!(record.name, "Shadowsocks-1.2.3.4:8388");
    }

    #[test]
    fn test_decode_legacy_layout() {
        let body = encode_standard(b"aes-128-gcm:secret@10.0.0.1:8443");
        let record = decode(&format!("{}#Legacy", body)).unwrap();
        assert_eq!(record.host, "10.0.0.1");
        assert_eq!(record.port, 8443);
        assert_eq!(record.cipher.as_deref(), Some("aes-128-gcm"));
        assert_eq!(record.password.as_deref(), Some("secret"));
        assert_eq!(record.name, "Legacy");
    }

    #[test]
    fn test_decode_plain_user_info_and_plugin() {
        let record =
            decode("2022-blake3-aes-128-gcm:c2VjcmV0@example.com:8388/?plugin=obfs-local#N").unwrap();
        assert_eq!(record.cipher.as_deref(), Some("2022-blake3-aes-128-gcm"));
        assert_eq!(record.password.as_deref(), Some("c2VjcmV0"));
        assert_eq!(record.port, 8388);
    }

    #[test]
    fn test_password_with_colon() {
        let user_info = encode_standard(b"aes-256-gcm:a:b:c");
        let record = decode(&format!("{}@[2001:db8::2]:8388", user_info)).unwrap();
        assert_eq!(record.password.as_deref(), Some("a:b:c"));
        assert_eq!(record.host, "2001:db8::2");
    }

    #[test]
    fn test_decode_failures() {
        assert!(decode("YWVzLTI1Ni1nY206cGFzcw==@1.2.3.4").is_err());
        assert!(decode("!!!").is_err());
        assert!(decode("bm9jb2xvbg==@1.2.3.4:80").is_err());
    }
}
