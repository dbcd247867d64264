//! Lenient base64 helpers shared by the share-link decoders

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD, URL_SAFE_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;

const LENIENT: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_decode_padding_mode(DecodePaddingMode::Indifferent)
    .with_decode_allow_trailing_bits(true);

const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

/// Whether the input is plausibly base64 in either alphabet.
///
/// Padding is optional, but when present it must complete a 4-character group.
pub fn looks_like_base64(input: &str) -> bool {
    let trimmed = input.trim_end_matches('=');
    let padding = input.len() - trimmed.len();

    if trimmed.is_empty() || padding > 2 {
        return false;
    }
    if !trimmed
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'-' | b'_'))
    {
        return false;
    }
    if padding > 0 {
        input.len() % 4 == 0
    } else {
        trimmed.len() % 4 != 1
    }
}

/// Decode standard or URL-safe base64, with or without padding
pub fn decode_base64(input: &str) -> Option<Vec<u8>> {
    let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let url_safe = cleaned.contains(['-', '_']);
    let (first, second) = if url_safe {
        (&URL_SAFE_LENIENT, &STANDARD_LENIENT)
    } else {
        (&STANDARD_LENIENT, &URL_SAFE_LENIENT)
    };

    first
        .decode(cleaned.as_bytes())
        .or_else(|_| second.decode(cleaned.as_bytes()))
        .ok()
}

/// Decode base64 into UTF-8 text
pub fn decode_base64_text(input: &str) -> Option<String> {
    decode_base64(input).and_then(|bytes| String::from_utf8(bytes).ok())
}

pub fn encode_standard(input: &[u8]) -> String {
    STANDARD.encode(input)
}

pub fn encode_url_safe(input: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_like_base64() {
        assert!(looks_like_base64("YWVzLTI1Ni1nY206cGFzcw=="));
        assert!(looks_like_base64("YWVzLTI1Ni1nY206cGFzcw"));
        assert!(looks_like_base64("YW-_"));
        assert!(!looks_like_base64("abcde"));
        assert!(!looks_like_base64("YWVz=="));
        assert!(!looks_like_base64("ss://abc"));
        assert!(!looks_like_base64("has space"));
        assert!(!looks_like_base64(""));
        assert!(!looks_like_base64("===="));
    }

    #[test]
    fn test_decode_padding_tolerance() {
        assert_eq!(
            decode_base64_text("YWVzLTI1Ni1nY206cGFzcw==").as_deref(),
            Some("aes-256-gcm:pass")
        );
        assert_eq!(
            decode_base64_text("YWVzLTI1Ni1nY206cGFzcw").as_deref(),
            Some("aes-256-gcm:pass")
        );
    }

    #[test]
    fn test_decode_both_alphabets() {
        let bytes = [0xfb, 0xff, 0xfe];
        assert_eq!(decode_base64(&encode_standard(&bytes)), Some(bytes.to_vec()));
        assert_eq!(decode_base64(&encode_url_safe(&bytes)), Some(bytes.to_vec()));
    }

    #[test]
    fn test_decode_ignores_whitespace() {
        assert_eq!(
            decode_base64_text("YWVzLTI1\nNi1nY206\r\ncGFzcw==").as_deref(),
            Some("aes-256-gcm:pass")
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_base64("not*base64").is_none());
        assert!(decode_base64_text(&encode_standard(&[0xff, 0xfe, 0xfd])).is_none());
    }
}
