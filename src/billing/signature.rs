//! `Paddle-Signature: ts=<unix>;h1=<hex hmac>` verification.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::WebhookError;

pub const SIGNATURE_HEADER: &str = "Paddle-Signature";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, PartialEq, Eq)]
pub struct ParsedSignature {
    pub h1: Vec<u8>,
}

/// Extracts the `h1` digest. `ts` is not part of the signed payload and is skipped.
pub fn parse_header(header: &str) -> Result<ParsedSignature, WebhookError> {
    let mut h1 = None;

    for part in header.split(';') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        if key == "h1" {
            h1 = Some(hex::decode(value).map_err(|_| WebhookError::MalformedSignature)?);
        }
    }

    match h1 {
        Some(h1) if !h1.is_empty() => Ok(ParsedSignature { h1 }),
        _ => Err(WebhookError::MalformedSignature),
    }
}

fn mac(secret: &str, body: &[u8]) -> Result<HmacSha256, WebhookError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| WebhookError::MissingSecret)?;
    mac.update(body);
    Ok(mac)
}

/// Check `header` against an HMAC-SHA256 of the raw body. Fails closed on
/// a missing secret or header.
pub fn verify(secret: Option<&str>, header: Option<&str>, body: &[u8]) -> Result<(), WebhookError> {
    let secret = secret.filter(|s| !s.is_empty()).ok_or(WebhookError::MissingSecret)?;
    let header = header.filter(|h| !h.trim().is_empty()).ok_or(WebhookError::MissingSignature)?;
    let parsed = parse_header(header)?;

    mac(secret, body)?
        .verify_slice(&parsed.h1)
        .map_err(|_| WebhookError::SignatureMismatch)
}

/// Build a header value the way the billing provider would.
pub fn signature_header(secret: &str, timestamp: i64, body: &[u8]) -> Result<String, WebhookError> {
    let digest = mac(secret, body)?.finalize().into_bytes();
    Ok(format!("ts={};h1={}", timestamp, hex::encode(digest)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"event_type":"transaction.completed"}"#;

    #[test]
    fn test_round_trip_signature_verifies() {
        let header = signature_header("whsec", 1_700_000_000, BODY).unwrap();
        assert!(header.starts_with("ts=1700000000;h1="));
        assert_eq!(verify(Some("whsec"), Some(&header), BODY), Ok(()));
    }

    #[test]
    fn test_tampered_body_fails() {
        let header = signature_header("whsec", 1, BODY).unwrap();
        let tampered = br#"{"event_type":"transaction.completed","x":1}"#;
        assert_eq!(verify(Some("whsec"), Some(&header), tampered), Err(WebhookError::SignatureMismatch));
    }

    #[test]
    fn test_wrong_secret_fails() {
        let header = signature_header("other", 1, BODY).unwrap();
        assert_eq!(verify(Some("whsec"), Some(&header), BODY), Err(WebhookError::SignatureMismatch));
    }

    #[test]
    fn test_fails_closed_without_secret_or_header() {
        let header = signature_header("whsec", 1, BODY).unwrap();
        assert_eq!(verify(None, Some(&header), BODY), Err(WebhookError::MissingSecret));
        assert_eq!(verify(Some(""), Some(&header), BODY), Err(WebhookError::MissingSecret));
        assert_eq!(verify(Some("whsec"), None, BODY), Err(WebhookError::MissingSignature));
    }

    #[test]
    fn test_malformed_headers() {
        assert_eq!(parse_header("ts=1"), Err(WebhookError::MalformedSignature));
        assert_eq!(parse_header("ts=1;h1=zz"), Err(WebhookError::MalformedSignature));
        assert_eq!(parse_header("h1="), Err(WebhookError::MalformedSignature));

        let parsed = parse_header("ts=42; h1=abcd").unwrap();
        assert_eq!(parsed, ParsedSignature { h1: vec![0xab, 0xcd] });
        assert_eq!(parse_header("ts=not-a-number;h1=abcd").unwrap().h1, vec![0xab, 0xcd]);
    }

    #[test]
    fn test_truncated_digest_is_rejected() {
        let header = signature_header("whsec", 1, BODY).unwrap();
        let truncated = &header[..header.len() - 2];
        assert_eq!(verify(Some("whsec"), Some(truncated), BODY), Err(WebhookError::SignatureMismatch));
    }
}
