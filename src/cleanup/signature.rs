//! `X-Cleanup-Signature` request authentication

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use crate::error::ErrorKind;

pub const SIGNATURE_HEADER: &str = "x-cleanup-signature";
pub const TIMESTAMP_HEADER: &str = "x-timestamp";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Missing signature or timestamp header")]
    Missing,

    #[error("Timestamp is not a number of seconds")]
    MalformedTimestamp,

    #[error("Timestamp expired")]
    Expired,

    #[error("Signature mismatch")]
    Mismatch,
}

impl SignatureError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Auth
    }
}

/// base64url (unpadded) of HMAC-SHA256(secret, "<timestamp>.<body>")
pub fn sign(secret: &str, timestamp: i64, body: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(mac_for(secret, &timestamp.to_string(), body).finalize().into_bytes())
}

/// Check a request signed with [`sign`] against the current time `now` (unix seconds)
pub fn verify(
    secret: &str,
    signature: Option<&str>,
    timestamp: Option<&str>,
    body: &[u8],
    now: i64,
    max_skew_secs: u64,
) -> Result<(), SignatureError> {
    let (Some(signature), Some(timestamp)) = (signature, timestamp) else {
        return Err(SignatureError::Missing);
    };

    let sent_at: i64 = timestamp
        .trim()
        .parse()
        .map_err(|_| SignatureError::MalformedTimestamp)?;
    if now.abs_diff(sent_at) > max_skew_secs {
        return Err(SignatureError::Expired);
    }

    let provided = URL_SAFE_NO_PAD
        .decode(signature.trim())
        .map_err(|_| SignatureError::Mismatch)?;

    mac_for(secret, timestamp.trim(), body)
        .verify_slice(&provided)
        .map_err(|_| SignatureError::Mismatch)
}

fn mac_for(secret: &str, timestamp: &str, body: &[u8]) -> HmacSha256 {
    // HMAC accepts keys of any length
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC key of any size is valid"));
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    mac
}
