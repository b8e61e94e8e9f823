//! # Webhook signature verification
//!
//! The provider signs every notification with HMAC-SHA256 over a canonical manifest and ships
//! the result in the `x-signature` header as comma-separated pairs:
//!
//! ```text
//! x-signature: ts=1704908010,v1=618c85345248dd820d5fd456117c2ab2ef8eda45a0282ff693eac24131a5e839
//! ```
//!
//! The manifest is rebuilt locally from the resolved resource id, the `x-request-id` header and
//! the `ts` value, in exactly this shape (trailing semicolon included):
//!
//! ```text
//! id:{resource_id};request-id:{request_id};ts:{ts};
//! ```
//!
//! `v1` is the lowercase hex digest of the manifest under the configured secret. Digests are
//! compared in constant time after an explicit length check. Whether a failed check rejects the
//! request (strict mode) or merely logs it is the caller's decision; this module only reports
//! why verification failed.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::webhook::{WebhookRequest, REQUEST_ID_HEADER, SIGNATURE_HEADER};

type HmacSha256 = Hmac<Sha256>;

/// Why a signature check failed. The display string doubles as the stable reason code that ends
/// up in logs, so keep these lowercase and underscore-separated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// The `x-signature` or `x-request-id` header is absent.
    #[error("missing_headers")]
    MissingHeaders,
    /// The signature header is present but does not carry both a `ts` and a `v1` pair.
    #[error("missing_signature_parts")]
    MissingSignatureParts,
    /// The `v1` value is not valid hex.
    #[error("invalid_signature_format")]
    InvalidSignatureFormat,
    /// The provided digest is not the right length for HMAC-SHA256.
    #[error("length_mismatch")]
    LengthMismatch,
    /// The digests differ.
    #[error("digest_mismatch")]
    DigestMismatch,
}

/// Builds the canonical manifest the provider signs.
pub fn signature_manifest(resource_id: &str, request_id: &str, ts: &str) -> String {
    format!("id:{resource_id};request-id:{request_id};ts:{ts};")
}

/// Signs a manifest with the given secret, returning the lowercase hex digest. Handy for tools
/// that need to forge valid headers against a local instance.
pub fn sign_manifest(manifest: &str, secret: &str) -> String {
    hex::encode(hmac_digest(manifest, secret))
}

/// Verifies the `x-signature` header of a notification against the resolved resource id.
pub fn verify_webhook_signature(
    req: &WebhookRequest,
    resource_id: &str,
    secret: &str,
) -> Result<(), SignatureError> {
    let signature = req.header(SIGNATURE_HEADER).ok_or(SignatureError::MissingHeaders)?;
    let request_id = req.header(REQUEST_ID_HEADER).ok_or(SignatureError::MissingHeaders)?;
    let (ts, digest) = split_signature_header(signature)?;
    let manifest = signature_manifest(resource_id, request_id, ts);
    verify_manifest(&manifest, digest, secret)
}

/// Verifies a hex digest against the expected HMAC of the manifest. The length check runs before
/// the comparison so that digests of the wrong size never reach the constant-time path.
pub fn verify_manifest(manifest: &str, digest: &str, secret: &str) -> Result<(), SignatureError> {
    let provided = hex::decode(digest).map_err(|_| SignatureError::InvalidSignatureFormat)?;
    let expected = hmac_digest(manifest, secret);
    if provided.len() != expected.len() {
        return Err(SignatureError::LengthMismatch);
    }
    if expected.ct_eq(&provided).unwrap_u8() == 1 {
        Ok(())
    } else {
        Err(SignatureError::DigestMismatch)
    }
}

/// Pulls the `ts` and `v1` values out of the comma-separated signature header. Unknown pairs are
/// ignored so the provider can add fields without breaking us.
fn split_signature_header(header: &str) -> Result<(&str, &str), SignatureError> {
    let mut ts = None;
    let mut v1 = None;
    for part in header.split(',') {
        let mut kv = part.splitn(2, '=');
        let key = kv.next().map(str::trim);
        let value = kv.next().map(str::trim);
        match (key, value) {
            (Some("ts"), Some(v)) if !v.is_empty() => ts = Some(v),
            (Some("v1"), Some(v)) if !v.is_empty() => v1 = Some(v),
            _ => {},
        }
    }
    match (ts, v1) {
        (Some(ts), Some(v1)) => Ok((ts, v1)),
        _ => Err(SignatureError::MissingSignatureParts),
    }
}

fn hmac_digest(manifest: &str, secret: &str) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(manifest.as_bytes());
    mac.finalize().into_bytes().to_vec()
}
