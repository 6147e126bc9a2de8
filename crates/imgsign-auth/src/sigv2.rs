//! AWS Signature Version 2 query-string signing.
//!
//! SigV2 presigned URLs carry `AWSAccessKeyId`, `Expires` (absolute Unix
//! time) and `Signature` query parameters, where:
//!
//! ```text
//! Signature    = Base64(HMAC-SHA1(SecretKey, StringToSign))
//! StringToSign = "GET" + "\n" +
//!                Content-MD5 + "\n" +
//!                Content-Type + "\n" +
//!                Expires + "\n" +
//!                CanonicalizedResource
//! ```
//!
//! For a browser GET there are no body headers and no `x-amz-*` headers, so
//! both header slots stay empty.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, KeyInit, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Build the SigV2 string to sign for a query-authenticated request.
///
/// `resource` is the canonicalized resource, `/<bucket>/<encoded key>`.
///
/// # Examples
///
/// ```
/// use imgsign_auth::sigv2::build_string_to_sign;
///
/// assert_eq!(
///     build_string_to_sign("GET", 1_175_139_620, "/johnsmith/photos/puppy.jpg"),
///     "GET\n\n\n1175139620\n/johnsmith/photos/puppy.jpg"
/// );
/// ```
#[must_use]
pub fn build_string_to_sign(method: &str, expires: i64, resource: &str) -> String {
    format!("{method}\n\n\n{expires}\n{resource}")
}

/// Compute the base64 HMAC-SHA1 signature of `string_to_sign`.
#[must_use]
pub fn compute_signature(secret_key: &str, string_to_sign: &str) -> String {
    let mut mac =
        HmacSha1::new_from_slice(secret_key.as_bytes()).expect("HMAC can accept any key length");
    mac.update(string_to_sign.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}
