//! Presigned GET URL assembly.
//!
//! A [`Presigner`] holds everything that is fixed for the lifetime of the
//! process (credentials, endpoint, bucket, region, scheme, addressing style and
//! signature version). Each call to [`Presigner::presign_get`] produces a fresh
//! URL for one object key, valid for the requested duration from "now".
//!
//! SigV4 URLs carry the following query parameters:
//!
//! - `X-Amz-Algorithm` - Always `AWS4-HMAC-SHA256`
//! - `X-Amz-Credential` - `AKID/date/region/s3/aws4_request`
//! - `X-Amz-Date` - ISO 8601 basic format timestamp (`YYYYMMDDTHHMMSSZ`)
//! - `X-Amz-Expires` - Validity duration in seconds
//! - `X-Amz-SignedHeaders` - Always `host`
//! - `X-Amz-Signature` - The hex-encoded signature
//!
//! SigV2 URLs carry `AWSAccessKeyId`, `Expires` and `Signature`.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use typed_builder::TypedBuilder;

use crate::canonical::{
    build_canonical_query_string, build_canonical_request, encode_object_path, encode_query_value,
};
use crate::credentials::Credentials;
use crate::error::SignError;
use crate::sigv2;
use crate::sigv4::{self, ALGORITHM, MAX_EXPIRES_SECS, SERVICE, UNSIGNED_PAYLOAD};

/// Which query-string signing scheme to emit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureVersion {
    /// AWS Signature Version 4 (HMAC-SHA256).
    #[default]
    V4,
    /// Legacy AWS Signature Version 2 (HMAC-SHA1).
    V2,
}

impl fmt::Display for SignatureVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4 => f.write_str("v4"),
            Self::V2 => f.write_str("v2"),
        }
    }
}

/// Error returned when a signature version string is not recognized.
#[derive(Debug, thiserror::Error)]
#[error("unknown signature version: {0} (expected v4 or v2)")]
pub struct UnknownSignatureVersion(pub String);

impl FromStr for SignatureVersion {
    type Err = UnknownSignatureVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v4" | "4" | "s3v4" => Ok(Self::V4),
            "v2" | "2" | "s3v2" => Ok(Self::V2),
            _ => Err(UnknownSignatureVersion(s.to_owned())),
        }
    }
}

/// Where the bucket name goes in the generated URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AddressingStyle {
    /// `https://endpoint/bucket/key`
    #[default]
    Path,
    /// `https://bucket.endpoint/key`
    VirtualHosted,
}

/// Builds presigned GET URLs for objects in a single bucket.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use imgsign_auth::{AddressingStyle, Credentials, Presigner, SignatureVersion};
///
/// let presigner = Presigner::builder()
///     .credentials(Credentials::new("AKID", "secret"))
///     .endpoint("minio.local:9000".to_owned())
///     .bucket("site".to_owned())
///     .secure(false)
///     .version(SignatureVersion::V2)
///     .style(AddressingStyle::Path)
///     .build();
///
/// let url = presigner.presign_get("a.jpg", Duration::from_secs(60)).unwrap();
/// assert!(url.starts_with("http://minio.local:9000/site/a.jpg?AWSAccessKeyId=AKID&Expires="));
/// ```
#[derive(Debug, Clone, TypedBuilder)]
pub struct Presigner {
    /// Long-term credentials used as signing material.
    credentials: Credentials,

    /// Store endpoint as `host[:port]`, without scheme or path.
    endpoint: String,

    /// Bucket every object key is resolved against.
    bucket: String,

    /// Region placed in the SigV4 credential scope.
    #[builder(default = String::from("us-east-1"))]
    region: String,

    /// Emit `https` URLs.
    #[builder(default = true)]
    secure: bool,

    /// Bucket placement in the URL.
    #[builder(default)]
    style: AddressingStyle,

    /// Query signing scheme.
    #[builder(default)]
    version: SignatureVersion,
}

impl Presigner {
    /// The bucket this presigner signs for.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Presign a GET for `key`, valid for `expires` from now.
    pub fn presign_get(&self, key: &str, expires: Duration) -> Result<String, SignError> {
        self.presign_get_at(key, expires, Utc::now())
    }

    /// Presign a GET for `key`, valid for `expires` from `now`.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::EmptyObjectKey`] or [`SignError::EmptyBucket`] for
    /// empty names, [`SignError::InvalidEndpoint`] if the endpoint carries a
    /// scheme or path, and [`SignError::ExpiryOutOfRange`] if `expires` is not
    /// between one second and seven days.
    pub fn presign_get_at(
        &self,
        key: &str,
        expires: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, SignError> {
        if key.is_empty() {
            return Err(SignError::EmptyObjectKey);
        }
        if self.bucket.is_empty() {
            return Err(SignError::EmptyBucket);
        }

        let seconds = expires.as_secs();
        if seconds == 0 || seconds > MAX_EXPIRES_SECS {
            return Err(SignError::ExpiryOutOfRange {
                seconds,
                max: MAX_EXPIRES_SECS,
            });
        }

        let host = self.host()?;
        let path = self.object_path(key);

        debug!(
            bucket = %self.bucket,
            object_key = key,
            version = %self.version,
            expires = seconds,
            "presigning object url"
        );

        let query = match self.version {
            SignatureVersion::V4 => self.sign_v4(&host, &path, seconds, now),
            SignatureVersion::V2 => self.sign_v2(key, seconds, now)?,
        };

        Ok(format!("{}://{host}{path}?{query}", self.scheme()))
    }

    fn sign_v4(&self, host: &str, path: &str, seconds: u64, now: DateTime<Utc>) -> String {
        let date = now.format("%Y%m%d").to_string();
        let timestamp = now.format("%Y%m%dT%H%M%SZ").to_string();
        let scope = sigv4::credential_scope(&date, &self.region, SERVICE);
        let credential = format!("{}/{scope}", self.credentials.access_key_id());

        let query = build_canonical_query_string(&format!(
            "X-Amz-Algorithm={ALGORITHM}\
             &X-Amz-Credential={}\
             &X-Amz-Date={timestamp}\
             &X-Amz-Expires={seconds}\
             &X-Amz-SignedHeaders=host",
            encode_query_value(&credential)
        ));

        let canonical_request = build_canonical_request(
            "GET",
            path,
            &query,
            &[("host", host)],
            &["host"],
            UNSIGNED_PAYLOAD,
        );
        let string_to_sign = sigv4::build_string_to_sign(
            &timestamp,
            &scope,
            &sigv4::hash_canonical_request(&canonical_request),
        );
        let signing_key = sigv4::derive_signing_key(
            self.credentials.secret_access_key(),
            &date,
            &self.region,
            SERVICE,
        );
        let signature = sigv4::compute_signature(&signing_key, &string_to_sign);

        format!("{query}&X-Amz-Signature={signature}")
    }

    fn sign_v2(&self, key: &str, seconds: u64, now: DateTime<Utc>) -> Result<String, SignError> {
        let expires_at = i64::try_from(seconds)
            .ok()
            .and_then(|secs| now.timestamp().checked_add(secs))
            .ok_or(SignError::InvalidExpiryTimestamp)?;

        // The canonicalized resource always names the bucket, whatever the addressing style.
        let resource = format!("/{}/{}", self.bucket, encode_object_path(key));
        let string_to_sign = sigv2::build_string_to_sign("GET", expires_at, &resource);
        let signature =
            sigv2::compute_signature(self.credentials.secret_access_key(), &string_to_sign);

        Ok(format!(
            "AWSAccessKeyId={}&Expires={expires_at}&Signature={}",
            encode_query_value(self.credentials.access_key_id()),
            encode_query_value(&signature)
        ))
    }

    fn scheme(&self) -> &'static str {
        if self.secure { "https" } else { "http" }
    }

    fn host(&self) -> Result<String, SignError> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() || endpoint.contains(['/', '?', '#', '@']) {
            return Err(SignError::InvalidEndpoint(self.endpoint.clone()));
        }

        let default_port = if self.secure { ":443" } else { ":80" };
        let endpoint = endpoint.strip_suffix(default_port).unwrap_or(endpoint);

        Ok(match self.style {
            AddressingStyle::Path => endpoint.to_owned(),
            AddressingStyle::VirtualHosted => format!("{}.{endpoint}", self.bucket),
        })
    }

    fn object_path(&self, key: &str) -> String {
        match self.style {
            AddressingStyle::Path => format!("/{}/{}", self.bucket, encode_object_path(key)),
            AddressingStyle::VirtualHosted => format!("/{}", encode_object_path(key)),
        }
    }
}
