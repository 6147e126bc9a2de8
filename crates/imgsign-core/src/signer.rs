//! Object key to signed URL.
//!
//! [`UrlSigner`] is the seam between the rewriter and the object store. The
//! production implementation, [`StoreSigner`], computes presigned URLs locally
//! from static credentials; tests substitute their own signers.

use std::time::Duration;

use imgsign_auth::{Presigner, SignError};
use tracing::debug;

use crate::config::StoreConfig;

/// Turns an object key into a time-limited retrieval URL.
pub trait UrlSigner: Send + Sync {
    /// Sign a GET for `object_key`.
    ///
    /// # Errors
    ///
    /// Returns a [`SignError`] if no URL can be produced for this key.
    fn sign(&self, object_key: &str) -> Result<String, SignError>;
}

/// Signs object keys for the configured bucket with a fixed link lifetime.
#[derive(Debug, Clone)]
pub struct StoreSigner {
    presigner: Presigner,
    duration: Duration,
}

impl StoreSigner {
    /// Create a signer from the store configuration.
    #[must_use]
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            presigner: config.presigner(),
            duration: config.link_duration(),
        }
    }
}

impl UrlSigner for StoreSigner {
    fn sign(&self, object_key: &str) -> Result<String, SignError> {
        let url = self.presigner.presign_get(object_key, self.duration)?;
        debug!(
            bucket = self.presigner.bucket(),
            object_key,
            expires_in = ?self.duration,
            "signed object url"
        );
        Ok(url)
    }
}
