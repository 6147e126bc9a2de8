//! The full request pipeline: resolve, load, rewrite.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::ServerConfig;
use crate::error::{PageError, PageResult};
use crate::pipeline;
use crate::resolver::PathResolver;
use crate::rewriter::{self, RewriteStats};
use crate::signer::{StoreSigner, UrlSigner};

/// A page ready to be sent.
#[derive(Debug, Clone)]
pub struct Rendered {
    /// The file that was served.
    pub path: PathBuf,
    /// Rewritten HTML.
    pub html: String,
    /// Image reference counters.
    pub stats: RewriteStats,
}

/// Renders request paths into rewritten HTML.
///
/// Cheap to clone; all state is shared and immutable.
#[derive(Clone)]
pub struct PageRenderer {
    resolver: Arc<PathResolver>,
    signer: Arc<dyn UrlSigner>,
    timeout: Duration,
}

impl fmt::Debug for PageRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageRenderer")
            .field("resolver", &self.resolver)
            .field("signer", &"...")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl PageRenderer {
    /// Create a renderer from its parts.
    pub fn new(resolver: PathResolver, signer: Arc<dyn UrlSigner>, timeout: Duration) -> Self {
        Self {
            resolver: Arc::new(resolver),
            signer,
            timeout,
        }
    }

    /// Create a renderer that signs against the configured store.
    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            PathResolver::new(&config.document_root),
            Arc::new(StoreSigner::new(&config.store)),
            config.request_timeout(),
        )
    }

    /// Resolve, load and rewrite the page at `request_path`.
    ///
    /// `request_path` is the decoded URL path without its leading `/`.
    ///
    /// # Errors
    ///
    /// Any [`PageError`]; each one means the page is not served.
    pub async fn render(&self, request_path: &str) -> PageResult<Rendered> {
        tokio::time::timeout(self.timeout, self.render_inner(request_path))
            .await
            .map_err(|_| PageError::TimedOut {
                after: self.timeout,
            })?
    }

    async fn render_inner(&self, request_path: &str) -> PageResult<Rendered> {
        let path = self.resolver.resolve(request_path)?;
        info!(path = %path.display(), "processing file");

        let content = pipeline::load(&path).await?;

        let signer = Arc::clone(&self.signer);
        let rewritten = tokio::task::spawn_blocking(move || {
            rewriter::rewrite(&content, signer.as_ref())
        })
        .await
        .map_err(|e| PageError::Internal {
            reason: e.to_string(),
        })??;

        Ok(Rendered {
            path,
            html: rewritten.html,
            stats: rewritten.stats,
        })
    }
}
