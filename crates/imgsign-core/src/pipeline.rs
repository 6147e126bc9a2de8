//! File loading for the rewrite pipeline.
//!
//! Only `.html` files are rewritten. The extension check is a content-type
//! allowlist; containment is the resolver's job. Files are buffered whole
//! because rewriting needs the complete document.

use std::path::Path;

use tracing::debug;

use crate::error::{PageError, PageResult};

/// The only extension served.
pub const HTML_EXTENSION: &str = "html";

/// Reject paths whose extension is not exactly `html`.
///
/// # Examples
///
/// ```
/// use std::path::Path;
///
/// use imgsign_core::pipeline::ensure_html;
///
/// assert!(ensure_html(Path::new("/srv/www/index.html")).is_ok());
/// assert!(ensure_html(Path::new("/srv/www/style.css")).is_err());
/// ```
pub fn ensure_html(path: &Path) -> PageResult<()> {
    if path.extension().is_some_and(|ext| ext == HTML_EXTENSION) {
        Ok(())
    } else {
        Err(PageError::UnsupportedType {
            path: path.to_owned(),
        })
    }
}

/// Check the type of `path` and read its full content.
///
/// # Errors
///
/// Returns [`PageError::UnsupportedType`] before touching the filesystem if
/// the extension is not `html`, and [`PageError::ReadFailed`] for any I/O
/// error (missing file, directory, permissions).
pub async fn load(path: &Path) -> PageResult<Vec<u8>> {
    ensure_html(path)?;

    let content = tokio::fs::read(path)
        .await
        .map_err(|source| PageError::ReadFailed {
            path: path.to_owned(),
            source,
        })?;

    debug!(path = %path.display(), bytes = content.len(), "loaded html file");
    Ok(content)
}
