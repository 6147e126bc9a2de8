//! Request path to filesystem path resolution.
//!
//! Resolution is purely lexical: the request path is appended to the document
//! root component by component, `..` pops, and the result must still lie
//! strictly below the root. No filesystem access happens here.

use std::path::{Component, Path, PathBuf};

use tracing::warn;

use crate::error::{PageError, PageResult};

/// File served for empty paths and paths ending in `/`.
pub const INDEX_FILE: &str = "index.html";

/// Maps request paths onto files below a fixed document root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Create a resolver for `root`.
    ///
    /// `root` should be absolute and canonical, as produced by
    /// [`ServerConfig::from_env`](crate::ServerConfig::from_env).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The document root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a request path (without its leading `/`) to a file path.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::OutOfRoot`] when the normalized path is not
    /// strictly inside the root, and [`PageError::ResolutionFailed`] when the
    /// path contains a NUL byte.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::Path;
    ///
    /// use imgsign_core::PathResolver;
    ///
    /// let resolver = PathResolver::new("/srv/www");
    /// assert_eq!(resolver.resolve("").unwrap(), Path::new("/srv/www/index.html"));
    /// assert_eq!(resolver.resolve("a/./b/../c.html").unwrap(), Path::new("/srv/www/a/c.html"));
    /// assert!(resolver.resolve("../../etc/passwd").is_err());
    /// ```
    pub fn resolve(&self, request_path: &str) -> PageResult<PathBuf> {
        if request_path.contains('\0') {
            return Err(PageError::ResolutionFailed {
                requested: request_path.to_owned(),
                reason: "embedded NUL byte",
            });
        }

        let mut requested = request_path.to_owned();
        if requested.is_empty() || requested.ends_with('/') {
            requested.push_str(INDEX_FILE);
        }

        let mut candidate = self.root.clone();
        for component in Path::new(&requested).components() {
            match component {
                Component::Normal(segment) => candidate.push(segment),
                Component::ParentDir => {
                    candidate.pop();
                }
                // Absolute request paths are taken relative to the root.
                Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            }
        }

        // `Path::starts_with` compares whole components, so `/srv/www-evil`
        // does not pass for a root of `/srv/www`.
        if candidate == self.root || !candidate.starts_with(&self.root) {
            warn!(
                requested = request_path,
                candidate = %candidate.display(),
                root = %self.root.display(),
                "out of document root"
            );
            return Err(PageError::OutOfRoot {
                requested: request_path.to_owned(),
            });
        }

        Ok(candidate)
    }
}
