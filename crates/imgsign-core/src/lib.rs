//! Request-time HTML rewriting pipeline for imgsign.
//!
//! A request path flows through four stages:
//!
//! 1. [`PathResolver`] maps it to a file under the document root, refusing
//!    anything that would escape the root.
//! 2. [`pipeline::load`] checks the extension and reads the whole file.
//! 3. [`rewriter::rewrite`] parses the HTML and replaces every `img`
//!    `data-src`/`src` value with a signed URL from a [`UrlSigner`].
//! 4. The rewritten document is serialized back to text.
//!
//! [`PageRenderer`] chains the stages and is what the HTTP layer calls.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod renderer;
pub mod resolver;
pub mod rewriter;
pub mod signer;

pub use config::{ConfigError, ServerConfig, StoreConfig};
pub use error::{PageError, PageResult};
pub use renderer::{PageRenderer, Rendered};
pub use resolver::PathResolver;
pub use rewriter::{RewriteStats, Rewritten};
pub use signer::{StoreSigner, UrlSigner};
