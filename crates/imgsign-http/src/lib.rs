//! HTTP layer for the imgsign HTML server.
//!
//! - **Service** ([`service`]): [`ImgsignService`](service::ImgsignService)
//!   implements hyper's `Service` trait. Every path is handed to the
//!   [`PageRenderer`](imgsign_core::PageRenderer); any pipeline error becomes
//!   a 404.
//! - **Responses** ([`response`]): HTML, not-found, and health responses.
//! - **Body** ([`body`]): [`ResponseBody`](body::ResponseBody), a buffered page.
//! - **Server** ([`server`]): the accept loop with graceful shutdown.
//!
//! # Architecture
//!
//! ```text
//! HTTP Request
//!   -> ImgsignService (hyper Service)
//!     -> Health check interception
//!     -> Percent-decode path
//!     -> PageRenderer (resolve -> load -> rewrite)
//!     -> Common response headers (x-request-id, Server)
//!   <- 200 text/html | 404
//! ```

pub mod body;
pub mod response;
pub mod server;
pub mod service;

pub use body::ResponseBody;
pub use server::serve;
pub use service::ImgsignService;
