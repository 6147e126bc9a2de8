//! The imgsign HTTP service implementing hyper's `Service` trait.
//!
//! [`ImgsignService`] handles:
//!
//! 1. Health check interception (`GET /_imgsign/health`)
//! 2. Percent-decoding of the request path
//! 3. Page rendering via [`PageRenderer`]
//! 4. Mapping every pipeline error to a uniform 404
//! 5. Common response headers (`x-request-id`, `Server`)
//!
//! The request body and method are ignored; every method is served the same.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;

use http::HeaderValue;
use hyper::service::Service;
use imgsign_core::{PageError, PageRenderer};
use percent_encoding::percent_decode_str;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::body::ResponseBody;
use crate::response::{SERVER_NAME, health_check_response, html_response, not_found_response};

/// Path of the health probe endpoint.
pub const HEALTH_PATH: &str = "/_imgsign/health";

/// Serves rewritten HTML pages.
///
/// Cheap to clone; one clone is handed to each connection.
#[derive(Debug, Clone)]
pub struct ImgsignService {
    renderer: PageRenderer,
}

impl ImgsignService {
    /// Create a service around `renderer`.
    #[must_use]
    pub fn new(renderer: PageRenderer) -> Self {
        Self { renderer }
    }
}

impl<B> Service<http::Request<B>> for ImgsignService {
    type Response = http::Response<ResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let renderer = self.renderer.clone();
        let method = req.method().clone();
        let uri = req.uri().clone();

        Box::pin(async move {
            let request_id = Uuid::new_v4().to_string();
            let response = process_request(&renderer, &method, &uri, &request_id).await;
            Ok(add_common_headers(response, &request_id))
        })
    }
}

/// Run one request through the page pipeline.
async fn process_request(
    renderer: &PageRenderer,
    method: &http::Method,
    uri: &http::Uri,
    request_id: &str,
) -> http::Response<ResponseBody> {
    debug!(%method, %uri, request_id, "processing request");

    if is_health_check(method, uri.path()) {
        return health_check_response();
    }

    let Some(request_path) = decode_request_path(uri.path()) else {
        warn!(%uri, request_id, "request path is not valid UTF-8 after decoding");
        return not_found_response();
    };

    match renderer.render(&request_path).await {
        Ok(page) => {
            info!(
                path = %page.path.display(),
                images = page.stats.images,
                signed = page.stats.signed,
                unsigned = page.stats.unsigned,
                request_id,
                "served page"
            );
            html_response(page.html)
        }
        Err(err @ PageError::Internal { .. }) => {
            error!(kind = err.kind(), error = %err, request_id, "page rendering failed");
            not_found_response()
        }
        Err(err) => {
            warn!(
                kind = err.kind(),
                error = %err,
                requested = %request_path,
                request_id,
                "page not served"
            );
            not_found_response()
        }
    }
}

/// Strip the leading `/` and percent-decode the URL path.
///
/// Returns `None` when the decoded bytes are not valid UTF-8.
fn decode_request_path(path: &str) -> Option<String> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    percent_decode_str(trimmed)
        .decode_utf8()
        .ok()
        .map(std::borrow::Cow::into_owned)
}

/// Check if the request targets the health probe.
fn is_health_check(method: &http::Method, path: &str) -> bool {
    (method == http::Method::GET || method == http::Method::HEAD) && path == HEALTH_PATH
}

/// Add `x-request-id` and `Server` to a response.
fn add_common_headers(
    mut response: http::Response<ResponseBody>,
    request_id: &str,
) -> http::Response<ResponseBody> {
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(request_id) {
        headers.insert("x-request-id", value);
    }
    headers.insert(http::header::SERVER, HeaderValue::from_static(SERVER_NAME));
    response
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use http::StatusCode;
    use http_body_util::BodyExt;
    use imgsign_auth::SignError;
    use imgsign_core::{PathResolver, UrlSigner};

    use super::*;

    struct FakeSigner;

    impl UrlSigner for FakeSigner {
        fn sign(&self, object_key: &str) -> Result<String, SignError> {
            Ok(format!("https://store/{object_key}?sig=abc"))
        }
    }

    fn service(root: &Path) -> ImgsignService {
        ImgsignService::new(PageRenderer::new(
            PathResolver::new(root.canonicalize().unwrap()),
            Arc::new(FakeSigner),
            Duration::from_secs(5),
        ))
    }

    async fn get(service: &ImgsignService, uri: &str) -> (StatusCode, http::HeaderMap, String) {
        let req = http::Request::builder()
            .method(http::Method::GET)
            .uri(uri)
            .body(())
            .unwrap();
        let response = service.call(req).await.unwrap();
        let (parts, body) = response.into_parts();
        let bytes = body.collect().await.unwrap().to_bytes();
        (
            parts.status,
            parts.headers,
            String::from_utf8(bytes.to_vec()).unwrap(),
        )
    }

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), r#"<img src="cover.jpg">"#).unwrap();
        std::fs::write(dir.path().join("my page.html"), r#"<img data-src="a b.png">"#).unwrap();
        std::fs::write(dir.path().join("style.css"), "body {}").unwrap();
        dir
    }

    #[test]
    fn test_should_decode_request_path() {
        assert_eq!(decode_request_path("/").as_deref(), Some(""));
        assert_eq!(
            decode_request_path("/my%20page.html").as_deref(),
            Some("my page.html")
        );
        assert_eq!(
            decode_request_path("/%2e%2e/etc/passwd").as_deref(),
            Some("../etc/passwd")
        );
        assert_eq!(decode_request_path("/%ff.html"), None);
    }

    #[test]
    fn test_should_detect_health_check() {
        assert!(is_health_check(&http::Method::GET, HEALTH_PATH));
        assert!(!is_health_check(&http::Method::POST, HEALTH_PATH));
        assert!(!is_health_check(&http::Method::GET, "/index.html"));
    }

    #[tokio::test]
    async fn test_should_serve_rewritten_index() {
        let dir = site();
        let (status, headers, body) = get(&service(dir.path()), "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            headers.get(http::header::CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
        assert!(headers.contains_key("x-request-id"));
        assert!(body.contains("https://store/cover.jpg?sig=abc"));
    }

    #[tokio::test]
    async fn test_should_serve_percent_encoded_path() {
        let dir = site();
        let (status, _, body) = get(&service(dir.path()), "/my%20page.html").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("https://store/a b.png?sig=abc"));
    }

    #[tokio::test]
    async fn test_should_return_uniform_not_found_for_every_failure() {
        let dir = site();
        let service = service(dir.path());
        let (_, _, expected) = get(&service, "/missing.html").await;

        for uri in [
            "/missing.html",
            "/style.css",
            "/%2e%2e/%2e%2e/etc/passwd",
            "/%ff.html",
            "/sub/",
        ] {
            let (status, headers, body) = get(&service, uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert!(headers.contains_key("x-request-id"), "{uri}");
            assert_eq!(body, expected, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_should_answer_health_check() {
        let dir = site();
        let (status, _, body) = get(&service(dir.path()), HEALTH_PATH).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#""status":"running""#));
    }

    #[tokio::test]
    async fn test_should_assign_distinct_request_ids() {
        let dir = site();
        let service = service(dir.path());
        let (_, first, _) = get(&service, "/").await;
        let (_, second, _) = get(&service, "/").await;
        assert_ne!(first.get("x-request-id"), second.get("x-request-id"));
    }
}
