//! Response construction.

use http::{HeaderValue, StatusCode};

use crate::body::ResponseBody;

/// Content type of every served page.
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Content type of plain-text error bodies.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Value of the `Server` header.
pub const SERVER_NAME: &str = concat!("imgsign/", env!("CARGO_PKG_VERSION"));

/// A `200 OK` carrying a rewritten page.
#[must_use]
pub fn html_response(html: String) -> http::Response<ResponseBody> {
    let mut response = http::Response::new(ResponseBody::from_string(html));
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        HeaderValue::from_static(HTML_CONTENT_TYPE),
    );
    response
}

/// The single failure response. Its body never says why the page was refused.
#[must_use]
pub fn not_found_response() -> http::Response<ResponseBody> {
    let mut response = http::Response::new(ResponseBody::from_string("404 page not found\n"));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        HeaderValue::from_static(TEXT_CONTENT_TYPE),
    );
    response
}

/// JSON health probe response.
#[must_use]
pub fn health_check_response() -> http::Response<ResponseBody> {
    let body = concat!(
        r#"{"status":"running","service":"imgsign","version":""#,
        env!("CARGO_PKG_VERSION"),
        r#""}"#
    );
    let mut response = http::Response::new(ResponseBody::from_string(body));
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}
