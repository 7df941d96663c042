//! Response under construction and status name lookup.
//!
//! # Responsibilities
//! - Accumulate status, headers and body while a request is dispatched
//! - Apply redirects and content types
//! - Map symbolic status names (`not_found`) to codes
//! - Convert into an axum response at the transport boundary
//!
//! # Design Decisions
//! - Body is a list of chunks so streamed handler output is kept as-is
//! - `HEAD` responses are finalized with an empty body, metadata untouched

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};

/// A response being assembled by the dispatcher.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<Bytes>,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// A plain text response.
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        let mut response = Self::new(status);
        response.set_text(body);
        response
    }

    pub fn set_text(&mut self, body: impl Into<String>) {
        self.body = vec![Bytes::from(body.into())];
    }

    /// Turn this into a `302 Found` pointing at `uri`.
    pub fn redirect(&mut self, uri: &str) {
        self.status = StatusCode::FOUND;
        match HeaderValue::from_str(uri) {
            Ok(value) => {
                self.headers.insert(header::LOCATION, value);
            }
            Err(_) => tracing::warn!(uri = %uri, "Redirect target is not a valid header value"),
        }
    }

    pub fn set_content_type(&mut self, mime: &str) {
        match HeaderValue::from_str(mime) {
            Ok(value) => {
                self.headers.insert(header::CONTENT_TYPE, value);
            }
            Err(_) => tracing::warn!(mime = %mime, "Ignoring invalid content type"),
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Concatenated body.
    pub fn body_bytes(&self) -> Bytes {
        match self.body.as_slice() {
            [] => Bytes::new(),
            [single] => single.clone(),
            chunks => Bytes::from(chunks.concat()),
        }
    }

    /// Body as (lossy) text, mostly useful in tests and logs.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body_bytes()).into_owned()
    }

    /// Final wire form. `HEAD` requests never carry a body.
    pub fn finish(mut self, head: bool) -> Self {
        if head {
            self.body.clear();
        }
        self
    }

    pub fn into_http(self) -> axum::response::Response {
        let body = Body::from(self.body_bytes());
        let mut response = axum::response::Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Look up a status code by symbolic name, e.g. `not_found` or `ok`.
///
/// Names are the canonical reason phrases, lowercased, with every run of
/// non-alphanumeric characters replaced by `_`.
pub fn status_code(name: &str) -> Option<StatusCode> {
    (100u16..600)
        .filter_map(|code| StatusCode::from_u16(code).ok())
        .find(|status| {
            status
                .canonical_reason()
                .map(|reason| symbolize(reason) == name)
                .unwrap_or(false)
        })
}

fn symbolize(reason: &str) -> String {
    let mut out = String::with_capacity(reason.len());
    for c in reason.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_end_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_names() {
        assert_eq!(status_code("ok"), Some(StatusCode::OK));
        assert_eq!(status_code("not_found"), Some(StatusCode::NOT_FOUND));
        assert_eq!(
            status_code("internal_server_error"),
            Some(StatusCode::INTERNAL_SERVER_ERROR)
        );
        assert_eq!(status_code("im_a_teapot"), Some(StatusCode::IM_A_TEAPOT));
        assert_eq!(status_code("no_such_status"), None);
    }

    #[test]
    fn test_redirect_sets_location() {
        let mut response = Response::default();
        response.redirect("/wiki/Home");
        assert_eq!(response.status, StatusCode::FOUND);
        assert_eq!(response.headers[header::LOCATION], "/wiki/Home");
    }

    #[test]
    fn test_head_finish_keeps_metadata() {
        let mut response = Response::text(StatusCode::CREATED, "hello");
        response.set_content_type("text/plain");
        let finished = response.finish(true);
        assert!(finished.body.is_empty());
        assert_eq!(finished.status, StatusCode::CREATED);
        assert_eq!(finished.content_type(), Some("text/plain"));
    }

    #[test]
    fn test_body_concatenation() {
        let mut response = Response::default();
        response.body = vec![Bytes::from_static(b"ab"), Bytes::from_static(b"cd")];
        assert_eq!(response.body_text(), "abcd");
    }
}
