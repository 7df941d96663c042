//! Handler results and control transfer.
//!
//! Handlers and hooks return a [`Flow`]. `Ok` continues normally; `Err`
//! carries a [`Control`] signal that every layer of the dispatcher
//! matches on and propagates with `?`.

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};

use crate::error::DispatchError;
use crate::http::response::{status_code, Response};

/// Result of a handler or hook.
pub type Flow<T = Outcome> = Result<T, Control>;

/// Non-local control transfer.
#[derive(Debug)]
pub enum Control {
    /// Stop processing and use this outcome as the final result.
    Halt(Outcome),
    /// Decline the current route; the router tries the next match.
    Pass,
    /// Respond with a redirect to the given URI.
    Redirect(String),
    /// Hand the raw request to the fallback application.
    Forward,
    /// Abort with a fault.
    Fault(DispatchError),
}

impl From<DispatchError> for Control {
    fn from(err: DispatchError) -> Self {
        Self::Fault(err)
    }
}

pub fn halt<T>(outcome: impl Into<Outcome>) -> Flow<T> {
    Err(Control::Halt(outcome.into()))
}

pub fn pass<T>() -> Flow<T> {
    Err(Control::Pass)
}

pub fn redirect<T>(uri: impl Into<String>) -> Flow<T> {
    Err(Control::Redirect(uri.into()))
}

pub fn forward<T>() -> Flow<T> {
    Err(Control::Forward)
}

/// A response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Text(String),
    Chunks(Vec<Bytes>),
}

impl Body {
    fn into_chunks(self) -> Vec<Bytes> {
        match self {
            Self::Text(text) => vec![Bytes::from(text)],
            Self::Chunks(chunks) => chunks,
        }
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// The shapes a handler may return.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Leave the response untouched.
    Empty,
    /// Replace the body, keep status and headers.
    Text(String),
    /// Set the status only.
    Status(StatusCode),
    /// `(status, body)`.
    WithBody(StatusCode, Body),
    /// `(status, headers, body)`; missing parts are left untouched.
    Full(StatusCode, Option<HeaderMap>, Option<Body>),
    /// A body stream.
    Chunks(Vec<Bytes>),
}

impl Outcome {
    /// Status given by symbolic name, e.g. `Outcome::named("not_found")`.
    pub fn named(name: &str) -> Result<Self, DispatchError> {
        status_code(name)
            .map(Self::Status)
            .ok_or_else(|| DispatchError::fault(format!("Unknown status {:?}", name)))
    }

    /// Write this outcome into `response`.
    pub fn apply(self, response: &mut Response) {
        match self {
            Self::Empty => {}
            Self::Text(text) => response.set_text(text),
            Self::Status(status) => response.status = status,
            Self::WithBody(status, body) => {
                response.status = status;
                response.body = body.into_chunks();
            }
            Self::Full(status, headers, body) => {
                response.status = status;
                if let Some(body) = body {
                    response.body = body.into_chunks();
                }
                if let Some(headers) = headers {
                    for (name, value) in headers.iter() {
                        response.headers.insert(name.clone(), value.clone());
                    }
                }
            }
            Self::Chunks(chunks) => response.body = chunks,
        }
    }
}

impl From<()> for Outcome {
    fn from(_: ()) -> Self {
        Self::Empty
    }
}

impl From<&str> for Outcome {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Outcome {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<StatusCode> for Outcome {
    fn from(status: StatusCode) -> Self {
        Self::Status(status)
    }
}

impl<B: Into<Body>> From<(StatusCode, B)> for Outcome {
    fn from((status, body): (StatusCode, B)) -> Self {
        Self::WithBody(status, body.into())
    }
}

impl<B: Into<Body>> From<(StatusCode, HeaderMap, B)> for Outcome {
    fn from((status, headers, body): (StatusCode, HeaderMap, B)) -> Self {
        Self::Full(status, Some(headers), Some(body.into()))
    }
}

impl From<Vec<Bytes>> for Outcome {
    fn from(chunks: Vec<Bytes>) -> Self {
        Self::Chunks(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue};

    fn base() -> Response {
        let mut response = Response::text(StatusCode::ACCEPTED, "before");
        response.set_content_type("text/plain");
        response
    }

    #[test]
    fn test_text_keeps_status_and_headers() {
        let mut response = base();
        Outcome::from("after").apply(&mut response);
        assert_eq!(response.status, StatusCode::ACCEPTED);
        assert_eq!(response.content_type(), Some("text/plain"));
        assert_eq!(response.body_text(), "after");
    }

    #[test]
    fn test_pair_sets_status_and_body() {
        let mut response = base();
        Outcome::from((StatusCode::CREATED, "made")).apply(&mut response);
        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.body_text(), "made");
    }

    #[test]
    fn test_triple_merges_headers() {
        let mut response = base();
        let mut headers = HeaderMap::new();
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        Outcome::from((StatusCode::OK, headers, "body")).apply(&mut response);
        assert_eq!(response.headers[header::CACHE_CONTROL], "no-cache");
        assert_eq!(response.content_type(), Some("text/plain"));
        assert_eq!(response.body_text(), "body");
    }

    #[test]
    fn test_triple_without_body_keeps_body() {
        let mut response = base();
        Outcome::Full(StatusCode::GONE, None, None).apply(&mut response);
        assert_eq!(response.status, StatusCode::GONE);
        assert_eq!(response.body_text(), "before");
    }

    #[test]
    fn test_bare_status() {
        let mut response = base();
        Outcome::named("not_found").unwrap().apply(&mut response);
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.body_text(), "before");
        assert!(Outcome::named("bogus").is_err());
    }

    #[test]
    fn test_chunks_and_empty() {
        let mut response = base();
        Outcome::from(vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")]).apply(&mut response);
        assert_eq!(response.body.len(), 2);
        Outcome::Empty.apply(&mut response);
        assert_eq!(response.body_text(), "ab");
    }
}
