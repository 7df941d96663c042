//! Request values handed to the dispatcher.
//!
//! # Responsibilities
//! - Carry method, raw path, query, headers and body independent of the transport
//! - Parse query strings and urlencoded form bodies into nested [`Params`]
//! - Expose the correlation id set by the transport layer
//!
//! # Design Decisions
//! - Pairs are split and decoded by `form_urlencoded`; only the bracket
//!   nesting is local
//! - Parsed values stay [`ParamValue::Bytes`] until the dispatcher normalizes them
//! - Body parameters override query parameters on key collision
//! - `a[]=1` builds a list, `a[b]=1` builds a map (recursively)

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderValue, Method};
use url::form_urlencoded;

/// Header carrying the per-request correlation id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Parameter map, keyed by parameter name.
pub type Params = BTreeMap<String, ParamValue>;

/// A single request parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Text(String),
    /// Raw bytes not yet normalized to text.
    Bytes(Vec<u8>),
    List(Vec<ParamValue>),
    Map(Params),
}

impl ParamValue {
    /// Text content, if this is a normalized scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ParamValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Params> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// An inbound request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Path as received, still percent-encoded.
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Request {
    /// Build a request from a method and a target such as `/wiki/page?output=raw`.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (target, None),
        };
        Self {
            method,
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            query,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Add a header. Invalid values are dropped.
    pub fn with_header(mut self, name: header::HeaderName, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Attach a urlencoded form body.
    pub fn with_form(mut self, body: impl Into<Bytes>) -> Self {
        self.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        self.body = body.into();
        self
    }

    pub fn is_head(&self) -> bool {
        self.method == Method::HEAD
    }

    /// Correlation id set by the transport, if any.
    pub fn request_id(&self) -> Option<&str> {
        self.headers.get(X_REQUEST_ID).and_then(|v| v.to_str().ok())
    }

    fn is_form(&self) -> bool {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
            .unwrap_or(false)
    }

    /// Query and form parameters, with form values taking precedence.
    pub fn params(&self) -> Params {
        let mut params = self
            .query
            .as_deref()
            .map(|q| parse_query(q.as_bytes()))
            .unwrap_or_default();
        if self.is_form() {
            params.extend(parse_query(&self.body));
        }
        params
    }
}

/// Parse `application/x-www-form-urlencoded` data.
pub fn parse_query(input: &[u8]) -> Params {
    let mut params = Params::new();
    for (key, value) in form_urlencoded::parse(input) {
        if key.is_empty() {
            continue;
        }
        insert_nested(&mut params, &key, ParamValue::Bytes(value.into_owned().into_bytes()));
    }
    params
}

fn insert_nested(params: &mut Params, key: &str, value: ParamValue) {
    match key.find('[') {
        Some(open) if open > 0 => {
            let (head, rest) = key.split_at(open);
            let slot = params.remove(head);
            params.insert(head.to_string(), assign(slot, rest, value));
        }
        _ => {
            params.insert(key.to_string(), value);
        }
    }
}

fn assign(slot: Option<ParamValue>, rest: &str, value: ParamValue) -> ParamValue {
    if rest.is_empty() {
        return value;
    }
    if let Some(tail) = rest.strip_prefix("[]") {
        let mut list = match slot {
            Some(ParamValue::List(list)) => list,
            _ => Vec::new(),
        };
        list.push(assign(None, tail, value));
        return ParamValue::List(list);
    }
    if let Some((name, tail)) = rest
        .strip_prefix('[')
        .and_then(|inner| inner.split_once(']'))
    {
        let mut map = match slot {
            Some(ParamValue::Map(map)) => map,
            _ => Params::new(),
        };
        let child = map.remove(name);
        map.insert(name.to_string(), assign(child, tail, value));
        return ParamValue::Map(map);
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(s: &str) -> ParamValue {
        ParamValue::Bytes(s.as_bytes().to_vec())
    }

    #[test]
    fn test_split_target() {
        let req = Request::new(Method::GET, "/wiki/page?output=raw");
        assert_eq!(req.path, "/wiki/page");
        assert_eq!(req.query.as_deref(), Some("output=raw"));

        let req = Request::new(Method::GET, "");
        assert_eq!(req.path, "/");
        assert!(req.query.is_none());
    }

    #[test]
    fn test_parse_flat_and_decoded() {
        let params = parse_query(b"a=1&b=hello+world&c=%C3%A9t%C3%A9&flag");
        assert_eq!(params["a"], bytes("1"));
        assert_eq!(params["b"], bytes("hello world"));
        assert_eq!(params["c"], bytes("été"));
        assert_eq!(params["flag"], bytes(""));
    }

    #[test]
    fn test_parse_nested() {
        let params = parse_query(b"tags[]=a&tags[]=b&acl[read]=alice&acl[write]=bob");
        assert_eq!(params["tags"], ParamValue::List(vec![bytes("a"), bytes("b")]));
        let acl = params["acl"].as_map().unwrap();
        assert_eq!(acl["read"], bytes("alice"));
        assert_eq!(acl["write"], bytes("bob"));
    }

    #[test]
    fn test_parse_skips_empty_pairs_and_keeps_reserved_chars() {
        let params = parse_query(b"&a=x%26y%3Dz&&=orphan&b=%2B1");
        assert_eq!(params.len(), 2);
        assert_eq!(params["a"], bytes("x&y=z"));
        assert_eq!(params["b"], bytes("+1"));
    }

    #[test]
    fn test_parse_nested_list_of_maps() {
        let params = parse_query(b"rows[][name]=a+b&rows[][name]=c");
        let rows = params["rows"].as_list().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].as_map().unwrap()["name"], bytes("a b"));
        assert_eq!(rows[1].as_map().unwrap()["name"], bytes("c"));
    }

    #[test]
    fn test_form_overrides_query() {
        let req = Request::new(Method::POST, "/save?content=old&x=1").with_form("content=new");
        let params = req.params();
        assert_eq!(params["content"], bytes("new"));
        assert_eq!(params["x"], bytes("1"));
    }

    #[test]
    fn test_body_ignored_without_form_content_type() {
        let mut req = Request::new(Method::POST, "/save");
        req.body = Bytes::from_static(b"content=new");
        assert!(req.params().is_empty());
    }
}
