//! Text normalization of request input.
//!
//! Every textual field reaching handlers is UTF-8. Invalid sequences are
//! replaced rather than rejected, so a malformed query never fails routing.

use percent_encoding::percent_decode_str;

use crate::http::request::{ParamValue, Params};

/// Normalize every value in `params`, recursing through lists and maps.
pub fn encode_params(params: Params) -> Params {
    params
        .into_iter()
        .map(|(key, value)| (key, encode_value(value)))
        .collect()
}

pub fn encode_value(value: ParamValue) -> ParamValue {
    match value {
        ParamValue::Text(text) => ParamValue::Text(text),
        ParamValue::Bytes(bytes) => ParamValue::Text(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
        }),
        ParamValue::List(items) => ParamValue::List(items.into_iter().map(encode_value).collect()),
        ParamValue::Map(map) => ParamValue::Map(encode_params(map)),
    }
}

/// Percent-decode a request path.
pub fn unescape_path(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}
