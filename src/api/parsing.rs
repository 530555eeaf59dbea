use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

use crate::core::Principal;
use crate::errors::SummaryError;

pub const API_KEY_HEADER: &str = "x-api-key";

pub fn v_path<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cur = root;
    for key in path {
        cur = cur.get(*key)?;
    }
    Some(cur)
}

pub fn v_str<'a>(root: &'a Value, path: &[&str]) -> Option<&'a str> {
    v_path(root, path).and_then(|v| v.as_str())
}

pub fn get_header_value<'a>(headers: &'a serde_json::Value, name: &str) -> Option<&'a str> {
    if let Some(v) = headers.get(name).and_then(|s| s.as_str()) {
        return Some(v);
    }
    headers.as_object().and_then(|map| {
        map.iter().find_map(|(k, v)| {
            if k.eq_ignore_ascii_case(name) {
                v.as_str()
            } else {
                None
            }
        })
    })
}

/// HTTP method for both API Gateway payload versions.
pub fn request_method(payload: &Value) -> &str {
    v_str(payload, &["requestContext", "http", "method"])
        .or_else(|| v_str(payload, &["httpMethod"]))
        .unwrap_or("GET")
}

/// Request path without a trailing slash.
pub fn request_path(payload: &Value) -> &str {
    let path = v_str(payload, &["rawPath"])
        .or_else(|| v_str(payload, &["path"]))
        .unwrap_or("/");
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

/// A query-string parameter, from `queryStringParameters` or the raw query.
pub fn query_param(payload: &Value, name: &str) -> Option<String> {
    if let Some(v) = v_str(payload, &["queryStringParameters", name]) {
        return Some(v.to_string());
    }
    let raw = v_str(payload, &["rawQueryString"])?;
    raw.split('&').find_map(|kv| {
        let (key, value) = kv.split_once('=').unwrap_or((kv, ""));
        if key == name {
            decode_query_value(value)
        } else {
            None
        }
    })
}

fn decode_query_value(value: &str) -> Option<String> {
    url::form_urlencoded::parse(format!("v={value}").as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
}

/// Parses the JSON request body, decoding it first if the gateway
/// base64-encoded it.
///
/// # Errors
///
/// `InvalidArgument` if the body is missing or not valid JSON.
pub fn json_body(payload: &Value) -> Result<Value, SummaryError> {
    let Some(body) = v_str(payload, &["body"]) else {
        return Err(SummaryError::InvalidArgument("Missing body".to_string()));
    };
    let encoded = payload
        .get("isBase64Encoded")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let text = if encoded {
        let bytes = STANDARD
            .decode(body)
            .map_err(|e| SummaryError::InvalidArgument(format!("Invalid body encoding: {e}")))?;
        String::from_utf8(bytes)
            .map_err(|e| SummaryError::InvalidArgument(format!("Invalid body encoding: {e}")))?
    } else {
        body.to_string()
    };
    serde_json::from_str(&text)
        .map_err(|e| SummaryError::InvalidArgument(format!("Invalid JSON body: {e}")))
}

/// Resolves who is calling.
///
/// A matching `x-api-key` header is the service principal. Otherwise the
/// subject claim left in the request context by the gateway's JWT authorizer
/// identifies the user. A wrong API key or no subject yields `None`.
pub fn resolve_principal(payload: &Value, api_key: Option<&str>) -> Option<Principal> {
    let presented = payload
        .get("headers")
        .and_then(|h| get_header_value(h, API_KEY_HEADER));
    if let Some(presented) = presented {
        return match api_key {
            Some(expected) if !expected.is_empty() && presented == expected => {
                Some(Principal::Service)
            }
            _ => None,
        };
    }

    v_str(payload, &["requestContext", "authorizer", "jwt", "claims", "sub"])
        .or_else(|| v_str(payload, &["requestContext", "authorizer", "claims", "sub"]))
        .filter(|sub| !sub.is_empty())
        .map(|sub| Principal::User(sub.to_string()))
}
