//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. `Form` builds an `HttpRequest`
//! and consumes an `HttpResponse`; the bytes travel through whatever
//! `Transport` the host plugs in. Keeping the network behind a trait keeps
//! the form logic deterministic and lets tests drive it with canned
//! responses.
//!
//! All fields use owned types (`String`, `Vec`) so values can be moved into
//! a host's async task without lifetime concerns.

use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::error::TransportError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether form fields travel in the body (`true`) or the query string.
    pub fn has_body(self) -> bool {
        !matches!(self, HttpMethod::Get)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// Built by `Form::begin`. The host executes it and hands the outcome back
/// through `Form::complete`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// `path` with the urlencoded `query` appended.
    pub fn url(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.query)
            .finish();
        let separator = if self.path.contains('?') { '&' } else { '?' };
        format!("{}{separator}{encoded}", self.path)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Insert or replace a header, matching names case-insensitively.
    pub fn set_header(&mut self, name: &str, value: &str) {
        match self.headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body parsed as JSON, or `None` when empty or not JSON.
    pub fn json(&self) -> Option<Value> {
        if self.body.trim().is_empty() {
            return None;
        }
        serde_json::from_str(&self.body).ok()
    }
}

/// Per-submit extras merged into the built request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestConfig {
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Extra headers override same-named defaults; extra query pairs are
    /// appended after the serialized fields.
    pub(crate) fn apply(&self, request: &mut HttpRequest) {
        for (name, value) in &self.headers {
            request.set_header(name, value);
        }
        request.query.extend(self.query.iter().cloned());
    }
}

/// Executes an `HttpRequest` against the network.
///
/// Implementations must return 4xx/5xx answers as `Ok(HttpResponse)`;
/// `Err` is reserved for failures where no response exists at all.
pub trait Transport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Flatten field values into query pairs for a GET request.
///
/// Strings go in unquoted, `null` is skipped, arrays repeat the key with a
/// `[]` suffix and nested objects are sent as JSON text.
pub(crate) fn query_pairs(fields: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(fields.len());
    for (key, value) in fields {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                let name = format!("{key}[]");
                for item in items.iter().filter(|v| !v.is_null()) {
                    pairs.push((name.clone(), scalar_text(item)));
                }
            }
            other => pairs.push((key.clone(), scalar_text(other))),
        }
    }
    pairs
}

/// A JSON value as plain text: strings without quotes, anything else as JSON.
pub(crate) fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
