//! Named routes and the fallback error message shared by forms.
//!
//! # Design
//! Both values are supplied by the host application once at startup and
//! then handed to every `Form` it creates. `FormConfig` is `Deserialize`
//! so a host can keep it next to the rest of its settings as JSON.

use std::collections::HashMap;

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FormError;
use crate::http::scalar_text;

pub const DEFAULT_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

/// Route name to URI template, e.g. `"users.show" => "/users/{id}"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteTable {
    routes: HashMap<String, String>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(mut self, name: &str, template: &str) -> Self {
        self.insert(name, template);
        self
    }

    pub fn insert(&mut self, name: &str, template: &str) {
        self.routes.insert(name.to_string(), template.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.routes.get(name).map(String::as_str)
    }

    /// Turn a route name (or a literal URL) plus parameters into a URL.
    ///
    /// Registered names resolve to their decoded template (reserved escapes
    /// such as `%2F` are kept); any other string is used as the URL as-is. A
    /// non-object `params` is shorthand for `{"id": params}` and `null` means
    /// no parameters. Every `{key}` token is replaced, including repeats.
    pub fn resolve(&self, name: &str, params: &Value) -> String {
        let mut url = match self.get(name) {
            Some(template) => decode_template(template),
            None => name.to_string(),
        };
        match params {
            Value::Null => {}
            Value::Object(map) => {
                for (key, value) in map {
                    url = url.replace(&format!("{{{key}}}"), &scalar_text(value));
                }
            }
            other => url = url.replace("{id}", &scalar_text(other)),
        }
        url
    }
}

/// Escapes that stay encoded when decoding a template, so `%2F` in a path
/// segment is not turned into a separator.
const RESERVED: &[u8] = b";/?:@&=+$,#";

/// Percent-decode a route template, leaving escapes of reserved characters
/// untouched.
fn decode_template(template: &str) -> String {
    let bytes = template.as_bytes();
    let mut decoded = String::with_capacity(template.len());
    let mut start = 0;
    let mut i = 0;
    while i + 2 < bytes.len() {
        let reserved = bytes[i] == b'%'
            && std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .is_some_and(|byte| RESERVED.contains(&byte));
        if reserved {
            decoded.push_str(&percent_decode_str(&template[start..i]).decode_utf8_lossy());
            decoded.push_str(&template[i..i + 3]);
            i += 3;
            start = i;
        } else {
            i += 1;
        }
    }
    decoded.push_str(&percent_decode_str(&template[start..]).decode_utf8_lossy());
    decoded
}

/// Settings shared by every form of an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    pub routes: RouteTable,
    pub default_error_message: String,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            routes: RouteTable::default(),
            default_error_message: DEFAULT_ERROR_MESSAGE.to_string(),
        }
    }
}

impl FormConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_routes(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }

    pub fn with_default_error_message(mut self, message: &str) -> Self {
        self.default_error_message = message.to_string();
        self
    }

    /// Load from `{"routes": {...}, "default_error_message": "..."}`.
    /// Missing keys keep their defaults.
    pub fn from_json(raw: &str) -> Result<Self, FormError> {
        serde_json::from_str(raw).map_err(|e| FormError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn routes() -> RouteTable {
        RouteTable::new()
            .with_route("users.show", "/users/{id}")
            .with_route("users.posts.show", "/users/{user}/posts/{post}")
            .with_route("encoded", "/files/%7Bid%7D/raw")
            .with_route("mirror", "/{slug}/compare/{slug}")
            .with_route("reserved", "/files/a%2Fb/{id}%3Fraw%20view")
    }

    #[test]
    fn resolves_named_route() {
        assert_eq!(routes().resolve("users.show", &json!({"id": 5})), "/users/5");
    }

    #[test]
    fn scalar_params_mean_id() {
        assert_eq!(routes().resolve("users.show", &json!(7)), "/users/7");
        assert_eq!(routes().resolve("users.show", &json!("me")), "/users/me");
    }

    #[test]
    fn multiple_params_substitute() {
        let url = routes().resolve("users.posts.show", &json!({"user": "ada", "post": 12}));
        assert_eq!(url, "/users/ada/posts/12");
    }

    #[test]
    fn unregistered_name_is_used_as_url() {
        assert_eq!(routes().resolve("/plain/path", &Value::Null), "/plain/path");
        assert_eq!(routes().resolve("/teams/{id}", &json!(3)), "/teams/3");
    }

    #[test]
    fn template_is_percent_decoded() {
        assert_eq!(routes().resolve("encoded", &json!({"id": 9})), "/files/9/raw");
    }

    #[test]
    fn reserved_escapes_stay_encoded() {
        assert_eq!(
            routes().resolve("reserved", &json!({"id": 9})),
            "/files/a%2Fb/9%3Fraw view"
        );
    }

    #[test]
    fn repeated_tokens_are_all_replaced() {
        assert_eq!(routes().resolve("mirror", &json!({"slug": "main"})), "/main/compare/main");
    }

    #[test]
    fn unknown_tokens_are_left_alone() {
        assert_eq!(routes().resolve("users.show", &json!({"other": 1})), "/users/{id}");
    }

    #[test]
    fn config_from_json_fills_defaults() {
        let config = FormConfig::from_json(r#"{"routes":{"users.index":"/users"}}"#).unwrap();
        assert_eq!(config.routes.get("users.index"), Some("/users"));
        assert_eq!(config.default_error_message, DEFAULT_ERROR_MESSAGE);

        let config = FormConfig::from_json(r#"{"default_error_message":"Oops"}"#).unwrap();
        assert_eq!(config.routes, RouteTable::new());
        assert_eq!(config.default_error_message, "Oops");
    }

    #[test]
    fn config_from_bad_json_is_an_error() {
        let err = FormConfig::from_json("not json").unwrap_err();
        assert!(matches!(err, FormError::Serialization(_)));
    }
}
