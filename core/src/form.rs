//! Form state, request building and server error extraction.
//!
//! # Design
//! `Form` keeps field values as an ordered JSON object whose key set is
//! fixed at construction. A submit is split the same way the rest of the
//! crate splits I/O: `begin` flips the state flags and builds an
//! `HttpRequest`, the host (or `submit` through a `Transport`) performs the
//! round trip, and `complete` folds the outcome back into the flags and the
//! error bag. Hosts with their own async client call `begin`/`complete`
//! around their await point.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::FormConfig;
use crate::error::{FormError, SubmitError, TransportError};
use crate::error_bag::ErrorBag;
use crate::http::{query_pairs, HttpMethod, HttpRequest, HttpResponse, RequestConfig, Transport};

/// Behaviour toggles for a single form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormOptions {
    /// Restore the construction values after a successful submit.
    pub reset_on_success: bool,
}

/// An input lost focus or changed; `name` is the field it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEvent {
    pub name: String,
}

impl FieldEvent {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Form {
    fields: Map<String, Value>,
    original: Map<String, Value>,
    busy: bool,
    successful: bool,
    errors: ErrorBag,
    config: FormConfig,
    options: FormOptions,
}

impl Form {
    pub fn new(fields: Map<String, Value>, config: FormConfig) -> Self {
        Self::with_options(fields, config, FormOptions::default())
    }

    pub fn with_options(fields: Map<String, Value>, config: FormConfig, options: FormOptions) -> Self {
        Self {
            original: fields.clone(),
            fields,
            busy: false,
            successful: false,
            errors: ErrorBag::new(),
            config,
            options,
        }
    }

    /// Build a form from any value that serializes to a JSON object, such as
    /// a `#[derive(Serialize)]` struct.
    pub fn from_serialize<T: Serialize>(initial: &T, config: FormConfig) -> Result<Self, FormError> {
        match serde_json::to_value(initial).map_err(|e| FormError::Serialization(e.to_string()))? {
            Value::Object(fields) => Ok(Self::new(fields, config)),
            _ => Err(FormError::NotAnObject),
        }
    }

    pub fn busy(&self) -> bool {
        self.busy
    }

    pub fn successful(&self) -> bool {
        self.successful
    }

    pub fn errors(&self) -> &ErrorBag {
        &self.errors
    }

    pub fn errors_mut(&mut self) -> &mut ErrorBag {
        &mut self.errors
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Overwrite one field. Keys outside the construction set are rejected.
    pub fn set_field(&mut self, key: &str, value: impl Into<Value>) -> Result<(), FormError> {
        match self.fields.get_mut(key) {
            Some(slot) => {
                *slot = value.into();
                Ok(())
            }
            None => Err(FormError::UnknownField(key.to_string())),
        }
    }

    /// Overwrite every field from `data`; fields absent from `data` become
    /// `null` and keys unknown to the form are ignored.
    pub fn fill(&mut self, data: &Map<String, Value>) {
        for (key, slot) in self.fields.iter_mut() {
            *slot = data.get(key).cloned().unwrap_or(Value::Null);
        }
    }

    pub fn serialize(&self) -> Map<String, Value> {
        self.fields.clone()
    }

    pub fn reset(&mut self) {
        for (key, slot) in self.fields.iter_mut() {
            *slot = self.original.get(key).cloned().unwrap_or(Value::Null);
        }
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.errors.has(field)
    }

    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.first(field)
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear(None);
        self.successful = false;
    }

    pub fn start_processing(&mut self) {
        self.errors.clear(None);
        self.busy = true;
        self.successful = false;
    }

    pub fn finish_processing(&mut self) {
        self.busy = false;
        self.successful = true;
    }

    pub fn on_field_blur(&mut self, event: &FieldEvent) {
        self.errors.clear(Some(&event.name));
    }

    /// Resolve a named route (or literal URL) with this form's route table.
    pub fn route(&self, name: &str, params: &Value) -> String {
        self.config.routes.resolve(name, params)
    }

    /// Map a failure response to field errors using the configured default
    /// message.
    pub fn extract_errors(&self, response: &HttpResponse) -> Map<String, Value> {
        extract_errors(response, &self.config.default_error_message)
    }

    pub fn get<T: Transport + ?Sized>(&mut self, transport: &T, url: &str) -> Result<HttpResponse, SubmitError> {
        self.submit(transport, HttpMethod::Get, url, &RequestConfig::default())
    }

    pub fn post<T: Transport + ?Sized>(&mut self, transport: &T, url: &str) -> Result<HttpResponse, SubmitError> {
        self.submit(transport, HttpMethod::Post, url, &RequestConfig::default())
    }

    pub fn patch<T: Transport + ?Sized>(&mut self, transport: &T, url: &str) -> Result<HttpResponse, SubmitError> {
        self.submit(transport, HttpMethod::Patch, url, &RequestConfig::default())
    }

    pub fn put<T: Transport + ?Sized>(&mut self, transport: &T, url: &str) -> Result<HttpResponse, SubmitError> {
        self.submit(transport, HttpMethod::Put, url, &RequestConfig::default())
    }

    pub fn delete<T: Transport + ?Sized>(&mut self, transport: &T, url: &str) -> Result<HttpResponse, SubmitError> {
        self.submit(transport, HttpMethod::Delete, url, &RequestConfig::default())
    }

    /// Run one full submit through `transport`.
    pub fn submit<T: Transport + ?Sized>(
        &mut self,
        transport: &T,
        method: HttpMethod,
        url: &str,
        extra: &RequestConfig,
    ) -> Result<HttpResponse, SubmitError> {
        let request = self.begin(method, url, extra)?;
        let outcome = transport.send(&request);
        self.complete(outcome)
    }

    /// Enter the processing state and build the request for this submit.
    ///
    /// GET sends the fields as query parameters; every other verb sends them
    /// as a JSON body. `url` may be a route name, which is resolved without
    /// parameters.
    pub fn begin(&mut self, method: HttpMethod, url: &str, extra: &RequestConfig) -> Result<HttpRequest, FormError> {
        self.start_processing();

        let path = self.config.routes.resolve(url, &Value::Null);
        let mut request = HttpRequest {
            method,
            path,
            query: Vec::new(),
            headers: vec![("accept".to_string(), "application/json".to_string())],
            body: None,
        };

        if method.has_body() {
            let body = match serde_json::to_string(&self.fields) {
                Ok(body) => body,
                Err(e) => {
                    self.busy = false;
                    return Err(FormError::Serialization(e.to_string()));
                }
            };
            request
                .headers
                .push(("content-type".to_string(), "application/json".to_string()));
            request.body = Some(body);
        } else {
            request.query = query_pairs(&self.fields);
        }
        extra.apply(&mut request);

        debug!(method = %method, url = %request.url(), "form request built");
        Ok(request)
    }

    /// Fold the outcome of the round trip into the form state.
    ///
    /// 2xx responses mark the form successful and are returned unchanged.
    /// Any other response populates the error bag and comes back as
    /// `SubmitError::Http`; a transport failure leaves the bag empty.
    pub fn complete(&mut self, outcome: Result<HttpResponse, TransportError>) -> Result<HttpResponse, SubmitError> {
        match outcome {
            Ok(response) if response.is_success() => {
                self.finish_processing();
                if self.options.reset_on_success {
                    self.reset();
                }
                debug!(status = response.status, "form submit succeeded");
                Ok(response)
            }
            Ok(response) => {
                self.busy = false;
                let errors = self.extract_errors(&response);
                self.errors.set(errors);
                warn!(
                    status = response.status,
                    fields = self.errors.all().len(),
                    "form submit rejected by server"
                );
                Err(SubmitError::Http {
                    status: response.status,
                    response,
                })
            }
            Err(e) => {
                self.busy = false;
                warn!(error = %e, "form submit failed without a response");
                Err(SubmitError::Transport(e))
            }
        }
    }
}

/// Normalize a failure response into `field -> message(s)`.
///
/// The first matching shape wins; a key holding `null` counts as absent:
/// 1. missing or non-object body: `{"error": default_message}`
/// 2. `{"errors": {...}}`: the `errors` object as-is
/// 3. `{"message": "..."}`: `{"error": message}`
/// 4. `{"error": {"message": ...}}`: the inner object as-is, or
///    `{"error": message}` for a scalar
/// 5. anything else: the whole body as-is
///
/// A result without a single usable message falls back to
/// `{"error": default_message}` so a failed submit always has something to
/// show.
pub fn extract_errors(response: &HttpResponse, default_message: &str) -> Map<String, Value> {
    let fallback = || single("error", Value::String(default_message.to_string()));
    let Some(Value::Object(body)) = response.json() else {
        return fallback();
    };
    let errors = match_shape(body);
    if errors.values().any(has_message) {
        errors
    } else {
        fallback()
    }
}

fn match_shape(mut body: Map<String, Value>) -> Map<String, Value> {
    if let Some(errors) = body.remove("errors").filter(|v| !v.is_null()) {
        return match errors {
            Value::Object(map) => map,
            other => single("error", other),
        };
    }
    if let Some(message) = body.remove("message").filter(|v| !v.is_null()) {
        return single("error", message);
    }
    if let Some(message) = body
        .get_mut("error")
        .and_then(Value::as_object_mut)
        .and_then(|error| error.remove("message"))
        .filter(|v| !v.is_null())
    {
        return match message {
            Value::Object(map) => map,
            other => single("error", other),
        };
    }
    body
}

/// Whether `ErrorBag::set` would keep an entry for this value.
fn has_message(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Array(items) => items.iter().any(|item| !item.is_null()),
        _ => true,
    }
}

fn single(key: &str, value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    map
}
