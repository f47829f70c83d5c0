//! Form state tracking and submission core.
//!
//! # Overview
//! A `Form` holds field values, a busy/successful pair of flags and an
//! `ErrorBag` of server validation messages. Submitting builds an
//! `HttpRequest` (query string for GET, JSON body otherwise), hands it to a
//! caller-supplied `Transport`, and maps a failed response onto
//! `field -> messages` through a fixed set of known payload shapes.
//!
//! # Design
//! - The crate never opens a socket: `Transport` is the only I/O seam, and
//!   `Form::begin` / `Form::complete` expose the same split for hosts that
//!   drive the round trip themselves.
//! - Named routes and the fallback error message live in `FormConfig`,
//!   passed to each form instead of being global.
//! - Field values are `serde_json::Value`s; the key set is fixed when the
//!   form is created.

pub mod config;
pub mod error;
pub mod error_bag;
pub mod form;
pub mod http;

pub use config::{FormConfig, RouteTable, DEFAULT_ERROR_MESSAGE};
pub use error::{FormError, SubmitError, TransportError};
pub use error_bag::ErrorBag;
pub use form::{extract_errors, FieldEvent, Form, FormOptions};
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestConfig, Transport};
