//! Error types for form submission.
//!
//! # Design
//! A submit can fail in three distinct places: the request cannot be built
//! (`FormError`), the transport never got an answer (`TransportError`), or
//! the server answered with a non-2xx status (`SubmitError::Http`). Only the
//! last one carries a response body that can be mined for field errors, so
//! it keeps the full `HttpResponse` for the caller.

use thiserror::Error;

use crate::http::HttpResponse;

/// Errors raised by `Form` operations that do not touch the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    /// The key was not present when the form was constructed.
    #[error("unknown form field `{0}`")]
    UnknownField(String),

    /// Construction input did not serialize to a key-value object.
    #[error("form fields must be a JSON object")]
    NotAnObject,

    /// The field values could not be serialized into a request.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Failure reported by a `Transport` when no HTTP response was received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection refused, DNS failure, timeout and similar.
    #[error("connection failed: {0}")]
    Connection(String),
}

/// Errors returned by `Form::submit` and `Form::complete`.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The request never produced a response. The error bag is left empty.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server returned a non-2xx status. The error bag holds whatever
    /// could be extracted from `response`.
    #[error("HTTP {status}: {}", .response.body)]
    Http { status: u16, response: HttpResponse },

    /// The request could not be built from the current field values.
    #[error(transparent)]
    Form(#[from] FormError),
}

impl SubmitError {
    /// The server response, when the failure carried one.
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            SubmitError::Http { response, .. } => Some(response),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            SubmitError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
