//! HTTP descriptor types for the host-does-IO pattern.
//!
//! # Design
//! The core never opens a socket. Every operation produces an `HttpRequest`
//! described as plain data; the caller executes it (directly or through the
//! [`Transport`] trait) and feeds the resulting `HttpResponse` back into the
//! matching `parse_*` method. This keeps the request-building and
//! response-normalization logic deterministic and testable without a network.
//!
//! All fields use owned types (`String`, `Vec`) so descriptors can be moved
//! freely between threads and transports.

use crate::error::Open311Error;

/// HTTP method for a request. GeoReport v2 only ever uses GET and POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// An HTTP request described as plain data.
///
/// `url` is the full endpoint URL including the format suffix
/// (e.g. `http://host/v2/requests.json`). `query` holds the query-string
/// parameters and `form` the urlencoded POST body, both as ordered pairs.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub form: Option<Vec<(String, String)>>,
}

/// An HTTP response described as plain data.
///
/// Constructed by the caller after executing an `HttpRequest`, then passed
/// to the matching `parse_*` method for normalization.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// The black-box HTTP collaborator.
///
/// Implementations perform one request/response exchange and report only
/// connection-level failures as errors — non-success status codes must be
/// returned as data, since status interpretation belongs to the core.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, Open311Error>;
}
