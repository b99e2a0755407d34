//! Error types for the Open311 client.
//!
//! # Design
//! Configuration problems (`MissingApiKey`, `MissingDiscoveryUrl`,
//! `UnknownCity`, `InvalidArguments`) are detected before a request
//! descriptor is ever produced — no network activity happens for them.
//! Everything the upstream API does wrong lands in `Upstream` (non-success
//! status with the raw body for debugging) or `MalformedResponse` (the body
//! could not be parsed or lacked the expected structure).

use std::fmt;

/// Errors returned by `Open311` build, parse, and transport-composed methods.
#[derive(Debug)]
pub enum Open311Error {
    /// A service request submission was attempted without an API key
    /// configured on the client.
    MissingApiKey,

    /// Service discovery was requested but the client has no discovery URL.
    MissingDiscoveryUrl,

    /// The city identifier is not in the built-in endpoint table.
    UnknownCity(String),

    /// The caller passed an argument shape the operation cannot resolve
    /// (empty id, empty id list, id containing a path separator).
    InvalidArguments(String),

    /// Endpoint selection over a discovery document matched nothing, or the
    /// requested index fell outside the filtered list.
    NoMatchingEndpoint,

    /// The server returned a non-success status code.
    Upstream { status: u16, body: String },

    /// The response body could not be parsed or normalized for the declared
    /// format.
    MalformedResponse(String),

    /// The HTTP transport failed before a status code existed (connection
    /// refused, DNS failure, ...).
    Transport(String),
}

impl fmt::Display for Open311Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Open311Error::MissingApiKey => {
                write!(f, "submitting a service request requires an API key")
            }
            Open311Error::MissingDiscoveryUrl => {
                write!(f, "no discovery URL configured for this client")
            }
            Open311Error::UnknownCity(city) => {
                write!(f, "unknown city identifier: {city}")
            }
            Open311Error::InvalidArguments(msg) => {
                write!(f, "invalid arguments: {msg}")
            }
            Open311Error::NoMatchingEndpoint => {
                write!(f, "discovery document contains no matching endpoint")
            }
            Open311Error::Upstream { status, body } => {
                write!(f, "Open311 API returned HTTP {status}: {body}")
            }
            Open311Error::MalformedResponse(msg) => {
                write!(f, "malformed response: {msg}")
            }
            Open311Error::Transport(msg) => {
                write!(f, "transport failure: {msg}")
            }
        }
    }
}

impl std::error::Error for Open311Error {}
