//! Client core for the Open311 GeoReport v2 protocol.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). The caller executes the
//! actual round-trip, directly or through the [`Transport`] trait, making
//! the core fully deterministic and testable.
//!
//! # Design
//! - `Open311` owns one mutable `ClientConfig`; the opt-in discovery cache
//!   is the only operation that mutates it.
//! - Each protocol operation is split into `build_*` (produces a request
//!   descriptor) and `parse_*` (consumes a response), so the I/O boundary
//!   is explicit.
//! - The upstream's JSON and XML dialects normalize into one canonical
//!   shape; all XML quirk handling lives in `normalize`, never in the
//!   generic `xml` tree parser.
//! - Types use owned `String` / `Vec` fields so descriptors and results
//!   move freely across threads and transports.

pub mod cities;
pub mod client;
pub mod discovery;
pub mod error;
pub mod http;
pub mod normalize;
pub mod query;
pub mod types;
mod xml;

pub use cities::CityPreset;
pub use client::Open311;
pub use discovery::{DiscoveryOptions, GEOREPORT_V2};
pub use error::Open311Error;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use normalize::{normalize, ResponseShape};
pub use query::{RequestSelector, ResolvedQuery};
pub use types::{
    Attribute, AttributeValue, ClientConfig, DiscoveryDocument, DiscoveryEndpoint, EndpointType,
    Format, ServiceDefinition, ServiceRequest, ServiceRequestSubmission, ServiceSummary,
    ServiceType, SubmissionResponse,
};
