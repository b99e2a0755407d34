//! Endpoint discovery resolution.
//!
//! # Design
//! A discovery document lists every endpoint a jurisdiction exposes, keyed
//! by protocol specification and deployment type. Selection is a pure
//! filter-then-index over that ordered list; fetching and config mutation
//! live in the client façade. The document's own format comes from the
//! discovery URL's file extension, not from the client's configured format,
//! because a JSON-speaking deployment may still publish an XML discovery
//! document (and vice versa).

use crate::error::Open311Error;
use crate::types::{DiscoveryDocument, DiscoveryEndpoint, EndpointType, Format};

/// The GeoReport v2 specification URI used as the default selection key.
pub const GEOREPORT_V2: &str = "http://wiki.open311.org/GeoReport_v2";

/// How to select one endpoint out of a discovery document.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Exact specification URI an endpoint must advertise.
    pub specification: String,
    /// Exact deployment type an endpoint must advertise.
    pub endpoint_type: EndpointType,
    /// Index into the filtered, order-preserving endpoint list.
    pub index: usize,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        DiscoveryOptions {
            specification: GEOREPORT_V2.to_string(),
            endpoint_type: EndpointType::Production,
            index: 0,
        }
    }
}

/// Infer a discovery document's format from its URL's file extension.
///
/// `.xml` means XML; anything else (including no extension) defaults to
/// JSON, the protocol's primary dialect.
pub fn format_for_url(url: &str) -> Format {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    if path.ends_with(".xml") {
        Format::Xml
    } else {
        Format::Json
    }
}

/// Select one endpoint: filter by exact specification and type equality,
/// then pick `options.index` from the filtered sequence.
///
/// Fails with `NoMatchingEndpoint` when nothing matches or the index falls
/// outside the filtered list.
pub fn select_endpoint<'a>(
    document: &'a DiscoveryDocument,
    options: &DiscoveryOptions,
) -> Result<&'a DiscoveryEndpoint, Open311Error> {
    document
        .endpoints
        .iter()
        .filter(|endpoint| {
            endpoint.specification.as_deref() == Some(options.specification.as_str())
                && endpoint.endpoint_type == options.endpoint_type
        })
        .nth(options.index)
        .ok_or(Open311Error::NoMatchingEndpoint)
}

/// Pick the client format for a selected endpoint: JSON when the advertised
/// content types actually include a JSON one, XML otherwise.
pub fn preferred_format(endpoint: &DiscoveryEndpoint) -> Format {
    if endpoint.formats.iter().any(|f| f.contains("json")) {
        Format::Json
    } else {
        Format::Xml
    }
}

/// Append a trailing path separator when missing. Path concatenation in the
/// request builder assumes the endpoint ends with one. Idempotent.
pub fn ensure_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(spec: &str, endpoint_type: EndpointType, url: &str) -> DiscoveryEndpoint {
        DiscoveryEndpoint {
            specification: Some(spec.to_string()),
            endpoint_type,
            url: url.to_string(),
            changeset: None,
            formats: Vec::new(),
        }
    }

    fn document(endpoints: Vec<DiscoveryEndpoint>) -> DiscoveryDocument {
        DiscoveryDocument {
            changeset: None,
            contact: None,
            key_service: None,
            endpoints,
        }
    }

    #[test]
    fn selects_by_specification_and_type() {
        let doc = document(vec![
            endpoint(GEOREPORT_V2, EndpointType::Production, "http://prod/v2"),
            endpoint(GEOREPORT_V2, EndpointType::Test, "http://test/v2"),
        ]);
        let options = DiscoveryOptions {
            endpoint_type: EndpointType::Test,
            ..DiscoveryOptions::default()
        };
        let selected = select_endpoint(&doc, &options).unwrap();
        assert_eq!(selected.url, "http://test/v2");
    }

    #[test]
    fn default_options_pick_the_first_production_endpoint() {
        let doc = document(vec![
            endpoint(GEOREPORT_V2, EndpointType::Test, "http://test/v2"),
            endpoint(GEOREPORT_V2, EndpointType::Production, "http://prod-a/v2"),
            endpoint(GEOREPORT_V2, EndpointType::Production, "http://prod-b/v2"),
        ]);
        let selected = select_endpoint(&doc, &DiscoveryOptions::default()).unwrap();
        assert_eq!(selected.url, "http://prod-a/v2");
    }

    #[test]
    fn index_picks_within_the_filtered_list() {
        let doc = document(vec![
            endpoint(GEOREPORT_V2, EndpointType::Test, "http://test/v2"),
            endpoint(GEOREPORT_V2, EndpointType::Production, "http://prod-a/v2"),
            endpoint(GEOREPORT_V2, EndpointType::Production, "http://prod-b/v2"),
        ]);
        let options = DiscoveryOptions {
            index: 1,
            ..DiscoveryOptions::default()
        };
        let selected = select_endpoint(&doc, &options).unwrap();
        assert_eq!(selected.url, "http://prod-b/v2");
    }

    #[test]
    fn non_matching_specification_fails() {
        let doc = document(vec![endpoint(
            GEOREPORT_V2,
            EndpointType::Production,
            "http://prod/v2",
        )]);
        let options = DiscoveryOptions {
            specification: "http://wiki.open311.org/Other_v1".to_string(),
            ..DiscoveryOptions::default()
        };
        let err = select_endpoint(&doc, &options).unwrap_err();
        assert!(matches!(err, Open311Error::NoMatchingEndpoint));
    }

    #[test]
    fn out_of_range_index_fails() {
        let doc = document(vec![endpoint(
            GEOREPORT_V2,
            EndpointType::Production,
            "http://prod/v2",
        )]);
        let options = DiscoveryOptions {
            index: 1,
            ..DiscoveryOptions::default()
        };
        let err = select_endpoint(&doc, &options).unwrap_err();
        assert!(matches!(err, Open311Error::NoMatchingEndpoint));
    }

    #[test]
    fn format_inferred_from_discovery_url_extension() {
        assert_eq!(format_for_url("http://x/discovery.json"), Format::Json);
        assert_eq!(format_for_url("http://x/discovery.xml"), Format::Xml);
        assert_eq!(format_for_url("http://x/discovery.xml?v=2"), Format::Xml);
        assert_eq!(format_for_url("http://x/discovery"), Format::Json);
    }

    #[test]
    fn json_preferred_only_when_actually_advertised() {
        let mut e = endpoint(GEOREPORT_V2, EndpointType::Production, "http://x/v2");
        e.formats = vec!["text/xml".to_string()];
        assert_eq!(preferred_format(&e), Format::Xml);

        e.formats.push("application/json".to_string());
        assert_eq!(preferred_format(&e), Format::Json);

        e.formats.clear();
        assert_eq!(preferred_format(&e), Format::Xml);
    }

    #[test]
    fn trailing_slash_is_appended_exactly_once() {
        assert_eq!(ensure_trailing_slash("http://x/v2"), "http://x/v2/");
        assert_eq!(ensure_trailing_slash("http://x/v2/"), "http://x/v2/");
        assert_eq!(
            ensure_trailing_slash(&ensure_trailing_slash("http://x/v2")),
            "http://x/v2/"
        );
    }
}
