//! Argument resolution for the service-requests operation.
//!
//! # Design
//! The upstream protocol overloads one endpoint three ways: fetch
//! everything, fetch one request by id (a URL path segment), or fetch a
//! batch of requests by id list (a comma-joined query filter — never a path
//! segment). Instead of type-sniffing at call sites, the accepted shapes
//! form the closed [`RequestSelector`] enum, and a single pure function
//! resolves a selector plus caller filters into one canonical
//! [`ResolvedQuery`]. No I/O happens here.

use crate::error::Open311Error;

/// Which service requests the caller wants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestSelector {
    /// No id: list requests, constrained only by query filters.
    All,
    /// A single request id, looked up as a URL path segment.
    Id(String),
    /// Several request ids, sent as one comma-joined query filter.
    Ids(Vec<String>),
}

impl From<&str> for RequestSelector {
    fn from(id: &str) -> Self {
        RequestSelector::Id(id.to_string())
    }
}

impl From<String> for RequestSelector {
    fn from(id: String) -> Self {
        RequestSelector::Id(id)
    }
}

impl From<u64> for RequestSelector {
    fn from(id: u64) -> Self {
        RequestSelector::Id(id.to_string())
    }
}

impl From<Vec<String>> for RequestSelector {
    fn from(ids: Vec<String>) -> Self {
        RequestSelector::Ids(ids)
    }
}

impl From<&[&str]> for RequestSelector {
    fn from(ids: &[&str]) -> Self {
        RequestSelector::Ids(ids.iter().map(|id| id.to_string()).collect())
    }
}

/// The canonical request shape: a relative path plus query filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedQuery {
    pub path: String,
    pub filters: Vec<(String, String)>,
}

/// Resolve a selector and caller-supplied filters into one canonical query.
///
/// Total over the documented shapes; anything else (empty id, id containing
/// a path separator, empty id list) is a caller programming error reported
/// as `InvalidArguments`. For `Ids`, the joined value replaces any
/// caller-supplied `service_request_id` filter, since the selector is the
/// more specific statement of intent.
pub fn resolve(
    selector: &RequestSelector,
    filters: &[(String, String)],
) -> Result<ResolvedQuery, Open311Error> {
    match selector {
        RequestSelector::All => Ok(ResolvedQuery {
            path: "requests".to_string(),
            filters: filters.to_vec(),
        }),
        RequestSelector::Id(id) => {
            validate_id(id)?;
            Ok(ResolvedQuery {
                path: format!("requests/{id}"),
                filters: filters.to_vec(),
            })
        }
        RequestSelector::Ids(ids) => {
            if ids.is_empty() {
                return Err(Open311Error::InvalidArguments(
                    "id list must not be empty".to_string(),
                ));
            }
            for id in ids {
                validate_id(id)?;
            }
            let mut filters: Vec<(String, String)> = filters
                .iter()
                .filter(|(key, _)| key != "service_request_id")
                .cloned()
                .collect();
            filters.push(("service_request_id".to_string(), ids.join(",")));
            Ok(ResolvedQuery {
                path: "requests".to_string(),
                filters,
            })
        }
    }
}

fn validate_id(id: &str) -> Result<(), Open311Error> {
    if id.is_empty() {
        return Err(Open311Error::InvalidArguments(
            "request id must not be empty".to_string(),
        ));
    }
    if id.contains('/') || id.contains(',') {
        return Err(Open311Error::InvalidArguments(format!(
            "request id contains a reserved character: {id:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn no_selector_and_no_filters() {
        let resolved = resolve(&RequestSelector::All, &[]).unwrap();
        assert_eq!(resolved.path, "requests");
        assert!(resolved.filters.is_empty());
    }

    #[test]
    fn filters_without_a_selector_pass_through() {
        let f = filters(&[("status", "open"), ("page_size", "5")]);
        let resolved = resolve(&RequestSelector::All, &f).unwrap();
        assert_eq!(resolved.path, "requests");
        assert_eq!(resolved.filters, f);
    }

    #[test]
    fn string_id_becomes_a_path_segment() {
        let resolved = resolve(&"abc".into(), &[]).unwrap();
        assert_eq!(resolved.path, "requests/abc");
        assert!(resolved.filters.is_empty());
    }

    #[test]
    fn numeric_id_becomes_a_path_segment() {
        let f = filters(&[("status", "open")]);
        let resolved = resolve(&12345u64.into(), &f).unwrap();
        assert_eq!(resolved.path, "requests/12345");
        assert_eq!(resolved.filters, f);
    }

    #[test]
    fn id_list_becomes_a_joined_filter_not_a_path() {
        let selector: RequestSelector = ["a", "b"].as_slice().into();
        let resolved = resolve(&selector, &[]).unwrap();
        assert_eq!(resolved.path, "requests");
        assert_eq!(
            resolved.filters,
            filters(&[("service_request_id", "a,b")])
        );
    }

    #[test]
    fn id_list_replaces_caller_supplied_id_filter() {
        let selector: RequestSelector = vec!["1".to_string(), "2".to_string()].into();
        let f = filters(&[("service_request_id", "9"), ("status", "open")]);
        let resolved = resolve(&selector, &f).unwrap();
        assert_eq!(
            resolved.filters,
            filters(&[("status", "open"), ("service_request_id", "1,2")])
        );
    }

    #[test]
    fn empty_id_is_invalid() {
        let err = resolve(&"".into(), &[]).unwrap_err();
        assert!(matches!(err, Open311Error::InvalidArguments(_)));
    }

    #[test]
    fn empty_id_list_is_invalid() {
        let err = resolve(&RequestSelector::Ids(Vec::new()), &[]).unwrap_err();
        assert!(matches!(err, Open311Error::InvalidArguments(_)));
    }

    #[test]
    fn id_with_path_separator_is_invalid() {
        let err = resolve(&"a/b".into(), &[]).unwrap_err();
        assert!(matches!(err, Open311Error::InvalidArguments(_)));
    }

    #[test]
    fn id_with_comma_is_invalid() {
        // A comma inside an id would splice extra entries into the joined
        // service_request_id filter, so it is rejected up front.
        let err = resolve(&"123,456".into(), &[]).unwrap_err();
        assert!(matches!(err, Open311Error::InvalidArguments(_)));

        let ids = RequestSelector::Ids(vec!["123".to_string(), "45,6".to_string()]);
        let err = resolve(&ids, &[]).unwrap_err();
        assert!(matches!(err, Open311Error::InvalidArguments(_)));
    }
}
