//! Wire Format Normalizer.
//!
//! # Design
//! The upstream API speaks two dialects: JSON that already matches the
//! canonical in-memory model, and a verbose XML dialect that wraps every
//! list in a synthetic container element and collapses one-element lists
//! into bare objects. `normalize` resolves both into one canonical
//! `serde_json::Value` per response shape, so the typed DTO layer never
//! sees a format difference.
//!
//! All shape knowledge lives here. The generic XML parser stays ignorant of
//! Open311, and the client façade only picks a [`ResponseShape`].

use serde_json::Value;

use crate::error::Open311Error;
use crate::types::Format;
use crate::xml;

/// Which canonical shape a response body is expected to normalize into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `GET services` — a sequence of service summaries.
    ServiceList,
    /// `GET services/{code}` — one definition with an attribute sequence.
    ServiceDefinition,
    /// `POST requests` — always a sequence, even for a single result.
    SubmissionResult,
    /// `GET requests`, `GET requests/{id}`, `GET tokens/{token}` — a
    /// sequence of service requests.
    RequestList,
    /// A service discovery document.
    Discovery,
}

/// Normalize a raw response body into the canonical value for `shape`.
///
/// The JSON dialect parses directly. The XML dialect parses into a generic
/// tree and then gets the shape-specific unwrapping applied. Fails with
/// `MalformedResponse` when the body cannot be parsed or the outer document
/// structure is missing.
pub fn normalize(body: &str, format: Format, shape: ResponseShape) -> Result<Value, Open311Error> {
    match format {
        Format::Json => serde_json::from_str(body)
            .map_err(|e| Open311Error::MalformedResponse(format!("invalid JSON: {e}"))),
        Format::Xml => {
            let tree = xml::parse(body)?;
            match shape {
                ResponseShape::ServiceList => {
                    let services = take(&tree, "services")?;
                    let items = unwrap_field(services, "service").cloned();
                    Ok(Value::Array(ensure_array(items)))
                }
                ResponseShape::SubmissionResult | ResponseShape::RequestList => {
                    let requests = take(&tree, "service_requests")?;
                    let items = unwrap_field(requests, "request").cloned();
                    Ok(Value::Array(ensure_array(items)))
                }
                ResponseShape::ServiceDefinition => normalize_service_definition(&tree),
                ResponseShape::Discovery => normalize_discovery(&tree),
            }
        }
    }
}

/// Unwrap the `service_definition` document: `attributes.attribute` becomes
/// an ordered sequence, and each attribute's `values.value` becomes either a
/// sequence or null — never an empty list, since consumers distinguish "no
/// choices defined" from "zero choices".
fn normalize_service_definition(tree: &Value) -> Result<Value, Open311Error> {
    let definition = take(tree, "service_definition")?;
    let mut definition = definition.clone();

    let attributes = unwrap_field(&definition, "attributes")
        .and_then(|wrapper| wrapper.get("attribute").cloned());
    let attributes: Vec<Value> = ensure_array(attributes)
        .into_iter()
        .map(|mut attribute| {
            let values = unwrap_field(&attribute, "values")
                .and_then(|wrapper| wrapper.get("value").cloned());
            if let Some(obj) = attribute.as_object_mut() {
                match values {
                    Some(v) if !v.is_null() => {
                        obj.insert("values".to_string(), Value::Array(ensure_array(Some(v))));
                    }
                    _ => {
                        obj.insert("values".to_string(), Value::Null);
                    }
                }
            }
            attribute
        })
        .collect();

    if let Some(obj) = definition.as_object_mut() {
        obj.insert("attributes".to_string(), Value::Array(attributes));
    }
    Ok(definition)
}

/// Unwrap the `discovery` document: `endpoints.endpoint` becomes a sequence
/// and each endpoint's `formats.format` becomes a sequence of content types.
fn normalize_discovery(tree: &Value) -> Result<Value, Open311Error> {
    let discovery = take(tree, "discovery")?;
    let mut discovery = discovery.clone();

    let endpoints = unwrap_field(&discovery, "endpoints")
        .and_then(|wrapper| wrapper.get("endpoint").cloned());
    let endpoints: Vec<Value> = ensure_array(endpoints)
        .into_iter()
        .map(|mut endpoint| {
            let formats = unwrap_field(&endpoint, "formats")
                .and_then(|wrapper| wrapper.get("format").cloned());
            if let Some(obj) = endpoint.as_object_mut() {
                obj.insert(
                    "formats".to_string(),
                    Value::Array(ensure_array(formats)),
                );
            }
            endpoint
        })
        .collect();

    if let Some(obj) = discovery.as_object_mut() {
        obj.insert("endpoints".to_string(), Value::Array(endpoints));
    }
    Ok(discovery)
}

/// Fetch the root document element, failing when the outer structure is
/// absent. Missing inner wrappers are handled leniently by the callers.
fn take<'a>(tree: &'a Value, key: &str) -> Result<&'a Value, Open311Error> {
    tree.get(key)
        .ok_or_else(|| Open311Error::MalformedResponse(format!("missing <{key}> element")))
}

/// Look up an optional wrapper field on an object-valued node.
fn unwrap_field<'a>(node: &'a Value, key: &str) -> Option<&'a Value> {
    node.get(key).filter(|v| !v.is_null())
}

/// Coerce a possibly-collapsed XML list into an ordered sequence: a bare
/// object becomes a one-element sequence, an absent or null node becomes an
/// empty one.
fn ensure_array(value: Option<Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(single) => vec![single],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_passes_through_untouched() {
        let body = r#"[{"service_code":"001","service_name":"Graffiti"}]"#;
        let value = normalize(body, Format::Json, ResponseShape::ServiceList).unwrap();
        assert_eq!(value, json!([{"service_code": "001", "service_name": "Graffiti"}]));
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = normalize("not json", Format::Json, ResponseShape::ServiceList).unwrap_err();
        assert!(matches!(err, Open311Error::MalformedResponse(_)));
    }

    #[test]
    fn xml_service_list_with_many_elements() {
        let body = "<services>\
                      <service><service_code>001</service_code></service>\
                      <service><service_code>002</service_code></service>\
                    </services>";
        let value = normalize(body, Format::Xml, ResponseShape::ServiceList).unwrap();
        assert_eq!(
            value,
            json!([{"service_code": "001"}, {"service_code": "002"}])
        );
    }

    #[test]
    fn xml_service_list_with_one_element_is_still_a_sequence() {
        let body = "<services><service><service_code>001</service_code></service></services>";
        let value = normalize(body, Format::Xml, ResponseShape::ServiceList).unwrap();
        assert_eq!(value, json!([{"service_code": "001"}]));
    }

    #[test]
    fn xml_empty_service_list_is_an_empty_sequence() {
        let value = normalize("<services/>", Format::Xml, ResponseShape::ServiceList).unwrap();
        assert_eq!(value, json!([]));
    }

    #[test]
    fn xml_missing_outer_wrapper_is_malformed() {
        let err =
            normalize("<bogus/>", Format::Xml, ResponseShape::ServiceList).unwrap_err();
        assert!(matches!(err, Open311Error::MalformedResponse(_)));
    }

    #[test]
    fn xml_definition_unwraps_attributes_and_values() {
        let body = "<service_definition>\
                      <service_code>DMV66</service_code>\
                      <attributes>\
                        <attribute>\
                          <code>WHISHETN</code>\
                          <values>\
                            <value><key>123</key><name>Ford</name></value>\
                            <value><key>124</key><name>Chrysler</name></value>\
                          </values>\
                        </attribute>\
                        <attribute>\
                          <code>WHISPAWN</code>\
                          <values/>\
                        </attribute>\
                      </attributes>\
                    </service_definition>";
        let value = normalize(body, Format::Xml, ResponseShape::ServiceDefinition).unwrap();
        assert_eq!(value["service_code"], "DMV66");
        let attributes = value["attributes"].as_array().unwrap();
        assert_eq!(attributes.len(), 2);
        assert_eq!(
            attributes[0]["values"],
            json!([{"key": "123", "name": "Ford"}, {"key": "124", "name": "Chrysler"}])
        );
        // No enumerated choices: null, never an empty sequence.
        assert_eq!(attributes[1]["values"], Value::Null);
    }

    #[test]
    fn xml_definition_single_value_becomes_one_element_sequence() {
        let body = "<service_definition>\
                      <service_code>D1</service_code>\
                      <attributes>\
                        <attribute>\
                          <code>A</code>\
                          <values><value><key>1</key><name>Only</name></value></values>\
                        </attribute>\
                      </attributes>\
                    </service_definition>";
        let value = normalize(body, Format::Xml, ResponseShape::ServiceDefinition).unwrap();
        assert_eq!(
            value["attributes"][0]["values"],
            json!([{"key": "1", "name": "Only"}])
        );
    }

    #[test]
    fn xml_definition_without_attributes_yields_empty_sequence() {
        let body = "<service_definition><service_code>D1</service_code></service_definition>";
        let value = normalize(body, Format::Xml, ResponseShape::ServiceDefinition).unwrap();
        assert_eq!(value["attributes"], json!([]));
    }

    #[test]
    fn xml_single_submission_result_is_wrapped_in_a_sequence() {
        let body = "<service_requests>\
                      <request><token>12345</token></request>\
                    </service_requests>";
        let value = normalize(body, Format::Xml, ResponseShape::SubmissionResult).unwrap();
        assert_eq!(value, json!([{"token": "12345"}]));
    }

    #[test]
    fn xml_request_list_single_and_many() {
        let one = "<service_requests><request><service_request_id>1</service_request_id></request></service_requests>";
        let value = normalize(one, Format::Xml, ResponseShape::RequestList).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 1);

        let two = "<service_requests>\
                     <request><service_request_id>1</service_request_id></request>\
                     <request><service_request_id>2</service_request_id></request>\
                   </service_requests>";
        let value = normalize(two, Format::Xml, ResponseShape::RequestList).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
    }

    #[test]
    fn xml_discovery_unwraps_endpoints_and_formats() {
        let body = "<discovery>\
                      <changeset>2011-04-13 08:00</changeset>\
                      <endpoints>\
                        <endpoint>\
                          <specification>http://wiki.open311.org/GeoReport_v2</specification>\
                          <type>production</type>\
                          <url>http://example.org/v2</url>\
                          <formats>\
                            <format>text/xml</format>\
                            <format>application/json</format>\
                          </formats>\
                        </endpoint>\
                      </endpoints>\
                    </discovery>";
        let value = normalize(body, Format::Xml, ResponseShape::Discovery).unwrap();
        let endpoints = value["endpoints"].as_array().unwrap();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(
            endpoints[0]["formats"],
            json!(["text/xml", "application/json"])
        );
        assert_eq!(value["changeset"], "2011-04-13 08:00");
    }
}
