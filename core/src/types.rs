//! Domain DTOs for the GeoReport v2 wire protocol.
//!
//! # Design
//! The same types deserialize from both upstream dialects. JSON carries
//! native numbers and booleans while the XML tree parser yields every
//! scalar as a string, so the fields where the dialects disagree use the
//! flexible deserializers in the private `de` module. Real deployments are
//! also wildly inconsistent about which fields they include, hence the
//! blanket `Option`s on `ServiceRequest`.

use serde::{Deserialize, Serialize};

/// Wire format used for outbound URL suffixing and inbound body parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Xml,
}

impl Format {
    /// File extension appended to request paths (`requests.json`).
    pub fn extension(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Xml => "xml",
        }
    }
}

impl Default for Format {
    fn default() -> Self {
        Format::Json
    }
}

/// Per-instance client configuration.
///
/// `jurisdiction` and `api_key` stay `None` unless explicitly supplied so
/// their absence is observable. The caching discovery operation mutates
/// `endpoint` and `format` in place.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub endpoint: String,
    pub format: Format,
    pub jurisdiction: Option<String>,
    pub api_key: Option<String>,
    pub discovery_url: Option<String>,
}

/// How a service processes submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    /// Submission immediately yields a `service_request_id`.
    Realtime,
    /// Submission yields a token to be exchanged later.
    Batch,
    Blended,
    #[serde(other)]
    Other,
}

/// One entry of the service list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSummary {
    #[serde(deserialize_with = "de::string_from_any")]
    pub service_code: String,
    pub service_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "de::bool_from_any")]
    pub metadata: bool,
    #[serde(rename = "type")]
    pub service_type: ServiceType,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
}

/// One enumerated choice of a service-definition attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeValue {
    #[serde(deserialize_with = "de::string_from_any")]
    pub key: String,
    pub name: String,
}

/// One submission field declared by a service definition.
///
/// `values` is `None` when the attribute has no enumerated choices. The
/// normalizer guarantees it is never an empty list in that case, so
/// consumers can distinguish "no choices defined" from "zero choices".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(deserialize_with = "de::string_from_any")]
    pub code: String,
    #[serde(default, deserialize_with = "de::bool_from_any")]
    pub variable: bool,
    #[serde(default)]
    pub datatype: Option<String>,
    #[serde(default, deserialize_with = "de::bool_from_any")]
    pub required: bool,
    #[serde(default, deserialize_with = "de::opt_u64_from_any")]
    pub order: Option<u64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub datatype_description: Option<String>,
    #[serde(default)]
    pub values: Option<Vec<AttributeValue>>,
}

/// Required submission fields for one service code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDefinition {
    #[serde(deserialize_with = "de::string_from_any")]
    pub service_code: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

/// One element of a submission response.
///
/// Realtime services set `service_request_id`; batch services set `token`
/// instead. A successful submission never leaves both absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionResponse {
    #[serde(default, deserialize_with = "de::opt_string_from_any")]
    pub service_request_id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string_from_any")]
    pub token: Option<String>,
    #[serde(default)]
    pub service_notice: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string_from_any")]
    pub account_id: Option<String>,
}

/// An existing service request as reported by the API.
///
/// `token` only appears mid-exchange, before the deployment has assigned a
/// permanent `service_request_id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceRequest {
    #[serde(deserialize_with = "de::opt_string_from_any")]
    pub service_request_id: Option<String>,
    #[serde(deserialize_with = "de::opt_string_from_any")]
    pub token: Option<String>,
    pub status: Option<String>,
    pub status_notes: Option<String>,
    pub service_name: Option<String>,
    #[serde(deserialize_with = "de::opt_string_from_any")]
    pub service_code: Option<String>,
    pub description: Option<String>,
    pub agency_responsible: Option<String>,
    pub service_notice: Option<String>,
    pub requested_datetime: Option<String>,
    pub updated_datetime: Option<String>,
    pub expected_datetime: Option<String>,
    pub address: Option<String>,
    #[serde(deserialize_with = "de::opt_string_from_any")]
    pub address_id: Option<String>,
    #[serde(deserialize_with = "de::opt_string_from_any")]
    pub zipcode: Option<String>,
    #[serde(deserialize_with = "de::opt_f64_from_any")]
    pub lat: Option<f64>,
    #[serde(deserialize_with = "de::opt_f64_from_any")]
    pub long: Option<f64>,
    pub media_url: Option<String>,
}

/// Outbound payload for a new service request submission.
///
/// `attributes` holds the service-specific variable fields; the request
/// builder flattens them into `attribute[<code>]=<value>` form fields per
/// the wire convention.
#[derive(Debug, Clone, Default)]
pub struct ServiceRequestSubmission {
    pub service_code: String,
    pub lat: Option<f64>,
    pub long: Option<f64>,
    pub address_string: Option<String>,
    pub address_id: Option<String>,
    pub email: Option<String>,
    pub device_id: Option<String>,
    pub account_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub description: Option<String>,
    pub media_url: Option<String>,
    pub attributes: Vec<(String, String)>,
}

/// Deployment type of a discovery endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointType {
    Production,
    Test,
    #[serde(other)]
    Other,
}

/// One endpoint advertised by a discovery document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryEndpoint {
    #[serde(default)]
    pub specification: Option<String>,
    #[serde(rename = "type")]
    pub endpoint_type: EndpointType,
    pub url: String,
    #[serde(default)]
    pub changeset: Option<String>,
    #[serde(default)]
    pub formats: Vec<String>,
}

/// A service discovery document. Consumed once to (optionally) update the
/// client configuration, not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryDocument {
    #[serde(default)]
    pub changeset: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub key_service: Option<String>,
    #[serde(default)]
    pub endpoints: Vec<DiscoveryEndpoint>,
}

/// Deserializers tolerant of the XML dialect's all-strings scalars.
mod de {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn string_from_any<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        match Value::deserialize(d)? {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(D::Error::custom(format!("expected string or number, got {other}"))),
        }
    }

    pub fn opt_string_from_any<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        match Value::deserialize(d)? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            Value::Number(n) => Ok(Some(n.to_string())),
            other => Err(D::Error::custom(format!("expected string or number, got {other}"))),
        }
    }

    pub fn bool_from_any<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        match Value::deserialize(d)? {
            Value::Bool(b) => Ok(b),
            Value::Null => Ok(false),
            Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" | "" => Ok(false),
                other => Err(D::Error::custom(format!("expected boolean, got {other:?}"))),
            },
            other => Err(D::Error::custom(format!("expected boolean, got {other}"))),
        }
    }

    pub fn opt_f64_from_any<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        match Value::deserialize(d)? {
            Value::Null => Ok(None),
            Value::Number(n) => Ok(n.as_f64()),
            Value::String(s) if s.is_empty() => Ok(None),
            Value::String(s) => s
                .parse()
                .map(Some)
                .map_err(|_| D::Error::custom(format!("expected number, got {s:?}"))),
            other => Err(D::Error::custom(format!("expected number, got {other}"))),
        }
    }

    pub fn opt_u64_from_any<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        match Value::deserialize(d)? {
            Value::Null => Ok(None),
            Value::Number(n) => Ok(n.as_u64()),
            Value::String(s) if s.is_empty() => Ok(None),
            Value::String(s) => s
                .parse()
                .map(Some)
                .map_err(|_| D::Error::custom(format!("expected integer, got {s:?}"))),
            other => Err(D::Error::custom(format!("expected integer, got {other}"))),
        }
    }
}
