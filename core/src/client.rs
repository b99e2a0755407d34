//! Request builder, response parser, and façade for the Open311 API.
//!
//! # Design
//! `Open311` owns one mutable [`ClientConfig`] and carries no other state.
//! Each protocol operation is split into a `build_*` method producing an
//! [`HttpRequest`] and a `parse_*` method consuming an [`HttpResponse`];
//! the caller executes the round-trip in between, directly or through the
//! [`Transport`]-generic convenience methods. Builders never touch the
//! network, so every URL, query, and form decision is testable offline.
//!
//! Configuration errors (`MissingApiKey`, `MissingDiscoveryUrl`,
//! `UnknownCity`) surface from the `build_*` side, before a descriptor
//! exists. Status and body interpretation happen on the `parse_*` side.

use tracing::{debug, warn};

use crate::cities;
use crate::discovery::{self, DiscoveryOptions};
use crate::error::Open311Error;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::normalize::{normalize, ResponseShape};
use crate::query::{resolve, RequestSelector};
use crate::types::{
    ClientConfig, DiscoveryDocument, Format, ServiceDefinition, ServiceRequest,
    ServiceRequestSubmission, ServiceSummary, SubmissionResponse,
};

/// Client for one Open311 GeoReport v2 deployment.
#[derive(Debug, Clone)]
pub struct Open311 {
    config: ClientConfig,
}

impl Open311 {
    /// Create a client from an explicit configuration. The endpoint is
    /// normalized to carry a trailing path separator.
    pub fn new(mut config: ClientConfig) -> Self {
        if !config.endpoint.is_empty() {
            config.endpoint = discovery::ensure_trailing_slash(&config.endpoint);
        }
        Self { config }
    }

    /// Create a client from a built-in city preset.
    pub fn for_city(city: &str) -> Result<Self, Open311Error> {
        let preset = cities::lookup(city)
            .ok_or_else(|| Open311Error::UnknownCity(city.to_string()))?;
        Ok(Self::new(ClientConfig {
            endpoint: preset.endpoint.to_string(),
            format: Format::Json,
            jurisdiction: preset.jurisdiction.map(str::to_string),
            api_key: None,
            discovery_url: preset.discovery.map(str::to_string),
        }))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Switch the wire format. Takes effect on the next call.
    pub fn set_format(&mut self, format: Format) {
        self.config.format = format;
    }

    pub fn set_api_key(&mut self, api_key: impl Into<String>) {
        self.config.api_key = Some(api_key.into());
    }

    // -----------------------------------------------------------------
    // Service list
    // -----------------------------------------------------------------

    pub fn build_service_list(&self) -> HttpRequest {
        self.get("services", &[])
    }

    pub fn parse_service_list(
        &self,
        response: HttpResponse,
    ) -> Result<Vec<ServiceSummary>, Open311Error> {
        let value = self.parse_get(response, ResponseShape::ServiceList)?;
        from_value(value)
    }

    // -----------------------------------------------------------------
    // Service definition
    // -----------------------------------------------------------------

    pub fn build_service_definition(&self, service_code: &str) -> HttpRequest {
        self.get(&format!("services/{service_code}"), &[])
    }

    pub fn parse_service_definition(
        &self,
        response: HttpResponse,
    ) -> Result<ServiceDefinition, Open311Error> {
        let value = self.parse_get(response, ResponseShape::ServiceDefinition)?;
        from_value(value)
    }

    // -----------------------------------------------------------------
    // Request submission
    // -----------------------------------------------------------------

    /// Build the submission POST. Fails with `MissingApiKey` before any
    /// descriptor is produced when the client has no API key; the key is
    /// injected into the form body, and the variable attribute set is
    /// flattened to `attribute[<code>]=<value>` fields.
    pub fn build_submit_request(
        &self,
        submission: &ServiceRequestSubmission,
    ) -> Result<HttpRequest, Open311Error> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(Open311Error::MissingApiKey)?;

        let mut form: Vec<(String, String)> = Vec::new();
        form.push(("api_key".to_string(), api_key.to_string()));
        form.push(("service_code".to_string(), submission.service_code.clone()));
        push_opt(&mut form, "lat", submission.lat.map(|v| v.to_string()));
        push_opt(&mut form, "long", submission.long.map(|v| v.to_string()));
        push_opt(&mut form, "address_string", submission.address_string.clone());
        push_opt(&mut form, "address_id", submission.address_id.clone());
        push_opt(&mut form, "email", submission.email.clone());
        push_opt(&mut form, "device_id", submission.device_id.clone());
        push_opt(&mut form, "account_id", submission.account_id.clone());
        push_opt(&mut form, "first_name", submission.first_name.clone());
        push_opt(&mut form, "last_name", submission.last_name.clone());
        push_opt(&mut form, "phone", submission.phone.clone());
        push_opt(&mut form, "description", submission.description.clone());
        push_opt(&mut form, "media_url", submission.media_url.clone());
        for (code, value) in &submission.attributes {
            form.push((format!("attribute[{code}]"), value.clone()));
        }

        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: self.url_for("requests"),
            query: self.query_with_jurisdiction(&[]),
            form: Some(form),
        })
    }

    /// Parse a submission response. Always a sequence of length >= 1; each
    /// element carries a `service_request_id` (realtime) or `token` (batch).
    pub fn parse_submit_request(
        &self,
        response: HttpResponse,
    ) -> Result<Vec<SubmissionResponse>, Open311Error> {
        // POST success is any status below 300, unlike the GET operations.
        if response.status >= 300 {
            warn!(status = response.status, "submission rejected by upstream");
            return Err(Open311Error::Upstream {
                status: response.status,
                body: response.body,
            });
        }
        let value = normalize(
            &response.body,
            self.config.format,
            ResponseShape::SubmissionResult,
        )?;
        from_value(value)
    }

    // -----------------------------------------------------------------
    // Token exchange
    // -----------------------------------------------------------------

    pub fn build_token_lookup(&self, token: &str) -> HttpRequest {
        self.get(&format!("tokens/{token}"), &[])
    }

    /// Parse a token-exchange response into the (single) pending request.
    pub fn parse_token_lookup(
        &self,
        response: HttpResponse,
    ) -> Result<ServiceRequest, Open311Error> {
        let value = self.parse_get(response, ResponseShape::RequestList)?;
        first_request(value)
    }

    // -----------------------------------------------------------------
    // Service requests
    // -----------------------------------------------------------------

    /// Build the list/lookup GET for the given selector and query filters.
    pub fn build_service_requests(
        &self,
        selector: &RequestSelector,
        filters: &[(String, String)],
    ) -> Result<HttpRequest, Open311Error> {
        let resolved = resolve(selector, filters)?;
        Ok(self.get(&resolved.path, &resolved.filters))
    }

    pub fn parse_service_requests(
        &self,
        response: HttpResponse,
    ) -> Result<Vec<ServiceRequest>, Open311Error> {
        let value = self.parse_get(response, ResponseShape::RequestList)?;
        from_value(value)
    }

    /// Build a lookup for one request id.
    pub fn build_service_request(&self, id: &str) -> Result<HttpRequest, Open311Error> {
        self.build_service_requests(&RequestSelector::Id(id.to_string()), &[])
    }

    /// Parse a single-request lookup, yielding the first (only) element.
    pub fn parse_service_request(
        &self,
        response: HttpResponse,
    ) -> Result<ServiceRequest, Open311Error> {
        let value = self.parse_get(response, ResponseShape::RequestList)?;
        first_request(value)
    }

    // -----------------------------------------------------------------
    // Service discovery
    // -----------------------------------------------------------------

    /// Build the discovery GET. The discovery URL is used verbatim (no
    /// format suffix, no jurisdiction injection); its format is inferred
    /// from the URL's own extension, independent of `config.format`.
    pub fn build_service_discovery(&self) -> Result<(HttpRequest, Format), Open311Error> {
        let url = self
            .config
            .discovery_url
            .as_deref()
            .ok_or(Open311Error::MissingDiscoveryUrl)?;
        let request = HttpRequest {
            method: HttpMethod::Get,
            url: url.to_string(),
            query: Vec::new(),
            form: None,
        };
        Ok((request, discovery::format_for_url(url)))
    }

    pub fn parse_service_discovery(
        &self,
        response: HttpResponse,
        format: Format,
    ) -> Result<DiscoveryDocument, Open311Error> {
        check_get_status(&response)?;
        let value = normalize(&response.body, format, ResponseShape::Discovery)?;
        from_value(value)
    }

    /// Select one endpoint from a discovery document and rewire this client
    /// to it: the endpoint URL (with exactly one trailing separator) and the
    /// preferred advertised format. Discovery never carries jurisdiction
    /// information, so `jurisdiction` is left untouched.
    pub fn apply_discovery(
        &mut self,
        document: &DiscoveryDocument,
        options: &DiscoveryOptions,
    ) -> Result<(), Open311Error> {
        let endpoint = discovery::select_endpoint(document, options)?;
        self.config.endpoint = discovery::ensure_trailing_slash(&endpoint.url);
        self.config.format = discovery::preferred_format(endpoint);
        debug!(
            endpoint = %self.config.endpoint,
            format = ?self.config.format,
            "cached discovery endpoint"
        );
        Ok(())
    }

    // -----------------------------------------------------------------
    // Transport-composed operations
    // -----------------------------------------------------------------

    pub fn service_list<T: Transport>(
        &self,
        transport: &T,
    ) -> Result<Vec<ServiceSummary>, Open311Error> {
        let request = self.build_service_list();
        self.parse_service_list(transport.execute(&request)?)
    }

    pub fn service_definition<T: Transport>(
        &self,
        service_code: &str,
        transport: &T,
    ) -> Result<ServiceDefinition, Open311Error> {
        let request = self.build_service_definition(service_code);
        self.parse_service_definition(transport.execute(&request)?)
    }

    pub fn submit_request<T: Transport>(
        &self,
        submission: &ServiceRequestSubmission,
        transport: &T,
    ) -> Result<Vec<SubmissionResponse>, Open311Error> {
        let request = self.build_submit_request(submission)?;
        debug!(service_code = %submission.service_code, "submitting service request");
        self.parse_submit_request(transport.execute(&request)?)
    }

    pub fn token<T: Transport>(
        &self,
        token: &str,
        transport: &T,
    ) -> Result<ServiceRequest, Open311Error> {
        let request = self.build_token_lookup(token);
        self.parse_token_lookup(transport.execute(&request)?)
    }

    pub fn service_requests<T: Transport>(
        &self,
        selector: &RequestSelector,
        filters: &[(String, String)],
        transport: &T,
    ) -> Result<Vec<ServiceRequest>, Open311Error> {
        let request = self.build_service_requests(selector, filters)?;
        self.parse_service_requests(transport.execute(&request)?)
    }

    pub fn service_request<T: Transport>(
        &self,
        id: &str,
        transport: &T,
    ) -> Result<ServiceRequest, Open311Error> {
        let request = self.build_service_request(id)?;
        self.parse_service_request(transport.execute(&request)?)
    }

    /// Fetch the discovery document without touching client state.
    pub fn service_discovery<T: Transport>(
        &self,
        transport: &T,
    ) -> Result<DiscoveryDocument, Open311Error> {
        let (request, format) = self.build_service_discovery()?;
        self.parse_service_discovery(transport.execute(&request)?, format)
    }

    /// Fetch the discovery document and cache the selected endpoint into
    /// this client's configuration. The `&mut self` borrow makes the
    /// configuration mutation exclusive for the duration of the call.
    pub fn service_discovery_cached<T: Transport>(
        &mut self,
        options: &DiscoveryOptions,
        transport: &T,
    ) -> Result<DiscoveryDocument, Open311Error> {
        let document = self.service_discovery(transport)?;
        self.apply_discovery(&document, options)?;
        Ok(document)
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    /// URL for a relative path: endpoint + path + format suffix.
    fn url_for(&self, path: &str) -> String {
        format!(
            "{}{}.{}",
            self.config.endpoint,
            path,
            self.config.format.extension()
        )
    }

    /// Query filters with `jurisdiction_id` injected when configured and not
    /// already supplied by the caller (the caller's value wins).
    fn query_with_jurisdiction(&self, filters: &[(String, String)]) -> Vec<(String, String)> {
        let mut query = filters.to_vec();
        if let Some(jurisdiction) = &self.config.jurisdiction {
            if !query.iter().any(|(key, _)| key == "jurisdiction_id") {
                query.push(("jurisdiction_id".to_string(), jurisdiction.clone()));
            }
        }
        query
    }

    fn get(&self, path: &str, filters: &[(String, String)]) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: self.url_for(path),
            query: self.query_with_jurisdiction(filters),
            form: None,
        }
    }

    fn parse_get(
        &self,
        response: HttpResponse,
        shape: ResponseShape,
    ) -> Result<serde_json::Value, Open311Error> {
        check_get_status(&response)?;
        normalize(&response.body, self.config.format, shape)
    }
}

/// GET operations require exactly 200.
fn check_get_status(response: &HttpResponse) -> Result<(), Open311Error> {
    if response.status == 200 {
        return Ok(());
    }
    Err(Open311Error::Upstream {
        status: response.status,
        body: response.body.clone(),
    })
}

fn from_value<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<T, Open311Error> {
    serde_json::from_value(value).map_err(|e| Open311Error::MalformedResponse(e.to_string()))
}

/// Single-request operations take the first element of the normalized
/// sequence; JSON deployments answer single lookups with one-element arrays,
/// and some answer with a bare object.
fn first_request(value: serde_json::Value) -> Result<ServiceRequest, Open311Error> {
    let value = match value {
        serde_json::Value::Array(mut items) => {
            if items.is_empty() {
                return Err(Open311Error::MalformedResponse(
                    "expected at least one service request".to_string(),
                ));
            }
            items.swap_remove(0)
        }
        other => other,
    };
    from_value(value)
}

fn push_opt(form: &mut Vec<(String, String)>, key: &str, value: Option<String>) {
    if let Some(value) = value {
        form.push((key.to_string(), value));
    }
}
