//! Mock Open311 GeoReport v2 endpoint for integration tests.
//!
//! Serves the protocol paths with both format suffixes so the client's
//! JSON and XML normalization can be exercised against real HTTP. State is
//! an in-memory request store; submissions against the batch service code
//! (`002`) return a token instead of an immediate request id, mirroring
//! deferred-processing deployments. The discovery document derives its
//! endpoint URLs from the request's Host header so a cached endpoint
//! round-trips against the live listener.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Form, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// The GeoReport v2 specification URI advertised by the discovery document.
pub const GEOREPORT_V2: &str = "http://wiki.open311.org/GeoReport_v2";

/// Service code whose submissions are processed in batch (token response).
pub const BATCH_SERVICE: &str = "002";

#[derive(Clone, Debug, Serialize)]
pub struct RequestRecord {
    pub service_request_id: Option<String>,
    pub token: Option<String>,
    pub status: String,
    pub service_name: String,
    pub service_code: String,
    pub description: Option<String>,
    pub requested_datetime: String,
    pub updated_datetime: String,
    pub address: Option<String>,
    pub lat: Option<f64>,
    pub long: Option<f64>,
}

pub type Db = Arc<RwLock<Vec<RequestRecord>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Vec::new()));
    Router::new()
        .merge(api_router())
        .nest("/open311/v2", api_router())
        .route("/discovery.json", get(discovery_doc))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn api_router() -> Router<Db> {
    Router::new()
        .route("/services.json", get(services_json))
        .route("/services.xml", get(services_xml))
        .route("/services/{code}", get(service_definition))
        .route("/requests.json", get(requests_json).post(submit_json))
        .route("/requests.xml", get(requests_xml).post(submit_xml))
        .route("/requests/{id}", get(request_by_id))
        .route("/tokens/{token}", get(token_lookup))
}

#[derive(Clone, Copy, PartialEq)]
enum Ext {
    Json,
    Xml,
}

/// Split a `{name}.{ext}` path parameter.
fn split_suffix(param: &str) -> Option<(&str, Ext)> {
    let (name, ext) = param.rsplit_once('.')?;
    match ext {
        "json" => Some((name, Ext::Json)),
        "xml" => Some((name, Ext::Xml)),
        _ => None,
    }
}

fn xml_body(body: String) -> Response {
    ([(header::CONTENT_TYPE, "text/xml; charset=utf-8")], body).into_response()
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

// ---------------------------------------------------------------------------
// Service list and definitions
// ---------------------------------------------------------------------------

async fn services_json() -> Json<serde_json::Value> {
    Json(json!([
        {
            "service_code": "001",
            "service_name": "Graffiti Removal",
            "description": "Graffiti on public property",
            "metadata": true,
            "type": "realtime",
            "keywords": "graffiti,paint",
            "group": "sanitation"
        },
        {
            "service_code": BATCH_SERVICE,
            "service_name": "Pothole Repair",
            "description": "Potholes in the roadway",
            "metadata": false,
            "type": "batch",
            "keywords": "pothole,road",
            "group": "streets"
        }
    ]))
}

async fn services_xml() -> Response {
    xml_body(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
         <services>\
           <service>\
             <service_code>001</service_code>\
             <service_name>Graffiti Removal</service_name>\
             <description>Graffiti on public property</description>\
             <metadata>true</metadata>\
             <type>realtime</type>\
             <keywords>graffiti,paint</keywords>\
             <group>sanitation</group>\
           </service>\
           <service>\
             <service_code>002</service_code>\
             <service_name>Pothole Repair</service_name>\
             <description>Potholes in the roadway</description>\
             <metadata>false</metadata>\
             <type>batch</type>\
             <keywords>pothole,road</keywords>\
             <group>streets</group>\
           </service>\
         </services>"
            .to_string(),
    )
}

async fn service_definition(Path(code): Path<String>) -> Response {
    let Some((code, ext)) = split_suffix(&code) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if code != "001" {
        return StatusCode::NOT_FOUND.into_response();
    }
    match ext {
        Ext::Json => Json(json!({
            "service_code": "001",
            "attributes": [
                {
                    "code": "WHISHETN",
                    "variable": true,
                    "datatype": "singlevaluelist",
                    "required": true,
                    "order": 1,
                    "description": "What is the ticket/tag/DL number?",
                    "values": [
                        {"key": "123", "name": "Ford"},
                        {"key": "124", "name": "Chrysler"}
                    ]
                },
                {
                    "code": "WHISPAWN",
                    "variable": true,
                    "datatype": "string",
                    "required": false,
                    "order": 2,
                    "description": "Any additional details",
                    "values": null
                }
            ]
        }))
        .into_response(),
        Ext::Xml => xml_body(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
             <service_definition>\
               <service_code>001</service_code>\
               <attributes>\
                 <attribute>\
                   <code>WHISHETN</code>\
                   <variable>true</variable>\
                   <datatype>singlevaluelist</datatype>\
                   <required>true</required>\
                   <order>1</order>\
                   <description>What is the ticket/tag/DL number?</description>\
                   <values>\
                     <value><key>123</key><name>Ford</name></value>\
                     <value><key>124</key><name>Chrysler</name></value>\
                   </values>\
                 </attribute>\
                 <attribute>\
                   <code>WHISPAWN</code>\
                   <variable>true</variable>\
                   <datatype>string</datatype>\
                   <required>false</required>\
                   <order>2</order>\
                   <description>Any additional details</description>\
                   <values/>\
                 </attribute>\
               </attributes>\
             </service_definition>"
                .to_string(),
        ),
    }
}

// ---------------------------------------------------------------------------
// Request submission
// ---------------------------------------------------------------------------

fn submit(form: &HashMap<String, String>) -> Result<RequestRecord, (StatusCode, String)> {
    if form.get("api_key").map_or(true, |key| key.is_empty()) {
        return Err((StatusCode::FORBIDDEN, "missing api_key".to_string()));
    }
    let service_code = form
        .get("service_code")
        .filter(|code| !code.is_empty())
        .ok_or((StatusCode::BAD_REQUEST, "missing service_code".to_string()))?;

    let batch = service_code == BATCH_SERVICE;
    Ok(RequestRecord {
        service_request_id: Some(Uuid::new_v4().simple().to_string()),
        token: batch.then(|| Uuid::new_v4().simple().to_string()),
        status: "open".to_string(),
        service_name: if batch { "Pothole Repair" } else { "Graffiti Removal" }.to_string(),
        service_code: service_code.clone(),
        description: form.get("description").cloned(),
        requested_datetime: "2026-08-31T12:00:00Z".to_string(),
        updated_datetime: "2026-08-31T12:00:00Z".to_string(),
        address: form.get("address_string").cloned(),
        lat: form.get("lat").and_then(|v| v.parse().ok()),
        long: form.get("long").and_then(|v| v.parse().ok()),
    })
}

/// A submission response exposes the token for batch services and the
/// request id otherwise, never both.
fn submission_view(record: &RequestRecord) -> serde_json::Value {
    match &record.token {
        Some(token) => json!([{ "token": token, "service_notice": "queued for processing" }]),
        None => json!([{
            "service_request_id": record.service_request_id,
            "service_notice": "request opened"
        }]),
    }
}

async fn submit_json(
    State(db): State<Db>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    match submit(&form) {
        Ok(record) => {
            let view = submission_view(&record);
            db.write().await.push(record);
            Json(view).into_response()
        }
        Err(err) => err.into_response(),
    }
}

async fn submit_xml(
    State(db): State<Db>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    match submit(&form) {
        Ok(record) => {
            let body = match &record.token {
                Some(token) => format!(
                    "<service_requests><request><token>{token}</token>\
                     <service_notice>queued for processing</service_notice></request></service_requests>"
                ),
                None => format!(
                    "<service_requests><request>\
                     <service_request_id>{}</service_request_id>\
                     <service_notice>request opened</service_notice></request></service_requests>",
                    record.service_request_id.as_deref().unwrap_or_default()
                ),
            };
            db.write().await.push(record);
            xml_body(body)
        }
        Err(err) => err.into_response(),
    }
}

// ---------------------------------------------------------------------------
// Request queries
// ---------------------------------------------------------------------------

fn matches_filters(record: &RequestRecord, params: &HashMap<String, String>) -> bool {
    if let Some(ids) = params.get("service_request_id") {
        let wanted: Vec<&str> = ids.split(',').collect();
        if !record
            .service_request_id
            .as_deref()
            .is_some_and(|id| wanted.contains(&id))
        {
            return false;
        }
    }
    if let Some(status) = params.get("status") {
        if record.status != *status {
            return false;
        }
    }
    true
}

fn request_xml_fragment(record: &RequestRecord) -> String {
    let mut xml = String::from("<request>");
    if let Some(id) = &record.service_request_id {
        xml.push_str(&format!("<service_request_id>{id}</service_request_id>"));
    }
    if let Some(token) = &record.token {
        xml.push_str(&format!("<token>{token}</token>"));
    }
    xml.push_str(&format!("<status>{}</status>", record.status));
    xml.push_str(&format!(
        "<service_name>{}</service_name>",
        xml_escape(&record.service_name)
    ));
    xml.push_str(&format!(
        "<service_code>{}</service_code>",
        record.service_code
    ));
    if let Some(description) = &record.description {
        xml.push_str(&format!(
            "<description>{}</description>",
            xml_escape(description)
        ));
    }
    xml.push_str(&format!(
        "<requested_datetime>{}</requested_datetime>",
        record.requested_datetime
    ));
    xml.push_str(&format!(
        "<updated_datetime>{}</updated_datetime>",
        record.updated_datetime
    ));
    if let Some(address) = &record.address {
        xml.push_str(&format!("<address>{}</address>", xml_escape(address)));
    }
    if let Some(lat) = record.lat {
        xml.push_str(&format!("<lat>{lat}</lat>"));
    }
    if let Some(long) = record.long {
        xml.push_str(&format!("<long>{long}</long>"));
    }
    xml.push_str("</request>");
    xml
}

fn requests_xml_document(records: &[&RequestRecord]) -> String {
    let mut xml = String::from("<service_requests>");
    for record in records {
        xml.push_str(&request_xml_fragment(record));
    }
    xml.push_str("</service_requests>");
    xml
}

async fn requests_json(
    State(db): State<Db>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Vec<RequestRecord>> {
    let records = db.read().await;
    Json(
        records
            .iter()
            .filter(|r| matches_filters(r, &params))
            .cloned()
            .collect(),
    )
}

async fn requests_xml(
    State(db): State<Db>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let records = db.read().await;
    let matched: Vec<&RequestRecord> = records
        .iter()
        .filter(|r| matches_filters(r, &params))
        .collect();
    xml_body(requests_xml_document(&matched))
}

async fn request_by_id(State(db): State<Db>, Path(id): Path<String>) -> Response {
    let Some((id, ext)) = split_suffix(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let records = db.read().await;
    let Some(record) = records
        .iter()
        .find(|r| r.service_request_id.as_deref() == Some(id))
    else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match ext {
        Ext::Json => Json(vec![record.clone()]).into_response(),
        Ext::Xml => xml_body(requests_xml_document(&[record])),
    }
}

async fn token_lookup(State(db): State<Db>, Path(token): Path<String>) -> Response {
    let Some((token, ext)) = split_suffix(&token) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let records = db.read().await;
    let Some(record) = records.iter().find(|r| r.token.as_deref() == Some(token)) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match ext {
        Ext::Json => Json(vec![json!({
            "token": record.token,
            "service_request_id": record.service_request_id,
        })])
        .into_response(),
        Ext::Xml => xml_body(format!(
            "<service_requests><request><token>{}</token>\
             <service_request_id>{}</service_request_id></request></service_requests>",
            record.token.as_deref().unwrap_or_default(),
            record.service_request_id.as_deref().unwrap_or_default()
        )),
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

async fn discovery_doc(headers: HeaderMap) -> Json<serde_json::Value> {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    Json(json!({
        "changeset": "2026-08-31 12:00",
        "contact": "Open311 mock",
        "key_service": "POST a form to any endpoint to request a key",
        "endpoints": [
            {
                "specification": GEOREPORT_V2,
                "type": "production",
                "url": format!("http://{host}/open311/v2"),
                "changeset": "2026-08-31 12:00",
                "formats": ["application/json", "text/xml"]
            },
            {
                "specification": GEOREPORT_V2,
                "type": "test",
                "url": format!("http://{host}/open311/v2"),
                "changeset": "2026-08-31 12:00",
                "formats": ["text/xml"]
            }
        ]
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_suffix_recognizes_both_formats() {
        assert!(matches!(split_suffix("001.json"), Some(("001", Ext::Json))));
        assert!(matches!(split_suffix("abc.xml"), Some(("abc", Ext::Xml))));
        assert!(split_suffix("no-extension").is_none());
        assert!(split_suffix("001.csv").is_none());
    }

    #[test]
    fn batch_submission_gets_a_token() {
        let mut form = HashMap::new();
        form.insert("api_key".to_string(), "key".to_string());
        form.insert("service_code".to_string(), BATCH_SERVICE.to_string());
        let record = submit(&form).unwrap();
        assert!(record.token.is_some());
    }

    #[test]
    fn realtime_submission_gets_no_token() {
        let mut form = HashMap::new();
        form.insert("api_key".to_string(), "key".to_string());
        form.insert("service_code".to_string(), "001".to_string());
        let record = submit(&form).unwrap();
        assert!(record.token.is_none());
        assert!(record.service_request_id.is_some());
    }

    #[test]
    fn submission_without_api_key_is_forbidden() {
        let mut form = HashMap::new();
        form.insert("service_code".to_string(), "001".to_string());
        let (status, _) = submit(&form).unwrap_err();
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn xml_fragment_escapes_text_fields() {
        let mut form = HashMap::new();
        form.insert("api_key".to_string(), "key".to_string());
        form.insert("service_code".to_string(), "001".to_string());
        form.insert("description".to_string(), "paint & plaster".to_string());
        let record = submit(&form).unwrap();
        let xml = request_xml_fragment(&record);
        assert!(xml.contains("paint &amp; plaster"));
    }
}
