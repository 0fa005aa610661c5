//! Storage HTTP Protocol
//!
//! API endpoints and the request/response bodies exchanged with clients.
//! Entities themselves (`Patient`, `Experiment`, `DataPoint`) are returned
//! as-is; these structures cover everything around them.

use serde::{Deserialize, Deserializer, Serialize};

// --- API Endpoints ---

/// Create (POST) or fetch by `?id=` (GET) a single patient.
pub const ENDPOINT_PATIENT: &str = "/patient";
/// List all patients in insertion order.
pub const ENDPOINT_PATIENTS: &str = "/patients";
/// Create (POST) or fetch by `?id=` (GET) a single experiment.
pub const ENDPOINT_EXPERIMENT: &str = "/experiment";
/// List all experiments in insertion order.
pub const ENDPOINT_EXPERIMENTS: &str = "/experiments";
/// Upload one datapoint.
pub const ENDPOINT_UPLOAD: &str = "/upload";
/// Datapoints for a `?patientId=&experimentId=` pair.
pub const ENDPOINT_DATA: &str = "/data";
/// Persist the whole store to the snapshot file.
pub const ENDPOINT_STORE: &str = "/store";
/// Reload the store from the snapshot file.
pub const ENDPOINT_LOAD: &str = "/load";

// --- Data Transfer Objects ---

/// Body of `POST /patient` and `POST /experiment`.
///
/// `name` is optional here so that a missing field is reported as a
/// validation error instead of a generic deserialization rejection.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CreateEntityRequest {
    pub name: Option<String>,
}

/// Query string of the single-entity GET endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

/// Body of `POST /upload`.
///
/// When `payload` is absent, every other member of the body becomes the
/// payload object. A present `payload`, `null` included, is kept verbatim.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub patient_id: Option<String>,
    pub experiment_id: Option<String>,
    #[serde(default, deserialize_with = "present_value")]
    pub payload: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UploadRequest {
    pub fn into_payload(self) -> serde_json::Value {
        match self.payload {
            Some(payload) => payload,
            None => serde_json::Value::Object(self.extra),
        }
    }
}

// `Option<Value>` would read `null` as `None`; only a missing key should be.
fn present_value<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

/// Query string of `GET /data`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuery {
    pub patient_id: Option<String>,
    pub experiment_id: Option<String>,
}

/// Acknowledgment for `/store` and `/load`.
#[derive(Debug, Serialize, Deserialize)]
pub struct PersistResponse {
    pub success: bool,
    /// `false` when `/load` found no snapshot on disk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loaded: Option<bool>,
    pub patients: usize,
    pub experiments: usize,
    pub datapoints: usize,
}

/// Body returned with every 4xx/5xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
