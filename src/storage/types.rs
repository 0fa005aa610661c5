//! Entity Model
//!
//! The three record kinds held by the store. Every entity receives a random
//! UUID v4 identifier when it is constructed; ids are never regenerated, so a
//! datapoint keeps pointing at the same patient/experiment across snapshots.

use serde::{Deserialize, Serialize};

/// Generates a fresh entity identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Common view over stored records, used by the store's ordered collections.
pub trait Entity: Clone {
    /// Human-readable collection name used in logs and errors.
    const KIND: &'static str;

    fn id(&self) -> &str;
}

/// A study participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: String,
    pub name: String,
}

impl Patient {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
        }
    }
}

impl Entity for Patient {
    const KIND: &'static str = "patient";

    fn id(&self) -> &str {
        &self.id
    }
}

/// A named experiment (trial) under which measurements are collected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Experiment {
    pub id: String,
    pub name: String,
}

impl Experiment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
        }
    }
}

impl Entity for Experiment {
    const KIND: &'static str = "experiment";

    fn id(&self) -> &str {
        &self.id
    }
}

/// A single measurement upload.
///
/// `patient_id` and `experiment_id` are plain references; the store does not
/// check that they exist. The payload is kept exactly as received.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    pub id: String,
    pub patient_id: String,
    pub experiment_id: String,
    pub payload: serde_json::Value,
}

impl DataPoint {
    pub fn new(
        patient_id: impl Into<String>,
        experiment_id: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: new_id(),
            patient_id: patient_id.into(),
            experiment_id: experiment_id.into(),
            payload,
        }
    }

    /// The `(patientId, experimentId)` pair this datapoint is filed under.
    pub fn composite_key(&self) -> CompositeKey {
        CompositeKey {
            patient_id: self.patient_id.clone(),
            experiment_id: self.experiment_id.clone(),
        }
    }
}

impl Entity for DataPoint {
    const KIND: &'static str = "datapoint";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeKey {
    pub patient_id: String,
    pub experiment_id: String,
}

impl CompositeKey {
    pub fn new(patient_id: impl Into<String>, experiment_id: impl Into<String>) -> Self {
        Self {
            patient_id: patient_id.into(),
            experiment_id: experiment_id.into(),
        }
    }
}

/// Entity counts, reported after persist/load.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreStats {
    pub patients: usize,
    pub experiments: usize,
    pub datapoints: usize,
}
