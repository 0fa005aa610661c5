//! Snapshot Codec
//!
//! Converts the store's three collections to and from a single JSON document:
//!
//! ```json
//! {
//!   "version": 1,
//!   "patients":    [{"id": "...", "name": "Alice"}],
//!   "experiments": [{"id": "...", "name": "Trial1"}],
//!   "datapoints":  [{"id": "...", "patientId": "...", "experimentId": "...", "payload": {"hr": 72}}]
//! }
//! ```
//!
//! Each entity goes through its own record type so the file layout stays fixed
//! even if the in-memory structs change. Ids are persisted, never regenerated.

use super::error::{Result, StorageError};
use super::types::{DataPoint, Experiment, Patient};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Current on-disk format version.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientRecord {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperimentRecord {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataPointRecord {
    pub id: String,
    pub patient_id: String,
    pub experiment_id: String,
    pub payload: serde_json::Value,
}

impl From<&Patient> for PatientRecord {
    fn from(p: &Patient) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
        }
    }
}

impl From<PatientRecord> for Patient {
    fn from(r: PatientRecord) -> Self {
        Patient {
            id: r.id,
            name: r.name,
        }
    }
}

impl From<&Experiment> for ExperimentRecord {
    fn from(e: &Experiment) -> Self {
        Self {
            id: e.id.clone(),
            name: e.name.clone(),
        }
    }
}

impl From<ExperimentRecord> for Experiment {
    fn from(r: ExperimentRecord) -> Self {
        Experiment {
            id: r.id,
            name: r.name,
        }
    }
}

impl From<&DataPoint> for DataPointRecord {
    fn from(d: &DataPoint) -> Self {
        Self {
            id: d.id.clone(),
            patient_id: d.patient_id.clone(),
            experiment_id: d.experiment_id.clone(),
            payload: d.payload.clone(),
        }
    }
}

impl From<DataPointRecord> for DataPoint {
    fn from(r: DataPointRecord) -> Self {
        DataPoint {
            id: r.id,
            patient_id: r.patient_id,
            experiment_id: r.experiment_id,
            payload: r.payload,
        }
    }
}

/// The full persisted state of a store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub version: u32,
    pub patients: Vec<PatientRecord>,
    pub experiments: Vec<ExperimentRecord>,
    pub datapoints: Vec<DataPointRecord>,
}

impl Snapshot {
    pub fn new(patients: &[Patient], experiments: &[Experiment], datapoints: &[DataPoint]) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            patients: patients.iter().map(PatientRecord::from).collect(),
            experiments: experiments.iter().map(ExperimentRecord::from).collect(),
            datapoints: datapoints.iter().map(DataPointRecord::from).collect(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Decodes a snapshot read from `path`. `path` is only used for error reporting.
    pub fn decode(bytes: &[u8], path: &Path) -> Result<Self> {
        let snapshot: Snapshot =
            serde_json::from_slice(bytes).map_err(|e| StorageError::corrupt(path, e))?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StorageError::corrupt(
                path,
                format!(
                    "unsupported snapshot version {} (expected {})",
                    snapshot.version, SNAPSHOT_VERSION
                ),
            ));
        }

        Ok(snapshot)
    }

    pub fn into_entities(self) -> (Vec<Patient>, Vec<Experiment>, Vec<DataPoint>) {
        (
            self.patients.into_iter().map(Patient::from).collect(),
            self.experiments.into_iter().map(Experiment::from).collect(),
            self.datapoints.into_iter().map(DataPoint::from).collect(),
        )
    }
}

/// Writes `snapshot` to `path`, replacing any previous file.
///
/// The bytes go to a sibling `.tmp` file that is then renamed over `path`,
/// so readers see either the old snapshot or the new one, never a prefix.
pub async fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let bytes = snapshot.encode()?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StorageError::io(parent, e))?;
    }

    let tmp_path = temp_path_for(path);
    tokio::fs::write(&tmp_path, bytes)
        .await
        .map_err(|e| StorageError::io(&tmp_path, e))?;

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(StorageError::io(path, e));
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Reads the snapshot at `path`. Returns `Ok(None)` when no file exists yet.
pub async fn read_snapshot(path: &Path) -> Result<Option<Snapshot>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StorageError::io(path, e)),
    };

    Snapshot::decode(&bytes, path).map(Some)
}
