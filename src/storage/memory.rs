use super::error::{Result, StorageError};
use super::snapshot::{Snapshot, read_snapshot, write_snapshot};
use super::types::{CompositeKey, DataPoint, Entity, Experiment, Patient, StoreStats};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};

/// Insertion-ordered collection with an id index.
#[derive(Debug, Clone)]
struct Collection<T> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T: Entity> Collection<T> {
    fn new() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn from_items(items: Vec<T>) -> Result<Self> {
        let mut collection = Self::new();
        for item in items {
            collection.insert(item)?;
        }
        Ok(collection)
    }

    /// Appends `item`; rejects it if the id is already taken.
    fn insert(&mut self, item: T) -> Result<usize> {
        if self.index.contains_key(item.id()) {
            return Err(StorageError::DuplicateId {
                kind: T::KIND,
                id: item.id().to_string(),
            });
        }
        let position = self.items.len();
        self.index.insert(item.id().to_string(), position);
        self.items.push(item);
        Ok(position)
    }

    fn get(&self, id: &str) -> Option<&T> {
        self.index.get(id).map(|&position| &self.items[position])
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

#[derive(Debug, Clone)]
struct StoreState {
    patients: Collection<Patient>,
    experiments: Collection<Experiment>,
    datapoints: Collection<DataPoint>,
    by_key: HashMap<CompositeKey, Vec<usize>>,
}

impl StoreState {
    fn empty() -> Self {
        Self {
            patients: Collection::new(),
            experiments: Collection::new(),
            datapoints: Collection::new(),
            by_key: HashMap::new(),
        }
    }

    fn from_parts(
        patients: Vec<Patient>,
        experiments: Vec<Experiment>,
        datapoints: Vec<DataPoint>,
    ) -> Result<Self> {
        let mut state = Self {
            patients: Collection::from_items(patients)?,
            experiments: Collection::from_items(experiments)?,
            datapoints: Collection::new(),
            by_key: HashMap::new(),
        };
        for datapoint in datapoints {
            state.insert_datapoint(datapoint)?;
        }
        Ok(state)
    }

    fn insert_datapoint(&mut self, datapoint: DataPoint) -> Result<()> {
        let key = datapoint.composite_key();
        let position = self.datapoints.insert(datapoint)?;
        self.by_key.entry(key).or_default().push(position);
        Ok(())
    }

    fn stats(&self) -> StoreStats {
        StoreStats {
            patients: self.patients.len(),
            experiments: self.experiments.len(),
            datapoints: self.datapoints.len(),
        }
    }

    fn to_snapshot(&self) -> Snapshot {
        Snapshot::new(
            &self.patients.items,
            &self.experiments.items,
            &self.datapoints.items,
        )
    }
}

/// The in-memory repository of patients, experiments and datapoints.
///
/// One instance is created at startup and shared by every request handler
/// through an `Arc`. All collections sit behind a single `RwLock`: adds take
/// the write lock, lookups and snapshot capture take the read lock.
pub struct DataStorage {
    state: RwLock<StoreState>,
    snapshot_path: PathBuf,
    // Serialises snapshot file access: writers with each other and with readers.
    persist_lock: Mutex<()>,
}

impl DataStorage {
    pub fn new(snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            state: RwLock::new(StoreState::empty()),
            snapshot_path: snapshot_path.into(),
            persist_lock: Mutex::new(()),
        }
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    pub async fn add_patient(&self, patient: Patient) -> Result<()> {
        let mut state = self.state.write().await;
        state.patients.insert(patient).inspect_err(log_violation)?;
        Ok(())
    }

    pub async fn add_experiment(&self, experiment: Experiment) -> Result<()> {
        let mut state = self.state.write().await;
        state.experiments.insert(experiment).inspect_err(log_violation)?;
        Ok(())
    }

    /// Files a datapoint under its `(patientId, experimentId)` key. The
    /// referenced patient and experiment do not have to exist.
    pub async fn add_data(&self, datapoint: DataPoint) -> Result<()> {
        let mut state = self.state.write().await;
        state.insert_datapoint(datapoint).inspect_err(log_violation)
    }

    pub async fn create_patient(&self, name: &str) -> Result<Patient> {
        let name = require("name", name)?;
        let patient = Patient::new(name);
        self.add_patient(patient.clone()).await?;
        tracing::debug!(id = %patient.id, "Patient created");
        Ok(patient)
    }

    pub async fn create_experiment(&self, name: &str) -> Result<Experiment> {
        let name = require("name", name)?;
        let experiment = Experiment::new(name);
        self.add_experiment(experiment.clone()).await?;
        tracing::debug!(id = %experiment.id, "Experiment created");
        Ok(experiment)
    }

    pub async fn upload(
        &self,
        patient_id: &str,
        experiment_id: &str,
        payload: serde_json::Value,
    ) -> Result<DataPoint> {
        let patient_id = require("patientId", patient_id)?;
        let experiment_id = require("experimentId", experiment_id)?;
        let datapoint = DataPoint::new(patient_id, experiment_id, payload);
        self.add_data(datapoint.clone()).await?;
        tracing::debug!(
            id = %datapoint.id,
            patient = %datapoint.patient_id,
            experiment = %datapoint.experiment_id,
            "Datapoint stored"
        );
        Ok(datapoint)
    }

    pub async fn get_patient(&self, id: &str) -> Option<Patient> {
        self.state.read().await.patients.get(id).cloned()
    }

    pub async fn get_experiment(&self, id: &str) -> Option<Experiment> {
        self.state.read().await.experiments.get(id).cloned()
    }

    pub async fn get_datapoint(&self, id: &str) -> Option<DataPoint> {
        self.state.read().await.datapoints.get(id).cloned()
    }

    pub async fn get_all_patients(&self) -> Vec<Patient> {
        self.state.read().await.patients.items.clone()
    }

    pub async fn get_all_experiments(&self) -> Vec<Experiment> {
        self.state.read().await.experiments.items.clone()
    }

    pub async fn get_all_data(&self) -> Vec<DataPoint> {
        self.state.read().await.datapoints.items.clone()
    }

    /// Datapoints filed under the given composite key, oldest first.
    pub async fn get_data(&self, patient_id: &str, experiment_id: &str) -> Vec<DataPoint> {
        let state = self.state.read().await;
        let key = CompositeKey::new(patient_id, experiment_id);
        state
            .by_key
            .get(&key)
            .map(|positions| {
                positions
                    .iter()
                    .map(|&position| state.datapoints.items[position].clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn stats(&self) -> StoreStats {
        self.state.read().await.stats()
    }

    /// Writes the full current state to the snapshot path, overwriting any
    /// previous snapshot. The state lock is only held while capturing.
    pub async fn store_data(&self) -> Result<StoreStats> {
        let _writer = self.persist_lock.lock().await;

        let (snapshot, stats) = {
            let state = self.state.read().await;
            (state.to_snapshot(), state.stats())
        };

        write_snapshot(&self.snapshot_path, &snapshot).await?;

        tracing::info!(
            path = %self.snapshot_path.display(),
            patients = stats.patients,
            experiments = stats.experiments,
            datapoints = stats.datapoints,
            "Stored data snapshot"
        );
        Ok(stats)
    }

    /// Replaces the in-memory collections with the snapshot's contents.
    ///
    /// Returns `Ok(None)` and leaves the store untouched when no snapshot
    /// exists. A snapshot that cannot be decoded fails without modifying
    /// the store.
    pub async fn load_data(&self) -> Result<Option<StoreStats>> {
        let snapshot = {
            let _reader = self.persist_lock.lock().await;
            read_snapshot(&self.snapshot_path).await?
        };
        let Some(snapshot) = snapshot else {
            tracing::info!(
                path = %self.snapshot_path.display(),
                "No data snapshot found, starting empty"
            );
            return Ok(None);
        };

        let (patients, experiments, datapoints) = snapshot.into_entities();
        let loaded = StoreState::from_parts(patients, experiments, datapoints)
            .map_err(|e| StorageError::corrupt(&self.snapshot_path, e))?;
        let stats = loaded.stats();

        *self.state.write().await = loaded;

        tracing::info!(
            path = %self.snapshot_path.display(),
            patients = stats.patients,
            experiments = stats.experiments,
            datapoints = stats.datapoints,
            "Loaded data snapshot"
        );
        Ok(Some(stats))
    }
}

fn require<'a>(field: &'static str, value: &'a str) -> Result<&'a str> {
    if value.trim().is_empty() {
        return Err(StorageError::Validation { field });
    }
    Ok(value)
}

fn log_violation(e: &StorageError) {
    tracing::error!("Store invariant violated: {}", e);
}
