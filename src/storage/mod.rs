//! Data Storage Module
//!
//! The in-memory repository behind every endpoint, plus its on-disk snapshot.
//!
//! ## Core Concepts
//! - **Entities**: `Patient`, `Experiment` and `DataPoint`, each identified by a UUID
//!   assigned at creation and never changed afterwards.
//! - **Store**: `DataStorage` keeps one insertion-ordered collection per entity kind
//!   behind a single lock, and files datapoints under their `(patientId, experimentId)` key.
//! - **Snapshot**: `store_data` writes the whole store as one JSON document; `load_data`
//!   replaces the collections wholesale with a previously written snapshot.
//! - **Access**: `handlers` expose the store over HTTP; `protocol` holds the endpoint
//!   paths and request/response bodies.

pub mod error;
pub mod handlers;
pub mod memory;
pub mod protocol;
pub mod snapshot;
pub mod types;
