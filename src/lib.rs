//! Digital Biomarker Backend Library
//!
//! This library crate defines the modules behind the data-collection service.
//! It serves as the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! - **`storage`**: The in-memory repository of patients, experiments and datapoints,
//!   its JSON snapshot codec and the HTTP handlers that call into it.
//! - **`service`**: Router assembly, Basic authentication and diagnostics endpoints.
//! - **`config`**: The JSON environment file read at startup.

pub mod config;
pub mod service;
pub mod storage;
