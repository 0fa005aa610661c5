//! HTTP Service Module
//!
//! Wires the storage handlers, authentication and diagnostics into one axum
//! `Router`. Shared state travels to handlers as `Extension` layers.
//!
//! ## Submodules
//! - **`auth`**: HTTP Basic authentication middleware for the index route.
//! - **`diagnostics`**: Service metadata and the memory-pressure endpoint.

pub mod auth;
pub mod diagnostics;

use axum::{
    Router,
    extract::Extension,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;

use crate::config::EnvConfig;
use crate::storage::handlers::*;
use crate::storage::memory::DataStorage;
use crate::storage::protocol::*;
use auth::{Credentials, require_basic_auth};
use diagnostics::{MemoryBallast, handle_index, handle_memory};

pub const ENDPOINT_INDEX: &str = "/";
pub const ENDPOINT_MEMORY: &str = "/memory";

/// Builds the application router around an already-loaded store.
pub fn build_router(storage: Arc<DataStorage>, config: &EnvConfig) -> Router {
    let credentials = Arc::new(Credentials::new(config.users.clone()));
    let service_info = Arc::new(config.service.clone());
    let ballast = Arc::new(MemoryBallast::new(config.memory_chunk));

    let protected = Router::new()
        .route(ENDPOINT_INDEX, get(handle_index))
        .route_layer(middleware::from_fn(require_basic_auth));

    Router::new()
        .merge(protected)
        .route(ENDPOINT_MEMORY, get(handle_memory))
        .route(
            ENDPOINT_PATIENT,
            post(handle_create_patient).get(handle_get_patient),
        )
        .route(ENDPOINT_PATIENTS, get(handle_list_patients))
        .route(
            ENDPOINT_EXPERIMENT,
            post(handle_create_experiment).get(handle_get_experiment),
        )
        .route(ENDPOINT_EXPERIMENTS, get(handle_list_experiments))
        .route(ENDPOINT_UPLOAD, post(handle_upload))
        .route(ENDPOINT_DATA, get(handle_get_data))
        .route(ENDPOINT_STORE, post(handle_store))
        .route(ENDPOINT_LOAD, post(handle_load))
        .layer(Extension(storage))
        .layer(Extension(credentials))
        .layer(Extension(service_info))
        .layer(Extension(ballast))
}

#[cfg(test)]
mod tests;
