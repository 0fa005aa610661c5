//! Service metadata and the memory-pressure endpoint.

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinError;

use super::auth::AuthenticatedUser;
use crate::config::ServiceInfo;
use crate::storage::protocol::ErrorResponse;

/// Process-wide buffer of random samples grown on every `/memory` call.
/// It is never shrunk.
pub struct MemoryBallast {
    samples: Mutex<Vec<f64>>,
    chunk: usize,
}

impl MemoryBallast {
    pub fn new(chunk: usize) -> Self {
        Self {
            samples: Mutex::new(Vec::new()),
            chunk,
        }
    }

    /// Appends one chunk of samples and returns the new total.
    ///
    /// Samples are generated on the blocking pool; the runtime thread only
    /// waits for them and then extends the buffer.
    pub async fn grow(&self) -> Result<usize, JoinError> {
        let size = self.chunk;
        let chunk: Vec<f64> = tokio::task::spawn_blocking(move || {
            (0..size).map(|_| rand::random::<f64>()).collect()
        })
        .await?;
        let mut samples = self.samples.lock().await;
        samples.extend(chunk);
        Ok(samples.len())
    }
}

/// Resident set size of this process in MiB, if the platform reports it.
pub fn resident_memory_mb() -> Option<f64> {
    let pid = sysinfo::get_current_pid().ok()?;
    let mut system = sysinfo::System::new();
    if !system.refresh_process(pid) {
        return None;
    }
    system
        .process(pid)
        .map(|process| process.memory() as f64 / (1024.0 * 1024.0))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MemoryResponse {
    /// Samples currently held by the ballast
    pub size: usize,
    /// Resident memory in MiB (0 when unavailable)
    pub memory: f64,
}

pub async fn handle_memory(Extension(ballast): Extension<Arc<MemoryBallast>>) -> Response {
    tracing::info!("Memory endpoint accessed.");
    let size = match ballast.grow().await {
        Ok(size) => size,
        Err(e) => {
            tracing::error!("Failed to grow memory ballast: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("failed to grow memory ballast")),
            )
                .into_response();
        }
    };
    // sysinfo reads /proc synchronously
    let memory = tokio::task::spawn_blocking(resident_memory_mb)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    tracing::info!("Memory used: {:.2} MB", memory);
    Json(MemoryResponse { size, memory }).into_response()
}

pub async fn handle_index(
    Extension(info): Extension<Arc<ServiceInfo>>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
) -> Json<ServiceInfo> {
    tracing::info!("Index route accessed by '{}'", user);
    Json(info.as_ref().clone())
}
