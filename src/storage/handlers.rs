use axum::{
    Json,
    extract::{Extension, Query, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::error::StorageError;
use super::memory::DataStorage;
use super::protocol::{
    CreateEntityRequest, DataQuery, ErrorResponse, IdQuery, PersistResponse, UploadRequest,
};

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

fn storage_error_response(e: &StorageError) -> Response {
    if e.is_client_error() {
        tracing::warn!("Rejected request: {}", e);
        error_response(StatusCode::BAD_REQUEST, e.to_string())
    } else {
        tracing::error!("Storage failure: {}", e);
        error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
}

// Malformed bodies get the same JSON error shape as every other failure.
fn rejection_response(rejection: JsonRejection) -> Response {
    tracing::warn!("Rejected request body: {}", rejection.body_text());
    error_response(StatusCode::BAD_REQUEST, rejection.body_text())
}

pub async fn handle_create_patient(
    Extension(storage): Extension<Arc<DataStorage>>,
    body: Result<Json<CreateEntityRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    tracing::info!("Patient endpoint called [POST]");
    let name = req.name.unwrap_or_default();
    match storage.create_patient(&name).await {
        Ok(patient) => {
            tracing::info!("Patient created: {}", patient.id);
            (StatusCode::OK, Json(patient)).into_response()
        }
        Err(e) => storage_error_response(&e),
    }
}

pub async fn handle_get_patient(
    Extension(storage): Extension<Arc<DataStorage>>,
    Query(query): Query<IdQuery>,
) -> Response {
    tracing::info!("Patient endpoint called [GET]");
    let Some(id) = query.id else {
        return error_response(StatusCode::BAD_REQUEST, "Missing 'id' query parameter");
    };

    match storage.get_patient(&id).await {
        Some(patient) => (StatusCode::OK, Json(patient)).into_response(),
        None => {
            tracing::warn!("Patient not found: {}", id);
            error_response(StatusCode::NOT_FOUND, "patient not found")
        }
    }
}

pub async fn handle_list_patients(Extension(storage): Extension<Arc<DataStorage>>) -> Response {
    tracing::info!("Listing all patients.");
    Json(storage.get_all_patients().await).into_response()
}

pub async fn handle_create_experiment(
    Extension(storage): Extension<Arc<DataStorage>>,
    body: Result<Json<CreateEntityRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    tracing::info!("Experiment endpoint called [POST]");
    let name = req.name.unwrap_or_default();
    match storage.create_experiment(&name).await {
        Ok(experiment) => {
            tracing::info!("Experiment created: {}", experiment.id);
            (StatusCode::OK, Json(experiment)).into_response()
        }
        Err(e) => storage_error_response(&e),
    }
}

pub async fn handle_get_experiment(
    Extension(storage): Extension<Arc<DataStorage>>,
    Query(query): Query<IdQuery>,
) -> Response {
    tracing::info!("Experiment endpoint called [GET]");
    let Some(id) = query.id else {
        return error_response(StatusCode::BAD_REQUEST, "Missing 'id' query parameter");
    };

    match storage.get_experiment(&id).await {
        Some(experiment) => (StatusCode::OK, Json(experiment)).into_response(),
        None => {
            tracing::warn!("Experiment not found: {}", id);
            error_response(StatusCode::NOT_FOUND, "experiment not found")
        }
    }
}

pub async fn handle_list_experiments(
    Extension(storage): Extension<Arc<DataStorage>>,
) -> Response {
    tracing::info!("Listing all experiments.");
    Json(storage.get_all_experiments().await).into_response()
}

pub async fn handle_upload(
    Extension(storage): Extension<Arc<DataStorage>>,
    body: Result<Json<UploadRequest>, JsonRejection>,
) -> Response {
    let Json(mut req) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    tracing::info!("Upload endpoint called.");
    let patient_id = req.patient_id.take().unwrap_or_default();
    let experiment_id = req.experiment_id.take().unwrap_or_default();

    match storage
        .upload(&patient_id, &experiment_id, req.into_payload())
        .await
    {
        Ok(datapoint) => {
            tracing::info!(
                "Data uploaded for patient {} in experiment {}",
                patient_id,
                experiment_id
            );
            (StatusCode::OK, Json(datapoint)).into_response()
        }
        Err(e) => storage_error_response(&e),
    }
}

pub async fn handle_get_data(
    Extension(storage): Extension<Arc<DataStorage>>,
    Query(query): Query<DataQuery>,
) -> Response {
    let (Some(patient_id), Some(experiment_id)) = (query.patient_id, query.experiment_id) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Both 'patientId' and 'experimentId' query parameters are required",
        );
    };

    Json(storage.get_data(&patient_id, &experiment_id).await).into_response()
}

pub async fn handle_store(Extension(storage): Extension<Arc<DataStorage>>) -> Response {
    tracing::info!("Storing all data to disk.");
    match storage.store_data().await {
        Ok(stats) => (
            StatusCode::OK,
            Json(PersistResponse {
                success: true,
                loaded: None,
                patients: stats.patients,
                experiments: stats.experiments,
                datapoints: stats.datapoints,
            }),
        )
            .into_response(),
        Err(e) => storage_error_response(&e),
    }
}

pub async fn handle_load(Extension(storage): Extension<Arc<DataStorage>>) -> Response {
    tracing::info!("Reloading data from disk.");
    match storage.load_data().await {
        Ok(loaded) => {
            let stats = match loaded {
                Some(stats) => stats,
                None => storage.stats().await,
            };
            (
                StatusCode::OK,
                Json(PersistResponse {
                    success: true,
                    loaded: Some(loaded.is_some()),
                    patients: stats.patients,
                    experiments: stats.experiments,
                    datapoints: stats.datapoints,
                }),
            )
                .into_response()
        }
        Err(e) => storage_error_response(&e),
    }
}
