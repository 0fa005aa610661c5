//! Service Module Tests
//!
//! Drives the full router in-process with `tower::ServiceExt::oneshot`.
//!
//! ## Test Scopes
//! - **Entities API**: Create/get/list patients and experiments, 400/404 paths.
//! - **Uploads**: Datapoint payload handling and composite-key lookup.
//! - **Persistence API**: `/store` and `/load` against a temporary snapshot.
//! - **Glue**: Basic auth on the index route and the memory endpoint.

#[cfg(test)]
mod tests {
    use crate::config::EnvConfig;
    use crate::service::build_router;
    use crate::storage::memory::DataStorage;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt; // for `oneshot`

    fn test_app() -> (TempDir, Arc<DataStorage>, Router) {
        let dir = tempfile::tempdir().unwrap();
        let config = EnvConfig {
            data_file: dir.path().join("data_storage.json"),
            memory_chunk: 16,
            ..EnvConfig::default()
        };
        let storage = Arc::new(DataStorage::new(config.data_file.clone()));
        let app = build_router(storage.clone(), &config);
        (dir, storage, app)
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
        authorization: Option<String>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = authorization {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn basic(user: &str, password: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{}:{}", user, password)))
    }

    // ============================================================
    // ENTITIES API
    // ============================================================

    #[tokio::test]
    async fn test_create_and_fetch_patient() {
        let (_dir, _storage, app) = test_app();

        let (status, created) =
            send(&app, "POST", "/patient", Some(json!({"name": "Alice"})), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["name"], "Alice");
        let id = created["id"].as_str().unwrap().to_string();

        let (status, fetched) = send(&app, "GET", &format!("/patient?id={}", id), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_unknown_ids_return_404() {
        let (_dir, _storage, app) = test_app();

        let (status, body) = send(&app, "GET", "/patient?id=nope", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "patient not found");

        let (status, body) = send(&app, "GET", "/experiment?id=nope", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "experiment not found");
    }

    #[tokio::test]
    async fn test_missing_name_is_bad_request() {
        let (_dir, storage, app) = test_app();

        let (status, _) = send(&app, "POST", "/patient", Some(json!({})), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) =
            send(&app, "POST", "/experiment", Some(json!({"title": "x"})), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("name"));

        assert!(storage.get_all_patients().await.is_empty());
        assert!(storage.get_all_experiments().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_id_query_is_bad_request() {
        let (_dir, _storage, app) = test_app();

        let (status, _) = send(&app, "GET", "/patient", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_experiments_in_order() {
        let (_dir, _storage, app) = test_app();
        for name in ["Trial1", "Trial2", "Trial3"] {
            send(&app, "POST", "/experiment", Some(json!({"name": name})), None).await;
        }

        let (status, body) = send(&app, "GET", "/experiments", None, None).await;

        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Trial1", "Trial2", "Trial3"]);
    }

    // ============================================================
    // UPLOADS
    // ============================================================

    #[tokio::test]
    async fn test_upload_with_explicit_payload() {
        let (_dir, _storage, app) = test_app();

        let (status, dp) = send(
            &app,
            "POST",
            "/upload",
            Some(json!({"patientId": "P1", "experimentId": "E1", "payload": {"hr": 72}})),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(dp["patientId"], "P1");
        assert_eq!(dp["experimentId"], "E1");
        assert_eq!(dp["payload"], json!({"hr": 72}));
        assert!(dp["id"].is_string());
    }

    #[tokio::test]
    async fn test_upload_without_payload_member_keeps_remaining_fields() {
        let (_dir, _storage, app) = test_app();

        let (status, dp) = send(
            &app,
            "POST",
            "/upload",
            Some(json!({"patientId": "P1", "experimentId": "E1", "hr": 72, "steps": 1000})),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(dp["payload"], json!({"hr": 72, "steps": 1000}));
    }

    #[tokio::test]
    async fn test_upload_keeps_explicit_null_payload() {
        let (_dir, storage, app) = test_app();

        let (status, dp) = send(
            &app,
            "POST",
            "/upload",
            Some(json!({"patientId": "P1", "experimentId": "E1", "payload": null})),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(dp["payload"], Value::Null);
        assert_eq!(storage.get_data("P1", "E1").await[0].payload, Value::Null);
    }

    #[tokio::test]
    async fn test_malformed_upload_body_is_json_bad_request() {
        let (_dir, storage, app) = test_app();

        // Wrong type for a known field
        let (status, body) = send(
            &app,
            "POST",
            "/upload",
            Some(json!({"patientId": 5, "experimentId": "E1"})),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        // No content type at all
        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .body(Body::from(r#"{"patientId": "P1", "experimentId": "E1"}"#))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].is_string());

        assert!(storage.get_all_data().await.is_empty());
    }

    #[tokio::test]
    async fn test_upload_missing_experiment_is_bad_request() {
        let (_dir, storage, app) = test_app();

        let (status, body) =
            send(&app, "POST", "/upload", Some(json!({"patientId": "P1"})), None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("experimentId"));
        assert!(storage.get_all_data().await.is_empty());
    }

    #[tokio::test]
    async fn test_get_data_by_composite_key() {
        let (_dir, _storage, app) = test_app();
        for hr in [70, 71] {
            send(
                &app,
                "POST",
                "/upload",
                Some(json!({"patientId": "P1", "experimentId": "E1", "payload": {"hr": hr}})),
                None,
            )
            .await;
        }

        let (status, body) =
            send(&app, "GET", "/data?patientId=P1&experimentId=E1", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["payload"]["hr"], 70);
        assert_eq!(rows[1]["payload"]["hr"], 71);

        let (status, _) = send(&app, "GET", "/data?patientId=P1", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    // ============================================================
    // PERSISTENCE API
    // ============================================================

    #[tokio::test]
    async fn test_store_then_load_into_fresh_app() {
        let (dir, _storage, app) = test_app();
        let (_, alice) = send(&app, "POST", "/patient", Some(json!({"name": "Alice"})), None).await;
        let (_, trial) =
            send(&app, "POST", "/experiment", Some(json!({"name": "Trial1"})), None).await;
        send(
            &app,
            "POST",
            "/upload",
            Some(json!({
                "patientId": alice["id"],
                "experimentId": trial["id"],
                "payload": {"hr": 72}
            })),
            None,
        )
        .await;

        let (status, stored) = send(&app, "POST", "/store", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stored["success"], true);
        assert_eq!(stored["datapoints"], 1);

        // Fresh store over the same snapshot file
        let config = EnvConfig {
            data_file: dir.path().join("data_storage.json"),
            ..EnvConfig::default()
        };
        let fresh = build_router(Arc::new(DataStorage::new(config.data_file.clone())), &config);

        let (status, loaded) = send(&fresh, "POST", "/load", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(loaded["loaded"], true);
        assert_eq!(loaded["patients"], 1);

        let uri = format!("/patient?id={}", alice["id"].as_str().unwrap());
        let (status, fetched) = send(&fresh, "GET", &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, alice);
    }

    #[tokio::test]
    async fn test_load_without_snapshot_reports_nothing_loaded() {
        let (_dir, _storage, app) = test_app();

        let (status, body) = send(&app, "POST", "/load", None, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["loaded"], false);
        assert_eq!(body["patients"], 0);
    }

    // ============================================================
    // GLUE
    // ============================================================

    #[tokio::test]
    async fn test_index_requires_basic_auth() {
        let (_dir, _storage, app) = test_app();

        let (status, _) = send(&app, "GET", "/", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, "GET", "/", None, Some(basic("user", "wrong"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(&app, "GET", "/", None, Some(basic("user", "password"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "biomarker-backend");
    }

    #[tokio::test]
    async fn test_memory_endpoint_grows_ballast() {
        let (_dir, _storage, app) = test_app();

        let (status, first) = send(&app, "GET", "/memory", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["size"], 16);

        let (_, second) = send(&app, "GET", "/memory", None, None).await;
        assert_eq!(second["size"], 32);
        assert!(second["memory"].as_f64().unwrap() >= 0.0);
    }

    #[tokio::test]
    async fn test_ballast_grows_by_chunk() {
        use crate::service::diagnostics::MemoryBallast;

        let ballast = MemoryBallast::new(8);

        assert_eq!(ballast.grow().await.unwrap(), 8);
        assert_eq!(ballast.grow().await.unwrap(), 16);
    }

    #[test]
    fn test_parse_basic_auth_header() {
        use crate::service::auth::parse_basic_auth;

        assert_eq!(
            parse_basic_auth(&basic("user", "pa:ss")),
            Some(("user".to_string(), "pa:ss".to_string()))
        );
        assert_eq!(parse_basic_auth("Bearer token"), None);
        assert_eq!(parse_basic_auth("Basic !!!notbase64"), None);
    }
}
