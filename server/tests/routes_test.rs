//! HTTP route tests, driven through the router without a socket.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use rindang_engine::SyncState;
use rindang_server::{AppState, Config, Connectivity, InMemoryRemote, SyncCoordinator};
use serde_json::{json, Value};
use tower::ServiceExt;

/// Test helper: an offline app over an in-memory remote.
fn test_app(auth_secret: Option<&str>) -> Router {
    let config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        remote_url: None,
        remote_api_key: None,
        state_path: PathBuf::from("unused.json"),
        probe_interval: Duration::from_secs(15),
        replay_timeout: None,
        auth_secret: auth_secret.map(str::to_string),
    };
    let coordinator = SyncCoordinator::new(
        SyncState::new(),
        Arc::new(InMemoryRemote::new()),
        Connectivity::new(false),
    );
    rindang_server::app(AppState {
        coordinator: Arc::new(coordinator),
        config: Arc::new(config),
    })
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[cfg(test)]
mod surface_tests {
    use super::*;

    #[tokio::test]
    async fn test_health() {
        let app = test_app(None);
        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_bearer_secret_is_enforced() {
        let app = test_app(Some("s3cret"));

        let (status, _) = send(&app, Method::GET, "/sync/status", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .uri("/sync/status")
            .header(header::AUTHORIZATION, "Bearer s3cret")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let request = Request::builder()
            .uri("/sync/status")
            .header(header::AUTHORIZATION, "Bearer wrong")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_sync_while_offline_does_not_start() {
        let app = test_app(None);
        let (status, body) = send(&app, Method::POST, "/sync", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"started": false}));
    }

    #[tokio::test]
    async fn test_connectivity_override() {
        let app = test_app(None);
        let (_, body) = send(&app, Method::PUT, "/connectivity", Some(json!({"online": true}))).await;
        assert_eq!(body["changed"], true);

        let (_, status) = send(&app, Method::GET, "/sync/status", None).await;
        assert_eq!(status["online"], true);
        assert_eq!(status["pending"], 0);
    }
}

#[cfg(test)]
mod table_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_update_delete_through_queue() {
        let app = test_app(None);

        let (status, body) = send(
            &app,
            Method::POST,
            "/tables/lands/records",
            Some(json!({"id": "l1", "name": "Sawah Utara"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["recordId"], "l1");
        assert_eq!(body["operation"], "create");
        assert_eq!(body["record"]["_synced"], false);

        let (status, body) = send(
            &app,
            Method::PATCH,
            "/tables/lands/records/l1",
            Some(json!({"name": "Sawah Selatan"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["record"]["name"], "Sawah Selatan");

        let (status, body) = send(&app, Method::DELETE, "/tables/lands/records/l1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["operation"], "delete");
        // Still readable until the remote confirms the delete
        assert_eq!(body["record"]["id"], "l1");

        let (_, status) = send(&app, Method::GET, "/sync/status", None).await;
        assert_eq!(status["pending"], 3);

        let (_, queue) = send(&app, Method::GET, "/sync/queue", None).await;
        assert_eq!(queue.as_array().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn test_unknown_table_and_missing_record() {
        let app = test_app(None);

        let (status, _) = send(&app, Method::POST, "/tables/crops/records", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::GET, "/tables/lands/records/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            Method::PATCH,
            "/tables/lands/records/nope",
            Some(json!({"name": "Sawah"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::DELETE, "/tables/lands/records/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, queue) = send(&app, Method::GET, "/sync/queue", None).await;
        assert_eq!(queue.as_array().map(Vec::len), Some(0));

        let (status, body) = send(
            &app,
            Method::POST,
            "/tables/productions/records",
            Some(json!({"id": "p1", "commodity": "Padi"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().is_some_and(|e| e.contains("land_id")));
    }

    #[tokio::test]
    async fn test_pull_offline_is_unavailable() {
        let app = test_app(None);
        let (status, _) = send(&app, Method::POST, "/tables/lands/pull", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}

#[cfg(test)]
mod schedule_tests {
    use super::*;

    #[tokio::test]
    async fn test_calendar_from_cached_records() {
        let app = test_app(None);
        send(
            &app,
            Method::POST,
            "/tables/lands/records",
            Some(json!({"id": "l1", "name": "Sawah Utara"})),
        )
        .await;
        for (id, start, end) in [
            ("p1", "2024-01-01", "2024-03-01"),
            ("p2", "2024-03-01", "2024-05-01"),
        ] {
            send(
                &app,
                Method::POST,
                "/tables/productions/records",
                Some(json!({
                    "id": id,
                    "land_id": "l1",
                    "commodity": "Padi",
                    "planting_date": start,
                    "estimated_harvest_date": end
                })),
            )
            .await;
        }

        let (status, body) = send(&app, Method::GET, "/calendar/2024", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["daysInYear"], 366);

        let land = &body["lands"][0];
        assert_eq!(land["land"]["id"], "l1");
        assert_eq!(land["hasConflicts"], true);
        assert_eq!(land["bars"][0]["bar"]["width"], 16.39);
        assert_eq!(land["bars"][0]["conflicts"][0]["productionId"], "p2");
    }

    #[tokio::test]
    async fn test_conflicts_for_posted_productions() {
        let app = test_app(None);
        let (status, body) = send(
            &app,
            Method::POST,
            "/schedule/conflicts",
            Some(json!({"productions": [
                {"id": "a", "land_id": "l1", "commodity": "Padi", "planting_date": "2024-01-01", "estimated_harvest_date": "2024-01-10"},
                {"id": "b", "land_id": "l1", "commodity": "Jagung", "planting_date": "2024-01-10"},
                {"id": "c", "land_id": "l2", "commodity": "Cabai", "planting_date": "2024-01-05"}
            ]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let map = body.as_object().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(body["a"][0]["productionId"], "b");
        assert_eq!(body["b"][0]["productionId"], "a");
        assert_eq!(body["a"][0]["overlapDays"], 1);
    }

    #[tokio::test]
    async fn test_check_candidate_against_given_set() {
        let app = test_app(None);
        let (status, body) = send(
            &app,
            Method::POST,
            "/schedule/check",
            Some(json!({
                "candidate": {"id": "new", "land_id": "l1", "commodity": "Kedelai", "planting_date": "2024-01-05", "estimated_harvest_date": "2024-01-06"},
                "existing": [
                    {"id": "a", "land_id": "l1", "commodity": "Padi", "planting_date": "2024-01-01", "estimated_harvest_date": "2024-01-10"}
                ]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["conflicts"][0]["productionId"], "a");
        assert_eq!(body["nextFreeStart"], "2024-01-11");
    }

    #[tokio::test]
    async fn test_calendar_rejects_bad_year() {
        let app = test_app(None);
        let (status, _) = send(&app, Method::GET, "/calendar/notayear", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
