use axum::{Router, routing::get};

use crate::{AppState, routes};

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(routes::users::router(&state))
        .merge(routes::enterprises::router())
        .merge(routes::areas::router())
        .merge(routes::waste_types::router())
        .merge(routes::reports::router(&state))
        .merge(routes::capabilities::router(&state))
        .merge(routes::tasks::router(&state))
        .merge(routes::visits::router(&state));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use db::DBService;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::AppState;

    async fn setup_app() -> Router {
        let db = DBService::connect("sqlite::memory:").await.unwrap();
        super::router(AppState::new(db))
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = match body {
            Some(json_body) => Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json_body.to_string()))
                .unwrap(),
            None => Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    fn data_id(json: &Value) -> String {
        json.pointer("/data/id")
            .and_then(|v| v.as_str())
            .expect("response data has an id")
            .to_string()
    }

    async fn create(app: &Router, uri: &str, body: Value) -> String {
        let (status, json) = send(app, "POST", uri, Some(body)).await;
        assert_eq!(status, StatusCode::OK, "POST {uri} failed: {json}");
        data_id(&json)
    }

    #[tokio::test]
    async fn health_check_is_public() {
        let app = setup_app().await;

        let (status, json) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.get("success").and_then(|v| v.as_bool()), Some(true));
    }

    #[tokio::test]
    async fn unknown_task_returns_not_found() {
        let app = setup_app().await;

        let (status, _) = send(
            &app,
            "GET",
            "/api/tasks/00000000-0000-0000-0000-000000000000",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn duplicate_email_returns_conflict() {
        let app = setup_app().await;

        create(
            &app,
            "/api/users",
            json!({"email": "dup@example.org", "display_name": "One", "role": "citizen"}),
        )
        .await;

        let (status, json) = send(
            &app,
            "POST",
            "/api/users",
            Some(json!({"email": "dup@example.org", "display_name": "Two", "role": "citizen"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json.get("success").and_then(|v| v.as_bool()), Some(false));
    }

    #[tokio::test]
    async fn report_to_resolved_lifecycle_over_http() {
        let app = setup_app().await;

        let citizen = create(
            &app,
            "/api/users",
            json!({"email": "citizen@example.org", "display_name": "Citizen", "role": "citizen"}),
        )
        .await;
        let collector = create(
            &app,
            "/api/users",
            json!({"email": "collector@example.org", "display_name": "Collector", "role": "collector"}),
        )
        .await;
        let area = create(&app, "/api/areas", json!({"name": "Old town"})).await;
        let waste_type = create(
            &app,
            "/api/waste-types",
            json!({"name": "Paper", "hazardous": false}),
        )
        .await;
        let enterprise = create(&app, "/api/enterprises", json!({"name": "Paper Mills"})).await;
        create(
            &app,
            "/api/capabilities",
            json!({
                "enterprise_id": enterprise,
                "area_id": area,
                "waste_type_id": waste_type,
                "daily_capacity_kg": 100.0
            }),
        )
        .await;

        let report = create(
            &app,
            "/api/reports",
            json!({
                "reporter_id": citizen,
                "area_id": area,
                "waste_type_id": waste_type,
                "description": "Paper piling up",
                "estimated_weight_kg": 30.0
            }),
        )
        .await;

        let task = create(
            &app,
            "/api/tasks",
            json!({"report_id": report, "enterprise_id": enterprise, "priority": "high"}),
        )
        .await;

        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/tasks/{task}/assign"),
            Some(json!({"collector_id": collector})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        // A second assignment while the first is active conflicts.
        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/tasks/{task}/assign"),
            Some(json!({"collector_id": collector})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/tasks/{task}/assignment/accept"),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let visit = create(
            &app,
            "/api/visits",
            json!({"task_id": task, "collector_id": collector}),
        )
        .await;
        create(
            &app,
            &format!("/api/visits/{visit}/items"),
            json!({"waste_type_id": waste_type, "weight_kg": 28.0, "sorting_level": "good"}),
        )
        .await;

        let (status, json) = send(
            &app,
            "POST",
            &format!("/api/visits/{visit}/complete"),
            Some(json!({"status": "visited"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json.pointer("/data/needs_reconciliation")
                .and_then(|v| v.as_bool()),
            Some(false)
        );

        // Completion is one-way.
        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/visits/{visit}/complete"),
            Some(json!({"status": "visited"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, json) = send(&app, "GET", &format!("/api/tasks/{task}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json.pointer("/data/status").and_then(|v| v.as_str()),
            Some("completed")
        );

        let (status, json) = send(&app, "GET", &format!("/api/reports/{report}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json.pointer("/data/status").and_then(|v| v.as_str()),
            Some("resolved")
        );

        let (status, json) = send(
            &app,
            "POST",
            &format!("/api/visits/{visit}/rating"),
            Some(json!({"rating": 5, "comment": "Quick and clean"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json.pointer("/data/rating").and_then(|v| v.as_i64()),
            Some(5)
        );
    }

    #[tokio::test]
    async fn capability_overflow_returns_conflict() {
        let app = setup_app().await;

        let area = create(&app, "/api/areas", json!({"name": "Docks"})).await;
        let waste_type = create(
            &app,
            "/api/waste-types",
            json!({"name": "Metal", "hazardous": false}),
        )
        .await;
        let enterprise = create(&app, "/api/enterprises", json!({"name": "Dock Metals"})).await;
        let capability = create(
            &app,
            "/api/capabilities",
            json!({
                "enterprise_id": enterprise,
                "area_id": area,
                "waste_type_id": waste_type,
                "daily_capacity_kg": 50.0
            }),
        )
        .await;

        // Same enterprise/area/waste-type triple conflicts.
        let (status, _) = send(
            &app,
            "POST",
            "/api/capabilities",
            Some(json!({
                "enterprise_id": enterprise,
                "area_id": area,
                "waste_type_id": waste_type,
                "daily_capacity_kg": 10.0
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, json) = send(
            &app,
            "PUT",
            &format!("/api/capabilities/{capability}"),
            Some(json!({"daily_capacity_kg": 75.0})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json.pointer("/data/daily_capacity_kg")
                .and_then(|v| v.as_f64()),
            Some(75.0)
        );

        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/capabilities/{capability}/deactivate"),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}
