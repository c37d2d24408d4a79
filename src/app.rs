use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, rides};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(|| async { "pong" }))
        .nest("/api/auth", auth::router())
        .nest("/api/v1", rides::router(state.clone()))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::auth::claims::{Claims, Role};

    struct Reply {
        status: StatusCode,
        body: Value,
        text: String,
    }

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Reply {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        let req = match body {
            Some(b) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8_lossy(&bytes).to_string();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Reply { status, body, text }
    }

    async fn register(app: &Router, username: &str, password: &str, role: &str) -> Reply {
        call(
            app,
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "username": username, "password": password, "role": role })),
        )
        .await
    }

    async fn login(app: &Router, username: &str, password: &str) -> String {
        let r = call(
            app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": username, "password": password })),
        )
        .await;
        assert_eq!(r.status, StatusCode::OK, "{}", r.text);
        r.body["token"].as_str().unwrap().to_string()
    }

    async fn rider_and_driver(app: &Router) -> (String, String) {
        register(app, "alice", "pw1", "ROLE_USER").await;
        register(app, "bob", "pw2", "ROLE_DRIVER").await;
        (login(app, "alice", "pw1").await, login(app, "bob", "pw2").await)
    }

    fn assert_error_shape(r: &Reply, status: StatusCode, code: &str) {
        assert_eq!(r.status, status, "{}", r.text);
        assert_eq!(r.body["error"], code);
        assert!(r.body["message"].is_string());
        assert!(r.body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn ping_is_public() {
        let app = build_app(AppState::fake(false));
        let r = call(&app, Method::GET, "/ping", None, None).await;
        assert_eq!(r.status, StatusCode::OK);
        assert_eq!(r.text, "pong");
    }

    #[tokio::test]
    async fn register_and_login_responses() {
        let app = build_app(AppState::fake(false));
        let r = register(&app, "bob", "pw2", "ROLE_DRIVER").await;
        assert_eq!(r.status, StatusCode::OK);
        assert_eq!(r.text, "Driver registered successfully");
        let r = register(&app, "alice", "pw1", "ROLE_USER").await;
        assert_eq!(r.text, "User registered successfully");

        let dup = register(&app, "alice", "x", "ROLE_USER").await;
        assert_error_shape(&dup, StatusCode::BAD_REQUEST, "BAD_REQUEST");
        assert_eq!(dup.body["message"], "Username already exists");

        let r = call(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "bob", "password": "pw2" })),
        )
        .await;
        assert_eq!(r.status, StatusCode::OK);
        assert_eq!(r.body["role"], "ROLE_DRIVER");
        assert_eq!(r.body["message"], "Driver login successful");
        assert!(r.body["token"].as_str().unwrap().split('.').count() == 3);

        let bad = call(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "bob", "password": "nope" })),
        )
        .await;
        assert_error_shape(&bad, StatusCode::BAD_REQUEST, "BAD_REQUEST");
    }

    #[tokio::test]
    async fn malformed_bodies_are_validation_errors() {
        let app = build_app(AppState::fake(false));
        let r = register(&app, "eve", "pw", "ROLE_ADMIN").await;
        assert_error_shape(&r, StatusCode::BAD_REQUEST, "VALIDATION_ERROR");

        let r = register(&app, "", "pw", "ROLE_USER").await;
        assert_error_shape(&r, StatusCode::BAD_REQUEST, "VALIDATION_ERROR");
        assert_eq!(r.body["message"], "Username is required");

        let (alice, _) = rider_and_driver(&app).await;
        let r = call(
            &app,
            Method::POST,
            "/api/v1/rides",
            Some(&alice),
            Some(json!({ "pickupLocation": "X" })),
        )
        .await;
        assert_error_shape(&r, StatusCode::BAD_REQUEST, "VALIDATION_ERROR");
        assert_eq!(r.body["message"], "Drop location is required");
    }

    #[tokio::test]
    async fn protected_routes_require_valid_token() {
        let state = AppState::fake(false);
        let app = build_app(state.clone());
        let (alice, _) = rider_and_driver(&app).await;

        let r = call(&app, Method::GET, "/api/v1/user/rides", None, None).await;
        assert_error_shape(&r, StatusCode::UNAUTHORIZED, "UNAUTHORIZED");

        let mut tampered = alice.clone();
        tampered.pop();
        tampered.push(if alice.ends_with('A') { 'B' } else { 'A' });
        let r = call(&app, Method::GET, "/api/v1/user/rides", Some(&tampered), None).await;
        assert_error_shape(&r, StatusCode::UNAUTHORIZED, "UNAUTHORIZED");

        // expired token signed with the real secret
        let now = time::OffsetDateTime::now_utc().unix_timestamp() as usize;
        let expired = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &Claims {
                sub: "alice".into(),
                role: Role::Rider,
                iat: now - 7200,
                exp: now - 3600,
                iss: state.config.jwt.issuer.clone(),
                aud: state.config.jwt.audience.clone(),
            },
            &jsonwebtoken::EncodingKey::from_secret(state.config.jwt.secret.as_bytes()),
        )
        .unwrap();
        let r = call(&app, Method::GET, "/api/v1/user/rides", Some(&expired), None).await;
        assert_error_shape(&r, StatusCode::UNAUTHORIZED, "UNAUTHORIZED");

        let r = call(
            &app,
            Method::POST,
            &format!("/api/v1/rides/{}/complete", uuid::Uuid::new_v4()),
            None,
            None,
        )
        .await;
        assert_eq!(r.status, StatusCode::UNAUTHORIZED);

        let r = call(&app, Method::GET, "/api/v1/user/rides", Some(&alice), None).await;
        assert_eq!(r.status, StatusCode::OK);
        assert_eq!(r.body, json!([]));
    }

    #[tokio::test]
    async fn authentication_runs_before_role_gates() {
        let app = build_app(AppState::fake(false));
        rider_and_driver(&app).await;
        let id = uuid::Uuid::new_v4();

        let r = call(
            &app,
            Method::POST,
            "/api/v1/rides",
            None,
            Some(json!({ "pickupLocation": "X", "dropLocation": "Y" })),
        )
        .await;
        assert_error_shape(&r, StatusCode::UNAUTHORIZED, "UNAUTHORIZED");

        let r = call(&app, Method::GET, "/api/v1/driver/rides/requests", None, None).await;
        assert_error_shape(&r, StatusCode::UNAUTHORIZED, "UNAUTHORIZED");

        let r = call(
            &app,
            Method::POST,
            &format!("/api/v1/driver/rides/{id}/accept"),
            None,
            None,
        )
        .await;
        assert_error_shape(&r, StatusCode::UNAUTHORIZED, "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn wrong_method_is_unauthorized_without_token() {
        let app = build_app(AppState::fake(false));
        let (alice, _) = rider_and_driver(&app).await;

        let r = call(&app, Method::GET, "/api/v1/rides", None, None).await;
        assert_error_shape(&r, StatusCode::UNAUTHORIZED, "UNAUTHORIZED");

        let r = call(&app, Method::GET, "/api/v1/rides", Some(&alice), None).await;
        assert_eq!(r.status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn role_gates_return_forbidden() {
        let app = build_app(AppState::fake(false));
        let (alice, bob) = rider_and_driver(&app).await;

        let r = call(
            &app,
            Method::POST,
            "/api/v1/rides",
            Some(&bob),
            Some(json!({ "pickupLocation": "X", "dropLocation": "Y" })),
        )
        .await;
        assert_error_shape(&r, StatusCode::FORBIDDEN, "FORBIDDEN");

        let r = call(&app, Method::GET, "/api/v1/driver/rides/requests", Some(&alice), None).await;
        assert_error_shape(&r, StatusCode::FORBIDDEN, "FORBIDDEN");

        let ride = call(
            &app,
            Method::POST,
            "/api/v1/rides",
            Some(&alice),
            Some(json!({ "pickupLocation": "X", "dropLocation": "Y" })),
        )
        .await;
        let id = ride.body["id"].as_str().unwrap();
        let r = call(
            &app,
            Method::POST,
            &format!("/api/v1/driver/rides/{id}/accept"),
            Some(&alice),
            None,
        )
        .await;
        assert_error_shape(&r, StatusCode::FORBIDDEN, "FORBIDDEN");
    }

    #[tokio::test]
    async fn unknown_ride_is_not_found() {
        let app = build_app(AppState::fake(false));
        let (_, bob) = rider_and_driver(&app).await;
        for id in [uuid::Uuid::new_v4().to_string(), "not-a-uuid".to_string()] {
            let r = call(
                &app,
                Method::POST,
                &format!("/api/v1/driver/rides/{id}/accept"),
                Some(&bob),
                None,
            )
            .await;
            assert_error_shape(&r, StatusCode::NOT_FOUND, "NOT_FOUND");
        }
    }

    #[tokio::test]
    async fn ride_lifecycle_end_to_end() {
        for atomic in [false, true] {
            let state = AppState::fake(atomic);
            let app = build_app(state.clone());
            let (a, b) = rider_and_driver(&app).await;
            let alice_id = state.accounts.find_by_username("alice").await.unwrap().unwrap().id;
            let bob_id = state.accounts.find_by_username("bob").await.unwrap().unwrap().id;

            let r1 = call(
                &app,
                Method::POST,
                "/api/v1/rides",
                Some(&a),
                Some(json!({ "pickupLocation": "X", "dropLocation": "Y" })),
            )
            .await;
            assert_eq!(r1.status, StatusCode::OK, "{}", r1.text);
            assert_eq!(r1.body["status"], "REQUESTED");
            assert_eq!(r1.body["userId"], alice_id.to_string());
            assert!(r1.body["driverId"].is_null());
            let id = r1.body["id"].as_str().unwrap().to_string();

            let pending = call(&app, Method::GET, "/api/v1/driver/rides/requests", Some(&b), None).await;
            assert_eq!(pending.status, StatusCode::OK);
            assert!(pending.body.as_array().unwrap().iter().any(|r| r["id"] == id));

            let accepted = call(
                &app,
                Method::POST,
                &format!("/api/v1/driver/rides/{id}/accept"),
                Some(&b),
                None,
            )
            .await;
            assert_eq!(accepted.status, StatusCode::OK, "{}", accepted.text);
            assert_eq!(accepted.body["status"], "ACCEPTED");
            assert_eq!(accepted.body["driverId"], bob_id.to_string());

            // completion is open to any authenticated caller
            let completed = call(
                &app,
                Method::POST,
                &format!("/api/v1/rides/{id}/complete"),
                Some(&a),
                None,
            )
            .await;
            assert_eq!(completed.status, StatusCode::OK);
            assert_eq!(completed.body["status"], "COMPLETED");
            assert_eq!(completed.body["driverId"], bob_id.to_string());

            let again = call(
                &app,
                Method::POST,
                &format!("/api/v1/driver/rides/{id}/accept"),
                Some(&b),
                None,
            )
            .await;
            assert_error_shape(&again, StatusCode::BAD_REQUEST, "BAD_REQUEST");
            assert_eq!(again.body["message"], "Ride is not in REQUESTED state");

            let again = call(
                &app,
                Method::POST,
                &format!("/api/v1/rides/{id}/complete"),
                Some(&b),
                None,
            )
            .await;
            assert_error_shape(&again, StatusCode::BAD_REQUEST, "BAD_REQUEST");
            assert_eq!(again.body["message"], "Ride must be ACCEPTED to complete");

            let mine = call(&app, Method::GET, "/api/v1/user/rides", Some(&a), None).await;
            let mine = mine.body.as_array().unwrap().clone();
            assert_eq!(mine.len(), 1);
            assert_eq!(mine[0]["status"], "COMPLETED");
        }
    }
}
