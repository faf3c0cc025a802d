//! Full router behaviour: endpoints, envelope and middleware stack.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::Extension;
use axum::http::{header, Method, Request, StatusCode, Uri};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

use server_vitals::api::{create_router, AppState};
use server_vitals::config::Config;
use server_vitals::middleware::{self, PollutedQuery, Session};

use super::{fixed_probe, BrokenProbe};

fn app() -> Router {
    create_router(AppState::new(Config::default(), fixed_probe()))
}

async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.unwrap()
}

async fn get_path(app: Router, uri: &str) -> Response {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn server_health_reports_pid() {
    let response = get_path(app(), "/server-health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "SUCCESS");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Health: Server instance is healthy with process id 31337 on "));
    assert_eq!(body["data"], Value::Null);
}

#[tokio::test]
async fn memory_usage_formats_every_counter() {
    let body = json_body(get_path(app(), "/memory-usage").await).await;

    assert_eq!(
        body,
        json!({
            "status": "SUCCESS",
            "message": {
                "rss": "50.00 MB",
                "heapTotal": "200.00 MB",
                "heapUsed": "10.00 MB",
                "external": "40.00 MB",
            },
            "data": null,
        })
    );
}

#[tokio::test]
async fn cpu_usage_has_one_entry_per_core() {
    let body = json_body(get_path(app(), "/cpu-usage").await).await;
    let cores = body["message"].as_array().unwrap();

    assert_eq!(cores.len(), 2);
    assert_eq!(cores[0]["cpu"], 1);
    assert_eq!(cores[1]["cpu"], 2);
    assert_eq!(cores[0]["model"], "Fixed CPU @ 3.00GHz");
    assert_eq!(cores[0]["speed"], 3000);
    assert_eq!(
        cores[1]["usage"],
        json!({
            "user": "25.00%",
            "nice": "0.00%",
            "sys": "25.00%",
            "idle": "50.00%",
            "irq": "0.00%",
        })
    );
}

#[tokio::test]
async fn uptime_can_be_polled_repeatedly() {
    let app = app();

    for _ in 0..3 {
        let response = get_path(app.clone(), "/uptime").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["message"], "Server has been running for a few seconds");
    }
}

#[tokio::test]
async fn failed_reading_returns_server_error_envelope() {
    let app = create_router(AppState::new(Config::default(), Arc::new(BrokenProbe)));

    let response = get_path(app, "/memory-usage").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = json_body(response).await;
    assert_eq!(body["status"], "SERVER_ERROR");
    assert_eq!(body["message"], "Internal server error.");
}

#[tokio::test]
async fn unknown_route_is_record_not_found() {
    let response = get_path(app(), "/does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = json_body(response).await;
    assert_eq!(body["status"], "RECORD_NOT_FOUND");
    assert_eq!(body["data"], Value::Null);
}

#[tokio::test]
async fn wrong_method_on_known_path_is_bad_request_envelope() {
    let response = send(
        app(),
        Request::builder()
            .method(Method::POST)
            .uri("/uptime")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");

    let body = json_body(response).await;
    assert_eq!(
        body,
        json!({
            "status": "BAD_REQUEST",
            "message": "Method not allowed",
            "data": null,
        })
    );
}

#[tokio::test]
async fn security_headers_are_set() {
    let response = get_path(app(), "/server-health").await;
    let headers = response.headers();

    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-dns-prefetch-control"], "off");
    assert!(headers.contains_key("strict-transport-security"));
    assert!(!headers.contains_key("x-powered-by"));
}

#[tokio::test]
async fn cors_allows_only_configured_origin() {
    let config = Config {
        client_url: Some("https://app.example.com".to_string()),
        ..Config::default()
    };
    let app = create_router(AppState::new(config, fixed_probe()));

    let allowed = send(
        app.clone(),
        Request::builder()
            .uri("/uptime")
            .header(header::ORIGIN, "https://app.example.com")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(
        allowed.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://app.example.com"
    );
    assert_eq!(
        allowed.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
        "true"
    );

    let preflight = send(
        app,
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/uptime")
            .header(header::ORIGIN, "https://evil.example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_ne!(
        preflight
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .map(|value| value.as_bytes()),
        Some(&b"https://evil.example.com"[..])
    );
}

/// Router with extra routes behind the same middleware stack.
fn extra_routes(config: &Config) -> Router {
    let routes = Router::new()
        .route(
            "/login",
            get(|session: Session| async move {
                session.insert("user", "ada");
                "ok"
            }),
        )
        .route(
            "/whoami",
            get(|session: Session| async move {
                Json(session.get("user").unwrap_or(Value::Null))
            }),
        )
        .route(
            "/echo-query",
            get(
                |uri: Uri, polluted: Option<Extension<PollutedQuery>>| async move {
                    let repeated = polluted
                        .map(|Extension(polluted)| polluted.0.len())
                        .unwrap_or(0);
                    Json(json!({
                        "query": uri.query(),
                        "repeated": repeated,
                    }))
                },
            ),
        )
        .route("/echo-body", post(|Json(body): Json<Value>| async move { Json(body) }));

    middleware::apply(routes, config)
}

#[tokio::test]
async fn session_round_trips_through_signed_cookies() {
    let app = extra_routes(&Config::default());

    let login = get_path(app.clone(), "/login").await;
    let cookies: Vec<String> = login
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect();
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().any(|c| c.starts_with("session=")));
    assert!(cookies.iter().any(|c| c.starts_with("session.sig=")));
    assert!(cookies.iter().all(|c| c.contains("HttpOnly")));

    let cookie_header = cookies
        .iter()
        .map(|c| c.split(';').next().unwrap())
        .collect::<Vec<_>>()
        .join("; ");

    let whoami = send(
        app.clone(),
        Request::builder()
            .uri("/whoami")
            .header(header::COOKIE, &cookie_header)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(json_body(whoami).await, json!("ada"));

    let tampered = cookie_header.replace("session.sig=", "session.sig=x");
    let whoami = send(
        app,
        Request::builder()
            .uri("/whoami")
            .header(header::COOKIE, tampered)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(json_body(whoami).await, Value::Null);
}

#[tokio::test]
async fn secure_session_cookie_needs_https_through_proxy() {
    let config = Config {
        node_env: Some("production".to_string()),
        ..Config::default()
    };
    let app = extra_routes(&config);

    let plain = get_path(app.clone(), "/login").await;
    assert!(plain.headers().get(header::SET_COOKIE).is_none());

    let proxied = send(
        app,
        Request::builder()
            .uri("/login")
            .header("x-forwarded-proto", "https")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    let cookie = proxied.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.contains("Secure"));
}

#[tokio::test]
async fn repeated_query_parameter_keeps_last_value() {
    let app = extra_routes(&Config::default());

    let body = json_body(get_path(app, "/echo-query?sort=asc&page=1&sort=desc").await).await;

    assert_eq!(body, json!({ "query": "sort=desc&page=1", "repeated": 1 }));
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let config = Config {
        body_limit_bytes: 32,
        ..Config::default()
    };
    let app = extra_routes(&config);
    let payload = json!({ "padding": "x".repeat(64) }).to_string();

    let response = send(
        app.clone(),
        Request::builder()
            .method(Method::POST)
            .uri("/echo-body")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CONTENT_LENGTH, payload.len())
            .body(Body::from(payload))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let response = send(
        app,
        Request::builder()
            .method(Method::POST)
            .uri("/echo-body")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"a":1}"#))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "a": 1 }));
}
