//! End-to-end tests of the relay router against a mocked upstream API.
//!
//! Every test drives the full axum router (middleware included) with
//! `oneshot` and points the upstream client at an `httpmock` server.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use httpmock::prelude::*;
use serde_json::{json, Value};
use std::path::PathBuf;
use tower::ServiceExt;

use calc_bff::models::{
    AuthorizeResponse, CalculateResponse, ExpressionResponse, ExpressionStatus,
    ExpressionsResponse,
};
use calc_bff::proxy::config::BackendConfig;
use calc_bff::{build_router, RelayConfig};

const SESSION: &str = "access_token=acc; refresh_token=ref";

fn config_for(backend: BackendConfig) -> RelayConfig {
    RelayConfig {
        backend,
        request_timeout: 5,
        static_dir: PathBuf::from("/nonexistent-static-root"),
        ..Default::default()
    }
}

fn app(server: &MockServer) -> Router {
    build_router(&config_for(BackendConfig {
        host: server.host(),
        port: server.port(),
        ..Default::default()
    }))
    .unwrap()
}

fn request(method: Method, path: &str, cookie: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(format!("/bff/api/v1{}", path));
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.unwrap()
}

fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

fn cookie_value<'a>(cookies: &'a [String], name: &str) -> Option<&'a str> {
    cookies.iter().find_map(|c| {
        c.split(';')
            .next()
            .and_then(|pair| pair.strip_prefix(&format!("{}=", name)))
    })
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn calculate_relays_and_rotates_access_token() {
    let server = MockServer::start_async().await;
    let upstream = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/calculate")
                .header("authorization", "Bearer acc")
                .header("refresh-token", "ref")
                .json_body(json!({ "expression": "1+1" }));
            then.status(200)
                .header("content-type", "application/json")
                .header("Access-Token", "new123")
                .json_body(json!({ "id": "abc" }));
        })
        .await;

    let response = send(
        app(&server),
        request(
            Method::POST,
            "/calculate",
            Some(SESSION),
            Some(json!({ "expression": "1+1" })),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert_eq!(cookie_value(&cookies, "access_token"), Some("new123"));
    assert_eq!(cookie_value(&cookies, "refresh_token"), None);
    assert!(cookies.iter().all(|c| c.contains("HttpOnly")));

    let body: CalculateResponse = serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(body.id, "abc");
    upstream.assert_async().await;
}

#[tokio::test]
async fn refresh_token_header_rotates_refresh_cookie_only() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/expressions/e1");
            then.status(200)
                .header("Refresh-Token", "ref2")
                .json_body(json!({
                    "expression": { "id": "e1", "status": "completed", "result": 2.0 }
                }));
        })
        .await;

    let response = send(
        app(&server),
        request(Method::GET, "/expressions/e1", Some(SESSION), None),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert_eq!(cookie_value(&cookies, "refresh_token"), Some("ref2"));
    assert_eq!(cookie_value(&cookies, "access_token"), None);
}

#[tokio::test]
async fn credentialed_operations_require_refresh_token() {
    let server = MockServer::start_async().await;
    let upstream = server
        .mock_async(|when, then| {
            when.path_contains("/api/v1/");
            then.status(200).json_body(json!({}));
        })
        .await;

    let calls = [
        (Method::GET, "/authorize", None),
        (
            Method::POST,
            "/calculate",
            Some(json!({ "expression": "2*3" })),
        ),
        (Method::GET, "/expressions?limit=5", None),
        (Method::GET, "/expressions/e1", None),
    ];

    for (method, path, body) in calls {
        for cookie in [None, Some("access_token=acc"), Some("access_token=acc; refresh_token=")] {
            let response = send(
                app(&server),
                request(method.clone(), path, cookie, body.clone()),
            )
            .await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{} {}", method, path);
            assert!(set_cookies(&response).is_empty());
        }
    }

    assert_eq!(upstream.hits_async().await, 0);
}

#[tokio::test]
async fn upstream_failure_status_is_forwarded_without_cookie_changes() {
    let server = MockServer::start_async().await;
    let upstream = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/calculate");
            then.status(422)
                .header("Access-Token", "should-not-apply")
                .body("expression is invalid");
        })
        .await;

    let response = send(
        app(&server),
        request(
            Method::POST,
            "/calculate",
            Some(SESSION),
            Some(json!({ "expression": "1+" })),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(set_cookies(&response).is_empty());
    let body = json_body(response).await;
    assert!(!body.to_string().contains("expression is invalid"));
    upstream.assert_async().await;
}

#[tokio::test]
async fn login_sets_both_cookies_from_body() {
    let server = MockServer::start_async().await;
    let upstream = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/login")
                .json_body(json!({ "login": "alice", "password": "secret" }));
            then.status(200)
                .header("Access-Token", "from-header")
                .json_body(json!({ "access_token": "a1", "refresh_token": "r1" }));
        })
        .await;

    let response = send(
        app(&server),
        request(
            Method::POST,
            "/login",
            None,
            Some(json!({ "login": "alice", "password": "secret" })),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cookies = set_cookies(&response);
    assert_eq!(cookie_value(&cookies, "access_token"), Some("a1"));
    assert_eq!(cookie_value(&cookies, "refresh_token"), Some("r1"));
    assert!(cookies.iter().all(|c| c.contains("HttpOnly")));
    upstream.assert_async().await;
}

#[tokio::test]
async fn login_with_undecodable_body_is_bad_gateway() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/login");
            then.status(200).body("ok");
        })
        .await;

    let response = send(
        app(&server),
        request(
            Method::POST,
            "/login",
            None,
            Some(json!({ "login": "alice", "password": "secret" })),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(set_cookies(&response).is_empty());
}

#[tokio::test]
async fn invalid_bodies_never_reach_upstream() {
    let server = MockServer::start_async().await;
    let upstream = server
        .mock_async(|when, then| {
            when.path_contains("/api/v1/");
            then.status(200).json_body(json!({ "id": "x" }));
        })
        .await;

    let cases = [
        ("/login", json!({ "login": "alice" })),
        ("/register", json!({ "password": "secret" })),
        ("/calculate", json!({ "expression": 42 })),
    ];
    for (path, body) in cases {
        let response = send(
            app(&server),
            request(Method::POST, path, Some(SESSION), Some(body)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", path);
    }

    let response = send(
        app(&server),
        request(Method::GET, "/expressions?limit=many", Some(SESSION), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(upstream.hits_async().await, 0);
}

#[tokio::test]
async fn register_returns_no_content() {
    let server = MockServer::start_async().await;
    let upstream = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/register")
                .json_body(json!({ "login": "bob", "password": "pw" }));
            then.status(201);
        })
        .await;

    let response = send(
        app(&server),
        request(
            Method::POST,
            "/register",
            None,
            Some(json!({ "login": "bob", "password": "pw" })),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(set_cookies(&response).is_empty());
    upstream.assert_async().await;
}

#[tokio::test]
async fn register_conflict_is_passed_through() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/register");
            then.status(409);
        })
        .await;

    let response = send(
        app(&server),
        request(
            Method::POST,
            "/register",
            None,
            Some(json!({ "login": "bob", "password": "pw" })),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn authorize_returns_user_and_ignores_rotation_headers() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/authorize")
                .header("authorization", "Bearer acc")
                .header("refresh-token", "ref");
            then.status(200)
                .header("Access-Token", "rotated")
                .json_body(json!({ "user_id": "u-1", "username": "alice", "role": "admin" }));
        })
        .await;

    let response = send(
        app(&server),
        request(Method::GET, "/authorize", Some(SESSION), None),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookies(&response).is_empty());
    let body = json_body(response).await;
    assert_eq!(body, json!({ "user_id": "u-1", "username": "alice" }));
    let user: AuthorizeResponse = serde_json::from_value(body).unwrap();
    assert_eq!(user.user_id, "u-1");
    assert_eq!(user.username, "alice");
}

#[tokio::test]
async fn list_expressions_forwards_supplied_query_params() {
    let server = MockServer::start_async().await;
    let both = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/expressions")
                .query_param("cursor", "c1")
                .query_param("limit", "5");
            then.status(200)
                .header("Access-Token", "a2")
                .header("Refresh-Token", "r2")
                .json_body(json!({
                    "expressions": [
                        { "id": "e1", "status": "pending", "result": 0 },
                        { "id": "e2", "status": "failed", "result": 0 }
                    ]
                }));
        })
        .await;

    let response = send(
        app(&server),
        request(
            Method::GET,
            "/expressions?cursor=c1&limit=5",
            Some(SESSION),
            None,
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert_eq!(cookie_value(&cookies, "access_token"), Some("a2"));
    assert_eq!(cookie_value(&cookies, "refresh_token"), Some("r2"));
    let body: ExpressionsResponse = serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(body.expressions.len(), 2);
    assert_eq!(body.expressions[1].status, ExpressionStatus::Failed);
    both.assert_async().await;
}

#[tokio::test]
async fn expression_id_is_sent_as_a_single_segment() {
    let server = MockServer::start_async().await;
    let encoded = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/expressions/a%2Fb");
            then.status(200).json_body(json!({
                "expression": { "id": "a/b", "status": "pending", "result": 0 }
            }));
        })
        .await;
    let split = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/expressions/a/b");
            then.status(200).json_body(json!({ "expression": { "id": "split" } }));
        })
        .await;

    let response = send(
        app(&server),
        request(Method::GET, "/expressions/a%2Fb", Some(SESSION), None),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: ExpressionResponse = serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(body.expression.id, "a/b");
    encoded.assert_async().await;
    assert_eq!(split.hits_async().await, 0);
}

#[tokio::test]
async fn expression_id_cannot_reach_other_upstream_routes() {
    let server = MockServer::start_async().await;
    let authorize = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/authorize");
            then.status(200)
                .json_body(json!({ "user_id": "u-1", "username": "alice" }));
        })
        .await;
    let bare = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/expressions/e1");
            then.status(200).json_body(json!({ "expression": { "id": "e1" } }));
        })
        .await;

    for id in ["..%2F..%2Fv1%2Fauthorize", "e1%3Flimit=1", "e1%23frag"] {
        let response = send(
            app(&server),
            request(Method::GET, &format!("/expressions/{}", id), Some(SESSION), None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "id {}", id);
        assert!(set_cookies(&response).is_empty());
    }

    let response = send(
        app(&server),
        request(Method::GET, "/expressions/%2E%2E", Some(SESSION), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(authorize.hits_async().await, 0);
    assert_eq!(bare.hits_async().await, 0);
}

#[tokio::test]
async fn get_expression_is_idempotent_without_rotation() {
    let server = MockServer::start_async().await;
    let upstream = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/expressions/e7");
            then.status(200).json_body(json!({
                "expression": { "id": "e7", "status": "completed", "result": 42.5 }
            }));
        })
        .await;

    let mut payloads = Vec::new();
    for _ in 0..2 {
        let response = send(
            app(&server),
            request(Method::GET, "/expressions/e7", Some(SESSION), None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookies(&response).is_empty());
        payloads.push(json_body(response).await);
    }

    assert_eq!(payloads[0], payloads[1]);
    let body: ExpressionResponse = serde_json::from_value(payloads.remove(0)).unwrap();
    assert_eq!(body.expression.result, 42.5);
    assert_eq!(upstream.hits_async().await, 2);
}

#[tokio::test]
async fn unreachable_upstream_is_bad_gateway() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let app = build_router(&config_for(BackendConfig {
        host: "127.0.0.1".into(),
        port,
        ..Default::default()
    }))
    .unwrap();

    let response = send(
        app,
        request(
            Method::POST,
            "/calculate",
            Some(SESSION),
            Some(json!({ "expression": "1+1" })),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(set_cookies(&response).is_empty());
}
