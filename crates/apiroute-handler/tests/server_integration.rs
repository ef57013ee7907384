//! End-to-end tests through axum.
//!
//! These build an `ApiApp`, convert it with `into_axum_router()`, and send
//! requests through `TestClient`: HTTP request -> axum routing -> adapter ->
//! handler -> response bytes.

use std::sync::Arc;
use std::time::Duration;

use http::{Method, StatusCode};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use apiroute_core::{ErrorRecord, Settings};
use apiroute_handler::dependencies::{ResolvedDependencies, SubResponse, Values};
use apiroute_handler::{ApiApp, ApiRoute, BodyField, Handler, HandlerDescriptor};
use apiroute_http::{BackgroundTasks, ResponseClass, ResponseEnvelope};
use apiroute_test::{StaticResolver, TestClient};

fn client(resolver: StaticResolver, routes: Vec<ApiRoute>) -> TestClient {
    let app = routes
        .into_iter()
        .fold(ApiApp::new(Settings::default(), Arc::new(resolver)), ApiApp::route);
    TestClient::from_app(app).unwrap()
}

fn echo_body() -> HandlerDescriptor {
    HandlerDescriptor::builder(Handler::from_async(|values: Values| async move {
        Ok(values.get("item").cloned().unwrap_or(Value::Null))
    }))
    .body_field(BodyField::json("item"))
    .build()
}

#[tokio::test]
async fn test_json_echo_over_http() {
    let client = client(
        StaticResolver::body_as("item"),
        vec![ApiRoute::new("/items", echo_body()).methods([Method::POST])],
    );

    let payload = json!({"name": "widget", "qty": 3});
    let response = client.post_json("/items", &payload).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("application/json"));
    assert_eq!(response.json::<Value>().unwrap(), payload);
}

#[tokio::test]
async fn test_malformed_body_over_http() {
    let client = client(
        StaticResolver::body_as("item"),
        vec![ApiRoute::new("/items", echo_body()).methods([Method::POST])],
    );

    let response = client
        .post_raw("/items", "{\"unterminated\": ", "application/json")
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>().unwrap(),
        json!({"detail": "There was an error parsing the body"})
    );
}

#[tokio::test]
async fn test_validation_errors_over_http() {
    let resolver = StaticResolver::with_errors(vec![ErrorRecord::new(
        ["query", "limit"],
        "value is not a valid integer",
        "type_error.integer",
    )]);
    let client = client(resolver, vec![ApiRoute::new("/items", echo_body())]);

    let response = client.get("/items?limit=ten").await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        response.json::<Value>().unwrap(),
        json!({"detail": [{
            "loc": ["query", "limit"],
            "msg": "value is not a valid integer",
            "type": "type_error.integer"
        }]})
    );
}

#[tokio::test]
async fn test_handler_failure_is_500_without_internals() {
    let handler = Handler::from_blocking(|_| -> apiroute_core::ApiResult<Value> {
        Err(apiroute_core::ApiError::Handler("database password leaked".into()))
    });
    let client = client(
        StaticResolver::empty(),
        vec![ApiRoute::new("/fail", HandlerDescriptor::builder(handler).build())],
    );

    let response = client.get("/fail").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!response.text().contains("password"));
}

#[tokio::test]
async fn test_envelope_over_http() {
    let handler = Handler::from_async(|_| async {
        ResponseEnvelope::new(json!({"created": true}))
            .with_status(StatusCode::CREATED)
            .with_headers([("Location", "/items/1")])
    });
    let client = client(
        StaticResolver::empty(),
        vec![ApiRoute::new("/items", HandlerDescriptor::builder(handler).build()).methods([Method::POST])],
    );

    let response = client.post_json("/items", &json!({})).await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.header("location"), Some("/items/1"));
    assert_eq!(response.header("content-length"), Some("16"));
    assert_eq!(response.text(), r#"{"created":true}"#);
}

#[tokio::test]
async fn test_plain_text_route_with_sub_response() {
    let resolver = StaticResolver::from_fn(|_, _, _, _| {
        let mut sub = SubResponse::new();
        sub.set_header("x-request-id", "r-1")?;
        sub.status_code = Some(StatusCode::ACCEPTED);
        Ok(ResolvedDependencies {
            sub_response: sub,
            ..ResolvedDependencies::default()
        })
    });
    let descriptor = HandlerDescriptor::builder(Handler::from_blocking(|_| Ok(json!("queued"))))
        .response_class(ResponseClass::PlainText)
        .build();
    let client = client(resolver, vec![ApiRoute::new("/jobs", descriptor)]);

    let response = client.get("/jobs").await;
    assert_eq!(response.status, StatusCode::ACCEPTED);
    assert_eq!(response.header("x-request-id"), Some("r-1"));
    assert_eq!(response.header("content-type"), Some("text/plain; charset=utf-8"));
    assert_eq!(response.text(), "queued");
}

#[tokio::test]
async fn test_background_task_runs_after_response() {
    let (tx, mut rx) = mpsc::unbounded_channel::<&'static str>();
    let resolver = StaticResolver::from_fn(move |_, _, _, _| {
        let tx = tx.clone();
        let mut tasks = BackgroundTasks::new();
        tasks.add_task(move || async move {
            let _ = tx.send("sent welcome email");
            Ok(())
        });
        Ok(ResolvedDependencies {
            background_tasks: Some(tasks),
            ..ResolvedDependencies::default()
        })
    });
    let descriptor = HandlerDescriptor::builder(Handler::from_async(|_| async { Ok(json!({"ok": true})) }))
        .build();
    let client = client(resolver, vec![ApiRoute::new("/signup", descriptor)]);

    let response = client.get("/signup").await;
    assert_eq!(response.text(), r#"{"ok":true}"#);

    let ran = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("background task should run once the body is consumed");
    assert_eq!(ran, Some("sent welcome email"));
}

#[tokio::test]
async fn test_path_params_are_forwarded() {
    let resolver = StaticResolver::from_fn(|request, _, _, _| {
        let values: Values = request
            .path_params()
            .iter()
            .map(|(k, v)| (k.clone(), json!(v)))
            .collect();
        Ok(ResolvedDependencies::with_values(values))
    });
    let descriptor = HandlerDescriptor::builder(Handler::from_async(|values: Values| async move {
        Ok(json!({"user": values["user_id"], "post": values["post_id"]}))
    }))
    .build();
    let client = client(resolver, vec![ApiRoute::new("/users/{user_id}/posts/{post_id}", descriptor)]);

    let response = client.get("/users/42/posts/hello%20world").await;
    assert_eq!(
        response.json::<Value>().unwrap(),
        json!({"user": "42", "post": "hello world"})
    );
}
