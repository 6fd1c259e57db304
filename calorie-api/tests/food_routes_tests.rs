//! Router tests for the food collection handler.
//!
//! Requests go through the full middleware stack via `oneshot`, against an
//! in-memory store or a connector that never connects.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use calorie_api::{create_api_router, ApiConfig};
use calorie_test_utils::{
    fruit_store, memory_handle, unreachable_handle, FailingConnector, FlakyConnector, FoodId,
    FoodItem,
    FoodStore, InMemoryFoodStore, NewFoodItem, StoreConnector, StoreHandle, StoreResult,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`

// ============================================================================
// HELPERS
// ============================================================================

fn app(store: Arc<StoreHandle>) -> Router {
    create_api_router(&ApiConfig::default(), store)
}

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

async fn send(app: Router, request: Request<Body>) -> TestResponse {
    let response = app.oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collects")
        .to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    TestResponse {
        status,
        headers,
        body,
    }
}

async fn get(app: Router, uri: &str) -> TestResponse {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("valid request");
    send(app, request).await
}

async fn send_json(app: Router, method: Method, uri: &str, body: &str) -> TestResponse {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("valid request");
    send(app, request).await
}

fn names(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|i| i["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn ids(body: &Value) -> Vec<i64> {
    body["data"]
        .as_array()
        .map(|items| items.iter().filter_map(|i| i["id"].as_i64()).collect())
        .unwrap_or_default()
}

fn assert_cors(headers: &HeaderMap) {
    assert_eq!(
        headers
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
    assert!(headers.contains_key(header::ACCESS_CONTROL_ALLOW_HEADERS));
    assert!(headers.contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
}

// ============================================================================
// LIST
// ============================================================================

#[tokio::test]
async fn test_list_from_database_ordered_by_id() {
    let res = get(app(memory_handle(fruit_store())), "/foods").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["success"], true);
    assert_eq!(res.body["source"], "database");
    assert_eq!(ids(&res.body), vec![1, 2, 3]);
    assert_cors(&res.headers);
}

#[tokio::test]
async fn test_list_falls_back_to_catalog() {
    let res = get(app(unreachable_handle()), "/foods").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["success"], true);
    assert_eq!(res.body["source"], "fallback");
    assert_eq!(ids(&res.body), (1..=10).collect::<Vec<i64>>());
}

// ============================================================================
// SEARCH
// ============================================================================

#[tokio::test]
async fn test_search_is_case_insensitive_substring() {
    let res = get(app(memory_handle(fruit_store())), "/foods/search?name=APP").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["source"], "database");
    assert_eq!(res.body["query"], "APP");
    assert_eq!(names(&res.body), vec!["Apple", "Pineapple"]);
}

#[tokio::test]
async fn test_search_without_matches_is_empty_success() {
    let res = get(app(memory_handle(fruit_store())), "/foods/search?name=kale").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["success"], true);
    assert_eq!(res.body["data"], json!([]));
}

#[tokio::test]
async fn test_search_requires_name() {
    for uri in [
        "/foods/search",
        "/foods/search?name=",
        "/foods/search?name=%20%20",
        "/foods/search?other=apple",
    ] {
        let res = get(app(memory_handle(fruit_store())), uri).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(res.body["success"], false);
        assert!(res.body["error"].is_string());
        assert_cors(&res.headers);
    }
}

#[tokio::test]
async fn test_search_treats_wildcards_literally() {
    let store = Arc::new(InMemoryFoodStore::with_items([
        calorie_test_utils::food(1, "100% Juice", 45),
        calorie_test_utils::food(2, "Juice", 40),
    ]));
    let res = get(app(memory_handle(store)), "/foods/search?name=%25").await;
    assert_eq!(names(&res.body), vec!["100% Juice"]);
}

#[tokio::test]
async fn test_search_falls_back_to_catalog() {
    let res = get(app(unreachable_handle()), "/foods/search?name=ban").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["source"], "fallback");
    assert_eq!(res.body["query"], "ban");
    assert_eq!(names(&res.body), vec!["Banana"]);
}

// ============================================================================
// GET BY ID
// ============================================================================

#[tokio::test]
async fn test_get_by_id() {
    let res = get(app(memory_handle(fruit_store())), "/foods/2").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["name"], "Pineapple");
    assert_eq!(res.body["source"], "database");
}

#[tokio::test]
async fn test_get_absent_id_with_reachable_store_is_404() {
    let res = get(app(memory_handle(fruit_store())), "/foods/7").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["success"], false);
    assert_eq!(res.body["source"], "database");
    assert_cors(&res.headers);
}

#[tokio::test]
async fn test_get_uses_fallback_when_unreachable() {
    let res = get(app(unreachable_handle()), "/foods/2").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["name"], "Banana");
    assert_eq!(res.body["source"], "fallback");

    let res = get(app(unreachable_handle()), "/foods/999").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["source"], "fallback");
}

// ============================================================================
// CREATE
// ============================================================================

#[tokio::test]
async fn test_create_assigns_next_id() {
    let handle = memory_handle(fruit_store());
    let res = send_json(
        app(handle.clone()),
        Method::POST,
        "/foods",
        r#"{"name": "Mango", "calories": 60}"#,
    )
    .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["source"], "database");
    assert_eq!(res.body["data"]["id"], 4);
    assert_eq!(res.body["data"]["name"], "Mango");
    assert_eq!(res.body["data"]["calories"], 60);

    let res = get(app(handle), "/foods/4").await;
    assert_eq!(res.body["data"]["name"], "Mango");
}

#[tokio::test]
async fn test_repeated_create_yields_distinct_rows() {
    let store = fruit_store();
    let handle = memory_handle(store.clone());
    let body = r#"{"name": "Mango", "calories": 60}"#;
    let a = send_json(app(handle.clone()), Method::POST, "/foods", body).await;
    let b = send_json(app(handle), Method::POST, "/foods", body).await;
    assert_ne!(a.body["data"]["id"], b.body["data"]["id"]);
    assert_eq!(store.len(), 5);
}

#[tokio::test]
async fn test_create_rejects_missing_fields() {
    for body in [
        r#"{"name": "Mango"}"#,
        r#"{"calories": 60}"#,
        r#"{"name": "", "calories": 60}"#,
        r#"{"name": "Mango", "calories": -5}"#,
        r#"{not json"#,
        "",
    ] {
        let res = send_json(
            app(memory_handle(fruit_store())),
            Method::POST,
            "/foods",
            body,
        )
        .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST, "{}", body);
        assert_eq!(res.body["success"], false);
    }
}

#[tokio::test]
async fn test_create_in_fallback_mode_is_not_persisted() {
    let handle = unreachable_handle();
    let res = send_json(
        app(handle.clone()),
        Method::POST,
        "/foods",
        r#"{"name": "Mango", "calories": 60}"#,
    )
    .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["success"], true);
    assert_eq!(res.body["source"], "fallback");
    assert_eq!(res.body["data"]["id"], 11);
    assert!(res.body["message"]
        .as_str()
        .unwrap_or_default()
        .contains("not persisted"));

    let res = get(app(handle), "/foods").await;
    assert_eq!(ids(&res.body).len(), 10);
}

// ============================================================================
// UPDATE
// ============================================================================

#[tokio::test]
async fn test_update_replaces_record() {
    let handle = memory_handle(fruit_store());
    let res = send_json(
        app(handle.clone()),
        Method::PUT,
        "/foods/1",
        r#"{"name": "Green Apple", "calories": 48, "protein": 0.4}"#,
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["id"], 1);
    assert_eq!(res.body["data"]["name"], "Green Apple");
    assert_eq!(res.body["data"]["protein"], 0.4);

    let res = send_json(
        app(handle),
        Method::PUT,
        "/foods/42",
        r#"{"name": "Ghost", "calories": 1}"#,
    )
    .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["source"], "database");
}

#[tokio::test]
async fn test_update_when_unreachable_is_503() {
    let res = send_json(
        app(unreachable_handle()),
        Method::PUT,
        "/foods/1",
        r#"{"name": "Green Apple", "calories": 48}"#,
    )
    .await;
    assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.body["success"], false);
    assert_eq!(res.body["source"], "fallback");
    assert_cors(&res.headers);
}

// ============================================================================
// ROUTING AND CORS
// ============================================================================

#[tokio::test]
async fn test_preflight_short_circuits() {
    for uri in ["/foods", "/foods/search", "/nowhere"] {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri(uri)
            .body(Body::empty())
            .expect("valid request");
        let res = send(app(unreachable_handle()), request).await;
        assert_eq!(res.status, StatusCode::OK, "{}", uri);
        assert_eq!(res.body, Value::Null);
        assert_cors(&res.headers);
        assert_eq!(
            res.headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
    }
}

#[tokio::test]
async fn test_unknown_routes_list_supported_routes() {
    let cases = [
        (Method::GET, "/drinks"),
        (Method::GET, "/foods/abc"),
        (Method::GET, "/foods/1/extra"),
        (Method::DELETE, "/foods/1"),
        (Method::PATCH, "/foods"),
    ];
    for (method, uri) in cases {
        let request = Request::builder()
            .method(method.clone())
            .uri(uri)
            .body(Body::empty())
            .expect("valid request");
        let res = send(app(memory_handle(fruit_store())), request).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND, "{} {}", method, uri);
        assert_eq!(res.body["success"], false);
        assert!(res.body["message"]
            .as_str()
            .unwrap_or_default()
            .contains("/foods/search?name="));
        assert_cors(&res.headers);
        assert_eq!(
            res.headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
    }
}

#[tokio::test]
async fn test_undecodable_id_segment_is_route_not_found() {
    for method in [Method::GET, Method::PUT] {
        let request = Request::builder()
            .method(method.clone())
            .uri("/foods/%FF")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name": "Kiwi", "calories": 61}"#))
            .expect("valid request");
        let res = send(app(memory_handle(fruit_store())), request).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND, "{}", method);
        assert_eq!(res.body["success"], false);
        assert_eq!(res.body["error"], "Route not found");
        assert_eq!(
            res.headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
        assert_cors(&res.headers);
    }
}

#[tokio::test]
async fn test_oversized_body_is_bad_input_envelope() {
    let store = fruit_store();
    let name = "x".repeat(3 * 1024 * 1024);
    let body = format!(r#"{{"name": "{}", "calories": 10}}"#, name);
    let res = send_json(app(memory_handle(store.clone())), Method::POST, "/foods", &body).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["success"], false);
    assert!(res.body["error"].is_string());
    assert_cors(&res.headers);
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn test_custom_prefix() {
    let config = ApiConfig {
        route_prefix: "/api/foods".to_string(),
        ..ApiConfig::default()
    };
    let router = create_api_router(&config, memory_handle(fruit_store()));
    let res = get(router.clone(), "/api/foods/search?name=ban").await;
    assert_eq!(names(&res.body), vec!["Banana"]);

    let res = get(router, "/foods").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_configured_origin_is_echoed() {
    let config = ApiConfig {
        cors_origins: vec!["https://app.example".to_string()],
        ..ApiConfig::default()
    };
    let request = Request::builder()
        .uri("/foods")
        .header(header::ORIGIN, "https://app.example")
        .body(Body::empty())
        .expect("valid request");
    let res = send(create_api_router(&config, memory_handle(fruit_store())), request).await;
    assert_eq!(
        res.headers
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("https://app.example")
    );
}

#[tokio::test]
async fn test_unlisted_origin_gets_no_allow_origin() {
    let config = ApiConfig {
        cors_origins: vec!["https://app.example".to_string()],
        ..ApiConfig::default()
    };
    let request = Request::builder()
        .uri("/foods")
        .header(header::ORIGIN, "https://evil.example")
        .body(Body::empty())
        .expect("valid request");
    let res = send(create_api_router(&config, memory_handle(fruit_store())), request).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(!res.headers.contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    assert!(res.headers.contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
}

// ============================================================================
// FAILURE HANDLING
// ============================================================================

struct PanickingStore;

#[async_trait]
impl FoodStore for PanickingStore {
    async fn list_all(&self) -> StoreResult<Vec<FoodItem>> {
        panic!("relation food_items: unexpected null in column calories");
    }
    async fn get_by_id(&self, _id: FoodId) -> StoreResult<Option<FoodItem>> {
        Ok(None)
    }
    async fn search_by_name(&self, _term: &str) -> StoreResult<Vec<FoodItem>> {
        Ok(Vec::new())
    }
    async fn create(&self, _item: &NewFoodItem) -> StoreResult<FoodItem> {
        panic!("unreachable in these tests");
    }
    async fn update(&self, _id: FoodId, _item: &NewFoodItem) -> StoreResult<Option<FoodItem>> {
        Ok(None)
    }
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

struct PanickingConnector;

#[async_trait]
impl StoreConnector for PanickingConnector {
    async fn connect(&self) -> StoreResult<Arc<dyn FoodStore>> {
        Ok(Arc::new(PanickingStore))
    }
}

#[tokio::test]
async fn test_panic_becomes_generic_500() {
    let handle = Arc::new(StoreHandle::new(Arc::new(PanickingConnector)));
    let res = get(app(handle), "/foods").await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.body["success"], false);
    assert_eq!(res.body["error"], "Internal server error");
    assert!(res.body["details"].is_string());
    assert!(!res.body.to_string().contains("food_items"));
    assert_cors(&res.headers);
}

#[tokio::test]
async fn test_failed_connection_is_retried_next_request() {
    let connector = Arc::new(FlakyConnector::new(fruit_store(), 1));
    let handle = Arc::new(StoreHandle::new(connector.clone()));

    let first = get(app(handle.clone()), "/foods").await;
    assert_eq!(first.body["source"], "fallback");

    let second = get(app(handle), "/foods").await;
    assert_eq!(second.body["source"], "database");
    assert_eq!(ids(&second.body), vec![1, 2, 3]);
    assert_eq!(connector.attempts(), 2);
}

#[tokio::test]
async fn test_outage_burst_shares_one_connect_attempt() {
    let connector = Arc::new(FailingConnector::with_delay(Duration::from_millis(300)));
    let router = app(Arc::new(StoreHandle::new(connector.clone())));

    let start = Instant::now();
    let mut tasks = Vec::new();
    for _ in 0..6 {
        let router = router.clone();
        tasks.push(tokio::spawn(async move { get(router, "/foods").await }));
    }
    for task in tasks {
        let res = task.await.expect("task completes");
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["source"], "fallback");
    }

    assert_eq!(connector.attempts(), 1);
    // One connect timeout, not six in a row.
    assert!(start.elapsed() < Duration::from_millis(1200));
}

#[tokio::test]
async fn test_concurrent_creates_get_distinct_ids() {
    let store = fruit_store();
    let handle = memory_handle(store.clone());
    let router = app(handle);

    let mut tasks = Vec::new();
    for i in 0..8 {
        let router = router.clone();
        tasks.push(tokio::spawn(async move {
            let body = format!(r#"{{"name": "Item {}", "calories": {}}}"#, i, i * 10);
            send_json(router, Method::POST, "/foods", &body).await
        }));
    }

    let mut created = Vec::new();
    for task in tasks {
        let res = task.await.expect("task completes");
        assert_eq!(res.status, StatusCode::CREATED);
        created.push(res.body["data"]["id"].as_i64().unwrap_or_default());
    }
    created.sort_unstable();
    created.dedup();
    assert_eq!(created, (4..=11).collect::<Vec<i64>>());
}

// ============================================================================
// HEALTH
// ============================================================================

#[tokio::test]
async fn test_readiness_reflects_store() {
    let res = get(app(memory_handle(fruit_store())), "/health/ready").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "healthy");
    assert_eq!(res.body["details"]["database"]["connection"], "connected");

    let res = get(app(unreachable_handle()), "/health/ready").await;
    assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.body["status"], "degraded");
    assert_eq!(res.body["details"]["database"]["connection"], "failed");
}

#[tokio::test]
async fn test_ping() {
    let res = get(app(unreachable_handle()), "/health/ping").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, Value::String("pong".to_string()));
    assert_cors(&res.headers);
}
