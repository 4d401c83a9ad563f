//! In-process tests of the HTTP binding.
//!
//! Requests go straight into the router with `tower::ServiceExt::oneshot`,
//! so no port is bound.

use anyhow::bail;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use lookup_plugin::{FunctionRegistry, Value};
use lookup_rpc::build_router;
use reqwest::Url;
use tower::ServiceExt;

/// A registry with one function of each kind plus a failing one.
fn test_registry() -> FunctionRegistry {
    let registry = FunctionRegistry::new();
    registry
        .register_lookup_key("my_lk", |ctx, key| {
            if key == "host" {
                return Ok(ctx.to_value("example.com")?);
            }
            Ok(Value::Null)
        })
        .unwrap();
    registry
        .register_data_dig("my_dd", |_ctx, key| {
            if key == [Value::from("config"), Value::from("path")] {
                return Ok(Value::from("/a/b"));
            }
            Ok(Value::Null)
        })
        .unwrap();
    registry
        .register_data_hash("my_dh", |_ctx| {
            Ok([("host", Value::from("example.com"))].into_iter().collect())
        })
        .unwrap();
    registry
        .register_data_hash("options", |ctx| {
            Ok(ctx.option("map_to_deliver").cloned().unwrap_or_default())
        })
        .unwrap();
    registry
        .register_data_hash("goodbye", |_ctx| bail!("goodbye"))
        .unwrap();
    registry
        .register_data_hash("panics", |_ctx| panic!("goodbye"))
        .unwrap();
    registry
}

fn router() -> Router {
    build_router(&test_registry()).unwrap().0
}

/// Path plus a properly escaped query string.
fn uri(path: &str, params: &[(&str, &str)]) -> String {
    let url = Url::parse_with_params(&format!("http://localhost{}", path), params).unwrap();
    match url.query() {
        Some(query) if !query.is_empty() => format!("{}?{}", url.path(), query),
        _ => url.path().to_string(),
    }
}

async fn send(method: Method, uri: &str) -> (StatusCode, Option<String>, String) {
    let response = router()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

async fn get(uri: &str) -> (StatusCode, String) {
    let (status, _, body) = send(Method::GET, uri).await;
    (status, body)
}

#[tokio::test]
async fn test_lookup_key_found_and_missing() {
    let (status, content_type, body) =
        send(Method::GET, &uri("/lookup_key/my_lk", &[("key", "host")])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert_eq!(body, r#""example.com""#);

    let (status, body) = get(&uri("/lookup_key/my_lk", &[("key", "port")])).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "404 value not found");

    let (status, _) = get("/lookup_key/my_lk").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_data_dig() {
    let (status, body) = get(&uri("/data_dig/my_dd", &[("key", r#"["config","path"]"#)])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#""/a/b""#);

    let (status, _) = get(&uri("/data_dig/my_dd", &[("key", r#"["config","path""#)])).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, _) = get(&uri("/data_dig/my_dd", &[("key", r#"{"config":"path"}"#)])).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_data_hash_without_parameters() {
    let (status, body) = get("/data_hash/my_dh").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"host":"example.com"}"#);
}

#[tokio::test]
async fn test_data_hash_options() {
    let options = r#"{"map_to_deliver":{"host":"example.com"}}"#;
    let (status, body) = get(&uri("/data_hash/options", &[("options", options)])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"host":"example.com"}"#);

    let (status, _) = get(&uri("/data_hash/options", &[("options", r#"{"other":1}"#)])).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let malformed = r#"{"map_to_deliver":{"host":"example.com"}"#;
    let (status, _) = get(&uri("/data_hash/options", &[("options", malformed)])).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_faults_become_internal_errors() {
    let (status, content_type, body) = send(Method::GET, "/data_hash/goodbye").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(content_type.as_deref(), Some("text/plain; charset=utf-8"));
    assert_eq!(body, "goodbye");

    let (status, body) = get("/data_hash/panics").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "goodbye");

    // The router keeps serving after a fault.
    let (status, _) = get("/data_hash/my_dh").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_post_is_rejected_for_every_kind() {
    for path in ["/lookup_key/my_lk", "/data_dig/my_dd", "/data_hash/my_dh"] {
        let (status, _, _) = send(Method::POST, path).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{}", path);
    }
    let (status, _, _) = send(Method::DELETE, "/data_hash/my_dh").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_unknown_routes() {
    for path in ["/lookup_key/nope", "/data_hash/my_lk", "/", "/lookup_key"] {
        let (status, body) = get(path).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", path);
        assert_eq!(body, "404 page not found");
    }
}

#[tokio::test]
async fn test_rich_values_on_the_wire() {
    let registry = FunctionRegistry::new();
    registry
        .register_data_hash("rich", |_ctx| {
            Ok([
                ("blob", Value::binary([1u8, 2, 3])),
                ("secret", Value::sensitive(Value::from("hunter2"))),
            ]
            .into_iter()
            .collect())
        })
        .unwrap();
    let (app, _) = build_router(&registry).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/data_hash/rich")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(
        Value::from_json(&body).unwrap(),
        [
            ("blob", Value::binary([1u8, 2, 3])),
            ("secret", Value::sensitive(Value::from("hunter2"))),
        ]
        .into_iter()
        .collect::<Value>()
    );
    assert_eq!(
        std::str::from_utf8(&body).unwrap(),
        concat!(
            r#"{"blob":{"__ptype":"Binary","__pvalue":"AQID"},"#,
            r#""secret":{"__ptype":"Sensitive","__pvalue":"hunter2"}}"#
        )
    );
}
