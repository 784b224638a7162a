//! HTTP-level tests: requests sent through the full router with `tower`'s
//! `oneshot`, asserting status codes, headers, and wire bodies.

mod common;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use common::test_app;

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Option<String>, Value) {
    let request = match body {
        Some(body) => Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => Request::builder().method(method).uri(uri).body(Body::empty()),
    }
    .expect("valid request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    (status, location, body)
}

async fn create_cart(app: &Router, customer_id: i32) -> i32 {
    let (status, _, body) = send(
        app,
        Method::POST,
        "/shopcarts",
        Some(json!({ "customer_id": customer_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    i32::try_from(body["id"].as_i64().expect("assigned id")).expect("i32 id")
}

#[tokio::test]
async fn test_index_describes_the_service() {
    let app = test_app().await;
    let (status, _, body) = send(&app, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], json!("shopcart-service"));
    assert_eq!(body["resources"]["shopcarts"], json!("/shopcarts"));
}

#[tokio::test]
async fn test_health_returns_ok() {
    let app = test_app().await;
    let (status, _, _) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_create_shopcart_returns_201_and_location() {
    let app = test_app().await;
    let (status, location, body) = send(
        &app,
        Method::POST,
        "/shopcarts",
        Some(json!({ "customer_id": 42 })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["customer_id"], json!(42));
    assert_eq!(body["items"], json!([]));

    let id = body["id"].as_i64().expect("assigned id");
    assert_eq!(location.as_deref(), Some(format!("/shopcarts/{id}").as_str()));

    let (status, _, fetched) =
        send(&app, Method::GET, &format!("/shopcarts/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, body);
}

#[tokio::test]
async fn test_create_shopcart_without_customer_id_is_400() {
    let app = test_app().await;
    let (status, _, body) = send(&app, Method::POST, "/shopcarts", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("missing required field: customer_id"));
}

#[tokio::test]
async fn test_get_unknown_shopcart_is_404_with_error_body() {
    let app = test_app().await;
    let (status, _, body) = send(&app, Method::GET, "/shopcarts/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("shopcart 999 could not be found"));
}

#[tokio::test]
async fn test_list_shopcarts_with_customer_filter() {
    let app = test_app().await;
    create_cart(&app, 1).await;
    create_cart(&app, 2).await;

    let (status, _, body) = send(&app, Method::GET, "/shopcarts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().expect("array").len(), 2);

    let (status, _, body) =
        send(&app, Method::GET, "/shopcarts?customer_id=2", None).await;
    assert_eq!(status, StatusCode::OK);
    let carts = body.as_array().expect("array");
    assert_eq!(carts.len(), 1);
    assert_eq!(carts[0]["customer_id"], json!(2));
}

#[tokio::test]
async fn test_delete_shopcart_is_204_and_idempotent() {
    let app = test_app().await;
    let id = create_cart(&app, 42).await;

    let (status, _, _) =
        send(&app, Method::DELETE, &format!("/shopcarts/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, _) = send(&app, Method::GET, &format!("/shopcarts/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Deleting again still succeeds.
    let (status, _, _) =
        send(&app, Method::DELETE, &format!("/shopcarts/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_add_item_merges_over_http() {
    let app = test_app().await;
    let id = create_cart(&app, 42).await;
    let uri = format!("/shopcarts/{id}/items");

    let (status, location, first) = send(
        &app,
        Method::POST,
        &uri,
        Some(json!({ "name": "mouse", "product_id": 5, "count": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let item_id = first["id"].as_i64().expect("assigned id");
    assert_eq!(
        location.as_deref(),
        Some(format!("/shopcarts/{id}/items/{item_id}").as_str())
    );

    let (status, _, merged) = send(
        &app,
        Method::POST,
        &uri,
        Some(json!({ "name": "mouse", "product_id": 5, "count": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(merged["id"], first["id"]);
    assert_eq!(merged["count"], json!(5));

    let (status, _, items) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(items.as_array().expect("array").len(), 1);
}

#[tokio::test]
async fn test_add_item_with_invalid_count_is_400() {
    let app = test_app().await;
    let id = create_cart(&app, 42).await;

    let (status, _, body) = send(
        &app,
        Method::POST,
        &format!("/shopcarts/{id}/items"),
        Some(json!({ "name": "mouse", "product_id": 5, "count": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("field count must be a positive integer"));
}

#[tokio::test]
async fn test_item_routes_enforce_ownership() {
    let app = test_app().await;
    let cart_a = create_cart(&app, 1).await;
    let cart_b = create_cart(&app, 2).await;

    let (_, _, item) = send(
        &app,
        Method::POST,
        &format!("/shopcarts/{cart_a}/items"),
        Some(json!({ "name": "mouse", "product_id": 5, "count": 1 })),
    )
    .await;
    let item_id = item["id"].as_i64().expect("assigned id");

    let (status, _, _) = send(
        &app,
        Method::GET,
        &format!("/shopcarts/{cart_b}/items/{item_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(
        &app,
        Method::GET,
        &format!("/shopcarts/{cart_a}/items/{item_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_update_item_and_delete_item() {
    let app = test_app().await;
    let id = create_cart(&app, 42).await;

    let (_, _, item) = send(
        &app,
        Method::POST,
        &format!("/shopcarts/{id}/items"),
        Some(json!({ "name": "mouse", "product_id": 5, "count": 1 })),
    )
    .await;
    let item_id = item["id"].as_i64().expect("assigned id");
    let item_uri = format!("/shopcarts/{id}/items/{item_id}");

    let (status, _, updated) = send(
        &app,
        Method::PUT,
        &item_uri,
        Some(json!({ "name": "wireless mouse", "product_id": 5, "count": 4, "price": 19.99 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], json!("wireless mouse"));
    assert_eq!(updated["count"], json!(4));
    assert_eq!(updated["price"], json!(19.99));

    let (status, _, _) = send(&app, Method::DELETE, &item_uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, _) = send(&app, Method::GET, &item_uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_shopcart_replaces_items() {
    let app = test_app().await;
    let id = create_cart(&app, 42).await;
    send(
        &app,
        Method::POST,
        &format!("/shopcarts/{id}/items"),
        Some(json!({ "name": "mouse", "product_id": 5, "count": 2 })),
    )
    .await;

    let (status, _, body) = send(
        &app,
        Method::PUT,
        &format!("/shopcarts/{id}"),
        Some(json!({
            "customer_id": 42,
            "items": [{ "name": "desk", "product_id": 7, "count": 1 }],
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().expect("array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], json!("desk"));
}
