//! HTTP route tests driven through `tower::ServiceExt::oneshot`.

#![allow(clippy::panic, clippy::indexing_slicing)]

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tokio_test::assert_ok;
use tower::ServiceExt;

use common::gateway;

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let request = assert_ok!(Request::builder().uri(uri).body(Body::empty()));
    let response = assert_ok!(app.oneshot(request).await);
    let status = response.status();
    let bytes = assert_ok!(axum::body::to_bytes(response.into_body(), usize::MAX).await);
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn health_reports_connected_sessions() {
    let gw = gateway().await;
    let (status, body) = get(gw.app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["connected_sessions"], 0);
    assert_eq!(body["bus_connected"], true);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn health_is_unavailable_while_the_bus_is_down() {
    let gw = gateway().await;
    gw.bus.set_connected(false);
    let (status, body) = get(gw.app.clone(), "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["bus_connected"], false);

    gw.bus.set_connected(true);
    let (status, _) = get(gw.app, "/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn ws_route_without_upgrade_headers_is_rejected() {
    let gw = gateway().await;
    let (status, _) = get(gw.app, "/ws?userId=u1&rouletteId=r1&operator=op").await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let gw = gateway().await;
    let (status, _) = get(gw.app, "/api/v1/pools").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[cfg(feature = "swagger-ui")]
#[tokio::test]
async fn openapi_document_lists_health() {
    let gw = gateway().await;
    let (status, body) = get(gw.app, "/api-docs/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/health"].is_object());
}
