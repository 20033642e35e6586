use std::collections::BTreeMap;

use axum::{body, body::Body, http::Request};
use serde_json::json;
use shared::{error::ErrorCode, protocol::ServerDirective};
use tower::ServiceExt;

use super::*;

fn test_app(psp_redirect: Option<&str>) -> Router {
    let required = BTreeMap::from([
        ("customer".to_string(), vec!["email".to_string()]),
        ("shipping".to_string(), vec!["address".to_string()]),
    ]);
    let state = AppState {
        store: Mutex::new(CheckoutStore::default()),
        validator: Validator::new(&required),
        psp_redirect: psp_redirect.map(|raw| Url::parse(raw).expect("url")),
    };
    build_router(Arc::new(state), 4 * 1024)
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    let body = body.to_string();
    Request::post(uri)
        .header("content-type", "application/json")
        .header("content-length", body.len())
        .body(Body::from(body))
        .expect("request")
}

async fn read_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

#[tokio::test]
async fn healthz_reports_ok() {
    let app = test_app(None);
    let request = Request::get("/healthz").body(Body::empty()).expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn update_returns_cart_and_field_errors() {
    let app = test_app(None);
    let response = app
        .oneshot(post_json(
            "/checkout/update/",
            json!({"customer": {"email": ""}, "notes": {"text": "hi"}}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let update: UpdateResponse = read_json(response).await;
    assert_eq!(update.cart["revision"], json!(1));
    assert_eq!(update.cart["forms"]["notes"], json!({"text": "hi"}));
    let (cart, errors) = update.split();
    assert!(!cart.contains_key("errors"));
    assert_eq!(
        errors[&shared::domain::FormName::from("customer")]["email"].messages(),
        [checkout::REQUIRED_MESSAGE.to_string()]
    );
}

#[tokio::test]
async fn purchase_with_missing_forms_is_a_validation_error() {
    let app = test_app(None);
    let response = app
        .oneshot(post_json(
            "/checkout/purchase/",
            json!({"customer": {"email": "jo@example.com"}}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let error: ApiError = read_json(response).await;
    assert_eq!(error.code, ErrorCode::Validation);
    assert!(error.message.contains("shipping"));
}

#[tokio::test]
async fn purchase_after_updates_redirects_to_psp() {
    let app = test_app(Some("https://psp.example/pay"));

    let update = app
        .clone()
        .oneshot(post_json(
            "/checkout/update/",
            json!({"customer": {"email": "jo@example.com"}}),
        ))
        .await
        .expect("response");
    assert_eq!(update.status(), StatusCode::OK);

    let response = app
        .oneshot(post_json(
            "/checkout/purchase/",
            json!({"shipping": {"address": "1 Main St"}}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let purchase: PurchaseResponse = read_json(response).await;
    match purchase.expression {
        ServerDirective::Redirect { url } => {
            assert!(url.starts_with("https://psp.example/pay?order="), "url: {url}");
        }
        other => panic!("unexpected directive: {other:?}"),
    }
}

#[tokio::test]
async fn oversized_bodies_are_refused() {
    let app = test_app(None);
    let large = "x".repeat(8 * 1024);
    let response = app
        .oneshot(post_json(
            "/checkout/update/",
            json!({"notes": {"text": large}}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
