//! Router-level checks driven with `oneshot`, no listening socket for the
//! storefront itself.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use emporium_integration_tests::FakeBackend;
use emporium_storefront::build_router;
use emporium_storefront::state::AppState;

async fn router(backend: &FakeBackend) -> axum::Router {
    let state = AppState::new(backend.config("http://localhost:3000")).unwrap();
    build_router(state)
}

#[tokio::test]
async fn test_health_carries_security_headers_and_request_id() {
    let backend = FakeBackend::start().await;
    let app = router(&backend).await;

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_readiness_follows_backend_health() {
    let backend = FakeBackend::start().await;
    let app = router(&backend).await;

    let response = app
        .clone()
        .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    backend.fail_next(axum::http::Method::GET, "/health", 503, "");
    let response = app
        .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_console_requires_sign_in() {
    let backend = FakeBackend::start().await;
    let app = router(&backend).await;

    for path in ["/admin", "/vendor", "/cart", "/wishlists", "/account"] {
        let response = app
            .clone()
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(response.headers()["location"], "/auth/login", "{path}");
    }
}

#[tokio::test]
async fn test_unknown_product_id_is_rejected() {
    let backend = FakeBackend::start().await;
    let app = router(&backend).await;

    let response = app
        .oneshot(Request::get("/products/abc").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(backend.requests().is_empty());
}
