//! Retry policy and error banners for backend failures.

#![allow(clippy::unwrap_used)]

use reqwest::Method;

use emporium_integration_tests::{FakeBackend, Storefront, spawn_storefront};
use emporium_storefront::api::GENERIC_ERROR_MESSAGE;

#[tokio::test]
async fn test_read_is_retried_once_after_server_error() {
    let backend = FakeBackend::start().await;
    let storefront = spawn_storefront(&backend).await;
    backend.fail_next(Method::GET, "/products", 500, r#"{"message":"boom"}"#);

    let (status, body) = storefront.page(&Storefront::client(), "/products").await;

    assert_eq!(status, 200);
    assert!(body.contains("Cast Iron Teapot"));
    assert_eq!(backend.count(&Method::GET, "/products"), 2);
}

#[tokio::test]
async fn test_read_gives_up_after_retry_budget() {
    let backend = FakeBackend::start().await;
    let storefront = spawn_storefront(&backend).await;
    backend.fail_next(Method::GET, "/products", 503, "");
    backend.fail_next(Method::GET, "/products", 503, "");

    let (status, body) = storefront.page(&Storefront::client(), "/products").await;

    assert_eq!(status, 502);
    assert!(body.contains(GENERIC_ERROR_MESSAGE));
    assert!(body.contains("Retry"));
    assert_eq!(backend.count(&Method::GET, "/products"), 2);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let backend = FakeBackend::start().await;
    let storefront = spawn_storefront(&backend).await;

    let (status, _) = storefront
        .page(&Storefront::client(), "/products/999999999999999999999")
        .await;
    assert_eq!(status, 400);

    backend.fail_next(Method::GET, "/products/11", 404, r#"{"message":"No such product"}"#);
    let (status, body) = storefront.page(&Storefront::client(), "/products/11").await;

    assert_eq!(status, 404);
    assert!(body.contains("No such product"));
    assert_eq!(backend.count(&Method::GET, "/products/11"), 1);
}

#[tokio::test]
async fn test_mutation_is_never_retried() {
    let backend = FakeBackend::start().await;
    let storefront = spawn_storefront(&backend).await;
    let client = Storefront::client();
    storefront.sign_in(&client, "shopper@example.com").await;
    backend.fail_next(Method::POST, "/wishlists", 500, r#"{"message":"boom"}"#);

    let response = storefront
        .post_form(&client, "/wishlists", &[("name", "Gifts")])
        .await;

    assert_eq!(response.status().as_u16(), 422);
    assert_eq!(backend.count(&Method::POST, "/wishlists"), 1);
}

#[tokio::test]
async fn test_backend_message_is_shown_verbatim() {
    let backend = FakeBackend::start().await;
    let storefront = spawn_storefront(&backend).await;
    let client = Storefront::client();
    storefront.sign_in(&client, "shopper@example.com").await;
    backend.fail_next(
        Method::POST,
        "/wishlists",
        422,
        r#"{"message":"You already have a wishlist with that name"}"#,
    );

    let response = storefront
        .post_form(&client, "/wishlists", &[("name", "Gifts")])
        .await;
    let body = response.text().await.unwrap();

    assert!(body.contains("You already have a wishlist with that name"));
    assert!(!body.contains(GENERIC_ERROR_MESSAGE));
}

#[tokio::test]
async fn test_shapeless_error_body_falls_back_to_generic_message() {
    let backend = FakeBackend::start().await;
    let storefront = spawn_storefront(&backend).await;
    let client = Storefront::client();
    storefront.sign_in(&client, "shopper@example.com").await;
    backend.fail_next(
        Method::POST,
        "/wishlists",
        500,
        "<html><body>Internal Server Error</body></html>",
    );

    let response = storefront
        .post_form(&client, "/wishlists", &[("name", "Gifts")])
        .await;
    let body = response.text().await.unwrap();

    assert!(body.contains(GENERIC_ERROR_MESSAGE));
    assert!(!body.contains("Internal Server Error"));
}

#[tokio::test]
async fn test_expired_token_signs_out() {
    let backend = FakeBackend::start().await;
    let storefront = spawn_storefront(&backend).await;
    let client = Storefront::client();
    storefront.sign_in(&client, "shopper@example.com").await;
    backend.fail_next(Method::GET, "/wishlists", 401, "");

    // Sign-in primed the wishlist cache; a fresh list forces the refetch.
    storefront.state.api().cache().invalidate_all();
    let response = client.get(storefront.url("/wishlists")).send().await.unwrap();

    assert!(response.status().is_redirection());
    let location = response.headers()["location"].to_str().unwrap().to_string();
    assert!(location.starts_with("/auth/login"));

    let again = client.get(storefront.url("/wishlists")).send().await.unwrap();
    let location = again.headers()["location"].to_str().unwrap().to_string();
    assert!(location.starts_with("/auth/login"));
}
