//! Shopper flows through the storefront router: the filtered catalog over a
//! catalog larger than one backend page, checkout and order cancellation.

#![allow(clippy::unwrap_used)]

use reqwest::Method;
use serde_json::{Value, json};

use emporium_integration_tests::{
    FakeBackend, PLACED_ORDER_ID, Storefront, listed_product, order_json, spawn_storefront,
};
use emporium_storefront::api::MAX_SCAN_PAGES;

fn location(response: &reqwest::Response) -> String {
    response.headers()["location"].to_str().unwrap().to_string()
}

fn card(id: i64) -> String {
    format!("href=\"/products/{id}\"")
}

/// Products 1-100 rated 3.0, products 101-150 rated 5.0.
fn two_page_catalog() -> Vec<Value> {
    (1..=150)
        .map(|id| listed_product(id, if id > 100 { 5.0 } else { 3.0 }, 8, true))
        .collect()
}

#[tokio::test]
async fn test_rating_filter_reads_past_the_first_backend_page() {
    let backend = FakeBackend::start().await;
    backend.set_products(two_page_catalog());
    let storefront = spawn_storefront(&backend).await;
    let client = Storefront::client();

    let (status, page) = storefront.page(&client, "/products?min_rating=4").await;
    assert_eq!(status, 200);
    assert!(page.contains("50 products"), "wrong total in {page}");
    assert!(page.contains(&card(101)));
    assert!(!page.contains(&card(100)));
    assert!(!page.contains("class=\"notice\""));

    let reads = backend.matching(&Method::GET, "/products");
    assert_eq!(reads.len(), 2);
    assert_eq!(reads[0].param("page"), Some("1"));
    assert_eq!(reads[1].param("page"), Some("2"));
    assert!(reads.iter().all(|r| r.param("per_page") == Some("100")));
}

#[tokio::test]
async fn test_filtered_catalog_second_page_comes_from_later_backend_pages() {
    let backend = FakeBackend::start().await;
    backend.set_products(two_page_catalog());
    let storefront = spawn_storefront(&backend).await;
    let client = Storefront::client();

    let (_, page) = storefront
        .page(&client, "/products?min_rating=4&page=2")
        .await;
    // Twelve cards per page: the second page starts at the 13th match.
    assert!(page.contains(&card(113)));
    assert!(!page.contains(&card(112)));
}

#[tokio::test]
async fn test_in_stock_filter_drops_sold_out_products() {
    let backend = FakeBackend::start().await;
    backend.set_products(vec![
        listed_product(1, 4.0, 0, true),
        listed_product(2, 4.0, 3, true),
    ]);
    let storefront = spawn_storefront(&backend).await;
    let client = Storefront::client();

    let (_, page) = storefront.page(&client, "/products?in_stock=1").await;
    assert!(page.contains("1 product<"));
    assert!(page.contains(&card(2)));
    assert!(!page.contains(&card(1)));
}

#[tokio::test]
async fn test_scan_cap_is_reported_on_the_page() {
    let backend = FakeBackend::start().await;
    let listed = i64::from(MAX_SCAN_PAGES) * 100 + 20;
    backend.set_products(
        (1..=listed)
            .map(|id| listed_product(id, 5.0, 8, true))
            .collect(),
    );
    let storefront = spawn_storefront(&backend).await;
    let client = Storefront::client();

    let (status, page) = storefront.page(&client, "/products?min_rating=4").await;
    assert_eq!(status, 200);
    assert!(page.contains("class=\"notice\""));
    assert_eq!(
        backend.count(&Method::GET, "/products"),
        MAX_SCAN_PAGES as usize
    );
}

#[tokio::test]
async fn test_inactive_products_are_hidden_with_and_without_filters() {
    let backend = FakeBackend::start().await;
    backend.set_products(vec![
        listed_product(1, 4.5, 8, true),
        listed_product(2, 4.5, 8, false),
    ]);
    let storefront = spawn_storefront(&backend).await;
    let client = Storefront::client();

    for path in ["/products", "/products?min_rating=4"] {
        let (status, page) = storefront.page(&client, path).await;
        assert_eq!(status, 200);
        assert!(page.contains(&card(1)), "{path} lost the active product");
        assert!(!page.contains(&card(2)), "{path} showed the inactive product");
        assert!(page.contains("1 product<"), "{path} counted the inactive product");
    }
}

#[tokio::test]
async fn test_checkout_places_order_and_resets_cart() {
    let backend = FakeBackend::start().await;
    let storefront = spawn_storefront(&backend).await;
    let client = Storefront::client();
    storefront.sign_in(&client, "shopper@example.com").await;

    let (status, _) = storefront.page(&client, "/account/orders").await;
    assert_eq!(status, 200);
    let (status, page) = storefront.page(&client, "/checkout").await;
    assert_eq!(status, 200);
    assert!(page.contains("<span class=\"badge\">2</span>"));
    let cart_reads = backend.count(&Method::GET, "/cart");
    let order_reads = backend.count(&Method::GET, "/orders");

    let response = storefront
        .post_form(
            &client,
            "/checkout",
            &[
                ("full_name", "Ada Lovelace"),
                ("line1", "12 Rua Augusta"),
                ("line2", ""),
                ("city", "Lisbon"),
                ("postal_code", "1100-053"),
                ("country", "Portugal"),
            ],
        )
        .await;
    assert!(response.status().is_redirection());
    assert_eq!(
        location(&response),
        format!("/checkout/confirmation/{PLACED_ORDER_ID}")
    );

    let placed = backend.matching(&Method::POST, "/orders");
    assert_eq!(placed.len(), 1);
    let address = &placed[0].body["shipping_address"];
    assert_eq!(address["full_name"], "Ada Lovelace");
    assert_eq!(address["city"], "Lisbon");
    assert!(address["line2"].is_null());

    let (status, page) = storefront
        .page(&client, &format!("/checkout/confirmation/{PLACED_ORDER_ID}"))
        .await;
    assert_eq!(status, 200);
    assert!(page.contains(&format!("#{PLACED_ORDER_ID}")));
    assert!(!page.contains("class=\"badge\""));

    storefront.page(&client, "/cart").await;
    assert_eq!(backend.count(&Method::GET, "/cart"), cart_reads + 1);
    storefront.page(&client, "/account/orders").await;
    assert_eq!(backend.count(&Method::GET, "/orders"), order_reads + 1);
}

#[tokio::test]
async fn test_checkout_with_missing_address_does_not_place_order() {
    let backend = FakeBackend::start().await;
    let storefront = spawn_storefront(&backend).await;
    let client = Storefront::client();
    storefront.sign_in(&client, "shopper@example.com").await;

    let response = storefront
        .post_form(
            &client,
            "/checkout",
            &[("full_name", "Ada Lovelace"), ("city", "Lisbon")],
        )
        .await;
    assert_eq!(response.status().as_u16(), 422);
    assert!(response.text().await.unwrap().contains("Postal code"));
    assert_eq!(backend.count(&Method::POST, "/orders"), 0);
}

async fn cancel(storefront: &Storefront, client: &reqwest::Client, id: i64) -> reqwest::Response {
    storefront
        .post_form(client, &format!("/account/orders/{id}/cancel"), &[])
        .await;
    storefront
        .post_form(client, &format!("/account/orders/{id}/cancel/confirm"), &[])
        .await
}

#[tokio::test]
async fn test_customer_cancels_pending_order() {
    let backend = FakeBackend::start().await;
    let storefront = spawn_storefront(&backend).await;
    let client = Storefront::client();
    storefront.sign_in(&client, "shopper@example.com").await;

    let response = cancel(&storefront, &client, 6).await;
    assert_eq!(location(&response), "/account/orders/6");

    let patches = backend.matching(&Method::PATCH, "/orders/6");
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].body, json!({"status": "cancelled"}));
}

#[tokio::test]
async fn test_shipped_order_cannot_be_cancelled() {
    let backend = FakeBackend::start().await;
    backend.respond_next(
        Method::GET,
        "/orders/5",
        200,
        &order_json(5, "shipped", &Value::Null).to_string(),
    );
    let storefront = spawn_storefront(&backend).await;
    let client = Storefront::client();
    storefront.sign_in(&client, "shopper@example.com").await;

    let response = cancel(&storefront, &client, 5).await;
    assert_eq!(location(&response), "/account/orders/5");
    assert_eq!(backend.count(&Method::PATCH, "/orders/5"), 0);

    let (_, page) = storefront.page(&client, "/account/orders/5").await;
    assert!(page.contains("flash-error"));
    assert!(page.contains("be marked cancelled."));
}
