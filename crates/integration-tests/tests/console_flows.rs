//! End-to-end flows through the storefront router: admin bulk actions,
//! confirmation dialogs, form validation and cart totals.

#![allow(clippy::unwrap_used)]

use reqwest::Method;
use serde_json::json;

use emporium_integration_tests::{
    CREATED_PRODUCT_ID, FakeBackend, Storefront, order_json, spawn_storefront,
};

const USERS: &str = "/admin/users";
const PRODUCTS: &str = "/vendor/products";

async fn admin() -> (FakeBackend, Storefront, reqwest::Client) {
    let backend = FakeBackend::start().await;
    let storefront = spawn_storefront(&backend).await;
    let client = Storefront::client();
    storefront.sign_in(&client, "admin@example.com").await;
    (backend, storefront, client)
}

fn location(response: &reqwest::Response) -> String {
    response.headers()["location"].to_str().unwrap().to_string()
}

#[tokio::test]
async fn test_admin_lands_on_dashboard_and_customer_is_kept_out() {
    let backend = FakeBackend::start().await;
    let storefront = spawn_storefront(&backend).await;

    let admin = Storefront::client();
    let response = admin
        .post(storefront.url("/auth/login"))
        .form(&[
            ("email", "admin@example.com"),
            ("password", emporium_integration_tests::PASSWORD),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), "/admin");

    let customer = Storefront::client();
    storefront.sign_in(&customer, "shopper@example.com").await;
    let (status, _) = storefront.page(&customer, USERS).await;
    assert_eq!(status, 403);

    let anonymous = Storefront::client();
    let response = anonymous.get(storefront.url(USERS)).send().await.unwrap();
    assert!(location(&response).starts_with("/auth/login"));
}

#[tokio::test]
async fn test_bulk_block_patches_each_selected_user() {
    let (backend, storefront, client) = admin().await;

    for id in ["2", "3"] {
        let response = storefront
            .post_form(
                &client,
                "/admin/users/select",
                &[("id", id), ("return_to", USERS)],
            )
            .await;
        assert_eq!(location(&response), USERS);
    }
    let (_, page) = storefront.page(&client, USERS).await;
    assert!(page.contains("2 selected"));

    let response = storefront
        .post_form(&client, "/admin/users/bulk/block", &[])
        .await;
    assert!(response.status().is_redirection());

    let patches: Vec<_> = backend
        .requests()
        .into_iter()
        .filter(|r| r.method == Method::PATCH)
        .collect();
    assert_eq!(patches.len(), 2);
    assert_eq!(patches[0].path, "/users/2");
    assert_eq!(patches[1].path, "/users/3");
    for patch in &patches {
        assert_eq!(patch.body, json!({"status": "blocked"}));
    }

    let (_, page) = storefront.page(&client, USERS).await;
    assert!(page.contains("Blocked 2 users"));
    assert!(page.contains("0 selected"));
}

#[tokio::test]
async fn test_bulk_block_reports_partial_failure() {
    let (backend, storefront, client) = admin().await;
    backend.fail_next(
        Method::PATCH,
        "/users/3",
        422,
        r#"{"message":"Cannot block the last admin"}"#,
    );

    storefront
        .post_form(&client, "/admin/users/bulk/block", &[("ids", "2,3,4")])
        .await;

    // A failure in the middle does not stop the rest of the run.
    assert_eq!(backend.count(&Method::PATCH, "/users/2"), 1);
    assert_eq!(backend.count(&Method::PATCH, "/users/3"), 1);
    assert_eq!(backend.count(&Method::PATCH, "/users/4"), 1);

    let (_, page) = storefront.page(&client, USERS).await;
    assert!(page.contains("Blocked 2 users, 1 failed"));
    assert!(page.contains("Cannot block the last admin"));
}

#[tokio::test]
async fn test_bulk_status_skips_orders_that_cannot_make_the_move() {
    let (backend, storefront, client) = admin().await;
    backend.respond_next(
        Method::GET,
        "/orders/7",
        200,
        &order_json(7, "shipped", &serde_json::Value::Null).to_string(),
    );

    storefront
        .post_form(
            &client,
            "/admin/orders/bulk/status",
            &[("status", "processing"), ("ids", "7,8")],
        )
        .await;

    assert_eq!(backend.count(&Method::PATCH, "/orders/7"), 0);
    let patched = backend.matching(&Method::PATCH, "/orders/8");
    assert_eq!(patched.len(), 1);
    assert_eq!(patched[0].body, json!({"status": "processing"}));

    let (_, page) = storefront.page(&client, "/admin/orders").await;
    assert!(page.contains("Updated 1 order, 1 failed"));
    assert!(page.contains("#7 A shipped order"));
}

#[tokio::test]
async fn test_bulk_delete_waits_for_confirmation() {
    let (backend, storefront, client) = admin().await;

    // Confirming a dialog that was never opened does nothing.
    storefront
        .post_form(
            &client,
            "/admin/users/bulk/delete/confirm",
            &[("target", "2,3")],
        )
        .await;
    assert!(
        backend
            .requests()
            .iter()
            .all(|r| r.method != Method::DELETE)
    );

    storefront
        .post_form(&client, "/admin/users/bulk/delete", &[("ids", "2,3")])
        .await;
    let (_, page) = storefront.page(&client, USERS).await;
    assert!(page.contains(r#"name="target" value="2,3""#));
    assert!(backend.requests().iter().all(|r| r.method != Method::DELETE));

    storefront
        .post_form(
            &client,
            "/admin/users/bulk/delete/confirm",
            &[("target", "2,3")],
        )
        .await;
    assert_eq!(backend.count(&Method::DELETE, "/users/2"), 1);
    assert_eq!(backend.count(&Method::DELETE, "/users/3"), 1);

    let (_, page) = storefront.page(&client, USERS).await;
    assert!(page.contains("Deleted 2 users"));
}

#[tokio::test]
async fn test_role_change_flashes_new_role() {
    let (backend, storefront, client) = admin().await;

    let response = storefront
        .post_form(
            &client,
            "/admin/users/4/role",
            &[("role", "admin"), ("return_to", USERS)],
        )
        .await;
    assert_eq!(location(&response), USERS);

    let patches = backend.matching(&Method::PATCH, "/users/4");
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].body, json!({"role": "admin"}));

    let (_, page) = storefront.page(&client, USERS).await;
    assert!(page.contains("User 4 is now Admin."));
}

#[tokio::test]
async fn test_blank_wishlist_name_never_reaches_backend() {
    let backend = FakeBackend::start().await;
    let storefront = spawn_storefront(&backend).await;
    let client = Storefront::client();
    storefront.sign_in(&client, "shopper@example.com").await;

    let response = storefront
        .post_form(&client, "/wishlists", &[("name", "   ")])
        .await;

    assert_eq!(response.status().as_u16(), 422);
    assert_eq!(backend.count(&Method::POST, "/wishlists"), 0);
}

#[tokio::test]
async fn test_wishlist_create_redirects_with_flash() {
    let backend = FakeBackend::start().await;
    let storefront = spawn_storefront(&backend).await;
    let client = Storefront::client();
    storefront.sign_in(&client, "shopper@example.com").await;

    let response = storefront
        .post_form(&client, "/wishlists", &[("name", "Birthday")])
        .await;
    assert_eq!(location(&response), "/wishlists");

    let posts = backend.matching(&Method::POST, "/wishlists");
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].body, json!({"name": "Birthday"}));

    let (_, page) = storefront.page(&client, "/wishlists").await;
    assert!(page.contains("Created &#34;Birthday&#34;.") || page.contains("Created &quot;Birthday&quot;."));
}

#[tokio::test]
async fn test_cart_shows_shipping_below_threshold() {
    let backend = FakeBackend::start().await;
    let storefront = spawn_storefront(&backend).await;
    let client = Storefront::client();
    storefront.sign_in(&client, "shopper@example.com").await;

    let (status, page) = storefront.page(&client, "/cart").await;

    assert_eq!(status, 200);
    assert!(page.contains("$25.00"));
    assert!(page.contains("$5.00"));
    assert!(page.contains("$30.00"));
    assert!(page.contains("more for free shipping"));
}

#[tokio::test]
async fn test_vendor_creates_edits_and_deletes_a_product() {
    let backend = FakeBackend::start().await;
    let storefront = spawn_storefront(&backend).await;
    let client = Storefront::client();
    storefront.sign_in(&client, "vendor@example.com").await;

    let (status, _) = storefront.page(&client, PRODUCTS).await;
    assert_eq!(status, 200);
    let own = backend.matching(&Method::GET, "/products");
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].param("vendor"), Some("me"));

    let response = storefront
        .post_form(
            &client,
            "/vendor/products/new",
            &[
                ("name", "Walnut Board"),
                ("description", "End grain."),
                ("price", "30.00"),
                ("stock", "5"),
            ],
        )
        .await;
    assert_eq!(location(&response), PRODUCTS);
    let created = backend.matching(&Method::POST, "/products");
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].body["name"], "Walnut Board");
    assert_eq!(created[0].body["stock"], 5);

    let (_, page) = storefront.page(&client, PRODUCTS).await;
    assert!(page.contains("Walnut Board"));
    assert_eq!(backend.count(&Method::GET, "/products"), 2);

    let edit = format!("/vendor/products/{CREATED_PRODUCT_ID}/edit");
    let (status, page) = storefront.page(&client, &edit).await;
    assert_eq!(status, 200);
    assert!(page.contains("Cast Iron Teapot"));

    let response = storefront
        .post_form(
            &client,
            &edit,
            &[("name", "Walnut Board XL"), ("price", "42.00"), ("stock", "2")],
        )
        .await;
    assert_eq!(location(&response), PRODUCTS);
    let updated = backend.matching(&Method::PATCH, &format!("/products/{CREATED_PRODUCT_ID}"));
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].body["name"], "Walnut Board XL");
    assert_eq!(updated[0].body["stock"], 2);

    let deleted = format!("/products/{CREATED_PRODUCT_ID}");
    storefront
        .post_form(
            &client,
            &format!("/vendor/products/{CREATED_PRODUCT_ID}/delete"),
            &[],
        )
        .await;
    assert_eq!(backend.count(&Method::DELETE, &deleted), 0);
    let (_, page) = storefront.page(&client, PRODUCTS).await;
    assert!(page.contains(&format!(
        "/vendor/products/{CREATED_PRODUCT_ID}/delete/confirm"
    )));

    let response = storefront
        .post_form(
            &client,
            &format!("/vendor/products/{CREATED_PRODUCT_ID}/delete/confirm"),
            &[],
        )
        .await;
    assert_eq!(location(&response), PRODUCTS);
    assert_eq!(backend.count(&Method::DELETE, &deleted), 1);
}

#[tokio::test]
async fn test_vendor_product_form_rejects_bad_price_without_calling_backend() {
    let backend = FakeBackend::start().await;
    let storefront = spawn_storefront(&backend).await;
    let client = Storefront::client();
    storefront.sign_in(&client, "vendor@example.com").await;

    let response = storefront
        .post_form(
            &client,
            "/vendor/products/new",
            &[("name", "Walnut Board"), ("price", "free"), ("stock", "5")],
        )
        .await;
    assert!(!response.status().is_redirection());
    assert!(response.text().await.unwrap().contains("Price must be a number"));
    assert_eq!(backend.count(&Method::POST, "/products"), 0);
}
