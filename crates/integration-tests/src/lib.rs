//! Integration test harness for Emporium.
//!
//! [`FakeBackend`] stands in for the REST API on an ephemeral port. It
//! answers a small fixed data set (or a product catalog a test installs),
//! records every request it receives, can be told to fail or stall the next
//! call to a route, and pushes realtime events over its `/events` stream. [`spawn_storefront`] serves the real storefront
//! router against it.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p emporium-integration-tests
//! ```
//!
//! Nothing external is needed; both servers bind to `127.0.0.1:0`.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::{HashMap, VecDeque};
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{Method, StatusCode, Uri, header::CONTENT_TYPE},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::get,
};
use futures::Stream;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use url::Url;

use emporium_storefront::config::StorefrontConfig;
use emporium_storefront::state::AppState;

/// Password every fake account accepts.
pub const PASSWORD: &str = "correct-horse-battery";

const CREATED_AT: &str = "2026-01-05T10:00:00Z";

/// One request as the fake backend saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub body: Value,
}

impl Recorded {
    /// One query string parameter, if it was sent.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }
}

type Canned = HashMap<(Method, String), VecDeque<(StatusCode, String)>>;

struct Shared {
    requests: Mutex<Vec<Recorded>>,
    canned: Mutex<Canned>,
    delays: Mutex<HashMap<(Method, String), Duration>>,
    catalog: Mutex<Option<Vec<Value>>>,
    events: broadcast::Sender<(String, Value)>,
}

/// In-process stand-in for the REST backend.
#[derive(Clone)]
pub struct FakeBackend {
    url: Url,
    shared: Arc<Shared>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let (events, _) = broadcast::channel(16);
        let shared = Arc::new(Shared {
            requests: Mutex::new(Vec::new()),
            canned: Mutex::new(HashMap::new()),
            delays: Mutex::new(HashMap::new()),
            catalog: Mutex::new(None),
            events,
        });

        let app = Router::new()
            .route("/events", get(event_stream))
            .fallback(dispatch)
            .with_state(Arc::clone(&shared));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        Self {
            url: Url::parse(&format!("http://{addr}")).unwrap(),
            shared,
        }
    }

    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Storefront configuration pointed at this backend.
    #[must_use]
    pub fn config(&self, base_url: &str) -> StorefrontConfig {
        let mut config = StorefrontConfig::new(self.url.clone(), base_url);
        config.api_timeout = Duration::from_secs(5);
        config.realtime_reconnect = Duration::from_millis(50);
        config
    }

    /// Answer the next `method path` request with `status` and `body`
    /// instead of the fixture.
    pub fn fail_next(&self, method: Method, path: &str, status: u16, body: &str) {
        self.respond_next(method, path, status, body);
    }

    /// Like [`FakeBackend::fail_next`], for replacing a fixture with another
    /// successful answer.
    pub fn respond_next(&self, method: Method, path: &str, status: u16, body: &str) {
        let status = StatusCode::from_u16(status).unwrap();
        self.shared
            .canned
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back((status, body.to_string()));
    }

    /// Hold the next `method path` response for `delay` after recording it.
    pub fn delay_next(&self, method: Method, path: &str, delay: Duration) {
        self.shared
            .delays
            .lock()
            .unwrap()
            .insert((method, path.to_string()), delay);
    }

    /// Serve `GET /products` from these products, paged by the request's
    /// `page` and `per_page`.
    pub fn set_products(&self, products: Vec<Value>) {
        *self.shared.catalog.lock().unwrap() = Some(products);
    }

    /// Wait until `method path` has been requested at least `n` times.
    pub async fn wait_for(&self, method: &Method, path: &str, n: usize) {
        for _ in 0..250 {
            if self.count(method, path) >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("{method} {path} was never requested {n} times");
    }

    #[must_use]
    pub fn requests(&self) -> Vec<Recorded> {
        self.shared.requests.lock().unwrap().clone()
    }

    /// Requests seen for one method and path.
    #[must_use]
    pub fn matching(&self, method: &Method, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == *method && r.path == path)
            .collect()
    }

    #[must_use]
    pub fn count(&self, method: &Method, path: &str) -> usize {
        self.matching(method, path).len()
    }

    /// Push a realtime event to every connected listener.
    pub fn emit(&self, name: &str, data: Value) {
        let _ = self.shared.events.send((name.to_string(), data));
    }

    /// Wait until a realtime listener has connected.
    pub async fn wait_for_subscriber(&self) {
        for _ in 0..250 {
            if self.shared.events.receiver_count() > 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("realtime listener never connected");
    }
}

// =============================================================================
// Fixtures
// =============================================================================

#[must_use]
pub fn user_json(id: i64, role: &str, status: &str) -> Value {
    json!({
        "id": id,
        "name": format!("User {id}"),
        "email": format!("user{id}@example.com"),
        "role": role,
        "status": status,
        "created_at": CREATED_AT,
    })
}

#[must_use]
pub fn product_json(id: i64) -> Value {
    json!({
        "id": id,
        "vendor_id": 1,
        "name": "Cast Iron Teapot",
        "description": "Holds a litre.",
        "price": {"amount": "12.50", "currency_code": "USD"},
        "stock": 8,
        "rating": 4.5,
        "review_count": 2,
        "created_at": CREATED_AT,
    })
}

/// A product with the given rating, stock and visibility.
#[must_use]
pub fn listed_product(id: i64, rating: f64, stock: u32, active: bool) -> Value {
    let mut product = product_json(id);
    product["name"] = json!(format!("Product {id}"));
    product["rating"] = json!(rating);
    product["stock"] = json!(stock);
    product["active"] = json!(active);
    product
}

#[must_use]
pub fn order_json(id: i64, status: &str, shipping_address: &Value) -> Value {
    json!({
        "id": id,
        "user_id": 1,
        "status": status,
        "items": [{
            "id": 1,
            "product_id": 10,
            "product_name": "Cast Iron Teapot",
            "vendor_id": 1,
            "quantity": 2,
            "unit_price": {"amount": "12.50", "currency_code": "USD"},
        }],
        "subtotal": {"amount": "25.00", "currency_code": "USD"},
        "shipping": {"amount": "0.00", "currency_code": "USD"},
        "total": {"amount": "25.00", "currency_code": "USD"},
        "shipping_address": shipping_address,
        "created_at": CREATED_AT,
        "updated_at": CREATED_AT,
    })
}

/// Id the fake gives every placed order.
pub const PLACED_ORDER_ID: i64 = 42;

/// Id the fake gives every created product.
pub const CREATED_PRODUCT_ID: i64 = 77;

fn cart_json() -> Value {
    json!({
        "lines": [{
            "id": 1,
            "product_id": 10,
            "product_name": "Cast Iron Teapot",
            "unit_price": {"amount": "12.50", "currency_code": "USD"},
            "quantity": 2,
        }]
    })
}

fn page_json(items: Vec<Value>) -> Value {
    json!({
        "total": items.len(),
        "page": 1,
        "per_page": 25,
        "items": items,
    })
}

fn catalog_page(products: &[Value], query: &HashMap<String, String>) -> Value {
    let number = query
        .get("page")
        .and_then(|p| p.parse::<usize>().ok())
        .unwrap_or(1)
        .max(1);
    let per_page = query
        .get("per_page")
        .and_then(|p| p.parse::<usize>().ok())
        .unwrap_or(25)
        .max(1);
    let items: Vec<Value> = products
        .iter()
        .skip((number - 1) * per_page)
        .take(per_page)
        .cloned()
        .collect();
    json!({
        "total": products.len(),
        "page": number,
        "per_page": per_page,
        "items": items,
    })
}

/// Product fields from a create/update body laid over `base`.
fn saved_product(mut base: Value, body: &Value) -> Value {
    for field in ["name", "description", "price", "stock", "image_url"] {
        if !body[field].is_null() {
            base[field] = body[field].clone();
        }
    }
    base
}

fn role_for(email: &str) -> &'static str {
    if email.starts_with("admin") {
        "admin"
    } else if email.starts_with("vendor") {
        "vendor"
    } else {
        "customer"
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn dispatch(
    State(shared): State<Arc<Shared>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let query: HashMap<String, String> = url::form_urlencoded::parse(
        uri.query().unwrap_or_default().as_bytes(),
    )
    .into_owned()
    .collect();
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    shared.requests.lock().unwrap().push(Recorded {
        method: method.clone(),
        path: path.clone(),
        query: query.clone(),
        body: body.clone(),
    });

    let delay = shared
        .delays
        .lock()
        .unwrap()
        .remove(&(method.clone(), path.clone()));
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let canned = shared
        .canned
        .lock()
        .unwrap()
        .get_mut(&(method.clone(), path.clone()))
        .and_then(VecDeque::pop_front);
    if let Some((status, text)) = canned {
        return (status, [(CONTENT_TYPE, "application/json")], text).into_response();
    }

    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    match (method.as_str(), segments.as_slice()) {
        ("GET", ["health"]) => Json(json!({"status": "ok"})).into_response(),
        ("POST", ["auth", "login"]) => {
            let email = body["email"].as_str().unwrap_or_default();
            if body["password"].as_str() != Some(PASSWORD) {
                return StatusCode::UNAUTHORIZED.into_response();
            }
            let role = role_for(email);
            Json(json!({
                "token": format!("token-{role}"),
                "user": user_json(1, role, "active"),
            }))
            .into_response()
        }
        ("GET", ["cart"]) => Json(cart_json()).into_response(),
        ("GET", ["wishlists" | "notifications" | "categories"]) => Json(json!([])).into_response(),
        ("POST", ["wishlists"]) => Json(json!({
            "id": 7,
            "user_id": 1,
            "name": body["name"],
            "product_ids": [],
            "created_at": CREATED_AT,
        }))
        .into_response(),
        ("GET", ["products"]) => {
            let catalog = shared.catalog.lock().unwrap().clone();
            match catalog {
                Some(products) => Json(catalog_page(&products, &query)).into_response(),
                None => Json(page_json(vec![product_json(10)])).into_response(),
            }
        }
        ("GET", ["products", id]) => match id.parse::<i64>() {
            Ok(id) => Json(product_json(id)).into_response(),
            Err(_) => StatusCode::NOT_FOUND.into_response(),
        },
        ("POST", ["products"]) => {
            Json(saved_product(product_json(CREATED_PRODUCT_ID), &body)).into_response()
        }
        ("PATCH", ["products", id]) => {
            let id = id.parse::<i64>().unwrap_or_default();
            Json(saved_product(product_json(id), &body)).into_response()
        }
        ("GET", ["orders"]) => Json(page_json(Vec::new())).into_response(),
        ("POST", ["orders"]) => Json(order_json(
            PLACED_ORDER_ID,
            "pending",
            &body["shipping_address"],
        ))
        .into_response(),
        ("PATCH", ["orders", id]) => {
            let id = id.parse::<i64>().unwrap_or_default();
            let status = body["status"].as_str().unwrap_or("pending");
            Json(order_json(id, status, &Value::Null)).into_response()
        }
        ("GET", ["orders", id]) => match id.parse::<i64>() {
            Ok(id) => Json(order_json(id, "pending", &Value::Null)).into_response(),
            Err(_) => StatusCode::NOT_FOUND.into_response(),
        },
        ("GET", ["products", _, "reviews"]) => Json(json!([])).into_response(),
        ("GET", ["users"]) => Json(page_json(vec![
            user_json(2, "customer", "active"),
            user_json(3, "customer", "active"),
            user_json(4, "vendor", "active"),
        ]))
        .into_response(),
        ("PATCH", ["users", id]) => {
            let id = id.parse::<i64>().unwrap_or_default();
            let role = body["role"].as_str().unwrap_or("customer");
            let status = body["status"].as_str().unwrap_or("active");
            Json(user_json(id, role, status)).into_response()
        }
        ("DELETE", _) => StatusCode::NO_CONTENT.into_response(),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({"message": format!("No route for {method} {path}")})),
        )
            .into_response(),
    }
}

async fn event_stream(
    State(shared): State<Arc<Shared>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut events = shared.events.subscribe();
    let stream = async_stream::stream! {
        loop {
            match events.recv().await {
                Ok((name, data)) => yield Ok(Event::default().event(name).data(data.to_string())),
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}

// =============================================================================
// Storefront
// =============================================================================

/// A storefront server running against a [`FakeBackend`].
pub struct Storefront {
    pub base_url: String,
    pub state: AppState,
}

pub async fn spawn_storefront(backend: &FakeBackend) -> Storefront {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let state = AppState::new(backend.config(&base_url)).unwrap();
    let app = emporium_storefront::build_router(state.clone());
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    Storefront { base_url, state }
}

impl Storefront {
    /// Browser-like client: keeps cookies, does not follow redirects.
    #[must_use]
    pub fn client() -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap()
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Sign in through the login form. The role follows the email prefix.
    pub async fn sign_in(&self, client: &reqwest::Client, email: &str) {
        let response = client
            .post(self.url("/auth/login"))
            .form(&[("email", email), ("password", PASSWORD)])
            .send()
            .await
            .unwrap();
        assert!(
            response.status().is_redirection(),
            "login failed with {}",
            response.status()
        );
    }

    /// POST a form. Redirects are returned, not followed.
    pub async fn post_form(
        &self,
        client: &reqwest::Client,
        path: &str,
        form: &[(&str, &str)],
    ) -> reqwest::Response {
        client.post(self.url(path)).form(form).send().await.unwrap()
    }

    pub async fn page(&self, client: &reqwest::Client, path: &str) -> (u16, String) {
        let response = client.get(self.url(path)).send().await.unwrap();
        let status = response.status().as_u16();
        (status, response.text().await.unwrap())
    }
}
