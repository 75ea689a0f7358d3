//! End-to-end test harness for the coffee shop storefront.
//!
//! Each [`TestContext`] starts a fake coffee shop API and the real storefront
//! router on ephemeral ports, then drives the storefront with a cookie-carrying
//! client that does not follow redirects, so every test can assert on the
//! exact `Location` a handler produced.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p coffee-shop-integration-tests
//! ```

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::{
    Form, Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use coffee_shop_core::auth::unsigned_token;
use coffee_shop_storefront::config::StorefrontConfig;
use coffee_shop_storefront::state::AppState;
use serde::Deserialize;
use serde_json::{Value, json};

/// Password the fake API accepts.
pub const PASSWORD: &str = "espresso";

/// Where the pre-signed payment form posts.
pub const PAYMENT_FORM_URL: &str = "https://pay.example/epay/form";

// =============================================================================
// Fake coffee shop API
// =============================================================================

/// Everything the fake API knows, inspectable and adjustable from tests.
#[derive(Debug)]
pub struct Backend {
    pub name: String,
    pub email: String,
    pub phone_number: String,
    /// Answer every bearer call with 401.
    pub reject_tokens: bool,
    /// Answer `/products` with 503.
    pub products_unavailable: bool,
    /// Answer `/create-order` with 500.
    pub create_order_unavailable: bool,
    /// Answer `/create-order` with 401 while other bearer calls succeed.
    pub create_order_rejects_tokens: bool,
    /// How long `/create-order` takes to answer.
    pub create_order_delay: Duration,
    /// Answer `/initiate-payment` with 500.
    pub payment_unavailable: bool,
    /// Answer `/chat` with 500.
    pub chat_unavailable: bool,
    /// How long `/chat` takes to answer.
    pub chat_delay: Duration,
    /// The `output` of the next chat replies.
    pub chat_output: Value,
    /// Bodies received on `/create-order`, oldest first.
    pub created_orders: Vec<Value>,
    /// Histories received on `/chat`.
    pub chat_requests: Vec<Value>,
}

impl Default for Backend {
    fn default() -> Self {
        Self {
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            phone_number: "9800000000".to_string(),
            reject_tokens: false,
            products_unavailable: false,
            create_order_unavailable: false,
            create_order_rejects_tokens: false,
            create_order_delay: Duration::ZERO,
            payment_unavailable: false,
            chat_unavailable: false,
            chat_delay: Duration::ZERO,
            chat_output: json!({ "role": "assistant", "content": "What can I get you?" }),
            created_orders: Vec::new(),
            chat_requests: Vec::new(),
        }
    }
}

type Shared = Arc<Mutex<Backend>>;

fn lock(backend: &Shared) -> MutexGuard<'_, Backend> {
    backend
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "detail": "Could not validate credentials" })),
    )
        .into_response()
}

fn server_error(detail: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "detail": detail })),
    )
        .into_response()
}

fn bearer_ok(headers: &HeaderMap, backend: &Backend) -> bool {
    !backend.reject_tokens
        && headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("Bearer "))
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login(State(backend): State<Shared>, Form(form): Form<LoginForm>) -> Response {
    let backend = lock(&backend);
    if form.username != backend.email || form.password != PASSWORD {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Incorrect username or password" })),
        )
            .into_response();
    }

    let exp = Utc::now().timestamp() + 3600;
    let token = unsigned_token(&backend.email, &backend.name, Some(exp));
    Json(json!({ "access_token": token.expose(), "token_type": "bearer" })).into_response()
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["email"] == "taken@example.com" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "Email already registered" })),
        )
            .into_response();
    }
    Json(json!({ "message": "User created" })).into_response()
}

async fn get_me(State(backend): State<Shared>, headers: HeaderMap) -> Response {
    let backend = lock(&backend);
    if !bearer_ok(&headers, &backend) {
        return unauthorized();
    }
    Json(json!({
        "name": backend.name,
        "email": backend.email,
        "phone_number": backend.phone_number,
    }))
    .into_response()
}

async fn put_me(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut guard = lock(&backend);
    let backend = &mut *guard;
    if !bearer_ok(&headers, backend) {
        return unauthorized();
    }
    for (field, slot) in [
        ("name", &mut backend.name),
        ("email", &mut backend.email),
        ("phone_number", &mut backend.phone_number),
    ] {
        if let Some(value) = body[field].as_str() {
            *slot = value.to_string();
        }
    }
    Json(json!({ "message": "Updated" })).into_response()
}

async fn products(State(backend): State<Shared>) -> Response {
    if lock(&backend).products_unavailable {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "detail": "Menu service down" })),
        )
            .into_response();
    }
    Json(json!({
        "products": [
            {
                "_id": "p-latte",
                "name": "Latte",
                "category": "Coffee",
                "price": 4.5,
                "image_url": "/static/img/latte.png",
                "rating": 4.6,
                "description": "Espresso with steamed milk."
            },
            {
                "_id": "p-tea",
                "name": "Iced Tea",
                "category": "Cold Drinks",
                "price": 3.0,
                "image_url": "/static/img/iced-tea.png",
                "rating": 4.1
            }
        ]
    }))
    .into_response()
}

async fn create_order(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let delay = lock(&backend).create_order_delay;
    tokio::time::sleep(delay).await;

    let mut backend = lock(&backend);
    if !bearer_ok(&headers, &backend) || backend.create_order_rejects_tokens {
        return unauthorized();
    }
    if backend.create_order_unavailable {
        return server_error("Order database down");
    }
    backend.created_orders.push(body);
    let order_id = format!("ord-{}", backend.created_orders.len());
    Json(json!({ "order_id": order_id })).into_response()
}

async fn initiate_payment(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Path(order_id): Path<String>,
) -> Response {
    let backend = lock(&backend);
    if !bearer_ok(&headers, &backend) {
        return unauthorized();
    }
    if backend.payment_unavailable {
        return server_error("Payment gateway down");
    }
    let total = backend
        .created_orders
        .last()
        .map_or(Value::Null, |o| o["total_price_usd"].clone());
    Json(json!({
        "amount": total,
        "product_code": "EPAYTEST",
        "transaction_uuid": order_id,
        "signature": "c2lnbmVk",
    }))
    .into_response()
}

async fn orders(State(backend): State<Shared>, headers: HeaderMap) -> Response {
    let backend = lock(&backend);
    if !bearer_ok(&headers, &backend) {
        return unauthorized();
    }
    let history: Vec<Value> = backend
        .created_orders
        .iter()
        .enumerate()
        .map(|(i, order)| {
            json!({
                "order_id": format!("ord-{}", i + 1),
                "items": order["items"],
                "total_price_usd": order["total_price_usd"],
                "status": "paid",
                "delivery_mode": order["delivery_mode"],
                "address": order["address"],
                "created_at": format!("2025-01-0{}T10:00:00", i + 1),
            })
        })
        .collect();
    Json(Value::Array(history)).into_response()
}

async fn chat(State(backend): State<Shared>, Json(body): Json<Value>) -> Response {
    let delay = {
        let mut backend = lock(&backend);
        backend.chat_requests.push(body["input"]["messages"].clone());
        backend.chat_delay
    };
    tokio::time::sleep(delay).await;

    let backend = lock(&backend);
    if backend.chat_unavailable {
        return server_error("Agent crashed");
    }
    Json(json!({ "output": backend.chat_output })).into_response()
}

fn backend_router(backend: Shared) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/users/me", get(get_me).put(put_me))
        .route("/products", get(products))
        .route("/create-order", post(create_order))
        .route("/initiate-payment/{order_id}", post(initiate_payment))
        .route("/orders", get(orders))
        .route("/chat", post(chat))
        .with_state(backend)
}

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    addr
}

// =============================================================================
// Test context
// =============================================================================

/// A running storefront wired to a fresh fake API.
pub struct TestContext {
    backend: Shared,
    base_url: String,
    client: reqwest::Client,
}

impl TestContext {
    /// Start the fake API and the storefront.
    pub async fn start() -> Self {
        let backend: Shared = Arc::default();
        let api_addr = serve(backend_router(backend.clone())).await;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind storefront listener");
        let addr = listener.local_addr().expect("Listener has no address");
        let base_url = format!("http://{addr}");

        let config = StorefrontConfig::from_lookup(|key| {
            let value = match key {
                "COFFEE_API_URL" => format!("http://{api_addr}"),
                "STOREFRONT_BASE_URL" => base_url.clone(),
                "STOREFRONT_PORT" => addr.port().to_string(),
                "PAYMENT_FORM_URL" => PAYMENT_FORM_URL.to_string(),
                "CHAT_RECOMMENDATIONS" => "false".to_string(),
                _ => return None,
            };
            Some(value)
        })
        .expect("Test configuration is valid");

        let state = AppState::new(config).expect("Failed to build app state");
        let app = coffee_shop_storefront::app(state);
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            backend,
            base_url,
            client,
        }
    }

    /// Inspect or adjust the fake API.
    pub fn backend(&self) -> MutexGuard<'_, Backend> {
        lock(&self.backend)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .expect("GET request failed")
    }

    pub async fn post(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(format!("{}{path}", self.base_url))
            .form(form)
            .send()
            .await
            .expect("POST request failed")
    }

    /// GET a page that must render, returning its body.
    pub async fn page(&self, path: &str) -> String {
        let response = self.get(path).await;
        assert_eq!(response.status(), 200, "GET {path} did not render");
        response.text().await.expect("Unreadable body")
    }

    /// Log in as the fake API's customer.
    pub async fn login(&self) {
        let email = self.backend().email.clone();
        let response = self
            .post("/login", &[("email", &email), ("password", PASSWORD), ("from", "/")])
            .await;
        assert_eq!(response.status(), 303, "login did not redirect");
    }

    pub async fn add_to_cart(&self, product_id: &str, quantity: u32) {
        let quantity = quantity.to_string();
        let response = self
            .post(
                "/cart/add",
                &[
                    ("product_id", product_id),
                    ("quantity", &quantity),
                    ("return_to", "/"),
                ],
            )
            .await;
        assert_eq!(response.status(), 303, "add to cart did not redirect");
    }

    pub async fn checkout(&self, mode: &str, address: &str) -> reqwest::Response {
        self.post("/order/checkout", &[("mode", mode), ("address", address)])
            .await
    }
}

/// The `Location` header of a redirect.
#[must_use]
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
