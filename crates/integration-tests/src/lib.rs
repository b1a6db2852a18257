//! End-to-end tests for the Aurelia storefront.
//!
//! Each test boots the full router (sessions, middleware and all) on an
//! ephemeral port, backed by a seeded in-memory store, and talks to it over
//! real HTTP. No database or external service is required.
//!
//! ```bash
//! cargo test -p aurelia-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::net::SocketAddr;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use aurelia_core::{OrderStatus, PaymentStatus};
use aurelia_storefront::db::Store;
use aurelia_storefront::services::AuthService;
use aurelia_storefront::{AppState, StorefrontConfig, build_router};

pub const ADMIN_EMAIL: &str = "admin@aurelia.test";
pub const ADMIN_PASSWORD: &str = "correct horse battery";

/// Card numbers accepted and declined by the payment simulator.
pub const APPROVED_CARD: &str = "4242 4242 4242 4242";
pub const DECLINED_CARD: &str = "4000 0000 0000 0002";

/// A storefront running in-process.
pub struct TestServer {
    pub base_url: String,
    pub store: Store,
}

impl TestServer {
    /// Start a server with the demo catalog and one admin account.
    pub async fn start() -> Self {
        let store = Store::memory().expect("Failed to seed memory store");
        AuthService::new(&store)
            .create_admin("Test Admin", ADMIN_EMAIL, ADMIN_PASSWORD)
            .await
            .expect("Failed to create admin");

        let state = AppState::new(StorefrontConfig::for_memory_store(), store.clone());
        let app = build_router(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local addr");

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Test server failed");
        });

        Self {
            base_url: format!("http://{addr}"),
            store,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// A client with its own cookie jar.
    #[must_use]
    pub fn client(&self) -> Client {
        Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client")
    }

    /// Register a fresh customer and return a logged-in client.
    pub async fn customer(&self, email: &str) -> Client {
        let client = self.client();
        let resp = client
            .post(self.url("/api/auth/register"))
            .json(&json!({
                "name": "Test Customer",
                "email": email,
                "password": "hunter2hunter2",
            }))
            .send()
            .await
            .expect("Failed to register");
        assert_eq!(resp.status(), StatusCode::CREATED, "register {email}");
        client
    }

    /// Log in as the seeded admin.
    pub async fn admin(&self) -> Client {
        let client = self.client();
        let resp = client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
            .send()
            .await
            .expect("Failed to log in as admin");
        assert_eq!(resp.status(), StatusCode::OK);
        client
    }

    /// Look up a product by slug.
    pub async fn product(&self, slug: &str) -> Value {
        let resp = self
            .client()
            .get(self.url(&format!("/api/products/{slug}")))
            .send()
            .await
            .expect("Failed to fetch product");
        assert_eq!(resp.status(), StatusCode::OK, "product {slug}");
        body(resp).await
    }

    /// Place an order for explicit lines.
    pub async fn checkout(&self, client: &Client, lines: Value, key: Option<&str>) -> Response {
        let mut request = client.post(self.url("/api/orders")).json(&json!({
            "items": lines,
            "shipping": shipping(),
        }));
        if let Some(key) = key {
            request = request.header("Idempotency-Key", key);
        }
        request.send().await.expect("Failed to check out")
    }
}

/// A complete shipping address.
#[must_use]
pub fn shipping() -> Value {
    json!({
        "full_name": "Ada Lovelace",
        "address_line1": "12 Marylebone Road",
        "city": "London",
        "postal_code": "NW1 5LR",
        "country": "GB",
        "phone": "+44 20 7946 0000",
        "email": "ada@example.com",
    })
}

#[must_use]
pub fn card(number: &str) -> Value {
    json!({
        "card_number": number,
        "expiry": "12/39",
        "cvv": "123",
        "cardholder": "Ada Lovelace",
    })
}

/// Read a JSON body.
pub async fn body(resp: Response) -> Value {
    resp.json().await.expect("Response was not JSON")
}

/// Stock level of a product.
#[must_use]
pub fn stock(product: &Value) -> i64 {
    product["stock_quantity"]
        .as_i64()
        .expect("stock_quantity missing")
}

/// Typed field of a JSON body, e.g. an order's `status`.
///
/// Panics if the field is missing or malformed.
pub fn field<T: DeserializeOwned>(value: &Value, key: &str) -> T {
    serde_json::from_value(value[key].clone())
        .unwrap_or_else(|e| panic!("Unexpected `{key}` in {value}: {e}"))
}

/// Order and payment status of an order body.
#[must_use]
pub fn statuses(order: &Value) -> (OrderStatus, PaymentStatus) {
    (field(order, "status"), field(order, "payment_status"))
}
