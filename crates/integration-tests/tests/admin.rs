//! Admin dashboard access control and operations.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use reqwest::StatusCode;
use serde_json::json;

use aurelia_core::OrderStatus;
use aurelia_integration_tests::{APPROVED_CARD, TestServer, body, card, field, stock};

const ADMIN_PATHS: &[&str] = &["/api/admin/summary", "/api/admin/sales", "/api/admin/orders"];

#[tokio::test]
async fn anonymous_callers_get_401() {
    let server = TestServer::start().await;
    for path in ADMIN_PATHS {
        let resp = server.client().get(server.url(path)).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{path}");
    }
}

#[tokio::test]
async fn customers_get_403() {
    let server = TestServer::start().await;
    let client = server.customer("nosy@example.com").await;
    for path in ADMIN_PATHS {
        let resp = client.get(server.url(path)).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{path}");
    }

    let resp = client
        .post(server.url("/api/admin/products"))
        .json(&json!({
            "name": "Sneaky Ring",
            "category": "rings",
            "material": "Brass",
            "price": "1.00",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn paid_order_shows_up_in_reports() {
    let server = TestServer::start().await;
    let customer = server.customer("loyal@example.com").await;
    let product = server.product("classic-platinum-wedding-band").await;
    let order = body(
        server
            .checkout(
                &customer,
                json!([{ "product_id": product["id"], "quantity": 1 }]),
                None,
            )
            .await,
    )
    .await;
    let resp = customer
        .post(server.url(&format!("/api/orders/{}/pay", order["id"])))
        .json(&card(APPROVED_CARD))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let admin = server.admin().await;
    let summary = body(admin.get(server.url("/api/admin/summary")).send().await.unwrap()).await;
    assert_eq!(summary["total_orders"], 1);
    assert_eq!(summary["pending_orders"], 0);
    assert_eq!(summary["total_customers"], 1);
    assert_eq!(summary["recent_orders"][0]["id"], order["id"]);

    let sales = body(
        admin
            .get(server.url("/api/admin/sales?days=7"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(sales["days"], 7);
    assert_eq!(sales["daily"].as_array().unwrap().len(), 7);
    assert_eq!(sales["total_orders"], 1);
    assert_eq!(sales["top_products"][0]["product_id"], product["id"]);

    let resp = admin
        .get(server.url("/api/admin/sales?days=0"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn order_status_follows_the_lifecycle() {
    let server = TestServer::start().await;
    let customer = server.customer("ship-me@example.com").await;
    let product = server.product("silver-charm-bracelet").await;
    let order = body(
        server
            .checkout(
                &customer,
                json!([{ "product_id": product["id"], "quantity": 1 }]),
                None,
            )
            .await,
    )
    .await;
    let admin = server.admin().await;
    let status_url = server.url(&format!("/api/admin/orders/{}/status", order["id"]));

    // Pending orders cannot skip straight to delivered
    let resp = admin
        .patch(&status_url)
        .json(&json!({ "status": "delivered" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    for status in [OrderStatus::Processing, OrderStatus::Shipped, OrderStatus::Delivered] {
        let resp = admin
            .patch(&status_url)
            .json(&json!({ "status": status }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "to {status}");
        assert_eq!(field::<OrderStatus>(&body(resp).await, "status"), status);
    }

    let listed = body(
        admin
            .get(server.url("/api/admin/orders?status=delivered"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(listed["total"], 1);
}

#[tokio::test]
async fn product_management() {
    let server = TestServer::start().await;
    let admin = server.admin().await;

    let resp = admin
        .post(server.url("/api/admin/products"))
        .json(&json!({
            "name": "Opal Signet Ring",
            "description": "A hand-set Australian opal.",
            "category": "rings",
            "material": "18k Yellow Gold",
            "gemstone": "Opal",
            "price": "980.00",
            "stock_quantity": 4,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = body(resp).await;
    assert_eq!(created["slug"], "opal-signet-ring");
    let id = created["id"].clone();

    let resp = admin
        .put(server.url(&format!("/api/admin/products/{id}")))
        .json(&json!({ "price": "1050.00", "is_featured": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body(resp).await["is_featured"], true);

    let stock_url = server.url(&format!("/api/admin/products/{id}/stock"));
    let resp = admin
        .post(&stock_url)
        .json(&json!({ "delta": -10 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = admin
        .post(&stock_url)
        .json(&json!({ "delta": -4 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(stock(&body(resp).await), 0);

    let resp = admin
        .post(&stock_url)
        .json(&json!({ "delta": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = admin
        .delete(server.url(&format!("/api/admin/products/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = server
        .client()
        .get(server.url("/api/products/opal-signet-ring"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
