//! Checkout, payment and receipt flows over HTTP.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use reqwest::StatusCode;
use serde_json::json;

use aurelia_core::{OrderStatus, PaymentStatus};
use aurelia_integration_tests::{
    APPROVED_CARD, DECLINED_CARD, TestServer, body, card, statuses, stock,
};

#[tokio::test]
async fn checkout_decrements_stock() {
    let server = TestServer::start().await;
    let client = server.customer("buyer@example.com").await;
    let product = server.product("silver-charm-bracelet").await;
    let before = stock(&product);

    let resp = server
        .checkout(
            &client,
            json!([{ "product_id": product["id"], "quantity": 2 }]),
            None,
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order = body(resp).await;
    assert_eq!(statuses(&order), (OrderStatus::Pending, PaymentStatus::Unpaid));
    assert_eq!(order["items"].as_array().unwrap().len(), 1);
    assert_eq!(order["items"][0]["quantity"], 2);

    let after = server.product("silver-charm-bracelet").await;
    assert_eq!(stock(&after), before - 2);
}

#[tokio::test]
async fn insufficient_stock_is_a_conflict_and_changes_nothing() {
    let server = TestServer::start().await;
    let client = server.customer("greedy@example.com").await;
    let scarce = server.product("diamond-tennis-necklace").await;
    let plenty = server.product("sterling-silver-bar-necklace").await;
    let plenty_before = stock(&plenty);

    let resp = server
        .checkout(
            &client,
            json!([
                { "product_id": plenty["id"], "quantity": 1 },
                { "product_id": scarce["id"], "quantity": stock(&scarce) + 1 },
            ]),
            None,
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let error = body(resp).await;
    assert!(error["message"].as_str().unwrap().contains("stock"));

    // All-or-nothing: the line that could be filled was not reserved either
    assert_eq!(stock(&server.product("sterling-silver-bar-necklace").await), plenty_before);
    assert_eq!(
        stock(&server.product("diamond-tennis-necklace").await),
        stock(&scarce)
    );

    let orders = body(client.get(server.url("/api/orders")).send().await.unwrap()).await;
    assert!(orders.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn repeated_idempotency_key_returns_the_original_order() {
    let server = TestServer::start().await;
    let client = server.customer("retry@example.com").await;
    let product = server.product("rose-gold-bangle").await;
    let before = stock(&product);
    let lines = json!([{ "product_id": product["id"], "quantity": 1 }]);

    let first = server
        .checkout(&client, lines.clone(), Some("retry-0001"))
        .await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let first = body(first).await;

    let second = server.checkout(&client, lines, Some("retry-0001")).await;
    assert_eq!(second.status(), StatusCode::OK);
    let second = body(second).await;

    assert_eq!(first["id"], second["id"]);
    assert_eq!(first["idempotency_key"], "retry-0001");
    assert_eq!(stock(&server.product("rose-gold-bangle").await), before - 1);
}

#[tokio::test]
async fn replaying_a_cart_checkout_returns_the_original_order() {
    let server = TestServer::start().await;
    let client = server.customer("lost-response@example.com").await;
    let product = server.product("silver-charm-bracelet").await;
    let before = stock(&product);

    let resp = client
        .post(server.url("/api/cart/items"))
        .json(&json!({ "product_id": product["id"], "quantity": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let checkout = || {
        client
            .post(server.url("/api/orders"))
            .header("Idempotency-Key", "cart-retry-1")
            .json(&json!({ "shipping": aurelia_integration_tests::shipping() }))
            .send()
    };

    let first = checkout().await.unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);
    let first = body(first).await;

    // The cart is empty now; the retry must still resolve to the same order
    let replay = checkout().await.unwrap();
    assert_eq!(replay.status(), StatusCode::OK);
    assert_eq!(body(replay).await["id"], first["id"]);
    assert_eq!(stock(&server.product("silver-charm-bracelet").await), before - 2);
}

#[tokio::test]
async fn overflowing_duplicate_lines_are_rejected() {
    let server = TestServer::start().await;
    let client = server.customer("overflow@example.com").await;
    let product = server.product("silver-charm-bracelet").await;
    let before = stock(&product);

    for lines in [
        json!([
            { "product_id": product["id"], "quantity": i32::MAX },
            { "product_id": product["id"], "quantity": i32::MAX },
        ]),
        json!([
            { "product_id": product["id"], "quantity": 60 },
            { "product_id": product["id"], "quantity": 40 },
        ]),
    ] {
        let resp = server.checkout(&client, lines, None).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
    assert_eq!(stock(&server.product("silver-charm-bracelet").await), before);
}

#[tokio::test]
async fn checkout_from_cart_empties_the_cart() {
    let server = TestServer::start().await;
    let client = server.customer("cart-checkout@example.com").await;
    let product = server.product("gold-herringbone-chain").await;

    let resp = client
        .post(server.url("/api/cart/items"))
        .json(&json!({ "product_id": product["id"], "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .post(server.url("/api/orders"))
        .json(&json!({ "shipping": aurelia_integration_tests::shipping() }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let cart = body(client.get(server.url("/api/cart")).send().await.unwrap()).await;
    assert!(cart["lines"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn empty_checkout_is_rejected() {
    let server = TestServer::start().await;
    let client = server.customer("empty@example.com").await;

    let resp = server.checkout(&client, json!([]), None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn declined_then_approved_payment() {
    let server = TestServer::start().await;
    let client = server.customer("payer@example.com").await;
    let product = server.product("silver-stacking-ring-set").await;
    let order = body(
        server
            .checkout(
                &client,
                json!([{ "product_id": product["id"], "quantity": 1 }]),
                None,
            )
            .await,
    )
    .await;
    let pay_url = server.url(&format!("/api/orders/{}/pay", order["id"]));

    let resp = client
        .post(&pay_url)
        .json(&card(DECLINED_CARD))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let order_url = server.url(&format!("/api/orders/{}", order["id"]));
    let declined = body(client.get(&order_url).send().await.unwrap()).await;
    assert_eq!(statuses(&declined), (OrderStatus::Pending, PaymentStatus::Failed));

    let resp = client
        .post(&pay_url)
        .json(&card(APPROVED_CARD))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let paid = body(resp).await;
    assert_eq!(statuses(&paid), (OrderStatus::Processing, PaymentStatus::Paid));
    assert!(paid["payment_reference"].as_str().unwrap().starts_with("SIM-"));

    // A paid order cannot be paid again
    let resp = client
        .post(&pay_url)
        .json(&card(APPROVED_CARD))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn invalid_card_is_rejected_without_touching_the_order() {
    let server = TestServer::start().await;
    let client = server.customer("typo@example.com").await;
    let product = server.product("silver-stacking-ring-set").await;
    let order = body(
        server
            .checkout(
                &client,
                json!([{ "product_id": product["id"], "quantity": 1 }]),
                None,
            )
            .await,
    )
    .await;

    let resp = client
        .post(server.url(&format!("/api/orders/{}/pay", order["id"])))
        .json(&card("4242 4242 4242 4241"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let unchanged = body(
        client
            .get(server.url(&format!("/api/orders/{}", order["id"])))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(statuses(&unchanged).1, PaymentStatus::Unpaid);
}

#[tokio::test]
async fn cancelling_restores_stock() {
    let server = TestServer::start().await;
    let client = server.customer("changed-mind@example.com").await;
    let product = server.product("gold-cuff-bracelet").await;
    let before = stock(&product);
    let order = body(
        server
            .checkout(
                &client,
                json!([{ "product_id": product["id"], "quantity": 2 }]),
                None,
            )
            .await,
    )
    .await;

    let resp = client
        .post(server.url(&format!("/api/orders/{}/cancel", order["id"])))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(statuses(&body(resp).await).0, OrderStatus::Cancelled);
    assert_eq!(stock(&server.product("gold-cuff-bracelet").await), before);
}

#[tokio::test]
async fn receipt_is_a_pdf() {
    let server = TestServer::start().await;
    let client = server.customer("receipt@example.com").await;
    let product = server.product("sterling-silver-bar-necklace").await;
    let order = body(
        server
            .checkout(
                &client,
                json!([{ "product_id": product["id"], "quantity": 1 }]),
                None,
            )
            .await,
    )
    .await;

    let resp = client
        .get(server.url(&format!("/api/orders/{}/receipt", order["id"])))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()["content-type"].to_str().unwrap(),
        "application/pdf"
    );
    let bytes = resp.bytes().await.unwrap();
    assert!(bytes.starts_with(b"%PDF-1.4"));
    assert!(bytes.ends_with(b"%%EOF\n"));
}

#[tokio::test]
async fn other_customers_orders_are_not_found() {
    let server = TestServer::start().await;
    let owner = server.customer("owner@example.com").await;
    let snoop = server.customer("snoop@example.com").await;
    let product = server.product("silver-charm-bracelet").await;
    let order = body(
        server
            .checkout(
                &owner,
                json!([{ "product_id": product["id"], "quantity": 1 }]),
                None,
            )
            .await,
    )
    .await;

    for path in ["", "/receipt"] {
        let resp = snoop
            .get(server.url(&format!("/api/orders/{}{path}", order["id"])))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "GET order{path}");
    }

    let resp = snoop
        .post(server.url(&format!("/api/orders/{}/cancel", order["id"])))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
