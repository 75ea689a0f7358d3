//! End-to-end storefront flows against the fake coffee shop API.
//!
//! Every test gets its own API, storefront and cookie jar.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use coffee_shop_integration_tests::{PAYMENT_FORM_URL, TestContext, location};
use serde_json::json;

/// How long the fake API stalls when a test needs a request in flight.
const SLOW_API: Duration = Duration::from_millis(800);

/// When the overlapping request starts, well inside [`SLOW_API`].
const OVERLAP: Duration = Duration::from_millis(200);

// =============================================================================
// Route guard and login
// =============================================================================

#[tokio::test]
async fn test_guarded_page_redirects_to_login_and_back() {
    let ctx = TestContext::start().await;

    let response = ctx.get("/order").await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/login?from=%2Forder");

    let response = ctx
        .post(
            "/login",
            &[
                ("email", "ana@example.com"),
                ("password", coffee_shop_integration_tests::PASSWORD),
                ("from", "/order"),
            ],
        )
        .await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/order");

    let body = ctx.page("/order").await;
    assert!(body.contains("Login successful!"));
}

#[tokio::test]
async fn test_login_ignores_external_return_target() {
    let ctx = TestContext::start().await;

    let response = ctx
        .post(
            "/login",
            &[
                ("email", "ana@example.com"),
                ("password", coffee_shop_integration_tests::PASSWORD),
                ("from", "https://evil.example/phish"),
            ],
        )
        .await;

    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_bad_credentials_rerender_login() {
    let ctx = TestContext::start().await;

    let response = ctx
        .post(
            "/login",
            &[("email", "ana@example.com"), ("password", "decaf"), ("from", "/orders")],
        )
        .await;

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("Login failed. Check your email or password."));
    assert!(body.contains(r#"name="from" value="/orders""#));
}

#[tokio::test]
async fn test_registration_rejected_by_api() {
    let ctx = TestContext::start().await;

    let response = ctx
        .post(
            "/register",
            &[
                ("name", "Taken"),
                ("email", "taken@example.com"),
                ("password", "secret"),
                ("phone_number", "9800000001"),
            ],
        )
        .await;

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("Registration failed. Email may already be taken."));
}

#[tokio::test]
async fn test_registration_then_login_page() {
    let ctx = TestContext::start().await;

    let response = ctx
        .post(
            "/register",
            &[
                ("name", "Bo"),
                ("email", "bo@example.com"),
                ("password", "secret"),
                ("phone_number", "9800000002"),
            ],
        )
        .await;

    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/login");
}

// =============================================================================
// Checkout
// =============================================================================

#[tokio::test]
async fn test_delivery_order_totals_ten_dollars() {
    let ctx = TestContext::start().await;
    ctx.login().await;
    ctx.add_to_cart("p-latte", 2).await;

    let response = ctx.checkout("Deliver", "123 Main St").await;
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains(PAYMENT_FORM_URL));
    assert!(body.contains(r#"name="amount" value="10""#));
    assert!(body.contains(r#"name="transaction_uuid" value="ord-1""#));

    let backend = ctx.backend();
    assert_eq!(backend.created_orders.len(), 1);
    let order = &backend.created_orders[0];
    assert_eq!(order["total_price_usd"], json!(10.0));
    assert_eq!(order["delivery_mode"], "Deliver");
    assert_eq!(order["address"], "123 Main St");
    assert_eq!(order["user_email"], "ana@example.com");
    assert_eq!(
        order["items"],
        json!([{ "product_name": "Latte", "quantity": 2, "price": 4.5 }])
    );
}

#[tokio::test]
async fn test_blank_address_blocks_checkout_until_pick_up() {
    let ctx = TestContext::start().await;
    ctx.login().await;
    ctx.add_to_cart("p-latte", 2).await;

    let response = ctx.checkout("Deliver", "   ").await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/order");
    assert!(ctx.backend().created_orders.is_empty());

    let body = ctx.page("/order").await;
    assert!(body.contains("Address is required"));

    let response = ctx.checkout("Pick Up", "").await;
    assert_eq!(response.status(), 200);

    let backend = ctx.backend();
    let order = &backend.created_orders[0];
    assert_eq!(order["total_price_usd"], json!(9.0));
    assert_eq!(order["delivery_mode"], "Pick Up");
    assert!(order["address"].is_null());
}

#[tokio::test]
async fn test_empty_cart_cannot_check_out() {
    let ctx = TestContext::start().await;
    ctx.login().await;

    let body = ctx.page("/order").await;
    assert!(body.contains("Your cart is empty"));
    assert!(body.contains("$0.00"));

    let response = ctx.checkout("Pick Up", "").await;
    assert_eq!(location(&response), "/order");
    assert!(ctx.backend().created_orders.is_empty());
}

#[tokio::test]
async fn test_payment_initiation_failure_keeps_cart() {
    let ctx = TestContext::start().await;
    ctx.login().await;
    ctx.add_to_cart("p-latte", 2).await;
    ctx.backend().payment_unavailable = true;

    let response = ctx.checkout("Deliver", "123 Main St").await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/order");

    let body = ctx.page("/order").await;
    assert!(body.contains("Failed to initiate payment. Please try again."));
    assert!(body.contains("Latte"));
    assert!(body.contains("$10.00"));
}

#[tokio::test]
async fn test_order_creation_failure_keeps_cart() {
    let ctx = TestContext::start().await;
    ctx.login().await;
    ctx.add_to_cart("p-latte", 2).await;
    ctx.backend().create_order_unavailable = true;

    let response = ctx.checkout("Deliver", "123 Main St").await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/order");

    let body = ctx.page("/order").await;
    assert!(body.contains("Failed to create order. Please try again."));
    assert!(body.contains("Latte"));
    assert!(body.contains("$10.00"));
    assert!(ctx.backend().created_orders.is_empty());
}

#[tokio::test]
async fn test_order_creation_rejecting_token_forces_login() {
    let ctx = TestContext::start().await;
    ctx.login().await;
    ctx.add_to_cart("p-latte", 1).await;
    ctx.backend().create_order_rejects_tokens = true;

    let response = ctx.checkout("Pick Up", "").await;
    assert_eq!(response.status(), 303);
    assert!(
        location(&response)
            .starts_with("/login?from=%2Forder&message=Your%20session%20has%20expired")
    );

    let response = ctx.get("/order").await;
    assert_eq!(location(&response), "/login?from=%2Forder");
}

#[tokio::test]
async fn test_second_checkout_is_refused_while_first_is_in_flight() {
    let ctx = TestContext::start().await;
    ctx.login().await;
    ctx.add_to_cart("p-latte", 2).await;
    ctx.backend().create_order_delay = SLOW_API;

    let (first, page_meanwhile) = tokio::join!(ctx.checkout("Deliver", "123 Main St"), async {
        tokio::time::sleep(OVERLAP).await;
        let second = ctx.checkout("Deliver", "123 Main St").await;
        assert_eq!(location(&second), "/order");
        ctx.page("/order").await
    });

    assert_eq!(first.status(), 200);
    assert!(page_meanwhile.contains("Your order is already being placed."));
    assert!(page_meanwhile.contains("Placing order..."));
    assert_eq!(ctx.backend().created_orders.len(), 1);
}

#[tokio::test]
async fn test_menu_outage_keeps_order_page_usable() {
    let ctx = TestContext::start().await;
    ctx.login().await;
    ctx.backend().products_unavailable = true;

    let body = ctx.page("/order").await;
    assert!(body.contains("The menu could not be loaded"));

    let response = ctx.checkout("Pick Up", "").await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/order");

    let body = ctx.page("/order").await;
    assert!(body.contains("Failed to create order. Please try again."));
    assert!(ctx.backend().created_orders.is_empty());
}

#[tokio::test]
async fn test_place_order_button_rechecks_address_in_page() {
    let ctx = TestContext::start().await;
    ctx.login().await;
    ctx.add_to_cart("p-latte", 1).await;

    // Deliver with no address yet: disabled, but the items are ready so typing
    // an address can enable it without a round trip.
    let body = ctx.page("/order").await;
    assert!(body.contains(r#"data-items-ready="true" disabled"#));
    assert!(body.contains("/static/js/order.js"));

    let script = ctx.page("/static/js/order.js").await;
    assert!(script.contains("addEventListener(\"input\""));
}

// =============================================================================
// Payment return
// =============================================================================

#[tokio::test]
async fn test_failed_payment_keeps_cart() {
    let ctx = TestContext::start().await;
    ctx.login().await;
    ctx.add_to_cart("p-latte", 2).await;
    assert_eq!(ctx.checkout("Deliver", "123 Main St").await.status(), 200);

    let body = ctx.page("/thankyou?status=failed&fromPayment=true").await;
    assert!(body.contains("Payment failed"));

    let body = ctx.page("/order").await;
    assert!(body.contains("Latte"));
    assert!(body.contains("$9.00"));
}

#[tokio::test]
async fn test_successful_payment_clears_cart_once() {
    let ctx = TestContext::start().await;
    ctx.login().await;
    ctx.add_to_cart("p-latte", 2).await;
    assert_eq!(ctx.checkout("Deliver", "123 Main St").await.status(), 200);

    let body = ctx.page("/thankyou?status=success&fromPayment=true").await;
    assert!(body.contains("Thank You for Your Order!"));
    assert!(body.contains("ord-1"));
    assert!(body.contains("Latte"));

    // A reload of the same return must not eat a cart built afterwards.
    ctx.add_to_cart("p-tea", 1).await;
    let body = ctx.page("/thankyou?status=success&fromPayment=true").await;
    assert!(body.contains("Thank You for Your Order!"));

    let body = ctx.page("/order").await;
    assert!(body.contains("Iced Tea"));
    assert!(!body.contains("Latte"));
}

#[tokio::test]
async fn test_direct_visit_to_thank_you_goes_home() {
    let ctx = TestContext::start().await;
    ctx.login().await;
    ctx.add_to_cart("p-latte", 1).await;

    let response = ctx.get("/thankyou?status=success").await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/");

    let body = ctx.page("/order").await;
    assert!(body.contains("Latte"));
}

#[tokio::test]
async fn test_order_history_shows_both_totals() {
    let ctx = TestContext::start().await;
    ctx.login().await;
    ctx.add_to_cart("p-latte", 2).await;
    assert_eq!(ctx.checkout("Deliver", "123 Main St").await.status(), 200);

    let body = ctx.page("/orders").await;
    assert!(body.contains("ord-1"));
    assert!(body.contains("$10.00"));
    assert!(body.contains("NPR 1330.00"));
}

// =============================================================================
// Chat
// =============================================================================

#[tokio::test]
async fn test_chat_directive_replaces_cart() {
    let ctx = TestContext::start().await;
    ctx.login().await;
    ctx.add_to_cart("p-latte", 2).await;
    ctx.backend().chat_output = json!({
        "role": "assistant",
        "content": "Three iced teas coming up.",
        "memory": { "order": [{ "item": "Iced Tea", "quantity": "3" }] }
    });

    let response = ctx.post("/chat/send", &[("message", "3 iced teas please")]).await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/chat");

    let body = ctx.page("/chat").await;
    assert!(body.contains("3 iced teas please"));
    assert!(body.contains("Three iced teas coming up."));
    assert!(body.contains("Your cart has been updated."));

    let body = ctx.page("/order").await;
    assert!(body.contains("Iced Tea"));
    assert!(!body.contains("Latte"));
    assert!(body.contains("$9.00"));
}

#[tokio::test]
async fn test_chat_failure_shows_apology() {
    let ctx = TestContext::start().await;
    ctx.login().await;
    ctx.backend().chat_unavailable = true;

    ctx.post("/chat/send", &[("message", "hello")]).await;

    let body = ctx.page("/chat").await;
    assert!(body.contains("Sorry, something went wrong!"));
}

#[tokio::test]
async fn test_second_chat_send_is_refused_while_reply_pending() {
    let ctx = TestContext::start().await;
    ctx.login().await;
    ctx.backend().chat_delay = SLOW_API;

    let (first, page_meanwhile) = tokio::join!(
        ctx.post("/chat/send", &[("message", "one latte")]),
        async {
            tokio::time::sleep(OVERLAP).await;
            let second = ctx.post("/chat/send", &[("message", "make it two")]).await;
            assert_eq!(location(&second), "/chat");
            ctx.page("/chat").await
        }
    );

    assert_eq!(location(&first), "/chat");
    assert!(page_meanwhile.contains("Still thinking about your last message..."));
    assert!(page_meanwhile.contains("Typing..."));
    assert_eq!(ctx.backend().chat_requests.len(), 1);
}

#[tokio::test]
async fn test_blank_chat_message_is_not_sent() {
    let ctx = TestContext::start().await;
    ctx.login().await;

    let response = ctx.post("/chat/send", &[("message", "   ")]).await;
    assert_eq!(response.status(), 303);
    assert!(ctx.backend().chat_requests.is_empty());
}

// =============================================================================
// Account and session expiry
// =============================================================================

#[tokio::test]
async fn test_account_change_forces_login_with_message() {
    let ctx = TestContext::start().await;
    ctx.login().await;

    let response = ctx
        .post(
            "/account",
            &[
                ("name", "Ana Maria"),
                ("email", "ana@example.com"),
                ("phone_number", "9800000000"),
            ],
        )
        .await;
    assert_eq!(response.status(), 303);
    assert!(
        location(&response)
            .starts_with("/login?from=%2Faccount&message=Your%20account%20details%20have%20been%20updated")
    );
    assert_eq!(ctx.backend().name, "Ana Maria");

    // The message is shown once; after that the guard is a plain redirect.
    let response = ctx.get("/account").await;
    assert_eq!(location(&response), "/login?from=%2Faccount");
}

#[tokio::test]
async fn test_unchanged_account_keeps_session() {
    let ctx = TestContext::start().await;
    ctx.login().await;

    let response = ctx
        .post(
            "/account",
            &[
                ("name", " Ana "),
                ("email", "ana@example.com"),
                ("phone_number", "9800000000"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/account");

    let body = ctx.page("/account").await;
    assert!(body.contains("Account details updated successfully!"));
}

#[tokio::test]
async fn test_rejected_token_logs_out() {
    let ctx = TestContext::start().await;
    ctx.login().await;
    ctx.backend().reject_tokens = true;

    let response = ctx.get("/orders").await;
    assert_eq!(response.status(), 303);
    assert!(location(&response).starts_with("/login?from=%2Forders&message=Your%20session%20has%20expired"));

    // Logged out for good, even once the API would accept the token again.
    ctx.backend().reject_tokens = false;
    let response = ctx.get("/orders").await;
    assert_eq!(location(&response), "/login?from=%2Forders");
}

#[tokio::test]
async fn test_logout() {
    let ctx = TestContext::start().await;
    ctx.login().await;

    let response = ctx.post("/logout", &[]).await;
    assert_eq!(location(&response), "/login");

    let response = ctx.get("/").await;
    assert_eq!(location(&response), "/login?from=%2F");
}

#[tokio::test]
async fn test_logout_survives_slower_request_finishing_later() {
    let ctx = TestContext::start().await;
    ctx.login().await;
    ctx.backend().chat_delay = SLOW_API;

    let (chat, logout) = tokio::join!(
        ctx.post("/chat/send", &[("message", "a latte please")]),
        async {
            tokio::time::sleep(OVERLAP).await;
            ctx.post("/logout", &[]).await
        }
    );
    assert_eq!(location(&logout), "/login");
    assert_eq!(chat.status(), 303);

    let response = ctx.get("/orders").await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/login?from=%2Forders");
}

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::start().await;
    assert_eq!(ctx.page("/health").await, "ok");
}
