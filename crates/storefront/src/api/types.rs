//! Wire types for the coffee shop API.
//!
//! These mirror the JSON the API speaks. Conversion into domain types lives in
//! `conversions`; handlers never see these directly except [`PaymentFields`].

use coffee_shop_core::ChatMessage;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Pre-signed payment form fields, forwarded verbatim to the processor.
pub type PaymentFields = serde_json::Map<String, serde_json::Value>;

// =============================================================================
// Auth & Users
// =============================================================================

/// `POST /login` response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// `POST /register` body.
#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub phone_number: &'a str,
}

/// `GET /users/me` response and `PUT /users/me` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
}

/// FastAPI-style error body.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub detail: serde_json::Value,
}

// =============================================================================
// Products
// =============================================================================

/// `GET /products` response.
#[derive(Debug, Deserialize)]
pub struct ProductsResponse {
    pub products: Vec<ApiProduct>,
}

/// One product as stored by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiProduct {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: Decimal,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub description: Option<String>,
}

// =============================================================================
// Orders & Payments
// =============================================================================

/// One order line, both in requests and in order history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemPayload {
    pub product_name: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

/// `POST /create-order` body.
#[derive(Debug, Serialize)]
pub struct CreateOrderRequest<'a> {
    pub items: Vec<OrderItemPayload>,
    pub user_email: &'a str,
    /// Includes the delivery fee.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price_usd: Decimal,
    pub delivery_mode: &'static str,
    pub address: Option<&'a str>,
}

/// `POST /create-order` response.
#[derive(Debug, Deserialize)]
pub struct CreateOrderResponse {
    pub order_id: String,
}

/// `GET /orders` element.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderPayload {
    pub order_id: String,
    #[serde(default)]
    pub items: Vec<OrderItemPayload>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price_usd: Decimal,
    #[serde(default)]
    pub status: String,
    pub delivery_mode: String,
    #[serde(default)]
    pub address: Option<String>,
    pub created_at: String,
}

/// `GET /orders` query.
#[derive(Debug, Serialize)]
pub struct OrdersQuery<'a> {
    pub user_email: &'a str,
}

// =============================================================================
// Chat
// =============================================================================

/// `POST /chat` body: `{ "input": { "messages": [...] } }`.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub input: ChatInput<'a>,
}

#[derive(Debug, Serialize)]
pub struct ChatInput<'a> {
    pub messages: &'a [ChatMessage],
}

/// `POST /chat` response: `{ "output": { role, content, memory? } }`.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub output: ChatMessage,
}
