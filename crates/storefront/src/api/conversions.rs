//! Conversions between API wire types and domain types.

use chrono::{DateTime, NaiveDateTime, Utc};
use coffee_shop_core::checkout::DraftLine;
use coffee_shop_core::{
    DeliveryMode, OrderId, OrderItem, OrderRecord, Product, ProductId, Profile, Usd,
};

use super::ApiError;
use super::types::{ApiProduct, OrderItemPayload, OrderPayload, UserPayload};

/// Convert an API product, rejecting negative prices.
pub fn convert_product(product: ApiProduct) -> Result<Product, ApiError> {
    if product.price.is_sign_negative() && !product.price.is_zero() {
        return Err(ApiError::InvalidData(format!(
            "product '{}' has a negative price",
            product.name
        )));
    }

    Ok(Product {
        id: ProductId::new(product.id),
        name: product.name,
        category: product.category,
        price: Usd::new(product.price),
        image_url: product.image_url,
        rating: product.rating.map_or(0.0, Product::clamp_rating),
        description: product.description.unwrap_or_default(),
    })
}

/// Convert the product list, skipping (and logging) invalid entries.
pub fn convert_products(products: Vec<ApiProduct>) -> Vec<Product> {
    products
        .into_iter()
        .filter_map(|p| {
            convert_product(p)
                .inspect_err(|e| tracing::warn!(error = %e, "Skipping invalid product"))
                .ok()
        })
        .collect()
}

pub fn convert_order_item(item: OrderItemPayload) -> OrderItem {
    OrderItem {
        product_name: item.product_name,
        quantity: item.quantity,
        price: Usd::new(item.price),
    }
}

/// Convert an order-history entry.
pub fn convert_order(order: OrderPayload) -> Result<OrderRecord, ApiError> {
    let delivery_mode = order
        .delivery_mode
        .parse::<DeliveryMode>()
        .map_err(|e| ApiError::InvalidData(e.to_string()))?;

    Ok(OrderRecord {
        order_id: OrderId::new(order.order_id),
        items: order.items.into_iter().map(convert_order_item).collect(),
        total_usd: Usd::new(order.total_price_usd),
        status: order.status,
        delivery_mode,
        address: order.address.filter(|a| !a.trim().is_empty()),
        created_at: parse_timestamp(&order.created_at)?,
    })
}

/// Parse an RFC 3339 timestamp, or a naive ISO 8601 one taken as UTC.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| ApiError::InvalidData(format!("invalid created_at '{raw}': {e}")))
}

pub fn convert_draft_line(line: &DraftLine) -> OrderItemPayload {
    OrderItemPayload {
        product_name: line.name.clone(),
        quantity: line.quantity,
        price: line.unit_price.amount(),
    }
}

impl From<UserPayload> for Profile {
    fn from(user: UserPayload) -> Self {
        Self {
            name: user.name,
            email: user.email,
            phone_number: user.phone_number,
        }
    }
}

impl From<&Profile> for UserPayload {
    fn from(profile: &Profile) -> Self {
        Self {
            name: profile.name.clone(),
            email: profile.email.clone(),
            phone_number: profile.phone_number.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn api_product(price: Decimal, rating: Option<f32>) -> ApiProduct {
        ApiProduct {
            id: "p1".to_string(),
            name: "Latte".to_string(),
            category: "Coffee".to_string(),
            price,
            image_url: String::new(),
            rating,
            description: None,
        }
    }

    #[test]
    fn test_convert_product_defaults() {
        let product = convert_product(api_product(Decimal::new(450, 2), None)).unwrap();
        assert_eq!(product.price, Usd::from_cents(450));
        assert!(product.rating.abs() < f32::EPSILON);
        assert_eq!(product.description, "");
    }

    #[test]
    fn test_convert_product_clamps_rating() {
        let product = convert_product(api_product(Decimal::ONE, Some(9.0))).unwrap();
        assert!((product.rating - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_convert_products_skips_negative_prices() {
        let products = convert_products(vec![
            api_product(Decimal::new(-1, 0), None),
            api_product(Decimal::ZERO, None),
        ]);
        assert_eq!(products.len(), 1);
    }

    #[test]
    fn test_parse_timestamps() {
        assert!(parse_timestamp("2025-01-02T03:04:05Z").is_ok());
        assert!(parse_timestamp("2025-01-02T03:04:05.123456").is_ok());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_convert_order() {
        let order = convert_order(OrderPayload {
            order_id: "o1".to_string(),
            items: vec![OrderItemPayload {
                product_name: "Latte".to_string(),
                quantity: 2,
                price: Decimal::new(45, 1),
            }],
            total_price_usd: Decimal::new(10, 0),
            status: "pending".to_string(),
            delivery_mode: "Pick Up".to_string(),
            address: Some(String::new()),
            created_at: "2025-01-02T03:04:05".to_string(),
        })
        .unwrap();

        assert_eq!(order.delivery_mode, DeliveryMode::PickUp);
        assert_eq!(order.address, None);
        assert_eq!(order.items[0].line_total(), Usd::from_cents(900));
    }
}
