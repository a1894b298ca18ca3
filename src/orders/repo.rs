use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use crate::catalog::Product;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Cancelled,
}

/// A placed order. `order_id` is the public identifier, distinct from the
/// internal row key; it is assigned exactly once, at creation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    // nullable so historical orders would survive a catalog removal
    pub product_id: Option<Uuid>,
    pub order_id: String,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub created_at: OffsetDateTime,
}

/// Receipt row for the success view: the order joined with its product
/// name (kept visible even if the product is later deactivated).
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderReceipt {
    pub order_id: String,
    pub product_name: Option<String>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub created_at: OffsetDateTime,
}

/// Fresh public order identifier: 12 uppercase hex characters.
pub fn generate_order_id() -> String {
    let bytes: [u8; 6] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

/// Price-lock: the charged amount derives from the stored catalog price,
/// quantized to 2 decimals. The override is reserved for trusted internal
/// paths and is never reachable from client input.
pub fn locked_total(price: Decimal, trusted_override: Option<Decimal>) -> Decimal {
    trusted_override.unwrap_or(price).round_dp(2)
}

// Identifier collisions are astronomically unlikely (48 bits), but a
// bounded regenerate loop is cheaper than an unhandled 500.
const ORDER_ID_ATTEMPTS: u32 = 3;

impl Order {
    /// Persist a new PENDING order for `user_id` against `product`,
    /// locking the total to the product's current price.
    pub async fn create(db: &PgPool, user_id: Uuid, product: &Product) -> sqlx::Result<Order> {
        let total = locked_total(product.price, None);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let order_id = generate_order_id();
            let res = sqlx::query_as::<_, Order>(
                r#"
                INSERT INTO orders (user_id, product_id, order_id, total_amount)
                VALUES ($1, $2, $3, $4)
                RETURNING id, user_id, product_id, order_id, total_amount, status, created_at
                "#,
            )
            .bind(user_id)
            .bind(product.id)
            .bind(&order_id)
            .bind(total)
            .fetch_one(db)
            .await;

            match res {
                Ok(order) => return Ok(order),
                Err(e) if attempt < ORDER_ID_ATTEMPTS && is_order_id_collision(&e) => {
                    warn!(%order_id, attempt, "order id collision, regenerating");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Owner-scoped receipt lookup: a user can only see their own orders.
    pub async fn receipt_for_user(
        db: &PgPool,
        order_id: &str,
        user_id: Uuid,
    ) -> sqlx::Result<Option<OrderReceipt>> {
        let receipt = sqlx::query_as::<_, OrderReceipt>(
            r#"
            SELECT o.order_id, p.name AS product_name, o.total_amount, o.status, o.created_at
            FROM orders o
            LEFT JOIN products p ON p.id = o.product_id
            WHERE o.order_id = $1 AND o.user_id = $2
            "#,
        )
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(receipt)
    }
}

fn is_order_id_collision(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Database(db) if db.constraint() == Some("orders_order_id_key")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;
    use std::collections::HashSet;

    #[test]
    fn order_id_is_twelve_uppercase_hex_chars() {
        let re = Regex::new(r"^[A-F0-9]{12}$").unwrap();
        for _ in 0..100 {
            let id = generate_order_id();
            assert!(re.is_match(&id), "bad order id: {id}");
        }
    }

    #[test]
    fn order_ids_do_not_repeat_in_practice() {
        let ids: HashSet<String> = (0..1000).map(|_| generate_order_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn total_is_quantized_to_two_decimals() {
        let price = Decimal::new(19_990, 3); // 19.990
        assert_eq!(locked_total(price, None), Decimal::new(1999, 2));
    }

    #[test]
    fn total_comes_from_the_catalog_price() {
        let price = Decimal::new(1999, 2);
        assert_eq!(locked_total(price, None), price);
    }

    #[test]
    fn trusted_override_wins_when_present() {
        let price = Decimal::new(1999, 2);
        let comp = Decimal::new(0, 2);
        assert_eq!(locked_total(price, Some(comp)), comp);
    }

    #[test]
    fn status_serializes_uppercase() {
        let json = serde_json::to_string(&OrderStatus::Pending).unwrap();
        assert_eq!(json, r#""PENDING""#);
    }
}
