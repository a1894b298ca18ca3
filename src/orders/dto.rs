use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::notice::Notice;
use crate::orders::repo::OrderStatus;

/// One selectable product on the order form.
#[derive(Debug, Serialize)]
pub struct ProductItem {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
}

#[derive(Debug, Serialize)]
pub struct OrderFormResponse {
    pub products: Vec<ProductItem>,
}

/// The form only ever supplies a product choice, never a price.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub product_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct OrderCreatedResponse {
    pub order_id: String,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub created_at: OffsetDateTime,
    pub notice: Notice,
}
