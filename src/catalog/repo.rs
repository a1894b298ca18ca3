use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Catalog entry. Maintained by an administrator; rows referenced by an
/// order cannot be deleted (RESTRICT), only deactivated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
}

impl Product {
    /// Active products, the set selectable on the order form.
    pub async fn list_active(db: &PgPool) -> anyhow::Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price, is_active, created_at
            FROM products
            WHERE is_active
            ORDER BY name
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Look up a product only if it is currently active.
    pub async fn find_active(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price, is_active, created_at
            FROM products
            WHERE id = $1 AND is_active
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(product)
    }
}
