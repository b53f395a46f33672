//! Product catalog service.
//!
//! The ledger trusts product ids and does not own catalog truth; this
//! service exists for existence checks and as the producing side of the
//! outbox: every upsert enqueues a `product.upsert` event in the same
//! transaction.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use shared::{Product, UpsertProductInput};

use crate::error::{AppError, AppResult};
use crate::services::outbox;

/// Event type consumed by the external sales system
pub const PRODUCT_UPSERT_EVENT: &str = "product.upsert";

type ProductRow = (Uuid, String, String, String, bool, DateTime<Utc>, DateTime<Utc>);

fn product_from_row(row: ProductRow) -> Product {
    Product {
        id: row.0,
        code: row.1,
        name: row.2,
        unit: row.3,
        active: row.4,
        created_at: row.5,
        updated_at: row.6,
    }
}

/// Check that a product exists, inside the caller's transaction.
pub(crate) async fn ensure_product(conn: &mut PgConnection, product_id: Uuid) -> AppResult<()> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
        .bind(product_id)
        .fetch_one(&mut *conn)
        .await?;

    if !exists {
        return Err(AppError::NotFound("Product".to_string()));
    }
    Ok(())
}

/// Product catalog service
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

impl ProductService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Upsert a product by code and enqueue the propagation event
    /// atomically with it.
    pub async fn upsert_product(&self, input: UpsertProductInput) -> AppResult<Product> {
        input.validate()?;

        let active = input.active.unwrap_or(true);

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            INSERT INTO products (code, name, unit, active)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (code)
            DO UPDATE SET name = EXCLUDED.name, unit = EXCLUDED.unit,
                          active = EXCLUDED.active, updated_at = NOW()
            RETURNING id, code, name, unit, active, created_at, updated_at
            "#,
        )
        .bind(&input.code)
        .bind(&input.name)
        .bind(&input.unit)
        .bind(active)
        .fetch_one(&mut *tx)
        .await?;

        let product = product_from_row(row);

        let payload = serde_json::to_value(&product).map_err(anyhow::Error::from)?;
        outbox::enqueue(&mut tx, PRODUCT_UPSERT_EVENT, &payload).await?;

        tx.commit().await?;

        Ok(product)
    }

    /// Get a product by id
    pub async fn get_product(&self, product_id: Uuid) -> AppResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, code, name, unit, active, created_at, updated_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        Ok(product_from_row(row))
    }
}
