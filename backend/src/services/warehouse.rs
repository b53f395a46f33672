//! Warehouse catalog service

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use shared::Warehouse;

use crate::error::{AppError, AppResult};

/// Check that a warehouse exists, inside the caller's transaction.
pub(crate) async fn ensure_warehouse(conn: &mut PgConnection, warehouse_id: Uuid) -> AppResult<()> {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM warehouses WHERE id = $1)")
            .bind(warehouse_id)
            .fetch_one(&mut *conn)
            .await?;

    if !exists {
        return Err(AppError::NotFound("Warehouse".to_string()));
    }
    Ok(())
}

type WarehouseRow = (Uuid, String, String, DateTime<Utc>);

fn warehouse_from_row(row: WarehouseRow) -> Warehouse {
    Warehouse {
        id: row.0,
        code: row.1,
        name: row.2,
        created_at: row.3,
    }
}

/// Warehouse catalog service
#[derive(Clone)]
pub struct WarehouseService {
    db: PgPool,
}

impl WarehouseService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a warehouse
    pub async fn create_warehouse(&self, code: &str, name: &str) -> AppResult<Warehouse> {
        if code.trim().is_empty() {
            return Err(AppError::Validation {
                field: "code".to_string(),
                message: "Warehouse code cannot be empty".to_string(),
            });
        }

        let row = sqlx::query_as::<_, WarehouseRow>(
            r#"
            INSERT INTO warehouses (code, name)
            VALUES ($1, $2)
            RETURNING id, code, name, created_at
            "#,
        )
        .bind(code)
        .bind(name)
        .fetch_one(&self.db)
        .await?;

        Ok(warehouse_from_row(row))
    }

    /// List all warehouses
    pub async fn list_warehouses(&self) -> AppResult<Vec<Warehouse>> {
        let rows = sqlx::query_as::<_, WarehouseRow>(
            "SELECT id, code, name, created_at FROM warehouses ORDER BY code",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(warehouse_from_row).collect())
    }
}
