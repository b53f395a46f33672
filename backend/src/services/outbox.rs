//! Integration outbox: transactional enqueue and inspection surface.
//!
//! Events are enqueued on the producing transaction's connection, so an
//! event exists exactly when the write that produced it committed.
//! Delivery is the dispatcher's job (see `dispatcher`).

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use shared::{OutboxEvent, OutboxStatus};

use crate::error::{AppError, AppResult};

/// Enqueue a pending event inside the caller's transaction.
pub(crate) async fn enqueue(
    conn: &mut PgConnection,
    event_type: &str,
    payload: &serde_json::Value,
) -> AppResult<Uuid> {
    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO outbox_events (event_type, payload)
        VALUES ($1, $2)
        RETURNING id
        "#,
    )
    .bind(event_type)
    .bind(payload)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

/// Escalating retry delay after `attempt_count` failed deliveries,
/// capped at `max_secs`. The first failure waits `base_secs`, each
/// further failure doubles the wait.
pub fn retry_delay_secs(attempt_count: i32, base_secs: u64, max_secs: u64) -> u64 {
    let exp = attempt_count.saturating_sub(1).clamp(0, 20) as u32;
    base_secs.saturating_mul(1u64 << exp).min(max_secs)
}

pub(crate) type EventRow = (
    Uuid,
    String,
    serde_json::Value,
    String,
    i32,
    Option<DateTime<Utc>>,
    Option<String>,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

pub(crate) fn event_from_row(row: EventRow) -> AppResult<OutboxEvent> {
    let status = OutboxStatus::from_str(&row.3)
        .ok_or_else(|| AppError::InternalError(anyhow!("unknown outbox status '{}'", row.3)))?;

    Ok(OutboxEvent {
        id: row.0,
        event_type: row.1,
        payload: row.2,
        status,
        attempt_count: row.4,
        next_retry_at: row.5,
        last_error: row.6,
        created_at: row.7,
        sent_at: row.8,
    })
}

/// Outbox inspection surface
#[derive(Clone)]
pub struct OutboxService {
    db: PgPool,
}

impl OutboxService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List events, optionally filtered by status, oldest first
    pub async fn list_events(
        &self,
        status: Option<OutboxStatus>,
        limit: i64,
    ) -> AppResult<Vec<OutboxEvent>> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, event_type, payload, status, attempt_count,
                   next_retry_at, last_error, created_at, sent_at
            FROM outbox_events
            WHERE $1::varchar IS NULL OR status = $1
            ORDER BY created_at ASC
            LIMIT $2
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(event_from_row).collect()
    }

    /// Get one event
    pub async fn get_event(&self, event_id: Uuid) -> AppResult<OutboxEvent> {
        let row = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, event_type, payload, status, attempt_count,
                   next_retry_at, last_error, created_at, sent_at
            FROM outbox_events
            WHERE id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Outbox event".to_string()))?;

        event_from_row(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_doubles_until_cap() {
        assert_eq!(retry_delay_secs(1, 30, 3600), 30);
        assert_eq!(retry_delay_secs(2, 30, 3600), 60);
        assert_eq!(retry_delay_secs(3, 30, 3600), 120);
        assert_eq!(retry_delay_secs(8, 30, 3600), 3600);
        assert_eq!(retry_delay_secs(100, 30, 3600), 3600);
    }

    #[test]
    fn test_retry_delay_zero_attempts() {
        assert_eq!(retry_delay_secs(0, 30, 3600), 30);
    }
}
