//! Outbox dispatcher: periodic at-least-once delivery to the sales
//! system.
//!
//! Runs independently of ledger transactions. Each cycle claims a batch
//! of due events, attempts delivery and updates per-event status. Status
//! transitions are guarded by row state checks (`status <> 'sent'`), so
//! overlapping cycles cannot double-send after a success; no
//! coordination beyond the database is needed. Delivery failures never
//! surface to ledger callers.

use std::time::Duration;

use sqlx::PgPool;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use shared::OutboxEvent;

use crate::config::OutboxConfig;
use crate::error::AppResult;
use crate::external::sales::SalesClient;
use crate::services::outbox::{event_from_row, retry_delay_secs, EventRow};

/// Outbox dispatcher task
pub struct OutboxDispatcher {
    db: PgPool,
    client: SalesClient,
    config: OutboxConfig,
}

impl OutboxDispatcher {
    pub fn new(db: PgPool, client: SalesClient, config: OutboxConfig) -> Self {
        Self { db, client, config }
    }

    /// Run the dispatch loop forever.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.config.poll_interval_secs));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match self.run_cycle().await {
                Ok(0) => {}
                Ok(sent) => tracing::debug!("Outbox cycle delivered {} events", sent),
                Err(e) => tracing::error!("Outbox cycle failed: {:?}", e),
            }
        }
    }

    /// One claim-attempt-update cycle. Returns how many events were
    /// delivered.
    pub async fn run_cycle(&self) -> AppResult<usize> {
        let due = self.claim_due_events().await?;

        let mut sent = 0;
        for event in due {
            match self
                .client
                .push_event(&event.event_type, &event.payload)
                .await
            {
                Ok(()) => {
                    self.mark_sent(event.id).await?;
                    sent += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        "Delivery of outbox event {} failed (attempt {}): {}",
                        event.id,
                        event.attempt_count + 1,
                        e
                    );
                    self.record_failure(event.id, event.attempt_count + 1, &e.to_string())
                        .await?;
                }
            }
        }

        Ok(sent)
    }

    /// Select up to batch_size due events, oldest first.
    async fn claim_due_events(&self) -> AppResult<Vec<OutboxEvent>> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, event_type, payload, status, attempt_count,
                   next_retry_at, last_error, created_at, sent_at
            FROM outbox_events
            WHERE status IN ('pending', 'failed')
              AND (next_retry_at IS NULL OR next_retry_at <= NOW())
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(self.config.batch_size)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(event_from_row).collect()
    }

    async fn mark_sent(&self, event_id: Uuid) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE outbox_events
            SET status = 'sent', sent_at = NOW()
            WHERE id = $1 AND status <> 'sent'
            "#,
        )
        .bind(event_id)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn record_failure(
        &self,
        event_id: Uuid,
        attempt_count: i32,
        error: &str,
    ) -> AppResult<()> {
        let delay_secs = retry_delay_secs(
            attempt_count,
            self.config.retry_base_secs,
            self.config.retry_max_secs,
        );

        sqlx::query(
            r#"
            UPDATE outbox_events
            SET status = 'failed',
                attempt_count = $2,
                next_retry_at = NOW() + make_interval(secs => $3),
                last_error = $4
            WHERE id = $1 AND status <> 'sent'
            "#,
        )
        .bind(event_id)
        .bind(attempt_count)
        .bind(delay_secs as f64)
        .bind(error)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}
