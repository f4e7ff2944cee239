use chrono::{Duration, SecondsFormat, Utc};
use sqlx::Row;
use uuid::Uuid;

use concierge_core::domain::request::PendingRequest;

use super::{RepositoryError, RequestQueue};
use crate::DbPool;

/// One claimed queue delivery. The receipt handle is only valid until the
/// message becomes visible again; deleting with a stale handle fails.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub message_id: String,
    pub receipt_handle: String,
    pub body: String,
    pub receive_count: u32,
}

impl ReceivedMessage {
    pub fn parse_request(&self) -> Result<PendingRequest, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

pub struct SqlRequestQueue {
    pool: DbPool,
    visibility_timeout: Duration,
}

impl SqlRequestQueue {
    pub fn new(pool: DbPool, visibility_timeout_secs: u64) -> Self {
        Self {
            pool,
            visibility_timeout: Duration::seconds(visibility_timeout_secs.min(i64::MAX as u64) as i64),
        }
    }
}

// Timestamps are compared as text, so every write must use the same fixed
// precision.
fn format_ts(value: chrono::DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[async_trait::async_trait]
impl RequestQueue for SqlRequestQueue {
    async fn enqueue(&self, request: &PendingRequest) -> Result<String, RepositoryError> {
        let message_id = Uuid::new_v4().to_string();
        let now = format_ts(Utc::now());
        let body = serde_json::to_string(request)?;

        sqlx::query(
            "INSERT INTO request_queue (id, body_json, enqueued_at, visible_at, receive_count)
             VALUES (?, ?, ?, ?, 0)",
        )
        .bind(&message_id)
        .bind(&body)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(message_id)
    }

    async fn receive_batch(
        &self,
        max_messages: u32,
    ) -> Result<Vec<ReceivedMessage>, RepositoryError> {
        let now = Utc::now();
        let now_text = format_ts(now);

        let candidates = sqlx::query(
            "SELECT id, body_json, receive_count
             FROM request_queue
             WHERE visible_at <= ?
             ORDER BY enqueued_at ASC
             LIMIT ?",
        )
        .bind(&now_text)
        .bind(i64::from(max_messages))
        .fetch_all(&self.pool)
        .await?;

        let hidden_until = format_ts(now + self.visibility_timeout);
        let mut received = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let message_id = candidate.try_get::<String, _>("id")?;
            let receipt_handle = Uuid::new_v4().to_string();

            // Conditional claim: another drain racing on the same queue may
            // have claimed the row since the select above.
            let claimed = sqlx::query(
                "UPDATE request_queue
                 SET visible_at = ?, receipt_handle = ?, receive_count = receive_count + 1
                 WHERE id = ? AND visible_at <= ?",
            )
            .bind(&hidden_until)
            .bind(&receipt_handle)
            .bind(&message_id)
            .bind(&now_text)
            .execute(&self.pool)
            .await?;

            if claimed.rows_affected() == 0 {
                continue;
            }

            let prior_count = candidate.try_get::<i64, _>("receive_count")?;
            let receive_count = u32::try_from(prior_count + 1).map_err(|_| {
                RepositoryError::Decode(format!(
                    "invalid receive_count for message `{message_id}`: {prior_count}"
                ))
            })?;

            received.push(ReceivedMessage {
                message_id,
                receipt_handle,
                body: candidate.try_get("body_json")?,
                receive_count,
            });
        }

        Ok(received)
    }

    async fn delete(&self, receipt_handle: &str) -> Result<bool, RepositoryError> {
        let deleted = sqlx::query("DELETE FROM request_queue WHERE receipt_handle = ?")
            .bind(receipt_handle)
            .execute(&self.pool)
            .await?;

        Ok(deleted.rows_affected() > 0)
    }
}
