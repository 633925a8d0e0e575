//! Best-effort usage tracking.
//!
//! Counts requests per API key in hourly windows. Tracking only: nothing is
//! ever limited or blocked here, and a failure must never change the
//! response it is observing. The write runs on a detached task with its own
//! failure domain; errors are logged and swallowed.

use uuid::Uuid;

use crate::db::DbPool;

/// Fire-and-forget increment for the key's current window.
pub fn record_usage(pool: DbPool, api_key_id: Uuid) {
    tokio::spawn(async move {
        if let Err(err) = increment_usage(&pool, api_key_id).await {
            tracing::warn!(%api_key_id, error = %err, "usage tracking failed");
        }
    });
}

/// Upsert the counter row for the key's current hourly window.
pub async fn increment_usage(pool: &DbPool, api_key_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO api_usage (api_key_id, window_start, count)
        VALUES ($1, date_trunc('hour', NOW()), 1)
        ON CONFLICT (api_key_id, window_start)
        DO UPDATE SET count = api_usage.count + 1
        "#,
    )
    .bind(api_key_id)
    .execute(pool)
    .await?;

    Ok(())
}
