//! # Trend Log Repository
//!
//! Owns the append-only `trend` table: one immutable sample per accepted
//! event that carried telemetry. The write path never updates or deletes
//! rows here; pruning old history is an administrative job outside the
//! collector.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use mesh_core::{NodeUpdate, TrendRecord};

/// Repository for historical telemetry samples.
#[derive(Debug, Clone)]
pub struct TrendRepository {
    pool: SqlitePool,
}

impl TrendRepository {
    /// Creates a new TrendRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TrendRepository { pool }
    }

    /// Appends one sample capturing the normalized values an event
    /// carried. Absent fields stay NULL in the sample.
    pub async fn append(&self, node_id: &str, update: &NodeUpdate) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO trend (
                node_id, timestamp,
                temperature, humidity, pressure,
                battery_level, voltage, uptime_seconds,
                latitude, longitude, altitude, sats_in_view, snr
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(node_id)
        .bind(update.timestamp)
        .bind(update.temperature)
        .bind(update.humidity)
        .bind(update.pressure)
        .bind(update.battery_level)
        .bind(update.voltage)
        .bind(update.uptime_seconds)
        .bind(update.latitude)
        .bind(update.longitude)
        .bind(update.altitude)
        .bind(update.sats_in_view)
        .bind(update.snr)
        .execute(&self.pool)
        .await?;

        debug!(node_id, "Appended trend sample");
        Ok(())
    }

    /// Returns one node's samples, newest first, optionally bounded to
    /// samples at or after `since`. `None` returns all history.
    pub async fn history(
        &self,
        node_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<TrendRecord>> {
        let records = match since {
            Some(cutoff) => {
                sqlx::query_as::<_, TrendRecord>(
                    r#"
                    SELECT * FROM trend
                    WHERE node_id = ? AND timestamp >= ?
                    ORDER BY timestamp DESC
                    "#,
                )
                .bind(node_id)
                .bind(cutoff)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, TrendRecord>(
                    "SELECT * FROM trend WHERE node_id = ? ORDER BY timestamp DESC",
                )
                .bind(node_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(records)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn sample(at: DateTime<Utc>, temperature: f64) -> NodeUpdate {
        let mut update = NodeUpdate::new(at);
        update.temperature = Some(temperature);
        update
    }

    #[tokio::test]
    async fn test_append_accumulates_history() {
        let db = db().await;
        let trend = db.trend();
        let now = Utc::now();

        trend.append("!node", &sample(now - Duration::minutes(2), 20.0)).await.unwrap();
        trend.append("!node", &sample(now - Duration::minutes(1), 21.0)).await.unwrap();
        trend.append("!node", &sample(now, 22.0)).await.unwrap();

        let history = trend.history("!node", None).await.unwrap();
        assert_eq!(history.len(), 3);
    }

    #[tokio::test]
    async fn test_history_is_newest_first() {
        let db = db().await;
        let trend = db.trend();
        let now = Utc::now();

        trend.append("!node", &sample(now - Duration::hours(1), 18.0)).await.unwrap();
        trend.append("!node", &sample(now, 19.0)).await.unwrap();

        let history = trend.history("!node", None).await.unwrap();
        assert_eq!(history[0].temperature, Some(19.0));
        assert_eq!(history[1].temperature, Some(18.0));
    }

    #[tokio::test]
    async fn test_history_window_filters_old_samples() {
        let db = db().await;
        let trend = db.trend();
        let now = Utc::now();

        trend.append("!node", &sample(now - Duration::days(10), 10.0)).await.unwrap();
        trend.append("!node", &sample(now - Duration::days(1), 15.0)).await.unwrap();

        let history = trend
            .history("!node", Some(now - Duration::days(3)))
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].temperature, Some(15.0));
    }

    #[tokio::test]
    async fn test_history_scoped_per_node() {
        let db = db().await;
        let trend = db.trend();
        let now = Utc::now();

        trend.append("!a", &sample(now, 1.0)).await.unwrap();
        trend.append("!b", &sample(now, 2.0)).await.unwrap();

        let history = trend.history("!a", None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].node_id, "!a");
    }
}
