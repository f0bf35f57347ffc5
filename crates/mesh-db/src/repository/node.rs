//! # Node State Repository
//!
//! Owns the `nodes` table: one mutable "latest known state" row per node.
//!
//! ## The Coalesce Merge
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     apply_update(node_id, update)                       │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │                                                                 │   │
//! │  │  1. INSERT INTO nodes (node_id, ...) ON CONFLICT DO NOTHING    │   │
//! │  │     (idempotent create; first_contact stamped exactly once)    │   │
//! │  │                                                                 │   │
//! │  │  2. UPDATE nodes SET                                           │   │
//! │  │       field = COALESCE(?, field), ...   ← None never clobbers  │   │
//! │  │       timestamp = ?,                                           │   │
//! │  │       synced = 0,                       ← mutation unsyncs     │   │
//! │  │       revision = revision + 1           ← guards mark_synced   │   │
//! │  │     WHERE node_id = ?                                          │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← A concurrent snapshot_all() sees all of the event's          │
//! │           fields (and the recomputed distance) or none of them.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `SET field = COALESCE(?, field)` is the whole presence contract in one
//! static statement: a `None` bind keeps the stored value, any `Some`
//! bind (including zero and false) overwrites it.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use mesh_core::{NodeRecord, NodeUpdate};

/// Repository for the per-node latest-state table.
#[derive(Debug, Clone)]
pub struct NodeRepository {
    pool: SqlitePool,
}

impl NodeRepository {
    /// Creates a new NodeRepository.
    pub fn new(pool: SqlitePool) -> Self {
        NodeRepository { pool }
    }

    /// Idempotent create-if-absent. The row is created with empty
    /// telemetry and `first_contact` stamped now; creating an existing id
    /// is a no-op insert.
    pub async fn ensure(&self, node_id: &str) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO nodes (node_id, timestamp, first_contact)
            VALUES (?, ?, ?)
            ON CONFLICT(node_id) DO NOTHING
            "#,
        )
        .bind(node_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Applies one event's field updates as a single atomic unit:
    /// create-if-absent, then field-wise coalesce. Every accepted
    /// mutation stamps `timestamp`, flips `synced` back to false, and
    /// bumps the revision counter.
    pub async fn apply_update(&self, node_id: &str, update: &NodeUpdate) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO nodes (node_id, timestamp, first_contact)
            VALUES (?, ?, ?)
            ON CONFLICT(node_id) DO NOTHING
            "#,
        )
        .bind(node_id)
        .bind(update.timestamp)
        .bind(update.timestamp)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE nodes SET
                short_name       = COALESCE(?, short_name),
                long_name        = COALESCE(?, long_name),
                to_node_id       = COALESCE(?, to_node_id),
                neighbor_node_id = COALESCE(?, neighbor_node_id),
                hardware_model   = COALESCE(?, hardware_model),
                mac_address      = COALESCE(?, mac_address),
                role             = COALESCE(?, role),
                public_key       = COALESCE(?, public_key),
                latitude         = COALESCE(?, latitude),
                longitude        = COALESCE(?, longitude),
                altitude         = COALESCE(?, altitude),
                sats_in_view     = COALESCE(?, sats_in_view),
                temperature      = COALESCE(?, temperature),
                humidity         = COALESCE(?, humidity),
                pressure         = COALESCE(?, pressure),
                battery_level    = COALESCE(?, battery_level),
                voltage          = COALESCE(?, voltage),
                uptime_seconds   = COALESCE(?, uptime_seconds),
                snr              = COALESCE(?, snr),
                miles_to_base    = COALESCE(?, miles_to_base),
                via_mqtt         = COALESCE(?, via_mqtt),
                timestamp        = ?,
                synced           = 0,
                revision         = revision + 1
            WHERE node_id = ?
            "#,
        )
        .bind(update.short_name.as_deref())
        .bind(update.long_name.as_deref())
        .bind(update.to_node_id.as_deref())
        .bind(update.neighbor_node_id.as_deref())
        .bind(update.hardware_model.as_deref())
        .bind(update.mac_address.as_deref())
        .bind(update.role.as_deref())
        .bind(update.public_key.as_deref())
        .bind(update.latitude)
        .bind(update.longitude)
        .bind(update.altitude)
        .bind(update.sats_in_view)
        .bind(update.temperature)
        .bind(update.humidity)
        .bind(update.pressure)
        .bind(update.battery_level)
        .bind(update.voltage)
        .bind(update.uptime_seconds)
        .bind(update.snr)
        .bind(update.miles_to_base)
        .bind(update.via_mqtt)
        .bind(update.timestamp)
        .bind(node_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(node_id, "Applied node update");
        Ok(())
    }

    /// Fetches one node, if present.
    pub async fn get(&self, node_id: &str) -> DbResult<Option<NodeRecord>> {
        let record = sqlx::query_as::<_, NodeRecord>("SELECT * FROM nodes WHERE node_id = ?")
            .bind(node_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    /// Consistent read of the full latest-state table, ordered by
    /// `node_id`. Never observes a partially-applied event.
    pub async fn snapshot_all(&self) -> DbResult<Vec<NodeRecord>> {
        let records = sqlx::query_as::<_, NodeRecord>("SELECT * FROM nodes ORDER BY node_id")
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    /// Rows that have been mutated since their last confirmed export.
    pub async fn unsynced(&self) -> DbResult<Vec<NodeRecord>> {
        let records =
            sqlx::query_as::<_, NodeRecord>("SELECT * FROM nodes WHERE synced = 0 ORDER BY node_id")
                .fetch_all(&self.pool)
                .await?;

        Ok(records)
    }

    /// Marks exactly the given snapshot rows as synced, revision-guarded:
    /// a row mutated after the snapshot was taken has a newer revision and
    /// is left untouched, so it stays in the next export batch.
    ///
    /// Returns how many rows were actually marked.
    pub async fn mark_synced(&self, snapshot: &[NodeRecord]) -> DbResult<usize> {
        let mut tx = self.pool.begin().await?;
        let mut marked = 0usize;

        for record in snapshot {
            let result =
                sqlx::query("UPDATE nodes SET synced = 1 WHERE node_id = ? AND revision = ?")
                    .bind(&record.node_id)
                    .bind(record.revision)
                    .execute(&mut *tx)
                    .await?;
            marked += result.rows_affected() as usize;
        }

        tx.commit().await?;

        debug!(requested = snapshot.len(), marked, "Marked nodes synced");
        Ok(marked)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn update_with(f: impl FnOnce(&mut NodeUpdate)) -> NodeUpdate {
        let mut update = NodeUpdate::new(Utc::now());
        f(&mut update);
        update
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let db = db().await;
        let nodes = db.nodes();

        nodes.ensure("!a1b2c3d4").await.unwrap();
        let first = nodes.get("!a1b2c3d4").await.unwrap().unwrap();

        nodes.ensure("!a1b2c3d4").await.unwrap();
        let second = nodes.get("!a1b2c3d4").await.unwrap().unwrap();

        assert_eq!(db.nodes().snapshot_all().await.unwrap().len(), 1);
        assert_eq!(first.first_contact, second.first_contact);
    }

    #[tokio::test]
    async fn test_coalesce_preserves_omitted_fields() {
        let db = db().await;
        let nodes = db.nodes();

        nodes
            .apply_update(
                "!node",
                &update_with(|u| {
                    u.short_name = Some("RDG1".to_string());
                    u.temperature = Some(21.5);
                }),
            )
            .await
            .unwrap();

        // second event omits both fields entirely
        nodes
            .apply_update("!node", &update_with(|u| u.battery_level = Some(55.0)))
            .await
            .unwrap();

        let record = nodes.get("!node").await.unwrap().unwrap();
        assert_eq!(record.short_name.as_deref(), Some("RDG1"));
        assert_eq!(record.temperature, Some(21.5));
        assert_eq!(record.battery_level, Some(55.0));
    }

    #[tokio::test]
    async fn test_zero_is_a_present_value() {
        let db = db().await;
        let nodes = db.nodes();

        nodes
            .apply_update("!node", &update_with(|u| u.battery_level = Some(55.0)))
            .await
            .unwrap();
        nodes
            .apply_update("!node", &update_with(|u| u.battery_level = Some(0.0)))
            .await
            .unwrap();

        let record = nodes.get("!node").await.unwrap().unwrap();
        assert_eq!(record.battery_level, Some(0.0));
    }

    #[tokio::test]
    async fn test_last_writer_wins_per_field() {
        let db = db().await;
        let nodes = db.nodes();

        for snr in [8.5, -3.25, 12.0] {
            nodes
                .apply_update("!node", &update_with(|u| u.snr = Some(snr)))
                .await
                .unwrap();
        }

        let record = nodes.get("!node").await.unwrap().unwrap();
        assert_eq!(record.snr, Some(12.0));
    }

    #[tokio::test]
    async fn test_mutation_flips_synced_false() {
        let db = db().await;
        let nodes = db.nodes();

        nodes
            .apply_update("!node", &update_with(|u| u.voltage = Some(3.7)))
            .await
            .unwrap();

        let snapshot = nodes.unsynced().await.unwrap();
        assert_eq!(nodes.mark_synced(&snapshot).await.unwrap(), 1);
        assert!(nodes.get("!node").await.unwrap().unwrap().synced);

        nodes
            .apply_update("!node", &update_with(|u| u.voltage = Some(3.6)))
            .await
            .unwrap();
        assert!(!nodes.get("!node").await.unwrap().unwrap().synced);
    }

    #[tokio::test]
    async fn test_mark_synced_skips_rows_mutated_after_snapshot() {
        let db = db().await;
        let nodes = db.nodes();

        nodes
            .apply_update("!x", &update_with(|u| u.humidity = Some(40.0)))
            .await
            .unwrap();

        // export snapshot taken here...
        let snapshot = nodes.unsynced().await.unwrap();
        assert_eq!(snapshot.len(), 1);

        // ...then the reconciler writes again before mark_synced runs
        nodes
            .apply_update("!x", &update_with(|u| u.humidity = Some(41.0)))
            .await
            .unwrap();

        assert_eq!(nodes.mark_synced(&snapshot).await.unwrap(), 0);
        let record = nodes.get("!x").await.unwrap().unwrap();
        assert!(!record.synced, "interleaved write must stay unsynced");
    }

    #[tokio::test]
    async fn test_mark_synced_scoped_to_given_ids() {
        let db = db().await;
        let nodes = db.nodes();

        nodes
            .apply_update("!a", &update_with(|u| u.pressure = Some(1013.25)))
            .await
            .unwrap();
        nodes
            .apply_update("!b", &update_with(|u| u.pressure = Some(1008.0)))
            .await
            .unwrap();

        let snapshot: Vec<_> = nodes
            .unsynced()
            .await
            .unwrap()
            .into_iter()
            .filter(|r| r.node_id == "!a")
            .collect();

        nodes.mark_synced(&snapshot).await.unwrap();

        assert!(nodes.get("!a").await.unwrap().unwrap().synced);
        assert!(!nodes.get("!b").await.unwrap().unwrap().synced);
    }

    #[tokio::test]
    async fn test_first_contact_immutable_across_updates() {
        let db = db().await;
        let nodes = db.nodes();

        nodes
            .apply_update("!node", &update_with(|u| u.temperature = Some(20.0)))
            .await
            .unwrap();
        let created = nodes.get("!node").await.unwrap().unwrap();

        nodes
            .apply_update("!node", &update_with(|u| u.temperature = Some(25.0)))
            .await
            .unwrap();
        let updated = nodes.get("!node").await.unwrap().unwrap();

        assert_eq!(created.first_contact, updated.first_contact);
        assert!(updated.revision > created.revision);
    }
}
