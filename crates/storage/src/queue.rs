// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Issue queue operations.

use crate::db::ms_to_datetime;
use crate::{EventStore, StoreError};
use chrono::Utc;
use factory_core::{QueueEntry, QueueItem, QueueStatus};
use rusqlite::{params, OptionalExtension, Row};

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<QueueEntry> {
    let status_str: String = row.get("status")?;
    let status = QueueStatus::parse(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("unknown queue status: {status_str}").into(),
        )
    })?;
    let depends_json: String = row.get("depends_on")?;
    let depends_on: Vec<u64> = serde_json::from_str(&depends_json).unwrap_or_default();
    Ok(QueueEntry {
        issue: row.get::<_, i64>("issue")? as u64,
        position: row.get("position")?,
        status,
        feature_intent: row.get("feature_intent")?,
        depends_on,
        queued_at: ms_to_datetime(row.get("queued_at")?),
        started_at: row.get::<_, Option<i64>>("started_at")?.map(ms_to_datetime),
        finished_at: row
            .get::<_, Option<i64>>("finished_at")?
            .map(ms_to_datetime),
    })
}

impl EventStore {
    /// Queue issues atomically. Any duplicate issue fails the whole batch.
    pub fn queue_add(&self, items: &[QueueItem]) -> Result<(), StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut next_position: i64 = tx.query_row(
                "SELECT COALESCE(MAX(position), 0) + 1 FROM queue",
                [],
                |row| row.get(0),
            )?;

            for item in items {
                let exists: i64 = tx.query_row(
                    "SELECT COUNT(*) FROM queue WHERE issue = ?1",
                    params![item.issue as i64],
                    |row| row.get(0),
                )?;
                if exists > 0 {
                    return Err(StoreError::DuplicateQueued(item.issue));
                }
                tx.execute(
                    "INSERT INTO queue
                        (issue, position, status, feature_intent, depends_on, queued_at)
                     VALUES (?1, ?2, 'pending', ?3, ?4, ?5)",
                    params![
                        item.issue as i64,
                        next_position,
                        item.feature_intent,
                        serde_json::to_string(&item.depends_on)?,
                        Utc::now().timestamp_millis(),
                    ],
                )?;
                next_position += 1;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// First pending entry by position, if any.
    pub fn queue_next(&self) -> Result<Option<QueueEntry>, StoreError> {
        let conn = self.conn.lock();
        let entry = conn
            .query_row(
                "SELECT * FROM queue WHERE status = 'pending' ORDER BY position LIMIT 1",
                [],
                row_to_entry,
            )
            .optional()?;
        Ok(entry)
    }

    /// Update a queue row's status, stamping started_at/finished_at.
    pub fn queue_update_status(
        &self,
        issue: u64,
        status: QueueStatus,
    ) -> Result<(), StoreError> {
        let now = Utc::now().timestamp_millis();
        let conn = self.conn.lock();
        let changed = match status {
            QueueStatus::Active => conn.execute(
                "UPDATE queue SET status = ?1, started_at = ?2 WHERE issue = ?3",
                params![status.as_str(), now, issue as i64],
            )?,
            QueueStatus::Completed | QueueStatus::Failed => conn.execute(
                "UPDATE queue SET status = ?1, finished_at = ?2 WHERE issue = ?3",
                params![status.as_str(), now, issue as i64],
            )?,
            QueueStatus::Pending => conn.execute(
                "UPDATE queue SET status = ?1 WHERE issue = ?2",
                params![status.as_str(), issue as i64],
            )?,
        };
        if changed == 0 {
            return Err(StoreError::NotQueued(issue));
        }
        Ok(())
    }

    /// All queue rows ordered by position.
    pub fn queue_list(&self) -> Result<Vec<QueueEntry>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT * FROM queue ORDER BY position")?;
        let entries = stmt
            .query_map([], row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Remove a single queue row.
    pub fn queue_remove(&self, issue: u64) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM queue WHERE issue = ?1", params![issue as i64])?;
        if changed == 0 {
            return Err(StoreError::NotQueued(issue));
        }
        Ok(())
    }

    /// Remove every queue row.
    pub fn queue_clear(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM queue", [])?;
        Ok(())
    }

    /// Set the feature intent on a queued issue.
    pub fn queue_set_intent(&self, issue: u64, intent: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE queue SET feature_intent = ?1 WHERE issue = ?2",
            params![intent, issue as i64],
        )?;
        if changed == 0 {
            return Err(StoreError::NotQueued(issue));
        }
        Ok(())
    }

    /// Queue entries that declare a dependency on the given issue.
    pub fn queue_dependents(&self, issue: u64) -> Result<Vec<QueueEntry>, StoreError> {
        // depends_on is a JSON list; filter in memory rather than relying on
        // SQLite JSON functions being compiled in.
        Ok(self
            .queue_list()?
            .into_iter()
            .filter(|entry| entry.depends_on.contains(&issue))
            .collect())
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
