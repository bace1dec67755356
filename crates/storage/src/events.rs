// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline audit-log operations.

use crate::db::ms_to_datetime;
use crate::{EventStore, StoreError};
use chrono::Utc;
use factory_core::PipelineEvent;
use rusqlite::{params, Row};

fn row_to_pipeline_event(row: &Row<'_>) -> rusqlite::Result<PipelineEvent> {
    let ts_ms: i64 = row.get("timestamp")?;
    Ok(PipelineEvent {
        issue: row.get::<_, i64>("issue")? as u64,
        event: row.get("event")?,
        stage: row.get("stage")?,
        attempt: row.get("attempt")?,
        detail: row.get("detail")?,
        timestamp: ms_to_datetime(ts_ms),
    })
}

impl EventStore {
    /// Append a pipeline audit event.
    pub fn log_pipeline_event(
        &self,
        issue: u64,
        event: &str,
        stage: Option<&str>,
        attempt: Option<u32>,
        detail: Option<&str>,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO pipeline_events (issue, event, stage, attempt, detail, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                issue as i64,
                event,
                stage,
                attempt,
                detail,
                Utc::now().timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    /// Audit history for an issue, oldest first.
    pub fn get_pipeline_history(&self, issue: u64) -> Result<Vec<PipelineEvent>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT * FROM pipeline_events WHERE issue = ?1 ORDER BY id")?;
        let events = stmt
            .query_map(params![issue as i64], row_to_pipeline_event)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }
}
