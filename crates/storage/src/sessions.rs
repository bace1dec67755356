// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session event log operations.

use crate::db::ms_to_datetime;
use crate::{EventStore, StoreError};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use factory_core::session::FACTORY_SEND_ATTRIBUTION_MS;
use factory_core::{SessionEvent, SessionEventKind};
use rusqlite::{params, OptionalExtension, Row};
use std::time::Duration;

fn row_to_event(row: &Row<'_>) -> rusqlite::Result<SessionEvent> {
    let kind_str: String = row.get("event")?;
    let kind = SessionEventKind::parse(&kind_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("unknown session event kind: {kind_str}").into(),
        )
    })?;
    let ts_ms: i64 = row.get("timestamp")?;
    Ok(SessionEvent {
        session_id: row.get("session_id")?,
        issue: row.get::<_, i64>("issue")? as u64,
        stage: row.get("stage")?,
        event: kind,
        exit_code: row.get("exit_code")?,
        timestamp: ms_to_datetime(ts_ms),
        metadata: row.get("metadata")?,
    })
}

impl EventStore {
    /// Append a session lifecycle event.
    pub fn log_session_event(
        &self,
        session: &str,
        issue: u64,
        stage: &str,
        event: SessionEventKind,
        exit_code: Option<i32>,
        metadata: Option<&str>,
    ) -> Result<(), StoreError> {
        self.log_session_event_at(session, issue, stage, event, exit_code, metadata, Utc::now())
    }

    /// Append with an explicit timestamp (tests and replays).
    #[allow(clippy::too_many_arguments)]
    pub fn log_session_event_at(
        &self,
        session: &str,
        issue: u64,
        stage: &str,
        event: SessionEventKind,
        exit_code: Option<i32>,
        metadata: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO session_events
                (session_id, issue, stage, event, exit_code, timestamp, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                session,
                issue as i64,
                stage,
                event.as_str(),
                exit_code,
                at.timestamp_millis(),
                metadata,
            ],
        )?;
        Ok(())
    }

    /// Latest event for a session, or None if the session was never seen.
    pub fn get_session_state(&self, session: &str) -> Result<Option<SessionEvent>, StoreError> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT * FROM session_events WHERE session_id = ?1
                 ORDER BY timestamp DESC, id DESC LIMIT 1",
                params![session],
                row_to_event,
            )
            .optional()?;
        Ok(row)
    }

    /// Timestamp of the session's `started` event.
    ///
    /// Timeouts are measured from here so that later steers and sends do not
    /// extend the deadline.
    pub fn get_session_started_at(
        &self,
        session: &str,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        let conn = self.conn.lock();
        let ts: Option<i64> = conn
            .query_row(
                "SELECT timestamp FROM session_events
                 WHERE session_id = ?1 AND event = 'started'
                 ORDER BY id LIMIT 1",
                params![session],
                |row| row.get(0),
            )
            .optional()?;
        Ok(ts.map(ms_to_datetime))
    }

    /// Latest event per session, excluding sessions that have exited.
    pub fn get_all_active_sessions(&self) -> Result<Vec<SessionEvent>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT s.* FROM session_events s
             JOIN (SELECT session_id, MAX(id) AS max_id
                   FROM session_events GROUP BY session_id) m
               ON s.id = m.max_id
             WHERE s.event != 'exited'
             ORDER BY s.session_id",
        )?;
        let events = stmt
            .query_map([], row_to_event)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }

    /// True iff the latest `active` event has no `factory_send` within the
    /// preceding attribution window (a send at exactly the window boundary
    /// still counts as orchestrator-sent).
    pub fn detect_human_intervention(&self, session: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        let active_ts: Option<i64> = conn
            .query_row(
                "SELECT timestamp FROM session_events
                 WHERE session_id = ?1 AND event = 'active'
                 ORDER BY timestamp DESC, id DESC LIMIT 1",
                params![session],
                |row| row.get(0),
            )
            .optional()?;

        let Some(active_ts) = active_ts else {
            return Ok(false);
        };

        let sent: i64 = conn.query_row(
            "SELECT COUNT(*) FROM session_events
             WHERE session_id = ?1 AND event = 'factory_send'
               AND timestamp <= ?2 AND timestamp >= ?3",
            params![session, active_ts, active_ts - FACTORY_SEND_ATTRIBUTION_MS],
            |row| row.get(0),
        )?;

        Ok(sent == 0)
    }

    /// Whether a steer was logged for the session within the window.
    pub fn has_recent_steer(&self, session: &str, window: Duration) -> Result<bool, StoreError> {
        self.has_recent_steer_at(session, window, Utc::now())
    }

    /// Steer check against an explicit "now" (tests).
    pub fn has_recent_steer_at(
        &self,
        session: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let cutoff = now
            - ChronoDuration::milliseconds(window.as_millis().min(i64::MAX as u128) as i64);
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM session_events
             WHERE session_id = ?1 AND event = 'steer' AND timestamp >= ?2",
            params![session, cutoff.timestamp_millis()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
