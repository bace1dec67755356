// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Check-run log operations.

use crate::db::ms_to_datetime;
use crate::{EventStore, StoreError};
use factory_core::check::CheckRun;
use rusqlite::{params, OptionalExtension, Row};

fn row_to_check(row: &Row<'_>) -> rusqlite::Result<CheckRun> {
    let ts_ms: i64 = row.get("timestamp")?;
    Ok(CheckRun {
        issue: row.get::<_, i64>("issue")? as u64,
        stage: row.get("stage")?,
        attempt: row.get("attempt")?,
        fix_round: row.get("fix_round")?,
        check_name: row.get("check_name")?,
        passed: row.get("passed")?,
        auto_fixed: row.get("auto_fixed")?,
        exit_code: row.get("exit_code")?,
        duration_ms: row.get::<_, i64>("duration_ms")? as u64,
        summary: row.get("summary")?,
        findings: row.get("findings")?,
        timestamp: ms_to_datetime(ts_ms),
    })
}

impl EventStore {
    /// Append a check-run row.
    pub fn log_check_run(&self, run: &CheckRun) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO check_runs
                (issue, stage, attempt, fix_round, check_name, passed,
                 auto_fixed, exit_code, duration_ms, summary, findings, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                run.issue as i64,
                run.stage,
                run.attempt,
                run.fix_round,
                run.check_name,
                run.passed,
                run.auto_fixed,
                run.exit_code,
                run.duration_ms as i64,
                run.summary,
                run.findings,
                run.timestamp.timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    /// All check runs for one fix round of a stage, in execution order.
    pub fn get_check_runs(
        &self,
        issue: u64,
        stage: &str,
        fix_round: u32,
    ) -> Result<Vec<CheckRun>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT * FROM check_runs
             WHERE issue = ?1 AND stage = ?2 AND fix_round = ?3
             ORDER BY id",
        )?;
        let runs = stmt
            .query_map(params![issue as i64, stage, fix_round], row_to_check)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }

    /// Most recent run of a named check within a stage.
    pub fn get_latest_check_run(
        &self,
        issue: u64,
        stage: &str,
        check_name: &str,
    ) -> Result<Option<CheckRun>, StoreError> {
        let conn = self.conn.lock();
        let run = conn
            .query_row(
                "SELECT * FROM check_runs
                 WHERE issue = ?1 AND stage = ?2 AND check_name = ?3
                 ORDER BY id DESC LIMIT 1",
                params![issue as i64, stage, check_name],
                row_to_check,
            )
            .optional()?;
        Ok(run)
    }

    /// Latest run per check name within a stage, filtered to failures.
    pub fn get_latest_failed_checks(
        &self,
        issue: u64,
        stage: &str,
    ) -> Result<Vec<CheckRun>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT c.* FROM check_runs c
             JOIN (SELECT check_name, MAX(id) AS max_id FROM check_runs
                   WHERE issue = ?1 AND stage = ?2 GROUP BY check_name) m
               ON c.id = m.max_id
             WHERE c.passed = 0
             ORDER BY c.check_name",
        )?;
        let runs = stmt
            .query_map(params![issue as i64, stage], row_to_check)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }

    /// Full check history for an issue, oldest first.
    pub fn get_check_history(&self, issue: u64) -> Result<Vec<CheckRun>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT * FROM check_runs WHERE issue = ?1 ORDER BY id")?;
        let runs = stmt
            .query_map(params![issue as i64], row_to_check)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }
}

#[cfg(test)]
#[path = "checks_tests.rs"]
mod tests;
