// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic JSON document writes.
//!
//! Write to a temp file, fsync, rename over the target. Readers never see a
//! partially written document; concurrent tick processes at worst overwrite
//! each other whole-file, which the idempotent tick tolerates.

use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Serialize `value` to pretty JSON and atomically replace `path`.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), std::io::Error> {
    let parent = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent)?;

    let tmp_path = path.with_extension("tmp");
    let data = serde_json::to_vec_pretty(value)?;
    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(&data)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "json_tests.rs"]
mod tests;
