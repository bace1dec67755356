// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI output: human text or JSON lines.

use factory_core::TickAction;
use factory_engine::AdvanceResult;
use serde::Serialize;

pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    pub fn advance_result(&self, result: &AdvanceResult) {
        if self.json {
            self.json_line(result);
        } else {
            println!(
                "#{} {:?} at {}{}",
                result.issue,
                result.action,
                result.stage,
                if result.message.is_empty() {
                    String::new()
                } else {
                    format!(": {}", result.message)
                }
            );
        }
    }

    pub fn tick_actions(&self, actions: &[TickAction]) {
        if actions.is_empty() {
            if !self.json {
                println!("nothing to do");
            }
            return;
        }
        for action in actions {
            if self.json {
                self.json_line(action);
            } else {
                println!("{action}");
            }
        }
    }

    pub fn json_line<T: Serialize>(&self, value: &T) {
        match serde_json::to_string(value) {
            Ok(line) => println!("{line}"),
            Err(e) => eprintln!("serialization error: {e}"),
        }
    }

    pub fn line(&self, text: &str) {
        if !self.json {
            println!("{text}");
        }
    }
}
