// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Feature-intent derivation.
//!
//! Queued issues need a one-sentence feature intent before a pipeline may
//! start. When the queue row has none, the tick asks the model to derive it
//! from the issue metadata; `NO_INTENT` means the issue is not actionable.

use crate::EngineError;
use async_trait::async_trait;
use factory_adapters::PrintRunner;
use factory_core::Issue;
use std::path::PathBuf;

/// Sentinel the model prints when no intent can be derived.
const NO_INTENT: &str = "NO_INTENT";

/// Derives a feature intent from issue metadata.
///
/// Object-safe so the orchestrator can hold `Arc<dyn IntentModel>`.
#[async_trait]
pub trait IntentModel: Send + Sync {
    /// Returns `None` when the model declines (`NO_INTENT`).
    async fn derive_intent(&self, issue: &Issue) -> Result<Option<String>, EngineError>;
}

/// Intent derivation via the agent's print mode.
#[derive(Clone)]
pub struct PrintIntentModel<R: PrintRunner> {
    runner: R,
    cwd: PathBuf,
}

impl<R: PrintRunner> PrintIntentModel<R> {
    pub fn new(runner: R, cwd: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            cwd: cwd.into(),
        }
    }
}

#[async_trait]
impl<R: PrintRunner> IntentModel for PrintIntentModel<R> {
    async fn derive_intent(&self, issue: &Issue) -> Result<Option<String>, EngineError> {
        let prompt = format!(
            "State in one sentence the user-facing feature delivered by this issue.\n\
             If the issue is not actionable, answer exactly {NO_INTENT}.\n\n\
             Issue #{}: {}\n\n{}",
            issue.number, issue.title, issue.body
        );
        let output = self.runner.run_print(&prompt, &self.cwd).await?;
        let answer = output.trim();
        if answer.is_empty() || answer.contains(NO_INTENT) {
            return Ok(None);
        }
        // Keep the last non-empty line; print mode may echo progress above it
        Ok(answer
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(String::from))
    }
}

/// Scripted intent model for tests.
#[cfg(any(test, feature = "test-support"))]
#[derive(Clone, Default)]
pub struct FakeIntentModel {
    intent: std::sync::Arc<parking_lot::Mutex<Option<String>>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeIntentModel {
    /// A model that always derives the given intent.
    pub fn with_intent(intent: impl Into<String>) -> Self {
        Self {
            intent: std::sync::Arc::new(parking_lot::Mutex::new(Some(intent.into()))),
        }
    }

    /// A model that always answers NO_INTENT.
    pub fn declining() -> Self {
        Self::default()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl IntentModel for FakeIntentModel {
    async fn derive_intent(&self, _issue: &Issue) -> Result<Option<String>, EngineError> {
        Ok(self.intent.lock().clone())
    }
}

#[cfg(test)]
#[path = "intent_tests.rs"]
mod tests;
