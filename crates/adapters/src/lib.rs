// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! factory-adapters: narrow interfaces to the outside world
//!
//! Every external dependency of the orchestrator lives behind a trait here:
//! the terminal multiplexer, the code-hosting service, git worktrees, the
//! coding agent's print mode, and desktop notifications. Each trait has a
//! production implementation that shells out and a `Fake` used by engine
//! tests (behind the `test-support` feature).

pub mod agent;
pub mod host;
pub mod notify;
pub mod session;
pub mod subprocess;
pub mod worktree;

pub use agent::{AgentError, ClaudePrintRunner, PrintRunner};
pub use host::{GhHostAdapter, HostAdapter, HostError, PrOptions};
pub use notify::{DesktopNotifyAdapter, NoOpNotifyAdapter, NotifyAdapter, NotifyError};
pub use session::{SessionAdapter, SessionError, TmuxAdapter};
pub use subprocess::run_with_timeout;
pub use worktree::{GitWorktreeAdapter, WorktreeAdapter, WorktreeError};

#[cfg(any(test, feature = "test-support"))]
pub use agent::FakePrintRunner;
#[cfg(any(test, feature = "test-support"))]
pub use host::FakeHostAdapter;
#[cfg(any(test, feature = "test-support"))]
pub use notify::FakeNotifyAdapter;
#[cfg(any(test, feature = "test-support"))]
pub use session::FakeSessionAdapter;
#[cfg(any(test, feature = "test-support"))]
pub use worktree::FakeWorktreeAdapter;
