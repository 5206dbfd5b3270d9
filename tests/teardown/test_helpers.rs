//! Shared fixtures and helpers for teardown BDD scenarios.

use buildbox::test_support::{CallKind, CloudCall, FakeCloud, fast_polls};
use buildbox::{TeardownError, TeardownOrchestrator, TeardownSummary};
use rstest::fixture;

#[derive(Clone, Debug)]
pub enum TeardownOutcome {
    Success(TeardownSummary),
    Failure(TeardownError),
}

#[derive(Clone, Debug)]
pub struct TeardownContext {
    pub fake: FakeCloud,
    pub lingering_lists: usize,
    pub outcome: Option<TeardownOutcome>,
}

impl TeardownContext {
    pub fn orchestrator(&self) -> TeardownOrchestrator<FakeCloud> {
        TeardownOrchestrator::new(self.fake.clone()).with_poll_settings(fast_polls())
    }
}

#[fixture]
pub fn teardown_context() -> TeardownContext {
    TeardownContext {
        fake: FakeCloud::new(),
        lingering_lists: 0,
        outcome: None,
    }
}

/// Position of the first call of `kind`, if any.
pub fn first_call(calls: &[CloudCall], kind: CallKind) -> Option<usize> {
    calls.iter().position(|call| call.kind == kind)
}

/// Position of the last call of `kind`, if any.
pub fn last_call(calls: &[CloudCall], kind: CallKind) -> Option<usize> {
    calls.iter().rposition(|call| call.kind == kind)
}
