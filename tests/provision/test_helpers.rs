//! Shared fixtures for provision BDD scenarios.

use std::time::Duration;

use buildbox::test_support::{FakeCloud, fast_polls};
use buildbox::{PollSettings, ProvisionError, ProvisionOrchestrator, ProvisionOutcome};
use rstest::fixture;

/// Poll settings for scenarios that expect a wait to give up quickly.
pub const IMPATIENT_POLLS: PollSettings = PollSettings {
    interval: Duration::from_millis(1),
    timeout: Duration::from_millis(10),
};

#[derive(Clone, Debug)]
pub enum ProvisionResult {
    Success(ProvisionOutcome),
    Failure(ProvisionError),
}

#[derive(Clone, Debug)]
pub struct ProvisionContext {
    pub fake: FakeCloud,
    pub poll_settings: PollSettings,
    pub outcome: Option<ProvisionResult>,
}

impl ProvisionContext {
    pub fn orchestrator(&self) -> ProvisionOrchestrator<FakeCloud> {
        ProvisionOrchestrator::new(self.fake.clone())
            .with_poll_settings(self.poll_settings)
            .with_propagation_delay(Duration::ZERO)
    }
}

#[fixture]
pub fn provision_context() -> ProvisionContext {
    ProvisionContext {
        fake: FakeCloud::new(),
        poll_settings: fast_polls(),
        outcome: None,
    }
}
