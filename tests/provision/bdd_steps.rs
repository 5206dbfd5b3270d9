//! BDD step definitions for provision behaviour.

use buildbox::test_support::{CallKind, DEFAULT_FAKE_IP, environment_config, instance_payloads};
use buildbox::{CpuCount, DnsUpdate, OperationStatus, ProvisionOutcome};
use rstest_bdd_macros::{given, then, when};
use tokio::runtime::Runtime;

use super::test_helpers::{IMPATIENT_POLLS, ProvisionContext, ProvisionResult};
use crate::fixtures::{STALE_IP, frontend_record};

const DEPENDENCY_ORDER: [CallKind; 9] = [
    CallKind::CreateProxy,
    CallKind::CreateForwardingRule,
    CallKind::LatestImage,
    CallKind::CreateInstance,
    CallKind::GetOperation,
    CallKind::AttachInstance,
    CallKind::GetForwardingRule,
    CallKind::ListRecordSets,
    CallKind::ApplyDnsChange,
];

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

fn assertion(message: impl Into<String>) -> StepError {
    StepError::Assertion(message.into())
}

#[given("a project whose frontend record points at a stale address")]
fn stale_frontend_record(mut provision_context: ProvisionContext) -> ProvisionContext {
    provision_context.fake = provision_context.fake.with_record_set(frontend_record());
    provision_context
}

#[given("a project without a frontend record")]
fn no_frontend_record(provision_context: ProvisionContext) -> ProvisionContext {
    provision_context
}

#[given("the load balancer front end already exists")]
fn existing_front_end(mut provision_context: ProvisionContext) -> ProvisionContext {
    provision_context.fake = provision_context
        .fake
        .with_proxies(&["dev-target-proxy"])
        .with_forwarding_rules(&["dev"]);
    provision_context
}

#[given("instance creation finishes with error \"{details}\"")]
fn instance_operation_fails(
    mut provision_context: ProvisionContext,
    details: String,
) -> ProvisionContext {
    provision_context.fake = provision_context
        .fake
        .with_operation_statuses(&[OperationStatus::Running])
        .with_operation_error(details.trim());
    provision_context
}

#[given("the forwarding rule never receives an address")]
fn address_never_assigned(mut provision_context: ProvisionContext) -> ProvisionContext {
    provision_context.fake = provision_context.fake.with_ip_sequence(&[None; 64]);
    provision_context.poll_settings = IMPATIENT_POLLS;
    provision_context
}

#[when("I provision an environment with \"{cpus}\" CPUs")]
fn provision_environment(
    provision_context: ProvisionContext,
    cpus: u32,
) -> Result<ProvisionContext, StepError> {
    let runtime = Runtime::new().map_err(|err| assertion(err.to_string()))?;
    let cpus = CpuCount::new(cpus).ok_or_else(|| assertion("scenario requested zero CPUs"))?;
    let orchestrator = provision_context.orchestrator();

    let result = runtime.block_on(async move {
        orchestrator
            .provision(&environment_config(), &instance_payloads(), cpus)
            .await
    });
    let outcome = match result {
        Ok(outcome) => ProvisionResult::Success(outcome),
        Err(err) => ProvisionResult::Failure(err),
    };

    Ok(ProvisionContext {
        outcome: Some(outcome),
        ..provision_context
    })
}

fn expect_success(provision_context: &ProvisionContext) -> Result<&ProvisionOutcome, StepError> {
    match provision_context.outcome.as_ref() {
        Some(ProvisionResult::Success(outcome)) => Ok(outcome),
        Some(ProvisionResult::Failure(err)) => {
            Err(assertion(format!("expected success, got: {err}")))
        }
        None => Err(assertion("missing outcome")),
    }
}

#[then("provisioning reports the assigned address")]
fn reports_assigned_address(provision_context: &ProvisionContext) -> Result<(), StepError> {
    let outcome = expect_success(provision_context)?;
    if outcome.ip_address == DEFAULT_FAKE_IP {
        Ok(())
    } else {
        Err(assertion(format!(
            "expected address {DEFAULT_FAKE_IP}, got {}",
            outcome.ip_address
        )))
    }
}

#[then("the frontend record points at the assigned address")]
fn record_points_at_address(provision_context: &ProvisionContext) -> Result<(), StepError> {
    let outcome = expect_success(provision_context)?;
    let expected_update = DnsUpdate::Updated {
        previous: vec![String::from(STALE_IP)],
    };
    if outcome.dns != expected_update {
        return Err(assertion(format!(
            "expected {expected_update:?}, got {:?}",
            outcome.dns
        )));
    }

    let expected_records =
        vec![frontend_record().with_rrdatas(vec![String::from(DEFAULT_FAKE_IP)])];
    let records = provision_context.fake.record_sets();
    if records == expected_records {
        Ok(())
    } else {
        Err(assertion(format!("unexpected record sets: {records:?}")))
    }
}

#[then("the remote calls follow dependency order")]
fn calls_follow_dependency_order(provision_context: &ProvisionContext) -> Result<(), StepError> {
    let kinds: Vec<CallKind> = provision_context
        .fake
        .calls()
        .into_iter()
        .map(|call| call.kind)
        .collect();
    if kinds == DEPENDENCY_ORDER {
        Ok(())
    } else {
        Err(assertion(format!("unexpected call order: {kinds:?}")))
    }
}

#[then("each front end resource exists exactly once")]
fn front_end_exists_once(provision_context: &ProvisionContext) -> Result<(), StepError> {
    let fake = &provision_context.fake;
    let proxies = fake.proxies();
    let rules = fake.forwarding_rules();
    if proxies.len() != 1 || rules.len() != 1 {
        return Err(assertion(format!(
            "expected one proxy and one rule, got {proxies:?} and {rules:?}"
        )));
    }
    match fake.count(CallKind::CreateInstance) {
        1 => Ok(()),
        count => Err(assertion(format!("expected one instance insert, got {count}"))),
    }
}

#[then("provisioning fails before stage \"{stage}\"")]
fn fails_before_stage(
    provision_context: &ProvisionContext,
    stage: String,
) -> Result<(), StepError> {
    let Some(ProvisionResult::Failure(err)) = provision_context.outcome.as_ref() else {
        return Err(assertion(format!(
            "expected failure, got: {:?}",
            provision_context.outcome
        )));
    };
    let reached = err.stage().to_string();
    if reached == stage.trim() {
        Ok(())
    } else {
        Err(assertion(format!(
            "expected failure before {stage}, got {reached}: {err}"
        )))
    }
}

#[then("the instance is never attached to the group")]
fn instance_not_attached(provision_context: &ProvisionContext) -> Result<(), StepError> {
    let fake = &provision_context.fake;
    if fake.count(CallKind::AttachInstance) == 0 && fake.group_members().is_empty() {
        Ok(())
    } else {
        Err(assertion(format!(
            "unexpected group members: {:?}",
            fake.group_members()
        )))
    }
}

#[then("the front end is left in place")]
fn front_end_left_in_place(provision_context: &ProvisionContext) -> Result<(), StepError> {
    let fake = &provision_context.fake;
    if fake.proxies().len() == 1 && fake.forwarding_rules().len() == 1 {
        Ok(())
    } else {
        Err(assertion("earlier resources should not be rolled back"))
    }
}

#[then("no DNS change is submitted")]
fn no_dns_change(provision_context: &ProvisionContext) -> Result<(), StepError> {
    match provision_context.fake.count(CallKind::ApplyDnsChange) {
        0 => Ok(()),
        count => Err(assertion(format!("expected no DNS change, got {count}"))),
    }
}

#[then("the DNS update is skipped")]
fn dns_update_skipped(provision_context: &ProvisionContext) -> Result<(), StepError> {
    let outcome = expect_success(provision_context)?;
    if outcome.dns == DnsUpdate::RecordMissing {
        Ok(())
    } else {
        Err(assertion(format!("expected a skipped update, got {:?}", outcome.dns)))
    }
}
