//! BDD step definitions for teardown behaviour.

use buildbox::ApiError;
use buildbox::test_support::{CallKind, environment_config};
use rstest_bdd_macros::{given, then, when};
use tokio::runtime::Runtime;

use super::test_helpers::{TeardownContext, TeardownOutcome, first_call, last_call};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("a project with a provisioned environment")]
fn provisioned_environment(mut teardown_context: TeardownContext) -> TeardownContext {
    teardown_context.fake = teardown_context
        .fake
        .with_instances(&["buildbox"])
        .with_forwarding_rules(&["dev"])
        .with_proxies(&["dev-target-proxy"]);
    teardown_context
}

#[given("an empty project")]
fn empty_project(teardown_context: TeardownContext) -> TeardownContext {
    teardown_context
}

#[given("another team's resources share the project")]
fn unrelated_resources(mut teardown_context: TeardownContext) -> TeardownContext {
    teardown_context.fake = teardown_context
        .fake
        .with_instances(&["someone-elses-vm"])
        .with_forwarding_rules(&["prod"])
        .with_proxies(&["prod-target-proxy"]);
    teardown_context
}

#[given("deleted forwarding rules stay listed for {lists:u32} listings")]
fn lingering_rules(mut teardown_context: TeardownContext, lists: u32) -> TeardownContext {
    let lists = lists as usize;
    teardown_context.fake = teardown_context.fake.with_lingering_forwarding_rules(lists);
    teardown_context.lingering_lists = lists;
    teardown_context
}

#[given("deleting a forwarding rule fails with status {status:u32}")]
fn forwarding_rule_deletion_fails(
    mut teardown_context: TeardownContext,
    status: u32,
) -> TeardownContext {
    let status = u16::try_from(status)
        .unwrap_or_else(|err| panic!("scenario status should be an HTTP code: {err}"));
    teardown_context.fake = teardown_context.fake.failing_next(
        CallKind::DeleteForwardingRule,
        ApiError::Status {
            status,
            details: String::from("backend error"),
        },
    );
    teardown_context
}

#[when("I tear the environment down")]
fn tear_down(teardown_context: TeardownContext) -> Result<TeardownContext, StepError> {
    let runtime = Runtime::new().map_err(|err| StepError::Assertion(format!("runtime: {err}")))?;
    let orchestrator = teardown_context.orchestrator();

    let result =
        runtime.block_on(async move { orchestrator.teardown(&environment_config()).await });
    let outcome = match result {
        Ok(summary) => TeardownOutcome::Success(summary),
        Err(err) => TeardownOutcome::Failure(err),
    };

    Ok(TeardownContext {
        outcome: Some(outcome),
        ..teardown_context
    })
}

#[then("teardown deletes {instances:u32} instances, {rules:u32} rules and {proxies:u32} proxies")]
fn reports_deletions(
    teardown_context: &TeardownContext,
    instances: u32,
    rules: u32,
    proxies: u32,
) -> Result<(), StepError> {
    let Some(outcome) = teardown_context.outcome.as_ref() else {
        return Err(StepError::Assertion(String::from("missing outcome")));
    };
    let TeardownOutcome::Success(summary) = outcome else {
        return Err(StepError::Assertion(format!(
            "expected success, got: {outcome:?}"
        )));
    };
    if summary.deleted_instances == instances as usize
        && summary.deleted_forwarding_rules == rules as usize
        && summary.deleted_proxies == proxies as usize
    {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {instances} instances, {rules} rules and {proxies} proxies, got {summary:?}"
        )))
    }
}

fn ordered(
    teardown_context: &TeardownContext,
    before: CallKind,
    after: CallKind,
) -> Result<(), StepError> {
    let calls = teardown_context.fake.calls();
    let last_before = last_call(&calls, before)
        .ok_or_else(|| StepError::Assertion(format!("missing {before:?} call")))?;
    let first_after = first_call(&calls, after)
        .ok_or_else(|| StepError::Assertion(format!("missing {after:?} call")))?;
    if last_before < first_after {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "{before:?} should finish before {after:?}: {calls:?}"
        )))
    }
}

#[then("instances are deleted before forwarding rules")]
fn instances_before_rules(teardown_context: &TeardownContext) -> Result<(), StepError> {
    ordered(
        teardown_context,
        CallKind::DeleteInstance,
        CallKind::DeleteForwardingRule,
    )
}

#[then("forwarding rules are deleted before proxies")]
fn rules_before_proxies(teardown_context: &TeardownContext) -> Result<(), StepError> {
    ordered(
        teardown_context,
        CallKind::DeleteForwardingRule,
        CallKind::DeleteProxy,
    )
}

#[then("no proxy is deleted while a forwarding rule is listed")]
fn proxies_wait_for_rules(teardown_context: &TeardownContext) -> Result<(), StepError> {
    let calls = teardown_context.fake.calls();
    let first_proxy_delete = first_call(&calls, CallKind::DeleteProxy)
        .ok_or_else(|| StepError::Assertion(String::from("proxy should be deleted")))?;
    let listings = calls
        .iter()
        .take(first_proxy_delete)
        .filter(|call| call.kind == CallKind::ListForwardingRules)
        .count();
    // One listing to find the rules, one per lingering listing, one empty.
    let required = teardown_context.lingering_lists + 2;
    if listings >= required {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected at least {required} listings before proxy deletion, got {listings}"
        )))
    }
}

#[then("the project has no load balancer resources left")]
fn project_is_clean(teardown_context: &TeardownContext) -> Result<(), StepError> {
    let fake = &teardown_context.fake;
    let instances = fake.instances();
    let rules = fake.forwarding_rules();
    let proxies = fake.proxies();
    if instances.is_empty() && rules.is_empty() && proxies.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "resources remain: {instances:?} {rules:?} {proxies:?}"
        )))
    }
}

#[then("teardown fails while \"{stage}\"")]
fn fails_while(teardown_context: &TeardownContext, stage: String) -> Result<(), StepError> {
    let Some(TeardownOutcome::Failure(err)) = teardown_context.outcome.as_ref() else {
        return Err(StepError::Assertion(format!(
            "expected failure, got: {:?}",
            teardown_context.outcome
        )));
    };
    let failed = err.stage().to_string();
    if failed == stage.trim() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected failure while {stage}, got {failed}: {err}"
        )))
    }
}

#[then("no proxy deletion is attempted")]
fn no_proxy_deletion(teardown_context: &TeardownContext) -> Result<(), StepError> {
    let fake = &teardown_context.fake;
    if fake.count(CallKind::DeleteProxy) == 0 && fake.proxies().len() == 1 {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "proxies should be untouched: {:?}",
            fake.proxies()
        )))
    }
}
