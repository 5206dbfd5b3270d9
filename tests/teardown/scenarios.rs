//! BDD scenarios for the teardown sweep.

use rstest_bdd_macros::scenario;

use super::test_helpers::{TeardownContext, teardown_context};

#[scenario(
    path = "tests/features/teardown.feature",
    name = "Delete consumers before producers"
)]
fn scenario_dependency_order(teardown_context: TeardownContext) {
    let _ = teardown_context;
}

#[scenario(
    path = "tests/features/teardown.feature",
    name = "Wait for lingering forwarding rules before deleting proxies"
)]
fn scenario_lingering_rules(teardown_context: TeardownContext) {
    let _ = teardown_context;
}

#[scenario(
    path = "tests/features/teardown.feature",
    name = "Remove unrelated resources in the same project"
)]
fn scenario_unrelated_resources(teardown_context: TeardownContext) {
    let _ = teardown_context;
}

#[scenario(
    path = "tests/features/teardown.feature",
    name = "Report the failing step when a deletion fails"
)]
fn scenario_deletion_fails(teardown_context: TeardownContext) {
    let _ = teardown_context;
}

#[scenario(
    path = "tests/features/teardown.feature",
    name = "Tearing down an empty project succeeds"
)]
fn scenario_empty_project(teardown_context: TeardownContext) {
    let _ = teardown_context;
}
