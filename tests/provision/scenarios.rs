//! BDD scenarios for the provision workflow.

use rstest_bdd_macros::scenario;

use super::test_helpers::{ProvisionContext, provision_context};

#[scenario(
    path = "tests/features/provision.feature",
    name = "Provision a fresh project end to end"
)]
fn scenario_fresh_project(provision_context: ProvisionContext) {
    let _ = provision_context;
}

#[scenario(
    path = "tests/features/provision.feature",
    name = "Re-running provision reuses existing resources"
)]
fn scenario_rerun_reuses_resources(provision_context: ProvisionContext) {
    let _ = provision_context;
}

#[scenario(
    path = "tests/features/provision.feature",
    name = "Halt when the instance operation fails"
)]
fn scenario_instance_operation_fails(provision_context: ProvisionContext) {
    let _ = provision_context;
}

#[scenario(
    path = "tests/features/provision.feature",
    name = "Time out when no address is assigned"
)]
fn scenario_address_timeout(provision_context: ProvisionContext) {
    let _ = provision_context;
}

#[scenario(
    path = "tests/features/provision.feature",
    name = "Skip DNS when the frontend record is missing"
)]
fn scenario_missing_frontend_record(provision_context: ProvisionContext) {
    let _ = provision_context;
}
