//! Core library for the `buildbox` environment orchestrator.
//!
//! The crate stands up a single build VM behind a Google Cloud HTTPS load
//! balancer (target proxy → forwarding rule → instance group member), points
//! a DNS record at the balancer's address, and tears the load-balancer
//! resources down again. Both workflows run against the [`CloudApi`] trait;
//! [`GceClient`] is the production implementation.

pub mod cloud;
pub mod config;
pub mod create;
pub mod dns;
pub mod gce;
pub mod payloads;
pub mod provision;
pub mod resources;
pub mod teardown;
pub mod test_support;
pub mod wait;

pub use cloud::{
    ApiError, CloudApi, ForwardingRuleState, Operation, OperationHandle, OperationStatus,
};
pub use config::{ConfigError, EnvironmentConfig};
pub use create::{Creation, create_if_absent};
pub use dns::{DnsUpdate, point_domain_at};
pub use gce::GceClient;
pub use payloads::{InstancePayloads, PayloadError};
pub use provision::{ProvisionError, ProvisionOrchestrator, ProvisionOutcome, ProvisionStage};
pub use resources::{CpuCount, ResourceKind};
pub use teardown::{TeardownError, TeardownOrchestrator, TeardownStage, TeardownSummary};
pub use wait::{PollSettings, WaitError};
