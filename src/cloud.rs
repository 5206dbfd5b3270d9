//! Remote control-plane abstraction consumed by the orchestrator.
//!
//! The provisioning and teardown workflows only ever talk to the cloud
//! through [`CloudApi`], which keeps them testable against an in-memory
//! double. [`crate::gce::GceClient`] is the production implementation.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::resources::{
    DnsChange, ForwardingRule, Instance, ResourceRecordSet, TargetHttpsProxy,
};

/// HTTP status the control plane uses to report an existing resource.
pub const CONFLICT_STATUS: u16 = 409;

/// Errors raised by a single remote call.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ApiError {
    /// The service answered with a non-success status.
    #[error("remote call failed with status {status}: {details}")]
    Status {
        /// HTTP status code returned by the service.
        status: u16,
        /// Error message reported by the service.
        details: String,
    },
    /// The request never produced a response.
    #[error("transport error: {message}")]
    Transport {
        /// Message returned by the HTTP client.
        message: String,
    },
    /// The response body did not match the expected shape.
    #[error("failed to decode {resource} response: {message}")]
    Decode {
        /// Resource being decoded (for example `operation`).
        resource: String,
        /// Parser error message.
        message: String,
    },
}

impl ApiError {
    /// Returns `true` when the service reported that the resource already
    /// exists.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::Status {
                status: CONFLICT_STATUS,
                ..
            }
        )
    }
}

/// Identifies a zonal asynchronous operation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OperationHandle {
    /// Operation name assigned by the service.
    pub name: String,
    /// Zone the operation runs in.
    pub zone: String,
}

/// Lifecycle state of an asynchronous operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OperationStatus {
    /// Accepted but not started.
    Pending,
    /// In progress.
    Running,
    /// Terminal, possibly with an error payload.
    Done,
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Done => "DONE",
        };
        f.write_str(label)
    }
}

/// Snapshot of an operation as reported by the service.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Operation {
    /// Handle used to poll the operation.
    pub handle: OperationHandle,
    /// Current lifecycle state.
    pub status: OperationStatus,
    /// Error details attached to a terminal operation.
    pub error: Option<String>,
}

/// Observed state of a global forwarding rule.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ForwardingRuleState {
    /// Rule name.
    pub name: String,
    /// Public address, once the load balancer has assigned one.
    pub ip_address: Option<String>,
}

/// Future returned by [`CloudApi`] calls.
pub type CloudFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Operations the orchestrator invokes on the cloud control plane.
pub trait CloudApi {
    /// Inserts a global target HTTPS proxy.
    fn create_proxy<'a>(
        &'a self,
        project: &'a str,
        body: &'a TargetHttpsProxy,
    ) -> CloudFuture<'a, ()>;

    /// Inserts a global forwarding rule.
    fn create_forwarding_rule<'a>(
        &'a self,
        project: &'a str,
        body: &'a ForwardingRule,
    ) -> CloudFuture<'a, ()>;

    /// Resolves the self-link of the newest non-deprecated image in a family.
    fn latest_image<'a>(&'a self, image_project: &'a str, family: &'a str)
    -> CloudFuture<'a, String>;

    /// Inserts an instance and returns the operation tracking its creation.
    fn create_instance<'a>(
        &'a self,
        project: &'a str,
        zone: &'a str,
        body: &'a Instance,
    ) -> CloudFuture<'a, OperationHandle>;

    /// Adds an instance, identified by self-link, to an unmanaged group.
    fn attach_instance_to_group<'a>(
        &'a self,
        project: &'a str,
        zone: &'a str,
        group: &'a str,
        instance_link: &'a str,
    ) -> CloudFuture<'a, ()>;

    /// Fetches a global forwarding rule.
    fn get_forwarding_rule<'a>(
        &'a self,
        project: &'a str,
        name: &'a str,
    ) -> CloudFuture<'a, ForwardingRuleState>;

    /// Fetches the current state of a zonal operation.
    fn get_operation<'a>(
        &'a self,
        project: &'a str,
        handle: &'a OperationHandle,
    ) -> CloudFuture<'a, Operation>;

    /// Lists instance names in a zone.
    fn list_instances<'a>(&'a self, project: &'a str, zone: &'a str)
    -> CloudFuture<'a, Vec<String>>;

    /// Lists global forwarding rule names.
    fn list_forwarding_rules<'a>(&'a self, project: &'a str) -> CloudFuture<'a, Vec<String>>;

    /// Lists global target HTTPS proxy names.
    fn list_proxies<'a>(&'a self, project: &'a str) -> CloudFuture<'a, Vec<String>>;

    /// Deletes an instance.
    fn delete_instance<'a>(
        &'a self,
        project: &'a str,
        zone: &'a str,
        name: &'a str,
    ) -> CloudFuture<'a, ()>;

    /// Deletes a global forwarding rule.
    fn delete_forwarding_rule<'a>(&'a self, project: &'a str, name: &'a str)
    -> CloudFuture<'a, ()>;

    /// Deletes a global target HTTPS proxy.
    fn delete_proxy<'a>(&'a self, project: &'a str, name: &'a str) -> CloudFuture<'a, ()>;

    /// Lists every record set in a managed zone.
    fn list_record_sets<'a>(
        &'a self,
        project: &'a str,
        managed_zone: &'a str,
    ) -> CloudFuture<'a, Vec<ResourceRecordSet>>;

    /// Applies additions and deletions to a managed zone atomically.
    fn apply_dns_change<'a>(
        &'a self,
        project: &'a str,
        managed_zone: &'a str,
        change: &'a DnsChange,
    ) -> CloudFuture<'a, ()>;
}
