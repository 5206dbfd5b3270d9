//! Test support utilities shared across unit and integration tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::cloud::{
    ApiError, CloudApi, CloudFuture, ForwardingRuleState, Operation, OperationHandle,
    OperationStatus,
};
use crate::config::EnvironmentConfig;
use crate::payloads::InstancePayloads;
use crate::resources::{
    COMPUTE_SELF_LINK_BASE, DnsChange, ForwardingRule, Instance, ResourceRecordSet,
    TargetHttpsProxy,
};
use crate::wait::PollSettings;

/// Address the double assigns to forwarding rules unless scripted otherwise.
pub const DEFAULT_FAKE_IP: &str = "203.0.113.10";

/// Returns a fully populated configuration for tests.
#[must_use]
pub fn environment_config() -> EnvironmentConfig {
    EnvironmentConfig {
        project: String::from("demo-project"),
        zone: String::from("europe-west1-b"),
        region: String::from("europe-west1"),
        disk_name: String::from("build-cache"),
        managed_zone: String::from("example-zone"),
        frontend_dns_name: String::from("dev.example.com."),
        instance_group_name: String::from("dev-group"),
        instance_name: String::from("buildbox"),
        proxy_name: String::from("dev-target-proxy"),
        forwarding_rule_name: String::from("dev"),
        ssl_certificate: String::from("dev"),
        url_map: String::from("dev"),
        image_project: String::from("cos-cloud"),
        image_family: String::from("cos-stable"),
        machine_series: String::from("n1-standard"),
        cloud_init_file: String::from("yamls/cloud_init.yml"),
        container_spec_file: String::from("yamls/containers.yml"),
        poll_interval_ms: 1,
        wait_timeout_secs: 5,
        propagation_delay_ms: 0,
        access_token: Some(String::from("test-token")),
        config_path: None,
    }
}

/// Returns small payloads for instance metadata.
#[must_use]
pub fn instance_payloads() -> InstancePayloads {
    InstancePayloads {
        init_script: String::from("#cloud-config\n"),
        container_spec: String::from("spec:\n  containers: []\n"),
    }
}

/// Poll settings that keep waits fast in tests.
#[must_use]
pub const fn fast_polls() -> PollSettings {
    PollSettings {
        interval: std::time::Duration::from_millis(1),
        timeout: std::time::Duration::from_secs(5),
    }
}

/// Names a [`CloudApi`] method.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CallKind {
    /// [`CloudApi::create_proxy`].
    CreateProxy,
    /// [`CloudApi::create_forwarding_rule`].
    CreateForwardingRule,
    /// [`CloudApi::latest_image`].
    LatestImage,
    /// [`CloudApi::create_instance`].
    CreateInstance,
    /// [`CloudApi::attach_instance_to_group`].
    AttachInstance,
    /// [`CloudApi::get_forwarding_rule`].
    GetForwardingRule,
    /// [`CloudApi::get_operation`].
    GetOperation,
    /// [`CloudApi::list_instances`].
    ListInstances,
    /// [`CloudApi::list_forwarding_rules`].
    ListForwardingRules,
    /// [`CloudApi::list_proxies`].
    ListProxies,
    /// [`CloudApi::delete_instance`].
    DeleteInstance,
    /// [`CloudApi::delete_forwarding_rule`].
    DeleteForwardingRule,
    /// [`CloudApi::delete_proxy`].
    DeleteProxy,
    /// [`CloudApi::list_record_sets`].
    ListRecordSets,
    /// [`CloudApi::apply_dns_change`].
    ApplyDnsChange,
}

/// Records a single call made through [`FakeCloud`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CloudCall {
    /// Method invoked.
    pub kind: CallKind,
    /// Resource the call targeted (empty for listings).
    pub target: String,
}

#[derive(Debug, Default)]
struct FakeState {
    proxies: Vec<String>,
    forwarding_rules: Vec<String>,
    vanishing_rules: Vec<String>,
    linger_lists: usize,
    lists_until_vanished: usize,
    instances: Vec<String>,
    group_members: Vec<String>,
    record_sets: Vec<ResourceRecordSet>,
    dns_changes: Vec<DnsChange>,
    operation_script: VecDeque<OperationStatus>,
    operation_error: Option<String>,
    issued_operations: Vec<OperationHandle>,
    ip_script: VecDeque<Option<String>>,
    assigned_ip: Option<String>,
    failures: Vec<(CallKind, ApiError)>,
    calls: Vec<CloudCall>,
}

/// In-memory control plane that records every call in order.
///
/// Clones share state, so a test can keep one handle for assertions while
/// the orchestrator owns another.
#[derive(Clone, Debug)]
pub struct FakeCloud {
    state: Arc<Mutex<FakeState>>,
}

impl Default for FakeCloud {
    fn default() -> Self {
        Self::new()
    }
}

fn status_error(status: u16, details: impl Into<String>) -> ApiError {
    ApiError::Status {
        status,
        details: details.into(),
    }
}

fn not_found(what: &str) -> ApiError {
    status_error(404, format!("{what} was not found"))
}

fn already_exists(what: &str) -> ApiError {
    status_error(crate::cloud::CONFLICT_STATUS, format!("{what} already exists"))
}

impl FakeCloud {
    /// Creates an empty control plane whose operations finish immediately and
    /// whose forwarding rules have [`DEFAULT_FAKE_IP`] assigned.
    #[must_use]
    pub fn new() -> Self {
        let state = FakeState {
            assigned_ip: Some(String::from(DEFAULT_FAKE_IP)),
            ..FakeState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seeds existing target proxies.
    #[must_use]
    pub fn with_proxies(self, names: &[&str]) -> Self {
        self.state()
            .proxies
            .extend(names.iter().map(|name| (*name).to_owned()));
        self
    }

    /// Seeds existing forwarding rules.
    #[must_use]
    pub fn with_forwarding_rules(self, names: &[&str]) -> Self {
        self.state()
            .forwarding_rules
            .extend(names.iter().map(|name| (*name).to_owned()));
        self
    }

    /// Seeds existing instances.
    #[must_use]
    pub fn with_instances(self, names: &[&str]) -> Self {
        self.state()
            .instances
            .extend(names.iter().map(|name| (*name).to_owned()));
        self
    }

    /// Seeds a DNS record set.
    #[must_use]
    pub fn with_record_set(self, record: ResourceRecordSet) -> Self {
        self.state().record_sets.push(record);
        self
    }

    /// Scripts the statuses reported by successive operation polls. Once the
    /// script is exhausted operations report `DONE`.
    #[must_use]
    pub fn with_operation_statuses(self, statuses: &[OperationStatus]) -> Self {
        self.state().operation_script.extend(statuses.iter().copied());
        self
    }

    /// Makes every terminal operation carry `details` as its error payload.
    #[must_use]
    pub fn with_operation_error(self, details: &str) -> Self {
        self.state().operation_error = Some(details.to_owned());
        self
    }

    /// Scripts the addresses reported by successive forwarding rule reads.
    /// Once the script is exhausted reads report the assigned address.
    #[must_use]
    pub fn with_ip_sequence(self, addresses: &[Option<&str>]) -> Self {
        self.state()
            .ip_script
            .extend(addresses.iter().map(|ip| ip.map(str::to_owned)));
        self
    }

    /// Keeps deleted forwarding rules visible for `lists` further listings.
    #[must_use]
    pub fn with_lingering_forwarding_rules(self, lists: usize) -> Self {
        self.state().linger_lists = lists;
        self
    }

    /// Makes the next call of `kind` fail with `error`.
    #[must_use]
    pub fn failing_next(self, kind: CallKind, error: ApiError) -> Self {
        self.state().failures.push((kind, error));
        self
    }

    /// Returns every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<CloudCall> {
        self.state().calls.clone()
    }

    /// Returns how many calls of `kind` were made.
    #[must_use]
    pub fn count(&self, kind: CallKind) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| call.kind == kind)
            .count()
    }

    /// Returns the current proxies.
    #[must_use]
    pub fn proxies(&self) -> Vec<String> {
        self.state().proxies.clone()
    }

    /// Returns the current forwarding rules.
    #[must_use]
    pub fn forwarding_rules(&self) -> Vec<String> {
        self.state().forwarding_rules.clone()
    }

    /// Returns the current instances.
    #[must_use]
    pub fn instances(&self) -> Vec<String> {
        self.state().instances.clone()
    }

    /// Returns the instance links added to any group.
    #[must_use]
    pub fn group_members(&self) -> Vec<String> {
        self.state().group_members.clone()
    }

    /// Returns the current DNS record sets.
    #[must_use]
    pub fn record_sets(&self) -> Vec<ResourceRecordSet> {
        self.state().record_sets.clone()
    }

    /// Returns every DNS change submitted.
    #[must_use]
    pub fn dns_changes(&self) -> Vec<DnsChange> {
        self.state().dns_changes.clone()
    }

    /// Records the call and returns a scripted failure, if one is queued.
    fn enter(&self, kind: CallKind, target: &str) -> Result<MutexGuard<'_, FakeState>, ApiError> {
        let mut state = self.state();
        state.calls.push(CloudCall {
            kind,
            target: target.to_owned(),
        });
        if let Some(index) = state.failures.iter().position(|(queued, _)| *queued == kind) {
            let (_, error) = state.failures.remove(index);
            return Err(error);
        }
        Ok(state)
    }

    fn insert(
        &self,
        kind: CallKind,
        name: &str,
        select: impl FnOnce(&mut FakeState) -> &mut Vec<String>,
    ) -> Result<(), ApiError> {
        let mut state = self.enter(kind, name)?;
        let existing = select(&mut *state);
        if existing.iter().any(|item| item == name) {
            return Err(already_exists(name));
        }
        existing.push(name.to_owned());
        Ok(())
    }

    fn remove(
        &self,
        kind: CallKind,
        name: &str,
        select: impl FnOnce(&mut FakeState) -> &mut Vec<String>,
    ) -> Result<(), ApiError> {
        let mut state = self.enter(kind, name)?;
        let existing = select(&mut *state);
        let Some(index) = existing.iter().position(|item| item == name) else {
            return Err(not_found(name));
        };
        existing.remove(index);
        Ok(())
    }

    fn list_forwarding_rule_names(&self) -> Result<Vec<String>, ApiError> {
        let mut state = self.enter(CallKind::ListForwardingRules, "")?;
        let mut names = state.forwarding_rules.clone();
        if state.lists_until_vanished == 0 {
            state.vanishing_rules.clear();
        } else {
            names.extend(state.vanishing_rules.iter().cloned());
            state.lists_until_vanished -= 1;
        }
        Ok(names)
    }

    fn delete_rule(&self, name: &str) -> Result<(), ApiError> {
        let mut state = self.enter(CallKind::DeleteForwardingRule, name)?;
        let Some(index) = state.forwarding_rules.iter().position(|item| item == name) else {
            return Err(not_found(name));
        };
        let removed = state.forwarding_rules.remove(index);
        state.lists_until_vanished = state.linger_lists;
        state.vanishing_rules.push(removed);
        Ok(())
    }

    fn create_instance_operation(
        &self,
        zone: &str,
        name: &str,
    ) -> Result<OperationHandle, ApiError> {
        let mut state = self.enter(CallKind::CreateInstance, name)?;
        if state.instances.iter().any(|item| item == name) {
            return Err(already_exists(name));
        }
        state.instances.push(name.to_owned());
        let handle = OperationHandle {
            name: format!("operation-insert-{name}-{}", state.issued_operations.len()),
            zone: zone.to_owned(),
        };
        state.issued_operations.push(handle.clone());
        Ok(handle)
    }

    fn poll_operation(&self, handle: &OperationHandle) -> Result<Operation, ApiError> {
        let mut state = self.enter(CallKind::GetOperation, &handle.name)?;
        if !state.issued_operations.contains(handle) {
            return Err(not_found(&handle.name));
        }
        let status = state
            .operation_script
            .pop_front()
            .unwrap_or(OperationStatus::Done);
        let error = match status {
            OperationStatus::Done => state.operation_error.clone(),
            OperationStatus::Pending | OperationStatus::Running => None,
        };
        Ok(Operation {
            handle: handle.clone(),
            status,
            error,
        })
    }

    fn read_forwarding_rule(&self, name: &str) -> Result<ForwardingRuleState, ApiError> {
        let mut state = self.enter(CallKind::GetForwardingRule, name)?;
        if !state.forwarding_rules.iter().any(|item| item == name) {
            return Err(not_found(name));
        }
        let ip_address = match state.ip_script.pop_front() {
            Some(scripted) => scripted,
            None => state.assigned_ip.clone(),
        };
        Ok(ForwardingRuleState {
            name: name.to_owned(),
            ip_address,
        })
    }

    fn apply_change(&self, change: &DnsChange) -> Result<(), ApiError> {
        let mut state = self.enter(CallKind::ApplyDnsChange, "")?;
        state.dns_changes.push(change.clone());
        for deletion in &change.deletions {
            let Some(index) = state.record_sets.iter().position(|live| live == deletion) else {
                return Err(status_error(
                    412,
                    format!("record set {} does not match", deletion.name),
                ));
            };
            state.record_sets.remove(index);
        }
        state.record_sets.extend(change.additions.iter().cloned());
        Ok(())
    }
}

impl CloudApi for FakeCloud {
    fn create_proxy<'a>(
        &'a self,
        _project: &'a str,
        body: &'a TargetHttpsProxy,
    ) -> CloudFuture<'a, ()> {
        Box::pin(async move {
            self.insert(CallKind::CreateProxy, &body.name, |state| {
                &mut state.proxies
            })
        })
    }

    fn create_forwarding_rule<'a>(
        &'a self,
        _project: &'a str,
        body: &'a ForwardingRule,
    ) -> CloudFuture<'a, ()> {
        Box::pin(async move {
            self.insert(CallKind::CreateForwardingRule, &body.name, |state| {
                &mut state.forwarding_rules
            })
        })
    }

    fn latest_image<'a>(
        &'a self,
        image_project: &'a str,
        family: &'a str,
    ) -> CloudFuture<'a, String> {
        Box::pin(async move {
            self.enter(CallKind::LatestImage, family)?;
            Ok(format!(
                "{COMPUTE_SELF_LINK_BASE}/projects/{image_project}/global/images/{family}-fake"
            ))
        })
    }

    fn create_instance<'a>(
        &'a self,
        _project: &'a str,
        zone: &'a str,
        body: &'a Instance,
    ) -> CloudFuture<'a, OperationHandle> {
        Box::pin(async move { self.create_instance_operation(zone, &body.name) })
    }

    fn attach_instance_to_group<'a>(
        &'a self,
        _project: &'a str,
        _zone: &'a str,
        group: &'a str,
        instance_link: &'a str,
    ) -> CloudFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.enter(CallKind::AttachInstance, group)?;
            if !state.group_members.iter().any(|link| link == instance_link) {
                state.group_members.push(instance_link.to_owned());
            }
            Ok(())
        })
    }

    fn get_forwarding_rule<'a>(
        &'a self,
        _project: &'a str,
        name: &'a str,
    ) -> CloudFuture<'a, ForwardingRuleState> {
        Box::pin(async move { self.read_forwarding_rule(name) })
    }

    fn get_operation<'a>(
        &'a self,
        _project: &'a str,
        handle: &'a OperationHandle,
    ) -> CloudFuture<'a, Operation> {
        Box::pin(async move { self.poll_operation(handle) })
    }

    fn list_instances<'a>(
        &'a self,
        _project: &'a str,
        _zone: &'a str,
    ) -> CloudFuture<'a, Vec<String>> {
        Box::pin(async move {
            let state = self.enter(CallKind::ListInstances, "")?;
            Ok(state.instances.clone())
        })
    }

    fn list_forwarding_rules<'a>(&'a self, _project: &'a str) -> CloudFuture<'a, Vec<String>> {
        Box::pin(async move { self.list_forwarding_rule_names() })
    }

    fn list_proxies<'a>(&'a self, _project: &'a str) -> CloudFuture<'a, Vec<String>> {
        Box::pin(async move {
            let state = self.enter(CallKind::ListProxies, "")?;
            Ok(state.proxies.clone())
        })
    }

    fn delete_instance<'a>(
        &'a self,
        _project: &'a str,
        _zone: &'a str,
        name: &'a str,
    ) -> CloudFuture<'a, ()> {
        Box::pin(async move {
            self.remove(CallKind::DeleteInstance, name, |state| &mut state.instances)
        })
    }

    fn delete_forwarding_rule<'a>(
        &'a self,
        _project: &'a str,
        name: &'a str,
    ) -> CloudFuture<'a, ()> {
        Box::pin(async move { self.delete_rule(name) })
    }

    fn delete_proxy<'a>(&'a self, _project: &'a str, name: &'a str) -> CloudFuture<'a, ()> {
        Box::pin(async move {
            self.remove(CallKind::DeleteProxy, name, |state| &mut state.proxies)
        })
    }

    fn list_record_sets<'a>(
        &'a self,
        _project: &'a str,
        managed_zone: &'a str,
    ) -> CloudFuture<'a, Vec<ResourceRecordSet>> {
        Box::pin(async move {
            let state = self.enter(CallKind::ListRecordSets, managed_zone)?;
            Ok(state.record_sets.clone())
        })
    }

    fn apply_dns_change<'a>(
        &'a self,
        _project: &'a str,
        _managed_zone: &'a str,
        change: &'a DnsChange,
    ) -> CloudFuture<'a, ()> {
        Box::pin(async move { self.apply_change(change) })
    }
}
