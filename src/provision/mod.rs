//! Orchestrates provisioning of the load-balanced environment.
//!
//! The workflow creates the target proxy and forwarding rule, boots the
//! instance against the pre-existing data disk, adds it to the backend
//! instance group, waits for the load balancer to assign a public address,
//! and finally points the frontend DNS record at that address. Each stage is
//! a precondition for the next. Nothing is rolled back on failure; every
//! create tolerates "already exists", so re-running resumes where the last
//! run stopped.

use std::fmt;
use std::time::Duration;

use tokio::time::sleep;
use tracing::info;

use crate::cloud::CloudApi;
use crate::config::EnvironmentConfig;
use crate::create::create_if_absent;
use crate::dns::{DnsUpdate, point_domain_at};
use crate::payloads::InstancePayloads;
use crate::resources::{
    CpuCount, ForwardingRule, Instance, ResourceKind, TargetHttpsProxy, instance_self_link,
};
use crate::wait::{PollSettings, await_attribute, await_operation};

mod error;

pub use error::ProvisionError;

const PROPAGATION_DELAY: Duration = Duration::from_secs(2);

/// Stages of the provision workflow, in the order they are reached.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub enum ProvisionStage {
    /// The target HTTPS proxy exists.
    ProxyCreated,
    /// The forwarding rule exists and targets the proxy.
    ForwardingRuleCreated,
    /// The instance exists and its creation operation has finished.
    InstanceReady,
    /// The instance is a member of the backend instance group.
    InstanceAttachedToGroup,
    /// The forwarding rule has a public address.
    IpAssigned,
    /// The frontend DNS record has been processed.
    DnsUpdated,
}

impl fmt::Display for ProvisionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ProxyCreated => "proxy created",
            Self::ForwardingRuleCreated => "forwarding rule created",
            Self::InstanceReady => "instance ready",
            Self::InstanceAttachedToGroup => "instance attached to group",
            Self::IpAssigned => "IP assigned",
            Self::DnsUpdated => "DNS updated",
        };
        f.write_str(label)
    }
}

/// Result of a successful provision run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProvisionOutcome {
    /// Public address of the forwarding rule.
    pub ip_address: String,
    /// What happened to the frontend record.
    pub dns: DnsUpdate,
}

/// Executes the provision workflow against a control plane.
#[derive(Debug)]
pub struct ProvisionOrchestrator<C> {
    api: C,
    poll_settings: PollSettings,
    propagation_delay: Duration,
}

impl<C> ProvisionOrchestrator<C>
where
    C: CloudApi,
{
    /// Creates an orchestrator with default polling behaviour.
    #[must_use]
    pub fn new(api: C) -> Self {
        Self {
            api,
            poll_settings: PollSettings::default(),
            propagation_delay: PROPAGATION_DELAY,
        }
    }

    /// Overrides the interval and deadline used by every wait.
    #[must_use]
    pub const fn with_poll_settings(mut self, settings: PollSettings) -> Self {
        self.poll_settings = settings;
        self
    }

    /// Overrides the pause between proxy and forwarding rule creation.
    #[must_use]
    pub const fn with_propagation_delay(mut self, delay: Duration) -> Self {
        self.propagation_delay = delay;
        self
    }

    /// Runs the workflow to completion.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError`] naming the stage that could not be reached.
    /// Resources created by earlier stages are left in place.
    pub async fn provision(
        &self,
        config: &EnvironmentConfig,
        payloads: &InstancePayloads,
        cpus: CpuCount,
    ) -> Result<ProvisionOutcome, ProvisionError> {
        info!(
            project = %config.project,
            zone = %config.zone,
            region = %config.region,
            %cpus,
            "provisioning environment"
        );

        self.create_proxy(config).await?;
        reached(ProvisionStage::ProxyCreated);

        sleep(self.propagation_delay).await;
        self.create_forwarding_rule(config).await?;
        reached(ProvisionStage::ForwardingRuleCreated);

        self.create_instance(config, payloads, cpus).await?;
        reached(ProvisionStage::InstanceReady);

        self.attach_to_group(config).await?;
        reached(ProvisionStage::InstanceAttachedToGroup);

        let ip_address = self.await_public_ip(config).await?;
        reached(ProvisionStage::IpAssigned);

        let dns = point_domain_at(
            &self.api,
            &config.project,
            &config.managed_zone,
            &config.frontend_dns_name,
            &ip_address,
        )
        .await
        .map_err(ProvisionError::remote(ProvisionStage::DnsUpdated))?;
        reached(ProvisionStage::DnsUpdated);

        Ok(ProvisionOutcome { ip_address, dns })
    }

    async fn create_proxy(&self, config: &EnvironmentConfig) -> Result<(), ProvisionError> {
        let proxy = TargetHttpsProxy::for_environment(config);
        create_if_absent(
            ResourceKind::TargetProxy,
            &proxy.name,
            self.api.create_proxy(&config.project, &proxy),
        )
        .await
        .map_err(ProvisionError::remote(ProvisionStage::ProxyCreated))?;
        Ok(())
    }

    async fn create_forwarding_rule(
        &self,
        config: &EnvironmentConfig,
    ) -> Result<(), ProvisionError> {
        let rule = ForwardingRule::for_environment(config);
        create_if_absent(
            ResourceKind::ForwardingRule,
            &rule.name,
            self.api.create_forwarding_rule(&config.project, &rule),
        )
        .await
        .map_err(ProvisionError::remote(ProvisionStage::ForwardingRuleCreated))?;
        Ok(())
    }

    async fn create_instance(
        &self,
        config: &EnvironmentConfig,
        payloads: &InstancePayloads,
        cpus: CpuCount,
    ) -> Result<(), ProvisionError> {
        let stage = ProvisionStage::InstanceReady;
        let image = self
            .api
            .latest_image(&config.image_project, &config.image_family)
            .await
            .map_err(ProvisionError::remote(stage))?;
        info!(%image, "resolved boot image");

        let instance = Instance::for_environment(config, cpus, &image, payloads);
        let creation = create_if_absent(
            ResourceKind::Instance,
            &instance.name,
            self.api
                .create_instance(&config.project, &config.zone, &instance),
        )
        .await
        .map_err(ProvisionError::remote(stage))?;

        if let Some(handle) = creation.created() {
            info!(operation = %handle.name, "waiting for instance creation");
            await_operation(&self.api, self.poll_settings, &config.project, &handle)
                .await
                .map_err(ProvisionError::waiting(stage))?;
        }
        Ok(())
    }

    async fn attach_to_group(&self, config: &EnvironmentConfig) -> Result<(), ProvisionError> {
        let link = instance_self_link(config);
        self.api
            .attach_instance_to_group(
                &config.project,
                &config.zone,
                &config.instance_group_name,
                &link,
            )
            .await
            .map_err(ProvisionError::remote(ProvisionStage::InstanceAttachedToGroup))
    }

    async fn await_public_ip(&self, config: &EnvironmentConfig) -> Result<String, ProvisionError> {
        let what = format!("public IP of forwarding rule {}", config.forwarding_rule_name);
        await_attribute(self.poll_settings, &what, move || async move {
            let rule = self
                .api
                .get_forwarding_rule(&config.project, &config.forwarding_rule_name)
                .await?;
            Ok(rule.ip_address.filter(|address| !address.is_empty()))
        })
        .await
        .map_err(ProvisionError::waiting(ProvisionStage::IpAssigned))
    }
}

fn reached(stage: ProvisionStage) {
    info!(%stage, "stage reached");
}
