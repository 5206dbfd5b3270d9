//! Environment-wide teardown.
//!
//! Resources are deleted consumers first: instances, then forwarding rules,
//! then target proxies. A proxy cannot be deleted while a forwarding rule
//! still references it, so proxy deletion starts only after the forwarding
//! rule listing has been observed empty. Every resource of each kind is
//! deleted, whether or not this tool created it.

use std::fmt;

use thiserror::Error;
use tracing::info;

use crate::cloud::{ApiError, CloudApi};
use crate::config::EnvironmentConfig;
use crate::wait::{PollSettings, WaitError, await_empty};

/// Steps of the teardown workflow, in execution order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TeardownStage {
    /// Deleting every instance in the zone.
    DeleteInstances,
    /// Deleting every global forwarding rule.
    DeleteForwardingRules,
    /// Waiting for the forwarding rule listing to empty.
    AwaitForwardingRulesGone,
    /// Deleting every target HTTPS proxy.
    DeleteProxies,
    /// Confirming the forwarding rule listing is still empty.
    ConfirmForwardingRulesGone,
}

impl fmt::Display for TeardownStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::DeleteInstances => "deleting instances",
            Self::DeleteForwardingRules => "deleting forwarding rules",
            Self::AwaitForwardingRulesGone => "waiting for forwarding rules to disappear",
            Self::DeleteProxies => "deleting target proxies",
            Self::ConfirmForwardingRulesGone => "confirming forwarding rules are gone",
        };
        f.write_str(label)
    }
}

/// Summary of teardown work.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TeardownSummary {
    /// Number of instances deleted.
    pub deleted_instances: usize,
    /// Number of forwarding rules deleted.
    pub deleted_forwarding_rules: usize,
    /// Number of target proxies deleted.
    pub deleted_proxies: usize,
}

/// Errors returned by the teardown workflow.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TeardownError {
    /// A listing, deletion, or poll failed.
    #[error("teardown failed while {stage}: {source}")]
    RemoteCall {
        /// Step that failed.
        stage: TeardownStage,
        /// Error returned by the control plane.
        #[source]
        source: ApiError,
    },
    /// Resources were still listed when the deadline passed.
    #[error("teardown failed while {stage}: {source}")]
    Timeout {
        /// Step that failed.
        stage: TeardownStage,
        /// Underlying wait failure.
        #[source]
        source: WaitError,
    },
}

impl TeardownError {
    /// Returns the step that failed.
    #[must_use]
    pub const fn stage(&self) -> TeardownStage {
        match self {
            Self::RemoteCall { stage, .. } | Self::Timeout { stage, .. } => *stage,
        }
    }

    fn remote(stage: TeardownStage) -> impl FnOnce(ApiError) -> Self {
        move |source| Self::RemoteCall { stage, source }
    }

    fn waiting(stage: TeardownStage) -> impl FnOnce(WaitError) -> Self {
        move |err| match err {
            WaitError::Remote(source) => Self::RemoteCall { stage, source },
            other => Self::Timeout {
                stage,
                source: other,
            },
        }
    }
}

/// Deletes every managed resource kind in dependency order.
#[derive(Debug)]
pub struct TeardownOrchestrator<C> {
    api: C,
    poll_settings: PollSettings,
}

impl<C> TeardownOrchestrator<C>
where
    C: CloudApi,
{
    /// Creates an orchestrator with default polling behaviour.
    #[must_use]
    pub fn new(api: C) -> Self {
        Self {
            api,
            poll_settings: PollSettings::default(),
        }
    }

    /// Overrides the interval and deadline used by every wait.
    #[must_use]
    pub const fn with_poll_settings(mut self, settings: PollSettings) -> Self {
        self.poll_settings = settings;
        self
    }

    /// Runs the teardown sweep.
    ///
    /// # Errors
    ///
    /// Returns [`TeardownError`] naming the step that failed. Resources
    /// deleted before the failure stay deleted; re-running continues the
    /// sweep.
    pub async fn teardown(
        &self,
        config: &EnvironmentConfig,
    ) -> Result<TeardownSummary, TeardownError> {
        let project = config.project.as_str();
        let zone = config.zone.as_str();

        let deleted_instances = self.delete_instances(project, zone).await?;
        let deleted_forwarding_rules = self.delete_forwarding_rules(project).await?;
        self.await_forwarding_rules_gone(project, TeardownStage::AwaitForwardingRulesGone)
            .await?;
        let deleted_proxies = self.delete_proxies(project).await?;
        self.await_forwarding_rules_gone(project, TeardownStage::ConfirmForwardingRulesGone)
            .await?;

        let summary = TeardownSummary {
            deleted_instances,
            deleted_forwarding_rules,
            deleted_proxies,
        };
        info!(?summary, "teardown complete");
        Ok(summary)
    }

    async fn delete_instances(&self, project: &str, zone: &str) -> Result<usize, TeardownError> {
        let stage = TeardownStage::DeleteInstances;
        info!(%stage, zone);
        let names = self
            .api
            .list_instances(project, zone)
            .await
            .map_err(TeardownError::remote(stage))?;
        for name in &names {
            self.api
                .delete_instance(project, zone, name)
                .await
                .map_err(TeardownError::remote(stage))?;
            info!(instance = %name, "deletion requested");
        }
        Ok(names.len())
    }

    async fn delete_forwarding_rules(&self, project: &str) -> Result<usize, TeardownError> {
        let stage = TeardownStage::DeleteForwardingRules;
        info!(%stage);
        let names = self
            .api
            .list_forwarding_rules(project)
            .await
            .map_err(TeardownError::remote(stage))?;
        for name in &names {
            self.api
                .delete_forwarding_rule(project, name)
                .await
                .map_err(TeardownError::remote(stage))?;
            info!(forwarding_rule = %name, "deletion requested");
        }
        Ok(names.len())
    }

    async fn delete_proxies(&self, project: &str) -> Result<usize, TeardownError> {
        let stage = TeardownStage::DeleteProxies;
        info!(%stage);
        let names = self
            .api
            .list_proxies(project)
            .await
            .map_err(TeardownError::remote(stage))?;
        for name in &names {
            self.api
                .delete_proxy(project, name)
                .await
                .map_err(TeardownError::remote(stage))?;
            info!(proxy = %name, "deletion requested");
        }
        Ok(names.len())
    }

    async fn await_forwarding_rules_gone(
        &self,
        project: &str,
        stage: TeardownStage,
    ) -> Result<(), TeardownError> {
        info!(%stage);
        let api = &self.api;
        await_empty(self.poll_settings, "forwarding rules to disappear", move || {
            api.list_forwarding_rules(project)
        })
        .await
        .map_err(TeardownError::waiting(stage))
    }
}
