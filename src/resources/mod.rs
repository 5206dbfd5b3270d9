//! Request bodies for the resources managed by the orchestrator.
//!
//! Each body is built in memory immediately before the call that realises it
//! and serialises to the Compute Engine / Cloud DNS JSON shape.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::EnvironmentConfig;
use crate::payloads::InstancePayloads;

pub(crate) const COMPUTE_SELF_LINK_BASE: &str = "https://www.googleapis.com/compute/v1";
const DEFAULT_NETWORK: &str = "global/networks/default";
const HTTPS_PORT_RANGE: &str = "443-443";

/// Metadata key read by cloud-init on Container-Optimized OS.
pub const USER_DATA_KEY: &str = "user-data";
/// Metadata key read by the Container-Optimized OS container agent.
pub const CONTAINER_DECLARATION_KEY: &str = "gce-container-declaration";

/// Kinds of resource the orchestrator realises.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResourceKind {
    /// Global target HTTPS proxy.
    TargetProxy,
    /// Global forwarding rule.
    ForwardingRule,
    /// Compute instance.
    Instance,
    /// Membership of an instance in an unmanaged instance group.
    InstanceGroupMembership,
    /// DNS record set in a managed zone.
    DnsRecordSet,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::TargetProxy => "target HTTPS proxy",
            Self::ForwardingRule => "forwarding rule",
            Self::Instance => "instance",
            Self::InstanceGroupMembership => "instance group membership",
            Self::DnsRecordSet => "DNS record set",
        };
        f.write_str(label)
    }
}

/// Body of a `targetHttpsProxies.insert` call.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetHttpsProxy {
    /// Proxy name.
    pub name: String,
    /// Always `HTTPS`.
    pub protocol: String,
    /// QUIC negotiation policy.
    pub quic_override: String,
    /// Relative links of the certificates served by the proxy.
    pub ssl_certificates: Vec<String>,
    /// Relative link of the URL map the proxy routes to.
    pub url_map: String,
}

impl TargetHttpsProxy {
    /// Builds the proxy for an environment. The certificate and URL map must
    /// already exist.
    #[must_use]
    pub fn for_environment(config: &EnvironmentConfig) -> Self {
        let project = &config.project;
        Self {
            name: config.proxy_name.clone(),
            protocol: String::from("HTTPS"),
            quic_override: String::from("NONE"),
            ssl_certificates: vec![format!(
                "projects/{project}/global/sslCertificates/{}",
                config.ssl_certificate
            )],
            url_map: format!("projects/{project}/global/urlMaps/{}", config.url_map),
        }
    }
}

/// Body of a `globalForwardingRules.insert` call.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardingRule {
    /// Rule name.
    pub name: String,
    /// Transport protocol.
    #[serde(rename = "IPProtocol")]
    pub ip_protocol: String,
    /// Address family.
    pub ip_version: String,
    /// Load balancing scheme.
    pub load_balancing_scheme: String,
    /// Network service tier.
    pub network_tier: String,
    /// Inclusive port range, for example `443-443`.
    pub port_range: String,
    /// Relative link of the target proxy.
    pub target: String,
}

impl ForwardingRule {
    /// Builds the HTTPS forwarding rule bound to the environment's proxy.
    #[must_use]
    pub fn for_environment(config: &EnvironmentConfig) -> Self {
        Self {
            name: config.forwarding_rule_name.clone(),
            ip_protocol: String::from("TCP"),
            ip_version: String::from("IPV4"),
            load_balancing_scheme: String::from("EXTERNAL"),
            network_tier: String::from("PREMIUM"),
            port_range: String::from(HTTPS_PORT_RANGE),
            target: format!(
                "projects/{}/global/targetHttpsProxies/{}",
                config.project, config.proxy_name
            ),
        }
    }
}

/// Body of an `instances.insert` call.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    /// Instance name.
    pub name: String,
    /// Zone-relative machine type link.
    pub machine_type: String,
    /// Boot disk followed by attached data disks.
    pub disks: Vec<AttachedDisk>,
    /// Network interfaces.
    pub network_interfaces: Vec<NetworkInterface>,
    /// Key/value metadata readable from inside the instance.
    pub metadata: Metadata,
}

/// Disk attached to an instance at creation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedDisk {
    /// Whether this is the boot disk.
    pub boot: bool,
    /// Whether the disk is deleted together with the instance.
    pub auto_delete: bool,
    /// Parameters for a disk created alongside the instance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initialize_params: Option<InitializeParams>,
    /// Link of an existing disk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Parameters for a boot disk created from an image.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Image self-link.
    pub source_image: String,
}

/// Network interface of an instance.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    /// Network link.
    pub network: String,
    /// External access configurations.
    pub access_configs: Vec<AccessConfig>,
}

/// External NAT configuration of a network interface.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct AccessConfig {
    /// Access type, `ONE_TO_ONE_NAT`.
    #[serde(rename = "type")]
    pub access_type: String,
    /// Display name.
    pub name: String,
}

/// Instance metadata.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Metadata {
    /// Metadata entries.
    pub items: Vec<MetadataItem>,
}

/// Single metadata entry.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct MetadataItem {
    /// Entry key.
    pub key: String,
    /// Entry value, passed verbatim.
    pub value: String,
}

impl Instance {
    /// Builds the instance for an environment.
    ///
    /// The boot disk is created from `source_image` and deleted with the
    /// instance; the configured data disk is attached by name and survives it.
    #[must_use]
    pub fn for_environment(
        config: &EnvironmentConfig,
        cpus: CpuCount,
        source_image: &str,
        payloads: &InstancePayloads,
    ) -> Self {
        let project = &config.project;
        let zone = &config.zone;
        Self {
            name: config.instance_name.clone(),
            machine_type: format!(
                "zones/{zone}/machineTypes/{}-{cpus}",
                config.machine_series
            ),
            disks: vec![
                AttachedDisk {
                    boot: true,
                    auto_delete: true,
                    initialize_params: Some(InitializeParams {
                        source_image: source_image.to_owned(),
                    }),
                    source: None,
                },
                AttachedDisk {
                    boot: false,
                    auto_delete: false,
                    initialize_params: None,
                    source: Some(format!(
                        "projects/{project}/zones/{zone}/disks/{}",
                        config.disk_name
                    )),
                },
            ],
            network_interfaces: vec![NetworkInterface {
                network: String::from(DEFAULT_NETWORK),
                access_configs: vec![AccessConfig {
                    access_type: String::from("ONE_TO_ONE_NAT"),
                    name: String::from("External NAT"),
                }],
            }],
            metadata: Metadata {
                items: vec![
                    MetadataItem {
                        key: String::from(USER_DATA_KEY),
                        value: payloads.init_script.clone(),
                    },
                    MetadataItem {
                        key: String::from(CONTAINER_DECLARATION_KEY),
                        value: payloads.container_spec.clone(),
                    },
                ],
            },
        }
    }
}

/// Fully qualified self-link of the environment's instance, as required by
/// `instanceGroups.addInstances`.
#[must_use]
pub fn instance_self_link(config: &EnvironmentConfig) -> String {
    format!(
        "{COMPUTE_SELF_LINK_BASE}/projects/{}/zones/{}/instances/{}",
        config.project, config.zone, config.instance_name
    )
}

/// Body of an `instanceGroups.addInstances` call.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct InstanceGroupMembership {
    /// Instances to add.
    pub instances: Vec<InstanceReference>,
}

/// Reference to an instance by self-link.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct InstanceReference {
    /// Instance self-link.
    pub instance: String,
}

impl InstanceGroupMembership {
    /// Builds a membership request for a single instance.
    #[must_use]
    pub fn single(instance_link: &str) -> Self {
        Self {
            instances: vec![InstanceReference {
                instance: instance_link.to_owned(),
            }],
        }
    }
}

/// DNS record set, identified by `(name, type)` within a managed zone.
///
/// Fields beyond the four the orchestrator reads are kept in `extra` so a
/// record read from the service can be submitted back as an exact deletion.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ResourceRecordSet {
    /// Fully qualified record name, usually with a trailing dot.
    pub name: String,
    /// Record type, for example `A`.
    #[serde(rename = "type")]
    pub record_type: String,
    /// Time to live in seconds.
    #[serde(default)]
    pub ttl: u32,
    /// Record data, in order.
    #[serde(default)]
    pub rrdatas: Vec<String>,
    /// Remaining fields as returned by the service.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ResourceRecordSet {
    /// Creates a record set with no extra fields.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        record_type: impl Into<String>,
        ttl: u32,
        rrdatas: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.into(),
            ttl,
            rrdatas,
            extra: BTreeMap::new(),
        }
    }

    /// Returns a copy with its record data replaced by `rrdatas`.
    #[must_use]
    pub fn with_rrdatas(&self, rrdatas: Vec<String>) -> Self {
        Self {
            rrdatas,
            ..self.clone()
        }
    }
}

/// Body of a `changes.create` call.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DnsChange {
    /// Record sets to add.
    pub additions: Vec<ResourceRecordSet>,
    /// Record sets to delete; each must match the live record exactly.
    pub deletions: Vec<ResourceRecordSet>,
}

/// Number of vCPUs requested for the instance. Always at least one.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CpuCount(u32);

impl CpuCount {
    /// Wraps a CPU count, rejecting zero.
    #[must_use]
    pub const fn new(value: u32) -> Option<Self> {
        if value == 0 { None } else { Some(Self(value)) }
    }

    /// Returns the wrapped count.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl Default for CpuCount {
    fn default() -> Self {
        Self(1)
    }
}

impl fmt::Display for CpuCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
