//! Machine and provider configuration types
//!
//! The orchestrator stores the provider spec of a machine as JSON with
//! camelCase keys. These types mirror that layout and are validated with
//! `garde` before any provider call is made.

use crate::error::ActuatorError;
use crate::wait::WaitConfig;
use anyhow::Context;
use ecs_actuator_common::defaults::{CLUSTER_ID_LABEL, DEFAULT_LAUNCH_GRACE_SECS};
use ecs_actuator_common::{Tag, Tenancy};
use garde::Validate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Identity of the machine object being reconciled
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Machine {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            labels: BTreeMap::new(),
        }
    }

    /// Set the cluster ID label
    pub fn with_cluster_id(mut self, cluster_id: impl Into<String>) -> Self {
        self.labels
            .insert(CLUSTER_ID_LABEL.to_string(), cluster_id.into());
        self
    }

    /// Cluster ID from the machine labels, if set and non-empty
    pub fn cluster_id(&self) -> Option<&str> {
        self.labels
            .get(CLUSTER_ID_LABEL)
            .map(String::as_str)
            .filter(|id| !id.is_empty())
    }

    /// Cluster ID, or a configuration error when the label is missing
    pub fn require_cluster_id(&self) -> Result<&str, ActuatorError> {
        self.cluster_id().ok_or_else(|| {
            ActuatorError::invalid_configuration(format!(
                "machine {} is missing the {CLUSTER_ID_LABEL} label",
                self.name
            ))
        })
    }
}

/// Reference to a provider resource, either by ID or by a tag query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, garde::Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResourceReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[garde(skip)]
    pub tags: Vec<Tag>,
}

impl ResourceReference {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            tags: Vec::new(),
        }
    }

    pub fn by_tags(tags: Vec<Tag>) -> Self {
        Self { id: None, tags }
    }

    /// The literal ID, ignoring an empty string
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.id().is_none() && self.tags.is_empty()
    }
}

/// System disk settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, garde::Validate)]
#[serde(rename_all = "camelCase")]
pub struct SystemDisk {
    #[serde(default)]
    #[garde(skip)]
    pub category: String,
    /// Size in GiB, 0 keeps the provider default
    #[serde(default)]
    #[garde(range(min = 0))]
    pub size: i64,
    #[serde(default)]
    #[garde(skip)]
    pub name: String,
    #[serde(default)]
    #[garde(skip)]
    pub performance_level: String,
}

/// Data disk encryption setting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiskEncryption {
    #[serde(rename = "encrypted")]
    Enabled,
    #[default]
    #[serde(rename = "disabled")]
    Disabled,
}

/// What happens to a data disk when its instance is deleted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiskPreservation {
    #[default]
    DeleteWithInstance,
    PreserveDisk,
}

/// Additional data disk settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, garde::Validate)]
#[serde(rename_all = "camelCase")]
pub struct DataDisk {
    #[serde(default)]
    #[garde(skip)]
    pub name: String,
    #[serde(default, rename = "snapshotID")]
    #[garde(skip)]
    pub snapshot_id: String,
    /// Size in GiB, 0 keeps the provider default
    #[serde(default)]
    #[garde(range(min = 0))]
    pub size: i64,
    #[serde(default)]
    #[garde(skip)]
    pub category: String,
    #[serde(default)]
    #[garde(skip)]
    pub performance_level: String,
    #[serde(default, rename = "kmsKeyID")]
    #[garde(skip)]
    pub kms_key_id: String,
    #[serde(default)]
    #[garde(skip)]
    pub disk_encryption: DiskEncryption,
    #[serde(default)]
    #[garde(skip)]
    pub disk_preservation: DiskPreservation,
}

/// Public network bandwidth limits in Mbit/s, 0 keeps the provider default
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, garde::Validate)]
#[serde(rename_all = "camelCase")]
pub struct Bandwidth {
    #[serde(default)]
    #[garde(range(min = 0))]
    pub internet_max_bandwidth_in: i64,
    #[serde(default)]
    #[garde(range(min = 0))]
    pub internet_max_bandwidth_out: i64,
}

/// Provider spec of a machine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, garde::Validate)]
#[serde(rename_all = "camelCase")]
pub struct MachineProviderConfig {
    /// Region to launch in (e.g. "cn-hangzhou")
    #[serde(rename = "regionID")]
    #[garde(length(min = 1))]
    pub region_id: String,

    /// ECS instance type (e.g. "ecs.g6.large")
    #[garde(length(min = 1))]
    pub instance_type: String,

    /// Image to boot from
    #[serde(default, rename = "imageID")]
    #[garde(skip)]
    pub image_id: String,

    /// VPC used to scope vSwitch and security group tag queries
    #[serde(default, rename = "vpcID")]
    #[garde(skip)]
    pub vpc_id: String,

    #[serde(default, rename = "resourceGroupID")]
    #[garde(skip)]
    pub resource_group_id: String,

    /// RAM role attached to the instance
    #[serde(default)]
    #[garde(skip)]
    pub ram_role_name: String,

    #[serde(default)]
    #[garde(dive)]
    pub v_switch: ResourceReference,

    #[serde(default)]
    #[garde(dive)]
    pub security_groups: Vec<ResourceReference>,

    #[serde(default)]
    #[garde(dive)]
    pub system_disk: SystemDisk,

    #[serde(default)]
    #[garde(dive)]
    pub data_disk: Vec<DataDisk>,

    #[serde(default)]
    #[garde(dive)]
    pub bandwidth: Bandwidth,

    /// Either "default" or "host"; empty means "default"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub tenancy: Option<String>,

    /// Extra tags for the instance
    #[serde(default)]
    #[garde(skip)]
    pub tags: Vec<Tag>,
}

impl MachineProviderConfig {
    /// Parse a provider spec from JSON
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Read and parse a provider spec file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read provider spec {}", path.display()))?;
        Self::from_json(&raw)
            .with_context(|| format!("Failed to parse provider spec {}", path.display()))
    }

    /// Check field constraints and the tenancy value
    pub fn check(&self) -> Result<(), ActuatorError> {
        self.validate()
            .map_err(|report| ActuatorError::invalid_configuration(report.to_string()))?;
        self.tenancy()?;
        Ok(())
    }

    /// Placement tenancy, `default` when unset
    pub fn tenancy(&self) -> Result<Tenancy, ActuatorError> {
        Tenancy::from_config(self.tenancy.as_deref()).ok_or_else(|| {
            ActuatorError::invalid_configuration(format!(
                "invalid tenancy {:?}, expected \"default\" or \"host\"",
                self.tenancy.as_deref().unwrap_or_default()
            ))
        })
    }
}

/// Timing knobs for the actuator
#[derive(Debug, Clone)]
pub struct ActuatorSettings {
    /// Sleep between RunInstances and the first status poll
    pub launch_grace: Duration,
    /// Poll configuration for waiting on a new instance to be running
    pub wait: WaitConfig,
}

impl Default for ActuatorSettings {
    fn default() -> Self {
        Self {
            launch_grace: Duration::from_secs(DEFAULT_LAUNCH_GRACE_SECS),
            wait: WaitConfig::default(),
        }
    }
}
