//! ECS and VPC request/response types
//!
//! Requests serialize to the provider's PascalCase parameter names. Optional
//! parameters left as `None` are omitted so the provider applies its own
//! defaults.

use chrono::{DateTime, NaiveDateTime, Utc};
use ecs_actuator_common::{InstanceStatus, Tag, Tenancy};
use serde::Serialize;

/// Start time layouts returned by DescribeInstances
const START_TIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%dT%H:%MZ"];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeImagesRequest {
    pub region_id: String,
    pub image_id: String,
    pub show_expired: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeSecurityGroupsRequest {
    pub region_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_group_id: Option<String>,
    #[serde(rename = "Tag")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeVSwitchesRequest {
    pub region_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(rename = "Tag")]
    pub tags: Vec<Tag>,
}

/// DescribeInstances, either by ID list or by tag query
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeInstancesRequest {
    pub region_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub instance_ids: Vec<String>,
    #[serde(rename = "Tag", skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

impl DescribeInstancesRequest {
    pub fn by_ids(region_id: impl Into<String>, instance_ids: Vec<String>) -> Self {
        Self {
            region_id: region_id.into(),
            instance_ids,
            tags: Vec::new(),
        }
    }

    pub fn by_tags(region_id: impl Into<String>, tags: Vec<Tag>) -> Self {
        Self {
            region_id: region_id.into(),
            instance_ids: Vec::new(),
            tags,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SystemDiskParams {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance_level: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataDiskParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub category: String,
    pub encrypted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance_level: Option<String>,
    #[serde(rename = "KMSKeyId", skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_with_instance: Option<bool>,
}

/// RunInstances parameters for a single machine instance
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RunInstancesRequest {
    pub region_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_group_id: Option<String>,
    pub image_id: String,
    pub instance_type: String,
    pub instance_name: String,
    pub host_name: String,
    pub security_group_ids: Vec<String>,
    #[serde(rename = "VSwitchId")]
    pub v_switch_id: String,
    pub amount: u32,
    pub min_amount: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ram_role_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internet_max_bandwidth_in: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internet_max_bandwidth_out: Option<i64>,
    pub system_disk: SystemDiskParams,
    #[serde(rename = "DataDisk", skip_serializing_if = "Vec::is_empty")]
    pub data_disks: Vec<DataDiskParams>,
    /// Base64 encoded user data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
    pub tenancy: Tenancy,
    #[serde(rename = "Tag")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StopInstancesRequest {
    pub region_id: String,
    #[serde(rename = "InstanceId")]
    pub instance_ids: Vec<String>,
}

/// Additive tag update: existing tags with other keys are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TagResourcesRequest {
    pub region_id: String,
    pub resource_type: String,
    #[serde(rename = "ResourceId")]
    pub resource_ids: Vec<String>,
    #[serde(rename = "Tag")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Image {
    pub image_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecurityGroup {
    pub security_group_id: String,
    pub vpc_id: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VSwitch {
    pub v_switch_id: String,
    pub zone_id: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunInstancesResponse {
    pub request_id: String,
    pub instance_ids: Vec<String>,
}

/// Per-instance result of a batch call such as StopInstances
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceResponse {
    pub instance_id: String,
    pub code: String,
    pub message: String,
    pub previous_status: String,
    pub current_status: String,
}

/// ECS instance as returned by DescribeInstances
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Instance {
    pub instance_id: String,
    pub instance_name: String,
    pub instance_type: String,
    pub region_id: String,
    pub zone_id: String,
    /// Raw provider status, see [`Instance::state`]
    pub status: String,
    pub start_time: Option<String>,
    pub private_ip_addresses: Vec<String>,
    pub tags: Vec<Tag>,
}

impl Instance {
    /// Lifecycle state, None when the provider status is not one we manage
    pub fn state(&self) -> Option<InstanceStatus> {
        InstanceStatus::parse(&self.status)
    }

    pub fn is_running(&self) -> bool {
        self.state() == Some(InstanceStatus::Running)
    }

    /// Parsed start time, None when missing or unparseable
    pub fn launch_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
            .as_deref()
            .filter(|s| !s.is_empty())
            .and_then(parse_start_time)
    }

    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.as_str())
    }
}

/// Parse an ECS start time (UTC, with or without seconds)
pub fn parse_start_time(s: &str) -> Option<DateTime<Utc>> {
    START_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.and_utc())
}
