//! Alibaba Cloud ECS/VPC API surface used by the actuator
//!
//! The vendor SDK (request signing, transport, pagination) lives behind
//! [`EcsOperations`]. The actuator only depends on this trait, so unit tests
//! run against mocks and embedders plug in their own client.

mod types;

pub use types::{
    DataDiskParams, DescribeImagesRequest, DescribeInstancesRequest,
    DescribeSecurityGroupsRequest, DescribeVSwitchesRequest, Image, Instance, InstanceResponse,
    RunInstancesRequest, RunInstancesResponse, SecurityGroup, StopInstancesRequest,
    SystemDiskParams, TagResourcesRequest, VSwitch, parse_start_time,
};

use anyhow::Result;

/// Provider operations the actuator needs.
///
/// All calls are single synchronous request/response round trips; the
/// actuator never retries them inline.
///
/// Requests are passed by value to work around mockall lifetime limitations.
#[allow(async_fn_in_trait)] // Implementations are driven from one task at a time
#[cfg_attr(test, mockall::automock)]
pub trait EcsOperations: Send + Sync {
    /// DescribeImages
    async fn describe_images(&self, request: DescribeImagesRequest) -> Result<Vec<Image>>;

    /// DescribeSecurityGroups filtered by tags
    async fn describe_security_groups(
        &self,
        request: DescribeSecurityGroupsRequest,
    ) -> Result<Vec<SecurityGroup>>;

    /// DescribeVSwitches filtered by tags
    async fn describe_vswitches(&self, request: DescribeVSwitchesRequest) -> Result<Vec<VSwitch>>;

    /// RunInstances (not idempotent)
    async fn run_instances(&self, request: RunInstancesRequest) -> Result<RunInstancesResponse>;

    /// DescribeInstances by ID list or by tags
    async fn describe_instances(&self, request: DescribeInstancesRequest)
    -> Result<Vec<Instance>>;

    /// StopInstances for a batch of instances
    async fn stop_instances(&self, request: StopInstancesRequest) -> Result<Vec<InstanceResponse>>;

    /// TagResources (adds or replaces the given keys only)
    async fn tag_resources(&self, request: TagResourcesRequest) -> Result<()>;
}
