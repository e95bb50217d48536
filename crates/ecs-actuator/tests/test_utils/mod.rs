//! Shared test utilities for integration tests
//!
//! [`FakeEcs`] is an in-memory ECS region. Instances it launches start
//! `Pending` and turn `Running` after a configurable number of describes.

#![allow(dead_code)]

use anyhow::{Result, bail};
use ecs_actuator::config::ResourceReference;
use ecs_actuator::ecs::{
    DescribeImagesRequest, DescribeInstancesRequest, DescribeSecurityGroupsRequest,
    DescribeVSwitchesRequest, EcsOperations, Image, Instance, InstanceResponse,
    RunInstancesRequest, RunInstancesResponse, SecurityGroup, StopInstancesRequest,
    TagResourcesRequest, VSwitch,
};
use ecs_actuator::{Machine, MachineProviderConfig};
use ecs_actuator_common::Tag;
use std::sync::Mutex;

pub const REGION: &str = "cn-hangzhou";
pub const CLUSTER_ID: &str = "cluster-int";
pub const VPC_ID: &str = "vpc-int";

#[derive(Default)]
struct State {
    images: Vec<Image>,
    security_groups: Vec<(SecurityGroup, Vec<Tag>)>,
    vswitches: Vec<(VSwitch, String, Vec<Tag>)>,
    instances: Vec<Instance>,
    describe_counts: Vec<usize>,
    launched: Vec<RunInstancesRequest>,
    stopped: Vec<StopInstancesRequest>,
    tagged: Vec<TagResourcesRequest>,
    next_id: usize,
}

/// In-memory stand-in for one ECS region
pub struct FakeEcs {
    state: Mutex<State>,
    boot_polls: usize,
}

impl FakeEcs {
    /// A region with one available image, a tagged vSwitch and a tagged
    /// security group. New instances need `boot_polls` describes to run.
    pub fn new(boot_polls: usize) -> Self {
        let state = State {
            images: vec![Image {
                image_id: "img-int".to_string(),
                status: "Available".to_string(),
            }],
            security_groups: vec![(
                SecurityGroup {
                    security_group_id: "sg-int".to_string(),
                    vpc_id: VPC_ID.to_string(),
                },
                vec![Tag::new("role", "worker")],
            )],
            vswitches: vec![(
                VSwitch {
                    v_switch_id: "vsw-int".to_string(),
                    zone_id: "cn-hangzhou-h".to_string(),
                },
                VPC_ID.to_string(),
                vec![Tag::new("Name", "cluster-int-vsw")],
            )],
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
            boot_polls,
        }
    }

    /// Seed an existing instance
    pub fn insert_instance(&self, instance: Instance) {
        let mut state = self.state.lock().unwrap();
        state.instances.push(instance);
        state.describe_counts.push(0);
    }

    pub fn instance(&self, id: &str) -> Option<Instance> {
        let state = self.state.lock().unwrap();
        state.instances.iter().find(|i| i.instance_id == id).cloned()
    }

    pub fn launched(&self) -> Vec<RunInstancesRequest> {
        self.state.lock().unwrap().launched.clone()
    }

    pub fn stopped(&self) -> Vec<StopInstancesRequest> {
        self.state.lock().unwrap().stopped.clone()
    }

    pub fn tagged(&self) -> Vec<TagResourcesRequest> {
        self.state.lock().unwrap().tagged.clone()
    }
}

fn matches_tags(have: &[Tag], want: &[Tag]) -> bool {
    want.iter().all(|w| have.contains(w))
}

impl EcsOperations for FakeEcs {
    async fn describe_images(&self, request: DescribeImagesRequest) -> Result<Vec<Image>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .images
            .iter()
            .filter(|i| i.image_id == request.image_id)
            .cloned()
            .collect())
    }

    async fn describe_security_groups(
        &self,
        request: DescribeSecurityGroupsRequest,
    ) -> Result<Vec<SecurityGroup>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .security_groups
            .iter()
            .filter(|(sg, tags)| {
                request.vpc_id.as_deref().is_none_or(|vpc| vpc == sg.vpc_id)
                    && matches_tags(tags, &request.tags)
            })
            .map(|(sg, _)| sg.clone())
            .collect())
    }

    async fn describe_vswitches(&self, request: DescribeVSwitchesRequest) -> Result<Vec<VSwitch>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .vswitches
            .iter()
            .filter(|(_, vpc, tags)| {
                request.vpc_id.as_deref().is_none_or(|want| want == vpc)
                    && matches_tags(tags, &request.tags)
            })
            .map(|(vsw, _, _)| vsw.clone())
            .collect())
    }

    async fn run_instances(&self, request: RunInstancesRequest) -> Result<RunInstancesResponse> {
        let mut state = self.state.lock().unwrap();
        if !state.images.iter().any(|i| i.image_id == request.image_id) {
            bail!("InvalidImageId.NotFound: {}", request.image_id);
        }

        state.next_id += 1;
        let id = format!("i-int{:03}", state.next_id);
        let instance = Instance {
            instance_id: id.clone(),
            instance_name: request.instance_name.clone(),
            instance_type: request.instance_type.clone(),
            region_id: request.region_id.clone(),
            status: "Pending".to_string(),
            start_time: Some(format!("2024-05-01T10:{:02}Z", state.next_id)),
            tags: request.tags.clone(),
            ..Default::default()
        };
        state.instances.push(instance);
        state.describe_counts.push(0);
        state.launched.push(request);

        Ok(RunInstancesResponse {
            request_id: format!("req-{}", state.next_id),
            instance_ids: vec![id],
        })
    }

    async fn describe_instances(&self, request: DescribeInstancesRequest) -> Result<Vec<Instance>> {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        let mut found = Vec::new();

        for (instance, count) in state.instances.iter_mut().zip(&mut state.describe_counts) {
            let selected = if request.instance_ids.is_empty() {
                matches_tags(&instance.tags, &request.tags)
            } else {
                request.instance_ids.contains(&instance.instance_id)
            };
            if !selected {
                continue;
            }

            if instance.status == "Pending" {
                *count += 1;
                if *count > self.boot_polls {
                    instance.status = "Running".to_string();
                }
            }
            found.push(instance.clone());
        }
        Ok(found)
    }

    async fn stop_instances(&self, request: StopInstancesRequest) -> Result<Vec<InstanceResponse>> {
        let mut state = self.state.lock().unwrap();
        let mut responses = Vec::new();
        for instance in state
            .instances
            .iter_mut()
            .filter(|i| request.instance_ids.contains(&i.instance_id))
        {
            responses.push(InstanceResponse {
                instance_id: instance.instance_id.clone(),
                previous_status: instance.status.clone(),
                current_status: "Stopping".to_string(),
                ..Default::default()
            });
            instance.status = "Stopped".to_string();
        }
        state.stopped.push(request);
        Ok(responses)
    }

    async fn tag_resources(&self, request: TagResourcesRequest) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        for instance in state
            .instances
            .iter_mut()
            .filter(|i| request.resource_ids.contains(&i.instance_id))
        {
            for tag in &request.tags {
                match instance.tags.iter_mut().find(|t| t.key == tag.key) {
                    Some(existing) => existing.value = tag.value.clone(),
                    None => instance.tags.push(tag.clone()),
                }
            }
        }
        state.tagged.push(request);
        Ok(())
    }
}

pub fn machine(name: &str) -> Machine {
    Machine::new(name, "openshift-machine-api").with_cluster_id(CLUSTER_ID)
}

/// Provider spec resolving the vSwitch and security groups by tags
pub fn provider_config() -> MachineProviderConfig {
    MachineProviderConfig {
        region_id: REGION.to_string(),
        instance_type: "ecs.g6.large".to_string(),
        image_id: "img-int".to_string(),
        vpc_id: VPC_ID.to_string(),
        v_switch: ResourceReference::by_tags(vec![Tag::new("Name", "cluster-int-vsw")]),
        security_groups: vec![ResourceReference::by_tags(vec![Tag::new("role", "worker")])],
        tags: vec![Tag::new("team", "infra")],
        ..Default::default()
    }
}

/// An instance seeded as if created earlier for `machine`
pub fn seeded_instance(id: &str, machine: &str, status: &str, start_time: &str) -> Instance {
    Instance {
        instance_id: id.to_string(),
        instance_name: machine.to_string(),
        region_id: REGION.to_string(),
        status: status.to_string(),
        start_time: Some(start_time.to_string()),
        tags: ecs_actuator_common::tags::ownership_tags(CLUSTER_ID, machine),
        ..Default::default()
    }
}
