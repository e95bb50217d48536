//! Lookup, ordering and cleanup of existing instances

use super::Actuator;
use crate::config::Machine;
use crate::ecs::{
    DescribeInstancesRequest, EcsOperations, Instance, InstanceResponse, StopInstancesRequest,
};
use crate::error::{ActuatorError, Result};
use crate::metrics::FailureReporter;
use ecs_actuator_common::Tag;
use ecs_actuator_common::tags::{CLUSTER_TAG_VALUE, NAME_TAG_KEY, cluster_tag_key};
use tracing::{debug, error, info, warn};

/// Sort newest first by start time.
///
/// Instances without a parseable start time sort last. The sort is stable so
/// ties keep their provider order.
pub fn sort_instances(instances: &mut [Instance]) {
    instances.sort_by(|a, b| match (a.launch_time(), b.launch_time()) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

/// Reject an ID list with no usable IDs
pub(crate) fn require_instance_ids(instance_ids: &[String]) -> Result<()> {
    if instance_ids.iter().all(|id| id.is_empty()) {
        return Err(ActuatorError::MissingInstanceIds);
    }
    Ok(())
}

/// Instances currently in the `Running` state
pub fn running_instances(instances: &[Instance]) -> Vec<Instance> {
    instances.iter().filter(|i| i.is_running()).cloned().collect()
}

impl<A: EcsOperations, R: FailureReporter> Actuator<A, R> {
    /// Every instance tagged for this machine, in a supported state
    pub async fn existing_instances(&self, machine: &Machine, region: &str) -> Result<Vec<Instance>> {
        let cluster_id = machine.require_cluster_id()?;

        let tags = vec![
            Tag::new(cluster_tag_key(cluster_id), CLUSTER_TAG_VALUE),
            Tag::new(NAME_TAG_KEY, machine.name.as_str()),
        ];

        let instances = self
            .api
            .describe_instances(DescribeInstancesRequest::by_tags(region, tags))
            .await
            .map_err(|e| {
                ActuatorError::provider(
                    format!("error describing instances for machine {}", machine.name),
                    e,
                )
            })?;

        let supported: Vec<Instance> = instances
            .into_iter()
            .filter(|instance| {
                if instance.instance_id.is_empty() {
                    error!(machine = %machine.name, "Found instance without an ID, ignoring");
                    return false;
                }
                if instance.state().is_some() {
                    return true;
                }
                error!(
                    machine = %machine.name,
                    instance_id = %instance.instance_id,
                    status = %instance.status,
                    "Found instance in unsupported state, ignoring"
                );
                false
            })
            .collect();

        debug!(machine = %machine.name, count = supported.len(), "Listed existing instances");
        Ok(supported)
    }

    /// Look up a single instance by ID
    pub async fn existing_instance_by_id(&self, instance_id: &str, region: &str) -> Result<Instance> {
        let mut instances = self
            .describe_instances(region, vec![instance_id.to_string()])
            .await?;

        if instances.len() != 1 {
            return Err(ActuatorError::UnexpectedResult(format!(
                "found {} instances for ID {instance_id}, expected 1",
                instances.len()
            )));
        }

        let instance = instances.remove(0);
        if instance.state().is_none() {
            return Err(ActuatorError::UnsupportedState {
                instance_id: instance.instance_id,
                status: instance.status,
            });
        }
        Ok(instance)
    }

    /// DescribeInstances by ID list.
    ///
    /// An empty list is rejected: without IDs or tags the provider returns
    /// every instance in the region.
    pub async fn describe_instances(
        &self,
        region: &str,
        instance_ids: Vec<String>,
    ) -> Result<Vec<Instance>> {
        require_instance_ids(&instance_ids)?;
        let context = format!("error describing instances [{}]", instance_ids.join(","));
        self.api
            .describe_instances(DescribeInstancesRequest::by_ids(region, instance_ids))
            .await
            .map_err(|e| ActuatorError::provider(context, e))
    }

    /// Stop the running members of `instances` in one batch call.
    ///
    /// The candidates are described again first so the stop targets the
    /// current state; instances that are not running are left alone.
    pub async fn stop_instances(
        &self,
        region: &str,
        instances: &[Instance],
    ) -> Result<Vec<InstanceResponse>> {
        if instances.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = instances.iter().map(|i| i.instance_id.clone()).collect();
        let current = self.describe_instances(region, ids.clone()).await?;
        if current.is_empty() {
            return Err(ActuatorError::NotFound(format!(
                "instances [{}] in region {region}",
                ids.join(",")
            )));
        }

        let running: Vec<String> = running_instances(&current)
            .into_iter()
            .map(|i| i.instance_id)
            .collect();
        if running.is_empty() {
            info!(candidates = %ids.join(","), "No running instances to stop");
            return Ok(Vec::new());
        }

        warn!(instances = %running.join(","), region, "Stopping instances");

        let context = format!("error stopping instances [{}]", running.join(","));
        let responses = self
            .api
            .stop_instances(StopInstancesRequest {
                region_id: region.to_string(),
                instance_ids: running,
            })
            .await
            .map_err(|e| ActuatorError::provider(context, e))?;

        for response in responses.iter().filter(|r| !r.code.is_empty()) {
            warn!(
                instance_id = %response.instance_id,
                code = %response.code,
                message = %response.message,
                "Stop request reported a problem"
            );
        }

        Ok(responses)
    }
}
