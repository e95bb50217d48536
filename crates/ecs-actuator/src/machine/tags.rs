//! Ownership tag repair for existing instances

use super::Actuator;
use crate::config::Machine;
use crate::ecs::{EcsOperations, Instance, TagResourcesRequest};
use crate::error::{ActuatorError, Result};
use crate::metrics::FailureReporter;
use ecs_actuator_common::defaults::TAG_RESOURCE_TYPE_INSTANCE;
use ecs_actuator_common::tags::{
    CLUSTER_TAG_VALUE, NAME_TAG_KEY, OWNED_TAG_KEY, OWNED_TAG_VALUE, cluster_tag_key,
    ownership_tags,
};
use tracing::{debug, info};

/// Whether the instance carries the name, cluster and ownership markers.
///
/// Tags with an empty key or value never count.
pub fn has_ownership_tags(instance: &Instance, cluster_id: &str, machine_name: &str) -> bool {
    let cluster_key = cluster_tag_key(cluster_id);
    let (mut name_ok, mut cluster_ok, mut owned_ok) = (false, false, false);

    for tag in instance
        .tags
        .iter()
        .filter(|t| !t.key.is_empty() && !t.value.is_empty())
    {
        if tag.key == NAME_TAG_KEY {
            name_ok = tag.value == machine_name;
        } else if tag.key == cluster_key {
            cluster_ok = tag.value == CLUSTER_TAG_VALUE;
        } else if tag.key == OWNED_TAG_KEY {
            owned_ok = tag.value == OWNED_TAG_VALUE;
        }
    }

    name_ok && cluster_ok && owned_ok
}

impl<A: EcsOperations, R: FailureReporter> Actuator<A, R> {
    /// Re-apply the ownership markers when any is missing or wrong.
    ///
    /// TagResources merges keys, so user tags on the instance are kept.
    pub async fn correct_existing_tags(
        &self,
        machine: &Machine,
        region: &str,
        instance: &Instance,
    ) -> Result<()> {
        let cluster_id = machine.require_cluster_id()?;

        if has_ownership_tags(instance, cluster_id, &machine.name) {
            debug!(instance_id = %instance.instance_id, "Ownership tags are up to date");
            return Ok(());
        }

        info!(
            machine = %machine.name,
            instance_id = %instance.instance_id,
            "Correcting ownership tags"
        );

        self.api
            .tag_resources(TagResourcesRequest {
                region_id: region.to_string(),
                resource_type: TAG_RESOURCE_TYPE_INSTANCE.to_string(),
                resource_ids: vec![instance.instance_id.clone()],
                tags: ownership_tags(cluster_id, &machine.name),
            })
            .await
            .map_err(|e| {
                ActuatorError::provider(
                    format!("error tagging instance {}", instance.instance_id),
                    e,
                )
            })
    }
}
