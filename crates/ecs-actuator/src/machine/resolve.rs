//! Image, vSwitch and security group resolution

use super::{Actuator, non_empty};
use crate::config::{Machine, MachineProviderConfig, ResourceReference};
use crate::ecs::{
    DescribeImagesRequest, DescribeSecurityGroupsRequest, DescribeVSwitchesRequest, EcsOperations,
};
use crate::error::{ActuatorError, Result};
use crate::metrics::FailureReporter;
use ecs_actuator_common::Tag;
use ecs_actuator_common::defaults::IMAGE_STATUS_AVAILABLE;
use tracing::{debug, error, info};

/// Provider IDs a RunInstances call needs, resolved for one reconcile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedResources {
    pub image_id: String,
    pub v_switch_id: String,
    pub security_group_ids: Vec<String>,
}

impl ResolvedResources {
    /// Resolve without calling the provider.
    ///
    /// Literal IDs are used as-is; tag queries are replaced by a
    /// `<tags:k=v,...>` placeholder. Used for offline rendering.
    pub fn placeholders(config: &MachineProviderConfig) -> Self {
        let reference = |r: &ResourceReference| match r.id() {
            Some(id) => id.to_string(),
            None => format!("<tags:{}>", format_tags(&r.tags)),
        };
        Self {
            image_id: config.image_id.clone(),
            v_switch_id: reference(&config.v_switch),
            security_group_ids: config
                .security_groups
                .iter()
                .filter(|sg| !sg.is_empty())
                .map(reference)
                .collect(),
        }
    }
}

fn format_tags(tags: &[Tag]) -> String {
    tags.iter()
        .map(|t| format!("{}={}", t.key, t.value))
        .collect::<Vec<_>>()
        .join(",")
}

impl<A: EcsOperations, R: FailureReporter> Actuator<A, R> {
    /// Resolve every resource referenced by the provider spec
    pub async fn resolve_resources(
        &self,
        machine: &Machine,
        config: &MachineProviderConfig,
    ) -> Result<ResolvedResources> {
        let image_id = self.resolve_image_id(machine, config).await?;
        let security_group_ids = self.resolve_security_group_ids(machine, config).await?;
        let v_switch_id = self.resolve_vswitch_id(machine, config).await?;
        Ok(ResolvedResources {
            image_id,
            v_switch_id,
            security_group_ids,
        })
    }

    /// Validate the configured image: it must exist and be available
    pub async fn resolve_image_id(
        &self,
        machine: &Machine,
        config: &MachineProviderConfig,
    ) -> Result<String> {
        if config.image_id.is_empty() {
            return Err(ActuatorError::invalid_configuration("no image ID provided"));
        }

        info!(
            machine = %machine.name,
            image_id = %config.image_id,
            region = %config.region_id,
            "Validating image"
        );

        let images = self
            .api
            .describe_images(DescribeImagesRequest {
                region_id: config.region_id.clone(),
                image_id: config.image_id.clone(),
                show_expired: true,
            })
            .await
            .map_err(|e| ActuatorError::provider("error describing images", e))?;

        let Some(image) = images.first() else {
            error!(image_id = %config.image_id, "Image not found");
            return Err(ActuatorError::invalid_configuration(format!(
                "image {} not found in region {}",
                config.image_id, config.region_id
            )));
        };

        if image.status != IMAGE_STATUS_AVAILABLE {
            error!(image_id = %image.image_id, status = %image.status, "Image is not available");
            return Err(ActuatorError::invalid_configuration(format!(
                "image {} has invalid status {}",
                config.image_id, image.status
            )));
        }

        Ok(image.image_id.clone())
    }

    /// Resolve the vSwitch: a literal ID wins, otherwise the first vSwitch
    /// in the VPC matching the tags.
    pub async fn resolve_vswitch_id(
        &self,
        machine: &Machine,
        config: &MachineProviderConfig,
    ) -> Result<String> {
        let reference = &config.v_switch;
        if reference.is_empty() {
            return Err(ActuatorError::invalid_configuration(
                "no vswitch configuration provided",
            ));
        }

        if let Some(id) = reference.id() {
            return Ok(id.to_string());
        }

        info!(
            machine = %machine.name,
            region = %config.region_id,
            tags = %format_tags(&reference.tags),
            "Looking up vSwitch by tags"
        );

        let vswitches = self
            .api
            .describe_vswitches(DescribeVSwitchesRequest {
                region_id: config.region_id.clone(),
                vpc_id: non_empty(&config.vpc_id),
                tags: reference.tags.clone(),
            })
            .await
            .map_err(|e| ActuatorError::provider("error describing vswitches", e))?;

        match vswitches.first() {
            Some(vswitch) => {
                debug!(v_switch_id = %vswitch.v_switch_id, matches = vswitches.len(), "Resolved vSwitch");
                Ok(vswitch.v_switch_id.clone())
            }
            None => Err(ActuatorError::invalid_configuration(format!(
                "no vswitches found for tags [{}] in vpc {:?}, region {}",
                format_tags(&reference.tags),
                config.vpc_id,
                config.region_id
            ))),
        }
    }

    /// Resolve every security group reference, keeping configuration order.
    ///
    /// A literal ID contributes itself; a tag query contributes every match.
    pub async fn resolve_security_group_ids(
        &self,
        machine: &Machine,
        config: &MachineProviderConfig,
    ) -> Result<Vec<String>> {
        if config.security_groups.is_empty() {
            return Err(ActuatorError::invalid_configuration(
                "no security group configuration provided",
            ));
        }

        info!(machine = %machine.name, region = %config.region_id, "Resolving security groups");

        let mut ids = Vec::new();
        for reference in &config.security_groups {
            if let Some(id) = reference.id() {
                ids.push(id.to_string());
            } else if !reference.tags.is_empty() {
                ids.extend(self.security_group_ids_by_tags(config, &reference.tags).await?);
            }
        }

        if ids.is_empty() {
            return Err(ActuatorError::invalid_configuration(
                "no security group IDs found from configuration",
            ));
        }
        Ok(ids)
    }

    async fn security_group_ids_by_tags(
        &self,
        config: &MachineProviderConfig,
        tags: &[Tag],
    ) -> Result<Vec<String>> {
        let groups = self
            .api
            .describe_security_groups(DescribeSecurityGroupsRequest {
                region_id: config.region_id.clone(),
                vpc_id: non_empty(&config.vpc_id),
                resource_group_id: non_empty(&config.resource_group_id),
                tags: tags.to_vec(),
            })
            .await
            .map_err(|e| ActuatorError::provider("error describing security groups", e))?;

        if groups.is_empty() {
            return Err(ActuatorError::invalid_configuration(format!(
                "no security groups found for tags [{}]",
                format_tags(tags)
            )));
        }

        Ok(groups.into_iter().map(|g| g.security_group_id).collect())
    }
}
