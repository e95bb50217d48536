//! Instance launch

use super::instances::require_instance_ids;
use super::{Actuator, ResolvedResources, non_empty};
use crate::config::{DiskEncryption, DiskPreservation, Machine, MachineProviderConfig};
use crate::ecs::{
    DataDiskParams, DescribeInstancesRequest, EcsOperations, Instance, RunInstancesRequest,
    SystemDiskParams,
};
use crate::error::{ActuatorError, Result};
use crate::metrics::FailureReporter;
use crate::wait::{Poll, WaitConfig, wait_for};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use ecs_actuator_common::InstanceStatus;
use ecs_actuator_common::tags::instance_tags;
use tracing::{debug, error, info};

fn positive(n: i64) -> Option<i64> {
    (n > 0).then_some(n)
}

/// Build the RunInstances request for one machine instance.
///
/// Fails only on an unknown tenancy value.
pub fn build_run_instances_request(
    machine: &Machine,
    config: &MachineProviderConfig,
    resources: &ResolvedResources,
    cluster_id: &str,
    user_data: &str,
) -> Result<RunInstancesRequest> {
    let tenancy = config.tenancy()?;

    let bandwidth = &config.bandwidth;
    let disk = &config.system_disk;

    let data_disks = config
        .data_disk
        .iter()
        .map(|d| DataDiskParams {
            size: positive(d.size),
            category: d.category.clone(),
            encrypted: d.disk_encryption == DiskEncryption::Enabled,
            disk_name: non_empty(&d.name),
            snapshot_id: non_empty(&d.snapshot_id),
            performance_level: non_empty(&d.performance_level),
            kms_key_id: non_empty(&d.kms_key_id),
            delete_with_instance: (d.disk_preservation == DiskPreservation::DeleteWithInstance)
                .then_some(true),
        })
        .collect();

    Ok(RunInstancesRequest {
        region_id: config.region_id.clone(),
        resource_group_id: non_empty(&config.resource_group_id),
        image_id: resources.image_id.clone(),
        instance_type: config.instance_type.clone(),
        instance_name: machine.name.clone(),
        host_name: machine.name.clone(),
        security_group_ids: resources.security_group_ids.clone(),
        v_switch_id: resources.v_switch_id.clone(),
        amount: 1,
        min_amount: 1,
        ram_role_name: non_empty(&config.ram_role_name),
        internet_max_bandwidth_in: positive(bandwidth.internet_max_bandwidth_in),
        internet_max_bandwidth_out: positive(bandwidth.internet_max_bandwidth_out),
        system_disk: SystemDiskParams {
            category: disk.category.clone(),
            size: positive(disk.size),
            disk_name: non_empty(&disk.name),
            performance_level: non_empty(&disk.performance_level),
        },
        data_disks,
        user_data: (!user_data.is_empty()).then(|| BASE64.encode(user_data)),
        tenancy,
        tags: instance_tags(&machine.name, cluster_id, &config.tags),
    })
}

impl<A: EcsOperations, R: FailureReporter> Actuator<A, R> {
    /// Launch one instance for the machine and wait until it is running.
    ///
    /// Every failure is reported to the failure reporter before returning.
    pub(crate) async fn create_instance(
        &self,
        machine: &Machine,
        config: &MachineProviderConfig,
        user_data: &str,
    ) -> Result<Instance> {
        let result = self.launch(machine, config, user_data).await;
        if let Err(e) = &result {
            error!(machine = %machine.name, error = %e, "Failed to create instance");
            self.report_failure(machine, e);
        }
        result
    }

    async fn launch(
        &self,
        machine: &Machine,
        config: &MachineProviderConfig,
        user_data: &str,
    ) -> Result<Instance> {
        let cluster_id = machine.require_cluster_id()?;

        let resources = self.resolve_resources(machine, config).await?;
        let request =
            build_run_instances_request(machine, config, &resources, cluster_id, user_data)?;

        info!(
            machine = %machine.name,
            region = %config.region_id,
            instance_type = %config.instance_type,
            image_id = %resources.image_id,
            v_switch_id = %resources.v_switch_id,
            "Launching instance"
        );

        let response = self
            .api
            .run_instances(request)
            .await
            .map_err(|e| ActuatorError::provider("error creating ECS instance", e))?;

        let instance_id = match response.instance_ids.as_slice() {
            [id] => id.clone(),
            ids => {
                return Err(ActuatorError::UnexpectedResult(format!(
                    "RunInstances returned {} instance IDs, expected 1 (request {})",
                    ids.len(),
                    response.request_id
                )));
            }
        };

        info!(instance_id = %instance_id, request_id = %response.request_id, "Instance launched");

        tokio::time::sleep(self.settings.launch_grace).await;

        let mut instances = self
            .wait_for_instances_status(
                &config.region_id,
                std::slice::from_ref(&instance_id),
                InstanceStatus::Running,
                self.settings.wait,
            )
            .await?;

        // Exactly one ID was described, so exactly one came back
        instances.pop().ok_or_else(|| {
            ActuatorError::NotFound(format!("instance {instance_id} in region {}", config.region_id))
        })
    }

    /// Poll until every listed instance reports `desired`.
    ///
    /// An empty describe result fails immediately with a not-found error.
    /// An empty ID list is rejected before any call.
    pub async fn wait_for_instances_status(
        &self,
        region: &str,
        instance_ids: &[String],
        desired: InstanceStatus,
        wait: WaitConfig,
    ) -> Result<Vec<Instance>> {
        require_instance_ids(instance_ids)?;
        let joined = instance_ids.join(",");
        let description = format!("instances [{joined}] to be {desired}");
        let (api, joined) = (&self.api, joined.as_str());

        wait_for(wait, &description, move || async move {
            let request = DescribeInstancesRequest::by_ids(region, instance_ids.to_vec());
            let instances = match api.describe_instances(request).await {
                Ok(instances) => instances,
                Err(e) => {
                    return Poll::Pending(Some(ActuatorError::provider(
                        format!("error describing instances [{joined}]"),
                        e,
                    )));
                }
            };

            if instances.is_empty() {
                return Poll::Failed(ActuatorError::NotFound(format!(
                    "instances [{joined}] in region {region}"
                )));
            }

            if instances.iter().all(|i| i.state() == Some(desired)) {
                return Poll::Done(instances);
            }

            debug!(
                instances = %joined,
                statuses = ?instances.iter().map(|i| i.status.as_str()).collect::<Vec<_>>(),
                desired = %desired,
                "Instances not yet in desired state"
            );
            Poll::Pending(Some(ActuatorError::UnexpectedState {
                instance_ids: joined.to_string(),
                expected: desired,
            }))
        })
        .await
    }
}
