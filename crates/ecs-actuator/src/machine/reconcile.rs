//! Actuator and the reconcile passes

use crate::config::{ActuatorSettings, Machine, MachineProviderConfig};
use crate::ecs::{EcsOperations, Instance};
use crate::error::{ActuatorError, Result};
use crate::metrics::{FailureReporter, MachineLabels, TracingFailureReporter};
use tracing::{info, warn};

/// Reconciles machine objects against ECS instances
pub struct Actuator<A, R = TracingFailureReporter> {
    pub(crate) api: A,
    pub(crate) reporter: R,
    pub(crate) settings: ActuatorSettings,
}

impl<A: EcsOperations> Actuator<A> {
    /// Create an actuator that reports failures as tracing events
    pub fn new(api: A) -> Self {
        Self::with_reporter(api, TracingFailureReporter)
    }
}

impl<A: EcsOperations, R: FailureReporter> Actuator<A, R> {
    pub fn with_reporter(api: A, reporter: R) -> Self {
        Self {
            api,
            reporter,
            settings: ActuatorSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ActuatorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn settings(&self) -> &ActuatorSettings {
        &self.settings
    }

    /// Report a failed create to the metrics sink
    pub(crate) fn report_failure(&self, machine: &Machine, error: &ActuatorError) {
        self.reporter.failed_instance_create(&MachineLabels {
            name: machine.name.clone(),
            namespace: machine.namespace.clone(),
            reason: error.to_string(),
        });
    }

    /// Create the instance backing a machine and wait for it to run.
    ///
    /// Not idempotent: callers must check [`Actuator::exists`] first.
    pub async fn create(
        &self,
        machine: &Machine,
        config: &MachineProviderConfig,
        user_data: &str,
    ) -> Result<Instance> {
        info!(machine = %machine.name, namespace = %machine.namespace, "Creating machine");
        self.create_instance(machine, config, user_data).await
    }

    /// Whether any instance in a supported state backs the machine
    pub async fn exists(&self, machine: &Machine, config: &MachineProviderConfig) -> Result<bool> {
        let instances = self.existing_instances(machine, &config.region_id).await?;
        if instances.is_empty() {
            info!(machine = %machine.name, "Instance does not exist");
            return Ok(false);
        }
        Ok(true)
    }

    /// Converge the instances of an existing machine.
    ///
    /// The newest instance is canonical. Extra running instances (left over
    /// from a retried create) are stopped, then the ownership tags of the
    /// canonical instance are repaired.
    pub async fn update(
        &self,
        machine: &Machine,
        config: &MachineProviderConfig,
    ) -> Result<Instance> {
        let region = &config.region_id;
        let mut instances = self.existing_instances(machine, region).await?;
        if instances.is_empty() {
            warn!(machine = %machine.name, "Found no instance to update");
            return Err(ActuatorError::NotFound(format!(
                "no instance found for machine {}",
                machine.name
            )));
        }

        super::sort_instances(&mut instances);
        let extras = instances.split_off(1);
        let newest = instances.remove(0);

        if !extras.is_empty() {
            warn!(
                machine = %machine.name,
                count = extras.len(),
                newest = %newest.instance_id,
                "Found duplicate instances, stopping the older ones"
            );
            self.stop_instances(region, &extras).await?;
        }

        self.correct_existing_tags(machine, region, &newest).await?;

        Ok(newest)
    }
}
