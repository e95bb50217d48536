//! Failed instance create reporting
//!
//! Every failed create is reported to an external metrics sink with the
//! machine's name and namespace and the error text. The sink is injected as
//! a [`FailureReporter`] so the actuator never talks to a global collector.

use prometheus::core::Collector;
use prometheus::proto::Metric;
use prometheus::{IntCounterVec, Registry, opts};
use std::sync::Arc;
use tracing::warn;

/// Labels attached to a failed instance create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineLabels {
    pub name: String,
    pub namespace: String,
    pub reason: String,
}

/// Sink for failed instance create signals.
///
/// Reporting is fire and forget: implementations must not fail the caller
/// and are never retried.
pub trait FailureReporter: Send + Sync {
    fn failed_instance_create(&self, labels: &MachineLabels);
}

impl<T: FailureReporter + ?Sized> FailureReporter for Arc<T> {
    fn failed_instance_create(&self, labels: &MachineLabels) {
        (**self).failed_instance_create(labels)
    }
}

/// Emits failures as structured `tracing` events for a log-based collector
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingFailureReporter;

impl FailureReporter for TracingFailureReporter {
    fn failed_instance_create(&self, labels: &MachineLabels) {
        warn!(
            target: "ecs_actuator::metrics",
            metric = "failed_instance_create",
            name = %labels.name,
            namespace = %labels.namespace,
            reason = %labels.reason,
            "Instance create failed"
        );
    }
}

/// Name of the counter incremented for every failed instance create
pub const FAILED_INSTANCE_CREATE_TOTAL: &str = "failed_instance_create_total";

/// Counts failures in a Prometheus counter labelled by machine and reason
#[derive(Debug, Clone)]
pub struct PrometheusFailureReporter {
    failed_instance_create_total: IntCounterVec,
}

impl PrometheusFailureReporter {
    /// Create the counter and register it with `registry`
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let failed_instance_create_total = IntCounterVec::new(
            opts!(
                FAILED_INSTANCE_CREATE_TOTAL,
                "Number of failed instance create attempts"
            ),
            &["name", "namespace", "reason"],
        )?;
        registry.register(Box::new(failed_instance_create_total.clone()))?;

        Ok(Self {
            failed_instance_create_total,
        })
    }

    /// Failures counted for a machine, summed over every reason
    pub fn failures_for(&self, namespace: &str, name: &str) -> u64 {
        let label = |metric: &Metric, key: &str| {
            metric
                .get_label()
                .iter()
                .find(|pair| pair.get_name() == key)
                .map(|pair| pair.get_value().to_string())
        };

        self.failed_instance_create_total
            .collect()
            .iter()
            .flat_map(|family| family.get_metric())
            .filter(|metric| {
                label(metric, "namespace").as_deref() == Some(namespace)
                    && label(metric, "name").as_deref() == Some(name)
            })
            .map(|metric| metric.get_counter().get_value() as u64)
            .sum()
    }
}

impl FailureReporter for PrometheusFailureReporter {
    fn failed_instance_create(&self, labels: &MachineLabels) {
        self.failed_instance_create_total
            .with_label_values(&[
                labels.name.as_str(),
                labels.namespace.as_str(),
                labels.reason.as_str(),
            ])
            .inc();
    }
}

/// Keeps every reported failure in memory for assertions
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct FailureRecorder {
    records: std::sync::Mutex<Vec<MachineLabels>>,
}

#[cfg(test)]
impl FailureRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<MachineLabels> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn count_for(&self, namespace: &str, name: &str) -> usize {
        self.records()
            .iter()
            .filter(|l| l.namespace == namespace && l.name == name)
            .count()
    }
}

#[cfg(test)]
impl FailureReporter for FailureRecorder {
    fn failed_instance_create(&self, labels: &MachineLabels) {
        if let Ok(mut records) = self.records.lock() {
            records.push(labels.clone());
        }
    }
}
