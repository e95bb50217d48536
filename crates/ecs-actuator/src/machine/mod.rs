//! Machine instance lifecycle
//!
//! [`Actuator`] owns the provider client and the failure reporter. Its
//! operations are split by concern:
//! - `resolve`: image, vSwitch and security group references to IDs
//! - `launch`: RunInstances and waiting for the instance to run
//! - `instances`: lookup, ordering and cleanup of existing instances
//! - `tags`: ownership tag repair
//! - `reconcile`: create / exists / update passes driven by the orchestrator

mod instances;
mod launch;
mod reconcile;
mod resolve;
mod tags;

pub use instances::{running_instances, sort_instances};
pub use launch::build_run_instances_request;
pub use reconcile::Actuator;
pub use resolve::ResolvedResources;
pub use tags::has_ownership_tags;

/// Optional provider parameter from a config string, None when empty
fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}
