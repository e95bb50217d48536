//! Default configuration values shared by the actuator and the CLI

/// Default timeout for an instance to reach its target status (15 minutes)
pub const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 900;

/// Default interval between instance status polls
pub const DEFAULT_WAIT_INTERVAL_SECS: u64 = 5;

/// Grace period between RunInstances and the first status poll.
///
/// ECS does not always return a freshly created instance from
/// DescribeInstances right away.
pub const DEFAULT_LAUNCH_GRACE_SECS: u64 = 5;

/// Machine label carrying the cluster ID
pub const CLUSTER_ID_LABEL: &str = "machine.openshift.io/cluster-api-cluster";

/// Image status accepted for launching instances
pub const IMAGE_STATUS_AVAILABLE: &str = "Available";

/// Resource type used by TagResources for ECS instances
pub const TAG_RESOURCE_TYPE_INSTANCE: &str = "instance";
