//! Instance ownership tag schema
//!
//! Every instance created for a machine carries these tags so that later
//! reconciles can find it again and so that ops tooling can attribute it.
//!
//! ## Tag Schema
//!
//! | Tag Key | Value | Description |
//! |---------|-------|-------------|
//! | `kubernetes.io/cluster/<cluster-id>` | `owned` | Cluster ownership |
//! | `Name` | machine name | Machine ownership |
//! | `sigs.k8s.io/cloud-provider-alibaba/origin` | `ocp` | Generic ownership marker |
//! | `GISV` | `ocp` | Provenance |
//! | `ISVIntegration` | `ocp` | Provenance |
//!
//! Keys are case sensitive. User supplied tags may not use the cluster prefix
//! or the `Name` key.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Prefix of the per-cluster ownership tag key
pub const CLUSTER_TAG_PREFIX: &str = "kubernetes.io/cluster/";

/// Value of the per-cluster ownership tag
pub const CLUSTER_TAG_VALUE: &str = "owned";

/// Tag key holding the machine name
pub const NAME_TAG_KEY: &str = "Name";

/// Tag key for the generic ownership marker
pub const OWNED_TAG_KEY: &str = "sigs.k8s.io/cloud-provider-alibaba/origin";

/// Tag value for the generic ownership marker
pub const OWNED_TAG_VALUE: &str = "ocp";

/// Provenance tag keys, both carrying [`PROVENANCE_TAG_VALUE`]
pub const PROVENANCE_TAG_KEY: &str = "GISV";
pub const ISV_INTEGRATION_TAG_KEY: &str = "ISVIntegration";

/// Tag value for the provenance tags
pub const PROVENANCE_TAG_VALUE: &str = "ocp";

/// A key/value resource tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Tag key marking ownership by the given cluster
pub fn cluster_tag_key(cluster_id: &str) -> String {
    format!("{CLUSTER_TAG_PREFIX}{cluster_id}")
}

/// Whether a user supplied key collides with the generated ownership tags
pub fn is_reserved_key(key: &str) -> bool {
    key.starts_with(CLUSTER_TAG_PREFIX) || key == NAME_TAG_KEY
}

/// The three markers that must be present on every machine instance:
/// cluster ownership, machine name and the generic ownership marker.
pub fn ownership_tags(cluster_id: &str, machine_name: &str) -> Vec<Tag> {
    vec![
        Tag::new(cluster_tag_key(cluster_id), CLUSTER_TAG_VALUE),
        Tag::new(NAME_TAG_KEY, machine_name),
        Tag::new(OWNED_TAG_KEY, OWNED_TAG_VALUE),
    ]
}

/// Build the full tag list for a new instance.
///
/// Reserved keys are dropped from `user_tags`, the ownership and provenance
/// tags are appended, and the result is deduplicated by key.
pub fn instance_tags(machine_name: &str, cluster_id: &str, user_tags: &[Tag]) -> Vec<Tag> {
    let user = user_tags
        .iter()
        .filter(|tag| !is_reserved_key(&tag.key))
        .cloned();

    let generated = ownership_tags(cluster_id, machine_name).into_iter().chain([
        Tag::new(PROVENANCE_TAG_KEY, PROVENANCE_TAG_VALUE),
        Tag::new(ISV_INTEGRATION_TAG_KEY, PROVENANCE_TAG_VALUE),
    ]);

    dedup_tags(user.chain(generated))
}

/// Remove tags with a key seen earlier in the list. The first value wins and
/// the order of first occurrences is kept.
pub fn dedup_tags(tags: impl IntoIterator<Item = Tag>) -> Vec<Tag> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .filter(|tag| seen.insert(tag.key.clone()))
        .collect()
}
