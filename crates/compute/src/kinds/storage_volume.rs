//! Storage volume templates, as embedded in orchestration objects.

use crate::qualify::{Qualify, Rewrite};
use serde::{Deserialize, Serialize};

/// Definition of a storage volume created by an orchestration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageVolumeTemplate {
    pub name: String,
    /// Size with unit suffix, e.g. `10G`.
    pub size: String,
    /// Storage properties; these name shared pools and are absolute.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub bootable: bool,
    /// Image list to build a bootable volume from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imagelist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imagelist_entry: Option<i32>,
    /// Snapshot to restore the volume from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Qualify for StorageVolumeTemplate {
    fn rewrite(&mut self, rewrite: &Rewrite<'_>) {
        rewrite.name(&mut self.name);
        rewrite.opt(&mut self.imagelist);
        rewrite.opt(&mut self.snapshot);
    }
}
