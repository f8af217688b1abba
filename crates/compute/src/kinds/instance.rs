//! Instance templates, as embedded in orchestration objects.

use crate::qualify::{Qualify, Rewrite};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// NAT entries naming an IP reservation under the caller's account.
const RESERVATION_PREFIXES: [&str; 2] = ["ipreservation", "network/v1/ipreservation"];

/// Definition of an instance launched by an orchestration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceTemplate {
    /// Instance name; the server appends an id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Shape (CPU and memory profile).
    pub shape: String,
    /// Machine image list, e.g. `/oracle/public/OL_7.2_UEKR4_x86_64`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imagelist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// SSH public keys installed on the instance.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sshkeys: Vec<String>,
    /// Volumes attached at launch.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub storage_attachments: Vec<InstanceStorageAttachment>,
    /// Index of the boot volume in `storage_attachments`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub boot_order: Vec<u8>,
    /// Network interfaces keyed by device name (`eth0` …).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub networking: BTreeMap<String, NetworkInterface>,
    /// Opaque user attributes, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse_dns: Option<bool>,
}

impl Qualify for InstanceTemplate {
    fn rewrite(&mut self, rewrite: &Rewrite<'_>) {
        rewrite.name(&mut self.name);
        rewrite.opt(&mut self.imagelist);
        rewrite.all(&mut self.sshkeys);
        for attachment in &mut self.storage_attachments {
            rewrite.name(&mut attachment.volume);
        }
        for interface in self.networking.values_mut() {
            rewrite.nested(interface);
        }
    }
}

/// A volume attached when the instance launches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceStorageAttachment {
    pub index: u8,
    pub volume: String,
}

/// One network interface of an instance.
///
/// Shared-network interfaces use `seclists` and `nat`; IP-network
/// interfaces use `ipnetwork`, `vnic` and `vnicsets`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterface {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipnetwork: Option<String>,
    /// Static address on the IP network.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnic: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vnicsets: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub seclists: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nat: Option<Nat>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_default_gateway: Option<bool>,
}

impl Qualify for NetworkInterface {
    fn rewrite(&mut self, rewrite: &Rewrite<'_>) {
        rewrite.opt(&mut self.ipnetwork);
        rewrite.opt(&mut self.vnic);
        rewrite.all(&mut self.vnicsets);
        rewrite.all(&mut self.seclists);
        if let Some(nat) = &mut self.nat {
            for entry in nat.entries_mut() {
                for prefix in RESERVATION_PREFIXES {
                    rewrite.prefixed(entry, prefix);
                }
            }
        }
    }
}

/// NAT setting: a single pool/reservation on shared networks, a list on IP networks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Nat {
    One(String),
    Many(Vec<String>),
}

impl Nat {
    fn entries_mut(&mut self) -> &mut [String] {
        match self {
            Self::One(entry) => std::slice::from_mut(entry),
            Self::Many(entries) => entries,
        }
    }
}
