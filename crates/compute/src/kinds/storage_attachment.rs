//! Storage attachments: a storage volume attached to an instance at an index.

use crate::error::{Error, Result};
use crate::lifecycle::ResourceKind;
use crate::qualify::{Qualify, Rewrite};
use converge::{Observed, StateMachine, WaitSpec};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;

/// Highest index a volume can be attached at.
pub const MAX_INDEX: u8 = 10;

static READY: LazyLock<StateMachine> = LazyLock::new(|| {
    StateMachine::new(StorageAttachment::KIND)
        .converged(&["attached"])
        .transient(&["attaching", "unknown"])
        .failed(&["unavailable", "detaching"])
});

static DELETE: LazyLock<StateMachine> = LazyLock::new(|| {
    StateMachine::new(StorageAttachment::KIND)
        .transient(&["attached", "attaching", "detaching", "unknown"])
        .failed(&["unavailable"])
});

/// An existing storage attachment, as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageAttachment {
    /// Name of the attachment, generated by the server.
    pub name: String,
    /// Index the volume is attached at; index 1 is `/dev/xvdb`.
    pub index: u8,
    /// Instance the volume is attached to.
    pub instance_name: String,
    /// The attached volume.
    pub storage_volume_name: String,
    /// Attachment state.
    pub state: String,
}

impl Qualify for StorageAttachment {
    fn rewrite(&mut self, rewrite: &Rewrite<'_>) {
        rewrite.name(&mut self.name);
        rewrite.name(&mut self.instance_name);
        rewrite.name(&mut self.storage_volume_name);
    }
}

impl Observed for StorageAttachment {
    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> &str {
        &self.state
    }
}

/// Request to attach a volume to an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateStorageAttachmentInput {
    /// Index to attach at, 1 to 10.
    pub index: u8,
    /// Instance to attach the volume to.
    pub instance_name: String,
    /// Volume to attach.
    pub storage_volume_name: String,
}

impl CreateStorageAttachmentInput {
    pub fn new(
        index: u8,
        instance_name: impl Into<String>,
        storage_volume_name: impl Into<String>,
    ) -> Self {
        Self {
            index,
            instance_name: instance_name.into(),
            storage_volume_name: storage_volume_name.into(),
        }
    }
}

impl Qualify for CreateStorageAttachmentInput {
    fn rewrite(&mut self, rewrite: &Rewrite<'_>) {
        rewrite.name(&mut self.instance_name);
        rewrite.name(&mut self.storage_volume_name);
    }
}

impl ResourceKind for StorageAttachment {
    const KIND: &'static str = "storage attachment";
    const CONTAINER_PATH: &'static str = "/storage/attachment/";
    const ROOT_PATH: &'static str = "/storage/attachment";

    type Create = CreateStorageAttachmentInput;

    fn ready_wait() -> WaitSpec {
        WaitSpec {
            description: "storage attachment to be attached".to_string(),
            poll_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
        }
    }

    fn delete_wait() -> WaitSpec {
        WaitSpec {
            description: "storage attachment to be deleted".to_string(),
            poll_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
        }
    }

    fn ready_machine() -> &'static StateMachine {
        &READY
    }

    fn delete_machine() -> &'static StateMachine {
        &DELETE
    }

    fn create_name(input: &Self::Create) -> String {
        format!("{} on {}", input.storage_volume_name, input.instance_name)
    }

    fn validate(input: &Self::Create) -> Result<()> {
        if !(1..=MAX_INDEX).contains(&input.index) {
            return Err(Error::invalid_input(
                Self::KIND,
                format!("index must be between 1 and {}, got {}", MAX_INDEX, input.index),
            ));
        }
        if input.instance_name.is_empty() {
            return Err(Error::invalid_input(Self::KIND, "instance name is required"));
        }
        if input.storage_volume_name.is_empty() {
            return Err(Error::invalid_input(Self::KIND, "storage volume name is required"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qualify::Scope;
    use converge::Verdict;

    #[test]
    fn test_ready_machine() {
        let machine = StorageAttachment::ready_machine();
        assert_eq!(machine.classify("attached", None), Verdict::Converged);
        assert_eq!(machine.classify("attaching", None), Verdict::Transient);
        assert_eq!(machine.classify("unknown", None), Verdict::Transient);
        assert_eq!(machine.classify("unavailable", None), Verdict::Failed);
        assert_eq!(machine.classify("detaching", None), Verdict::Failed);
        assert_eq!(machine.classify("exploded", None), Verdict::Unknown);
    }

    #[test]
    fn test_delete_machine() {
        let machine = StorageAttachment::delete_machine();
        assert_eq!(machine.classify("detaching", None), Verdict::Transient);
        assert_eq!(machine.classify("attached", None), Verdict::Transient);
        assert_eq!(machine.classify("unavailable", None), Verdict::Failed);
        assert_eq!(machine.classify("gone", None), Verdict::Unknown);
    }

    #[test]
    fn test_default_waits_are_valid() {
        assert!(StorageAttachment::ready_wait().validate().is_ok());
        assert!(StorageAttachment::delete_wait().validate().is_ok());
    }

    #[test]
    fn test_validate_index_range() {
        for index in [0, 11, 255] {
            let input = CreateStorageAttachmentInput::new(index, "vm", "vol");
            assert!(StorageAttachment::validate(&input).is_err(), "index {index}");
        }
        for index in [1, 10] {
            let input = CreateStorageAttachmentInput::new(index, "vm", "vol");
            assert!(StorageAttachment::validate(&input).is_ok(), "index {index}");
        }
    }

    #[test]
    fn test_validate_names_required() {
        let input = CreateStorageAttachmentInput::new(1, "", "vol");
        assert!(StorageAttachment::validate(&input).is_err());
        let input = CreateStorageAttachmentInput::new(1, "vm", "");
        assert!(StorageAttachment::validate(&input).is_err());
    }

    #[test]
    fn test_qualify_input() {
        let scope = Scope::for_user("acme", "jane").unwrap();
        let mut input = CreateStorageAttachmentInput::new(2, "web-app/vm1/1f2e", "data");
        input.qualify(&scope);
        assert_eq!(input.instance_name, "/Compute-acme/jane/web-app/vm1/1f2e");
        assert_eq!(input.storage_volume_name, "/Compute-acme/jane/data");
        assert_eq!(input.index, 2);
    }

    #[test]
    fn test_decode_and_unqualify() {
        let scope = Scope::for_user("acme", "jane").unwrap();
        let mut info: StorageAttachment = serde_json::from_str(
            r#"{
                "name": "/Compute-acme/jane/vm1/1f2e/aa11",
                "index": 1,
                "instance_name": "/Compute-acme/jane/vm1/1f2e",
                "storage_volume_name": "/Compute-acme/jane/data",
                "state": "attached",
                "hypervisor": "ignored"
            }"#,
        )
        .unwrap();
        info.unqualify(&scope);
        assert_eq!(info.name, "vm1/1f2e/aa11");
        assert_eq!(info.instance_name, "vm1/1f2e");
        assert_eq!(info.storage_volume_name, "data");
        assert_eq!(info.status(), "attached");
    }
}
