//! Resource kinds and the payloads embedded in them.
//!
//! | Kind | Lifecycle | Ready when |
//! |------|-----------|------------|
//! | [`Orchestration`] | create, get, update, delete | status equals desired state |
//! | [`StorageAttachment`] | create, get, delete | `attached` |
//!
//! [`InstanceTemplate`] and [`StorageVolumeTemplate`] only appear inside
//! orchestration objects.

pub mod instance;
pub mod orchestration;
pub mod storage_attachment;
pub mod storage_volume;

pub use instance::{InstanceStorageAttachment, InstanceTemplate, Nat, NetworkInterface};
pub use orchestration::{
    DesiredState, Health, Object, ObjectTemplate, Orchestration, OrchestrationSpec, Relationship,
};
pub use storage_attachment::{CreateStorageAttachmentInput, StorageAttachment};
pub use storage_volume::StorageVolumeTemplate;
