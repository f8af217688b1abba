//! Orchestrations: a named set of objects (instances, volumes) the server
//! creates, suspends or tears down as one unit.
//!
//! Each object carries a typed template. The wire form keeps the object
//! type and the template as two sibling fields (`"type": "Instance"`,
//! `"template": {...}`); here they are one [`ObjectTemplate`] value so that
//! qualification can dispatch on the type with a plain `match`.

use crate::error::{Error, Failure, Result};
use crate::kinds::instance::InstanceTemplate;
use crate::kinds::storage_volume::StorageVolumeTemplate;
use crate::lifecycle::{ResourceKind, Updatable};
use crate::qualify::{Qualify, Rewrite};
use converge::{Observed, StateMachine, WaitSpec};
use serde::{Deserialize, Serialize, Serializer, ser};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

/// Most objects a single orchestration may hold.
pub const MAX_OBJECTS: usize = 100;

/// Status of an orchestration or object that has failed.
const TERMINAL_ERROR: &str = "terminal_error";

static READY: LazyLock<StateMachine> = LazyLock::new(|| {
    StateMachine::new(Orchestration::KIND)
        .converged_on_desired()
        .desired_alias("suspend", "suspended")
        .transient(&[
            "activating",
            "stopping",
            "suspending",
            "deactivating",
            "starting",
            "suspended",
        ])
        .failed(&[TERMINAL_ERROR])
});

static DELETE: LazyLock<StateMachine> = LazyLock::new(|| {
    StateMachine::new(Orchestration::KIND)
        .transient(&["stopping", "deleting", "deactivating", "active", "inactive"])
        .failed(&[TERMINAL_ERROR])
});

/// State the orchestration should be driven to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    /// Create every object.
    #[default]
    Active,
    /// Register the orchestration without creating its objects.
    Inactive,
    /// Suspend every object; reached at status `suspended`.
    Suspend,
}

impl DesiredState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Suspend => "suspend",
        }
    }
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed template of an orchestration object.
///
/// Object types without a typed template are kept as `Other` so that
/// orchestrations holding them can still be read and deleted. They cannot
/// be submitted.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectTemplate {
    Instance(InstanceTemplate),
    StorageVolume(StorageVolumeTemplate),
    Other { type_name: String, template: Value },
}

impl ObjectTemplate {
    /// Wire name of the object type.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Instance(_) => "Instance",
            Self::StorageVolume(_) => "StorageVolume",
            Self::Other { type_name, .. } => type_name,
        }
    }

    /// Whether this template has a typed form that can be submitted.
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Other { .. })
    }

    fn from_wire(type_name: String, template: Value) -> std::result::Result<Self, String> {
        let parsed = match type_name.as_str() {
            "Instance" => serde_json::from_value(template).map(Self::Instance),
            "StorageVolume" => serde_json::from_value(template).map(Self::StorageVolume),
            _ => return Ok(Self::Other { type_name, template }),
        };
        parsed.map_err(|e| format!("invalid {} template: {}", type_name, e))
    }

    fn to_wire(&self) -> serde_json::Result<Value> {
        match self {
            Self::Instance(template) => serde_json::to_value(template),
            Self::StorageVolume(template) => serde_json::to_value(template),
            Self::Other { template, .. } => Ok(template.clone()),
        }
    }
}

impl Qualify for ObjectTemplate {
    fn rewrite(&mut self, rewrite: &Rewrite<'_>) {
        match self {
            Self::Instance(template) => rewrite.nested(template),
            Self::StorageVolume(template) => rewrite.nested(template),
            Self::Other { .. } => {}
        }
    }
}

/// Health of one object, reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Health {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Dependency of an object on other objects, by label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Relationship type; the API only knows `depends`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Labels of the objects depended on.
    pub targets: Vec<String>,
}

impl Relationship {
    pub fn depends(targets: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            kind: "depends".to_string(),
            targets: targets.into_iter().map(Into::into).collect(),
        }
    }
}

/// One object in an orchestration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "WireObject")]
pub struct Object {
    /// Label, unique within the orchestration.
    pub label: String,
    /// Name of the orchestration this object belongs to.
    pub orchestration: String,
    /// Object name assigned by the server.
    pub name: Option<String>,
    pub description: Option<String>,
    pub account: Option<String>,
    pub desired_state: Option<DesiredState>,
    /// Keep the object when the orchestration is suspended.
    pub persistent: bool,
    pub relationships: Vec<Relationship>,
    pub health: Health,
    pub version: Option<u32>,
    pub template: ObjectTemplate,
}

impl Object {
    pub fn new(
        label: impl Into<String>,
        orchestration: impl Into<String>,
        template: ObjectTemplate,
    ) -> Self {
        Self {
            label: label.into(),
            orchestration: orchestration.into(),
            name: None,
            description: None,
            account: None,
            desired_state: None,
            persistent: false,
            relationships: Vec::new(),
            health: Health::default(),
            version: None,
            template,
        }
    }

    /// Whether the server reports this object as failed.
    pub fn is_failed(&self) -> bool {
        self.health.status.as_deref() == Some(TERMINAL_ERROR)
    }
}

impl Qualify for Object {
    fn rewrite(&mut self, rewrite: &Rewrite<'_>) {
        rewrite.name(&mut self.orchestration);
        rewrite.opt(&mut self.name);
        rewrite.nested(&mut self.template);
    }
}

#[derive(Serialize, Deserialize)]
struct WireObject {
    label: String,
    orchestration: String,
    #[serde(rename = "type")]
    object_type: String,
    template: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    desired_state: Option<DesiredState>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    persistent: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    relationships: Vec<Relationship>,
    #[serde(default, skip_serializing_if = "Health::is_empty")]
    health: Health,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<u32>,
}

impl TryFrom<WireObject> for Object {
    type Error = String;

    fn try_from(wire: WireObject) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            template: ObjectTemplate::from_wire(wire.object_type, wire.template)?,
            label: wire.label,
            orchestration: wire.orchestration,
            name: wire.name,
            description: wire.description,
            account: wire.account,
            desired_state: wire.desired_state,
            persistent: wire.persistent,
            relationships: wire.relationships,
            health: wire.health,
            version: wire.version,
        })
    }
}

impl TryFrom<&Object> for WireObject {
    type Error = serde_json::Error;

    fn try_from(object: &Object) -> serde_json::Result<Self> {
        Ok(Self {
            object_type: object.template.type_name().to_string(),
            template: object.template.to_wire()?,
            label: object.label.clone(),
            orchestration: object.orchestration.clone(),
            name: object.name.clone(),
            description: object.description.clone(),
            account: object.account.clone(),
            desired_state: object.desired_state,
            persistent: object.persistent,
            relationships: object.relationships.clone(),
            health: object.health.clone(),
            version: object.version,
        })
    }
}

impl Serialize for Object {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        WireObject::try_from(self)
            .map_err(<S::Error as ser::Error>::custom)?
            .serialize(serializer)
    }
}

/// An existing orchestration, as reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Orchestration {
    pub name: String,
    pub desired_state: DesiredState,
    pub status: String,
    #[serde(default)]
    pub objects: Vec<Object>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_audited: Option<String>,
}

impl Orchestration {
    /// First object the server reports as failed.
    pub fn failed_object(&self) -> Option<&Object> {
        self.objects.iter().find(|o| o.is_failed())
    }
}

impl Qualify for Orchestration {
    fn rewrite(&mut self, rewrite: &Rewrite<'_>) {
        rewrite.name(&mut self.name);
        rewrite.nested(&mut self.objects);
    }
}

impl Observed for Orchestration {
    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> &str {
        &self.status
    }

    fn desired_state(&self) -> Option<&str> {
        Some(self.desired_state.as_str())
    }
}

/// Requested orchestration, for create and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationSpec {
    pub name: String,
    #[serde(default)]
    pub desired_state: DesiredState,
    pub objects: Vec<Object>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Version being replaced; set by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

impl OrchestrationSpec {
    pub fn new(name: impl Into<String>, desired_state: DesiredState) -> Self {
        Self {
            name: name.into(),
            desired_state,
            objects: Vec::new(),
            description: None,
            account: None,
            tags: Vec::new(),
            version: None,
        }
    }

    /// Add an object owned by this orchestration.
    pub fn with_object(mut self, label: impl Into<String>, template: ObjectTemplate) -> Self {
        let object = Object::new(label, self.name.clone(), template);
        self.objects.push(object);
        self
    }

    fn check(&self) -> Result<()> {
        let kind = Orchestration::KIND;
        if self.name.is_empty() {
            return Err(Error::invalid_input(kind, "name is required"));
        }
        if self.objects.len() > MAX_OBJECTS {
            return Err(Error::invalid_input(
                kind,
                format!(
                    "{} objects given, at most {} allowed",
                    self.objects.len(),
                    MAX_OBJECTS
                ),
            ));
        }

        let mut labels = HashSet::new();
        for object in &self.objects {
            if object.label.is_empty() {
                return Err(Error::invalid_input(kind, "every object needs a label"));
            }
            if !labels.insert(object.label.as_str()) {
                return Err(Error::invalid_input(
                    kind,
                    format!("duplicate object label '{}'", object.label),
                ));
            }
            if !object.template.is_supported() {
                return Err(Error::invalid_input(
                    kind,
                    format!(
                        "object '{}' has unsupported type '{}'",
                        object.label,
                        object.template.type_name()
                    ),
                ));
            }
            if object.orchestration.is_empty() {
                return Err(Error::invalid_input(
                    kind,
                    format!("object '{}' does not name its orchestration", object.label),
                ));
            }
        }

        for object in &self.objects {
            for target in object.relationships.iter().flat_map(|r| &r.targets) {
                if !labels.contains(target.as_str()) {
                    return Err(Error::invalid_input(
                        kind,
                        format!(
                            "object '{}' depends on unknown label '{}'",
                            object.label, target
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl Qualify for OrchestrationSpec {
    fn rewrite(&mut self, rewrite: &Rewrite<'_>) {
        rewrite.name(&mut self.name);
        rewrite.nested(&mut self.objects);
    }
}

fn orchestration_wait(action: &str) -> WaitSpec {
    WaitSpec {
        description: format!("orchestration to be {}", action),
        poll_interval: Duration::from_secs(5),
        timeout: Duration::from_secs(3600),
    }
}

impl ResourceKind for Orchestration {
    const KIND: &'static str = "orchestration";
    const CONTAINER_PATH: &'static str = "/platform/v1/orchestration/";
    const ROOT_PATH: &'static str = "/platform/v1/orchestration";

    type Create = OrchestrationSpec;

    fn ready_wait() -> WaitSpec {
        orchestration_wait("ready")
    }

    fn delete_wait() -> WaitSpec {
        orchestration_wait("deleted")
    }

    fn ready_machine() -> &'static StateMachine {
        &READY
    }

    fn delete_machine() -> &'static StateMachine {
        &DELETE
    }

    fn create_name(input: &Self::Create) -> String {
        input.name.clone()
    }

    fn validate(input: &Self::Create) -> Result<()> {
        input.check()
    }

    /// Report the first failed object rather than the orchestration itself.
    fn failure(&self) -> Failure {
        match self.failed_object() {
            Some(object) => Failure {
                status: self.status.clone(),
                child: Some(object.name.clone().unwrap_or_else(|| object.label.clone())),
                cause: object.health.cause.clone(),
                detail: object.health.detail.clone(),
                error: object.health.error.clone(),
            },
            None => Failure::from_status(&self.status),
        }
    }
}

impl Updatable for Orchestration {
    type Update = OrchestrationSpec;

    fn update_name(input: &Self::Update) -> &str {
        &input.name
    }

    fn validate_update(input: &Self::Update) -> Result<()> {
        input.check()
    }
}
