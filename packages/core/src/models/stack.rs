//! Stack and Stack Component Models
//!
//! A stack is a composite resource: a mapping from [`ComponentType`] to an
//! ordered list of component ids. Components carry a flavor name and a raw
//! configuration payload which is only turned into a typed configuration
//! when the stack or component is validated.

use super::resource::{base_field_value, FieldValue, Resource, ResourceKind};
use crate::filters::{FieldRegistry, FieldType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use uuid::Uuid;

/// Slot types a stack can fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    Orchestrator,
    ArtifactStore,
    ContainerRegistry,
    StepOperator,
    ImageBuilder,
    SecretsManager,
    ExperimentTracker,
    ModelDeployer,
    FeatureStore,
    Alerter,
    Annotator,
    DataValidator,
}

/// Types every valid stack must contain
pub const MANDATORY_COMPONENT_TYPES: [ComponentType; 2] =
    [ComponentType::Orchestrator, ComponentType::ArtifactStore];

impl ComponentType {
    pub const ALL: [ComponentType; 12] = [
        ComponentType::Orchestrator,
        ComponentType::ArtifactStore,
        ComponentType::ContainerRegistry,
        ComponentType::StepOperator,
        ComponentType::ImageBuilder,
        ComponentType::SecretsManager,
        ComponentType::ExperimentTracker,
        ComponentType::ModelDeployer,
        ComponentType::FeatureStore,
        ComponentType::Alerter,
        ComponentType::Annotator,
        ComponentType::DataValidator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Orchestrator => "orchestrator",
            Self::ArtifactStore => "artifact_store",
            Self::ContainerRegistry => "container_registry",
            Self::StepOperator => "step_operator",
            Self::ImageBuilder => "image_builder",
            Self::SecretsManager => "secrets_manager",
            Self::ExperimentTracker => "experiment_tracker",
            Self::ModelDeployer => "model_deployer",
            Self::FeatureStore => "feature_store",
            Self::Alerter => "alerter",
            Self::Annotator => "annotator",
            Self::DataValidator => "data_validator",
        }
    }

    /// Components of these types execute pipeline code
    pub fn runs_pipeline_code(&self) -> bool {
        matches!(self, Self::Orchestrator | Self::StepOperator)
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown component type: {}", s))
    }
}

/// Component slots of a stack: type → ordered component ids
pub type StackComponents = BTreeMap<ComponentType, Vec<Uuid>>;

/// Whether every mandatory slot has at least one component
pub fn has_mandatory_components(components: &StackComponents) -> bool {
    MANDATORY_COMPONENT_TYPES.iter().all(|component_type| {
        components
            .get(component_type)
            .is_some_and(|ids| !ids.is_empty())
    })
}

/// A typed reference to one component of a stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentRef {
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    pub id: Uuid,
}

/// Iterate the component references of a slot mapping in slot order
pub fn component_refs(components: &StackComponents) -> impl Iterator<Item = ComponentRef> + '_ {
    components.iter().flat_map(|(component_type, ids)| {
        ids.iter().map(move |id| ComponentRef {
            component_type: *component_type,
            id: *id,
        })
    })
}

/// A registered stack component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    pub flavor: String,
    pub configuration: Map<String, Value>,
    pub is_shared: bool,
    pub project: Uuid,
    pub user: Option<Uuid>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    pub flavor: String,
    pub configuration: Map<String, Value>,
    pub is_shared: bool,
    pub project: Uuid,
    pub user: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentUpdate {
    pub name: Option<String>,
    pub configuration: Option<Map<String, Value>>,
    pub is_shared: Option<bool>,
}

impl Resource for Component {
    type Request = ComponentRequest;
    type Update = ComponentUpdate;

    const KIND: ResourceKind = ResourceKind::Component;
    const PROJECT_SCOPED: bool = true;

    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn project(&self) -> Option<Uuid> {
        Some(self.project)
    }

    fn field_types() -> &'static FieldRegistry {
        static FIELDS: OnceLock<FieldRegistry> = OnceLock::new();
        FIELDS.get_or_init(|| {
            FieldRegistry::with_base(&[
                ("name", FieldType::Str),
                ("type", FieldType::Str),
                ("flavor", FieldType::Str),
                ("is_shared", FieldType::Bool),
                ("project", FieldType::Uuid),
                ("user", FieldType::Uuid),
                ("configuration", FieldType::Unsupported("json")),
            ])
        })
    }

    fn field_value(&self, field: &str) -> Option<FieldValue> {
        match field {
            "name" => Some(self.name.as_str().into()),
            "type" => Some(self.component_type.as_str().into()),
            "flavor" => Some(self.flavor.as_str().into()),
            "is_shared" => Some(self.is_shared.into()),
            "project" => Some(self.project.into()),
            "user" => Some(self.user.into()),
            "configuration" => Some(Value::Object(self.configuration.clone()).to_string().into()),
            _ => base_field_value(field, self.id, self.created, self.updated),
        }
    }

    fn from_request(id: Uuid, request: ComponentRequest, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: request.name,
            component_type: request.component_type,
            flavor: request.flavor,
            configuration: request.configuration,
            is_shared: request.is_shared,
            project: request.project,
            user: request.user,
            created: now,
            updated: now,
        }
    }

    fn apply_update(&mut self, update: ComponentUpdate, now: DateTime<Utc>) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(configuration) = update.configuration {
            self.configuration = configuration;
        }
        if let Some(is_shared) = update.is_shared {
            self.is_shared = is_shared;
        }
        self.updated = now;
    }
}

/// A registered stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stack {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub components: StackComponents,
    pub is_shared: bool,
    pub project: Uuid,
    pub user: Option<Uuid>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl Stack {
    pub fn component_refs(&self) -> impl Iterator<Item = ComponentRef> + '_ {
        component_refs(&self.components)
    }

    pub fn contains_component(&self, component_id: Uuid) -> bool {
        self.components
            .values()
            .any(|ids| ids.contains(&component_id))
    }

    /// First component id of the given type
    pub fn component_of_type(&self, component_type: ComponentType) -> Option<Uuid> {
        self.components
            .get(&component_type)
            .and_then(|ids| ids.first().copied())
    }

    pub fn is_valid(&self) -> bool {
        has_mandatory_components(&self.components)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub components: StackComponents,
    pub is_shared: bool,
    pub project: Uuid,
    pub user: Option<Uuid>,
}

impl StackRequest {
    pub fn is_valid(&self) -> bool {
        has_mandatory_components(&self.components)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StackUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_shared: Option<bool>,
    pub components: Option<StackComponents>,
}

impl Resource for Stack {
    type Request = StackRequest;
    type Update = StackUpdate;

    const KIND: ResourceKind = ResourceKind::Stack;
    const PROJECT_SCOPED: bool = true;

    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn project(&self) -> Option<Uuid> {
        Some(self.project)
    }

    fn field_types() -> &'static FieldRegistry {
        static FIELDS: OnceLock<FieldRegistry> = OnceLock::new();
        FIELDS.get_or_init(|| {
            FieldRegistry::with_base(&[
                ("name", FieldType::Str),
                ("description", FieldType::Str),
                ("is_shared", FieldType::Bool),
                ("project", FieldType::Uuid),
                ("user", FieldType::Uuid),
            ])
        })
    }

    fn field_value(&self, field: &str) -> Option<FieldValue> {
        match field {
            "name" => Some(self.name.as_str().into()),
            "description" => Some(self.description.as_str().into()),
            "is_shared" => Some(self.is_shared.into()),
            "project" => Some(self.project.into()),
            "user" => Some(self.user.into()),
            _ => base_field_value(field, self.id, self.created, self.updated),
        }
    }

    fn from_request(id: Uuid, request: StackRequest, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: request.name,
            description: request.description,
            components: request.components,
            is_shared: request.is_shared,
            project: request.project,
            user: request.user,
            created: now,
            updated: now,
        }
    }

    fn apply_update(&mut self, update: StackUpdate, now: DateTime<Utc>) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(is_shared) = update.is_shared {
            self.is_shared = is_shared;
        }
        if let Some(components) = update.components {
            self.components = components;
        }
        self.updated = now;
    }
}
