//! Flavor Model
//!
//! A flavor describes one implementation of a component type and carries the
//! JSON schema of its configuration. Built-in flavors live in the
//! [`FlavorRegistry`](crate::services::FlavorRegistry); custom flavors are
//! persisted like any other resource and scoped to a project.

use super::resource::{base_field_value, FieldValue, Resource, ResourceKind};
use super::stack::ComponentType;
use crate::filters::{FieldRegistry, FieldType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flavor {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    /// Where the implementation comes from (module path, integration name)
    pub source: String,
    pub config_schema: Value,
    pub integration: Option<String>,
    pub project: Uuid,
    pub user: Option<Uuid>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlavorRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    pub source: String,
    pub config_schema: Value,
    pub integration: Option<String>,
    pub project: Uuid,
    pub user: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlavorUpdate {
    pub source: Option<String>,
    pub config_schema: Option<Value>,
}

impl Resource for Flavor {
    type Request = FlavorRequest;
    type Update = FlavorUpdate;

    const KIND: ResourceKind = ResourceKind::Flavor;
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
                ("source", FieldType::Str),
                ("integration", FieldType::Str),
                ("project", FieldType::Uuid),
                ("user", FieldType::Uuid),
            ])
        })
    }

    fn field_value(&self, field: &str) -> Option<FieldValue> {
        match field {
            "name" => Some(self.name.as_str().into()),
            "type" => Some(self.component_type.as_str().into()),
            "source" => Some(self.source.as_str().into()),
            "integration" => Some(self.integration.clone().into()),
            "project" => Some(self.project.into()),
            "user" => Some(self.user.into()),
            _ => base_field_value(field, self.id, self.created, self.updated),
        }
    }

    fn from_request(id: Uuid, request: FlavorRequest, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: request.name,
            component_type: request.component_type,
            source: request.source,
            config_schema: request.config_schema,
            integration: request.integration,
            project: request.project,
            user: request.user,
            created: now,
            updated: now,
        }
    }

    fn apply_update(&mut self, update: FlavorUpdate, now: DateTime<Utc>) {
        if let Some(source) = update.source {
            self.source = source;
        }
        if let Some(config_schema) = update.config_schema {
            self.config_schema = config_schema;
        }
        self.updated = now;
    }
}
