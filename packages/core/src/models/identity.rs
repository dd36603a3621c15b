//! Projects, Users, Teams, Roles and Role Assignments
//!
//! All of these are global resources: names are unique across the whole
//! registry, so name lookups are never scoped by project.

use super::resource::{base_field_value, FieldValue, Resource, ResourceKind};
use crate::filters::{FieldRegistry, FieldType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use uuid::Uuid;

// ------- //
// PROJECT //
// ------- //

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl Resource for Project {
    type Request = ProjectRequest;
    type Update = ProjectUpdate;

    const KIND: ResourceKind = ResourceKind::Project;
    const PROJECT_SCOPED: bool = false;

    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn field_types() -> &'static FieldRegistry {
        static FIELDS: OnceLock<FieldRegistry> = OnceLock::new();
        FIELDS.get_or_init(|| {
            FieldRegistry::with_base(&[
                ("name", FieldType::Str),
                ("description", FieldType::Str),
            ])
        })
    }

    fn field_value(&self, field: &str) -> Option<FieldValue> {
        match field {
            "name" => Some(self.name.as_str().into()),
            "description" => Some(self.description.as_str().into()),
            _ => base_field_value(field, self.id, self.created, self.updated),
        }
    }

    fn from_request(id: Uuid, request: ProjectRequest, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: request.name,
            description: request.description,
            created: now,
            updated: now,
        }
    }

    fn apply_update(&mut self, update: ProjectUpdate, now: DateTime<Utc>) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        self.updated = now;
    }
}

// ---- //
// USER //
// ---- //

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub full_name: String,
    pub email: Option<String>,
    pub active: bool,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRequest {
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    pub email: Option<String>,
    /// Never stored on the entity; backends hash it
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub active: Option<bool>,
}

impl Resource for User {
    type Request = UserRequest;
    type Update = UserUpdate;

    const KIND: ResourceKind = ResourceKind::User;
    const PROJECT_SCOPED: bool = false;

    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn field_types() -> &'static FieldRegistry {
        static FIELDS: OnceLock<FieldRegistry> = OnceLock::new();
        FIELDS.get_or_init(|| {
            FieldRegistry::with_base(&[
                ("name", FieldType::Str),
                ("full_name", FieldType::Str),
                ("email", FieldType::Str),
                ("active", FieldType::Bool),
            ])
        })
    }

    fn field_value(&self, field: &str) -> Option<FieldValue> {
        match field {
            "name" => Some(self.name.as_str().into()),
            "full_name" => Some(self.full_name.as_str().into()),
            "email" => Some(self.email.clone().into()),
            "active" => Some(self.active.into()),
            _ => base_field_value(field, self.id, self.created, self.updated),
        }
    }

    fn from_request(id: Uuid, request: UserRequest, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: request.name,
            full_name: request.full_name,
            email: request.email,
            active: request.active,
            created: now,
            updated: now,
        }
    }

    fn apply_update(&mut self, update: UserUpdate, now: DateTime<Utc>) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(full_name) = update.full_name {
            self.full_name = full_name;
        }
        if let Some(email) = update.email {
            self.email = Some(email);
        }
        if let Some(active) = update.active {
            self.active = active;
        }
        self.updated = now;
    }
}

// ---- //
// TEAM //
// ---- //

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub users: Vec<Uuid>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRequest {
    pub name: String,
    pub users: Vec<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamUpdate {
    pub name: Option<String>,
    pub users: Option<Vec<Uuid>>,
}

impl Resource for Team {
    type Request = TeamRequest;
    type Update = TeamUpdate;

    const KIND: ResourceKind = ResourceKind::Team;
    const PROJECT_SCOPED: bool = false;

    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn field_types() -> &'static FieldRegistry {
        static FIELDS: OnceLock<FieldRegistry> = OnceLock::new();
        FIELDS.get_or_init(|| FieldRegistry::with_base(&[("name", FieldType::Str)]))
    }

    fn field_value(&self, field: &str) -> Option<FieldValue> {
        match field {
            "name" => Some(self.name.as_str().into()),
            _ => base_field_value(field, self.id, self.created, self.updated),
        }
    }

    fn from_request(id: Uuid, request: TeamRequest, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: request.name,
            users: request.users,
            created: now,
            updated: now,
        }
    }

    fn apply_update(&mut self, update: TeamUpdate, now: DateTime<Utc>) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(users) = update.users {
            self.users = users;
        }
        self.updated = now;
    }
}

// ---- //
// ROLE //
// ---- //

/// Permissions a role can grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Read,
    Write,
    Me,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Me => "me",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            "me" => Ok(Self::Me),
            other => Err(format!("Unknown permission: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub permissions: BTreeSet<Permission>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleRequest {
    pub name: String,
    pub permissions: BTreeSet<Permission>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleUpdate {
    pub name: Option<String>,
    pub permissions: Option<BTreeSet<Permission>>,
}

impl Resource for Role {
    type Request = RoleRequest;
    type Update = RoleUpdate;

    const KIND: ResourceKind = ResourceKind::Role;
    const PROJECT_SCOPED: bool = false;

    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn field_types() -> &'static FieldRegistry {
        static FIELDS: OnceLock<FieldRegistry> = OnceLock::new();
        FIELDS.get_or_init(|| FieldRegistry::with_base(&[("name", FieldType::Str)]))
    }

    fn field_value(&self, field: &str) -> Option<FieldValue> {
        match field {
            "name" => Some(self.name.as_str().into()),
            _ => base_field_value(field, self.id, self.created, self.updated),
        }
    }

    fn from_request(id: Uuid, request: RoleRequest, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: request.name,
            permissions: request.permissions,
            created: now,
            updated: now,
        }
    }

    fn apply_update(&mut self, update: RoleUpdate, now: DateTime<Utc>) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(permissions) = update.permissions {
            self.permissions = permissions;
        }
        self.updated = now;
    }
}

// --------------- //
// ROLE ASSIGNMENT //
// --------------- //

/// A role granted to a user or a team, optionally limited to one project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub id: Uuid,
    pub role: Uuid,
    pub user: Option<Uuid>,
    pub team: Option<Uuid>,
    pub project: Option<Uuid>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleAssignmentRequest {
    pub role: Uuid,
    pub user: Option<Uuid>,
    pub team: Option<Uuid>,
    pub project: Option<Uuid>,
}

/// Assignments are immutable; they are deleted and re-created instead
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleAssignmentUpdate {}

impl Resource for RoleAssignment {
    type Request = RoleAssignmentRequest;
    type Update = RoleAssignmentUpdate;

    const KIND: ResourceKind = ResourceKind::RoleAssignment;
    const PROJECT_SCOPED: bool = false;

    fn id(&self) -> Uuid {
        self.id
    }

    /// Assignments have no name of their own
    fn name(&self) -> &str {
        ""
    }

    fn field_types() -> &'static FieldRegistry {
        static FIELDS: OnceLock<FieldRegistry> = OnceLock::new();
        FIELDS.get_or_init(|| {
            FieldRegistry::with_base(&[
                ("role", FieldType::Uuid),
                ("user", FieldType::Uuid),
                ("team", FieldType::Uuid),
                ("project", FieldType::Uuid),
            ])
        })
    }

    fn field_value(&self, field: &str) -> Option<FieldValue> {
        match field {
            "role" => Some(self.role.into()),
            "user" => Some(self.user.into()),
            "team" => Some(self.team.into()),
            "project" => Some(self.project.into()),
            _ => base_field_value(field, self.id, self.created, self.updated),
        }
    }

    fn from_request(id: Uuid, request: RoleAssignmentRequest, now: DateTime<Utc>) -> Self {
        Self {
            id,
            role: request.role,
            user: request.user,
            team: request.team,
            project: request.project,
            created: now,
            updated: now,
        }
    }

    fn apply_update(&mut self, _update: RoleAssignmentUpdate, now: DateTime<Utc>) {
        self.updated = now;
    }

    fn label(&self) -> String {
        format!("role assignment ({})", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_parse() {
        assert_eq!("write".parse::<Permission>().unwrap(), Permission::Write);
        assert!("admin".parse::<Permission>().is_err());
    }

    #[test]
    fn test_user_request_never_serializes_password() {
        let request = UserRequest {
            name: "alice".to_string(),
            full_name: String::new(),
            email: None,
            password: Some("secret".to_string()),
            active: true,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_role_assignment_null_scope() {
        let assignment = RoleAssignment::from_request(
            Uuid::new_v4(),
            RoleAssignmentRequest {
                role: Uuid::new_v4(),
                user: Some(Uuid::new_v4()),
                team: None,
                project: None,
            },
            Utc::now(),
        );
        assert!(assignment.field_value("project").unwrap().is_null());
        assert!(assignment.field_value("colour").is_none());
    }
}
