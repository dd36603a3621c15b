//! Pipelines and Pipeline Runs

use super::resource::{base_field_value, FieldValue, Resource, ResourceKind};
use crate::filters::{FieldRegistry, FieldType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use uuid::Uuid;

/// A registered pipeline definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: Uuid,
    pub name: String,
    pub docstring: Option<String>,
    /// Structural description of the steps; two registrations with equal
    /// specs describe the same pipeline
    pub spec: Value,
    pub project: Uuid,
    pub user: Option<Uuid>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRequest {
    pub name: String,
    pub docstring: Option<String>,
    pub spec: Value,
    pub project: Uuid,
    pub user: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineUpdate {
    pub name: Option<String>,
    pub docstring: Option<String>,
}

impl Resource for Pipeline {
    type Request = PipelineRequest;
    type Update = PipelineUpdate;

    const KIND: ResourceKind = ResourceKind::Pipeline;
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
                ("docstring", FieldType::Str),
                ("project", FieldType::Uuid),
                ("user", FieldType::Uuid),
                ("spec", FieldType::Unsupported("json")),
            ])
        })
    }

    fn field_value(&self, field: &str) -> Option<FieldValue> {
        match field {
            "name" => Some(self.name.as_str().into()),
            "docstring" => Some(self.docstring.clone().into()),
            "project" => Some(self.project.into()),
            "user" => Some(self.user.into()),
            "spec" => Some(self.spec.to_string().into()),
            _ => base_field_value(field, self.id, self.created, self.updated),
        }
    }

    fn from_request(id: Uuid, request: PipelineRequest, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: request.name,
            docstring: request.docstring,
            spec: request.spec,
            project: request.project,
            user: request.user,
            created: now,
            updated: now,
        }
    }

    fn apply_update(&mut self, update: PipelineUpdate, now: DateTime<Utc>) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(docstring) = update.docstring {
            self.docstring = Some(docstring);
        }
        self.updated = now;
    }
}

/// Lifecycle state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
    Cached,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cached => "cached",
        }
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cached" => Ok(Self::Cached),
            other => Err(format!("Unknown execution status: {}", other)),
        }
    }
}

/// One execution of a pipeline on a stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: Uuid,
    pub name: String,
    /// `None` for runs of pipelines that were never registered
    pub pipeline: Option<Uuid>,
    pub stack: Option<Uuid>,
    pub status: ExecutionStatus,
    pub num_steps: Option<i64>,
    pub orchestrator_run_id: Option<String>,
    pub project: Uuid,
    pub user: Option<Uuid>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl PipelineRun {
    pub fn is_unlisted(&self) -> bool {
        self.pipeline.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRunRequest {
    pub name: String,
    pub pipeline: Option<Uuid>,
    pub stack: Option<Uuid>,
    pub status: ExecutionStatus,
    pub num_steps: Option<i64>,
    pub orchestrator_run_id: Option<String>,
    pub project: Uuid,
    pub user: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineRunUpdate {
    pub status: Option<ExecutionStatus>,
}

impl Resource for PipelineRun {
    type Request = PipelineRunRequest;
    type Update = PipelineRunUpdate;

    const KIND: ResourceKind = ResourceKind::PipelineRun;
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
                ("pipeline", FieldType::Uuid),
                ("stack", FieldType::Uuid),
                ("status", FieldType::Str),
                ("num_steps", FieldType::Int),
                ("orchestrator_run_id", FieldType::Str),
                ("unlisted", FieldType::Bool),
                ("project", FieldType::Uuid),
                ("user", FieldType::Uuid),
            ])
        })
    }

    fn field_value(&self, field: &str) -> Option<FieldValue> {
        match field {
            "name" => Some(self.name.as_str().into()),
            "pipeline" => Some(self.pipeline.into()),
            "stack" => Some(self.stack.into()),
            "status" => Some(self.status.as_str().into()),
            "num_steps" => Some(self.num_steps.into()),
            "orchestrator_run_id" => Some(self.orchestrator_run_id.clone().into()),
            "unlisted" => Some(self.is_unlisted().into()),
            "project" => Some(self.project.into()),
            "user" => Some(self.user.into()),
            _ => base_field_value(field, self.id, self.created, self.updated),
        }
    }

    fn from_request(id: Uuid, request: PipelineRunRequest, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: request.name,
            pipeline: request.pipeline,
            stack: request.stack,
            status: request.status,
            num_steps: request.num_steps,
            orchestrator_run_id: request.orchestrator_run_id,
            project: request.project,
            user: request.user,
            created: now,
            updated: now,
        }
    }

    fn apply_update(&mut self, update: PipelineRunUpdate, now: DateTime<Utc>) {
        if let Some(status) = update.status {
            self.status = status;
        }
        self.updated = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(pipeline: Option<Uuid>) -> PipelineRun {
        PipelineRun::from_request(
            Uuid::new_v4(),
            PipelineRunRequest {
                name: "training-run".to_string(),
                pipeline,
                stack: None,
                status: ExecutionStatus::Running,
                num_steps: Some(3),
                orchestrator_run_id: None,
                project: Uuid::new_v4(),
                user: None,
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_unlisted_field_tracks_missing_pipeline() {
        assert_eq!(run(None).field_value("unlisted"), Some(FieldValue::Bool(true)));
        assert_eq!(
            run(Some(Uuid::new_v4())).field_value("unlisted"),
            Some(FieldValue::Bool(false))
        );
    }

    #[test]
    fn test_status_update_sets_timestamp() {
        let mut run = run(None);
        let later = run.updated + chrono::Duration::seconds(5);
        run.apply_update(
            PipelineRunUpdate {
                status: Some(ExecutionStatus::Completed),
            },
            later,
        );
        assert!(run.status.is_finished());
        assert_eq!(run.updated, later);
        assert_eq!(run.field_value("status"), Some(FieldValue::from("completed")));
    }
}
