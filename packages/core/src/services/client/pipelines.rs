//! Pipelines and pipeline runs

use super::Client;
use crate::filters::{Page, QueryFilter, QueryParams};
use crate::models::{Pipeline, PipelineRequest, PipelineRun};
use crate::services::error::ClientError;
use crate::services::resolver::EntityRef;
use serde_json::Value;

impl Client {
    /// Register a pipeline under `name` in the active project
    ///
    /// Registering the same spec twice returns the existing pipeline. A
    /// different spec under an existing name is rejected.
    pub async fn register_pipeline(
        &self,
        name: &str,
        spec: Value,
        docstring: Option<&str>,
    ) -> Result<Pipeline, ClientError> {
        let project = self.active_project_id()?;
        let existing = self
            .collect_all::<Pipeline>(vec![
                QueryFilter::uuid_equals("project", project),
                QueryFilter::str_equals("name", name),
            ])
            .await?;

        if let Some(pipeline) = existing.into_iter().next() {
            if pipeline.spec == spec {
                tracing::info!("Reusing registered pipeline '{}'", name);
                return Ok(pipeline);
            }
            return Err(ClientError::already_exists(format!(
                "A pipeline with name '{}' is already registered with a different structure. \
                 You can either rename your pipeline, or delete the registered pipeline (this \
                 makes its existing runs unlisted) and register it again.",
                name
            )));
        }

        let user = self.active_user().await?;
        self.create_entity(PipelineRequest {
            name: name.to_string(),
            docstring: docstring.map(str::to_string),
            spec,
            project,
            user: Some(user.id),
        })
        .await
    }

    pub async fn get_pipeline<'a>(
        &self,
        reference: impl Into<EntityRef<'a>>,
    ) -> Result<Pipeline, ClientError> {
        self.get_entity(reference).await
    }

    pub async fn list_pipelines(
        &self,
        params: &QueryParams,
    ) -> Result<Page<Pipeline>, ClientError> {
        self.list_entities(params).await
    }

    pub async fn delete_pipeline<'a>(
        &self,
        reference: impl Into<EntityRef<'a>>,
    ) -> Result<(), ClientError> {
        let pipeline: Pipeline = self.get_entity(reference).await?;
        self.delete_entity(&pipeline).await
    }

    pub async fn get_run<'a>(
        &self,
        reference: impl Into<EntityRef<'a>>,
    ) -> Result<PipelineRun, ClientError> {
        self.get_entity(reference).await
    }

    /// List runs; filterable by `stack`, `pipeline`, `user`, `status` and `unlisted`
    pub async fn list_runs(&self, params: &QueryParams) -> Result<Page<PipelineRun>, ClientError> {
        self.list_entities(params).await
    }
}
