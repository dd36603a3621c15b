//! Stacks, stack components and flavors

use super::{Client, Validated};
use crate::filters::{Page, QueryFilter, QueryParams};
use crate::models::{
    Component, ComponentRequest, ComponentType, ComponentUpdate, Flavor, FlavorRequest, Stack,
    StackComponents, StackRequest, StackUpdate,
};
use crate::services::error::ClientError;
use crate::services::flavor_registry::{ResolvedFlavor, SchemaConfig};
use crate::services::resolver::{resolve_typed, EntityRef};
use crate::services::stack_validator::ComponentDraft;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Changes applied by [`Client::update_stack`]
#[derive(Debug, Clone, Default)]
pub struct StackChanges<'a> {
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub is_shared: Option<bool>,
    /// Replace the component in a slot
    pub set_components: Vec<(ComponentType, &'a str)>,
    /// Empty a slot
    pub remove_components: Vec<ComponentType>,
}

/// Changes applied by [`Client::update_component`]
#[derive(Debug, Clone, Default)]
pub struct ComponentChanges<'a> {
    pub name: Option<&'a str>,
    /// Merged into the stored configuration; `null` removes a key
    pub configuration: Map<String, Value>,
    pub is_shared: Option<bool>,
}

/// Merge `changes` into `configuration`; `null` values delete keys
fn merge_configuration(configuration: &mut Map<String, Value>, changes: &Map<String, Value>) {
    for (key, value) in changes {
        if value.is_null() {
            configuration.remove(key);
        } else {
            configuration.insert(key.clone(), value.clone());
        }
    }
}

impl Client {
    // ------ //
    // STACKS //
    // ------ //

    /// Resolve component references into stack slots within the active project
    async fn stack_components(
        &self,
        mut components: StackComponents,
        references: &[(ComponentType, &str)],
    ) -> Result<StackComponents, ClientError> {
        let scope = self.scope::<Component>()?;
        for (component_type, reference) in references {
            let component: Component =
                resolve_typed(self.store.as_ref(), *reference, *component_type, scope).await?;
            components.insert(*component_type, vec![component.id]);
        }
        Ok(components)
    }

    /// Mark every component of a shared stack as shared
    async fn share_components(&self, components: &StackComponents) -> Result<(), ClientError> {
        for ids in components.values() {
            for id in ids {
                if let Some(component) = self.fetch::<Component>(*id).await? {
                    if !component.is_shared {
                        self.update_entity::<Component>(
                            component.id,
                            ComponentUpdate {
                                is_shared: Some(true),
                                ..Default::default()
                            },
                        )
                        .await?;
                    }
                }
            }
        }
        Ok(())
    }

    fn stack_name_conflict(name: &str) -> ClientError {
        ClientError::already_exists(format!(
            "A stack with name '{}' already exists in the active project.",
            name
        ))
    }

    /// Register a stack in the active project
    ///
    /// Components are given by name, id or id prefix; one per slot.
    pub async fn register_stack(
        &self,
        name: &str,
        components: &[(ComponentType, &str)],
        is_shared: bool,
    ) -> Result<Validated<Stack>, ClientError> {
        let project = self.active_project_id()?;
        let project_filter = vec![QueryFilter::uuid_equals("project", project)];
        if self.name_taken::<Stack>(name, project_filter, None).await? {
            return Err(Self::stack_name_conflict(name));
        }

        let components = self
            .stack_components(StackComponents::new(), components)
            .await?;
        let validation = self.validator().validate(&components).await?;

        let user = self.active_user().await?;
        let stack: Stack = self
            .create_entity(StackRequest {
                name: name.to_string(),
                description: String::new(),
                components,
                is_shared,
                project,
                user: Some(user.id),
            })
            .await?;
        if stack.is_shared {
            self.share_components(&stack.components).await?;
        }
        Ok(Validated::new(stack, validation.warnings))
    }

    /// Resolve a stack; `None` returns the active stack
    pub async fn get_stack(&self, reference: Option<&str>) -> Result<Stack, ClientError> {
        match reference {
            Some(reference) => self.get_entity(reference).await,
            None => self.active_stack().await,
        }
    }

    pub async fn list_stacks(&self, params: &QueryParams) -> Result<Page<Stack>, ClientError> {
        self.list_entities(params).await
    }

    /// Update a stack; the resulting component set is validated again
    pub async fn update_stack<'a>(
        &self,
        reference: impl Into<EntityRef<'a>>,
        changes: StackChanges<'_>,
    ) -> Result<Validated<Stack>, ClientError> {
        let stack: Stack = self.get_entity(reference).await?;

        let mut update = StackUpdate::default();
        if let Some(name) = changes.name {
            let project_filter = vec![QueryFilter::uuid_equals("project", stack.project)];
            if self
                .name_taken::<Stack>(name, project_filter, Some(stack.id))
                .await?
            {
                return Err(Self::stack_name_conflict(name));
            }
            update.name = Some(name.to_string());
        }
        update.description = changes.description.map(str::to_string);

        let mut components = self
            .stack_components(stack.components.clone(), &changes.set_components)
            .await?;
        for component_type in &changes.remove_components {
            components.remove(component_type);
        }
        let validation = self.validator().validate(&components).await?;

        update.is_shared = changes.is_shared;
        if components != stack.components {
            update.components = Some(components);
        }

        let stack: Stack = self.update_entity(stack.id, update).await?;
        if stack.is_shared {
            self.share_components(&stack.components).await?;
        }
        Ok(Validated::new(stack, validation.warnings))
    }

    /// Delete a stack that is not active in any configuration
    pub async fn deregister_stack<'a>(
        &self,
        reference: impl Into<EntityRef<'a>>,
    ) -> Result<(), ClientError> {
        let stack: Stack = self.get_entity(reference).await?;
        if self.is_stack_active_anywhere(stack.id) {
            return Err(ClientError::illegal_operation(format!(
                "Stack '{}' cannot be deregistered while it is active. Please activate another \
                 stack first.",
                stack.name
            )));
        }
        self.delete_entity(&stack).await
    }

    // ---------- //
    // COMPONENTS //
    // ---------- //

    fn component_name_conflict(name: &str, component_type: ComponentType) -> ClientError {
        ClientError::already_exists(format!(
            "A {} with name '{}' already exists in the active project.",
            component_type, name
        ))
    }

    /// Register a component after checking its configuration against the flavor
    pub async fn register_component(
        &self,
        name: &str,
        component_type: ComponentType,
        flavor: &str,
        configuration: Map<String, Value>,
        is_shared: bool,
    ) -> Result<Validated<Component>, ClientError> {
        let project = self.active_project_id()?;
        let filters = vec![
            QueryFilter::uuid_equals("project", project),
            QueryFilter::str_equals("type", component_type.as_str()),
        ];
        if self.name_taken::<Component>(name, filters, None).await? {
            return Err(Self::component_name_conflict(name, component_type));
        }

        let user = self.active_user().await?;
        let request = ComponentRequest {
            name: name.to_string(),
            component_type,
            flavor: flavor.to_string(),
            configuration,
            is_shared,
            project,
            user: Some(user.id),
        };
        let warnings = self
            .validator()
            .validate_component(ComponentDraft::from(&request))
            .await?;
        let component: Component = self.create_entity(request).await?;
        Ok(Validated::new(component, warnings))
    }

    /// Resolve a component of `component_type`
    ///
    /// Without a reference, the component of that type in the active stack is
    /// returned.
    pub async fn get_component(
        &self,
        component_type: ComponentType,
        reference: Option<&str>,
    ) -> Result<Component, ClientError> {
        let scope = self.scope::<Component>()?;
        match reference {
            Some(reference) => {
                resolve_typed(self.store.as_ref(), reference, component_type, scope).await
            }
            None => {
                let stack = self.active_stack().await?;
                let id = stack.component_of_type(component_type).ok_or_else(|| {
                    ClientError::NoActiveContext(format!(
                        "The active stack '{}' has no {} component.",
                        stack.name, component_type
                    ))
                })?;
                resolve_typed(self.store.as_ref(), id, component_type, scope).await
            }
        }
    }

    pub async fn list_components(
        &self,
        params: &QueryParams,
    ) -> Result<Page<Component>, ClientError> {
        self.list_entities(params).await
    }

    /// Update a component and re-validate every stack that contains it
    pub async fn update_component(
        &self,
        component_type: ComponentType,
        reference: &str,
        changes: ComponentChanges<'_>,
    ) -> Result<Validated<Component>, ClientError> {
        let component = self.get_component(component_type, Some(reference)).await?;

        let mut update = ComponentUpdate::default();
        if let Some(name) = changes.name {
            let filters = vec![
                QueryFilter::uuid_equals("project", component.project),
                QueryFilter::str_equals("type", component_type.as_str()),
            ];
            if self
                .name_taken::<Component>(name, filters, Some(component.id))
                .await?
            {
                return Err(Self::component_name_conflict(name, component_type));
            }
            update.name = Some(name.to_string());
        }

        let mut configuration = component.configuration.clone();
        merge_configuration(&mut configuration, &changes.configuration);
        let draft = ComponentDraft {
            name: changes.name.unwrap_or(&component.name),
            component_type,
            flavor: &component.flavor,
            configuration: &configuration,
            project: component.project,
        };
        let mut warnings = self.validator().validate_component(draft).await?;

        if configuration != component.configuration {
            update.configuration = Some(configuration);
        }
        update.is_shared = changes.is_shared;
        let component: Component = self.update_entity(component.id, update).await?;

        let stacks = self
            .collect_all::<Stack>(vec![QueryFilter::uuid_equals("project", component.project)])
            .await?;
        for stack in stacks.iter().filter(|s| s.contains_component(component.id)) {
            tracing::debug!("Re-validating stack '{}'", stack.name);
            let validation = self.validator().validate(&stack.components).await?;
            warnings.extend(validation.warnings);
        }
        Ok(Validated::new(component, warnings))
    }

    /// Delete a component that no stack references
    pub async fn deregister_component(
        &self,
        component_type: ComponentType,
        reference: &str,
    ) -> Result<(), ClientError> {
        let component = self.get_component(component_type, Some(reference)).await?;
        let stacks: Vec<String> = self
            .collect_all::<Stack>(Vec::new())
            .await?
            .into_iter()
            .filter(|stack| stack.contains_component(component.id))
            .map(|stack| stack.name)
            .collect();
        if !stacks.is_empty() {
            return Err(ClientError::illegal_operation(format!(
                "{} '{}' cannot be deregistered because it is part of the following stacks: {}.",
                component_type,
                component.name,
                stacks.join(", ")
            )));
        }
        self.delete_entity(&component).await
    }

    // ------- //
    // FLAVORS //
    // ------- //

    /// Register a custom flavor in the active project
    pub async fn create_flavor(
        &self,
        name: &str,
        component_type: ComponentType,
        source: &str,
        config_schema: Value,
        integration: Option<&str>,
    ) -> Result<Flavor, ClientError> {
        if !config_schema.is_object() {
            return Err(ClientError::validation(format!(
                "The configuration schema of flavor '{}' must be a JSON object.",
                name
            )));
        }
        if let Err(reason) = SchemaConfig::compile_schema(&config_schema) {
            return Err(ClientError::validation(format!(
                "The configuration schema of flavor '{}' is not valid: {}",
                name, reason
            )));
        }
        let project = self.active_project_id()?;
        let filters = vec![
            QueryFilter::uuid_equals("project", project),
            QueryFilter::str_equals("type", component_type.as_str()),
        ];
        if self.name_taken::<Flavor>(name, filters, None).await? {
            return Err(ClientError::already_exists(format!(
                "A {} flavor with name '{}' already exists in the active project.",
                component_type, name
            )));
        }
        let user = self.active_user().await?;
        self.create_entity(FlavorRequest {
            name: name.to_string(),
            component_type,
            source: source.to_string(),
            config_schema,
            integration: integration.map(str::to_string),
            project,
            user: Some(user.id),
        })
        .await
    }

    pub async fn get_flavor<'a>(
        &self,
        reference: impl Into<EntityRef<'a>>,
    ) -> Result<Flavor, ClientError> {
        self.get_entity(reference).await
    }

    /// Delete a custom flavor no component of the project uses
    pub async fn delete_flavor<'a>(
        &self,
        reference: impl Into<EntityRef<'a>>,
    ) -> Result<(), ClientError> {
        let flavor: Flavor = self.get_entity(reference).await?;
        let users = self
            .collect_all::<Component>(vec![
                QueryFilter::uuid_equals("project", flavor.project),
                QueryFilter::str_equals("type", flavor.component_type.as_str()),
                QueryFilter::str_equals("flavor", flavor.name.as_str()),
            ])
            .await?;
        let has_builtin = self
            .flavors
            .builtin(&flavor.name, flavor.component_type)
            .is_some();
        if !users.is_empty() && !has_builtin {
            return Err(ClientError::illegal_operation(format!(
                "Flavor '{}' is still used by {} component(s).",
                flavor.name,
                users.len()
            )));
        }
        self.delete_entity(&flavor).await
    }

    /// Custom flavors only; built-ins are listed by [`Client::get_flavors_by_type`]
    pub async fn list_flavors(&self, params: &QueryParams) -> Result<Page<Flavor>, ClientError> {
        self.list_entities(params).await
    }

    /// Built-in and custom flavors of one component type
    pub async fn get_flavors_by_type(
        &self,
        component_type: ComponentType,
    ) -> Result<Vec<ResolvedFlavor>, ClientError> {
        let project = self.active_project_id()?;
        let custom = self
            .collect_all::<Flavor>(vec![
                QueryFilter::uuid_equals("project", project),
                QueryFilter::str_equals("type", component_type.as_str()),
            ])
            .await?;

        let mut flavors: Vec<ResolvedFlavor> = self
            .flavors
            .builtins_of_type(component_type)
            .filter(|builtin| !custom.iter().any(|flavor| flavor.name == builtin.name))
            .cloned()
            .map(ResolvedFlavor::Builtin)
            .collect();
        flavors.extend(custom.into_iter().map(ResolvedFlavor::Custom));
        Ok(flavors)
    }

    /// The flavor a component of this name and type would use
    pub async fn get_flavor_by_name_and_type(
        &self,
        name: &str,
        component_type: ComponentType,
    ) -> Result<ResolvedFlavor, ClientError> {
        let project = self.active_project_id()?;
        self.flavors
            .lookup(self.store.as_ref(), name, component_type, Some(project))
            .await
    }

    /// Id of every stack in the active project that uses `component_id`
    pub async fn stacks_using_component(
        &self,
        component_id: Uuid,
    ) -> Result<Vec<Uuid>, ClientError> {
        let project = self.active_project_id()?;
        Ok(self
            .collect_all::<Stack>(vec![QueryFilter::uuid_equals("project", project)])
            .await?
            .into_iter()
            .filter(|stack| stack.contains_component(component_id))
            .map(|stack| stack.id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryStore, StoreConfig, StoreType, DEFAULT_NAME};
    use crate::services::{ClientSettings, StackWarning};
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn client_with(dir: &TempDir, config: StoreConfig) -> Client {
        let settings = ClientSettings {
            repository_path: Some(dir.path().join("missing")),
            global_config_path: Some(dir.path().to_path_buf()),
            enable_repo_init_warnings: false,
        };
        Client::new(Arc::new(InMemoryStore::with_config(config)), settings)
            .await
            .unwrap()
    }

    async fn client(dir: &TempDir) -> Client {
        client_with(dir, StoreConfig::default()).await
    }

    fn config(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_merge_configuration_removes_nulls() {
        let mut configuration = config(json!({"path": "/tmp", "keep": 1}));
        merge_configuration(
            &mut configuration,
            &config(json!({"path": null, "extra": true})),
        );
        assert_eq!(configuration, config(json!({"keep": 1, "extra": true})));
    }

    #[tokio::test]
    async fn test_register_stack_requires_mandatory_components() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir).await;

        let err = client
            .register_stack("partial", &[(ComponentType::Orchestrator, DEFAULT_NAME)], false)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidStack(_)));
        assert!(client.get_stack(Some("partial")).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_register_stack_with_mixed_locality_warns_once() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir).await;
        client
            .register_component(
                "k8s",
                ComponentType::Orchestrator,
                "kubernetes",
                config(json!({"kubernetes_context": "prod"})),
                false,
            )
            .await
            .unwrap();

        let registered = client
            .register_stack(
                "hybrid",
                &[
                    (ComponentType::Orchestrator, "k8s"),
                    (ComponentType::ArtifactStore, DEFAULT_NAME),
                ],
                false,
            )
            .await
            .unwrap();
        let mixed = registered
            .warnings
            .iter()
            .filter(|w| w.is_mixed_locality())
            .count();
        assert_eq!(mixed, 1);
        assert_eq!(registered.value.name, "hybrid");
    }

    #[tokio::test]
    async fn test_duplicate_stack_name_rejected() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir).await;
        let err = client
            .register_stack(
                DEFAULT_NAME,
                &[
                    (ComponentType::Orchestrator, DEFAULT_NAME),
                    (ComponentType::ArtifactStore, DEFAULT_NAME),
                ],
                false,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_invalid_component_configuration_rejected() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir).await;

        let err = client
            .register_component(
                "bucket",
                ComponentType::ArtifactStore,
                "s3",
                config(json!({"path": "/not/a/bucket"})),
                false,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidConfiguration { .. }));

        let err = client
            .register_component("x", ComponentType::Alerter, "slack", Map::new(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidConfiguration { .. }));
    }

    #[tokio::test]
    async fn test_remote_component_on_local_store_warns() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir).await;
        let registered = client
            .register_component(
                "bucket",
                ComponentType::ArtifactStore,
                "s3",
                config(json!({"path": "s3://models"})),
                false,
            )
            .await
            .unwrap();
        assert!(matches!(
            registered.warnings.as_slice(),
            [StackWarning::RemoteComponentLocalStore { .. }]
        ));
    }

    #[tokio::test]
    async fn test_local_components_on_remote_store_warn() {
        let dir = TempDir::new().unwrap();
        let client = client_with(
            &dir,
            StoreConfig::new(StoreType::Rest, "https://stackhub.example.com"),
        )
        .await;
        let stack = client
            .update_stack(DEFAULT_NAME, StackChanges::default())
            .await
            .unwrap();
        assert!(stack
            .warnings
            .iter()
            .any(|w| matches!(w, StackWarning::LocalExecutionRemoteStore { .. })));
    }

    #[tokio::test]
    async fn test_update_stack_replaces_components_and_shares() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir).await;
        let bucket = client
            .register_component(
                "bucket",
                ComponentType::ArtifactStore,
                "s3",
                config(json!({"path": "s3://models"})),
                false,
            )
            .await
            .unwrap()
            .into_inner();

        let updated = client
            .update_stack(
                DEFAULT_NAME,
                StackChanges {
                    name: Some("shared"),
                    is_shared: Some(true),
                    set_components: vec![(ComponentType::ArtifactStore, "bucket")],
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .into_inner();
        assert_eq!(updated.name, "shared");
        assert!(updated.is_shared);
        assert_eq!(
            updated.component_of_type(ComponentType::ArtifactStore),
            Some(bucket.id)
        );

        let bucket = client
            .get_component(ComponentType::ArtifactStore, Some("bucket"))
            .await
            .unwrap();
        assert!(bucket.is_shared);

        let err = client
            .update_stack(
                "shared",
                StackChanges {
                    remove_components: vec![ComponentType::Orchestrator],
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidStack(_)));
    }

    #[tokio::test]
    async fn test_active_stack_cannot_be_deregistered() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir).await;
        let err = client.deregister_stack(DEFAULT_NAME).await.unwrap_err();
        assert!(matches!(err, ClientError::IllegalOperation(_)));
    }

    #[tokio::test]
    async fn test_component_in_use_cannot_be_deregistered() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir).await;
        let err = client
            .deregister_component(ComponentType::Orchestrator, DEFAULT_NAME)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::IllegalOperation(_)));
    }

    #[tokio::test]
    async fn test_get_component_defaults_to_active_stack() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir).await;
        let orchestrator = client
            .get_component(ComponentType::Orchestrator, None)
            .await
            .unwrap();
        assert_eq!(orchestrator.name, DEFAULT_NAME);

        let err = client
            .get_component(ComponentType::StepOperator, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NoActiveContext(_)));
    }

    #[tokio::test]
    async fn test_update_component_merges_configuration() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir).await;
        client
            .register_component(
                "registry",
                ComponentType::ContainerRegistry,
                "local",
                config(json!({"uri": "localhost:5001"})),
                false,
            )
            .await
            .unwrap();

        let updated = client
            .update_component(
                ComponentType::ContainerRegistry,
                "registry",
                ComponentChanges {
                    configuration: config(json!({"uri": null})),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .into_inner();
        assert!(updated.configuration.is_empty());

        let err = client
            .update_component(
                ComponentType::ContainerRegistry,
                "registry",
                ComponentChanges {
                    configuration: config(json!({"uri": "https://registry.io"})),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidConfiguration { .. }));
    }

    #[tokio::test]
    async fn test_custom_flavor_lifecycle() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir).await;
        let schema = json!({
            "type": "object",
            "properties": {"webhook": {"type": "string"}},
            "required": ["webhook"],
            "additionalProperties": false
        });
        let flavor = client
            .create_flavor("slack", ComponentType::Alerter, "acme.slack", schema, Some("slack"))
            .await
            .unwrap();

        let flavors = client
            .get_flavors_by_type(ComponentType::Alerter)
            .await
            .unwrap();
        assert_eq!(flavors.len(), 1);
        assert!(flavors[0].is_custom());

        let registered = client
            .register_component(
                "alerts",
                ComponentType::Alerter,
                "slack",
                config(json!({"webhook": "https://hooks.example.com"})),
                false,
            )
            .await
            .unwrap();
        assert!(registered.warnings.is_empty());

        let err = client.delete_flavor(flavor.id).await.unwrap_err();
        assert!(matches!(err, ClientError::IllegalOperation(_)));

        client
            .deregister_component(ComponentType::Alerter, "alerts")
            .await
            .unwrap();
        client.delete_flavor(flavor.id).await.unwrap();
        assert!(client
            .get_flavor_by_name_and_type("slack", ComponentType::Alerter)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_custom_flavor_schema_keywords_are_enforced() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir).await;
        let schema = json!({
            "type": "object",
            "properties": {
                "mode": {"enum": ["fast", "slow"]},
                "retries": {"type": "integer", "minimum": 0}
            }
        });
        client
            .create_flavor("batch", ComponentType::StepOperator, "acme.batch", schema, None)
            .await
            .unwrap();

        let err = client
            .register_component(
                "runner",
                ComponentType::StepOperator,
                "batch",
                config(json!({"mode": "warp", "retries": -5})),
                false,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidConfiguration { .. }), "{err:?}");

        let err = client
            .create_flavor(
                "broken",
                ComponentType::StepOperator,
                "acme.broken",
                json!({"type": 12}),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_update_component_revalidates_stacks() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir).await;
        let updated = client
            .update_component(
                ComponentType::ArtifactStore,
                DEFAULT_NAME,
                ComponentChanges {
                    configuration: config(json!({"path": "/data/artifacts"})),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(
            updated.value.configuration.get("path"),
            Some(&json!("/data/artifacts"))
        );
        assert_eq!(
            client.stacks_using_component(updated.value.id).await.unwrap().len(),
            1
        );
    }
}
