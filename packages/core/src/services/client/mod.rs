//! Client Facade
//!
//! [`Client`] composes the filter compiler, the entity resolver, the flavor
//! registry and the stack validator into resource-specific operations, and
//! owns the active context (active project and active stack).
//!
//! The client is constructed once and passed by reference. Switching to a
//! different repository root goes through [`Client::activate_root`], which
//! re-checks the stored active project and stack against the store.
//!
//! Operations are split by resource family:
//!
//! - `identity` - users, teams, roles, role assignments, projects
//! - `stacks` - stacks, stack components, flavors
//! - `pipelines` - pipelines and pipeline runs

mod identity;
mod pipelines;
mod stacks;

pub use identity::Assignee;
pub use stacks::{ComponentChanges, StackChanges};

use super::configuration::{
    find_repository, is_repository_directory, ClientConfiguration, ClientSettings, ConfigError,
    REPOSITORY_DIRECTORY_NAME,
};
use super::error::ClientError;
use super::flavor_registry::FlavorRegistry;
use super::resolver::{resolve, EntityRef, LookupScope};
use super::stack_validator::{StackValidator, StackWarning};
use crate::db::{RegistryStore, ResourceStore, DEFAULT_NAME};
use crate::filters::{ListQuery, Page, Pagination, QueryFilter, QueryParams, MAX_PAGE_SIZE};
use crate::models::{Project, Resource, Stack, User};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// A written entity together with the advisory warnings its validation produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Validated<T> {
    pub value: T,
    pub warnings: Vec<StackWarning>,
}

impl<T> Validated<T> {
    pub fn new(value: T, warnings: Vec<StackWarning>) -> Self {
        Self { value, warnings }
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

/// Management client for a stack registry
///
/// # Examples
///
/// ```no_run
/// use stackhub_core::db::InMemoryStore;
/// use stackhub_core::services::{Client, ClientSettings};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = Client::new(Arc::new(InMemoryStore::new()), ClientSettings::from_env()).await?;
///     let stack = client.get_stack(None).await?;
///     println!("Active stack: {}", stack.name);
///     Ok(())
/// }
/// ```
pub struct Client {
    store: Arc<dyn RegistryStore>,
    flavors: FlavorRegistry,
    settings: ClientSettings,

    /// Active repository root, if any
    root: Option<PathBuf>,

    /// Configuration of the active repository root
    local_config: Option<ClientConfiguration>,

    /// Fallback configuration in the global config directory
    global_config: ClientConfiguration,
}

impl Client {
    /// Create a client and activate the repository found from the settings
    ///
    /// The repository search starts at `settings.repository_path` (or the
    /// working directory) and walks up the parents. Without a repository the
    /// global configuration is used.
    pub async fn new(
        store: Arc<dyn RegistryStore>,
        settings: ClientSettings,
    ) -> Result<Self, ClientError> {
        settings.validate()?;
        let global_config = ClientConfiguration::load(&settings.global_config_dir()?)?;
        let root = find_repository(None, &settings);

        let mut client = Self {
            store,
            flavors: FlavorRegistry::with_builtins(),
            settings,
            root: None,
            local_config: None,
            global_config,
        };
        client.activate_root(root).await?;
        Ok(client)
    }

    /// Replace the flavor registry (extra built-in flavors)
    pub fn with_flavor_registry(mut self, flavors: FlavorRegistry) -> Self {
        self.flavors = flavors;
        self
    }

    pub fn store(&self) -> &Arc<dyn RegistryStore> {
        &self.store
    }

    pub fn flavor_registry(&self) -> &FlavorRegistry {
        &self.flavors
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    // ---------- //
    // REPOSITORY //
    // ---------- //

    /// Create a repository at `root`
    pub fn initialize(root: &Path) -> Result<(), ClientError> {
        let directory = root.join(REPOSITORY_DIRECTORY_NAME);
        if directory.exists() {
            return Err(ConfigError::RepositoryExists(root.to_path_buf()).into());
        }
        fs::create_dir_all(&directory).map_err(|source| ConfigError::Io {
            action: "create",
            path: directory.clone(),
            source,
        })?;
        tracing::info!("Initialized repository at {:?}", root);
        Ok(())
    }

    /// Search `path` and its parents for a repository root
    pub fn find_repository(&self, path: Option<&Path>) -> Option<PathBuf> {
        find_repository(path, &self.settings)
    }

    /// Switch the local scope to `root` (or to the global configuration)
    ///
    /// The newly effective configuration is sanitized: stored ids that no
    /// longer exist fall back to the default project and stack, or are
    /// cleared.
    pub async fn activate_root(&mut self, root: Option<PathBuf>) -> Result<(), ClientError> {
        match root {
            Some(root) => {
                if !is_repository_directory(&root) {
                    return Err(ConfigError::RepositoryNotFound(root).into());
                }
                let config = ClientConfiguration::load(&root.join(REPOSITORY_DIRECTORY_NAME))?;
                tracing::debug!("Activated repository root {:?}", root);
                self.local_config = Some(config);
                self.root = Some(root);
            }
            None => {
                self.local_config = None;
                self.root = None;
            }
        }
        self.sanitize().await
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Directory holding the effective configuration file
    pub fn config_directory(&self) -> PathBuf {
        match &self.root {
            Some(root) => root.join(REPOSITORY_DIRECTORY_NAME),
            None => self
                .global_config
                .path()
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        }
    }

    pub fn uses_local_configuration(&self) -> bool {
        self.local_config.is_some()
    }

    fn config(&self) -> &ClientConfiguration {
        self.local_config.as_ref().unwrap_or(&self.global_config)
    }

    fn config_mut(&mut self) -> &mut ClientConfiguration {
        self.local_config.as_mut().unwrap_or(&mut self.global_config)
    }

    /// Re-resolve the stored active project and stack against the store
    async fn sanitize(&mut self) -> Result<(), ClientError> {
        let before = self.config().context();
        let mut context = before;

        let project = match context.active_project_id {
            Some(id) => self.fetch::<Project>(id).await?,
            None => None,
        };
        let project = match project {
            Some(project) => Some(project),
            None => self.find_default::<Project>(None).await?,
        };
        context.active_project_id = project.as_ref().map(|p| p.id);

        let stack = match (context.active_stack_id, &project) {
            (Some(id), Some(project)) => self
                .fetch::<Stack>(id)
                .await?
                .filter(|stack| stack.project == project.id),
            _ => None,
        };
        let stack = match (stack, &project) {
            (Some(stack), _) => Some(stack),
            (None, Some(project)) => self.find_default::<Stack>(Some(project.id)).await?,
            (None, None) => None,
        };
        context.active_stack_id = stack.map(|s| s.id);

        if context != before {
            tracing::info!(
                project = ?context.active_project_id,
                stack = ?context.active_stack_id,
                "Updated active context"
            );
            self.config_mut().set_context(context)?;
        }
        Ok(())
    }

    /// The resource named `default` (within `project`, for scoped resources)
    async fn find_default<R>(&self, project: Option<Uuid>) -> Result<Option<R>, ClientError>
    where
        R: Resource,
        dyn RegistryStore: ResourceStore<R>,
    {
        let mut query =
            ListQuery::default().with_filter(QueryFilter::str_equals("name", DEFAULT_NAME));
        if let Some(project) = project {
            query = query.with_filter(QueryFilter::uuid_equals("project", project));
        }
        let page = ResourceStore::<R>::list(self.store.as_ref(), &query).await?;
        Ok(page.items.into_iter().next())
    }

    // -------------- //
    // ACTIVE CONTEXT //
    // -------------- //

    /// Id of the active project
    pub fn active_project_id(&self) -> Result<Uuid, ClientError> {
        self.config().active_project_id().ok_or_else(|| {
            ClientError::NoActiveContext(
                "No active project is configured. Run `set_active_project` to set one.".to_string(),
            )
        })
    }

    pub async fn active_project(&self) -> Result<Project, ClientError> {
        let id = self.active_project_id()?;
        self.fetch::<Project>(id)
            .await?
            .ok_or_else(|| ClientError::not_found(Project::KIND, id.to_string()))
    }

    /// Make the project identified by `reference` active
    ///
    /// The active stack is re-checked against the new project.
    pub async fn set_active_project<'a>(
        &mut self,
        reference: impl Into<EntityRef<'a>>,
    ) -> Result<Project, ClientError> {
        let project: Project = self.get_entity(reference).await?;
        self.config_mut().set_active_project(Some(project.id))?;
        self.sanitize().await?;
        tracing::info!("Set active project to '{}'", project.name);
        Ok(project)
    }

    /// Id of the active stack
    pub fn active_stack_id(&self) -> Result<Uuid, ClientError> {
        self.config().active_stack_id().ok_or_else(|| {
            ClientError::NoActiveContext(
                "No active stack is configured. Run `activate_stack` to set one.".to_string(),
            )
        })
    }

    pub async fn active_stack(&self) -> Result<Stack, ClientError> {
        let id = self.active_stack_id()?;
        self.fetch::<Stack>(id)
            .await?
            .ok_or_else(|| ClientError::not_found(Stack::KIND, id.to_string()))
    }

    /// Make the stack identified by `reference` active
    pub async fn activate_stack<'a>(
        &mut self,
        reference: impl Into<EntityRef<'a>>,
    ) -> Result<Stack, ClientError> {
        let stack: Stack = self.get_entity(reference).await?;
        self.config_mut().set_active_stack(Some(stack.id))?;
        tracing::info!("Set active stack to '{}'", stack.name);
        Ok(stack)
    }

    /// Whether `stack_id` is active in the local or the global configuration
    fn is_stack_active_anywhere(&self, stack_id: Uuid) -> bool {
        self.global_config.active_stack_id() == Some(stack_id)
            || self
                .local_config
                .as_ref()
                .is_some_and(|config| config.active_stack_id() == Some(stack_id))
    }

    fn is_project_active_anywhere(&self, project_id: Uuid) -> bool {
        self.global_config.active_project_id() == Some(project_id)
            || self
                .local_config
                .as_ref()
                .is_some_and(|config| config.active_project_id() == Some(project_id))
    }

    /// The user the store authenticates as
    pub async fn active_user(&self) -> Result<User, ClientError> {
        Ok(self.store.active_user().await?)
    }

    // ------------- //
    // STORE HELPERS //
    // ------------- //

    fn scope<R: Resource>(&self) -> Result<LookupScope, ClientError> {
        if R::PROJECT_SCOPED {
            Ok(LookupScope::project(self.active_project_id()?))
        } else {
            Ok(LookupScope::global())
        }
    }

    fn validator(&self) -> StackValidator<'_, dyn RegistryStore> {
        StackValidator::new(self.store.as_ref(), &self.flavors, self.store.config())
    }

    async fn fetch<R>(&self, id: Uuid) -> Result<Option<R>, ClientError>
    where
        R: Resource,
        dyn RegistryStore: ResourceStore<R>,
    {
        Ok(ResourceStore::<R>::get(self.store.as_ref(), id).await?)
    }

    /// Resolve a reference in the resource's lookup scope
    async fn get_entity<'a, R>(&self, reference: impl Into<EntityRef<'a>>) -> Result<R, ClientError>
    where
        R: Resource,
        dyn RegistryStore: ResourceStore<R>,
    {
        let scope = self.scope::<R>()?;
        resolve(self.store.as_ref(), reference, scope).await
    }

    async fn list_entities<R>(&self, params: &QueryParams) -> Result<Page<R>, ClientError>
    where
        R: Resource,
        dyn RegistryStore: ResourceStore<R>,
    {
        let query = ListQuery::for_resource::<R>(params)?;
        Ok(ResourceStore::<R>::list(self.store.as_ref(), &query).await?)
    }

    /// Every entity matching `filters`, across all pages
    async fn collect_all<R>(&self, filters: Vec<QueryFilter>) -> Result<Vec<R>, ClientError>
    where
        R: Resource,
        dyn RegistryStore: ResourceStore<R>,
    {
        let mut items = Vec::new();
        let mut page = 1;
        loop {
            let pagination = Pagination::new(page, i64::from(MAX_PAGE_SIZE))?;
            let mut query = ListQuery::default().with_pagination(pagination);
            for filter in &filters {
                query = query.with_filter(filter.clone());
            }
            let result = ResourceStore::<R>::list(self.store.as_ref(), &query).await?;
            let total_pages = result.total_pages();
            items.extend(result.items);
            if page as usize >= total_pages {
                return Ok(items);
            }
            page += 1;
        }
    }

    /// Whether another entity of kind `R` in the same scope already uses `name`
    async fn name_taken<R>(
        &self,
        name: &str,
        mut filters: Vec<QueryFilter>,
        except: Option<Uuid>,
    ) -> Result<bool, ClientError>
    where
        R: Resource,
        dyn RegistryStore: ResourceStore<R>,
    {
        filters.push(QueryFilter::str_equals("name", name));
        let existing = self.collect_all::<R>(filters).await?;
        Ok(existing.iter().any(|entity| Some(entity.id()) != except))
    }

    async fn create_entity<R>(&self, request: R::Request) -> Result<R, ClientError>
    where
        R: Resource,
        dyn RegistryStore: ResourceStore<R>,
    {
        let entity = ResourceStore::<R>::create(self.store.as_ref(), request).await?;
        tracing::info!("Created {} {}", R::KIND, entity.label());
        Ok(entity)
    }

    async fn update_entity<R>(&self, id: Uuid, update: R::Update) -> Result<R, ClientError>
    where
        R: Resource,
        dyn RegistryStore: ResourceStore<R>,
    {
        let entity = ResourceStore::<R>::update(self.store.as_ref(), id, update).await?;
        tracing::info!("Updated {} {}", R::KIND, entity.label());
        Ok(entity)
    }

    async fn delete_entity<R>(&self, entity: &R) -> Result<(), ClientError>
    where
        R: Resource,
        dyn RegistryStore: ResourceStore<R>,
    {
        if !ResourceStore::<R>::delete(self.store.as_ref(), entity.id()).await? {
            return Err(ClientError::not_found(R::KIND, entity.id().to_string()));
        }
        tracing::info!("Deleted {} {}", R::KIND, entity.label());
        Ok(())
    }
}
