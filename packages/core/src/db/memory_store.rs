//! In-Memory Store
//!
//! Reference [`RegistryStore`] backend that keeps every resource in a
//! `HashMap` behind a mutex and executes compiled [`ListQuery`] predicates
//! directly against entity field values. Used by tests and for ephemeral
//! local sessions.
//!
//! A freshly constructed store is seeded the way a new deployment is:
//! a `default` user (the active user), a `default` project and a `default`
//! stack made of a local orchestrator and a local artifact store.

use super::store::{RegistryStore, ResourceStore, StoreConfig};
use crate::filters::{compare_field_values, ListQuery, Page};
use crate::models::{
    Component, ComponentRequest, ComponentType, FieldValue, Flavor, Pipeline, PipelineRun,
    Project, ProjectRequest, Resource, Role, RoleAssignment, Stack, StackComponents,
    StackRequest, Team, User, UserRequest,
};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Map;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Name of the seeded user, project, stack and stack components
pub const DEFAULT_NAME: &str = "default";

/// Next strictly increasing timestamp after `last`
fn advance(last: &mut DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now().max(*last + Duration::microseconds(1));
    *last = now;
    now
}

/// Entities of one resource kind
struct Table<R> {
    rows: Mutex<HashMap<Uuid, R>>,
}

impl<R: Resource> Table<R> {
    fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, R>>> {
        self.rows
            .lock()
            .map_err(|_| anyhow!("Failed to acquire lock on {} table", R::KIND))
    }

    fn get(&self, id: Uuid) -> Result<Option<R>> {
        Ok(self.lock()?.get(&id).cloned())
    }

    fn list(&self, query: &ListQuery) -> Result<Page<R>> {
        let rows = self.lock()?;
        let mut matches: Vec<R> = rows
            .values()
            .filter(|entity| query.matches_all(|field| entity.field_value(field)))
            .cloned()
            .collect();
        drop(rows);

        let sort_by = query.sort_by();
        matches.sort_by(|a, b| {
            let left = a.field_value(sort_by).unwrap_or(FieldValue::Null);
            let right = b.field_value(sort_by).unwrap_or(FieldValue::Null);
            compare_field_values(&left, &right).then_with(|| a.id().cmp(&b.id()))
        });

        let pagination = query.pagination();
        let total = matches.len();
        let items = matches
            .into_iter()
            .skip(pagination.offset())
            .take(pagination.limit())
            .collect();

        Ok(Page {
            items,
            total,
            page: pagination.page(),
            size: pagination.size(),
        })
    }

    /// Insert through exclusive access while the store is being built
    fn seed(&mut self, request: R::Request, clock: &mut DateTime<Utc>) -> R {
        let entity = R::from_request(Uuid::new_v4(), request, advance(clock));
        self.rows
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entity.id(), entity.clone());
        entity
    }

    fn insert(&self, entity: R) -> Result<R> {
        self.lock()?.insert(entity.id(), entity.clone());
        Ok(entity)
    }

    fn update(&self, id: Uuid, update: R::Update, now: DateTime<Utc>) -> Result<R> {
        let mut rows = self.lock()?;
        let Some(entity) = rows.get_mut(&id) else {
            bail!("{} with id '{}' does not exist", R::KIND, id);
        };
        entity.apply_update(update, now);
        Ok(entity.clone())
    }

    fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.lock()?.remove(&id).is_some())
    }
}

/// Mutex-backed store holding every resource kind
pub struct InMemoryStore {
    config: StoreConfig,
    projects: Table<Project>,
    users: Table<User>,
    teams: Table<Team>,
    roles: Table<Role>,
    role_assignments: Table<RoleAssignment>,
    flavors: Table<Flavor>,
    components: Table<Component>,
    stacks: Table<Stack>,
    pipelines: Table<Pipeline>,
    runs: Table<PipelineRun>,
    active_user: Mutex<Option<Uuid>>,
    clock: Mutex<DateTime<Utc>>,
}

impl InMemoryStore {
    /// Local SQL store seeded with the default user, project and stack
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Seeded store reporting the given connection settings
    pub fn with_config(config: StoreConfig) -> Self {
        let mut store = Self::without_defaults(config);
        store.seed_defaults();
        store
    }

    /// Completely empty store (no user, project or stack)
    pub fn without_defaults(config: StoreConfig) -> Self {
        Self {
            config,
            projects: Table::new(),
            users: Table::new(),
            teams: Table::new(),
            roles: Table::new(),
            role_assignments: Table::new(),
            flavors: Table::new(),
            components: Table::new(),
            stacks: Table::new(),
            pipelines: Table::new(),
            runs: Table::new(),
            active_user: Mutex::new(None),
            clock: Mutex::new(DateTime::<Utc>::MIN_UTC),
        }
    }

    /// Change the user requests are authenticated as
    pub fn set_active_user(&self, user_id: Uuid) -> Result<()> {
        *self
            .active_user
            .lock()
            .map_err(|_| anyhow!("Failed to acquire lock on active user"))? = Some(user_id);
        Ok(())
    }

    /// Strictly increasing timestamps, so `created` order is insertion order
    fn tick(&self) -> Result<DateTime<Utc>> {
        let mut last = self
            .clock
            .lock()
            .map_err(|_| anyhow!("Failed to acquire lock on store clock"))?;
        Ok(advance(&mut last))
    }

    fn create_in<R: Resource>(&self, table: &Table<R>, request: R::Request) -> Result<R> {
        let entity = R::from_request(Uuid::new_v4(), request, self.tick()?);
        tracing::debug!("Created {} {}", R::KIND, entity.label());
        table.insert(entity)
    }

    fn seed_defaults(&mut self) {
        let clock = self.clock.get_mut().unwrap_or_else(PoisonError::into_inner);

        let user = self.users.seed(
            UserRequest {
                name: DEFAULT_NAME.to_string(),
                full_name: String::new(),
                email: None,
                password: None,
                active: true,
            },
            clock,
        );
        *self
            .active_user
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner) = Some(user.id);

        let project = self.projects.seed(
            ProjectRequest {
                name: DEFAULT_NAME.to_string(),
                description: String::new(),
            },
            clock,
        );

        let mut components = StackComponents::new();
        for component_type in [ComponentType::Orchestrator, ComponentType::ArtifactStore] {
            let component = self.components.seed(
                ComponentRequest {
                    name: DEFAULT_NAME.to_string(),
                    component_type,
                    flavor: "local".to_string(),
                    configuration: Map::new(),
                    is_shared: false,
                    project: project.id,
                    user: Some(user.id),
                },
                clock,
            );
            components.insert(component_type, vec![component.id]);
        }

        self.stacks.seed(
            StackRequest {
                name: DEFAULT_NAME.to_string(),
                description: String::new(),
                components,
                is_shared: false,
                project: project.id,
                user: Some(user.id),
            },
            clock,
        );

        tracing::info!(store = %self.config.url, "Seeded default user, project and stack");
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! impl_resource_store {
    ($resource:ty, $table:ident) => {
        #[async_trait]
        impl ResourceStore<$resource> for InMemoryStore {
            async fn get(&self, id: Uuid) -> Result<Option<$resource>> {
                self.$table.get(id)
            }

            async fn list(&self, query: &ListQuery) -> Result<Page<$resource>> {
                self.$table.list(query)
            }

            async fn create(
                &self,
                request: <$resource as Resource>::Request,
            ) -> Result<$resource> {
                self.create_in(&self.$table, request)
            }

            async fn update(
                &self,
                id: Uuid,
                update: <$resource as Resource>::Update,
            ) -> Result<$resource> {
                self.$table.update(id, update, self.tick()?)
            }

            async fn delete(&self, id: Uuid) -> Result<bool> {
                self.$table.delete(id)
            }
        }
    };
}

impl_resource_store!(Project, projects);
impl_resource_store!(User, users);
impl_resource_store!(Team, teams);
impl_resource_store!(Role, roles);
impl_resource_store!(RoleAssignment, role_assignments);
impl_resource_store!(Flavor, flavors);
impl_resource_store!(Component, components);
impl_resource_store!(Stack, stacks);
impl_resource_store!(Pipeline, pipelines);
impl_resource_store!(PipelineRun, runs);

#[async_trait]
impl RegistryStore for InMemoryStore {
    fn config(&self) -> &StoreConfig {
        &self.config
    }

    async fn active_user(&self) -> Result<User> {
        let id = self
            .active_user
            .lock()
            .map_err(|_| anyhow!("Failed to acquire lock on active user"))?
            .ok_or_else(|| anyhow!("No active user configured for this store"))?;
        self.users
            .get(id)?
            .ok_or_else(|| anyhow!("Active user '{}' no longer exists", id))
    }
}
