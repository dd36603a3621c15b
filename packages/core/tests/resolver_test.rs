//! Integration tests for entity resolution
//!
//! Tests cover:
//! - Exact UUID lookup in the presence of name collisions
//! - Ambiguous names listing every candidate
//! - Unique and shared id prefixes
//! - Project scoping and component type checks
//! - Resolution against a store with fixed ids

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Map;
use stackhub_core::db::{InMemoryStore, ResourceStore, StoreConfig};
use stackhub_core::filters::{ListQuery, Page};
use stackhub_core::models::{
    Component, ComponentRequest, ComponentType, ComponentUpdate, Project, ProjectRequest,
    Resource, Stack,
};
use stackhub_core::services::{resolve, resolve_typed, ClientError, LookupScope};
use std::sync::Mutex;
use uuid::Uuid;

fn component_request(name: &str, component_type: ComponentType, project: Uuid) -> ComponentRequest {
    ComponentRequest {
        name: name.to_string(),
        component_type,
        flavor: "local".to_string(),
        configuration: Map::new(),
        is_shared: false,
        project,
        user: None,
    }
}

async fn default_project(store: &InMemoryStore) -> Project {
    resolve(store, "default", LookupScope::global()).await.unwrap()
}

/// Component store with caller-chosen ids
struct FixedIdStore {
    rows: Mutex<Vec<Component>>,
}

impl FixedIdStore {
    fn new(components: Vec<Component>) -> Self {
        Self {
            rows: Mutex::new(components),
        }
    }
}

#[async_trait]
impl ResourceStore<Component> for FixedIdStore {
    async fn get(&self, id: Uuid) -> Result<Option<Component>> {
        Ok(self.rows.lock().unwrap().iter().find(|c| c.id == id).cloned())
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<Component>> {
        let items: Vec<Component> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|c| query.matches_all(|field| c.field_value(field)))
            .cloned()
            .collect();
        Ok(Page {
            total: items.len(),
            items,
            page: query.pagination().page(),
            size: query.pagination().size(),
        })
    }

    async fn create(&self, _request: ComponentRequest) -> Result<Component> {
        bail!("read-only store")
    }

    async fn update(&self, _id: Uuid, _update: ComponentUpdate) -> Result<Component> {
        bail!("read-only store")
    }

    async fn delete(&self, _id: Uuid) -> Result<bool> {
        bail!("read-only store")
    }
}

fn fixed_component(id: &str, name: &str, project: Uuid) -> Component {
    Component::from_request(
        Uuid::parse_str(id).unwrap(),
        component_request(name, ComponentType::Orchestrator, project),
        Utc::now(),
    )
}

// =========================================================================
// Exact id and name lookups
// =========================================================================

#[tokio::test]
async fn test_exact_uuid_wins_over_name_collisions() {
    let store = InMemoryStore::new();
    let project = default_project(&store).await;

    let first = ResourceStore::<Component>::create(
        &store,
        component_request("dup", ComponentType::Orchestrator, project.id),
    )
    .await
    .unwrap();
    let second = ResourceStore::<Component>::create(
        &store,
        component_request("dup", ComponentType::Orchestrator, project.id),
    )
    .await
    .unwrap();
    // An entity whose name is the other entity's id
    ResourceStore::<Component>::create(
        &store,
        component_request(&first.id.to_string(), ComponentType::Orchestrator, project.id),
    )
    .await
    .unwrap();

    let scope = LookupScope::project(project.id);
    let by_id: Component = resolve(&store, first.id, scope).await.unwrap();
    assert_eq!(by_id.id, first.id);

    let by_string: Component = resolve(&store, first.id.to_string().as_str(), scope)
        .await
        .unwrap();
    assert_eq!(by_string.id, first.id);

    let by_id: Component = resolve(&store, second.id, scope).await.unwrap();
    assert_eq!(by_id.id, second.id);
}

#[tokio::test]
async fn test_ambiguous_name_lists_exactly_the_matches() {
    let store = InMemoryStore::new();
    let project = default_project(&store).await;

    let mut expected = Vec::new();
    for _ in 0..3 {
        let component = ResourceStore::<Component>::create(
            &store,
            component_request("shared", ComponentType::ArtifactStore, project.id),
        )
        .await
        .unwrap();
        expected.push(component.label());
    }
    ResourceStore::<Component>::create(
        &store,
        component_request("other", ComponentType::ArtifactStore, project.id),
    )
    .await
    .unwrap();

    let err = resolve::<Component, _>(&store, "shared", LookupScope::project(project.id))
        .await
        .unwrap_err();
    match err {
        ClientError::AmbiguousName { candidates, .. } => {
            let mut candidates = candidates;
            candidates.sort();
            expected.sort();
            assert_eq!(candidates, expected);
        }
        other => panic!("expected ambiguous name, got {other:?}"),
    }
}

#[tokio::test]
async fn test_name_lookup_is_scoped_to_project() {
    let store = InMemoryStore::new();
    let project = default_project(&store).await;
    let other = ResourceStore::<Project>::create(
        &store,
        ProjectRequest {
            name: "other".to_string(),
            description: String::new(),
        },
    )
    .await
    .unwrap();

    let err = resolve::<Stack, _>(&store, "default", LookupScope::project(other.id))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let stack: Stack = resolve(&store, "default", LookupScope::project(project.id))
        .await
        .unwrap();
    assert_eq!(stack.project, project.id);
}

#[tokio::test]
async fn test_id_lookup_is_scoped_to_project() {
    let store = InMemoryStore::new();
    let project = default_project(&store).await;
    let other = ResourceStore::<Project>::create(
        &store,
        ProjectRequest {
            name: "other".to_string(),
            description: String::new(),
        },
    )
    .await
    .unwrap();
    let stack: Stack = resolve(&store, "default", LookupScope::project(project.id))
        .await
        .unwrap();

    let err = resolve::<Stack, _>(&store, stack.id, LookupScope::project(other.id))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    let id = stack.id.to_string();
    let err = resolve::<Stack, _>(&store, id.as_str(), LookupScope::project(other.id))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    // Unscoped lookups still find it
    let found: Stack = resolve(&store, stack.id, LookupScope::global()).await.unwrap();
    assert_eq!(found.id, stack.id);
}

#[tokio::test]
async fn test_typed_lookup_rejects_other_component_types() {
    let store = InMemoryStore::new();
    let project = default_project(&store).await;
    let scope = LookupScope::project(project.id);

    let orchestrator: Component =
        resolve_typed(&store, "default", ComponentType::Orchestrator, scope)
            .await
            .unwrap();
    assert_eq!(orchestrator.component_type, ComponentType::Orchestrator);

    let err = resolve_typed::<Component, _>(
        &store,
        orchestrator.id,
        ComponentType::ArtifactStore,
        scope,
    )
    .await
    .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_empty_and_unknown_tokens_are_not_found() {
    let store = InMemoryStore::with_config(StoreConfig::default());

    for token in ["", "   ", "does-not-exist", "zzzz"] {
        let err = resolve::<Project, _>(&store, token, LookupScope::global())
            .await
            .unwrap_err();
        assert!(err.is_not_found(), "token {token:?} gave {err:?}");
    }
}

// =========================================================================
// Prefix lookups
// =========================================================================

#[tokio::test]
async fn test_unique_prefix_resolves() {
    let project = Uuid::new_v4();
    let store = FixedIdStore::new(vec![
        fixed_component("7f3a1111-0000-4000-8000-000000000000", "alpha", project),
        fixed_component("9b2c2222-0000-4000-8000-000000000000", "beta", project),
    ]);

    let component: Component = resolve(&store, "7f3a", LookupScope::project(project))
        .await
        .unwrap();
    assert_eq!(component.name, "alpha");

    let component: Component = resolve(&store, "9B2C", LookupScope::project(project))
        .await
        .unwrap();
    assert_eq!(component.name, "beta");
}

#[tokio::test]
async fn test_shared_prefix_is_ambiguous() {
    let project = Uuid::new_v4();
    let first = "7f3a1111-0000-4000-8000-000000000000";
    let second = "7f3a2222-0000-4000-8000-000000000000";
    let store = FixedIdStore::new(vec![
        fixed_component(first, "alpha", project),
        fixed_component(second, "beta", project),
    ]);

    let err = resolve::<Component, _>(&store, "7f3a", LookupScope::project(project))
        .await
        .unwrap_err();
    match &err {
        ClientError::AmbiguousPrefix {
            count, candidates, ..
        } => {
            assert_eq!(*count, 2);
            assert!(candidates.iter().any(|c| c.contains(first)));
            assert!(candidates.iter().any(|c| c.contains(second)));
        }
        other => panic!("expected ambiguous prefix, got {other:?}"),
    }
    assert!(err.to_string().contains(first));

    // A longer prefix separates them again
    let component: Component = resolve(&store, "7f3a2", LookupScope::project(project))
        .await
        .unwrap();
    assert_eq!(component.name, "beta");
}

#[tokio::test]
async fn test_name_match_takes_precedence_over_prefix() {
    let project = Uuid::new_v4();
    let store = FixedIdStore::new(vec![
        fixed_component("7f3a1111-0000-4000-8000-000000000000", "alpha", project),
        fixed_component("abcd2222-0000-4000-8000-000000000000", "7f3a", project),
    ]);

    let component: Component = resolve(&store, "7f3a", LookupScope::project(project))
        .await
        .unwrap();
    assert_eq!(component.id.to_string(), "abcd2222-0000-4000-8000-000000000000");
}
