//! Entity Resolver
//!
//! Turns a loose reference token into exactly one entity:
//!
//! 1. A token that parses as a UUID is fetched by id
//! 2. Otherwise entities named exactly `token` are listed; more than one is
//!    an ambiguity error, exactly one is the result
//! 3. With no name match, `token` is treated as an id prefix; more than one
//!    match is an ambiguity error, exactly one is the result, zero is
//!    not-found
//!
//! Every step is narrowed by a [`LookupScope`]: the active project for
//! project-scoped resources, and the component type for typed component
//! lookups. An id outside the scope is not-found.

use super::error::ClientError;
use crate::db::ResourceStore;
use crate::filters::{ListQuery, Pagination, QueryFilter, MAX_PAGE_SIZE};
use crate::models::{ComponentType, FieldValue, Resource};
use uuid::Uuid;

/// A caller-supplied reference to one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRef<'a> {
    Id(Uuid),
    Token(&'a str),
}

impl EntityRef<'_> {
    /// The UUID this reference denotes, if it is one or parses as one
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Token(token) => Uuid::parse_str(token.trim()).ok(),
        }
    }
}

impl std::fmt::Display for EntityRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{}", id),
            Self::Token(token) => f.write_str(token),
        }
    }
}

impl From<Uuid> for EntityRef<'_> {
    fn from(id: Uuid) -> Self {
        Self::Id(id)
    }
}

impl<'a> From<&'a str> for EntityRef<'a> {
    fn from(token: &'a str) -> Self {
        Self::Token(token)
    }
}

impl<'a> From<&'a String> for EntityRef<'a> {
    fn from(token: &'a String) -> Self {
        Self::Token(token.as_str())
    }
}

/// Filters applied to the name and prefix steps of a resolution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupScope {
    project: Option<Uuid>,
    component_type: Option<ComponentType>,
}

impl LookupScope {
    /// No narrowing; names are globally unique
    pub fn global() -> Self {
        Self::default()
    }

    /// Names are unique within `project`
    pub fn project(project: Uuid) -> Self {
        Self {
            project: Some(project),
            component_type: None,
        }
    }

    /// Additionally require a component type (typed lookups)
    pub fn with_component_type(mut self, component_type: ComponentType) -> Self {
        self.component_type = Some(component_type);
        self
    }

    pub fn project_id(&self) -> Option<Uuid> {
        self.project
    }

    pub fn component_type(&self) -> Option<ComponentType> {
        self.component_type
    }

    /// A list query over the scope plus `filter`, sized to surface every candidate
    fn query(&self, filter: QueryFilter) -> Result<ListQuery, ClientError> {
        let mut query = ListQuery::default()
            .with_pagination(Pagination::new(1, i64::from(MAX_PAGE_SIZE))?)
            .with_filter(filter);
        if let Some(project) = self.project {
            query = query.with_filter(QueryFilter::uuid_equals("project", project));
        }
        if let Some(component_type) = self.component_type {
            query = query.with_filter(QueryFilter::str_equals("type", component_type.as_str()));
        }
        Ok(query)
    }

    /// Id lookups honour the project of scoped resources and the component type
    fn admits<R: Resource>(&self, entity: &R) -> bool {
        let in_project = match self.project {
            Some(project) if R::PROJECT_SCOPED => entity.project() == Some(project),
            _ => true,
        };
        let of_type = match self.component_type {
            Some(component_type) => {
                entity.field_value("type") == Some(FieldValue::from(component_type.as_str()))
            }
            None => true,
        };
        in_project && of_type
    }
}

/// Resolve `reference` to exactly one entity of kind `R`
pub async fn resolve<'a, R, S>(
    store: &S,
    reference: impl Into<EntityRef<'a>>,
    scope: LookupScope,
) -> Result<R, ClientError>
where
    R: Resource,
    S: ResourceStore<R> + ?Sized,
{
    let token = match reference.into() {
        EntityRef::Id(id) => return resolve_id(store, id, scope).await,
        EntityRef::Token(token) => token.trim(),
    };
    if let Ok(id) = Uuid::parse_str(token) {
        return resolve_id(store, id, scope).await;
    }
    if token.is_empty() {
        return Err(ClientError::not_found(R::KIND, token));
    }

    let by_name = store
        .list(&scope.query(QueryFilter::str_equals("name", token))?)
        .await?;
    match by_name.total {
        0 => {}
        1 => {
            return by_name
                .items
                .into_iter()
                .next()
                .ok_or_else(|| ClientError::not_found(R::KIND, token));
        }
        _ => {
            return Err(ClientError::ambiguous_name(
                R::KIND,
                token,
                by_name.items.iter().map(Resource::label).collect(),
            ));
        }
    }

    tracing::debug!("No {} named '{}', trying it as an id prefix", R::KIND, token);
    let by_prefix = store
        .list(&scope.query(QueryFilter::uuid_prefix("id", token))?)
        .await?;
    match by_prefix.total {
        0 => Err(ClientError::not_found(R::KIND, token)),
        1 => by_prefix
            .items
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::not_found(R::KIND, token)),
        count => Err(ClientError::ambiguous_prefix(
            R::KIND,
            token,
            count,
            by_prefix.items.iter().map(Resource::label).collect(),
        )),
    }
}

async fn resolve_id<R, S>(store: &S, id: Uuid, scope: LookupScope) -> Result<R, ClientError>
where
    R: Resource,
    S: ResourceStore<R> + ?Sized,
{
    tracing::debug!("Resolving {} by id {}", R::KIND, id);
    match store.get(id).await? {
        Some(entity) if scope.admits(&entity) => Ok(entity),
        _ => Err(ClientError::not_found(R::KIND, id.to_string())),
    }
}

/// Typed variant: resolve a component-like entity that must also be of `component_type`
pub async fn resolve_typed<'a, R, S>(
    store: &S,
    reference: impl Into<EntityRef<'a>>,
    component_type: ComponentType,
    scope: LookupScope,
) -> Result<R, ClientError>
where
    R: Resource,
    S: ResourceStore<R> + ?Sized,
{
    resolve(store, reference, scope.with_component_type(component_type)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_ref_uuid_parsing() {
        let id = Uuid::new_v4();
        assert_eq!(EntityRef::from(id).as_uuid(), Some(id));
        assert_eq!(EntityRef::Token(&id.to_string()).as_uuid(), Some(id));
        assert_eq!(EntityRef::Token("7f3a").as_uuid(), None);
        assert_eq!(EntityRef::Token("default").as_uuid(), None);
    }

    #[test]
    fn test_scope_filters() {
        let project = Uuid::new_v4();
        let scope = LookupScope::project(project).with_component_type(ComponentType::Orchestrator);
        let query = scope.query(QueryFilter::str_equals("name", "local")).unwrap();

        let fields: Vec<_> = query.filters().iter().map(|f| f.field()).collect();
        assert_eq!(fields, ["name", "project", "type"]);
        assert_eq!(query.pagination().size(), MAX_PAGE_SIZE);
    }
}
