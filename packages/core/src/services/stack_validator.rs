//! Stack Validator
//!
//! Checks a set of component slots before it is persisted as a stack:
//!
//! 1. every component reference resolves (typed lookup by id)
//! 2. every component's flavor is found and its configuration instantiates
//! 3. components are partitioned by locality
//! 4. mixing local and remote components produces one advisory warning
//! 5. the mandatory orchestrator and artifact store slots are filled
//! 6. each component's locality is checked against the store's locality
//!
//! Validation only reads from the store. Warnings never fail validation;
//! they are returned to the caller and logged.

use super::error::ClientError;
use super::flavor_registry::{ComponentConfig, FlavorRegistry};
use super::resolver::{resolve_typed, LookupScope};
use crate::db::{ResourceStore, StoreConfig, StoreType};
use crate::models::{
    component_refs, has_mandatory_components, Component, ComponentRequest, ComponentType, Flavor,
    StackComponents,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

pub const INVALID_STACK_MESSAGE: &str =
    "Stack configuration is invalid. A valid stack must contain an Artifact Store and an Orchestrator.";

/// An advisory finding that does not block the write
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StackWarning {
    /// The stack combines components relying on local resources with remote ones
    MixedLocality {
        local: Vec<String>,
        remote: Vec<String>,
    },
    /// A remote component cannot reach a store that lives on this machine
    RemoteComponentLocalStore {
        component: String,
        store_type: StoreType,
    },
    /// A local component registered in a shared remote store
    LocalComponentRemoteStore { component: String },
    /// Pipeline code running locally against a remote store
    LocalExecutionRemoteStore { component: String },
}

impl StackWarning {
    pub fn is_mixed_locality(&self) -> bool {
        matches!(self, Self::MixedLocality { .. })
    }
}

impl fmt::Display for StackWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MixedLocality { local, remote } => write!(
                f,
                "You are configuring a stack that is composed of components that are relying on \
                 local resources as well as components that are running remotely. This is not \
                 recommended as remote components may not be able to access local resources. \
                 Local components: {}. Remote components: {}.",
                local.join(", "),
                remote.join(", ")
            ),
            Self::RemoteComponentLocalStore {
                component,
                store_type: StoreType::Sql,
            } => write!(
                f,
                "The stack component '{}' is running remotely while the client uses a local \
                 database. The component may not be able to reach the local database and will \
                 therefore not be functional. Please consider deploying and/or using a remote \
                 server instead.",
                component
            ),
            Self::RemoteComponentLocalStore {
                component,
                store_type: StoreType::Rest,
            } => write!(
                f,
                "The stack component '{}' is running remotely while the client is connected to a \
                 local server. The component may not be able to reach the local server and will \
                 therefore not be functional. Please consider deploying and/or using a remote \
                 server instead.",
                component
            ),
            Self::LocalComponentRemoteStore { component } => write!(
                f,
                "The stack component '{}' is using local resources while the client is connected \
                 to a remote server. The component may not be usable from other hosts or by other \
                 users. You should consider using a non-local alternative instead.",
                component
            ),
            Self::LocalExecutionRemoteStore { component } => write!(
                f,
                "The stack component '{}' runs pipeline code on this machine while the client is \
                 connected to a remote server. This can lead to unexpectedly slow performance, \
                 because every step has to communicate with the remote server. Consider using a \
                 remote orchestrator or step operator instead.",
                component
            ),
        }
    }
}

/// Outcome of a successful validation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StackValidation {
    pub warnings: Vec<StackWarning>,
}

impl StackValidation {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn mixed_locality_warnings(&self) -> usize {
        self.warnings
            .iter()
            .filter(|warning| warning.is_mixed_locality())
            .count()
    }
}

/// The parts of a component that configuration checks look at
#[derive(Debug, Clone, Copy)]
pub struct ComponentDraft<'a> {
    pub name: &'a str,
    pub component_type: ComponentType,
    pub flavor: &'a str,
    pub configuration: &'a Map<String, Value>,
    pub project: Uuid,
}

impl ComponentDraft<'_> {
    fn label(&self) -> String {
        format!("{} ({})", self.name, self.component_type)
    }
}

impl<'a> From<&'a Component> for ComponentDraft<'a> {
    fn from(component: &'a Component) -> Self {
        Self {
            name: &component.name,
            component_type: component.component_type,
            flavor: &component.flavor,
            configuration: &component.configuration,
            project: component.project,
        }
    }
}

impl<'a> From<&'a ComponentRequest> for ComponentDraft<'a> {
    fn from(request: &'a ComponentRequest) -> Self {
        Self {
            name: &request.name,
            component_type: request.component_type,
            flavor: &request.flavor,
            configuration: &request.configuration,
            project: request.project,
        }
    }
}

/// Locality warnings for one component against the store
pub fn component_locality_warnings(
    component: &str,
    component_type: ComponentType,
    config: &dyn ComponentConfig,
    store: &StoreConfig,
) -> Vec<StackWarning> {
    let mut warnings = Vec::new();
    if store.is_local() {
        if config.is_remote() {
            warnings.push(StackWarning::RemoteComponentLocalStore {
                component: component.to_string(),
                store_type: store.store_type,
            });
        }
    } else if config.is_local() {
        warnings.push(StackWarning::LocalComponentRemoteStore {
            component: component.to_string(),
        });
        if component_type.runs_pipeline_code() {
            warnings.push(StackWarning::LocalExecutionRemoteStore {
                component: component.to_string(),
            });
        }
    }
    warnings
}

/// Validates components and stacks against one store
pub struct StackValidator<'a, S: ?Sized> {
    store: &'a S,
    flavors: &'a FlavorRegistry,
    store_config: &'a StoreConfig,
}

impl<'a, S> StackValidator<'a, S>
where
    S: ResourceStore<Component> + ResourceStore<Flavor> + ?Sized,
{
    pub fn new(store: &'a S, flavors: &'a FlavorRegistry, store_config: &'a StoreConfig) -> Self {
        Self {
            store,
            flavors,
            store_config,
        }
    }

    /// Look up the component's flavor and build its configuration
    pub async fn instantiate(
        &self,
        component: ComponentDraft<'_>,
    ) -> Result<Box<dyn ComponentConfig>, ClientError> {
        let flavor = self
            .flavors
            .lookup(
                self.store,
                component.flavor,
                component.component_type,
                Some(component.project),
            )
            .await
            .map_err(|e| match e {
                ClientError::NotFound { .. } => ClientError::invalid_configuration(
                    component.name,
                    format!(
                        "no flavor '{}' is registered for component type {}",
                        component.flavor, component.component_type
                    ),
                ),
                other => other,
            })?;

        flavor
            .instantiate(component.configuration)
            .map_err(|reason| ClientError::invalid_configuration(component.name, reason))
    }

    /// Configuration and locality checks for a single component
    pub async fn validate_component(
        &self,
        component: ComponentDraft<'_>,
    ) -> Result<Vec<StackWarning>, ClientError> {
        let config = self.instantiate(component).await?;
        let warnings = component_locality_warnings(
            &component.label(),
            component.component_type,
            &*config,
            self.store_config,
        );
        log_warnings(&warnings);
        Ok(warnings)
    }

    /// Validate a full set of stack slots
    pub async fn validate(
        &self,
        components: &StackComponents,
    ) -> Result<StackValidation, ClientError> {
        let mut resolved = Vec::new();
        for reference in component_refs(components) {
            let component: Component = resolve_typed(
                self.store,
                reference.id,
                reference.component_type,
                LookupScope::global(),
            )
            .await
            .map_err(|e| match e {
                ClientError::NotFound { .. } => ClientError::StackComponentMissing {
                    component_type: reference.component_type,
                    id: reference.id,
                },
                other => other,
            })?;
            resolved.push(component);
        }

        let mut configured = Vec::with_capacity(resolved.len());
        for component in &resolved {
            let config = self.instantiate(ComponentDraft::from(component)).await?;
            configured.push((component, config));
        }

        let mut warnings = Vec::new();

        let label = |component: &Component| ComponentDraft::from(component).label();
        let local: Vec<String> = configured
            .iter()
            .filter(|(_, config)| config.is_local())
            .map(|(component, _)| label(*component))
            .collect();
        let remote: Vec<String> = configured
            .iter()
            .filter(|(_, config)| config.is_remote())
            .map(|(component, _)| label(*component))
            .collect();
        if !local.is_empty() && !remote.is_empty() {
            warnings.push(StackWarning::MixedLocality { local, remote });
        }

        if !has_mandatory_components(components) {
            return Err(ClientError::InvalidStack(INVALID_STACK_MESSAGE.to_string()));
        }

        for (component, config) in &configured {
            warnings.extend(component_locality_warnings(
                &label(*component),
                component.component_type,
                &**config,
                self.store_config,
            ));
        }

        log_warnings(&warnings);
        Ok(StackValidation { warnings })
    }
}

fn log_warnings(warnings: &[StackWarning]) {
    for warning in warnings {
        tracing::warn!("{}", warning);
    }
}
