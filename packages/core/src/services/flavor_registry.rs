//! Flavor Registry
//!
//! Maps `(flavor name, component type)` to a configuration type and builds
//! validated configuration objects from raw component payloads.
//!
//! ## Architecture
//!
//! - **Built-in flavors**: typed configuration structs registered at
//!   construction, each deserialized with `deny_unknown_fields`
//! - **Custom flavors**: [`Flavor`] resources in the store, whose payloads are
//!   checked against the flavor's JSON `config_schema`
//! - **Lookup order**: custom flavors of the active project shadow built-ins
//!   of the same name and type
//!
//! ## Example Usage
//!
//! ```rust
//! # use stackhub_core::services::FlavorRegistry;
//! # use stackhub_core::models::ComponentType;
//! # use serde_json::json;
//! let registry = FlavorRegistry::with_builtins();
//! let flavor = registry.builtin("s3", ComponentType::ArtifactStore).unwrap();
//!
//! let raw = json!({"path": "s3://bucket/artifacts"});
//! let config = flavor.instantiate(raw.as_object().unwrap()).unwrap();
//! assert!(config.is_remote());
//! ```

use super::error::ClientError;
use crate::db::ResourceStore;
use crate::filters::{ListQuery, Pagination, QueryFilter, MAX_PAGE_SIZE};
use crate::models::{ComponentType, Flavor, ResourceKind};
use jsonschema::{Draft, JSONSchema};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// A component configuration instantiated from a raw payload
pub trait ComponentConfig: fmt::Debug + Send + Sync {
    /// Whether the component only works on the client machine
    fn is_local(&self) -> bool {
        false
    }

    /// Whether the component lives outside the client machine
    fn is_remote(&self) -> bool {
        false
    }

    /// Cross-field checks that serde cannot express
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Builds a configuration from a raw key/value payload
pub type ConfigFactory = fn(&Map<String, Value>) -> Result<Box<dyn ComponentConfig>, String>;

fn instantiate<C>(raw: &Map<String, Value>) -> Result<Box<dyn ComponentConfig>, String>
where
    C: ComponentConfig + DeserializeOwned + 'static,
{
    let config: C =
        serde_json::from_value(Value::Object(raw.clone())).map_err(|e| e.to_string())?;
    config.validate()?;
    Ok(Box::new(config))
}

// ---------------------- //
// BUILT-IN CONFIGURATIONS //
// ---------------------- //

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocalOrchestratorConfig {}

impl ComponentConfig for LocalOrchestratorConfig {
    fn is_local(&self) -> bool {
        true
    }
}

fn default_kubernetes_namespace() -> String {
    "stackhub".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KubernetesOrchestratorConfig {
    pub kubernetes_context: Option<String>,
    #[serde(default = "default_kubernetes_namespace")]
    pub kubernetes_namespace: String,
    /// Running against a cluster on the client machine (kind, minikube)
    #[serde(default)]
    pub local: bool,
}

impl ComponentConfig for KubernetesOrchestratorConfig {
    fn is_local(&self) -> bool {
        self.local
    }

    fn is_remote(&self) -> bool {
        !self.local
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocalArtifactStoreConfig {
    /// Defaults to the local stores directory when unset
    pub path: Option<String>,
}

impl ComponentConfig for LocalArtifactStoreConfig {
    fn is_local(&self) -> bool {
        true
    }

    fn validate(&self) -> Result<(), String> {
        match &self.path {
            Some(path) if path.contains("://") => Err(format!(
                "The path '{}' of a local artifact store must be a filesystem path",
                path
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct S3ArtifactStoreConfig {
    pub path: String,
    pub key: Option<String>,
    pub secret: Option<String>,
}

impl ComponentConfig for S3ArtifactStoreConfig {
    fn is_remote(&self) -> bool {
        true
    }

    fn validate(&self) -> Result<(), String> {
        if self.path.starts_with("s3://") {
            Ok(())
        } else {
            Err(format!(
                "The path '{}' you defined for your artifact store is not supported; it must start with s3://",
                self.path
            ))
        }
    }
}

fn default_registry_uri() -> String {
    "localhost:5000".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocalContainerRegistryConfig {
    #[serde(default = "default_registry_uri")]
    pub uri: String,
}

impl ComponentConfig for LocalContainerRegistryConfig {
    fn is_local(&self) -> bool {
        true
    }

    fn validate(&self) -> Result<(), String> {
        if self.uri.contains("://") {
            return Err(format!(
                "Container registry URI '{}' must not contain a scheme",
                self.uri
            ));
        }
        Ok(())
    }
}

fn default_kaniko_namespace() -> String {
    "stackhub-kaniko".to_string()
}

fn default_executor_image() -> String {
    "gcr.io/kaniko-project/executor:latest".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KanikoImageBuilderConfig {
    pub kubernetes_context: String,
    #[serde(default = "default_kaniko_namespace")]
    pub kubernetes_namespace: String,
    #[serde(default = "default_executor_image")]
    pub executor_image: String,
}

impl ComponentConfig for KanikoImageBuilderConfig {
    fn is_remote(&self) -> bool {
        true
    }
}

fn default_instance_type() -> String {
    "ml.m5.large".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SagemakerStepOperatorConfig {
    pub role: String,
    #[serde(default = "default_instance_type")]
    pub instance_type: String,
}

impl ComponentConfig for SagemakerStepOperatorConfig {
    fn is_remote(&self) -> bool {
        true
    }
}

// -------------- //
// CUSTOM FLAVORS //
// -------------- //

/// Configuration of a custom flavor, checked against its JSON schema
///
/// Custom configurations claim neither locality, so they never take part in
/// locality warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaConfig {
    pub values: Map<String, Value>,
}

impl ComponentConfig for SchemaConfig {}

impl SchemaConfig {
    /// Compile a flavor's configuration schema
    pub fn compile_schema(schema: &Value) -> Result<JSONSchema, String> {
        JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(schema)
            .map_err(|err| format!("invalid configuration schema: {}", err))
    }

    /// Check `raw` against the JSON schema of a custom flavor
    pub fn from_schema(schema: &Value, raw: &Map<String, Value>) -> Result<Self, String> {
        let compiled = Self::compile_schema(schema)?;
        let instance = Value::Object(raw.clone());

        let messages: Vec<String> = match compiled.validate(&instance) {
            Ok(()) => Vec::new(),
            Err(errors) => errors
                .map(|err| {
                    let path = err.instance_path.to_string();
                    if path.is_empty() {
                        err.to_string()
                    } else {
                        format!("{}: {}", path, err)
                    }
                })
                .collect(),
        };
        if !messages.is_empty() {
            return Err(messages.join("; "));
        }

        Ok(Self {
            values: raw.clone(),
        })
    }
}

// -------- //
// REGISTRY //
// -------- //

/// A flavor shipped with the client
#[derive(Clone)]
pub struct BuiltinFlavor {
    pub name: String,
    pub component_type: ComponentType,
    pub source: String,
    factory: ConfigFactory,
}

impl fmt::Debug for BuiltinFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltinFlavor")
            .field("name", &self.name)
            .field("component_type", &self.component_type)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl BuiltinFlavor {
    pub fn instantiate(
        &self,
        raw: &Map<String, Value>,
    ) -> Result<Box<dyn ComponentConfig>, String> {
        (self.factory)(raw)
    }
}

/// Result of a flavor lookup
#[derive(Debug, Clone)]
pub enum ResolvedFlavor {
    Builtin(BuiltinFlavor),
    Custom(Flavor),
}

impl ResolvedFlavor {
    pub fn name(&self) -> &str {
        match self {
            Self::Builtin(flavor) => &flavor.name,
            Self::Custom(flavor) => &flavor.name,
        }
    }

    pub fn component_type(&self) -> ComponentType {
        match self {
            Self::Builtin(flavor) => flavor.component_type,
            Self::Custom(flavor) => flavor.component_type,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }

    /// Build the configuration object for a raw payload
    pub fn instantiate(
        &self,
        raw: &Map<String, Value>,
    ) -> Result<Box<dyn ComponentConfig>, String> {
        match self {
            Self::Builtin(flavor) => flavor.instantiate(raw),
            Self::Custom(flavor) => {
                let config = SchemaConfig::from_schema(&flavor.config_schema, raw)?;
                Ok(Box::new(config))
            }
        }
    }
}

/// Registry of built-in flavors plus store-backed custom flavor lookup
#[derive(Debug, Clone, Default)]
pub struct FlavorRegistry {
    builtins: BTreeMap<(ComponentType, String), BuiltinFlavor>,
}

impl FlavorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every flavor shipped with the client
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_flavor(
            "local",
            ComponentType::Orchestrator,
            "stackhub.orchestrators.local",
            instantiate::<LocalOrchestratorConfig>,
        );
        registry.register_flavor(
            "kubernetes",
            ComponentType::Orchestrator,
            "stackhub.integrations.kubernetes.orchestrator",
            instantiate::<KubernetesOrchestratorConfig>,
        );
        registry.register_flavor(
            "local",
            ComponentType::ArtifactStore,
            "stackhub.artifact_stores.local",
            instantiate::<LocalArtifactStoreConfig>,
        );
        registry.register_flavor(
            "s3",
            ComponentType::ArtifactStore,
            "stackhub.integrations.s3.artifact_store",
            instantiate::<S3ArtifactStoreConfig>,
        );
        registry.register_flavor(
            "local",
            ComponentType::ContainerRegistry,
            "stackhub.container_registries.local",
            instantiate::<LocalContainerRegistryConfig>,
        );
        registry.register_flavor(
            "kaniko",
            ComponentType::ImageBuilder,
            "stackhub.integrations.kaniko.image_builder",
            instantiate::<KanikoImageBuilderConfig>,
        );
        registry.register_flavor(
            "sagemaker",
            ComponentType::StepOperator,
            "stackhub.integrations.aws.step_operator",
            instantiate::<SagemakerStepOperatorConfig>,
        );
        registry
    }

    /// Register a built-in flavor, replacing any previous one with the same key
    pub fn register_flavor(
        &mut self,
        name: impl Into<String>,
        component_type: ComponentType,
        source: impl Into<String>,
        factory: ConfigFactory,
    ) {
        let name = name.into();
        self.builtins.insert(
            (component_type, name.clone()),
            BuiltinFlavor {
                name,
                component_type,
                source: source.into(),
                factory,
            },
        );
    }

    pub fn builtin(&self, name: &str, component_type: ComponentType) -> Option<&BuiltinFlavor> {
        self.builtins.get(&(component_type, name.to_string()))
    }

    pub fn builtins(&self) -> impl Iterator<Item = &BuiltinFlavor> {
        self.builtins.values()
    }

    pub fn builtins_of_type(
        &self,
        component_type: ComponentType,
    ) -> impl Iterator<Item = &BuiltinFlavor> {
        self.builtins
            .values()
            .filter(move |flavor| flavor.component_type == component_type)
    }

    /// Look up a flavor by name and type
    ///
    /// Custom flavors registered in `project` take precedence over built-ins.
    /// More than one matching custom flavor is an ambiguity error.
    pub async fn lookup<S>(
        &self,
        store: &S,
        name: &str,
        component_type: ComponentType,
        project: Option<Uuid>,
    ) -> Result<ResolvedFlavor, ClientError>
    where
        S: ResourceStore<Flavor> + ?Sized,
    {
        let mut query = ListQuery::default()
            .with_pagination(Pagination::new(1, i64::from(MAX_PAGE_SIZE))?)
            .with_filter(QueryFilter::str_equals("name", name))
            .with_filter(QueryFilter::str_equals("type", component_type.as_str()));
        if let Some(project) = project {
            query = query.with_filter(QueryFilter::uuid_equals("project", project));
        }
        let custom = store.list(&query).await?;

        let builtin = self.builtin(name, component_type);
        match custom.total {
            0 => builtin.cloned().map(ResolvedFlavor::Builtin).ok_or_else(|| {
                ClientError::not_found(
                    ResourceKind::Flavor,
                    format!("{} ({})", name, component_type),
                )
            }),
            1 => {
                if builtin.is_some() {
                    tracing::warn!(
                        "Custom flavor '{}' of type {} shadows the built-in flavor of the same name",
                        name,
                        component_type
                    );
                }
                custom
                    .items
                    .into_iter()
                    .next()
                    .map(ResolvedFlavor::Custom)
                    .ok_or_else(|| ClientError::not_found(ResourceKind::Flavor, name))
            }
            _ => Err(ClientError::ambiguous_name(
                ResourceKind::Flavor,
                name,
                custom.items.iter().map(|flavor| flavor.id.to_string()).collect(),
            )),
        }
    }
}
