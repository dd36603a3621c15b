//! Business Services
//!
//! This module contains the client-side logic on top of a registry store:
//!
//! - `resolver` - Resolve names, ids and id prefixes to exactly one entity
//! - `flavor_registry` - Built-in and custom flavors, configuration instantiation
//! - `stack_validator` - Component and stack validation, locality warnings
//! - `configuration` - Client settings and the persisted active context
//! - `client` - The [`Client`] facade tying the services together
//!
//! Services only talk to storage through the [`crate::db::RegistryStore`]
//! traits, so any backend implementing them can be plugged in.

pub mod client;
pub mod configuration;
pub mod error;
pub mod flavor_registry;
pub mod resolver;
pub mod stack_validator;

pub use client::{Assignee, Client, ComponentChanges, StackChanges, Validated};
pub use configuration::{
    find_repository, ActiveContext, ClientConfiguration, ClientSettings, ConfigError,
};
pub use error::ClientError;
pub use flavor_registry::{
    BuiltinFlavor, ComponentConfig, ConfigFactory, FlavorRegistry, ResolvedFlavor, SchemaConfig,
};
pub use resolver::{resolve, resolve_typed, EntityRef, LookupScope};
pub use stack_validator::{
    component_locality_warnings, ComponentDraft, StackValidation, StackValidator, StackWarning,
};
