//! Stackhub Core Client Layer
//!
//! This crate provides the client-side logic for a registry of ML stacks:
//! typed list queries, entity lookup by name, id or id prefix, stack
//! validation against pluggable component flavors, and a facade holding the
//! active project and stack.
//!
//! # Architecture
//!
//! - **Store-agnostic**: every operation goes through the async `ResourceStore` traits
//! - **Explicit field registries**: each resource declares its filterable fields and their types
//! - **Flavors as a registry**: configuration types are looked up by flavor name and component type
//! - **Advisory warnings**: locality findings are returned to the caller, never fail a write
//!
//! # Modules
//!
//! - [`models`] - Resource types (Stack, Component, Flavor, User, Project, etc.)
//! - [`filters`] - Filter compiler: raw parameters to typed filters, sorting and pagination
//! - [`db`] - Store traits and the in-memory store
//! - [`services`] - Resolver, flavor registry, stack validator and the `Client` facade
//! - [`logging`] - Tracing subscriber initialisation

pub mod db;
pub mod filters;
pub mod logging;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use db::{InMemoryStore, RegistryStore, ResourceStore, StoreConfig, StoreType};
pub use filters::{FilterError, ListQuery, Page, Pagination, QueryFilter, QueryParams};
pub use models::*;
pub use services::*;
