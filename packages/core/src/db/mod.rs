//! Store Layer
//!
//! The client never talks to a database directly. It works against the
//! [`RegistryStore`] collaborator interface:
//!
//! - [`ResourceStore`] - get / list / create / update / delete for one resource kind
//! - [`RegistryStore`] - every resource kind plus store metadata and the active user
//! - [`InMemoryStore`] - reference backend executing compiled list queries in memory
//!
//! SQL and REST backends live outside this crate and implement the same traits.

mod memory_store;
mod store;

pub use memory_store::{InMemoryStore, DEFAULT_NAME};
pub use store::{RegistryStore, ResourceStore, StoreConfig, StoreType};
