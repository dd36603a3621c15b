//! Data Models
//!
//! This module contains the managed entities of a stack registry:
//!
//! - [`Stack`] and [`Component`] - composite configurations and their parts
//! - [`Flavor`] - custom component implementations with a config schema
//! - [`Project`], [`User`], [`Team`], [`Role`], [`RoleAssignment`] - identity and access
//! - [`Pipeline`] and [`PipelineRun`] - registered pipelines and their executions
//!
//! Every entity implements [`Resource`], which is what the filter compiler,
//! the entity resolver and the stores work against.

mod flavor;
mod identity;
mod pipeline;
mod resource;
mod stack;

pub use flavor::{Flavor, FlavorRequest, FlavorUpdate};
pub use identity::{
    Permission, Project, ProjectRequest, ProjectUpdate, Role, RoleAssignment,
    RoleAssignmentRequest, RoleAssignmentUpdate, RoleRequest, RoleUpdate, Team, TeamRequest,
    TeamUpdate, User, UserRequest, UserUpdate,
};
pub use pipeline::{
    ExecutionStatus, Pipeline, PipelineRequest, PipelineRun, PipelineRunRequest,
    PipelineRunUpdate, PipelineUpdate,
};
pub use resource::{FieldValue, Resource, ResourceKind};
pub use stack::{
    component_refs, has_mandatory_components, Component, ComponentRef, ComponentRequest,
    ComponentType, ComponentUpdate, Stack, StackComponents, StackRequest, StackUpdate,
    MANDATORY_COMPONENT_TYPES,
};
