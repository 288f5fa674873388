//! Model builder for skipnav.
//!
//! This crate provides:
//! - [`ModelBuilder`] - The fluent configuration surface and its lifecycle
//! - [`BuilderConfig`] - Convention naming and discovery settings
//! - [`ConfigurationLog`] - Recorded calls and their effective normalization
//! - [`discovery`] - Reachability, key and many-to-many conventions
//! - [`synthesizer`] - Join entity types for matched navigation pairs
//! - [`foreign_key`] - The join foreign key convention
//! - [`matcher`] - Pair classification, conflicts and ambiguity

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod apply;
pub mod builder;
pub mod config;
pub mod discovery;
mod finalize;
pub mod foreign_key;
pub mod log;
pub mod matcher;
pub mod shared;
pub mod synthesizer;

pub use builder::{
    BuildState, CollectionBuilder, EntityTypeBuilder, ManyToManyBuilder, ModelBuilder,
    NavigationBuilder, ReferenceBuilder,
};
pub use config::BuilderConfig;
pub use discovery::DiscoveryReport;
pub use finalize::validate;
pub use log::{ConfigurationCall, ConfigurationLog, EntityRef, JoinEntity, JoinForeignKey};
pub use synthesizer::ManyToMany;
