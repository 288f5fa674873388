//! Skipnav - many-to-many relationship discovery for object-relational
//! metadata models
//!
//! This crate re-exports all layers of the skipnav system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: skipnav_builder    — Configuration surface, conventions, finalization
//! Layer 1: skipnav_registry   — Entity types, keys, foreign keys, navigations
//! Layer 0: skipnav_foundation — Handles, shapes, errors
//! ```

pub use skipnav_builder as builder;
pub use skipnav_foundation as foundation;
pub use skipnav_registry as registry;
