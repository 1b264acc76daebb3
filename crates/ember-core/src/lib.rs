//! Ember Core - Foundational types for the Ember particle engine
//!
//! This crate provides the types that all other Ember crates depend on:
//! - `EmitterId` - Stable emitter identifiers
//! - `Vec3`, `Color` - Spatial and color types
//! - Error types and Result alias

mod error;
mod id;
mod types;

pub use error::{EmberError, Result};
pub use id::EmitterId;
pub use types::{Color, Vec3};
