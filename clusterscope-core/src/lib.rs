//! # clusterscope core — shared model, errors, configuration
//!
//! Everything the memory and security layers have in common:
//! - The cluster resource model (`Resource`, `ResourceId`, `StateUpdate`)
//! - The `ResourceFetcher` trait the substrate consumes resources through
//! - The error taxonomy (`ScopeError`)
//! - Typed configuration with TOML round-trip

pub mod config;
pub mod error;
pub mod fetcher;
pub mod types;

pub use config::ScopeConfig;
pub use error::{ScopeError, ScopeResult};
pub use fetcher::{ResourceFetcher, StaticFetcher};
pub use types::{OwnerReference, Resource, ResourceId, StateUpdate, UpdateType};
