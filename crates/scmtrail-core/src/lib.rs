//! Core types, configuration, and error handling for scmtrail.
//!
//! This crate provides the shared foundation used by the other scmtrail crates:
//! - [`ScmTrailError`]: unified error type using `thiserror`
//! - [`ScmTrailConfig`]: configuration loaded from `.scmtrail.toml`
//! - Shared types: [`Component`], [`ComponentKey`], [`ComponentType`],
//!   [`ComponentStatus`], [`ReportRef`], [`Changeset`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{AnalysisConfig, ReportConfig, ScmTrailConfig, StoreConfig};
pub use error::ScmTrailError;
pub use types::{
    Changeset, Component, ComponentKey, ComponentStatus, ComponentType, OutputFormat, ReportRef,
};

/// A convenience `Result` type for scmtrail operations.
pub type Result<T> = std::result::Result<T, ScmTrailError>;
