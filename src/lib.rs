//! Plugstack Library
//!
//! This library provides the core functionality for packing, installing
//! and discovering self-contained plugin packages.

pub mod config;
pub mod error;
pub mod manager;
pub mod metadata;
pub mod package;
pub mod plugin;
pub mod semver;

pub use error::{Error, Result};
pub use manager::{
    DiscoveryFailure, DiscoveryReport, ModuleLoader, PluginManager, RegisteredPlugin, StaticLoader,
};
pub use metadata::Metadata;
pub use package::PluginPackage;
pub use plugin::Plugin;
pub use semver::SemVer;
