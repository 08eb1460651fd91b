//! Plugin capability contract.
//!
//! Every concrete plugin implements exactly the three lifecycle hooks.
//! The core never invokes them; lifecycle orchestration belongs to the
//! embedding application.

use std::fmt;

use crate::error::Result;
use crate::metadata::Metadata;

/// Capability interface all plugin implementations must provide.
pub trait Plugin {
    /// One-time setup before first use.
    fn init(&mut self) -> Result<()>;

    /// The plugin's main entry point.
    fn run(&mut self) -> Result<()>;

    /// Teardown; called once when the plugin is retired.
    fn shutdown(&mut self) -> Result<()>;

    /// Short implementation name, used in listings and logs.
    fn name(&self) -> &str;
}

impl fmt::Debug for dyn Plugin + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin").field("name", &self.name()).finish()
    }
}

/// A loaded plugin implementation together with the manifest of the
/// installed directory it came from.
pub struct RegisteredPlugin {
    pub metadata: Metadata,
    pub plugin: Box<dyn Plugin>,
}

impl fmt::Debug for RegisteredPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredPlugin")
            .field("name", &self.plugin.name())
            .field("plugin_name", &self.metadata.plugin_name())
            .field("category", &self.metadata.category())
            .finish()
    }
}
