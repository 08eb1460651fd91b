//! Plugin code loading.
//!
//! Discovery finds installed plugin directories; turning a directory into
//! running plugin implementations is delegated to a [`ModuleLoader`]. The
//! loader is an injected collaborator so embedding applications can bring
//! their own loading scheme, and tests can substitute fakes.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::plugin::Plugin;

/// Maps an installed plugin directory to its plugin implementations.
pub trait ModuleLoader {
    /// Produce the plugin implementations for the installed plugin
    /// `name`, whose files live in `directory`.
    ///
    /// A failure here is reported per plugin and never aborts a whole
    /// discovery pass.
    fn load(&self, name: &str, directory: &Path) -> Result<Vec<Box<dyn Plugin>>>;
}

/// Constructor function for one plugin implementation.
pub type PluginConstructor = fn() -> Box<dyn Plugin>;

/// Loader backed by a compile-time registration table.
///
/// Plugins are linked into the application and registered under the
/// manifest name of the installed directory they belong to. Directories
/// without a registration fail with [`Error::ModuleLoad`].
#[derive(Default)]
pub struct StaticLoader {
    constructors: HashMap<String, Vec<PluginConstructor>>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor for the plugin installed under `name`.
    /// Multiple registrations for one name accumulate.
    pub fn register(&mut self, name: &str, constructor: PluginConstructor) -> &mut Self {
        self.constructors
            .entry(name.to_string())
            .or_default()
            .push(constructor);
        self
    }

    /// Names with at least one registered constructor.
    pub fn registered_names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }
}

impl ModuleLoader for StaticLoader {
    fn load(&self, name: &str, _directory: &Path) -> Result<Vec<Box<dyn Plugin>>> {
        match self.constructors.get(name) {
            Some(constructors) => Ok(constructors.iter().map(|make| make()).collect()),
            None => Err(Error::ModuleLoad {
                plugin: name.to_string(),
                message: "no plugin implementation registered under this name".to_string(),
            }),
        }
    }
}
