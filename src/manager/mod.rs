//! Plugin installation and discovery over a plugins directory.
//!
//! [`PluginManager`] owns one plugins root, delegates archive handling to
//! [`PluginPackage`] and plugin code loading to a [`ModuleLoader`], and
//! keeps an explicit registry of the plugins found by the last discovery
//! pass. The registry is rebuilt from the filesystem on every pass; there
//! is no hidden global state.

mod loader;

use std::fs;
use std::path::{Path, PathBuf};

pub use loader::{ModuleLoader, PluginConstructor, StaticLoader};

pub use crate::plugin::RegisteredPlugin;

use crate::config::DEFAULT_CATEGORY;
use crate::error::{Error, Result};
use crate::metadata::Metadata;
use crate::package::PluginPackage;

/// One plugin directory that failed during a discovery pass.
#[derive(Debug)]
pub struct DiscoveryFailure {
    pub directory: PathBuf,
    pub error: Error,
}

/// Outcome of one discovery pass.
///
/// Per-plugin failures never abort the pass; they are collected here so
/// the caller can report them while the healthy plugins stay usable.
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    pub loaded: usize,
    pub failures: Vec<DiscoveryFailure>,
}

/// Manages the plugins installed under one plugins root.
pub struct PluginManager {
    plugins_directory: PathBuf,
    package: PluginPackage,
    use_category: bool,
    loader: Box<dyn ModuleLoader>,
    registry: Vec<RegisteredPlugin>,
}

impl PluginManager {
    /// Manager over an existing plugins root with a flat layout.
    pub fn new(plugins_directory: impl Into<PathBuf>, loader: Box<dyn ModuleLoader>) -> Result<Self> {
        let plugins_directory = plugins_directory.into();
        if !plugins_directory.is_dir() {
            return Err(Error::Path {
                path: plugins_directory,
                reason: "plugins directory does not exist".to_string(),
            });
        }

        Ok(Self {
            plugins_directory,
            package: PluginPackage::new(),
            use_category: false,
            loader,
            registry: Vec::new(),
        })
    }

    /// Switch between the flat layout (`root/name`) and the category
    /// layout (`root/category/name`).
    pub fn with_categories(mut self, enabled: bool) -> Self {
        self.use_category = enabled;
        self
    }

    /// Use a custom package extension instead of `.psp`.
    pub fn with_extension(mut self, extension: &str) -> Result<Self> {
        self.package = PluginPackage::with_extension(extension)?;
        Ok(self)
    }

    pub fn plugins_directory(&self) -> &Path {
        &self.plugins_directory
    }

    pub fn uses_categories(&self) -> bool {
        self.use_category
    }

    /// Read a plugin package's manifest without installing it.
    pub fn info(&self, archive_path: &Path) -> Result<Metadata> {
        self.package.info(archive_path)
    }

    /// Install a plugin package into the plugins root.
    pub fn install(&self, archive_path: &Path) -> Result<PathBuf> {
        self.package
            .install(archive_path, &self.plugins_directory, self.use_category)
    }

    /// Remove an installed plugin.
    ///
    /// With the category layout the plugin is looked up under `category`
    /// (the `"default"` category when `None`); a category given under the
    /// flat layout is a configuration error.
    pub fn uninstall(&self, plugin_name: &str, category: Option<&str>) -> Result<PathBuf> {
        let category = self.effective_category(category)?;
        self.package
            .uninstall(plugin_name, &self.plugins_directory, category)
    }

    /// Categories currently present under the plugins root.
    ///
    /// Only meaningful with the category layout; fails with
    /// [`Error::Configuration`] otherwise.
    pub fn categories(&self) -> Result<Vec<String>> {
        if !self.use_category {
            return Err(Error::Configuration(
                "categories require the category layout".to_string(),
            ));
        }

        let mut categories = Vec::new();
        for entry in fs::read_dir(&self.plugins_directory)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            if let Ok(name) = entry.file_name().into_string() {
                if !name.starts_with('.') {
                    categories.push(name);
                }
            }
        }
        categories.sort();
        Ok(categories)
    }

    /// Manifests of all installed plugins, without loading any code.
    ///
    /// Directories whose manifest fails to load are skipped with a
    /// warning; listing stays usable next to a broken installation.
    pub fn installed(&self) -> Result<Vec<Metadata>> {
        let mut manifests = Vec::new();
        for directory in self.plugin_directories(None)? {
            match Metadata::load(&directory) {
                Ok(metadata) => manifests.push(metadata),
                Err(e) => log::warn!("skipping {:?}: {}", directory, e),
            }
        }
        manifests.sort_by(|a, b| a.plugin_name().cmp(&b.plugin_name()));
        Ok(manifests)
    }

    /// Scan the plugins root, load the matching plugins and rebuild the
    /// registry.
    ///
    /// `category` restricts the scan to one category directory (category
    /// layout only); `tag` keeps only plugins whose manifest carries the
    /// tag. The previous registry is discarded even if nothing matches.
    /// Per-plugin failures are collected in the report, never propagated.
    pub fn discover(&mut self, category: Option<&str>, tag: Option<&str>) -> Result<DiscoveryReport> {
        let directories = self.plugin_directories(category)?;

        self.registry.clear();
        let mut report = DiscoveryReport::default();

        for directory in directories {
            // The directory may vanish between scan and load; that is not
            // a failure of the pass.
            if !directory.is_dir() {
                continue;
            }

            let metadata = match Metadata::load(&directory) {
                Ok(metadata) => metadata,
                Err(error) => {
                    report.failures.push(DiscoveryFailure { directory, error });
                    continue;
                }
            };

            if let Some(tag) = tag {
                if !metadata.has_tag(tag) {
                    continue;
                }
            }

            match self.loader.load(metadata.name(), &directory) {
                Ok(plugins) => {
                    log::debug!(
                        "discovered {} ({} implementation(s))",
                        metadata.plugin_name(),
                        plugins.len()
                    );
                    for plugin in plugins {
                        self.registry.push(RegisteredPlugin {
                            metadata: metadata.clone(),
                            plugin,
                        });
                        report.loaded += 1;
                    }
                }
                Err(error) => {
                    report.failures.push(DiscoveryFailure { directory, error });
                }
            }
        }

        Ok(report)
    }

    /// Plugins registered by the last discovery pass.
    pub fn plugins(&self) -> &[RegisteredPlugin] {
        &self.registry
    }

    /// Mutable access to the registered plugins, e.g. for driving their
    /// lifecycle hooks.
    pub fn plugins_mut(&mut self) -> &mut [RegisteredPlugin] {
        &mut self.registry
    }

    /// Registered plugins filtered by manifest category and tag.
    ///
    /// Both filters match against the manifest, so the `"default"`
    /// category sentinel is a valid filter value.
    pub fn get_plugin_classes(
        &self,
        category: Option<&str>,
        tag: Option<&str>,
    ) -> Vec<&RegisteredPlugin> {
        self.registry
            .iter()
            .filter(|r| category.map_or(true, |c| r.metadata.category() == c))
            .filter(|r| tag.map_or(true, |t| r.metadata.has_tag(t)))
            .collect()
    }

    /// Registered plugins without any filtering.
    pub fn get_all_plugin_classes(&self) -> Vec<&RegisteredPlugin> {
        self.get_plugin_classes(None, None)
    }

    /// Resolve a caller-supplied category against the configured layout.
    fn effective_category<'a>(&self, category: Option<&'a str>) -> Result<Option<&'a str>> {
        match (self.use_category, category) {
            (true, Some(category)) => Ok(Some(category)),
            (true, None) => Ok(Some(DEFAULT_CATEGORY)),
            (false, None) => Ok(None),
            (false, Some(_)) => Err(Error::Configuration(
                "a category filter requires the category layout".to_string(),
            )),
        }
    }

    /// Installed plugin directories to consider, honoring the layout.
    ///
    /// Without a category filter, the category layout scans every
    /// category. An explicit filter names one category directory; absence
    /// of that directory simply yields nothing.
    fn plugin_directories(&self, category: Option<&str>) -> Result<Vec<PathBuf>> {
        if !self.use_category {
            if category.is_some() {
                return Err(Error::Configuration(
                    "a category filter requires the category layout".to_string(),
                ));
            }
            let mut directories = subdirectories(&self.plugins_directory)?;
            directories.sort();
            return Ok(directories);
        }

        let parents = match category {
            Some(c) => vec![self.plugins_directory.join(c)],
            None => self.category_directories()?,
        };

        let mut directories = Vec::new();
        for parent in parents {
            directories.extend(subdirectories(&parent)?);
        }
        directories.sort();
        Ok(directories)
    }

    fn category_directories(&self) -> Result<Vec<PathBuf>> {
        Ok(self
            .categories()?
            .into_iter()
            .map(|c| self.plugins_directory.join(c))
            .collect())
    }
}

/// Non-hidden subdirectories of `parent`; an absent parent yields nothing.
fn subdirectories(parent: &Path) -> Result<Vec<PathBuf>> {
    let mut result = Vec::new();
    if !parent.is_dir() {
        return Ok(result);
    }
    for entry in fs::read_dir(parent)? {
        let entry = entry?;
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if entry.path().is_dir() && !hidden {
            result.push(entry.path());
        }
    }
    Ok(result)
}
