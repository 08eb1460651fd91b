//! Plugin package lifecycle.
//!
//! A plugin package is a single distributable file (gzip-compressed tar,
//! default extension `.psp`) containing `metadata.yml` at its root plus
//! the plugin's source tree. Every operation here is fallible and atomic:
//! archives and installations are staged in temporary locations and
//! renamed into place, so no partial state is visible after a failure.


use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Archive, Builder};
use walkdir::WalkDir;

use crate::config::{
    DEFAULT_PACKAGE_EXT, METADATA_FILENAME, SKIP_DIR_NAMES, SKIP_FILE_EXTENSIONS,
};
use crate::error::{Error, Result, ValidationErrors};
use crate::metadata::Metadata;

/// Archive-level operations over plugin packages.
///
/// Only the package extension is bound here; every operation takes the
/// paths it works on explicitly.
#[derive(Debug, Clone)]
pub struct PluginPackage {
    extension: String,
}

impl Default for PluginPackage {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginPackage {
    /// Package operations with the default `.psp` extension.
    pub fn new() -> Self {
        Self {
            extension: DEFAULT_PACKAGE_EXT.to_string(),
        }
    }

    /// Package operations with a custom extension (must start with `.`).
    pub fn with_extension(extension: &str) -> Result<Self> {
        if !extension.starts_with('.') || extension.len() < 2 {
            return Err(Error::Configuration(format!(
                "invalid package extension '{}': must start with '.'",
                extension
            )));
        }
        Ok(Self {
            extension: extension.to_string(),
        })
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Pack a raw plugin directory into a plugin package inside
    /// `target_directory`, returning the archive path.
    ///
    /// The archive name is derived from the manifest
    /// (`{name-lowercased}-{version}{ext}`); packing never overwrites an
    /// existing archive. Compiled artifacts and cache directories are
    /// excluded.
    pub fn pack(&self, source_directory: &Path, target_directory: &Path) -> Result<PathBuf> {
        ensure_directory(source_directory)?;

        // The manifest must be present and valid before anything is written.
        let metadata = Metadata::load(source_directory)?;

        ensure_directory(target_directory)?;

        let archive_path = target_directory.join(metadata.archive_file_name(&self.extension));
        if archive_path.exists() {
            return Err(Error::AlreadyExists(archive_path));
        }

        log::debug!("packing {:?} into {:?}", source_directory, archive_path);

        let staging = tempfile::Builder::new()
            .prefix(".pack-")
            .tempfile_in(target_directory)?;
        let encoder = GzEncoder::new(staging.as_file(), Compression::default());
        let mut builder = Builder::new(encoder);

        for entry in WalkDir::new(source_directory)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| !is_skipped_dir(e.path()))
        {
            let entry = entry.map_err(|e| Error::Path {
                path: source_directory.to_path_buf(),
                reason: e.to_string(),
            })?;
            let path = entry.path();
            let relative = path
                .strip_prefix(source_directory)
                .expect("walkdir yields paths under its root");

            if entry.file_type().is_dir() {
                builder.append_dir(relative, path)?;
            } else if !is_skipped_file(path) {
                log::debug!("adding {:?} to plugin package", relative);
                builder.append_path_with_name(path, relative)?;
            }
        }

        let encoder = builder.into_inner()?;
        encoder.finish()?;

        staging
            .persist_noclobber(&archive_path)
            .map_err(|_| Error::AlreadyExists(archive_path.clone()))?;

        Ok(archive_path)
    }

    /// Read the manifest of a plugin package without extracting it.
    ///
    /// An unreadable container fails with [`Error::CorruptArchive`]; a
    /// readable container without a manifest entry fails with
    /// [`Error::NotFound`].
    pub fn info(&self, archive_path: &Path) -> Result<Metadata> {
        if !archive_path.is_file() {
            return Err(Error::Path {
                path: archive_path.to_path_buf(),
                reason: "plugin package does not exist".to_string(),
            });
        }

        log::debug!("reading manifest from {:?}", archive_path);
        let file = fs::File::open(archive_path)?;
        let mut archive = Archive::new(GzDecoder::new(file));

        let corrupt = || Error::CorruptArchive(archive_path.to_path_buf());
        for entry in archive.entries().map_err(|_| corrupt())? {
            let mut entry = entry.map_err(|_| corrupt())?;
            let is_manifest = entry
                .path()
                .map(|p| p == Path::new(METADATA_FILENAME))
                .unwrap_or(false);
            if is_manifest {
                let mut bytes = Vec::new();
                entry.read_to_end(&mut bytes).map_err(|_| corrupt())?;
                return Metadata::from_slice(&bytes);
            }
        }

        Err(Error::NotFound(PathBuf::from(METADATA_FILENAME)))
    }

    /// Install a plugin package into a plugins root, returning the
    /// installed directory.
    ///
    /// The destination is `plugins_root/name`, or
    /// `plugins_root/category/name` with `category_layout`. Install never
    /// merges into an existing installation.
    pub fn install(
        &self,
        archive_path: &Path,
        plugins_root: &Path,
        category_layout: bool,
    ) -> Result<PathBuf> {
        let found = archive_extension(archive_path);
        if found != self.extension {
            return Err(Error::InvalidExtension {
                found,
                required: self.extension.clone(),
            });
        }

        ensure_directory(plugins_root)?;

        let metadata = self.info(archive_path)?;
        let parent = if category_layout {
            plugins_root.join(metadata.category())
        } else {
            plugins_root.to_path_buf()
        };
        let destination = parent.join(metadata.name());
        if destination.exists() {
            return Err(Error::AlreadyInstalled {
                name: metadata.name().to_string(),
                directory: parent,
            });
        }

        log::debug!("installing plugin to {:?}", destination);

        // Extract into a staging directory first; the rename below is the
        // only change visible under the plugins root.
        let staging = tempfile::Builder::new()
            .prefix(".install-")
            .tempdir_in(plugins_root)?;
        let file = fs::File::open(archive_path)?;
        let mut archive = Archive::new(GzDecoder::new(file));
        archive
            .unpack(staging.path())
            .map_err(|_| Error::CorruptArchive(archive_path.to_path_buf()))?;

        fs::create_dir_all(&parent)?;
        fs::rename(staging.path(), &destination)?;
        // The staged directory was renamed away; drop cleanup is a no-op.
        let _ = staging.close();

        Ok(destination)
    }

    /// Remove an installed plugin directory.
    ///
    /// The installed manifest is re-read before removal so an arbitrary
    /// directory that was never produced by `install` is not deleted.
    /// Destructive and non-reversible.
    pub fn uninstall(
        &self,
        plugin_name: &str,
        plugins_root: &Path,
        category: Option<&str>,
    ) -> Result<PathBuf> {
        let parent = match category {
            Some(category) => plugins_root.join(category),
            None => plugins_root.to_path_buf(),
        };
        let plugin_directory = parent.join(plugin_name);
        if !plugin_directory.is_dir() {
            return Err(Error::NotInstalled {
                name: plugin_name.to_string(),
                directory: parent,
            });
        }

        let metadata = Metadata::load(&plugin_directory)?;
        if metadata.name() != plugin_name {
            let mut errors = ValidationErrors::new();
            errors.push(
                "name",
                format!(
                    "manifest name '{}' does not match installed directory '{}'",
                    metadata.name(),
                    plugin_name
                ),
            );
            return Err(Error::Validation(errors));
        }

        log::debug!("removing plugin directory {:?}", plugin_directory);
        fs::remove_dir_all(&plugin_directory)?;

        Ok(plugin_directory)
    }
}

/// `.ext` of a path, empty string when absent.
fn archive_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default()
}

fn ensure_directory(path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(Error::Path {
            path: path.to_path_buf(),
            reason: "not an existing directory".to_string(),
        })
    }
}

fn is_skipped_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| SKIP_DIR_NAMES.contains(&n))
        .unwrap_or(false)
}

fn is_skipped_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SKIP_FILE_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}
