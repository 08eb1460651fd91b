//! Plugin manifest model.
//!
//! A [`Metadata`] instance is the typed, validated form of a plugin's
//! `metadata.yml`. Loading is atomic: any validation failure yields an
//! error carrying every offending field and no usable instance.

pub mod validate;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_CATEGORY, METADATA_FILENAME};
use crate::error::{Error, Result, ValidationErrors};
use crate::semver::SemVer;

/// Validated plugin manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    uuid: String,
    name: String,
    description: String,
    version: SemVer,
    url: String,
    author: Option<String>,
    category: Option<String>,
    tags: Vec<String>,
}

/// Raw manifest document as found on disk, before validation.
///
/// Unknown keys are tolerated so manifests may carry extra information
/// (e.g. a license) without failing the schema.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RawMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<String>,
}

impl Metadata {
    /// Path of the manifest file inside a plugin directory.
    pub fn file_path(plugin_directory: &Path) -> PathBuf {
        plugin_directory.join(METADATA_FILENAME)
    }

    /// Load and validate the manifest from a plugin directory.
    pub fn load(plugin_directory: &Path) -> Result<Self> {
        let filename = Self::file_path(plugin_directory);
        if !filename.exists() {
            return Err(Error::NotFound(filename));
        }

        log::debug!("loading manifest from {:?}", filename);
        let content = fs::read_to_string(&filename)?;
        Self::from_str(&content)
    }

    /// Parse and validate a manifest from an in-memory buffer, e.g. one
    /// extracted from a plugin package.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let raw: RawMetadata = serde_yaml::from_slice(bytes)?;
        Self::from_raw(raw)
    }

    /// Parse and validate a manifest from a YAML string.
    pub fn from_str(content: &str) -> Result<Self> {
        let raw: RawMetadata = serde_yaml::from_str(content)?;
        Self::from_raw(raw)
    }

    /// Construct and validate a manifest from an explicit field mapping.
    pub fn from_map(fields: &BTreeMap<String, String>) -> Result<Self> {
        let get = |key: &str| fields.get(key).cloned();
        let raw = RawMetadata {
            uuid: get("uuid"),
            name: get("name"),
            description: get("description"),
            version: get("version"),
            url: get("url"),
            author: get("author"),
            category: get("category"),
            tags: get("tags"),
        };
        Self::from_raw(raw)
    }

    /// Run the full validation pass over a raw document.
    ///
    /// Every offending field is collected; a manifest that fails here
    /// never produces a partially populated instance.
    fn from_raw(raw: RawMetadata) -> Result<Self> {
        let mut errors = ValidationErrors::new();

        let required = |errors: &mut ValidationErrors, field: &str, value: &Option<String>| {
            match value.as_deref().map(str::trim) {
                Some(v) if !v.is_empty() => Some(v.to_string()),
                _ => {
                    errors.push(field, "required field is missing or empty");
                    None
                }
            }
        };

        let uuid = required(&mut errors, "uuid", &raw.uuid);
        if let Some(value) = &uuid {
            if !validate::is_hex(value) {
                errors.push("uuid", "must be a hex string");
            }
        }

        let name = required(&mut errors, "name", &raw.name);
        if let Some(value) = &name {
            if !validate::is_alphanumeric(value) {
                errors.push("name", "must be alphanumeric");
            }
        }

        let description = required(&mut errors, "description", &raw.description);

        let mut version = None;
        match required(&mut errors, "version", &raw.version) {
            Some(value) => match SemVer::parse(&value) {
                Ok(v) => version = Some(v),
                Err(e) => errors.push("version", e.to_string()),
            },
            None => {}
        }

        let url = required(&mut errors, "url", &raw.url);
        if let Some(value) = &url {
            if !validate::is_url(value) {
                errors.push("url", "must be an http(s) URL");
            }
        }

        errors.into_result()?;

        let author = raw
            .author
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let category = raw
            .category
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Self {
            // All unwraps guarded by into_result above.
            uuid: uuid.unwrap(),
            name: name.unwrap(),
            description: description.unwrap(),
            version: version.unwrap(),
            url: url.unwrap(),
            author,
            category,
            tags: validate::parse_tags(raw.tags.as_deref()),
        })
    }

    /// Serialize the manifest back to `metadata.yml` in the given
    /// directory. Optional fields absent at load time stay absent.
    pub fn save(&self, plugin_directory: &Path) -> Result<PathBuf> {
        if !plugin_directory.is_dir() {
            return Err(Error::Path {
                path: plugin_directory.to_path_buf(),
                reason: "not an existing directory".to_string(),
            });
        }

        let filename = Self::file_path(plugin_directory);
        log::debug!("saving manifest to {:?}", filename);
        let content = serde_yaml::to_string(&self.to_raw())?;
        fs::write(&filename, content)?;
        Ok(filename)
    }

    fn to_raw(&self) -> RawMetadata {
        RawMetadata {
            uuid: Some(self.uuid.clone()),
            name: Some(self.name.clone()),
            description: Some(self.description.clone()),
            version: Some(self.version.to_string()),
            url: Some(self.url.clone()),
            author: self.author.clone(),
            category: self.category.clone(),
            tags: if self.tags.is_empty() {
                None
            } else {
                Some(self.tags.join(", "))
            },
        }
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn version(&self) -> &SemVer {
        &self.version
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    /// Declared category, or the `"default"` sentinel when absent.
    pub fn category(&self) -> &str {
        self.category.as_deref().unwrap_or(DEFAULT_CATEGORY)
    }

    /// Whether the manifest declares its own category.
    pub fn has_explicit_category(&self) -> bool {
        self.category.is_some()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Case-insensitive tag membership test.
    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = tag.trim().to_lowercase();
        self.tags.iter().any(|t| *t == tag)
    }

    /// Derived plugin identity: `{name}-{version}`. Computed, never stored.
    pub fn plugin_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    /// Archive file name for this plugin: `{name-lowercased}-{version}{ext}`.
    pub fn archive_file_name(&self, extension: &str) -> String {
        format!("{}-{}{}", self.name.to_lowercase(), self.version, extension)
    }

    // Field setters re-validate on every assignment so programmatic
    // construction cannot bypass the schema.

    pub fn set_uuid(&mut self, uuid: &str) -> Result<()> {
        let uuid = uuid.trim();
        if !validate::is_hex(uuid) {
            return Err(single_error("uuid", "must be a hex string"));
        }
        self.uuid = uuid.to_string();
        Ok(())
    }

    pub fn set_name(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if !validate::is_alphanumeric(name) {
            return Err(single_error("name", "must be alphanumeric"));
        }
        self.name = name.to_string();
        Ok(())
    }

    pub fn set_description(&mut self, description: &str) -> Result<()> {
        let description = description.trim();
        if description.is_empty() {
            return Err(single_error("description", "required field is missing or empty"));
        }
        self.description = description.to_string();
        Ok(())
    }

    pub fn set_version(&mut self, version: &str) -> Result<()> {
        self.version = SemVer::parse(version)?;
        Ok(())
    }

    pub fn set_url(&mut self, url: &str) -> Result<()> {
        let url = url.trim();
        if !validate::is_url(url) {
            return Err(single_error("url", "must be an http(s) URL"));
        }
        self.url = url.to_string();
        Ok(())
    }

    pub fn set_author(&mut self, author: Option<&str>) {
        self.author = author
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
    }

    pub fn set_category(&mut self, category: Option<&str>) {
        self.category = category
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
    }

    pub fn set_tags(&mut self, tags: Option<&str>) {
        self.tags = validate::parse_tags(tags);
    }
}

fn single_error(field: &str, message: &str) -> Error {
    let mut errors = ValidationErrors::new();
    errors.push(field, message);
    Error::Validation(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn valid_map() -> BTreeMap<String, String> {
        [
            ("uuid", "deadbeef"),
            ("name", "MyPlugin"),
            ("description", "This is my description."),
            ("version", "1.2.3"),
            ("author", "Foo Bar <foo.bar@example.com>"),
            ("url", "https://www.example.com"),
            ("category", "tools"),
            ("tags", "bla, blup"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    const VALID_YAML: &str = "---
uuid: deadbeef
name: MyPlugin
description: This is my description.
license: MIT
version: 1.2.3
author: Foo Bar <foo.bar@example.com>
url: https://www.example.com
category: tools
tags: bla, blup
";

    #[test]
    fn test_from_str_valid_manifest() {
        let md = Metadata::from_str(VALID_YAML).unwrap();
        assert_eq!(md.uuid(), "deadbeef");
        assert_eq!(md.name(), "MyPlugin");
        assert_eq!(md.version().to_string(), "1.2.3");
        assert_eq!(md.category(), "tools");
        assert_eq!(md.tags(), ["bla", "blup"]);
        assert_eq!(md.plugin_name(), "MyPlugin-1.2.3");
        assert_eq!(md.archive_file_name(".psp"), "myplugin-1.2.3.psp");
    }

    #[test]
    fn test_unknown_keys_are_tolerated() {
        // VALID_YAML carries a license key not in the schema.
        assert!(Metadata::from_str(VALID_YAML).is_ok());
    }

    #[test]
    fn test_missing_fields_are_all_reported() {
        match Metadata::from_str("---\nname: MyPlugin\n") {
            Err(Error::Validation(errors)) => {
                for field in ["uuid", "description", "version", "url"] {
                    assert!(errors.field(field).is_some(), "missing error for {}", field);
                }
                assert!(errors.field("name").is_none());
            }
            other => panic!("expected Validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_values_are_all_reported() {
        let mut map = valid_map();
        map.insert("uuid".to_string(), "not-hex!".to_string());
        map.insert("name".to_string(), "my plugin".to_string());
        map.insert("version".to_string(), "1.x.3bla".to_string());
        map.insert("url".to_string(), "example.com".to_string());

        match Metadata::from_map(&map) {
            Err(Error::Validation(errors)) => {
                assert_eq!(errors.iter().count(), 4);
            }
            other => panic!("expected Validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_category_defaults_to_sentinel() {
        let mut map = valid_map();
        map.remove("category");
        let md = Metadata::from_map(&map).unwrap();
        assert_eq!(md.category(), "default");
        assert!(!md.has_explicit_category());

        map.insert("category".to_string(), "  ".to_string());
        let md = Metadata::from_map(&map).unwrap();
        assert_eq!(md.category(), "default");
    }

    #[test]
    fn test_tags_default_to_empty() {
        let mut map = valid_map();
        map.remove("tags");
        let md = Metadata::from_map(&map).unwrap();
        assert!(md.tags().is_empty());
    }

    #[test]
    fn test_has_tag_is_case_insensitive() {
        let md = Metadata::from_map(&valid_map()).unwrap();
        assert!(md.has_tag("bla"));
        assert!(md.has_tag("BLUP"));
        assert!(md.has_tag(" blup "));
        assert!(!md.has_tag("xyz"));
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        match Metadata::load(temp_dir.path()) {
            Err(Error::NotFound(path)) => {
                assert!(path.ends_with(METADATA_FILENAME));
            }
            other => panic!("expected NotFound error, got {:?}", other),
        }
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let md = Metadata::from_str(VALID_YAML).unwrap();
        md.save(temp_dir.path()).unwrap();

        let loaded = Metadata::load(temp_dir.path()).unwrap();
        assert_eq!(loaded, md);
    }

    #[test]
    fn test_save_keeps_absent_optionals_absent() {
        let temp_dir = TempDir::new().unwrap();
        let mut map = valid_map();
        map.remove("author");
        map.remove("category");
        map.remove("tags");
        let md = Metadata::from_map(&map).unwrap();
        md.save(temp_dir.path()).unwrap();

        let content = fs::read_to_string(Metadata::file_path(temp_dir.path())).unwrap();
        assert!(!content.contains("author"));
        assert!(!content.contains("category"));
        assert!(!content.contains("tags"));
    }

    #[test]
    fn test_save_to_missing_directory_is_path_error() {
        let md = Metadata::from_str(VALID_YAML).unwrap();
        assert!(matches!(
            md.save(Path::new("directory_does_not_exist")),
            Err(Error::Path { .. })
        ));
    }

    #[test]
    fn test_setters_revalidate() {
        let mut md = Metadata::from_str(VALID_YAML).unwrap();

        assert!(md.set_uuid("cafebabe").is_ok());
        assert!(md.set_uuid("not hex").is_err());
        assert_eq!(md.uuid(), "cafebabe");

        assert!(md.set_name("Other2").is_ok());
        assert!(md.set_name("with-dash").is_err());

        assert!(md.set_version("2.0.0-rc1").is_ok());
        assert!(matches!(md.set_version("1.2.3.4"), Err(Error::Format(_))));
        assert_eq!(md.version().to_string(), "2.0.0-rc1");

        assert!(md.set_url("https://example.org").is_ok());
        assert!(md.set_url("nope").is_err());

        md.set_tags(Some("one, TWO ,Three"));
        assert_eq!(md.tags(), ["one", "two", "three"]);
        md.set_tags(None);
        assert!(md.tags().is_empty());

        md.set_category(None);
        assert_eq!(md.category(), "default");
    }
}
