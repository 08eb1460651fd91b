//! Full plugin lifecycle: pack a source tree, install the package,
//! discover it and drive the loaded implementation.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use tempfile::TempDir;

use plugstack::{Plugin, PluginManager, PluginPackage, Result, StaticLoader};

static INIT_CALLS: AtomicUsize = AtomicUsize::new(0);
static RUN_CALLS: AtomicUsize = AtomicUsize::new(0);
static SHUTDOWN_CALLS: AtomicUsize = AtomicUsize::new(0);

struct Greeter;

impl Plugin for Greeter {
    fn init(&mut self) -> Result<()> {
        INIT_CALLS.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        RUN_CALLS.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        SHUTDOWN_CALLS.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "greeter"
    }
}

const MANIFEST: &str = "---
uuid: deadbeef
name: MyPlugin
description: This is my description.
version: 1.2.3
author: Foo Bar <foo.bar@example.com>
url: https://www.example.com
category: tools
tags: one, TWO , Three
";

fn write_plugin_source(dir: &Path) {
    fs::write(dir.join("metadata.yml"), MANIFEST).unwrap();
    fs::write(dir.join("plugin.py"), "print('hello')\n").unwrap();
}

#[test]
fn test_pack_install_discover_run_uninstall() {
    let source = TempDir::new().unwrap();
    let staging = TempDir::new().unwrap();
    let plugins_root = TempDir::new().unwrap();
    write_plugin_source(source.path());

    // Pack the source tree and check the package from the outside.
    let package = PluginPackage::new();
    let archive = package.pack(source.path(), staging.path()).unwrap();
    assert!(archive.ends_with("myplugin-1.2.3.psp"));

    let metadata = package.info(&archive).unwrap();
    assert_eq!(metadata.plugin_name(), "MyPlugin-1.2.3");
    assert_eq!(metadata.category(), "tools");
    assert_eq!(metadata.tags(), ["one", "two", "three"]);

    // Install into a category-laid-out plugins root.
    let mut loader = StaticLoader::new();
    loader.register("MyPlugin", || Box::new(Greeter));
    let mut manager = PluginManager::new(plugins_root.path(), Box::new(loader))
        .unwrap()
        .with_categories(true);

    let installed = manager.install(&archive).unwrap();
    assert_eq!(installed, plugins_root.path().join("tools").join("MyPlugin"));
    assert_eq!(manager.categories().unwrap(), ["tools"]);

    // Discover and filter the registry.
    let report = manager.discover(None, None).unwrap();
    assert_eq!(report.loaded, 1);
    assert!(report.failures.is_empty());

    let matches = manager.get_plugin_classes(Some("tools"), Some("two"));
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].metadata.name(), "MyPlugin");
    assert!(manager.get_plugin_classes(Some("tools"), Some("xyz")).is_empty());
    assert!(manager.get_plugin_classes(Some("other"), None).is_empty());

    // Drive the loaded implementation through its lifecycle.
    for registered in manager.plugins_mut() {
        registered.plugin.init().unwrap();
        registered.plugin.run().unwrap();
        registered.plugin.run().unwrap();
        registered.plugin.shutdown().unwrap();
    }
    assert_eq!(INIT_CALLS.load(Ordering::SeqCst), 1);
    assert_eq!(RUN_CALLS.load(Ordering::SeqCst), 2);
    assert_eq!(SHUTDOWN_CALLS.load(Ordering::SeqCst), 1);

    // Uninstall frees the name; the next pass finds nothing.
    manager.uninstall("MyPlugin", Some("tools")).unwrap();
    assert!(!installed.exists());
    let report = manager.discover(None, None).unwrap();
    assert_eq!(report.loaded, 0);
}
