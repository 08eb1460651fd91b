use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::*;

use plugstack::{config, Metadata, PluginManager, PluginPackage, StaticLoader};

#[derive(Parser)]
#[command(name = "plugstack")]
#[command(about = "Package, install and inspect plugins")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase output verbosity (show debug messages)
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    /// Suppress informational output
    #[arg(short = 'q', long = "quiet", global = true)]
    quiet: bool,

    /// Plugins directory (default: $PLUGSTACK_PLUGINS_DIR or ~/.plugstack/plugins)
    #[arg(long = "plugins-dir", global = true, value_name = "DIR")]
    plugins_dir: Option<PathBuf>,

    /// Lay plugins out by category (DIR/category/name instead of DIR/name)
    #[arg(short = 'C', long = "categories", global = true)]
    categories: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack a plugin source directory into a plugin package
    Pack {
        /// Plugin source directory containing metadata.yml
        source: PathBuf,

        /// Directory the package is written to (default: current directory)
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },

    /// Install a plugin package into the plugins directory
    Install {
        /// Plugin package file (.psp)
        archive: PathBuf,
    },

    /// Remove an installed plugin
    Uninstall {
        /// Manifest name of the installed plugin
        name: String,

        /// Category the plugin is installed under (category layout only)
        #[arg(short = 'c', long = "category")]
        category: Option<String>,
    },

    /// Show the manifest of a plugin package without installing it
    Info {
        /// Plugin package file (.psp)
        archive: PathBuf,

        /// Emit the manifest as JSON
        #[arg(long = "json")]
        json: bool,
    },

    /// List installed plugins
    List,

    /// List categories present in the plugins directory
    Categories,
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .format_target(false)
        .init();

    log::debug!("plugstack v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run_command(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_command(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Pack { source, output } => {
            let target = match output {
                Some(path) => path.clone(),
                None => std::env::current_dir()?,
            };
            let archive = PluginPackage::new()
                .pack(source, &target)
                .context("packing failed")?;
            println!("{} packed {}", "✓".green().bold(), archive.display());
            Ok(())
        }

        Commands::Install { archive } => {
            let manager = manager_for(cli)?;
            let installed = manager
                .install(archive)
                .with_context(|| format!("installing '{}' failed", archive.display()))?;
            println!("{} installed to {}", "✓".green().bold(), installed.display());
            Ok(())
        }

        Commands::Uninstall { name, category } => {
            let manager = manager_for(cli)?;
            let removed = manager
                .uninstall(name, category.as_deref())
                .with_context(|| format!("uninstalling '{}' failed", name))?;
            println!("{} removed {}", "✓".green().bold(), removed.display());
            Ok(())
        }

        Commands::Info { archive, json } => {
            let metadata = PluginPackage::new()
                .info(archive)
                .with_context(|| format!("reading '{}' failed", archive.display()))?;
            if *json {
                print_metadata_json(&metadata)?;
            } else {
                print_metadata(&metadata);
            }
            Ok(())
        }

        Commands::List => {
            let manager = manager_for(cli)?;
            let installed = manager.installed()?;
            if installed.is_empty() {
                println!("no plugins installed");
                return Ok(());
            }
            for metadata in &installed {
                println!(
                    "{} {} ({}){}",
                    metadata.name().bold(),
                    metadata.version(),
                    metadata.category(),
                    if metadata.tags().is_empty() {
                        String::new()
                    } else {
                        format!("  [{}]", metadata.tags().join(", "))
                    }
                );
            }
            Ok(())
        }

        Commands::Categories => {
            let manager = manager_for(cli)?;
            for category in manager.categories()? {
                println!("{}", category);
            }
            Ok(())
        }
    }
}

/// Resolve the plugins root and build a manager over it.
///
/// The root is created on first use so a fresh machine can install
/// without any setup step.
fn manager_for(cli: &Cli) -> anyhow::Result<PluginManager> {
    let root = match &cli.plugins_dir {
        Some(path) => path.clone(),
        None => config::default_plugins_dir()?,
    };
    fs::create_dir_all(&root)
        .with_context(|| format!("creating plugins directory '{}' failed", root.display()))?;

    // The CLI only manages files; no plugin code is ever loaded here.
    let manager = PluginManager::new(root, Box::new(StaticLoader::new()))?
        .with_categories(cli.categories);
    Ok(manager)
}

fn print_metadata(metadata: &Metadata) {
    let field = |name: &str, value: &str| {
        println!("{:<12} {}", format!("{}:", name).bold(), value);
    };
    field("name", metadata.name());
    field("version", &metadata.version().to_string());
    field("uuid", metadata.uuid());
    field("description", metadata.description());
    field("url", metadata.url());
    if let Some(author) = metadata.author() {
        field("author", author);
    }
    field("category", metadata.category());
    if !metadata.tags().is_empty() {
        field("tags", &metadata.tags().join(", "));
    }
}

fn print_metadata_json(metadata: &Metadata) -> anyhow::Result<()> {
    let value = serde_json::json!({
        "uuid": metadata.uuid(),
        "name": metadata.name(),
        "description": metadata.description(),
        "version": metadata.version().to_string(),
        "url": metadata.url(),
        "author": metadata.author(),
        "category": metadata.category(),
        "tags": metadata.tags(),
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
