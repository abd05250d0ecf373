//! `automove config`: inspect and bootstrap configuration.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use colored::Colorize;

use crate::config::{
    self, CONFIG_DIR, Config, ConfigSource, ENV_VARS, LoadedConfig, MANIFEST_FILE,
};
use crate::error::{Error, Result};
use crate::workspace;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the resolved configuration
    Show(ShowArgs),

    /// Describe the AUTOMOVE_* environment variables
    Env,

    /// Print the JSON schema for config.yaml
    Schema,

    /// Write a commented .automove/config.yaml
    Init(InitArgs),
}

#[derive(Args)]
struct ShowArgs {
    /// Resolve for this document instead of the current directory
    #[arg(long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// List each setting with the layer it came from
    #[arg(long, conflicts_with = "json")]
    effective: bool,

    /// Print as JSON instead of YAML
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct InitArgs {
    /// Directory that receives the .automove/ folder
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// Replace an existing manifest
    #[arg(long)]
    force: bool,
}

pub fn run(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommand::Show(show) => run_show(show),
        ConfigCommand::Env => {
            print_env();
            Ok(())
        }
        ConfigCommand::Schema => {
            println!("{}", config::json_schema());
            Ok(())
        }
        ConfigCommand::Init(init) => run_init(init),
    }
}

fn run_show(args: ShowArgs) -> Result<()> {
    let loaded = match &args.file {
        Some(file) => {
            let file = workspace::resolve_document(file);
            config::load_config(&workspace::root_for(&file), &workspace::document_dir(&file))
        }
        None => {
            let cwd = std::env::current_dir().map_err(|e| Error::io("reading cwd", e))?;
            config::load_config(&workspace::current_root(), &cwd)
        }
    };

    if args.effective {
        print_effective(&loaded);
    } else if args.json {
        println!("{}", serde_json::to_string_pretty(&loaded.config)?);
    } else {
        print!("{}", serde_yaml::to_string(&loaded.config)?);
    }
    Ok(())
}

/// Layer that decided `key`: its env var when applied, the defaults when the
/// value is untouched, otherwise the last file layer.
fn origin(key: &str, value: &str, loaded: &LoadedConfig, defaults: &Config) -> String {
    if let Some(var) = config::env_var_for(key)
        && loaded
            .sources
            .contains(&ConfigSource::EnvVar(var.name.to_string()))
    {
        return format!("${}", var.name);
    }
    let default = config::settings(defaults)
        .into_iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v);
    if default.as_deref() == Some(value) {
        return ConfigSource::Default.to_string();
    }
    loaded
        .sources
        .iter()
        .rev()
        .find(|s| matches!(s, ConfigSource::UserGlobal | ConfigSource::ProjectManifest(_)))
        .map(ToString::to_string)
        .unwrap_or_else(|| ConfigSource::Default.to_string())
}

fn print_effective(loaded: &LoadedConfig) {
    println!("{}", "Layers (lowest first):".bold());
    for source in &loaded.sources {
        println!("  {}", source);
    }
    println!();

    let defaults = Config::default();
    let settings = config::settings(&loaded.config);
    let width = settings.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    for (key, value) in &settings {
        println!(
            "{:width$}  {:?}  {}",
            key,
            value,
            origin(key, value, loaded, &defaults).dimmed(),
            width = width
        );
    }
}

fn print_env() {
    for var in ENV_VARS {
        let current = std::env::var(var.name).ok().filter(|v| !v.is_empty());
        println!("{}", var.name.bold());
        println!("  {}", var.description);
        if let Some(values) = var.values {
            println!("  values:  {}", values);
        }
        println!("  default: {}", var.default);
        if var.config_path != "-" {
            println!("  setting: {}", var.config_path);
        }
        if let Some(current) = current {
            println!("  current: {}", current.green());
        }
        println!();
    }
}

fn manifest_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_DIR).join(MANIFEST_FILE)
}

fn run_init(args: InitArgs) -> Result<()> {
    let path = manifest_path(&args.dir);
    if path.exists() && !args.force {
        return Err(Error::io(
            format!(
                "manifest already exists: {} (use --force to overwrite)",
                path.display()
            ),
            std::io::Error::from(std::io::ErrorKind::AlreadyExists),
        ));
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::io(format!("creating {}", parent.display()), e))?;
    }
    fs::write(&path, config::template_manifest())
        .map_err(|e| Error::io(format!("writing {}", path.display()), e))?;
    println!("{} {}", "✓ Created".green(), path.display());

    if let Some(user) = config::user_config_path()
        && !user.exists()
    {
        println!(
            "{}",
            format!("Hint: settings for every document go in {}", user.display()).dimmed()
        );
    }
    Ok(())
}
