//! dynconf: inspect and follow dynamic configuration groups.
//!
//! # Startup
//!
//! ```text
//! app config (file or defaults) → logging → metrics (optional)
//!     → store (etcd, or a seeded in-memory store with --memory DIR)
//!     → ConfigManager → command
//! ```
//!
//! Commands:
//! - `key <group>`: print the derived storage key
//! - `show <group>`: print the current snapshot as JSON
//! - `watch <group>...`: log every change until Ctrl-C / SIGTERM
//! - `typed <schema>`: fetch, decode and validate a built-in schema

use std::error::Error;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;

use dynconf::config::loader::{self, ConfigError};
use dynconf::config::validation::validate_config;
use dynconf::config::{AppConfig, StoreConfig};
use dynconf::dynamic::{group_name_for, ConfigGroup, ConfigManager, ConfigSchema};
use dynconf::lifecycle::signals::wait_for_signal;
use dynconf::observability::{logging, metrics};
use dynconf::schemas::{self, Validate};
use dynconf::store::{ConfigStore, MemoryStore};

/// Upper bound on waiting for watch loops at exit.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "dynconf")]
#[command(about = "Inspect and follow dynamic configuration groups", long_about = None)]
struct Cli {
    /// Application config file (YAML or TOML). Searched for when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the application name.
    #[arg(long)]
    app: Option<String>,

    /// Override the environment.
    #[arg(long)]
    env: Option<String>,

    /// Serve documents from a directory tree instead of the remote store.
    #[arg(long, value_name = "DIR")]
    memory: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the storage key of a group
    Key { group: String },
    /// Print a group's current snapshot
    Show { group: String },
    /// Follow one or more groups and log every change
    Watch {
        #[arg(required = true)]
        groups: Vec<String>,
    },
    /// Fetch a built-in schema (e.g. DatabaseConfig or database) and validate it
    Typed { schema: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let mut config = match (&cli.config, &cli.memory) {
        (Some(path), _) => loader::load_config(path)?,
        (None, Some(_)) => AppConfig::default(),
        (None, None) => loader::discover()?,
    };
    if let Some(app) = cli.app {
        config.name = app;
    }
    if let Some(env) = cli.env {
        config.env = env;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    let _log_guard = logging::init_logging(&config.logger, &config.name)?;
    tracing::info!(app = %config.name, env = %config.env, "dynconf starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let store: Arc<dyn ConfigStore> = match &cli.memory {
        Some(dir) => Arc::new(MemoryStore::seed_from_dir(dir, &config.store.prefix)?),
        None => connect_store(&config.store).await?,
    };
    let manager = ConfigManager::from_config(store, &config.store);

    let outcome = run(&cli.command, &manager, &config).await;
    manager.shutdown_with_timeout(SHUTDOWN_TIMEOUT).await?;
    outcome?;

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(feature = "etcd")]
async fn connect_store(config: &StoreConfig) -> Result<Arc<dyn ConfigStore>, Box<dyn Error>> {
    let store = dynconf::store::EtcdStore::connect(config).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "etcd"))]
async fn connect_store(config: &StoreConfig) -> Result<Arc<dyn ConfigStore>, Box<dyn Error>> {
    tracing::error!(endpoints = ?config.endpoints, "Remote store support not compiled in");
    Err("built without the `etcd` feature; use --memory DIR".into())
}

async fn run(command: &Commands, manager: &ConfigManager, config: &AppConfig) -> Result<(), Box<dyn Error>> {
    let (app, env) = (config.name.as_str(), config.env.as_str());
    match command {
        Commands::Key { group } => {
            println!("{}", manager.storage_key(app, env, group));
        }
        Commands::Show { group } => {
            let group = manager.get_group(app, env, group).await;
            print_snapshot(&group)?;
        }
        Commands::Watch { groups } => {
            for name in groups {
                let group = manager.get_group(app, env, name).await;
                let weak: Weak<ConfigGroup> = Arc::downgrade(&group);
                group.on_change(move || {
                    if let Some(group) = weak.upgrade() {
                        tracing::info!(group = %group.key(), revision = group.revision(), "Configuration updated");
                        if let Err(e) = print_snapshot(&group) {
                            tracing::warn!(error = %e, "Failed to render snapshot");
                        }
                    }
                });
                print_snapshot(&group)?;
            }
            tracing::info!(groups = groups.len(), "Watching; press Ctrl-C to stop");
            wait_for_signal().await?;
        }
        Commands::Typed { schema } => {
            let name = group_name_for(schema);
            match name.as_str() {
                "database" => show_typed::<schemas::DatabaseConfig>(manager, app, env).await?,
                "http" => show_typed::<schemas::HttpConfig>(manager, app, env).await?,
                "middle" => show_typed::<schemas::MiddleConfig>(manager, app, env).await?,
                "auth" => show_typed::<schemas::AuthConfig>(manager, app, env).await?,
                "casbin" => show_typed::<schemas::CasbinConfig>(manager, app, env).await?,
                "superadmin" => show_typed::<schemas::SuperAdminConfig>(manager, app, env).await?,
                "task" => show_typed::<schemas::TaskConfig>(manager, app, env).await?,
                "redis" => show_typed::<schemas::RedisConfig>(manager, app, env).await?,
                "nats" => show_typed::<schemas::NatsConfig>(manager, app, env).await?,
                "email" => show_typed::<schemas::EmailConfig>(manager, app, env).await?,
                "aliyunsms" => show_typed::<schemas::AliyunSmsConfig>(manager, app, env).await?,
                "dify" => show_typed::<schemas::DifyConfig>(manager, app, env).await?,
                "weixin" => show_typed::<schemas::WeixinConfig>(manager, app, env).await?,
                "prtg" => show_typed::<schemas::PrtgConfig>(manager, app, env).await?,
                "fuiou" => show_typed::<schemas::FuiouConfig>(manager, app, env).await?,
                _ => {
                    return Err(format!(
                        "unknown schema '{}' (known groups: {})",
                        schema,
                        schemas::BUILTIN_GROUPS.join(", ")
                    )
                    .into())
                }
            }
        }
    }
    Ok(())
}

async fn show_typed<T>(manager: &ConfigManager, app: &str, env: &str) -> Result<(), Box<dyn Error>>
where
    T: ConfigSchema + Validate + Serialize,
{
    let value: T = manager.get_typed(app, env).await?;
    if let Err(e) = value.validate() {
        tracing::warn!(schema = T::SCHEMA_NAME, error = %e, "Configuration failed validation");
    }
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn print_snapshot(group: &ConfigGroup) -> Result<(), serde_json::Error> {
    let snapshot = group.snapshot();
    println!("# {}", group.key());
    println!("{}", serde_json::to_string_pretty(&*snapshot)?);
    Ok(())
}
