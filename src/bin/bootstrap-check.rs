//! # Bootstrap Check
//!
//! Command-line tool that loads the bootstrap configuration, selects the
//! configured backend and runs the full extension bootstrap against an
//! in-memory host. Useful for catching misconfiguration before deploying.

use clap::{Parser, Subcommand, ValueEnum};
use durable_bootstrap::backend::bind_raw;
use durable_bootstrap::config::detect_environment;
use durable_bootstrap::logging::init_structured_logging;
use durable_bootstrap::registry::LoaderHook;
use durable_bootstrap::{
    BackendKind, BackendSelector, BootstrapError, ConfigManager, InMemoryExtensionHost,
    InMemoryProvisioner,
};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "bootstrap-check")]
#[command(about = "Check durable backend bootstrap configuration")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Environment to load (defaults to DURABLE_ENV, then APP_ENV, then development)
    #[arg(short, long)]
    environment: Option<String>,

    /// Configuration directory (default: config)
    #[arg(short, long, conflicts_with = "file")]
    config_dir: Option<PathBuf>,

    /// Explicit configuration file
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full bootstrap against an in-memory host
    Check,

    /// Bind and validate the storage provider options only
    Validate,

    /// List supported backends
    Backends,
}

#[tokio::main]
async fn main() {
    init_structured_logging();
    let cli = Cli::parse();

    let result = match cli.command.as_ref().unwrap_or(&Commands::Check) {
        Commands::Check => run_check(&cli).await,
        Commands::Validate => run_validate(&cli),
        Commands::Backends => {
            list_backends(&cli);
            Ok(())
        }
    };

    if let Err(e) = result {
        error!(error = %e, retryable = e.is_retryable(), "Bootstrap check failed");
        eprintln!("❌ {e}");
        if e.is_retryable() {
            eprintln!("   (retryable: the backend may be slow to respond)");
        }
        process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<Arc<ConfigManager>, BootstrapError> {
    let environment = cli.environment.clone().unwrap_or_else(detect_environment);
    match &cli.file {
        Some(path) => ConfigManager::load_from_file(path, &environment),
        None => ConfigManager::load_from_directory_with_env(cli.config_dir.clone(), &environment),
    }
}

async fn run_check(cli: &Cli) -> Result<(), BootstrapError> {
    let manager = load_config(cli)?;
    let selector =
        BackendSelector::from_config(manager.config(), Arc::new(InMemoryProvisioner::new()));
    let host = InMemoryExtensionHost::new();

    let registration = selector
        .initialize_from_config(manager.config(), &host)
        .await?;
    registration.service.start()?;
    let status = registration.service.status();
    info!(backend = %registration.backend_kind, "Bootstrap check passed");

    match cli.format {
        OutputFormat::Json => {
            let summary = serde_json::json!({
                "environment": manager.environment(),
                "registration_id": registration.id,
                "extension": registration.extension_name,
                "status": status,
                "loader_hooks": selector
                    .loader_hooks()
                    .active_hooks()
                    .iter()
                    .map(|hook| hook.prefix())
                    .collect::<Vec<_>>(),
            });
            println!("{summary:#}");
        }
        OutputFormat::Text => {
            println!("✅ Bootstrap succeeded");
            println!("Environment:  {}", manager.environment());
            println!("Extension:    {}", registration.extension_name);
            println!("Backend:      {}", status.backend);
            println!("Task hub:     {}", status.hub_name);
            if let Some(connection) = &status.connection_name {
                println!("Connection:   {connection}");
            }
            println!("Resources:    {}", status.resource_count);
        }
    }

    host.shutdown()
}

fn run_validate(cli: &Cli) -> Result<(), BootstrapError> {
    let manager = load_config(cli)?;
    let options = bind_raw(&manager.config().storage_provider)?;

    match cli.format {
        OutputFormat::Json => {
            let rendered = serde_json::to_string_pretty(&options)
                .map_err(|e| BootstrapError::Configuration(e.to_string()))?;
            println!("{rendered}");
        }
        OutputFormat::Text => {
            println!("✅ Options valid for the {} backend", options.kind());
            println!("Options type: {}", options.type_name());
            println!("Task hub:     {}", options.common().hub_name);
        }
    }
    Ok(())
}

fn list_backends(cli: &Cli) {
    match cli.format {
        OutputFormat::Json => {
            let backends: Vec<_> = BackendKind::ALL
                .iter()
                .map(|kind| {
                    serde_json::json!({
                        "type": kind.as_str(),
                        "extension": kind.extension_name(),
                        "loader_prefix": LoaderHook::for_backend(*kind).prefix(),
                    })
                })
                .collect();
            println!("{}", serde_json::Value::Array(backends));
        }
        OutputFormat::Text => {
            for kind in BackendKind::ALL {
                println!(
                    "{:<16} {:<22} {}",
                    kind.as_str(),
                    kind.extension_name(),
                    LoaderHook::for_backend(kind).prefix()
                );
            }
        }
    }
}
