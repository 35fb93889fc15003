//! ACM Compass server entrypoint.

use acm_compass::db::backup::BackupManager;
use acm_compass::db::lock::{acquire_owner_lock_for_lifetime, force_unlock};
use acm_compass::{config::Config, db::Database, serve_router, AppState};
use compass_core::config::env_flag_enabled;
use compass_core::DEFAULT_PORT;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct CliFlags {
    help: bool,
    force_unlock: bool,
    backup: bool,
}

fn parse_cli_flags(args: &[String]) -> anyhow::Result<CliFlags> {
    let mut flags = CliFlags::default();
    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => flags.help = true,
            "--force-unlock" => flags.force_unlock = true,
            "--backup" => flags.backup = true,
            value if value.starts_with('-') => {
                anyhow::bail!(
                    "Unknown option: '{}'. Use --help to see supported options.",
                    value
                );
            }
            value => {
                anyhow::bail!(
                    "Unexpected positional argument: '{}'. Use --help to see supported options.",
                    value
                );
            }
        }
    }
    Ok(flags)
}

fn runs_maintenance_mode(flags: CliFlags) -> bool {
    flags.force_unlock || flags.backup
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "acm_compass=info,compass_server=info,compass_core=info,tower_http=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let cli_flags = parse_cli_flags(&args)?;

    if cli_flags.help {
        print_help();
        return Ok(());
    }

    let config = Config::from_env();
    let lock_path = config.owner_lock_path();

    if cli_flags.force_unlock {
        tracing::warn!("Force unlock requested");
        if force_unlock(&lock_path)? {
            tracing::info!("Removed stale owner lock");
        } else {
            tracing::info!("No owner lock file found");
        }
    }

    if cli_flags.backup {
        run_backup(&config)?;
    }

    if runs_maintenance_mode(cli_flags) {
        return Ok(());
    }

    let _owner_lock = acquire_owner_lock_for_lifetime(&lock_path)?;
    let data_exists_before_open = Path::new(&config.data_dir).exists();

    if config.auto_backup && data_exists_before_open {
        if let Err(err) = BackupManager::new(&config.data_dir).create_backup() {
            tracing::warn!("Failed to create auto-backup: {}", err);
        }
    }

    let database = Database::open(&config.data_dir)?;
    let state = AppState::new(config.clone(), database);

    let allow_public = env_flag_enabled("ALLOW_PUBLIC_ACCESS");
    if allow_public {
        tracing::warn!("Public access enabled - server will accept requests from any origin");
    }

    let bind_addr = acm_compass::resolve_bind_address(&config, allow_public);
    if !bind_addr.ip().is_loopback() {
        tracing::warn!(
            "Binding to non-localhost address: {} - ensure proper security measures are in place",
            bind_addr
        );
    }

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let actual_addr = listener.local_addr().unwrap_or(bind_addr);
    tracing::info!(
        "ACM Compass running at http://{} (data: {})",
        actual_addr,
        config.data_dir
    );

    serve_router(listener, state, allow_public, shutdown_signal()).await?;
    tracing::info!("ACM Compass stopped");
    Ok(())
}

fn print_help() {
    println!("ACM Compass Server\n");
    println!("Usage: acm-compass [OPTIONS]\n");
    println!("Options:");
    println!("  --force-unlock    Remove a stale owner lock left by a crashed server");
    println!("  --backup          Copy the data directory to a timestamped sibling");
    println!("  --help            Show this help message");
    println!("\nEnvironment variables:");
    println!("  COMPASS_DATA_DIR     Data directory (default: ~/.acm-compass/data)");
    println!("  COMPASS_CONFIG_DIR   Machine-local config dir (default: ~/.acm-compass)");
    println!(
        "  PORT                 Server port (default: {})",
        DEFAULT_PORT
    );
    println!("  MAX_BODY_SIZE        Maximum request body in bytes (default: 2MB)");
    println!("  IMPORT_ORIGINS       Comma-separated origins allowed to post scraped data");
    println!("  AUTO_BACKUP          Back up the data directory on startup");
    println!("  GIT_BIN              git executable used for sync (default: git)");
    println!("  ALLOW_PUBLIC_ACCESS  Allow CORS from any origin");
    println!(
        "  BIND                 Override bind address (e.g. 0.0.0.0:{})",
        DEFAULT_PORT
    );
}

fn run_backup(config: &Config) -> anyhow::Result<()> {
    match BackupManager::new(&config.data_dir).create_backup()? {
        Some(path) => println!("Data directory backed up to: {}", path.display()),
        None => println!("No existing data directory to back up"),
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
