//! gitsync - reconcile GitLab groups with LDAP role-groups.

mod config;
mod error;
mod logging;

use std::time::Duration;

use clap::Parser;
use gitsync_directory::LdapDirectory;
use gitsync_engine::{Reconciler, RunSummary};
use gitsync_gitlab::GitlabClient;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

/// Synchronize GitLab group membership from an LDAP directory.
#[derive(Parser, Debug)]
#[command(name = "gitsync", author, version, about, long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, env = "GITSYNC_CONFIG")]
    config: Option<String>,

    /// Log intended changes without writing to GitLab
    #[arg(long)]
    dry_run: bool,

    /// Log level or filter directive (overrides logging.level)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(e.exit_code());
        }
    };

    if let Err(e) = logging::init_logging(&config.logging) {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }

    match run(config).await {
        Ok(summary) => {
            info!(
                mutations = summary.total_mutations(),
                directory_users = summary.directory_users,
                groups = summary.groups_in_scope,
                dry_run = summary.dry_run,
                "gitsync finished"
            );
            std::process::exit(0);
        }
        Err(e) => {
            error!(error = %e, exit_code = e.exit_code(), "gitsync failed");
            std::process::exit(e.exit_code());
        }
    }
}

fn load_config(cli: &Cli) -> AppResult<AppConfig> {
    let path = cli.config.clone().unwrap_or_else(AppConfig::config_path);
    let mut config = AppConfig::from_file(&path)?;
    config.apply_env_overrides()?;
    if cli.dry_run {
        config.sync.dry_run = true;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level.clone_from(level);
    }
    config.validate()?;
    Ok(config)
}

async fn run(config: AppConfig) -> AppResult<RunSummary> {
    info!(gitlab = %config.gitlab.url, ldap = %config.ldap.url, "Starting gitsync");

    let reconciler = Reconciler::new(config.sync)?;

    let token = config.gitlab.token.unwrap_or_default();
    let gitlab = GitlabClient::new(
        &config.gitlab.url,
        token,
        Duration::from_secs(config.gitlab.request_timeout_secs),
    )
    .map_err(|e| AppError::Config(e.to_string()))?;
    let client = reconciler.client(gitlab);

    let directory = LdapDirectory::new(config.ldap).map_err(|e| AppError::Config(e.to_string()))?;

    Ok(reconciler.run(&directory, &client).await?)
}
