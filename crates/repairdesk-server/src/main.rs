//! Repair Desk Server
//!
//! HTTP API for tracking equipment repair requests.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use repairdesk_core::config::{self, BootstrapConfig, Config};
use repairdesk_core::tracing_init::{default_filter, init_tracing};
use tracing::info;

use repairdesk_server::auth::JwtManager;
use repairdesk_server::server::{AppState, UserService, build_router};
use repairdesk_server::storage::RepairDatabase;

#[derive(Parser, Debug)]
#[command(name = "repairdesk-server")]
#[command(version, about = "Repair Desk server - repair request tracking API")]
struct Args {
    /// JSON settings file.
    #[arg(long, env = "REPAIRDESK_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Path to SQLite database file.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// JWT secret key.
    #[arg(long, env = "REPAIRDESK_JWT_SECRET")]
    jwt_secret: Option<String>,

    /// Access token TTL in seconds.
    #[arg(long)]
    token_ttl: Option<i64>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,

    /// Login of the manager account to create on first start.
    #[arg(long, env = "REPAIRDESK_BOOTSTRAP_LOGIN", requires = "bootstrap_password")]
    bootstrap_login: Option<String>,

    #[arg(long, env = "REPAIRDESK_BOOTSTRAP_PASSWORD", hide_env_values = true)]
    bootstrap_password: Option<String>,

    #[arg(long, default_value = "Administrator")]
    bootstrap_name: String,
}

impl Args {
    /// CLI arguments win over the settings file and environment.
    fn apply(self, config: &mut Config) {
        if let Some(addr) = self.addr {
            config.server.listen_addr = addr;
        }
        if let Some(path) = self.db_path {
            config.server.database_path = Some(path);
        }
        if let Some(secret) = self.jwt_secret {
            config.auth.jwt_secret = secret;
        }
        if let Some(ttl) = self.token_ttl {
            config.auth.access_ttl_secs = ttl;
        }
        if let (Some(login), Some(password)) = (self.bootstrap_login, self.bootstrap_password) {
            config.bootstrap = Some(BootstrapConfig {
                login,
                password,
                full_name: self.bootstrap_name,
                phone: String::new(),
            });
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let log_json = args.log_json;

    let mut config = config::load_config(args.config.as_deref())?;
    args.apply(&mut config);
    if config.auth.access_ttl_secs <= 0 {
        anyhow::bail!("token TTL must be positive");
    }

    init_tracing(
        &default_filter(&["repairdesk_server", "repairdesk_core"], &config.server.log_level),
        log_json,
    );

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.listen_addr,
        "Starting repairdesk-server"
    );

    let db_path = match config.server.database_path.clone() {
        Some(path) => path,
        None => config::default_database_path()
            .ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?,
    };
    info!(path = %db_path.display(), "Opening repair database");
    let db = RepairDatabase::open(&db_path).await?;

    if let Some(bootstrap) = &config.bootstrap {
        if UserService::new(db.clone())
            .ensure_bootstrap_manager(bootstrap)
            .await?
        {
            info!(login = %bootstrap.login, "Bootstrap manager created");
        }
    }

    let jwt = JwtManager::new(config.auth.jwt_secret.as_bytes(), config.auth.access_ttl_secs);
    let app = build_router(AppState::new(db, jwt, config.pagination.clone()));

    let listener = tokio::net::TcpListener::bind(config.server.listen_addr).await?;
    info!(addr = %config.server.listen_addr, "Repair Desk server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received shutdown signal");
        })
        .await?;

    info!("Repair Desk server stopped");
    Ok(())
}
