//! Sanskara Gateway
//!
//! Serves the realtime assistant WebSocket (`/ws`) and a health probe,
//! bridging each connection to a Gemini Live session.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use sanskara_core::config::{Config, StoreBackend, load_config};
use sanskara_core::tracing_init::{component_filter, init_tracing};
use sanskara_gateway::artifacts::{ArtifactStore, FsArtifactStore};
use sanskara_gateway::live::GeminiLiveResponder;
use sanskara_gateway::live::instruction::load_template;
use sanskara_gateway::server::{AppState, build_router};
use sanskara_gateway::session::{SessionManager, SessionSettings};
use sanskara_gateway::storage::{HttpSqlStore, SqliteStore, Store};

#[derive(Parser, Debug)]
#[command(name = "sanskara-gateway")]
#[command(version, about = "Sanskara realtime assistant gateway")]
struct Args {
    /// Config file (JSON), layered over the global settings file
    #[arg(long, env = "SANSKARA_CONFIG")]
    config: Option<PathBuf>,

    /// TCP bind address (overrides config)
    #[arg(long, env = "SANSKARA_ADDR")]
    addr: Option<SocketAddr>,

    /// Log level filter for the gateway (e.g. "info", "debug", "warn").
    #[arg(long, env = "SANSKARA_LOG_LEVEL")]
    log_level: Option<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, env = "SANSKARA_LOG_JSON")]
    log_json: bool,

    /// SQLite database path (overrides config)
    #[arg(long, env = "SANSKARA_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Artifact directory (default: ~/.sanskara/artifacts)
    #[arg(long, env = "SANSKARA_ARTIFACT_DIR")]
    artifact_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    apply_args(&mut config, &args);

    let log_filter = component_filter(
        &["sanskara_gateway", "sanskara_core"],
        &config.gateway.log_level,
    );
    init_tracing(&log_filter, args.log_json);

    let addr: SocketAddr = config.gateway.bind_addr.parse()?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %addr,
        model = %config.live.model,
        store = ?config.store.backend,
        "Starting sanskara-gateway"
    );

    let store = open_store(&config).await?;
    let artifact_dir = artifact_dir(&config)?;
    tokio::fs::create_dir_all(&artifact_dir).await?;
    info!(path = %artifact_dir.display(), "Serving artifacts from directory");
    let artifacts: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore::new(artifact_dir));

    let template = load_template(config.live.instruction_path.as_deref())?;
    let responder = Arc::new(GeminiLiveResponder::new(config.live.clone(), template));

    let manager = SessionManager::new(
        responder,
        store,
        artifacts,
        SessionSettings::from(&config),
    );
    let app = build_router(AppState {
        manager: Arc::new(manager),
        default_user_id: config.session.default_user_id.clone(),
        max_frame_bytes: config.gateway.max_frame_bytes,
    });

    let listener = tokio::net::TcpListener::bind(addr).await?;

    #[cfg(unix)]
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    // Notify systemd that the gateway is ready to serve (unix only).
    #[cfg(unix)]
    sd_notify::notify(true, &[sd_notify::NotifyState::Ready])?;

    info!(addr = %addr, "Gateway ready");

    let shutdown = async move {
        #[cfg(unix)]
        let sigterm_future = sigterm.recv();
        #[cfg(not(unix))]
        let sigterm_future = std::future::pending::<Option<()>>();

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C shutdown signal");
            }
            _ = sigterm_future => {
                info!("Received SIGTERM shutdown signal");
            }
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Gateway stopped");
    Ok(())
}

/// CLI arguments take precedence over every config layer.
fn apply_args(config: &mut Config, args: &Args) {
    if let Some(addr) = args.addr {
        config.gateway.bind_addr = addr.to_string();
    }
    if let Some(level) = &args.log_level {
        config.gateway.log_level.clone_from(level);
    }
    if let Some(path) = &args.db_path {
        config.store.database_path = Some(path.clone());
    }
    if let Some(dir) = &args.artifact_dir {
        config.artifacts.directory = Some(dir.clone());
    }
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn Store>> {
    match config.store.backend {
        StoreBackend::Sqlite => {
            let path = match &config.store.database_path {
                Some(path) => path.clone(),
                None => default_db_path()?,
            };
            info!(path = %path.display(), "Opening database");
            Ok(Arc::new(SqliteStore::open(&path).await?))
        }
        StoreBackend::Http => {
            let endpoint = config
                .store
                .sql_endpoint
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("store.sql_endpoint is required for the http backend"))?;
            info!(endpoint = %endpoint, "Using remote SQL store");
            Ok(Arc::new(HttpSqlStore::new(
                endpoint,
                config.store.sql_api_key.as_deref(),
                config.store.project_id.clone(),
            )?))
        }
    }
}

/// Default database path: ~/.sanskara/sanskara.db
fn default_db_path() -> anyhow::Result<PathBuf> {
    Ok(sanskara_home()?.join("sanskara.db"))
}

fn artifact_dir(config: &Config) -> anyhow::Result<PathBuf> {
    match &config.artifacts.directory {
        Some(dir) => Ok(dir.clone()),
        None => Ok(sanskara_home()?.join("artifacts")),
    }
}

fn sanskara_home() -> anyhow::Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".sanskara"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn configured_artifact_dir_wins() {
        let mut config = Config::default();
        config.artifacts.directory = Some(PathBuf::from("/srv/artifacts"));
        assert_eq!(artifact_dir(&config).unwrap(), PathBuf::from("/srv/artifacts"));
    }

    #[test]
    fn artifact_dir_defaults_under_home() {
        if dirs::home_dir().is_none() {
            return;
        }
        let dir = artifact_dir(&Config::default()).unwrap();
        assert!(dir.ends_with(".sanskara/artifacts"));
    }

    #[test]
    fn cli_artifact_dir_overrides_config() {
        let args = Args::parse_from(["sanskara-gateway", "--artifact-dir", "/tmp/uploads"]);
        let mut config = Config::default();
        apply_args(&mut config, &args);
        assert_eq!(artifact_dir(&config).unwrap(), PathBuf::from("/tmp/uploads"));
    }
}
