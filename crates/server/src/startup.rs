use std::future::Future;
use std::sync::Arc;

use common::utils::logging::init_logging;
use configs::{AppConfig, GatewayMode};
use dotenvy::dotenv;
use gateway::{InProcess, Loopback, SharedBackend};
use models::memory::MemorySession;
use models::user;
use service::rpc::user_service_server::UserServiceServer;
use service::user::repo::cql::CqlUserRepository;
use service::user::UserHandler;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_stream::wrappers::TcpListenerStream;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::errors::StartupError;

/// Bound sockets for both surfaces. Binding is separate from serving so
/// callers can listen on ephemeral ports and learn the addresses first.
pub struct Listeners {
    pub grpc: TcpListener,
    pub http: TcpListener,
}

impl Listeners {
    pub async fn bind(cfg: &AppConfig) -> Result<Self, StartupError> {
        Ok(Self { grpc: bind(cfg.grpc.socket_addr()).await?, http: bind(cfg.http.socket_addr()).await? })
    }
}

async fn bind(addr: anyhow::Result<std::net::SocketAddr>) -> Result<TcpListener, StartupError> {
    let addr = addr.map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    TcpListener::bind(addr).await.map_err(|source| StartupError::Bind { addr, source })
}

fn invalid(e: anyhow::Error) -> StartupError {
    StartupError::InvalidConfig(format!("{e:#}"))
}

/// Load `config.toml` (or `CONFIG_PATH`), falling back to defaults only when
/// the file does not exist. Returns the reason for the fallback so it can be
/// logged once the subscriber is up.
fn load_config() -> Result<(AppConfig, Option<String>), StartupError> {
    load_config_from(&configs::default_path())
}

fn load_config_from(path: &str) -> Result<(AppConfig, Option<String>), StartupError> {
    let (mut cfg, fallback) = match configs::load_from_file(path) {
        Ok(cfg) => (cfg, None),
        Err(e) if is_missing(&e) => (AppConfig::default(), Some(format!("{path}: {e}"))),
        Err(e) => return Err(StartupError::InvalidConfig(format!("{path}: {e}"))),
    };
    cfg.normalize_and_validate().map_err(invalid)?;
    Ok((cfg, fallback))
}

fn is_missing(e: &anyhow::Error) -> bool {
    e.downcast_ref::<std::io::Error>()
        .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound)
}

/// Open the storage session the repository runs on.
pub fn open_session(cfg: &AppConfig) -> Result<Arc<MemorySession>, StartupError> {
    let consistency = cfg.storage.consistency().map_err(invalid)?;
    let session = MemorySession::new(cfg.storage.keyspace.clone(), consistency).with_table(user::TABLE, user::KEY_COLUMN);
    info!(keyspace = %cfg.storage.keyspace, %consistency, "storage session opened");
    Ok(Arc::new(session))
}

fn build_backend<T>(cfg: &AppConfig, handler: Arc<T>) -> Result<SharedBackend, StartupError>
where
    T: service::rpc::user_service_server::UserService,
{
    match cfg.gateway.mode {
        GatewayMode::InProcess => Ok(Arc::new(InProcess::new(handler))),
        GatewayMode::Loopback => {
            let backend = Loopback::connect_lazy(&cfg.grpc.endpoint)?;
            info!(endpoint = %cfg.grpc.endpoint, "gateway dialing rpc endpoint");
            Ok(Arc::new(backend))
        }
    }
}

async fn stopped(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

/// Serve the native RPC surface and the HTTP gateway until `shutdown` resolves,
/// then drain both.
pub async fn serve<F>(cfg: AppConfig, listeners: Listeners, shutdown: F) -> Result<(), StartupError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let session = open_session(&cfg)?;
    let repo = Arc::new(CqlUserRepository::new(session));
    let handler = Arc::new(UserHandler::new(repo));
    let backend = build_backend(&cfg, handler.clone())?;

    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown.await;
        info!("shutdown requested");
        let _ = tx.send(true);
    });

    let grpc_addr = listeners.grpc.local_addr().map_err(StartupError::Http)?;
    let http_addr = listeners.http.local_addr().map_err(StartupError::Http)?;
    info!(%grpc_addr, %http_addr, mode = ?cfg.gateway.mode, "starting user service");

    let grpc = tonic::transport::Server::builder()
        .add_service(UserServiceServer::from_arc(handler))
        .serve_with_incoming_shutdown(TcpListenerStream::new(listeners.grpc), stopped(rx.clone()));

    let router = gateway::build_router(backend, CorsLayer::very_permissive());
    let http = axum::serve(listeners.http, router).with_graceful_shutdown(stopped(rx));

    tokio::try_join!(
        async { grpc.await.map_err(StartupError::from) },
        async { http.await.map_err(StartupError::Http) },
    )?;
    info!("user service stopped");
    Ok(())
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

/// Public entry: load configuration, bind both listeners and serve until Ctrl-C.
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    let (cfg, fallback) = load_config()?;
    init_logging(cfg.logging.log_format().map_err(invalid)?);
    if let Some(reason) = fallback {
        warn!(%reason, "config file not loaded, using defaults");
    }

    let listeners = Listeners::bind(&cfg).await?;
    serve(cfg, listeners, ctrl_c()).await?;
    Ok(())
}
