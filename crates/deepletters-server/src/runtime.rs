use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto;
use hyper_util::server::graceful::GracefulShutdown;
use hyper_util::service::TowerToHyperService;
use tokio::net::{TcpListener, TcpStream};
use tokio_io_timeout::TimeoutStream;
use tower::Service;
use tower_http::timeout::TimeoutLayer;
use tracing::{error, info, warn};

use crate::config::{Config, ConfigError};
use crate::http::{build_router, AppState};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("bind listener: {0}")]
    Bind(String),
    #[error("serve: {0}")]
    Serve(String),
}

/// Connection and request deadlines for the key service.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ServeTimeouts {
    /// Time allowed for a client to finish sending request headers.
    pub header: Duration,
    /// Whole-request budget for `/wrap` and `/unwrap`, body read included.
    pub request: Duration,
    /// Per-write socket deadline.
    pub write: Duration,
    /// Idle keepalive connections are dropped after this long.
    pub idle: Duration,
    /// How long in-flight requests may run after shutdown is requested.
    pub drain: Duration,
}

impl Default for ServeTimeouts {
    fn default() -> Self {
        Self {
            header: Duration::from_secs(5),
            request: Duration::from_secs(15),
            write: Duration::from_secs(15),
            idle: Duration::from_secs(60),
            drain: Duration::from_secs(10),
        }
    }
}

pub async fn run_server() -> Result<(), RuntimeError> {
    run_server_with_shutdown(shutdown_signal()).await
}

pub async fn run_server_with_shutdown<F>(shutdown: F) -> Result<(), RuntimeError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let production = std::env::var("ENV").is_ok_and(|v| v == "production");
    if !production {
        if let Err(err) = load_dotenv_if_present(".env") {
            eprintln!("ignoring .env: {err}");
        }
    }

    // Refuses to start without a usable WRAPPING_KEY.
    let cfg = Config::load()?;
    init_logging(&cfg.log_level);

    let addr = cfg.socket_addr()?;
    let env = cfg.env.clone();
    let state = Arc::new(AppState::from_config(cfg)?);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| RuntimeError::Bind(e.to_string()))?;

    info!(addr = %addr, env = %env, "key service listening");

    let timeouts = ServeTimeouts::default();
    serve(listener, key_service(state, timeouts), shutdown, timeouts)
        .await
        .inspect_err(|err| error!(err = %err, "key service stopped"))
}

/// The router with the whole-request deadline applied.
pub fn key_service(state: Arc<AppState>, timeouts: ServeTimeouts) -> Router {
    build_router(state).layer(TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        timeouts.request,
    ))
}

/// Accept connections until `shutdown` resolves, then drain in-flight
/// requests for at most `timeouts.drain`.
pub async fn serve<F>(
    listener: TcpListener,
    app: Router,
    shutdown: F,
    timeouts: ServeTimeouts,
) -> Result<(), RuntimeError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let mut make_service = app.into_make_service();
    let mut builder = auto::Builder::new(TokioExecutor::new());
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(Some(timeouts.header));
    let graceful = GracefulShutdown::new();

    tokio::pin!(shutdown);
    loop {
        let (stream, peer) = tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok(v) => v,
                Err(err) => {
                    warn!(err = %err, "accept failed");
                    continue;
                }
            },
        };

        let router = match make_service.call(()).await {
            Ok(router) => router,
            Err(never) => match never {},
        };
        let io = TokioIo::new(Box::pin(socket_deadlines(stream, timeouts)));
        let conn = builder.serve_connection(io, TowerToHyperService::new(router));
        let conn = graceful.watch(conn.into_owned());
        tokio::spawn(async move {
            if let Err(err) = conn.await {
                warn!(err = %err, peer = %peer, "connection closed with error");
            }
        });
    }
    drop(listener);

    tokio::time::timeout(timeouts.drain, graceful.shutdown())
        .await
        .map_err(|_| {
            RuntimeError::Serve(format!(
                "in-flight requests still running after {}ms",
                timeouts.drain.as_millis()
            ))
        })
}

fn socket_deadlines(stream: TcpStream, timeouts: ServeTimeouts) -> TimeoutStream<TcpStream> {
    let mut stream = TimeoutStream::new(stream);
    stream.set_read_timeout(Some(timeouts.idle));
    stream.set_write_timeout(Some(timeouts.write));
    stream
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("shutdown requested");
}

/// `KEY=value` pairs from a dotenv file. Blank lines, comments and lines
/// without `=` are skipped; surrounding quotes are stripped.
fn parse_dotenv(contents: &str) -> Vec<(&str, &str)> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim(), v.trim().trim_matches('"')))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

/// Export dotenv values for keys not already set in the environment.
pub fn load_dotenv_if_present(path: impl AsRef<Path>) -> std::io::Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(());
    }
    let contents = std::fs::read_to_string(path)?;
    for (key, value) in parse_dotenv(&contents) {
        if std::env::var_os(key).is_none() {
            std::env::set_var(key, value);
        }
    }
    Ok(())
}

fn log_directive(level: &str) -> &'static str {
    match level.to_ascii_lowercase().as_str() {
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" => "error",
        _ => "info",
    }
}

/// JSON logs; `RUST_LOG` overrides `LOG_LEVEL` when set.
pub fn init_logging(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_directive(log_level)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_current_span(false)
        .with_target(false)
        .try_init();
}
