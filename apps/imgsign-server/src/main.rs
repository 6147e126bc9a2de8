//! imgsign server - serves static HTML with signed object-store image URLs.
//!
//! Every `img` `data-src`/`src` value in a served page is treated as an
//! object key and replaced with a time-limited presigned GET URL.
//!
//! # Usage
//!
//! ```text
//! imgsign-server [ENV_FILE]
//! imgsign-server --health-check
//! ```
//!
//! `ENV_FILE` defaults to `./.env`. Variables already set in the process
//! environment take precedence over the file.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `ACCESS_KEY` | *(required)* | Object store access key |
//! | `SECRET_KEY` | *(required)* | Object store secret key |
//! | `ENDPOINT` | *(required)* | Object store host, optionally with port |
//! | `BUCKET` | *(required)* | Bucket holding the images |
//! | `DOCUMENT_ROOT` | *(required)* | Directory of HTML files |
//! | `DURATION_HOUR` | `24` | Signed URL lifetime in hours (1-168) |
//! | `PORT` | `8080` | Listen port |
//! | `LISTEN_HOST` | `0.0.0.0` | Listen address |
//! | `REGION` | `us-east-1` | Signing region |
//! | `SECURE` | `true` | Use `https` in signed URLs |
//! | `VIRTUAL_HOSTED_STYLE` | `false` | Put the bucket in the host name |
//! | `SIGNATURE_VERSION` | `v4` | `v4` or `v2` |
//! | `REQUEST_TIMEOUT_SECS` | `30` | Per-request rendering deadline |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use imgsign_core::{PageRenderer, ServerConfig};
use imgsign_http::{ImgsignService, serve};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Env file read when none is given on the command line.
const DEFAULT_ENV_FILE: &str = ".env";

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// The env file named on the command line, if any.
fn env_file_arg(args: impl IntoIterator<Item = String>) -> Option<PathBuf> {
    args.into_iter()
        .skip(1)
        .find(|a| !a.starts_with("--"))
        .map(PathBuf::from)
}

/// Load variables from the env file into the process environment.
///
/// An explicitly named file must exist; the default `./.env` is optional.
fn load_env_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    match explicit {
        Some(path) => dotenvy::from_path(path)
            .with_context(|| format!("failed to load env file {}", path.display()))
            .map(|()| Some(path.to_path_buf())),
        None => match dotenvy::from_filename(DEFAULT_ENV_FILE) {
            Ok(path) => Ok(Some(path)),
            Err(e) if e.not_found() => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to load {DEFAULT_ENV_FILE}")),
        },
    }
}

/// Perform a health check by connecting to the server and requesting the health endpoint.
///
/// Exits with code 0 if healthy, 1 otherwise.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n",
        imgsign_http::service::HEALTH_PATH
    );
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.contains("200 OK") && response.contains("\"status\":\"running\"") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_file = env_file_arg(std::env::args());
    let loaded = load_env_file(env_file.as_deref())?;

    let config = ServerConfig::from_env().context("invalid configuration")?;

    // Handle --health-check flag for container health probes.
    if std::env::args().any(|a| a == "--health-check") {
        let addr = config.listen_addr().replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    init_tracing(&config.log_level)?;

    info!(
        env_file = ?loaded,
        document_root = %config.document_root.display(),
        endpoint = %config.store.endpoint,
        bucket = %config.store.bucket,
        region = %config.store.region,
        signature_version = %config.store.signature_version,
        duration_hours = config.store.duration_hours,
        version = VERSION,
        "starting imgsign server",
    );

    let service = ImgsignService::new(PageRenderer::from_config(&config));

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    serve(listener, service, async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    })
    .await;

    Ok(())
}
