//! KSeF PDF Server - renders KSeF e-invoices and UPO receipts to PDF.
//!
//! This binary serves the `ksef-pdf-http` service over HTTP. It can also
//! answer a single API Gateway proxy event read from stdin, which is how it
//! runs behind a proxy integration.
//!
//! # Usage
//!
//! ```text
//! RENDERER_COMMAND=/opt/ksef/render-pdf ksef-pdf-server
//! ksef-pdf-server --proxy-event < event.json
//! ksef-pdf-server --health-check
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:3000` | Bind address |
//! | `PORT` | *(unset)* | Port on all interfaces, when `GATEWAY_LISTEN` is unset |
//! | `MAX_BODY_BYTES` | `10485760` | Largest accepted request body |
//! | `RENDERER_COMMAND` | *(unset)* | Program that turns a document into a PDF |
//! | `RENDERER_ARGS` | *(empty)* | Whitespace-separated renderer arguments |
//! | `RENDERER_TIMEOUT_SECS` | `30` | Per-document render timeout |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod renderer;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ksef_pdf_core::KsefPdfConfig;
use ksef_pdf_http::proxy::{ProxyRequest, handle_proxy_event};
use ksef_pdf_http::render::PdfRenderer;
use ksef_pdf_http::service::{HttpConfig, KsefPdfService};

use crate::renderer::ConfiguredRenderer;

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
/// Logs go to stderr so that `--proxy-event` output on stdout stays clean.
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
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve<R: PdfRenderer>(listener: TcpListener, service: KsefPdfService<R>) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

/// Answer one proxy event from stdin and print the proxy response to stdout.
async fn run_proxy_event(renderer: &ConfiguredRenderer, config: &HttpConfig) -> Result<()> {
    let mut input = Vec::new();
    tokio::io::stdin()
        .read_to_end(&mut input)
        .await
        .context("failed to read proxy event from stdin")?;
    let event: ProxyRequest =
        serde_json::from_slice(&input).context("stdin is not an API Gateway proxy event")?;

    let response = handle_proxy_event(renderer, config, &event).await;
    info!(status = response.status_code, "answered proxy event");

    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(&serde_json::to_vec(&response)?)
        .await
        .context("failed to write proxy response")?;
    stdout.flush().await?;
    Ok(())
}

/// Perform a health check by connecting to the server and requesting the health endpoint.
///
/// Exits with code 0 if healthy, 1 otherwise.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request = format!("GET /health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if is_healthy_response(&response) {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

fn is_healthy_response(response: &str) -> bool {
    response.starts_with("HTTP/1.1 200") && response.contains("\"status\":\"ok\"")
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = KsefPdfConfig::from_env();

    // Handle --health-check flag for Docker HEALTHCHECK.
    if std::env::args().any(|a| a == "--health-check") {
        let addr = config.gateway_listen.replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    init_tracing(&config.log_level)?;
    config.validate().context("invalid configuration")?;

    let renderer = ConfiguredRenderer::from_config(&config);
    let http_config = HttpConfig::from(&config);

    if std::env::args().any(|a| a == "--proxy-event") {
        return run_proxy_event(&renderer, &http_config).await;
    }

    info!(
        gateway_listen = %config.gateway_listen,
        max_body_bytes = config.max_body_bytes,
        renderer = %renderer.describe(),
        version = VERSION,
        "starting KSeF PDF Server",
    );

    let addr = config.listen_addr()?;
    let service = KsefPdfService::new(renderer, http_config);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");
    info!("POST /generate-invoice, POST /generate-upo, GET /health");

    serve(listener, service).await
}
