//! Serve helpers for running the provider.
//!
//! The RPC protocol spoken with the engine belongs to the host framework.
//! This module builds the provider from its embedded artifacts and hands the
//! resulting [`RestProvider`] to a [`ProviderHost`].
//!
//! # Signal Handling
//!
//! `serve` handles OS signals (SIGTERM, SIGINT) for graceful shutdown.
//! When a signal is received:
//! 1. The host is told to stop through its shutdown receiver
//! 2. The host gets a configurable timeout to drain in-flight operations
//! 3. `serve` returns

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::callback::ProviderCallback;
use crate::error::ProviderError;
use crate::generate::OpenApiDocument;
use crate::provider::XyzProvider;
use crate::rest::{RestProvider, Transport};
use crate::schema::PackageSpec;
use crate::types::ProviderMetadata;

/// Resolves once the host should stop accepting work.
pub type ShutdownSignal = oneshot::Receiver<()>;

/// The host framework that speaks the engine's RPC protocol.
///
/// `run` serves until the engine disconnects or `shutdown` resolves.
#[async_trait::async_trait]
pub trait ProviderHost: Send + 'static {
    /// Serve `provider` until done.
    async fn run<C, T>(
        self,
        provider: Arc<RestProvider<C, T>>,
        shutdown: ShutdownSignal,
    ) -> Result<(), ProviderError>
    where
        C: ProviderCallback,
        T: Transport;
}

/// Options for serving the provider.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// How long the host may take to finish after a shutdown signal.
    /// Default: 30 seconds.
    pub shutdown_timeout: Duration,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl ServeOptions {
    /// Create new serve options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shutdown timeout.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Build the provider pipeline from its embedded artifacts.
///
/// `schema_bytes` and `metadata_bytes` are JSON; `openapi_bytes` is JSON or
/// YAML.
pub fn make_provider<T: Transport>(
    name: &str,
    version: &str,
    schema_bytes: &[u8],
    openapi_bytes: &[u8],
    metadata_bytes: &[u8],
    transport: T,
) -> Result<RestProvider<XyzProvider, T>, ProviderError> {
    let schema = PackageSpec::from_slice(schema_bytes)?;
    let openapi = OpenApiDocument::from_slice(openapi_bytes)?;
    let metadata = ProviderMetadata::from_slice(metadata_bytes)?;
    debug!(
        resources = metadata.resource_crud_map.len(),
        paths = openapi.path_count(),
        "Loaded provider artifacts"
    );

    let callback = Arc::new(XyzProvider::new(name, version, &schema));
    Ok(RestProvider::new(
        name, version, schema, metadata, openapi, callback, transport,
    ))
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// On Unix, this waits for SIGTERM or SIGINT.
/// On Windows, this waits for CTRL+C.
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                (Err(e), _) | (_, Err(e)) => {
                    warn!(error = %e, "Failed to install signal handlers");
                    return std::future::pending::<()>().await;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, initiating graceful shutdown");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, initiating graceful shutdown");
            }
        }
    }

    #[cfg(windows)]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install CTRL+C handler");
            return std::future::pending::<()>().await;
        }
        info!("Received CTRL+C, initiating graceful shutdown");
    }

    #[cfg(not(any(unix, windows)))]
    {
        std::future::pending::<()>().await;
    }
}

/// Serve the provider.
///
/// Parses the embedded artifacts, builds the provider and runs `host` until
/// it returns or a shutdown signal arrives. For custom configuration, use
/// [`serve_with_options`].
pub async fn serve<T, H>(
    name: &str,
    version: &str,
    schema_bytes: &[u8],
    openapi_bytes: &[u8],
    metadata_bytes: &[u8],
    transport: T,
    host: H,
) -> Result<(), ProviderError>
where
    T: Transport,
    H: ProviderHost,
{
    serve_with_options(
        name,
        version,
        schema_bytes,
        openapi_bytes,
        metadata_bytes,
        transport,
        host,
        ServeOptions::default(),
    )
    .await
}

/// Serve the provider with custom options.
///
/// See [`serve`] for details.
#[allow(clippy::too_many_arguments)]
pub async fn serve_with_options<T, H>(
    name: &str,
    version: &str,
    schema_bytes: &[u8],
    openapi_bytes: &[u8],
    metadata_bytes: &[u8],
    transport: T,
    host: H,
    options: ServeOptions,
) -> Result<(), ProviderError>
where
    T: Transport,
    H: ProviderHost,
{
    let provider = make_provider(
        name,
        version,
        schema_bytes,
        openapi_bytes,
        metadata_bytes,
        transport,
    )?;
    serve_until(provider, host, options, wait_for_shutdown_signal()).await
}

/// Run `host` with an already-built provider until it returns or `signal`
/// resolves.
pub async fn serve_until<C, T, H, S>(
    provider: RestProvider<C, T>,
    host: H,
    options: ServeOptions,
    signal: S,
) -> Result<(), ProviderError>
where
    C: ProviderCallback,
    T: Transport,
    H: ProviderHost,
    S: Future<Output = ()>,
{
    info!(
        provider = provider.name(),
        version = provider.version(),
        "Provider starting"
    );

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let mut run = host.run(Arc::new(provider), shutdown_rx);

    tokio::select! {
        result = &mut run => {
            return match result {
                Ok(()) => {
                    info!("Host exited, provider shutdown complete");
                    Ok(())
                }
                Err(e) => {
                    error!(error = %e, "Host exited with error");
                    Err(e)
                }
            };
        }
        _ = signal => {
            let _ = shutdown_tx.send(());
        }
    }

    match tokio::time::timeout(options.shutdown_timeout, run).await {
        Ok(Ok(())) => {
            info!("Provider shutdown complete");
            Ok(())
        }
        Ok(Err(e)) => {
            error!(error = %e, "Host error during shutdown");
            Err(e)
        }
        Err(_) => {
            warn!(
                timeout = ?options.shutdown_timeout,
                "Shutdown timeout exceeded, forcing shutdown"
            );
            Ok(())
        }
    }
}
