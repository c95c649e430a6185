//! Runs the HTTP accept loop on its own thread so the embedding process keeps
//! its main thread.

use std::net::{SocketAddr, TcpListener};
use std::thread::JoinHandle;

use tokio::sync::oneshot;

use crate::config::Config;
use crate::http::{self, state::AppState};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
    #[error("failed to start server thread: {0}")]
    Io(#[from] std::io::Error),
    #[error("server thread panicked")]
    Panicked,
}

/// Handle to a running server thread.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    thread: JoinHandle<Result<(), std::io::Error>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting, let in-flight requests drain, and wait for the thread.
    pub fn shutdown(mut self) -> Result<(), ServerError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.join()
    }

    /// Block until the server thread exits.
    pub fn join(self) -> Result<(), ServerError> {
        match self.thread.join() {
            Ok(result) => result.map_err(ServerError::from),
            Err(_) => Err(ServerError::Panicked),
        }
    }
}

/// Start the server when the config enables it; `None` means autostart is off.
pub fn autostart(config: &Config) -> Result<Option<ServerHandle>, ServerError> {
    if !config.enabled {
        tracing::info!(
            "Preview gallery disabled; set {}=true or pass --enabled true to start it",
            crate::cli::ENABLE_ENV
        );
        return Ok(None);
    }
    spawn(config).map(Some)
}

/// Bind synchronously, then serve on a dedicated `preview-gallery-http` thread.
///
/// Binding on the caller's thread surfaces address errors immediately and lets
/// port 0 report the real port through [`ServerHandle::local_addr`].
pub fn spawn(config: &Config) -> Result<ServerHandle, ServerError> {
    let host = if config.localhost { "127.0.0.1" } else { "0.0.0.0" };
    let addr = format!("{}:{}", host, config.port);
    let listener = TcpListener::bind(&addr).map_err(|source| ServerError::Bind {
        addr: addr.clone(),
        source,
    })?;
    listener.set_nonblocking(true)?;
    let local_addr = listener.local_addr()?;

    if !config.root.is_dir() {
        tracing::warn!(
            "Output root {} does not exist yet; gallery will be empty",
            config.root.display()
        );
    }

    let state = AppState::from_config(config);
    let archive = state.archive.clone();
    let app = http::build_router(state);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let thread = std::thread::Builder::new()
        .name("preview-gallery-http".to_string())
        .spawn(move || -> std::io::Result<()> {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .thread_name("preview-gallery-worker")
                .build()?;
            let served = runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener)?;
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        let _ = shutdown_rx.await;
                    })
                    .await
            });
            // Waits out a running build so its temporary file is removed too.
            archive.shutdown();
            served
        })?;

    tracing::info!("Serving preview gallery on http://{}", local_addr);

    Ok(ServerHandle {
        local_addr,
        shutdown_tx: Some(shutdown_tx),
        thread,
    })
}
