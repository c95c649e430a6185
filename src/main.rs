use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;

use preview_gallery::{cli, config, server};

/// Set to true once the first Ctrl+C is received. Second Ctrl+C force-exits.
static SHUTTING_DOWN: AtomicBool = AtomicBool::new(false);

/// Wait for the first Ctrl+C (graceful shutdown).
/// On second Ctrl+C (during shutdown wait), force-exits immediately.
async fn wait_for_shutdown() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    if SHUTTING_DOWN.swap(true, Ordering::SeqCst) {
        eprintln!("\npreview-gallery: forced exit");
        std::process::exit(1);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
        )
        .init();

    let args = cli::Args::parse();

    let file_config = config::find_config_file(args.config.as_deref())
        .and_then(|path| {
            match config::load_config(&path) {
                Ok(cfg) => {
                    tracing::debug!("Loaded config from {}", path.display());
                    Some(cfg)
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config file: {}", e);
                    None
                }
            }
        });

    let config = config::Config::resolve(file_config, &args);

    tracing::info!(
        "preview-gallery: root {} (page size {}, {} archives)",
        config.root.display(),
        config.page_size,
        config.archive_format.label()
    );

    // The server runs on its own thread; this one only waits for Ctrl+C.
    let handle = match server::autostart(&config) {
        Ok(Some(handle)) => handle,
        Ok(None) => return,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };

    wait_for_shutdown().await;
    tracing::info!("Shutting down...");
    // A second Ctrl+C while requests drain exits immediately.
    tokio::spawn(wait_for_shutdown());

    match tokio::task::spawn_blocking(move || handle.shutdown()).await {
        Ok(Ok(())) => tracing::info!("Goodbye."),
        Ok(Err(e)) => tracing::error!("HTTP server error: {}", e),
        Err(e) => tracing::error!("Shutdown task failed: {}", e),
    }
}
