//! sheetstand server binary.
//!
//! Serves sheet-music listings from two storage buckets and accepts
//! password-gated uploads. The main entry point selects a storage backend,
//! builds the Axum router and runs the HTTP listener until shutdown.

mod app;
mod auth;
mod config;
mod error;
mod files;
mod frontend;
mod health;
mod http;
mod listing;
mod logging;
mod names;
mod storage;
mod supabase;
#[cfg(test)]
mod testing;
mod upload;

use axum_server::Handle;
use clap::Parser;
use shadow_rs::shadow;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;

use crate::app::{AppContext, build_router};
use crate::auth::SharedPassword;
use crate::config::{Args, SHUTDOWN_GRACE_SECS, STORAGE_LIST_LIMIT};
use crate::http::build_cors_layer;
use crate::storage::{LocalStorage, StorageBackend};
use crate::supabase::SupabaseStorage;

shadow!(build);

/// Starts the server and blocks until shutdown.
#[tokio::main]
async fn main() -> Result<(), io::Error> {
    let args = Args::parse();
    logging::init_logging(&args.log_filter);

    let buckets = Arc::new(args.buckets());
    let (storage, local_files): (Arc<dyn StorageBackend>, Option<Arc<LocalStorage>>) =
        match (&args.storage_url, &args.storage_key) {
            (Some(url), Some(key)) => {
                let remote = SupabaseStorage::new(url, key, STORAGE_LIST_LIMIT)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))?;
                info!(url, "using supabase storage");
                let storage: Arc<dyn StorageBackend> = Arc::new(remote);
                (storage, None)
            }
            _ => {
                let local = Arc::new(LocalStorage::new(
                    PathBuf::from(&args.storage_dir),
                    &buckets.all(),
                    &args.public_base_url,
                ));
                local.ensure_buckets().await?;
                info!(dir = args.storage_dir, "using local storage");
                let storage: Arc<dyn StorageBackend> = local.clone();
                (storage, Some(local))
            }
        };

    let upload_max_size = usize::try_from(args.upload_max_size).unwrap_or(usize::MAX);
    let mut app = build_router(AppContext {
        storage,
        verifier: Arc::new(SharedPassword::new(args.admin_password.clone())),
        buckets,
        local_files,
        upload_max_size,
    });
    if let Some(cors_layer) = build_cors_layer(args.cors_origins.as_deref()) {
        app = app.layer(cors_layer);
    }

    let host = args
        .host
        .parse::<IpAddr>()
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))?;
    let addr = SocketAddr::new(host, args.port);
    let handle = Handle::new();

    info!(
        default_bucket = args.default_bucket,
        seasonal_bucket = args.seasonal_bucket,
        "🎼 Starting HTTP server at {}",
        addr
    );

    let server = axum_server::bind(addr)
        .handle(handle.clone())
        .serve(app.into_make_service_with_connect_info::<SocketAddr>());

    tokio::select! {
        result = server => result?,
        _ = shutdown_signal(handle) => {}
    }

    Ok(())
}

async fn shutdown_signal(handle: Handle) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received termination signal, shutting down");
    handle.graceful_shutdown(Some(Duration::from_secs(SHUTDOWN_GRACE_SECS)));
}
