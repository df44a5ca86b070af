//! linkbio Audio Player (linkbio-ap) - main entry point
//!
//! Loads configuration, picks a media backend, starts the playback engine
//! task and serves the HTTP/SSE control surface until Ctrl+C or SIGTERM.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use linkbio_ap::api::{self, AppState};
use linkbio_ap::config::{Args, BackendKind, Settings};
use linkbio_ap::media::{DeviceBackend, MediaBackend, MediaEvent, SimulatedBackend};
use linkbio_ap::playback::{PlaybackController, PlaybackEngine, PlayerCommand};
use linkbio_ap::state::{SharedState, EVENT_BUS_CAPACITY};
use linkbio_common::events::EventBus;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::load(&args).context("Failed to load configuration")?;

    // RUST_LOG wins over the config file's level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "linkbio_ap={level},linkbio_common={level},tower_http=info",
                    level = settings.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting linkbio Audio Player v{} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH")
    );

    let (media_tx, media_rx) = mpsc::unbounded_channel();

    match settings.backend {
        BackendKind::Device => match DeviceBackend::new(&settings.audio, media_tx.clone()) {
            Ok(backend) => serve(backend, media_rx, &settings).await,
            Err(e) => {
                warn!("Audio device unavailable ({}), falling back to simulated backend", e);
                let backend = SimulatedBackend::new(media_tx, Some(settings.simulated_track))?;
                serve(backend, media_rx, &settings).await
            }
        },
        BackendKind::Simulated => {
            let backend = SimulatedBackend::new(media_tx, Some(settings.simulated_track))?;
            serve(backend, media_rx, &settings).await
        }
    }
}

async fn serve<B>(
    backend: B,
    media_rx: mpsc::UnboundedReceiver<MediaEvent>,
    settings: &Settings,
) -> Result<()>
where
    B: MediaBackend + Send + 'static,
{
    let playlist = settings.playlist().context("No tracks configured")?;
    info!("Playlist: {} tracks", playlist.len());

    let events = Arc::new(EventBus::new(EVENT_BUS_CAPACITY));
    let shared = Arc::new(SharedState::with_bus(Arc::clone(&events)));

    let controller = PlaybackController::new(
        backend,
        playlist.clone(),
        settings.transition.clone(),
        settings.volume,
        events,
    )
    .context("Failed to initialize playback controller")?;

    let (engine, handle) = PlaybackEngine::new(
        controller,
        media_rx,
        Arc::clone(&shared),
        settings.transition.steps_per_second,
        settings.position_interval,
    );
    let engine_task = engine.spawn();

    if settings.autoplay {
        info!("Autoplay enabled");
        handle.send(PlayerCommand::Play).await?;
    }

    let app = api::create_router(AppState {
        engine: handle.clone(),
        shared,
        playlist: Arc::new(playlist),
    });

    let addr = settings.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if handle.send(PlayerCommand::Shutdown).await.is_err() {
        warn!("Playback engine already stopped");
    }
    if let Err(e) = engine_task.await {
        error!("Playback engine task failed: {}", e);
    }

    info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
