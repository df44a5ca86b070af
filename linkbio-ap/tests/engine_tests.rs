//! Engine task driven end to end by the simulated backend
//!
//! Runs on tokio's paused clock so multi-second tracks finish instantly.

mod helpers;

use helpers::{crossfade_settings, playlist};
use linkbio_ap::media::{MediaBackend, MediaHandle, SimulatedBackend};
use linkbio_ap::playback::{
    EngineHandle, PlaybackController, PlaybackEngine, PlaybackSnapshot, PlayerCommand,
    TransitionSettings, VolumeState,
};
use linkbio_ap::state::SharedState;
use linkbio_ap::{Error, Result};
use std::cell::Cell;
use std::marker::PhantomData;
use linkbio_common::events::PlayerEvent;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

struct Running {
    handle: EngineHandle,
    shared: Arc<SharedState>,
    task: JoinHandle<()>,
}

fn start(track: Duration, settings: TransitionSettings) -> Running {
    let (media_tx, media_rx) = mpsc::unbounded_channel();
    let backend = SimulatedBackend::new(media_tx, Some(track)).unwrap();
    let shared = Arc::new(SharedState::new());

    let controller = PlaybackController::new(
        backend,
        playlist(3),
        settings.clone(),
        VolumeState::new(50, false),
        Arc::clone(shared.event_bus()),
    )
    .unwrap();
    let (engine, handle) = PlaybackEngine::new(
        controller,
        media_rx,
        Arc::clone(&shared),
        settings.steps_per_second,
        Duration::from_millis(1000),
    );

    Running {
        handle,
        shared,
        task: engine.spawn(),
    }
}

async fn snapshot(shared: &SharedState) -> PlaybackSnapshot {
    for _ in 0..100 {
        if let Some(s) = shared.snapshot().await {
            return s;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("engine never published a snapshot");
}

async fn wait_for<F>(rx: &mut broadcast::Receiver<PlayerEvent>, mut pred: F) -> PlayerEvent
where
    F: FnMut(&PlayerEvent) -> bool,
{
    timeout(Duration::from_secs(600), async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(e) => panic!("event bus closed: {}", e),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

#[tokio::test(start_paused = true)]
async fn test_play_publishes_progress() {
    let engine = start(Duration::from_secs(180), crossfade_settings());
    let mut rx = engine.shared.subscribe_events();

    engine.handle.send(PlayerCommand::Play).await.unwrap();
    wait_for(&mut rx, |e| {
        matches!(e, PlayerEvent::PlaybackPosition { position_ms, .. } if *position_ms >= 2000)
    })
    .await;

    let s = snapshot(&engine.shared).await;
    assert!(s.is_playing);
    assert_eq!(s.current_index, 0);
    assert!(s.progress_percent > 0.0);
    assert_eq!(s.duration_secs, Some(180.0));
}

#[tokio::test(start_paused = true)]
async fn test_track_end_crossfades_to_next_track() {
    let engine = start(Duration::from_secs(3), crossfade_settings());
    let mut rx = engine.shared.subscribe_events();

    engine.handle.send(PlayerCommand::Play).await.unwrap();
    wait_for(&mut rx, |e| {
        matches!(e, PlayerEvent::CrossfadeStarted { from_index: 0, to_index: 1, .. })
    })
    .await;
    wait_for(&mut rx, |e| matches!(e, PlayerEvent::CrossfadeCompleted { index: 1, .. })).await;

    // Let the engine publish after the completing frame
    sleep(Duration::from_millis(50)).await;
    let s = snapshot(&engine.shared).await;
    assert_eq!(s.current_index, 1);
    assert!(!s.crossfading);
    assert!(s.is_playing);
}

#[tokio::test(start_paused = true)]
async fn test_commands_update_snapshot() {
    let engine = start(Duration::from_secs(100), crossfade_settings());
    let mut rx = engine.shared.subscribe_events();

    engine.handle.send(PlayerCommand::SlideVolume(0)).await.unwrap();
    wait_for(&mut rx, |e| matches!(e, PlayerEvent::VolumeChanged { .. })).await;
    sleep(Duration::from_millis(10)).await;
    let s = snapshot(&engine.shared).await;
    assert!(s.is_muted);
    assert_eq!(s.effective_volume, 0.0);

    // Paused skip is an immediate rebind
    engine.handle.send(PlayerCommand::Previous).await.unwrap();
    wait_for(&mut rx, |e| matches!(e, PlayerEvent::TrackChanged { index: 2, .. })).await;
    // Metadata for the new output has to land before the seek is meaningful
    sleep(Duration::from_millis(10)).await;

    engine.handle.send(PlayerCommand::Seek(40.0)).await.unwrap();
    sleep(Duration::from_millis(50)).await;
    let s = snapshot(&engine.shared).await;
    assert_eq!(s.current_index, 2);
    assert_eq!(s.progress_percent, 40.0);
    assert!(!s.is_playing);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_engine() {
    let engine = start(Duration::from_secs(100), crossfade_settings());
    engine.handle.send(PlayerCommand::Shutdown).await.unwrap();
    engine.task.await.unwrap();

    assert!(!engine.handle.is_running());
    let err = engine.handle.send(PlayerCommand::Play).await.unwrap_err();
    assert!(matches!(err, Error::EngineUnavailable(_)));
    assert_eq!(snapshot(&engine.shared).await.slot_state, linkbio_ap::playback::SlotState::Idle);
}

/// Backend that may move between threads but is not `Sync`
struct Unshared {
    inner: SimulatedBackend,
    _not_sync: PhantomData<Cell<()>>,
}

impl MediaBackend for Unshared {
    fn open(&mut self, url: &str) -> Result<MediaHandle> {
        self.inner.open(url)
    }

    fn play(&mut self, handle: MediaHandle) -> Result<()> {
        self.inner.play(handle)
    }

    fn pause(&mut self, handle: MediaHandle) -> Result<()> {
        self.inner.pause(handle)
    }

    fn seek(&mut self, handle: MediaHandle, position: Duration) -> Result<()> {
        self.inner.seek(handle, position)
    }

    fn set_volume(&mut self, handle: MediaHandle, volume: f32) -> Result<()> {
        self.inner.set_volume(handle, volume)
    }

    fn close(&mut self, handle: MediaHandle) -> Result<()> {
        self.inner.close(handle)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_engine_spawns_with_send_only_backend() {
    let (media_tx, media_rx) = mpsc::unbounded_channel();
    let backend = Unshared {
        inner: SimulatedBackend::new(media_tx, Some(Duration::from_secs(60))).unwrap(),
        _not_sync: PhantomData,
    };
    let shared = Arc::new(SharedState::new());
    let settings = crossfade_settings();
    let controller = PlaybackController::new(
        backend,
        playlist(2),
        settings.clone(),
        VolumeState::default(),
        Arc::clone(shared.event_bus()),
    )
    .unwrap();
    let (engine, handle) = PlaybackEngine::new(
        controller,
        media_rx,
        Arc::clone(&shared),
        settings.steps_per_second,
        Duration::from_millis(100),
    );
    let task = engine.spawn();

    handle.send(PlayerCommand::Play).await.unwrap();
    handle.send(PlayerCommand::Shutdown).await.unwrap();
    timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    assert_eq!(snapshot(&shared).await.current_index, 0);
}
