//! Playback engine task
//!
//! Runs the [`PlaybackController`] on a single tokio task. User commands,
//! backend media events, the frame timer and the position timer are
//! multiplexed with `select!`, so the controller never sees two inputs at
//! once. After every step the engine publishes a fresh snapshot to
//! [`SharedState`].

use crate::error::{Error, Result};
use crate::media::{MediaBackend, MediaEvent};
use crate::playback::controller::PlaybackController;
use crate::playback::scheduler::{FrameClock, FrameTask};
use crate::state::SharedState;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Commands accepted by the engine
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    Play,
    Pause,
    Toggle,
    Next,
    Previous,
    /// Percent of the active track, clamped to `[0, 100]`
    Seek(f64),
    SetVolume(u8),
    /// Slider semantics: 0 mutes, non-zero unmutes
    SlideVolume(u8),
    SetMuted(bool),
    Shutdown,
}

/// Command queue depth
const COMMAND_CAPACITY: usize = 64;

/// Cloneable sender side of the engine
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<PlayerCommand>,
}

impl EngineHandle {
    pub async fn send(&self, command: PlayerCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Error::EngineUnavailable("playback engine has stopped".to_string()))
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }
}

pub struct PlaybackEngine<B: MediaBackend> {
    controller: PlaybackController<B>,
    commands: mpsc::Receiver<PlayerCommand>,
    media_events: mpsc::UnboundedReceiver<MediaEvent>,
    shared: Arc<SharedState>,
    clock: FrameClock,
    position_interval: Duration,
}

impl<B: MediaBackend + Send + 'static> PlaybackEngine<B> {
    /// `media_events` must be the receiver paired with the backend's sender
    pub fn new(
        controller: PlaybackController<B>,
        media_events: mpsc::UnboundedReceiver<MediaEvent>,
        shared: Arc<SharedState>,
        steps_per_second: u32,
        position_interval: Duration,
    ) -> (Self, EngineHandle) {
        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        let engine = Self {
            controller,
            commands: rx,
            media_events,
            shared,
            clock: FrameClock::new(steps_per_second),
            position_interval: position_interval.max(Duration::from_millis(1)),
        };
        (engine, EngineHandle { commands: tx })
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Process inputs until `Shutdown` or until every handle is dropped
    pub async fn run(mut self) {
        info!(
            "Playback engine started (frame period {:?}, position interval {:?})",
            self.clock.period(),
            self.position_interval
        );

        let mut frame_timer = interval(self.clock.period());
        frame_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut position_timer = interval(self.position_interval);
        position_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.publish().await;

        loop {
            let had_frames = self.controller.needs_frames();

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(PlayerCommand::Shutdown) | None => break,
                    Some(command) => self.apply(command),
                },
                Some(event) = self.media_events.recv() => {
                    self.controller.handle_media_event(event);
                }
                now = frame_timer.tick(), if had_frames => {
                    let elapsed = self.clock.elapsed(now.into_std());
                    if self.controller.tick(elapsed).is_done() {
                        self.clock.stop();
                    }
                }
                _ = position_timer.tick() => {
                    if self.controller.is_playing() {
                        self.controller.emit_position();
                    }
                }
            }

            // Time-driven work just began: measure frames from here
            if !had_frames && self.controller.needs_frames() {
                self.clock.restart(tokio::time::Instant::now().into_std());
                frame_timer.reset();
            }

            self.publish().await;
        }

        self.controller.dispose();
        self.publish().await;
        info!("Playback engine stopped");
    }

    fn apply(&mut self, command: PlayerCommand) {
        debug!("Command: {:?}", command);
        match command {
            PlayerCommand::Play => self.controller.play(),
            PlayerCommand::Pause => self.controller.pause(),
            PlayerCommand::Toggle => self.controller.toggle(),
            PlayerCommand::Next => self.controller.next(),
            PlayerCommand::Previous => self.controller.previous(),
            PlayerCommand::Seek(percent) => self.controller.seek(percent),
            PlayerCommand::SetVolume(percent) => self.controller.set_volume(percent),
            PlayerCommand::SlideVolume(percent) => self.controller.slide_volume(percent),
            PlayerCommand::SetMuted(muted) => self.controller.set_muted(muted),
            PlayerCommand::Shutdown => {}
        }
    }

    /// Snapshot now; only the `SharedState` borrow crosses the await, so
    /// the task stays `Send` for any `Send` backend
    fn publish(&self) -> impl Future<Output = ()> + Send + 'static {
        let snapshot = self.controller.snapshot();
        let shared = Arc::clone(&self.shared);
        async move { shared.publish(snapshot).await }
    }
}
