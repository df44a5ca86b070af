//! Media outputs rendered to a real audio device
//!
//! `open` starts a background load (http(s) fetch or local read, then
//! decode and resample off the async threads). Loaded voices are summed by
//! the [`Mixer`] inside the cpal callback, each scaled by its own gain.

use super::{MediaBackend, MediaEvent, MediaEventKind, MediaHandle};
use crate::audio::{AudioOutput, Resampler, SimpleDecoder, DEFAULT_SAMPLE_RATE, OUTPUT_CHANNELS};
use crate::error::{Error, Result};
use linkbio_common::config::AudioConfig;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

/// Position reports per second of rendered audio
const REPORTS_PER_SECOND: u32 = 4;

#[derive(Debug)]
struct Voice {
    url: String,
    /// Interleaved stereo at the mixer rate; `None` while loading
    samples: Option<Arc<Vec<f32>>>,
    cursor: usize,
    last_report: usize,
    playing: bool,
    volume: f32,
}

impl Voice {
    fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            samples: None,
            cursor: 0,
            last_report: 0,
            playing: false,
            volume: 1.0,
        }
    }

    fn frames(&self) -> usize {
        self.samples.as_ref().map_or(0, |s| s.len() / OUTPUT_CHANNELS)
    }
}

/// Sums all playing voices into the output buffer
#[derive(Clone)]
pub struct Mixer {
    voices: Arc<Mutex<HashMap<MediaHandle, Voice>>>,
    events: UnboundedSender<MediaEvent>,
    sample_rate: Arc<AtomicU32>,
}

impl Mixer {
    pub fn new(events: UnboundedSender<MediaEvent>, sample_rate: u32) -> Self {
        Self {
            voices: Arc::new(Mutex::new(HashMap::new())),
            events,
            sample_rate: Arc::new(AtomicU32::new(sample_rate)),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Relaxed)
    }

    fn set_sample_rate(&self, rate: u32) {
        self.sample_rate.store(rate, Ordering::Relaxed);
    }

    fn frames_to_duration(&self, frames: usize) -> Duration {
        Duration::from_secs_f64(frames as f64 / self.sample_rate().max(1) as f64)
    }

    fn send(&self, handle: MediaHandle, kind: MediaEventKind) {
        let _ = self.events.send(MediaEvent::new(handle, kind));
    }

    fn with_voice<T>(&self, handle: MediaHandle, f: impl FnOnce(&mut Voice) -> T) -> Result<T> {
        let mut voices = self
            .voices
            .lock()
            .map_err(|_| Error::Media("mixer poisoned".to_string()))?;
        let voice = voices
            .get_mut(&handle)
            .ok_or_else(|| Error::Media(format!("unknown handle {}", handle)))?;
        Ok(f(voice))
    }

    pub fn insert(&self, handle: MediaHandle, url: &str) -> Result<()> {
        self.voices
            .lock()
            .map_err(|_| Error::Media("mixer poisoned".to_string()))?
            .insert(handle, Voice::new(url));
        Ok(())
    }

    pub fn remove(&self, handle: MediaHandle) -> Result<()> {
        let removed = self
            .voices
            .lock()
            .map_err(|_| Error::Media("mixer poisoned".to_string()))?
            .remove(&handle);
        match removed {
            Some(voice) => {
                debug!("Released {} ({})", handle, voice.url);
                Ok(())
            }
            None => Err(Error::Media(format!("unknown handle {}", handle))),
        }
    }

    /// Start rendering a voice; a voice that already ran out restarts from 0
    pub fn play(&self, handle: MediaHandle) -> Result<()> {
        self.with_voice(handle, |v| {
            if v.samples.is_some() && v.cursor >= v.frames() {
                v.cursor = 0;
                v.last_report = 0;
            }
            v.playing = true;
        })
    }

    pub fn pause(&self, handle: MediaHandle) -> Result<()> {
        self.with_voice(handle, |v| v.playing = false)
    }

    pub fn set_volume(&self, handle: MediaHandle, volume: f32) -> Result<()> {
        self.with_voice(handle, |v| v.volume = volume.clamp(0.0, 1.0))
    }

    /// Attach decoded samples (or the load failure) to a voice
    ///
    /// Voices closed while loading are ignored.
    pub fn finish_loading(&self, handle: MediaHandle, result: Result<Vec<f32>>) {
        match result {
            Ok(samples) => {
                let samples = Arc::new(samples);
                let loaded = self.with_voice(handle, |v| {
                    v.samples = Some(samples);
                    v.frames()
                });
                match loaded {
                    Ok(frames) => {
                        let duration = self.frames_to_duration(frames);
                        debug!("{} loaded: {:?}", handle, duration);
                        self.send(handle, MediaEventKind::MetadataLoaded { duration: Some(duration) });
                    }
                    Err(_) => debug!("{} closed before it finished loading", handle),
                }
            }
            Err(e) => {
                error!("Failed to load {}: {}", handle, e);
                self.send(handle, MediaEventKind::Error { message: e.to_string() });
            }
        }
    }

    /// Fill `out` (interleaved stereo, pre-zeroed) from all playing voices
    pub fn render(&self, out: &mut [f32]) {
        let Ok(mut voices) = self.voices.lock() else {
            return;
        };
        let report_every = (self.sample_rate() / REPORTS_PER_SECOND).max(1) as usize;
        let mut notes = Vec::new();

        for (&handle, voice) in voices.iter_mut().filter(|(_, v)| v.playing) {
            let Some(samples) = voice.samples.clone() else {
                continue;
            };
            let total = samples.len() / OUTPUT_CHANNELS;

            for frame in out.chunks_exact_mut(OUTPUT_CHANNELS) {
                if voice.cursor >= total {
                    break;
                }
                let i = voice.cursor * OUTPUT_CHANNELS;
                frame[0] += samples[i] * voice.volume;
                frame[1] += samples[i + 1] * voice.volume;
                voice.cursor += 1;
            }

            let finished = voice.cursor >= total;
            if finished || voice.cursor - voice.last_report >= report_every {
                voice.last_report = voice.cursor;
                notes.push((handle, MediaEventKind::TimeUpdate {
                    position: self.frames_to_duration(voice.cursor),
                }));
            }
            if finished {
                voice.playing = false;
                notes.push((handle, MediaEventKind::Ended));
            }
        }
        drop(voices);

        for (handle, kind) in notes {
            self.send(handle, kind);
        }
    }
}

/// [`MediaBackend`] backed by symphonia decoding and a cpal stream
pub struct DeviceBackend {
    mixer: Mixer,
    client: reqwest::Client,
    runtime: Handle,
    next_handle: u64,
    // Dropped last: stops the stream after voices are gone
    _output: AudioOutput,
}

impl DeviceBackend {
    /// Open the configured device and start rendering silence
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: &AudioConfig, events: UnboundedSender<MediaEvent>) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::AudioOutput(format!("device backend needs a tokio runtime: {}", e)))?;

        let mixer = Mixer::new(events, DEFAULT_SAMPLE_RATE);
        let render_mixer = mixer.clone();
        let output = AudioOutput::start(config.device.clone(), config.buffer_size, move |out| {
            render_mixer.render(out)
        })?;
        mixer.set_sample_rate(output.sample_rate());

        info!("Device media backend ready at {}Hz", output.sample_rate());

        Ok(Self {
            mixer,
            client: reqwest::Client::new(),
            runtime,
            next_handle: 1,
            _output: output,
        })
    }
}

impl MediaBackend for DeviceBackend {
    fn open(&mut self, url: &str) -> Result<MediaHandle> {
        let handle = MediaHandle(self.next_handle);
        self.next_handle += 1;
        self.mixer.insert(handle, url)?;

        let mixer = self.mixer.clone();
        let client = self.client.clone();
        let url = url.to_string();
        debug!("Loading {} from {}", handle, url);

        self.runtime.spawn(async move {
            let result = load_track(&client, &url, mixer.sample_rate()).await;
            mixer.finish_loading(handle, result);
        });
        Ok(handle)
    }

    fn play(&mut self, handle: MediaHandle) -> Result<()> {
        self.mixer.play(handle)
    }

    fn pause(&mut self, handle: MediaHandle) -> Result<()> {
        self.mixer.pause(handle)
    }

    fn seek(&mut self, handle: MediaHandle, position: Duration) -> Result<()> {
        let rate = self.mixer.sample_rate() as f64;
        self.mixer.with_voice(handle, |v| {
            let frame = (position.as_secs_f64() * rate) as usize;
            v.cursor = frame.min(v.frames());
            v.last_report = v.cursor;
        })
    }

    fn set_volume(&mut self, handle: MediaHandle, volume: f32) -> Result<()> {
        self.mixer.set_volume(handle, volume)
    }

    fn close(&mut self, handle: MediaHandle) -> Result<()> {
        self.mixer.remove(handle)
    }
}

/// Fetch, decode and resample one track to `sample_rate`
async fn load_track(client: &reqwest::Client, url: &str, sample_rate: u32) -> Result<Vec<f32>> {
    let bytes = fetch(client, url).await?;
    let extension = extension_hint(url);

    tokio::task::spawn_blocking(move || {
        let decoded = SimpleDecoder::decode_bytes(bytes, extension.as_deref())?;
        Resampler::resample(
            &decoded.samples,
            decoded.sample_rate,
            sample_rate,
            OUTPUT_CHANNELS as u16,
        )
    })
    .await
    .map_err(|e| Error::Decode(format!("Decode task failed: {}", e)))?
}

async fn fetch(client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    if url.starts_with("http://") || url.starts_with("https://") {
        let response = client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Media(format!("Failed to fetch {}: {}", url, e)))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Media(format!("Failed to read {}: {}", url, e)))?;
        return Ok(bytes.to_vec());
    }

    let path = url.strip_prefix("file://").unwrap_or(url);
    tokio::fs::read(path).await.map_err(|e| {
        warn!("Cannot read {}: {}", path, e);
        Error::Media(format!("Failed to read {}: {}", path, e))
    })
}

/// File extension of the last path segment, ignoring query and fragment
fn extension_hint(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file = path.rsplit('/').next()?;
    let (_, ext) = file.rsplit_once('.')?;
    (!ext.is_empty()).then(|| ext.to_ascii_lowercase())
}
