//! Audio output using cpal
//!
//! The cpal stream is not `Send` on every platform, so it is created and
//! kept alive on a dedicated thread. The owner only holds a shutdown
//! channel and the negotiated stream parameters.

use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::mpsc;
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

use super::resampler::DEFAULT_SAMPLE_RATE;

/// Negotiated output parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    pub device_name: String,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Running output stream
///
/// The render callback fills an interleaved stereo buffer; conversion to the
/// device's channel count and sample format happens here.
pub struct AudioOutput {
    info: StreamInfo,
    shutdown: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl AudioOutput {
    /// Open `device_name` (or the default device) and start rendering
    ///
    /// Falls back to the default device when the named one is missing.
    pub fn start<F>(device_name: Option<String>, buffer_size: Option<u32>, render: F) -> Result<Self>
    where
        F: FnMut(&mut [f32]) + Send + 'static,
    {
        let (ready_tx, ready_rx) = mpsc::channel::<Result<StreamInfo>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let thread = std::thread::Builder::new()
            .name("linkbio-audio-out".to_string())
            .spawn(move || {
                match open_stream(device_name, buffer_size, render) {
                    Ok((stream, info)) => {
                        let _ = ready_tx.send(Ok(info));
                        // Park until the owner drops us; the stream lives here
                        let _ = shutdown_rx.recv();
                        drop(stream);
                        debug!("Audio output thread exiting");
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
            })?;

        let info = ready_rx
            .recv()
            .map_err(|_| Error::AudioOutput("Audio output thread exited early".to_string()))??;

        info!(
            "Audio output started on '{}' ({}Hz, {} channels)",
            info.device_name, info.sample_rate, info.channels
        );

        Ok(Self {
            info,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.info.sample_rate
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        drop(self.shutdown.take());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Audio output thread panicked");
            }
        }
    }
}

fn select_device(device_name: Option<&str>) -> Result<Device> {
    let host = cpal::default_host();

    if let Some(name) = device_name {
        let mut devices = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?;
        if let Some(device) = devices.find(|d| d.name().ok().as_deref() == Some(name)) {
            return Ok(device);
        }
        warn!("Requested device '{}' not found, falling back to default device", name);
    }

    host.default_output_device()
        .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))
}

/// Prefer stereo f32 at 44.1kHz, otherwise whatever the device defaults to
fn best_config(device: &Device) -> Result<(StreamConfig, SampleFormat)> {
    let preferred = device
        .supported_output_configs()
        .map_err(|e| Error::AudioOutput(format!("Failed to get device configs: {}", e)))?
        .find(|c| {
            c.channels() == 2
                && c.min_sample_rate().0 <= DEFAULT_SAMPLE_RATE
                && c.max_sample_rate().0 >= DEFAULT_SAMPLE_RATE
                && c.sample_format() == SampleFormat::F32
        });

    if let Some(supported) = preferred {
        let format = supported.sample_format();
        return Ok((supported.with_sample_rate(cpal::SampleRate(DEFAULT_SAMPLE_RATE)).config(), format));
    }

    let supported = device
        .default_output_config()
        .map_err(|e| Error::AudioOutput(format!("Failed to get default config: {}", e)))?;
    Ok((supported.config(), supported.sample_format()))
}

fn open_stream<F>(
    device_name: Option<String>,
    buffer_size: Option<u32>,
    render: F,
) -> Result<(Stream, StreamInfo)>
where
    F: FnMut(&mut [f32]) + Send + 'static,
{
    let device = select_device(device_name.as_deref())?;
    let (mut config, format) = best_config(&device)?;
    if let Some(frames) = buffer_size {
        config.buffer_size = cpal::BufferSize::Fixed(frames);
    }

    debug!(
        "Audio config: sample_rate={}, channels={}, format={:?}, buffer_size={:?}",
        config.sample_rate.0, config.channels, format, config.buffer_size
    );

    let stream = match format {
        SampleFormat::F32 => build_stream::<f32, F>(&device, &config, render)?,
        SampleFormat::I16 => build_stream::<i16, F>(&device, &config, render)?,
        SampleFormat::U16 => build_stream::<u16, F>(&device, &config, render)?,
        other => {
            return Err(Error::AudioOutput(format!("Unsupported sample format: {:?}", other)));
        }
    };
    stream
        .play()
        .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;

    let info = StreamInfo {
        device_name: device.name().unwrap_or_else(|_| "Unknown".to_string()),
        sample_rate: config.sample_rate.0,
        channels: config.channels,
    };
    Ok((stream, info))
}

fn build_stream<T, F>(
    device: &Device,
    config: &StreamConfig,
    mut render: F,
) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
    F: FnMut(&mut [f32]) + Send + 'static,
{
    let channels = config.channels.max(1) as usize;
    let mut scratch: Vec<f32> = Vec::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels;
                scratch.clear();
                scratch.resize(frames * 2, 0.0);
                render(&mut scratch);
                write_frames(data, channels, &scratch);
            },
            move |err| error!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
}

/// Spread stereo frames over `channels` device channels
fn write_frames<T: SizedSample + FromSample<f32>>(data: &mut [T], channels: usize, stereo: &[f32]) {
    for (out, frame) in data.chunks_mut(channels).zip(stereo.chunks_exact(2)) {
        let (left, right) = (frame[0].clamp(-1.0, 1.0), frame[1].clamp(-1.0, 1.0));
        if channels == 1 {
            out[0] = T::from_sample((left + right) * 0.5);
            continue;
        }
        for (i, sample) in out.iter_mut().enumerate() {
            *sample = T::from_sample(match i {
                0 => left,
                1 => right,
                _ => 0.0,
            });
        }
    }
}
