//! Sample rate conversion using rubato
//!
//! Decoded tracks are converted once, at load time, to the output device
//! rate so the mixer can sum voices frame by frame.

use crate::error::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

/// Rate used when no output device dictates one
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Frames fed to rubato per call
const CHUNK_FRAMES: usize = 4096;

pub struct Resampler;

impl Resampler {
    /// Convert interleaved `input` from `input_rate` to `output_rate`
    ///
    /// Returns a copy when the rates already match.
    pub fn resample(input: &[f32], input_rate: u32, output_rate: u32, channels: u16) -> Result<Vec<f32>> {
        if input_rate == output_rate || input.is_empty() {
            return Ok(input.to_vec());
        }
        if input_rate == 0 || output_rate == 0 || channels == 0 {
            return Err(Error::Decode(format!(
                "Cannot resample {}Hz -> {}Hz with {} channels",
                input_rate, output_rate, channels
            )));
        }

        debug!("Resampling {}Hz -> {}Hz ({} channels)", input_rate, output_rate, channels);

        let planar = Self::deinterleave(input, channels);
        let total_frames = planar[0].len();
        let mut resampler = FastFixedIn::<f32>::new(
            output_rate as f64 / input_rate as f64,
            1.0,
            PolynomialDegree::Septic,
            CHUNK_FRAMES,
            channels as usize,
        )
        .map_err(|e| Error::Decode(format!("Failed to create resampler: {}", e)))?;

        let mut output: Vec<Vec<f32>> = vec![Vec::new(); channels as usize];
        let mut offset = 0;
        while offset < total_frames {
            let end = (offset + CHUNK_FRAMES).min(total_frames);
            let chunk: Vec<&[f32]> = planar.iter().map(|ch| &ch[offset..end]).collect();

            let processed = if end - offset == CHUNK_FRAMES {
                resampler.process(&chunk, None)
            } else {
                resampler.process_partial(Some(&chunk), None)
            }
            .map_err(|e| Error::Decode(format!("Resampling failed: {}", e)))?;

            for (out, ch) in output.iter_mut().zip(processed) {
                out.extend(ch);
            }
            offset = end;
        }

        let expected = (total_frames as f64 * output_rate as f64 / input_rate as f64).ceil() as usize;

        // Input ending on a chunk boundary leaves rubato's delay line unflushed
        if output[0].len() < expected {
            let tail = resampler
                .process_partial(None::<&[Vec<f32>]>, None)
                .map_err(|e| Error::Decode(format!("Resampling failed: {}", e)))?;
            for (out, ch) in output.iter_mut().zip(tail) {
                out.extend(ch);
            }
        }

        // Zero padding overshoots the real length
        for ch in output.iter_mut() {
            ch.truncate(expected);
        }

        let interleaved = Self::interleave(output);
        debug!(
            "Resampled {} frames to {} frames",
            total_frames,
            interleaved.len() / channels as usize
        );
        Ok(interleaved)
    }

    /// `[L, R, L, R]` -> `[[L, L], [R, R]]`
    fn deinterleave(samples: &[f32], channels: u16) -> Vec<Vec<f32>> {
        let channels = channels as usize;
        let frames = samples.len() / channels;
        let mut planar = vec![Vec::with_capacity(frames); channels];
        for frame in samples.chunks_exact(channels) {
            for (ch, &s) in planar.iter_mut().zip(frame) {
                ch.push(s);
            }
        }
        planar
    }

    /// `[[L, L], [R, R]]` -> `[L, R, L, R]`
    fn interleave(planar: Vec<Vec<f32>>) -> Vec<f32> {
        let Some(frames) = planar.iter().map(Vec::len).min() else {
            return Vec::new();
        };
        let mut interleaved = Vec::with_capacity(frames * planar.len());
        for i in 0..frames {
            for ch in &planar {
                interleaved.push(ch[i]);
            }
        }
        interleaved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deinterleave() {
        let planar = Resampler::deinterleave(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2);
        assert_eq!(planar, vec![vec![1.0, 3.0, 5.0], vec![2.0, 4.0, 6.0]]);
    }

    #[test]
    fn test_interleave() {
        let interleaved = Resampler::interleave(vec![vec![1.0, 3.0], vec![2.0, 4.0]]);
        assert_eq!(interleaved, vec![1.0, 2.0, 3.0, 4.0]);
        assert!(Resampler::interleave(Vec::new()).is_empty());
    }

    #[test]
    fn test_same_rate_is_copy() {
        let input = vec![0.1, 0.2, 0.3, 0.4];
        assert_eq!(Resampler::resample(&input, 48000, 48000, 2).unwrap(), input);
    }

    #[test]
    fn test_downsample_length() {
        let input_rate = 48000;
        let frames = 10_000;
        let mut input = Vec::with_capacity(frames * 2);
        for i in 0..frames {
            let t = i as f32 / input_rate as f32;
            let s = (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5;
            input.push(s);
            input.push(s);
        }

        let output = Resampler::resample(&input, input_rate, 44100, 2).unwrap();
        let expected = frames as f64 * 44100.0 / input_rate as f64;
        let actual = (output.len() / 2) as f64;
        // rubato adds a short delay line at the start
        assert!((actual - expected).abs() < 600.0, "expected ~{}, got {}", expected, actual);
    }

    #[test]
    fn test_chunk_aligned_input_keeps_tail() {
        let frames = CHUNK_FRAMES * 3;
        let input = vec![0.25f32; frames * 2];

        let output = Resampler::resample(&input, 48000, 44100, 2).unwrap();

        let expected = (frames as f64 * 44100.0 / 48000.0).ceil() as usize;
        assert_eq!(output.len(), expected * 2);
    }
}
