//! Audio pipeline for the device backend
//!
//! fetch -> [`decoder`] (symphonia) -> [`resampler`] (rubato) -> mixer -> [`output`] (cpal)

pub mod decoder;
pub mod output;
pub mod resampler;

pub use decoder::{DecodedAudio, SimpleDecoder, OUTPUT_CHANNELS};
pub use output::{AudioOutput, StreamInfo};
pub use resampler::{Resampler, DEFAULT_SAMPLE_RATE};
