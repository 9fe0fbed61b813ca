pub mod waveform;

pub use waveform::{
    bipolar, resample, unipolar, PathCommand, ResampleMethod, VisualStyle, WaveformPath,
    WaveformRenderer, BAR_COUNT,
};
