pub mod audio;
pub mod config;
pub mod library;
pub mod visual;

pub use audio::{
    CaptureFrame, CaptureRate, CaptureSource, FrequencyDomainAnalyzer, FrequencyDomainFeatures,
    TimeDomainAnalyzer, TimeDomainFeatures, VisualFrame, VisualizerDriver,
};
pub use config::VisualizerSettings;
pub use visual::{ResampleMethod, VisualStyle, WaveformPath, WaveformRenderer};
