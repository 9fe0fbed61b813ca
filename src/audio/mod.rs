pub mod capture;
pub mod driver;
pub mod frequency_domain;
pub mod playback;
pub mod time_domain;
pub mod timeline;

pub use capture::{CaptureFeed, CaptureFrame, CaptureRate, CaptureSource};
pub use driver::{VisualFrame, VisualizerDriver};
pub use frequency_domain::{FrequencyDomainAnalyzer, FrequencyDomainFeatures};
pub use playback::AudioPlayback;
pub use time_domain::{TimeDomainAnalyzer, TimeDomainFeatures};
pub use timeline::{Timeline, TimelineFrame, TimelineStatistics};
