use crossbeam_channel::Receiver;
use log::debug;

use super::{
    CaptureFrame, FrequencyDomainAnalyzer, FrequencyDomainFeatures, TimeDomainAnalyzer,
    TimeDomainFeatures,
};
use crate::config::VisualizerSettings;
use crate::visual::{VisualStyle, WaveformPath, WaveformRenderer};

/// Everything the UI needs to draw one frame.
#[derive(Debug, Clone, Default)]
pub struct VisualFrame {
    pub timestamp: f32,
    pub time: TimeDomainFeatures,
    pub spectrum: FrequencyDomainFeatures,
    pub path: WaveformPath,
    /// Beats detected across every frame drained by the `poll` that returned
    /// this one, this frame included.
    pub beats_since_last_poll: u32,
}

/// Runs the analyzers and the renderer for one audio stream.
///
/// Owns the stream's `TimeDomainAnalyzer`, so the beat baseline follows this
/// driver and nothing else. Create one driver per stream.
pub struct VisualizerDriver {
    time_analyzer: TimeDomainAnalyzer,
    frequency_analyzer: FrequencyDomainAnalyzer,
    renderer: WaveformRenderer,
    style: VisualStyle,
    width: f32,
    height: f32,
    frames_processed: u64,
}

impl VisualizerDriver {
    pub fn new(settings: &VisualizerSettings, width: f32, height: f32) -> Self {
        Self {
            time_analyzer: TimeDomainAnalyzer::with_sensitivity(settings.beat_sensitivity),
            frequency_analyzer: FrequencyDomainAnalyzer::new(),
            renderer: WaveformRenderer::with_resample_method(settings.resample_method),
            style: settings.visual_style,
            width,
            height,
            frames_processed: 0,
        }
    }

    pub fn style(&self) -> VisualStyle {
        self.style
    }

    pub fn set_style(&mut self, style: VisualStyle) {
        self.style = style;
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Start over on a new stream: the beat baseline is dropped.
    pub fn reset_stream(&mut self) {
        self.time_analyzer.reset();
        self.frames_processed = 0;
    }

    pub fn process(&mut self, frame: &CaptureFrame) -> VisualFrame {
        let time = self.time_analyzer.analyze(&frame.waveform);
        let spectrum = self.frequency_analyzer.analyze(&frame.fft, frame.sample_rate);
        let path = self
            .renderer
            .to_path(&frame.waveform, self.width, self.height, self.style);

        self.frames_processed += 1;
        if time.is_beat {
            debug!(
                "Beat at {:.2}s (energy {:.1}, bass {:.1})",
                frame.timestamp, time.energy, spectrum.bass
            );
        }

        VisualFrame {
            timestamp: frame.timestamp,
            beats_since_last_poll: u32::from(time.is_beat),
            time,
            spectrum,
            path,
        }
    }

    /// Analyze every pending frame in arrival order and return the newest.
    ///
    /// Older frames still pass through the time-domain analyzer so beat
    /// detection sees the whole stream. The returned features belong to the
    /// newest frame only; beats from skipped frames are counted in
    /// `beats_since_last_poll`.
    pub fn poll(&mut self, receiver: &Receiver<CaptureFrame>) -> Option<VisualFrame> {
        let mut latest: Option<VisualFrame> = None;
        let mut beats = 0;

        while let Ok(frame) = receiver.try_recv() {
            let visual = self.process(&frame);
            beats += visual.beats_since_last_poll;
            latest = Some(visual);
        }

        latest.map(|mut visual| {
            visual.beats_since_last_poll = beats;
            visual
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(level: i8, len: usize) -> CaptureFrame {
        CaptureFrame {
            waveform: vec![level; len],
            fft: vec![0; len],
            sample_rate: 44_100,
            timestamp: 0.0,
        }
    }

    #[test]
    fn test_process_runs_all_components() {
        let mut driver = VisualizerDriver::new(&VisualizerSettings::default(), 690.0, 200.0);
        let visual = driver.process(&frame(10, 256));

        assert_eq!(visual.time.peak, 10);
        assert_eq!(visual.spectrum.magnitudes.len(), 127);
        assert!(!visual.path.is_empty());
        assert_eq!(driver.frames_processed(), 1);
    }

    #[test]
    fn test_beat_baseline_is_per_driver() {
        let settings = VisualizerSettings::default();
        let mut first = VisualizerDriver::new(&settings, 100.0, 100.0);
        let mut second = VisualizerDriver::new(&settings, 100.0, 100.0);

        first.process(&frame(10, 64));
        second.process(&frame(50, 64));

        assert!(first.process(&frame(30, 64)).time.is_beat);
        assert!(!second.process(&frame(30, 64)).time.is_beat);
    }

    #[test]
    fn test_reset_stream() {
        let mut driver = VisualizerDriver::new(&VisualizerSettings::default(), 100.0, 100.0);
        driver.process(&frame(10, 64));
        driver.reset_stream();

        assert_eq!(driver.frames_processed(), 0);
        assert!(!driver.process(&frame(100, 64)).time.is_beat);
    }

    #[test]
    fn test_style_switch() {
        let mut driver = VisualizerDriver::new(&VisualizerSettings::default(), 100.0, 100.0);
        driver.set_style(VisualStyle::Circular);
        let visual = driver.process(&frame(5, 16));
        let points = visual.path.points();
        assert_eq!(points.first(), points.last());

        driver.resize(0.0, 100.0);
        assert!(driver.process(&frame(5, 16)).path.is_empty());
    }

    #[test]
    fn test_poll_keeps_latest_and_counts_beats() {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let mut driver = VisualizerDriver::new(&VisualizerSettings::default(), 100.0, 100.0);

        assert!(driver.poll(&receiver).is_none());

        sender.send(frame(10, 64)).unwrap();
        sender.send(frame(40, 64)).unwrap();
        sender.send(frame(41, 64)).unwrap();

        let visual = driver.poll(&receiver).unwrap();
        assert_eq!(visual.time.peak, 41);
        // the jump happened on the middle frame; the newest frame keeps its own flag
        assert!(!visual.time.is_beat);
        assert_eq!(visual.beats_since_last_poll, 1);
        assert_eq!(driver.frames_processed(), 3);
    }

    #[test]
    fn test_poll_counts_every_coalesced_beat() {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let mut driver = VisualizerDriver::new(&VisualizerSettings::default(), 100.0, 100.0);

        for level in [5, 20, 80] {
            sender.send(frame(level, 64)).unwrap();
        }
        let visual = driver.poll(&receiver).unwrap();
        assert!(visual.time.is_beat);
        assert_eq!(visual.time.peak, 80);
        assert_eq!(visual.beats_since_last_poll, 2);

        sender.send(frame(80, 64)).unwrap();
        let visual = driver.poll(&receiver).unwrap();
        assert_eq!(visual.beats_since_last_poll, 0);
    }
}
