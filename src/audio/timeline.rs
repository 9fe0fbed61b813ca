use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{
    CaptureRate, CaptureSource, FrequencyDomainAnalyzer, FrequencyDomainFeatures,
    TimeDomainAnalyzer, TimeDomainFeatures,
};

/// Pre-computed analysis for a whole track, looked up by playback time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeline {
    pub source: SourceInfo,
    pub frames: Vec<TimelineFrame>,
    pub statistics: TimelineStatistics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInfo {
    pub name: String,
    pub duration_seconds: f32,
    pub sample_rate: u32,
    pub capture_size: usize,
    pub frame_rate: f32,
}

/// Scalar features of one capture frame; magnitudes and geometry are not kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineFrame {
    /// Seconds from the start of the track
    pub timestamp: f32,

    pub energy: f32,
    pub rms: f32,
    pub peak: u8,
    pub zero_crossing_rate: f32,
    pub is_beat: bool,
    pub normalized_disturbance: f32,

    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    pub spectral_centroid: f32,
    pub normalized_centroid: f32,
}

impl TimelineFrame {
    fn new(timestamp: f32, time: &TimeDomainFeatures, spectrum: &FrequencyDomainFeatures) -> Self {
        Self {
            timestamp,
            energy: time.energy,
            rms: time.rms,
            peak: time.peak,
            zero_crossing_rate: time.zero_crossing_rate,
            is_beat: time.is_beat,
            normalized_disturbance: time.normalized_disturbance(),
            bass: spectrum.bass,
            mid: spectrum.mid,
            treble: spectrum.treble,
            spectral_centroid: spectrum.spectral_centroid,
            normalized_centroid: spectrum.normalized_centroid,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineStatistics {
    pub total_frames: usize,
    pub total_beats: u32,
    /// Beats per minute over the whole track
    pub beat_rate: f32,
    pub peak_energy: f32,
    pub peak_bass: f32,
    pub peak_mid: f32,
    pub peak_treble: f32,
    pub average_centroid: f32,
    /// "Bass-Heavy", "Treble-Focused", "Balanced" or "Silent"
    pub dominant_band: String,
}

impl Timeline {
    /// Analyze `source` frame by frame at `rate`.
    pub fn build(name: &str, source: &CaptureSource, rate: CaptureRate, beat_sensitivity: f32) -> Self {
        let mut time_analyzer = TimeDomainAnalyzer::with_sensitivity(beat_sensitivity);
        let frequency_analyzer = FrequencyDomainAnalyzer::new();

        let frame_count = source.frame_count(rate);
        let mut frames = Vec::with_capacity(frame_count);

        for index in 0..frame_count {
            let capture = source.frame(index, rate);
            let time = time_analyzer.analyze(&capture.waveform);
            let spectrum = frequency_analyzer.analyze(&capture.fft, capture.sample_rate);
            frames.push(TimelineFrame::new(capture.timestamp, &time, &spectrum));

            if frames.len() % 1000 == 0 {
                info!(
                    "Analyzed {} frames ({:.1}s of {:.1}s)",
                    frames.len(),
                    capture.timestamp,
                    source.duration_seconds()
                );
            }
        }

        let statistics = Self::summarize(&frames, source.duration_seconds());
        info!(
            "Timeline complete: {} frames, {} beats, {}",
            statistics.total_frames, statistics.total_beats, statistics.dominant_band
        );

        Self {
            source: SourceInfo {
                name: name.to_string(),
                duration_seconds: source.duration_seconds(),
                sample_rate: source.sample_rate(),
                capture_size: source.capture_size(),
                frame_rate: rate.frames_per_second(),
            },
            frames,
            statistics,
        }
    }

    /// The frame whose timestamp is the latest one not after `seconds`.
    pub fn frame_at(&self, seconds: f32) -> Option<&TimelineFrame> {
        let after = self.frames.partition_point(|frame| frame.timestamp <= seconds);
        after.checked_sub(1).map(|index| &self.frames[index])
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let timeline: Timeline = serde_json::from_str(&json)?;
        Ok(timeline)
    }

    fn summarize(frames: &[TimelineFrame], duration_seconds: f32) -> TimelineStatistics {
        let mut stats = TimelineStatistics {
            total_frames: frames.len(),
            dominant_band: "Silent".to_string(),
            ..TimelineStatistics::default()
        };
        if frames.is_empty() {
            return stats;
        }

        let mut centroid_sum = 0.0;
        let mut band_sums = [0.0f32; 3];
        for frame in frames {
            if frame.is_beat {
                stats.total_beats += 1;
            }
            stats.peak_energy = stats.peak_energy.max(frame.energy);
            stats.peak_bass = stats.peak_bass.max(frame.bass);
            stats.peak_mid = stats.peak_mid.max(frame.mid);
            stats.peak_treble = stats.peak_treble.max(frame.treble);
            centroid_sum += frame.spectral_centroid;
            band_sums[0] += frame.bass;
            band_sums[1] += frame.mid;
            band_sums[2] += frame.treble;
        }

        stats.average_centroid = centroid_sum / frames.len() as f32;
        if duration_seconds > 0.0 {
            stats.beat_rate = stats.total_beats as f32 * 60.0 / duration_seconds;
        }

        let [bass, mid, treble] = band_sums;
        stats.dominant_band = if bass + mid + treble == 0.0 {
            "Silent"
        } else if bass > mid && bass > treble {
            "Bass-Heavy"
        } else if treble > bass && treble > mid {
            "Treble-Focused"
        } else {
            "Balanced"
        }
        .to_string();

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Quiet noise-free tone with a loud burst every half second.
    fn pulsed(sample_rate: u32, seconds: f32) -> Vec<f32> {
        let len = (sample_rate as f32 * seconds) as usize;
        (0..len)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                let amplitude = if t % 0.5 < 0.05 { 0.9 } else { 0.1 };
                amplitude * (std::f32::consts::TAU * 110.0 * t).sin()
            })
            .collect()
    }

    #[test]
    fn test_build_covers_track() {
        let source = CaptureSource::from_samples(pulsed(8_000, 2.0), 8_000, 256);
        let timeline = Timeline::build("pulsed", &source, CaptureRate::Normal, 1.5);

        assert_eq!(timeline.frames.len(), 40);
        assert_eq!(timeline.statistics.total_frames, 40);
        assert_eq!(timeline.source.sample_rate, 8_000);
        assert!(timeline.statistics.total_beats >= 3);
        assert_eq!(timeline.statistics.dominant_band, "Bass-Heavy");
    }

    #[test]
    fn test_silent_track() {
        let source = CaptureSource::from_samples(vec![0.0; 8_000], 8_000, 256);
        let timeline = Timeline::build("silence", &source, CaptureRate::Normal, 1.5);

        assert_eq!(timeline.statistics.total_beats, 0);
        assert_eq!(timeline.statistics.peak_energy, 0.0);
        assert_eq!(timeline.statistics.dominant_band, "Silent");
    }

    #[test]
    fn test_empty_source() {
        let source = CaptureSource::from_samples(Vec::new(), 8_000, 256);
        let timeline = Timeline::build("empty", &source, CaptureRate::High, 1.5);
        assert!(timeline.frames.is_empty());
        assert!(timeline.frame_at(1.0).is_none());
    }

    #[test]
    fn test_frame_lookup() {
        let source = CaptureSource::from_samples(pulsed(8_000, 1.0), 8_000, 256);
        let timeline = Timeline::build("pulsed", &source, CaptureRate::Normal, 1.5);

        assert_eq!(timeline.frame_at(0.0).unwrap().timestamp, 0.0);
        assert_eq!(timeline.frame_at(0.12).unwrap().timestamp, 0.1);
        assert_eq!(timeline.frame_at(0.15).unwrap().timestamp, 0.15);
        assert_eq!(timeline.frame_at(30.0).unwrap().timestamp, timeline.frames.last().unwrap().timestamp);
        assert!(timeline.frame_at(-1.0).is_none());
    }

    #[test]
    fn test_json_persistence() {
        let source = CaptureSource::from_samples(pulsed(8_000, 0.5), 8_000, 128);
        let timeline = Timeline::build("short", &source, CaptureRate::Normal, 1.5);
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("timeline.json");

        timeline.save_json(&path).unwrap();
        let loaded = Timeline::load_json(&path).unwrap();

        assert_eq!(loaded.frames, timeline.frames);
        assert_eq!(loaded.statistics, timeline.statistics);
    }
}
