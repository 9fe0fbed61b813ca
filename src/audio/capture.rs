use anyhow::Result;
use crossbeam_channel::{Receiver, TrySendError};
use log::{debug, info};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Capture size used when none is configured, in samples.
pub const DEFAULT_CAPTURE_SIZE: usize = 1024;

const FEED_CAPACITY: usize = 8;

/// How often the capture source delivers frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureRate {
    #[default]
    Normal,
    High,
}

impl CaptureRate {
    pub fn frames_per_second(&self) -> f32 {
        match self {
            CaptureRate::Normal => 20.0,
            CaptureRate::High => 60.0,
        }
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.frames_per_second())
    }
}

impl FromStr for CaptureRate {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(CaptureRate::Normal),
            "high" => Ok(CaptureRate::High),
            other => Err(anyhow::anyhow!("Unknown capture rate: {}", other)),
        }
    }
}

/// One captured frame: the raw waveform and its packed spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureFrame {
    /// Signed 8-bit amplitude samples
    pub waveform: Vec<i8>,
    /// Interleaved FFT bytes: `[Re0, Re(N/2), Re1, Im1, ...]`
    pub fft: Vec<i8>,
    pub sample_rate: u32,
    /// Position of the first sample, seconds
    pub timestamp: f32,
}

impl CaptureFrame {
    pub fn silent(capture_size: usize, sample_rate: u32, timestamp: f32) -> Self {
        Self {
            waveform: vec![0; capture_size],
            fft: vec![0; capture_size],
            sample_rate,
            timestamp,
        }
    }
}

/// Decoded mono audio that can be sliced into capture frames on demand.
///
/// Frames mimic a device visualizer tap: samples are quantised to signed
/// bytes and the spectrum is computed from those bytes, scaled so that a
/// full-scale sine lands near 127 in its bin.
pub struct CaptureSource {
    samples: Vec<f32>,
    sample_rate: u32,
    capture_size: usize,
    fft: Arc<dyn Fft<f32>>,
}

impl CaptureSource {
    /// `capture_size` is rounded down to an even count of at least 2.
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32, capture_size: usize) -> Self {
        let capture_size = capture_size.max(2) & !1;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(capture_size);

        Self {
            samples,
            sample_rate,
            capture_size,
            fft,
        }
    }

    /// Decode an audio file and mix it down to mono.
    pub fn load_file<P: AsRef<Path>>(path: P, capture_size: usize) -> Result<Self> {
        use rodio::{Decoder, Source};
        use std::fs::File;
        use std::io::BufReader;

        let file = BufReader::new(File::open(&path)?);
        let source = Decoder::new(file)?;

        let sample_rate = source.sample_rate();
        let channels = source.channels().max(1) as usize;
        let samples: Vec<i16> = source.convert_samples().collect();

        let mono = samples
            .chunks_exact(channels)
            .map(|chunk| {
                let sum: f32 = chunk.iter().map(|&s| s as f32 / 32768.0).sum();
                sum / channels as f32
            })
            .collect::<Vec<f32>>();

        info!(
            "Loaded capture source {:?} ({}Hz, {} channels, {} samples)",
            path.as_ref(),
            sample_rate,
            channels,
            mono.len()
        );

        Ok(Self::from_samples(mono, sample_rate, capture_size))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn capture_size(&self) -> usize {
        self.capture_size
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_seconds(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Frames needed to cover the whole source at `rate`.
    pub fn frame_count(&self, rate: CaptureRate) -> usize {
        (self.duration_seconds() * rate.frames_per_second()).ceil() as usize
    }

    pub fn frame(&self, index: usize, rate: CaptureRate) -> CaptureFrame {
        self.frame_at(index as f32 / rate.frames_per_second())
    }

    /// Capture the window starting at `seconds`. Past the end the window is
    /// zero padded.
    pub fn frame_at(&self, seconds: f32) -> CaptureFrame {
        let seconds = seconds.max(0.0);
        let start = (seconds * self.sample_rate as f32) as usize;
        if start >= self.samples.len() {
            return CaptureFrame::silent(self.capture_size, self.sample_rate, seconds);
        }

        let end = (start + self.capture_size).min(self.samples.len());
        let mut waveform: Vec<i8> = self.samples[start..end]
            .iter()
            .map(|&s| quantize(s))
            .collect();
        waveform.resize(self.capture_size, 0);

        let fft = self.pack_spectrum(&waveform);

        CaptureFrame {
            waveform,
            fft,
            sample_rate: self.sample_rate,
            timestamp: seconds,
        }
    }

    fn pack_spectrum(&self, waveform: &[i8]) -> Vec<i8> {
        let n = self.capture_size;
        let mut buffer: Vec<Complex<f32>> = waveform
            .iter()
            .map(|&s| Complex::new(s as f32, 0.0))
            .collect();

        self.fft.process(&mut buffer);

        let scale = 2.0 / n as f32;
        let mut packed = vec![0i8; n];
        packed[0] = saturate(buffer[0].re * scale);
        packed[1] = saturate(buffer[n / 2].re * scale);
        for k in 1..n / 2 {
            packed[2 * k] = saturate(buffer[k].re * scale);
            packed[2 * k + 1] = saturate(buffer[k].im * scale);
        }
        packed
    }
}

fn quantize(sample: f32) -> i8 {
    (sample.clamp(-1.0, 1.0) * 127.0).round() as i8
}

fn saturate(value: f32) -> i8 {
    value.round().clamp(i8::MIN as f32, i8::MAX as f32) as i8
}

/// Delivers capture frames from a worker thread at a fixed rate.
///
/// Frames are dropped, not queued, when the consumer falls behind by more
/// than a few frames.
pub struct CaptureFeed {
    receiver: Receiver<CaptureFrame>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CaptureFeed {
    pub fn spawn(source: Arc<CaptureSource>, rate: CaptureRate) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(FEED_CAPACITY);
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = Arc::clone(&stop);

        let frame_count = source.frame_count(rate);
        let interval = rate.frame_interval();
        info!(
            "Starting capture feed: {} frames at {:.0} fps",
            frame_count,
            rate.frames_per_second()
        );

        let handle = thread::spawn(move || {
            let started = Instant::now();
            let mut delivered = 0usize;

            for index in 0..frame_count {
                if worker_stop.load(Ordering::Relaxed) {
                    break;
                }

                let due = started + interval * index as u32;
                let now = Instant::now();
                if due > now {
                    thread::sleep(due - now);
                }

                match sender.try_send(source.frame(index, rate)) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => debug!("Capture feed full, dropping frame {}", index),
                    Err(TrySendError::Disconnected(_)) => break,
                }
            }

            info!("Capture feed finished after {} frames", delivered);
        });

        Self {
            receiver,
            stop,
            handle: Some(handle),
        }
    }

    pub fn receiver(&self) -> &Receiver<CaptureFrame> {
        &self.receiver
    }

    /// True once the worker has delivered its last frame.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |handle| handle.is_finished())
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CaptureFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    fn sine(freq: f32, sample_rate: u32, len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (TAU * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_frame_sizes() {
        let source = CaptureSource::from_samples(sine(440.0, 44_100, 44_100, 0.8), 44_100, 1024);
        let frame = source.frame_at(0.5);

        assert_eq!(frame.waveform.len(), 1024);
        assert_eq!(frame.fft.len(), 1024);
        assert_eq!(frame.sample_rate, 44_100);
    }

    #[test]
    fn test_capture_size_is_even() {
        let source = CaptureSource::from_samples(vec![0.0; 100], 8_000, 301);
        assert_eq!(source.capture_size(), 300);

        let tiny = CaptureSource::from_samples(vec![0.0; 100], 8_000, 0);
        assert_eq!(tiny.capture_size(), 2);
    }

    #[test]
    fn test_past_end_is_silent() {
        let source = CaptureSource::from_samples(vec![0.5; 1000], 1_000, 256);
        let frame = source.frame_at(5.0);
        assert!(frame.waveform.iter().all(|&s| s == 0));
        assert!(frame.fft.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_tail_is_zero_padded() {
        let source = CaptureSource::from_samples(vec![1.0; 100], 160, 64);
        // starts at sample 80, leaving 20 real samples
        let frame = source.frame_at(0.5);
        assert_eq!(&frame.waveform[..20], &[127i8; 20][..]);
        assert!(frame.waveform[20..].iter().all(|&s| s == 0));
    }

    #[test]
    fn test_quantization() {
        assert_eq!(quantize(1.0), 127);
        assert_eq!(quantize(-1.0), -127);
        assert_eq!(quantize(3.0), 127);
        assert_eq!(quantize(0.0), 0);
    }

    #[test]
    fn test_dc_lands_in_first_byte() {
        let source = CaptureSource::from_samples(vec![0.25; 512], 8_000, 256);
        let frame = source.frame_at(0.0);

        // 32 * 256 * 2 / 256 = 64
        assert_eq!(frame.fft[0], 64);
        assert!(frame.fft[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_sine_peaks_in_its_bin() {
        let n = 512;
        let sample_rate = 8_000;
        let bin = 32;
        let freq = bin as f32 * sample_rate as f32 / n as f32;
        let source = CaptureSource::from_samples(sine(freq, sample_rate, n, 1.0), sample_rate, n);
        let frame = source.frame_at(0.0);

        let magnitude = |k: usize| {
            let re = frame.fft[2 * k] as f32;
            let im = frame.fft[2 * k + 1] as f32;
            (re * re + im * im).sqrt()
        };
        let strongest = (1..n / 2)
            .max_by(|&a, &b| magnitude(a).total_cmp(&magnitude(b)))
            .unwrap();

        assert_eq!(strongest, bin);
        assert!(magnitude(bin) > 120.0);
    }

    #[test]
    fn test_frame_count_and_rates() {
        let source = CaptureSource::from_samples(vec![0.0; 44_100], 44_100, 1024);
        assert_eq!(source.frame_count(CaptureRate::Normal), 20);
        assert_eq!(source.frame_count(CaptureRate::High), 60);
        assert!(CaptureRate::High.frame_interval() < CaptureRate::Normal.frame_interval());
        assert_eq!("HIGH".parse::<CaptureRate>().unwrap(), CaptureRate::High);
        assert!("turbo".parse::<CaptureRate>().is_err());
    }

    #[test]
    fn test_zero_sample_rate_source() {
        let source = CaptureSource::from_samples(vec![0.5; 64], 0, 32);
        assert_eq!(source.duration_seconds(), 0.0);
        assert_eq!(source.frame_count(CaptureRate::High), 0);
    }

    #[test]
    fn test_feed_delivers_frames() {
        let source = Arc::new(CaptureSource::from_samples(vec![0.1; 4_000], 8_000, 128));
        let mut feed = CaptureFeed::spawn(Arc::clone(&source), CaptureRate::High);

        // 0.5s at 60 fps -> 30 frames
        let first = feed
            .receiver()
            .recv_timeout(Duration::from_secs(2))
            .unwrap();
        assert_eq!(first.waveform.len(), 128);
        assert_eq!(first.timestamp, 0.0);

        feed.stop();
        assert!(feed.is_finished());
    }
}
