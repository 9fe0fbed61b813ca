/// Upper edge of the bass band (exclusive), Hz.
pub const BASS_CUTOFF_HZ: f32 = 250.0;
/// Upper edge of the mid band (inclusive), Hz.
pub const MID_CUTOFF_HZ: f32 = 2000.0;
/// Bass band average above which a frame counts as bass-heavy.
pub const BASS_HIT_LEVEL: f32 = 90.0;

/// Spectral features of one capture frame.
///
/// Band values are plain means of raw bin magnitudes, so they share the
/// units of the capture source's FFT bytes rather than a 0.0-1.0 range. Only
/// `normalized_centroid` is normalized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequencyDomainFeatures {
    /// Per-bin magnitudes, DC/Nyquist pair excluded
    pub magnitudes: Vec<f32>,
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    /// Magnitude-weighted mean frequency in Hz
    pub spectral_centroid: f32,
    /// `spectral_centroid` over the Nyquist frequency, 0.0-1.0
    pub normalized_centroid: f32,
}

impl FrequencyDomainFeatures {
    pub fn is_bass(&self) -> bool {
        self.bass > BASS_HIT_LEVEL
    }
}

/// Band energies and spectral centroid from an interleaved FFT capture.
///
/// The capture buffer holds `[Re0, Re(N/2), Re1, Im1, Re2, Im2, ...]` as
/// signed bytes. The first pair (DC and Nyquist real parts) is skipped and
/// every following (re, im) pair becomes one magnitude. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrequencyDomainAnalyzer;

impl FrequencyDomainAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, spectrum: &[i8], sample_rate: u32) -> FrequencyDomainFeatures {
        if spectrum.len() < 4 {
            return FrequencyDomainFeatures::default();
        }

        let magnitudes = Self::magnitudes(spectrum);
        let num_bins = spectrum.len() / 2;
        let nyquist = sample_rate as f32 / 2.0;
        let bin_hz = if num_bins > 0 {
            nyquist / num_bins as f32
        } else {
            0.0
        };

        let mut sums = [0.0f32; 3];
        let mut counts = [0usize; 3];
        for (index, &magnitude) in magnitudes.iter().enumerate() {
            let band = Self::band_of(index as f32 * bin_hz);
            sums[band] += magnitude;
            counts[band] += 1;
        }
        let average = |band: usize| {
            if counts[band] > 0 {
                sums[band] / counts[band] as f32
            } else {
                0.0
            }
        };

        let spectral_centroid = Self::centroid(&magnitudes, bin_hz);
        let normalized_centroid = if nyquist > 0.0 {
            (spectral_centroid / nyquist).clamp(0.0, 1.0)
        } else {
            0.0
        };

        FrequencyDomainFeatures {
            bass: average(0),
            mid: average(1),
            treble: average(2),
            spectral_centroid,
            normalized_centroid,
            magnitudes,
        }
    }

    fn magnitudes(spectrum: &[i8]) -> Vec<f32> {
        spectrum[2..]
            .chunks_exact(2)
            .map(|pair| {
                let re = pair[0] as f32;
                let im = pair[1] as f32;
                (re * re + im * im).sqrt()
            })
            .collect()
    }

    fn band_of(frequency: f32) -> usize {
        if frequency < BASS_CUTOFF_HZ {
            0
        } else if frequency <= MID_CUTOFF_HZ {
            1
        } else {
            2
        }
    }

    fn centroid(magnitudes: &[f32], bin_hz: f32) -> f32 {
        let magnitude_sum: f32 = magnitudes.iter().sum();
        if magnitude_sum <= 0.0 {
            return 0.0;
        }

        let weighted_sum: f32 = magnitudes
            .iter()
            .enumerate()
            .map(|(i, &magnitude)| i as f32 * bin_hz * magnitude)
            .sum();

        weighted_sum / magnitude_sum
    }
}
