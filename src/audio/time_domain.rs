/// Energy ratio above which a frame counts as a beat.
pub const DEFAULT_BEAT_SENSITIVITY: f32 = 1.5;

const DISTURBANCE_PEAK_WEIGHT: f32 = 0.05;
const DISTURBANCE_FULL_SCALE: f32 = 12.0;

/// Loudness and transient features of one capture frame.
///
/// Produced fresh for every frame by `TimeDomainAnalyzer`. An empty capture
/// buffer yields `TimeDomainFeatures::default()` (all zero, no beat).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimeDomainFeatures {
    /// Mean squared amplitude (raw signed-byte units, >= 0)
    pub energy: f32,
    /// Square root of `energy`
    pub rms: f32,
    /// Largest absolute sample, 0-127
    pub peak: u8,
    /// Fraction of adjacent sample pairs that change sign, 0.0-1.0
    pub zero_crossing_rate: f32,
    pub is_beat: bool,
}

impl TimeDomainFeatures {
    /// Combined roughness measure: `rms * zcr + peak * 0.05`.
    pub fn disturbance(&self) -> f32 {
        self.rms * self.zero_crossing_rate + self.peak as f32 * DISTURBANCE_PEAK_WEIGHT
    }

    /// `disturbance()` mapped onto 0.0-1.0.
    pub fn normalized_disturbance(&self) -> f32 {
        (self.disturbance() / DISTURBANCE_FULL_SCALE).clamp(0.0, 1.0)
    }
}

/// Time-domain analyzer for signed 8-bit capture buffers.
///
/// Keeps the energy of the last non-empty frame so it can flag sudden jumps
/// as beats. One instance belongs to one audio stream; call `reset` when the
/// stream changes.
#[derive(Debug, Clone)]
pub struct TimeDomainAnalyzer {
    beat_sensitivity: f32,
    last_energy: f32,
}

impl TimeDomainAnalyzer {
    pub fn new() -> Self {
        Self::with_sensitivity(DEFAULT_BEAT_SENSITIVITY)
    }

    pub fn with_sensitivity(beat_sensitivity: f32) -> Self {
        Self {
            beat_sensitivity,
            last_energy: 0.0,
        }
    }

    pub fn beat_sensitivity(&self) -> f32 {
        self.beat_sensitivity
    }

    /// Energy of the previous non-empty frame, 0.0 before the first one.
    pub fn last_energy(&self) -> f32 {
        self.last_energy
    }

    /// Forget the beat baseline.
    pub fn reset(&mut self) {
        self.last_energy = 0.0;
    }

    pub fn analyze(&mut self, buffer: &[i8]) -> TimeDomainFeatures {
        if buffer.is_empty() {
            return TimeDomainFeatures::default();
        }

        let sum_of_squares: i64 = buffer.iter().map(|&s| i64::from(s) * i64::from(s)).sum();
        let energy = (sum_of_squares as f64 / buffer.len() as f64) as f32;
        let rms = energy.sqrt();

        let peak = buffer
            .iter()
            .map(|&s| s.unsigned_abs())
            .max()
            .unwrap_or(0)
            .min(i8::MAX as u8);

        let crossings = buffer
            .windows(2)
            .filter(|pair| (pair[0] > 0 && pair[1] < 0) || (pair[0] < 0 && pair[1] > 0))
            .count();
        let zero_crossing_rate = if buffer.len() > 1 {
            crossings as f32 / (buffer.len() - 1) as f32
        } else {
            0.0
        };

        let is_beat = self.last_energy > 0.0 && energy / self.last_energy > self.beat_sensitivity;
        self.last_energy = energy;

        TimeDomainFeatures {
            energy,
            rms,
            peak,
            zero_crossing_rate,
            is_beat,
        }
    }
}

impl Default for TimeDomainAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
