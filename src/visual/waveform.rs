use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use std::fmt::Write as _;
use std::str::FromStr;

/// Number of bars drawn by `VisualStyle::BottomBar`.
pub const BAR_COUNT: usize = 69;

const CIRCLE_BASE_FRACTION: f32 = 2.0 / 3.0;
const CIRCLE_BAND_FRACTION: f32 = 1.0 / 3.0;

/// Projection used to turn a capture buffer into geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VisualStyle {
    /// Oscilloscope trace around the vertical centre
    CenterLine,
    /// Decimated bars standing on the bottom edge
    #[default]
    BottomBar,
    /// Closed loop whose radius follows the signal
    Circular,
}

impl VisualStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisualStyle::CenterLine => "center-line",
            VisualStyle::BottomBar => "bottom-bar",
            VisualStyle::Circular => "circular",
        }
    }
}

impl FromStr for VisualStyle {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "center-line" | "center" | "line" => Ok(VisualStyle::CenterLine),
            "bottom-bar" | "bar" | "bars" => Ok(VisualStyle::BottomBar),
            "circular" | "circle" => Ok(VisualStyle::Circular),
            other => Err(anyhow::anyhow!("Unknown visual style: {}", other)),
        }
    }
}

/// How a decimation slot aggregates its source samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleMethod {
    /// Truncated arithmetic mean
    Mean,
    /// Most frequent exact value
    #[default]
    Mode,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo(Vec2),
    LineTo(Vec2),
    Close,
}

/// Renderable 2D path: an ordered list of move/line/close commands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaveformPath {
    commands: Vec<PathCommand>,
}

impl WaveformPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        self.commands.push(PathCommand::MoveTo(Vec2::new(x, y)));
    }

    pub fn line_to(&mut self, x: f32, y: f32) {
        self.commands.push(PathCommand::LineTo(Vec2::new(x, y)));
    }

    pub fn close(&mut self) {
        self.commands.push(PathCommand::Close);
    }

    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Every coordinate in drawing order (close commands carry none).
    pub fn points(&self) -> Vec<Vec2> {
        self.commands
            .iter()
            .filter_map(|command| match *command {
                PathCommand::MoveTo(p) | PathCommand::LineTo(p) => Some(p),
                PathCommand::Close => None,
            })
            .collect()
    }

    /// SVG `d` attribute for this path.
    pub fn to_svg_path_data(&self) -> String {
        let mut data = String::with_capacity(self.commands.len() * 16);
        for command in &self.commands {
            if !data.is_empty() {
                data.push(' ');
            }
            // writing into a String cannot fail
            let _ = match *command {
                PathCommand::MoveTo(p) => write!(data, "M{:.2} {:.2}", p.x, p.y),
                PathCommand::LineTo(p) => write!(data, "L{:.2} {:.2}", p.x, p.y),
                PathCommand::Close => write!(data, "Z"),
            };
        }
        data
    }

    /// Standalone SVG document drawing this path on a `width` x `height` canvas.
    pub fn to_svg_document(&self, width: f32, height: f32) -> String {
        format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\
             <path d=\"{d}\" fill=\"none\" stroke=\"black\" stroke-width=\"1\"/></svg>\n",
            w = width,
            h = height,
            d = self.to_svg_path_data()
        )
    }
}

/// Map a signed sample onto 0.0-1.0.
pub fn unipolar(sample: i8) -> f32 {
    (sample as f32 + 128.0) / 255.0
}

/// Map a signed sample onto -1.0..=1.0.
pub fn bipolar(sample: i8) -> f32 {
    sample as f32 / 128.0
}

/// Reduce `source` to exactly `target` samples.
///
/// Slot `i` aggregates `source[floor(i * step)..floor((i + 1) * step)]` with
/// `step = source.len() / target`. Sources that already fit are returned
/// unchanged; nothing is ever upsampled.
pub fn resample(source: &[i8], target: usize, method: ResampleMethod) -> Vec<i8> {
    if source.len() <= target {
        return source.to_vec();
    }
    if target == 0 {
        return Vec::new();
    }

    let len = source.len();

    // integer edges: floor(i * len / target) exactly, the last slot ends at len
    (0..target)
        .map(|i| {
            let start = i * len / target;
            let end = ((i + 1) * len / target).max(start + 1);
            let slot = &source[start..end];
            match method {
                ResampleMethod::Mean => mean(slot),
                ResampleMethod::Mode => mode(slot),
            }
        })
        .collect()
}

fn mean(slot: &[i8]) -> i8 {
    let sum: i32 = slot.iter().map(|&s| s as i32).sum();
    (sum / slot.len() as i32) as i8
}

fn mode(slot: &[i8]) -> i8 {
    let mut counts = [0u32; 256];
    let mut best = slot[0];
    let mut best_count = 0;

    for &sample in slot {
        let count = &mut counts[sample as u8 as usize];
        *count += 1;
        // strictly greater: the first value to reach a count keeps it
        if *count > best_count {
            best_count = *count;
            best = sample;
        }
    }

    best
}

/// Turns capture buffers into `WaveformPath` geometry. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct WaveformRenderer {
    resample_method: ResampleMethod,
}

impl WaveformRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resample_method(resample_method: ResampleMethod) -> Self {
        Self { resample_method }
    }

    pub fn resample_method(&self) -> ResampleMethod {
        self.resample_method
    }

    pub fn to_path(&self, buffer: &[i8], width: f32, height: f32, style: VisualStyle) -> WaveformPath {
        let degenerate = !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0;
        if buffer.is_empty() || degenerate {
            return WaveformPath::new();
        }

        match style {
            VisualStyle::CenterLine => Self::center_line(buffer, width, height),
            VisualStyle::BottomBar => self.bottom_bars(buffer, width, height),
            VisualStyle::Circular => Self::circle(buffer, width, height),
        }
    }

    fn center_line(buffer: &[i8], width: f32, height: f32) -> WaveformPath {
        let center_y = height / 2.0;
        let x_step = width / buffer.len() as f32;

        let mut path = WaveformPath::new();
        path.move_to(0.0, center_y);
        for (i, &sample) in buffer.iter().enumerate() {
            path.line_to(i as f32 * x_step, center_y - bipolar(sample) * center_y);
        }
        path.line_to(width, center_y);
        path
    }

    fn bottom_bars(&self, buffer: &[i8], width: f32, height: f32) -> WaveformPath {
        let bars = resample(buffer, BAR_COUNT, self.resample_method);
        let bar_width = width / BAR_COUNT as f32;

        let mut path = WaveformPath::new();
        for (i, &sample) in bars.iter().enumerate() {
            let left = i as f32 * bar_width;
            let right = left + bar_width;
            let top = height - unipolar(sample) * height;

            path.move_to(left, height);
            path.line_to(left, top);
            path.line_to(right, top);
            path.line_to(right, height);
            path.close();
        }
        path
    }

    fn circle(buffer: &[i8], width: f32, height: f32) -> WaveformPath {
        let center = Vec2::new(width / 2.0, height / 2.0);
        let half_extent = width.min(height) / 2.0;
        let base_radius = half_extent * CIRCLE_BASE_FRACTION;
        let band = half_extent * CIRCLE_BAND_FRACTION;
        let angle_step = TAU / buffer.len() as f32;

        let point = |i: usize, sample: i8| {
            let radius = base_radius + unipolar(sample) * band;
            let angle = i as f32 * angle_step;
            center + Vec2::new(angle.cos(), angle.sin()) * radius
        };

        let first = point(0, buffer[0]);
        let mut path = WaveformPath::new();
        path.move_to(first.x, first.y);
        for (i, &sample) in buffer.iter().enumerate().skip(1) {
            let p = point(i, sample);
            path.line_to(p.x, p.y);
        }
        path.line_to(first.x, first.y);
        path.close();
        path
    }
}
