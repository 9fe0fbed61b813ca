use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::Path;

use pulsedeck::audio::{CaptureRate, CaptureSource, Timeline};
use pulsedeck::visual::{VisualStyle, WaveformRenderer};
use pulsedeck::VisualizerSettings;

#[derive(Parser)]
#[command(name = "pulsedeck-audio-analyzer")]
#[command(about = "Analyze a whole track offline into a synchronized feature timeline")]
struct Args {
    /// Audio file to analyze (WAV, MP3, FLAC, OGG, M4A)
    #[arg()]
    audio_file: String,

    /// Output JSON file path
    #[arg(long, short, default_value = "timeline.json")]
    output: String,

    /// Settings file supplying capture size and beat sensitivity
    #[arg(long, default_value = "visualizer_settings.json")]
    settings: String,

    /// Override the capture rate: normal or high
    #[arg(long)]
    rate: Option<CaptureRate>,

    /// Also render the loudest frame in every style as SVG files with this prefix
    #[arg(long)]
    svg_prefix: Option<String>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let settings = VisualizerSettings::load_or_default(&args.settings)?;
    let rate = args.rate.unwrap_or(settings.capture_rate);

    info!("PulseDeck audio analyzer");
    info!("Input file: {}", args.audio_file);
    info!(
        "Capture: {:?} ({:.0} fps), {} samples per frame",
        rate,
        rate.frames_per_second(),
        settings.capture_size
    );

    let source = CaptureSource::load_file(&args.audio_file, settings.capture_size)?;
    let name = Path::new(&args.audio_file)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| args.audio_file.clone());

    let timeline = Timeline::build(&name, &source, rate, settings.beat_sensitivity);
    let stats = &timeline.statistics;

    info!("=== TIMELINE ===");
    info!("Duration: {:.2} seconds", timeline.source.duration_seconds);
    info!("Frames: {} at {:.0} fps", stats.total_frames, timeline.source.frame_rate);
    info!("Beats: {} ({:.1} per minute)", stats.total_beats, stats.beat_rate);
    info!("Peak energy: {:.1}", stats.peak_energy);
    info!(
        "Peak bands: bass {:.1}, mid {:.1}, treble {:.1}",
        stats.peak_bass, stats.peak_mid, stats.peak_treble
    );
    info!("Average centroid: {:.1} Hz", stats.average_centroid);
    info!("Dominant band: {}", stats.dominant_band);

    timeline.save_json(&args.output)?;
    let size = std::fs::metadata(&args.output)?.len();
    info!("Timeline saved to {} ({:.1} KB)", args.output, size as f64 / 1024.0);

    if let Some(prefix) = &args.svg_prefix {
        let renderer = WaveformRenderer::with_resample_method(settings.resample_method);
        write_loudest_frame(&source, &timeline, renderer, prefix)?;
    }

    Ok(())
}

fn write_loudest_frame(
    source: &CaptureSource,
    timeline: &Timeline,
    renderer: WaveformRenderer,
    prefix: &str,
) -> Result<()> {
    let Some(loudest) = timeline
        .frames
        .iter()
        .max_by(|a, b| a.energy.total_cmp(&b.energy))
    else {
        info!("No frames to render");
        return Ok(());
    };

    let capture = source.frame_at(loudest.timestamp);
    let (width, height) = (1080.0, 640.0);
    for style in [VisualStyle::CenterLine, VisualStyle::BottomBar, VisualStyle::Circular] {
        let path = renderer.to_path(&capture.waveform, width, height, style);
        let file = format!("{}-{}.svg", prefix, style.as_str());
        std::fs::write(&file, path.to_svg_document(width, height))?;
        info!("Rendered frame at {:.2}s to {}", loudest.timestamp, file);
    }

    Ok(())
}
