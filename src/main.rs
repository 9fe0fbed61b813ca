use anyhow::Result;
use clap::Parser;
use log::{debug, info};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pulsedeck::audio::{AudioPlayback, CaptureFeed, CaptureRate, CaptureSource};
use pulsedeck::visual::VisualStyle;
use pulsedeck::{VisualFrame, VisualizerDriver, VisualizerSettings};

#[derive(Parser)]
#[command(name = "pulsedeck")]
#[command(about = "Play a local track and drive the visualizer from its audio")]
struct Args {
    /// Audio file to play (WAV, MP3, FLAC, OGG, M4A)
    #[arg()]
    audio_file: String,

    /// Settings file (created with defaults by --save-settings)
    #[arg(long, default_value = "visualizer_settings.json")]
    settings: String,

    /// Override the visual style: center-line, bottom-bar or circular
    #[arg(long)]
    style: Option<VisualStyle>,

    /// Override the capture rate: normal or high
    #[arg(long)]
    rate: Option<CaptureRate>,

    /// Canvas width
    #[arg(long, default_value = "1080")]
    width: f32,

    /// Canvas height
    #[arg(long, default_value = "640")]
    height: f32,

    /// Write the last rendered path to this SVG file
    #[arg(long)]
    svg: Option<String>,

    /// Analyze in real time without opening an output device
    #[arg(long)]
    silent: bool,

    /// Store the effective settings back to the settings file
    #[arg(long)]
    save_settings: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut settings = VisualizerSettings::load_or_default(&args.settings)?;
    if let Some(style) = args.style {
        settings.visual_style = style;
    }
    if let Some(rate) = args.rate {
        settings.capture_rate = rate;
    }
    settings.validate()?;
    if args.save_settings {
        settings.save(&args.settings)?;
    }

    info!("Starting PulseDeck visualizer");
    info!(
        "Style: {}, capture: {:?} ({} samples), beat sensitivity: {}",
        settings.visual_style.as_str(),
        settings.capture_rate,
        settings.capture_size,
        settings.beat_sensitivity
    );

    let source = Arc::new(CaptureSource::load_file(&args.audio_file, settings.capture_size)?);
    info!("Track length: {:.1}s", source.duration_seconds());

    let mut playback = if args.silent {
        None
    } else {
        let mut playback = AudioPlayback::new()?;
        playback.load_file(&args.audio_file)?;
        Some(playback)
    };

    let mut driver = VisualizerDriver::new(&settings, args.width, args.height);
    let mut feed = CaptureFeed::spawn(Arc::clone(&source), settings.capture_rate);
    if let Some(playback) = playback.as_mut() {
        playback.play();
    }

    let poll_interval = settings.capture_rate.frame_interval() / 2;
    let mut last_frame: Option<VisualFrame> = None;
    let mut beats = 0u32;

    loop {
        if let Some(frame) = driver.poll(feed.receiver()) {
            report(&frame);
            beats += frame.beats_since_last_poll;
            last_frame = Some(frame);
        }

        if feed.is_finished() && feed.receiver().is_empty() {
            break;
        }
        thread::sleep(poll_interval);
    }
    feed.stop();

    if let Some(playback) = playback.as_ref() {
        while !playback.is_finished() {
            thread::sleep(Duration::from_millis(50));
        }
        info!("Played {:.1}s", playback.position().as_secs_f32());
    }

    if let (Some(path), Some(frame)) = (&args.svg, &last_frame) {
        std::fs::write(path, frame.path.to_svg_document(args.width, args.height))?;
        info!("Wrote last {} path to {}", driver.style().as_str(), path);
    }

    info!(
        "Done: {} frames analyzed, {} beats",
        driver.frames_processed(),
        beats
    );

    Ok(())
}

fn report(frame: &VisualFrame) {
    let time = &frame.time;
    let spectrum = &frame.spectrum;

    if frame.beats_since_last_poll > 0 {
        info!(
            "{:7.2}s BEAT x{} energy {:7.1} peak {:3} bass {:5.1}{}",
            frame.timestamp,
            frame.beats_since_last_poll,
            time.energy,
            time.peak,
            spectrum.bass,
            if spectrum.is_bass() { " (bass hit)" } else { "" }
        );
    }

    debug!(
        "{:7.2}s rms {:5.1} zcr {:.2} disturbance {:.2} | bass {:5.1} mid {:5.1} treble {:5.1} | centroid {:7.1}Hz ({:.2})",
        frame.timestamp,
        time.rms,
        time.zero_crossing_rate,
        time.normalized_disturbance(),
        spectrum.bass,
        spectrum.mid,
        spectrum.treble,
        spectrum.spectral_centroid,
        spectrum.normalized_centroid
    );
}
