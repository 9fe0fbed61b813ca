use criterion::{black_box, criterion_group, criterion_main, Criterion};

use pulsedeck::audio::{CaptureSource, FrequencyDomainAnalyzer, TimeDomainAnalyzer};
use pulsedeck::visual::{resample, ResampleMethod, VisualStyle, WaveformRenderer, BAR_COUNT};

fn capture_frame() -> (Vec<i8>, Vec<i8>) {
    let samples: Vec<f32> = (0..4096)
        .map(|i| {
            let t = i as f32 / 44_100.0;
            0.6 * (t * 110.0 * std::f32::consts::TAU).sin() + 0.2 * (t * 3_300.0 * std::f32::consts::TAU).sin()
        })
        .collect();
    let frame = CaptureSource::from_samples(samples, 44_100, 1024).frame_at(0.0);
    (frame.waveform, frame.fft)
}

fn bench_analyzers(c: &mut Criterion) {
    let (waveform, fft) = capture_frame();

    c.bench_function("time_domain_1024", |b| {
        let mut analyzer = TimeDomainAnalyzer::new();
        b.iter(|| analyzer.analyze(black_box(&waveform)))
    });

    c.bench_function("frequency_domain_1024", |b| {
        let analyzer = FrequencyDomainAnalyzer::new();
        b.iter(|| analyzer.analyze(black_box(&fft), 44_100))
    });
}

fn bench_renderer(c: &mut Criterion) {
    let (waveform, _) = capture_frame();
    let renderer = WaveformRenderer::new();

    for style in [VisualStyle::CenterLine, VisualStyle::BottomBar, VisualStyle::Circular] {
        c.bench_function(&format!("path_{}", style.as_str()), |b| {
            b.iter(|| renderer.to_path(black_box(&waveform), 1080.0, 640.0, style))
        });
    }

    c.bench_function("resample_mode_1024_to_69", |b| {
        b.iter(|| resample(black_box(&waveform), BAR_COUNT, ResampleMethod::Mode))
    });
}

criterion_group!(benches, bench_analyzers, bench_renderer);
criterion_main!(benches);
