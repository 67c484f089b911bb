use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};

use duocert::export::{ArtifactBackend, ExportEngine, ExportOptions, PngBackend};
use duocert::platform::NoopImageFetcher;
use duocert::rendering::fonts::FontBook;
use duocert::rendering::render;
use duocert::stage::Stage;
use duocert::{Course, UserStats, ViewportClass};

fn stats() -> UserStats {
    let mut stats = UserStats::named("bench");
    stats.streak = Some(365);
    stats.total_xp = 123_456;
    stats.courses = ["fr", "it", "es", "de", "ja"]
        .iter()
        .enumerate()
        .map(|(i, code)| Course {
            title: format!("Course {}", i),
            learning_language_code: Some(code.to_string()),
            xp: 1000 * i as i64,
        })
        .collect();
    stats
}

fn bench_layout(c: &mut Criterion) {
    let stats = stats();
    c.bench_function("render_wide", |b| {
        b.iter(|| render(&stats, ViewportClass::Wide).unwrap())
    });
    c.bench_function("render_and_paint_compact", |b| {
        b.iter(|| render(&stats, ViewportClass::Compact).unwrap().paint())
    });
}

fn bench_capture(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    let mut stage = Stage::new(Arc::new(NoopImageFetcher), FontBook::empty(), ViewportClass::Wide);
    let handle = rt.block_on(async { stage.mount(&stats()).unwrap() });
    let engine = ExportEngine::new(ExportOptions::default());
    let capture = rt.block_on(engine.capture(&handle)).unwrap();

    c.bench_function("capture_2x", |b| {
        b.iter(|| rt.block_on(engine.capture(&handle)).unwrap())
    });
    c.bench_function("assemble_png", |b| b.iter(|| PngBackend.assemble(&capture).unwrap()));
    #[cfg(feature = "pdf")]
    c.bench_function("assemble_pdf", |b| {
        b.iter(|| duocert::export::PdfBackend.assemble(&capture).unwrap())
    });
}

criterion_group!(benches, bench_layout, bench_capture);
criterion_main!(benches);
