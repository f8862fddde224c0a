use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use mindmap_wizard::config::{Config, LayoutConfig};
use mindmap_wizard::diagram::DiagramRenderer;
use mindmap_wizard::export::{ExportFormat, ExportPipeline};
use mindmap_wizard::layout::compute_layout;
use mindmap_wizard::normalize::{RawResponse, normalize};
use mindmap_wizard::render::render_content;
use mindmap_wizard::theme::Theme;
use mindmap_wizard::transform::transform;
use std::hint::black_box;

fn wide_outline(sections: usize, leaves: usize) -> String {
    let mut out = String::from("# Benchmark\n");
    for s in 0..sections {
        out.push_str(&format!("\n## Section {s}\n"));
        for l in 0..leaves {
            out.push_str(&format!("- Leaf {s}.{l} with a somewhat longer label\n"));
        }
    }
    out
}

fn fixture(name: &str) -> &'static str {
    match name {
        "reply_small" => include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/benches/fixtures/reply_small.md"
        )),
        "outline_medium" => include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/benches/fixtures/outline_medium.md"
        )),
        _ => panic!("unknown fixture"),
    }
}

fn inputs() -> Vec<(&'static str, String)> {
    vec![
        ("reply_small", fixture("reply_small").to_string()),
        ("outline_medium", fixture("outline_medium").to_string()),
        ("wide_8x6", wide_outline(8, 6)),
        ("wide_20x15", wide_outline(20, 15)),
    ]
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    for (name, input) in inputs() {
        let raw = RawResponse::from(input.as_str());
        group.bench_with_input(BenchmarkId::from_parameter(name), &raw, |b, raw| {
            b.iter(|| black_box(normalize(black_box(raw)).markdown.len()));
        });
    }
    group.finish();
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let theme = Theme::wizard();
    let config = LayoutConfig::default();
    for (name, input) in inputs() {
        let markdown = normalize(&RawResponse::from(input.as_str())).markdown;
        group.bench_with_input(BenchmarkId::from_parameter(name), &markdown, |b, data| {
            b.iter(|| {
                let mindmap = transform(black_box(data)).expect("transform failed");
                let layout = compute_layout(&mindmap, &theme, &config);
                let svg = render_content(&layout, &theme, &config);
                black_box(svg.len());
            });
        });
    }
    group.finish();
}

fn bench_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("export");
    group.sample_size(10);
    let config = Config::default();
    let pipeline = ExportPipeline::new(config.export.clone());
    let doc = normalize(&RawResponse::from(fixture("outline_medium")));
    let mut renderer = DiagramRenderer::new(&config);
    renderer.render(&doc.markdown);
    for format in [ExportFormat::Svg, ExportFormat::Raster, ExportFormat::Pdf] {
        group.bench_function(format.name(), |b| {
            b.iter(|| {
                let artifact = pipeline
                    .export(format, Some(&doc), renderer.handle())
                    .expect("export failed");
                black_box(artifact.bytes.len());
            });
        });
    }
    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end");
    let config = Config::default();
    let pipeline = ExportPipeline::new(config.export.clone());
    for (name, input) in inputs() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &input, |b, data| {
            b.iter(|| {
                let doc = normalize(&RawResponse::from(black_box(data.as_str())));
                let mut renderer = DiagramRenderer::new(&config);
                renderer.render(&doc.markdown);
                let artifact = pipeline
                    .export(ExportFormat::Svg, Some(&doc), renderer.handle())
                    .expect("export failed");
                black_box(artifact.bytes.len());
            });
        });
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_normalize, bench_layout, bench_export, bench_end_to_end
);
criterion_main!(benches);
