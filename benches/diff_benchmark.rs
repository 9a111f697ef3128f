use criterion::{Criterion, black_box, criterion_group, criterion_main};
use visual_parity::capture::render_page;
use visual_parity::raster::{PixelDiffer, PngCodec, RasterDiffer, normalize_image};

fn benchmark_diff(c: &mut Criterion) {
    let staging = render_page("https://staging.example.com/careers", 1280, 800)
        .to_image()
        .expect("render staging");
    let prod = render_page("https://www.example.com/careers", 1280, 800)
        .to_image()
        .expect("render prod");
    let a = image::DynamicImage::ImageRgb8(staging).to_rgba8();
    let b = image::DynamicImage::ImageRgb8(prod).to_rgba8();
    let differ = PixelDiffer::default();

    c.bench_function("diff_1280x800", |bench| {
        bench.iter(|| {
            let result = differ.diff(black_box(&a), black_box(&b));
            assert!(result.is_ok());
        })
    });
}

fn benchmark_normalize(c: &mut Criterion) {
    let mobile = render_page("https://www.example.com/", 375, 812)
        .to_image()
        .expect("render mobile");
    let source = image::DynamicImage::ImageRgb8(mobile).to_rgba8();
    let codec = PngCodec::new();

    c.bench_function("normalize_mobile_to_canvas", |bench| {
        bench.iter(|| normalize_image(&codec, black_box(&source), 1280, 800))
    });
}

criterion_group!(benches, benchmark_diff, benchmark_normalize);
criterion_main!(benches);
