use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{Rgb, RgbImage};
use imgly_upscale::{
    services::resize::{resample, Interpolation},
    AspectResizer, EncodeParams, ImageCodec, ResizeTarget,
};

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
}

fn bench_resize(c: &mut Criterion) {
    let mut group = c.benchmark_group("resize");
    group.sample_size(20);

    let source = gradient(1024, 768);
    for (name, target) in [
        ("2k_width", ResizeTarget::Width(2048)),
        ("4k_width", ResizeTarget::Width(3840)),
        ("half_height", ResizeTarget::Height(384)),
    ] {
        group.bench_with_input(BenchmarkId::new("aspect", name), &target, |b, &target| {
            b.iter(|| AspectResizer::resize(black_box(source.clone()), target));
        });
    }

    for (name, interpolation) in [("area", Interpolation::Area), ("lanczos", Interpolation::Lanczos)] {
        group.bench_function(BenchmarkId::new("resample", name), |b| {
            b.iter(|| resample(black_box(&source), 512, 384, interpolation));
        });
    }

    group.finish();
}

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    group.sample_size(20);

    let image = gradient(1920, 1080);
    let png = ImageCodec::encode(&image, EncodeParams::Png { compression: 3 }).unwrap();
    let jpeg = ImageCodec::encode(&image, EncodeParams::Jpeg { quality: 95 }).unwrap();

    group.bench_function("decode_png", |b| b.iter(|| ImageCodec::decode(black_box(&png))));
    group.bench_function("decode_jpeg", |b| b.iter(|| ImageCodec::decode(black_box(&jpeg))));
    group.bench_function("encode_png", |b| {
        b.iter(|| ImageCodec::encode(black_box(&image), EncodeParams::Png { compression: 3 }));
    });
    group.bench_function("encode_jpeg", |b| {
        b.iter(|| ImageCodec::encode(black_box(&image), EncodeParams::Jpeg { quality: 95 }));
    });

    group.finish();
}

criterion_group!(benches, bench_resize, bench_codec);
criterion_main!(benches);
