use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use ir_attributes::{
    format::{CompressionConfig, Trailer},
    AttributeMap, AttributeValue,
};

#[cfg(not(debug_assertions))]
const NUM_FRAMES: usize = 10_000;

// `cargo test` also runs the benchmark setup code, so make sure they run quickly:
#[cfg(debug_assertions)]
const NUM_FRAMES: usize = 10;

criterion_group!(benches, encode_decode);
criterion_main!(benches);

fn build_trailer() -> Trailer {
    let mut global = AttributeMap::new();
    global.insert("camera", "IR wide angle");
    global.insert("pulse", AttributeValue::integer(61357));
    global.insert("calibration", "0.125 ".repeat(400));

    let frames = (0..NUM_FRAMES)
        .map(|i| {
            let mut frame = AttributeMap::new();
            frame.insert("max_temp", AttributeValue::float(800.0 + i as f64 * 0.5));
            frame.insert("exposure_us", AttributeValue::integer(20));
            frame
        })
        .collect();
    let timestamps = (0..NUM_FRAMES as i64).map(|i| i * 20_000_000).collect();

    Trailer {
        global,
        frames,
        timestamps,
    }
}

fn encode_decode(c: &mut Criterion) {
    let trailer = build_trailer();
    let config = CompressionConfig::default();
    let encoded = trailer.encode(&config);

    let mut group = c.benchmark_group("trailer_codec");
    group.throughput(Throughput::Elements(NUM_FRAMES as _));
    group.bench_function("encode", |b| {
        b.iter(|| black_box(trailer.encode(&config)));
    });
    group.bench_function("decode", |b| {
        b.iter(|| black_box(Trailer::decode(&encoded).unwrap()));
    });
    group.bench_function("from_host", |b| {
        let mut host = vec![0u8; 1 << 16];
        host.extend_from_slice(&encoded);
        b.iter(|| black_box(Trailer::from_host(&host).unwrap()));
    });
    group.finish();
}
