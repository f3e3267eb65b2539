//! Codec benchmarks for xptest-codec.
//!
//! Measures compaction, formatting, XML conversion and enveloping throughput
//! at various batch sizes.


use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use xptest_codec::{
    MimeType, TestCode, compress_raw_events, compress_test_code, convert_xml_events,
    envelope_events, format_test_code,
};

// ---------------------------------------------------------------------------
// Benchmark: storage compaction
// ---------------------------------------------------------------------------

fn bench_compress_raw_events(c: &mut Criterion) {
    let mut group = c.benchmark_group("compress_raw_events");

    for n in [1, 100, 1000] {
        let text = datagen::gen_n_pretty_events(n);
        group.throughput(Throughput::Bytes(text.len() as u64));

        group.bench_with_input(BenchmarkId::new("events", n), &text, |b, text| {
            b.iter(|| {
                let result = compress_raw_events(black_box(text)).unwrap();
                black_box(result);
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: test-code round trip
// ---------------------------------------------------------------------------

fn bench_test_code_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("test_code");

    for n in [1, 10, 100] {
        let pretty = datagen::gen_test_code(n);
        let compact = compress_test_code(&pretty);

        group.bench_with_input(BenchmarkId::new("compress", n), &pretty, |b, pretty| {
            b.iter(|| black_box(compress_test_code(black_box(pretty))));
        });
        group.bench_with_input(BenchmarkId::new("format", n), &compact, |b, compact| {
            b.iter(|| black_box(format_test_code(black_box(compact))));
        });
        group.bench_with_input(BenchmarkId::new("parse", n), &compact, |b, compact| {
            b.iter(|| black_box(TestCode::parse(black_box(compact)).unwrap()));
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: XML conversion
// ---------------------------------------------------------------------------

fn bench_convert_xml(c: &mut Criterion) {
    let mut group = c.benchmark_group("convert_xml");

    for n in [1, 100, 500] {
        let xml = datagen::gen_n_xml_events(n);
        group.throughput(Throughput::Elements(n as u64));

        group.bench_with_input(BenchmarkId::new("events", n), &xml, |b, xml| {
            b.iter(|| black_box(convert_xml_events(black_box(xml)).unwrap()));
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: enveloping
// ---------------------------------------------------------------------------

fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("envelope");

    for n in [10, 1000] {
        let lines = datagen::gen_n_compact_lines(n);
        group.throughput(Throughput::Elements(n as u64));

        group.bench_with_input(BenchmarkId::new("json_lines", n), &lines, |b, lines| {
            b.iter(|| black_box(envelope_events(black_box(lines), MimeType::Json).unwrap()));
        });
    }

    let xml = datagen::gen_n_xml_events(100);
    group.bench_function("xml_100", |b| {
        b.iter(|| black_box(envelope_events(black_box(&xml), MimeType::PtEventLog).unwrap()));
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Criterion harness
// ---------------------------------------------------------------------------

criterion_group!(
    benches,
    bench_compress_raw_events,
    bench_test_code_round_trip,
    bench_convert_xml,
    bench_envelope,
);
criterion_main!(benches);
