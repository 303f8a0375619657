// ABOUTME: Benchmarks the MessagePack engines and serde layer, with serde_json as a baseline.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use serde::{Deserialize, Serialize};
use serde_msgpack::{Decoder, FeedSource};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Record {
    id: u64,
    name: String,
    email: String,
    scores: Vec<i32>,
    tags: Vec<String>,
    rating: f64,
    parent: Option<u64>,
}

fn create_records(n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| Record {
            id: i as u64 * 1_000_003,
            name: format!("User {i}"),
            email: format!("user{i}@example.com"),
            scores: (0..10).map(|j| (i as i32 - 50) * j).collect(),
            tags: vec!["premium".to_string(), "verified".to_string()],
            rating: (i as f64) / 10.0,
            parent: if i % 3 == 0 { None } else { Some(i as u64 - 1) },
        })
        .collect()
}

fn bench_records(c: &mut Criterion) {
    let data = create_records(100);
    let msgpack_bytes = serde_msgpack::to_vec(&data).unwrap();
    let json_bytes = serde_json::to_vec(&data).unwrap();

    let mut group = c.benchmark_group("records_100");
    group.throughput(Throughput::Elements(data.len() as u64));

    group.bench_function("msgpack_encode", |b| {
        b.iter(|| serde_msgpack::to_vec(black_box(&data)).unwrap())
    });
    group.bench_function("json_encode", |b| {
        b.iter(|| serde_json::to_vec(black_box(&data)).unwrap())
    });
    group.bench_function("msgpack_decode", |b| {
        b.iter(|| {
            let decoded: Vec<Record> = serde_msgpack::from_slice(black_box(&msgpack_bytes)).unwrap();
            decoded
        })
    });
    group.bench_function("json_decode", |b| {
        b.iter(|| {
            let decoded: Vec<Record> = serde_json::from_slice(black_box(&json_bytes)).unwrap();
            decoded
        })
    });

    println!(
        "Record sizes: msgpack={} bytes, JSON={} bytes ({:.1}% of JSON)",
        msgpack_bytes.len(),
        json_bytes.len(),
        (msgpack_bytes.len() as f64 / json_bytes.len() as f64) * 100.0
    );

    group.finish();
}

fn bench_engine(c: &mut Criterion) {
    let ints: Vec<i64> = (0..1000).map(|i| (i - 500) * 977).collect();
    let int_bytes = serde_msgpack::to_vec(&ints).unwrap();
    let record_bytes = serde_msgpack::to_vec(&create_records(100)).unwrap();

    let mut group = c.benchmark_group("engine");

    group.throughput(Throughput::Elements(ints.len() as u64));
    group.bench_function("typed_read_1000_ints", |b| {
        b.iter(|| {
            let mut dec = Decoder::from_slice(black_box(&int_bytes));
            let n = dec.read_array_begin().unwrap();
            let mut sum = 0i64;
            for _ in 0..n {
                sum = sum.wrapping_add(dec.read_long().unwrap());
            }
            dec.read_array_end(true).unwrap();
            sum
        })
    });

    group.throughput(Throughput::Bytes(record_bytes.len() as u64));
    group.bench_function("read_value_records", |b| {
        b.iter(|| serde_msgpack::decode_value(black_box(&record_bytes)).unwrap())
    });
    group.bench_function("skip_records", |b| {
        b.iter(|| {
            let mut dec = Decoder::from_slice(black_box(&record_bytes));
            dec.skip().unwrap();
            dec.finish().unwrap();
        })
    });
    group.bench_function("read_value_fed_in_64_byte_chunks", |b| {
        b.iter(|| {
            let mut dec = Decoder::new(FeedSource::new());
            let mut chunks = record_bytes.chunks(64);
            loop {
                match dec.read_value() {
                    Ok(value) => break value,
                    Err(serde_msgpack::Error::WouldBlock) => {
                        let chunk = chunks.next().unwrap();
                        dec.source_mut().feed(chunk);
                    }
                    Err(e) => panic!("{e}"),
                }
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_records, bench_engine);

criterion_main!(benches);
