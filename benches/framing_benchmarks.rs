use async_connect::header::flags;
use async_connect::{decode_frame, encode_frame, Serializer};
use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;

fn example_payload() -> Vec<u8> {
    let mut ser = Serializer::new();
    ser.write_scalar(128u16);
    ser.write_array(&[1u8, 2, 3, 4, 5]);
    ser.write_str_array(&["Hello", "from", "client!"]);
    ser.as_bytes().to_vec()
}

fn bench_serializer_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("serializer_write");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("example_packet", |b| {
        b.iter(|| {
            let mut ser = Serializer::new();
            ser.write_scalar(black_box(128u16));
            ser.write_array(black_box(&[1u8, 2, 3, 4, 5]));
            ser.write_str_array(black_box(&["Hello", "from", "client!"]));
            ser
        })
    });

    group.finish();
}

fn bench_serializer_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("serializer_read");
    group.measurement_time(Duration::from_secs(10));
    let payload = example_payload();

    group.bench_function("example_packet", |b| {
        b.iter(|| {
            let mut ser = Serializer::new();
            ser.assign_buffer(black_box(&payload));
            let _short: u16 = ser.read_scalar().unwrap();
            let _array: Vec<u8> = ser.read_array().unwrap();
            let _strings = ser.read_string_array().unwrap();
        })
    });

    group.finish();
}

fn bench_decode_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_frame");
    group.measurement_time(Duration::from_secs(10));

    let payload = example_payload();
    let frame = encode_frame(5, flags::FL_NONE, &payload);

    group.bench_function("single_packet", |b| {
        b.iter(|| {
            let mut buf = BytesMut::from(&frame[..]);
            decode_frame(black_box(&mut buf), 65536).unwrap()
        })
    });

    group.finish();
}

fn bench_decode_frame_by_chunk_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_frame_chunked");
    group.measurement_time(Duration::from_secs(10));

    let payload = example_payload();
    let mut concatenated = BytesMut::new();
    for id in 5..105u16 {
        concatenated.extend_from_slice(&encode_frame(id, flags::FL_NONE, &payload));
    }
    let whole = concatenated.freeze();

    for chunk_size in [16usize, 64, 256, whole.len()] {
        group.bench_with_input(
            BenchmarkId::from_parameter(chunk_size),
            &chunk_size,
            |b, &chunk_size| {
                b.iter(|| {
                    let mut buf = BytesMut::new();
                    let mut decoded = 0usize;
                    for chunk in whole.chunks(chunk_size) {
                        buf.extend_from_slice(black_box(chunk));
                        while decode_frame(&mut buf, 65536).unwrap().is_some() {
                            decoded += 1;
                        }
                    }
                    decoded
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_serializer_write,
    bench_serializer_read,
    bench_decode_frame,
    bench_decode_frame_by_chunk_count,
);
criterion_main!(benches);
