//! Codec and framing throughput.
//!
//! Run with: cargo bench --bench throughput

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use aurora_modbus::codec::{build_read_ranges, crc16, parse_register_values, validate_frame_crc};
use aurora_modbus::frame::RxBuffer;
use aurora_modbus::registers::{AXB_RANGES, SYSTEM_ID_RANGES, THERMOSTAT_RANGES};

fn read_response(count: usize) -> Vec<u8> {
    let mut frame = vec![0x01, 0x41, (count * 2) as u8];
    for i in 0..count {
        frame.extend_from_slice(&(i as u16).to_be_bytes());
    }
    let crc = crc16(&frame);
    frame.extend_from_slice(&crc.to_le_bytes());
    frame
}

fn bench_crc(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc16");
    for len in [8usize, 64, 254] {
        let data: Vec<u8> = (0..len).map(|i| i as u8).collect();
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &data, |b, data| {
            b.iter(|| crc16(black_box(data)))
        });
    }
    group.finish();
}

fn bench_requests(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_read_ranges");
    for (name, ranges) in [
        ("system_id", &SYSTEM_ID_RANGES[..]),
        ("thermostat", &THERMOSTAT_RANGES[..]),
        ("axb", &AXB_RANGES[..]),
    ] {
        group.bench_function(name, |b| b.iter(|| build_read_ranges(black_box(ranges))));
    }
    group.finish();
}

fn bench_framing(c: &mut Criterion) {
    let mut group = c.benchmark_group("response");
    for count in [13usize, 50, 100] {
        let frame = read_response(count);
        group.throughput(Throughput::Bytes(frame.len() as u64));

        group.bench_with_input(BenchmarkId::new("assemble", count), &frame, |b, frame| {
            b.iter(|| {
                let mut rx = RxBuffer::new();
                for chunk in frame.chunks(16) {
                    let _ = rx.extend(chunk);
                }
                black_box(rx.take_frame())
            })
        });

        group.bench_with_input(BenchmarkId::new("validate_decode", count), &frame, |b, frame| {
            b.iter(|| {
                let valid = validate_frame_crc(black_box(frame));
                let values = parse_register_values(&frame[3..frame.len() - 2]);
                black_box((valid, values))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_crc, bench_requests, bench_framing);
criterion_main!(benches);
