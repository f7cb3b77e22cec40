//! Benchmarks for the AMI hot path
//!
//! Run with: cargo bench --package gsmgw-ami
//!
//! Measures frame decoding and hangup translation, the per-event work done
//! on the connector task.

use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gsmgw_ami::{translate, AmiCodec, AmiEvent};
use tokio_util::codec::Decoder;

const HANGUP: &str = "Event: Hangup\r\n\
    Privilege: call,all\r\n\
    Channel: Dongle/dongle0-0100000000\r\n\
    Uniqueid: 1700000000.42\r\n\
    CallerIDNum: 51999888777\r\n\
    CallerIDName: <unknown>\r\n\
    Exten: 2341234567\r\n\
    Cause: 16\r\n\
    Cause-txt: Normal Clearing\r\n\
    Timestamp: 1700000130.000000\r\n\
    ChanVariable: MODEM_ID=7\r\n\
    ChanVariable: SIM_ID=3\r\n\
    ChanVariable: CALL_START=1700000000\r\n\
    ChanVariable: CALL_ANSWER=1700000010\r\n\
    ChanVariable: DISPOSITION_CODE=1\r\n\
    ChanVariable: CALL_DIRECTION=outbound\r\n\
    \r\n";

fn bench_translate(c: &mut Criterion) {
    let event = AmiEvent::parse(HANGUP);

    c.bench_function("translate_hangup", |b| {
        b.iter(|| translate(black_box(&event), "bank-a"));
    });
}

fn bench_decode_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_hangup_stream");

    for count in [1usize, 100, 1_000].iter() {
        let mut wire = String::from("Asterisk Call Manager/5.0.1\r\n");
        for _ in 0..*count {
            wire.push_str(HANGUP);
        }

        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &wire, |b, wire| {
            b.iter(|| {
                let mut codec = AmiCodec::new();
                let mut buf = BytesMut::from(wire.as_str());
                let mut decoded = 0;
                while let Ok(Some(_)) = codec.decode(&mut buf) {
                    decoded += 1;
                }
                black_box(decoded)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_translate, bench_decode_stream);
criterion_main!(benches);
