use bytes::BytesMut;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use tokio_util::codec::{Decoder, Encoder};
use uot_protocol::core::address::Endpoint;
use uot_protocol::core::frame::encode_frame;
use uot_protocol::{Datagram, DatagramCodec, FrameLimits};

#[allow(clippy::unwrap_used)]
fn bench_frame_encode_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_encode_decode");
    let payload_sizes = [64usize, 512, 1400, 8192, 65535];
    let destination: Endpoint = "93.184.216.34:443".parse().unwrap();
    let limits = FrameLimits::default();

    for &size in &payload_sizes {
        let payload = vec![0u8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("encode_{size}b"), |b| {
            b.iter_batched(
                || BytesMut::with_capacity(size + 32),
                |mut buf| {
                    encode_frame(&destination, &payload, &limits, &mut buf).unwrap();
                    buf
                },
                BatchSize::SmallInput,
            )
        });
        group.bench_function(format!("decode_{size}b"), |b| {
            let mut encoded = BytesMut::new();
            encode_frame(&destination, &payload, &limits, &mut encoded).unwrap();
            let encoded = encoded.freeze();
            b.iter_batched(
                || BytesMut::from(&encoded[..]),
                |mut buf| {
                    let mut codec = DatagramCodec::default();
                    codec.decode(&mut buf).unwrap().unwrap()
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

#[allow(clippy::unwrap_used)]
fn bench_address_forms(c: &mut Criterion) {
    let mut group = c.benchmark_group("address_forms");
    let targets = [
        ("ipv4", "10.0.0.1:53"),
        ("ipv6", "[2001:db8::1]:53"),
        ("domain", "resolver.example.net:53"),
    ];

    for (name, target) in targets {
        let endpoint: Endpoint = target.parse().unwrap();
        group.bench_function(format!("codec_roundtrip_{name}"), |b| {
            let mut codec = DatagramCodec::default();
            let mut buf = BytesMut::with_capacity(512);
            b.iter(|| {
                codec
                    .encode(Datagram::new(endpoint.clone(), vec![7u8; 128]), &mut buf)
                    .unwrap();
                codec.decode(&mut buf).unwrap().unwrap()
            })
        });
        group.bench_function(format!("parse_{name}"), |b| {
            b.iter(|| target.parse::<Endpoint>().unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_frame_encode_decode, bench_address_forms);
criterion_main!(benches);
