//! Codec performance benchmarks
//!
//! Vorbis encoding throughput across rate control modes, plus the sample
//! format conversion that feeds it.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use zvd_vorbis::codec::vorbis::HeaderPackets;
use zvd_vorbis::codec::{AudioFrame, Encoder, EncoderContext, VorbisEncoder};
use zvd_vorbis::swresample::to_f32_interleaved;
use zvd_vorbis::util::{Buffer, SampleFormat, Timestamp};

const SAMPLE_RATE: u32 = 44100;
const CHUNK: usize = 1024;

/// Create a packed f32 test frame
fn create_test_audio_frame(samples: usize, channels: u16, start: usize) -> AudioFrame {
    let data: Vec<f32> = (start..start + samples)
        .flat_map(|i| {
            let sample = (i as f32 * 0.0627).sin() * 0.5;
            std::iter::repeat(sample).take(channels as usize)
        })
        .collect();
    let mut frame = AudioFrame::from_interleaved_f32(&data, SAMPLE_RATE, channels);
    frame.pts = Timestamp::new(start as i64);
    frame
}

/// Encode one second of audio and return the compressed size
fn encode_second(ctx: &EncoderContext, frames: &[AudioFrame]) -> usize {
    let mut encoder = VorbisEncoder::new(ctx).unwrap();
    let mut bytes = 0;
    for frame in frames {
        encoder.send_frame(frame).unwrap();
        while let Ok(packet) = encoder.receive_packet() {
            bytes += packet.size();
        }
    }
    encoder.flush().unwrap();
    while let Ok(packet) = encoder.receive_packet() {
        bytes += packet.size();
    }
    bytes
}

/// Benchmark Vorbis encoding in VBR and managed modes
fn bench_vorbis_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("vorbis_encode");
    group.sample_size(20);

    for &channels in &[1u16, 2, 6] {
        let frames: Vec<AudioFrame> = (0..SAMPLE_RATE as usize)
            .step_by(CHUNK)
            .map(|start| create_test_audio_frame(CHUNK, channels, start))
            .collect();
        group.throughput(Throughput::Elements(SAMPLE_RATE as u64 * channels as u64));

        let mut vbr = EncoderContext::new("vorbis", SAMPLE_RATE, channels);
        vbr.set_quality(5.0);
        group.bench_with_input(
            BenchmarkId::new("vbr_q5", channels),
            &frames,
            |b, frames| b.iter(|| encode_second(black_box(&vbr), frames)),
        );

        let mut managed = EncoderContext::new("vorbis", SAMPLE_RATE, channels);
        managed.set_bit_rate(64_000 * channels as u64);
        group.bench_with_input(
            BenchmarkId::new("abr", channels),
            &frames,
            |b, frames| b.iter(|| encode_second(black_box(&managed), frames)),
        );
    }

    group.finish();
}

/// Benchmark encoder setup, dominated by header generation
fn bench_encoder_open(c: &mut Criterion) {
    let ctx = EncoderContext::new("vorbis", SAMPLE_RATE, 2);
    c.bench_function("vorbis_open", |b| {
        b.iter(|| {
            let encoder = VorbisEncoder::new(black_box(&ctx)).unwrap();
            black_box(encoder.extradata().map(|d| d.len()))
        })
    });

    let encoder = VorbisEncoder::new(&ctx).unwrap();
    let extradata = encoder.extradata().unwrap().to_vec();
    c.bench_function("extradata_split", |b| {
        b.iter(|| HeaderPackets::from_extradata(black_box(&extradata)).unwrap())
    });
}

/// Benchmark i16 to f32 conversion
fn bench_sample_conversion(c: &mut Criterion) {
    let mut group = c.benchmark_group("sample_conversion");
    let samples = CHUNK * 2;
    group.throughput(Throughput::Elements(samples as u64));

    let bytes: Vec<u8> = (0..samples)
        .flat_map(|i| ((i as i16).wrapping_mul(31)).to_le_bytes())
        .collect();
    let mut frame = AudioFrame::new(CHUNK, SAMPLE_RATE, 2, SampleFormat::I16);
    frame.data.push(Buffer::from_vec(bytes));

    group.bench_function("i16_to_f32", |b| {
        b.iter(|| to_f32_interleaved(black_box(&frame)).unwrap())
    });
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default();
    targets =
        bench_vorbis_encode,
        bench_encoder_open,
        bench_sample_conversion
}

criterion_main!(benches);
