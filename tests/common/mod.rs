//! Common test utilities for zvd-vorbis integration tests
//!
//! Helpers for generating test audio, writing WAV files and draining encoders.

#![allow(dead_code)]

use std::io::Write;
use std::path::Path;
use zvd_vorbis::codec::{AudioFrame, Encoder};
use zvd_vorbis::format::Packet;
use zvd_vorbis::util::{Buffer, SampleFormat, Timestamp};
use zvd_vorbis::Error;

// ============================================================================
// Audio Frame Generation
// ============================================================================

/// Interleaved f32 sine samples, one tone per channel
pub fn sine_samples(sample_rate: u32, channels: u16, samples: usize, start: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(samples * channels as usize);
    for i in start..start + samples {
        let t = i as f64 / sample_rate as f64;
        for ch in 0..channels {
            let frequency = 440.0 + 110.0 * ch as f64;
            data.push(((2.0 * std::f64::consts::PI * frequency * t).sin() * 0.5) as f32);
        }
    }
    data
}

/// Create a packed F32 test frame starting at sample `start`
pub fn create_test_audio_frame(
    sample_rate: u32,
    channels: u16,
    samples: usize,
    start: usize,
) -> AudioFrame {
    let data = sine_samples(sample_rate, channels, samples, start);
    let mut frame = AudioFrame::from_interleaved_f32(&data, sample_rate, channels);
    frame.pts = Timestamp::new(start as i64);
    frame
}

/// Create a planar F32 test frame starting at sample `start`
pub fn create_planar_audio_frame(
    sample_rate: u32,
    channels: u16,
    samples: usize,
    start: usize,
) -> AudioFrame {
    let interleaved = sine_samples(sample_rate, channels, samples, start);
    let mut frame = AudioFrame::new(samples, sample_rate, channels, SampleFormat::F32P);
    for ch in 0..channels as usize {
        let plane: Vec<f32> = interleaved
            .iter()
            .skip(ch)
            .step_by(channels as usize)
            .copied()
            .collect();
        frame.data.push(Buffer::from_f32_samples(&plane));
    }
    frame.pts = Timestamp::new(start as i64);
    frame.duration = samples as i64;
    frame
}

/// Split `total` samples into frames of `chunk` samples
pub fn create_audio_sequence(
    sample_rate: u32,
    channels: u16,
    total: usize,
    chunk: usize,
) -> Vec<AudioFrame> {
    (0..total)
        .step_by(chunk)
        .map(|start| {
            create_test_audio_frame(sample_rate, channels, chunk.min(total - start), start)
        })
        .collect()
}

// ============================================================================
// Encoder Helpers
// ============================================================================

/// Collect every packet ready right now
pub fn receive_ready(encoder: &mut dyn Encoder) -> Vec<Packet> {
    let mut packets = Vec::new();
    loop {
        match encoder.receive_packet() {
            Ok(packet) => packets.push(packet),
            Err(Error::TryAgain) | Err(Error::EndOfStream) => return packets,
            Err(e) => panic!("Unexpected encoder error: {}", e),
        }
    }
}

/// Send every frame, flush, and return all packets in output order
pub fn encode_all(encoder: &mut dyn Encoder, frames: &[AudioFrame]) -> Vec<Packet> {
    let mut packets = Vec::new();
    for frame in frames {
        encoder.send_frame(frame).expect("send_frame failed");
        packets.extend(receive_ready(encoder));
    }
    encoder.flush().expect("flush failed");
    packets.extend(receive_ready(encoder));
    assert!(matches!(encoder.receive_packet(), Err(Error::EndOfStream)));
    packets
}

// ============================================================================
// WAV Files
// ============================================================================

/// Write a 16-bit PCM WAV file holding a sine tone
pub fn write_test_wav(path: &Path, sample_rate: u32, channels: u16, samples: usize) {
    let block_align = channels * 2;
    let data_size = (samples * block_align as usize) as u32;

    let mut bytes = Vec::with_capacity(44 + data_size as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_size).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");

    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&channels.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
    bytes.extend_from_slice(&block_align.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());

    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_size.to_le_bytes());
    for sample in sine_samples(sample_rate, channels, samples, 0) {
        let value = (sample * i16::MAX as f32) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    let mut file = std::fs::File::create(path).expect("Failed to create WAV file");
    file.write_all(&bytes).expect("Failed to write WAV file");
}

/// Whether `needle` occurs anywhere in `haystack`
pub fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

/// Standard audio parameters
pub mod audio {
    pub const SAMPLE_RATE_44100: u32 = 44100;
    pub const SAMPLE_RATE_48000: u32 = 48000;

    pub const CHANNELS_MONO: u16 = 1;
    pub const CHANNELS_STEREO: u16 = 2;

    /// Samples per channel fed per call in the tests
    pub const CHUNK: usize = 1024;
}
