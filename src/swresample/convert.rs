//! Conversion of any packed or planar sample format to interleaved f32

use crate::codec::AudioFrame;
use crate::error::{Error, Result};
use crate::util::{Buffer, SampleFormat};

/// Decode one little-endian sample to f32 in [-1, 1)
fn sample_to_f32(format: SampleFormat, bytes: &[u8]) -> f32 {
    match format {
        SampleFormat::U8 | SampleFormat::U8P => (bytes[0] as f32 - 128.0) / 128.0,
        SampleFormat::I16 | SampleFormat::I16P => {
            i16::from_le_bytes([bytes[0], bytes[1]]) as f32 / 32768.0
        }
        SampleFormat::I32 | SampleFormat::I32P => {
            (i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64 / 2147483648.0)
                as f32
        }
        SampleFormat::F32 | SampleFormat::F32P => {
            f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
        }
        SampleFormat::F64 | SampleFormat::F64P => f64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]) as f32,
        SampleFormat::Unknown => 0.0,
    }
}

/// Convert a frame's samples to interleaved f32
pub fn to_f32_samples(frame: &AudioFrame) -> Result<Vec<f32>> {
    if frame.format == SampleFormat::Unknown {
        return Err(Error::unsupported("Cannot convert unknown sample format"));
    }
    frame.validate_planes()?;

    let size = frame.format.sample_size();
    let channels = frame.channels as usize;
    let mut out = Vec::with_capacity(frame.total_samples());

    if frame.format.is_planar() {
        let planes: Vec<&[u8]> = frame.data[..channels]
            .iter()
            .map(|plane| plane.as_slice())
            .collect();
        for i in 0..frame.nb_samples {
            for plane in &planes {
                out.push(sample_to_f32(frame.format, &plane[i * size..(i + 1) * size]));
            }
        }
    } else {
        out.extend(
            frame.data[0]
                .as_slice()
                .chunks_exact(size)
                .take(frame.total_samples())
                .map(|chunk| sample_to_f32(frame.format, chunk)),
        );
    }

    Ok(out)
}

/// Convert a frame to packed F32, keeping timing and layout
pub fn to_f32_interleaved(frame: &AudioFrame) -> Result<AudioFrame> {
    if frame.format == SampleFormat::F32 {
        return Ok(frame.clone());
    }

    let samples = to_f32_samples(frame)?;
    let mut out = AudioFrame::new(
        frame.nb_samples,
        frame.sample_rate,
        frame.channels,
        SampleFormat::F32,
    );
    out.data.push(Buffer::from_f32_samples(&samples));
    out.pts = frame.pts;
    out.duration = frame.duration;
    Ok(out)
}
