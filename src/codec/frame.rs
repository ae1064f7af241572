//! Frame representation for uncompressed audio data

use crate::error::{Error, Result};
use crate::util::{Buffer, SampleFormat, Timestamp};

/// An audio frame
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Audio data (one plane for packed formats, one per channel for planar)
    pub data: Vec<Buffer>,

    /// Number of samples per channel
    pub nb_samples: usize,

    /// Sample rate
    pub sample_rate: u32,

    /// Number of channels
    pub channels: u16,

    /// Sample format
    pub format: SampleFormat,

    /// Presentation timestamp
    pub pts: Timestamp,

    /// Duration
    pub duration: i64,
}

impl AudioFrame {
    /// Create a new audio frame
    pub fn new(nb_samples: usize, sample_rate: u32, channels: u16, format: SampleFormat) -> Self {
        AudioFrame {
            data: Vec::new(),
            nb_samples,
            sample_rate,
            channels,
            format,
            pts: Timestamp::none(),
            duration: 0,
        }
    }

    /// Build a packed float frame from interleaved samples
    pub fn from_interleaved_f32(samples: &[f32], sample_rate: u32, channels: u16) -> Self {
        let nb_samples = if channels == 0 {
            0
        } else {
            samples.len() / channels as usize
        };
        let mut frame = AudioFrame::new(nb_samples, sample_rate, channels, SampleFormat::F32);
        frame.data.push(Buffer::from_f32_samples(samples));
        frame.duration = nb_samples as i64;
        frame
    }

    /// Get the number of planes
    pub fn num_planes(&self) -> usize {
        if self.format.is_planar() {
            self.channels as usize
        } else {
            1
        }
    }

    /// Get total number of samples across all channels
    pub fn total_samples(&self) -> usize {
        self.nb_samples * self.channels as usize
    }

    /// Check that every plane holds at least `nb_samples` worth of data
    pub fn validate_planes(&self) -> Result<()> {
        let planes = self.num_planes();
        if self.data.len() < planes {
            return Err(Error::invalid_input(format!(
                "Audio frame has {} planes, {} {} needs {}",
                self.data.len(),
                self.format,
                self.channels,
                planes
            )));
        }

        let per_plane = if self.format.is_planar() {
            self.nb_samples
        } else {
            self.total_samples()
        };
        let need = per_plane * self.format.sample_size();
        for (index, plane) in self.data.iter().take(planes).enumerate() {
            if plane.len() < need {
                return Err(Error::invalid_input(format!(
                    "Audio plane {} holds {} bytes, {} samples need {}",
                    index,
                    plane.len(),
                    self.nb_samples,
                    need
                )));
            }
        }

        Ok(())
    }
}
