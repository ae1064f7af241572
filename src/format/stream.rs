//! Stream information and metadata

use crate::util::{MediaType, Rational, SampleFormat};
use std::collections::HashMap;

/// Information about a media stream
#[derive(Debug, Clone)]
pub struct StreamInfo {
    /// Stream index
    pub index: usize,

    /// Media type
    pub media_type: MediaType,

    /// Codec identifier
    pub codec_id: String,

    /// Time base for this stream
    pub time_base: Rational,

    /// Duration in time_base units
    pub duration: i64,

    /// Stream metadata
    pub metadata: HashMap<String, String>,

    /// Audio-specific info
    pub audio_info: Option<AudioInfo>,
}

impl StreamInfo {
    /// Create a new stream info
    pub fn new(index: usize, media_type: MediaType, codec_id: String) -> Self {
        StreamInfo {
            index,
            media_type,
            codec_id,
            time_base: Rational::new(1, 1000),
            duration: 0,
            metadata: HashMap::new(),
            audio_info: None,
        }
    }

    /// Create an audio stream info ticking once per sample
    pub fn new_audio(index: usize, codec_id: &str, audio_info: AudioInfo) -> Self {
        let mut info = StreamInfo::new(index, MediaType::Audio, codec_id.to_string());
        info.time_base = Rational::per_sample(audio_info.sample_rate);
        info.audio_info = Some(audio_info);
        info
    }

    /// Get duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        self.duration as f64 * self.time_base.to_f64()
    }
}

/// Audio stream information
#[derive(Debug, Clone, PartialEq)]
pub struct AudioInfo {
    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Number of channels
    pub channels: u16,

    /// Sample format (Unknown for compressed streams)
    pub sample_fmt: SampleFormat,

    /// Bitrate in bits per second (if known)
    pub bit_rate: Option<u64>,
}

impl AudioInfo {
    /// Create new audio info
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        AudioInfo {
            sample_rate,
            channels,
            sample_fmt: SampleFormat::Unknown,
            bit_rate: None,
        }
    }
}

/// A media stream
#[derive(Debug, Clone)]
pub struct Stream {
    /// Stream information
    pub info: StreamInfo,

    /// Codec private data (Vorbis header packets, for one)
    pub extradata: Option<Vec<u8>>,
}

impl Stream {
    /// Create a new stream
    pub fn new(info: StreamInfo) -> Self {
        Stream {
            info,
            extradata: None,
        }
    }

    /// Attach codec private data
    pub fn with_extradata(mut self, extradata: Vec<u8>) -> Self {
        self.extradata = Some(extradata);
        self
    }
}
