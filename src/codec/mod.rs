//! Codec implementations

pub mod encoder;
pub mod frame;
pub mod vorbis;

pub use encoder::{create_encoder, Encoder, EncoderContext};
pub use frame::AudioFrame;
pub use vorbis::VorbisEncoder;

use crate::util::{MediaType, SampleFormat};

/// Codec capability flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecCapabilities {
    /// Codec supports lossy compression
    pub lossy: bool,
    /// Codec supports lossless compression
    pub lossless: bool,
    /// Encoder buffers input and must be flushed to emit trailing packets
    pub delay: bool,
}

/// Codec information
#[derive(Debug, Clone)]
pub struct CodecInfo {
    /// Codec identifier
    pub id: String,
    /// Encoder name
    pub name: String,
    /// Long descriptive name
    pub long_name: String,
    /// Media type
    pub media_type: MediaType,
    /// Accepted input sample formats
    pub sample_formats: Vec<SampleFormat>,
    /// Codec capabilities
    pub capabilities: CodecCapabilities,
}

/// Get codec information by ID
pub fn get_codec_info(id: &str) -> Option<CodecInfo> {
    match id {
        "vorbis" | "libvorbis" => Some(CodecInfo {
            id: "vorbis".to_string(),
            name: "libvorbis".to_string(),
            long_name: "libvorbis Vorbis".to_string(),
            media_type: MediaType::Audio,
            sample_formats: vec![SampleFormat::F32, SampleFormat::F32P],
            capabilities: CodecCapabilities {
                lossy: true,
                lossless: false,
                delay: true,
            },
        }),
        _ => None,
    }
}
