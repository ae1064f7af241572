//! Container format handling (demuxing and muxing)
//!
//! WAV is the PCM input side; WebM/Matroska carries the encoded Vorbis
//! output.

pub mod demuxer;
pub mod muxer;
pub mod packet;
pub mod stream;
pub mod wav;
pub mod webm;

pub use demuxer::{Demuxer, DemuxerContext};
pub use muxer::{create_muxer, Muxer, MuxerContext};
pub use packet::{Packet, PacketFlags};
pub use stream::{AudioInfo, Stream, StreamInfo};

/// Format capability flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatCapabilities {
    /// Format can be read
    pub demux: bool,
    /// Format can be written
    pub mux: bool,
    /// Format supports seeking
    pub seekable: bool,
}

/// Container format information
#[derive(Debug, Clone)]
pub struct FormatInfo {
    /// Format name
    pub name: &'static str,
    /// Long/descriptive name
    pub long_name: &'static str,
    /// File extensions
    pub extensions: &'static [&'static str],
    /// Format capabilities
    pub capabilities: FormatCapabilities,
}

/// Detect format from file extension
pub fn detect_format_from_extension(path: &str) -> Option<&'static str> {
    let ext = path.rsplit_once('.')?.1.to_lowercase();
    match ext.as_str() {
        "wav" => Some("wav"),
        "webm" => Some("webm"),
        "mka" | "mkv" => Some("matroska"),
        _ => None,
    }
}

/// Get format information by name
pub fn get_format_info(name: &str) -> Option<FormatInfo> {
    match name {
        "wav" => Some(FormatInfo {
            name: "wav",
            long_name: "WAV / WAVE (Waveform Audio)",
            extensions: &["wav"],
            capabilities: FormatCapabilities {
                demux: true,
                mux: false,
                seekable: true,
            },
        }),
        "webm" => Some(FormatInfo {
            name: "webm",
            long_name: "WebM",
            extensions: &["webm"],
            capabilities: FormatCapabilities {
                demux: false,
                mux: true,
                seekable: true,
            },
        }),
        "matroska" => Some(FormatInfo {
            name: "matroska",
            long_name: "Matroska",
            extensions: &["mka", "mkv"],
            capabilities: FormatCapabilities {
                demux: false,
                mux: true,
                seekable: true,
            },
        }),
        _ => None,
    }
}
