//! Packet representation for compressed media data

use crate::util::{Buffer, MediaType, Timestamp};
use std::fmt;

/// Packet flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketFlags {
    /// Packet can be decoded without reference to earlier packets
    pub keyframe: bool,
    /// Packet is a header/config packet
    pub config: bool,
}

/// A packet of compressed media data
#[derive(Debug, Clone)]
pub struct Packet {
    /// Stream index this packet belongs to
    pub stream_index: usize,

    /// Type of media carried
    pub codec_type: MediaType,

    /// Compressed data
    pub data: Buffer,

    /// Presentation timestamp
    pub pts: Timestamp,

    /// Decoding timestamp
    pub dts: Timestamp,

    /// Duration of this packet in time base units
    pub duration: i64,

    /// Packet flags
    pub flags: PacketFlags,
}

impl Packet {
    /// Create a new packet
    pub fn new(stream_index: usize, data: Buffer) -> Self {
        Packet {
            stream_index,
            codec_type: MediaType::Unknown,
            data,
            pts: Timestamp::none(),
            dts: Timestamp::none(),
            duration: 0,
            flags: PacketFlags::default(),
        }
    }

    /// Create a new audio packet
    pub fn new_audio(stream_index: usize, data: Buffer) -> Self {
        Packet {
            codec_type: MediaType::Audio,
            ..Packet::new(stream_index, data)
        }
    }

    /// Set presentation and decoding timestamps to the same value
    pub fn set_timestamp(&mut self, ts: Timestamp) {
        self.pts = ts;
        self.dts = ts;
    }

    /// Check if this packet is a keyframe
    pub fn is_keyframe(&self) -> bool {
        self.flags.keyframe
    }

    /// Set keyframe flag
    pub fn set_keyframe(&mut self, keyframe: bool) {
        self.flags.keyframe = keyframe;
    }

    /// Get the size of the packet data
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Packet(stream={}, size={}, pts={}, dur={}, key={})",
            self.stream_index,
            self.size(),
            self.pts,
            self.duration,
            self.is_keyframe()
        )
    }
}
