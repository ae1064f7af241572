//! Demuxer seam for PCM sources

use super::{Packet, Stream};
use crate::error::Result;
use std::path::Path;

/// A source of PCM packets read from a container
pub trait Demuxer {
    /// Open a file and parse its header
    fn open(&mut self, path: &Path) -> Result<()>;

    /// Streams found by `open`
    fn streams(&self) -> &[Stream];

    /// Read the next packet, `Error::EndOfStream` once exhausted
    fn read_packet(&mut self) -> Result<Packet>;

    /// Seek to a sample position (stream time_base units)
    fn seek(&mut self, stream_index: usize, timestamp: i64) -> Result<()>;

    /// Release the file
    fn close(&mut self) -> Result<()>;
}

/// Stream bookkeeping shared by demuxers
pub struct DemuxerContext {
    streams: Vec<Stream>,
    format_name: &'static str,
}

impl DemuxerContext {
    pub fn new(format_name: &'static str) -> Self {
        DemuxerContext {
            streams: Vec::new(),
            format_name,
        }
    }

    pub fn format_name(&self) -> &'static str {
        self.format_name
    }

    pub fn streams(&self) -> &[Stream] {
        &self.streams
    }

    pub fn add_stream(&mut self, stream: Stream) {
        self.streams.push(stream);
    }

    /// Forget every stream, used when the file is closed or reopened
    pub fn clear(&mut self) {
        self.streams.clear();
    }
}
