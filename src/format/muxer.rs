//! Muxer seam for encoded audio output

use super::{Packet, Stream};
use crate::error::{Error, Result};
use std::path::Path;

/// Writes encoded packets into a container file.
///
/// Call order: `create`, `add_stream` for every track, `write_header`,
/// any number of `write_packet`, then `write_trailer`.
pub trait Muxer {
    fn create(&mut self, path: &Path) -> Result<()>;

    /// Register a track and return its index
    fn add_stream(&mut self, stream: Stream) -> Result<usize>;

    fn write_header(&mut self) -> Result<()>;

    fn write_packet(&mut self, packet: &Packet) -> Result<()>;

    /// Finish the file and flush it to disk
    fn write_trailer(&mut self) -> Result<()>;
}

/// Track list and header state shared by muxers
pub struct MuxerContext {
    streams: Vec<Stream>,
    format_name: &'static str,
    header_written: bool,
}

impl MuxerContext {
    pub fn new(format_name: &'static str) -> Self {
        MuxerContext {
            streams: Vec::new(),
            format_name,
            header_written: false,
        }
    }

    /// Container doc type, "webm" or "matroska"
    pub fn format_name(&self) -> &'static str {
        self.format_name
    }

    pub fn streams(&self) -> &[Stream] {
        &self.streams
    }

    /// Find a track by the stream index packets carry
    pub fn stream(&self, index: usize) -> Option<&Stream> {
        self.streams.iter().find(|s| s.info.index == index)
    }

    pub fn add_stream(&mut self, stream: Stream) -> usize {
        let index = self.streams.len();
        self.streams.push(stream);
        index
    }

    pub fn is_header_written(&self) -> bool {
        self.header_written
    }

    pub fn set_header_written(&mut self) {
        self.header_written = true;
    }
}

/// Create a muxer by container name (see `detect_format_from_extension`)
pub fn create_muxer(format: &str) -> Result<Box<dyn Muxer>> {
    use super::webm::WebmMuxer;

    match format {
        "webm" => Ok(Box::new(WebmMuxer::new())),
        "matroska" => Ok(Box::new(WebmMuxer::matroska())),
        _ => Err(Error::unsupported(format!(
            "No muxer for format: {}",
            format
        ))),
    }
}
