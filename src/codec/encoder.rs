//! Encoder trait and encoder configuration

use super::AudioFrame;
use crate::error::{Error, Result};
use crate::format::Packet;
use crate::util::Rational;
use std::collections::BTreeMap;

/// Encoder trait for encoding frames
pub trait Encoder {
    /// Send a frame to the encoder
    ///
    /// Returns `Error::TryAgain` without consuming the frame when output is
    /// backed up; receive packets and send it again.
    fn send_frame(&mut self, frame: &AudioFrame) -> Result<()>;

    /// Receive an encoded packet
    ///
    /// Returns `Error::TryAgain` when more input is needed and
    /// `Error::EndOfStream` once the encoder has been flushed and drained.
    fn receive_packet(&mut self) -> Result<Packet>;

    /// Flush the encoder, signalling end of input
    fn flush(&mut self) -> Result<()>;

    /// Codec configuration data for the container, if any
    fn extradata(&self) -> Option<&[u8]> {
        None
    }

    /// Preferred number of samples per channel in each frame
    fn frame_size(&self) -> usize {
        0
    }
}

/// Encoder context with configuration
///
/// Mirrors the generic knobs every audio encoder understands. Codec specific
/// settings are passed by name through [`EncoderContext::set_option`].
#[derive(Debug, Clone)]
pub struct EncoderContext {
    codec_id: String,
    sample_rate: u32,
    channels: u16,
    bit_rate: u64,
    global_quality: Option<f32>,
    rc_min_rate: Option<u64>,
    rc_max_rate: Option<u64>,
    cutoff: Option<u32>,
    time_base: Option<Rational>,
    stream_index: usize,
    comments: Vec<(String, String)>,
    options: BTreeMap<String, String>,
}

impl EncoderContext {
    /// Create a new audio encoder context
    pub fn new(codec_id: impl Into<String>, sample_rate: u32, channels: u16) -> Self {
        EncoderContext {
            codec_id: codec_id.into(),
            sample_rate,
            channels,
            bit_rate: 0,
            global_quality: None,
            rc_min_rate: None,
            rc_max_rate: None,
            cutoff: None,
            time_base: None,
            stream_index: 0,
            comments: Vec::new(),
            options: BTreeMap::new(),
        }
    }

    /// Set target (nominal) bitrate in bits per second, 0 for quality mode
    pub fn set_bit_rate(&mut self, bit_rate: u64) {
        self.bit_rate = bit_rate;
    }

    /// Request fixed-quality encoding
    ///
    /// The scale is codec specific; for Vorbis it is the oggenc scale -1..10.
    pub fn set_quality(&mut self, quality: f32) {
        self.global_quality = Some(quality);
    }

    /// Set minimum bitrate for managed rate control
    pub fn set_min_rate(&mut self, rate: u64) {
        self.rc_min_rate = Some(rate);
    }

    /// Set maximum bitrate for managed rate control
    pub fn set_max_rate(&mut self, rate: u64) {
        self.rc_max_rate = Some(rate);
    }

    /// Set lowpass cutoff frequency in Hz
    pub fn set_cutoff(&mut self, cutoff: u32) {
        self.cutoff = Some(cutoff);
    }

    /// Set the time base packets are stamped in (defaults to 1/sample_rate)
    pub fn set_time_base(&mut self, time_base: Rational) {
        self.time_base = Some(time_base);
    }

    /// Set stream index for output packets
    pub fn set_stream_index(&mut self, index: usize) {
        self.stream_index = index;
    }

    /// Add a metadata tag to embed in the stream headers
    pub fn add_comment(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.comments.push((key.into(), value.into()));
    }

    /// Set a codec private option by name
    pub fn set_option(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.options.insert(name.into(), value.into());
    }

    /// Get the codec ID
    pub fn codec_id(&self) -> &str {
        &self.codec_id
    }

    /// Get the sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get the channel count
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Get target bitrate (0 when unset)
    pub fn bit_rate(&self) -> u64 {
        self.bit_rate
    }

    /// Get the requested quality, if fixed-quality mode was requested
    pub fn quality(&self) -> Option<f32> {
        self.global_quality
    }

    /// Get minimum bitrate
    pub fn min_rate(&self) -> Option<u64> {
        self.rc_min_rate
    }

    /// Get maximum bitrate
    pub fn max_rate(&self) -> Option<u64> {
        self.rc_max_rate
    }

    /// Get lowpass cutoff in Hz
    pub fn cutoff(&self) -> Option<u32> {
        self.cutoff
    }

    /// Time base for output timestamps
    pub fn time_base(&self) -> Rational {
        self.time_base
            .unwrap_or_else(|| Rational::per_sample(self.sample_rate))
    }

    /// Get stream index
    pub fn stream_index(&self) -> usize {
        self.stream_index
    }

    /// Metadata tags
    pub fn comments(&self) -> &[(String, String)] {
        &self.comments
    }

    /// Look up a codec private option
    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }

    /// All codec private options
    pub fn options(&self) -> impl Iterator<Item = (&str, &str)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Create an encoder for the given context
pub fn create_encoder(ctx: &EncoderContext) -> Result<Box<dyn Encoder>> {
    match ctx.codec_id() {
        "vorbis" | "libvorbis" => Ok(Box::new(super::vorbis::VorbisEncoder::new(ctx)?)),
        other => Err(Error::unsupported(format!(
            "No encoder available for codec: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_defaults() {
        let ctx = EncoderContext::new("vorbis", 44100, 2);
        assert_eq!(ctx.bit_rate(), 0);
        assert_eq!(ctx.quality(), None);
        assert_eq!(ctx.time_base(), Rational::new(1, 44100));
        assert_eq!(ctx.stream_index(), 0);
        assert!(ctx.option("iblock").is_none());
    }

    #[test]
    fn test_context_options() {
        let mut ctx = EncoderContext::new("vorbis", 48000, 1);
        ctx.set_option("iblock", "-3.5");
        ctx.set_time_base(Rational::new(1, 1000));
        assert_eq!(ctx.option("iblock"), Some("-3.5"));
        assert_eq!(ctx.time_base(), Rational::new(1, 1000));
        assert_eq!(ctx.options().count(), 1);
    }

    #[test]
    fn test_create_unknown_encoder() {
        let ctx = EncoderContext::new("mp3", 44100, 2);
        assert!(matches!(create_encoder(&ctx), Err(Error::Unsupported(_))));
    }
}
