//! Vorbis audio encoder using libvorbisenc
//!
//! PCM float frames are copied into libvorbis' analysis buffer in Vorbis
//! channel order, every complete block is analysed, and the packets the
//! bitrate manager releases are staged until the caller receives them.
//!
//! ## Example
//! ```no_run
//! use zvd_vorbis::codec::{AudioFrame, Encoder, EncoderContext, VorbisEncoder};
//!
//! let mut ctx = EncoderContext::new("vorbis", 44100, 2);
//! ctx.set_quality(5.0);
//! let mut encoder = VorbisEncoder::new(&ctx)?;
//!
//! let frame = AudioFrame::from_interleaved_f32(&[0.0; 2048], 44100, 2);
//! encoder.send_frame(&frame)?;
//! encoder.flush()?;
//! while let Ok(packet) = encoder.receive_packet() {
//!     println!("{}", packet);
//! }
//! # Ok::<(), zvd_vorbis::Error>(())
//! ```

use super::ffi::{RawPacket, VorbisSession, PACKET_HEADER_SIZE};
use super::headers::HeaderPackets;
use super::options::VorbisOptions;
use crate::codec::{AudioFrame, Encoder, EncoderContext};
use crate::error::{Error, Result};
use crate::format::Packet;
use crate::util::channel_layout::vorbis_source_channel;
use crate::util::{Buffer, Rational, SampleFormat, Timestamp};
use std::collections::VecDeque;
use tracing::{debug, error, trace};

/// Samples per channel callers should send in each frame
///
/// The lowest common divisor of all Vorbis block sizes, so every output
/// packet starts on an input frame boundary.
pub const FRAME_SIZE: usize = 64;

/// Byte budget for packets waiting to be received
///
/// Once staged packets reach it, analysis pauses with the remaining samples
/// held inside libvorbis, and `send_frame` returns `Error::TryAgain` until
/// packets are received. The last analysed block may overshoot the budget.
pub const STAGING_BUFFER_SIZE: usize = 64 * 1024;

/// Vorbis audio encoder
pub struct VorbisEncoder {
    session: VorbisSession,
    options: VorbisOptions,
    headers: HeaderPackets,
    extradata: Vec<u8>,
    staged: VecDeque<RawPacket>,
    staged_bytes: usize,
    time_base: Rational,
    stream_index: usize,
    /// First input pts in `time_base` units, fixed by the first frame
    start_pts: Option<i64>,
    /// Granule position of the last packet handed out
    last_granule: i64,
    samples_sent: u64,
    eof: bool,
}

impl VorbisEncoder {
    /// Open an encoder configured from a generic encoder context
    pub fn new(ctx: &EncoderContext) -> Result<Self> {
        let time_base = ctx.time_base();
        if !time_base.is_valid_time_base() {
            return Err(Error::config(format!("Invalid time base: {}", time_base)));
        }

        let options = VorbisOptions::from_context(ctx)?;
        let mut session = VorbisSession::open(&options).map_err(|e| {
            error!("Vorbis encoder initialization failed: {}", e);
            e
        })?;

        let mut comments = Vec::with_capacity(options.comments.len() + 1);
        comments.push(("encoder".to_string(), crate::IDENT.to_string()));
        comments.extend(options.comments.iter().cloned());

        let headers = HeaderPackets::new(session.header_packets(&comments)?);
        let extradata = headers.to_extradata();

        debug!(
            "Vorbis encoder opened: {} Hz, {} ch, extradata {} bytes",
            options.sample_rate,
            options.channels,
            extradata.len()
        );

        Ok(VorbisEncoder {
            session,
            options,
            headers,
            extradata,
            staged: VecDeque::new(),
            staged_bytes: 0,
            time_base,
            stream_index: ctx.stream_index(),
            start_pts: None,
            last_granule: 0,
            samples_sent: 0,
            eof: false,
        })
    }

    /// Create an encoder with quality-based VBR (oggenc scale -1..10)
    pub fn new_quality(sample_rate: u32, channels: u16, quality: f32) -> Result<Self> {
        let mut ctx = EncoderContext::new("vorbis", sample_rate, channels);
        ctx.set_quality(quality);
        Self::new(&ctx)
    }

    /// Create an encoder with a target average bitrate in bits per second
    pub fn new_bitrate(sample_rate: u32, channels: u16, bitrate: u64) -> Result<Self> {
        let mut ctx = EncoderContext::new("vorbis", sample_rate, channels);
        ctx.set_bit_rate(bitrate);
        Self::new(&ctx)
    }

    /// Get the sample rate
    pub fn sample_rate(&self) -> u32 {
        self.options.sample_rate
    }

    /// Get the number of channels
    pub fn channels(&self) -> u16 {
        self.options.channels
    }

    /// Resolved encoder options
    pub fn options(&self) -> &VorbisOptions {
        &self.options
    }

    /// The three header packets
    pub fn headers(&self) -> &HeaderPackets {
        &self.headers
    }

    /// Time base of output packet timestamps
    pub fn time_base(&self) -> Rational {
        self.time_base
    }

    /// Number of packets waiting to be received
    pub fn staged_packets(&self) -> usize {
        self.staged.len()
    }

    /// Bytes of the staging budget in use
    pub fn staged_bytes(&self) -> usize {
        self.staged_bytes
    }

    /// Samples per channel handed to libvorbis so far
    pub fn samples_sent(&self) -> u64 {
        self.samples_sent
    }

    /// Whether end of stream has been signalled
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Whether the staging budget is used up
    pub fn is_staging_full(&self) -> bool {
        self.staged_bytes >= STAGING_BUFFER_SIZE
    }

    /// Copy the next packet into `buf`, returning its size
    ///
    /// Returns 0 when nothing is staged. A packet larger than `buf` stays
    /// staged and `Error::BufferTooSmall` is returned.
    pub fn receive_packet_into(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.refill()?;
        let need = match self.staged.front() {
            Some(packet) => packet.data.len(),
            None => return Ok(0),
        };
        if need > buf.len() {
            debug!("Vorbis packet of {} bytes does not fit in {}", need, buf.len());
            return Err(Error::BufferTooSmall {
                need,
                have: buf.len(),
            });
        }

        let packet = self.receive_packet()?;
        buf[..need].copy_from_slice(packet.data.as_slice());
        Ok(need)
    }

    fn copy_frame(&mut self, frame: &AudioFrame) -> Result<()> {
        if !matches!(frame.format, SampleFormat::F32 | SampleFormat::F32P) {
            return Err(Error::unsupported(format!(
                "Unsupported sample format for Vorbis encoding: {}",
                frame.format
            )));
        }
        self.session
            .write_samples(frame.nb_samples, |vorbis_channel, dst| {
                copy_vorbis_channel(frame, vorbis_channel, dst)
            })
    }

    /// Resume analysis when everything staged has been handed out
    fn refill(&mut self) -> Result<()> {
        if self.staged.is_empty() {
            self.drain()?;
        }
        Ok(())
    }

    fn drain(&mut self) -> Result<()> {
        if self.is_staging_full() {
            return Ok(());
        }
        let staged = &mut self.staged;
        let staged_bytes = &mut self.staged_bytes;
        self.session
            .drain(|packet| stage_packet(staged, staged_bytes, packet))?;
        trace!(
            "Vorbis staging: {} packets, {} bytes",
            self.staged.len(),
            self.staged_bytes
        );
        Ok(())
    }

    fn samples_to_time_base(&self, samples: i64) -> i64 {
        Timestamp::new(samples)
            .rescale(Rational::per_sample(self.options.sample_rate), self.time_base)
            .value
    }
}

fn read_f32(bytes: &[u8]) -> f32 {
    f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Fill `dst` with Vorbis channel `vorbis_channel` of an F32 or F32P frame
///
/// The source is the framework channel the Vorbis channel order maps to.
/// Other sample formats leave `dst` untouched.
fn copy_vorbis_channel(frame: &AudioFrame, vorbis_channel: usize, dst: &mut [f32]) {
    let channels = frame.channels as usize;
    let src = vorbis_source_channel(channels, vorbis_channel);

    match frame.format {
        SampleFormat::F32 => {
            let data = frame.data[0].as_slice();
            for (sample, bytes) in dst
                .iter_mut()
                .zip(data.chunks_exact(4 * channels).map(|f| &f[src * 4..src * 4 + 4]))
            {
                *sample = read_f32(bytes);
            }
        }
        SampleFormat::F32P => {
            let plane = frame.data[src].as_slice();
            for (sample, bytes) in dst.iter_mut().zip(plane.chunks_exact(4)) {
                *sample = read_f32(bytes);
            }
        }
        _ => {}
    }
}

/// Queue a packet, returning whether the budget leaves room for more
fn stage_packet(
    staged: &mut VecDeque<RawPacket>,
    staged_bytes: &mut usize,
    packet: RawPacket,
) -> bool {
    *staged_bytes += PACKET_HEADER_SIZE + packet.data.len();
    staged.push_back(packet);
    *staged_bytes < STAGING_BUFFER_SIZE
}

impl Encoder for VorbisEncoder {
    fn send_frame(&mut self, frame: &AudioFrame) -> Result<()> {
        if self.eof {
            return Err(Error::invalid_state("Vorbis encoder already flushed"));
        }

        if frame.sample_rate != self.options.sample_rate {
            return Err(Error::codec(format!(
                "Sample rate mismatch: encoder expects {}, got {}",
                self.options.sample_rate, frame.sample_rate
            )));
        }

        if frame.channels != self.options.channels {
            return Err(Error::codec(format!(
                "Channel count mismatch: encoder expects {}, got {}",
                self.options.channels, frame.channels
            )));
        }

        if !matches!(frame.format, SampleFormat::F32 | SampleFormat::F32P) {
            return Err(Error::unsupported(format!(
                "Unsupported sample format for Vorbis encoding: {}",
                frame.format
            )));
        }

        frame.validate_planes()?;

        if self.is_staging_full() {
            return Err(Error::TryAgain);
        }

        if self.start_pts.is_none() {
            self.start_pts = Some(if frame.pts.is_valid() {
                frame.pts.value
            } else {
                0
            });
        }

        if frame.nb_samples == 0 {
            return Ok(());
        }

        self.copy_frame(frame)?;
        self.samples_sent += frame.nb_samples as u64;
        self.drain()
    }

    fn receive_packet(&mut self) -> Result<Packet> {
        self.refill()?;
        let raw = match self.staged.pop_front() {
            Some(raw) => raw,
            None if self.eof => return Err(Error::EndOfStream),
            None => return Err(Error::TryAgain),
        };
        self.staged_bytes -= PACKET_HEADER_SIZE + raw.data.len();

        let start = self.last_granule;
        let end = raw.granulepos.max(start);
        self.last_granule = end;

        let offset = self.start_pts.unwrap_or(0);
        let pts = Timestamp::new(self.samples_to_time_base(start) + offset);

        let mut packet = Packet::new_audio(self.stream_index, Buffer::from_vec(raw.data));
        packet.set_timestamp(pts);
        packet.duration = self.samples_to_time_base(end) - self.samples_to_time_base(start);
        packet.set_keyframe(true);
        Ok(packet)
    }

    fn flush(&mut self) -> Result<()> {
        if !self.eof {
            self.session.signal_eof()?;
            self.eof = true;
            debug!(
                "Vorbis encoder flushing after {} samples",
                self.samples_sent
            );
        }
        self.drain()
    }

    fn extradata(&self) -> Option<&[u8]> {
        Some(&self.extradata)
    }

    fn frame_size(&self) -> usize {
        FRAME_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(samples: usize, channels: u16, freq: f32) -> Vec<f32> {
        (0..samples)
            .flat_map(|i| {
                let v = (2.0 * std::f32::consts::PI * freq * i as f32 / 44100.0).sin() * 0.5;
                std::iter::repeat(v).take(channels as usize)
            })
            .collect()
    }

    fn drain_all(encoder: &mut VorbisEncoder) -> Vec<Packet> {
        let mut packets = Vec::new();
        while let Ok(packet) = encoder.receive_packet() {
            packets.push(packet);
        }
        packets
    }

    #[test]
    fn test_vorbis_encoder_creation_quality() {
        let enc = VorbisEncoder::new_quality(44100, 2, 5.0).unwrap();
        assert_eq!(enc.sample_rate(), 44100);
        assert_eq!(enc.channels(), 2);
        assert_eq!(enc.frame_size(), FRAME_SIZE);
        assert!(!enc.is_eof());
    }

    #[test]
    fn test_vorbis_encoder_creation_bitrate() {
        let enc = VorbisEncoder::new_bitrate(44100, 2, 128_000).unwrap();
        assert!(enc.options().rate_control.disables_rate_management());
    }

    #[test]
    fn test_extradata_matches_headers() {
        let enc = VorbisEncoder::new_quality(48000, 1, 3.0).unwrap();
        let extradata = enc.extradata().unwrap();
        assert_eq!(extradata[0], 2);
        assert_eq!(extradata.len(), enc.headers().extradata_size());
        assert_eq!(&HeaderPackets::from_extradata(extradata).unwrap(), enc.headers());
        assert!(enc.headers().validate().is_ok());
    }

    #[test]
    fn test_encoder_tag_in_comment_header() {
        let enc = VorbisEncoder::new_quality(44100, 2, 3.0).unwrap();
        let comment = &enc.headers().comment;
        let needle = format!("encoder={}", crate::IDENT);
        assert!(comment
            .windows(needle.len())
            .any(|w| w == needle.as_bytes()));
    }

    #[test]
    fn test_receive_before_input_is_try_again() {
        let mut enc = VorbisEncoder::new_quality(44100, 2, 3.0).unwrap();
        assert!(matches!(enc.receive_packet(), Err(Error::TryAgain)));
        let mut buf = [0u8; 16];
        assert_eq!(enc.receive_packet_into(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_encode_and_flush() {
        let mut enc = VorbisEncoder::new_quality(44100, 2, 3.0).unwrap();
        let samples = sine(44100, 2, 440.0);
        let mut packets = Vec::new();

        for chunk in samples.chunks(FRAME_SIZE * 2 * 16) {
            let frame = AudioFrame::from_interleaved_f32(chunk, 44100, 2);
            enc.send_frame(&frame).unwrap();
            packets.extend(drain_all(&mut enc));
        }
        enc.flush().unwrap();
        packets.extend(drain_all(&mut enc));

        assert!(packets.len() > 10);
        assert!(matches!(enc.receive_packet(), Err(Error::EndOfStream)));
        assert_eq!(enc.staged_bytes(), 0);

        // Contiguous timestamps covering every input sample
        for pair in packets.windows(2) {
            assert_eq!(pair[0].pts.value + pair[0].duration, pair[1].pts.value);
        }
        let last = packets.last().unwrap();
        let end = last.pts.value + last.duration;
        assert!((44100 - 2048..=44100 + 2048).contains(&end), "stream ends at {}", end);
        assert!(packets.iter().all(|p| p.is_keyframe() && !p.data.is_empty()));
    }

    #[test]
    fn test_planar_input() {
        let mut enc = VorbisEncoder::new_quality(44100, 2, 3.0).unwrap();
        let left = sine(4096, 1, 440.0);
        let right = sine(4096, 1, 660.0);

        let mut frame = AudioFrame::new(4096, 44100, 2, SampleFormat::F32P);
        frame.data.push(Buffer::from_f32_samples(&left));
        frame.data.push(Buffer::from_f32_samples(&right));
        enc.send_frame(&frame).unwrap();
        enc.flush().unwrap();

        assert!(!drain_all(&mut enc).is_empty());
    }

    #[test]
    fn test_pts_offset_from_first_frame() {
        let mut enc = VorbisEncoder::new_quality(44100, 1, 3.0).unwrap();
        let mut frame = AudioFrame::from_interleaved_f32(&sine(8192, 1, 440.0), 44100, 1);
        frame.pts = Timestamp::new(1000);
        enc.send_frame(&frame).unwrap();
        enc.flush().unwrap();

        let packets = drain_all(&mut enc);
        assert_eq!(packets[0].pts.value, 1000);
    }

    #[test]
    fn test_send_after_flush_rejected() {
        let mut enc = VorbisEncoder::new_quality(44100, 1, 3.0).unwrap();
        enc.flush().unwrap();
        enc.flush().unwrap();
        let frame = AudioFrame::from_interleaved_f32(&[0.0; 64], 44100, 1);
        assert!(matches!(
            enc.send_frame(&frame),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn test_mismatched_frames_rejected() {
        let mut enc = VorbisEncoder::new_quality(44100, 2, 3.0).unwrap();

        let frame = AudioFrame::from_interleaved_f32(&[0.0; 128], 48000, 2);
        assert!(enc.send_frame(&frame).is_err());

        let frame = AudioFrame::from_interleaved_f32(&[0.0; 128], 44100, 1);
        assert!(enc.send_frame(&frame).is_err());

        let mut frame = AudioFrame::new(64, 44100, 2, SampleFormat::I16);
        frame.data.push(Buffer::from_vec(vec![0u8; 256]));
        assert!(matches!(enc.send_frame(&frame), Err(Error::Unsupported(_))));
    }

    #[test]
    fn test_receive_into_small_buffer_keeps_packet() {
        let mut enc = VorbisEncoder::new_quality(44100, 2, 3.0).unwrap();
        let frame = AudioFrame::from_interleaved_f32(&sine(8192, 2, 440.0), 44100, 2);
        enc.send_frame(&frame).unwrap();
        enc.flush().unwrap();

        let staged = enc.staged_packets();
        assert!(staged > 0);

        let mut tiny = [0u8; 1];
        match enc.receive_packet_into(&mut tiny) {
            Err(Error::BufferTooSmall { need, have }) => {
                assert!(need > 1);
                assert_eq!(have, 1);
                assert_eq!(enc.staged_packets(), staged);
            }
            Ok(n) => assert!(n <= 1),
            Err(e) => panic!("unexpected error: {}", e),
        }

        let mut buf = vec![0u8; 8192];
        let mut received = 0;
        while enc.receive_packet_into(&mut buf).unwrap() > 0 {
            received += 1;
        }
        assert!(received > 0);
    }

    #[test]
    fn test_stage_packet_budget() {
        let mut staged = VecDeque::new();
        let mut bytes = 0;
        let packet = |len| RawPacket {
            data: vec![0u8; len],
            granulepos: 0,
            end_of_stream: false,
        };

        assert!(stage_packet(&mut staged, &mut bytes, packet(100)));
        let rest = STAGING_BUFFER_SIZE - bytes - PACKET_HEADER_SIZE;
        assert!(!stage_packet(&mut staged, &mut bytes, packet(rest)));
        assert_eq!(bytes, STAGING_BUFFER_SIZE);

        // Packets of the block in progress are still kept past the budget
        assert!(!stage_packet(&mut staged, &mut bytes, packet(1)));
        assert_eq!(staged.len(), 3);
    }

    /// Frame where every framework channel holds its own index as a constant
    fn indexed_frame(channels: u16, samples: usize, format: SampleFormat) -> AudioFrame {
        let mut frame = AudioFrame::new(samples, 44100, channels, format);
        match format {
            SampleFormat::F32P => {
                for ch in 0..channels {
                    frame
                        .data
                        .push(Buffer::from_f32_samples(&vec![ch as f32; samples]));
                }
            }
            _ => {
                let interleaved: Vec<f32> = (0..samples)
                    .flat_map(|_| (0..channels).map(|ch| ch as f32))
                    .collect();
                frame.data.push(Buffer::from_f32_samples(&interleaved));
            }
        }
        frame
    }

    fn vorbis_planes(frame: &AudioFrame) -> Vec<Vec<f32>> {
        (0..frame.channels as usize)
            .map(|c| {
                let mut dst = vec![-1.0; frame.nb_samples];
                copy_vorbis_channel(frame, c, &mut dst);
                dst
            })
            .collect()
    }

    #[test]
    fn test_channel_copy_5_1_packed_and_planar() {
        // FL FR FC LFE BL BR in, FL FC FR BL BR LFE out
        let expected = [0.0, 2.0, 1.0, 4.0, 5.0, 3.0];
        for format in [SampleFormat::F32, SampleFormat::F32P] {
            let planes = vorbis_planes(&indexed_frame(6, 32, format));
            for (c, plane) in planes.iter().enumerate() {
                assert!(
                    plane.iter().all(|&s| s == expected[c]),
                    "{:?} vorbis channel {} holds {:?}",
                    format,
                    c,
                    &plane[..4]
                );
            }
        }
    }

    #[test]
    fn test_channel_copy_passthrough_above_eight() {
        for format in [SampleFormat::F32, SampleFormat::F32P] {
            let planes = vorbis_planes(&indexed_frame(10, 16, format));
            for (c, plane) in planes.iter().enumerate() {
                assert!(plane.iter().all(|&s| s == c as f32));
            }
        }
    }

    #[test]
    fn test_long_frame_pauses_analysis_without_loss() {
        let mut enc = VorbisEncoder::new_quality(44100, 2, 10.0).unwrap();

        // White-ish noise keeps q10 packets large
        let mut seed = 0x1234_5678u32;
        let samples: Vec<f32> = (0..441_000 * 2)
            .map(|_| {
                seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (seed >> 8) as f32 / (1u32 << 24) as f32 - 0.5
            })
            .collect();
        let frame = AudioFrame::from_interleaved_f32(&samples, 44100, 2);
        enc.send_frame(&frame).unwrap();
        assert!(enc.is_staging_full());

        let small = AudioFrame::from_interleaved_f32(&[0.0; 2048], 44100, 2);
        assert!(matches!(enc.send_frame(&small), Err(Error::TryAgain)));
        assert_eq!(enc.samples_sent(), 441_000);

        let mut packets = drain_all(&mut enc);
        enc.send_frame(&small).unwrap();
        packets.extend(drain_all(&mut enc));
        enc.flush().unwrap();
        packets.extend(drain_all(&mut enc));
        assert!(matches!(enc.receive_packet(), Err(Error::EndOfStream)));

        for pair in packets.windows(2) {
            assert_eq!(pair[0].pts.value + pair[0].duration, pair[1].pts.value);
        }
        let last = packets.last().unwrap();
        let end = last.pts.value + last.duration;
        let total = 441_000 + 1024;
        assert!((total - 2048..=total + 2048).contains(&end), "stream ends at {}", end);
    }
}
