//! WAV file demuxer implementation

use super::header::{FormatTag, WavHeader};
use crate::codec::AudioFrame;
use crate::error::{Error, Result};
use crate::format::{AudioInfo, Demuxer, DemuxerContext, Packet, Stream, StreamInfo};
use crate::util::{Buffer, Timestamp};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::debug;

/// Samples per channel in each packet unless overridden
pub const DEFAULT_PACKET_SAMPLES: usize = 1024;

/// WAV demuxer producing packed PCM packets
pub struct WavDemuxer {
    reader: Option<BufReader<File>>,
    context: DemuxerContext,
    header: Option<WavHeader>,
    packet_samples: usize,
    samples_read: u64,
    total_samples: u64,
}

impl WavDemuxer {
    /// Create a new WAV demuxer
    pub fn new() -> Self {
        WavDemuxer {
            reader: None,
            context: DemuxerContext::new("wav"),
            header: None,
            packet_samples: DEFAULT_PACKET_SAMPLES,
            samples_read: 0,
            total_samples: 0,
        }
    }

    /// Set how many samples per channel each packet carries
    pub fn set_packet_samples(&mut self, samples: usize) {
        self.packet_samples = samples.max(1);
    }

    /// Get the current header
    pub fn header(&self) -> Option<&WavHeader> {
        self.header.as_ref()
    }

    /// Wrap a packet from this demuxer as a packed audio frame
    pub fn packet_to_frame(&self, packet: &Packet) -> Result<AudioFrame> {
        let header = self
            .header
            .as_ref()
            .ok_or_else(|| Error::invalid_state("Demuxer not opened"))?;
        let format = &header.format;

        let block_align = format.block_align as usize;
        if packet.size() % block_align != 0 {
            return Err(Error::format(format!(
                "PCM packet of {} bytes is not a multiple of block align {}",
                packet.size(),
                block_align
            )));
        }

        let mut frame = AudioFrame::new(
            packet.size() / block_align,
            format.sample_rate,
            format.channels,
            format.sample_format(),
        );
        frame.data.push(packet.data.clone());
        frame.pts = packet.pts;
        frame.duration = packet.duration;
        Ok(frame)
    }
}

impl Default for WavDemuxer {
    fn default() -> Self {
        Self::new()
    }
}

impl Demuxer for WavDemuxer {
    fn open(&mut self, path: &Path) -> Result<()> {
        let file = File::open(path)
            .map_err(|e| Error::format(format!("Failed to open WAV file: {}", e)))?;

        let mut reader = BufReader::new(file);
        let header = WavHeader::read(&mut reader)?;

        if !matches!(
            header.format.format_tag,
            FormatTag::Pcm | FormatTag::IeeeFloat
        ) || header.format.sample_format().sample_size() == 0
        {
            return Err(Error::unsupported(format!(
                "Unsupported WAV format: {:?} at {} bits",
                header.format.format_tag, header.format.bits_per_sample
            )));
        }

        self.total_samples = header.num_samples();

        reader
            .seek(SeekFrom::Start(header.data_start))
            .map_err(|e| Error::format(format!("Failed to seek to data: {}", e)))?;

        let audio_info = AudioInfo {
            sample_rate: header.format.sample_rate,
            channels: header.format.channels,
            sample_fmt: header.format.sample_format(),
            bit_rate: Some(header.format.byte_rate as u64 * 8),
        };
        let mut stream_info = StreamInfo::new_audio(0, "pcm", audio_info);
        stream_info.duration = self.total_samples as i64;
        stream_info.metadata.insert(
            "duration".to_string(),
            format!("{:.2}s", header.duration_seconds()),
        );

        debug!(
            "Opened {} {}: {} Hz, {} channels, {}, {} samples",
            self.context.format_name(),
            path.display(),
            header.format.sample_rate,
            header.format.channels,
            header.format.sample_format(),
            self.total_samples
        );

        self.context.clear();
        self.context.add_stream(Stream::new(stream_info));
        self.header = Some(header);
        self.reader = Some(reader);
        self.samples_read = 0;

        Ok(())
    }

    fn streams(&self) -> &[Stream] {
        self.context.streams()
    }

    fn read_packet(&mut self) -> Result<Packet> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| Error::invalid_state("Demuxer not opened"))?;

        let header = self
            .header
            .as_ref()
            .ok_or_else(|| Error::invalid_state("No header parsed"))?;

        if self.samples_read >= self.total_samples {
            return Err(Error::EndOfStream);
        }

        let samples_to_read =
            (self.packet_samples as u64).min(self.total_samples - self.samples_read);
        let bytes_to_read = (samples_to_read * header.format.block_align as u64) as usize;

        let mut buffer = vec![0u8; bytes_to_read];
        reader
            .read_exact(&mut buffer)
            .map_err(|e| Error::format(format!("Failed to read audio data: {}", e)))?;

        let mut packet = Packet::new_audio(0, Buffer::from_vec(buffer));
        packet.set_timestamp(Timestamp::new(self.samples_read as i64));
        packet.duration = samples_to_read as i64;
        packet.set_keyframe(true);

        self.samples_read += samples_to_read;

        Ok(packet)
    }

    fn seek(&mut self, _stream_index: usize, timestamp: i64) -> Result<()> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| Error::invalid_state("Demuxer not opened"))?;

        let header = self
            .header
            .as_ref()
            .ok_or_else(|| Error::invalid_state("No header parsed"))?;

        if timestamp < 0 || timestamp > self.total_samples as i64 {
            return Err(Error::invalid_input(format!(
                "Seek timestamp {} out of range (0-{})",
                timestamp, self.total_samples
            )));
        }

        let byte_offset = timestamp as u64 * header.format.block_align as u64;
        reader
            .seek(SeekFrom::Start(header.data_start + byte_offset))
            .map_err(|e| Error::format(format!("Failed to seek: {}", e)))?;

        self.samples_read = timestamp as u64;

        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.reader = None;
        self.header = None;
        self.context.clear();
        self.samples_read = 0;
        self.total_samples = 0;
        Ok(())
    }
}
