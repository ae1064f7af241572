//! WebM muxer for Vorbis audio
//!
//! A small WebM/Matroska writer built on the `mkv-element` crate. Each stream
//! becomes an `A_VORBIS` track whose `CodecPrivate` carries the packed header
//! packets; packets are written as SimpleBlocks grouped into clusters, with one
//! cue point per cluster.

use crate::error::{Error, Result};
use crate::format::{Muxer, MuxerContext, Packet, Stream};
use crate::util::{MediaType, Rational};
use mkv_element::io::blocking_impl::WriteTo;
use mkv_element::{prelude::*, ClusterBlock};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;
use tracing::debug;

/// Matroska codec ID for Vorbis
pub const VORBIS_CODEC_ID: &str = "A_VORBIS";

/// WebM muxer
pub struct WebmMuxer {
    writer: Option<BufWriter<File>>,
    context: MuxerContext,
    track_map: HashMap<usize, u64>, // stream_index -> track_number
    timecode_scale_ns: u64,
    cluster_timecode: u64,
    segment_start: u64,
    pending_blocks: Vec<ClusterBlock>,
    cues: Vec<CuePoint>,
    max_blocks_per_cluster: usize,
    max_cluster_span_tc: u64,
    blocks_written: u64,
}

impl WebmMuxer {
    /// Create a muxer writing the `webm` doc type
    pub fn new() -> Self {
        WebmMuxer {
            writer: None,
            context: MuxerContext::new("webm"),
            track_map: HashMap::new(),
            timecode_scale_ns: 1_000_000, // 1ms
            cluster_timecode: 0,
            segment_start: 0,
            pending_blocks: Vec::new(),
            cues: Vec::new(),
            max_blocks_per_cluster: 256,
            max_cluster_span_tc: 5_000,
            blocks_written: 0,
        }
    }

    /// Create a muxer writing the `matroska` doc type
    pub fn matroska() -> Self {
        WebmMuxer {
            context: MuxerContext::new("matroska"),
            ..WebmMuxer::new()
        }
    }

    /// Number of SimpleBlocks written so far
    pub fn blocks_written(&self) -> u64 {
        self.blocks_written
    }

    fn writer(&mut self) -> Result<&mut BufWriter<File>> {
        self.writer
            .as_mut()
            .ok_or_else(|| Error::invalid_state("WebM writer not initialized"))
    }

    fn encode_simple_block(track_number: u64, rel_timecode: i16, data: &[u8]) -> SimpleBlock {
        // TrackNumber (vint), Timecode (i16 BE), Flags, Payload.
        // Every Vorbis packet is independently decodable once the headers are known.
        let mut body = Vec::with_capacity(data.len() + 4);
        write_vint(track_number, &mut body);
        body.extend_from_slice(&rel_timecode.to_be_bytes());
        body.push(0x80);
        body.extend_from_slice(data);
        SimpleBlock(body)
    }

    fn build_info(&self) -> Info {
        Info {
            timestamp_scale: TimestampScale(self.timecode_scale_ns),
            muxing_app: MuxingApp(crate::IDENT.to_string()),
            writing_app: WritingApp(crate::IDENT.to_string()),
            ..Default::default()
        }
    }

    fn build_tracks(&self) -> Result<Tracks> {
        let mut entries = Vec::new();
        for stream in self.context.streams() {
            let track_number = self
                .track_map
                .get(&stream.info.index)
                .copied()
                .ok_or_else(|| Error::format("Stream without a track number"))?;
            let audio = stream
                .info
                .audio_info
                .as_ref()
                .ok_or_else(|| Error::format("Audio stream missing audio info"))?;
            let codec_private = stream
                .extradata
                .as_ref()
                .ok_or_else(|| Error::format("Vorbis track requires header extradata"))?;

            let mut entry = TrackEntry::default();
            entry.track_number = TrackNumber(track_number);
            entry.track_uid = TrackUid(track_number);
            entry.track_type = TrackType(2);
            entry.flag_enabled = FlagEnabled(1);
            entry.flag_default = FlagDefault(1);
            entry.flag_forced = FlagForced(0);
            entry.flag_lacing = FlagLacing(0);
            entry.max_block_addition_id = MaxBlockAdditionId(0);
            entry.language = Language("und".to_string());
            entry.codec_id = CodecId(VORBIS_CODEC_ID.to_string());
            entry.codec_private = Some(CodecPrivate(codec_private.clone()));
            entry.codec_delay = CodecDelay(0);
            entry.seek_pre_roll = SeekPreRoll(0);
            entry.audio = Some(Audio {
                sampling_frequency: SamplingFrequency(audio.sample_rate as f64),
                output_sampling_frequency: None,
                channels: Channels(audio.channels as u64),
                bit_depth: None,
                emphasis: Emphasis(0),
                crc32: None,
                void: None,
            });
            entries.push(entry);
        }

        Ok(Tracks {
            track_entry: entries,
            ..Default::default()
        })
    }

    fn write_ebml_header(&mut self) -> Result<()> {
        let ebml = Ebml {
            ebml_max_id_length: EbmlMaxIdLength(4),
            ebml_max_size_length: EbmlMaxSizeLength(8),
            doc_type: Some(DocType(self.context.format_name().to_string())),
            doc_type_version: Some(DocTypeVersion(4)),
            doc_type_read_version: Some(DocTypeReadVersion(2)),
            ..Default::default()
        };
        let writer = self.writer()?;
        ebml.write_to(writer)
            .map_err(|e| Error::format(format!("Failed to write EBML header: {}", e)))
    }

    fn start_segment(&mut self) -> Result<()> {
        let writer = self.writer()?;

        // Segment ID followed by an unknown (all ones) size
        writer.write_all(&[0x18, 0x53, 0x80, 0x67])?;
        writer.write_all(&[0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF])?;

        let segment_start = writer.stream_position()?;
        self.segment_start = segment_start;
        Ok(())
    }

    fn flush_cluster(&mut self) -> Result<()> {
        if self.pending_blocks.is_empty() {
            return Ok(());
        }

        let blocks = std::mem::take(&mut self.pending_blocks);
        let timecode = self.cluster_timecode;
        let segment_start = self.segment_start;
        let track_number = self.track_map.values().copied().min().unwrap_or(1);

        let writer = self.writer()?;
        let cluster_pos = writer.stream_position()?;

        let cluster = Cluster {
            timestamp: Timestamp(timecode),
            blocks,
            ..Default::default()
        };
        cluster
            .write_to(writer)
            .map_err(|e| Error::format(format!("Failed to write cluster: {}", e)))?;

        self.cues.push(CuePoint {
            cue_time: CueTime(timecode),
            cue_track_positions: vec![CueTrackPositions {
                cue_track: CueTrack(track_number),
                cue_cluster_position: CueClusterPosition(cluster_pos.saturating_sub(segment_start)),
                cue_codec_state: CueCodecState(0),
                ..Default::default()
            }],
            ..Default::default()
        });

        Ok(())
    }

    fn timecode_units(&self, pts: i64, time_base: Rational) -> u64 {
        if !time_base.is_valid_time_base() || pts <= 0 {
            return 0;
        }
        let nanos = pts as i128 * time_base.num as i128 * 1_000_000_000 / time_base.den as i128;
        (nanos / self.timecode_scale_ns as i128) as u64
    }
}

impl Default for WebmMuxer {
    fn default() -> Self {
        Self::new()
    }
}

/// Minimal-length EBML variable-size integer
fn write_vint(value: u64, buf: &mut Vec<u8>) {
    for width in 1..=8usize {
        let max = (1u64 << (7 * width)) - 1;
        if value < max {
            let marker = 1u8 << (8 - width);
            let mut bytes = vec![0u8; width];
            let mut v = value;
            for b in bytes.iter_mut().rev() {
                *b = (v & 0xFF) as u8;
                v >>= 8;
            }
            bytes[0] |= marker;
            buf.extend_from_slice(&bytes);
            return;
        }
    }
    buf.extend_from_slice(&[0x01, 0, 0, 0, 0, 0, 0, 0]);
}

impl Muxer for WebmMuxer {
    fn create(&mut self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .map_err(|e| Error::format(format!("Failed to create WebM file: {}", e)))?;
        self.writer = Some(BufWriter::new(file));
        Ok(())
    }

    fn add_stream(&mut self, stream: Stream) -> Result<usize> {
        if self.context.is_header_written() {
            return Err(Error::invalid_state("Cannot add streams after the header"));
        }
        if stream.info.media_type != MediaType::Audio || stream.info.codec_id != "vorbis" {
            return Err(Error::unsupported(format!(
                "WebM muxer only writes Vorbis audio, got {} {}",
                stream.info.media_type, stream.info.codec_id
            )));
        }
        if self.track_map.contains_key(&stream.info.index) {
            return Err(Error::invalid_input(format!(
                "Duplicate stream index {}",
                stream.info.index
            )));
        }

        let track_number = (self.track_map.len() as u64) + 1;
        self.track_map.insert(stream.info.index, track_number);
        Ok(self.context.add_stream(stream))
    }

    fn write_header(&mut self) -> Result<()> {
        if self.context.is_header_written() {
            return Err(Error::invalid_state("Header already written"));
        }
        if self.context.streams().is_empty() {
            return Err(Error::invalid_state("No streams added to WebM muxer"));
        }

        let tracks = self.build_tracks()?;
        let info = self.build_info();

        self.write_ebml_header()?;
        self.start_segment()?;

        let writer = self.writer()?;
        info.write_to(writer)
            .map_err(|e| Error::format(format!("Failed to write Info: {}", e)))?;
        tracks
            .write_to(writer)
            .map_err(|e| Error::format(format!("Failed to write Tracks: {}", e)))?;

        self.context.set_header_written();
        Ok(())
    }

    fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        if !self.context.is_header_written() {
            return Err(Error::invalid_state("WebM header not written"));
        }

        let track_number = *self
            .track_map
            .get(&packet.stream_index)
            .ok_or_else(|| Error::format(format!("Unknown stream {}", packet.stream_index)))?;
        let time_base = self
            .context
            .stream(packet.stream_index)
            .map(|s| s.info.time_base)
            .ok_or_else(|| Error::format("Stream not found"))?;

        let pkt_timecode = self.timecode_units(packet.pts.value, time_base);

        if self.pending_blocks.is_empty() {
            self.cluster_timecode = pkt_timecode;
        } else {
            let rel = pkt_timecode.saturating_sub(self.cluster_timecode);
            if rel > self.max_cluster_span_tc
                || rel > i16::MAX as u64
                || self.pending_blocks.len() >= self.max_blocks_per_cluster
            {
                self.flush_cluster()?;
                self.cluster_timecode = pkt_timecode;
            }
        }

        let rel = pkt_timecode.saturating_sub(self.cluster_timecode) as i16;
        let block = Self::encode_simple_block(track_number, rel, packet.data.as_slice());
        self.pending_blocks.push(block.into());
        self.blocks_written += 1;

        Ok(())
    }

    fn write_trailer(&mut self) -> Result<()> {
        self.flush_cluster()?;

        let cues = Cues {
            cue_point: std::mem::take(&mut self.cues),
            ..Default::default()
        };
        let blocks = self.blocks_written;

        let writer = self.writer()?;
        if !cues.cue_point.is_empty() {
            cues.write_to(writer)
                .map_err(|e| Error::format(format!("Failed to write cues: {}", e)))?;
        }
        writer.flush()?;

        debug!("WebM trailer written after {} blocks", blocks);
        self.writer = None;
        Ok(())
    }
}
