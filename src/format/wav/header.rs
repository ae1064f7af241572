//! WAV file header structures and parsing

use super::{ChunkHeader, DATA_CHUNK, FMT_CHUNK, RIFF_MAGIC, WAVE_MAGIC};
use crate::error::{Error, Result};
use crate::util::SampleFormat;
use std::io::{Read, Seek, SeekFrom};

/// WAV format tag identifying the sample encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatTag {
    /// Integer PCM
    Pcm,
    /// IEEE float
    IeeeFloat,
    /// WAVE_FORMAT_EXTENSIBLE; the real tag lives in the sub-format GUID
    Extensible,
    /// Anything else
    Unknown(u16),
}

impl From<u16> for FormatTag {
    fn from(val: u16) -> Self {
        match val {
            0x0001 => FormatTag::Pcm,
            0x0003 => FormatTag::IeeeFloat,
            0xFFFE => FormatTag::Extensible,
            other => FormatTag::Unknown(other),
        }
    }
}

impl From<FormatTag> for u16 {
    fn from(tag: FormatTag) -> Self {
        match tag {
            FormatTag::Pcm => 0x0001,
            FormatTag::IeeeFloat => 0x0003,
            FormatTag::Extensible => 0xFFFE,
            FormatTag::Unknown(val) => val,
        }
    }
}

/// WAV format chunk data
#[derive(Debug, Clone)]
pub struct WavFormat {
    /// Sample encoding, with extensible headers already resolved
    pub format_tag: FormatTag,
    /// Number of channels
    pub channels: u16,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Average bytes per second
    pub byte_rate: u32,
    /// Bytes per sample frame (all channels)
    pub block_align: u16,
    /// Bits per sample
    pub bits_per_sample: u16,
    /// Speaker mask from an extensible header
    pub channel_mask: Option<u32>,
}

impl WavFormat {
    /// Parse WAV format chunk from bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < 16 {
            return Err(Error::format("WAV format chunk too small"));
        }

        let mut format_tag = FormatTag::from(u16::from_le_bytes([data[0], data[1]]));
        let channels = u16::from_le_bytes([data[2], data[3]]);
        let sample_rate = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        let byte_rate = u32::from_le_bytes([data[8], data[9], data[10], data[11]]);
        let block_align = u16::from_le_bytes([data[12], data[13]]);
        let bits_per_sample = u16::from_le_bytes([data[14], data[15]]);

        let mut channel_mask = None;
        if format_tag == FormatTag::Extensible {
            // cbSize(2) validBits(2) channelMask(4) subFormat GUID(16)
            if data.len() < 40 {
                return Err(Error::format("WAV extensible format chunk too small"));
            }
            channel_mask = Some(u32::from_le_bytes([data[20], data[21], data[22], data[23]]));
            format_tag = FormatTag::from(u16::from_le_bytes([data[24], data[25]]));
        }

        Ok(WavFormat {
            format_tag,
            channels,
            sample_rate,
            byte_rate,
            block_align,
            bits_per_sample,
            channel_mask,
        })
    }

    /// Get the packed sample format of the data chunk
    pub fn sample_format(&self) -> SampleFormat {
        match (self.format_tag, self.bits_per_sample) {
            (FormatTag::Pcm, 8) => SampleFormat::U8,
            (FormatTag::Pcm, 16) => SampleFormat::I16,
            (FormatTag::Pcm, 32) => SampleFormat::I32,
            (FormatTag::IeeeFloat, 32) => SampleFormat::F32,
            (FormatTag::IeeeFloat, 64) => SampleFormat::F64,
            _ => SampleFormat::Unknown,
        }
    }

    /// Calculate expected block alignment
    ///
    /// Fails when the header's channel count and sample width describe a
    /// frame wider than the 16-bit `nBlockAlign` field can hold.
    pub fn calculate_block_align(&self) -> Result<u16> {
        u32::from(self.channels)
            .checked_mul(u32::from(self.bits_per_sample / 8))
            .and_then(|align| u16::try_from(align).ok())
            .ok_or_else(|| {
                Error::format(format!(
                    "Block align overflow: {} channels of {} bits",
                    self.channels, self.bits_per_sample
                ))
            })
    }

    /// Validate format parameters
    pub fn validate(&self) -> Result<()> {
        if self.channels == 0 {
            return Err(Error::format("Invalid channel count: 0"));
        }

        if self.sample_rate == 0 {
            return Err(Error::format("Invalid sample rate: 0"));
        }

        if self.bits_per_sample == 0 || self.bits_per_sample % 8 != 0 {
            return Err(Error::format(format!(
                "Invalid bits per sample: {}",
                self.bits_per_sample
            )));
        }

        let expected_block_align = self.calculate_block_align()?;
        if self.block_align != expected_block_align {
            return Err(Error::format(format!(
                "Block align mismatch: expected {}, got {}",
                expected_block_align, self.block_align
            )));
        }

        Ok(())
    }
}

/// Parsed WAV header
#[derive(Debug, Clone)]
pub struct WavHeader {
    /// WAV format information
    pub format: WavFormat,
    /// Data chunk size in bytes
    pub data_size: u32,
    /// Data chunk start position in file
    pub data_start: u64,
}

impl WavHeader {
    /// Read and parse a WAV header, leaving the reader at the start of the samples
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let mut riff_header = [0u8; 12];
        reader
            .read_exact(&mut riff_header)
            .map_err(|e| Error::format(format!("Failed to read RIFF header: {}", e)))?;

        if &riff_header[0..4] != RIFF_MAGIC {
            return Err(Error::format("Not a valid RIFF file"));
        }
        if &riff_header[8..12] != WAVE_MAGIC {
            return Err(Error::format("Not a valid WAVE file"));
        }

        let mut format = None;
        loop {
            let chunk = Self::next_chunk(reader)?;

            if &chunk.id == FMT_CHUNK {
                let mut fmt_data = vec![0u8; chunk.size as usize];
                reader
                    .read_exact(&mut fmt_data)
                    .map_err(|e| Error::format(format!("Failed to read fmt chunk: {}", e)))?;
                Self::skip_padding(reader, chunk.size)?;

                let parsed = WavFormat::from_bytes(&fmt_data)?;
                parsed.validate()?;
                format = Some(parsed);
            } else if &chunk.id == DATA_CHUNK {
                let format = format.ok_or_else(|| Error::format("data chunk before fmt chunk"))?;
                let data_start = reader
                    .stream_position()
                    .map_err(|e| Error::format(format!("Failed to get data position: {}", e)))?;

                // Streamed WAVs leave the size unset; read until EOF then
                let data_size = if chunk.size == u32::MAX || chunk.size == 0 {
                    let end = reader.seek(SeekFrom::End(0))?;
                    reader.seek(SeekFrom::Start(data_start))?;
                    (end - data_start).min(u32::MAX as u64) as u32
                } else {
                    chunk.size
                };

                return Ok(WavHeader {
                    format,
                    data_size,
                    data_start,
                });
            } else {
                reader
                    .seek(SeekFrom::Current(chunk.size as i64))
                    .map_err(|e| Error::format(format!("Failed to skip chunk: {}", e)))?;
                Self::skip_padding(reader, chunk.size)?;
            }
        }
    }

    fn next_chunk<R: Read>(reader: &mut R) -> Result<ChunkHeader> {
        let mut bytes = [0u8; 8];
        reader
            .read_exact(&mut bytes)
            .map_err(|_| Error::format("data chunk not found"))?;
        ChunkHeader::from_bytes(&bytes).ok_or_else(|| Error::format("Truncated chunk header"))
    }

    // Chunks are word aligned
    fn skip_padding<R: Seek>(reader: &mut R, size: u32) -> Result<()> {
        if size % 2 != 0 {
            reader.seek(SeekFrom::Current(1))?;
        }
        Ok(())
    }

    /// Get duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        self.num_samples() as f64 / self.format.sample_rate as f64
    }

    /// Get total number of samples (per channel)
    pub fn num_samples(&self) -> u64 {
        self.data_size as u64 / self.format.block_align as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn pcm16_format(channels: u16) -> Vec<u8> {
        let block_align = channels * 2;
        let mut fmt = Vec::new();
        fmt.extend_from_slice(&1u16.to_le_bytes());
        fmt.extend_from_slice(&channels.to_le_bytes());
        fmt.extend_from_slice(&48000u32.to_le_bytes());
        fmt.extend_from_slice(&(48000 * block_align as u32).to_le_bytes());
        fmt.extend_from_slice(&block_align.to_le_bytes());
        fmt.extend_from_slice(&16u16.to_le_bytes());
        fmt
    }

    fn chunk(id: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut out = ChunkHeader {
            id: *id,
            size: body.len() as u32,
        }
        .to_bytes()
        .to_vec();
        out.extend_from_slice(body);
        if body.len() % 2 != 0 {
            out.push(0);
        }
        out
    }

    #[test]
    fn test_format_tag_conversion() {
        assert_eq!(u16::from(FormatTag::Pcm), 0x0001);
        assert_eq!(FormatTag::from(0x0003), FormatTag::IeeeFloat);
        assert_eq!(FormatTag::from(0x0055), FormatTag::Unknown(0x0055));
    }

    #[test]
    fn test_wav_format_validation() {
        let mut format = WavFormat::from_bytes(&pcm16_format(2)).unwrap();
        assert!(format.validate().is_ok());
        assert_eq!(format.sample_format(), SampleFormat::I16);

        format.channels = 0;
        assert!(format.validate().is_err());
        format.channels = 2;

        format.block_align = 3;
        assert!(format.validate().is_err());
    }

    #[test]
    fn test_oversized_block_align_is_format_error() {
        let mut fmt = pcm16_format(2);
        fmt[2..4].copy_from_slice(&u16::MAX.to_le_bytes());

        let format = WavFormat::from_bytes(&fmt).unwrap();
        assert!(matches!(format.calculate_block_align(), Err(Error::Format(_))));
        assert!(matches!(format.validate(), Err(Error::Format(_))));

        // 32768 channels of 16 bits is one byte past the field
        let mut format = WavFormat::from_bytes(&pcm16_format(2)).unwrap();
        format.channels = 32768;
        assert!(format.calculate_block_align().is_err());
        format.channels = 32767;
        assert_eq!(format.calculate_block_align().unwrap(), 65534);
    }

    #[test]
    fn test_extensible_resolves_subformat() {
        let mut fmt = pcm16_format(2);
        fmt[0..2].copy_from_slice(&0xFFFEu16.to_le_bytes());
        fmt[14..16].copy_from_slice(&32u16.to_le_bytes());
        fmt[12..14].copy_from_slice(&8u16.to_le_bytes());
        fmt.extend_from_slice(&22u16.to_le_bytes());
        fmt.extend_from_slice(&32u16.to_le_bytes());
        fmt.extend_from_slice(&0x3u32.to_le_bytes());
        fmt.extend_from_slice(&3u16.to_le_bytes());
        fmt.extend_from_slice(&[0u8; 14]);

        let format = WavFormat::from_bytes(&fmt).unwrap();
        assert_eq!(format.format_tag, FormatTag::IeeeFloat);
        assert_eq!(format.channel_mask, Some(0x3));
        assert_eq!(format.sample_format(), SampleFormat::F32);
    }

    #[test]
    fn test_read_skips_unknown_chunks() {
        let samples = [0u8; 40];
        let mut body = WAVE_MAGIC.to_vec();
        body.extend(chunk(b"junk", &[1, 2, 3]));
        body.extend(chunk(FMT_CHUNK, &pcm16_format(1)));
        body.extend(chunk(DATA_CHUNK, &samples));

        let mut file = RIFF_MAGIC.to_vec();
        file.extend_from_slice(&(body.len() as u32).to_le_bytes());
        file.extend(body);

        let header = WavHeader::read(&mut Cursor::new(file)).unwrap();
        assert_eq!(header.format.channels, 1);
        assert_eq!(header.num_samples(), 20);
        assert_eq!(header.data_start, 12 + 12 + 8 + 16 + 8);
    }

    #[test]
    fn test_read_rejects_non_riff() {
        let data = b"OggS\0\0\0\0WAVE".to_vec();
        assert!(WavHeader::read(&mut Cursor::new(data)).is_err());
    }
}
