//! Vorbis header packets and their Xiph-laced extradata form
//!
//! Containers that carry Vorbis outside of Ogg (Matroska/WebM, for one) embed
//! the three header packets as a single blob:
//!
//! ```text
//! 0x02 | lace(len(id)) | lace(len(comment)) | id | comment | setup
//! ```
//!
//! The leading byte is the packet count minus one; the setup header size is
//! implied by the remaining length.

use crate::error::{Error, Result};

/// Packet type byte of the identification header
pub const IDENTIFICATION_TYPE: u8 = 1;
/// Packet type byte of the comment header
pub const COMMENT_TYPE: u8 = 3;
/// Packet type byte of the setup header
pub const SETUP_TYPE: u8 = 5;

const VORBIS_MAGIC: &[u8; 6] = b"vorbis";

/// Number of bytes a Xiph-laced length field plus payload of `len` bytes takes
pub fn xiph_len(len: usize) -> usize {
    1 + len / 255 + len
}

/// Append the Xiph lacing for `len` to `out`, returning the bytes written
pub fn xiph_lacing(out: &mut Vec<u8>, len: usize) -> usize {
    let full = len / 255;
    out.extend(std::iter::repeat(255u8).take(full));
    out.push((len % 255) as u8);
    full + 1
}

/// Read one Xiph-laced length starting at `*pos`
fn read_lacing(data: &[u8], pos: &mut usize) -> Result<usize> {
    let mut len = 0usize;
    loop {
        let byte = *data
            .get(*pos)
            .ok_or_else(|| Error::format("Truncated Xiph lacing in extradata"))?;
        *pos += 1;
        len += byte as usize;
        if byte != 255 {
            return Ok(len);
        }
    }
}

/// The three Vorbis stream headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPackets {
    /// Identification header
    pub identification: Vec<u8>,
    /// Comment header
    pub comment: Vec<u8>,
    /// Setup (codebook) header
    pub setup: Vec<u8>,
}

impl HeaderPackets {
    /// Wrap the packets produced by the encoder
    pub fn new(packets: [Vec<u8>; 3]) -> Self {
        let [identification, comment, setup] = packets;
        HeaderPackets {
            identification,
            comment,
            setup,
        }
    }

    /// Check each packet starts with its type byte and the "vorbis" magic
    pub fn validate(&self) -> Result<()> {
        let expected = [
            ("identification", &self.identification, IDENTIFICATION_TYPE),
            ("comment", &self.comment, COMMENT_TYPE),
            ("setup", &self.setup, SETUP_TYPE),
        ];
        for (name, packet, packet_type) in expected {
            if packet.len() < 7 || packet[0] != packet_type || &packet[1..7] != VORBIS_MAGIC {
                return Err(Error::format(format!("Malformed Vorbis {} header", name)));
            }
        }
        Ok(())
    }

    /// Size of the packed extradata
    pub fn extradata_size(&self) -> usize {
        1 + xiph_len(self.identification.len()) + xiph_len(self.comment.len()) + self.setup.len()
    }

    /// Pack the headers into Xiph-laced extradata
    pub fn to_extradata(&self) -> Vec<u8> {
        let size = self.extradata_size();
        let mut out = Vec::with_capacity(size);

        out.push(2);
        xiph_lacing(&mut out, self.identification.len());
        xiph_lacing(&mut out, self.comment.len());
        out.extend_from_slice(&self.identification);
        out.extend_from_slice(&self.comment);
        out.extend_from_slice(&self.setup);

        assert_eq!(out.len(), size, "extradata size mismatch");
        out
    }

    /// Split Xiph-laced extradata back into its three header packets
    pub fn from_extradata(data: &[u8]) -> Result<Self> {
        let count = *data
            .first()
            .ok_or_else(|| Error::format("Empty Vorbis extradata"))?;
        if count != 2 {
            return Err(Error::format(format!(
                "Vorbis extradata must hold 3 packets, found {}",
                count as usize + 1
            )));
        }

        let mut pos = 1;
        let id_len = read_lacing(data, &mut pos)?;
        let comment_len = read_lacing(data, &mut pos)?;

        let body = &data[pos..];
        if id_len + comment_len > body.len() {
            return Err(Error::format(format!(
                "Vorbis header sizes {} + {} overrun {} bytes of extradata",
                id_len,
                comment_len,
                body.len()
            )));
        }

        let (identification, rest) = body.split_at(id_len);
        let (comment, setup) = rest.split_at(comment_len);
        Ok(HeaderPackets {
            identification: identification.to_vec(),
            comment: comment.to_vec(),
            setup: setup.to_vec(),
        })
    }
}
