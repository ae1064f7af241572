//! Vorbis audio encoding through libvorbisenc
//!
//! Vorbis is a free, open-source lossy audio codec managed by the Xiph.Org
//! Foundation. Encoding is done by the reference library (with the aoTuV and
//! Lancer patchsets); this module adapts it to ZVD's encoder interface.
//!
//! ## Features
//! - **Quality VBR**: oggenc scale -1 (lowest) to 10 (highest), default 3
//! - **Managed bitrate**: nominal bitrate with optional min/max limits
//! - **Lowpass cutoff** and **impulse block bias** tuning
//! - **Channels**: 1 to 255, reordered to the Vorbis layout up to 7.1
//! - **Extradata**: Xiph-laced header packets for Matroska/WebM `CodecPrivate`

pub mod encoder;
pub mod ffi;
pub mod headers;
pub mod options;

pub use encoder::{VorbisEncoder, FRAME_SIZE, STAGING_BUFFER_SIZE};
pub use headers::{xiph_lacing, xiph_len, HeaderPackets};
pub use options::{RateControl, VorbisOptions};
