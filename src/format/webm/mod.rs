//! WebM/Matroska output
//!
//! Writes Vorbis audio tracks; the codec private data is the Xiph-laced
//! header blob produced by the encoder.

pub mod muxer;

pub use muxer::WebmMuxer;
