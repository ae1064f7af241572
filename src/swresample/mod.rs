//! Audio sample format conversion
//!
//! The Vorbis encoder only consumes float input; everything else passes
//! through here first. Resampling and channel remixing are not provided.

pub mod convert;

pub use convert::{to_f32_interleaved, to_f32_samples};
