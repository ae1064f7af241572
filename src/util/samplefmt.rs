//! Audio sample format definitions

use std::fmt;

/// Audio sample format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SampleFormat {
    /// Unsigned 8-bit
    U8,
    /// Signed 16-bit
    I16,
    /// Signed 32-bit
    I32,
    /// 32-bit float
    F32,
    /// 64-bit float
    F64,
    /// Unsigned 8-bit planar
    U8P,
    /// Signed 16-bit planar
    I16P,
    /// Signed 32-bit planar
    I32P,
    /// 32-bit float planar
    F32P,
    /// 64-bit float planar
    F64P,
    /// Unknown format
    #[default]
    Unknown,
}

impl SampleFormat {
    /// Get the size in bytes of one sample
    pub fn sample_size(&self) -> usize {
        match self {
            SampleFormat::U8 | SampleFormat::U8P => 1,
            SampleFormat::I16 | SampleFormat::I16P => 2,
            SampleFormat::I32 | SampleFormat::I32P => 4,
            SampleFormat::F32 | SampleFormat::F32P => 4,
            SampleFormat::F64 | SampleFormat::F64P => 8,
            SampleFormat::Unknown => 0,
        }
    }

    /// Check if this is a planar format
    pub fn is_planar(&self) -> bool {
        matches!(
            self,
            SampleFormat::U8P
                | SampleFormat::I16P
                | SampleFormat::I32P
                | SampleFormat::F32P
                | SampleFormat::F64P
        )
    }

    /// Check if this is a floating point format
    pub fn is_float(&self) -> bool {
        matches!(
            self,
            SampleFormat::F32 | SampleFormat::F64 | SampleFormat::F32P | SampleFormat::F64P
        )
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleFormat::U8 => "u8",
            SampleFormat::I16 => "s16",
            SampleFormat::I32 => "s32",
            SampleFormat::F32 => "flt",
            SampleFormat::F64 => "dbl",
            SampleFormat::U8P => "u8p",
            SampleFormat::I16P => "s16p",
            SampleFormat::I32P => "s32p",
            SampleFormat::F32P => "fltp",
            SampleFormat::F64P => "dblp",
            SampleFormat::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}
