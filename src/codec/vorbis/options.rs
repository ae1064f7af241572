//! Rate control and tuning options for the Vorbis encoder
//!
//! Options arrive through the generic [`EncoderContext`] and are resolved here
//! into the exact libvorbisenc setup the session performs.

use crate::codec::EncoderContext;
use crate::error::{Error, Result};
use tracing::{debug, warn};

/// Quality used when neither a quality nor a bitrate was requested (oggenc scale)
pub const DEFAULT_QUALITY: f32 = 3.0;

/// Valid quality range on the oggenc scale
pub const QUALITY_RANGE: (f32, f32) = (-1.0, 10.0);

/// Valid impulse block bias range
pub const IBLOCK_RANGE: (f64, f64) = (-15.0, 0.0);

/// Highest sample rate accepted by the encoder
pub const MAX_SAMPLE_RATE: u32 = 200_000;

/// Highest channel count a Vorbis stream can carry
pub const MAX_CHANNELS: u16 = 255;

/// Name of the impulse block bias private option
pub const OPTION_IBLOCK: &str = "iblock";

/// How libvorbisenc distributes bits
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateControl {
    /// Quality-driven VBR, quality on libvorbis' -0.1..1.0 scale
    Vbr { quality: f32 },
    /// Bitrate-managed encoding, rates in bits per second
    Managed {
        nominal: i64,
        min: Option<i64>,
        max: Option<i64>,
    },
}

impl RateControl {
    /// Managed mode without hard limits runs the bitrate-by-estimate engine,
    /// which requires turning the slow rate management off
    pub fn disables_rate_management(&self) -> bool {
        matches!(
            self,
            RateControl::Managed {
                min: None,
                max: None,
                ..
            }
        )
    }
}

/// Fully resolved encoder options
#[derive(Debug, Clone)]
pub struct VorbisOptions {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Rate control mode
    pub rate_control: RateControl,
    /// Lowpass cutoff in kHz
    pub lowpass_khz: Option<f64>,
    /// Impulse block bias, 0 leaves the library default
    pub iblock: f64,
    /// User metadata tags (the encoder tag is added by the encoder)
    pub comments: Vec<(String, String)>,
}

impl VorbisOptions {
    /// Resolve options from a generic encoder context
    pub fn from_context(ctx: &EncoderContext) -> Result<Self> {
        let rate_control = match ctx.quality() {
            Some(quality) => RateControl::Vbr {
                quality: quality / 10.0,
            },
            None if ctx.bit_rate() == 0 => RateControl::Vbr {
                quality: DEFAULT_QUALITY / 10.0,
            },
            None => RateControl::Managed {
                nominal: to_rate(ctx.bit_rate(), "bitrate")?,
                min: positive_rate(ctx.min_rate(), "minimum bitrate")?,
                max: positive_rate(ctx.max_rate(), "maximum bitrate")?,
            },
        };

        if ctx.quality().is_some() && ctx.bit_rate() > 0 {
            warn!(
                "Both quality and bitrate requested, bitrate {} ignored",
                ctx.bit_rate()
            );
        }

        let lowpass_khz = match ctx.cutoff() {
            Some(cutoff) if cutoff > 0 => Some(cutoff as f64 / 1000.0),
            _ => None,
        };

        let mut iblock = 0.0;
        for (name, value) in ctx.options() {
            match name {
                OPTION_IBLOCK => {
                    iblock = value.trim().parse::<f64>().map_err(|e| {
                        Error::config(format!("Invalid value '{}' for {}: {}", value, name, e))
                    })?;
                }
                other => {
                    return Err(Error::config(format!(
                        "Unknown option for libvorbis: {}",
                        other
                    )))
                }
            }
        }

        let options = VorbisOptions {
            sample_rate: ctx.sample_rate(),
            channels: ctx.channels(),
            rate_control,
            lowpass_khz,
            iblock,
            comments: ctx.comments().to_vec(),
        };
        options.validate()?;

        debug!(
            "Vorbis options: {} Hz, {} ch, {:?}, lowpass {:?} kHz, iblock {}",
            options.sample_rate,
            options.channels,
            options.rate_control,
            options.lowpass_khz,
            options.iblock
        );

        Ok(options)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 || self.sample_rate > MAX_SAMPLE_RATE {
            return Err(Error::invalid_input(format!(
                "Invalid Vorbis sample rate: {}. Valid range: 1-{} Hz",
                self.sample_rate, MAX_SAMPLE_RATE
            )));
        }

        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(Error::invalid_input(format!(
                "Invalid Vorbis channel count: {}. Valid range: 1-{}",
                self.channels, MAX_CHANNELS
            )));
        }

        if let RateControl::Vbr { quality } = self.rate_control {
            let (min, max) = QUALITY_RANGE;
            if !(min / 10.0..=max / 10.0).contains(&quality) {
                return Err(Error::invalid_input(format!(
                    "Invalid Vorbis quality: {}. Valid range: {} to {}",
                    quality * 10.0,
                    min,
                    max
                )));
            }
        }

        if let RateControl::Managed { nominal, min, max } = self.rate_control {
            if let (Some(min), Some(max)) = (min, max) {
                if min > max {
                    return Err(Error::invalid_input(format!(
                        "Minimum bitrate {} exceeds maximum bitrate {}",
                        min, max
                    )));
                }
            }
            if nominal <= 0 {
                return Err(Error::invalid_input("Nominal bitrate must be positive"));
            }
        }

        let (min, max) = IBLOCK_RANGE;
        if !(min..=max).contains(&self.iblock) {
            return Err(Error::invalid_input(format!(
                "Invalid impulse block bias: {}. Valid range: {} to {}",
                self.iblock, min, max
            )));
        }

        if let Some(khz) = self.lowpass_khz {
            let nyquist_khz = self.sample_rate as f64 / 2000.0;
            if khz > nyquist_khz {
                warn!(
                    "Lowpass {} kHz is above Nyquist ({} kHz), libvorbis will clamp it",
                    khz, nyquist_khz
                );
            }
        }

        for (key, value) in &self.comments {
            if key.is_empty() || key.contains('=') || key.contains('\0') || value.contains('\0') {
                return Err(Error::invalid_input(format!(
                    "Invalid Vorbis comment: {}={}",
                    key, value
                )));
            }
        }

        Ok(())
    }
}

fn to_rate(rate: u64, what: &str) -> Result<i64> {
    i64::try_from(rate).map_err(|_| Error::invalid_input(format!("{} too large: {}", what, rate)))
}

fn positive_rate(rate: Option<u64>, what: &str) -> Result<Option<i64>> {
    match rate {
        Some(rate) if rate > 0 => to_rate(rate, what).map(Some),
        _ => Ok(None),
    }
}
