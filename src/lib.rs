//! ZVD Vorbis - Vorbis audio encoding for the ZVD multimedia library
//!
//! Drives libvorbisenc through ZVD's codec interface: PCM float frames go in,
//! compressed Vorbis packets come out, and the three Vorbis header packets are
//! packed into the Xiph-laced extradata that containers such as Matroska/WebM
//! embed as codec private data.
//!
//! # Architecture
//!
//! - `codec`: The encoder trait, encoder options and the Vorbis adapter
//! - `format`: Packets, streams, WAV input and WebM output
//! - `swresample`: Sample format conversion to float
//! - `util`: Common utilities and data structures

pub mod codec;
pub mod error;
pub mod format;
pub mod swresample;
pub mod util;

pub use error::{Error, Result};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const VERSION_MAJOR: u32 = 0;
pub const VERSION_MINOR: u32 = 1;
pub const VERSION_PATCH: u32 = 0;

/// Identification string written into the `encoder` Vorbis comment
pub const IDENT: &str = concat!("zvd-vorbis ", env!("CARGO_PKG_VERSION"));

/// Configuration for the library
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Maximum number of threads to use for parallel encoding
    pub max_threads: Option<usize>,
    /// Enable verbose logging
    pub verbose: bool,
    /// Enable debug output
    pub debug: bool,
}

/// Initialize the library with the given configuration
pub fn init(config: Config) -> Result<()> {
    if let Some(threads) = config.max_threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .map_err(|e| Error::Init(format!("Failed to initialize thread pool: {}", e)))?;
    }

    if config.verbose || config.debug {
        let level = if config.debug { "debug" } else { "info" };
        tracing_subscriber::fmt()
            .with_env_filter(level)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| Error::Init(format!("Failed to initialize logging: {}", e)))?;
    }

    Ok(())
}
