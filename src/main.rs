//! zvd-vorbis CLI
//!
//! Encodes WAV files to Vorbis in WebM/Matroska and inspects the Vorbis
//! header packets an encoder configuration produces.

use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use zvd_vorbis::codec::vorbis::{xiph_len, RateControl};
use zvd_vorbis::codec::{Encoder, EncoderContext, VorbisEncoder};
use zvd_vorbis::format::wav::WavDemuxer;
use zvd_vorbis::format::{
    create_muxer, detect_format_from_extension, AudioInfo, Demuxer, Stream, StreamInfo,
};
use zvd_vorbis::swresample::to_f32_interleaved;
use zvd_vorbis::{init, Config};

#[derive(Parser)]
#[command(name = "zvd-vorbis")]
#[command(about = "Vorbis audio encoder built on libvorbisenc", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Number of threads to use
    #[arg(short = 't', long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode WAV files to Vorbis in WebM
    Encode {
        /// Input WAV file (repeat for several files)
        #[arg(short, long = "input", required = true)]
        inputs: Vec<PathBuf>,

        /// Output .webm/.mka file, or a directory when encoding several inputs
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        options: EncodeOptions,
    },

    /// Show the Vorbis header packets for an input and encoder settings
    Headers {
        /// Input WAV file
        #[arg(short, long)]
        input: PathBuf,

        /// Output in JSON format
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        options: EncodeOptions,
    },
}

/// Encoder settings shared by the subcommands
#[derive(Args, Debug, Clone)]
struct EncodeOptions {
    /// VBR quality on the oggenc scale (-1 to 10)
    #[arg(short, long, allow_negative_numbers = true)]
    quality: Option<f32>,

    /// Average bitrate (e.g. 128k, 192000)
    #[arg(short, long)]
    bitrate: Option<String>,

    /// Minimum bitrate for managed encoding
    #[arg(long)]
    minrate: Option<String>,

    /// Maximum bitrate for managed encoding
    #[arg(long)]
    maxrate: Option<String>,

    /// Lowpass cutoff in Hz
    #[arg(long)]
    cutoff: Option<u32>,

    /// Impulse block bias (-15 to 0)
    #[arg(long, allow_negative_numbers = true)]
    iblock: Option<f64>,

    /// Metadata tag as KEY=VALUE (repeatable)
    #[arg(short, long = "comment")]
    comments: Vec<String>,
}

impl EncodeOptions {
    fn encoder_context(&self, sample_rate: u32, channels: u16) -> anyhow::Result<EncoderContext> {
        let mut ctx = EncoderContext::new("vorbis", sample_rate, channels);

        if let Some(quality) = self.quality {
            ctx.set_quality(quality);
        }
        if let Some(bitrate) = &self.bitrate {
            ctx.set_bit_rate(parse_bitrate(bitrate)?);
        }
        if let Some(rate) = &self.minrate {
            ctx.set_min_rate(parse_bitrate(rate)?);
        }
        if let Some(rate) = &self.maxrate {
            ctx.set_max_rate(parse_bitrate(rate)?);
        }
        if let Some(cutoff) = self.cutoff {
            ctx.set_cutoff(cutoff);
        }
        if let Some(iblock) = self.iblock {
            ctx.set_option("iblock", iblock.to_string());
        }
        for comment in &self.comments {
            let (key, value) = comment
                .split_once('=')
                .ok_or_else(|| anyhow!("Comment '{}' is not KEY=VALUE", comment))?;
            ctx.add_comment(key, value);
        }

        Ok(ctx)
    }
}

/// Parse a bitrate such as `128k`, `1.5M` or `96000`
fn parse_bitrate(value: &str) -> anyhow::Result<u64> {
    let value = value.trim();
    let (number, scale) = match value.chars().last() {
        Some('k') | Some('K') => (&value[..value.len() - 1], 1_000.0),
        Some('m') | Some('M') => (&value[..value.len() - 1], 1_000_000.0),
        _ => (value, 1.0),
    };
    let number: f64 = number
        .parse()
        .with_context(|| format!("Invalid bitrate '{}'", value))?;
    if !number.is_finite() || number <= 0.0 {
        bail!("Bitrate must be positive, got '{}'", value);
    }
    Ok((number * scale).round() as u64)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config {
        max_threads: cli.threads,
        verbose: cli.verbose,
        debug: cli.debug,
    };

    init(config)?;

    info!("zvd-vorbis v{}", zvd_vorbis::VERSION);

    match cli.command {
        Commands::Encode {
            inputs,
            output,
            options,
        } => cmd_encode(&inputs, &output, &options),
        Commands::Headers {
            input,
            json,
            options,
        } => cmd_headers(&input, json, &options),
    }
}

/// Result of encoding one file
#[derive(Debug)]
struct EncodeSummary {
    input: String,
    output: String,
    samples: u64,
    packets: u64,
    bytes: u64,
    duration_seconds: f64,
}

impl EncodeSummary {
    fn bitrate_kbps(&self) -> f64 {
        if self.duration_seconds > 0.0 {
            self.bytes as f64 * 8.0 / self.duration_seconds / 1000.0
        } else {
            0.0
        }
    }
}

/// Pick the output file for each input
fn output_paths(inputs: &[PathBuf], output: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let container = detect_format_from_extension(&output.to_string_lossy())
        .filter(|name| *name == "webm" || *name == "matroska");

    if container.is_some() {
        if inputs.len() > 1 {
            bail!(
                "{} inputs cannot share the single output file {}",
                inputs.len(),
                output.display()
            );
        }
        return Ok(vec![output.to_path_buf()]);
    }

    std::fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output directory {}", output.display()))?;

    inputs
        .iter()
        .map(|input| {
            let stem = input
                .file_stem()
                .ok_or_else(|| anyhow!("Input {} has no file name", input.display()))?;
            Ok(output.join(format!("{}.webm", stem.to_string_lossy())))
        })
        .collect()
}

fn cmd_encode(inputs: &[PathBuf], output: &Path, options: &EncodeOptions) -> anyhow::Result<()> {
    let outputs = output_paths(inputs, output)?;

    let results: Vec<(PathBuf, anyhow::Result<EncodeSummary>)> = inputs
        .par_iter()
        .zip(outputs.par_iter())
        .map(|(input, output)| (input.clone(), encode_file(input, output, options)))
        .collect();

    let mut failed = 0;
    for (input, result) in results {
        match result {
            Ok(summary) => println!(
                "{} -> {}: {} samples, {} packets, {} bytes ({:.1} kbps)",
                summary.input,
                summary.output,
                summary.samples,
                summary.packets,
                summary.bytes,
                summary.bitrate_kbps()
            ),
            Err(e) => {
                failed += 1;
                eprintln!("Error encoding {}: {:#}", input.display(), e);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} inputs failed", failed, inputs.len());
    }
    Ok(())
}

fn open_wav(input: &Path) -> anyhow::Result<(WavDemuxer, u32, u16)> {
    let mut demuxer = WavDemuxer::new();
    demuxer
        .open(input)
        .with_context(|| format!("Failed to open input {}", input.display()))?;

    let format = &demuxer
        .header()
        .ok_or_else(|| anyhow!("WAV header missing after open"))?
        .format;
    let (sample_rate, channels) = (format.sample_rate, format.channels);
    Ok((demuxer, sample_rate, channels))
}

fn encode_file(
    input: &Path,
    output: &Path,
    options: &EncodeOptions,
) -> anyhow::Result<EncodeSummary> {
    let (mut demuxer, sample_rate, channels) = open_wav(input)?;
    let ctx = options.encoder_context(sample_rate, channels)?;
    let mut encoder = VorbisEncoder::new(&ctx)?;

    let format_name = detect_format_from_extension(&output.to_string_lossy()).unwrap_or("webm");
    let mut muxer = create_muxer(format_name)?;
    muxer
        .create(output)
        .with_context(|| format!("Failed to create output {}", output.display()))?;

    let mut audio_info = AudioInfo::new(sample_rate, channels);
    if ctx.bit_rate() > 0 {
        audio_info.bit_rate = Some(ctx.bit_rate());
    }
    let extradata = encoder
        .extradata()
        .ok_or_else(|| anyhow!("Encoder produced no header extradata"))?
        .to_vec();
    let stream =
        Stream::new(StreamInfo::new_audio(0, "vorbis", audio_info)).with_extradata(extradata);
    muxer.add_stream(stream)?;
    muxer.write_header()?;

    let mut summary = EncodeSummary {
        input: input.display().to_string(),
        output: output.display().to_string(),
        samples: 0,
        packets: 0,
        bytes: 0,
        duration_seconds: 0.0,
    };

    loop {
        let packet = match demuxer.read_packet() {
            Ok(packet) => packet,
            Err(zvd_vorbis::Error::EndOfStream) => break,
            Err(e) => return Err(e.into()),
        };

        let frame = to_f32_interleaved(&demuxer.packet_to_frame(&packet)?)?;
        encoder.send_frame(&frame)?;
        summary.samples += frame.nb_samples as u64;

        loop {
            match encoder.receive_packet() {
                Ok(packet) => {
                    summary.packets += 1;
                    summary.bytes += packet.size() as u64;
                    muxer.write_packet(&packet)?;
                }
                Err(e) if e.is_try_again() => break,
                Err(e) => return Err(e.into()),
            }
        }
    }

    encoder.flush()?;
    loop {
        match encoder.receive_packet() {
            Ok(packet) => {
                summary.packets += 1;
                summary.bytes += packet.size() as u64;
                muxer.write_packet(&packet)?;
            }
            Err(zvd_vorbis::Error::EndOfStream) => break,
            Err(e) => return Err(e.into()),
        }
    }
    muxer.write_trailer()?;

    if summary.samples == 0 {
        warn!("{} contains no audio samples", input.display());
    }
    summary.duration_seconds = summary.samples as f64 / sample_rate as f64;
    info!(
        "Encoded {} ({} packets, {} bytes)",
        output.display(),
        summary.packets,
        summary.bytes
    );
    Ok(summary)
}

#[derive(Debug, Serialize)]
struct HeadersReport {
    file: String,
    sample_rate: u32,
    channels: u16,
    rate_control: String,
    frame_size: usize,
    identification_bytes: usize,
    comment_bytes: usize,
    setup_bytes: usize,
    extradata_bytes: usize,
    extradata_layout: Vec<String>,
}

fn describe_rate_control(rate_control: &RateControl) -> String {
    match rate_control {
        RateControl::Vbr { quality } => format!("vbr quality {:.2}", quality * 10.0),
        RateControl::Managed { nominal, min, max } => {
            let limit = |rate: &Option<i64>| match rate {
                Some(rate) => rate.to_string(),
                None => "unset".to_string(),
            };
            format!(
                "managed nominal {} min {} max {}",
                nominal,
                limit(min),
                limit(max)
            )
        }
    }
}

fn cmd_headers(input: &Path, json: bool, options: &EncodeOptions) -> anyhow::Result<()> {
    let (_demuxer, sample_rate, channels) = open_wav(input)?;
    let ctx = options.encoder_context(sample_rate, channels)?;
    let encoder = VorbisEncoder::new(&ctx)?;
    let headers = encoder.headers();

    let id = headers.identification.len();
    let comment = headers.comment.len();
    let setup = headers.setup.len();
    let report = HeadersReport {
        file: input.display().to_string(),
        sample_rate,
        channels,
        rate_control: describe_rate_control(&encoder.options().rate_control),
        frame_size: encoder.frame_size(),
        identification_bytes: id,
        comment_bytes: comment,
        setup_bytes: setup,
        extradata_bytes: headers.extradata_size(),
        extradata_layout: vec![
            "count: 1".to_string(),
            format!("lacing: {}", xiph_len(id) - id + xiph_len(comment) - comment),
            format!("identification: {}", id),
            format!("comment: {}", comment),
            format!("setup: {}", setup),
        ],
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("File: {}", report.file);
    println!("  Sample Rate: {} Hz", report.sample_rate);
    println!("  Channels: {}", report.channels);
    println!("  Rate Control: {}", report.rate_control);
    println!("  Frame Size: {}", report.frame_size);
    println!("Headers:");
    println!("  Identification: {} bytes", report.identification_bytes);
    println!("  Comment: {} bytes", report.comment_bytes);
    println!("  Setup: {} bytes", report.setup_bytes);
    println!("Extradata: {} bytes", report.extradata_bytes);
    for part in &report.extradata_layout {
        println!("  {}", part);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bitrate() {
        assert_eq!(parse_bitrate("128k").unwrap(), 128_000);
        assert_eq!(parse_bitrate("1.5M").unwrap(), 1_500_000);
        assert_eq!(parse_bitrate("96000").unwrap(), 96_000);
        assert!(parse_bitrate("fast").is_err());
        assert!(parse_bitrate("-3k").is_err());
    }

    #[test]
    fn test_output_paths() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = vec![PathBuf::from("a/one.wav"), PathBuf::from("b/two.wav")];

        let paths = output_paths(&inputs, dir.path()).unwrap();
        assert_eq!(paths[0], dir.path().join("one.webm"));
        assert_eq!(paths[1], dir.path().join("two.webm"));

        assert!(output_paths(&inputs, &dir.path().join("out.webm")).is_err());
        let single = output_paths(&inputs[..1], &dir.path().join("out.mka")).unwrap();
        assert_eq!(single, vec![dir.path().join("out.mka")]);
    }

    #[test]
    fn test_comment_parsing() {
        let options = EncodeOptions {
            quality: Some(5.0),
            bitrate: None,
            minrate: None,
            maxrate: None,
            cutoff: None,
            iblock: Some(-2.5),
            comments: vec!["TITLE=Tone".to_string()],
        };
        let ctx = options.encoder_context(44100, 2).unwrap();
        assert_eq!(ctx.comments(), &[("TITLE".to_string(), "Tone".to_string())]);
        assert_eq!(ctx.option("iblock"), Some("-2.5"));

        let bad = EncodeOptions {
            comments: vec!["no separator".to_string()],
            ..options
        };
        assert!(bad.encoder_context(44100, 2).is_err());
    }
}
