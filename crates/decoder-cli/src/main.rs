//! Decoder CLI: drive the handle-based decode boundary from the command line.
//!
//! ## Modes
//! - `version`: library version and required input padding.
//! - `decoders`: known decoder names and their availability.
//! - `decode`: split a headerless file into fixed-size packets, decode them through one session,
//!   and write the raw PCM output.

mod cli;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use audio_decoder::{DecoderConfig, DecoderRegistry, SessionTable};
use audio_decoder_types::{DecodeErrorKind, SampleEncoding, SessionInfo};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use cli::{Args, Command, DecodeArgs};

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,decoder_cli=info,audio_decoder=info")
        }))
        .init();

    match args.cmd {
        Command::Version => {
            println!("{}", audio_decoder::get_library_version());
            println!(
                "required input padding: {} bytes",
                audio_decoder::get_required_input_padding()
            );
        }
        Command::Decoders { json } => print_decoders(json)?,
        Command::Decode(opts) => {
            let report = decode_file(&opts)?;
            if opts.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
    }
    Ok(())
}

fn print_decoders(json: bool) -> Result<()> {
    let decoders = DecoderRegistry::new().decoders();
    if json {
        println!("{}", serde_json::to_string_pretty(&decoders)?);
        return Ok(());
    }
    for info in decoders {
        let state = if info.available { "yes" } else { "no" };
        println!(
            "{:<12} {:<4} {}",
            info.name,
            state,
            info.long_name.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

/// Outcome of one `decode` run.
#[derive(Debug, Serialize)]
struct DecodeReport {
    session: SessionInfo,
    packets: usize,
    skipped: usize,
    bytes_written: u64,
}

fn print_report(report: &DecodeReport) {
    let info = &report.session;
    println!("codec:    {}", info.codec);
    match (info.sample_rate, info.channels) {
        (Some(rate), Some(channels)) => println!("stream:   {rate} Hz, {channels} ch"),
        _ => println!("stream:   unknown"),
    }
    println!(
        "output:   {:?} (from {})",
        info.output_encoding,
        info.source_sample_format.as_deref().unwrap_or("-")
    );
    println!(
        "packets:  {} decoded, {} skipped",
        report.packets - report.skipped,
        report.skipped
    );
    println!("written:  {} bytes", report.bytes_written);
}

fn load_config(path: Option<&Path>) -> Result<DecoderConfig> {
    let Some(path) = path else {
        return Ok(DecoderConfig::default());
    };
    let raw = std::fs::read_to_string(path).with_context(|| format!("read config {:?}", path))?;
    parse_config(&raw).with_context(|| format!("parse config {:?}", path))
}

fn parse_config(raw: &str) -> Result<DecoderConfig> {
    let cfg = toml::from_str::<DecoderConfig>(raw)?;
    if cfg.max_raw_frames_per_packet == 0 {
        bail!("max_raw_frames_per_packet must be positive");
    }
    Ok(cfg)
}

/// Initial output capacity for one packet; generous enough for every headerless layout.
fn initial_capacity(packet_bytes: usize, encoding: SampleEncoding) -> usize {
    packet_bytes
        .saturating_mul(2 * encoding.bytes_per_sample())
        .max(4096)
}

fn decode_file(opts: &DecodeArgs) -> Result<DecodeReport> {
    if opts.packet_bytes == 0 {
        bail!("--packet-bytes must be positive");
    }
    let config = load_config(opts.config.as_deref())?;
    let padding = config.input_padding;
    let table = SessionTable::with_registry(DecoderRegistry::new(), config);

    let extra_data = opts
        .extra_data
        .as_ref()
        .map(|path| std::fs::read(path).with_context(|| format!("read extra data {:?}", path)))
        .transpose()?;
    let input =
        std::fs::read(&opts.input).with_context(|| format!("read input {:?}", opts.input))?;

    let handle = table.initialize(
        &opts.codec,
        extra_data.as_deref(),
        opts.float,
        opts.sample_rate.unwrap_or(-1),
        opts.channels.unwrap_or(-1),
    );
    if handle == 0 {
        bail!("failed to open decoder {:?}", opts.codec);
    }

    let result = run_session(&table, handle, &input, padding, opts);
    table.release(handle);
    result
}

fn run_session(
    table: &SessionTable,
    handle: u64,
    input: &[u8],
    padding: usize,
    opts: &DecodeArgs,
) -> Result<DecodeReport> {
    let encoding = SampleEncoding::from_output_float(opts.float);
    let out_file =
        File::create(&opts.output).with_context(|| format!("create output {:?}", opts.output))?;
    let mut writer = BufWriter::new(out_file);

    let mut packet = Vec::with_capacity(opts.packet_bytes + padding);
    let mut output = vec![0u8; initial_capacity(opts.packet_bytes, encoding)];
    let mut packets = 0usize;
    let mut skipped = 0usize;
    let mut bytes_written = 0u64;

    for (index, chunk) in input.chunks(opts.packet_bytes).enumerate() {
        packets += 1;
        packet.clear();
        packet.extend_from_slice(chunk);
        packet.resize(chunk.len() + padding, 0);

        let mut written = decode_packet(table, handle, &packet, chunk.len(), &mut output);
        if written == DecodeErrorKind::InvalidData.code() {
            // Either malformed or too large for the buffer; grow once and retry.
            let grown = output.len().saturating_mul(4);
            tracing::debug!(index, capacity = grown, "retrying packet with a larger buffer");
            output.resize(grown, 0);
            written = decode_packet(table, handle, &packet, chunk.len(), &mut output);
        }

        match usize::try_from(written) {
            Ok(len) => {
                writer
                    .write_all(&output[..len])
                    .with_context(|| format!("write output {:?}", opts.output))?;
                bytes_written += len as u64;
            }
            Err(_) if written == DecodeErrorKind::InvalidData.code() => {
                tracing::warn!(index, "skipping packet with invalid data");
                skipped += 1;
            }
            Err(_) => bail!("decoding packet {index} failed (code {written})"),
        }
    }

    writer.flush().context("flush output")?;
    let session = table
        .info(handle)
        .context("decode session disappeared while decoding")?;
    tracing::info!(
        codec = %session.codec,
        packets,
        skipped,
        bytes_written,
        "decode finished"
    );
    Ok(DecodeReport {
        session,
        packets,
        skipped,
        bytes_written,
    })
}

fn decode_packet(
    table: &SessionTable,
    handle: u64,
    packet: &[u8],
    size: usize,
    output: &mut [u8],
) -> i32 {
    let size = i32::try_from(size).unwrap_or(i32::MAX);
    let capacity = i32::try_from(output.len()).unwrap_or(i32::MAX);
    table.decode(handle, Some(packet), size, Some(output), capacity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("decoder-cli-{}-{name}", std::process::id()))
    }

    fn decode_args(codec: &str, input: PathBuf, output: PathBuf) -> DecodeArgs {
        DecodeArgs {
            codec: codec.to_string(),
            input,
            output,
            float: false,
            sample_rate: Some(8_000),
            channels: Some(1),
            packet_bytes: 160,
            extra_data: None,
            config: None,
            json: false,
        }
    }

    #[test]
    fn config_fields_are_optional() {
        let cfg = parse_config("verify = true\n").unwrap();
        assert!(cfg.verify);
        assert_eq!(cfg.input_padding, DecoderConfig::default().input_padding);
        assert_eq!(
            cfg.max_raw_frames_per_packet,
            DecoderConfig::default().max_raw_frames_per_packet
        );
    }

    #[test]
    fn config_rejects_zero_frame_limit() {
        assert!(parse_config("max_raw_frames_per_packet = 0").is_err());
        assert!(parse_config("input_padding = \"lots\"").is_err());
    }

    #[test]
    fn missing_config_uses_defaults() {
        assert_eq!(load_config(None).unwrap(), DecoderConfig::default());
        assert!(load_config(Some(Path::new("/nonexistent/decoder.toml"))).is_err());
    }

    #[test]
    fn initial_capacity_covers_widest_expansion() {
        assert_eq!(initial_capacity(160, SampleEncoding::Pcm16), 4096);
        assert_eq!(initial_capacity(4096, SampleEncoding::PcmFloat), 4096 * 8);
    }

    #[test]
    fn decodes_mulaw_file_to_pcm16() {
        let input = temp_path("mulaw.in");
        let output = temp_path("mulaw.out");
        std::fs::write(&input, vec![0xFFu8; 400]).unwrap();

        let report = decode_file(&decode_args("pcm_mulaw", input.clone(), output.clone())).unwrap();
        assert_eq!(report.packets, 3);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.bytes_written, 800);
        assert_eq!(report.session.sample_rate, Some(8_000));
        assert_eq!(report.session.channels, Some(1));
        assert_eq!(std::fs::metadata(&output).unwrap().len(), 800);

        let _ = std::fs::remove_file(input);
        let _ = std::fs::remove_file(output);
    }

    #[test]
    fn unknown_codec_fails_to_open() {
        let input = temp_path("unknown.in");
        std::fs::write(&input, [0u8; 4]).unwrap();
        let err = decode_file(&decode_args("no-such-codec", input.clone(), temp_path("x")))
            .unwrap_err();
        assert!(err.to_string().contains("no-such-codec"), "{err}");
        let _ = std::fs::remove_file(input);
    }
}
