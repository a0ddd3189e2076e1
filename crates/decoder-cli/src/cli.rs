use std::path::PathBuf;

use clap::{Parser, Subcommand};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_SHA"),
    ", ",
    env!("BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "decoder-cli", version = VERSION)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the decoder library version and required input padding
    Version,

    /// List known decoder names and whether they are available
    Decoders {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode a headerless stream into raw interleaved PCM
    Decode(DecodeArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct DecodeArgs {
    /// Decoder name, e.g. pcm_mulaw
    #[arg(long)]
    pub codec: String,

    /// Input file; split into fixed-size packets
    #[arg(long)]
    pub input: PathBuf,

    /// Output file for raw PCM
    #[arg(long)]
    pub output: PathBuf,

    /// Write 32-bit float samples instead of signed 16-bit
    #[arg(long)]
    pub float: bool,

    /// Sample rate for headerless PCM codecs
    #[arg(long)]
    pub sample_rate: Option<i32>,

    /// Channel count for headerless PCM codecs
    #[arg(long)]
    pub channels: Option<i32>,

    /// Bytes per packet
    #[arg(long, default_value_t = 4096)]
    pub packet_bytes: usize,

    /// File holding codec initialization data
    #[arg(long)]
    pub extra_data: Option<PathBuf>,

    /// TOML decoder config (verify, max_raw_frames_per_packet, input_padding)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the session summary as JSON
    #[arg(long)]
    pub json: bool,
}
