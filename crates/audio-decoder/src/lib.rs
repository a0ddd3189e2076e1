pub mod bridge;
pub mod codec;
pub mod config;
pub mod error;
pub mod policy;
pub mod resample;
pub mod session;

mod context;

#[cfg(test)]
mod testing;

pub use audio_decoder_types::{DecodeErrorKind, DecoderInfo, SampleEncoding, SessionInfo};
pub use bridge::{
    decode, get_channel_count, get_library_version, get_required_input_padding,
    get_sample_rate, has_decoder, initialize, release, reset, SessionTable,
};
pub use codec::{Codec, DecoderRegistry, CODEC_TYPE_TRUEHD};
pub use config::{DecoderConfig, RawFormat};
pub use error::{DecoderError, Result};
pub use policy::ResetPolicy;
pub use session::DecodeSession;
