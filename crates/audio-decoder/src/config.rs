use serde::Deserialize;

/// Decoder tuning shared by every session opened through a table.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DecoderConfig {
    /// Verify embedded checksums and fail on mismatch.
    ///
    /// Off by default so minor corruption is decoded through instead of aborting the session.
    pub verify: bool,
    /// Upper bound of frames per packet for headerless PCM decoders.
    pub max_raw_frames_per_packet: u64,
    /// Zeroed trailing bytes kept after extradata and required after input buffers.
    pub input_padding: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            verify: false,
            max_raw_frames_per_packet: 65_536,
            input_padding: 64,
        }
    }
}

/// Caller-supplied stream format for headerless PCM codecs.
///
/// Values arrive as signed integers from the call boundary; non-positive values mean "not set".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawFormat {
    pub sample_rate: i32,
    pub channels: i32,
}

impl RawFormat {
    /// No overrides; used when recreating header-bearing sessions.
    pub const UNSET: Self = Self {
        sample_rate: -1,
        channels: -1,
    };

    pub fn new(sample_rate: i32, channels: i32) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    pub(crate) fn sample_rate(&self) -> Option<u32> {
        u32::try_from(self.sample_rate).ok().filter(|rate| *rate > 0)
    }

    pub(crate) fn channels(&self) -> Option<usize> {
        usize::try_from(self.channels).ok().filter(|count| *count > 0)
    }
}
