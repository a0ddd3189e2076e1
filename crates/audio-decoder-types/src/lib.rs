use serde::{Deserialize, Serialize};

/// PCM encoding written into caller output buffers.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SampleEncoding {
    /// Signed 16-bit integer, native endian.
    #[default]
    Pcm16,
    /// 32-bit IEEE float, native endian.
    PcmFloat,
}

impl SampleEncoding {
    /// Map the caller's `output_float` flag onto an encoding.
    pub fn from_output_float(output_float: bool) -> Self {
        if output_float {
            Self::PcmFloat
        } else {
            Self::Pcm16
        }
    }

    /// `true` for [`SampleEncoding::PcmFloat`].
    pub fn is_float(self) -> bool {
        matches!(self, Self::PcmFloat)
    }

    /// Size of one sample of one channel, in bytes.
    pub fn bytes_per_sample(self) -> usize {
        match self {
            Self::Pcm16 => 2,
            Self::PcmFloat => 4,
        }
    }
}

/// Caller-facing failure class returned by `decode`.
///
/// Callers branch on this: invalid data may be skipped, anything else is fatal for the call.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecodeErrorKind {
    /// Malformed bitstream, caller-contract violation, or output buffer too small.
    InvalidData,
    /// Any other internal failure.
    Other,
}

impl DecodeErrorKind {
    /// Negative sentinel used at the integer call boundary.
    pub fn code(self) -> i32 {
        match self {
            Self::InvalidData => -1,
            Self::Other => -2,
        }
    }
}

/// Snapshot of one decode session.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionInfo {
    /// Decoder name the session was opened with (for example `flac`, `pcm_mulaw`).
    pub codec: String,
    /// Stream sample rate (Hz), once known.
    pub sample_rate: Option<u32>,
    /// Stream channel count, once known.
    pub channels: Option<u16>,
    /// Encoding of the bytes written to output buffers.
    pub output_encoding: SampleEncoding,
    /// Whether the format converter has been attached.
    pub resampling: bool,
    /// Sample format produced by the codec, once the first frame was seen.
    pub source_sample_format: Option<String>,
}

/// Registry entry for one decoder name.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DecoderInfo {
    /// Lookup name (case-sensitive).
    pub name: String,
    /// Implementation description, when available.
    pub long_name: Option<String>,
    /// `true` when an implementation is registered for this name.
    pub available: bool,
}
