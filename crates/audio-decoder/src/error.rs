//! Error taxonomy and translation of codec failures.
//!
//! Every codec failure collapses to one of two caller-facing kinds
//! ([`DecodeErrorKind::InvalidData`] or [`DecodeErrorKind::Other`]) while keeping the
//! failing operation and a readable description for logs.

use std::io;

use audio_decoder_types::DecodeErrorKind;
use symphonia::core::errors::Error as CodecError;

pub type Result<T> = std::result::Result<T, DecoderError>;

#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    /// Caller contract violation (missing buffer, negative size, bad raw format).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("codec not found: {0}")]
    CodecNotFound(String),

    #[error("error in {op}: {detail}")]
    InvalidData { op: &'static str, detail: String },

    #[error("output buffer size ({capacity}) too small for output data ({needed})")]
    OutputTooSmall { needed: usize, capacity: usize },

    #[error("expected no samples remaining after conversion, but found {remaining}")]
    ResidualSamples { remaining: usize },

    #[error("failed to allocate in {op}")]
    Allocation { op: &'static str },

    #[error("error in {op}: {detail}")]
    Codec { op: &'static str, detail: String },
}

impl DecoderError {
    /// Collapse into the two-way classification callers branch on.
    pub fn kind(&self) -> DecodeErrorKind {
        match self {
            Self::InvalidArgument(_)
            | Self::InvalidData { .. }
            | Self::OutputTooSmall { .. }
            | Self::ResidualSamples { .. } => DecodeErrorKind::InvalidData,
            Self::CodecNotFound(_) | Self::Allocation { .. } | Self::Codec { .. } => {
                DecodeErrorKind::Other
            }
        }
    }

    /// Boundary sentinel (`-1` or `-2`).
    pub fn code(&self) -> i32 {
        self.kind().code()
    }
}

/// Translate a codec error raised by `op`, logging the diagnostic.
pub(crate) fn translate(op: &'static str, err: CodecError) -> DecoderError {
    let detail = describe(&err);
    tracing::error!(op, "Error in {op}: {detail}");
    if is_invalid_data(&err) {
        DecoderError::InvalidData { op, detail }
    } else {
        DecoderError::Codec { op, detail }
    }
}

fn is_invalid_data(err: &CodecError) -> bool {
    match err {
        CodecError::DecodeError(_) => true,
        CodecError::IoError(e) => e.kind() == io::ErrorKind::UnexpectedEof,
        _ => false,
    }
}

fn describe(err: &CodecError) -> String {
    match err {
        CodecError::DecodeError(msg) => format!("invalid data found when processing input ({msg})"),
        CodecError::IoError(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            "invalid data found when processing input (truncated packet)".to_string()
        }
        CodecError::IoError(e) => format!("i/o error ({e})"),
        CodecError::Unsupported(what) => format!("not yet implemented ({what})"),
        CodecError::LimitError(what) => format!("resource limit reached ({what})"),
        CodecError::ResetRequired => "decoder reset required".to_string(),
        other => other.to_string(),
    }
}
