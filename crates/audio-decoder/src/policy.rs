use symphonia::core::codecs::CodecType;

use crate::codec::CODEC_TYPE_TRUEHD;

/// What `reset` does for a given codec.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResetPolicy {
    /// Flush buffered decoder state in place.
    Flush,
    /// Release the session and open a new one for the same codec.
    ///
    /// Used where flushing leaves decoder state behind (TrueHD).
    Recreate,
}

impl ResetPolicy {
    pub fn for_codec(id: CodecType) -> Self {
        match id {
            CODEC_TYPE_TRUEHD => Self::Recreate,
            _ => Self::Flush,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symphonia::core::codecs::{CODEC_TYPE_AAC, CODEC_TYPE_FLAC, CODEC_TYPE_PCM_MULAW};

    #[test]
    fn only_truehd_is_recreated() {
        assert_eq!(ResetPolicy::for_codec(CODEC_TYPE_TRUEHD), ResetPolicy::Recreate);
        assert_eq!(ResetPolicy::for_codec(CODEC_TYPE_FLAC), ResetPolicy::Flush);
        assert_eq!(ResetPolicy::for_codec(CODEC_TYPE_AAC), ResetPolicy::Flush);
        assert_eq!(ResetPolicy::for_codec(CODEC_TYPE_PCM_MULAW), ResetPolicy::Flush);
    }
}
