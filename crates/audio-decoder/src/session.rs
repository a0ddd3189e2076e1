//! Decode session: one opened codec context plus its lazily attached format converter.
//!
//! ## Decode protocol
//! For each packet:
//! 1. submit the packet to the codec
//! 2. pull frames until the codec has no more output for that packet
//! 3. convert each frame into the caller's buffer, failing if it would overflow
//!
//! ## Limitations
//! The converter is configured from the first decoded frame and kept for the session's
//! lifetime. Streams that change sample rate, layout or sample format mid-session are not
//! renegotiated; such frames fail the decode call.

use std::sync::Arc;

use audio_decoder_types::{SampleEncoding, SessionInfo};

use crate::codec::{Codec, DecoderRegistry};
use crate::config::{DecoderConfig, RawFormat};
use crate::context::CodecContext;
use crate::error::{DecoderError, Result};
use crate::policy::ResetPolicy;
use crate::resample::{self, Resampler};

pub struct DecodeSession {
    // Declared before `context` so it is released first.
    resampler: Option<Resampler>,
    context: CodecContext,
    encoding: SampleEncoding,
    registry: Arc<DecoderRegistry>,
    config: DecoderConfig,
}

impl DecodeSession {
    /// Open a session for the decoder registered under `name`.
    pub fn open(
        registry: Arc<DecoderRegistry>,
        name: &str,
        extra_data: Option<&[u8]>,
        encoding: SampleEncoding,
        raw: RawFormat,
        config: DecoderConfig,
    ) -> Result<Self> {
        let Some(codec) = registry.find_decoder_by_name(name) else {
            tracing::error!(codec = name, "Codec not found.");
            return Err(DecoderError::CodecNotFound(name.to_string()));
        };
        Self::create(registry, codec, extra_data, encoding, raw, config)
    }

    /// Open a session for an already resolved codec.
    ///
    /// `raw` only applies to headerless PCM codecs.
    pub fn create(
        registry: Arc<DecoderRegistry>,
        codec: Codec,
        extra_data: Option<&[u8]>,
        encoding: SampleEncoding,
        raw: RawFormat,
        config: DecoderConfig,
    ) -> Result<Self> {
        let context = CodecContext::open(codec, extra_data, raw, &config)?;
        tracing::debug!(codec = codec.name(), ?encoding, "decode session created");
        Ok(Self {
            resampler: None,
            context,
            encoding,
            registry,
            config,
        })
    }

    /// Decode one packet into `output`, returning the number of bytes written.
    ///
    /// Fails with [`DecoderError::OutputTooSmall`] when the decoded audio does not fit; bytes of
    /// earlier frames from the same packet may already be in `output` in that case.
    pub fn decode(&mut self, packet: &[u8], output: &mut [u8]) -> Result<usize> {
        self.context.send_packet(packet)?;

        let encoding = self.encoding;
        let capacity = output.len();
        let mut written = 0usize;

        while let Some(frame) = self.context.receive_frame()? {
            let resampler = match &mut self.resampler {
                Some(resampler) => resampler,
                slot @ None => slot.insert(Resampler::new(&frame, encoding)?),
            };

            let needed = written + resampler.output_bytes(frame.frames());
            if needed > capacity {
                tracing::error!(
                    needed,
                    capacity,
                    "Output buffer size ({capacity}) too small for output data ({needed})."
                );
                return Err(DecoderError::OutputTooSmall { needed, capacity });
            }

            written += resampler.convert(frame, &mut output[written..])?;
        }

        Ok(written)
    }

    /// Reset decoder state between streams (for example after a seek).
    ///
    /// Most codecs are flushed in place. Codecs under [`ResetPolicy::Recreate`] are released and
    /// reopened with the same output encoding; raw-format overrides are not carried over.
    pub fn reset(mut self, extra_data: Option<&[u8]>) -> Result<Self> {
        match self.reset_policy() {
            ResetPolicy::Flush => {
                self.context.flush();
                tracing::debug!(codec = self.codec_name(), "decoder flushed");
                Ok(self)
            }
            ResetPolicy::Recreate => {
                let id = self.context.codec_id();
                let encoding = self.encoding;
                let registry = Arc::clone(&self.registry);
                let config = self.config.clone();
                self.release();

                let Some(codec) = registry.find_decoder_by_id(id) else {
                    tracing::error!(codec = ?id, "Unexpected error finding codec {id:?}.");
                    return Err(DecoderError::CodecNotFound(format!("{id:?}")));
                };
                tracing::debug!(codec = codec.name(), "recreating decode session");
                Self::create(registry, codec, extra_data, encoding, RawFormat::UNSET, config)
            }
        }
    }

    /// Release the converter, then the codec context.
    pub fn release(mut self) {
        self.resampler.take();
        tracing::debug!(codec = self.codec_name(), "decode session released");
    }

    pub fn reset_policy(&self) -> ResetPolicy {
        ResetPolicy::for_codec(self.context.codec_id())
    }

    pub fn codec_name(&self) -> &'static str {
        self.context.codec().name()
    }

    pub fn encoding(&self) -> SampleEncoding {
        self.encoding
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.context.sample_rate()
    }

    pub fn channel_count(&self) -> Option<usize> {
        self.context.channel_count()
    }

    pub fn has_resampler(&self) -> bool {
        self.resampler.is_some()
    }

    /// Initialization data the session was opened with.
    pub fn extra_data(&self) -> Option<&[u8]> {
        self.context.extra_data().map(|padded| padded.payload())
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            codec: self.codec_name().to_string(),
            sample_rate: self.sample_rate(),
            channels: self.channel_count().and_then(|c| u16::try_from(c).ok()),
            output_encoding: self.encoding,
            resampling: self.has_resampler(),
            source_sample_format: self
                .resampler
                .as_ref()
                .map(|r| resample::format_name(r.source_format()).to_string()),
        }
    }
}
