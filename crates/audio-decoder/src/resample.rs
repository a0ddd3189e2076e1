//! Sample-format conversion stage.
//!
//! Converts decoded (planar, codec-native) frames into interleaved PCM in the session's
//! [`SampleEncoding`]. Sample rate and channel layout pass through unchanged.
//!
//! The stage is configured from the first frame of a session and never reconfigured. Frames
//! whose format differs from that first frame are rejected rather than renegotiated.

use audio_decoder_types::SampleEncoding;
use symphonia::core::audio::{AudioBufferRef, RawSampleBuffer, SignalSpec};
use symphonia::core::sample::SampleFormat;

use crate::error::{DecoderError, Result};

#[cfg(test)]
thread_local! {
    /// Converters constructed on the current thread.
    pub(crate) static ATTACHED: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

/// Interleaving buffer for the target encoding.
enum Output {
    S16(RawSampleBuffer<i16>),
    F32(RawSampleBuffer<f32>),
}

impl Output {
    fn new(encoding: SampleEncoding, frames: usize, spec: SignalSpec) -> Self {
        match encoding {
            SampleEncoding::Pcm16 => Self::S16(RawSampleBuffer::new(frames as u64, spec)),
            SampleEncoding::PcmFloat => Self::F32(RawSampleBuffer::new(frames as u64, spec)),
        }
    }

    fn copy_interleaved(&mut self, frame: AudioBufferRef<'_>) {
        match self {
            Self::S16(buf) => buf.copy_interleaved_ref(frame),
            Self::F32(buf) => buf.copy_interleaved_ref(frame),
        }
    }

    fn as_bytes(&self) -> &[u8] {
        match self {
            Self::S16(buf) => buf.as_bytes(),
            Self::F32(buf) => buf.as_bytes(),
        }
    }
}

pub struct Resampler {
    spec: SignalSpec,
    source_format: SampleFormat,
    encoding: SampleEncoding,
    output: Output,
    capacity_frames: usize,
}

impl Resampler {
    /// Configure a converter for frames shaped like `frame`.
    pub fn new(frame: &AudioBufferRef<'_>, encoding: SampleEncoding) -> Result<Self> {
        let spec = *frame.spec();
        if spec.channels.count() == 0 {
            tracing::error!(op = "resampler_init", "frame has no channels");
            return Err(DecoderError::Codec {
                op: "resampler_init",
                detail: "frame has no channels".to_string(),
            });
        }
        let capacity_frames = frame.capacity().max(frame.frames()).max(1);
        let source_format = sample_format_of(frame);

        #[cfg(test)]
        ATTACHED.with(|count| count.set(count.get() + 1));

        tracing::debug!(
            rate_hz = spec.rate,
            channels = spec.channels.count(),
            from = format_name(source_format),
            to = ?encoding,
            "format converter attached"
        );

        Ok(Self {
            spec,
            source_format,
            encoding,
            output: Output::new(encoding, capacity_frames, spec),
            capacity_frames,
        })
    }

    pub fn spec(&self) -> SignalSpec {
        self.spec
    }

    pub fn source_format(&self) -> SampleFormat {
        self.source_format
    }

    pub fn encoding(&self) -> SampleEncoding {
        self.encoding
    }

    /// Bytes [`Resampler::convert`] writes for a frame of `frames` samples per channel.
    pub fn output_bytes(&self, frames: usize) -> usize {
        frames * self.spec.channels.count() * self.encoding.bytes_per_sample()
    }

    /// Convert `frame` into `out`, returning the number of bytes written.
    ///
    /// `out` must hold at least [`Resampler::output_bytes`] for the frame.
    pub fn convert(&mut self, frame: AudioBufferRef<'_>, out: &mut [u8]) -> Result<usize> {
        let same_format = std::mem::discriminant(&sample_format_of(&frame))
            == std::mem::discriminant(&self.source_format);
        if *frame.spec() != self.spec || !same_format {
            tracing::error!(
                op = "resample",
                expected_rate = self.spec.rate,
                expected_channels = self.spec.channels.count(),
                rate = frame.spec().rate,
                channels = frame.spec().channels.count(),
                "frame format changed mid-stream"
            );
            return Err(DecoderError::Codec {
                op: "resample",
                detail: "frame format differs from the first frame of the session".to_string(),
            });
        }

        let frames = frame.frames();
        let expected = self.output_bytes(frames);
        if expected > out.len() {
            return Err(DecoderError::OutputTooSmall {
                needed: expected,
                capacity: out.len(),
            });
        }
        if frames > self.capacity_frames {
            self.capacity_frames = frames;
            self.output = Output::new(self.encoding, frames, self.spec);
        }

        self.output.copy_interleaved(frame);
        let produced = self.output.as_bytes();
        if produced.len() != expected {
            let frame_bytes = self.output_bytes(1);
            let remaining = expected.abs_diff(produced.len()) / frame_bytes;
            tracing::error!(
                remaining,
                "Expected no samples remaining after resampling, but found {remaining}."
            );
            return Err(DecoderError::ResidualSamples { remaining });
        }
        out[..expected].copy_from_slice(produced);
        Ok(expected)
    }
}

fn sample_format_of(frame: &AudioBufferRef<'_>) -> SampleFormat {
    match frame {
        AudioBufferRef::U8(_) => SampleFormat::U8,
        AudioBufferRef::U16(_) => SampleFormat::U16,
        AudioBufferRef::U24(_) => SampleFormat::U24,
        AudioBufferRef::U32(_) => SampleFormat::U32,
        AudioBufferRef::S8(_) => SampleFormat::S8,
        AudioBufferRef::S16(_) => SampleFormat::S16,
        AudioBufferRef::S24(_) => SampleFormat::S24,
        AudioBufferRef::S32(_) => SampleFormat::S32,
        AudioBufferRef::F32(_) => SampleFormat::F32,
        AudioBufferRef::F64(_) => SampleFormat::F64,
    }
}

/// Short lowercase label for a sample format (`s16`, `f32`, ...).
pub fn format_name(format: SampleFormat) -> &'static str {
    match format {
        SampleFormat::U8 => "u8",
        SampleFormat::U16 => "u16",
        SampleFormat::U24 => "u24",
        SampleFormat::U32 => "u32",
        SampleFormat::S8 => "s8",
        SampleFormat::S16 => "s16",
        SampleFormat::S24 => "s24",
        SampleFormat::S32 => "s32",
        SampleFormat::F32 => "f32",
        SampleFormat::F64 => "f64",
    }
}
