//! Stand-in decoders for unit tests.

use symphonia::core::audio::{AsAudioBufferRef, AudioBuffer, AudioBufferRef, Channels, Signal, SignalSpec};
use symphonia::core::codecs::{
    decl_codec_type, CodecDescriptor, CodecParameters, CodecType, Decoder, DecoderOptions,
    FinalizeResult,
};
use symphonia::core::errors::{decode_error, unsupported_error, Error, Result};
use symphonia::core::formats::Packet;
use symphonia::core::support_codec;

use crate::codec::CODEC_TYPE_TRUEHD;

pub const CODEC_TYPE_TONE: CodecType = decl_codec_type(b"tone");

/// First packet byte that makes [`ToneSource`] report a malformed bitstream.
pub const CORRUPT: u8 = 0xEE;
/// First packet byte that makes [`ToneSource`] fail with a non-data error.
pub const BROKEN: u8 = 0xEF;
/// Extradata [`TrueHdStub`] refuses to open with.
pub const REJECTED_EXTRA_DATA: &[u8] = b"reject";

fn spec_from(params: &CodecParameters) -> SignalSpec {
    let rate = params.sample_rate.unwrap_or(48_000);
    let channels = params
        .channels
        .unwrap_or(Channels::FRONT_LEFT | Channels::FRONT_RIGHT);
    SignalSpec::new(rate, channels)
}

/// Emits one `f32` frame per packet byte. The value encodes the running packet counter so
/// tests can tell whether decoder state survived a reset.
pub struct ToneSource {
    params: CodecParameters,
    buf: AudioBuffer<f32>,
    packets: u32,
}

impl Decoder for ToneSource {
    fn try_new(params: &CodecParameters, _options: &DecoderOptions) -> Result<Self> {
        let spec = spec_from(params);
        let mut params = params.clone();
        params.with_sample_rate(spec.rate).with_channels(spec.channels);
        Ok(Self {
            params,
            buf: AudioBuffer::new(4096, spec),
            packets: 0,
        })
    }

    fn supported_codecs() -> &'static [CodecDescriptor] {
        &[support_codec!(CODEC_TYPE_TONE, "tone", "Test tone source")]
    }

    fn reset(&mut self) {
        self.packets = 0;
        self.buf.clear();
    }

    fn codec_params(&self) -> &CodecParameters {
        &self.params
    }

    fn decode(&mut self, packet: &Packet) -> Result<AudioBufferRef<'_>> {
        let data = packet.buf();
        match data.first() {
            Some(&CORRUPT) => return decode_error("tone: corrupt packet"),
            Some(&BROKEN) => return Err(Error::ResetRequired),
            _ => {}
        }
        render(&mut self.buf, data.len(), self.packets as f32 / 100.0);
        self.packets += 1;
        Ok(self.buf.as_audio_buffer_ref())
    }

    fn finalize(&mut self) -> FinalizeResult {
        Default::default()
    }

    fn last_decoded(&self) -> AudioBufferRef<'_> {
        self.buf.as_audio_buffer_ref()
    }
}

/// TrueHD-family stand-in whose `reset` leaves its packet counter untouched.
pub struct TrueHdStub {
    params: CodecParameters,
    buf: AudioBuffer<i32>,
    packets: i32,
}

impl Decoder for TrueHdStub {
    fn try_new(params: &CodecParameters, _options: &DecoderOptions) -> Result<Self> {
        if params.extra_data.as_deref() == Some(REJECTED_EXTRA_DATA) {
            return unsupported_error("truehd: rejected extra data");
        }
        let spec = spec_from(params);
        let mut params = params.clone();
        params.with_sample_rate(spec.rate).with_channels(spec.channels);
        Ok(Self {
            params,
            buf: AudioBuffer::new(4096, spec),
            packets: 0,
        })
    }

    fn supported_codecs() -> &'static [CodecDescriptor] {
        &[support_codec!(CODEC_TYPE_TRUEHD, "truehd", "TrueHD test stub")]
    }

    fn reset(&mut self) {
        self.buf.clear();
    }

    fn codec_params(&self) -> &CodecParameters {
        &self.params
    }

    fn decode(&mut self, packet: &Packet) -> Result<AudioBufferRef<'_>> {
        let frames = packet.buf().len();
        let value = (self.packets + 1) << 16;
        self.buf.clear();
        self.buf.render_reserved(Some(frames));
        for plane in self.buf.planes_mut().planes() {
            plane.fill(value);
        }
        self.packets += 1;
        Ok(self.buf.as_audio_buffer_ref())
    }

    fn finalize(&mut self) -> FinalizeResult {
        Default::default()
    }

    fn last_decoded(&self) -> AudioBufferRef<'_> {
        self.buf.as_audio_buffer_ref()
    }
}

fn render(buf: &mut AudioBuffer<f32>, frames: usize, value: f32) {
    buf.clear();
    buf.render_reserved(Some(frames));
    for (ch, plane) in buf.planes_mut().planes().iter_mut().enumerate() {
        plane.fill(value + ch as f32 / 1000.0);
    }
}
