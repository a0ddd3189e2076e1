//! Opened codec context.
//!
//! Wraps one Symphonia [`Decoder`] behind a send/receive protocol:
//! - [`CodecContext::send_packet`] queues one packet and decodes it
//! - [`CodecContext::receive_frame`] hands out decoded frames until it reports "no more output"
//!
//! Symphonia produces at most one buffer per decode call. Headerless PCM packets larger than the
//! configured frame limit are decoded in limit-sized chunks, one frame per chunk; every other
//! packet yields zero or one frame.

use symphonia::core::audio::{AudioBufferRef, Channels, SignalSpec};
use symphonia::core::codecs::{CodecParameters, CodecType, Decoder, DecoderOptions};
use symphonia::core::formats::Packet;

use crate::codec::{self, Codec};
use crate::config::{DecoderConfig, RawFormat};
use crate::error::{translate, DecoderError, Result};

/// Codec initialization data followed by a zeroed padding region.
pub(crate) struct PaddedBuffer {
    data: Vec<u8>,
    len: usize,
}

impl PaddedBuffer {
    /// Copy `payload` into a fresh allocation of `payload.len() + padding` bytes.
    pub(crate) fn copy_from(payload: &[u8], padding: usize) -> Result<Self> {
        let total = payload
            .len()
            .checked_add(padding)
            .ok_or(DecoderError::Allocation { op: "extradata" })?;
        let mut data = Vec::new();
        data.try_reserve_exact(total)
            .map_err(|_| DecoderError::Allocation { op: "extradata" })?;
        data.extend_from_slice(payload);
        data.resize(total, 0);
        Ok(Self {
            data,
            len: payload.len(),
        })
    }

    pub(crate) fn payload(&self) -> &[u8] {
        &self.data[..self.len]
    }

    #[cfg(test)]
    pub(crate) fn padding(&self) -> &[u8] {
        &self.data[self.len..]
    }
}

pub(crate) struct CodecContext {
    codec: Codec,
    decoder: Box<dyn Decoder>,
    extra_data: Option<PaddedBuffer>,
    /// Largest slice handed to the decoder at once (headerless PCM only).
    chunk_bytes: Option<usize>,
    /// Undecoded remainder of the current packet.
    queued: Vec<u8>,
    /// A decoded frame awaits `receive_frame`.
    pending: bool,
    /// Format of the most recent frame; survives flushes.
    spec: Option<SignalSpec>,
}

impl CodecContext {
    /// Configure and open a decoder for `codec`.
    ///
    /// Nothing is kept when any step fails.
    pub(crate) fn open(
        codec: Codec,
        extra_data: Option<&[u8]>,
        raw: RawFormat,
        config: &DecoderConfig,
    ) -> Result<Self> {
        let mut params = CodecParameters::new();
        params.for_codec(codec.id());

        let extra_data = match extra_data {
            Some(payload) => {
                let padded = PaddedBuffer::copy_from(payload, config.input_padding).inspect_err(
                    |_| tracing::error!(codec = codec.name(), "Failed to allocate extra data."),
                )?;
                params.with_extra_data(padded.payload().into());
                Some(padded)
            }
            None => None,
        };

        let mut chunk_bytes = None;
        if let Some((bits, coded_bits)) = codec::raw_pcm_bits(codec.id()) {
            let channels = apply_raw_format(&mut params, raw)?;
            params
                .with_bits_per_sample(bits)
                .with_bits_per_coded_sample(coded_bits)
                .with_max_frames_per_packet(config.max_raw_frames_per_packet);
            let frame_bytes = channels * (coded_bits as usize / 8);
            let max_frames = usize::try_from(config.max_raw_frames_per_packet)
                .unwrap_or(usize::MAX)
                .max(1);
            chunk_bytes = Some(max_frames.saturating_mul(frame_bytes));
        }

        let options = DecoderOptions {
            verify: config.verify,
        };
        let decoder =
            (codec.descriptor().inst_func)(&params, &options).map_err(|e| translate("open", e))?;

        tracing::debug!(
            codec = codec.name(),
            sample_rate = ?decoder.codec_params().sample_rate,
            channels = ?decoder.codec_params().channels.map(|c| c.count()),
            "codec opened"
        );

        Ok(Self {
            codec,
            decoder,
            extra_data,
            chunk_bytes,
            queued: Vec::new(),
            pending: false,
            spec: None,
        })
    }

    pub(crate) fn codec(&self) -> Codec {
        self.codec
    }

    pub(crate) fn codec_id(&self) -> CodecType {
        self.codec.id()
    }

    pub(crate) fn extra_data(&self) -> Option<&PaddedBuffer> {
        self.extra_data.as_ref()
    }

    /// Submit one packet. Output left over from the previous packet is discarded.
    pub(crate) fn send_packet(&mut self, data: &[u8]) -> Result<()> {
        self.pending = false;
        self.queued.clear();
        match self.chunk_bytes {
            Some(limit) if data.len() > limit => {
                self.queued.extend_from_slice(&data[limit..]);
                self.decode_chunk("send_packet", &data[..limit])
            }
            _ => self.decode_chunk("send_packet", data),
        }
    }

    /// Next decoded frame, or `None` when the current input has no more output.
    pub(crate) fn receive_frame(&mut self) -> Result<Option<AudioBufferRef<'_>>> {
        if !std::mem::take(&mut self.pending) {
            if self.queued.is_empty() {
                return Ok(None);
            }
            let limit = self.chunk_bytes.unwrap_or(usize::MAX).min(self.queued.len());
            let rest = self.queued.split_off(limit);
            let chunk = std::mem::replace(&mut self.queued, rest);
            self.decode_chunk("receive_frame", &chunk)?;
            if !std::mem::take(&mut self.pending) {
                return Ok(None);
            }
        }
        Ok(Some(self.decoder.last_decoded()))
    }

    /// Drop buffered decoder state; stream parameters are kept.
    pub(crate) fn flush(&mut self) {
        self.pending = false;
        self.queued.clear();
        self.decoder.reset();
    }

    fn decode_chunk(&mut self, op: &'static str, data: &[u8]) -> Result<()> {
        let packet = Packet::new_from_slice(0, 0, 0, data);
        let decoded = self.decoder.decode(&packet).map_err(|e| translate(op, e))?;
        if decoded.frames() > 0 {
            self.spec = Some(*decoded.spec());
            self.pending = true;
        }
        Ok(())
    }

    pub(crate) fn sample_rate(&self) -> Option<u32> {
        self.spec
            .map(|spec| spec.rate)
            .or(self.decoder.codec_params().sample_rate)
    }

    pub(crate) fn channel_count(&self) -> Option<usize> {
        self.spec
            .map(|spec| spec.channels.count())
            .or_else(|| self.decoder.codec_params().channels.map(|c| c.count()))
    }
}

impl Drop for CodecContext {
    fn drop(&mut self) {
        tracing::debug!(codec = self.codec.name(), "codec context released");
    }
}

/// Fill in the caller's rate and layout; returns the channel count.
fn apply_raw_format(params: &mut CodecParameters, raw: RawFormat) -> Result<usize> {
    let rate = raw.sample_rate().ok_or_else(|| {
        DecoderError::InvalidArgument(format!("invalid raw sample rate: {}", raw.sample_rate))
    })?;
    let count = raw.channels().ok_or_else(|| {
        DecoderError::InvalidArgument(format!("invalid raw channel count: {}", raw.channels))
    })?;
    let channels = default_channels(count).ok_or_else(|| {
        DecoderError::InvalidArgument(format!("unsupported raw channel count: {count}"))
    })?;
    params.with_sample_rate(rate).with_channels(channels);
    Ok(count)
}

/// Default channel layout for `count` channels.
pub(crate) fn default_channels(count: usize) -> Option<Channels> {
    let fl = Channels::FRONT_LEFT;
    let fr = Channels::FRONT_RIGHT;
    let fc = Channels::FRONT_CENTRE;
    let lfe = Channels::LFE1;
    let rl = Channels::REAR_LEFT;
    let rr = Channels::REAR_RIGHT;
    let rc = Channels::REAR_CENTRE;
    let sl = Channels::SIDE_LEFT;
    let sr = Channels::SIDE_RIGHT;
    let layout = match count {
        1 => fc,
        2 => fl | fr,
        3 => fl | fr | fc,
        4 => fl | fr | fc | rc,
        5 => fl | fr | fc | rl | rr,
        6 => fl | fr | fc | lfe | rl | rr,
        7 => fl | fr | fc | lfe | rc | sl | sr,
        8 => fl | fr | fc | lfe | rl | rr | sl | sr,
        n @ 9..=32 => {
            let mask = if n == 32 { u32::MAX } else { (1u32 << n) - 1 };
            let channels = Channels::from_bits_truncate(mask);
            if channels.count() != n {
                return None;
            }
            channels
        }
        _ => return None,
    };
    Some(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::DecoderRegistry;

    fn open(name: &str, raw: RawFormat) -> Result<CodecContext> {
        let registry = DecoderRegistry::new();
        let codec = registry.find_decoder_by_name(name).unwrap();
        CodecContext::open(codec, None, raw, &DecoderConfig::default())
    }

    #[test]
    fn padded_buffer_zero_fills_tail() {
        let padded = PaddedBuffer::copy_from(&[1, 2, 3], 64).unwrap();
        assert_eq!(padded.payload(), &[1, 2, 3]);
        assert_eq!(padded.padding().len(), 64);
        assert!(padded.padding().iter().all(|b| *b == 0));
    }

    #[test]
    fn default_channels_match_common_layouts() {
        assert_eq!(default_channels(1), Some(Channels::FRONT_CENTRE));
        assert_eq!(default_channels(2).unwrap().count(), 2);
        assert_eq!(default_channels(6).unwrap().count(), 6);
        assert!(default_channels(6).unwrap().contains(Channels::LFE1));
        assert_eq!(default_channels(8).unwrap().count(), 8);
        assert_eq!(default_channels(0), None);
        assert_eq!(default_channels(33), None);
    }

    #[test]
    fn default_channels_for_four_and_seven_use_back_centre() {
        let quad = default_channels(4).unwrap();
        let fronts = Channels::FRONT_LEFT | Channels::FRONT_RIGHT | Channels::FRONT_CENTRE;
        assert_eq!(quad, fronts | Channels::REAR_CENTRE);

        let six_one = default_channels(7).unwrap();
        assert_eq!(six_one.count(), 7);
        let back = Channels::REAR_CENTRE | Channels::SIDE_LEFT | Channels::SIDE_RIGHT;
        assert!(six_one.contains(fronts | Channels::LFE1 | back));
        assert!(!six_one.contains(Channels::REAR_LEFT));
    }

    #[test]
    fn raw_pcm_uses_caller_format() {
        let ctx = open("pcm_mulaw", RawFormat::new(8_000, 2)).unwrap();
        assert_eq!(ctx.sample_rate(), Some(8_000));
        assert_eq!(ctx.channel_count(), Some(2));
    }

    #[test]
    fn raw_pcm_without_format_fails_to_open() {
        let err = open("pcm_alaw", RawFormat::UNSET).err().unwrap();
        assert!(matches!(err, DecoderError::InvalidArgument(_)), "{err}");
    }

    #[test]
    fn send_then_receive_yields_one_frame() {
        let mut ctx = open("pcm_s16le", RawFormat::new(44_100, 1)).unwrap();
        ctx.send_packet(&[0, 0, 1, 0, 2, 0]).unwrap();
        let frame = ctx.receive_frame().unwrap().unwrap();
        assert_eq!(frame.frames(), 3);
        assert!(ctx.receive_frame().unwrap().is_none());
    }

    #[test]
    fn oversized_raw_packet_is_split_into_chunks() {
        let registry = DecoderRegistry::new();
        let codec = registry.find_decoder_by_name("pcm_s16le").unwrap();
        let config = DecoderConfig {
            max_raw_frames_per_packet: 4,
            ..DecoderConfig::default()
        };
        let mut ctx = CodecContext::open(codec, None, RawFormat::new(8_000, 2), &config).unwrap();

        // 10 stereo s16 frames with a limit of 4 per chunk.
        ctx.send_packet(&[0u8; 40]).unwrap();
        let mut sizes = Vec::new();
        while let Some(frame) = ctx.receive_frame().unwrap() {
            sizes.push(frame.frames());
        }
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[test]
    fn new_packet_discards_undecoded_chunks() {
        let registry = DecoderRegistry::new();
        let codec = registry.find_decoder_by_name("pcm_u8").unwrap();
        let config = DecoderConfig {
            max_raw_frames_per_packet: 2,
            ..DecoderConfig::default()
        };
        let mut ctx = CodecContext::open(codec, None, RawFormat::new(8_000, 1), &config).unwrap();

        ctx.send_packet(&[0u8; 6]).unwrap();
        assert_eq!(ctx.receive_frame().unwrap().unwrap().frames(), 2);
        ctx.send_packet(&[0u8; 1]).unwrap();
        assert_eq!(ctx.receive_frame().unwrap().unwrap().frames(), 1);
        assert!(ctx.receive_frame().unwrap().is_none());
    }

    #[test]
    fn empty_packet_yields_no_frame() {
        let mut ctx = open("pcm_s16le", RawFormat::new(44_100, 1)).unwrap();
        ctx.send_packet(&[]).unwrap();
        assert!(ctx.receive_frame().unwrap().is_none());
    }

    #[test]
    fn flush_keeps_stream_parameters() {
        let mut ctx = open("pcm_s16le", RawFormat::new(22_050, 2)).unwrap();
        ctx.send_packet(&[0; 8]).unwrap();
        ctx.flush();
        assert!(ctx.receive_frame().unwrap().is_none());
        assert_eq!(ctx.sample_rate(), Some(22_050));
        assert_eq!(ctx.channel_count(), Some(2));
    }
}
