//! Decoder lookup.
//!
//! Names follow the usual decoder naming (`flac`, `pcm_mulaw`, ...) and resolve to a Symphonia
//! [`CodecType`]. A name is only available when some implementation is registered for its type:
//! runtime registrations first, then the built-in Symphonia registry. Runtime registrations can
//! also be found by their own short name.

use audio_decoder_types::DecoderInfo;
use symphonia::core::codecs::{
    decl_codec_type, CodecDescriptor, CodecType, Decoder, CODEC_TYPE_AAC, CODEC_TYPE_ALAC,
    CODEC_TYPE_FLAC, CODEC_TYPE_MP1, CODEC_TYPE_MP2, CODEC_TYPE_MP3, CODEC_TYPE_OPUS,
    CODEC_TYPE_PCM_ALAW, CODEC_TYPE_PCM_F32BE, CODEC_TYPE_PCM_F32LE, CODEC_TYPE_PCM_F64BE,
    CODEC_TYPE_PCM_F64LE, CODEC_TYPE_PCM_MULAW, CODEC_TYPE_PCM_S16BE, CODEC_TYPE_PCM_S16LE,
    CODEC_TYPE_PCM_S24BE, CODEC_TYPE_PCM_S24LE, CODEC_TYPE_PCM_S32BE, CODEC_TYPE_PCM_S32LE,
    CODEC_TYPE_PCM_S8, CODEC_TYPE_PCM_U8, CODEC_TYPE_VORBIS,
};

/// Identifier of the TrueHD (MLP) family. Symphonia does not declare one.
pub const CODEC_TYPE_TRUEHD: CodecType = decl_codec_type(b"trhd");

/// Known decoder names and the codec identifier each resolves to.
const DECODER_NAMES: &[(&str, CodecType)] = &[
    ("flac", CODEC_TYPE_FLAC),
    ("mp1", CODEC_TYPE_MP1),
    ("mp2", CODEC_TYPE_MP2),
    ("mp3", CODEC_TYPE_MP3),
    ("aac", CODEC_TYPE_AAC),
    ("alac", CODEC_TYPE_ALAC),
    ("vorbis", CODEC_TYPE_VORBIS),
    ("opus", CODEC_TYPE_OPUS),
    ("truehd", CODEC_TYPE_TRUEHD),
    ("pcm_mulaw", CODEC_TYPE_PCM_MULAW),
    ("pcm_alaw", CODEC_TYPE_PCM_ALAW),
    ("pcm_u8", CODEC_TYPE_PCM_U8),
    ("pcm_s8", CODEC_TYPE_PCM_S8),
    ("pcm_s16le", CODEC_TYPE_PCM_S16LE),
    ("pcm_s16be", CODEC_TYPE_PCM_S16BE),
    ("pcm_s24le", CODEC_TYPE_PCM_S24LE),
    ("pcm_s24be", CODEC_TYPE_PCM_S24BE),
    ("pcm_s32le", CODEC_TYPE_PCM_S32LE),
    ("pcm_s32be", CODEC_TYPE_PCM_S32BE),
    ("pcm_f32le", CODEC_TYPE_PCM_F32LE),
    ("pcm_f32be", CODEC_TYPE_PCM_F32BE),
    ("pcm_f64le", CODEC_TYPE_PCM_F64LE),
    ("pcm_f64be", CODEC_TYPE_PCM_F64BE),
];

/// A resolved decoder implementation.
#[derive(Clone, Copy)]
pub struct Codec {
    name: &'static str,
    descriptor: &'static CodecDescriptor,
}

impl Codec {
    /// Lookup name (for codecs found by id, the first name mapped to that id).
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn id(&self) -> CodecType {
        self.descriptor.codec
    }

    pub fn long_name(&self) -> &'static str {
        self.descriptor.long_name
    }

    pub(crate) fn descriptor(&self) -> &'static CodecDescriptor {
        self.descriptor
    }
}

impl std::fmt::Debug for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codec")
            .field("name", &self.name)
            .field("id", &self.descriptor.codec)
            .finish()
    }
}

/// Set of decoder implementations sessions can be opened with.
#[derive(Default)]
pub struct DecoderRegistry {
    extra: Vec<&'static CodecDescriptor>,
}

impl DecoderRegistry {
    /// Registry backed only by the built-in Symphonia decoders.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every codec `D` supports. Later registrations win over earlier ones and over
    /// the built-in decoders.
    pub fn register<D: Decoder>(&mut self) -> &mut Self {
        for descriptor in D::supported_codecs() {
            tracing::debug!(codec = descriptor.short_name, "decoder registered");
            self.extra.push(descriptor);
        }
        self
    }

    /// Resolve a decoder by name. Unknown or empty names yield `None`.
    pub fn find_decoder_by_name(&self, name: &str) -> Option<Codec> {
        if let Some((name, id)) = DECODER_NAMES.iter().find(|(known, _)| *known == name) {
            let descriptor = self.descriptor(*id)?;
            return Some(Codec {
                name: *name,
                descriptor,
            });
        }
        self.extra
            .iter()
            .rev()
            .find(|descriptor| descriptor.short_name == name)
            .copied()
            .map(|descriptor| Codec {
                name: descriptor.short_name,
                descriptor,
            })
    }

    /// Resolve a decoder by identifier.
    pub fn find_decoder_by_id(&self, id: CodecType) -> Option<Codec> {
        let descriptor = self.descriptor(id)?;
        let name = name_for_id(id).unwrap_or(descriptor.short_name);
        Some(Codec { name, descriptor })
    }

    /// Availability probe; never fails.
    pub fn has_decoder(&self, name: &str) -> bool {
        self.find_decoder_by_name(name).is_some()
    }

    /// Every known decoder name with its availability.
    pub fn decoders(&self) -> Vec<DecoderInfo> {
        let mut list: Vec<DecoderInfo> = DECODER_NAMES
            .iter()
            .map(|(name, id)| {
                let descriptor = self.descriptor(*id);
                DecoderInfo {
                    name: name.to_string(),
                    long_name: descriptor.map(|d| d.long_name.to_string()),
                    available: descriptor.is_some(),
                }
            })
            .collect();
        for descriptor in &self.extra {
            if !list.iter().any(|info| info.name == descriptor.short_name) {
                list.push(DecoderInfo {
                    name: descriptor.short_name.to_string(),
                    long_name: Some(descriptor.long_name.to_string()),
                    available: true,
                });
            }
        }
        list
    }

    fn descriptor(&self, id: CodecType) -> Option<&'static CodecDescriptor> {
        self.extra
            .iter()
            .rev()
            .find(|descriptor| descriptor.codec == id)
            .copied()
            .or_else(|| symphonia::default::get_codecs().get_codec(id))
    }
}

fn name_for_id(id: CodecType) -> Option<&'static str> {
    DECODER_NAMES
        .iter()
        .find(|(_, known)| *known == id)
        .map(|(name, _)| *name)
}

/// `(decoded bits, coded bits)` for headerless PCM variants; `None` for codecs whose streams
/// describe their own rate and layout.
pub(crate) fn raw_pcm_bits(id: CodecType) -> Option<(u32, u32)> {
    let bits = match id {
        CODEC_TYPE_PCM_MULAW | CODEC_TYPE_PCM_ALAW => (16, 8),
        CODEC_TYPE_PCM_U8 | CODEC_TYPE_PCM_S8 => (8, 8),
        CODEC_TYPE_PCM_S16LE | CODEC_TYPE_PCM_S16BE => (16, 16),
        CODEC_TYPE_PCM_S24LE | CODEC_TYPE_PCM_S24BE => (24, 24),
        CODEC_TYPE_PCM_S32LE | CODEC_TYPE_PCM_S32BE => (32, 32),
        CODEC_TYPE_PCM_F32LE | CODEC_TYPE_PCM_F32BE => (32, 32),
        CODEC_TYPE_PCM_F64LE | CODEC_TYPE_PCM_F64BE => (64, 64),
        _ => return None,
    };
    Some(bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ToneSource, TrueHdStub, CODEC_TYPE_TONE};

    #[test]
    fn has_decoder_rejects_empty_and_unknown_names() {
        let registry = DecoderRegistry::new();
        assert!(!registry.has_decoder(""));
        assert!(!registry.has_decoder("no-such-codec"));
        assert!(!registry.has_decoder("FLAC"), "lookup is case-sensitive");
    }

    #[test]
    fn builtin_decoders_resolve() {
        let registry = DecoderRegistry::new();
        assert!(registry.has_decoder("flac"));
        assert!(registry.has_decoder("pcm_mulaw"));
        let codec = registry.find_decoder_by_name("pcm_s16le").unwrap();
        assert_eq!(codec.name(), "pcm_s16le");
        assert_eq!(codec.id(), CODEC_TYPE_PCM_S16LE);
    }

    #[test]
    fn truehd_needs_a_registered_implementation() {
        let mut registry = DecoderRegistry::new();
        assert!(!registry.has_decoder("truehd"));
        assert!(registry.find_decoder_by_id(CODEC_TYPE_TRUEHD).is_none());

        registry.register::<TrueHdStub>();
        let codec = registry.find_decoder_by_id(CODEC_TYPE_TRUEHD).unwrap();
        assert_eq!(codec.name(), "truehd");
        assert!(registry.has_decoder("truehd"));
    }

    #[test]
    fn registered_decoders_resolve_by_short_name() {
        let mut registry = DecoderRegistry::new();
        assert!(!registry.has_decoder("tone"));
        registry.register::<ToneSource>();
        let codec = registry.find_decoder_by_name("tone").unwrap();
        assert_eq!(codec.id(), CODEC_TYPE_TONE);
        assert_eq!(registry.find_decoder_by_id(CODEC_TYPE_TONE).unwrap().name(), "tone");
        assert!(registry.decoders().iter().any(|d| d.name == "tone" && d.available));
    }

    #[test]
    fn decoders_lists_availability() {
        let registry = DecoderRegistry::new();
        let list = registry.decoders();
        let alaw = list.iter().find(|d| d.name == "pcm_alaw").unwrap();
        assert!(alaw.available);
        assert!(alaw.long_name.is_some());
        let truehd = list.iter().find(|d| d.name == "truehd").unwrap();
        assert!(!truehd.available);
        assert!(truehd.long_name.is_none());
    }

    #[test]
    fn headerless_family_covers_companded_and_raw_pcm() {
        assert_eq!(raw_pcm_bits(CODEC_TYPE_PCM_MULAW), Some((16, 8)));
        assert_eq!(raw_pcm_bits(CODEC_TYPE_PCM_ALAW), Some((16, 8)));
        assert_eq!(raw_pcm_bits(CODEC_TYPE_PCM_S16LE), Some((16, 16)));
        assert_eq!(raw_pcm_bits(CODEC_TYPE_PCM_S24BE), Some((24, 24)));
        assert!(raw_pcm_bits(CODEC_TYPE_FLAC).is_none());
        assert!(raw_pcm_bits(CODEC_TYPE_TRUEHD).is_none());
    }
}
