//! Handle-based call boundary.
//!
//! Callers hold sessions as opaque `u64` handles. `0` means "no session"; a handle is never
//! handed out twice. Every entry point reports failure through the integer conventions the
//! caller expects instead of `Result`:
//! - `decode` returns bytes written, `-1` for invalid data or arguments, `-2` for anything else
//! - channel count / sample rate return `-1` for an unknown handle
//! - `initialize` / `reset` return `0` when no session could be produced

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use audio_decoder_types::{DecodeErrorKind, SampleEncoding, SessionInfo};

use crate::codec::DecoderRegistry;
use crate::config::{DecoderConfig, RawFormat};
use crate::session::DecodeSession;

/// Version string reported by [`get_library_version`].
pub const LIBRARY_VERSION: &str = concat!(
    "audio-decoder ",
    env!("CARGO_PKG_VERSION"),
    " (symphonia 0.5)"
);

type Slot = Arc<Mutex<Option<DecodeSession>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Table of live sessions keyed by handle.
///
/// The table lock is only held to look a handle up; decoding happens under the session's own
/// lock, so independent sessions can be driven from different threads.
pub struct SessionTable {
    registry: Arc<DecoderRegistry>,
    config: DecoderConfig,
    next_handle: AtomicU64,
    sessions: Mutex<HashMap<u64, Slot>>,
}

impl Default for SessionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionTable {
    /// Table over the built-in decoders with default configuration.
    pub fn new() -> Self {
        Self::with_registry(DecoderRegistry::new(), DecoderConfig::default())
    }

    pub fn with_registry(registry: DecoderRegistry, config: DecoderConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            config,
            next_handle: AtomicU64::new(1),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &DecoderRegistry {
        &self.registry
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Open a session and return its handle, or `0` on failure.
    pub fn initialize(
        &self,
        codec_name: &str,
        extra_data: Option<&[u8]>,
        output_float: bool,
        raw_sample_rate: i32,
        raw_channel_count: i32,
    ) -> u64 {
        let session = DecodeSession::open(
            Arc::clone(&self.registry),
            codec_name,
            extra_data,
            SampleEncoding::from_output_float(output_float),
            RawFormat::new(raw_sample_rate, raw_channel_count),
            self.config.clone(),
        );
        match session {
            Ok(session) => self.insert(session),
            Err(err) => {
                tracing::warn!(codec = codec_name, error = %err, "session not created");
                0
            }
        }
    }

    /// Decode `input[..input_size]` into `output[..output_capacity]`.
    ///
    /// Sizes larger than the given slices are clamped to the slice lengths.
    pub fn decode(
        &self,
        handle: u64,
        input: Option<&[u8]>,
        input_size: i32,
        output: Option<&mut [u8]>,
        output_capacity: i32,
    ) -> i32 {
        let invalid = DecodeErrorKind::InvalidData.code();
        let (Some(input), Some(output)) = (input, output) else {
            tracing::error!(handle, "decode called without input or output buffer");
            return invalid;
        };
        let (Ok(input_size), Ok(output_capacity)) =
            (usize::try_from(input_size), usize::try_from(output_capacity))
        else {
            tracing::error!(
                handle,
                input_size,
                output_capacity,
                "decode called with a negative size"
            );
            return invalid;
        };
        let Some(slot) = self.slot(handle) else {
            tracing::error!(handle, "decode called on an unknown session");
            return invalid;
        };
        let mut guard = lock(&slot);
        let Some(session) = guard.as_mut() else {
            return invalid;
        };

        let packet = &input[..input_size.min(input.len())];
        let capacity = output_capacity.min(output.len());
        match session.decode(packet, &mut output[..capacity]) {
            Ok(written) => i32::try_from(written).unwrap_or(DecodeErrorKind::Other.code()),
            Err(err) => err.code(),
        }
    }

    /// Channel count of the session's stream, `0` while unknown, `-1` for an unknown handle.
    pub fn channel_count(&self, handle: u64) -> i32 {
        self.with_session(handle, |session| {
            session
                .channel_count()
                .map_or(0, |count| i32::try_from(count).unwrap_or(i32::MAX))
        })
        .unwrap_or(-1)
    }

    /// Sample rate of the session's stream, `0` while unknown, `-1` for an unknown handle.
    pub fn sample_rate(&self, handle: u64) -> i32 {
        self.with_session(handle, |session| {
            session
                .sample_rate()
                .map_or(0, |rate| i32::try_from(rate).unwrap_or(i32::MAX))
        })
        .unwrap_or(-1)
    }

    /// Reset the session behind `handle`.
    ///
    /// Returns the handle to keep using: the same one on success, `0` when there was no session
    /// or recreating it failed (the handle is gone in that case).
    pub fn reset(&self, handle: u64, extra_data: Option<&[u8]>) -> u64 {
        let Some(slot) = self.slot(handle) else {
            return 0;
        };
        let mut guard = lock(&slot);
        let Some(session) = guard.take() else {
            return 0;
        };
        match session.reset(extra_data) {
            Ok(session) => {
                *guard = Some(session);
                handle
            }
            Err(err) => {
                tracing::error!(handle, error = %err, "reset failed; session released");
                drop(guard);
                lock(&self.sessions).remove(&handle);
                0
            }
        }
    }

    /// Release the session behind `handle`. Unknown handles are ignored.
    pub fn release(&self, handle: u64) {
        let Some(slot) = lock(&self.sessions).remove(&handle) else {
            return;
        };
        if let Some(session) = lock(&slot).take() {
            session.release();
        }
    }

    pub fn info(&self, handle: u64) -> Option<SessionInfo> {
        self.with_session(handle, DecodeSession::info)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        lock(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&self, session: DecodeSession) -> u64 {
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        lock(&self.sessions).insert(handle, Arc::new(Mutex::new(Some(session))));
        handle
    }

    fn slot(&self, handle: u64) -> Option<Slot> {
        if handle == 0 {
            return None;
        }
        lock(&self.sessions).get(&handle).cloned()
    }

    fn with_session<R>(&self, handle: u64, f: impl FnOnce(&DecodeSession) -> R) -> Option<R> {
        let slot = self.slot(handle)?;
        let guard = lock(&slot);
        guard.as_ref().map(f)
    }
}

static DEFAULT: LazyLock<SessionTable> = LazyLock::new(SessionTable::new);

/// The process-wide table behind the free functions.
pub fn default_table() -> &'static SessionTable {
    &DEFAULT
}

pub fn initialize(
    codec_name: &str,
    extra_data: Option<&[u8]>,
    output_float: bool,
    raw_sample_rate: i32,
    raw_channel_count: i32,
) -> u64 {
    DEFAULT.initialize(
        codec_name,
        extra_data,
        output_float,
        raw_sample_rate,
        raw_channel_count,
    )
}

pub fn decode(
    handle: u64,
    input: Option<&[u8]>,
    input_size: i32,
    output: Option<&mut [u8]>,
    output_capacity: i32,
) -> i32 {
    DEFAULT.decode(handle, input, input_size, output, output_capacity)
}

pub fn get_channel_count(handle: u64) -> i32 {
    DEFAULT.channel_count(handle)
}

pub fn get_sample_rate(handle: u64) -> i32 {
    DEFAULT.sample_rate(handle)
}

pub fn reset(handle: u64, extra_data: Option<&[u8]>) -> u64 {
    DEFAULT.reset(handle, extra_data)
}

pub fn release(handle: u64) {
    DEFAULT.release(handle)
}

pub fn get_library_version() -> &'static str {
    LIBRARY_VERSION
}

/// Zeroed bytes callers must keep after the end of every input buffer.
pub fn get_required_input_padding() -> i32 {
    i32::try_from(DEFAULT.config().input_padding).unwrap_or(i32::MAX)
}

pub fn has_decoder(codec_name: &str) -> bool {
    DEFAULT.registry().has_decoder(codec_name)
}
