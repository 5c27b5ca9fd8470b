//! Mangled `libmedia` / `libutils` entry points, resolved at runtime.
//!
//! Signatures follow the legacy (pre-`RefBase`) `AudioRecord` and
//! `AudioTrack` ABI, where both objects are constructed in caller-owned
//! storage and carry a `flags` constructor argument.

use std::ffi::{c_char, c_int, c_void};

use sound_bridge_core::models::error::SoundError;

use crate::library::Library;

/// `void (*callback_t)(int event, void* user, void* info)`
pub type NativeCallback = unsafe extern "C" fn(event: c_int, user: *mut c_void, info: *mut c_void);

macro_rules! symbol_table {
    (
        $(#[$meta:meta])*
        $name:ident, $table:literal {
            $($field:ident: $ty:ty = $symbol:literal,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy)]
        pub struct $name {
            $(pub $field: $ty,)*
        }

        impl $name {
            pub const TABLE: &'static str = $table;

            /// Looks up every symbol, logging each one that is absent.
            pub fn resolve(library: &Library) -> Result<Self, SoundError> {
                let mut first_missing: Option<&'static str> = None;
                $(
                    let $field: Option<$ty> = match library.symbol($symbol) {
                        // SAFETY: the mangled name encodes the signature declared for this field.
                        Some(ptr) => Some(unsafe { std::mem::transmute::<*mut c_void, $ty>(ptr.as_ptr()) }),
                        None => {
                            log::error!("{}: cannot find symbol {} in {}", $table, $symbol, library.path());
                            first_missing.get_or_insert($symbol);
                            None
                        }
                    };
                )*
                match ($($field,)*) {
                    ($(Some($field),)*) => Ok(Self { $($field,)* }),
                    _ => Err(SoundError::SymbolMissing {
                        table: $table,
                        symbol: first_missing.unwrap_or("?"),
                    }),
                }
            }
        }
    };
}

symbol_table! {
    /// `android::AudioRecord`
    RecordTable, "AudioRecord" {
        ctor: unsafe extern "C" fn(
            this: *mut c_void,
            source: c_int,
            sample_rate: u32,
            format: u32,
            channel_mask: u32,
            frame_count: c_int,
            flags: u32,
            callback: Option<NativeCallback>,
            user: *mut c_void,
            notification_frames: c_int,
            session: c_int,
        ) = "_ZN7android11AudioRecordC1EijjjijPFviPvS1_ES1_ii",
        dtor: unsafe extern "C" fn(this: *mut c_void) = "_ZN7android11AudioRecordD1Ev",
        init_check: unsafe extern "C" fn(this: *const c_void) -> c_int = "_ZNK7android11AudioRecord9initCheckEv",
        start: unsafe extern "C" fn(this: *mut c_void) -> c_int = "_ZN7android11AudioRecord5startEv",
        stop: unsafe extern "C" fn(this: *mut c_void) -> c_int = "_ZN7android11AudioRecord4stopEv",
        get_min_frame_count: unsafe extern "C" fn(
            frame_count: *mut c_int,
            sample_rate: u32,
            format: c_int,
            channels: c_int,
        ) -> c_int = "_ZN7android11AudioRecord16getMinFrameCountEPijii",
    }
}

symbol_table! {
    /// `android::AudioTrack`
    TrackTable, "AudioTrack" {
        ctor: unsafe extern "C" fn(
            this: *mut c_void,
            stream: c_int,
            sample_rate: u32,
            format: c_int,
            channel_mask: c_int,
            frame_count: c_int,
            flags: u32,
            callback: Option<NativeCallback>,
            user: *mut c_void,
            notification_frames: c_int,
            session: c_int,
        ) = "_ZN7android10AudioTrackC1EijiiijPFviPvS1_ES1_ii",
        dtor: unsafe extern "C" fn(this: *mut c_void) = "_ZN7android10AudioTrackD1Ev",
        init_check: unsafe extern "C" fn(this: *const c_void) -> c_int = "_ZNK7android10AudioTrack9initCheckEv",
        start: unsafe extern "C" fn(this: *mut c_void) = "_ZN7android10AudioTrack5startEv",
        stop: unsafe extern "C" fn(this: *mut c_void) = "_ZN7android10AudioTrack4stopEv",
        flush: unsafe extern "C" fn(this: *mut c_void) = "_ZN7android10AudioTrack5flushEv",
        stopped: unsafe extern "C" fn(this: *const c_void) -> bool = "_ZNK7android10AudioTrack7stoppedEv",
        latency: unsafe extern "C" fn(this: *const c_void) -> u32 = "_ZNK7android10AudioTrack7latencyEv",
        get_min_frame_count: unsafe extern "C" fn(
            frame_count: *mut c_int,
            stream: c_int,
            sample_rate: u32,
        ) -> c_int = "_ZN7android10AudioTrack16getMinFrameCountEPiij",
    }
}

symbol_table! {
    /// `android::AudioSystem` statics.
    SystemTable, "AudioSystem" {
        get_output_sampling_rate: unsafe extern "C" fn(rate: *mut c_int, stream: c_int) -> c_int
            = "_ZN7android11AudioSystem21getOutputSamplingRateEPii",
        set_parameters: unsafe extern "C" fn(io: c_int, key_value_pairs: *const c_void) -> c_int
            = "_ZN7android11AudioSystem13setParametersEiRKNS_7String8E",
    }
}

symbol_table! {
    /// `android::String8`, from `libutils`.
    StringTable, "String8" {
        ctor: unsafe extern "C" fn(this: *mut c_void, value: *const c_char) = "_ZN7android7String8C1EPKc",
        dtor: unsafe extern "C" fn(this: *mut c_void) = "_ZN7android7String8D1Ev",
    }
}

/// Every table the card needs, resolved together.
#[derive(Clone, Copy)]
pub struct LibmediaTables {
    pub record: RecordTable,
    pub track: TrackTable,
    pub system: SystemTable,
    pub string: StringTable,
}

impl LibmediaTables {
    /// Resolves all four tables. Each table is attempted even after an
    /// earlier one fails, so the log names every missing symbol.
    pub fn resolve(media: &Library, utils: &Library) -> Result<Self, SoundError> {
        let record = RecordTable::resolve(media);
        let track = TrackTable::resolve(media);
        let system = SystemTable::resolve(media);
        let string = StringTable::resolve(utils);

        Ok(Self {
            record: record?,
            track: track?,
            system: system?,
            string: string?,
        })
    }
}
