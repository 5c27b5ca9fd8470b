//! [`NativeAudio`] over the resolved `libmedia` tables.

use std::ffi::{c_int, c_void, CString};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use sound_bridge_core::models::audio_models::{IoHandle, PcmFormat, StreamType};
use sound_bridge_core::models::error::SoundError;
use sound_bridge_core::traits::native::{
    NativeAudio, NativeRecord, NativeTrack, RecordCallback, RecordEvent, RecordParams, TrackCallback,
    TrackEvent, TrackParams,
};

use crate::library::Library;
use crate::symbols::{LibmediaTables, RecordTable, StringTable, TrackTable};

const EVENT_MORE_DATA: c_int = 0;
/// `EVENT_OVERRUN` for records, `EVENT_UNDERRUN` for tracks.
const EVENT_XRUN: c_int = 1;

/// Caller-owned storage for one C++ object. Larger than any known
/// `AudioRecord`/`AudioTrack` layout.
#[repr(C, align(16))]
struct ObjectStorage([u8; 1024]);

impl ObjectStorage {
    fn boxed() -> Box<Self> {
        Box::new(Self([0; 1024]))
    }

    fn as_mut_ptr(&mut self) -> *mut c_void {
        self.0.as_mut_ptr().cast()
    }

    fn as_ptr(&self) -> *const c_void {
        self.0.as_ptr().cast()
    }
}

/// `AudioRecord::Buffer` / `AudioTrack::Buffer`.
#[repr(C)]
struct NativeBuffer {
    flags: u32,
    channel_count: c_int,
    format: c_int,
    frame_count: usize,
    size: usize,
    raw: *mut c_void,
}

/// The platform audio system, reached through `libmedia`.
pub struct LibmediaAudio {
    tables: LibmediaTables,
    // Keeps both libraries mapped while this or any stream is alive.
    libraries: Arc<[Arc<Library>]>,
}

impl LibmediaAudio {
    pub fn new(tables: LibmediaTables, media: Arc<Library>, utils: Arc<Library>) -> Self {
        Self {
            tables,
            libraries: Arc::new([media, utils]) as Arc<[Arc<Library>]>,
        }
    }

    fn with_string8<R>(string: &StringTable, value: &str, f: impl FnOnce(*const c_void) -> R) -> Result<R, SoundError> {
        let c_value = CString::new(value)
            .map_err(|_| SoundError::InvalidParameter(format!("parameter contains NUL: {:?}", value)))?;
        // String8 is a single pointer; the extra room is slack.
        let mut storage = [0usize; 4];
        let this = storage.as_mut_ptr().cast::<c_void>();
        // SAFETY: `storage` outlives the object; ctor and dtor are paired.
        unsafe {
            (string.ctor)(this, c_value.as_ptr());
            let result = f(this.cast_const());
            (string.dtor)(this);
            Ok(result)
        }
    }
}

impl NativeAudio for LibmediaAudio {
    fn output_sampling_rate(&self, stream: StreamType) -> Result<u32, SoundError> {
        let mut rate: c_int = 0;
        // SAFETY: `rate` is a valid out-pointer.
        let status = unsafe { (self.tables.system.get_output_sampling_rate)(&mut rate, stream.native()) };
        SoundError::check_status(status)?;
        u32::try_from(rate).map_err(|_| SoundError::NativeStatus(rate))
    }

    fn set_parameters(&self, io: IoHandle, params: &str) -> Result<(), SoundError> {
        let system = self.tables.system;
        // SAFETY: the String8 pointer is valid inside the closure.
        let status = Self::with_string8(&self.tables.string, params, |kv| unsafe {
            (system.set_parameters)(io.0, kv)
        })?;
        SoundError::check_status(status)
    }

    fn record_min_frame_count(&self, sample_rate: u32, format: PcmFormat, channels: u16) -> Result<usize, SoundError> {
        let mut frames: c_int = 0;
        // SAFETY: `frames` is a valid out-pointer.
        let status = unsafe {
            (self.tables.record.get_min_frame_count)(&mut frames, sample_rate, format.native(), c_int::from(channels))
        };
        SoundError::check_status(status)?;
        usize::try_from(frames).map_err(|_| SoundError::NativeStatus(frames))
    }

    fn track_min_frame_count(&self, stream: StreamType, sample_rate: u32) -> Result<usize, SoundError> {
        let mut frames: c_int = 0;
        // SAFETY: `frames` is a valid out-pointer.
        let status = unsafe { (self.tables.track.get_min_frame_count)(&mut frames, stream.native(), sample_rate) };
        SoundError::check_status(status)?;
        usize::try_from(frames).map_err(|_| SoundError::NativeStatus(frames))
    }

    fn open_record(&self, params: RecordParams, callback: RecordCallback) -> Result<Box<dyn NativeRecord>, SoundError> {
        // Converted up front: nothing may fail between construction and `Drop`.
        let frame_count = to_c_int(params.frame_count)?;
        let notification_frames = to_c_int(params.notification_frames)?;
        let mut record = LibmediaRecord {
            object: ObjectStorage::boxed(),
            table: self.tables.record,
            context: Box::new(RecordContext { callback }),
            _libraries: Arc::clone(&self.libraries),
        };
        let user = std::ptr::addr_of!(*record.context).cast_mut().cast::<c_void>();

        // SAFETY: the storage and context are heap-pinned for the object's
        // lifetime, and the destructor runs in `Drop` before either is freed.
        let status = unsafe {
            (record.table.ctor)(
                record.object.as_mut_ptr(),
                params.source.native(),
                params.sample_rate,
                params.format.native() as u32,
                params.channel_mask,
                frame_count,
                0,
                Some(record_trampoline),
                user,
                notification_frames,
                0,
            );
            (record.table.init_check)(record.object.as_ptr())
        };
        SoundError::check_status(status)?;
        Ok(Box::new(record))
    }

    fn open_track(&self, params: TrackParams, callback: TrackCallback) -> Result<Box<dyn NativeTrack>, SoundError> {
        // Converted up front: nothing may fail between construction and `Drop`.
        let frame_count = to_c_int(params.frame_count)?;
        let notification_frames = to_c_int(params.notification_frames)?;
        let mut track = LibmediaTrack {
            object: ObjectStorage::boxed(),
            table: self.tables.track,
            context: Box::new(TrackContext { callback }),
            _libraries: Arc::clone(&self.libraries),
        };
        let user = std::ptr::addr_of!(*track.context).cast_mut().cast::<c_void>();

        // SAFETY: as in `open_record`.
        let status = unsafe {
            (track.table.ctor)(
                track.object.as_mut_ptr(),
                params.stream.native(),
                params.sample_rate,
                params.format.native(),
                params.channel_mask as c_int,
                frame_count,
                0,
                Some(track_trampoline),
                user,
                notification_frames,
                0,
            );
            (track.table.init_check)(track.object.as_ptr())
        };
        SoundError::check_status(status)?;
        Ok(Box::new(track))
    }
}

fn to_c_int(value: usize) -> Result<c_int, SoundError> {
    c_int::try_from(value).map_err(|_| SoundError::InvalidParameter(format!("{} does not fit a C int", value)))
}

struct RecordContext {
    callback: RecordCallback,
}

struct TrackContext {
    callback: TrackCallback,
}

/// A constructed `android::AudioRecord`.
struct LibmediaRecord {
    object: Box<ObjectStorage>,
    table: RecordTable,
    context: Box<RecordContext>,
    _libraries: Arc<[Arc<Library>]>,
}

impl NativeRecord for LibmediaRecord {
    fn start(&mut self) -> Result<(), SoundError> {
        // SAFETY: the object was constructed and passed its init check.
        SoundError::check_status(unsafe { (self.table.start)(self.object.as_mut_ptr()) })
    }

    fn stop(&mut self) {
        // SAFETY: as above.
        let status = unsafe { (self.table.stop)(self.object.as_mut_ptr()) };
        if status != 0 {
            log::warn!("AudioRecord stop returned {}", status);
        }
    }
}

impl Drop for LibmediaRecord {
    fn drop(&mut self) {
        // SAFETY: the constructor ran on this storage. The destructor joins
        // the callback thread, so `context` is unused afterwards.
        unsafe { (self.table.dtor)(self.object.as_mut_ptr()) }
    }
}

/// A constructed `android::AudioTrack`.
struct LibmediaTrack {
    object: Box<ObjectStorage>,
    table: TrackTable,
    context: Box<TrackContext>,
    _libraries: Arc<[Arc<Library>]>,
}

impl NativeTrack for LibmediaTrack {
    fn start(&mut self) {
        // SAFETY: the object was constructed and passed its init check.
        unsafe { (self.table.start)(self.object.as_mut_ptr()) }
    }

    fn stop(&mut self) {
        // SAFETY: the object was constructed and passed its init check.
        unsafe { (self.table.stop)(self.object.as_mut_ptr()) }
    }

    fn flush(&mut self) {
        // SAFETY: as above.
        unsafe { (self.table.flush)(self.object.as_mut_ptr()) }
    }

    fn stopped(&self) -> bool {
        // SAFETY: const method on a constructed object.
        unsafe { (self.table.stopped)(self.object.as_ptr()) }
    }

    fn latency_ms(&self) -> u32 {
        // SAFETY: const method on a constructed object.
        unsafe { (self.table.latency)(self.object.as_ptr()) }
    }
}

impl Drop for LibmediaTrack {
    fn drop(&mut self) {
        // SAFETY: see `LibmediaRecord`.
        unsafe { (self.table.dtor)(self.object.as_mut_ptr()) }
    }
}

/// Runs `f`, swallowing a panic so it never unwinds into C++.
fn guarded(what: &str, f: impl FnOnce()) {
    if panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
        log::error!("{} callback panicked", what);
    }
}

unsafe extern "C" fn record_trampoline(event: c_int, user: *mut c_void, info: *mut c_void) {
    // SAFETY: `user` is the `RecordContext` registered in `open_record`.
    let Some(context) = (unsafe { user.cast::<RecordContext>().as_ref() }) else {
        return;
    };
    guarded("AudioRecord", || match event {
        EVENT_MORE_DATA => {
            // SAFETY: for MORE_DATA, `info` points to a filled Buffer owned by the caller.
            let Some(buffer) = (unsafe { info.cast::<NativeBuffer>().as_ref() }) else {
                return;
            };
            if buffer.raw.is_null() {
                return;
            }
            // SAFETY: `raw` holds `size` captured bytes for the duration of the call.
            let data = unsafe { std::slice::from_raw_parts(buffer.raw.cast::<u8>(), buffer.size) };
            (context.callback)(RecordEvent::MoreData {
                frame_count: buffer.frame_count,
                data,
            });
        }
        EVENT_XRUN => (context.callback)(RecordEvent::Overrun),
        other => (context.callback)(RecordEvent::Other(other)),
    });
}

unsafe extern "C" fn track_trampoline(event: c_int, user: *mut c_void, info: *mut c_void) {
    // SAFETY: `user` is the `TrackContext` registered in `open_track`.
    let Some(context) = (unsafe { user.cast::<TrackContext>().as_ref() }) else {
        return;
    };
    guarded("AudioTrack", || match event {
        EVENT_MORE_DATA => {
            // SAFETY: for MORE_DATA, `info` points to a writable Buffer of `size` bytes.
            let Some(buffer) = (unsafe { info.cast::<NativeBuffer>().as_mut() }) else {
                return;
            };
            if buffer.raw.is_null() {
                buffer.size = 0;
                return;
            }
            // SAFETY: `raw` is writable for `size` bytes until we return.
            let data = unsafe { std::slice::from_raw_parts_mut(buffer.raw.cast::<u8>(), buffer.size) };
            let mut request = TrackEvent::MoreData {
                frame_count: buffer.frame_count,
                data,
                served: 0,
            };
            (context.callback)(&mut request);
            if let TrackEvent::MoreData { data, served, .. } = request {
                buffer.size = served.min(data.len());
            }
        }
        EVENT_XRUN => (context.callback)(&mut TrackEvent::Underrun),
        other => (context.callback)(&mut TrackEvent::Other(other)),
    });
}
