//! # sound-bridge-android
//!
//! Android backend for sound-bridge.
//!
//! Provides:
//! - `LibmediaCardDescriptor`: card driver that probes `libmedia` / `libutils` at runtime
//! - `LibmediaAudio`: `NativeAudio` over `AudioRecord`, `AudioTrack` and `AudioSystem`
//! - `Library`: process-wide cache of `dlopen` handles
//!
//! ## Platform Requirements
//! - A platform exposing the legacy `AudioRecord` / `AudioTrack` C++ ABI
//! - Nothing at link time: every symbol is resolved with `dlsym`, so the
//!   crate loads (and reports no card) on systems without `libmedia`
//!
//! ## Usage
//! ```ignore
//! use sound_bridge_android::LibmediaCardDescriptor;
//! use sound_bridge_core::SoundCardManager;
//!
//! let mut manager = SoundCardManager::new();
//! manager.register(&LibmediaCardDescriptor::default());
//! if let Some(card) = manager.card("android sound card") {
//!     let reader = card.create_reader();
//!     let writer = card.create_writer();
//! }
//! ```

#[cfg(unix)]
pub mod libmedia;
#[cfg(unix)]
pub mod library;
#[cfg(unix)]
pub mod probe;
#[cfg(unix)]
pub mod symbols;

#[cfg(unix)]
pub use libmedia::LibmediaAudio;
#[cfg(unix)]
pub use library::Library;
#[cfg(unix)]
pub use probe::{probe, LibmediaCardDescriptor, LibraryPaths};
