//! Card detection: load the platform libraries and bind their symbols.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use sound_bridge_core::card::manager::{SoundCardDescriptor, SoundCardManager};
use sound_bridge_core::card::sound_card::SoundCard;
use sound_bridge_core::models::config::SoundCardConfig;
use sound_bridge_core::models::error::SoundError;

use crate::library;
use crate::libmedia::LibmediaAudio;
use crate::symbols::LibmediaTables;

/// Where the platform audio libraries live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryPaths {
    pub media: String,
    pub utils: String,
}

impl Default for LibraryPaths {
    fn default() -> Self {
        Self {
            media: "/system/lib/libmedia.so".into(),
            utils: "/system/lib/libutils.so".into(),
        }
    }
}

/// Loads both libraries and resolves every symbol table.
pub fn probe(paths: &LibraryPaths) -> Result<LibmediaAudio, SoundError> {
    let media = library::load_cached(&paths.media)?;
    let utils = library::load_cached(&paths.utils)?;
    let tables = LibmediaTables::resolve(&media, &utils)?;
    Ok(LibmediaAudio::new(tables, media, utils))
}

/// The `libmedia` sound card driver.
#[derive(Debug, Clone, Default)]
pub struct LibmediaCardDescriptor {
    paths: LibraryPaths,
    config: SoundCardConfig,
}

impl LibmediaCardDescriptor {
    pub const DRIVER_NAME: &'static str = "libmedia";

    pub fn new(paths: LibraryPaths, config: SoundCardConfig) -> Self {
        Self { paths, config }
    }

    pub fn paths(&self) -> &LibraryPaths {
        &self.paths
    }
}

impl SoundCardDescriptor for LibmediaCardDescriptor {
    fn driver_name(&self) -> &'static str {
        Self::DRIVER_NAME
    }

    fn detect(&self, manager: &mut SoundCardManager) {
        match probe(&self.paths) {
            Ok(audio) => {
                log::info!("Native android sound support available.");
                let card = SoundCard::new(Self::DRIVER_NAME, Arc::new(audio), self.config.clone());
                manager.add_card(card);
            }
            Err(e) => {
                log::info!("Native android sound support is NOT available.");
                log::debug!("libmedia probe failed: {}", e);
            }
        }
    }
}
