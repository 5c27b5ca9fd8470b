use crate::card::sound_card::SoundCard;

/// A sound card driver the host registers with its card manager.
pub trait SoundCardDescriptor: Send + Sync {
    /// Driver name, e.g. `"libmedia"`.
    fn driver_name(&self) -> &'static str;

    /// Probes for the driver's platform support and adds any cards found.
    /// Absence of support is logged, never an error.
    fn detect(&self, manager: &mut SoundCardManager);
}

/// Registry of detected sound cards.
#[derive(Default)]
pub struct SoundCardManager {
    cards: Vec<SoundCard>,
}

impl SoundCardManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs a descriptor's detection against this manager.
    pub fn register(&mut self, descriptor: &dyn SoundCardDescriptor) {
        log::debug!("Detecting sound cards for driver {}", descriptor.driver_name());
        descriptor.detect(self);
    }

    pub fn add_card(&mut self, card: SoundCard) {
        log::info!("Card '{}' ({}) added", card.name(), card.driver());
        self.cards.push(card);
    }

    pub fn cards(&self) -> &[SoundCard] {
        &self.cards
    }

    pub fn card(&self, name: &str) -> Option<&SoundCard> {
        self.cards.iter().find(|c| c.name() == name)
    }

    /// Unregisters the first card with `name`. Its data is freed once every
    /// filter created from it is gone.
    pub fn remove(&mut self, name: &str) -> Option<SoundCard> {
        let index = self.cards.iter().position(|c| c.name() == name)?;
        Some(self.cards.remove(index))
    }
}
