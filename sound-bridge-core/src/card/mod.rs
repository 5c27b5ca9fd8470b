pub mod manager;
pub mod negotiation;
pub mod sound_card;
pub mod voice_mode;
