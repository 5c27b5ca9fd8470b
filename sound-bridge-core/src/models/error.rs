use thiserror::Error;

/// Errors raised by the sound card and its native binding.
///
/// None of these ever reach the host graph: filter hooks log them and fall
/// back to a no-op state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SoundError {
    #[error("library unavailable: {0}")]
    LibraryUnavailable(String),

    #[error("symbol {symbol} missing from {table} table")]
    SymbolMissing { table: &'static str, symbol: &'static str },

    #[error("native call failed with status {0}")]
    NativeStatus(i32),

    #[error("no supported capture sampling rate")]
    NoCaptureRate,

    #[error("setup failed: {0}")]
    SetupFailed(String),

    #[error("sampling rate is fixed by the hardware")]
    RateFixed,

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl SoundError {
    /// Maps a native `status_t` to a result (0 is success).
    pub fn check_status(status: i32) -> Result<(), SoundError> {
        if status == 0 {
            Ok(())
        } else {
            Err(SoundError::NativeStatus(status))
        }
    }
}
