//! Fehlertypen fuer die Sprecher-Pipeline
//!
//! Fehler treten nur beim Aufbau (Codec, Konfiguration, Steuer-Thread) auf.
//! Im laufenden Betrieb werden Decoder-Fehler und Unterlaeufe lokal
//! absorbiert und nie nach oben gereicht.

use skyvoice_core::SkyvoiceError;
use thiserror::Error;

/// Alle moeglichen Fehler der Audio-Pipeline
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Codec-Fehler: {0}")]
    CodecFehler(String),

    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    #[error("Steuer-Thread Fehler: {0}")]
    SteuerThread(String),

    #[error("Engine wurde bereits beendet")]
    EngineBeendet,

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unerwarteter Fehler: {0}")]
    Anyhow(#[from] anyhow::Error),
}

pub type AudioResult<T> = Result<T, AudioError>;

impl From<AudioError> for SkyvoiceError {
    fn from(e: AudioError) -> Self {
        match e {
            AudioError::CodecFehler(msg) => SkyvoiceError::Codec(msg),
            AudioError::Konfiguration(msg) => SkyvoiceError::Konfiguration(msg),
            AudioError::Anyhow(e) => SkyvoiceError::Anyhow(e),
            other => SkyvoiceError::Audio(other.to_string()),
        }
    }
}
