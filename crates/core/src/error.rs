//! Fehlertypen fuer skyvoice
//!
//! Zentraler Fehler-Enum an den Crate-Grenzen. Untermodule definieren eigene
//! Fehler und konvertieren via `From` bzw. `#[from]`.

use thiserror::Error;

/// Globaler Result-Alias fuer skyvoice
pub type Result<T> = std::result::Result<T, SkyvoiceError>;

/// Alle Fehler, die an Crate-Grenzen sichtbar werden koennen
#[derive(Debug, Error)]
pub enum SkyvoiceError {
    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    // --- Audio ---
    #[error("Audiofehler: {0}")]
    Audio(String),

    #[error("Codec-Fehler: {0}")]
    Codec(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl SkyvoiceError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler bei der Konstruktion entstand
    /// und ein erneuter Versuch mit anderer Konfiguration sinnvoll ist
    pub fn ist_konfigurationsfehler(&self) -> bool {
        matches!(self, Self::Konfiguration(_) | Self::Codec(_))
    }
}
