//! DSP-Module fuer die Funk-Emulation
//!
//! Die eigentlichen Prozessoren (`SimpleCompressor`, `Equalizer`)
//! implementieren das `AudioProcessor` Trait und arbeiten in-place. Die
//! Knoten `SimpleCompressorEffect` und `EqualizerSampleProvider` haengen sie
//! als Pull-Stufe hinter eine vorgelagerte Quelle.

pub mod compressor;
pub mod equalizer;

pub use compressor::{SimpleCompressor, SimpleCompressorEffect};
pub use equalizer::{BiQuadFilter, Equalizer, EqualizerPreset, EqualizerSampleProvider};

/// Gemeinsames Trait fuer alle Audio-Prozessoren
///
/// Alle DSP-Bausteine verarbeiten Samples in-place und sind
/// Send + Sync fuer Thread-sichere Pipeline-Nutzung.
pub trait AudioProcessor: Send + Sync {
    /// Verarbeitet einen Puffer von Samples in-place
    fn process(&mut self, samples: &mut [f32]);

    /// Setzt den internen Zustand zurueck (z.B. Filter-Historie)
    fn reset(&mut self);

    /// Gibt zurueck ob der Prozessor aktiv ist
    fn is_enabled(&self) -> bool;

    /// Aktiviert oder deaktiviert den Prozessor
    fn set_enabled(&mut self, enabled: bool);
}

/// Dezibel in linearen Faktor
pub(crate) fn db_zu_linear(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

/// Linearer Faktor in Dezibel
pub(crate) fn linear_zu_db(linear: f32) -> f32 {
    20.0 * linear.log10()
}
