//! Gepufferter PCM-Provider (Ringpuffer)
//!
//! Der Steuer-Thread schiebt dekodierte Samples hinein, der Audio-Thread
//! zieht sie heraus. Der Lock wird nur fuer die Kopie gehalten. Bei
//! Ueberlauf werden die aeltesten Samples ueberschrieben.

use std::sync::Arc;

use parking_lot::Mutex;
use ringbuf::{
    traits::{Consumer, Observer, RingBuffer},
    HeapRb,
};
use tracing::warn;

use crate::provider::SampleProvider;
use skyvoice_core::types::AudioFormat;

/// Standard-Obergrenze des Puffers in Millisekunden
pub const STANDARD_MAX_PUFFER_MS: u32 = 10_000;

struct PufferInnen {
    rb: HeapRb<f32>,
    verworfen: u64,
}

/// Begrenzte Sample-Queue mit Handle-Semantik
///
/// Klone teilen sich denselben Puffer. So kann der Sprecher-Provider
/// schreiben, waehrend ein Klon als Mixer-Eingang gelesen wird.
#[derive(Clone)]
pub struct BufferedWaveProvider {
    innen: Arc<Mutex<PufferInnen>>,
    format: AudioFormat,
    kapazitaet: usize,
}

impl BufferedWaveProvider {
    /// Erstellt einen Puffer mit Platz fuer `max_buffered_ms` Audio
    pub fn new(format: AudioFormat, max_buffered_ms: u32) -> Self {
        let kapazitaet = format.samples_for_ms(max_buffered_ms).max(1);
        Self {
            innen: Arc::new(Mutex::new(PufferInnen {
                rb: HeapRb::new(kapazitaet),
                verworfen: 0,
            })),
            format,
            kapazitaet,
        }
    }

    /// Haengt Samples an; bei Ueberlauf fallen die aeltesten heraus
    pub fn add_samples(&self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }

        let mut innen = self.innen.lock();
        let frei = innen.rb.vacant_len();
        if samples.len() > frei {
            let verworfen = (samples.len() - frei) as u64;
            innen.verworfen += verworfen;
            warn!(verworfen, "Sample-Puffer uebergelaufen, aelteste Samples verworfen");
        }

        // Mehr als die Kapazitaet: nur das Ende ist relevant
        let start = samples.len().saturating_sub(self.kapazitaet);
        innen.rb.push_slice_overwrite(&samples[start..]);
    }

    /// Haengt `count` Null-Samples an (Vorlauf-Verzoegerung)
    pub fn add_silence(&self, count: usize) {
        const BLOCK: [f32; 256] = [0.0; 256];
        let mut rest = count;
        while rest > 0 {
            let n = rest.min(BLOCK.len());
            self.add_samples(&BLOCK[..n]);
            rest -= n;
        }
    }

    /// Liest bis zu `out.len()` Samples, den Rest fuellt Stille
    ///
    /// Gibt die Anzahl tatsaechlich gepufferter Samples zurueck. Blockiert nie
    /// laenger als fuer die Kopie.
    pub fn read(&self, out: &mut [f32]) -> usize {
        let gelesen = self.innen.lock().rb.pop_slice(out);
        out[gelesen..].fill(0.0);
        gelesen
    }

    pub fn buffered_sample_count(&self) -> usize {
        self.innen.lock().rb.occupied_len()
    }

    /// Gepufferte Bytes (4 Bytes pro f32-Sample)
    pub fn buffered_bytes(&self) -> usize {
        self.buffered_sample_count() * std::mem::size_of::<f32>()
    }

    pub fn is_empty(&self) -> bool {
        self.buffered_sample_count() == 0
    }

    /// Verwirft alle gepufferten Samples
    pub fn clear(&self) {
        self.innen.lock().rb.clear();
    }

    /// Anzahl seit Erstellung durch Ueberlauf verworfener Samples
    pub fn dropped_samples(&self) -> u64 {
        self.innen.lock().verworfen
    }

    pub fn capacity(&self) -> usize {
        self.kapazitaet
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }
}

impl std::fmt::Debug for BufferedWaveProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedWaveProvider")
            .field("kapazitaet", &self.kapazitaet)
            .field("gepuffert", &self.buffered_sample_count())
            .finish()
    }
}

impl SampleProvider for BufferedWaveProvider {
    /// Liefert immer `samples.len()` (mit Stille aufgefuellt)
    fn read_samples(&mut self, samples: &mut [f32]) -> usize {
        self.read(samples);
        samples.len()
    }
}
