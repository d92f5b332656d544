//! Summierender Mixer fuer beliebig viele Pull-Quellen
//!
//! Fragt jede Quelle nach derselben Anzahl Samples und addiert
//! Sample-fuer-Sample. Fehlende Enden einer Quelle zaehlen als Stille.
//! Keine Normalisierung: nur das Endergebnis wird auf [-1, 1] begrenzt.

use crate::provider::SampleProvider;

/// Kennung eines Mixer-Eingangs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputId(u64);

struct MixerInput {
    id: InputId,
    quelle: Box<dyn SampleProvider>,
}

/// Mixer mit dynamisch hinzufuegbaren Eingaengen
pub struct MixingSampleProvider {
    eingaenge: Vec<MixerInput>,
    naechste_id: u64,
    /// Zwischenpuffer, waechst nur mit der Blockgroesse
    scratch: Vec<f32>,
}

impl MixingSampleProvider {
    pub fn new() -> Self {
        Self {
            eingaenge: Vec::new(),
            naechste_id: 0,
            scratch: Vec::new(),
        }
    }

    /// Haengt eine Quelle an und gibt ihre Kennung zurueck
    pub fn add_input(&mut self, quelle: Box<dyn SampleProvider>) -> InputId {
        let id = InputId(self.naechste_id);
        self.naechste_id += 1;
        self.eingaenge.push(MixerInput { id, quelle });
        id
    }

    /// Entfernt eine Quelle; false, wenn die Kennung unbekannt ist
    pub fn remove_input(&mut self, id: InputId) -> bool {
        let vorher = self.eingaenge.len();
        self.eingaenge.retain(|e| e.id != id);
        self.eingaenge.len() != vorher
    }

    pub fn input_count(&self) -> usize {
        self.eingaenge.len()
    }
}

impl Default for MixingSampleProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleProvider for MixingSampleProvider {
    /// Liefert immer `samples.len()` Samples
    fn read_samples(&mut self, samples: &mut [f32]) -> usize {
        let n = samples.len();
        samples.fill(0.0);
        if self.scratch.len() < n {
            self.scratch.resize(n, 0.0);
        }

        for eingang in self.eingaenge.iter_mut() {
            let puffer = &mut self.scratch[..n];
            let gelesen = eingang.quelle.read_samples(puffer).min(n);
            for (ziel, quelle) in samples.iter_mut().zip(&puffer[..gelesen]) {
                *ziel += *quelle;
            }
        }

        for s in samples.iter_mut() {
            *s = s.clamp(-1.0, 1.0);
        }
        n
    }
}
