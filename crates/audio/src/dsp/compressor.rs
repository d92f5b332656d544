//! Dynamik-Kompressor mit Huellkurvenfolger
//!
//! Vereinheitlicht die Lautstaerke der Sprecher, bevor der Equalizer die
//! Funk-Faerbung aufbringt. Attack/Release glaetten die Pegelreduktion in
//! der dB-Domaene.

use super::{db_zu_linear, linear_zu_db, AudioProcessor};
use crate::params::SharedFlag;
use crate::provider::SampleProvider;

/// Verhindert log10(0) und Denormals in der Huellkurve
const DC_OFFSET: f32 = 1.0e-25;

/// Kompressor-Prozessor (mono)
pub struct SimpleCompressor {
    threshold_db: f32,
    ratio: f32,
    make_up_gain_db: f32,
    attack_coeff: f32,
    release_coeff: f32,
    /// Huellkurve der Ueberschreitung in dB
    huelle_db: f32,
    enabled: bool,
}

impl SimpleCompressor {
    /// Kompressor mit Schwelle -16 dBFS, Ratio 6:1, Attack 5 ms, Release 10 ms
    pub fn new(sample_rate: u32) -> Self {
        Self::with_params(sample_rate, -16.0, 6.0, 5.0, 10.0)
    }

    pub fn with_params(
        sample_rate: u32,
        threshold_db: f32,
        ratio: f32,
        attack_ms: f32,
        release_ms: f32,
    ) -> Self {
        let sample_rate = sample_rate.max(1) as f32;
        Self {
            threshold_db,
            ratio: ratio.max(1.0),
            make_up_gain_db: 0.0,
            attack_coeff: zeit_zu_koeffizient(attack_ms, sample_rate),
            release_coeff: zeit_zu_koeffizient(release_ms, sample_rate),
            huelle_db: DC_OFFSET,
            enabled: true,
        }
    }

    pub fn set_make_up_gain(&mut self, db: f32) {
        self.make_up_gain_db = db;
    }

    pub fn make_up_gain(&self) -> f32 {
        self.make_up_gain_db
    }

    pub fn threshold(&self) -> f32 {
        self.threshold_db
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }
}

/// exp(-1000 / (ms * sr)): Glaettungskoeffizient pro Sample
fn zeit_zu_koeffizient(ms: f32, sample_rate: f32) -> f32 {
    if ms <= 0.0 {
        return 0.0;
    }
    (-1000.0 / (ms * sample_rate)).exp()
}

impl AudioProcessor for SimpleCompressor {
    fn process(&mut self, samples: &mut [f32]) {
        if !self.enabled {
            return;
        }

        let reduktion_pro_db = 1.0 - 1.0 / self.ratio;
        for sample in samples.iter_mut() {
            let pegel_db = linear_zu_db(sample.abs() + DC_OFFSET);
            let ueber_db = (pegel_db - self.threshold_db).max(0.0) + DC_OFFSET;

            let koeff = if ueber_db > self.huelle_db {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            self.huelle_db = ueber_db + koeff * (self.huelle_db - ueber_db);

            let reduktion_db = (self.huelle_db - DC_OFFSET) * reduktion_pro_db;
            *sample *= db_zu_linear(self.make_up_gain_db - reduktion_db);
        }
    }

    fn reset(&mut self) {
        self.huelle_db = DC_OFFSET;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

/// Pull-Knoten: Kompressor hinter einer Quelle
///
/// Der Schalter liegt in einem geteilten Handle, damit der Sprecher-Provider
/// ihn setzen kann, nachdem der Knoten im Mixer steckt.
pub struct SimpleCompressorEffect<S> {
    quelle: S,
    kompressor: SimpleCompressor,
    enabled: SharedFlag,
}

impl<S: SampleProvider> SimpleCompressorEffect<S> {
    pub fn new(quelle: S, sample_rate: u32) -> Self {
        Self {
            quelle,
            kompressor: SimpleCompressor::new(sample_rate),
            enabled: SharedFlag::new(true),
        }
    }

    pub fn set_make_up_gain(&mut self, db: f32) {
        self.kompressor.set_make_up_gain(db);
    }

    pub fn enabled_handle(&self) -> SharedFlag {
        self.enabled.clone()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    pub fn compressor(&self) -> &SimpleCompressor {
        &self.kompressor
    }
}

impl<S: SampleProvider> SampleProvider for SimpleCompressorEffect<S> {
    fn read_samples(&mut self, samples: &mut [f32]) -> usize {
        let n = self.quelle.read_samples(samples);

        let aktiv = self.enabled.get();
        if aktiv != self.kompressor.is_enabled() {
            self.kompressor.set_enabled(aktiv);
            self.kompressor.reset();
        }
        self.kompressor.process(&mut samples[..n]);
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Konstant(f32);

    impl SampleProvider for Konstant {
        fn read_samples(&mut self, samples: &mut [f32]) -> usize {
            samples.fill(self.0);
            samples.len()
        }
    }

    #[test]
    fn deaktiviert_ist_durchreichen() {
        let mut effekt = SimpleCompressorEffect::new(Konstant(0.9), 48000);
        effekt.set_make_up_gain(-5.5);
        effekt.set_enabled(false);
        let mut out = [0.0f32; 32];
        assert_eq!(effekt.read_samples(&mut out), 32);
        assert!(out.iter().all(|&s| s == 0.9));
    }

    #[test]
    fn leise_signale_nur_make_up() {
        let mut komp = SimpleCompressor::new(48000);
        komp.set_make_up_gain(-6.0);
        // 0.01 entspricht -40 dBFS, weit unter der Schwelle
        let mut buf = vec![0.01f32; 256];
        komp.process(&mut buf);
        let erwartet = 0.01 * db_zu_linear(-6.0);
        assert!((buf[255] - erwartet).abs() < 1e-4);
    }

    #[test]
    fn laute_signale_werden_reduziert() {
        let mut komp = SimpleCompressor::new(48000);
        // 1.0 liegt 16 dB ueber der Schwelle: eingeschwungen -16 * 5/6 dB
        let mut buf = vec![1.0f32; 48000];
        komp.process(&mut buf);
        let erwartet = db_zu_linear(-16.0 * (5.0 / 6.0));
        assert!((buf[47999] - erwartet).abs() < 0.01);
        assert!(buf[47999] < buf[0]);
    }

    #[test]
    fn knoten_liefert_anzahl_der_quelle() {
        let mut effekt = SimpleCompressorEffect::new(Konstant(0.2), 48000);
        let mut out = [0.0f32; 100];
        assert_eq!(effekt.read_samples(&mut out), 100);
        assert!(out.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn koeffizienten() {
        assert_eq!(zeit_zu_koeffizient(0.0, 48000.0), 0.0);
        let k = zeit_zu_koeffizient(5.0, 48000.0);
        assert!(k > 0.99 && k < 1.0);
    }
}
