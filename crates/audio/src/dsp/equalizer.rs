//! Parametrischer Equalizer aus RBJ-Biquads
//!
//! Bildet den Frequenzgang eines Flugfunkgeraets nach: Hochpass gegen
//! Bassanteile, drei Anhebungen im Sprachband, Tiefpass oberhalb 2,5 kHz.

use super::AudioProcessor;
use crate::params::{SharedFlag, SharedGain};
use crate::provider::SampleProvider;

/// Biquad-Filter (Direktform I) nach dem Audio-EQ-Cookbook
#[derive(Debug, Clone)]
pub struct BiQuadFilter {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BiQuadFilter {
    fn aus_koeffizienten(a0: f32, a1: f32, a2: f32, b0: f32, b1: f32, b2: f32) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    fn omega(sample_rate: f32, frequency: f32, q: f32) -> (f32, f32) {
        let w0 = 2.0 * std::f32::consts::PI * frequency / sample_rate;
        let alpha = w0.sin() / (2.0 * q);
        (w0.cos(), alpha)
    }

    pub fn low_pass(sample_rate: f32, frequency: f32, q: f32) -> Self {
        let (cos, alpha) = Self::omega(sample_rate, frequency, q);
        Self::aus_koeffizienten(
            1.0 + alpha,
            -2.0 * cos,
            1.0 - alpha,
            (1.0 - cos) / 2.0,
            1.0 - cos,
            (1.0 - cos) / 2.0,
        )
    }

    pub fn high_pass(sample_rate: f32, frequency: f32, q: f32) -> Self {
        let (cos, alpha) = Self::omega(sample_rate, frequency, q);
        Self::aus_koeffizienten(
            1.0 + alpha,
            -2.0 * cos,
            1.0 - alpha,
            (1.0 + cos) / 2.0,
            -(1.0 + cos),
            (1.0 + cos) / 2.0,
        )
    }

    pub fn peaking(sample_rate: f32, frequency: f32, q: f32, gain_db: f32) -> Self {
        let (cos, alpha) = Self::omega(sample_rate, frequency, q);
        let a = 10.0f32.powf(gain_db / 40.0);
        Self::aus_koeffizienten(
            1.0 + alpha / a,
            -2.0 * cos,
            1.0 - alpha / a,
            1.0 + alpha * a,
            -2.0 * cos,
            1.0 - alpha * a,
        )
    }

    /// Filtert ein einzelnes Sample
    pub fn transform(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

/// Vorgefertigte Filterketten
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqualizerPreset {
    /// UKW-Flugfunk
    VhfEmulation,
}

impl EqualizerPreset {
    /// Baut die Filterkette fuer die gegebene Abtastrate
    pub fn filter(&self, sample_rate: u32) -> Vec<BiQuadFilter> {
        let sr = sample_rate.max(1) as f32;
        match self {
            EqualizerPreset::VhfEmulation => vec![
                BiQuadFilter::high_pass(sr, 310.0, 0.25),
                BiQuadFilter::peaking(sr, 450.0, 0.75, 17.0),
                BiQuadFilter::peaking(sr, 1450.0, 1.0, 25.0),
                BiQuadFilter::peaking(sr, 2000.0, 1.0, 25.0),
                BiQuadFilter::low_pass(sr, 2500.0, 0.25),
            ],
        }
    }
}

/// Filterkette als In-place-Prozessor
pub struct Equalizer {
    filter: Vec<BiQuadFilter>,
    enabled: bool,
}

impl Equalizer {
    pub fn new(preset: EqualizerPreset, sample_rate: u32) -> Self {
        Self {
            filter: preset.filter(sample_rate),
            enabled: true,
        }
    }

    pub fn filter_count(&self) -> usize {
        self.filter.len()
    }
}

impl AudioProcessor for Equalizer {
    fn process(&mut self, samples: &mut [f32]) {
        if !self.enabled {
            return;
        }
        for sample in samples.iter_mut() {
            let mut x = *sample;
            for f in self.filter.iter_mut() {
                x = f.transform(x);
            }
            *sample = x;
        }
    }

    fn reset(&mut self) {
        for f in self.filter.iter_mut() {
            f.reset();
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

/// Pull-Knoten: Equalizer mit Bypass und Ausgangsverstaerkung
///
/// Im Bypass wird die Quelle unveraendert und ohne Ausgangsverstaerkung
/// durchgereicht.
pub struct EqualizerSampleProvider<S> {
    quelle: S,
    equalizer: Equalizer,
    bypass: SharedFlag,
    output_gain: SharedGain,
}

impl<S: SampleProvider> EqualizerSampleProvider<S> {
    pub fn new(quelle: S, preset: EqualizerPreset, sample_rate: u32) -> Self {
        Self {
            quelle,
            equalizer: Equalizer::new(preset, sample_rate),
            bypass: SharedFlag::new(false),
            output_gain: SharedGain::new(1.0),
        }
    }

    pub fn bypass_handle(&self) -> SharedFlag {
        self.bypass.clone()
    }

    pub fn output_gain_handle(&self) -> SharedGain {
        self.output_gain.clone()
    }

    pub fn set_bypass_effects(&self, bypass: bool) {
        self.bypass.set(bypass);
    }

    pub fn bypass_effects(&self) -> bool {
        self.bypass.get()
    }

    pub fn set_output_gain(&self, gain: f32) {
        self.output_gain.set(gain);
    }

    pub fn output_gain(&self) -> f32 {
        self.output_gain.get()
    }
}

impl<S: SampleProvider> SampleProvider for EqualizerSampleProvider<S> {
    fn read_samples(&mut self, samples: &mut [f32]) -> usize {
        let n = self.quelle.read_samples(samples);

        let aktiv = !self.bypass.get();
        if aktiv != self.equalizer.is_enabled() {
            self.equalizer.set_enabled(aktiv);
            self.equalizer.reset();
        }
        if !aktiv {
            return n;
        }

        self.equalizer.process(&mut samples[..n]);
        let gain = self.output_gain.get();
        for s in &mut samples[..n] {
            *s *= gain;
        }
        n
    }
}
