//! Saegezahn-Generator fuer das Brummen des Bordnetzes

use crate::params::SharedGain;
use crate::provider::SampleProvider;
use skyvoice_core::types::AudioFormat;

/// Frequenz des Bordnetz-Brummens in Hz
pub const BORDNETZ_FREQUENZ_HZ: f32 = 400.0;

/// Periodischer Saegezahn von -1 bis 1
pub struct SawtoothGenerator {
    /// Phase in [0, 2)
    phase: f32,
    schritt: f32,
    frequency: f32,
    gain: SharedGain,
}

impl SawtoothGenerator {
    pub fn new(format: AudioFormat, frequency: f32) -> Self {
        let sample_rate = format.sample_rate.max(1) as f32;
        Self {
            phase: 0.0,
            schritt: 2.0 * frequency / sample_rate,
            frequency,
            gain: SharedGain::new(1.0),
        }
    }

    pub fn gain_handle(&self) -> SharedGain {
        self.gain.clone()
    }

    pub fn set_gain(&self, gain: f32) {
        self.gain.set(gain);
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }
}

impl SampleProvider for SawtoothGenerator {
    fn read_samples(&mut self, samples: &mut [f32]) -> usize {
        let gain = self.gain.get();
        for s in samples.iter_mut() {
            *s = (self.phase - 1.0) * gain;
            self.phase += self.schritt;
            if self.phase >= 2.0 {
                self.phase -= 2.0;
            }
        }
        samples.len()
    }
}
