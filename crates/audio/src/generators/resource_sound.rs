//! Abspielen eines im Speicher liegenden Clips (optional in Schleife)

use std::sync::Arc;

use crate::params::SharedGain;
use crate::provider::SampleProvider;

/// Spielt einen PCM-Clip ab, skaliert mit einer geteilten Verstaerkung
///
/// Auch bei Verstaerkung 0 laeuft der Cursor weiter, damit der Clip beim
/// Wiedereinblenden nicht immer an derselben Stelle startet.
pub struct ResourceSoundSampleProvider {
    clip: Arc<[f32]>,
    position: usize,
    looping: bool,
    gain: SharedGain,
}

impl ResourceSoundSampleProvider {
    pub fn new(clip: Arc<[f32]>, looping: bool) -> Self {
        Self {
            clip,
            position: 0,
            looping,
            gain: SharedGain::new(1.0),
        }
    }

    /// Handle, ueber das die Verstaerkung spaeter gesetzt wird
    pub fn gain_handle(&self) -> SharedGain {
        self.gain.clone()
    }

    pub fn set_gain(&self, gain: f32) {
        self.gain.set(gain);
    }

    pub fn gain(&self) -> f32 {
        self.gain.get()
    }

    pub fn looping(&self) -> bool {
        self.looping
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Nicht-schleifender Clip ist zu Ende gespielt
    pub fn is_finished(&self) -> bool {
        !self.looping && self.position >= self.clip.len()
    }
}

impl SampleProvider for ResourceSoundSampleProvider {
    fn read_samples(&mut self, samples: &mut [f32]) -> usize {
        let laenge = self.clip.len();
        if laenge == 0 {
            samples.fill(0.0);
            return if self.looping { samples.len() } else { 0 };
        }

        let mut geschrieben = 0;
        while geschrieben < samples.len() {
            if self.position >= laenge {
                if !self.looping {
                    break;
                }
                self.position = 0;
            }
            let n = (samples.len() - geschrieben).min(laenge - self.position);
            samples[geschrieben..geschrieben + n]
                .copy_from_slice(&self.clip[self.position..self.position + n]);
            self.position += n;
            geschrieben += n;
        }

        let gain = self.gain.get();
        if gain != 1.0 {
            for s in &mut samples[..geschrieben] {
                *s *= gain;
            }
        }
        samples[geschrieben..].fill(0.0);
        geschrieben
    }
}
