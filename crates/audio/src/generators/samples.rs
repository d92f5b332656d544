//! Clip-Bank fuer die Funk-Atmosphaere
//!
//! Die Clips werden deterministisch aus einem festen Seed synthetisiert,
//! damit kein Audio-Asset mitgeliefert werden muss. Alternativ lassen sie
//! sich aus fertigen PCM-Daten uebernehmen.

use std::sync::Arc;

use rand::{rngs::StdRng, Rng, SeedableRng};

use skyvoice_core::types::AudioFormat;

/// Standard-Seed fuer die Synthese
pub const STANDARD_SEED: u64 = 0x5EED_A1F0;

/// Laenge eines synthetisierten Clips in Millisekunden
const CLIP_MS: u32 = 2_000;

/// Die drei Atmosphaeren-Clips, geteilt zwischen allen Sprecher-Slots
#[derive(Debug, Clone)]
pub struct Samples {
    crackle: Arc<[f32]>,
    white_noise: Arc<[f32]>,
    hf_white_noise: Arc<[f32]>,
}

impl Samples {
    /// Synthetisiert alle Clips aus dem Seed
    pub fn synthesize(format: AudioFormat, seed: u64) -> Self {
        let laenge = format.samples_for_ms(CLIP_MS).max(1);
        let mut rng = StdRng::seed_from_u64(seed);

        Self {
            crackle: Arc::from(knistern(&mut rng, laenge)),
            white_noise: Arc::from(weisses_rauschen(&mut rng, laenge)),
            hf_white_noise: Arc::from(kurzwellen_rauschen(&mut rng, laenge, format)),
        }
    }

    /// Uebernimmt fertige PCM-Clips
    pub fn from_pcm(crackle: Vec<f32>, white_noise: Vec<f32>, hf_white_noise: Vec<f32>) -> Self {
        Self {
            crackle: Arc::from(crackle),
            white_noise: Arc::from(white_noise),
            hf_white_noise: Arc::from(hf_white_noise),
        }
    }

    pub fn crackle(&self) -> Arc<[f32]> {
        Arc::clone(&self.crackle)
    }

    pub fn white_noise(&self) -> Arc<[f32]> {
        Arc::clone(&self.white_noise)
    }

    pub fn hf_white_noise(&self) -> Arc<[f32]> {
        Arc::clone(&self.hf_white_noise)
    }
}

impl Default for Samples {
    fn default() -> Self {
        Self::synthesize(AudioFormat::default(), STANDARD_SEED)
    }
}

/// Gleichverteiltes Rauschen in [-1, 1)
fn weisses_rauschen(rng: &mut StdRng, laenge: usize) -> Vec<f32> {
    (0..laenge).map(|_| rng.gen_range(-1.0f32..1.0)).collect()
}

/// Vereinzelte, schnell abklingende Impulse (statisches Knistern)
fn knistern(rng: &mut StdRng, laenge: usize) -> Vec<f32> {
    let mut clip = vec![0.0f32; laenge];
    let mut huelle = 0.0f32;
    let mut vorzeichen = 1.0f32;

    for s in clip.iter_mut() {
        // Im Mittel ein Impuls pro ~400 Samples
        if rng.gen_ratio(1, 400) {
            huelle = rng.gen_range(0.3f32..1.0);
            vorzeichen = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        }
        *s = vorzeichen * huelle * rng.gen_range(0.5f32..1.0);
        huelle *= 0.92;
    }
    clip
}

/// Tiefpass-gefiltertes Rauschen mit langsamem Schwund (Fading)
fn kurzwellen_rauschen(rng: &mut StdRng, laenge: usize, format: AudioFormat) -> Vec<f32> {
    let sample_rate = format.sample_rate.max(1) as f32;
    let fading_hz = 0.7f32;
    let mut gefiltert = 0.0f32;

    (0..laenge)
        .map(|i| {
            let roh = rng.gen_range(-1.0f32..1.0);
            gefiltert += 0.35 * (roh - gefiltert);
            let phase = 2.0 * std::f32::consts::PI * fading_hz * i as f32 / sample_rate;
            let fading = 0.75 + 0.25 * phase.sin();
            (gefiltert * 1.6 * fading).clamp(-1.0, 1.0)
        })
        .collect()
}
