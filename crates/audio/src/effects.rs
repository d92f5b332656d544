//! Auswahl der Effekt-Parameter eines Sprechers
//!
//! Reine Funktion von Band, Entfernung, Bypass und Belegung. Der
//! Sprecher-Provider ruft sie bei jedem Paket, bei Aktivierung, beim
//! Umschalten des Bypass und beim Leerlauf auf.

use crate::params::HF_GRENZE_HZ;

/// Verstaerkung des weissen Rauschens auf UKW
pub const WHITE_NOISE_GAIN: f32 = 0.15;
/// Verstaerkung des Kurzwellen-Rauschens
pub const HF_WHITE_NOISE_GAIN: f32 = 0.6;
/// Verstaerkung des Bordnetz-Brummens
pub const AC_BUS_GAIN: f32 = 0.003;
/// Zusaetzliches Brummen auf Kurzwelle
pub const AC_BUS_HF_ZUSATZ: f32 = 0.001;
/// Ausgangsverstaerkung des Equalizers auf Kurzwelle
pub const HF_EQ_OUTPUT_GAIN: f32 = 0.38;
/// Obergrenze des Knister-Faktors
pub const CRACKLE_MAX: f32 = 0.20;

/// Eingaben der Auswahl
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectInputs {
    /// Globaler Bypass oder erzwungene Stummschaltung
    pub bypass: bool,
    pub in_use: bool,
    pub frequency_hz: u32,
    /// Entfernung relativ zur Reichweite (0..1)
    pub distance_ratio: f32,
}

/// Ergebnis der Auswahl
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectParameters {
    pub crackle_gain: f32,
    pub white_noise_gain: f32,
    pub hf_white_noise_gain: f32,
    pub ac_bus_gain: f32,
    pub compressor_enabled: bool,
    pub equalizer_bypass: bool,
    pub equalizer_output_gain: f32,
}

impl EffectParameters {
    /// Alles stumm, Kompressor aus, Equalizer im Bypass
    pub const fn stumm() -> Self {
        Self {
            crackle_gain: 0.0,
            white_noise_gain: 0.0,
            hf_white_noise_gain: 0.0,
            ac_bus_gain: 0.0,
            compressor_enabled: false,
            equalizer_bypass: true,
            equalizer_output_gain: 1.0,
        }
    }
}

/// Knister-Faktor in Abhaengigkeit der Entfernung
///
/// `exp(r) * r^-4 / 350 - 0.00776652`, begrenzt auf [0, 0.2]. Nicht
/// endliche Zwischenwerte (r = 0, NaN) ergeben das Maximum.
pub fn crackle_factor(distance_ratio: f32) -> f32 {
    let r = distance_ratio as f64;
    let roh = r.exp() * r.powi(-4) / 350.0 - 0.007_766_52;
    if !roh.is_finite() {
        return CRACKLE_MAX;
    }
    (roh as f32).clamp(0.0, CRACKLE_MAX)
}

/// Berechnet die Parameter aus den Eingaben
pub fn select_effects(eingaben: EffectInputs) -> EffectParameters {
    if eingaben.bypass || !eingaben.in_use {
        return EffectParameters::stumm();
    }

    if eingaben.frequency_hz < HF_GRENZE_HZ {
        return EffectParameters {
            crackle_gain: 0.0,
            white_noise_gain: 0.0,
            hf_white_noise_gain: HF_WHITE_NOISE_GAIN,
            ac_bus_gain: AC_BUS_GAIN + AC_BUS_HF_ZUSATZ,
            compressor_enabled: true,
            equalizer_bypass: false,
            equalizer_output_gain: HF_EQ_OUTPUT_GAIN,
        };
    }

    let crackle = crackle_factor(eingaben.distance_ratio);
    EffectParameters {
        crackle_gain: 2.0 * crackle,
        white_noise_gain: WHITE_NOISE_GAIN,
        hf_white_noise_gain: 0.0,
        ac_bus_gain: AC_BUS_GAIN,
        compressor_enabled: true,
        equalizer_bypass: false,
        equalizer_output_gain: 1.0 - 3.7 * crackle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vhf(distance_ratio: f32) -> EffectInputs {
        EffectInputs {
            bypass: false,
            in_use: true,
            frequency_hz: 122_800_000,
            distance_ratio,
        }
    }

    #[test]
    fn knister_bleibt_im_bereich() {
        let mut r = -2.0f32;
        while r <= 2.0 {
            let c = crackle_factor(r);
            assert!((0.0..=CRACKLE_MAX).contains(&c), "r={} c={}", r, c);
            r += 0.01;
        }
        for r in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY, 0.0, -0.0] {
            let c = crackle_factor(r);
            assert!((0.0..=CRACKLE_MAX).contains(&c), "r={} c={}", r, c);
        }
    }

    #[test]
    fn knister_verlauf() {
        // Nahe am Sender kein Knistern, an der Reichweitengrenze maximal
        assert_eq!(crackle_factor(0.1), CRACKLE_MAX);
        assert_eq!(crackle_factor(f32::NAN), CRACKLE_MAX);
        assert_eq!(crackle_factor(1.0), 0.0);
        let mitte = crackle_factor(0.5);
        assert!(mitte > 0.0 && mitte < CRACKLE_MAX);
    }

    #[test]
    fn bypass_und_leerlauf_sind_stumm() {
        let mut e = vhf(0.5);
        e.bypass = true;
        assert_eq!(select_effects(e), EffectParameters::stumm());

        let mut e = vhf(0.5);
        e.in_use = false;
        assert_eq!(select_effects(e), EffectParameters::stumm());
    }

    #[test]
    fn kurzwelle() {
        let mut e = vhf(0.5);
        e.frequency_hz = 8_891_000;
        let p = select_effects(e);
        assert_eq!(p.hf_white_noise_gain, 0.6);
        assert!((p.ac_bus_gain - 0.004).abs() < 1e-7);
        assert_eq!(p.crackle_gain, 0.0);
        assert_eq!(p.white_noise_gain, 0.0);
        assert!(p.compressor_enabled);
        assert!(!p.equalizer_bypass);
        assert_eq!(p.equalizer_output_gain, 0.38);
    }

    #[test]
    fn ukw_haengt_von_entfernung_ab() {
        let p = select_effects(vhf(0.5));
        let c = crackle_factor(0.5);
        assert!((p.crackle_gain - 2.0 * c).abs() < 1e-6);
        assert!((p.equalizer_output_gain - (1.0 - 3.7 * c)).abs() < 1e-6);
        assert_eq!(p.white_noise_gain, 0.15);
        assert_eq!(p.ac_bus_gain, 0.003);
        assert_eq!(p.hf_white_noise_gain, 0.0);

        let fern = select_effects(vhf(0.1));
        assert!((fern.equalizer_output_gain - (1.0 - 3.7 * 0.2)).abs() < 1e-6);
    }
}
