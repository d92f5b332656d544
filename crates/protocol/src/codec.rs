//! Codec-Konfiguration fuer die Sprachuebertragung
//!
//! Definiert Opus-Konfigurationstypen und vordefinierte Presets. Das
//! Byte-Layout der komprimierten Frames gehoert dem Codec selbst; hier wird
//! nur beschrieben, mit welchen Parametern Encoder und Decoder arbeiten.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Opus-Konfiguration
// ---------------------------------------------------------------------------

/// Abtastrate fuer Opus
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleRate {
    /// 8 kHz – Schmalband (Telefon-Qualitaet)
    Hz8000 = 8000,
    /// 12 kHz – Mittelband
    Hz12000 = 12000,
    /// 16 kHz – Breitband
    Hz16000 = 16000,
    /// 24 kHz – Superbreitband
    Hz24000 = 24000,
    /// 48 kHz – Vollband, Standard im Sprechfunk-Netz
    #[default]
    Hz48000 = 48000,
}

impl SampleRate {
    /// Ermittelt die Opus-Abtastrate zu einer Frequenz in Hz
    pub fn from_hz(hz: u32) -> Option<Self> {
        match hz {
            8000 => Some(Self::Hz8000),
            12000 => Some(Self::Hz12000),
            16000 => Some(Self::Hz16000),
            24000 => Some(Self::Hz24000),
            48000 => Some(Self::Hz48000),
            _ => None,
        }
    }

    pub fn as_hz(&self) -> u32 {
        *self as u32
    }
}

/// Anzahl der Audio-Kanaele
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelCount {
    /// Mono (1 Kanal) – Sprechfunk ist immer mono
    #[default]
    Mono = 1,
    /// Stereo (2 Kanaele)
    Stereo = 2,
}

/// Opus-Anwendungsmodus
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpusApplication {
    /// Optimiert fuer Sprachverstaendlichkeit (VOIP)
    #[default]
    Voip,
    /// Optimiert fuer allgemeine Audio-Qualitaet
    Audio,
    /// Minimale Verarbeitungsverzoegerung
    RestrictedLowdelay,
}

/// Frame-Groesse in Millisekunden (als Zehntelmillisekunden kodiert)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameSizeMs {
    /// 10 ms
    Ms10 = 100,
    /// 20 ms – Standard im Sprechfunk-Netz
    #[default]
    Ms20 = 200,
    /// 40 ms
    Ms40 = 400,
    /// 60 ms
    Ms60 = 600,
}

impl FrameSizeMs {
    /// Gibt die Frame-Groesse als Millisekunden zurueck
    pub fn as_ms(&self) -> f32 {
        (*self as u32) as f32 / 10.0
    }

    /// Berechnet die Anzahl der Samples pro Frame bei gegebener Abtastrate
    pub fn samples_per_frame(&self, sample_rate: SampleRate) -> u32 {
        // ms_x10 / 10 * rate / 1000 = ms_x10 * rate / 10000
        (*self as u32) * (sample_rate as u32) / 10000
    }
}

/// Vollstaendige Opus-Codec-Konfiguration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpusConfig {
    /// Ziel-Bitrate in kbps (6–510)
    pub bitrate_kbps: u16,
    /// Abtastrate
    pub sample_rate: SampleRate,
    /// Anzahl der Kanaele
    pub channels: ChannelCount,
    /// Frame-Groesse
    pub frame_size: FrameSizeMs,
    /// Anwendungsmodus
    pub application: OpusApplication,
    /// Forward Error Correction aktivieren
    pub fec_enabled: bool,
    /// Komplexitaet (0–10)
    pub complexity: u8,
    /// Variable Bitrate aktivieren
    pub vbr_enabled: bool,
}

impl OpusConfig {
    /// Validiert die Konfiguration
    pub fn validieren(&self) -> Result<(), String> {
        if self.bitrate_kbps < 6 || self.bitrate_kbps > 510 {
            return Err(format!(
                "Bitrate muss zwischen 6 und 510 kbps liegen (war: {})",
                self.bitrate_kbps
            ));
        }
        if self.complexity > 10 {
            return Err(format!(
                "Komplexitaet muss zwischen 0 und 10 liegen (war: {})",
                self.complexity
            ));
        }
        Ok(())
    }

    /// Samples pro Frame (alle Kanaele)
    pub fn samples_per_frame(&self) -> usize {
        self.frame_size.samples_per_frame(self.sample_rate) as usize * self.channels as usize
    }
}

impl Default for OpusConfig {
    fn default() -> Self {
        AudioPreset::Radio.config()
    }
}

// ---------------------------------------------------------------------------
// Audio-Presets
// ---------------------------------------------------------------------------

/// Vordefinierte Codec-Konfigurationen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioPreset {
    /// Sprechfunk-Netz: 48 kHz mono, 20 ms, niedrige Bitrate
    Radio,
    /// Breitband-Sprache mit FEC
    Speech,
    /// Minimale Bandbreite
    LowBandwidth,
}

impl AudioPreset {
    /// Gibt die vordefinierte `OpusConfig` fuer dieses Preset zurueck
    pub fn config(&self) -> OpusConfig {
        match self {
            AudioPreset::Radio => OpusConfig {
                bitrate_kbps: 16,
                sample_rate: SampleRate::Hz48000,
                channels: ChannelCount::Mono,
                frame_size: FrameSizeMs::Ms20,
                application: OpusApplication::Voip,
                fec_enabled: false,
                complexity: 8,
                vbr_enabled: true,
            },
            AudioPreset::Speech => OpusConfig {
                bitrate_kbps: 32,
                sample_rate: SampleRate::Hz16000,
                channels: ChannelCount::Mono,
                frame_size: FrameSizeMs::Ms20,
                application: OpusApplication::Voip,
                fec_enabled: true,
                complexity: 8,
                vbr_enabled: true,
            },
            AudioPreset::LowBandwidth => OpusConfig {
                bitrate_kbps: 8,
                sample_rate: SampleRate::Hz8000,
                channels: ChannelCount::Mono,
                frame_size: FrameSizeMs::Ms40,
                application: OpusApplication::Voip,
                fec_enabled: false,
                complexity: 5,
                vbr_enabled: true,
            },
        }
    }

    /// Gibt den menschenlesbaren Namen des Presets zurueck
    pub fn bezeichnung(&self) -> &'static str {
        match self {
            AudioPreset::Radio => "Sprechfunk",
            AudioPreset::Speech => "Sprache",
            AudioPreset::LowBandwidth => "Niedrige Bandbreite",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radio_preset_ist_standard() {
        let config = OpusConfig::default();
        assert_eq!(config, AudioPreset::Radio.config());
        assert_eq!(config.sample_rate, SampleRate::Hz48000);
        assert_eq!(config.channels, ChannelCount::Mono);
        assert_eq!(config.samples_per_frame(), 960);
    }

    #[test]
    fn alle_presets_validierbar() {
        for preset in [AudioPreset::Radio, AudioPreset::Speech, AudioPreset::LowBandwidth] {
            assert!(
                preset.config().validieren().is_ok(),
                "Preset {:?} hat ungueltige Konfiguration",
                preset
            );
            assert!(!preset.bezeichnung().is_empty());
        }
    }

    #[test]
    fn opus_config_validierung_ungueltige_bitrate() {
        let mut config = AudioPreset::Speech.config();
        config.bitrate_kbps = 5;
        assert!(config.validieren().is_err());

        config.bitrate_kbps = 511;
        assert!(config.validieren().is_err());
    }

    #[test]
    fn opus_config_validierung_ungueltige_komplexitaet() {
        let mut config = AudioPreset::Radio.config();
        config.complexity = 11;
        assert!(config.validieren().is_err());
    }

    #[test]
    fn frame_size_samples_per_frame() {
        assert_eq!(FrameSizeMs::Ms20.samples_per_frame(SampleRate::Hz48000), 960);
        assert_eq!(FrameSizeMs::Ms10.samples_per_frame(SampleRate::Hz16000), 160);
        assert!((FrameSizeMs::Ms40.as_ms() - 40.0).abs() < f32::EPSILON);
    }

    #[test]
    fn sample_rate_aus_hz() {
        assert_eq!(SampleRate::from_hz(48000), Some(SampleRate::Hz48000));
        assert_eq!(SampleRate::from_hz(44100), None);
        assert_eq!(SampleRate::Hz16000.as_hz(), 16000);
    }

    #[test]
    fn opus_config_aus_toml() {
        let toml = r#"
            bitrate_kbps = 24
            sample_rate = "hz48000"
            channels = "mono"
            frame_size = "ms20"
            application = "voip"
            fec_enabled = true
            complexity = 6
            vbr_enabled = false
        "#;
        let config: OpusConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.bitrate_kbps, 24);
        assert!(config.fec_enabled);
        assert!(config.validieren().is_ok());
    }
}
