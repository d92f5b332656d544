//! Player-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Player ohne Konfigurationsdatei
//! lauffaehig ist.

use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use skyvoice_audio::{DelayCacheConfig, EngineConfig};
use skyvoice_core::types::AudioFormat;
use skyvoice_protocol::codec::{AudioPreset, SampleRate};

/// Vollstaendige Player-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Audio-Pipeline
    pub audio: AudioEinstellungen,
    /// Adaptive Vorlauf-Verzoegerung
    pub delay: DelayCacheConfig,
    /// Empfaenger-Frequenzen
    pub receiver: ReceiverEinstellungen,
    /// Simulierte Sprecher
    pub simulation: SimulationEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Audio-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioEinstellungen {
    /// Ausgabe-Abtastrate in Hz (8000, 12000, 16000, 24000 oder 48000)
    pub sample_rate: u32,
    /// Blockgroesse des Audio-Callbacks in Millisekunden
    pub block_ms: u32,
    /// Leerlauf-Timeout nach dem letzten Paket in Millisekunden
    pub idle_timeout_ms: u64,
    /// Takt der Leerlauf-Ueberwachung in Millisekunden
    pub tick_ms: u64,
    /// Obergrenze des Sprecher-Puffers in Millisekunden
    pub max_buffered_ms: u32,
    /// Sprecher-Slots pro Empfaenger
    pub slots: usize,
    /// Funk-Effekte abschalten
    pub bypass_effects: bool,
    /// Ausfuehrliche Protokollierung von Zustandswechseln
    pub verbose: bool,
}

impl Default for AudioEinstellungen {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            block_ms: 10,
            idle_timeout_ms: 500,
            tick_ms: 100,
            max_buffered_ms: 10_000,
            slots: 4,
            bypass_effects: false,
            verbose: false,
        }
    }
}

/// Empfaenger-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverEinstellungen {
    /// Eine Frequenz pro Empfaenger in Hz
    pub frequenzen_hz: Vec<u32>,
}

impl Default for ReceiverEinstellungen {
    fn default() -> Self {
        Self {
            frequenzen_hz: vec![122_800_000],
        }
    }
}

/// Einstellungen der Sprecher-Simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationEinstellungen {
    /// Anzahl gleichzeitig simulierter Rufzeichen
    pub sprecher: u32,
    /// Sprechsequenzen pro Rufzeichen
    pub sequenzen: u32,
    /// Frames pro Sprechsequenz
    pub frames_pro_sequenz: u32,
    /// Maximale Abweichung der Paket-Ankunft in Millisekunden
    pub jitter_ms: u64,
    /// Pause zwischen zwei Sprechsequenzen in Millisekunden
    pub pause_ms: u64,
    /// Anteil verlorener Pakete (0..1)
    pub verlust_quote: f64,
    /// Entfernung relativ zur Reichweite (0..1)
    pub entfernung: f32,
    /// Codec-Preset der simulierten Sender
    pub preset: AudioPreset,
    /// Nachlauf nach dem letzten Sender in Millisekunden
    pub nachlauf_ms: u64,
    /// Seed fuer Jitter, Verluste und Atmosphaeren-Clips
    pub seed: u64,
    /// Metriken am Ende im Prometheus-Format ausgeben
    pub metriken_ausgeben: bool,
}

impl Default for SimulationEinstellungen {
    fn default() -> Self {
        Self {
            sprecher: 3,
            sequenzen: 3,
            frames_pro_sequenz: 50,
            jitter_ms: 15,
            pause_ms: 400,
            verlust_quote: 0.0,
            entfernung: 0.4,
            preset: AudioPreset::Radio,
            nachlauf_ms: 1000,
            seed: 0x5EED_A1F0,
            metriken_ausgeben: true,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl PlayerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Samples pro Audio-Block
    pub fn block_samples(&self) -> usize {
        AudioFormat::mono(self.audio.sample_rate).samples_for_ms(self.audio.block_ms)
    }

    /// Uebersetzt die Einstellungen in eine Engine-Konfiguration
    pub fn engine_config(&self) -> Result<EngineConfig> {
        if SampleRate::from_hz(self.audio.sample_rate).is_none() {
            bail!(
                "Abtastrate {} Hz wird vom Decoder nicht unterstuetzt",
                self.audio.sample_rate
            );
        }
        if self.audio.block_ms == 0 {
            bail!("block_ms muss groesser als 0 sein");
        }
        if !(0.0..=1.0).contains(&self.simulation.verlust_quote) {
            bail!("verlust_quote muss zwischen 0 und 1 liegen");
        }

        let config = EngineConfig {
            format: AudioFormat::mono(self.audio.sample_rate),
            frequencies: self.receiver.frequenzen_hz.clone(),
            slots_per_receiver: self.audio.slots,
            idle_timeout: Duration::from_millis(self.audio.idle_timeout_ms),
            tick_interval: Duration::from_millis(self.audio.tick_ms),
            max_buffered_ms: self.audio.max_buffered_ms,
            bypass_effects: self.audio.bypass_effects,
            verbose: self.audio.verbose,
            delay: self.delay,
            samples_seed: self.simulation.seed,
            ..Default::default()
        };
        config.validieren()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = PlayerConfig::default();
        assert_eq!(cfg.audio.sample_rate, 48000);
        assert_eq!(cfg.receiver.frequenzen_hz, vec![122_800_000]);
        assert_eq!(cfg.delay.default_ms, 60);
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.engine_config().is_ok());
    }

    #[test]
    fn block_groesse() {
        let cfg = PlayerConfig::default();
        assert_eq!(cfg.block_samples(), 480);
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [audio]
            sample_rate = 16000
            bypass_effects = true

            [delay]
            max_ms = 200

            [receiver]
            frequenzen_hz = [118700000, 5680000]

            [simulation]
            sprecher = 2
            preset = "speech"
        "#;
        let cfg: PlayerConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.audio.sample_rate, 16000);
        assert!(cfg.audio.bypass_effects);
        assert_eq!(cfg.delay.max_ms, 200);
        assert_eq!(cfg.receiver.frequenzen_hz.len(), 2);
        assert_eq!(cfg.simulation.sprecher, 2);
        assert_eq!(cfg.simulation.preset, AudioPreset::Speech);
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.audio.slots, 4);
        assert_eq!(cfg.delay.min_ms, 40);

        let engine = cfg.engine_config().unwrap();
        assert_eq!(engine.format.sample_rate, 16000);
        assert_eq!(engine.frequencies, vec![118_700_000, 5_680_000]);
    }

    #[test]
    fn ungueltige_abtastrate_wird_abgelehnt() {
        let mut cfg = PlayerConfig::default();
        cfg.audio.sample_rate = 44100;
        assert!(cfg.engine_config().is_err());
    }

    #[test]
    fn leere_frequenzliste_wird_abgelehnt() {
        let mut cfg = PlayerConfig::default();
        cfg.receiver.frequenzen_hz.clear();
        assert!(cfg.engine_config().is_err());
    }

    #[test]
    fn fehlende_datei_liefert_standardwerte() {
        let cfg = PlayerConfig::laden("/nicht/vorhanden/skyvoice.toml").unwrap();
        assert_eq!(cfg.audio.block_ms, 10);
    }
}
