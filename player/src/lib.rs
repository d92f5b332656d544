//! skyvoice-player – Bibliotheks-Root
//!
//! Baut die Voice-Engine aus der Konfiguration, laesst simulierte Sender
//! gegen sie laufen und zieht dabei im Takt des Audio-Callbacks Bloecke aus
//! der Pipeline.

pub mod config;
pub mod simulation;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::Serialize;
use skyvoice_audio::{AudioStats, VoiceEngine};
use skyvoice_observability::VoiceMetrics;
use tokio::sync::watch;
use tracing::{info, warn};

use config::PlayerConfig;
use simulation::{sprecher_ausfuehren, SprecherPlan};

/// Pegel am Ausgang der Pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Ausgangspegel {
    pub bloecke: u64,
    pub samples: u64,
    pub spitze: f32,
    pub rms: f32,
}

/// Ergebnis eines Simulationslaufs
#[derive(Debug, Clone, Serialize)]
pub struct Bericht {
    pub stats: AudioStats,
    pub ausgang: Ausgangspegel,
    pub gesendet: u64,
    pub verloren: u64,
    /// Verzoegerung pro Rufzeichen am Ende des Laufs
    pub verzoegerungen: Vec<(String, u32)>,
}

/// Haelt Konfiguration, Engine und Metriken zusammen
pub struct Player {
    pub config: PlayerConfig,
    engine: Arc<VoiceEngine>,
    metriken: VoiceMetrics,
}

impl Player {
    /// Erstellt Engine und Metrik-Registry aus der Konfiguration
    pub fn neu(config: PlayerConfig) -> Result<Self> {
        let engine = VoiceEngine::new(config.engine_config()?)?;
        let metriken = VoiceMetrics::neu()?;
        Ok(Self {
            config,
            engine: Arc::new(engine),
            metriken,
        })
    }

    pub fn engine(&self) -> &Arc<VoiceEngine> {
        &self.engine
    }

    pub fn metriken(&self) -> &VoiceMetrics {
        &self.metriken
    }

    /// Spielt die Simulation ab und liefert den Bericht
    ///
    /// Reihenfolge:
    /// 1. Audio-Callback als Task im Block-Takt starten
    /// 2. Einen Task pro simuliertem Sender starten
    /// 3. Auf alle Sender warten, Nachlauf abspielen
    /// 4. Audio-Task beenden, Zaehler in die Metriken uebernehmen
    pub async fn starten(&self) -> Result<Bericht> {
        let plaene = SprecherPlan::alle(&self.config.simulation, &self.config.receiver.frequenzen_hz);
        info!(
            sender = plaene.len(),
            empfaenger = self.config.receiver.frequenzen_hz.len(),
            sample_rate = self.config.audio.sample_rate,
            "Simulation startet"
        );

        let (stop_tx, stop_rx) = watch::channel(false);
        let audio_task = tokio::spawn(audio_callback(
            Arc::clone(&self.engine),
            self.config.block_samples(),
            Duration::from_millis(self.config.audio.block_ms as u64),
            stop_rx,
        ));

        let sender: Vec<_> = plaene
            .into_iter()
            .map(|plan| tokio::spawn(sprecher_ausfuehren(Arc::clone(&self.engine), plan)))
            .collect();

        let mut gesendet = 0;
        let mut verloren = 0;
        for task in sender {
            match task.await {
                Ok(Ok(bericht)) => {
                    gesendet += bericht.gesendet;
                    verloren += bericht.verloren;
                }
                Ok(Err(e)) => warn!(fehler = %e, "Sender abgebrochen"),
                Err(e) => warn!(fehler = %e, "Sender-Task abgestuerzt"),
            }
        }

        tokio::time::sleep(Duration::from_millis(self.config.simulation.nachlauf_ms)).await;
        let _ = stop_tx.send(true);
        let ausgang = audio_task
            .await
            .map_err(|e| anyhow!("Audio-Task abgestuerzt: {e}"))?;

        self.engine.sync()?;
        let stats = self.engine.stats();
        self.metriken_aktualisieren(&stats);

        let verzoegerungen = self
            .engine
            .delay_cache()
            .alle()
            .into_iter()
            .map(|(cs, record)| (cs.to_string(), record.delay_ms))
            .collect();

        info!(
            underflows = stats.underflows,
            erfolgreich = stats.successes,
            decode_fehler = stats.decode_failures,
            "Simulation beendet"
        );

        Ok(Bericht {
            stats,
            ausgang,
            gesendet,
            verloren,
            verzoegerungen,
        })
    }

    /// Uebernimmt die Pipeline-Zaehler in die Prometheus-Registry
    pub fn metriken_aktualisieren(&self, stats: &AudioStats) {
        let m = &self.metriken;
        VoiceMetrics::zaehler_nachziehen(&m.underflows_total, stats.underflows);
        VoiceMetrics::zaehler_nachziehen(&m.bursts_ok_total, stats.successes);
        VoiceMetrics::zaehler_nachziehen(&m.decode_failures_total, stats.decode_failures);
        VoiceMetrics::zaehler_nachziehen(&m.frames_decoded_total, stats.frames_decoded);
        VoiceMetrics::zaehler_nachziehen(&m.dropped_packets_total, stats.dropped_packets);
        m.active_speakers.set(stats.active_speakers as i64);
        for (cs, record) in self.engine.delay_cache().alle() {
            m.verzoegerung_setzen(cs.as_str(), record.delay_ms);
        }
    }
}

/// Zieht im Block-Takt Audio aus der Engine, bis das Stop-Signal kommt
async fn audio_callback(
    engine: Arc<VoiceEngine>,
    block_samples: usize,
    takt: Duration,
    mut stop: watch::Receiver<bool>,
) -> Ausgangspegel {
    let mut block = vec![0.0f32; block_samples];
    let mut pegel = Ausgangspegel::default();
    let mut energie = 0.0f64;
    let mut intervall = tokio::time::interval(takt);
    intervall.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Burst);

    loop {
        tokio::select! {
            _ = intervall.tick() => {
                let n = engine.read_samples(&mut block);
                for &s in &block[..n] {
                    energie += (s as f64) * (s as f64);
                    pegel.spitze = pegel.spitze.max(s.abs());
                }
                pegel.samples += n as u64;
                pegel.bloecke += 1;
            }
            _ = stop.changed() => break,
        }
    }

    if pegel.samples > 0 {
        pegel.rms = (energie / pegel.samples as f64).sqrt() as f32;
    }
    pegel
}
