//! Prometheus-kompatible Metriken fuer skyvoice
//!
//! Registrierte Metriken:
//! - `skyvoice_underflows_total` – Counter: Puffer-Unterlaeufe
//! - `skyvoice_bursts_ok_total` – Counter: Sprechsequenzen ohne Unterlauf
//! - `skyvoice_decode_failures_total` – Counter: Nicht dekodierbare Frames
//! - `skyvoice_frames_decoded_total` – Counter: Dekodierte Frames
//! - `skyvoice_dropped_packets_total` – Counter: Verworfene Pakete
//! - `skyvoice_active_speakers` – Gauge: Belegte Sprecher-Slots
//! - `skyvoice_callsign_delay_ms` – Gauge (callsign): Vorlauf-Verzoegerung

use std::sync::Arc;

use anyhow::Result;
use prometheus::{Encoder, IntCounter, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};

/// Alle Metriken der Sprecher-Pipeline
#[derive(Clone)]
pub struct VoiceMetrics {
    pub registry: Arc<Registry>,

    pub underflows_total: IntCounter,
    pub bursts_ok_total: IntCounter,
    pub decode_failures_total: IntCounter,
    pub frames_decoded_total: IntCounter,
    pub dropped_packets_total: IntCounter,
    pub active_speakers: IntGauge,
    pub callsign_delay_ms: IntGaugeVec,
}

impl VoiceMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        let underflows_total = IntCounter::with_opts(Opts::new(
            "skyvoice_underflows_total",
            "Anzahl Puffer-Unterlaeufe",
        ))?;
        registry.register(Box::new(underflows_total.clone()))?;

        let bursts_ok_total = IntCounter::with_opts(Opts::new(
            "skyvoice_bursts_ok_total",
            "Anzahl Sprechsequenzen ohne Unterlauf",
        ))?;
        registry.register(Box::new(bursts_ok_total.clone()))?;

        let decode_failures_total = IntCounter::with_opts(Opts::new(
            "skyvoice_decode_failures_total",
            "Anzahl nicht dekodierbarer Frames",
        ))?;
        registry.register(Box::new(decode_failures_total.clone()))?;

        let frames_decoded_total = IntCounter::with_opts(Opts::new(
            "skyvoice_frames_decoded_total",
            "Anzahl dekodierter Frames",
        ))?;
        registry.register(Box::new(frames_decoded_total.clone()))?;

        let dropped_packets_total = IntCounter::with_opts(Opts::new(
            "skyvoice_dropped_packets_total",
            "Anzahl verworfener Pakete",
        ))?;
        registry.register(Box::new(dropped_packets_total.clone()))?;

        let active_speakers = IntGauge::with_opts(Opts::new(
            "skyvoice_active_speakers",
            "Aktuell belegte Sprecher-Slots",
        ))?;
        registry.register(Box::new(active_speakers.clone()))?;

        let callsign_delay_ms = IntGaugeVec::new(
            Opts::new(
                "skyvoice_callsign_delay_ms",
                "Adaptive Vorlauf-Verzoegerung pro Rufzeichen in Millisekunden",
            ),
            &["callsign"],
        )?;
        registry.register(Box::new(callsign_delay_ms.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            underflows_total,
            bursts_ok_total,
            decode_failures_total,
            frames_decoded_total,
            dropped_packets_total,
            active_speakers,
            callsign_delay_ms,
        })
    }

    /// Zieht einen Counter auf einen absoluten Zaehlerstand nach
    ///
    /// Die Pipeline fuehrt eigene, monotone Zaehler; hier wird nur die
    /// Differenz seit dem letzten Abgleich addiert.
    pub fn zaehler_nachziehen(counter: &IntCounter, stand: u64) {
        let bisher = counter.get();
        if stand > bisher {
            counter.inc_by(stand - bisher);
        }
    }

    /// Setzt die Verzoegerung eines Rufzeichens
    pub fn verzoegerung_setzen(&self, callsign: &str, delay_ms: u32) {
        self.callsign_delay_ms
            .with_label_values(&[callsign])
            .set(delay_ms as i64);
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
