//! Laufzeit-Zaehler der Pipeline

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Zaehler, geteilt zwischen allen Sprecher-Slots einer Engine
#[derive(Debug, Default)]
pub struct PipelineCounters {
    underflows: AtomicU64,
    bursts_ok: AtomicU64,
    decode_failures: AtomicU64,
    frames_decoded: AtomicU64,
    dropped_packets: AtomicU64,
}

impl PipelineCounters {
    pub fn underflow(&self) {
        self.underflows.fetch_add(1, Ordering::Relaxed);
    }

    pub fn burst_ok(&self) {
        self.bursts_ok.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_decoded(&self) {
        self.frames_decoded.fetch_add(1, Ordering::Relaxed);
    }

    /// Paket ohne Ziel (falsche Frequenz, kein freier Slot, leeres Rufzeichen)
    pub fn packet_dropped(&self) {
        self.dropped_packets.fetch_add(1, Ordering::Relaxed);
    }

    /// Momentaufnahme; `active_speakers` setzt der Aufrufer
    pub fn snapshot(&self) -> AudioStats {
        AudioStats {
            active_speakers: 0,
            underflows: self.underflows.load(Ordering::Relaxed),
            successes: self.bursts_ok.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            frames_decoded: self.frames_decoded.load(Ordering::Relaxed),
            dropped_packets: self.dropped_packets.load(Ordering::Relaxed),
        }
    }
}

/// Statistiken der Voice-Engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AudioStats {
    /// Aktuell belegte Sprecher-Slots
    pub active_speakers: usize,
    /// Puffer-Unterlaeufe seit Start
    pub underflows: u64,
    /// Saubere Sprechsequenzen seit Start
    pub successes: u64,
    /// Nicht dekodierbare Frames
    pub decode_failures: u64,
    /// Erfolgreich dekodierte Frames
    pub frames_decoded: u64,
    /// Verworfene Pakete
    pub dropped_packets: u64,
}
