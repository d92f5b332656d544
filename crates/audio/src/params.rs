//! Lock-freie Parameter-Handles
//!
//! Generatoren und Effekte werden nach dem Aufbau in den Mixer verschoben.
//! Damit der Sprecher-Provider ihre Verstaerkung und Schalter danach noch
//! setzen kann, liegen diese Werte in geteilten Atomics. Der Audio-Thread
//! liest sie ohne Lock.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Geteilte lineare Verstaerkung (f32-Bits in einem `AtomicU32`)
#[derive(Debug, Clone)]
pub struct SharedGain(Arc<AtomicU32>);

impl SharedGain {
    pub fn new(gain: f32) -> Self {
        Self(Arc::new(AtomicU32::new(gain.to_bits())))
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    /// Setzt die Verstaerkung; negative oder NaN-Werte werden zu 0.0
    pub fn set(&self, gain: f32) {
        let gain = if gain.is_nan() { 0.0 } else { gain.max(0.0) };
        self.0.store(gain.to_bits(), Ordering::Relaxed);
    }
}

impl Default for SharedGain {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Geteilter Schalter (aktiviert / bypass)
#[derive(Debug, Clone, Default)]
pub struct SharedFlag(Arc<AtomicBool>);

impl SharedFlag {
    pub fn new(wert: bool) -> Self {
        Self(Arc::new(AtomicBool::new(wert)))
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, wert: bool) {
        self.0.store(wert, Ordering::Relaxed);
    }
}

/// Grenze zwischen Kurzwelle (HF) und UKW (VHF) in Hz
pub const HF_GRENZE_HZ: u32 = 30_000_000;

/// Startfrequenz eines Empfaengers (UNICOM 122.800 MHz)
pub const STANDARD_FREQUENZ_HZ: u32 = 122_800_000;

/// Geteilte Empfangsfrequenz eines Empfaengers in Hz
///
/// Der Empfaenger setzt sie, alle seine Sprecher-Provider lesen sie bei der
/// Effekt-Auswahl.
#[derive(Debug, Clone, Default)]
pub struct SharedFrequency(Arc<AtomicU32>);

impl SharedFrequency {
    pub fn new(frequency_hz: u32) -> Self {
        Self(Arc::new(AtomicU32::new(frequency_hz)))
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, frequency_hz: u32) {
        self.0.store(frequency_hz, Ordering::Relaxed);
    }

    /// Liegt die Frequenz im Kurzwellenband (< 30 MHz)?
    pub fn is_hf(&self) -> bool {
        self.get() < HF_GRENZE_HZ
    }
}
