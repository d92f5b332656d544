//! Gemeinsame Identifikations- und Formattypen
//!
//! Rufzeichen und Luftfahrzeugtyp verwenden das Newtype-Pattern, damit sie
//! zur Compilezeit nicht mit beliebigen Strings verwechselt werden.

use serde::{Deserialize, Serialize};

/// Rufzeichen eines Sprechers (z.B. "DLH123")
///
/// Ein leeres Rufzeichen kennzeichnet einen unbelegten Sprecher-Slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Callsign(String);

impl Callsign {
    /// Erstellt ein Rufzeichen, fuehrende/folgende Leerzeichen werden entfernt
    pub fn new(callsign: impl AsRef<str>) -> Self {
        Self(callsign.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Leert das Rufzeichen (Slot wird frei)
    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl From<&str> for Callsign {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Callsign {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for Callsign {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// ICAO-Luftfahrzeugtyp (z.B. "A320"), wird nur durchgereicht
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AircraftType(String);

impl AircraftType {
    pub fn new(typ: impl AsRef<str>) -> Self {
        Self(typ.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl From<&str> for AircraftType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for AircraftType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// PCM-Format, das zwischen allen Knoten des Audio-Graphen gilt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Abtastrate in Hz
    pub sample_rate: u32,
    /// Kanalanzahl (die Sprecher-Pipeline arbeitet ausschliesslich mono)
    pub channels: u16,
}

impl AudioFormat {
    /// Mono-Format mit der gegebenen Abtastrate
    pub const fn mono(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: 1,
        }
    }

    /// Anzahl Samples (ueber alle Kanaele) fuer die gegebene Dauer
    pub fn samples_for_ms(&self, ms: u32) -> usize {
        (self.sample_rate as usize / 1000) * ms as usize * self.channels as usize
    }

    /// Dauer in Millisekunden fuer die gegebene Sample-Anzahl
    pub fn ms_for_samples(&self, samples: usize) -> u64 {
        let pro_ms = (self.sample_rate as u64 / 1000) * self.channels as u64;
        if pro_ms == 0 {
            return 0;
        }
        samples as u64 / pro_ms
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::mono(48000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callsign_wird_getrimmt() {
        let cs = Callsign::new("  DLH123 ");
        assert_eq!(cs.as_str(), "DLH123");
        assert_eq!(cs.to_string(), "DLH123");
    }

    #[test]
    fn callsign_clear_macht_slot_frei() {
        let mut cs = Callsign::from("EDDF_TWR");
        assert!(!cs.is_empty());
        cs.clear();
        assert!(cs.is_empty());
    }

    #[test]
    fn callsign_ist_serde_transparent() {
        let cs = Callsign::from("BAW12");
        let json = serde_json::to_string(&cs).unwrap();
        assert_eq!(json, "\"BAW12\"");
        let cs2: Callsign = serde_json::from_str(&json).unwrap();
        assert_eq!(cs, cs2);
    }

    #[test]
    fn audio_format_umrechnung() {
        let format = AudioFormat::mono(48000);
        assert_eq!(format.samples_for_ms(20), 960);
        assert_eq!(format.samples_for_ms(60), 2880);
        assert_eq!(format.ms_for_samples(960), 20);
    }

    #[test]
    fn audio_format_standard_ist_48k_mono() {
        let format = AudioFormat::default();
        assert_eq!(format.sample_rate, 48000);
        assert_eq!(format.channels, 1);
    }
}
