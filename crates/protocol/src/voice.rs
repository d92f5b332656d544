//! Empfangsseitige Sprach-Ereignisse
//!
//! Die Netzwerk-Schicht liefert pro Rufzeichen eine geordnete Folge von
//! komprimierten Frames sowie Start/Stop-Benachrichtigungen. Authentifizierung,
//! Entschluesselung und Sequenz-Sortierung sind zu diesem Zeitpunkt bereits
//! erledigt.

use bytes::Bytes;
use skyvoice_core::types::{AircraftType, Callsign};

/// Ein empfangener Sprach-Frame eines Rufzeichens
#[derive(Debug, Clone, PartialEq)]
pub struct RxAudio {
    /// Absender
    pub callsign: Callsign,
    /// Laufende Sequenznummer des Senders
    pub sequence: u32,
    /// Komprimierter Opus-Frame (opak)
    pub audio: Bytes,
    /// Letzter Frame der Sprechsequenz (PTT losgelassen)
    pub last_packet: bool,
    /// Frequenz, auf der der Frame empfangen wurde (Hz)
    pub frequency_hz: u32,
    /// Simulierte Entfernung relativ zur Reichweite (0..1)
    pub distance_ratio: f32,
}

impl RxAudio {
    /// Erstellt einen Frame mit idealer Entfernung
    pub fn new(
        callsign: impl Into<Callsign>,
        sequence: u32,
        audio: impl Into<Bytes>,
        frequency_hz: u32,
    ) -> Self {
        Self {
            callsign: callsign.into(),
            sequence,
            audio: audio.into(),
            last_packet: false,
            frequency_hz,
            distance_ratio: 1.0,
        }
    }

    /// Markiert den Frame als letzten der Sprechsequenz
    pub fn als_letztes(mut self) -> Self {
        self.last_packet = true;
        self
    }

    /// Setzt das Entfernungsverhaeltnis
    pub fn mit_entfernung(mut self, distance_ratio: f32) -> Self {
        self.distance_ratio = distance_ratio;
        self
    }
}

/// Alle Ereignisse, die die Netzwerk-Schicht an die Pipeline meldet
#[derive(Debug, Clone, PartialEq)]
pub enum RxEvent {
    /// Ein Sprecher beginnt zu senden
    SpeakerStarted {
        callsign: Callsign,
        aircraft_type: AircraftType,
    },
    /// Ein Sprecher hat aufgehoert zu senden
    SpeakerStopped { callsign: Callsign },
    /// Sprach-Frame mit Audio
    Audio(RxAudio),
    /// Sprach-Frame, dessen Audio unterdrueckt wird (z.B. lokales Echo)
    SilentAudio(RxAudio),
}

impl RxEvent {
    /// Rufzeichen, auf das sich das Ereignis bezieht
    pub fn callsign(&self) -> &Callsign {
        match self {
            RxEvent::SpeakerStarted { callsign, .. } => callsign,
            RxEvent::SpeakerStopped { callsign } => callsign,
            RxEvent::Audio(audio) | RxEvent::SilentAudio(audio) => &audio.callsign,
        }
    }
}
