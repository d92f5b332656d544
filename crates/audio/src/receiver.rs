//! Empfaenger: feste Anzahl Sprecher-Slots auf einer Frequenz
//!
//! Leitet eingehende Frames an den Slot weiter, der das Rufzeichen bereits
//! haelt, sonst an den ersten freien Slot. Beim Lesen wird jeder Slot wie
//! ein Mixer-Eingang abgefragt.
//!
//! Jeder Slot liegt hinter einem eigenen `parking_lot::Mutex`. Der
//! Audio-Thread nimmt ihn nur mit `try_lock`: haelt der Steuer-Thread den
//! Slot gerade, liefert er fuer diesen Block Stille.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::callsign::{CallsignSampleProvider, ProviderContext};
use crate::error::AudioResult;
use crate::params::{SharedFlag, SharedFrequency, SharedGain};
use crate::provider::SampleProvider;
use crate::stats::PipelineCounters;
use skyvoice_core::types::{AircraftType, Callsign};
use skyvoice_protocol::voice::RxAudio;

/// Empfaenger mit seinen Sprecher-Slots
pub struct ReceiverSampleProvider {
    id: u16,
    slots: Vec<Mutex<CallsignSampleProvider>>,
    frequency: SharedFrequency,
    mute: SharedFlag,
    volume: SharedGain,
    bypass_effects: SharedFlag,
    counters: Arc<PipelineCounters>,
    /// Lesepuffer des Audio-Threads
    scratch: Mutex<Vec<f32>>,
}

impl ReceiverSampleProvider {
    /// Baut `slot_count` Slots; alle teilen sich die Frequenz des Empfaengers
    pub fn new(
        id: u16,
        frequency_hz: u32,
        slot_count: usize,
        ctx: &ProviderContext,
    ) -> AudioResult<Self> {
        let mut ctx = ctx.clone();
        ctx.frequency = SharedFrequency::new(frequency_hz);

        let slots = (0..slot_count.max(1))
            .map(|_| CallsignSampleProvider::new(&ctx).map(Mutex::new))
            .collect::<AudioResult<Vec<_>>>()?;

        debug!(id, frequency_hz, slots = slots.len(), "Empfaenger erstellt");

        Ok(Self {
            id,
            slots,
            frequency: ctx.frequency,
            mute: SharedFlag::new(false),
            volume: SharedGain::new(1.0),
            bypass_effects: SharedFlag::new(false),
            counters: ctx.counters,
            scratch: Mutex::new(Vec::new()),
        })
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn frequency(&self) -> u32 {
        self.frequency.get()
    }

    /// Wechselt die Frequenz; bei Aenderung werden alle Slots geleert
    pub fn set_frequency(&self, frequency_hz: u32) {
        if frequency_hz == self.frequency.get() {
            return;
        }
        for slot in &self.slots {
            slot.lock().clear();
        }
        self.frequency.set(frequency_hz);
        debug!(id = self.id, frequency_hz, "Empfaenger umgestimmt");
    }

    pub fn set_mute(&self, mute: bool) {
        self.mute.set(mute);
    }

    pub fn is_muted(&self) -> bool {
        self.mute.get()
    }

    pub fn set_volume(&self, volume: f32) {
        self.volume.set(volume);
    }

    pub fn volume(&self) -> f32 {
        self.volume.get()
    }

    pub fn set_bypass_effects(&self, bypass: bool) {
        self.bypass_effects.set(bypass);
        for slot in &self.slots {
            slot.lock().set_bypass_effects(bypass);
        }
    }

    pub fn bypass_effects(&self) -> bool {
        self.bypass_effects.get()
    }

    /// Leitet einen Audio-Frame weiter; false, wenn er nicht angenommen wurde
    pub fn add_opus_samples(&self, audio: &RxAudio) -> bool {
        self.weiterleiten(audio, false)
    }

    /// Leitet einen stummen Frame weiter
    pub fn add_silent_samples(&self, audio: &RxAudio) -> bool {
        self.weiterleiten(audio, true)
    }

    fn weiterleiten(&self, audio: &RxAudio, stumm: bool) -> bool {
        if audio.frequency_hz != self.frequency.get() {
            return false;
        }
        if audio.callsign.is_empty() {
            self.counters.packet_dropped();
            return false;
        }

        let Some(index) = self.slot_fuer(&audio.callsign) else {
            warn!(
                id = self.id,
                callsign = %audio.callsign,
                "Kein freier Sprecher-Slot, Frame verworfen"
            );
            self.counters.packet_dropped();
            return false;
        };

        let mut slot = self.slots[index].lock();
        if slot.callsign() != &audio.callsign {
            if stumm {
                slot.active_silent(&audio.callsign, &AircraftType::default());
            } else {
                slot.active(&audio.callsign, &AircraftType::default());
            }
        }
        if stumm {
            slot.add_silent_samples(audio);
        } else {
            slot.add_opus_samples(audio, audio.distance_ratio);
        }
        true
    }

    /// Index des Slots mit dem Rufzeichen, sonst des ersten freien
    fn slot_fuer(&self, callsign: &Callsign) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.lock().callsign() == callsign)
            .or_else(|| self.slots.iter().position(|s| !s.lock().in_use()))
    }

    /// Ein Sprecher beginnt: Slot belegen, falls noch keiner ihn haelt
    ///
    /// Start-Ereignisse tragen keine Frequenz. Bis der erste Frame kommt,
    /// meldet der Slot daher keine Unterlaeufe an den Verzoegerungs-Cache.
    pub fn speaker_started(&self, callsign: &Callsign, aircraft_type: &AircraftType) -> bool {
        if callsign.is_empty() {
            return false;
        }
        match self.slot_fuer(callsign) {
            Some(index) => {
                let mut slot = self.slots[index].lock();
                if slot.callsign() != callsign {
                    slot.active_awaiting_audio(callsign, aircraft_type);
                }
                true
            }
            None => {
                warn!(id = self.id, callsign = %callsign, "Kein freier Sprecher-Slot");
                false
            }
        }
    }

    /// Ein Sprecher hoert auf: Slot sofort frei, wenn nichts mehr gepuffert ist
    ///
    /// Sonst spielt der Rest aus und die Leerlauf-Ueberwachung gibt den Slot
    /// frei.
    pub fn speaker_stopped(&self, callsign: &Callsign) {
        if callsign.is_empty() {
            return;
        }
        for slot in &self.slots {
            let mut slot = slot.lock();
            if slot.callsign() == callsign && slot.buffered_sample_count() == 0 {
                slot.idle();
            }
        }
    }

    pub fn tick_at(&self, jetzt: Instant) {
        for slot in &self.slots {
            slot.lock().tick_at(jetzt);
        }
    }

    /// Alle Slots freigeben und Puffer verwerfen
    pub fn clear(&self) {
        for slot in &self.slots {
            slot.lock().clear();
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn active_speakers(&self) -> usize {
        self.slots.iter().filter(|s| s.lock().in_use()).count()
    }

    pub fn active_callsigns(&self) -> Vec<Callsign> {
        self.slots
            .iter()
            .filter_map(|s| {
                let s = s.lock();
                let callsign = s.in_use().then(|| s.callsign().clone());
                callsign
            })
            .collect()
    }

    /// Zugriff auf einen Slot (Steuer-Kontext, blockierend)
    pub fn with_slot<R>(
        &self,
        index: usize,
        f: impl FnOnce(&mut CallsignSampleProvider) -> R,
    ) -> Option<R> {
        self.slots.get(index).map(|s| f(&mut s.lock()))
    }

    /// Liest einen Block (Audio-Kontext, blockiert nie)
    pub fn read(&self, out: &mut [f32]) -> usize {
        let n = out.len();
        out.fill(0.0);

        let Some(mut scratch) = self.scratch.try_lock() else {
            return n;
        };
        if scratch.len() < n {
            scratch.resize(n, 0.0);
        }

        for slot in &self.slots {
            let Some(mut slot) = slot.try_lock() else {
                continue;
            };
            let puffer = &mut scratch[..n];
            let gelesen = slot.read_samples(puffer).min(n);
            for (ziel, quelle) in out.iter_mut().zip(&puffer[..gelesen]) {
                *ziel += *quelle;
            }
        }

        if self.mute.get() {
            out.fill(0.0);
            return n;
        }

        let volume = self.volume.get();
        for s in out.iter_mut() {
            *s = (*s * volume).clamp(-1.0, 1.0);
        }
        n
    }
}

impl SampleProvider for ReceiverSampleProvider {
    fn read_samples(&mut self, samples: &mut [f32]) -> usize {
        self.read(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{DecoderFactory, VoiceDecoder};
    use crate::delay_cache::CallsignDelayCache;
    use crate::generators::Samples;
    use crate::params::STANDARD_FREQUENZ_HZ;
    use bytes::Bytes;
    use skyvoice_core::types::AudioFormat;
    use std::time::Duration;

    struct StubDecoder;

    impl VoiceDecoder for StubDecoder {
        fn decode(&mut self, frame: &[u8]) -> Vec<i16> {
            vec![1000; frame.len() * 160]
        }

        fn reset_state(&mut self) {}
    }

    fn empfaenger(slots: usize) -> ReceiverSampleProvider {
        let factory: DecoderFactory =
            Arc::new(|_: AudioFormat| -> AudioResult<Box<dyn VoiceDecoder>> {
                Ok(Box::new(StubDecoder) as Box<dyn VoiceDecoder>)
            });
        let mut ctx = ProviderContext::new(
            AudioFormat::mono(48000),
            Arc::new(CallsignDelayCache::default()),
        )
        .with_decoder_factory(factory);
        ctx.samples = Samples::from_pcm(vec![0.0; 16], vec![0.0; 16], vec![0.0; 16]);
        ReceiverSampleProvider::new(1, STANDARD_FREQUENZ_HZ, slots, &ctx).unwrap()
    }

    fn frame(cs: &str) -> RxAudio {
        RxAudio::new(cs, 0, Bytes::from_static(&[1]), STANDARD_FREQUENZ_HZ)
    }

    #[test]
    fn falsche_frequenz_wird_ignoriert() {
        let rx = empfaenger(2);
        let mut f = frame("DLH1");
        f.frequency_hz = 121_500_000;
        assert!(!rx.add_opus_samples(&f));
        assert_eq!(rx.active_speakers(), 0);
    }

    #[test]
    fn rufzeichen_behaelt_seinen_slot() {
        let rx = empfaenger(2);
        assert!(rx.add_opus_samples(&frame("DLH1")));
        assert!(rx.add_opus_samples(&frame("DLH1")));
        assert_eq!(rx.active_speakers(), 1);
        // Vorlauf + zwei Frames im selben Slot
        assert_eq!(rx.with_slot(0, |s| s.buffered_sample_count()), Some(2880 + 320));
    }

    #[test]
    fn volle_slots_verwerfen() {
        let rx = empfaenger(2);
        assert!(rx.add_opus_samples(&frame("A")));
        assert!(rx.add_opus_samples(&frame("B")));
        assert!(!rx.add_opus_samples(&frame("C")));
        let mut aktiv = rx.active_callsigns();
        aktiv.sort();
        assert_eq!(aktiv, vec![Callsign::from("A"), Callsign::from("B")]);
    }

    #[test]
    fn leeres_rufzeichen_wird_verworfen() {
        let rx = empfaenger(1);
        assert!(!rx.add_opus_samples(&frame("")));
        assert!(!rx.speaker_started(&Callsign::default(), &AircraftType::default()));
        assert_eq!(rx.active_speakers(), 0);
    }

    #[test]
    fn speaker_start_und_stop() {
        let rx = empfaenger(2);
        let cs = Callsign::from("EDDF_TWR");
        assert!(rx.speaker_started(&cs, &AircraftType::default()));
        assert_eq!(rx.active_speakers(), 1);

        // Vorlauf noch gepuffert: Slot bleibt belegt
        rx.speaker_stopped(&cs);
        assert_eq!(rx.active_speakers(), 1);

        let mut out = vec![0.0f32; 4096];
        rx.read(&mut out);
        rx.speaker_stopped(&cs);
        assert_eq!(rx.active_speakers(), 0);
    }

    #[test]
    fn start_ohne_frames_wird_nach_timeout_frei() {
        let rx = empfaenger(1);
        let cs = Callsign::from("DLH1");
        assert!(rx.speaker_started(&cs, &AircraftType::default()));
        // Vorlauf noch gepuffert: Stop allein gibt den Slot nicht frei
        rx.speaker_stopped(&cs);

        let mut out = vec![0.0f32; 4096];
        rx.read(&mut out);
        rx.tick_at(Instant::now() + Duration::from_millis(600));
        assert_eq!(rx.active_speakers(), 0);

        assert!(rx.add_opus_samples(&frame("BAW2")));
        assert_eq!(rx.active_callsigns(), vec![Callsign::from("BAW2")]);
    }

    #[test]
    fn start_ohne_frames_meldet_keinen_unterlauf() {
        let rx = empfaenger(1);
        let cs = Callsign::from("DLH1");
        rx.speaker_started(&cs, &AircraftType::default());
        assert_eq!(rx.with_slot(0, |s| s.awaiting_audio()), Some(true));

        let mut out = vec![0.0f32; 4096];
        rx.read(&mut out);
        rx.read(&mut out);
        assert_eq!(rx.counters.snapshot().underflows, 0);

        // Ab dem ersten Frame zaehlt ein leerer Puffer wieder
        rx.add_opus_samples(&frame("DLH1"));
        assert_eq!(rx.with_slot(0, |s| s.awaiting_audio()), Some(false));
        rx.read(&mut out);
        assert_eq!(rx.counters.snapshot().underflows, 1);
    }

    #[test]
    fn frequenzwechsel_leert_slots() {
        let rx = empfaenger(2);
        rx.add_opus_samples(&frame("DLH1"));
        rx.set_frequency(118_100_000);
        assert_eq!(rx.active_speakers(), 0);
        assert_eq!(rx.with_slot(0, |s| s.buffered_sample_count()), Some(0));
        assert_eq!(rx.frequency(), 118_100_000);
    }

    #[test]
    fn stumm_liefert_stille() {
        let rx = empfaenger(1);
        rx.add_opus_samples(&frame("DLH1"));
        rx.set_mute(true);
        let mut out = vec![1.0f32; 8192];
        assert_eq!(rx.read(&mut out), 8192);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn gesperrter_slot_liefert_stille() {
        let rx = empfaenger(1);
        rx.add_opus_samples(&frame("DLH1"));
        let vorher = rx.with_slot(0, |s| s.buffered_sample_count());

        let halter = rx.slots[0].lock();
        let mut out = vec![1.0f32; 256];
        assert_eq!(rx.read(&mut out), 256);
        assert!(out.iter().all(|&s| s == 0.0));
        drop(halter);

        assert_eq!(rx.with_slot(0, |s| s.buffered_sample_count()), vorher);
    }

    #[test]
    fn bypass_wird_an_slots_verteilt() {
        let rx = empfaenger(2);
        rx.set_bypass_effects(true);
        assert!(rx.bypass_effects());
        assert_eq!(rx.with_slot(1, |s| s.bypass_effects()), Some(true));
    }
}
