//! VoiceEngine – Wurzel der Empfangs-Pipeline
//!
//! Besitzt den geteilten Verzoegerungs-Cache und die Empfaenger. Alle
//! Steuer-Aufrufe laufen ueber crossbeam-channel in einen eigenen
//! Steuer-Thread, der zusaetzlich im 100-ms-Takt die Leerlauf-Ueberwachung
//! aller Slots antreibt. Der Audio-Callback liest ueber `read_samples`
//! direkt und blockiert dabei nie.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::buffered::STANDARD_MAX_PUFFER_MS;
use crate::callsign::{ProviderContext, STANDARD_IDLE_TIMEOUT, STANDARD_TICK_INTERVALL};
use crate::codec::{opus_decoder_factory, DecoderFactory};
use crate::delay_cache::{CallsignDelayCache, DelayCacheConfig};
use crate::error::{AudioError, AudioResult};
use crate::generators::Samples;
use crate::params::{SharedFlag, STANDARD_FREQUENZ_HZ};
use crate::receiver::ReceiverSampleProvider;
use crate::stats::{AudioStats, PipelineCounters};
use skyvoice_core::types::{AircraftType, AudioFormat, Callsign};
use skyvoice_protocol::voice::{RxAudio, RxEvent};

/// Kapazitaet der Kommando-Queue
const KOMMANDO_KAPAZITAET: usize = 1024;

/// Konfiguration der Voice-Engine
#[derive(Clone)]
pub struct EngineConfig {
    pub format: AudioFormat,
    /// Eine Frequenz pro Empfaenger
    pub frequencies: Vec<u32>,
    /// Sprecher-Slots pro Empfaenger
    pub slots_per_receiver: usize,
    pub idle_timeout: Duration,
    pub tick_interval: Duration,
    pub max_buffered_ms: u32,
    pub bypass_effects: bool,
    pub verbose: bool,
    pub delay: DelayCacheConfig,
    /// Seed fuer die synthetisierten Atmosphaeren-Clips
    pub samples_seed: u64,
    pub decoder_factory: DecoderFactory,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            format: AudioFormat::default(),
            frequencies: vec![STANDARD_FREQUENZ_HZ],
            slots_per_receiver: 4,
            idle_timeout: STANDARD_IDLE_TIMEOUT,
            tick_interval: STANDARD_TICK_INTERVALL,
            max_buffered_ms: STANDARD_MAX_PUFFER_MS,
            bypass_effects: false,
            verbose: false,
            delay: DelayCacheConfig::default(),
            samples_seed: crate::generators::samples::STANDARD_SEED,
            decoder_factory: opus_decoder_factory(),
        }
    }
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("format", &self.format)
            .field("frequencies", &self.frequencies)
            .field("slots_per_receiver", &self.slots_per_receiver)
            .field("idle_timeout", &self.idle_timeout)
            .field("tick_interval", &self.tick_interval)
            .field("max_buffered_ms", &self.max_buffered_ms)
            .field("bypass_effects", &self.bypass_effects)
            .field("verbose", &self.verbose)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

impl EngineConfig {
    /// Prueft die Konfiguration vor dem Start
    pub fn validieren(&self) -> AudioResult<()> {
        if self.format.channels != 1 {
            return Err(AudioError::Konfiguration(
                "Die Sprecher-Pipeline arbeitet nur mono".into(),
            ));
        }
        if self.frequencies.is_empty() {
            return Err(AudioError::Konfiguration(
                "Mindestens ein Empfaenger wird benoetigt".into(),
            ));
        }
        if self.slots_per_receiver == 0 {
            return Err(AudioError::Konfiguration(
                "slots_per_receiver muss groesser als 0 sein".into(),
            ));
        }
        if self.tick_interval.is_zero() {
            return Err(AudioError::Konfiguration(
                "tick_interval muss groesser als 0 sein".into(),
            ));
        }
        self.delay.validieren().map_err(AudioError::Konfiguration)
    }
}

/// Kommandos an den Steuer-Thread
#[derive(Debug)]
pub enum EngineCommand {
    Audio(RxAudio),
    SilentAudio(RxAudio),
    SpeakerStarted {
        callsign: Callsign,
        aircraft_type: AircraftType,
    },
    SpeakerStopped {
        callsign: Callsign,
    },
    SetBypassEffects(bool),
    SetFrequency {
        receiver: u16,
        frequency_hz: u32,
    },
    Clear,
    /// Antwortet, sobald alle vorherigen Kommandos verarbeitet sind
    Sync(Sender<()>),
    Shutdown,
}

impl From<RxEvent> for EngineCommand {
    fn from(event: RxEvent) -> Self {
        match event {
            RxEvent::Audio(audio) => EngineCommand::Audio(audio),
            RxEvent::SilentAudio(audio) => EngineCommand::SilentAudio(audio),
            RxEvent::SpeakerStarted {
                callsign,
                aircraft_type,
            } => EngineCommand::SpeakerStarted {
                callsign,
                aircraft_type,
            },
            RxEvent::SpeakerStopped { callsign } => EngineCommand::SpeakerStopped { callsign },
        }
    }
}

/// Voice-Engine
///
/// Die Engine selbst ist kein async-Typ: der Audio-Callback ruft
/// `read_samples` synchron auf, Steuerkommandos laufen ueber
/// crossbeam-channel.
pub struct VoiceEngine {
    cmd_tx: Sender<EngineCommand>,
    receivers: Arc<Vec<ReceiverSampleProvider>>,
    delay_cache: Arc<CallsignDelayCache>,
    counters: Arc<PipelineCounters>,
    verbose: SharedFlag,
    format: AudioFormat,
    /// Lesepuffer des Audio-Threads
    scratch: Mutex<Vec<f32>>,
    thread: Option<JoinHandle<()>>,
}

impl VoiceEngine {
    /// Baut alle Empfaenger und startet den Steuer-Thread
    pub fn new(config: EngineConfig) -> AudioResult<Self> {
        config.validieren()?;

        let delay_cache = Arc::new(CallsignDelayCache::new(config.delay));
        delay_cache.set_verbose(config.verbose);

        let mut ctx = ProviderContext::new(config.format, Arc::clone(&delay_cache))
            .with_decoder_factory(Arc::clone(&config.decoder_factory));
        ctx.samples = Samples::synthesize(config.format, config.samples_seed);
        ctx.idle_timeout = config.idle_timeout;
        ctx.max_buffered_ms = config.max_buffered_ms;
        ctx.verbose.set(config.verbose);

        let receivers = config
            .frequencies
            .iter()
            .enumerate()
            .map(|(id, &frequency_hz)| {
                ReceiverSampleProvider::new(id as u16, frequency_hz, config.slots_per_receiver, &ctx)
            })
            .collect::<AudioResult<Vec<_>>>()?;
        if config.bypass_effects {
            for rx in &receivers {
                rx.set_bypass_effects(true);
            }
        }
        let receivers = Arc::new(receivers);

        let (cmd_tx, cmd_rx) = bounded::<EngineCommand>(KOMMANDO_KAPAZITAET);
        let thread_receivers = Arc::clone(&receivers);
        let tick_interval = config.tick_interval;

        // Hintergrund-Thread fuer Kommando-Verarbeitung und Leerlauf-Takt
        let thread = std::thread::Builder::new()
            .name("skyvoice-steuerung".to_string())
            .spawn(move || {
                steuer_thread(cmd_rx, thread_receivers, tick_interval);
            })
            .map_err(|e| AudioError::SteuerThread(e.to_string()))?;

        info!(
            empfaenger = receivers.len(),
            slots = config.slots_per_receiver,
            sample_rate = config.format.sample_rate,
            "VoiceEngine initialisiert"
        );

        Ok(Self {
            cmd_tx,
            receivers,
            delay_cache,
            counters: Arc::clone(&ctx.counters),
            verbose: ctx.verbose,
            format: config.format,
            scratch: Mutex::new(Vec::new()),
            thread: Some(thread),
        })
    }

    /// Reicht ein Ereignis der Netzwerk-Schicht weiter
    pub fn submit(&self, event: RxEvent) -> AudioResult<()> {
        self.send_cmd(event.into())
    }

    pub fn add_opus_samples(&self, audio: RxAudio) -> AudioResult<()> {
        self.send_cmd(EngineCommand::Audio(audio))
    }

    pub fn add_silent_samples(&self, audio: RxAudio) -> AudioResult<()> {
        self.send_cmd(EngineCommand::SilentAudio(audio))
    }

    pub fn speaker_started(
        &self,
        callsign: impl Into<Callsign>,
        aircraft_type: impl Into<AircraftType>,
    ) -> AudioResult<()> {
        self.send_cmd(EngineCommand::SpeakerStarted {
            callsign: callsign.into(),
            aircraft_type: aircraft_type.into(),
        })
    }

    pub fn speaker_stopped(&self, callsign: impl Into<Callsign>) -> AudioResult<()> {
        self.send_cmd(EngineCommand::SpeakerStopped {
            callsign: callsign.into(),
        })
    }

    /// Schaltet alle Funk-Effekte global ab
    pub fn set_bypass_effects(&self, bypass: bool) -> AudioResult<()> {
        self.send_cmd(EngineCommand::SetBypassEffects(bypass))
    }

    pub fn set_frequency(&self, receiver: u16, frequency_hz: u32) -> AudioResult<()> {
        self.send_cmd(EngineCommand::SetFrequency {
            receiver,
            frequency_hz,
        })
    }

    /// Alle Slots freigeben
    pub fn clear(&self) -> AudioResult<()> {
        self.send_cmd(EngineCommand::Clear)
    }

    /// Wartet, bis alle bisher gesendeten Kommandos verarbeitet sind
    pub fn sync(&self) -> AudioResult<()> {
        let (tx, rx) = bounded(1);
        self.send_cmd(EngineCommand::Sync(tx))?;
        rx.recv().map_err(|_| AudioError::EngineBeendet)
    }

    pub fn set_verbose(&self, verbose: bool) {
        self.verbose.set(verbose);
        self.delay_cache.set_verbose(verbose);
    }

    pub fn verbose(&self) -> bool {
        self.verbose.get()
    }

    /// Liest einen Block fuer den Audio-Callback; blockiert nie
    ///
    /// Liefert immer `out.len()` Samples.
    pub fn read_samples(&self, out: &mut [f32]) -> usize {
        let n = out.len();
        if let [einziger] = self.receivers.as_slice() {
            return einziger.read(out);
        }

        out.fill(0.0);
        let Some(mut scratch) = self.scratch.try_lock() else {
            return n;
        };
        if scratch.len() < n {
            scratch.resize(n, 0.0);
        }
        for rx in self.receivers.iter() {
            let puffer = &mut scratch[..n];
            rx.read(puffer);
            for (ziel, quelle) in out.iter_mut().zip(puffer.iter()) {
                *ziel += *quelle;
            }
        }
        for s in out.iter_mut() {
            *s = s.clamp(-1.0, 1.0);
        }
        n
    }

    /// Momentaufnahme der Zaehler (Steuer-Kontext)
    pub fn stats(&self) -> AudioStats {
        let mut stats = self.counters.snapshot();
        stats.active_speakers = self.receivers.iter().map(|rx| rx.active_speakers()).sum();
        stats
    }

    pub fn delay_cache(&self) -> &Arc<CallsignDelayCache> {
        &self.delay_cache
    }

    pub fn receivers(&self) -> &[ReceiverSampleProvider] {
        &self.receivers
    }

    pub fn receiver(&self, id: u16) -> Option<&ReceiverSampleProvider> {
        self.receivers.get(id as usize)
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    fn send_cmd(&self, cmd: EngineCommand) -> AudioResult<()> {
        self.cmd_tx.send(cmd).map_err(|_| AudioError::EngineBeendet)
    }
}

impl Drop for VoiceEngine {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(EngineCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Steuer-Thread ist abgestuerzt");
            }
        }
        debug!("VoiceEngine gestoppt");
    }
}

/// Steuer-Thread: verarbeitet Kommandos und treibt den Leerlauf-Takt
fn steuer_thread(
    cmd_rx: Receiver<EngineCommand>,
    receivers: Arc<Vec<ReceiverSampleProvider>>,
    tick_interval: Duration,
) {
    debug!("Steuer-Thread gestartet");
    let mut naechster_tick = Instant::now() + tick_interval;

    loop {
        let warten = naechster_tick.saturating_duration_since(Instant::now());
        match cmd_rx.recv_timeout(warten) {
            Ok(EngineCommand::Shutdown) => {
                info!("Steuer-Thread beendet");
                break;
            }
            Ok(cmd) => kommando_ausfuehren(cmd, &receivers),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                debug!("Kommando-Kanal geschlossen");
                break;
            }
        }

        let jetzt = Instant::now();
        if jetzt >= naechster_tick {
            for rx in receivers.iter() {
                rx.tick_at(jetzt);
            }
            naechster_tick = jetzt + tick_interval;
        }
    }
}

fn kommando_ausfuehren(cmd: EngineCommand, receivers: &[ReceiverSampleProvider]) {
    match cmd {
        EngineCommand::Audio(audio) => {
            for rx in receivers {
                rx.add_opus_samples(&audio);
            }
        }
        EngineCommand::SilentAudio(audio) => {
            for rx in receivers {
                rx.add_silent_samples(&audio);
            }
        }
        EngineCommand::SpeakerStarted {
            callsign,
            aircraft_type,
        } => {
            for rx in receivers {
                rx.speaker_started(&callsign, &aircraft_type);
            }
        }
        EngineCommand::SpeakerStopped { callsign } => {
            for rx in receivers {
                rx.speaker_stopped(&callsign);
            }
        }
        EngineCommand::SetBypassEffects(bypass) => {
            for rx in receivers {
                rx.set_bypass_effects(bypass);
            }
            info!(bypass, "Funk-Effekte umgeschaltet");
        }
        EngineCommand::SetFrequency {
            receiver,
            frequency_hz,
        } => match receivers.get(receiver as usize) {
            Some(rx) => rx.set_frequency(frequency_hz),
            None => error!(receiver, "Unbekannter Empfaenger"),
        },
        EngineCommand::Clear => {
            for rx in receivers {
                rx.clear();
            }
        }
        EngineCommand::Sync(antwort) => {
            let _ = antwort.send(());
        }
        EngineCommand::Shutdown => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::VoiceDecoder;
    use bytes::Bytes;

    struct StubDecoder;

    impl VoiceDecoder for StubDecoder {
        fn decode(&mut self, _frame: &[u8]) -> Vec<i16> {
            vec![0; 160]
        }

        fn reset_state(&mut self) {}
    }

    fn config() -> EngineConfig {
        EngineConfig {
            format: AudioFormat::mono(8000),
            decoder_factory: Arc::new(|_: AudioFormat| -> AudioResult<Box<dyn VoiceDecoder>> {
                Ok(Box::new(StubDecoder) as Box<dyn VoiceDecoder>)
            }),
            ..Default::default()
        }
    }

    fn frame(cs: &str) -> RxAudio {
        RxAudio::new(cs, 0, Bytes::from_static(&[1]), STANDARD_FREQUENZ_HZ)
    }

    #[test]
    fn engine_erstellen() {
        let engine = VoiceEngine::new(config());
        assert!(engine.is_ok(), "Engine sollte erstellbar sein");
        let engine = engine.unwrap();
        assert_eq!(engine.receivers().len(), 1);
        assert_eq!(engine.stats(), AudioStats::default());
    }

    #[test]
    fn ungueltige_konfiguration() {
        let mut c = config();
        c.frequencies.clear();
        assert!(matches!(VoiceEngine::new(c), Err(AudioError::Konfiguration(_))));

        let mut c = config();
        c.format = AudioFormat {
            sample_rate: 48000,
            channels: 2,
        };
        assert!(VoiceEngine::new(c).is_err());
    }

    #[test]
    fn audio_belegt_slot() {
        let engine = VoiceEngine::new(config()).unwrap();
        engine.add_opus_samples(frame("DLH1")).unwrap();
        engine.sync().unwrap();
        assert_eq!(engine.stats().active_speakers, 1);
        assert_eq!(engine.stats().frames_decoded, 1);
    }

    #[test]
    fn ereignisse_ueber_submit() {
        let engine = VoiceEngine::new(config()).unwrap();
        engine
            .submit(RxEvent::SpeakerStarted {
                callsign: Callsign::from("BAW1"),
                aircraft_type: AircraftType::from("B744"),
            })
            .unwrap();
        engine.sync().unwrap();
        assert_eq!(engine.stats().active_speakers, 1);

        engine.clear().unwrap();
        engine.sync().unwrap();
        assert_eq!(engine.stats().active_speakers, 0);
    }

    #[test]
    fn leerlauf_takt_gibt_slots_frei() {
        let mut c = config();
        c.idle_timeout = Duration::from_millis(30);
        c.tick_interval = Duration::from_millis(10);
        let engine = VoiceEngine::new(c).unwrap();

        engine.add_opus_samples(frame("DLH1")).unwrap();
        engine.sync().unwrap();

        // Puffer leeren, dann ueber den Timeout warten
        let mut out = vec![0.0f32; 4096];
        engine.read_samples(&mut out);
        std::thread::sleep(Duration::from_millis(150));
        engine.sync().unwrap();
        assert_eq!(engine.stats().active_speakers, 0);
    }

    #[test]
    fn mehrere_empfaenger() {
        let mut c = config();
        c.frequencies = vec![STANDARD_FREQUENZ_HZ, 118_100_000];
        let engine = VoiceEngine::new(c).unwrap();
        engine.add_opus_samples(frame("DLH1")).unwrap();
        engine.sync().unwrap();
        assert_eq!(engine.receiver(0).map(|rx| rx.active_speakers()), Some(1));
        assert_eq!(engine.receiver(1).map(|rx| rx.active_speakers()), Some(0));

        let mut out = vec![1.0f32; 256];
        assert_eq!(engine.read_samples(&mut out), 256);
        assert!(out.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn start_auf_fremdem_empfaenger_erhoeht_keine_verzoegerung() {
        let mut c = config();
        c.frequencies = vec![STANDARD_FREQUENZ_HZ, 118_100_000];
        let engine = VoiceEngine::new(c).unwrap();
        let cs = Callsign::from("DLH1");
        let mut out = vec![0.0f32; 256];

        for _ in 0..10 {
            engine.speaker_started("DLH1", "A320").unwrap();
            for n in 0..5 {
                let mut f = frame("DLH1");
                if n == 4 {
                    f = f.als_letztes();
                }
                engine.add_opus_samples(f).unwrap();
            }
            engine.sync().unwrap();
            assert_eq!(engine.receiver(1).map(|rx| rx.active_speakers()), Some(1));

            for _ in 0..100 {
                if engine.receiver(0).map(|rx| rx.active_speakers()) == Some(0) {
                    break;
                }
                engine.read_samples(&mut out);
            }
            engine.speaker_stopped("DLH1").unwrap();
            engine.sync().unwrap();
            assert_eq!(engine.stats().active_speakers, 0);
        }

        let stats = engine.stats();
        assert_eq!(stats.underflows, 0);
        assert_eq!(stats.successes, 10);
        // Nach sechs sauberen Sequenzen einmal verringert
        assert_eq!(engine.delay_cache().get(&cs), 40);
    }

    #[test]
    fn frequenz_wechsel_per_kommando() {
        let engine = VoiceEngine::new(config()).unwrap();
        engine.set_frequency(0, 118_100_000).unwrap();
        engine.set_frequency(7, 118_100_000).unwrap();
        engine.sync().unwrap();
        assert_eq!(engine.receiver(0).map(|rx| rx.frequency()), Some(118_100_000));
    }

    #[test]
    fn verbose_wird_geteilt() {
        let engine = VoiceEngine::new(config()).unwrap();
        engine.set_verbose(true);
        assert!(engine.verbose());
        assert!(engine.delay_cache().verbose());
    }
}
