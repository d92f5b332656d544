//! Sprecher-Provider: ein Rufzeichen, eine Effektkette
//!
//! Aufbau des Graphen pro Slot:
//!
//! ```text
//! Ringpuffer -> Kompressor -> Equalizer --+
//! Knistern ------------------------------+
//! Weisses Rauschen ----------------------+--> Mixer --> Ausgabe
//! Kurzwellen-Rauschen -------------------+
//! Bordnetz-Brummen (400 Hz) -------------+
//! ```
//!
//! Der Provider kennt zwei Zustaende: Leerlauf und aktiv. Steuer-Aufrufe
//! (`active`, `add_opus_samples`, `tick_at`, ...) kommen aus dem
//! Steuer-Thread, `read_samples` aus dem Audio-Thread. Beide greifen ueber
//! denselben Mutex des Empfaenger-Slots zu.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::buffered::{BufferedWaveProvider, STANDARD_MAX_PUFFER_MS};
use crate::codec::{opus_decoder_factory, DecoderFactory, VoiceDecoder};
use crate::delay_cache::CallsignDelayCache;
use crate::dsp::{EqualizerPreset, EqualizerSampleProvider, SimpleCompressorEffect};
use crate::effects::{select_effects, EffectInputs, EffectParameters};
use crate::error::AudioResult;
use crate::generators::{
    ResourceSoundSampleProvider, Samples, SawtoothGenerator, BORDNETZ_FREQUENZ_HZ,
};
use crate::mixer::MixingSampleProvider;
use crate::params::{SharedFlag, SharedFrequency, SharedGain, STANDARD_FREQUENZ_HZ};
use crate::provider::{i16_to_f32, SampleProvider};
use crate::stats::PipelineCounters;
use skyvoice_core::types::{AircraftType, AudioFormat, Callsign};
use skyvoice_protocol::voice::RxAudio;

/// Make-up-Gain des Kompressors in dB
pub const KOMPRESSOR_MAKE_UP_DB: f32 = -5.5;

/// Ohne neue Samples gilt ein Sprecher nach dieser Zeit als verstummt
pub const STANDARD_IDLE_TIMEOUT: Duration = Duration::from_millis(500);

/// Takt der Leerlauf-Ueberwachung
pub const STANDARD_TICK_INTERVALL: Duration = Duration::from_millis(100);

/// Alles, was ein Sprecher-Provider von seiner Umgebung braucht
#[derive(Clone)]
pub struct ProviderContext {
    pub format: AudioFormat,
    pub delay_cache: Arc<CallsignDelayCache>,
    pub samples: Samples,
    /// Frequenz des besitzenden Empfaengers
    pub frequency: SharedFrequency,
    pub counters: Arc<PipelineCounters>,
    pub decoder_factory: DecoderFactory,
    pub idle_timeout: Duration,
    pub max_buffered_ms: u32,
    /// Ausfuehrliches Logging der Zustandswechsel
    pub verbose: SharedFlag,
}

impl ProviderContext {
    /// Kontext mit Opus-Decoder, synthetisierten Clips und Standardwerten
    pub fn new(format: AudioFormat, delay_cache: Arc<CallsignDelayCache>) -> Self {
        Self {
            format,
            delay_cache,
            samples: Samples::synthesize(format, crate::generators::samples::STANDARD_SEED),
            frequency: SharedFrequency::new(STANDARD_FREQUENZ_HZ),
            counters: Arc::new(PipelineCounters::default()),
            decoder_factory: opus_decoder_factory(),
            idle_timeout: STANDARD_IDLE_TIMEOUT,
            max_buffered_ms: STANDARD_MAX_PUFFER_MS,
            verbose: SharedFlag::new(false),
        }
    }

    /// Ersetzt den Decoder (z.B. durch einen deterministischen Stub)
    pub fn with_decoder_factory(mut self, factory: DecoderFactory) -> Self {
        self.decoder_factory = factory;
        self
    }
}

/// Handles auf die Parameter der Knoten im Mixer
struct EffektHandles {
    crackle: SharedGain,
    white_noise: SharedGain,
    hf_white_noise: SharedGain,
    ac_bus: SharedGain,
    compressor_enabled: SharedFlag,
    eq_bypass: SharedFlag,
    eq_output_gain: SharedGain,
}

impl EffektHandles {
    fn anwenden(&self, p: &EffectParameters) {
        self.crackle.set(p.crackle_gain);
        self.white_noise.set(p.white_noise_gain);
        self.hf_white_noise.set(p.hf_white_noise_gain);
        self.ac_bus.set(p.ac_bus_gain);
        self.compressor_enabled.set(p.compressor_enabled);
        self.eq_bypass.set(p.equalizer_bypass);
        self.eq_output_gain.set(p.equalizer_output_gain);
    }
}

/// Wiedergabe-Slot fuer genau einen Sprecher zur Zeit
pub struct CallsignSampleProvider {
    format: AudioFormat,
    callsign: Callsign,
    aircraft_type: AircraftType,

    in_use: bool,
    underflow: bool,
    last_packet_latch: bool,
    idle_watch_active: bool,
    /// Per Start-Ereignis belegt, noch kein Frame empfangen
    wartet_auf_audio: bool,
    last_samples_added: Instant,
    distance_ratio: f32,
    bypass_effects: bool,
    effekte: EffectParameters,

    decoder: Box<dyn VoiceDecoder>,
    audio_input: BufferedWaveProvider,
    mixer: MixingSampleProvider,
    handles: EffektHandles,
    /// Konvertierte Decoder-Ausgabe, wird wiederverwendet
    pcm: Vec<f32>,

    delay_cache: Arc<CallsignDelayCache>,
    counters: Arc<PipelineCounters>,
    frequency: SharedFrequency,
    idle_timeout: Duration,
    verbose: SharedFlag,
}

impl CallsignSampleProvider {
    /// Baut den Graphen eines Slots auf (Leerlauf, alles stumm)
    pub fn new(ctx: &ProviderContext) -> AudioResult<Self> {
        let format = ctx.format;
        let decoder = (ctx.decoder_factory)(format)?;
        let audio_input = BufferedWaveProvider::new(format, ctx.max_buffered_ms);

        let mut kompressor = SimpleCompressorEffect::new(audio_input.clone(), format.sample_rate);
        kompressor.set_make_up_gain(KOMPRESSOR_MAKE_UP_DB);
        let compressor_enabled = kompressor.enabled_handle();

        let voice_eq =
            EqualizerSampleProvider::new(kompressor, EqualizerPreset::VhfEmulation, format.sample_rate);
        let eq_bypass = voice_eq.bypass_handle();
        let eq_output_gain = voice_eq.output_gain_handle();

        let crackle = ResourceSoundSampleProvider::new(ctx.samples.crackle(), true);
        let white_noise = ResourceSoundSampleProvider::new(ctx.samples.white_noise(), true);
        let hf_white_noise = ResourceSoundSampleProvider::new(ctx.samples.hf_white_noise(), true);
        let ac_bus = SawtoothGenerator::new(format, BORDNETZ_FREQUENZ_HZ);

        let handles = EffektHandles {
            crackle: crackle.gain_handle(),
            white_noise: white_noise.gain_handle(),
            hf_white_noise: hf_white_noise.gain_handle(),
            ac_bus: ac_bus.gain_handle(),
            compressor_enabled,
            eq_bypass,
            eq_output_gain,
        };

        let mut mixer = MixingSampleProvider::new();
        mixer.add_input(Box::new(crackle));
        mixer.add_input(Box::new(white_noise));
        mixer.add_input(Box::new(ac_bus));
        mixer.add_input(Box::new(hf_white_noise));
        mixer.add_input(Box::new(voice_eq));

        let mut provider = Self {
            format,
            callsign: Callsign::default(),
            aircraft_type: AircraftType::default(),
            in_use: false,
            underflow: false,
            last_packet_latch: false,
            idle_watch_active: false,
            wartet_auf_audio: false,
            last_samples_added: Instant::now(),
            distance_ratio: 1.0,
            bypass_effects: false,
            effekte: EffectParameters::stumm(),
            decoder,
            audio_input,
            mixer,
            handles,
            pcm: Vec::new(),
            delay_cache: Arc::clone(&ctx.delay_cache),
            counters: Arc::clone(&ctx.counters),
            frequency: ctx.frequency.clone(),
            idle_timeout: ctx.idle_timeout,
            verbose: ctx.verbose.clone(),
        };
        provider.set_effects(false);
        Ok(provider)
    }

    /// Belegt den Slot fuer ein Rufzeichen und legt den Vorlauf an
    pub fn active(&mut self, callsign: &Callsign, aircraft_type: &AircraftType) {
        if !self.aktivieren(callsign, aircraft_type) {
            return;
        }
        self.set_effects(false);
        self.underflow = false;

        let delay_ms = self.delay_cache.get(callsign);
        if self.verbose.get() {
            debug!(callsign = %callsign, delay_ms, "Sprecher aktiv");
        }
        if delay_ms > 0 {
            self.audio_input.add_silence(self.format.samples_for_ms(delay_ms));
        }
    }

    /// Wie `active`, aber Unterlaeufe zaehlen erst ab dem ersten Frame
    ///
    /// Fuer Start-Ereignisse ohne Frequenz: Empfaenger, auf denen der
    /// Sprecher nie zu hoeren ist, duerfen seine Verzoegerung nicht erhoehen.
    pub fn active_awaiting_audio(&mut self, callsign: &Callsign, aircraft_type: &AircraftType) {
        self.active(callsign, aircraft_type);
        self.wartet_auf_audio = self.in_use;
    }

    /// Wie `active`, aber ohne Vorlauf, stumm und ohne Unterlauf-Meldung
    pub fn active_silent(&mut self, callsign: &Callsign, aircraft_type: &AircraftType) {
        if !self.aktivieren(callsign, aircraft_type) {
            return;
        }
        self.set_effects(true);
        self.underflow = true;

        if self.verbose.get() {
            debug!(callsign = %callsign, "Sprecher aktiv (stumm)");
        }
    }

    fn aktivieren(&mut self, callsign: &Callsign, aircraft_type: &AircraftType) -> bool {
        if callsign.is_empty() {
            warn!("Aktivierung ohne Rufzeichen ignoriert");
            return false;
        }
        self.callsign = callsign.clone();
        self.delay_cache.initialise(callsign);
        self.aircraft_type = aircraft_type.clone();
        self.decoder.reset_state();
        self.in_use = true;
        // Auch ohne Frames muss der Slot wieder frei werden
        self.ankunft_merken();
        true
    }

    /// Dekodiert einen Frame und haengt ihn an den Puffer
    pub fn add_opus_samples(&mut self, audio: &RxAudio, distance_ratio: f32) {
        self.distance_ratio = distance_ratio;
        self.set_effects(false);

        let pcm = self.decoder.decode(&audio.audio);
        if pcm.is_empty() {
            self.counters.decode_failure();
        } else {
            self.counters.frame_decoded();
            self.pcm.clear();
            i16_to_f32(&pcm, &mut self.pcm);
            self.audio_input.add_samples(&self.pcm);
        }

        self.last_packet_latch = audio.last_packet;
        if audio.last_packet && !self.underflow {
            if self.verbose.get() {
                debug!(callsign = %self.callsign, "Sprechsequenz ohne Unterlauf");
            }
            self.delay_cache.success(&self.callsign);
            self.counters.burst_ok();
        }

        self.ankunft_merken();
    }

    /// Frame ohne hoerbares Audio (z.B. eigenes Echo): nur Zustand pflegen
    pub fn add_silent_samples(&mut self, audio: &RxAudio) {
        self.set_effects(true);
        self.last_packet_latch = audio.last_packet;
        self.ankunft_merken();
    }

    fn ankunft_merken(&mut self) {
        self.wartet_auf_audio = false;
        self.last_samples_added = Instant::now();
        self.idle_watch_active = true;
    }

    /// Leerlauf-Pruefung, vom Steuer-Thread im 100-ms-Takt aufgerufen
    pub fn tick_at(&mut self, jetzt: Instant) {
        if !self.idle_watch_active || !self.in_use || !self.audio_input.is_empty() {
            return;
        }
        if jetzt.saturating_duration_since(self.last_samples_added) > self.idle_timeout {
            if self.verbose.get() {
                debug!(callsign = %self.callsign, "Keine Samples mehr, Slot wird frei");
            }
            self.idle();
        }
    }

    /// Gibt den Slot frei
    pub fn idle(&mut self) {
        self.idle_watch_active = false;
        self.wartet_auf_audio = false;
        self.in_use = false;
        self.set_effects(false);
        if self.verbose.get() && !self.callsign.is_empty() {
            debug!(callsign = %self.callsign, "Sprecher im Leerlauf");
        }
        self.callsign.clear();
        self.aircraft_type.clear();
    }

    /// Leerlauf und Puffer verwerfen
    pub fn clear(&mut self) {
        self.idle();
        self.audio_input.clear();
    }

    pub fn set_bypass_effects(&mut self, bypass: bool) {
        self.bypass_effects = bypass;
        self.set_effects(false);
    }

    fn set_effects(&mut self, no_effects: bool) {
        let params = select_effects(EffectInputs {
            bypass: self.bypass_effects || no_effects,
            in_use: self.in_use,
            frequency_hz: self.frequency.get(),
            distance_ratio: self.distance_ratio,
        });
        self.handles.anwenden(&params);
        self.effekte = params;
    }

    pub fn callsign(&self) -> &Callsign {
        &self.callsign
    }

    pub fn aircraft_type(&self) -> &AircraftType {
        &self.aircraft_type
    }

    pub fn in_use(&self) -> bool {
        self.in_use
    }

    pub fn underflow(&self) -> bool {
        self.underflow
    }

    pub fn last_packet_latch(&self) -> bool {
        self.last_packet_latch
    }

    pub fn idle_watch_active(&self) -> bool {
        self.idle_watch_active
    }

    pub fn awaiting_audio(&self) -> bool {
        self.wartet_auf_audio
    }

    pub fn distance_ratio(&self) -> f32 {
        self.distance_ratio
    }

    pub fn bypass_effects(&self) -> bool {
        self.bypass_effects
    }

    /// Zuletzt angewendete Effekt-Parameter
    pub fn effect_parameters(&self) -> EffectParameters {
        self.effekte
    }

    pub fn buffered_sample_count(&self) -> usize {
        self.audio_input.buffered_sample_count()
    }

    pub fn dropped_samples(&self) -> u64 {
        self.audio_input.dropped_samples()
    }
}

impl SampleProvider for CallsignSampleProvider {
    fn read_samples(&mut self, samples: &mut [f32]) -> usize {
        let war_aktiv = self.in_use;
        let n = self.mixer.read_samples(samples);
        if !war_aktiv {
            // Leerlauf ist exakt still, der Mixer wurde nur geleert
            samples.fill(0.0);
        }

        if self.in_use && self.last_packet_latch && self.audio_input.is_empty() {
            self.idle();
            self.last_packet_latch = false;
        }

        if self.in_use
            && !self.underflow
            && !self.wartet_auf_audio
            && self.audio_input.is_empty()
        {
            if self.verbose.get() {
                debug!(callsign = %self.callsign, "Puffer leer, Verzoegerung steigt");
            }
            self.delay_cache.underflow(&self.callsign);
            self.counters.underflow();
            self.underflow = true;
        }

        n
    }
}
