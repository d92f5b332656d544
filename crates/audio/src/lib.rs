//! skyvoice-audio – Empfangsseitige Sprecher-Pipeline
//!
//! Vom komprimierten Frame bis zum Lautsprecher-Block:
//! - Opus-Decoding pro Sprecher (zustandsbehaftet, Reset bei Aktivierung)
//! - Ringpuffer mit adaptiver Vorlauf-Verzoegerung pro Rufzeichen
//! - Funk-Emulation: Kompressor, Equalizer, Rauschen, Knistern, Brummen
//! - Pull-basierter Mixer, der nie blockiert
//! - Steuer-Thread mit Leerlauf-Ueberwachung

pub mod buffered;
pub mod callsign;
pub mod codec;
pub mod delay_cache;
pub mod dsp;
pub mod effects;
pub mod engine;
pub mod error;
pub mod generators;
pub mod mixer;
pub mod params;
pub mod provider;
pub mod receiver;
pub mod stats;

// Bequeme Re-Exporte der wichtigsten Typen
pub use buffered::BufferedWaveProvider;
pub use callsign::{CallsignSampleProvider, ProviderContext};
pub use codec::{opus_decoder_factory, DecoderFactory, OpusDecoder, OpusEncoder, VoiceDecoder};
pub use delay_cache::{CallsignDelayCache, DelayCacheConfig, DelayRecord};
pub use dsp::AudioProcessor;
pub use effects::{crackle_factor, select_effects, EffectInputs, EffectParameters};
pub use engine::{EngineCommand, EngineConfig, VoiceEngine};
pub use error::{AudioError, AudioResult};
pub use generators::{ResourceSoundSampleProvider, Samples, SawtoothGenerator};
pub use mixer::{InputId, MixingSampleProvider};
pub use params::{SharedFlag, SharedFrequency, SharedGain};
pub use provider::{SampleProvider, SilenceProvider};
pub use receiver::ReceiverSampleProvider;
pub use stats::{AudioStats, PipelineCounters};
