//! Opus Decoder-Adapter (und Encoder fuer Simulation/Tests)
//!
//! Kapselt audiopus. Der Decoder ist pro Sprecher zustandsbehaftet und muss
//! bei jeder Aktivierung eines Sprecher-Slots zurueckgesetzt werden, damit
//! der Praediktionszustand eines frueheren Sprechers nicht nachwirkt.

use std::sync::Arc;

use audiopus::{
    coder::{Decoder, Encoder},
    Application, Channels, SampleRate,
};
use tracing::{debug, warn};

use crate::error::{AudioError, AudioResult};
use skyvoice_core::types::AudioFormat;
use skyvoice_protocol::codec::{
    ChannelCount, OpusApplication, OpusConfig, SampleRate as ProtocolSampleRate,
};

/// Maximale Opus-Frame-Dauer (120 ms) bei 48 kHz
const MAX_FRAME_SAMPLES: usize = 5760;

/// Schnittstelle des Decoder-Adapters
///
/// `decode` liefert bei einem Fehler einen leeren Vektor; der Aufrufer
/// behandelt das als "keine neuen Samples in diesem Takt".
pub trait VoiceDecoder: Send {
    /// Dekodiert einen komprimierten Frame zu 16-Bit-PCM
    fn decode(&mut self, frame: &[u8]) -> Vec<i16>;

    /// Setzt den internen Codec-Zustand zurueck
    fn reset_state(&mut self);
}

/// Erzeugt pro Sprecher-Slot einen eigenen Decoder
pub type DecoderFactory =
    Arc<dyn Fn(AudioFormat) -> AudioResult<Box<dyn VoiceDecoder>> + Send + Sync>;

/// Standard-Factory: ein Opus-Decoder pro Slot
pub fn opus_decoder_factory() -> DecoderFactory {
    Arc::new(|format: AudioFormat| -> AudioResult<Box<dyn VoiceDecoder>> {
        let decoder = OpusDecoder::from_format(format)?;
        Ok(Box::new(decoder) as Box<dyn VoiceDecoder>)
    })
}

/// Opus-Decoder: dekodiert Opus-Bytes zu i16-PCM
pub struct OpusDecoder {
    decoder: Decoder,
    sample_rate: ProtocolSampleRate,
    channels: ChannelCount,
    /// Anzahl fehlgeschlagener Decodierungen seit dem letzten Reset
    fehler_in_folge: u32,
}

impl OpusDecoder {
    /// Erstellt einen neuen Decoder
    pub fn new(sample_rate: ProtocolSampleRate, channels: ChannelCount) -> AudioResult<Self> {
        let decoder = Decoder::new(
            protocol_rate_to_audiopus(sample_rate),
            protocol_channels_to_audiopus(channels),
        )
        .map_err(|e| AudioError::CodecFehler(e.to_string()))?;

        debug!("OpusDecoder erstellt: {:?} {:?}", sample_rate, channels);

        Ok(Self {
            decoder,
            sample_rate,
            channels,
            fehler_in_folge: 0,
        })
    }

    /// Erstellt einen Decoder passend zum Ausgabeformat der Pipeline
    pub fn from_format(format: AudioFormat) -> AudioResult<Self> {
        let rate = ProtocolSampleRate::from_hz(format.sample_rate).ok_or_else(|| {
            AudioError::Konfiguration(format!(
                "Abtastrate {} Hz wird von Opus nicht unterstuetzt",
                format.sample_rate
            ))
        })?;
        let channels = match format.channels {
            1 => ChannelCount::Mono,
            2 => ChannelCount::Stereo,
            n => {
                return Err(AudioError::Konfiguration(format!(
                    "Kanalanzahl {} wird nicht unterstuetzt",
                    n
                )))
            }
        };
        Self::new(rate, channels)
    }

    /// Dekodiert Opus-Bytes zu i16-PCM
    pub fn decode_frame(&mut self, opus_data: &[u8]) -> AudioResult<Vec<i16>> {
        if opus_data.is_empty() {
            return Err(AudioError::CodecFehler("leerer Frame".into()));
        }

        let mut output = vec![0i16; MAX_FRAME_SAMPLES * self.channels as usize];
        let decoded = self
            .decoder
            .decode(Some(opus_data), &mut output, false)
            .map_err(|e| AudioError::CodecFehler(e.to_string()))?;

        output.truncate(decoded * self.channels as usize);
        Ok(output)
    }

    /// Anzahl fehlgeschlagener Decodierungen in Folge
    pub fn fehler_in_folge(&self) -> u32 {
        self.fehler_in_folge
    }

    pub fn sample_rate(&self) -> ProtocolSampleRate {
        self.sample_rate
    }

    pub fn channels(&self) -> ChannelCount {
        self.channels
    }
}

impl VoiceDecoder for OpusDecoder {
    fn decode(&mut self, frame: &[u8]) -> Vec<i16> {
        match self.decode_frame(frame) {
            Ok(pcm) => {
                self.fehler_in_folge = 0;
                pcm
            }
            Err(e) => {
                self.fehler_in_folge += 1;
                warn!(
                    bytes = frame.len(),
                    in_folge = self.fehler_in_folge,
                    "Opus-Frame nicht dekodierbar: {}",
                    e
                );
                Vec::new()
            }
        }
    }

    fn reset_state(&mut self) {
        // Neuer Decoder statt CTL-Aufruf: garantiert sauberen Zustand
        match Decoder::new(
            protocol_rate_to_audiopus(self.sample_rate),
            protocol_channels_to_audiopus(self.channels),
        ) {
            Ok(decoder) => {
                self.decoder = decoder;
                self.fehler_in_folge = 0;
            }
            Err(e) => warn!("Opus-Decoder Reset fehlgeschlagen: {}", e),
        }
    }
}

/// Opus-Encoder: kodiert f32-PCM zu Opus-Bytes
///
/// Die Pipeline selbst kodiert nicht; der Encoder erzeugt realistische
/// Frames fuer die Simulation und fuer Tests.
pub struct OpusEncoder {
    encoder: Encoder,
    config: OpusConfig,
    frame_size: usize,
}

impl OpusEncoder {
    /// Erstellt einen neuen Encoder mit der gegebenen Konfiguration
    pub fn new(config: OpusConfig) -> AudioResult<Self> {
        config.validieren().map_err(AudioError::Konfiguration)?;

        let mut encoder = Encoder::new(
            protocol_rate_to_audiopus(config.sample_rate),
            protocol_channels_to_audiopus(config.channels),
            protocol_app_to_audiopus(config.application),
        )
        .map_err(|e| AudioError::CodecFehler(e.to_string()))?;

        encoder
            .set_bitrate(audiopus::Bitrate::BitsPerSecond(
                (config.bitrate_kbps as i32) * 1000,
            ))
            .map_err(|e| AudioError::CodecFehler(e.to_string()))?;

        encoder
            .set_complexity(config.complexity)
            .map_err(|e| AudioError::CodecFehler(e.to_string()))?;

        encoder
            .set_vbr(config.vbr_enabled)
            .map_err(|e| AudioError::CodecFehler(e.to_string()))?;

        encoder
            .set_inband_fec(config.fec_enabled)
            .map_err(|e| AudioError::CodecFehler(e.to_string()))?;

        let frame_size = config.samples_per_frame();

        debug!(
            "OpusEncoder erstellt: {}kbps, {:?}, frame_size={}",
            config.bitrate_kbps, config.sample_rate, frame_size
        );

        Ok(Self {
            encoder,
            config,
            frame_size,
        })
    }

    /// Kodiert einen PCM-Frame (f32, normalisiert -1.0..1.0) zu Opus-Bytes
    ///
    /// Die Eingabe muss exakt `frame_size()` Samples lang sein.
    pub fn encode(&mut self, pcm: &[f32]) -> AudioResult<Vec<u8>> {
        if pcm.len() != self.frame_size {
            return Err(AudioError::Konfiguration(format!(
                "PCM-Frame muss {} Samples lang sein, war {}",
                self.frame_size,
                pcm.len()
            )));
        }

        // 4000 Bytes reichen fuer jeden Opus-Frame
        let mut output = vec![0u8; 4000];
        let written = self
            .encoder
            .encode_float(pcm, &mut output)
            .map_err(|e| AudioError::CodecFehler(e.to_string()))?;

        output.truncate(written);
        Ok(output)
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn config(&self) -> &OpusConfig {
        &self.config
    }
}

// ---------------------------------------------------------------------------
// Konvertierungs-Hilfsfunktionen
// ---------------------------------------------------------------------------

fn protocol_rate_to_audiopus(rate: ProtocolSampleRate) -> SampleRate {
    match rate {
        ProtocolSampleRate::Hz8000 => SampleRate::Hz8000,
        ProtocolSampleRate::Hz12000 => SampleRate::Hz12000,
        ProtocolSampleRate::Hz16000 => SampleRate::Hz16000,
        ProtocolSampleRate::Hz24000 => SampleRate::Hz24000,
        ProtocolSampleRate::Hz48000 => SampleRate::Hz48000,
    }
}

fn protocol_channels_to_audiopus(ch: ChannelCount) -> Channels {
    match ch {
        ChannelCount::Mono => Channels::Mono,
        ChannelCount::Stereo => Channels::Stereo,
    }
}

fn protocol_app_to_audiopus(app: OpusApplication) -> Application {
    match app {
        OpusApplication::Voip => Application::Voip,
        OpusApplication::Audio => Application::Audio,
        OpusApplication::RestrictedLowdelay => Application::LowDelay,
    }
}
