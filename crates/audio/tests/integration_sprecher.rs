//! Integration-Tests fuer den Sprecher-Provider (deterministischer Stub-Codec)

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use skyvoice_audio::{
    AudioResult, CallsignDelayCache, CallsignSampleProvider, DecoderFactory, ProviderContext,
    SampleProvider, Samples, VoiceDecoder,
};
use skyvoice_core::types::{AircraftType, AudioFormat, Callsign};
use skyvoice_protocol::voice::RxAudio;

const FREQUENZ: u32 = 122_800_000;

/// Zaehlt Frames seit dem letzten Reset; jedes Sample traegt den Zaehlerstand
struct ZaehlDecoder {
    seit_reset: i16,
    resets: Arc<AtomicUsize>,
}

impl VoiceDecoder for ZaehlDecoder {
    fn decode(&mut self, frame: &[u8]) -> Vec<i16> {
        if frame.is_empty() {
            return Vec::new();
        }
        self.seit_reset += 1;
        vec![self.seit_reset * 1000; 160]
    }

    fn reset_state(&mut self) {
        self.seit_reset = 0;
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

struct Aufbau {
    provider: CallsignSampleProvider,
    cache: Arc<CallsignDelayCache>,
    resets: Arc<AtomicUsize>,
}

fn aufbau() -> Aufbau {
    let resets = Arc::new(AtomicUsize::new(0));
    let resets_factory = Arc::clone(&resets);
    let factory: DecoderFactory = Arc::new(move |_: AudioFormat| -> AudioResult<Box<dyn VoiceDecoder>> {
        Ok(Box::new(ZaehlDecoder {
            seit_reset: 0,
            resets: Arc::clone(&resets_factory),
        }) as Box<dyn VoiceDecoder>)
    });

    let cache = Arc::new(CallsignDelayCache::default());
    let mut ctx = ProviderContext::new(AudioFormat::mono(8000), Arc::clone(&cache))
        .with_decoder_factory(factory);
    // Laute Clips: jede falsch gesetzte Verstaerkung faellt sofort auf
    ctx.samples = Samples::from_pcm(vec![0.9; 100], vec![-0.9; 100], vec![0.7; 100]);

    let provider = CallsignSampleProvider::new(&ctx).expect("Provider sollte erstellbar sein");
    Aufbau {
        provider,
        cache,
        resets,
    }
}

fn frame(cs: &str, seq: u32) -> RxAudio {
    RxAudio::new(cs, seq, Bytes::from_static(&[0x42]), FREQUENZ)
}

fn lesen_bis_leerlauf(provider: &mut CallsignSampleProvider) {
    let mut out = vec![0.0f32; 256];
    for _ in 0..1000 {
        if !provider.in_use() {
            return;
        }
        provider.read_samples(&mut out);
    }
    panic!("Provider ist nicht in den Leerlauf gegangen");
}

#[test]
fn szenario_a_saubere_sequenz() {
    let Aufbau {
        mut provider, cache, ..
    } = aufbau();
    let cs = Callsign::from("DLH123");

    provider.active(&cs, &AircraftType::from("A320"));
    for seq in 0..5 {
        let mut f = frame("DLH123", seq);
        if seq == 4 {
            f = f.als_letztes();
        }
        provider.add_opus_samples(&f, 1.0);
    }
    // 60 ms Vorlauf bei 8 kHz plus 5 x 160 Samples
    assert_eq!(provider.buffered_sample_count(), 480 + 800);

    lesen_bis_leerlauf(&mut provider);

    let record = cache.snapshot(&cs).expect("Eintrag sollte existieren");
    assert_eq!(record.successes, 1);
    assert_eq!(record.underflows, 0);
    assert_eq!(record.delay_ms, 60);
    assert!(provider.callsign().is_empty());
}

#[test]
fn szenario_b_leerer_puffer_meldet_einen_unterlauf() {
    let Aufbau {
        mut provider, cache, ..
    } = aufbau();
    let cs = Callsign::from("BAW9");

    provider.active(&cs, &AircraftType::default());
    let mut out = vec![0.0f32; 256];
    for _ in 0..50 {
        assert_eq!(provider.read_samples(&mut out), 256);
    }

    let record = cache.snapshot(&cs).expect("Eintrag sollte existieren");
    assert_eq!(record.underflows, 1);
    assert_eq!(record.delay_ms, 80);
    assert!(provider.underflow());
    assert!(provider.in_use());
}

#[test]
fn decoder_wird_bei_reaktivierung_zurueckgesetzt() {
    let Aufbau {
        mut provider,
        resets,
        ..
    } = aufbau();
    // Bypass: der Puffer-Inhalt erscheint unveraendert am Ausgang
    provider.set_bypass_effects(true);

    let cs = Callsign::from("AFR1");
    provider.active(&cs, &AircraftType::default());
    provider.add_opus_samples(&frame("AFR1", 0), 1.0);
    provider.add_opus_samples(&frame("AFR1", 1), 1.0);
    provider.clear();

    // Zweites Rufzeichen auf derselben Instanz
    provider.active(&Callsign::from("KLM2"), &AircraftType::default());
    assert_eq!(resets.load(Ordering::SeqCst), 2);
    provider.add_opus_samples(&frame("KLM2", 0), 1.0);

    let mut vorlauf = vec![1.0f32; 480];
    provider.read_samples(&mut vorlauf);
    assert!(vorlauf.iter().all(|&s| s == 0.0));

    let mut sprache = vec![0.0f32; 160];
    provider.read_samples(&mut sprache);
    let erwartet = 1000.0 / 32768.0;
    assert!(
        sprache.iter().all(|&s| (s - erwartet).abs() < 1e-6),
        "erster Frame nach Reset muss den Zaehlerstand 1 tragen"
    );
}

#[test]
fn leerlauf_ist_exakt_still() {
    let Aufbau { mut provider, .. } = aufbau();
    let cs = Callsign::from("EZY77");

    provider.active(&cs, &AircraftType::default());
    provider.add_opus_samples(&frame("EZY77", 0), 0.2);

    let mut out = vec![0.0f32; 128];
    provider.read_samples(&mut out);
    assert!(out.iter().any(|&s| s != 0.0), "aktiv sollte hoerbar sein");

    provider.idle();
    for _ in 0..20 {
        provider.read_samples(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    provider.active(&cs, &AircraftType::default());
    provider.add_opus_samples(&frame("EZY77", 1), 0.2);
    provider.clear();
    assert_eq!(provider.buffered_sample_count(), 0);
    for _ in 0..20 {
        provider.read_samples(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }
}

#[test]
fn bypass_ist_idempotent() {
    let Aufbau { mut provider, .. } = aufbau();
    provider.active(&Callsign::from("KLM5"), &AircraftType::default());
    provider.add_opus_samples(&frame("KLM5", 0), 0.3);

    provider.set_bypass_effects(true);
    let einmal = provider.effect_parameters();
    provider.set_bypass_effects(true);
    assert_eq!(provider.effect_parameters(), einmal);

    provider.set_bypass_effects(false);
    let aus = provider.effect_parameters();
    provider.set_bypass_effects(true);
    provider.set_bypass_effects(false);
    provider.set_bypass_effects(false);
    assert_eq!(provider.effect_parameters(), aus);
    assert!(aus.compressor_enabled);
}

#[test]
fn bypass_liefert_nur_sprache() {
    let Aufbau { mut provider, .. } = aufbau();
    provider.set_bypass_effects(true);
    provider.active(&Callsign::from("SAS3"), &AircraftType::default());

    // Nur Vorlauf gepuffert: trotz lauter Clips muss der Ausgang still sein
    let mut out = vec![1.0f32; 480];
    provider.read_samples(&mut out);
    assert!(out.iter().all(|&s| s == 0.0));
}

#[test]
fn verzoegerung_waechst_monoton_bis_zum_maximum() {
    let Aufbau {
        mut provider, cache, ..
    } = aufbau();
    let cs = Callsign::from("RYR4");
    let mut out = vec![0.0f32; 1024];
    let mut vorher = 0;

    for runde in 0..20 {
        provider.active(&cs, &AircraftType::default());
        // Vorlauf abspielen, Puffer laeuft leer
        for _ in 0..4 {
            provider.read_samples(&mut out);
        }
        provider.clear();

        let jetzt = cache.get(&cs);
        assert!(jetzt >= vorher, "Runde {}: {} < {}", runde, jetzt, vorher);
        assert!(jetzt <= 300);
        vorher = jetzt;
    }
    assert_eq!(vorher, 300);
}
