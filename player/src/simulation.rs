//! Simulierte Sender
//!
//! Jedes Rufzeichen laeuft als eigener Task: es kodiert einen Sprachersatz
//! (modulierter Ton) mit Opus und liefert die Frames mit zufaelligem
//! Ankunfts-Jitter an die Engine, so wie es die Netzwerk-Schicht nach dem
//! Sortieren tun wuerde.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use skyvoice_audio::{OpusEncoder, VoiceEngine};
use skyvoice_core::types::{AircraftType, Callsign};
use skyvoice_protocol::codec::OpusConfig;
use skyvoice_protocol::voice::RxAudio;
use tracing::{debug, info};

use crate::config::SimulationEinstellungen;

const PRAEFIXE: [&str; 6] = ["DLH", "BAW", "AFR", "KLM", "EZY", "SAS"];
const TYPEN: [&str; 4] = ["A320", "B738", "E190", "A321"];

/// Ablaufplan eines simulierten Senders
#[derive(Debug, Clone)]
pub struct SprecherPlan {
    pub callsign: Callsign,
    pub aircraft_type: AircraftType,
    pub frequency_hz: u32,
    /// Grundton des Sprachersatzes
    pub ton_hz: f32,
    pub entfernung: f32,
    pub sequenzen: u32,
    pub frames_pro_sequenz: u32,
    pub jitter_ms: u64,
    pub pause: Duration,
    pub verlust_quote: f64,
    pub codec: OpusConfig,
    pub seed: u64,
}

impl SprecherPlan {
    /// Erstellt die Plaene fuer alle Sender; Frequenzen werden reihum vergeben
    pub fn alle(sim: &SimulationEinstellungen, frequenzen: &[u32]) -> Vec<Self> {
        (0..sim.sprecher as usize)
            .filter_map(|i| {
                let frequency_hz = *frequenzen.get(i % frequenzen.len().max(1))?;
                Some(Self {
                    callsign: Callsign::new(format!(
                        "{}{}",
                        PRAEFIXE[i % PRAEFIXE.len()],
                        100 + i * 7
                    )),
                    aircraft_type: AircraftType::new(TYPEN[i % TYPEN.len()]),
                    frequency_hz,
                    ton_hz: 180.0 + 45.0 * i as f32,
                    entfernung: sim.entfernung,
                    sequenzen: sim.sequenzen,
                    frames_pro_sequenz: sim.frames_pro_sequenz.max(1),
                    jitter_ms: sim.jitter_ms,
                    pause: Duration::from_millis(sim.pause_ms),
                    verlust_quote: sim.verlust_quote,
                    codec: sim.preset.config(),
                    seed: sim.seed.wrapping_add(i as u64),
                })
            })
            .collect()
    }
}

/// Was ein Sender tatsaechlich abgeschickt hat
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SprecherBericht {
    pub gesendet: u64,
    pub verloren: u64,
}

/// Erzeugt einen Frame Sprachersatz: Grundton mit Obertoenen und Silbenrhythmus
pub fn sprach_frame(plan: &SprecherPlan, frame_index: usize, frame_size: usize) -> Vec<f32> {
    let rate = plan.codec.sample_rate.as_hz() as f32;
    (0..frame_size)
        .map(|i| {
            let t = (frame_index * frame_size + i) as f32 / rate;
            let phase = 2.0 * std::f32::consts::PI * plan.ton_hz * t;
            let silben = 0.55 + 0.45 * (2.0 * std::f32::consts::PI * 4.0 * t).sin();
            (phase.sin() + 0.5 * (2.0 * phase).sin() + 0.25 * (3.0 * phase).sin())
                * 0.3
                * silben
        })
        .collect()
}

/// Spielt den Plan eines Senders ab
pub async fn sprecher_ausfuehren(
    engine: Arc<VoiceEngine>,
    plan: SprecherPlan,
) -> Result<SprecherBericht> {
    let mut encoder = OpusEncoder::new(plan.codec.clone())?;
    let mut rng = StdRng::seed_from_u64(plan.seed);
    let frame_size = encoder.frame_size();
    let frame_dauer = Duration::from_secs_f32(plan.codec.frame_size.as_ms() / 1000.0);
    let mut bericht = SprecherBericht::default();
    let mut sequenz: u32 = 0;

    for runde in 0..plan.sequenzen {
        info!(
            callsign = %plan.callsign,
            frequenz = plan.frequency_hz,
            runde,
            aircraft_type = %plan.aircraft_type,
            "Sender tastet"
        );

        // Start-Ereignisse tragen keine Frequenz, der erste Frame belegt den Slot
        for n in 0..plan.frames_pro_sequenz {
            let letzter = n + 1 == plan.frames_pro_sequenz;
            let pcm = sprach_frame(&plan, n as usize, frame_size);
            let opus = encoder.encode(&pcm)?;
            sequenz = sequenz.wrapping_add(1);

            // Der letzte Frame geht nie verloren, sonst endet die Sequenz im Unterlauf
            if !letzter && plan.verlust_quote > 0.0 && rng.gen_bool(plan.verlust_quote) {
                bericht.verloren += 1;
                debug!(callsign = %plan.callsign, sequenz, "Paket verworfen");
            } else {
                let mut audio = RxAudio::new(plan.callsign.clone(), sequenz, opus, plan.frequency_hz)
                    .mit_entfernung(plan.entfernung);
                if letzter {
                    audio = audio.als_letztes();
                }
                engine.add_opus_samples(audio)?;
                bericht.gesendet += 1;
            }

            tokio::time::sleep(jitter_dauer(&mut rng, frame_dauer, plan.jitter_ms)).await;
        }

        engine.speaker_stopped(plan.callsign.clone())?;
        tokio::time::sleep(plan.pause).await;
    }

    Ok(bericht)
}

/// Abstand bis zum naechsten Paket: Frame-Dauer plus/minus Jitter
fn jitter_dauer(rng: &mut StdRng, frame_dauer: Duration, jitter_ms: u64) -> Duration {
    if jitter_ms == 0 {
        return frame_dauer;
    }
    let versatz = rng.gen_range(0..=2 * jitter_ms) as i64 - jitter_ms as i64;
    let ms = frame_dauer.as_millis() as i64 + versatz;
    Duration::from_millis(ms.max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plaene_verteilen_frequenzen_reihum() {
        let sim = SimulationEinstellungen {
            sprecher: 3,
            ..Default::default()
        };
        let plaene = SprecherPlan::alle(&sim, &[118_700_000, 5_680_000]);
        assert_eq!(plaene.len(), 3);
        assert_eq!(plaene[0].frequency_hz, 118_700_000);
        assert_eq!(plaene[1].frequency_hz, 5_680_000);
        assert_eq!(plaene[2].frequency_hz, 118_700_000);
        assert_ne!(plaene[0].callsign, plaene[1].callsign);
    }

    #[test]
    fn keine_frequenzen_keine_plaene() {
        let plaene = SprecherPlan::alle(&SimulationEinstellungen::default(), &[]);
        assert!(plaene.is_empty());
    }

    #[test]
    fn sprach_frame_bleibt_im_wertebereich() {
        let plan = SprecherPlan::alle(&SimulationEinstellungen::default(), &[122_800_000]).remove(0);
        let frame = sprach_frame(&plan, 3, 960);
        assert_eq!(frame.len(), 960);
        assert!(frame.iter().all(|s| s.abs() <= 1.0));
        assert!(frame.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn jitter_bleibt_im_fenster() {
        let mut rng = StdRng::seed_from_u64(7);
        let frame = Duration::from_millis(20);
        for _ in 0..200 {
            let d = jitter_dauer(&mut rng, frame, 15);
            assert!(d >= Duration::from_millis(5) && d <= Duration::from_millis(35));
        }
        assert_eq!(jitter_dauer(&mut rng, frame, 0), frame);
    }
}
