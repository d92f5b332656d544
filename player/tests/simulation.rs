//! End-to-End-Lauf des Players mit kurzer Simulation

use skyvoice_player::config::PlayerConfig;
use skyvoice_player::Player;

fn kurze_config() -> PlayerConfig {
    let mut config = PlayerConfig::default();
    config.simulation.sprecher = 2;
    config.simulation.sequenzen = 1;
    config.simulation.frames_pro_sequenz = 10;
    config.simulation.jitter_ms = 0;
    config.simulation.pause_ms = 0;
    config.simulation.nachlauf_ms = 800;
    config
}

#[tokio::test]
async fn kurze_simulation_dekodiert_alle_frames() {
    let player = Player::neu(kurze_config()).expect("Player sollte erstellbar sein");
    let bericht = player.starten().await.expect("Simulation sollte durchlaufen");

    assert_eq!(bericht.gesendet, 20);
    assert_eq!(bericht.verloren, 0);
    assert_eq!(bericht.stats.frames_decoded, 20);
    assert_eq!(bericht.stats.decode_failures, 0);
    assert_eq!(bericht.verzoegerungen.len(), 2);

    assert!(bericht.ausgang.bloecke > 0);
    assert!(bericht.ausgang.spitze > 0.0);
    assert!(bericht.ausgang.spitze <= 1.0);
}

#[tokio::test]
async fn metriken_spiegeln_den_bericht() {
    let player = Player::neu(kurze_config()).unwrap();
    let bericht = player.starten().await.unwrap();

    let m = player.metriken();
    assert_eq!(m.frames_decoded_total.get(), bericht.stats.frames_decoded);
    assert_eq!(m.underflows_total.get(), bericht.stats.underflows);
    assert_eq!(m.bursts_ok_total.get(), bericht.stats.successes);

    let text = m.exportieren().unwrap();
    assert!(text.contains("skyvoice_frames_decoded_total 20"));
}

#[tokio::test]
async fn verlorene_pakete_werden_nicht_gesendet() {
    let mut config = kurze_config();
    config.simulation.sprecher = 1;
    config.simulation.frames_pro_sequenz = 40;
    config.simulation.verlust_quote = 0.5;
    let player = Player::neu(config).unwrap();
    let bericht = player.starten().await.unwrap();

    assert_eq!(bericht.gesendet + bericht.verloren, 40);
    assert_eq!(bericht.stats.frames_decoded, bericht.gesendet);
}
