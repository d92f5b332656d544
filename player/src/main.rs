//! skyvoice Player – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und spielt eine
//! simulierte Funkverkehrs-Sitzung ab.

use anyhow::Result;
use skyvoice_observability::logging_initialisieren;
use skyvoice_player::{config::PlayerConfig, Player};

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Argument, Umgebungsvariable oder Standard
    let config_pfad = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SKYVOICE_CONFIG").ok())
        .unwrap_or_else(|| "skyvoice.toml".into());

    // Konfiguration laden (Standardwerte falls Datei fehlt)
    let config = PlayerConfig::laden(&config_pfad)?;

    logging_initialisieren(&config.logging.level, &config.logging.format)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        "skyvoice Player wird initialisiert"
    );

    let metriken_ausgeben = config.simulation.metriken_ausgeben;
    let player = Player::neu(config)?;
    let bericht = player.starten().await?;

    println!("{}", serde_json::to_string_pretty(&bericht)?);
    if metriken_ausgeben {
        print!("{}", player.metriken().exportieren()?);
    }

    Ok(())
}
