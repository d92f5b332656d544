//! Adaptive Vorlauf-Verzoegerung pro Rufzeichen
//!
//! Jeder Sprecher bekommt beim Aktivieren Stille vorangestellt, damit
//! Netzwerk-Jitter nicht zu Aussetzern fuehrt. Laeuft der Puffer trotzdem
//! leer, waechst die Verzoegerung. Nach mehreren sauberen Sprechsequenzen
//! schrumpft sie wieder.
//!
//! Thread-safe durch DashMap: der Steuer-Thread meldet Erfolge, der
//! Audio-Pfad meldet Unterlaeufe.

use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use skyvoice_core::types::Callsign;

/// Grenzen und Schrittweite der adaptiven Verzoegerung
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayCacheConfig {
    /// Startwert fuer unbekannte Rufzeichen
    pub default_ms: u32,
    /// Untergrenze
    pub min_ms: u32,
    /// Schrittweite fuer Erhoehung und Verringerung
    pub increment_ms: u32,
    /// Obergrenze
    pub max_ms: u32,
    /// Saubere Sequenzen, nach denen verringert wird (Serie muss groesser sein)
    pub successes_before_decrease: u32,
}

impl Default for DelayCacheConfig {
    fn default() -> Self {
        Self {
            default_ms: 60,
            min_ms: 40,
            increment_ms: 20,
            max_ms: 300,
            successes_before_decrease: 5,
        }
    }
}

impl DelayCacheConfig {
    /// Prueft die Grenzen auf Konsistenz
    pub fn validieren(&self) -> Result<(), String> {
        if self.min_ms > self.max_ms {
            return Err(format!(
                "min_ms ({}) darf nicht groesser als max_ms ({}) sein",
                self.min_ms, self.max_ms
            ));
        }
        if self.default_ms < self.min_ms || self.default_ms > self.max_ms {
            return Err(format!(
                "default_ms ({}) muss zwischen {} und {} liegen",
                self.default_ms, self.min_ms, self.max_ms
            ));
        }
        Ok(())
    }
}

/// Verzoegerungs-Eintrag eines Rufzeichens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DelayRecord {
    /// Aktuelle Vorlauf-Verzoegerung in ms
    pub delay_ms: u32,
    /// Saubere Sequenzen seit der letzten Anpassung
    pub successful_bursts: u32,
    /// Unterlaeufe insgesamt
    pub underflows: u64,
    /// Saubere Sequenzen insgesamt
    pub successes: u64,
}

impl DelayRecord {
    fn neu(delay_ms: u32) -> Self {
        Self {
            delay_ms,
            successful_bursts: 0,
            underflows: 0,
            successes: 0,
        }
    }
}

/// Geteilter Cache der Verzoegerungen aller Rufzeichen
///
/// Eintraege werden nie entfernt; die Anzahl Rufzeichen einer Sitzung ist
/// klein.
pub struct CallsignDelayCache {
    config: DelayCacheConfig,
    eintraege: DashMap<Callsign, DelayRecord>,
    verbose: AtomicBool,
}

impl CallsignDelayCache {
    pub fn new(config: DelayCacheConfig) -> Self {
        Self {
            config,
            eintraege: DashMap::new(),
            verbose: AtomicBool::new(false),
        }
    }

    /// Legt einen Eintrag an, falls das Rufzeichen noch unbekannt ist
    pub fn initialise(&self, callsign: &Callsign) {
        if self.eintraege.contains_key(callsign) {
            return;
        }
        self.eintraege
            .entry(callsign.clone())
            .or_insert_with(|| DelayRecord::neu(self.config.default_ms));
    }

    /// Verzoegerung fuer das Rufzeichen (Startwert, wenn unbekannt)
    pub fn get(&self, callsign: &Callsign) -> u32 {
        self.eintraege
            .get(callsign)
            .map(|r| r.delay_ms)
            .unwrap_or(self.config.default_ms)
    }

    /// Meldet einen Puffer-Unterlauf: Verzoegerung steigt
    pub fn underflow(&self, callsign: &Callsign) {
        let Some(mut eintrag) = self.eintraege.get_mut(callsign) else {
            return;
        };

        eintrag.successful_bursts = 0;
        eintrag.underflows += 1;
        let alt = eintrag.delay_ms;
        eintrag.delay_ms = alt
            .saturating_add(self.config.increment_ms)
            .min(self.config.max_ms);

        if self.verbose() {
            debug!(
                callsign = %callsign,
                alt_ms = alt,
                neu_ms = eintrag.delay_ms,
                "Unterlauf, Verzoegerung erhoeht"
            );
        }
    }

    /// Meldet eine saubere Sprechsequenz
    pub fn success(&self, callsign: &Callsign) {
        let Some(mut eintrag) = self.eintraege.get_mut(callsign) else {
            return;
        };

        eintrag.successes += 1;
        eintrag.successful_bursts += 1;
        if eintrag.successful_bursts <= self.config.successes_before_decrease {
            return;
        }

        let alt = eintrag.delay_ms;
        eintrag.delay_ms = alt
            .saturating_sub(self.config.increment_ms)
            .max(self.config.min_ms);
        eintrag.successful_bursts = 0;

        if self.verbose() {
            debug!(
                callsign = %callsign,
                alt_ms = alt,
                neu_ms = eintrag.delay_ms,
                "Stabile Verbindung, Verzoegerung verringert"
            );
        }
    }

    /// Kopie des Eintrags (None, wenn unbekannt)
    pub fn snapshot(&self, callsign: &Callsign) -> Option<DelayRecord> {
        self.eintraege.get(callsign).map(|r| *r)
    }

    /// Alle Eintraege, sortiert nach Rufzeichen
    pub fn alle(&self) -> Vec<(Callsign, DelayRecord)> {
        let mut alle: Vec<_> = self
            .eintraege
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        alle.sort_by(|a, b| a.0.cmp(&b.0));
        alle
    }

    pub fn len(&self) -> usize {
        self.eintraege.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eintraege.is_empty()
    }

    pub fn config(&self) -> &DelayCacheConfig {
        &self.config
    }

    pub fn set_verbose(&self, verbose: bool) {
        self.verbose.store(verbose, Ordering::Relaxed);
    }

    pub fn verbose(&self) -> bool {
        self.verbose.load(Ordering::Relaxed)
    }
}

impl Default for CallsignDelayCache {
    fn default() -> Self {
        Self::new(DelayCacheConfig::default())
    }
}
