//! skyvoice-protocol – Codec- und Empfangs-Definitionen
//!
//! Beschreibt die Codec-Parameter sowie die Ereignisse, die die Netzwerk-
//! Schicht pro Rufzeichen an die Sprachpipeline uebergibt.

pub mod codec;
pub mod voice;

pub use codec::{AudioPreset, OpusConfig};
pub use voice::{RxAudio, RxEvent};
