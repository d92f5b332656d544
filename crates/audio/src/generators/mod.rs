//! Signalquellen der Funk-Atmosphaere
//!
//! - `ResourceSoundSampleProvider`: geloopte Clips (Knistern, Rauschen)
//! - `SawtoothGenerator`: 400-Hz-Brummen des Bordnetzes
//! - `Samples`: die synthetisierte Clip-Bank

pub mod resource_sound;
pub mod samples;
pub mod sawtooth;

pub use resource_sound::ResourceSoundSampleProvider;
pub use samples::Samples;
pub use sawtooth::{SawtoothGenerator, BORDNETZ_FREQUENZ_HZ};
