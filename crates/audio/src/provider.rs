//! Pull-basierter Audio-Graph
//!
//! Jeder Knoten (Generator, Effekt, Puffer, Mixer) implementiert
//! `SampleProvider`: der nachgelagerte Konsument fragt eine Anzahl Samples
//! an, der Knoten liefert sie. Ein Knoten liefert nie mehr Samples als
//! angefragt; weniger nur dann, wenn seine Quelle erschoepft ist.

/// Gemeinsames Trait fuer alle Knoten des Audio-Graphen
///
/// Implementierungen muessen `Send` sein, da der Graph im Steuer-Thread
/// aufgebaut und im Audio-Thread gelesen wird.
pub trait SampleProvider: Send {
    /// Fuellt `samples` und gibt die Anzahl gueltiger Samples zurueck
    ///
    /// Der Rueckgabewert ist immer `<= samples.len()`. Samples hinter dem
    /// Rueckgabewert sind mit Stille (0.0) belegt.
    fn read_samples(&mut self, samples: &mut [f32]) -> usize;
}

impl<T: SampleProvider + ?Sized> SampleProvider for Box<T> {
    fn read_samples(&mut self, samples: &mut [f32]) -> usize {
        (**self).read_samples(samples)
    }
}

/// Quelle, die ausschliesslich Stille liefert
#[derive(Debug, Default, Clone, Copy)]
pub struct SilenceProvider;

impl SampleProvider for SilenceProvider {
    fn read_samples(&mut self, samples: &mut [f32]) -> usize {
        samples.fill(0.0);
        samples.len()
    }
}

/// Konvertiert 16-Bit-PCM in normalisierte f32-Samples und haengt sie an
pub fn i16_to_f32(input: &[i16], output: &mut Vec<f32>) {
    output.reserve(input.len());
    output.extend(input.iter().map(|&s| s as f32 / 32768.0));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stille_liefert_volle_anzahl() {
        let mut stille = SilenceProvider;
        let mut buf = vec![1.0f32; 64];
        assert_eq!(stille.read_samples(&mut buf), 64);
        assert!(buf.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn box_delegiert() {
        let mut knoten: Box<dyn SampleProvider> = Box::new(SilenceProvider);
        let mut buf = vec![0.5f32; 8];
        assert_eq!(knoten.read_samples(&mut buf), 8);
    }

    #[test]
    fn i16_konvertierung_normalisiert() {
        let mut out = Vec::new();
        i16_to_f32(&[0, 16384, -32768, i16::MAX], &mut out);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0], 0.0);
        assert!((out[1] - 0.5).abs() < 1e-6);
        assert_eq!(out[2], -1.0);
        assert!(out[3] < 1.0);
    }
}
