//! Stochastic selection over activation strengths.

use rand::Rng;

use super::NumDict;

impl NumDict {
    /// Boltzmann (softmax) distribution over the explicit entries.
    ///
    /// Values are divided by `temperature` and shifted by their maximum
    /// before exponentiation. As the temperature approaches zero the
    /// distribution collapses onto the argmax, which is also what a
    /// non-positive or non-finite temperature yields.
    pub fn boltzmann(&self, temperature: f64) -> NumDict {
        let mut probabilities = NumDict::with_default(0.0);
        let Some((top, max)) = self.argmax() else {
            return probabilities;
        };

        if !(temperature > 0.0 && temperature.is_finite()) {
            probabilities.set(top.clone(), 1.0);
            return probabilities;
        }

        for (key, value) in self.iter() {
            probabilities.set(key.clone(), ((value - max) / temperature).exp());
        }
        let total = probabilities.sum();
        probabilities /= total;
        probabilities
    }

    /// Draw one key with probability proportional to its (positive) value.
    ///
    /// Returns a one-hot dictionary with default `0.0`. Nothing is drawn
    /// when no entry carries positive mass.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> NumDict {
        let mut selection = NumDict::with_default(0.0);
        let total: f64 = self.iter().map(|(_, v)| v.max(0.0)).sum();
        if total <= 0.0 || !total.is_finite() {
            return selection;
        }

        let mut threshold = rng.gen::<f64>() * total;
        let mut chosen = None;
        for (key, value) in self.iter() {
            let mass = value.max(0.0);
            if mass <= 0.0 {
                continue;
            }
            chosen = Some(key);
            if threshold < mass {
                break;
            }
            threshold -= mass;
        }

        if let Some(key) = chosen {
            selection.set(key.clone(), 1.0);
        }
        selection
    }
}
