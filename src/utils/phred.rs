use std::fmt;

/// A probability expressed in Phred scale (`-10 * log10(p)`), the unit VCF `QUAL` and
/// genotype posteriors are reported in. Grounded on the `Phred<double>` fields scattered
/// through `original_source`'s caller headers (e.g. `polyclone_caller.hpp`'s stored
/// posteriors) — kept as a thin newtype here rather than templated, since this crate only
/// ever phred-scales `f64` probabilities.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Phred(f64);

impl Phred {
    pub fn from_probability(probability: f64) -> Self {
        Phred(-10.0 * probability.log10())
    }

    pub fn from_log_probability(log_probability: f64) -> Self {
        Phred(-10.0 * log_probability / std::f64::consts::LN_10)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn probability(&self) -> f64 {
        10f64.powf(-self.0 / 10.0)
    }
}

impl fmt::Display for Phred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn round_trips_through_probability() {
        let phred = Phred::from_probability(0.001);
        assert_relative_eq!(phred.value(), 30.0, epsilon = 1e-9);
        assert_relative_eq!(phred.probability(), 0.001, epsilon = 1e-9);
    }

    #[test]
    fn from_log_probability_matches_from_probability() {
        let p = 0.01;
        let a = Phred::from_probability(p);
        let b = Phred::from_log_probability(p.ln());
        assert_relative_eq!(a.value(), b.value(), epsilon = 1e-9);
    }
}
