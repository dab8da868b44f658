/// Numerically stable `ln(sum(exp(x)))` over natural-log values. Mirrors the role
/// `MathUtils::normalize_log10`/log-space helpers play across the teacher's genotyping
/// code (`utils::math_utils::MathUtils`), restated in natural log since every probability
/// in this crate (pair-HMM, genotype posteriors) is already natural-log-based.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    let sum: f64 = values.iter().map(|v| (v - max).exp()).sum();
    max + sum.ln()
}

/// Subtracts `log_sum_exp(values)` from every element in place, so `exp` of the result
/// sums to 1. Returns the normalizing constant that was subtracted.
pub fn normalize_log(values: &mut [f64]) -> f64 {
    let total = log_sum_exp(values);
    if total.is_finite() {
        for value in values.iter_mut() {
            *value -= total;
        }
    }
    total
}

/// `ln(n! / (k! * (n-k)!))` via `ln_gamma`, used by the coalescent prior and the
/// population allele-frequency calculator's multinomial terms.
pub fn log_binomial_coefficient(n: f64, k: f64) -> f64 {
    ln_gamma(n + 1.0) - ln_gamma(k + 1.0) - ln_gamma(n - k + 1.0)
}

pub fn ln_gamma(x: f64) -> f64 {
    statrs::function::gamma::ln_gamma(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn log_sum_exp_of_equal_values_adds_ln_n() {
        let values = vec![0.0, 0.0, 0.0, 0.0];
        assert_relative_eq!(log_sum_exp(&values), (4.0f64).ln(), epsilon = 1e-9);
    }

    #[test]
    fn log_sum_exp_of_empty_is_neg_infinity() {
        assert_eq!(log_sum_exp(&[]), f64::NEG_INFINITY);
    }

    #[test]
    fn normalize_log_produces_probabilities_summing_to_one() {
        let mut values = vec![0.0, -1.0, -2.0];
        normalize_log(&mut values);
        let total: f64 = values.iter().map(|v| v.exp()).sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn binomial_coefficient_matches_known_value() {
        // C(5, 2) = 10
        assert_relative_eq!(log_binomial_coefficient(5.0, 2.0).exp(), 10.0, epsilon = 1e-6);
    }
}
