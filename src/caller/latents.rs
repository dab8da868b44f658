use std::any::Any;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::genotyping::individual_model::GenotypePosteriors;

/// The view every caller's inferred latents expose, regardless of which generative
/// model produced them — the seam the design calls out in its "replacing mutable lazy
/// fields" note: the source memoises these as mutable shared-pointer fields on a const
/// object, computed on first access by whichever of `call_variants`/`call_reference`
/// needs them first. `haplotype_posteriors` is genuinely lazy here (it is plain summary
/// data over `genotype_posteriors`, cheap to skip when a window yields no calls);
/// `genotype_posteriors` itself is produced eagerly during `infer_latents`, since every
/// caller needs it just to decide whether the window produced any calls at all.
pub trait Latents: Any {
    fn haplotype_posteriors(&self) -> &[f64];
    fn genotype_posteriors(&self) -> &HashMap<String, GenotypePosteriors>;
    fn as_any(&self) -> &dyn Any;
}

/// Shared `Latents` implementation for every caller whose output is "one
/// `GenotypePosteriors` per sample" — individual, population, and pedigree all produce
/// exactly this shape and differ only in how the prior that fed `IndividualModel::infer`
/// was constructed.
pub struct LatentsCache {
    genotype_posteriors: HashMap<String, GenotypePosteriors>,
    num_haplotypes: usize,
    haplotype_posteriors: OnceLock<Vec<f64>>,
}

impl LatentsCache {
    pub fn new(genotype_posteriors: HashMap<String, GenotypePosteriors>, num_haplotypes: usize) -> Self {
        LatentsCache { genotype_posteriors, num_haplotypes, haplotype_posteriors: OnceLock::new() }
    }
}

impl Latents for LatentsCache {
    fn haplotype_posteriors(&self) -> &[f64] {
        self.haplotype_posteriors.get_or_init(|| {
            let num_samples = self.genotype_posteriors.len().max(1) as f64;
            (0..self.num_haplotypes)
                .map(|haplotype_idx| {
                    self.genotype_posteriors.values().map(|gp| gp.marginal_probability(haplotype_idx)).sum::<f64>()
                        / num_samples
                })
                .collect()
        })
    }

    fn genotype_posteriors(&self) -> &HashMap<String, GenotypePosteriors> {
        &self.genotype_posteriors
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genotyping::individual_model::Genotype;

    fn posteriors(indices: Vec<usize>) -> GenotypePosteriors {
        GenotypePosteriors { genotypes: vec![Genotype::new(indices)], log_posteriors: vec![0.0] }
    }

    #[test]
    fn haplotype_posteriors_are_computed_once_and_cached() {
        let mut map = HashMap::new();
        map.insert("s1".to_string(), posteriors(vec![0, 1]));
        let cache = LatentsCache::new(map, 2);
        let first = cache.haplotype_posteriors().to_vec();
        let second = cache.haplotype_posteriors().to_vec();
        assert_eq!(first, second);
        assert!(first[0] > 0.9 && first[1] > 0.9);
    }
}
