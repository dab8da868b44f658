use crate::genomics::haplotype::Haplotype;
use crate::genotyping::individual_model::{enumerate_genotypes, Genotype, IndividualModel};
use crate::genotyping::prior::FlatGenotypePrior;
use crate::likelihood::array::HaplotypeLikelihoodArray;
use crate::utils::math_utils::{log_sum_exp, normalize_log};

/// Probability mass on clone count `k`, `k = 1, 2, ..`. `geometric_pdf(k, p) = (1-p)^(k-1) * p`.
pub fn geometric_clonality_prior(k: usize, p: f64) -> f64 {
    assert!(k >= 1, "clonality is 1-indexed (at least one clone)");
    (1.0 - p).powi((k - 1) as i32) * p
}

pub struct PolycloneConfig {
    pub max_clones: usize,
    pub max_genotypes: usize,
    pub min_variant_posterior: f64,
    pub min_refcall_posterior: f64,
    pub clonality_prior: Box<dyn Fn(usize) -> f64>,
}

impl Default for PolycloneConfig {
    fn default() -> Self {
        PolycloneConfig {
            max_clones: 4,
            max_genotypes: 1000,
            min_variant_posterior: 0.5,
            min_refcall_posterior: 0.5,
            clonality_prior: Box::new(|k| geometric_clonality_prior(k, 0.5)),
        }
    }
}

/// Posterior split between the single-clone (clonal) and multi-clone (subclonal)
/// hypotheses for one sample, after marginalising each stage's genotype evidence.
pub struct ModelProbabilities {
    pub clonal: f64,
    pub subclonal: f64,
}

pub struct PolycloneLatents {
    pub haploid: crate::genotyping::individual_model::GenotypePosteriors,
    pub subclonal_genotypes: Vec<Genotype>,
    pub subclonal_log_posteriors: Vec<f64>,
    pub model_probabilities: ModelProbabilities,
}

impl PolycloneLatents {
    pub fn variant_posterior(&self, haplotype_idx: usize) -> f64 {
        let haploid_marginal = self.haploid.marginal_probability(haplotype_idx) * self.model_probabilities.clonal;
        let subclonal_marginal = self
            .subclonal_genotypes
            .iter()
            .zip(&self.subclonal_log_posteriors)
            .filter(|(g, _)| g.haplotype_indices.contains(&haplotype_idx))
            .map(|(_, log_p)| log_p.exp())
            .sum::<f64>()
            * self.model_probabilities.subclonal;
        haploid_marginal + subclonal_marginal
    }
}

/// A mixture-of-subclones model for one sample (exemplar caller from the design): infers
/// whether the sample is best explained by a single clone or a mixture of several,
/// scoring each hypothesis with the shared `IndividualModel` building block.
///
/// Grounded on `original_source`'s polyclone caller header naming (`polyclone_caller.hpp`)
/// for its configuration surface; the two-stage haploid/polyploid inference below is this
/// crate's restatement of that design over the `IndividualModel`/`HaplotypeLikelihoodArray`
/// primitives introduced for this crate.
pub struct PolycloneModel {
    pub config: PolycloneConfig,
}

impl PolycloneModel {
    pub fn new(config: PolycloneConfig) -> Self {
        PolycloneModel { config }
    }

    pub fn infer_latents(
        &self,
        haplotypes: &[Haplotype],
        sample: &str,
        likelihoods: &HaplotypeLikelihoodArray,
    ) -> PolycloneLatents {
        let haploid = IndividualModel::infer(haplotypes, 1, sample, likelihoods, &FlatGenotypePrior);

        let mut all_genotypes = Vec::new();
        let mut all_log_unnormalized = Vec::new();
        for ploidy in 2..=self.config.max_clones {
            if all_genotypes.len() >= self.config.max_genotypes {
                break;
            }
            let log_clone_prior = (self.config.clonality_prior)(ploidy).ln();
            // `IndividualModel::infer` normalizes within this ploidy's own genotype set,
            // which is exactly the conditional likelihood we want to weight by the
            // clonality prior to get this ploidy's contribution to the subclonal mixture.
            let posteriors = IndividualModel::infer(haplotypes, ploidy, sample, likelihoods, &FlatGenotypePrior);
            for (genotype, log_p) in posteriors.genotypes.into_iter().zip(posteriors.log_posteriors) {
                if all_genotypes.len() >= self.config.max_genotypes {
                    break;
                }
                all_genotypes.push(genotype);
                all_log_unnormalized.push(log_clone_prior + log_p);
            }
        }

        let log_clonal_evidence = (self.config.clonality_prior)(1).ln();
        let log_subclonal_evidence = log_sum_exp(&all_log_unnormalized);
        let mut marginal = vec![log_clonal_evidence, log_subclonal_evidence];
        normalize_log(&mut marginal);
        let model_probabilities = ModelProbabilities { clonal: marginal[0].exp(), subclonal: marginal[1].exp() };

        let mut subclonal_log_posteriors = all_log_unnormalized;
        normalize_log(&mut subclonal_log_posteriors);

        PolycloneLatents {
            haploid,
            subclonal_genotypes: all_genotypes,
            subclonal_log_posteriors,
            model_probabilities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometric_prior_decreases_with_clone_count() {
        let p1 = geometric_clonality_prior(1, 0.5);
        let p2 = geometric_clonality_prior(2, 0.5);
        let p3 = geometric_clonality_prior(3, 0.5);
        assert!(p1 > p2);
        assert!(p2 > p3);
    }
}
