use crate::genomics::haplotype::Haplotype;
use crate::genotyping::individual_model::{Genotype, GenotypePosteriors, IndividualModel};
use crate::genotyping::prior::FlatGenotypePrior;
use crate::likelihood::array::HaplotypeLikelihoodArray;
use crate::utils::math_utils::{log_sum_exp, normalize_log};

/// Cellular fractions tried when searching for the mixture weight that best explains a
/// tumour sample's reads under a candidate somatic haplotype. Coarser than a continuous
/// optimiser, but the teacher's own subclone model (`haplotype/independent_samples_genotype_model.rs`)
/// likewise favours a bounded enumeration over gradient search for this kind of mixture
/// weight, and ten points is enough resolution for a Phred-scaled somatic call.
const CELLULAR_FRACTION_GRID: [f64; 10] = [0.05, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.85, 1.0];

pub struct CancerConfig {
    pub normal_ploidy: usize,
    pub min_somatic_posterior: f64,
}

impl Default for CancerConfig {
    fn default() -> Self {
        CancerConfig { normal_ploidy: 2, min_somatic_posterior: 0.5 }
    }
}

/// One haplotype's evidence for being a somatic variant private to the tumour sample:
/// the cellular fraction that best explains the tumour reads, and the log-odds of the
/// somatic mixture hypothesis over the plain germline (no-somatic) hypothesis.
#[derive(Debug, Clone)]
pub struct SomaticCall {
    pub haplotype_idx: usize,
    pub cellular_fraction: f64,
    pub log_odds: f64,
}

impl SomaticCall {
    pub fn posterior(&self) -> f64 {
        let odds = self.log_odds.exp();
        odds / (1.0 + odds)
    }
}

pub struct CancerLatents {
    pub normal_posteriors: GenotypePosteriors,
    pub somatic_calls: Vec<SomaticCall>,
}

/// Scores a normal sample under the ordinary `IndividualModel`, then tests every
/// haplotype absent from the normal's MAP genotype as a candidate somatic event in the
/// paired tumour sample: reads are explained as a mixture of the normal haplotypes (at
/// the complementary weight) and the candidate haplotype (at a searched cellular
/// fraction), and that mixture is compared against the plain germline-only explanation.
///
/// Grounded on the two-sample (`normal_sample` + paired tumour) shape in the design's
/// cancer model description; no `cancer_caller.hpp`/`.cpp` was retrieved into
/// `original_source`, so the mixture-likelihood construction below is this crate's
/// restatement of the standard somatic-mixture model used across cancer callers, built
/// from the same `IndividualModel`/`HaplotypeLikelihoodArray` primitives as every other
/// model in this module.
pub struct CancerModel {
    pub config: CancerConfig,
}

impl CancerModel {
    pub fn new(config: CancerConfig) -> Self {
        CancerModel { config }
    }

    pub fn infer_latents(
        &self,
        haplotypes: &[Haplotype],
        normal_sample: &str,
        tumour_sample: &str,
        likelihoods: &HaplotypeLikelihoodArray,
    ) -> CancerLatents {
        let normal_posteriors =
            IndividualModel::infer(haplotypes, self.config.normal_ploidy, normal_sample, likelihoods, &FlatGenotypePrior);
        let normal_genotype = normal_posteriors.map_genotype().clone();

        let tumour_read_count = likelihoods.read_count(tumour_sample);
        let germline_log_likelihood =
            Self::germline_log_likelihood(&normal_genotype, haplotypes, tumour_sample, tumour_read_count, likelihoods);

        let somatic_candidates: Vec<usize> =
            (0..haplotypes.len()).filter(|hi| !normal_genotype.haplotype_indices.contains(hi)).collect();

        let somatic_calls = somatic_candidates
            .into_iter()
            .map(|hi| {
                self.score_somatic_candidate(
                    hi,
                    &normal_genotype,
                    haplotypes,
                    tumour_sample,
                    tumour_read_count,
                    likelihoods,
                    germline_log_likelihood,
                )
            })
            .collect();

        CancerLatents { normal_posteriors, somatic_calls }
    }

    /// `log P(tumour reads | normal genotype only)`: every tumour read explained purely
    /// by the normal sample's called haplotypes, exactly as `IndividualModel` scores any
    /// other sample against a fixed genotype.
    fn germline_log_likelihood(
        normal_genotype: &Genotype,
        haplotypes: &[Haplotype],
        tumour_sample: &str,
        read_count: usize,
        likelihoods: &HaplotypeLikelihoodArray,
    ) -> f64 {
        let log_ploidy = (normal_genotype.ploidy() as f64).ln();
        (0..read_count)
            .map(|read_idx| {
                let per_haplotype: Vec<f64> = normal_genotype
                    .haplotype_indices
                    .iter()
                    .map(|&hi| likelihoods.log_probability(&haplotypes[hi], tumour_sample, read_idx).unwrap_or(f64::NEG_INFINITY))
                    .collect();
                log_sum_exp(&per_haplotype) - log_ploidy
            })
            .sum()
    }

    fn score_somatic_candidate(
        &self,
        somatic_idx: usize,
        normal_genotype: &Genotype,
        haplotypes: &[Haplotype],
        tumour_sample: &str,
        read_count: usize,
        likelihoods: &HaplotypeLikelihoodArray,
        germline_log_likelihood: f64,
    ) -> SomaticCall {
        let log_ploidy = (normal_genotype.ploidy() as f64).ln();
        let per_read_normal_mix: Vec<f64> = (0..read_count)
            .map(|read_idx| {
                let per_haplotype: Vec<f64> = normal_genotype
                    .haplotype_indices
                    .iter()
                    .map(|&hi| likelihoods.log_probability(&haplotypes[hi], tumour_sample, read_idx).unwrap_or(f64::NEG_INFINITY))
                    .collect();
                log_sum_exp(&per_haplotype) - log_ploidy
            })
            .collect();
        let per_read_somatic: Vec<f64> = (0..read_count)
            .map(|read_idx| likelihoods.log_probability(&haplotypes[somatic_idx], tumour_sample, read_idx).unwrap_or(f64::NEG_INFINITY))
            .collect();

        let mut best_log_likelihood = f64::NEG_INFINITY;
        let mut best_fraction = 0.0;
        for &fraction in CELLULAR_FRACTION_GRID.iter() {
            let log_normal_weight = (1.0 - fraction).ln();
            let log_somatic_weight = fraction.ln();
            let total: f64 = per_read_normal_mix
                .iter()
                .zip(&per_read_somatic)
                .map(|(&normal, &somatic)| {
                    let a = log_normal_weight + normal;
                    let b = log_somatic_weight + somatic;
                    let m = a.max(b);
                    if m == f64::NEG_INFINITY { m } else { m + ((a - m).exp() + (b - m).exp()).ln() }
                })
                .sum();
            if total > best_log_likelihood {
                best_log_likelihood = total;
                best_fraction = fraction;
            }
        }

        SomaticCall {
            haplotype_idx: somatic_idx,
            cellular_fraction: best_fraction,
            log_odds: best_log_likelihood - germline_log_likelihood,
        }
    }
}

/// Normalises a pair of log-evidence values (e.g. clonal vs subclonal, germline vs
/// somatic) into probabilities, mirroring the two-hypothesis marginalisation the
/// polyclone model performs for `ModelProbabilities`.
pub fn normalize_pair(a: f64, b: f64) -> (f64, f64) {
    let mut values = [a, b];
    normalize_log(&mut values);
    (values[0].exp(), values[1].exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::containers::mappable_collection::MappableCollection;
    use crate::containers::read_map::ReadMap;
    use crate::genomics::haplotype::FlankState;
    use crate::genomics::read::AlignedRead;
    use crate::genomics::region::GenomicRegion;
    use rust_htslib::bam::record::{Cigar, CigarString};

    fn read_at(begin: u32, bases: &[u8]) -> AlignedRead {
        AlignedRead::new(
            GenomicRegion::new("1", begin, begin + bases.len() as u32),
            bases.to_vec(),
            vec![30; bases.len()],
            CigarString(vec![Cigar::Match(bases.len() as u32)]),
            60,
            0,
            None,
            None,
        )
    }

    #[test]
    fn somatic_haplotype_present_only_in_tumour_gets_high_posterior() {
        let region = GenomicRegion::new("1", 0, 8);
        let normal_hap = Haplotype::reference(region.clone(), b"ACGTACGT");
        let somatic_hap = Haplotype::reference(region, b"ACGTACTT");
        let haplotypes = vec![normal_hap.clone(), somatic_hap.clone()];

        let mut reads = ReadMap::new();
        reads.insert_sample(
            "normal".to_string(),
            MappableCollection::from_sorted(vec![read_at(0, b"ACGTACGT"); 10]),
        );
        // Every tumour read carries the somatic allele.
        reads.insert_sample(
            "tumour".to_string(),
            MappableCollection::from_sorted(vec![read_at(0, b"ACGTACTT"); 10]),
        );

        let likelihoods = HaplotypeLikelihoodArray::populate(haplotypes.clone(), &reads, |h| FlankState::new(h.region.clone()));

        let model = CancerModel::new(CancerConfig { normal_ploidy: 2, ..CancerConfig::default() });
        let latents = model.infer_latents(&haplotypes, "normal", "tumour", &likelihoods);

        assert_eq!(latents.normal_posteriors.map_genotype().haplotype_indices, vec![0, 0]);
        let call = latents.somatic_calls.iter().find(|c| c.haplotype_idx == 1).expect("somatic candidate scored");
        assert!(call.posterior() > 0.9, "expected confident somatic call, got posterior {}", call.posterior());
        assert!(call.cellular_fraction > 0.5);
    }
}
