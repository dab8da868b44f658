use std::collections::HashMap;

use crate::genomics::haplotype::Haplotype;
use crate::genotyping::individual_model::{GenotypePosteriors, IndividualModel};
use crate::genotyping::prior::GenotypePrior;
use crate::likelihood::array::HaplotypeLikelihoodArray;

/// A population-level allele-frequency prior, refined from the cohort's own per-sample
/// genotype posteriors by a small number of EM passes: each round, derive an expected
/// per-haplotype frequency from the current posteriors (the E step), then re-score every
/// sample's genotypes under a prior built from that frequency (the M step).
///
/// Grounded on `model/allele_frequency_calculator.rs`'s `AlleleFrequencyCalculator`: that
/// file's pseudo-count-weighted Dirichlet-style update is restated here directly over
/// haplotype frequencies rather than per-site allele counts, since this crate's genotype
/// space is haplotypes rather than VCF alleles.
pub struct AlleleFrequencyCalculator {
    pub pseudo_count: f64,
    pub iterations: usize,
}

impl Default for AlleleFrequencyCalculator {
    fn default() -> Self {
        AlleleFrequencyCalculator { pseudo_count: 0.1, iterations: 3 }
    }
}

impl AlleleFrequencyCalculator {
    /// Starting frequencies: uniform over haplotypes.
    fn initial_frequencies(&self, num_haplotypes: usize) -> Vec<f64> {
        vec![1.0 / num_haplotypes.max(1) as f64; num_haplotypes]
    }

    fn expected_counts(&self, posteriors: &[GenotypePosteriors], num_haplotypes: usize) -> Vec<f64> {
        let mut counts = vec![self.pseudo_count; num_haplotypes];
        for sample_posteriors in posteriors {
            for (genotype, log_p) in sample_posteriors.genotypes.iter().zip(&sample_posteriors.log_posteriors) {
                let weight = log_p.exp();
                for &hi in &genotype.haplotype_indices {
                    counts[hi] += weight;
                }
            }
        }
        counts
    }

    fn normalize(counts: &[f64]) -> Vec<f64> {
        let total: f64 = counts.iter().sum();
        counts.iter().map(|c| c / total).collect()
    }
}

/// A `GenotypePrior` backed by a fixed per-haplotype frequency vector: `log P(g) = Σ_h
/// ploidy_count(h) * log(freq[h])`, the multinomial-sampling prior an allele-frequency
/// estimate induces over genotypes.
pub struct FrequencyGenotypePrior {
    pub frequencies: Vec<f64>,
}

impl GenotypePrior for FrequencyGenotypePrior {
    fn log_prior(&self, genotype: &crate::genotyping::individual_model::Genotype, _haplotypes: &[Haplotype]) -> f64 {
        genotype.haplotype_indices.iter().map(|&hi| self.frequencies[hi].ln()).sum()
    }
}

/// Scores one joint genotype combination across all samples at a fixed ploidy, sharing the
/// haplotype set but refining each sample's prior from the cohort's own posteriors.
///
/// Grounded on the EM loop described in the design (`AlleleFrequencyCalculator`) layered on
/// top of the same per-sample `IndividualModel` building block the polyclone and pedigree
/// models use.
pub struct PopulationModel {
    pub ploidy: usize,
    pub allele_frequency_calculator: AlleleFrequencyCalculator,
}

impl PopulationModel {
    pub fn new(ploidy: usize) -> Self {
        PopulationModel { ploidy, allele_frequency_calculator: AlleleFrequencyCalculator::default() }
    }

    pub fn infer_latents(
        &self,
        haplotypes: &[Haplotype],
        samples: &[String],
        likelihoods: &HaplotypeLikelihoodArray,
    ) -> HashMap<String, GenotypePosteriors> {
        let mut frequencies = self.allele_frequency_calculator.initial_frequencies(haplotypes.len());

        let mut posteriors: Vec<GenotypePosteriors> = Vec::new();
        for _ in 0..self.allele_frequency_calculator.iterations.max(1) {
            let prior = FrequencyGenotypePrior { frequencies: frequencies.clone() };
            posteriors = samples
                .iter()
                .map(|sample| IndividualModel::infer(haplotypes, self.ploidy, sample, likelihoods, &prior))
                .collect();

            let counts = self.allele_frequency_calculator.expected_counts(&posteriors, haplotypes.len());
            frequencies = AlleleFrequencyCalculator::normalize(&counts);
        }

        samples.iter().cloned().zip(posteriors).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::containers::mappable_collection::MappableCollection;
    use crate::containers::read_map::ReadMap;
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
    fn infers_one_genotype_posterior_per_sample() {
        let region = GenomicRegion::new("1", 0, 8);
        let haplotypes = vec![Haplotype::reference(region, b"ACGTACGT")];

        let mut reads = ReadMap::new();
        reads.insert_sample("s1".to_string(), MappableCollection::from_sorted(vec![read_at(0, b"ACGTACGT")]));
        reads.insert_sample("s2".to_string(), MappableCollection::from_sorted(vec![read_at(0, b"ACGTACGT")]));

        let likelihoods = HaplotypeLikelihoodArray::populate(haplotypes.clone(), &reads, |h| {
            crate::genomics::haplotype::FlankState::new(h.region.clone())
        });

        let model = PopulationModel::new(1);
        let samples = vec!["s1".to_string(), "s2".to_string()];
        let latents = model.infer_latents(&haplotypes, &samples, &likelihoods);
        assert_eq!(latents.len(), 2);
        assert!(latents.contains_key("s1"));
    }
}
