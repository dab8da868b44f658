use crate::genomics::haplotype::Haplotype;
use crate::genotyping::prior::GenotypePrior;
use crate::likelihood::array::HaplotypeLikelihoodArray;
use crate::utils::math_utils::{log_sum_exp, normalize_log};

/// A multiset of haplotype indices of size `ploidy`, sorted ascending so that two
/// genotypes naming the same haplotypes in different orders compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Genotype {
    pub haplotype_indices: Vec<usize>,
}

impl Genotype {
    pub fn new(mut haplotype_indices: Vec<usize>) -> Self {
        haplotype_indices.sort_unstable();
        Genotype { haplotype_indices }
    }

    pub fn ploidy(&self) -> usize {
        self.haplotype_indices.len()
    }

    pub fn is_homozygous(&self) -> bool {
        self.haplotype_indices.windows(2).all(|w| w[0] == w[1])
    }
}

/// Every distinct multiset of size `ploidy` drawn from `0..num_haplotypes`, in
/// colexicographic order. The window haplotype universe is small (low tens at most), so
/// this full enumeration — rather than the teacher's cached
/// `GenotypeLikelihoodCalculator` per `(ploidy, allele_count)` pair
/// (`genotype/genotype_likelihood_calculator.rs`) — is both simpler and fast enough; the
/// simplification is recorded in DESIGN.md.
pub fn enumerate_genotypes(num_haplotypes: usize, ploidy: usize) -> Vec<Genotype> {
    if num_haplotypes == 0 || ploidy == 0 {
        return vec![Genotype::new(Vec::new())];
    }
    let mut combinations = Vec::new();
    let mut current = Vec::with_capacity(ploidy);
    generate_combinations(num_haplotypes, ploidy, 0, &mut current, &mut combinations);
    combinations
}

fn generate_combinations(
    num_haplotypes: usize,
    remaining: usize,
    min_index: usize,
    current: &mut Vec<usize>,
    out: &mut Vec<Genotype>,
) {
    if remaining == 0 {
        out.push(Genotype::new(current.clone()));
        return;
    }
    for index in min_index..num_haplotypes {
        current.push(index);
        generate_combinations(num_haplotypes, remaining - 1, index, current, out);
        current.pop();
    }
}

/// One sample's genotype posterior distribution at a fixed ploidy.
pub struct GenotypePosteriors {
    pub genotypes: Vec<Genotype>,
    /// Natural-log posteriors, parallel to `genotypes`, normalized to sum to 1.
    pub log_posteriors: Vec<f64>,
}

impl GenotypePosteriors {
    pub fn map_genotype(&self) -> &Genotype {
        let best = self
            .log_posteriors
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).expect("posteriors must not be NaN"))
            .map(|(idx, _)| idx)
            .expect("genotype posteriors must not be empty");
        &self.genotypes[best]
    }

    /// Posterior probability that the sample carries at least one copy of `haplotype_idx`.
    pub fn marginal_probability(&self, haplotype_idx: usize) -> f64 {
        self.genotypes
            .iter()
            .zip(&self.log_posteriors)
            .filter(|(g, _)| g.haplotype_indices.contains(&haplotype_idx))
            .map(|(_, log_p)| log_p.exp())
            .sum()
    }

    /// Posterior probability that the sample carries at least one copy of any haplotype
    /// in `haplotype_indices` — the marginal a variant call needs when the same allele
    /// is a constituent of more than one distinct haplotype in the window.
    pub fn marginal_probability_any(&self, haplotype_indices: &[usize]) -> f64 {
        self.genotypes
            .iter()
            .zip(&self.log_posteriors)
            .filter(|(g, _)| g.haplotype_indices.iter().any(|hi| haplotype_indices.contains(hi)))
            .map(|(_, log_p)| log_p.exp())
            .sum()
    }
}

/// Scores every genotype of a fixed ploidy for one sample independently of every other
/// sample: `P(g | reads) ∝ prior(g) * Π_read (1/ploidy * Σ_{h∈g} P(read|h))`.
///
/// This is the shared building block every other genotyping model in this module calls
/// into — the polyclone model's haploid stage, the population model's per-sample stage,
/// the pedigree model's founder stage — grounded on `IndependentSamplesGenotypesModel`
/// (`haplotype/independent_samples_genotype_model.rs`) and
/// `original_source/src/core/models/genotype/individual_model.hpp` (by filename only; no
/// body was retrieved).
pub struct IndividualModel;

impl IndividualModel {
    pub fn infer(
        haplotypes: &[Haplotype],
        ploidy: usize,
        sample: &str,
        likelihoods: &HaplotypeLikelihoodArray,
        prior: &dyn GenotypePrior,
    ) -> GenotypePosteriors {
        let genotypes = enumerate_genotypes(haplotypes.len(), ploidy);
        let read_count = likelihoods.read_count(sample);

        let mut log_posteriors: Vec<f64> = genotypes
            .iter()
            .map(|genotype| {
                prior.log_prior(genotype, haplotypes)
                    + Self::log_likelihood(genotype, haplotypes, sample, read_count, likelihoods)
            })
            .collect();
        normalize_log(&mut log_posteriors);

        GenotypePosteriors { genotypes, log_posteriors }
    }

    fn log_likelihood(
        genotype: &Genotype,
        haplotypes: &[Haplotype],
        sample: &str,
        read_count: usize,
        likelihoods: &HaplotypeLikelihoodArray,
    ) -> f64 {
        let log_ploidy = (genotype.ploidy() as f64).ln();
        (0..read_count)
            .map(|read_idx| {
                let per_haplotype: Vec<f64> = genotype
                    .haplotype_indices
                    .iter()
                    .map(|&hi| {
                        likelihoods
                            .log_probability(&haplotypes[hi], sample, read_idx)
                            .unwrap_or(f64::NEG_INFINITY)
                    })
                    .collect();
                log_sum_exp(&per_haplotype) - log_ploidy
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::containers::mappable_collection::MappableCollection;
    use crate::containers::read_map::ReadMap;
    use crate::genomics::read::AlignedRead;
    use crate::genomics::region::GenomicRegion;
    use crate::genotyping::prior::FlatGenotypePrior;
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
    fn enumerate_genotypes_counts_multisets_with_repetition() {
        // C(3 + 2 - 1, 2) = C(4, 2) = 6 diploid genotypes over 3 haplotypes.
        assert_eq!(enumerate_genotypes(3, 2).len(), 6);
    }

    #[test]
    fn haploid_model_favours_the_matching_haplotype() {
        let region = GenomicRegion::new("1", 0, 8);
        let ref_hap = Haplotype::reference(region.clone(), b"ACGTACGT");
        let alt_hap = Haplotype::reference(region, b"TTTTTTTT");
        let haplotypes = vec![ref_hap.clone(), alt_hap];

        let mut reads = ReadMap::new();
        reads.insert_sample(
            "s1".to_string(),
            MappableCollection::from_sorted(vec![read_at(0, b"ACGTACGT")]),
        );
        let likelihoods = HaplotypeLikelihoodArray::populate(haplotypes.clone(), &reads, |h| {
            crate::genomics::haplotype::FlankState::new(h.region.clone())
        });

        let posteriors =
            IndividualModel::infer(&haplotypes, 1, "s1", &likelihoods, &FlatGenotypePrior);
        assert_eq!(posteriors.map_genotype().haplotype_indices, vec![0]);
    }

    #[test]
    fn marginal_probability_any_unions_several_haplotype_indices() {
        let posteriors = GenotypePosteriors {
            genotypes: vec![Genotype::new(vec![0]), Genotype::new(vec![1]), Genotype::new(vec![2])],
            log_posteriors: vec![(0.2f64).ln(), (0.3f64).ln(), (0.5f64).ln()],
        };
        assert!((posteriors.marginal_probability_any(&[0, 1]) - 0.5).abs() < 1e-9);
    }
}
