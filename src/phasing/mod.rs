use partitions::PartitionVec;

use crate::genomics::allele::Variant;
use crate::genomics::haplotype::Haplotype;
use crate::genomics::region::{GenomicRegion, Locatable};
use crate::likelihood::array::HaplotypeLikelihoodArray;

/// Local phasing of consecutive called genotypes: given a window's called variants and
/// the same read-haplotype likelihoods the genotype models already scored, decides which
/// pairs of heterozygous sites are phased together and with what confidence. Grounded on
/// the role `original_source`'s phasing stage plays between window calls — "the
/// log-likelihood ratio between the best and second-best phasings" is implemented below
/// as a per-read-pair concordance test against a fixed genotyping error rate, since no
/// phasing source file was retrieved into `original_source`.
#[derive(Debug, Clone)]
pub struct PhaserConfig {
    pub min_phase_score: f64,
    /// Probability a single read's inferred allele at a site is wrong — sequencing error
    /// or a haplotype assignment tie broken the wrong way.
    pub error_rate: f64,
}

impl Default for PhaserConfig {
    fn default() -> Self {
        PhaserConfig { min_phase_score: 10.0, error_rate: 0.01 }
    }
}

/// The outcome of comparing two phasings of a pair of heterozygous sites: "cis" (the two
/// alternative alleles travel together on one haplotype) versus "trans" (they travel on
/// opposite haplotypes). `score` is the log-likelihood ratio of the favoured phasing over
/// the other; its sign says which phasing is favoured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseResult {
    pub score: f64,
    pub in_cis: bool,
}

/// One group of variant indices (into the caller's candidate list) phased together,
/// anchored at the group's leftmost variant region — the value a `SampleCall::phase_set`
/// points back to.
#[derive(Debug, Clone)]
pub struct PhaseSet {
    pub anchor: GenomicRegion,
    pub variant_indices: Vec<usize>,
}

pub struct Phaser {
    pub config: PhaserConfig,
}

impl Phaser {
    pub fn new(config: PhaserConfig) -> Self {
        Phaser { config }
    }

    /// The haplotype a single read is best explained by, under `likelihoods` — the same
    /// maximum-likelihood assignment a genotype model implicitly reasons about per read,
    /// made explicit here since phasing needs one haplotype choice per read, not a
    /// posterior over haplotypes.
    fn best_haplotype<'a>(
        haplotypes: &'a [Haplotype],
        likelihoods: &HaplotypeLikelihoodArray,
        sample: &str,
        read_idx: usize,
    ) -> Option<&'a Haplotype> {
        haplotypes
            .iter()
            .map(|h| (h, likelihoods.log_probability(h, sample, read_idx).unwrap_or(f64::NEG_INFINITY)))
            .filter(|(_, log_p)| log_p.is_finite())
            .max_by(|a, b| a.1.partial_cmp(&b.1).expect("likelihoods must not be NaN"))
            .map(|(h, _)| h)
    }

    /// Whether a read's best-supported haplotype carries `variant`'s alternative allele
    /// (`true`), is explainable without it (`false`), or the read gave no usable signal
    /// (`None`, e.g. it doesn't overlap the window at all).
    fn read_allele(
        haplotypes: &[Haplotype],
        likelihoods: &HaplotypeLikelihoodArray,
        sample: &str,
        read_idx: usize,
        variant: &Variant,
    ) -> Option<bool> {
        Self::best_haplotype(haplotypes, likelihoods, sample, read_idx).map(|h| h.contains_allele(&variant.alternative))
    }

    /// Compares the cis and trans phasings of `variant_a` and `variant_b` in `sample`,
    /// using every read that yields a usable allele call at both sites.
    pub fn phase_pair(
        &self,
        haplotypes: &[Haplotype],
        likelihoods: &HaplotypeLikelihoodArray,
        sample: &str,
        variant_a: &Variant,
        variant_b: &Variant,
    ) -> PhaseResult {
        let read_count = likelihoods.read_count(sample);
        let mut concordant = 0u32;
        let mut discordant = 0u32;
        for read_idx in 0..read_count {
            let a = Self::read_allele(haplotypes, likelihoods, sample, read_idx, variant_a);
            let b = Self::read_allele(haplotypes, likelihoods, sample, read_idx, variant_b);
            if let (Some(a), Some(b)) = (a, b) {
                if a == b {
                    concordant += 1;
                } else {
                    discordant += 1;
                }
            }
        }

        let log_odds_per_read = ((1.0 - self.config.error_rate) / self.config.error_rate).ln();
        let score = (concordant as f64 - discordant as f64) * log_odds_per_read;
        PhaseResult { score: score.abs(), in_cis: score >= 0.0 }
    }

    /// Groups `variants` into phase sets: two variants adjacent in the candidate list join
    /// the same set once their `phase_pair` score clears `min_phase_score`, using
    /// union-find (`partitions::PartitionVec`) so phasing is transitive across a run of
    /// sites rather than only ever between immediate neighbours.
    pub fn phase_variants(
        &self,
        haplotypes: &[Haplotype],
        likelihoods: &HaplotypeLikelihoodArray,
        sample: &str,
        variants: &[Variant],
    ) -> Vec<PhaseSet> {
        if variants.is_empty() {
            return Vec::new();
        }
        let mut partition: PartitionVec<usize> = PartitionVec::with_capacity(variants.len());
        for i in 0..variants.len() {
            partition.push(i);
        }

        for window in 0..variants.len().saturating_sub(1) {
            let result = self.phase_pair(haplotypes, likelihoods, sample, &variants[window], &variants[window + 1]);
            if result.score >= self.config.min_phase_score {
                partition.union(window, window + 1);
            }
        }

        let mut visited = vec![false; variants.len()];
        let mut phase_sets = Vec::new();
        for i in 0..variants.len() {
            if visited[i] {
                continue;
            }
            let mut indices = vec![i];
            visited[i] = true;
            for j in (i + 1)..variants.len() {
                if !visited[j] && partition.same_set(i, j) {
                    indices.push(j);
                    visited[j] = true;
                }
            }
            if indices.len() > 1 {
                let anchor = indices.iter().map(|&idx| variants[idx].region()).min().cloned().expect("non-empty group");
                phase_sets.push(PhaseSet { anchor, variant_indices: indices });
            }
        }
        phase_sets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::containers::mappable_collection::MappableCollection;
    use crate::containers::read_map::ReadMap;
    use crate::genomics::allele::Allele;
    use crate::genomics::haplotype::FlankState;
    use crate::genomics::read::AlignedRead;
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
    fn reads_carrying_both_alt_alleles_together_phase_in_cis() {
        let region = GenomicRegion::new("1", 0, 10);
        let reference_bases = b"ACGTACGTAC";
        let snv_a = Allele::new(GenomicRegion::new("1", 2, 3), b"T".to_vec());
        let snv_b = Allele::new(GenomicRegion::new("1", 6, 7), b"T".to_vec());

        let ref_hap = Haplotype::reference(region.clone(), reference_bases);
        let cis_hap = Haplotype::from_alleles(region.clone(), reference_bases, vec![snv_a.clone(), snv_b.clone()]);
        let haplotypes = vec![ref_hap, cis_hap];

        let mut reads = ReadMap::new();
        // Every read carries both alt alleles together (cis) or neither (reference).
        reads.insert_sample(
            "s1".to_string(),
            MappableCollection::from_sorted(vec![
                read_at(0, b"ACTTACTTAC"); 10
            ]),
        );
        let likelihoods = HaplotypeLikelihoodArray::populate(haplotypes.clone(), &reads, |h| FlankState::new(h.region.clone()));

        let variant_a = Variant::new(Allele::new(GenomicRegion::new("1", 2, 3), b"G".to_vec()), snv_a);
        let variant_b = Variant::new(Allele::new(GenomicRegion::new("1", 6, 7), b"G".to_vec()), snv_b);

        let phaser = Phaser::new(PhaserConfig::default());
        let result = phaser.phase_pair(&haplotypes, &likelihoods, "s1", &variant_a, &variant_b);
        assert!(result.in_cis);
        assert!(result.score >= phaser.config.min_phase_score);
    }

    #[test]
    fn high_scoring_adjacent_pairs_form_one_phase_set() {
        let region = GenomicRegion::new("1", 0, 10);
        let reference_bases = b"ACGTACGTAC";
        let snv_a = Allele::new(GenomicRegion::new("1", 2, 3), b"T".to_vec());
        let snv_b = Allele::new(GenomicRegion::new("1", 6, 7), b"T".to_vec());

        let ref_hap = Haplotype::reference(region.clone(), reference_bases);
        let cis_hap = Haplotype::from_alleles(region.clone(), reference_bases, vec![snv_a.clone(), snv_b.clone()]);
        let haplotypes = vec![ref_hap, cis_hap];

        let mut reads = ReadMap::new();
        reads.insert_sample("s1".to_string(), MappableCollection::from_sorted(vec![read_at(0, b"ACTTACTTAC"); 10]));
        let likelihoods = HaplotypeLikelihoodArray::populate(haplotypes.clone(), &reads, |h| FlankState::new(h.region.clone()));

        let variant_a = Variant::new(Allele::new(GenomicRegion::new("1", 2, 3), b"G".to_vec()), snv_a);
        let variant_b = Variant::new(Allele::new(GenomicRegion::new("1", 6, 7), b"G".to_vec()), snv_b);

        let phaser = Phaser::new(PhaserConfig::default());
        let phase_sets = phaser.phase_variants(&haplotypes, &likelihoods, "s1", &[variant_a, variant_b]);
        assert_eq!(phase_sets.len(), 1);
        assert_eq!(phase_sets[0].variant_indices, vec![0, 1]);
    }
}
