use ndarray::Array2;

use crate::containers::read_map::{ReadMap, SampleId};
use crate::genomics::haplotype::{FlankState, Haplotype};
use crate::haplotypes::filter::HaplotypeScorer;
use crate::likelihood::model::HaplotypeLikelihoodModel;

/// A `num_haplotypes x num_reads` matrix of `log P(read | haplotype)` per sample, the
/// pipeline's central data product: every downstream stage (haplotype filter, genotype
/// models) reads out of this rather than re-invoking the pair-HMM.
///
/// Backed by `ndarray::Array2`, one per sample, the way the teacher backs its per-sample
/// likelihood matrices in the genotyping model (`model/*.rs`) — a dense array rather than a
/// sparse map since every haplotype is evaluated against every read in its window.
pub struct HaplotypeLikelihoodArray {
    haplotypes: Vec<Haplotype>,
    samples: Vec<SampleId>,
    values: Vec<Array2<f64>>,
}

impl HaplotypeLikelihoodArray {
    /// Evaluates every haplotype against every read of every sample in `reads`.
    /// `flank_state_for` supplies the active-region-derived flank state for a haplotype
    /// (the same for every haplotype in a window, but threaded through per-call so callers
    /// needn't store it on `Haplotype` itself).
    pub fn populate(
        haplotypes: Vec<Haplotype>,
        reads: &ReadMap,
        flank_state_for: impl Fn(&Haplotype) -> FlankState,
    ) -> Self {
        let samples: Vec<SampleId> = reads.sample_names().cloned().collect();
        let mut values = Vec::with_capacity(samples.len());

        for sample in &samples {
            let sample_reads = reads.reads_for(sample).map(|r| r.as_slice()).unwrap_or(&[]);
            let mut array = Array2::<f64>::zeros((haplotypes.len(), sample_reads.len()));
            for (haplotype_idx, haplotype) in haplotypes.iter().enumerate() {
                let model =
                    HaplotypeLikelihoodModel::new(haplotype.clone(), flank_state_for(haplotype));
                for (read_idx, read) in sample_reads.iter().enumerate() {
                    let original_position =
                        read.region.begin.saturating_sub(haplotype.region.begin) as usize;
                    array[[haplotype_idx, read_idx]] = model.log_probability(read, &[original_position]);
                }
            }
            values.push(array);
        }

        HaplotypeLikelihoodArray { haplotypes, samples, values }
    }

    pub fn haplotypes(&self) -> &[Haplotype] {
        &self.haplotypes
    }

    pub fn samples(&self) -> &[SampleId] {
        &self.samples
    }

    fn sample_index(&self, sample: &str) -> Option<usize> {
        self.samples.iter().position(|s| s == sample)
    }

    fn haplotype_index(&self, haplotype: &Haplotype) -> Option<usize> {
        self.haplotypes.iter().position(|h| h == haplotype)
    }

    pub fn log_probability(&self, haplotype: &Haplotype, sample: &str, read_idx: usize) -> Option<f64> {
        let hi = self.haplotype_index(haplotype)?;
        let si = self.sample_index(sample)?;
        self.values[si].get((hi, read_idx)).copied()
    }

    pub fn read_count(&self, sample: &str) -> usize {
        self.sample_index(sample).map_or(0, |si| self.values[si].ncols())
    }
}

impl HaplotypeScorer for HaplotypeLikelihoodArray {
    /// Maximum over this sample's reads, early-exiting once a likelihood is close enough
    /// to 0 (i.e. the read is essentially certain under this haplotype) that no later read
    /// could raise the maximum further.
    fn max_log_probability(&self, haplotype: &Haplotype, sample: &str) -> f64 {
        let (Some(hi), Some(si)) = (self.haplotype_index(haplotype), self.sample_index(sample)) else {
            return f64::NEG_INFINITY;
        };
        let mut max_value = f64::NEG_INFINITY;
        for &value in self.values[si].row(hi).iter() {
            if value > max_value {
                max_value = value;
            }
            if max_value > -1e-9 {
                break;
            }
        }
        max_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::containers::mappable_collection::MappableCollection;
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
    fn reference_haplotype_scores_exact_reads_near_certain() {
        let region = GenomicRegion::new("1", 0, 12);
        let haplotype = Haplotype::reference(region.clone(), b"ACGTACGTACGT");
        let mut reads = ReadMap::new();
        reads.insert_sample(
            "s1".to_string(),
            MappableCollection::from_sorted(vec![read_at(0, b"ACGTACGT")]),
        );

        let array = HaplotypeLikelihoodArray::populate(vec![haplotype.clone()], &reads, |h| {
            FlankState::new(h.region.clone())
        });

        let score = array.max_log_probability(&haplotype, "s1");
        assert!(score > -1.0, "expected near-certain score, got {score}");
    }

    #[test]
    fn unknown_haplotype_scores_negative_infinity() {
        let region = GenomicRegion::new("1", 0, 12);
        let haplotype = Haplotype::reference(region.clone(), b"ACGTACGTACGT");
        let other = Haplotype::reference(region, b"TTTTTTTTTTTT");
        let reads = ReadMap::new();

        let array = HaplotypeLikelihoodArray::populate(vec![haplotype], &reads, |h| {
            FlankState::new(h.region.clone())
        });

        assert_eq!(array.max_log_probability(&other, "s1"), f64::NEG_INFINITY);
    }
}
