use crate::genomics::haplotype::{FlankState, Haplotype};
use crate::genomics::read::AlignedRead;
use crate::likelihood::indel_model::IndelErrorModel;
use crate::likelihood::pair_hmm::{PairHmmKernel, PairHmmModel, ScalarPairHmmKernel};

/// Scores one haplotype against reads: `log_probability(read, candidate_positions)`.
///
/// Grounded line-for-line on `Octopus::log_probability` and
/// `HaplotypeLikelihoodModel::HaplotypeLikelihoodModel` in
/// `original_source/src/haplotype_liklihood_model.cpp`: try every caller-supplied candidate
/// mapping position plus the read's own offset into the haplotype, keep whichever in-range
/// position scores highest, and fall back to a single clamped-offset alignment when none of
/// the candidates fit within the haplotype's bounds (allowing 15 bases of alignment slack).
pub struct HaplotypeLikelihoodModel<K: PairHmmKernel = ScalarPairHmmKernel> {
    haplotype: Haplotype,
    gap_open_penalties: Vec<u8>,
    model: PairHmmModel,
    kernel: K,
}

impl HaplotypeLikelihoodModel<ScalarPairHmmKernel> {
    pub fn new(haplotype: Haplotype, flank_state: FlankState) -> Self {
        HaplotypeLikelihoodModel::with_kernel(haplotype, flank_state, ScalarPairHmmKernel)
    }
}

impl<K: PairHmmKernel> HaplotypeLikelihoodModel<K> {
    pub fn with_kernel(haplotype: Haplotype, flank_state: FlankState, kernel: K) -> Self {
        let gap_open_penalties = IndelErrorModel::default().calculate_gap_open_penalties(&haplotype);
        let mut model = PairHmmModel::new(2, 3);
        if flank_state.has_lhs_flank_inactive_candidates {
            model.lhs_flank_size = flank_state.lhs_flank_size(&haplotype.region);
        }
        if flank_state.has_rhs_flank_inactive_candidates {
            model.rhs_flank_size = flank_state.rhs_flank_size(&haplotype.region);
        }
        HaplotypeLikelihoodModel { haplotype, gap_open_penalties, model, kernel }
    }

    pub fn log_probability(&self, read: &AlignedRead, mapping_positions: &[usize]) -> f64 {
        debug_assert!(
            self.haplotype.region.contains(&read.region),
            "read {} is not contained within haplotype window {}",
            read.region,
            self.haplotype.region
        );

        let original_mapping_position = read.region.begin.saturating_sub(self.haplotype.region.begin) as usize;

        let mut max_log_probability = f64::NEG_INFINITY;
        let mut original_position_tested = false;
        let mut has_in_range_position = false;

        for &position in mapping_positions {
            if self.is_in_range(position, read) {
                has_in_range_position = true;
                let score = self.align(read, position);
                if score > max_log_probability {
                    max_log_probability = score;
                }
            }
            if position == original_mapping_position {
                original_position_tested = true;
            }
        }

        if !original_position_tested && self.is_in_range(original_mapping_position, read) {
            has_in_range_position = true;
            let score = self.align(read, original_mapping_position);
            if score > max_log_probability {
                max_log_probability = score;
            }
        }

        if !has_in_range_position {
            let min_shift = self.out_of_range_bases(original_mapping_position, read);
            let final_position = original_mapping_position.saturating_sub(min_shift);
            max_log_probability = self.align(read, final_position);
        }

        max_log_probability
    }

    fn out_of_range_bases(&self, position: usize, read: &AlignedRead) -> usize {
        let alignment_size = read.len() + position + 15;
        alignment_size.saturating_sub(self.haplotype.len())
    }

    fn is_in_range(&self, position: usize, read: &AlignedRead) -> bool {
        self.out_of_range_bases(position, read) == 0
    }

    fn align(&self, read: &AlignedRead, position: usize) -> f64 {
        self.kernel.align_around_offset(
            &self.haplotype.bases,
            &read.sequence,
            &read.qualities,
            &self.gap_open_penalties,
            position,
            &self.model,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn exact_match_scores_near_certain() {
        let region = GenomicRegion::new("1", 0, 12);
        let haplotype = Haplotype::reference(region, b"ACGTACGTACGT");
        let model = HaplotypeLikelihoodModel::new(haplotype, FlankState::new(GenomicRegion::new("1", 0, 12)));
        let read = read_at(0, b"ACGTACGT");
        let score = model.log_probability(&read, &[]);
        assert!(score <= 0.0, "log_probability must never exceed 0, got {score}");
        assert!((score - 0.0).abs() < 0.01, "expected a near-zero log probability, got {score}");
    }

    #[test]
    fn falls_back_to_clamped_position_when_nothing_is_in_range() {
        let region = GenomicRegion::new("1", 0, 20);
        let haplotype = Haplotype::reference(region, b"ACGTACGTACGTACGTACGT");
        let model = HaplotypeLikelihoodModel::new(haplotype, FlankState::new(GenomicRegion::new("1", 0, 20)));
        let read = read_at(15, b"ACGTACGT");
        // No candidate position supplied; only the read's own (out-of-range) offset is
        // tried, forcing the clamp path.
        let score = model.log_probability(&read, &[]);
        assert!(score.is_finite());
    }
}
