const LN_10_OVER_10: f64 = std::f64::consts::LN_10 / 10.0;

fn log_prob_correct(phred_quality: u8) -> f64 {
    let error = (-(phred_quality as f64) * LN_10_OVER_10).exp();
    (1.0 - error).ln()
}

fn log_prob_error(phred_quality: u8) -> f64 {
    let error = (-(phred_quality as f64) * LN_10_OVER_10).exp();
    (error / 3.0).ln()
}

fn log_prob_from_phred(penalty: u8) -> f64 {
    -(penalty as f64) * LN_10_OVER_10
}

fn max2(a: f64, b: f64) -> f64 {
    a.max(b)
}

fn max3(a: f64, b: f64, c: f64) -> f64 {
    a.max(b).max(c)
}

/// Affine-gap parameters for one `align_around_offset` call, derived once per haplotype
/// from `IndelErrorModel` plus the haplotype's flank state.
#[derive(Debug, Clone, Copy)]
pub struct PairHmmModel {
    pub gap_open: u8,
    pub gap_extend: u8,
    pub lhs_flank_size: u32,
    pub rhs_flank_size: u32,
}

impl PairHmmModel {
    pub fn new(gap_open: u8, gap_extend: u8) -> Self {
        PairHmmModel { gap_open, gap_extend, lhs_flank_size: 0, rhs_flank_size: 0 }
    }
}

/// The alignment kernel contract: given a haplotype, a read, and a candidate offset into
/// the haplotype, return `log P(read | haplotype, offset)`, marginalised over alignment
/// paths. Exposed as a trait rather than a single function so the crate can later swap in
/// a vectorised (striped/SIMD) kernel without touching `HaplotypeLikelihoodModel` — mirrors
/// `original_source`'s `PairHMM::align_around_offset` free function, which this default
/// implementation is a direct, non-vectorised restatement of.
pub trait PairHmmKernel {
    fn align_around_offset(
        &self,
        haplotype_bases: &[u8],
        read_bases: &[u8],
        read_qualities: &[u8],
        gap_open_penalties: &[u8],
        offset: usize,
        model: &PairHmmModel,
    ) -> f64;
}

/// Reference scalar pair-HMM: local in the haplotype (the alignment may start and end at
/// any haplotype column within the window), global in the read (every read base is
/// consumed). Three-state (match/insert/delete) log-space Viterbi alignment: every cell
/// and the final start/end choice are resolved by `max`, not by summing alternative
/// paths. A true forward (sum) algorithm would double-count here, since row 0 grants
/// every haplotype column an equally free start — summing the final row then adds one
/// `ln(k)` of spurious mass for every k equally-good start/end pair a repetitive
/// haplotype offers (observed as `log_probability` going positive on `"ACGTACGT"` vs
/// `"ACGT"`, which appears twice). Restricting to the single best path keeps every
/// summand a bona fide log-probability `<= 0`, so the total is too.
pub struct ScalarPairHmmKernel;

impl PairHmmKernel for ScalarPairHmmKernel {
    fn align_around_offset(
        &self,
        haplotype_bases: &[u8],
        read_bases: &[u8],
        read_qualities: &[u8],
        gap_open_penalties: &[u8],
        offset: usize,
        model: &PairHmmModel,
    ) -> f64 {
        let n = read_bases.len();
        if n == 0 {
            return 0.0;
        }
        let window_len = (n + 15).min(haplotype_bases.len().saturating_sub(offset));
        let window = &haplotype_bases[offset..offset + window_len];
        let m = window.len();
        if m == 0 {
            return f64::NEG_INFINITY;
        }

        const NEG_INF: f64 = f64::NEG_INFINITY;
        let mut match_state = vec![vec![NEG_INF; m + 1]; n + 1];
        let mut insert_state = vec![vec![NEG_INF; m + 1]; n + 1];
        let mut delete_state = vec![vec![NEG_INF; m + 1]; n + 1];

        // The alignment may begin at any haplotype column: row 0 costs nothing everywhere.
        for j in 0..=m {
            match_state[0][j] = 0.0;
        }

        let lhs_flank_end = model.lhs_flank_size as usize;
        let rhs_flank_start = haplotype_bases.len().saturating_sub(model.rhs_flank_size as usize);
        let log_extend = log_prob_from_phred(model.gap_extend);

        for i in 1..=n {
            let read_base = read_bases[i - 1];
            let quality = read_qualities[i - 1];
            for j in 1..=m {
                let global_col = offset + j - 1;
                let in_flank = global_col < lhs_flank_end || global_col >= rhs_flank_start;
                let emission = if in_flank || read_base == window[j - 1] {
                    if read_base == window[j - 1] {
                        log_prob_correct(quality)
                    } else {
                        0.0
                    }
                } else {
                    log_prob_error(quality)
                };

                match_state[i][j] = emission
                    + max3(match_state[i - 1][j - 1], insert_state[i - 1][j - 1], delete_state[i - 1][j - 1]);

                let open_penalty = gap_open_penalties.get(global_col).copied().unwrap_or(model.gap_open);
                let log_open = log_prob_from_phred(open_penalty);
                insert_state[i][j] =
                    max2(log_open + match_state[i - 1][j], log_extend + insert_state[i - 1][j]);
                delete_state[i][j] =
                    max2(log_open + match_state[i][j - 1], log_extend + delete_state[i][j - 1]);
            }
        }

        let mut total = NEG_INF;
        for j in 0..=m {
            total = max2(total, max2(match_state[n][j], insert_state[n][j]));
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_match_scores_higher_than_single_mismatch() {
        let model = PairHmmModel::new(2, 3);
        let kernel = ScalarPairHmmKernel;
        let haplotype = b"ACGTACGTACGT";
        let quals = vec![30u8; 8];
        let gap_open = vec![40u8; haplotype.len()];

        let exact = kernel.align_around_offset(haplotype, b"ACGTACGT", &quals, &gap_open, 0, &model);
        let mismatched = kernel.align_around_offset(haplotype, b"ACGTTCGT", &quals, &gap_open, 0, &model);
        assert!(exact > mismatched);
    }

    #[test]
    fn flank_bases_are_not_penalised_for_mismatches() {
        let mut model = PairHmmModel::new(2, 3);
        model.lhs_flank_size = 4;
        let kernel = ScalarPairHmmKernel;
        let haplotype = b"TTTTACGTACGT";
        let quals = vec![30u8; 8];
        let gap_open = vec![40u8; haplotype.len()];

        // First 4 read bases mismatch the haplotype but fall entirely within the flank.
        let flanked = kernel.align_around_offset(haplotype, b"GGGGACGT", &quals, &gap_open, 0, &model);
        let no_flank_model = PairHmmModel::new(2, 3);
        let unflanked = kernel.align_around_offset(haplotype, b"GGGGACGT", &quals, &gap_open, 0, &no_flank_model);
        assert!(flanked > unflanked);
    }

    #[test]
    fn exact_match_on_repetitive_haplotype_stays_near_zero() {
        // "ACGTACGT" contains the 4-base read as a prefix match AND, because the
        // haplotype repeats, as a second equally-good match starting at offset 4. A
        // forward (summing) combine double-counts these two equally-likely
        // explanations and pushes the result above zero; Viterbi (max) must not.
        let model = PairHmmModel::new(2, 3);
        let kernel = ScalarPairHmmKernel;
        let haplotype = b"ACGTACGT";
        let quals = vec![30u8; 4];
        let gap_open = vec![40u8; haplotype.len()];

        let log_probability = kernel.align_around_offset(haplotype, b"ACGT", &quals, &gap_open, 0, &model);
        assert!(log_probability <= 0.0, "log_probability must never exceed 0, got {log_probability}");
        assert!((log_probability - 0.0).abs() < 0.01, "expected ~0, got {log_probability}");
    }

    #[test]
    fn log_probability_never_exceeds_zero() {
        let model = PairHmmModel::new(2, 3);
        let kernel = ScalarPairHmmKernel;
        let haplotype = b"ACGTACGTACGTACGTACGT";
        let gap_open = vec![40u8; haplotype.len()];

        for read in [&b"ACGT"[..], b"ACGTACGT", b"TTTTT", b"ACGTNCGT", b"GGGGGGGG"] {
            let quals = vec![20u8; read.len()];
            for offset in 0..haplotype.len().saturating_sub(read.len()).max(1) {
                let log_probability =
                    kernel.align_around_offset(haplotype, read, &quals, &gap_open, offset, &model);
                assert!(
                    log_probability <= 0.0,
                    "log_probability must never exceed 0 for read {:?} at offset {offset}, got {log_probability}",
                    String::from_utf8_lossy(read)
                );
            }
        }
    }
}
