use std::cmp::Ordering;
use std::collections::HashSet;

use ordered_float::OrderedFloat;

use crate::genomics::haplotype::Haplotype;

/// Supplies the per-(haplotype, sample) score the filter ranks haplotypes by. Implemented
/// by `crate::likelihood::array::HaplotypeLikelihoodArray` in the real pipeline; mocked in
/// tests here so the selection logic can be exercised without a likelihood model.
pub trait HaplotypeScorer {
    /// Maximum, over reads in `sample`, of `log P(read | haplotype)`.
    fn max_log_probability(&self, haplotype: &Haplotype, sample: &str) -> f64;
}

fn score<S: HaplotypeScorer>(haplotype: &Haplotype, samples: &[String], scorer: &S) -> f64 {
    samples
        .iter()
        .map(|sample| scorer.max_log_probability(haplotype, sample))
        .fold(f64::NEG_INFINITY, f64::max)
}

/// Retains at most `n` haplotypes in `haplotypes`, returning the removed set.
///
/// Grounded on `original_source/src/haplotype_filter.cpp`'s `filter_to_n` /
/// `filter_by_maximum_likelihood`: score by maximum per-sample read likelihood, nth-element
/// partition, then resolve duplicate haplotype strings straddling the partition boundary by
/// dropping the retained-side copy. `filter_by_likelihood_sum` is not implemented here: in
/// the original it is a stub with no body, and its only call site is commented out, so it
/// never contributes a tie-break in practice (see DESIGN.md).
pub fn filter_to_n<S: HaplotypeScorer>(
    haplotypes: &mut Vec<Haplotype>,
    samples: &[String],
    scorer: &S,
    n: usize,
) -> Vec<Haplotype> {
    if haplotypes.len() <= n {
        return Vec::new();
    }

    let scores: Vec<f64> = haplotypes.iter().map(|h| score(h, samples, scorer)).collect();
    let mut indices: Vec<usize> = (0..haplotypes.len()).collect();
    let boundary = n - 1;
    indices.select_nth_unstable_by(boundary, |&a, &b| {
        scores[b].partial_cmp(&scores[a]).expect("haplotype scores must not be NaN")
    });

    let mut kept_idx = indices[..n].to_vec();
    let mut removed_idx = indices[n..].to_vec();
    kept_idx.sort_unstable_by(|&a, &b| haplotypes[a].cmp(&haplotypes[b]));
    removed_idx.sort_unstable_by(|&a, &b| haplotypes[a].cmp(&haplotypes[b]));

    let mut duplicate_in_kept = HashSet::new();
    let (mut i, mut j) = (0, 0);
    while i < kept_idx.len() && j < removed_idx.len() {
        match haplotypes[kept_idx[i]].cmp(&haplotypes[removed_idx[j]]) {
            Ordering::Equal => {
                duplicate_in_kept.insert(kept_idx[i]);
                i += 1;
                j += 1;
            }
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
        }
    }

    let keep: HashSet<usize> =
        kept_idx.into_iter().filter(|idx| !duplicate_in_kept.contains(idx)).collect();

    let mut retained = Vec::with_capacity(keep.len());
    let mut removed = Vec::with_capacity(haplotypes.len() - keep.len());
    for (idx, haplotype) in std::mem::take(haplotypes).into_iter().enumerate() {
        if keep.contains(&idx) {
            retained.push(haplotype);
        } else {
            removed.push(haplotype);
        }
    }
    *haplotypes = retained;
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::region::GenomicRegion;

    struct FixedScores(std::collections::HashMap<Vec<u8>, f64>);

    impl HaplotypeScorer for FixedScores {
        fn max_log_probability(&self, haplotype: &Haplotype, _sample: &str) -> f64 {
            *self.0.get(&haplotype.bases).unwrap_or(&f64::NEG_INFINITY)
        }
    }

    fn hap(bases: &[u8]) -> Haplotype {
        Haplotype::reference(GenomicRegion::new("1", 0, bases.len() as u32), bases)
    }

    #[test]
    fn keeps_n_highest_scoring_haplotypes() {
        let mut haplotypes = vec![hap(b"AAAA"), hap(b"CCCC"), hap(b"GGGG"), hap(b"TTTT")];
        let scores = FixedScores(
            [(b"AAAA".to_vec(), -1.0), (b"CCCC".to_vec(), -5.0), (b"GGGG".to_vec(), -2.0), (b"TTTT".to_vec(), -10.0)]
                .into_iter()
                .collect(),
        );
        let samples = vec!["s1".to_string()];
        let removed = filter_to_n(&mut haplotypes, &samples, &scores, 2);

        assert_eq!(haplotypes.len(), 2);
        assert_eq!(removed.len(), 2);
        let kept_bases: Vec<&[u8]> = haplotypes.iter().map(|h| h.bases.as_slice()).collect();
        assert!(kept_bases.contains(&b"AAAA".as_slice()));
        assert!(kept_bases.contains(&b"GGGG".as_slice()));
    }

    #[test]
    fn no_op_when_already_at_or_below_target() {
        let mut haplotypes = vec![hap(b"AAAA"), hap(b"CCCC")];
        let scores = FixedScores(std::collections::HashMap::new());
        let samples = vec!["s1".to_string()];
        let removed = filter_to_n(&mut haplotypes, &samples, &scores, 5);
        assert!(removed.is_empty());
        assert_eq!(haplotypes.len(), 2);
    }
}
