use crate::containers::read_map::ReadMap;
use crate::genomics::region::{GenomicRegion, Locatable};

/// Controls how many previously-called alleles are carried into the next window as
/// *indicators* — phasing anchors that let the phaser link calls across windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorPolicy {
    IncludeNone,
    IncludeIfSharedWithNovelRegion,
    IncludeIfLinkableToNovelRegion,
    IncludeAll,
}

/// Controls when the walker stops extending a window with additional novel alleles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionPolicy {
    WithinReadLengthOfFirstIncluded,
    SharedWithFrontier,
    NoLimit,
}

/// Decides the next window of candidate alleles to jointly analyze, balancing
/// computational cost (bounded by `max_included`) against read-linkage (so alleles that
/// are only resolvable together, because reads span both, land in the same window).
///
/// Grounded directly on `octopus::coretools::GenomeWalker` (`original_source/src/core/tools/hapgen/genome_walker.cpp`);
/// the algorithm below is a line-for-line transliteration of that walk, restated over
/// index ranges into a single sorted allele slice rather than C++ iterator pairs.
pub struct GenomeWalker {
    max_included: usize,
    indicator_policy: IndicatorPolicy,
    extension_policy: ExtensionPolicy,
}

impl GenomeWalker {
    pub fn new(max_included: usize, indicator_policy: IndicatorPolicy, extension_policy: ExtensionPolicy) -> Self {
        GenomeWalker { max_included, indicator_policy, extension_policy }
    }

    /// `alleles` must be sorted ascending by `region().begin` (the candidate generator's
    /// output invariant). Returns the next window; the sentinel region (past-the-end,
    /// shifted by two bases) signals the contig is exhausted.
    pub fn walk<L: Locatable>(
        &self,
        previous_region: &GenomicRegion,
        reads: &ReadMap,
        alleles: &[L],
    ) -> GenomicRegion {
        // boundary: first index whose allele begins at or after the end of the previous
        // window. Everything before it either overlaps `previous_region` (candidate
        // indicators) or lies entirely before it (already consumed by an earlier window).
        let boundary = alleles.partition_point(|a| a.region().begin < previous_region.end);
        let first_overlap =
            alleles[..boundary].partition_point(|a| a.region().end <= previous_region.begin);

        let novel = &alleles[boundary..];
        if novel.is_empty() {
            return previous_region.tail().shift(2);
        }
        if self.max_included == 0 {
            return previous_region.intervening_region(novel[0].region());
        }

        let previous = &alleles[first_overlap..boundary];
        let num_indicators = self.select_num_indicators(reads, previous, novel);
        let first_included_idx = boundary - num_indicators;

        let num_remaining = novel.len();
        let (num_included_bound, num_excluded_alleles) =
            self.compute_inclusion_bound(reads, alleles, first_included_idx, num_remaining);

        debug_assert!(num_included_bound > 0);
        let first_excluded_idx = boundary + num_included_bound;

        let included_idx =
            self.extend_greedily(reads, alleles, boundary, first_excluded_idx, num_included_bound, num_excluded_alleles);

        self.encompassing_region(alleles, first_included_idx, included_idx)
    }

    fn select_num_indicators<L: Locatable>(&self, reads: &ReadMap, previous: &[L], novel: &[L]) -> usize {
        match self.indicator_policy {
            IndicatorPolicy::IncludeNone => 0,
            IndicatorPolicy::IncludeIfSharedWithNovelRegion => {
                if previous.is_empty() {
                    0
                } else {
                    let found = reads.find_first_shared(previous, novel[0].region());
                    previous.len() - found
                }
            }
            IndicatorPolicy::IncludeIfLinkableToNovelRegion => {
                if previous.is_empty() {
                    return 0;
                }
                let mut idx = previous.len();
                let mut pivot = novel[0].region().clone();
                loop {
                    let found = reads.find_first_shared(&previous[..idx], &pivot);
                    if found == idx {
                        break;
                    }
                    idx = found;
                    pivot = previous[idx].region().clone();
                }
                previous.len() - idx
            }
            IndicatorPolicy::IncludeAll => previous.len(),
        }
    }

    /// Returns `(num_included, num_excluded_alleles)` as described in the design: the
    /// cap on how many alleles (indicators + novel) may be included, and — only under
    /// `WithinReadLengthOfFirstIncluded` — the density baseline the greedy extension
    /// loop compares against.
    fn compute_inclusion_bound<L: Locatable>(
        &self,
        reads: &ReadMap,
        alleles: &[L],
        first_included_idx: usize,
        num_remaining: usize,
    ) -> (usize, usize) {
        if self.extension_policy == ExtensionPolicy::WithinReadLengthOfFirstIncluded {
            let max_within_read_length = reads.max_count_if_shared_with_first(&alleles[first_included_idx..]);
            let num_included = self.max_included.min(num_remaining).min(max_within_read_length + 1);
            // The source computes this via unsigned subtraction, which underflows when
            // `num_included` hits the `max_within_read_length + 1` cap exactly. We make
            // that case explicit instead of wrapping: there is no read-length budget left
            // to spend, so the density threshold saturates to "never trips".
            let num_excluded = if num_included > max_within_read_length {
                usize::MAX
            } else {
                max_within_read_length - num_included
            };
            (num_included, num_excluded)
        } else {
            (self.max_included.min(num_remaining), 0)
        }
    }

    fn extend_greedily<L: Locatable>(
        &self,
        reads: &ReadMap,
        alleles: &[L],
        boundary: usize,
        first_excluded_idx: usize,
        num_included_bound: usize,
        num_excluded_alleles: usize,
    ) -> usize {
        let mut included_idx = boundary;
        let mut remaining = num_included_bound;
        loop {
            remaining -= 1;
            if remaining == 0 {
                break;
            }
            let proposed_idx = included_idx + 1;
            if proposed_idx >= alleles.len() {
                break;
            }
            let optimal = if first_excluded_idx >= alleles.len() {
                true
            } else {
                let density_threshold = remaining.saturating_add(num_excluded_alleles);
                let increases = reads.max_count_if_shared_with_first(&alleles[proposed_idx..]) >= density_threshold;
                let close = {
                    let gap_included =
                        alleles[included_idx].region().inner_distance(alleles[proposed_idx].region());
                    let gap_excluded = alleles[proposed_idx]
                        .region()
                        .inner_distance(alleles[first_excluded_idx].region());
                    gap_included <= gap_excluded
                };
                !increases || close
            };
            if !optimal {
                break;
            }
            if self.extension_policy == ExtensionPolicy::SharedWithFrontier
                && !reads.has_shared(alleles[included_idx].region(), alleles[proposed_idx].region())
            {
                break;
            }
            included_idx = proposed_idx;
        }
        included_idx
    }

    /// The smallest region spanning `[first_included_idx, included_idx]`, expanded
    /// rightwards to absorb any further allele that is mutually exclusive with the
    /// rightmost included one (e.g. an alternative indel length at the same site) so
    /// that competing alleles at a single locus are never split across windows.
    fn encompassing_region<L: Locatable>(
        &self,
        alleles: &[L],
        first_included_idx: usize,
        included_idx: usize,
    ) -> GenomicRegion {
        let rightmost_idx = (first_included_idx..=included_idx)
            .max_by_key(|&i| alleles[i].region().end)
            .expect("included range is non-empty");

        let mut first_exclusive = rightmost_idx + 1;
        while first_exclusive < alleles.len()
            && alleles[first_exclusive].region().overlaps(alleles[rightmost_idx].region())
        {
            first_exclusive += 1;
        }

        let mut region = alleles[first_included_idx].region().clone();
        for allele in &alleles[first_included_idx + 1..first_exclusive] {
            region = region.span_with(allele.region());
        }
        region
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::allele::Allele;

    fn allele_at(begin: u32, end: u32) -> Allele {
        Allele::new(GenomicRegion::new("1", begin, end), b"A".to_vec())
    }

    #[test]
    fn empty_candidates_yields_sentinel() {
        let walker = GenomeWalker::new(10, IndicatorPolicy::IncludeNone, ExtensionPolicy::NoLimit);
        let reads = ReadMap::new();
        let prev = GenomicRegion::new("1", 0, 0);
        let alleles: Vec<Allele> = Vec::new();
        let next = walker.walk(&prev, &reads, &alleles);
        assert_eq!(next, prev.tail().shift(2));
    }

    #[test]
    fn max_included_zero_returns_intervening_region() {
        let walker = GenomeWalker::new(0, IndicatorPolicy::IncludeNone, ExtensionPolicy::NoLimit);
        let reads = ReadMap::new();
        let prev = GenomicRegion::new("1", 0, 50);
        let alleles = vec![allele_at(100, 101), allele_at(200, 201), allele_at(300, 301)];
        let next = walker.walk(&prev, &reads, &alleles);
        assert_eq!(next, GenomicRegion::new("1", 50, 100));
    }

    #[test]
    fn include_all_indicators_links_through_shared_read() {
        use crate::containers::mappable_collection::MappableCollection;
        use crate::genomics::read::AlignedRead;
        use rust_htslib::bam::record::{Cigar, CigarString};

        let walker = GenomeWalker::new(2, IndicatorPolicy::IncludeAll, ExtensionPolicy::NoLimit);
        let mut reads = ReadMap::new();
        // A read spanning 102..201 links the third previous allele (102) to the first
        // novel allele (200).
        let linking_read = AlignedRead::new(
            GenomicRegion::new("1", 102, 201),
            vec![b'A'; 99],
            vec![30; 99],
            CigarString(vec![Cigar::Match(99)]),
            60,
            0,
            None,
            None,
        );
        reads.insert_sample("s1".to_string(), MappableCollection::from_sorted(vec![linking_read]));

        let alleles = vec![
            allele_at(100, 101),
            allele_at(101, 102),
            allele_at(102, 103),
            allele_at(200, 201),
            allele_at(201, 202),
        ];
        let prev = GenomicRegion::new("1", 0, 103);
        let next = walker.walk(&prev, &reads, &alleles);
        assert_eq!(next, GenomicRegion::new("1", 100, 202));
    }
}
