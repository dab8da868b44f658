use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::genomics::allele::Allele;
use crate::genomics::region::{GenomicRegion, Locatable};

/// A contiguous, reference-sized region with a concrete base string obtained by applying
/// a chosen, non-conflicting set of alleles to the reference.
///
/// Mirrors `haplotype::haplotype::Haplotype` in spirit (constituent alleles, cigar-free
/// here since within a window every haplotype shares the same reference span and we
/// never need to re-derive a cigar against a different coordinate system).
#[derive(Debug, Clone)]
pub struct Haplotype {
    pub region: GenomicRegion,
    pub bases: Vec<u8>,
    pub(crate) constituent_alleles: Vec<Allele>,
    pub is_reference: bool,
}

impl Haplotype {
    /// Build a haplotype by applying `alleles` (already checked non-overlapping and
    /// sorted by position) to `reference_bases` spanning `region`.
    pub fn from_alleles(region: GenomicRegion, reference_bases: &[u8], mut alleles: Vec<Allele>) -> Self {
        alleles.sort();
        for pair in alleles.windows(2) {
            assert!(
                !pair[0].region.overlaps(&pair[1].region),
                "haplotype constituent alleles must not overlap"
            );
        }
        let mut bases = Vec::with_capacity(reference_bases.len());
        let mut cursor = region.begin;
        for allele in &alleles {
            let local_start = (allele.region.begin - region.begin) as usize;
            let local_end = (allele.region.end - region.begin) as usize;
            let prefix_start = (cursor - region.begin) as usize;
            bases.extend_from_slice(&reference_bases[prefix_start..local_start]);
            bases.extend_from_slice(&allele.bases);
            cursor = allele.region.end;
        }
        let tail_start = (cursor - region.begin) as usize;
        bases.extend_from_slice(&reference_bases[tail_start..]);

        let expected_len = region.len() as i64 + alleles.iter().map(|a| a.indel_balance()).sum::<i64>();
        debug_assert_eq!(bases.len() as i64, expected_len);

        let is_reference = alleles.is_empty();
        Haplotype { region, bases, constituent_alleles: alleles, is_reference }
    }

    pub fn reference(region: GenomicRegion, reference_bases: &[u8]) -> Self {
        Haplotype::from_alleles(region, reference_bases, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn contains_allele(&self, allele: &Allele) -> bool {
        self.constituent_alleles.iter().any(|a| a == allele)
    }

    pub fn constituent_alleles(&self) -> &[Allele] {
        &self.constituent_alleles
    }

    pub fn hash_bases(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.bases.hash(&mut hasher);
        hasher.finish()
    }
}

impl Locatable for Haplotype {
    fn region(&self) -> &GenomicRegion {
        &self.region
    }
}

impl PartialEq for Haplotype {
    fn eq(&self, other: &Self) -> bool {
        self.bases == other.bases
    }
}
impl Eq for Haplotype {}

impl Hash for Haplotype {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bases.hash(state);
    }
}

impl PartialOrd for Haplotype {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Haplotype {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bases.len().cmp(&other.bases.len()).then_with(|| self.bases.cmp(&other.bases))
    }
}

/// Tells the likelihood model which portion of a haplotype may diverge from the
/// reference under candidate alleles (the *active region*) versus which portion is
/// shared flanking sequence, where alignment differences are read error rather than
/// haplotype choice.
#[derive(Debug, Clone)]
pub struct FlankState {
    pub active_region: GenomicRegion,
    pub has_lhs_flank_inactive_candidates: bool,
    pub has_rhs_flank_inactive_candidates: bool,
}

impl FlankState {
    pub fn new(active_region: GenomicRegion) -> Self {
        FlankState {
            active_region,
            has_lhs_flank_inactive_candidates: false,
            has_rhs_flank_inactive_candidates: false,
        }
    }

    pub fn lhs_flank_size(&self, haplotype_region: &GenomicRegion) -> u32 {
        if self.has_lhs_flank_inactive_candidates {
            self.active_region.begin.saturating_sub(haplotype_region.begin)
        } else {
            0
        }
    }

    pub fn rhs_flank_size(&self, haplotype_region: &GenomicRegion) -> u32 {
        if self.has_rhs_flank_inactive_candidates {
            haplotype_region.end.saturating_sub(self.active_region.end)
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_haplotype_copies_bases_unchanged() {
        let region = GenomicRegion::new("1", 0, 8);
        let h = Haplotype::reference(region, b"ACGTACGT");
        assert_eq!(h.bases, b"ACGTACGT");
        assert!(h.is_reference);
    }

    #[test]
    fn substitution_replaces_matching_span() {
        let region = GenomicRegion::new("1", 0, 8);
        let allele = Allele::new(GenomicRegion::new("1", 2, 3), b"T".to_vec());
        let h = Haplotype::from_alleles(region, b"ACGTACGT", vec![allele]);
        assert_eq!(h.bases, b"ACTTACGT");
        assert!(!h.is_reference);
    }

    #[test]
    fn insertion_grows_haplotype_length() {
        let region = GenomicRegion::new("1", 0, 4);
        let allele = Allele::new(GenomicRegion::new("1", 2, 2), b"GG".to_vec());
        let h = Haplotype::from_alleles(region, b"ACGT", vec![allele]);
        assert_eq!(h.bases, b"ACGGGT");
        assert_eq!(h.len(), 6);
    }

    #[test]
    fn deletion_shrinks_haplotype_length() {
        let region = GenomicRegion::new("1", 0, 6);
        let allele = Allele::new(GenomicRegion::new("1", 2, 4), b"".to_vec());
        let h = Haplotype::from_alleles(region, b"ACGTAC", vec![allele]);
        assert_eq!(h.bases, b"ACAC");
    }

    #[test]
    fn flank_sizes_derive_from_active_region() {
        let hap_region = GenomicRegion::new("1", 100, 200);
        let mut flank = FlankState::new(GenomicRegion::new("1", 120, 180));
        flank.has_lhs_flank_inactive_candidates = true;
        flank.has_rhs_flank_inactive_candidates = true;
        assert_eq!(flank.lhs_flank_size(&hap_region), 20);
        assert_eq!(flank.rhs_flank_size(&hap_region), 20);
    }

    #[test]
    fn flank_size_is_zero_without_flag() {
        let hap_region = GenomicRegion::new("1", 100, 200);
        let flank = FlankState::new(GenomicRegion::new("1", 120, 180));
        assert_eq!(flank.lhs_flank_size(&hap_region), 0);
    }
}
