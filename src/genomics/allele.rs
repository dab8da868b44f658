use std::cmp::Ordering;

use crate::genomics::region::{GenomicRegion, Locatable};

/// A concrete base sequence at a specific genomic region.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Allele {
    pub region: GenomicRegion,
    pub bases: Vec<u8>,
}

impl Allele {
    pub fn new(region: GenomicRegion, bases: impl Into<Vec<u8>>) -> Self {
        Allele { region, bases: bases.into() }
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    /// Net change in length this allele makes relative to its reference span: positive
    /// for insertions, negative for deletions, zero for substitutions of equal length.
    pub fn indel_balance(&self) -> i64 {
        self.bases.len() as i64 - self.region.len() as i64
    }
}

impl Locatable for Allele {
    fn region(&self) -> &GenomicRegion {
        &self.region
    }
}

impl PartialOrd for Allele {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Allele {
    fn cmp(&self, other: &Self) -> Ordering {
        self.region.cmp(&other.region).then_with(|| self.bases.cmp(&other.bases))
    }
}

/// A `(reference_allele, alternative_allele)` pair over the same region.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variant {
    pub reference: Allele,
    pub alternative: Allele,
}

impl Variant {
    pub fn new(reference: Allele, alternative: Allele) -> Self {
        assert_eq!(
            reference.region, alternative.region,
            "a variant's reference and alternative alleles must share a region"
        );
        Variant { reference, alternative }
    }

    pub fn region(&self) -> &GenomicRegion {
        &self.reference.region
    }

    /// A variant is trivial when its alleles are identical, i.e. it calls no change.
    pub fn is_trivial(&self) -> bool {
        self.reference == self.alternative
    }

    pub fn is_snv(&self) -> bool {
        self.reference.len() == 1 && self.alternative.len() == 1 && !self.is_trivial()
    }

    pub fn is_indel(&self) -> bool {
        self.reference.len() != self.alternative.len()
    }
}

impl Locatable for Variant {
    fn region(&self) -> &GenomicRegion {
        self.region()
    }
}

impl PartialOrd for Variant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Variant {
    fn cmp(&self, other: &Self) -> Ordering {
        self.reference
            .cmp(&other.reference)
            .then_with(|| self.alternative.cmp(&other.alternative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trivial_variant_has_equal_alleles() {
        let region = GenomicRegion::new("1", 10, 11);
        let v = Variant::new(Allele::new(region.clone(), b"A".to_vec()), Allele::new(region, b"A".to_vec()));
        assert!(v.is_trivial());
    }

    #[test]
    fn indel_balance_matches_length_delta() {
        let region = GenomicRegion::new("1", 10, 11);
        let ins = Allele::new(region, b"AGG".to_vec());
        assert_eq!(ins.indel_balance(), 2);
    }
}
