use crate::genomics::region::{GenomicRegion, Locatable};

/// An interval-indexed, position-sorted collection supporting overlap and containment
/// queries. Mirrors the role the teacher's `MappableSet`/interval-indexed containers play
/// (`assembly_region_iterator.rs`, `utils::interval_utils`), specialised here to a single
/// contig per collection since windows never span contig boundaries.
#[derive(Debug, Clone, Default)]
pub struct MappableCollection<T: Locatable> {
    elements: Vec<T>,
}

impl<T: Locatable> MappableCollection<T> {
    pub fn new() -> Self {
        MappableCollection { elements: Vec::new() }
    }

    /// Build from an already-sorted-by-region vector. Debug-asserts the ordering.
    pub fn from_sorted(elements: Vec<T>) -> Self {
        debug_assert!(
            elements.windows(2).all(|w| w[0].region().begin <= w[1].region().begin),
            "MappableCollection::from_sorted requires elements sorted by region.begin"
        );
        MappableCollection { elements }
    }

    pub fn push(&mut self, element: T) {
        self.elements.push(element);
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.elements.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.elements
    }

    /// Index of the first element whose region ends strictly after `position`, i.e. the
    /// first element that could possibly overlap a region starting at `position`.
    fn lower_bound(&self, position: u32) -> usize {
        self.elements.partition_point(|e| e.region().end <= position)
    }

    /// All elements overlapping `region`, in position order.
    pub fn overlap_range(&self, region: &GenomicRegion) -> &[T] {
        let start = self.lower_bound(region.begin);
        let end = self.elements[start..].partition_point(|e| e.region().begin < region.end) + start;
        &self.elements[start..end]
    }

    /// All elements strictly after `region` (used by the walker to find the "novel"
    /// suffix of alleles beyond the previous window).
    pub fn after(&self, region: &GenomicRegion) -> &[T] {
        let start = self.elements.partition_point(|e| e.region().begin < region.end || e.region().overlaps(region));
        &self.elements[start..]
    }

    pub fn contains_overlap(&self, region: &GenomicRegion) -> bool {
        !self.overlap_range(region).is_empty()
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
    fn overlap_range_finds_intersecting_elements() {
        let collection = MappableCollection::from_sorted(vec![
            allele_at(0, 5),
            allele_at(10, 15),
            allele_at(20, 25),
        ]);
        let hits = collection.overlap_range(&GenomicRegion::new("1", 12, 22));
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn after_skips_overlapping_and_earlier_elements() {
        let collection = MappableCollection::from_sorted(vec![
            allele_at(0, 5),
            allele_at(10, 15),
            allele_at(20, 25),
        ]);
        let suffix = collection.after(&GenomicRegion::new("1", 0, 12));
        assert_eq!(suffix.len(), 1);
        assert_eq!(suffix[0].region.begin, 20);
    }
}
