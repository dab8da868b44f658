use indexmap::IndexMap;

use crate::containers::mappable_collection::MappableCollection;
use crate::genomics::read::AlignedRead;
use crate::genomics::region::{GenomicRegion, Locatable};

pub type SampleId = String;

/// Per-sample, interval-indexed, position-sorted reads for one contig window.
///
/// Supplies the read-linkage queries the genome walker uses to decide how many
/// indicator/novel alleles belong in the same window: `overlap_range`,
/// `max_count_if_shared_with_first`, `has_shared`, and `find_first_shared`.
#[derive(Debug, Clone, Default)]
pub struct ReadMap {
    samples: IndexMap<SampleId, MappableCollection<AlignedRead>>,
}

impl ReadMap {
    pub fn new() -> Self {
        ReadMap { samples: IndexMap::new() }
    }

    pub fn insert_sample(&mut self, sample: SampleId, reads: MappableCollection<AlignedRead>) {
        self.samples.insert(sample, reads);
    }

    pub fn sample_names(&self) -> impl Iterator<Item = &SampleId> {
        self.samples.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.values().all(|r| r.is_empty())
    }

    pub fn reads_for(&self, sample: &str) -> Option<&MappableCollection<AlignedRead>> {
        self.samples.get(sample)
    }

    /// All reads (any sample) overlapping `region`.
    pub fn overlap_range(&self, region: &GenomicRegion) -> Vec<&AlignedRead> {
        self.samples.values().flat_map(|reads| reads.overlap_range(region).iter()).collect()
    }

    /// Does any single read (in any one sample) overlap both `a` and `b`?
    pub fn has_shared(&self, a: &GenomicRegion, b: &GenomicRegion) -> bool {
        self.samples.values().any(|reads| {
            let ra = reads.overlap_range(a);
            if ra.is_empty() {
                return false;
            }
            let rb = reads.overlap_range(b);
            ra.iter().any(|r1| rb.iter().any(|r2| std::ptr::eq(r1, r2)))
        })
    }

    /// Leftmost element of `items` that shares a read with `pivot`, or `items.len()` if
    /// none does.
    pub fn find_first_shared<L: Locatable>(&self, items: &[L], pivot: &GenomicRegion) -> usize {
        for (i, item) in items.iter().enumerate() {
            if self.has_shared(item.region(), pivot) {
                return i;
            }
        }
        items.len()
    }

    /// Maximum, over samples, of the number of elements in `items[1..]` that co-occur
    /// with `items[0]` on at least one common read in that sample.
    pub fn max_count_if_shared_with_first<L: Locatable>(&self, items: &[L]) -> usize {
        if items.len() < 2 {
            return 0;
        }
        let first_region = items[0].region();
        self.samples
            .values()
            .map(|reads| {
                let first_reads = reads.overlap_range(first_region);
                if first_reads.is_empty() {
                    return 0;
                }
                items[1..]
                    .iter()
                    .filter(|item| {
                        let item_reads = reads.overlap_range(item.region());
                        first_reads.iter().any(|r1| item_reads.iter().any(|r2| std::ptr::eq(r1, r2)))
                    })
                    .count()
            })
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_htslib::bam::record::{Cigar, CigarString};

    fn read(begin: u32, end: u32) -> AlignedRead {
        AlignedRead::new(
            GenomicRegion::new("1", begin, end),
            vec![b'A'; (end - begin) as usize],
            vec![30; (end - begin) as usize],
            CigarString(vec![Cigar::Match(end - begin)]),
            60,
            0,
            None,
            None,
        )
    }

    #[test]
    fn has_shared_true_when_one_read_spans_both_regions() {
        let mut map = ReadMap::new();
        map.insert_sample("s1".to_string(), MappableCollection::from_sorted(vec![read(0, 100)]));
        assert!(map.has_shared(&GenomicRegion::new("1", 5, 6), &GenomicRegion::new("1", 90, 91)));
    }

    #[test]
    fn has_shared_false_when_no_read_spans_both() {
        let mut map = ReadMap::new();
        map.insert_sample(
            "s1".to_string(),
            MappableCollection::from_sorted(vec![read(0, 10), read(90, 100)]),
        );
        assert!(!map.has_shared(&GenomicRegion::new("1", 5, 6), &GenomicRegion::new("1", 95, 96)));
    }

    #[test]
    fn find_first_shared_returns_length_when_nothing_matches() {
        let map = ReadMap::new();
        let items = vec![GenomicRegion::new("1", 0, 1)];
        assert_eq!(map.find_first_shared(&items, &GenomicRegion::new("1", 100, 101)), 1);
    }
}
