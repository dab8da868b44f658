use crate::containers::read_map::ReadMap;
use crate::genomics::region::{GenomicRegion, Locatable};
use crate::walker::genome_walker::GenomeWalker;

/// Drives a `GenomeWalker` across one contig, producing windows in strictly increasing
/// `begin` order until the walker reports the sentinel past-the-end region.
///
/// This is the sequential half of the scheduling model in the design: the walker itself
/// is a state machine (each window's output region is the next window's input), so one
/// `ContigWalkDriver` per contig runs single-threaded even though the caller's worker pool
/// processes independent contigs' drivers concurrently (see `crate::processing`).
pub struct ContigWalkDriver<'a> {
    walker: &'a GenomeWalker,
    contig: String,
    contig_end: u32,
    cursor: GenomicRegion,
    done: bool,
}

impl<'a> ContigWalkDriver<'a> {
    pub fn new(walker: &'a GenomeWalker, contig: impl Into<String>, contig_len: u32) -> Self {
        let contig = contig.into();
        ContigWalkDriver {
            walker,
            contig: contig.clone(),
            contig_end: contig_len,
            cursor: GenomicRegion::new(contig, 0, 0),
            done: false,
        }
    }

    /// Advance to the next window, or `None` once the contig is exhausted.
    pub fn next_window<L: Locatable>(&mut self, reads: &ReadMap, alleles: &[L]) -> Option<GenomicRegion> {
        if self.done {
            return None;
        }
        let window = self.walker.walk(&self.cursor, reads, alleles);
        if window.contig != self.contig || window.begin >= self.contig_end {
            self.done = true;
            return None;
        }
        self.cursor = window.clone();
        Some(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::allele::Allele;
    use crate::walker::genome_walker::{ExtensionPolicy, IndicatorPolicy};

    #[test]
    fn driver_terminates_once_alleles_are_exhausted() {
        // max_included = 1 forces one allele per window, so three alleles make three
        // windows before the walker starts emitting sentinel regions.
        let walker = GenomeWalker::new(1, IndicatorPolicy::IncludeNone, ExtensionPolicy::NoLimit);
        let alleles = vec![
            Allele::new(GenomicRegion::new("1", 10, 11), b"A".to_vec()),
            Allele::new(GenomicRegion::new("1", 50, 51), b"A".to_vec()),
            Allele::new(GenomicRegion::new("1", 90, 91), b"A".to_vec()),
        ];
        let reads = ReadMap::new();
        let mut driver = ContigWalkDriver::new(&walker, "1", 92);

        let first = driver.next_window(&reads, &alleles).expect("first window");
        assert_eq!(first, GenomicRegion::new("1", 10, 11));

        let second = driver.next_window(&reads, &alleles).expect("second window");
        assert_eq!(second, GenomicRegion::new("1", 50, 51));
        assert!(second.begin >= first.end);

        let third = driver.next_window(&reads, &alleles).expect("third window");
        assert_eq!(third, GenomicRegion::new("1", 90, 91));

        assert!(driver.next_window(&reads, &alleles).is_none());
    }
}
