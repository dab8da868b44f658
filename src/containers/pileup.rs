use std::collections::HashMap;

use crate::containers::read_map::ReadMap;
use crate::genomics::region::{GenomicRegion, Locatable};

const BASES: [u8; 5] = [b'A', b'C', b'G', b'T', b'N'];

fn base_index(base: u8) -> usize {
    BASES.iter().position(|&b| b == base).unwrap_or(4)
}

/// A per-position, per-sample base tally over a region, used by `call_reference` to
/// decide whether a site's read support is confidently reference rather than merely
/// uncalled. Grounded on the `ReadPileupMap` parameter `original_source`'s
/// `call_reference` signature takes (named in the design's ambient data additions); no
/// implementation of that type was retrieved, so the tally below is this crate's own,
/// built directly over `ReadMap`.
#[derive(Debug, Default)]
pub struct ReadPileup {
    // position -> sample -> per-base read counts, indexed by `base_index`.
    counts: HashMap<u32, HashMap<String, [u32; 5]>>,
}

impl ReadPileup {
    pub fn from_reads(reads: &ReadMap, region: &GenomicRegion) -> Self {
        let mut counts: HashMap<u32, HashMap<String, [u32; 5]>> = HashMap::new();
        for sample in reads.sample_names() {
            let Some(sample_reads) = reads.reads_for(sample) else { continue };
            for read in sample_reads.overlap_range(region) {
                let mut position = read.region.begin;
                // Only match-consuming positions contribute to the pileup; indels are
                // left to the variant caller rather than the reference-confidence tally.
                let mut read_offset = 0usize;
                for op in &read.cigar.0 {
                    use rust_htslib::bam::record::Cigar;
                    match op {
                        Cigar::Match(len) | Cigar::Equal(len) | Cigar::Diff(len) => {
                            for _ in 0..*len {
                                if position >= region.begin && position < region.end {
                                    if let Some(&base) = read.sequence.get(read_offset) {
                                        let entry = counts.entry(position).or_default();
                                        let sample_counts = entry.entry(sample.clone()).or_insert([0; 5]);
                                        sample_counts[base_index(base)] += 1;
                                    }
                                }
                                position += 1;
                                read_offset += 1;
                            }
                        }
                        Cigar::Ins(len) | Cigar::SoftClip(len) => read_offset += *len as usize,
                        Cigar::Del(len) | Cigar::RefSkip(len) => position += *len,
                        Cigar::HardClip(_) | Cigar::Pad(_) => {}
                    }
                }
            }
        }
        ReadPileup { counts }
    }

    pub fn depth(&self, position: u32, sample: &str) -> u32 {
        self.counts.get(&position).and_then(|s| s.get(sample)).map_or(0, |c| c.iter().sum())
    }

    /// Fraction of reads at `position` in `sample` agreeing with `reference_base`.
    pub fn reference_fraction(&self, position: u32, sample: &str, reference_base: u8) -> f64 {
        let depth = self.depth(position, sample);
        if depth == 0 {
            return 0.0;
        }
        let matching =
            self.counts.get(&position).and_then(|s| s.get(sample)).map_or(0, |c| c[base_index(reference_base)]);
        matching as f64 / depth as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::containers::mappable_collection::MappableCollection;
    use crate::genomics::read::AlignedRead;
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
    fn reference_fraction_reflects_agreeing_reads() {
        let mut reads = ReadMap::new();
        reads.insert_sample(
            "s1".to_string(),
            MappableCollection::from_sorted(vec![read_at(0, b"AAAA"), read_at(0, b"AAAA"), read_at(0, b"TAAA")]),
        );
        let pileup = ReadPileup::from_reads(&reads, &GenomicRegion::new("1", 0, 4));
        assert_eq!(pileup.depth(0, "s1"), 3);
        assert!((pileup.reference_fraction(0, "s1", b'A') - (2.0 / 3.0)).abs() < 1e-9);
    }
}
