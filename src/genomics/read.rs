use rust_htslib::bam::record::CigarString;

use crate::genomics::region::{GenomicRegion, Locatable};

/// A single aligned sequencing read, in the window-scoped, reference-free representation
/// the rest of this crate works with (decoding from BAM/CRAM records is the I/O layer's
/// job; see `crate::io::reads`).
#[derive(Debug, Clone)]
pub struct AlignedRead {
    pub region: GenomicRegion,
    pub sequence: Vec<u8>,
    pub qualities: Vec<u8>,
    pub cigar: CigarString,
    pub mapping_quality: u8,
    pub insert_size: i64,
    pub mate_contig: Option<String>,
    pub mate_begin: Option<u32>,
}

impl AlignedRead {
    pub fn new(
        region: GenomicRegion,
        sequence: Vec<u8>,
        qualities: Vec<u8>,
        cigar: CigarString,
        mapping_quality: u8,
        insert_size: i64,
        mate_contig: Option<String>,
        mate_begin: Option<u32>,
    ) -> Self {
        assert_eq!(sequence.len(), qualities.len(), "read sequence/quality length mismatch");
        AlignedRead {
            region,
            sequence,
            qualities,
            cigar,
            mapping_quality,
            insert_size,
            mate_contig,
            mate_begin,
        }
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }
}

impl Locatable for AlignedRead {
    fn region(&self) -> &GenomicRegion {
        &self.region
    }
}

/// Equality is semantic identity of the alignment: mapping quality, region, and cigar.
/// Sequence content is redundant given those three plus the reference, and two reads
/// that were fetched independently but describe the same alignment event (e.g. overlapping
/// mate re-fetches) should compare equal.
impl PartialEq for AlignedRead {
    fn eq(&self, other: &Self) -> bool {
        self.mapping_quality == other.mapping_quality
            && self.region == other.region
            && self.cigar == other.cigar
    }
}
impl Eq for AlignedRead {}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_htslib::bam::record::Cigar;

    fn make_read(region: GenomicRegion, mapq: u8) -> AlignedRead {
        AlignedRead::new(
            region,
            b"ACGT".to_vec(),
            vec![30; 4],
            CigarString(vec![Cigar::Match(4)]),
            mapq,
            0,
            None,
            None,
        )
    }

    #[test]
    fn equality_ignores_sequence() {
        let a = make_read(GenomicRegion::new("1", 0, 4), 60);
        let mut b = make_read(GenomicRegion::new("1", 0, 4), 60);
        b.sequence = b"TTTT".to_vec();
        assert_eq!(a, b);
    }

    #[test]
    fn equality_respects_mapping_quality() {
        let a = make_read(GenomicRegion::new("1", 0, 4), 60);
        let b = make_read(GenomicRegion::new("1", 0, 4), 10);
        assert_ne!(a, b);
    }
}
