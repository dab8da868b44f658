use rust_htslib::bam::record::{Cigar, CigarString};

/// Predicates and small transforms over `rust_htslib`'s `Cigar`, the way
/// `reads::cigar_utils::CigarUtils` keeps these off the `AlignedRead` type itself.
pub struct CigarUtils;

impl CigarUtils {
    pub fn consumes_read_bases(op: &Cigar) -> bool {
        matches!(
            op,
            Cigar::Match(_) | Cigar::Equal(_) | Cigar::Diff(_) | Cigar::Ins(_) | Cigar::SoftClip(_)
        )
    }

    pub fn consumes_reference_bases(op: &Cigar) -> bool {
        matches!(
            op,
            Cigar::Match(_) | Cigar::Equal(_) | Cigar::Diff(_) | Cigar::Del(_) | Cigar::RefSkip(_)
        )
    }

    pub fn is_clipping(op: &Cigar) -> bool {
        matches!(op, Cigar::SoftClip(_) | Cigar::HardClip(_))
    }

    pub fn is_indel(op: &Cigar) -> bool {
        matches!(op, Cigar::Ins(_) | Cigar::Del(_))
    }

    pub fn reference_length(cigar: &CigarString) -> u32 {
        cigar.0.iter().filter(|op| Self::consumes_reference_bases(op)).map(|op| op.len()).sum()
    }

    pub fn read_length(cigar: &CigarString) -> u32 {
        cigar.0.iter().filter(|op| Self::consumes_read_bases(op)).map(|op| op.len()).sum()
    }

    fn same_kind(a: &Cigar, b: &Cigar) -> bool {
        std::mem::discriminant(a) == std::mem::discriminant(b)
    }

    fn with_length(op: &Cigar, length: u32) -> Cigar {
        match op {
            Cigar::Match(_) => Cigar::Match(length),
            Cigar::Ins(_) => Cigar::Ins(length),
            Cigar::Del(_) => Cigar::Del(length),
            Cigar::RefSkip(_) => Cigar::RefSkip(length),
            Cigar::SoftClip(_) => Cigar::SoftClip(length),
            Cigar::HardClip(_) => Cigar::HardClip(length),
            Cigar::Pad(_) => Cigar::Pad(length),
            Cigar::Equal(_) => Cigar::Equal(length),
            Cigar::Diff(_) => Cigar::Diff(length),
        }
    }
}

/// Accumulates cigar operations, merging consecutive identical operators and dropping
/// leading/trailing deletions the way `reads::cigar_builder::CigarBuilder` does, minus
/// the full insertion/deletion-reordering machinery that builder adds for realignment
/// output (not needed here: we only ever build cigars for haplotype-vs-reference
/// alignments, which are never subsequently realigned).
pub struct CigarBuilder {
    elements: Vec<Cigar>,
    remove_deletions_at_ends: bool,
}

impl CigarBuilder {
    pub fn new(remove_deletions_at_ends: bool) -> Self {
        CigarBuilder { elements: Vec::new(), remove_deletions_at_ends }
    }

    pub fn add(&mut self, op: Cigar) {
        if op.len() == 0 {
            return;
        }
        if self.remove_deletions_at_ends && matches!(op, Cigar::Del(_)) && self.elements.is_empty() {
            return;
        }
        match self.elements.last_mut() {
            Some(last) if CigarUtils::same_kind(last, &op) => {
                *last = CigarUtils::with_length(last, last.len() + op.len());
            }
            _ => self.elements.push(op),
        }
    }

    pub fn add_all(&mut self, ops: impl IntoIterator<Item = Cigar>) {
        for op in ops {
            self.add(op);
        }
    }

    pub fn make(mut self) -> CigarString {
        if self.remove_deletions_at_ends {
            while matches!(self.elements.last(), Some(Cigar::Del(_))) {
                self.elements.pop();
            }
        }
        CigarString(self.elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_consecutive_matches() {
        let mut b = CigarBuilder::new(false);
        b.add(Cigar::Match(10));
        b.add(Cigar::Match(5));
        assert_eq!(b.make(), CigarString(vec![Cigar::Match(15)]));
    }

    #[test]
    fn drops_leading_and_trailing_deletions() {
        let mut b = CigarBuilder::new(true);
        b.add(Cigar::Del(10));
        b.add(Cigar::Match(10));
        b.add(Cigar::Del(3));
        assert_eq!(b.make(), CigarString(vec![Cigar::Match(10)]));
    }

    #[test]
    fn reference_length_sums_consuming_ops() {
        let cigar = CigarString(vec![Cigar::SoftClip(5), Cigar::Match(10), Cigar::Del(2), Cigar::Ins(3)]);
        assert_eq!(CigarUtils::reference_length(&cigar), 12);
        assert_eq!(CigarUtils::read_length(&cigar), 18);
    }
}
