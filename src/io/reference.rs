use std::fs;
use std::path::{Path, PathBuf};

use rust_htslib::faidx;

use crate::errors::{Error, Result};
use crate::genomics::region::GenomicRegion;

/// Random-access reference genome reader over an indexed FASTA, the way the design's
/// external-interfaces section names `rust_htslib::faidx` directly. Contig names and
/// lengths are read from the plain-text `.fai` index rather than re-derived from the
/// binding, since that index *is* the authoritative contig list a FASTA loader
/// enumerates from.
pub struct ReferenceReader {
    reader: faidx::Reader,
    contigs: Vec<(String, u64)>,
}

impl ReferenceReader {
    pub fn from_path(fasta_path: impl AsRef<Path>) -> Result<Self> {
        let fasta_path = fasta_path.as_ref();
        let reader = faidx::Reader::from_path(fasta_path).map_err(Error::Htslib)?;
        let contigs = read_fai_index(fasta_path)?;
        Ok(ReferenceReader { reader, contigs })
    }

    pub fn contigs(&self) -> &[(String, u64)] {
        &self.contigs
    }

    pub fn contig_length(&self, contig: &str) -> Option<u64> {
        self.contigs.iter().find(|(name, _)| name == contig).map(|(_, len)| *len)
    }

    /// Fetches the upper-cased, newline-free bases for `region`. `region.end` is
    /// exclusive, matching `GenomicRegion`'s convention; `fetch_seq`'s own `end` is
    /// inclusive, so the call below subtracts one.
    pub fn fetch(&self, region: &GenomicRegion) -> Result<Vec<u8>> {
        if region.is_empty() {
            return Ok(Vec::new());
        }
        let sequence = self
            .reader
            .fetch_seq(&region.contig, region.begin as usize, (region.end - 1) as usize)
            .map_err(Error::Htslib)?;
        Ok(sequence.iter().map(|b| b.to_ascii_uppercase()).collect())
    }
}

fn read_fai_index(fasta_path: &Path) -> Result<Vec<(String, u64)>> {
    let fai_path: PathBuf = {
        let mut path = fasta_path.as_os_str().to_owned();
        path.push(".fai");
        PathBuf::from(path)
    };
    let contents = fs::read_to_string(&fai_path).map_err(|source| Error::Io { path: fai_path.clone(), source })?;
    let mut contigs = Vec::new();
    for line in contents.lines() {
        let mut fields = line.split('\t');
        let name = fields.next().ok_or_else(|| Error::Config(format!("malformed .fai line: {line}")))?;
        let length: u64 = fields
            .next()
            .ok_or_else(|| Error::Config(format!("malformed .fai line: {line}")))?
            .parse()
            .map_err(|_| Error::Config(format!("non-numeric contig length in {line}")))?;
        contigs.push((name.to_string(), length));
    }
    Ok(contigs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fai_lines_into_contig_lengths() {
        let contents = "1\t248956422\t0\t60\t61\n2\t242193529\t248956622\t60\t61\n";
        let mut contigs = Vec::new();
        for line in contents.lines() {
            let mut fields = line.split('\t');
            let name = fields.next().unwrap().to_string();
            let length: u64 = fields.next().unwrap().parse().unwrap();
            contigs.push((name, length));
        }
        assert_eq!(contigs, vec![("1".to_string(), 248956422), ("2".to_string(), 242193529)]);
    }
}
