use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rust_htslib::bam::{self, IndexedReader, Read};

use crate::containers::mappable_collection::MappableCollection;
use crate::containers::read_map::ReadMap;
use crate::errors::{Error, Result};
use crate::genomics::read::AlignedRead;
use crate::genomics::region::GenomicRegion;

/// One opened, indexed BAM/CRAM file plus the sample name(s) found in its `@RG SM:` tags.
/// A single file may carry several read groups for the same sample (different lanes or
/// runs); they are folded into one `ReadMap` entry per sample name, never per read group.
struct OpenedReadFile {
    path: PathBuf,
    reader: Mutex<IndexedReader>,
    read_group_samples: HashMap<String, String>,
}

/// Reads reads from one or more indexed BAM/CRAM files by region and sample subset.
///
/// The design's shared-resource policy requires only one thread enter the underlying
/// index at a time per file; each opened file's reader is behind its own `Mutex` rather
/// than one shared across every file, so fetches against different files still run
/// concurrently. Per-`(sample, region)` caching (mentioned in the design) is the caller
/// pipeline's responsibility, not this reader's — see `crate::processing`.
pub struct ReadReader {
    files: Vec<OpenedReadFile>,
}

impl ReadReader {
    pub fn from_paths(paths: &[impl AsRef<Path>]) -> Result<Self> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref().to_path_buf();
            let reader = IndexedReader::from_path(&path).map_err(Error::Htslib)?;
            let read_group_samples = read_group_samples(&reader)?;
            files.push(OpenedReadFile { path, reader: Mutex::new(reader), read_group_samples });
        }
        Ok(ReadReader { files })
    }

    /// Every sample name found across every opened file's `@RG SM:` tags, deduplicated,
    /// in first-seen order.
    pub fn sample_names(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for file in &self.files {
            for sample in file.read_group_samples.values() {
                if !seen.contains(sample) {
                    seen.push(sample.clone());
                }
            }
        }
        seen
    }

    /// Fetches reads overlapping `region` for exactly the requested `samples`, merged
    /// across every file that contributes to them and sorted by alignment start as
    /// `ReadMap`/`MappableCollection` require.
    pub fn fetch(&self, region: &GenomicRegion, samples: &[String]) -> Result<ReadMap> {
        let mut per_sample: HashMap<String, Vec<AlignedRead>> = HashMap::new();
        for sample in samples {
            per_sample.insert(sample.clone(), Vec::new());
        }

        for file in &self.files {
            let wanted: Vec<&str> = file
                .read_group_samples
                .values()
                .filter(|s| samples.contains(s))
                .map(|s| s.as_str())
                .collect();
            if wanted.is_empty() {
                continue;
            }
            let mut reader = file.reader.lock().expect("read reader mutex poisoned");
            let tid = reader
                .header()
                .tid(region.contig.as_bytes())
                .ok_or_else(|| Error::ReferenceMismatch { contig: region.contig.clone() })?;
            reader
                .fetch((tid as i32, region.begin as i64, region.end as i64))
                .map_err(|source| Error::Io { path: file.path.clone(), source: std::io::Error::new(std::io::ErrorKind::Other, source) })?;

            let mut record = bam::Record::new();
            while let Some(result) = reader.read(&mut record) {
                result.map_err(Error::Htslib)?;
                if record.is_unmapped() || record.is_secondary() || record.is_supplementary() || record.is_duplicate() {
                    continue;
                }
                let Some(sample) = read_group_sample(&record, &file.read_group_samples) else { continue };
                if !samples.contains(&sample) {
                    continue;
                }
                let mate_contig = if record.mtid() >= 0 {
                    Some(String::from_utf8_lossy(reader.header().tid2name(record.mtid() as u32)).into_owned())
                } else {
                    None
                };
                per_sample.entry(sample).or_default().push(to_aligned_read(&record, &region.contig, mate_contig)?);
            }
        }

        let mut read_map = ReadMap::new();
        for (sample, mut reads) in per_sample {
            reads.sort_by(|a, b| a.region.begin.cmp(&b.region.begin));
            read_map.insert_sample(sample, MappableCollection::from_sorted(reads));
        }
        Ok(read_map)
    }
}

fn read_group_sample(record: &bam::Record, read_group_samples: &HashMap<String, String>) -> Option<String> {
    let read_group = record.aux(b"RG").ok()?;
    let read_group = match read_group {
        rust_htslib::bam::record::Aux::String(s) => s.to_string(),
        _ => return None,
    };
    read_group_samples.get(&read_group).cloned()
}

fn read_group_samples(reader: &IndexedReader) -> Result<HashMap<String, String>> {
    let text = String::from_utf8_lossy(reader.header().as_bytes()).into_owned();
    let mut map = HashMap::new();
    for line in text.lines() {
        if !line.starts_with("@RG") {
            continue;
        }
        let mut id = None;
        let mut sample = None;
        for field in line.split('\t').skip(1) {
            if let Some(value) = field.strip_prefix("ID:") {
                id = Some(value.to_string());
            } else if let Some(value) = field.strip_prefix("SM:") {
                sample = Some(value.to_string());
            }
        }
        if let (Some(id), Some(sample)) = (id, sample) {
            map.insert(id, sample);
        }
    }
    Ok(map)
}

fn to_aligned_read(record: &bam::Record, contig: &str, mate_contig: Option<String>) -> Result<AlignedRead> {
    let begin = record.pos().max(0) as u32;
    let cigar = bam::record::CigarString(record.cigar().to_vec());
    let reference_span: u32 = cigar
        .0
        .iter()
        .map(|op| match op {
            bam::record::Cigar::Match(n)
            | bam::record::Cigar::Del(n)
            | bam::record::Cigar::RefSkip(n)
            | bam::record::Cigar::Equal(n)
            | bam::record::Cigar::Diff(n) => *n,
            _ => 0,
        })
        .sum();
    let region = GenomicRegion::new(contig.to_string(), begin, begin + reference_span);

    let sequence: Vec<u8> = record.seq().as_bytes();
    let qualities: Vec<u8> = record.qual().to_vec();

    let mate_begin = if record.mpos() >= 0 { Some(record.mpos() as u32) } else { None };

    Ok(AlignedRead::new(
        region,
        sequence,
        qualities,
        cigar,
        record.mapq(),
        record.insert_size(),
        mate_contig,
        mate_begin,
    ))
}
