use std::collections::HashMap;

use rust_htslib::bam::record::Cigar;

use crate::containers::read_map::ReadMap;
use crate::genomics::allele::{Allele, Variant};
use crate::genomics::read::AlignedRead;
use crate::genomics::region::GenomicRegion;

/// Minimum evidence a candidate allele needs before it is worth scoring against every
/// haplotype — cheap filtering ahead of the pair-HMM, the role
/// `genotype/genotype_builder.rs`'s allele-collection thresholds play in the teacher.
#[derive(Debug, Clone)]
pub struct CandidateGeneratorConfig {
    pub min_supporting_reads: u32,
    pub min_base_quality: u8,
    pub kmer_size: usize,
    pub min_kmer_edge_weight: u32,
    pub max_bubble_search: usize,
}

impl Default for CandidateGeneratorConfig {
    fn default() -> Self {
        CandidateGeneratorConfig {
            min_supporting_reads: 2,
            min_base_quality: 10,
            kmer_size: 11,
            min_kmer_edge_weight: 2,
            max_bubble_search: 200,
        }
    }
}

/// Produces the sorted, deduplicated, left-aligned `Variant` set for a window by
/// combining two independent passes, per the design's candidate generator contract:
/// CIGAR-based mismatch/indel extraction (grounded on `reads/cigar_utils.rs`) and local
/// de Bruijn reassembly (grounded on `read_threading/read_threading_assembler.rs`),
/// which surfaces indels CIGAR alignment alone tends to miss in repetitive sequence.
pub struct CandidateGenerator {
    pub config: CandidateGeneratorConfig,
}

impl CandidateGenerator {
    pub fn new(config: CandidateGeneratorConfig) -> Self {
        CandidateGenerator { config }
    }

    /// `reference_bases` must be exactly `region.len()` bases, `reference_bases[i]`
    /// corresponding to genomic position `region.begin + i`.
    pub fn generate(&self, reads: &ReadMap, region: &GenomicRegion, reference_bases: &[u8]) -> Vec<Variant> {
        let mut variants = self.generate_from_cigars(reads, region, reference_bases);
        variants.extend(self.generate_from_reassembly(reads, region, reference_bases));

        variants = variants.into_iter().map(|v| left_align(v, reference_bases, region)).collect();
        variants.sort();
        variants.dedup();
        variants.retain(|v| !v.is_trivial());
        variants
    }

    fn generate_from_cigars(&self, reads: &ReadMap, region: &GenomicRegion, reference_bases: &[u8]) -> Vec<Variant> {
        let mut support: HashMap<Variant, u32> = HashMap::new();
        for sample in reads.sample_names() {
            let Some(sample_reads) = reads.reads_for(sample) else { continue };
            for read in sample_reads.overlap_range(region) {
                self.walk_cigar(read, region, reference_bases, &mut support);
            }
        }
        support
            .into_iter()
            .filter(|(_, count)| *count >= self.config.min_supporting_reads)
            .map(|(variant, _)| variant)
            .collect()
    }

    fn walk_cigar(&self, read: &AlignedRead, region: &GenomicRegion, reference_bases: &[u8], support: &mut HashMap<Variant, u32>) {
        let mut ref_pos = read.region.begin;
        let mut read_offset = 0usize;

        let ref_base_at = |pos: u32| -> Option<u8> {
            if pos < region.begin || pos >= region.end {
                return None;
            }
            reference_bases.get((pos - region.begin) as usize).copied()
        };

        for op in &read.cigar.0 {
            match *op {
                Cigar::Equal(len) => {
                    ref_pos += len;
                    read_offset += len as usize;
                }
                Cigar::Diff(len) | Cigar::Match(len) => {
                    for i in 0..len {
                        let pos = ref_pos + i;
                        let offset = read_offset + i as usize;
                        if let (Some(&read_base), Some(&quality), Some(ref_base)) =
                            (read.sequence.get(offset), read.qualities.get(offset), ref_base_at(pos))
                        {
                            if quality >= self.config.min_base_quality
                                && ref_base.to_ascii_uppercase() != read_base.to_ascii_uppercase()
                            {
                                let site = GenomicRegion::new(region.contig.clone(), pos, pos + 1);
                                let variant = Variant::new(
                                    Allele::new(site.clone(), vec![ref_base]),
                                    Allele::new(site, vec![read_base]),
                                );
                                *support.entry(variant).or_insert(0) += 1;
                            }
                        }
                    }
                    ref_pos += len;
                    read_offset += len as usize;
                }
                Cigar::Ins(len) => {
                    if ref_pos >= region.begin && ref_pos <= region.end {
                        if let Some(inserted) = read.sequence.get(read_offset..read_offset + len as usize) {
                            let min_quality = read
                                .qualities
                                .get(read_offset..read_offset + len as usize)
                                .and_then(|q| q.iter().copied().min())
                                .unwrap_or(0);
                            if min_quality >= self.config.min_base_quality {
                                let site = GenomicRegion::new(region.contig.clone(), ref_pos, ref_pos);
                                let variant =
                                    Variant::new(Allele::new(site.clone(), Vec::new()), Allele::new(site, inserted.to_vec()));
                                *support.entry(variant).or_insert(0) += 1;
                            }
                        }
                    }
                    read_offset += len as usize;
                }
                Cigar::Del(len) => {
                    if ref_pos >= region.begin && ref_pos + len <= region.end {
                        if let Some(deleted) = ref_base_range(reference_bases, region, ref_pos, ref_pos + len) {
                            let site = GenomicRegion::new(region.contig.clone(), ref_pos, ref_pos + len);
                            let variant = Variant::new(Allele::new(site.clone(), deleted), Allele::new(site, Vec::new()));
                            *support.entry(variant).or_insert(0) += 1;
                        }
                    }
                    ref_pos += len;
                }
                Cigar::SoftClip(len) => read_offset += len as usize,
                Cigar::RefSkip(len) => ref_pos += len,
                Cigar::HardClip(_) | Cigar::Pad(_) => {}
            }
        }
    }

    /// Builds a small de Bruijn graph over the reference sequence and every overlapping
    /// read, then walks the reference's own k-mer path looking for "bubbles": a run of
    /// read-only k-mers that diverges from the reference path and later rejoins it,
    /// which is exactly the alt-allele pattern CIGAR alignment tends to miss around
    /// homopolymer/short-tandem-repeat indels.
    fn generate_from_reassembly(&self, reads: &ReadMap, region: &GenomicRegion, reference_bases: &[u8]) -> Vec<Variant> {
        let k = self.config.kmer_size;
        if reference_bases.len() <= k {
            return Vec::new();
        }

        let mut graph: HashMap<Vec<u8>, HashMap<Vec<u8>, u32>> = HashMap::new();
        insert_kmer_path(&mut graph, reference_bases, k, self.config.min_kmer_edge_weight.max(1));
        for sample in reads.sample_names() {
            let Some(sample_reads) = reads.reads_for(sample) else { continue };
            for read in sample_reads.overlap_range(region) {
                insert_kmer_path(&mut graph, &read.sequence, k, 1);
            }
        }

        let ref_path: Vec<Vec<u8>> = reference_bases.windows(k).map(|w| w.to_vec()).collect();
        let mut variants = Vec::new();

        for i in 0..ref_path.len().saturating_sub(1) {
            let node = &ref_path[i];
            let next_ref_node = &ref_path[i + 1];
            let Some(neighbours) = graph.get(node) else { continue };
            for (alt_start, &weight) in neighbours {
                if alt_start == next_ref_node || weight < self.config.min_kmer_edge_weight {
                    continue;
                }
                let Some((rejoin_index, alt_bases)) =
                    walk_bubble(&graph, alt_start, &ref_path, i + 1, self.config.max_bubble_search)
                else {
                    continue;
                };
                let ref_bases = &reference_bases[i..rejoin_index + k];
                if let Some(variant) = diff_span(ref_bases, &alt_bases, region.begin + i as u32, &region.contig) {
                    variants.push(variant);
                }
            }
        }
        variants
    }
}

fn ref_base_range(reference_bases: &[u8], region: &GenomicRegion, begin: u32, end: u32) -> Option<Vec<u8>> {
    let start = (begin.checked_sub(region.begin))? as usize;
    let stop = (end.checked_sub(region.begin))? as usize;
    reference_bases.get(start..stop).map(|s| s.to_vec())
}

fn insert_kmer_path(graph: &mut HashMap<Vec<u8>, HashMap<Vec<u8>, u32>>, sequence: &[u8], k: usize, weight: u32) {
    if sequence.len() <= k {
        return;
    }
    for window in sequence.windows(k + 1) {
        let (from, to) = (window[..k].to_vec(), window[1..].to_vec());
        *graph.entry(from).or_default().entry(to).or_insert(0) += weight;
    }
}

/// Greedily follows the highest-weight outgoing edge from `start` up to
/// `max_steps` times, looking for a node that reappears in `ref_path` at or after
/// `min_rejoin_index`. Returns that node's index in `ref_path` plus the concatenated
/// alt-path bases (first k-mer in full, one base per subsequent k-mer).
fn walk_bubble(
    graph: &HashMap<Vec<u8>, HashMap<Vec<u8>, u32>>,
    start: &[u8],
    ref_path: &[Vec<u8>],
    min_rejoin_index: usize,
    max_steps: usize,
) -> Option<(usize, Vec<u8>)> {
    let mut current = start.to_vec();
    let mut alt_bases = start.to_vec();
    if let Some(index) = ref_path.iter().skip(min_rejoin_index).position(|n| n == &current) {
        return Some((index + min_rejoin_index, alt_bases));
    }
    for _ in 0..max_steps {
        let next = graph.get(&current)?.iter().max_by_key(|(_, &weight)| weight).map(|(node, _)| node.clone())?;
        alt_bases.push(*next.last()?);
        current = next;
        if let Some(index) = ref_path.iter().skip(min_rejoin_index).position(|n| n == &current) {
            return Some((index + min_rejoin_index, alt_bases));
        }
    }
    None
}

/// Trims the common prefix and suffix of two aligned spans and returns the minimal
/// `Variant` describing their difference, anchored at `span_start` — the same
/// left/right-trimming a VCF normaliser applies, used here to turn a raw bubble
/// reconstruction into a well-formed allele pair.
fn diff_span(reference: &[u8], alt: &[u8], span_start: u32, contig: &str) -> Option<Variant> {
    if reference == alt {
        return None;
    }
    let mut prefix = 0usize;
    while prefix < reference.len() && prefix < alt.len() && reference[prefix] == alt[prefix] {
        prefix += 1;
    }
    let mut suffix = 0usize;
    while suffix < reference.len() - prefix
        && suffix < alt.len() - prefix
        && reference[reference.len() - 1 - suffix] == alt[alt.len() - 1 - suffix]
    {
        suffix += 1;
    }
    let ref_trimmed = &reference[prefix..reference.len() - suffix];
    let alt_trimmed = &alt[prefix..alt.len() - suffix];
    if ref_trimmed.is_empty() && alt_trimmed.is_empty() {
        return None;
    }
    let region = GenomicRegion::new(contig, span_start + prefix as u32, span_start + (reference.len() - suffix) as u32);
    Some(Variant::new(Allele::new(region.clone(), ref_trimmed.to_vec()), Allele::new(region, alt_trimmed.to_vec())))
}

/// Shifts a pure insertion or deletion as far left as the repeated reference motif
/// allows, the canonical VCF indel representation: `ACGTGTGT` + insert `GT` at the end
/// of the repeat should equal insert `GT` at its start.
fn left_align(variant: Variant, reference_bases: &[u8], region: &GenomicRegion) -> Variant {
    if variant.is_trivial() || variant.reference.len() == variant.alternative.len() {
        return variant;
    }
    let (shorter, longer) = if variant.reference.is_empty() {
        (&variant.reference, &variant.alternative)
    } else {
        (&variant.alternative, &variant.reference)
    };
    if !shorter.bases.is_empty() {
        // Only pure insertions/deletions (one empty allele) are left-aligned here.
        return variant;
    }

    let mut begin = variant.reference.region.begin;
    let mut end = variant.reference.region.end;
    let mut moving = longer.bases.clone();
    loop {
        if begin <= region.begin {
            break;
        }
        let preceding_index = (begin - 1).checked_sub(region.begin);
        let Some(preceding_index) = preceding_index else { break };
        let Some(&preceding_base) = reference_bases.get(preceding_index as usize) else { break };
        let Some(&last_base) = moving.last() else { break };
        if preceding_base != last_base {
            break;
        }
        moving.pop();
        moving.insert(0, preceding_base);
        begin -= 1;
        end -= 1;
    }

    let site = GenomicRegion::new(region.contig.clone(), begin, end);
    if variant.reference.is_empty() {
        Variant::new(Allele::new(site.clone(), Vec::new()), Allele::new(site, moving))
    } else {
        Variant::new(Allele::new(site.clone(), moving), Allele::new(site, Vec::new()))
    }
}
