use std::path::PathBuf;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::candidates::{CandidateGenerator, CandidateGeneratorConfig};
use crate::caller::{Caller, CallerOperations, ReferenceCall, VariantCall};
use crate::config::{CallerConfig, RefcallType};
use crate::containers::mappable_collection::MappableCollection;
use crate::containers::pileup::ReadPileup;
use crate::containers::read_map::ReadMap;
use crate::errors::{Error, Result};
use crate::genomics::allele::Variant;
use crate::genomics::haplotype::{FlankState, Haplotype};
use crate::genomics::region::GenomicRegion;
use crate::haplotypes::filter::filter_to_n;
use crate::haplotypes::tree::HaplotypeTree;
use crate::io::reads::ReadReader;
use crate::io::reference::ReferenceReader;
use crate::io::vcf::VcfWriter;
use crate::likelihood::array::HaplotypeLikelihoodArray;
use crate::phasing::{Phaser, PhaserConfig};
use crate::walker::driver::ContigWalkDriver;
use crate::walker::genome_walker::{ExtensionPolicy, GenomeWalker, IndicatorPolicy};

/// Everything the pipeline needs that is not already folded into `CallerConfig`: file
/// paths, the candidate generator's thresholds, and the walker's three enumerated
/// policies. One `PipelineConfig` drives exactly one run over every contig the
/// reference declares.
pub struct PipelineConfig {
    pub reference_path: PathBuf,
    pub read_paths: Vec<PathBuf>,
    pub output_path: PathBuf,
    pub as_bcf: bool,
    pub caller_config: CallerConfig,
    pub candidate_config: CandidateGeneratorConfig,
    pub max_included: usize,
    pub indicator_policy: IndicatorPolicy,
    pub extension_policy: ExtensionPolicy,
    pub max_haplotypes: usize,
    pub phaser: PhaserConfig,
    pub refcall_type: RefcallType,
    pub call_sites_only: bool,
}

/// The outcome of processing one window: the variant and reference calls it produced,
/// kept alongside the window region so contig-level assembly can restore strict
/// `begin`-ascending emission order after windows were scored concurrently.
struct WindowOutcome {
    region: GenomicRegion,
    variant_calls: Vec<VariantCall>,
    reference_calls: Vec<ReferenceCall>,
}

/// Runs the full per-contig pipeline over every contig in the reference, in reference
/// contig order, and writes the result to `config.output_path`.
///
/// Follows the design's scheduling model: contigs are processed with coarse-grained
/// task parallelism (`rayon`'s global pool), the genome walker within one contig is run
/// to completion first (cheap, sequential — it is a state machine over candidate
/// alleles) and then every window's heavy compute (candidate generation already done,
/// haplotype tree construction, pair-HMM scoring, genotype inference) runs in parallel
/// across that contig's windows. The VCF writer itself is single-threaded and only
/// entered once a contig's windows are all resolved, serialising output to match the
/// reference's contig order regardless of which contig's compute finished first.
pub fn run(config: &PipelineConfig) -> Result<()> {
    let reference = ReferenceReader::from_path(&config.reference_path)?;
    let read_reader = ReadReader::from_paths(&config.read_paths)?;

    let samples = if config.caller_config.samples.is_empty() {
        read_reader.sample_names()
    } else {
        config.caller_config.samples.clone()
    };
    let caller = config.caller_config.build_caller()?;
    let call_types = caller.call_types();

    let mut writer = VcfWriter::create(
        &config.output_path,
        &samples,
        &call_types,
        reference.contigs(),
        config.as_bcf,
    )?;

    for (contig, length) in reference.contigs() {
        info!("processing contig {contig} ({length} bp)");
        match process_contig(config, &reference, &read_reader, &caller, &samples, contig, *length as u32) {
            Ok(outcomes) => {
                for outcome in outcomes {
                    for call in &outcome.variant_calls {
                        writer.write_variant_call(call)?;
                    }
                    if config.refcall_type != RefcallType::None {
                        for call in &outcome.reference_calls {
                            writer.write_reference_call(call)?;
                        }
                    }
                }
            }
            Err(err) => {
                // The design's error-handling model aborts only the offending unit of
                // work (here, the contig) and continues with the rest of the run.
                warn!("contig {contig} aborted: {err}");
            }
        }
    }

    Ok(())
}

/// Computes every window for `contig` with the sequential walker, then scores them
/// concurrently and returns outcomes sorted back into ascending `begin` order.
fn process_contig(
    config: &PipelineConfig,
    reference: &ReferenceReader,
    read_reader: &ReadReader,
    caller: &Caller,
    samples: &[String],
    contig: &str,
    contig_length: u32,
) -> Result<Vec<WindowOutcome>> {
    let contig_region = GenomicRegion::new(contig.to_string(), 0, contig_length);
    let contig_reads = read_reader.fetch(&contig_region, samples)?;
    let reference_bases = reference.fetch(&contig_region)?;

    let candidate_generator = CandidateGenerator::new(config.candidate_config.clone());
    let candidates = candidate_generator.generate(&contig_reads, &contig_region, &reference_bases);
    debug!("contig {contig}: {} candidate alleles", candidates.len());

    let walker = GenomeWalker::new(config.max_included, config.indicator_policy, config.extension_policy);
    let mut driver = ContigWalkDriver::new(&walker, contig, contig_length);
    let mut windows = Vec::new();
    while let Some(window) = driver.next_window(&contig_reads, &candidates) {
        windows.push(window);
    }

    if config.call_sites_only && candidates.is_empty() {
        return Ok(Vec::new());
    }

    let mut outcomes: Vec<WindowOutcome> = windows
        .into_par_iter()
        .filter_map(|window| {
            match process_window(config, &contig_region, &reference_bases, &contig_reads, &candidates, caller, samples, &window) {
                Ok(outcome) => Some(outcome),
                Err(err) => {
                    warn!("window {}:{}-{} skipped: {err}", window.contig, window.begin, window.end);
                    None
                }
            }
        })
        .collect();

    outcomes.sort_by(|a, b| a.region.cmp(&b.region));
    Ok(outcomes)
}

/// Scores one window: narrows to its candidates and reads, builds the haplotype
/// universe, scores every read against every haplotype, filters down to a tractable set,
/// infers per-sample genotype posteriors, and emits variant/reference calls.
fn process_window(
    config: &PipelineConfig,
    contig_region: &GenomicRegion,
    contig_reference_bases: &[u8],
    contig_reads: &ReadMap,
    contig_candidates: &[Variant],
    caller: &Caller,
    samples: &[String],
    window: &GenomicRegion,
) -> Result<WindowOutcome> {
    if window.is_empty() || !contig_region.contains(window) {
        return Ok(WindowOutcome { region: window.clone(), variant_calls: Vec::new(), reference_calls: Vec::new() });
    }

    let window_candidates: Vec<Variant> = contig_candidates.iter().filter(|v| v.region().overlaps(window)).cloned().collect();
    let reference_bases = slice_region(contig_region, contig_reference_bases, window);
    let window_reads = narrow_to_window(contig_reads, window);

    // `HaplotypeTree::extend` has no implicit "skip this site" branch: every alternative
    // extended into a site is mandatory for every resulting haplotype. To keep reference
    // a live possibility at each candidate site, extend the reference allele alongside
    // the alternative rather than the alternative alone.
    let mut tree = HaplotypeTree::new(window.clone(), reference_bases.to_vec());
    for variant in &window_candidates {
        if !variant.is_trivial() {
            tree.extend(variant.reference.clone());
            tree.extend(variant.alternative.clone());
        }
    }
    let mut haplotypes: Vec<Haplotype> = tree.extract_haplotypes();
    caller.remove_duplicates(&mut haplotypes);

    // Every haplotype in a window shares the window's own region exactly (the tree is
    // built over `window`, not an extended flanking span), so there is no inactive
    // flank for the likelihood model to mask here; `allow_flank_scoring` gates a wider
    // active-region extension this pipeline does not implement (see DESIGN.md).
    let active_region = window.clone();
    let flank_state_for = move |_: &Haplotype| FlankState::new(active_region.clone());
    let likelihoods = HaplotypeLikelihoodArray::populate(haplotypes.clone(), &window_reads, flank_state_for);

    if config.caller_config.allow_model_filtering && haplotypes.len() > config.max_haplotypes {
        let _removed = filter_to_n(&mut haplotypes, samples, &likelihoods, config.max_haplotypes);
    }

    let latents = caller.infer_latents(&haplotypes, &likelihoods);
    let mut variant_calls = caller.call_variants(&window_candidates, &haplotypes, latents.as_ref());

    let reference_calls = if config.refcall_type != RefcallType::None {
        let pileup = ReadPileup::from_reads(&window_reads, window);
        let reference_alleles: Vec<_> = window_candidates.iter().map(|v| v.reference.clone()).collect();
        caller.call_reference(&reference_alleles, &haplotypes, latents.as_ref(), &pileup)
    } else {
        Vec::new()
    };

    phase_calls(config, &haplotypes, &likelihoods, samples, &mut variant_calls);

    Ok(WindowOutcome { region: window.clone(), variant_calls, reference_calls })
}

/// Local phasing: for each sample, groups the window's called variants into phase sets
/// and stamps each `SampleCall`'s `phase_set` with its group's anchor region.
fn phase_calls(
    config: &PipelineConfig,
    haplotypes: &[Haplotype],
    likelihoods: &HaplotypeLikelihoodArray,
    samples: &[String],
    variant_calls: &mut [VariantCall],
) {
    if variant_calls.len() < 2 {
        return;
    }
    let phaser = Phaser::new(config.phaser.clone());
    let variants: Vec<Variant> = variant_calls.iter().map(|c| c.variant.clone()).collect();

    for sample in samples {
        let phase_sets = phaser.phase_variants(haplotypes, likelihoods, sample, &variants);
        for phase_set in &phase_sets {
            for &variant_idx in &phase_set.variant_indices {
                if let Some(sample_call) = variant_calls[variant_idx].samples.iter_mut().find(|sc| &sc.sample == sample) {
                    sample_call.phase_set = Some(phase_set.anchor.clone());
                }
            }
        }
    }
}

/// Reference bases for `window`, sliced out of the already-fetched `contig_bases`
/// (which spans `contig_region`). Avoids a second FASTA fetch per window.
fn slice_region<'a>(contig_region: &GenomicRegion, contig_bases: &'a [u8], window: &GenomicRegion) -> &'a [u8] {
    let start = (window.begin - contig_region.begin) as usize;
    let end = (window.end - contig_region.begin) as usize;
    &contig_bases[start..end]
}

/// Restricts a contig-wide `ReadMap` to the reads overlapping `window`, per sample.
fn narrow_to_window(contig_reads: &ReadMap, window: &GenomicRegion) -> ReadMap {
    let mut narrowed = ReadMap::new();
    for sample in contig_reads.sample_names() {
        let Some(reads) = contig_reads.reads_for(sample) else { continue };
        let overlapping: Vec<_> = reads.overlap_range(window).iter().cloned().collect();
        narrowed.insert_sample(sample.clone(), MappableCollection::from_sorted(overlapping));
    }
    narrowed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_region_extracts_the_window_span() {
        let contig_region = GenomicRegion::new("1", 0, 10);
        let bases = b"ACGTACGTAC";
        let window = GenomicRegion::new("1", 2, 5);
        assert_eq!(slice_region(&contig_region, bases, &window), b"GTA");
    }
}
