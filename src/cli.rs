use std::collections::HashMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use crate::config::{trio_pedigree, CallerConfig, CallerKind, RefcallType};
use crate::errors::{Error, Result};
use crate::walker::genome_walker::{ExtensionPolicy, IndicatorPolicy};

/// Command-line surface, mirroring the recognised configuration options the design's
/// external-interfaces section enumerates. One `--caller` choice selects which of the
/// model-specific options (`--normal-sample`, `--maternal-sample`/`--paternal-sample`)
/// are required; `Cli::into_pipeline_config` does that validation in one place rather
/// than scattering it through `main`.
#[derive(Parser, Debug)]
#[command(name = "octopus")]
#[command(author, version, about = "Germline and somatic variant caller for aligned DNA sequencing reads")]
pub struct Cli {
    /// Indexed reference FASTA (a `.fai` must sit alongside it). Required unless
    /// `shell-completion` is the chosen subcommand.
    #[arg(short = 'R', long, value_name = "FASTA")]
    pub reference: Option<PathBuf>,

    /// One or more indexed BAM/CRAM files.
    #[arg(short = 'I', long = "reads", value_name = "BAM", num_args = 0..)]
    pub reads: Vec<PathBuf>,

    /// Output VCF (or BCF, with `--bcf`). Required unless `shell-completion` is the
    /// chosen subcommand.
    #[arg(short = 'o', long, value_name = "VCF")]
    pub output: Option<PathBuf>,

    /// Write BCF instead of plain-text VCF.
    #[arg(long)]
    pub bcf: bool,

    /// Generative model to call under.
    #[arg(long, value_enum, default_value_t = CallerArg::Individual)]
    pub caller: CallerArg,

    /// Default ploidy for every sample not named in `--sample-ploidy`.
    #[arg(long, default_value_t = 2)]
    pub ploidy: usize,

    /// Per-sample ploidy override, `NAME=PLOIDY`, repeatable.
    #[arg(long = "sample-ploidy", value_parser = parse_sample_ploidy)]
    pub sample_ploidy: Vec<(String, usize)>,

    /// Restrict calling to these samples (defaults to every sample found in `--reads`).
    #[arg(long)]
    pub sample: Vec<String>,

    /// Normal (germline) sample, required for `--caller cancer`.
    #[arg(long)]
    pub normal_sample: Option<String>,

    /// Tumour sample, required for `--caller cancer`.
    #[arg(long)]
    pub tumour_sample: Option<String>,

    /// Maternal sample, required for `--caller trio`.
    #[arg(long)]
    pub maternal_sample: Option<String>,

    /// Paternal sample, required for `--caller trio`.
    #[arg(long)]
    pub paternal_sample: Option<String>,

    /// Child sample, required for `--caller trio`.
    #[arg(long)]
    pub child_sample: Option<String>,

    /// Maximum haplotypes retained per window before genotype inference.
    #[arg(long, default_value_t = 128)]
    pub max_haplotypes: u32,

    /// Minimum posterior (natural probability, not Phred) for a haplotype to be reported.
    #[arg(long, default_value_t = 1e-4)]
    pub min_haplotype_posterior: f64,

    /// Minimum posterior for a variant call to be emitted.
    #[arg(long, default_value_t = 0.5)]
    pub min_variant_posterior: f64,

    /// Minimum posterior for a reference call to be emitted.
    #[arg(long, default_value_t = 0.5)]
    pub min_refcall_posterior: f64,

    /// Minimum posterior for a cancer caller to label a call somatic.
    #[arg(long, default_value_t = 0.5)]
    pub min_somatic_posterior: f64,

    /// Minimum log-likelihood-ratio phase score to join two sites into one phase set.
    #[arg(long, default_value_t = 10.0)]
    pub min_phase_score: f64,

    /// How reference (non-variant) positions are reported.
    #[arg(long, value_enum, default_value_t = RefcallArg::None)]
    pub refcall: RefcallArg,

    /// Only score windows that contain at least one candidate allele.
    #[arg(long)]
    pub call_sites_only: bool,

    /// Disable flank masking in the haplotype likelihood model.
    #[arg(long)]
    pub no_flank_scoring: bool,

    /// Disable haplotype-count model filtering (keeps every haplotype for genotyping).
    #[arg(long)]
    pub no_model_filtering: bool,

    /// Maximum clones for `--caller polyclone`.
    #[arg(long, default_value_t = 4)]
    pub max_clones: usize,

    /// Worker threads for the contig/window task pool (0 = let rayon choose).
    #[arg(short, long, default_value_t = 0)]
    pub threads: usize,

    /// Genome-walker novel-allele cap per window.
    #[arg(long, default_value_t = 8)]
    pub max_included: usize,

    /// How many previously-called alleles are carried into the next window as
    /// phasing indicators.
    #[arg(long, value_enum, default_value_t = IndicatorPolicyArg::IncludeIfLinkableToNovelRegion)]
    pub indicator_policy: IndicatorPolicyArg,

    /// When the walker stops extending a window with additional novel alleles.
    #[arg(long, value_enum, default_value_t = ExtensionPolicyArg::SharedWithFrontier)]
    pub extension_policy: ExtensionPolicyArg,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Emit a shell completion script instead of running the caller.
    ShellCompletion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerArg {
    Individual,
    Population,
    Cancer,
    Trio,
    Polyclone,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefcallArg {
    None,
    Positional,
    Blocked,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorPolicyArg {
    IncludeNone,
    IncludeIfSharedWithNovelRegion,
    IncludeIfLinkableToNovelRegion,
    IncludeAll,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionPolicyArg {
    WithinReadLengthOfFirstIncluded,
    SharedWithFrontier,
    NoLimit,
}

fn parse_sample_ploidy(raw: &str) -> std::result::Result<(String, usize), String> {
    let (name, ploidy) = raw.split_once('=').ok_or_else(|| format!("expected NAME=PLOIDY, got {raw}"))?;
    let ploidy: usize = ploidy.parse().map_err(|_| format!("non-numeric ploidy in {raw}"))?;
    Ok((name.to_string(), ploidy))
}

impl From<IndicatorPolicyArg> for IndicatorPolicy {
    fn from(value: IndicatorPolicyArg) -> Self {
        match value {
            IndicatorPolicyArg::IncludeNone => IndicatorPolicy::IncludeNone,
            IndicatorPolicyArg::IncludeIfSharedWithNovelRegion => IndicatorPolicy::IncludeIfSharedWithNovelRegion,
            IndicatorPolicyArg::IncludeIfLinkableToNovelRegion => IndicatorPolicy::IncludeIfLinkableToNovelRegion,
            IndicatorPolicyArg::IncludeAll => IndicatorPolicy::IncludeAll,
        }
    }
}

impl From<ExtensionPolicyArg> for ExtensionPolicy {
    fn from(value: ExtensionPolicyArg) -> Self {
        match value {
            ExtensionPolicyArg::WithinReadLengthOfFirstIncluded => ExtensionPolicy::WithinReadLengthOfFirstIncluded,
            ExtensionPolicyArg::SharedWithFrontier => ExtensionPolicy::SharedWithFrontier,
            ExtensionPolicyArg::NoLimit => ExtensionPolicy::NoLimit,
        }
    }
}

impl From<RefcallArg> for RefcallType {
    fn from(value: RefcallArg) -> Self {
        match value {
            RefcallArg::None => RefcallType::None,
            RefcallArg::Positional => RefcallType::Positional,
            RefcallArg::Blocked => RefcallType::Blocked,
        }
    }
}

impl Cli {
    /// Resolves the parsed arguments into the `CallerConfig` the rest of the crate
    /// consumes, discovering sample names from `--reads` when `--sample` was not given
    /// for the cohort-style callers.
    pub fn build_caller_config(&self, samples_from_reads: &[String]) -> Result<CallerConfig> {
        let samples = if self.sample.is_empty() { samples_from_reads.to_vec() } else { self.sample.clone() };

        let caller = match self.caller {
            CallerArg::Individual => CallerKind::Individual,
            CallerArg::Population => CallerKind::Population,
            CallerArg::Cancer => CallerKind::Cancer,
            CallerArg::Trio => CallerKind::Pedigree,
            CallerArg::Polyclone => CallerKind::Polyclone,
        };

        let pedigree = if self.caller == CallerArg::Trio {
            let child = self.child_sample.clone().ok_or_else(|| Error::Config("trio caller requires --child-sample".to_string()))?;
            let maternal = self
                .maternal_sample
                .clone()
                .ok_or_else(|| Error::Config("trio caller requires --maternal-sample".to_string()))?;
            let paternal = self
                .paternal_sample
                .clone()
                .ok_or_else(|| Error::Config("trio caller requires --paternal-sample".to_string()))?;
            Some(trio_pedigree(&child, &maternal, &paternal))
        } else {
            None
        };

        Ok(CallerConfig {
            caller,
            ploidy: self.ploidy,
            sample_ploidy: self.sample_ploidy.iter().cloned().collect::<HashMap<_, _>>(),
            max_haplotypes: self.max_haplotypes as usize,
            min_haplotype_posterior: self.min_haplotype_posterior,
            min_variant_posterior: self.min_variant_posterior,
            min_refcall_posterior: self.min_refcall_posterior,
            min_somatic_posterior: self.min_somatic_posterior,
            min_phase_score: self.min_phase_score,
            allow_flank_scoring: !self.no_flank_scoring,
            allow_model_filtering: !self.no_model_filtering,
            samples,
            normal_sample: self.normal_sample.clone(),
            tumour_sample: self.tumour_sample.clone(),
            maternal_sample: self.maternal_sample.clone(),
            paternal_sample: self.paternal_sample.clone(),
            pedigree,
            refcall_type: self.refcall.into(),
            call_sites_only: self.call_sites_only,
            threads: self.threads,
        })
    }
}
