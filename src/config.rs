use std::collections::HashMap;

use crate::caller::builder::{GeneralCallerParameters, ModelSpecificParameters, VariantCallerBuilder};
use crate::caller::Caller;
use crate::errors::{Error, Result};
use crate::genotyping::cancer::CancerConfig;
use crate::genotyping::pedigree::{Pedigree, PedigreeConfig};
use crate::genotyping::polyclone::PolycloneConfig;

/// Which generative model a run uses, mirroring `caller ∈ {individual, population, cancer,
/// trio, polyclone}` plus the pedigree generalisation of `trio`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerKind {
    Individual,
    Population,
    Cancer,
    Pedigree,
    Polyclone,
}

/// How reference (non-variant) positions are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefcallType {
    #[default]
    None,
    Positional,
    Blocked,
}

/// The recognised configuration surface: caller choice, ploidy with per-sample
/// overrides, haplotype/posterior/phase thresholds, and the model-specific sample
/// names a caller needs. One `CallerConfig` builds exactly one `Caller` via
/// `to_builder`/`VariantCallerBuilder`.
#[derive(Debug, Clone)]
pub struct CallerConfig {
    pub caller: CallerKind,
    pub ploidy: usize,
    pub sample_ploidy: HashMap<String, usize>,
    pub max_haplotypes: usize,
    pub min_haplotype_posterior: f64,
    pub min_variant_posterior: f64,
    pub min_refcall_posterior: f64,
    pub min_somatic_posterior: f64,
    pub min_phase_score: f64,
    pub allow_flank_scoring: bool,
    pub allow_model_filtering: bool,
    pub samples: Vec<String>,
    pub normal_sample: Option<String>,
    pub tumour_sample: Option<String>,
    pub maternal_sample: Option<String>,
    pub paternal_sample: Option<String>,
    pub pedigree: Option<Pedigree>,
    pub refcall_type: RefcallType,
    pub call_sites_only: bool,
    pub threads: usize,
}

impl Default for CallerConfig {
    fn default() -> Self {
        CallerConfig {
            caller: CallerKind::Individual,
            ploidy: 2,
            sample_ploidy: HashMap::new(),
            max_haplotypes: 128,
            min_haplotype_posterior: 1e-4,
            min_variant_posterior: 0.5,
            min_refcall_posterior: 0.5,
            min_somatic_posterior: 0.5,
            min_phase_score: 10.0,
            allow_flank_scoring: true,
            allow_model_filtering: true,
            samples: Vec::new(),
            normal_sample: None,
            tumour_sample: None,
            maternal_sample: None,
            paternal_sample: None,
            pedigree: None,
            refcall_type: RefcallType::default(),
            call_sites_only: false,
            threads: 1,
        }
    }
}

impl CallerConfig {
    /// Ploidy to use for one sample: the per-sample override if one was given,
    /// otherwise the run-wide default.
    pub fn ploidy_for(&self, sample: &str) -> usize {
        self.sample_ploidy.get(sample).copied().unwrap_or(self.ploidy)
    }

    /// Assembles the `Caller` this configuration describes, refusing combinations a
    /// `VariantCallerBuilder` would also refuse (missing samples for the chosen model)
    /// plus the configuration checks that only make sense at this layer (a pedigree
    /// must actually be supplied for `Pedigree`, a normal/tumour pair for `Cancer`).
    pub fn build_caller(&self) -> Result<Caller> {
        let general = GeneralCallerParameters {
            ploidy: self.ploidy,
            min_variant_posterior: self.min_variant_posterior,
            min_refcall_posterior: self.min_refcall_posterior,
        };

        let model = match self.caller {
            CallerKind::Individual => {
                let sample = self
                    .samples
                    .first()
                    .cloned()
                    .ok_or_else(|| Error::Config("individual caller requires exactly one sample".to_string()))?;
                ModelSpecificParameters::Individual { sample }
            }
            CallerKind::Population => ModelSpecificParameters::Population { samples: self.samples.clone() },
            CallerKind::Cancer => {
                let normal_sample = self
                    .normal_sample
                    .clone()
                    .ok_or_else(|| Error::Config("cancer caller requires normal_sample".to_string()))?;
                let tumour_sample = self
                    .tumour_sample
                    .clone()
                    .ok_or_else(|| Error::Config("cancer caller requires tumour_sample".to_string()))?;
                ModelSpecificParameters::Cancer {
                    normal_sample,
                    tumour_sample,
                    config: CancerConfig { min_somatic_posterior: self.min_somatic_posterior, ..CancerConfig::default() },
                }
            }
            CallerKind::Pedigree => {
                let pedigree = self.pedigree.clone().ok_or_else(|| Error::Config("pedigree caller requires a pedigree".to_string()))?;
                ModelSpecificParameters::Pedigree { pedigree, config: PedigreeConfig { ploidy: self.ploidy, ..PedigreeConfig::default() } }
            }
            CallerKind::Polyclone => {
                let sample = self
                    .samples
                    .first()
                    .cloned()
                    .ok_or_else(|| Error::Config("polyclone caller requires exactly one sample".to_string()))?;
                ModelSpecificParameters::Polyclone { sample, config: PolycloneConfig::default() }
            }
        };

        let mut builder = VariantCallerBuilder::new()
            .ploidy(general.ploidy)
            .min_variant_posterior(general.min_variant_posterior)
            .min_refcall_posterior(general.min_refcall_posterior);
        builder = builder.model(model);
        builder.build()
    }
}

/// Resolves a trio's two parent samples into a `Pedigree`, the configuration-layer
/// counterpart of `Pedigree::trio` for the common two-generation case named in the
/// design (`maternal_sample, paternal_sample`).
pub fn trio_pedigree(child: &str, maternal_sample: &str, paternal_sample: &str) -> Pedigree {
    Pedigree::trio(child, maternal_sample, paternal_sample)
}
