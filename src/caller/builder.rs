use crate::caller::cancer::CancerCaller;
use crate::caller::individual::IndividualCaller;
use crate::caller::pedigree::PedigreeCaller;
use crate::caller::polyclone::PolycloneCaller;
use crate::caller::population::PopulationCaller;
use crate::caller::Caller;
use crate::errors::{Error, Result};
use crate::genotyping::cancer::{CancerConfig, CancerModel};
use crate::genotyping::pedigree::{Pedigree, PedigreeConfig, PedigreeModel};
use crate::genotyping::polyclone::{PolycloneConfig, PolycloneModel};

/// Parameters every caller accepts, independent of the generative model chosen —
/// mirrors the general/model-specific split `variant_caller_builder.cpp` settled on,
/// where `VariantCallerBuilder::set_params` takes the shared fields and a later
/// `set_model_parameters` call supplies the rest.
#[derive(Debug, Clone)]
pub struct GeneralCallerParameters {
    pub ploidy: usize,
    pub min_variant_posterior: f64,
    pub min_refcall_posterior: f64,
}

impl Default for GeneralCallerParameters {
    fn default() -> Self {
        GeneralCallerParameters { ploidy: 2, min_variant_posterior: 0.5, min_refcall_posterior: 0.5 }
    }
}

/// The model-specific inputs a generative model needs beyond `GeneralCallerParameters`,
/// one variant per entry in the source's `generate_factory()` map (`population`,
/// `cancer`, `trio`) plus the two models this crate adds (`individual`, `polyclone`).
pub enum ModelSpecificParameters {
    Individual { sample: String },
    Population { samples: Vec<String> },
    Cancer { normal_sample: String, tumour_sample: String, config: CancerConfig },
    Pedigree { pedigree: Pedigree, config: PedigreeConfig },
    Polyclone { sample: String, config: PolycloneConfig },
}

/// Assembles a `Caller` from general parameters plus one `ModelSpecificParameters`
/// choice, refusing to build without a model the way the source's factory refuses an
/// unrecognised model name.
#[derive(Default)]
pub struct VariantCallerBuilder {
    general: GeneralCallerParameters,
    model: Option<ModelSpecificParameters>,
}

impl VariantCallerBuilder {
    pub fn new() -> Self {
        VariantCallerBuilder { general: GeneralCallerParameters::default(), model: None }
    }

    pub fn ploidy(mut self, ploidy: usize) -> Self {
        self.general.ploidy = ploidy;
        self
    }

    pub fn min_variant_posterior(mut self, value: f64) -> Self {
        self.general.min_variant_posterior = value;
        self
    }

    pub fn min_refcall_posterior(mut self, value: f64) -> Self {
        self.general.min_refcall_posterior = value;
        self
    }

    pub fn model(mut self, model: ModelSpecificParameters) -> Self {
        self.model = Some(model);
        self
    }

    pub fn build(self) -> Result<Caller> {
        let model = self.model.ok_or_else(|| Error::Config("no caller model selected".to_string()))?;
        let general = self.general;
        let caller = match model {
            ModelSpecificParameters::Individual { sample } => {
                let mut c = IndividualCaller::new(sample, general.ploidy);
                c.min_variant_posterior = general.min_variant_posterior;
                c.min_refcall_posterior = general.min_refcall_posterior;
                Caller::Individual(c)
            }
            ModelSpecificParameters::Population { samples } => {
                if samples.is_empty() {
                    return Err(Error::Config("population caller requires at least one sample".to_string()));
                }
                let mut c = PopulationCaller::new(samples, general.ploidy);
                c.min_variant_posterior = general.min_variant_posterior;
                c.min_refcall_posterior = general.min_refcall_posterior;
                Caller::Population(c)
            }
            ModelSpecificParameters::Cancer { normal_sample, tumour_sample, config } => {
                let mut c = CancerCaller::new(normal_sample, tumour_sample, CancerModel::new(config));
                c.min_variant_posterior = general.min_variant_posterior;
                c.min_refcall_posterior = general.min_refcall_posterior;
                Caller::Cancer(c)
            }
            ModelSpecificParameters::Pedigree { pedigree, config } => {
                if pedigree.members.is_empty() {
                    return Err(Error::Config("pedigree caller requires at least one member".to_string()));
                }
                let mut c = PedigreeCaller::new(pedigree, PedigreeModel::new(config));
                c.min_variant_posterior = general.min_variant_posterior;
                c.min_refcall_posterior = general.min_refcall_posterior;
                Caller::Pedigree(c)
            }
            ModelSpecificParameters::Polyclone { sample, config } => {
                let mut c = PolycloneCaller::new(sample, PolycloneModel::new(config));
                c.min_variant_posterior = general.min_variant_posterior;
                c.min_refcall_posterior = general.min_refcall_posterior;
                Caller::Polyclone(c)
            }
        };
        Ok(caller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_without_a_model_is_refused() {
        let result = VariantCallerBuilder::new().build();
        assert!(result.is_err());
    }

    #[test]
    fn build_an_individual_caller() {
        let caller = VariantCallerBuilder::new()
            .ploidy(2)
            .model(ModelSpecificParameters::Individual { sample: "s1".to_string() })
            .build()
            .expect("builds");
        assert!(matches!(caller, Caller::Individual(_)));
    }

    #[test]
    fn population_caller_requires_at_least_one_sample() {
        let result = VariantCallerBuilder::new()
            .model(ModelSpecificParameters::Population { samples: vec![] })
            .build();
        assert!(result.is_err());
    }
}
