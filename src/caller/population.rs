use crate::caller::{
    call_reference_from_genotype_posteriors, call_variants_from_genotype_posteriors, CallType, Latents, LatentsCache,
    ReferenceCall, VariantCall,
};
use crate::containers::pileup::ReadPileup;
use crate::genomics::allele::{Allele, Variant};
use crate::genomics::haplotype::Haplotype;
use crate::genotyping::population::PopulationModel;
use crate::likelihood::array::HaplotypeLikelihoodArray;

/// Calls a cohort jointly at a fixed ploidy, refining the allele-frequency prior every
/// sample shares from the cohort's own posteriors.
pub struct PopulationCaller {
    pub samples: Vec<String>,
    pub model: PopulationModel,
    pub min_variant_posterior: f64,
    pub min_refcall_posterior: f64,
}

impl PopulationCaller {
    pub fn new(samples: Vec<String>, ploidy: usize) -> Self {
        PopulationCaller {
            samples,
            model: PopulationModel::new(ploidy),
            min_variant_posterior: 0.5,
            min_refcall_posterior: 0.5,
        }
    }

    pub fn call_types(&self) -> Vec<CallType> {
        vec![CallType::Germline, CallType::Reference]
    }

    pub fn min_callable_ploidy(&self) -> usize {
        self.model.ploidy
    }

    pub fn max_callable_ploidy(&self) -> usize {
        self.model.ploidy
    }

    pub fn infer_latents(&self, haplotypes: &[Haplotype], likelihoods: &HaplotypeLikelihoodArray) -> Box<dyn Latents> {
        let posteriors = self.model.infer_latents(haplotypes, &self.samples, likelihoods);
        Box::new(LatentsCache::new(posteriors, haplotypes.len()))
    }

    pub fn call_variants(&self, candidates: &[Variant], haplotypes: &[Haplotype], latents: &dyn Latents) -> Vec<VariantCall> {
        call_variants_from_genotype_posteriors(
            candidates,
            haplotypes,
            latents.genotype_posteriors(),
            self.min_variant_posterior,
            CallType::Germline,
        )
    }

    pub fn call_reference(
        &self,
        alleles: &[Allele],
        haplotypes: &[Haplotype],
        latents: &dyn Latents,
        pileup: &ReadPileup,
    ) -> Vec<ReferenceCall> {
        call_reference_from_genotype_posteriors(
            alleles,
            haplotypes,
            latents.genotype_posteriors(),
            pileup,
            self.min_refcall_posterior,
        )
    }

    /// Two distinct haplotype strings that are indistinguishable to every sample in the
    /// cohort (identical read support everywhere) should be collapsed before scoring so
    /// neither's posterior is diluted by the other; this caller trusts the haplotype
    /// tree's own deduplication (`constituent_alleles`-keyed) and does no further pruning.
    pub fn remove_duplicates(&self, _haplotypes: &mut Vec<Haplotype>) -> usize {
        0
    }
}
