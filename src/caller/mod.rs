pub mod builder;
pub mod cancer;
pub mod individual;
pub mod latents;
pub mod pedigree;
pub mod polyclone;
pub mod population;
pub mod variant_call;

pub use builder::{GeneralCallerParameters, ModelSpecificParameters, VariantCallerBuilder};
pub use latents::{Latents, LatentsCache};
pub use variant_call::{CallType, ReferenceCall, SampleCall, VariantCall};

use std::collections::HashMap;

use crate::containers::pileup::ReadPileup;
use crate::genomics::allele::{Allele, Variant};
use crate::genomics::haplotype::Haplotype;
use crate::genotyping::individual_model::GenotypePosteriors;
use crate::likelihood::array::HaplotypeLikelihoodArray;
use crate::utils::phred::Phred;

/// The operations every generative-model-specific caller supports, shared across the
/// tagged `Caller` variants. Replaces the source's abstract `Caller` base class +
/// per-model overrides (`PolycloneCaller : public Caller`, etc.) with one trait object
/// per model instance, per the design's "replacing inheritance-based callers" note.
pub trait CallerOperations {
    fn call_types(&self) -> Vec<CallType>;
    fn min_callable_ploidy(&self) -> usize;
    fn max_callable_ploidy(&self) -> usize;
    fn infer_latents(&self, haplotypes: &[Haplotype], likelihoods: &HaplotypeLikelihoodArray) -> Box<dyn Latents>;
    fn call_variants(&self, candidates: &[Variant], haplotypes: &[Haplotype], latents: &dyn Latents) -> Vec<VariantCall>;
    fn call_reference(
        &self,
        alleles: &[Allele],
        haplotypes: &[Haplotype],
        latents: &dyn Latents,
        pileup: &ReadPileup,
    ) -> Vec<ReferenceCall>;
    fn remove_duplicates(&self, haplotypes: &mut Vec<Haplotype>) -> usize;
}

/// The generative model a window is scored under, selected by `--caller` on the CLI and
/// assembled by `VariantCallerBuilder`. One concrete type per variant backs
/// `CallerOperations`; matching over this enum is the sole dispatch point, so adding a
/// model never requires touching the pipeline driver.
pub enum Caller {
    Individual(individual::IndividualCaller),
    Population(population::PopulationCaller),
    Cancer(cancer::CancerCaller),
    Pedigree(pedigree::PedigreeCaller),
    Polyclone(polyclone::PolycloneCaller),
}

impl CallerOperations for Caller {
    fn call_types(&self) -> Vec<CallType> {
        match self {
            Caller::Individual(c) => c.call_types(),
            Caller::Population(c) => c.call_types(),
            Caller::Cancer(c) => c.call_types(),
            Caller::Pedigree(c) => c.call_types(),
            Caller::Polyclone(c) => c.call_types(),
        }
    }

    fn min_callable_ploidy(&self) -> usize {
        match self {
            Caller::Individual(c) => c.min_callable_ploidy(),
            Caller::Population(c) => c.min_callable_ploidy(),
            Caller::Cancer(c) => c.min_callable_ploidy(),
            Caller::Pedigree(c) => c.min_callable_ploidy(),
            Caller::Polyclone(c) => c.min_callable_ploidy(),
        }
    }

    fn max_callable_ploidy(&self) -> usize {
        match self {
            Caller::Individual(c) => c.max_callable_ploidy(),
            Caller::Population(c) => c.max_callable_ploidy(),
            Caller::Cancer(c) => c.max_callable_ploidy(),
            Caller::Pedigree(c) => c.max_callable_ploidy(),
            Caller::Polyclone(c) => c.max_callable_ploidy(),
        }
    }

    fn infer_latents(&self, haplotypes: &[Haplotype], likelihoods: &HaplotypeLikelihoodArray) -> Box<dyn Latents> {
        match self {
            Caller::Individual(c) => c.infer_latents(haplotypes, likelihoods),
            Caller::Population(c) => c.infer_latents(haplotypes, likelihoods),
            Caller::Cancer(c) => c.infer_latents(haplotypes, likelihoods),
            Caller::Pedigree(c) => c.infer_latents(haplotypes, likelihoods),
            Caller::Polyclone(c) => c.infer_latents(haplotypes, likelihoods),
        }
    }

    fn call_variants(&self, candidates: &[Variant], haplotypes: &[Haplotype], latents: &dyn Latents) -> Vec<VariantCall> {
        match self {
            Caller::Individual(c) => c.call_variants(candidates, haplotypes, latents),
            Caller::Population(c) => c.call_variants(candidates, haplotypes, latents),
            Caller::Cancer(c) => c.call_variants(candidates, haplotypes, latents),
            Caller::Pedigree(c) => c.call_variants(candidates, haplotypes, latents),
            Caller::Polyclone(c) => c.call_variants(candidates, haplotypes, latents),
        }
    }

    fn call_reference(
        &self,
        alleles: &[Allele],
        haplotypes: &[Haplotype],
        latents: &dyn Latents,
        pileup: &ReadPileup,
    ) -> Vec<ReferenceCall> {
        match self {
            Caller::Individual(c) => c.call_reference(alleles, haplotypes, latents, pileup),
            Caller::Population(c) => c.call_reference(alleles, haplotypes, latents, pileup),
            Caller::Cancer(c) => c.call_reference(alleles, haplotypes, latents, pileup),
            Caller::Pedigree(c) => c.call_reference(alleles, haplotypes, latents, pileup),
            Caller::Polyclone(c) => c.call_reference(alleles, haplotypes, latents, pileup),
        }
    }

    fn remove_duplicates(&self, haplotypes: &mut Vec<Haplotype>) -> usize {
        match self {
            Caller::Individual(c) => c.remove_duplicates(haplotypes),
            Caller::Population(c) => c.remove_duplicates(haplotypes),
            Caller::Cancer(c) => c.remove_duplicates(haplotypes),
            Caller::Pedigree(c) => c.remove_duplicates(haplotypes),
            Caller::Polyclone(c) => c.remove_duplicates(haplotypes),
        }
    }
}

/// Haplotype indices whose constituent alleles include `allele` exactly — the set a
/// variant call's posterior is marginalised over.
pub(crate) fn haplotypes_carrying(haplotypes: &[Haplotype], allele: &Allele) -> Vec<usize> {
    haplotypes.iter().enumerate().filter(|(_, h)| h.contains_allele(allele)).map(|(i, _)| i).collect()
}

/// Haplotype indices carrying some allele at all overlapping `region` — used by
/// `call_reference` to find which haplotypes are non-reference at a candidate refcall
/// site (any allele, not the specific reference allele).
pub(crate) fn haplotypes_non_reference_over(haplotypes: &[Haplotype], region: &crate::genomics::region::GenomicRegion) -> Vec<usize> {
    haplotypes
        .iter()
        .enumerate()
        .filter(|(_, h)| h.constituent_alleles().iter().any(|a| a.region.overlaps(region)))
        .map(|(i, _)| i)
        .collect()
}

/// Shared `call_variants` body for every caller whose latents are "one
/// `GenotypePosteriors` per sample" (individual, population, pedigree): a candidate
/// variant is called in a sample once the marginal posterior over haplotypes carrying
/// its alt allele clears `min_variant_posterior`.
pub(crate) fn call_variants_from_genotype_posteriors(
    candidates: &[Variant],
    haplotypes: &[Haplotype],
    genotype_posteriors: &HashMap<String, GenotypePosteriors>,
    min_variant_posterior: f64,
    call_type: CallType,
) -> Vec<VariantCall> {
    let mut calls = Vec::new();
    for variant in candidates {
        if variant.is_trivial() {
            continue;
        }
        let matching = haplotypes_carrying(haplotypes, &variant.alternative);
        if matching.is_empty() {
            continue;
        }
        let mut samples = Vec::new();
        let mut max_posterior = 0.0f64;
        for (sample, gp) in genotype_posteriors {
            let posterior = gp.marginal_probability_any(&matching);
            max_posterior = max_posterior.max(posterior);
            if posterior >= min_variant_posterior {
                samples.push(SampleCall {
                    sample: sample.clone(),
                    genotype: gp.map_genotype().haplotype_indices.clone(),
                    genotype_posterior: Phred::from_probability((1.0 - posterior).max(f64::MIN_POSITIVE)),
                    phase_set: None,
                });
            }
        }
        if samples.is_empty() {
            continue;
        }
        calls.push(VariantCall {
            variant: variant.clone(),
            quality: Phred::from_probability((1.0 - max_posterior).max(f64::MIN_POSITIVE)),
            call_type,
            samples,
        });
    }
    calls
}

/// Shared `call_reference` body for the same family of callers: a site is confidently
/// reference in a sample when the posterior mass on genotypes with no haplotype
/// non-reference at that site clears `min_refcall_posterior`.
pub(crate) fn call_reference_from_genotype_posteriors(
    alleles: &[Allele],
    haplotypes: &[Haplotype],
    genotype_posteriors: &HashMap<String, GenotypePosteriors>,
    pileup: &ReadPileup,
    min_refcall_posterior: f64,
) -> Vec<ReferenceCall> {
    let mut calls = Vec::new();
    for allele in alleles {
        let non_reference = haplotypes_non_reference_over(haplotypes, &allele.region);
        let mut samples = Vec::new();
        let mut min_posterior = 1.0f64;
        for (sample, gp) in genotype_posteriors {
            // A site with no read coverage has nothing to call reference from, whatever
            // the prior-only posterior says.
            if pileup.depth(allele.region.begin, sample) == 0 {
                continue;
            }
            let reference_posterior = 1.0 - gp.marginal_probability_any(&non_reference);
            if reference_posterior >= min_refcall_posterior {
                min_posterior = min_posterior.min(reference_posterior);
                samples.push(SampleCall {
                    sample: sample.clone(),
                    genotype: gp.map_genotype().haplotype_indices.clone(),
                    genotype_posterior: Phred::from_probability((1.0 - reference_posterior).max(f64::MIN_POSITIVE)),
                    phase_set: None,
                });
            }
        }
        if samples.is_empty() {
            continue;
        }
        calls.push(ReferenceCall {
            allele: allele.clone(),
            quality: Phred::from_probability((1.0 - min_posterior).max(f64::MIN_POSITIVE)),
            samples,
        });
    }
    calls
}
