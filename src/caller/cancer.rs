use std::any::Any;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::caller::{
    call_reference_from_genotype_posteriors, call_variants_from_genotype_posteriors, haplotypes_carrying, CallType,
    Latents, ReferenceCall, SampleCall, VariantCall,
};
use crate::containers::pileup::ReadPileup;
use crate::genomics::allele::{Allele, Variant};
use crate::genomics::haplotype::Haplotype;
use crate::genotyping::cancer::{CancerLatents, CancerModel, SomaticCall};
use crate::genotyping::individual_model::GenotypePosteriors;
use crate::likelihood::array::HaplotypeLikelihoodArray;
use crate::utils::phred::Phred;

/// `Latents` for a paired normal/tumour call: the shared view exposes the normal
/// sample's genotype posteriors (the only sample with a formal ploidy model here), while
/// `somatic_calls`/`tumour_sample` recover the tumour-specific evidence `call_variants`
/// needs, reached through `as_any` the way `Latents` is designed to be extended.
pub struct CancerLatentsView {
    genotype_posteriors: HashMap<String, GenotypePosteriors>,
    somatic_calls: Vec<SomaticCall>,
    tumour_sample: String,
    num_haplotypes: usize,
    haplotype_posteriors: OnceLock<Vec<f64>>,
}

impl CancerLatentsView {
    fn new(normal_sample: String, tumour_sample: String, latents: CancerLatents, num_haplotypes: usize) -> Self {
        let mut genotype_posteriors = HashMap::new();
        genotype_posteriors.insert(normal_sample, latents.normal_posteriors);
        CancerLatentsView {
            genotype_posteriors,
            somatic_calls: latents.somatic_calls,
            tumour_sample,
            num_haplotypes,
            haplotype_posteriors: OnceLock::new(),
        }
    }

    pub fn somatic_calls(&self) -> &[SomaticCall] {
        &self.somatic_calls
    }

    pub fn tumour_sample(&self) -> &str {
        &self.tumour_sample
    }
}

impl Latents for CancerLatentsView {
    fn haplotype_posteriors(&self) -> &[f64] {
        self.haplotype_posteriors.get_or_init(|| {
            let num_normal_samples = self.genotype_posteriors.len().max(1) as f64;
            (0..self.num_haplotypes)
                .map(|hi| {
                    self.somatic_calls
                        .iter()
                        .find(|c| c.haplotype_idx == hi)
                        .map(|c| c.posterior())
                        .unwrap_or_else(|| {
                            self.genotype_posteriors.values().map(|gp| gp.marginal_probability(hi)).sum::<f64>()
                                / num_normal_samples
                        })
                })
                .collect()
        })
    }

    fn genotype_posteriors(&self) -> &HashMap<String, GenotypePosteriors> {
        &self.genotype_posteriors
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Calls a paired normal/tumour sample: germline variants in the normal sample under the
/// ordinary genotype-posterior rule, plus somatic calls private to the tumour sample
/// wherever `CancerModel` found a haplotype the normal genotype doesn't explain.
pub struct CancerCaller {
    pub normal_sample: String,
    pub tumour_sample: String,
    pub model: CancerModel,
    pub min_variant_posterior: f64,
    pub min_refcall_posterior: f64,
}

impl CancerCaller {
    pub fn new(normal_sample: impl Into<String>, tumour_sample: impl Into<String>, model: CancerModel) -> Self {
        CancerCaller {
            normal_sample: normal_sample.into(),
            tumour_sample: tumour_sample.into(),
            model,
            min_variant_posterior: 0.5,
            min_refcall_posterior: 0.5,
        }
    }

    pub fn call_types(&self) -> Vec<CallType> {
        vec![CallType::Germline, CallType::Somatic, CallType::Reference]
    }

    pub fn min_callable_ploidy(&self) -> usize {
        self.model.config.normal_ploidy
    }

    pub fn max_callable_ploidy(&self) -> usize {
        self.model.config.normal_ploidy
    }

    pub fn infer_latents(&self, haplotypes: &[Haplotype], likelihoods: &HaplotypeLikelihoodArray) -> Box<dyn Latents> {
        let latents = self.model.infer_latents(haplotypes, &self.normal_sample, &self.tumour_sample, likelihoods);
        Box::new(CancerLatentsView::new(self.normal_sample.clone(), self.tumour_sample.clone(), latents, haplotypes.len()))
    }

    pub fn call_variants(&self, candidates: &[Variant], haplotypes: &[Haplotype], latents: &dyn Latents) -> Vec<VariantCall> {
        let view = latents.as_any().downcast_ref::<CancerLatentsView>().expect("cancer caller latents");

        let mut calls = call_variants_from_genotype_posteriors(
            candidates,
            haplotypes,
            view.genotype_posteriors(),
            self.min_variant_posterior,
            CallType::Germline,
        );

        for somatic_call in view.somatic_calls() {
            if somatic_call.posterior() < self.min_variant_posterior {
                continue;
            }
            for variant in candidates {
                if variant.is_trivial() {
                    continue;
                }
                let matching = haplotypes_carrying(haplotypes, &variant.alternative);
                if !matching.contains(&somatic_call.haplotype_idx) {
                    continue;
                }
                calls.push(VariantCall {
                    variant: variant.clone(),
                    quality: Phred::from_probability((1.0 - somatic_call.posterior()).max(f64::MIN_POSITIVE)),
                    call_type: CallType::Somatic,
                    samples: vec![SampleCall {
                        sample: view.tumour_sample().to_string(),
                        genotype: vec![somatic_call.haplotype_idx],
                        genotype_posterior: Phred::from_probability((1.0 - somatic_call.posterior()).max(f64::MIN_POSITIVE)),
                        phase_set: None,
                    }],
                });
            }
        }

        calls
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

    pub fn remove_duplicates(&self, _haplotypes: &mut Vec<Haplotype>) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::containers::mappable_collection::MappableCollection;
    use crate::containers::read_map::ReadMap;
    use crate::genomics::haplotype::FlankState;
    use crate::genomics::read::AlignedRead;
    use crate::genomics::region::GenomicRegion;
    use crate::genotyping::cancer::CancerConfig;

    fn read_at(begin: u32, bases: &[u8]) -> AlignedRead {
        use rust_htslib::bam::record::{Cigar, CigarString};
        AlignedRead::new(
            GenomicRegion::new("1", begin, begin + bases.len() as u32),
            bases.to_vec(),
            vec![30; bases.len()],
            CigarString(vec![Cigar::Match(bases.len() as u32)]),
            60,
            0,
            None,
            None,
        )
    }

    #[test]
    fn somatic_call_is_emitted_only_for_the_tumour_sample() {
        let region = GenomicRegion::new("1", 0, 8);
        let normal_hap = Haplotype::reference(region.clone(), b"ACGTACGT");
        let snv = Allele::new(GenomicRegion::new("1", 6, 7), b"T".to_vec());
        let somatic_hap = Haplotype::from_alleles(region.clone(), b"ACGTACGT", vec![snv.clone()]);
        let haplotypes = vec![normal_hap, somatic_hap];

        let mut reads = ReadMap::new();
        reads.insert_sample("normal".to_string(), MappableCollection::from_sorted(vec![read_at(0, b"ACGTACGT"); 10]));
        reads.insert_sample("tumour".to_string(), MappableCollection::from_sorted(vec![read_at(0, b"ACGTACTT"); 10]));
        let likelihoods = HaplotypeLikelihoodArray::populate(haplotypes.clone(), &reads, |h| FlankState::new(h.region.clone()));

        let model = CancerModel::new(CancerConfig::default());
        let caller = CancerCaller::new("normal", "tumour", model);
        let latents = caller.infer_latents(&haplotypes, &likelihoods);

        let variant = Variant::new(Allele::new(GenomicRegion::new("1", 6, 7), b"G".to_vec()), snv);
        let calls = caller.call_variants(&[variant], &haplotypes, latents.as_ref());
        let somatic = calls.iter().find(|c| c.call_type == CallType::Somatic).expect("somatic call present");
        assert_eq!(somatic.samples.len(), 1);
        assert_eq!(somatic.samples[0].sample, "tumour");
    }
}
