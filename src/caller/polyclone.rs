use std::any::Any;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::caller::{haplotypes_carrying, haplotypes_non_reference_over, CallType, Latents, ReferenceCall, SampleCall, VariantCall};
use crate::containers::pileup::ReadPileup;
use crate::genomics::allele::{Allele, Variant};
use crate::genomics::haplotype::Haplotype;
use crate::genotyping::individual_model::GenotypePosteriors;
use crate::genotyping::polyclone::{PolycloneLatents, PolycloneModel};
use crate::likelihood::array::HaplotypeLikelihoodArray;
use crate::utils::phred::Phred;

/// `Latents` for one sample under the clone-mixture model. Polyclone has no single
/// per-sample `GenotypePosteriors` the way a diploid model does — its evidence is split
/// across the haploid stage and a family of subclonal-ploidy genotype sets — so the
/// shared `genotype_posteriors()` view is intentionally empty here; `call_variants` and
/// `call_reference` both read `PolycloneLatents::variant_posterior` through `as_any`
/// instead, the same downcast seam `CancerLatentsView` uses.
pub struct PolycloneLatentsView {
    sample: String,
    inner: PolycloneLatents,
    empty_genotype_posteriors: HashMap<String, GenotypePosteriors>,
    num_haplotypes: usize,
    haplotype_posteriors: OnceLock<Vec<f64>>,
}

impl PolycloneLatentsView {
    fn new(sample: String, inner: PolycloneLatents, num_haplotypes: usize) -> Self {
        PolycloneLatentsView {
            sample,
            inner,
            empty_genotype_posteriors: HashMap::new(),
            num_haplotypes,
            haplotype_posteriors: OnceLock::new(),
        }
    }

    pub fn sample(&self) -> &str {
        &self.sample
    }

    pub fn variant_posterior(&self, haplotype_idx: usize) -> f64 {
        self.inner.variant_posterior(haplotype_idx)
    }
}

impl Latents for PolycloneLatentsView {
    fn haplotype_posteriors(&self) -> &[f64] {
        self.haplotype_posteriors
            .get_or_init(|| (0..self.num_haplotypes).map(|hi| self.inner.variant_posterior(hi)).collect())
    }

    fn genotype_posteriors(&self) -> &HashMap<String, GenotypePosteriors> {
        &self.empty_genotype_posteriors
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Calls one sample under a mixture-of-subclones hypothesis: a candidate variant is
/// called once the posterior mass on haplotypes carrying its alt allele — summed across
/// both the single-clone and subclonal hypotheses — clears `min_variant_posterior`.
pub struct PolycloneCaller {
    pub sample: String,
    pub model: PolycloneModel,
    pub min_variant_posterior: f64,
    pub min_refcall_posterior: f64,
}

impl PolycloneCaller {
    pub fn new(sample: impl Into<String>, model: PolycloneModel) -> Self {
        PolycloneCaller {
            sample: sample.into(),
            model,
            min_variant_posterior: 0.5,
            min_refcall_posterior: 0.5,
        }
    }

    pub fn call_types(&self) -> Vec<CallType> {
        vec![CallType::Somatic, CallType::Reference]
    }

    pub fn min_callable_ploidy(&self) -> usize {
        1
    }

    pub fn max_callable_ploidy(&self) -> usize {
        self.model.config.max_clones
    }

    pub fn infer_latents(&self, haplotypes: &[Haplotype], likelihoods: &HaplotypeLikelihoodArray) -> Box<dyn Latents> {
        let inner = self.model.infer_latents(haplotypes, &self.sample, likelihoods);
        Box::new(PolycloneLatentsView::new(self.sample.clone(), inner, haplotypes.len()))
    }

    pub fn call_variants(&self, candidates: &[Variant], haplotypes: &[Haplotype], latents: &dyn Latents) -> Vec<VariantCall> {
        let view = latents.as_any().downcast_ref::<PolycloneLatentsView>().expect("polyclone caller latents");
        candidates
            .iter()
            .filter(|variant| !variant.is_trivial())
            .filter_map(|variant| {
                let matching = haplotypes_carrying(haplotypes, &variant.alternative);
                let posterior: f64 = matching.iter().map(|&hi| view.variant_posterior(hi)).sum();
                if posterior < self.min_variant_posterior {
                    return None;
                }
                Some(VariantCall {
                    variant: variant.clone(),
                    quality: Phred::from_probability((1.0 - posterior).max(f64::MIN_POSITIVE)),
                    call_type: CallType::Somatic,
                    samples: vec![SampleCall {
                        sample: view.sample().to_string(),
                        genotype: matching,
                        genotype_posterior: Phred::from_probability((1.0 - posterior).max(f64::MIN_POSITIVE)),
                        phase_set: None,
                    }],
                })
            })
            .collect()
    }

    pub fn call_reference(
        &self,
        alleles: &[Allele],
        haplotypes: &[Haplotype],
        latents: &dyn Latents,
        pileup: &ReadPileup,
    ) -> Vec<ReferenceCall> {
        let view = latents.as_any().downcast_ref::<PolycloneLatentsView>().expect("polyclone caller latents");
        alleles
            .iter()
            .filter(|allele| pileup.depth(allele.region.begin, view.sample()) > 0)
            .filter_map(|allele| {
                let non_reference = haplotypes_non_reference_over(haplotypes, &allele.region);
                let variant_posterior: f64 = non_reference.iter().map(|&hi| view.variant_posterior(hi)).sum();
                let reference_posterior = 1.0 - variant_posterior;
                if reference_posterior < self.min_refcall_posterior {
                    return None;
                }
                Some(ReferenceCall {
                    allele: allele.clone(),
                    quality: Phred::from_probability((1.0 - reference_posterior).max(f64::MIN_POSITIVE)),
                    samples: vec![SampleCall {
                        sample: view.sample().to_string(),
                        genotype: vec![],
                        genotype_posterior: Phred::from_probability((1.0 - reference_posterior).max(f64::MIN_POSITIVE)),
                        phase_set: None,
                    }],
                })
            })
            .collect()
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
    use crate::genotyping::polyclone::PolycloneConfig;
    use rust_htslib::bam::record::{Cigar, CigarString};

    fn read_at(begin: u32, bases: &[u8]) -> AlignedRead {
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
    fn calls_a_variant_fixed_in_every_read() {
        let region = GenomicRegion::new("1", 0, 8);
        let ref_hap = Haplotype::reference(region.clone(), b"ACGTACGT");
        let snv = Allele::new(GenomicRegion::new("1", 2, 3), b"T".to_vec());
        let alt_hap = Haplotype::from_alleles(region.clone(), b"ACGTACGT", vec![snv.clone()]);
        let haplotypes = vec![ref_hap, alt_hap];

        let mut reads = ReadMap::new();
        reads.insert_sample("s1".to_string(), MappableCollection::from_sorted(vec![read_at(0, b"ACTTACGT"); 10]));
        let likelihoods = HaplotypeLikelihoodArray::populate(haplotypes.clone(), &reads, |h| FlankState::new(h.region.clone()));

        let caller = PolycloneCaller::new("s1", PolycloneModel::new(PolycloneConfig::default()));
        let latents = caller.infer_latents(&haplotypes, &likelihoods);

        let variant = Variant::new(Allele::new(GenomicRegion::new("1", 2, 3), b"G".to_vec()), snv);
        let calls = caller.call_variants(&[variant], &haplotypes, latents.as_ref());
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].samples[0].sample, "s1");
    }
}
