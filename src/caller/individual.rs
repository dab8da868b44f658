use crate::caller::{
    call_reference_from_genotype_posteriors, call_variants_from_genotype_posteriors, CallType, Latents, LatentsCache,
    ReferenceCall, VariantCall,
};
use crate::containers::pileup::ReadPileup;
use crate::genomics::allele::{Allele, Variant};
use crate::genomics::haplotype::Haplotype;
use crate::genotyping::individual_model::IndividualModel;
use crate::genotyping::prior::FlatGenotypePrior;
use crate::likelihood::array::HaplotypeLikelihoodArray;

/// Calls one sample at a fixed ploidy, no cohort or pedigree structure — the simplest
/// caller, and the one every other façade in this module builds on.
pub struct IndividualCaller {
    pub sample: String,
    pub ploidy: usize,
    pub min_variant_posterior: f64,
    pub min_refcall_posterior: f64,
}

impl IndividualCaller {
    pub fn new(sample: impl Into<String>, ploidy: usize) -> Self {
        IndividualCaller {
            sample: sample.into(),
            ploidy,
            min_variant_posterior: 0.5,
            min_refcall_posterior: 0.5,
        }
    }

    pub fn call_types(&self) -> Vec<CallType> {
        vec![CallType::Germline, CallType::Reference]
    }

    pub fn min_callable_ploidy(&self) -> usize {
        self.ploidy
    }

    pub fn max_callable_ploidy(&self) -> usize {
        self.ploidy
    }

    pub fn infer_latents(&self, haplotypes: &[Haplotype], likelihoods: &HaplotypeLikelihoodArray) -> Box<dyn Latents> {
        let posteriors = IndividualModel::infer(haplotypes, self.ploidy, &self.sample, likelihoods, &FlatGenotypePrior);
        let mut map = std::collections::HashMap::new();
        map.insert(self.sample.clone(), posteriors);
        Box::new(LatentsCache::new(map, haplotypes.len()))
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

    /// A single-sample caller never produces haplotypes distinguishable only by a sample
    /// it doesn't score, so there is nothing for this caller to deduplicate.
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
    fn calls_a_homozygous_snv_present_in_every_read() {
        let region = GenomicRegion::new("1", 0, 8);
        let ref_hap = Haplotype::reference(region.clone(), b"ACGTACGT");
        let snv = Allele::new(GenomicRegion::new("1", 2, 3), b"T".to_vec());
        let alt_hap = Haplotype::from_alleles(region.clone(), b"ACGTACGT", vec![snv.clone()]);
        let haplotypes = vec![ref_hap, alt_hap];

        let mut reads = ReadMap::new();
        reads.insert_sample("s1".to_string(), MappableCollection::from_sorted(vec![read_at(0, b"ACTTACGT"); 10]));
        let likelihoods = HaplotypeLikelihoodArray::populate(haplotypes.clone(), &reads, |h| FlankState::new(h.region.clone()));

        let caller = IndividualCaller::new("s1", 2);
        let latents = caller.infer_latents(&haplotypes, &likelihoods);

        let variant = Variant::new(Allele::new(GenomicRegion::new("1", 2, 3), b"G".to_vec()), snv);
        let calls = caller.call_variants(&[variant], &haplotypes, latents.as_ref());
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].samples[0].sample, "s1");
    }
}
