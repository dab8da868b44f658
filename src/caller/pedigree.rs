use crate::caller::{
    call_reference_from_genotype_posteriors, call_variants_from_genotype_posteriors, CallType, Latents, LatentsCache,
    ReferenceCall, VariantCall,
};
use crate::containers::pileup::ReadPileup;
use crate::genomics::allele::{Allele, Variant};
use crate::genomics::haplotype::Haplotype;
use crate::genotyping::pedigree::{Pedigree, PedigreeModel};
use crate::likelihood::array::HaplotypeLikelihoodArray;

/// Calls a pedigree, gating on Mendelian transmission in addition to read evidence so a
/// variant seen only in a child and neither parent is reported as a de novo call.
pub struct PedigreeCaller {
    pub pedigree: Pedigree,
    pub model: PedigreeModel,
    pub min_variant_posterior: f64,
    pub min_refcall_posterior: f64,
}

impl PedigreeCaller {
    pub fn new(pedigree: Pedigree, model: PedigreeModel) -> Self {
        PedigreeCaller { pedigree, model, min_variant_posterior: 0.5, min_refcall_posterior: 0.5 }
    }

    pub fn call_types(&self) -> Vec<CallType> {
        vec![CallType::Germline, CallType::Denovo, CallType::Reference]
    }

    pub fn min_callable_ploidy(&self) -> usize {
        self.model.config.ploidy
    }

    pub fn max_callable_ploidy(&self) -> usize {
        self.model.config.ploidy
    }

    pub fn infer_latents(&self, haplotypes: &[Haplotype], likelihoods: &HaplotypeLikelihoodArray) -> Box<dyn Latents> {
        let posteriors = self.model.infer_latents(haplotypes, &self.pedigree, likelihoods);
        Box::new(LatentsCache::new(posteriors, haplotypes.len()))
    }

    /// A child carrying a haplotype neither parent's posteriors support gets
    /// `CallType::Denovo`; every other call is `CallType::Germline`.
    pub fn call_variants(&self, candidates: &[Variant], haplotypes: &[Haplotype], latents: &dyn Latents) -> Vec<VariantCall> {
        let genotype_posteriors = latents.genotype_posteriors();
        let germline = call_variants_from_genotype_posteriors(
            candidates,
            haplotypes,
            genotype_posteriors,
            self.min_variant_posterior,
            CallType::Germline,
        );

        germline
            .into_iter()
            .map(|mut call| {
                let is_denovo = call.samples.iter().any(|sample_call| {
                    self.pedigree
                        .members
                        .iter()
                        .find(|m| m.sample == sample_call.sample)
                        .and_then(|m| m.parents.as_ref())
                        .is_some_and(|(mother, father)| {
                            let matching = crate::caller::haplotypes_carrying(haplotypes, &call.variant.alternative);
                            let parental_support = [mother, father].iter().any(|parent| {
                                genotype_posteriors
                                    .get(parent.as_str())
                                    .is_some_and(|gp| gp.marginal_probability_any(&matching) > 0.01)
                            });
                            !parental_support
                        })
                });
                if is_denovo {
                    call.call_type = CallType::Denovo;
                }
                call
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
    use crate::genotyping::pedigree::PedigreeConfig;
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
    fn variant_seen_only_in_child_is_flagged_denovo() {
        let region = GenomicRegion::new("1", 0, 8);
        let ref_hap = Haplotype::reference(region.clone(), b"ACGTACGT");
        let snv = Allele::new(GenomicRegion::new("1", 2, 3), b"T".to_vec());
        let alt_hap = Haplotype::from_alleles(region.clone(), b"ACGTACGT", vec![snv.clone()]);
        let haplotypes = vec![ref_hap, alt_hap];

        let mut reads = ReadMap::new();
        for sample in ["mother", "father"] {
            reads.insert_sample(sample.to_string(), MappableCollection::from_sorted(vec![read_at(0, b"ACGTACGT"); 20]));
        }
        reads.insert_sample("child".to_string(), MappableCollection::from_sorted(vec![read_at(0, b"ACTTACGT"); 20]));
        let likelihoods = HaplotypeLikelihoodArray::populate(haplotypes.clone(), &reads, |h| FlankState::new(h.region.clone()));

        let pedigree = Pedigree::trio("child", "mother", "father");
        let model = PedigreeModel::new(PedigreeConfig { de_novo_rate: 1e-3, ..PedigreeConfig::default() });
        let caller = PedigreeCaller::new(pedigree, model);
        let latents = caller.infer_latents(&haplotypes, &likelihoods);

        let variant = Variant::new(Allele::new(GenomicRegion::new("1", 2, 3), b"G".to_vec()), snv);
        let calls = caller.call_variants(&[variant], &haplotypes, latents.as_ref());
        let child_call = calls
            .iter()
            .find(|c| c.samples.iter().any(|s| s.sample == "child"))
            .expect("child call present");
        assert_eq!(child_call.call_type, CallType::Denovo);
    }
}
