use std::collections::HashMap;

use crate::genomics::haplotype::Haplotype;
use crate::genotyping::individual_model::{Genotype, GenotypePosteriors, IndividualModel};
use crate::genotyping::prior::{FlatGenotypePrior, GenotypePrior};
use crate::likelihood::array::HaplotypeLikelihoodArray;

/// One pedigree member: a sample name, and — for everyone but a founder — the two
/// parent sample names their genotype is transmitted from. Generalises the
/// `maternal_sample`/`paternal_sample` trio inputs named in the design to an arbitrary
/// family structure, so long as every non-founder's parents appear earlier in the
/// pedigree (checked by `Pedigree::topological_order`).
#[derive(Debug, Clone)]
pub struct Member {
    pub sample: String,
    pub parents: Option<(String, String)>,
}

#[derive(Debug, Clone, Default)]
pub struct Pedigree {
    pub members: Vec<Member>,
}

impl Pedigree {
    pub fn trio(child: impl Into<String>, mother: impl Into<String>, father: impl Into<String>) -> Self {
        let mother = mother.into();
        let father = father.into();
        Pedigree {
            members: vec![
                Member { sample: mother.clone(), parents: None },
                Member { sample: father.clone(), parents: None },
                Member { sample: child.into(), parents: Some((mother, father)) },
            ],
        }
    }

    /// Members in an order where every non-founder follows both of their parents.
    /// Panics (an `InternalAssertion`-class programming error, not a runtime condition)
    /// if a parent is referenced before it is defined or the pedigree is cyclic.
    fn topological_order(&self) -> Vec<&Member> {
        let mut resolved: Vec<&str> = Vec::new();
        let mut ordered = Vec::with_capacity(self.members.len());
        let mut remaining: Vec<&Member> = self.members.iter().collect();
        while !remaining.is_empty() {
            let before = remaining.len();
            remaining.retain(|member| {
                let ready = match &member.parents {
                    None => true,
                    Some((m, f)) => resolved.contains(&m.as_str()) && resolved.contains(&f.as_str()),
                };
                if ready {
                    resolved.push(&member.sample);
                    ordered.push(*member);
                }
                !ready
            });
            assert!(remaining.len() < before, "pedigree is cyclic or references an undefined parent");
        }
        ordered
    }
}

/// A Mendelian transmission prior over diploid offspring genotypes, conditioned on both
/// parents' already-inferred genotype posteriors, with a small de novo mutation rate
/// blended in so that a genotype neither parent could transmit is merely unlikely rather
/// than impossible.
///
/// Grounded on the transmission-prior role the design assigns the pedigree model,
/// restated over this crate's `Genotype`/`GenotypePosteriors` types (no pedigree/trio
/// source file was retrieved into `original_source`).
pub struct TransmissionPrior<'a> {
    maternal: &'a GenotypePosteriors,
    paternal: &'a GenotypePosteriors,
    de_novo_rate: f64,
    num_haplotypes: usize,
}

impl<'a> TransmissionPrior<'a> {
    pub fn new(maternal: &'a GenotypePosteriors, paternal: &'a GenotypePosteriors, de_novo_rate: f64, num_haplotypes: usize) -> Self {
        TransmissionPrior { maternal, paternal, de_novo_rate, num_haplotypes }
    }

    /// Expected fraction of gametes from `posteriors` carrying `haplotype_idx`: the
    /// posterior-weighted average, over genotypes, of that haplotype's copy number
    /// divided by ploidy.
    fn gamete_probability(posteriors: &GenotypePosteriors, haplotype_idx: usize) -> f64 {
        posteriors
            .genotypes
            .iter()
            .zip(&posteriors.log_posteriors)
            .map(|(genotype, log_p)| {
                let copies = genotype.haplotype_indices.iter().filter(|&&hi| hi == haplotype_idx).count();
                log_p.exp() * copies as f64 / genotype.ploidy().max(1) as f64
            })
            .sum()
    }

    fn mendelian_probability(&self, genotype: &Genotype) -> f64 {
        assert_eq!(genotype.ploidy(), 2, "transmission prior only models diploid offspring");
        let a = genotype.haplotype_indices[0];
        let b = genotype.haplotype_indices[1];
        let gm = |h| Self::gamete_probability(self.maternal, h);
        let gf = |h| Self::gamete_probability(self.paternal, h);
        if a == b {
            gm(a) * gf(a)
        } else {
            gm(a) * gf(b) + gm(b) * gf(a)
        }
    }
}

impl<'a> GenotypePrior for TransmissionPrior<'a> {
    fn log_prior(&self, genotype: &Genotype, _haplotypes: &[Haplotype]) -> f64 {
        let mendelian = self.mendelian_probability(genotype);
        let uniform = 1.0 / self.num_haplotypes.max(1) as f64;
        ((1.0 - self.de_novo_rate) * mendelian + self.de_novo_rate * uniform).ln()
    }
}

pub struct PedigreeConfig {
    pub ploidy: usize,
    pub de_novo_rate: f64,
}

impl Default for PedigreeConfig {
    fn default() -> Self {
        PedigreeConfig { ploidy: 2, de_novo_rate: 1e-8 }
    }
}

/// Scores a whole pedigree: founders under the ordinary `IndividualModel` with a flat
/// prior, then every other member in topological order under `TransmissionPrior` built
/// from their already-computed parental posteriors.
pub struct PedigreeModel {
    pub config: PedigreeConfig,
}

impl PedigreeModel {
    pub fn new(config: PedigreeConfig) -> Self {
        PedigreeModel { config }
    }

    pub fn infer_latents(
        &self,
        haplotypes: &[Haplotype],
        pedigree: &Pedigree,
        likelihoods: &HaplotypeLikelihoodArray,
    ) -> HashMap<String, GenotypePosteriors> {
        let mut posteriors: HashMap<String, GenotypePosteriors> = HashMap::new();
        for member in pedigree.topological_order() {
            let inferred = match &member.parents {
                None => IndividualModel::infer(haplotypes, self.config.ploidy, &member.sample, likelihoods, &FlatGenotypePrior),
                Some((mother, father)) => {
                    let maternal = posteriors.get(mother).expect("parents are scored before their children");
                    let paternal = posteriors.get(father).expect("parents are scored before their children");
                    let prior =
                        TransmissionPrior::new(maternal, paternal, self.config.de_novo_rate, haplotypes.len());
                    IndividualModel::infer(haplotypes, self.config.ploidy, &member.sample, likelihoods, &prior)
                }
            };
            posteriors.insert(member.sample.clone(), inferred);
        }
        posteriors
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
    fn topological_order_places_parents_before_children() {
        let pedigree = Pedigree::trio("child", "mother", "father");
        let order: Vec<&str> = pedigree.topological_order().iter().map(|m| m.sample.as_str()).collect();
        let child_pos = order.iter().position(|&s| s == "child").unwrap();
        let mother_pos = order.iter().position(|&s| s == "mother").unwrap();
        let father_pos = order.iter().position(|&s| s == "father").unwrap();
        assert!(mother_pos < child_pos);
        assert!(father_pos < child_pos);
    }

    #[test]
    fn child_homozygous_for_an_allele_absent_from_one_parent_is_disfavoured() {
        let region = GenomicRegion::new("1", 0, 8);
        let ref_hap = Haplotype::reference(region.clone(), b"ACGTACGT");
        let alt_hap = Haplotype::reference(region, b"TTTTTTTT");
        let haplotypes = vec![ref_hap.clone(), alt_hap.clone()];

        let mut reads = ReadMap::new();
        for sample in ["mother", "father", "child"] {
            reads.insert_sample(sample.to_string(), MappableCollection::from_sorted(vec![read_at(0, b"ACGTACGT"); 20]));
        }
        let likelihoods = HaplotypeLikelihoodArray::populate(haplotypes.clone(), &reads, |h| FlankState::new(h.region.clone()));

        let model = PedigreeModel::new(PedigreeConfig::default());
        let pedigree = Pedigree::trio("child", "mother", "father");
        let posteriors = model.infer_latents(&haplotypes, &pedigree, &likelihoods);

        let child = &posteriors["child"];
        // Neither parent's reads support the alt haplotype, so the de novo-only path to
        // a homozygous-alt child should carry negligible posterior mass.
        assert!(child.marginal_probability(1) < 0.01);
    }
}
