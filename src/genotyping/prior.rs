use crate::genomics::haplotype::Haplotype;
use crate::genotyping::individual_model::Genotype;

/// Supplies `log P(genotype)` before any read evidence, the seam every genotyping model
/// plugs a population- or somatic-specific prior into. Grounded on the role
/// `genotype::genotype_prior_calculator::GenotypePriorCalculator` plays ahead of the
/// teacher's likelihood calculators.
pub trait GenotypePrior {
    fn log_prior(&self, genotype: &Genotype, haplotypes: &[Haplotype]) -> f64;
}

/// Every genotype of a given ploidy is equally likely a priori. Used where no
/// population- or somatic-specific prior applies (e.g. the polyclone model's haploid
/// stage, which instead applies `clonality_prior` at the ploidy level).
pub struct FlatGenotypePrior;

impl GenotypePrior for FlatGenotypePrior {
    fn log_prior(&self, _genotype: &Genotype, _haplotypes: &[Haplotype]) -> f64 {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::region::GenomicRegion;

    #[test]
    fn flat_prior_is_uniform() {
        let region = GenomicRegion::new("1", 0, 4);
        let haplotypes = vec![Haplotype::reference(region, b"ACGT")];
        let prior = FlatGenotypePrior;
        assert_eq!(prior.log_prior(&Genotype::new(vec![0]), &haplotypes), 0.0);
    }
}
