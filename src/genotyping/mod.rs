pub mod cancer;
pub mod coalescent;
pub mod individual_model;
pub mod pedigree;
pub mod polyclone;
pub mod population;
pub mod prior;

pub use cancer::{CancerConfig, CancerLatents, CancerModel, SomaticCall};
pub use coalescent::CoalescentModel;
pub use individual_model::{enumerate_genotypes, Genotype, GenotypePosteriors, IndividualModel};
pub use pedigree::{Pedigree, PedigreeConfig, PedigreeModel};
pub use polyclone::{ModelProbabilities, PolycloneConfig, PolycloneLatents, PolycloneModel};
pub use population::PopulationModel;
pub use prior::{FlatGenotypePrior, GenotypePrior};
