pub mod array;
pub mod indel_model;
pub mod model;
pub mod pair_hmm;

pub use array::HaplotypeLikelihoodArray;
pub use indel_model::IndelErrorModel;
pub use model::HaplotypeLikelihoodModel;
pub use pair_hmm::{PairHmmKernel, PairHmmModel, ScalarPairHmmKernel};
