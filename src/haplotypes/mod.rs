pub mod filter;
pub mod tree;

pub use filter::{filter_to_n, HaplotypeScorer};
pub use tree::HaplotypeTree;
