pub mod math_utils;
pub mod phred;

pub use phred::Phred;
