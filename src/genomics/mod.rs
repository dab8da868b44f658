pub mod allele;
pub mod cigar;
pub mod haplotype;
pub mod read;
pub mod region;

pub use allele::{Allele, Variant};
pub use haplotype::{FlankState, Haplotype};
pub use read::AlignedRead;
pub use region::{GenomicRegion, Locatable};
