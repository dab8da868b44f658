use strum_macros::Display;

use crate::genomics::allele::{Allele, Variant};
use crate::genomics::region::GenomicRegion;
use crate::utils::phred::Phred;

/// The VCF annotations a caller variant is capable of emitting, used by
/// `CallerOperations::call_types` so the VCF writer can declare the right header lines
/// up front rather than discovering them call-by-call. `Display` renders the exact
/// `CALL_TYPE` INFO value `io::vcf` writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum CallType {
    #[strum(serialize = "GERMLINE")]
    Germline,
    #[strum(serialize = "SOMATIC")]
    Somatic,
    #[strum(serialize = "DENOVO")]
    Denovo,
    #[strum(serialize = "REFERENCE")]
    Reference,
}

/// One per-sample genotype call folded into a `VariantCall`.
#[derive(Debug, Clone)]
pub struct SampleCall {
    pub sample: String,
    pub genotype: Vec<usize>,
    pub genotype_posterior: Phred,
    pub phase_set: Option<GenomicRegion>,
}

/// A called variant, ready for the VCF writer: the candidate it was called from, its
/// site-level quality, and one `SampleCall` per sample the caller scored.
#[derive(Debug, Clone)]
pub struct VariantCall {
    pub variant: Variant,
    pub quality: Phred,
    pub call_type: CallType,
    pub samples: Vec<SampleCall>,
}

/// A confident no-variant call over `region`: every sample's genotype is homozygous
/// reference with posterior at least the caller's `min_refcall_posterior`.
#[derive(Debug, Clone)]
pub struct ReferenceCall {
    pub allele: Allele,
    pub quality: Phred,
    pub samples: Vec<SampleCall>,
}
