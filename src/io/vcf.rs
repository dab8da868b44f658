use std::path::Path;

use rust_htslib::bcf::{self, Header, Writer};

use crate::caller::{CallType, ReferenceCall, VariantCall};
use crate::errors::{Error, Result};

/// Writes the called variant and reference records for a run to a VCF 4.3 (or BCF)
/// file, the "out of scope, external collaborator" VCF encoder the design names —
/// specified here only to the extent this crate needs to hand it finished records.
/// Grounded on `rust_htslib::bcf`'s header/record builder API, the way the crate's own
/// `faidx` usage in `crate::io::reference` grounds FASTA access.
pub struct VcfWriter {
    inner: Writer,
    sample_index: Vec<String>,
}

fn declare_header(samples: &[String], call_types: &[CallType], contigs: &[(String, u64)]) -> Header {
    let mut header = Header::new();
    header.push_record(br#"##source=octopus"#);
    for (name, length) in contigs {
        header.push_record(format!("##contig=<ID={name},length={length}>").as_bytes());
    }
    header.push_record(br#"##INFO=<ID=CALL_TYPE,Number=1,Type=String,Description="Generative model call classification">"#);
    header.push_record(br#"##FORMAT=<ID=GT,Number=1,Type=String,Description="Genotype">"#);
    header.push_record(br#"##FORMAT=<ID=GQ,Number=1,Type=Integer,Description="Genotype quality, Phred-scaled">"#);
    header.push_record(br#"##FORMAT=<ID=PS,Number=1,Type=String,Description="Phase set">"#);
    if call_types.contains(&CallType::Somatic) {
        header.push_record(br#"##FORMAT=<ID=SOMATIC,Number=0,Type=Flag,Description="Somatic call">"#);
    }
    for sample in samples {
        header.push_sample(sample.as_bytes());
    }
    header
}

impl VcfWriter {
    pub fn create(
        path: impl AsRef<Path>,
        samples: &[String],
        call_types: &[CallType],
        contigs: &[(String, u64)],
        as_bcf: bool,
    ) -> Result<Self> {
        let header = declare_header(samples, call_types, contigs);
        let format = if as_bcf { bcf::Format::Bcf } else { bcf::Format::Vcf };
        let inner = Writer::from_path(path.as_ref(), &header, !as_bcf, format).map_err(Error::Htslib)?;
        Ok(VcfWriter { inner, sample_index: samples.to_vec() })
    }

    pub fn write_variant_call(&mut self, call: &VariantCall) -> Result<()> {
        let mut record = self.inner.empty_record();
        let rid = record
            .header()
            .name2rid(call.variant.reference.region.contig.as_bytes())
            .map_err(Error::Htslib)?;
        record.set_rid(Some(rid));
        record.set_pos(call.variant.reference.region.begin as i64);
        record
            .set_alleles(&[&call.variant.reference.bases, &call.variant.alternative.bases])
            .map_err(Error::Htslib)?;
        record.set_qual(call.quality.value() as f32);
        record.push_info_string(b"CALL_TYPE", &[call.call_type.to_string().as_bytes()]).map_err(Error::Htslib)?;

        self.push_sample_fields(&mut record, &call.samples)?;
        self.inner.write(&record).map_err(Error::Htslib)
    }

    pub fn write_reference_call(&mut self, call: &ReferenceCall) -> Result<()> {
        let mut record = self.inner.empty_record();
        let rid = record.header().name2rid(call.allele.region.contig.as_bytes()).map_err(Error::Htslib)?;
        record.set_rid(Some(rid));
        record.set_pos(call.allele.region.begin as i64);
        record.set_alleles(&[&call.allele.bases]).map_err(Error::Htslib)?;
        record.set_qual(call.quality.value() as f32);
        record.push_info_string(b"CALL_TYPE", &[CallType::Reference.to_string().as_bytes()]).map_err(Error::Htslib)?;

        self.push_sample_fields(&mut record, &call.samples)?;
        self.inner.write(&record).map_err(Error::Htslib)
    }

    fn push_sample_fields(&self, record: &mut bcf::Record, samples: &[crate::caller::SampleCall]) -> Result<()> {
        let genotypes: Vec<String> = self
            .sample_index
            .iter()
            .map(|sample| {
                samples
                    .iter()
                    .find(|sc| &sc.sample == sample)
                    .map(|sc| format_genotype(&sc.genotype))
                    .unwrap_or_else(|| ".".to_string())
            })
            .collect();
        let genotype_refs: Vec<&[u8]> = genotypes.iter().map(|s| s.as_bytes()).collect();
        record.push_format_string(b"GT", &genotype_refs).map_err(Error::Htslib)?;

        let qualities: Vec<i32> = self
            .sample_index
            .iter()
            .map(|sample| {
                samples
                    .iter()
                    .find(|sc| &sc.sample == sample)
                    .map(|sc| sc.genotype_posterior.value().round() as i32)
                    .unwrap_or(-1)
            })
            .collect();
        record.push_format_integer(b"GQ", &qualities).map_err(Error::Htslib)?;

        let phase_sets: Vec<String> = self
            .sample_index
            .iter()
            .map(|sample| {
                samples
                    .iter()
                    .find(|sc| &sc.sample == sample)
                    .and_then(|sc| sc.phase_set.as_ref())
                    .map(|region| format!("{}:{}", region.contig, region.begin))
                    .unwrap_or_else(|| ".".to_string())
            })
            .collect();
        let phase_set_refs: Vec<&[u8]> = phase_sets.iter().map(|s| s.as_bytes()).collect();
        record.push_format_string(b"PS", &phase_set_refs).map_err(Error::Htslib)?;

        Ok(())
    }
}

/// Renders a called multiset of haplotype indices as an unphased VCF genotype string:
/// each haplotype index maps to an allele number via its position in `[reference, alt]`
/// when the genotype is the trivial diploid-from-one-variant case the caller façades
/// emit (index 0 = reference/no allele carried, any other index = the alt).
fn format_genotype(haplotype_indices: &[usize]) -> String {
    if haplotype_indices.is_empty() {
        return "0/0".to_string();
    }
    haplotype_indices
        .iter()
        .map(|&idx| if idx == 0 { "0".to_string() } else { "1".to_string() })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_genotype_renders_homozygous_alt() {
        assert_eq!(format_genotype(&[1, 1]), "1/1");
    }

    #[test]
    fn format_genotype_renders_heterozygous() {
        assert_eq!(format_genotype(&[0, 1]), "0/1");
    }

    #[test]
    fn format_genotype_renders_hom_ref_for_empty_genotype() {
        assert_eq!(format_genotype(&[]), "0/0");
    }
}
