use std::path::PathBuf;

use thiserror::Error;

/// Error taxonomy surfaced to the caller façade and, ultimately, to `main`.
///
/// Variants map directly onto the error kinds named in the design: configuration
/// problems are refused before any window is processed, I/O problems abort only the
/// offending window, and `ModelFailure` causes a window to be written out as no-call
/// rather than aborting the run.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    IoMessage(String),

    #[error("missing index for {path}")]
    MissingIndex { path: PathBuf },

    #[error("BAM contig {contig} is not present in the reference")]
    ReferenceMismatch { contig: String },

    #[error("model did not converge for region {region}: {reason}")]
    ModelFailure { region: String, reason: String },

    #[error("htslib error: {0}")]
    Htslib(#[from] rust_htslib::errors::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
