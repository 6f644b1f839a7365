use pbip_format::cnf::CnfError;
use pbip_format::derivation::ReplayError;
use pbip_format::reader::ReadError;
use pbip_format::varint::VarintError;
use pbip_format::writer::TraceError;
use thiserror::Error;

pub(crate) type PbipResult<T> = Result<T, PbipError>;

#[derive(Error, Debug)]
pub(crate) enum PbipError {
    #[error("IO error, more details: {0}")]
    IOError(#[from] std::io::Error),
    #[error("The CNF file was invalid, more details: {0}")]
    InvalidCnf(#[from] CnfError),
    #[error("Failed to write the proof, more details: {0}")]
    Trace(#[from] TraceError),
    #[error("Failed to read the proof, more details: {0}")]
    ReadProof(#[from] ReadError),
    #[error("The proof is invalid, more details: {0}")]
    InvalidProof(#[from] ReplayError),
    #[error("The proof does not end in a contradiction.")]
    NoContradiction,
    #[error("The varint stream was invalid, more details: {0}")]
    InvalidVarint(#[from] VarintError),
    #[error("'{0}' is not an integer.")]
    InvalidInteger(String),
    #[error("The instance with {holes} holes and {pigeons} pigeons is not supported.")]
    UnsupportedInstance { holes: u32, pigeons: u32 },
    #[cfg(not(feature = "gzipped-proofs"))]
    #[error("Gzipped proofs are not supported by this build, cannot use {0}.")]
    GzipNotSupported(String),
}

