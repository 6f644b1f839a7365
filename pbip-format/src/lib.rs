//! This crate contains the building blocks for producing and consuming proofs of
//! unsatisfiability for (pseudo-)Boolean formulas.
//!
//! - [`cnf::CnfDocument`] reads and validates DIMACS CNF files.
//! - [`constraint::Constraint`] is a linear pseudo-Boolean constraint, which can be combined with
//!   other constraints through [`constraint::Constraint::merge`].
//! - [`writer::ProofWriter`] writes a proof trace made of input and assert steps, and
//!   [`reader::ProofReader`] reads it back.
//! - [`derivation`] builds derivations by merging recorded steps, and replays them.
//! - [`varint`] is the compact integer encoding used by binary traces.

mod format;

pub mod cnf;
pub mod constraint;
pub mod derivation;
pub mod reader;
pub mod steps;
pub mod varint;
pub mod writer;

pub use format::*;
