//! Refutation of the pigeonhole principle by summing constraints.
//!
//! Every pigeon is in at least one hole, and every hole contains at most one pigeon. Adding up
//! all constraints cancels every variable, and leaves `0 >= pigeons - holes`, which is a
//! contradiction whenever there are more pigeons than holes.
use std::io::Write;
use std::num::NonZeroU32;

use log::debug;
use pbip_format::constraint::Constraint;
use pbip_format::derivation::Derivation;
use pbip_format::steps::ProofStatistics;
use pbip_format::steps::StepId;
use pbip_format::writer::ProofWriter;
use pbip_format::writer::TraceError;

use crate::result::PbipError;
use crate::result::PbipResult;

/// The outcome of [`refute`].
#[derive(Debug)]
pub(crate) struct Refutation {
    pub(crate) last_step: StepId,
    pub(crate) constraint: Constraint,
    pub(crate) statistics: ProofStatistics,
}

/// Pigeon `pigeon` sitting in hole `hole` is variable `(pigeon - 1) * holes + hole`.
#[derive(Clone, Copy, Debug)]
struct Encoding {
    holes: u32,
    pigeons: u32,
}

impl Encoding {
    fn new(holes: u32, pigeons: u32) -> PbipResult<Encoding> {
        let unsupported = PbipError::UnsupportedInstance { holes, pigeons };

        if holes == 0 || pigeons == 0 || holes.checked_mul(pigeons).is_none() {
            return Err(unsupported);
        }

        Ok(Encoding { holes, pigeons })
    }

    fn variable(self, hole: u32, pigeon: u32) -> NonZeroU32 {
        NonZeroU32::new((pigeon - 1) * self.holes + hole).expect("hole is at least 1")
    }
}

/// Write the refutation of the instance with the given number of holes and pigeons.
///
/// The writer is finished before returning, and its flushed sink is handed back.
pub(crate) fn refute<W: Write>(
    holes: u32,
    pigeons: u32,
    writer: ProofWriter<W>,
) -> PbipResult<(Refutation, W)> {
    let encoding = Encoding::new(holes, pigeons)?;
    let mut derivation = Derivation::new(writer);

    derivation.comment(&format!("pigeonhole {holes} holes {pigeons} pigeons"))?;
    derivation.comment("pigeon j in hole i is variable (j - 1) * holes + i")?;

    let mut pigeon_steps = Vec::with_capacity(pigeons as usize);
    for pigeon in 1..=encoding.pigeons {
        let constraint = Constraint::at_least_one(
            (1..=encoding.holes).map(|hole| encoding.variable(hole, pigeon)),
        )
        .map_err(TraceError::from)?;
        pigeon_steps.push(derivation.input(constraint)?);
    }

    let mut hole_steps = Vec::with_capacity(holes as usize);
    for hole in 1..=encoding.holes {
        let constraint = Constraint::at_most_one(
            (1..=encoding.pigeons).map(|pigeon| encoding.variable(hole, pigeon)),
        )
        .map_err(TraceError::from)?;
        hole_steps.push(derivation.input(constraint)?);
    }

    let all_pigeons = derivation
        .reduce(pigeon_steps)?
        .expect("there is at least one pigeon");
    debug!("summed the pigeon constraints into step {all_pigeons}");

    let all_holes = derivation
        .reduce(hole_steps)?
        .expect("there is at least one hole");
    debug!("summed the hole constraints into step {all_holes}");

    let last_step = derivation.merge(all_pigeons, all_holes)?;
    let constraint = derivation.constraint(last_step)?.clone();

    let writer = derivation.finish()?;
    let refutation = Refutation {
        last_step,
        constraint,
        statistics: writer.statistics(),
    };

    Ok((refutation, writer.into_inner()?))
}
