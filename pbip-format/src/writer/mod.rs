//! Implements the writing of proof traces.
//!
//! See [`ProofWriter`] for more information on how to write proofs.

mod error;

use std::io::BufWriter;
use std::io::Write;
use std::num::NonZeroU64;

pub use error::TraceError;
use log::debug;

use crate::constraint::Constraint;
use crate::constraint::Relation;
use crate::format::Format;
use crate::steps::ProofStatistics;
use crate::steps::StepId;
use crate::steps::StepKind;
use crate::varint;

/// Abstraction for writing proof traces.
///
/// Every recorded step is written and flushed before the call returns, so an interrupted run
/// leaves a valid prefix of the trace behind.
///
/// # Example
/// ```
/// # use std::num::NonZeroU32;
/// # use pbip_format::Format;
/// # use pbip_format::constraint::Constraint;
/// # use pbip_format::writer::ProofWriter;
/// let var = |index: u32| NonZeroU32::new(index).unwrap();
/// let mut proof: Vec<u8> = Vec::new();
/// let mut writer = ProofWriter::new(Format::Text, &mut proof);
///
/// writer.comment("x1 is true and false").unwrap();
/// let positive = writer
///     .record_input(&Constraint::at_least_one([var(1)]).unwrap())
///     .unwrap();
/// let negative = writer
///     .record_input(&Constraint::at_most_one([var(1)]).unwrap())
///     .unwrap();
/// let contradiction = Constraint::at_least_one([var(1)])
///     .unwrap()
///     .merge(&Constraint::at_most_one([var(1)]).unwrap())
///     .unwrap();
/// writer
///     .record_assert(&contradiction, [positive, negative])
///     .unwrap();
/// writer.finish().unwrap();
/// drop(writer);
///
/// let expected = "
/// * x1 is true and false
/// i +1 x1 >= 1 ;
/// i -1 x1 >= -1 ;
/// a >= 0 ; 1 2
/// ";
/// assert_eq!(std::str::from_utf8(&proof).unwrap(), expected.trim_start());
/// ```
#[derive(Debug)]
pub struct ProofWriter<W: Write> {
    /// The writer to the underlying sink.
    writer: BufWriter<W>,
    /// The format in which to log the proof.
    format: Format,
    /// The id for the next step which is logged.
    next_step_id: StepId,
    statistics: ProofStatistics,
    is_sealed: bool,
}

impl<W: Write> ProofWriter<W> {
    /// Create a new proof writer which writes the proof to an underlying sink implementing
    /// [`Write`].
    pub fn new(format: Format, writer: W) -> Self {
        Self {
            format,
            writer: BufWriter::new(writer),
            next_step_id: NonZeroU64::MIN,
            statistics: ProofStatistics::default(),
            is_sealed: false,
        }
    }

    /// Record a constraint of the instance.
    ///
    /// This function wraps an IO operation, which is why it can fail with an IO error.
    pub fn record_input(&mut self, constraint: &Constraint) -> Result<StepId, TraceError> {
        self.record(StepKind::Input, constraint, &[])
    }

    /// Record a constraint which is implied by the steps given as `hints`.
    ///
    /// Every hint must refer to a step that was recorded earlier, otherwise
    /// [`TraceError::DanglingHint`] is returned and nothing is written.
    ///
    /// This function wraps an IO operation, which is why it can fail with an IO error.
    pub fn record_assert(
        &mut self,
        constraint: &Constraint,
        hints: impl IntoIterator<Item = StepId>,
    ) -> Result<StepId, TraceError> {
        let hints = hints.into_iter().collect::<Vec<_>>();
        self.record(StepKind::Assert, constraint, &hints)
    }

    fn record(
        &mut self,
        kind: StepKind,
        constraint: &Constraint,
        hints: &[StepId],
    ) -> Result<StepId, TraceError> {
        self.ensure_open()?;

        let id = self.next_step_id;

        if let Some(&hint) = hints.iter().find(|&&hint| hint >= id) {
            return Err(TraceError::DanglingHint { step: id, hint });
        }

        StepRecord {
            kind,
            constraint,
            hints,
        }
        .write(self.format, &mut self.writer)?;
        self.writer.flush()?;

        self.next_step_id = id
            .checked_add(1)
            .expect("step ids do not exceed u64::MAX");

        match kind {
            StepKind::Input => self.statistics.inputs += 1,
            StepKind::Assert => self.statistics.asserts += 1,
        }

        Ok(id)
    }

    /// Write an annotation to the trace. Comments are not steps and cannot be used as hints.
    ///
    /// This function wraps an IO operation, which is why it can fail with an IO error.
    pub fn comment(&mut self, text: &str) -> Result<(), TraceError> {
        self.ensure_open()?;

        Comment(text).write(self.format, &mut self.writer)?;
        self.writer.flush()?;
        self.statistics.comments += 1;

        Ok(())
    }

    /// Flush the sink and seal the trace. Every later call that would extend the trace fails
    /// with [`TraceError::TraceSealed`].
    pub fn finish(&mut self) -> Result<(), TraceError> {
        self.ensure_open()?;

        self.writer.flush()?;
        self.is_sealed = true;

        debug!(
            "finished proof with {} inputs and {} asserts",
            self.statistics.inputs, self.statistics.asserts
        );

        Ok(())
    }

    /// The ID that the next recorded step will receive.
    pub fn next_step_id(&self) -> StepId {
        self.next_step_id
    }

    pub fn statistics(&self) -> ProofStatistics {
        self.statistics
    }

    pub fn is_sealed(&self) -> bool {
        self.is_sealed
    }

    /// Flush the sink and give it back.
    pub fn into_inner(self) -> Result<W, TraceError> {
        self.writer
            .into_inner()
            .map_err(|err| TraceError::Io(err.into_error()))
    }

    fn ensure_open(&self) -> Result<(), TraceError> {
        if self.is_sealed {
            Err(TraceError::TraceSealed)
        } else {
            Ok(())
        }
    }
}

impl ProofWriter<std::io::Sink> {
    /// A writer which discards its output.
    ///
    /// It validates hints and assigns step IDs exactly like any other writer, so it can be used
    /// when only the [`ProofStatistics`] are of interest.
    pub fn null() -> Self {
        ProofWriter::new(Format::Text, std::io::sink())
    }
}

trait WritableProofStep: Sized {
    /// Write the proof step in the string form.
    fn write_string(self, sink: &mut impl Write) -> std::io::Result<()>;

    /// Write the proof step as binary.
    fn write_binary(self, sink: &mut impl Write) -> std::io::Result<()>;

    /// Write the step in the given format to the given sink.
    fn write(self, format: Format, sink: &mut impl Write) -> std::io::Result<()> {
        match format {
            Format::Text => self.write_string(sink),
            Format::Binary => self.write_binary(sink),
        }
    }
}

struct StepRecord<'a> {
    kind: StepKind,
    constraint: &'a Constraint,
    hints: &'a [StepId],
}

impl WritableProofStep for StepRecord<'_> {
    fn write_string(self, sink: &mut impl Write) -> std::io::Result<()> {
        write!(sink, "{} {} ;", self.kind.code() as char, self.constraint)?;

        for hint in self.hints {
            write!(sink, " {hint}")?;
        }

        writeln!(sink)?;

        Ok(())
    }

    fn write_binary(self, sink: &mut impl Write) -> std::io::Result<()> {
        let relation = match self.constraint.relation() {
            Relation::GreaterEqual => b'>',
            Relation::Equal => b'=',
        };
        sink.write_all(&[self.kind.code(), relation])?;

        varint::write_varint(sink, self.constraint.len() as i64)?;
        for term in self.constraint.terms() {
            varint::write_varint(sink, term.coefficient)?;
            varint::write_varint(sink, i64::from(term.variable.get()))?;
        }
        varint::write_varint(sink, self.constraint.bound())?;

        varint::write_varint(sink, self.hints.len() as i64)?;
        for hint in self.hints {
            varint::write_varint(sink, hint.get() as i64)?;
        }

        Ok(())
    }
}

struct Comment<'a>(&'a str);

impl WritableProofStep for Comment<'_> {
    fn write_string(self, sink: &mut impl Write) -> std::io::Result<()> {
        for line in self.0.lines() {
            writeln!(sink, "* {line}")?;
        }

        if self.0.is_empty() {
            writeln!(sink, "*")?;
        }

        Ok(())
    }

    fn write_binary(self, sink: &mut impl Write) -> std::io::Result<()> {
        sink.write_all(&[Format::COMMENT_CODE])?;
        varint::write_varint(sink, self.0.len() as i64)?;
        sink.write_all(self.0.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use super::*;
    use crate::constraint::Term;

    #[test]
    fn write_input_step() {
        test_step_serialization(
            StepRecord {
                kind: StepKind::Input,
                constraint: &at_least_one(&[1, 2]),
                hints: &[],
            },
            "i +1 x1 +1 x2 >= 1 ;\n",
        );
    }

    #[test]
    fn write_assert_step_with_hints() {
        test_step_serialization(
            StepRecord {
                kind: StepKind::Assert,
                constraint: &Constraint::new(
                    [Term {
                        coefficient: -2,
                        variable: var(3),
                    }],
                    Relation::Equal,
                    -1,
                )
                .unwrap(),
                hints: &[id(4), id(2)],
            },
            "a -2 x3 = -1 ; 4 2\n",
        );
    }

    #[test]
    fn write_empty_constraint() {
        test_step_serialization(
            StepRecord {
                kind: StepKind::Assert,
                constraint: &Constraint::trivial(Relation::GreaterEqual, 1),
                hints: &[id(1)],
            },
            "a >= 1 ; 1\n",
        );
    }

    #[test]
    fn multi_line_comments_are_prefixed() {
        test_step_serialization(Comment("first\nsecond"), "* first\n* second\n");
    }

    #[test]
    fn ids_increase_from_one() {
        let mut writer = ProofWriter::new(Format::Text, Vec::new());

        let first = writer.record_input(&at_least_one(&[1])).unwrap();
        writer.comment("not a step").unwrap();
        let second = writer.record_input(&at_least_one(&[2])).unwrap();
        let third = writer
            .record_assert(&at_least_one(&[1, 2]), [first, second])
            .unwrap();

        assert_eq!([id(1), id(2), id(3)], [first, second, third]);
        assert_eq!(id(4), writer.next_step_id());
    }

    #[test]
    fn hint_to_future_step_is_rejected() {
        let mut writer = ProofWriter::new(Format::Text, Vec::new());
        let first = writer.record_input(&at_least_one(&[1])).unwrap();

        let result = writer.record_assert(&at_least_one(&[1]), [first, id(2)]);
        assert!(matches!(
            result,
            Err(TraceError::DanglingHint { step, hint }) if step == id(2) && hint == id(2)
        ));

        // The failed step did not consume an id, nor was anything written.
        assert_eq!(id(2), writer.next_step_id());
        let output = writer.into_inner().unwrap();
        assert_eq!("i +1 x1 >= 1 ;\n", String::from_utf8(output).unwrap());
    }

    #[test]
    fn sealed_writer_rejects_steps() {
        let mut writer = ProofWriter::new(Format::Text, Vec::new());
        let _ = writer.record_input(&at_least_one(&[1])).unwrap();
        writer.finish().unwrap();

        assert!(writer.is_sealed());
        assert!(matches!(
            writer.record_input(&at_least_one(&[1])),
            Err(TraceError::TraceSealed)
        ));
        assert!(matches!(
            writer.record_assert(&at_least_one(&[1]), [id(1)]),
            Err(TraceError::TraceSealed)
        ));
        assert!(matches!(writer.comment("late"), Err(TraceError::TraceSealed)));
        assert!(matches!(writer.finish(), Err(TraceError::TraceSealed)));
    }

    #[test]
    fn null_writer_allocates_ids_like_a_real_writer() {
        let mut real = ProofWriter::new(Format::Text, Vec::new());
        let mut null = ProofWriter::null();

        for writer_ids in [record_sample(&mut real), record_sample(&mut null)] {
            assert_eq!(vec![id(1), id(2), id(3)], writer_ids);
        }

        assert_eq!(real.statistics(), null.statistics());
        assert_eq!(
            ProofStatistics {
                inputs: 2,
                asserts: 1,
                comments: 1
            },
            null.statistics()
        );
        assert!(matches!(
            null.record_assert(&at_least_one(&[1]), [id(9)]),
            Err(TraceError::DanglingHint { .. })
        ));
    }

    #[test]
    fn binary_step_layout() {
        let mut buffer = Vec::new();
        StepRecord {
            kind: StepKind::Assert,
            constraint: &at_least_one(&[1, 70]),
            hints: &[id(3)],
        }
        .write_binary(&mut buffer)
        .unwrap();

        let mut expected = vec![b'a', b'>'];
        expected.extend(varint::encode(&[2, 1, 1, 1, 70, 1, 1, 3]));
        assert_eq!(expected, buffer);
    }

    fn record_sample<W: Write>(writer: &mut ProofWriter<W>) -> Vec<StepId> {
        let first = writer.record_input(&at_least_one(&[1])).unwrap();
        let second = writer.record_input(&at_least_one(&[2])).unwrap();
        writer.comment("between").unwrap();
        let third = writer
            .record_assert(&at_least_one(&[1, 2]), [second, first])
            .unwrap();
        vec![first, second, third]
    }

    fn at_least_one(variables: &[u32]) -> Constraint {
        Constraint::at_least_one(variables.iter().map(|&index| var(index))).unwrap()
    }

    fn var(index: u32) -> NonZeroU32 {
        NonZeroU32::new(index).unwrap()
    }

    fn id(num: u64) -> StepId {
        StepId::new(num).unwrap()
    }

    fn test_step_serialization(step: impl WritableProofStep, expected: &str) {
        let mut buffer = Vec::new();
        step.write_string(&mut buffer).expect("no error writing");

        let actual = String::from_utf8(buffer).expect("valid utf8");
        assert_eq!(expected, actual);
    }
}
