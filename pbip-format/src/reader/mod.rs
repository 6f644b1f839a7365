//! Implements the parsing of proof traces.
//!
//! See [`ProofReader`] for information on how to parse a trace.

mod error;
mod parser;

use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::num::NonZeroU32;
use std::num::NonZeroU64;

pub use error::ReadError;
use parser::LineParser;
use parser::ParsedStep;

use crate::constraint::Constraint;
use crate::constraint::Relation;
use crate::constraint::Term;
use crate::format::Format;
use crate::steps::ProofStep;
use crate::steps::StepId;
use crate::steps::StepKind;
use crate::varint;

/// Lengths in a binary trace are only trusted up to this many elements before they are read.
const MAX_PREALLOCATED: usize = 1 << 16;

/// One record of a proof trace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Record<Step = ProofStep> {
    Step(Step),
    Comment(String),
}

/// Used to read and parse proof traces.
///
/// Steps are numbered in the order in which they are read, starting at 1, exactly as the
/// [`ProofWriter`](crate::writer::ProofWriter) numbers them when writing.
///
/// Note that the reader does not perform any type of validity checking of the proof. Hints are
/// not resolved, and constraints are not checked against their antecedents. See
/// [`Replay`](crate::derivation::Replay) for that.
///
/// # Example
/// ```
/// use pbip_format::reader::ProofReader;
/// use pbip_format::steps::StepKind;
/// use pbip_format::Format;
///
/// let source = r#"
/// * two steps
/// i +1 x1 >= 1 ;
/// a +2 x1 >= 2 ; 1 1
/// "#;
///
/// let mut reader = ProofReader::new(Format::Text, source.as_bytes());
///
/// let input = reader.next_step().unwrap().expect("an input step");
/// assert_eq!(1, input.id.get());
/// assert_eq!(StepKind::Input, input.kind);
///
/// let derived = reader.next_step().unwrap().expect("an assert step");
/// assert_eq!(2, derived.id.get());
/// assert_eq!(vec![input.id, input.id], derived.hints);
/// assert_eq!("+2 x1 >= 2", derived.constraint.to_opb());
///
/// assert_eq!(None, reader.next_step().unwrap());
/// ```
#[derive(Debug)]
pub struct ProofReader<R> {
    source: BufReader<R>,
    format: Format,
    string_buffer: String,
    /// The number of the current line, or of the current record in a binary trace.
    record_nr: usize,
    /// The byte offset in a binary trace.
    position: usize,
    next_step_id: StepId,
}

impl<R: Read> ProofReader<R> {
    /// Construct a new proof reader which reads from `source`.
    pub fn new(format: Format, source: R) -> ProofReader<R> {
        ProofReader {
            source: BufReader::new(source),
            format,
            string_buffer: String::new(),
            record_nr: 0,
            position: 0,
            next_step_id: NonZeroU64::MIN,
        }
    }

    /// Read the next step, skipping any comments.
    ///
    /// Returns `Ok(None)` when the end of the trace is reached.
    pub fn next_step(&mut self) -> Result<Option<ProofStep>, ReadError> {
        loop {
            match self.next_record()? {
                Some(Record::Step(step)) => return Ok(Some(step)),
                Some(Record::Comment(_)) => {}
                None => return Ok(None),
            }
        }
    }

    /// Read the next step or comment.
    pub fn next_record(&mut self) -> Result<Option<Record>, ReadError> {
        let record = match self.format {
            Format::Text => self.next_text_record()?,
            Format::Binary => self.next_binary_record()?,
        };

        let Some(record) = record else {
            return Ok(None);
        };

        let record = match record {
            Record::Step((kind, constraint, hints)) => {
                let id = self.next_step_id;
                self.next_step_id = id
                    .checked_add(1)
                    .expect("step ids do not exceed u64::MAX");

                Record::Step(ProofStep {
                    id,
                    kind,
                    constraint,
                    hints,
                })
            }

            Record::Comment(comment) => Record::Comment(comment),
        };

        Ok(Some(record))
    }

    fn next_text_record(&mut self) -> Result<Option<Record<ParsedStep>>, ReadError> {
        loop {
            self.string_buffer.clear();
            let read_bytes = self.source.read_line(&mut self.string_buffer)?;

            if read_bytes == 0 {
                return Ok(None);
            }

            self.record_nr += 1;

            if let Some(record) = LineParser::new(&self.string_buffer, self.record_nr).parse()? {
                return Ok(Some(record));
            }
        }
    }

    /// Reads a record in the binary layout:
    /// ```ignored
    /// step    := ("i" | "a") (">" | "=") <len> (<coefficient> <variable>)* <bound> <len> <hint>*
    /// comment := "*" <len> <utf-8 bytes>
    /// ```
    /// where all numbers are varints.
    fn next_binary_record(&mut self) -> Result<Option<Record<ParsedStep>>, ReadError> {
        let mut code = [0_u8];
        if self.source.read(&mut code)? == 0 {
            return Ok(None);
        }
        self.position += 1;
        self.record_nr += 1;

        if code[0] == Format::COMMENT_CODE {
            let len = self.next_len()?;
            let mut bytes = Vec::new();
            let read_bytes = self.source.by_ref().take(len as u64).read_to_end(&mut bytes)?;
            self.position += read_bytes;
            if read_bytes < len {
                return Err(self.error("unexpected end of proof"));
            }

            let comment =
                String::from_utf8(bytes).map_err(|_| self.error("comment is not valid UTF-8"))?;
            return Ok(Some(Record::Comment(comment)));
        }

        let kind = StepKind::from_code(code[0])
            .ok_or_else(|| self.error(&format!("unknown record code {:#04x}", code[0])))?;

        let mut relation = [0_u8];
        self.source.read_exact(&mut relation)?;
        self.position += 1;
        let relation = match relation[0] {
            b'>' => Relation::GreaterEqual,
            b'=' => Relation::Equal,
            other => return Err(self.error(&format!("unknown relation code {other:#04x}"))),
        };

        let num_terms = self.next_len()?;
        let mut terms = Vec::with_capacity(num_terms.min(MAX_PREALLOCATED));
        for _ in 0..num_terms {
            let coefficient = self.next_int()?;
            let variable = u32::try_from(self.next_int()?)
                .ok()
                .and_then(NonZeroU32::new)
                .ok_or_else(|| self.error("variable out of range"))?;

            terms.push(Term {
                coefficient,
                variable,
            });
        }

        let bound = self.next_int()?;

        let num_hints = self.next_len()?;
        let mut hints = Vec::with_capacity(num_hints.min(MAX_PREALLOCATED));
        for _ in 0..num_hints {
            let hint = u64::try_from(self.next_int()?)
                .ok()
                .and_then(StepId::new)
                .ok_or_else(|| self.error("hint out of range"))?;
            hints.push(hint);
        }

        if kind == StepKind::Input && !hints.is_empty() {
            return Err(self.error("input steps cannot have hints"));
        }

        let constraint =
            Constraint::new(terms, relation, bound).map_err(|err| self.error(&err.to_string()))?;

        Ok(Some(Record::Step((kind, constraint, hints))))
    }

    fn next_int(&mut self) -> Result<i64, ReadError> {
        match varint::read_varint(&mut self.source, &mut self.position)? {
            Some(value) => Ok(value?),
            None => Err(self.error("unexpected end of proof")),
        }
    }

    fn next_len(&mut self) -> Result<usize, ReadError> {
        let value = self.next_int()?;
        usize::try_from(value).map_err(|_| self.error("negative length"))
    }

    fn error(&self, reason: &str) -> ReadError {
        ReadError::Parse {
            line_nr: self.record_nr,
            reason: reason.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::ProofWriter;

    #[test]
    fn comments_are_returned_as_records() {
        let source = "* first\ni +1 x1 >= 1 ;\n";
        let mut reader = ProofReader::new(Format::Text, source.as_bytes());

        assert_eq!(
            Some(Record::Comment("first".to_owned())),
            reader.next_record().unwrap()
        );
        assert!(matches!(reader.next_record(), Ok(Some(Record::Step(_)))));
        assert_eq!(None, reader.next_record().unwrap());
    }

    #[test]
    fn parse_errors_carry_the_line_number() {
        let source = "i +1 x1 >= 1 ;\n\nz\n";
        let mut reader = ProofReader::new(Format::Text, source.as_bytes());

        let _ = reader.next_step().unwrap();
        assert!(matches!(
            reader.next_step(),
            Err(ReadError::Parse { line_nr: 3, .. })
        ));
    }

    #[test]
    fn binary_trace_is_read_back() {
        let steps = read_written_trace(Format::Binary);

        assert_eq!(3, steps.len());
        assert_eq!(vec![id(1), id(2)], steps[2].hints);
        assert!(steps[2].constraint.is_contradiction());
    }

    #[test]
    fn binary_and_text_traces_agree() {
        assert_eq!(
            read_written_trace(Format::Text),
            read_written_trace(Format::Binary)
        );
    }

    #[test]
    fn truncated_binary_trace_is_rejected() {
        let mut bytes = write_trace(Format::Binary);
        let _ = bytes.pop();

        let mut reader = ProofReader::new(Format::Binary, bytes.as_slice());
        let _ = reader.next_step().unwrap();
        let _ = reader.next_step().unwrap();

        assert!(reader.next_step().is_err());
    }

    #[test]
    fn oversized_term_count_is_a_truncation() {
        let mut bytes = vec![b'a', b'>'];
        bytes.extend(varint::encode(&[i64::MAX]));

        assert_truncated(&bytes);
    }

    #[test]
    fn oversized_hint_count_is_a_truncation() {
        let mut bytes = vec![b'a', b'>'];
        bytes.extend(varint::encode(&[0, 1, 1 << 40]));

        assert_truncated(&bytes);
    }

    #[test]
    fn oversized_comment_length_is_a_truncation() {
        let mut bytes = vec![Format::COMMENT_CODE];
        bytes.extend(varint::encode(&[1 << 40]));
        bytes.extend(b"short");

        assert_truncated(&bytes);
    }

    #[test]
    fn unknown_binary_code_is_rejected() {
        let bytes = [b'x', b'>', 0];
        let mut reader = ProofReader::new(Format::Binary, bytes.as_slice());

        assert!(matches!(
            reader.next_step(),
            Err(ReadError::Parse { line_nr: 1, .. })
        ));
    }

    fn assert_truncated(bytes: &[u8]) {
        let mut reader = ProofReader::new(Format::Binary, bytes);

        match reader.next_record() {
            Err(ReadError::Parse { line_nr: 1, reason }) => {
                assert_eq!("unexpected end of proof", reason)
            }
            other => panic!("expected a truncation error, got {other:?}"),
        }
    }

    fn write_trace(format: Format) -> Vec<u8> {
        let x1 = NonZeroU32::new(1).unwrap();
        let positive = Constraint::at_least_one([x1]).unwrap();
        let negative = Constraint::at_most_one([x1]).unwrap();
        let sum = positive
            .merge(&negative)
            .unwrap()
            .merge(&Constraint::trivial(Relation::GreaterEqual, 1))
            .unwrap();

        let mut writer = ProofWriter::new(format, Vec::new());
        writer.comment("x1 both ways").unwrap();
        let first = writer.record_input(&positive).unwrap();
        let second = writer.record_input(&negative).unwrap();
        let _ = writer.record_assert(&sum, [first, second]).unwrap();
        writer.finish().unwrap();

        writer.into_inner().unwrap()
    }

    fn read_written_trace(format: Format) -> Vec<ProofStep> {
        let bytes = write_trace(format);
        let mut reader = ProofReader::new(format, bytes.as_slice());

        let mut steps = vec![];
        while let Some(step) = reader.next_step().unwrap() {
            steps.push(step);
        }
        steps
    }

    fn id(num: u64) -> StepId {
        StepId::new(num).unwrap()
    }
}
