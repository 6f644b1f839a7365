use std::num::NonZeroU32;
use std::str::SplitWhitespace;

use crate::constraint::Constraint;
use crate::constraint::Relation;
use crate::constraint::Term;
use crate::reader::ReadError;
use crate::reader::Record;
use crate::steps::StepId;
use crate::steps::StepKind;

/// Parses a single line of a textual proof.
///
/// See [`LineParser::parse`] for more information.
pub(super) struct LineParser<'src> {
    line: &'src str,
    tokens: SplitWhitespace<'src>,
    line_nr: usize,
}

/// A step as it appears on a line, before it is given its ID.
pub(super) type ParsedStep = (StepKind, Constraint, Vec<StepId>);

impl<'src> LineParser<'src> {
    pub(super) fn new(line: &'src str, line_nr: usize) -> Self {
        let line = line.trim_end_matches(['\n', '\r']);

        LineParser {
            line,
            tokens: line.split_whitespace(),
            line_nr,
        }
    }

    /// Parses a single line from a proof.
    ///
    /// The line may be empty, in which case this returns `Ok(None)`. Otherwise, if there is
    /// content on the line, it either successfully parses a record or returns a parser error.
    ///
    /// A step line has the following shape:
    /// ```ignored
    /// ("i" | "a") (<coefficient> "x"<variable>)* (">=" | "=") <bound> ";" <hint>*
    /// ```
    /// A comment line starts with `*`.
    pub(super) fn parse(mut self) -> Result<Option<Record<ParsedStep>>, ReadError> {
        let trimmed = self.line.trim_start();

        if let Some(comment) = trimmed.strip_prefix('*') {
            let comment = comment.strip_prefix(' ').unwrap_or(comment);
            return Ok(Some(Record::Comment(comment.to_owned())));
        }

        let Some(code) = self.tokens.next() else {
            return Ok(None);
        };

        let kind = match code {
            "i" => StepKind::Input,
            "a" => StepKind::Assert,
            other => return Err(self.error(format!("expected i, a, or *. got '{other}'"))),
        };

        let mut terms = vec![];
        let relation = loop {
            let token = self.expect("a term or a relation")?;

            match token {
                ">=" => break Relation::GreaterEqual,
                "=" => break Relation::Equal,
                coefficient => {
                    let coefficient = coefficient
                        .parse::<i64>()
                        .map_err(|_| self.error(format!("'{coefficient}' is not a coefficient")))?;

                    let variable = self.expect("a variable")?;
                    let variable = variable
                        .strip_prefix('x')
                        .and_then(|index| index.parse::<NonZeroU32>().ok())
                        .ok_or_else(|| self.error(format!("'{variable}' is not a variable")))?;

                    terms.push(Term {
                        coefficient,
                        variable,
                    });
                }
            }
        };

        let bound = self.expect("a bound")?;
        let bound = bound
            .parse::<i64>()
            .map_err(|_| self.error(format!("'{bound}' is not a bound")))?;

        let separator = self.expect("';'")?;
        if separator != ";" {
            return Err(self.error(format!("expected ';', got '{separator}'")));
        }

        let hints = self
            .tokens
            .by_ref()
            .map(|hint| {
                hint.parse::<StepId>()
                    .map_err(|_| format!("'{hint}' is not a step id"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|reason| self.error(reason))?;

        if kind == StepKind::Input && !hints.is_empty() {
            return Err(self.error("input steps cannot have hints".to_owned()));
        }

        let constraint = Constraint::new(terms, relation, bound)
            .map_err(|err| self.error(err.to_string()))?;

        Ok(Some(Record::Step((kind, constraint, hints))))
    }

    fn expect(&mut self, what: &str) -> Result<&'src str, ReadError> {
        self.tokens
            .next()
            .ok_or_else(|| self.error(format!("unexpected end of line, expected {what}")))
    }

    fn error(&self, reason: String) -> ReadError {
        ReadError::Parse {
            line_nr: self.line_nr,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_step() {
        let (kind, constraint, hints) = parse_step("i +1 x1 -2 x3 >= -1 ;");

        assert_eq!(StepKind::Input, kind);
        assert_eq!("+1 x1 -2 x3 >= -1", constraint.to_opb());
        assert!(hints.is_empty());
    }

    #[test]
    fn assert_step_with_hints() {
        let (kind, constraint, hints) = parse_step("a 1 x2 = 1 ; 3 1\n");

        assert_eq!(StepKind::Assert, kind);
        assert_eq!("+1 x2 = 1", constraint.to_opb());
        assert_eq!(vec![id(3), id(1)], hints);
    }

    #[test]
    fn empty_constraint() {
        let (_, constraint, _) = parse_step("a >= 1 ; 4 5");
        assert!(constraint.is_contradiction());
    }

    #[test]
    fn comment_line() {
        let record = LineParser::new("* some remark\n", 1).parse().unwrap();
        assert_eq!(Some(Record::Comment("some remark".to_owned())), record);
    }

    #[test]
    fn blank_line() {
        assert_eq!(None, LineParser::new("   \n", 1).parse().unwrap());
    }

    #[test]
    fn unknown_record() {
        assert_parse_error("d 1 x1 >= 1 ;");
    }

    #[test]
    fn missing_separator() {
        assert_parse_error("a +1 x1 >= 1 2 3");
    }

    #[test]
    fn missing_bound() {
        assert_parse_error("a +1 x1 >=");
    }

    #[test]
    fn malformed_variable() {
        assert_parse_error("i +1 y1 >= 1 ;");
        assert_parse_error("i +1 x0 >= 1 ;");
    }

    #[test]
    fn zero_hint() {
        assert_parse_error("a >= 1 ; 0");
    }

    #[test]
    fn input_with_hints() {
        assert_parse_error("i +1 x1 >= 1 ; 1");
    }

    #[test]
    fn repeated_variable() {
        assert_parse_error("i +1 x1 +1 x1 >= 1 ;");
    }

    fn parse_step(line: &str) -> ParsedStep {
        match LineParser::new(line, 1).parse() {
            Ok(Some(Record::Step(step))) => step,
            other => panic!("expected a step, got {other:?}"),
        }
    }

    fn assert_parse_error(line: &str) {
        let result = LineParser::new(line, 7).parse();
        assert!(
            matches!(result, Err(ReadError::Parse { line_nr: 7, .. })),
            "expected a parse error, got {result:?}"
        );
    }

    fn id(num: u64) -> StepId {
        StepId::new(num).unwrap()
    }
}
