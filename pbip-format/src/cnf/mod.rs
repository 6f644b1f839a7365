//! A strict reader for the DIMACS CNF format.
//!
//! A [`CnfDocument`] is only handed out when the whole source has been read and every clause
//! satisfies the well-formedness rules:
//!  - every literal refers to a variable in `1..=num_variables`,
//!  - no clause is empty,
//!  - no variable occurs twice in a clause, with either polarity,
//!  - the number of clauses matches the header.
//!
//! Clauses are line-based: each clause line ends with a `0`. Whether a missing terminator is
//! tolerated is controlled by [`Validation`].
mod error;

use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::num::NonZeroI32;
use std::str::FromStr;

pub use error::CnfError;
use log::debug;
use log::trace;

/// A literal in a clause. The absolute value is the variable.
pub type Literal = NonZeroI32;

/// How strictly clause lines are checked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Validation {
    /// Every clause line must end with `0`.
    #[default]
    Careful,
    /// A clause line without a terminating `0` is accepted as a complete clause.
    Lenient,
}

/// Options for [`CnfDocument::parse`].
#[derive(Clone, Copy, Debug, Default)]
pub struct CnfOptions {
    pub validation: Validation,
}

impl CnfOptions {
    pub fn lenient() -> Self {
        CnfOptions {
            validation: Validation::Lenient,
        }
    }
}

/// A validated CNF formula.
///
/// The literals in every clause are ordered by variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CnfDocument {
    num_variables: usize,
    declared_clause_count: usize,
    clauses: Vec<Vec<Literal>>,
}

impl CnfDocument {
    /// Parse a DIMACS CNF source.
    ///
    /// # Example
    /// ```
    /// use pbip_format::cnf::CnfDocument;
    /// use pbip_format::cnf::CnfOptions;
    ///
    /// let source = "c example\np cnf 3 2\n3 -1 0\n2 0\n";
    /// let document = CnfDocument::parse(source.as_bytes(), CnfOptions::default()).unwrap();
    ///
    /// assert_eq!(3, document.num_variables());
    /// let clauses = document
    ///     .clauses()
    ///     .iter()
    ///     .map(|clause| clause.iter().map(|lit| lit.get()).collect::<Vec<_>>())
    ///     .collect::<Vec<_>>();
    /// assert_eq!(vec![vec![-1, 3], vec![2]], clauses);
    /// ```
    pub fn parse(source: impl Read, options: CnfOptions) -> Result<CnfDocument, CnfError> {
        Self::parse_with_comments(source, options, |_| {})
    }

    /// Parse a DIMACS CNF source, and pass the text of every comment line to `on_comment`.
    ///
    /// The leading `c` and a single following space are stripped from the comment.
    pub fn parse_with_comments(
        source: impl Read,
        options: CnfOptions,
        on_comment: impl FnMut(&str),
    ) -> Result<CnfDocument, CnfError> {
        let mut reader = BufReader::new(source);
        let mut parser = CnfParser::new(options, on_comment);
        let mut line = String::new();

        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                return parser.complete();
            }

            parser.parse_line(&line)?;
        }
    }

    pub fn num_variables(&self) -> usize {
        self.num_variables
    }

    pub fn declared_clause_count(&self) -> usize {
        self.declared_clause_count
    }

    pub fn clauses(&self) -> &[Vec<Literal>] {
        &self.clauses
    }

    /// The number of clauses. Always equal to [`Self::declared_clause_count`].
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// Consumes a CNF source line by line.
struct CnfParser<OnComment> {
    options: CnfOptions,
    on_comment: OnComment,
    header: Option<CnfHeader>,
    clauses: Vec<Vec<Literal>>,
    line_nr: usize,
}

impl<OnComment: FnMut(&str)> CnfParser<OnComment> {
    fn new(options: CnfOptions, on_comment: OnComment) -> Self {
        CnfParser {
            options,
            on_comment,
            header: None,
            clauses: vec![],
            line_nr: 0,
        }
    }

    fn parse_line(&mut self, line: &str) -> Result<(), CnfError> {
        self.line_nr += 1;

        let line = line.trim_end_matches(['\n', '\r']);
        let trimmed = line.trim_start();

        if let Some(comment) = trimmed.strip_prefix('c') {
            (self.on_comment)(comment.strip_prefix(' ').unwrap_or(comment));
            return Ok(());
        }

        if trimmed.starts_with('p') {
            return self.init_header(trimmed);
        }

        if trimmed.trim().is_empty() {
            return Ok(());
        }

        self.parse_clause(trimmed)
    }

    fn init_header(&mut self, line: &str) -> Result<(), CnfError> {
        if self.header.is_some() {
            return Err(CnfError::DuplicateHeader { line: self.line_nr });
        }

        let header = line
            .parse::<CnfHeader>()
            .map_err(|_| CnfError::InvalidHeader {
                line: self.line_nr,
                header: line.trim().to_owned(),
            })?;

        debug!(
            "header declares {} variables and {} clauses",
            header.num_variables, header.num_clauses
        );

        self.clauses.reserve(header.num_clauses.min(1 << 16));
        self.header = Some(header);

        Ok(())
    }

    fn parse_clause(&mut self, line: &str) -> Result<(), CnfError> {
        let line_nr = self.line_nr;
        let num_variables = self
            .header
            .as_ref()
            .ok_or(CnfError::MissingHeader { line: line_nr })?
            .num_variables;

        let malformed = |reason: String| CnfError::MalformedClause {
            line: line_nr,
            reason,
        };

        let mut clause = vec![];
        let mut is_terminated = false;

        for word in line.split_whitespace() {
            if is_terminated {
                return Err(malformed(format!("'{word}' follows the terminating 0")));
            }

            let code = word
                .parse::<i64>()
                .map_err(|_| malformed(format!("'{word}' is an invalid DIMACS literal")))?;

            if code == 0 {
                is_terminated = true;
                continue;
            }

            let literal = i32::try_from(code)
                .ok()
                .and_then(NonZeroI32::new)
                .filter(|literal| literal.unsigned_abs().get() as usize <= num_variables)
                .ok_or(CnfError::OutOfRangeLiteral {
                    line: line_nr,
                    literal: code,
                    num_variables,
                })?;

            clause.push(literal);
        }

        if !is_terminated && self.options.validation == Validation::Careful {
            return Err(malformed("the clause is not terminated with a '0'".to_owned()));
        }

        if clause.is_empty() {
            return Err(malformed("the clause is empty".to_owned()));
        }

        clause.sort_by_key(|literal| literal.unsigned_abs());

        if let Some(pair) = clause
            .windows(2)
            .find(|pair| pair[0].unsigned_abs() == pair[1].unsigned_abs())
        {
            return Err(CnfError::DuplicateOrComplementaryVariable {
                line: line_nr,
                variable: pair[0].unsigned_abs().get(),
            });
        }

        trace!("clause {} on line {line_nr}: {clause:?}", self.clauses.len() + 1);
        self.clauses.push(clause);

        Ok(())
    }

    fn complete(self) -> Result<CnfDocument, CnfError> {
        let header = self.header.ok_or(CnfError::MissingHeader {
            line: self.line_nr + 1,
        })?;

        if header.num_clauses != self.clauses.len() {
            return Err(CnfError::ClauseCountMismatch {
                expected: header.num_clauses,
                parsed: self.clauses.len(),
            });
        }

        Ok(CnfDocument {
            num_variables: header.num_variables,
            declared_clause_count: header.num_clauses,
            clauses: self.clauses,
        })
    }
}

struct CnfHeader {
    num_variables: usize,
    num_clauses: usize,
}

impl FromStr for CnfHeader {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut components = s.split_whitespace();

        if components.next() != Some("p") || components.next() != Some("cnf") {
            return Err(());
        }

        let num_variables = next_header_component(&mut components)?;
        let num_clauses = next_header_component(&mut components)?;

        // Literals are `i32`s.
        if num_variables > i32::MAX as usize {
            return Err(());
        }

        if components.next().is_some() {
            return Err(());
        }

        Ok(CnfHeader {
            num_variables,
            num_clauses,
        })
    }
}

fn next_header_component<'a>(components: &mut impl Iterator<Item = &'a str>) -> Result<usize, ()> {
    components
        .next()
        .ok_or(())?
        .parse::<usize>()
        .map_err(|_| ())
}
