/// The errors that can be encountered while reading a DIMACS CNF source.
///
/// Line numbers start at 1.
#[derive(Debug, thiserror::Error)]
pub enum CnfError {
    #[error("failed to read from source: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: clause found before the 'p cnf' header")]
    MissingHeader { line: usize },

    #[error("line {line}: '{header}' is an invalid header")]
    InvalidHeader { line: usize, header: String },

    #[error("line {line}: multiple 'p cnf' headers found")]
    DuplicateHeader { line: usize },

    #[error("line {line}: malformed clause, {reason}")]
    MalformedClause { line: usize, reason: String },

    #[error("line {line}: literal {literal} is outside the {num_variables} declared variables")]
    OutOfRangeLiteral {
        line: usize,
        literal: i64,
        num_variables: usize,
    },

    #[error("line {line}: variable {variable} occurs more than once in the clause")]
    DuplicateOrComplementaryVariable { line: usize, variable: u32 },

    #[error("expected to parse {expected} clauses, but parsed {parsed}")]
    ClauseCountMismatch { expected: usize, parsed: usize },
}
