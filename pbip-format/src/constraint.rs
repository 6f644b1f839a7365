//! Linear pseudo-Boolean constraints and the exact combination rule used to derive new
//! constraints from existing ones.
//!
//! A [`Constraint`] is a sum of integer-weighted variables compared to a bound. Only positive
//! literals appear in a constraint; negation is handled by the caller choosing appropriate
//! coefficients and bounds.
use std::cmp::Ordering;
use std::fmt::Display;
use std::fmt::Write;
use std::num::NonZeroU32;

/// A variable in a constraint, numbered from 1.
pub type Variable = NonZeroU32;

/// The comparison between the left-hand side of a constraint and its bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Relation {
    /// `lhs >= bound`
    GreaterEqual,
    /// `lhs = bound`
    Equal,
}

impl Relation {
    /// The symbol used in the OPB rendering.
    pub fn symbol(self) -> &'static str {
        match self {
            Relation::GreaterEqual => ">=",
            Relation::Equal => "=",
        }
    }
}

impl Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// The errors which can be returned when constructing or combining constraints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AlgebraError {
    #[error("cannot merge a '{left}' constraint with a '{right}' constraint")]
    IncompatibleRelation { left: Relation, right: Relation },

    #[error("a constraint over an empty set of variables was requested")]
    EmptyVariableSet,

    #[error("variable {0} occurs more than once")]
    DuplicateVariable(Variable),

    #[error("the sum of the coefficients of variable {0} does not fit in 64 bits")]
    CoefficientOverflow(Variable),

    #[error("the sum of the bounds does not fit in 64 bits")]
    BoundOverflow,
}

/// A single `coefficient * variable` term.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Term {
    pub coefficient: i64,
    pub variable: Variable,
}

/// A linear pseudo-Boolean constraint.
///
/// The variables are kept in strictly ascending order, which is what allows [`Constraint::merge`]
/// to run in time linear in the number of terms. Constraints are immutable; combining two of them
/// produces a new constraint.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Constraint {
    variables: Vec<Variable>,
    coefficients: Vec<i64>,
    bound: i64,
    relation: Relation,
}

impl Constraint {
    /// Create a constraint from arbitrarily ordered terms.
    ///
    /// Terms with a zero coefficient are kept as given. A variable that occurs in more than one
    /// term is rejected.
    pub fn new(
        terms: impl IntoIterator<Item = Term>,
        relation: Relation,
        bound: i64,
    ) -> Result<Constraint, AlgebraError> {
        let mut terms = terms.into_iter().collect::<Vec<_>>();
        terms.sort_by_key(|term| term.variable);

        if let Some(pair) = terms.windows(2).find(|pair| pair[0].variable == pair[1].variable) {
            return Err(AlgebraError::DuplicateVariable(pair[0].variable));
        }

        Ok(Constraint {
            variables: terms.iter().map(|term| term.variable).collect(),
            coefficients: terms.iter().map(|term| term.coefficient).collect(),
            bound,
            relation,
        })
    }

    /// The constraint `0 >= bound`. With a positive bound this is a contradiction.
    pub fn trivial(relation: Relation, bound: i64) -> Constraint {
        Constraint {
            variables: vec![],
            coefficients: vec![],
            bound,
            relation,
        }
    }

    /// `x1 + ... + xn >= 1`
    pub fn at_least_one(
        variables: impl IntoIterator<Item = Variable>,
    ) -> Result<Constraint, AlgebraError> {
        Self::uniform(variables, 1, Relation::GreaterEqual, 1)
    }

    /// `-x1 - ... - xn >= -1`
    pub fn at_most_one(
        variables: impl IntoIterator<Item = Variable>,
    ) -> Result<Constraint, AlgebraError> {
        Self::uniform(variables, -1, Relation::GreaterEqual, -1)
    }

    /// `x1 + ... + xn = 1`
    pub fn exactly_one(
        variables: impl IntoIterator<Item = Variable>,
    ) -> Result<Constraint, AlgebraError> {
        Self::uniform(variables, 1, Relation::Equal, 1)
    }

    fn uniform(
        variables: impl IntoIterator<Item = Variable>,
        coefficient: i64,
        relation: Relation,
        bound: i64,
    ) -> Result<Constraint, AlgebraError> {
        let constraint = Constraint::new(
            variables.into_iter().map(|variable| Term {
                coefficient,
                variable,
            }),
            relation,
            bound,
        )?;

        if constraint.is_empty() {
            return Err(AlgebraError::EmptyVariableSet);
        }

        Ok(constraint)
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn coefficients(&self) -> &[i64] {
        &self.coefficients
    }

    pub fn bound(&self) -> i64 {
        self.bound
    }

    pub fn relation(&self) -> Relation {
        self.relation
    }

    /// The number of terms.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Whether the constraint has no terms.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Iterate over the terms in ascending variable order.
    pub fn terms(&self) -> impl Iterator<Item = Term> + '_ {
        self.variables
            .iter()
            .zip(self.coefficients.iter())
            .map(|(&variable, &coefficient)| Term {
                coefficient,
                variable,
            })
    }

    /// Whether no assignment to the variables can satisfy this constraint, judged by
    /// inspection: the constraint has no terms and the bound cannot be met by `0`.
    pub fn is_contradiction(&self) -> bool {
        self.is_empty()
            && match self.relation {
                Relation::GreaterEqual => self.bound > 0,
                Relation::Equal => self.bound != 0,
            }
    }

    /// Add two constraints.
    ///
    /// The coefficients of shared variables are summed, and terms whose coefficient becomes
    /// exactly zero are dropped. The bound of the result is the sum of the bounds. Both
    /// constraints must have the same relation, and no sum may overflow an `i64`.
    pub fn merge(&self, other: &Constraint) -> Result<Constraint, AlgebraError> {
        if self.relation != other.relation {
            return Err(AlgebraError::IncompatibleRelation {
                left: self.relation,
                right: other.relation,
            });
        }

        let capacity = self.len() + other.len();
        let mut variables = Vec::with_capacity(capacity);
        let mut coefficients = Vec::with_capacity(capacity);

        let mut left = self.terms().peekable();
        let mut right = other.terms().peekable();

        loop {
            let term = match (left.peek(), right.peek()) {
                (None, None) => break,
                (Some(_), None) => left.next(),
                (None, Some(_)) => right.next(),
                (Some(l), Some(r)) => match l.variable.cmp(&r.variable) {
                    Ordering::Less => left.next(),
                    Ordering::Greater => right.next(),
                    Ordering::Equal => {
                        let variable = l.variable;
                        let coefficient = l
                            .coefficient
                            .checked_add(r.coefficient)
                            .ok_or(AlgebraError::CoefficientOverflow(variable))?;
                        let _ = left.next();
                        let _ = right.next();

                        if coefficient == 0 {
                            continue;
                        }

                        Some(Term {
                            coefficient,
                            variable,
                        })
                    }
                },
            };

            let term = term.expect("peeked element is present");
            variables.push(term.variable);
            coefficients.push(term.coefficient);
        }

        let bound = self
            .bound
            .checked_add(other.bound)
            .ok_or(AlgebraError::BoundOverflow)?;

        Ok(Constraint {
            variables,
            coefficients,
            bound,
            relation: self.relation,
        })
    }

    /// Render the constraint in OPB form, e.g. `+1 x1 -2 x3 >= -1`.
    pub fn to_opb(&self) -> String {
        let mut opb = String::new();

        for term in self.terms() {
            let _ = write!(opb, "{:+} x{} ", term.coefficient, term.variable);
        }

        let _ = write!(opb, "{} {}", self.relation, self.bound);
        opb
    }
}

impl Display for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_opb())
    }
}
