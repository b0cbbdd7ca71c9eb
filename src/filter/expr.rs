// Copyright 2026 Trailquery Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Boolean expression algebra
//!
//! Expressions live in conjunctive normal form throughout: an
//! [`Expression`] is a set of [`Clause`]s (conjunction), a clause is a set
//! of [`Literal`]s (disjunction). Sets are ordered and deduplicated, so
//! equality is structural and order-independent.
//!
//! The combinators keep CNF closed under the three operations:
//!
//! - [`and_`] - union of the clause sets
//! - [`or_`] - cross product; each output clause is the union of one
//!   clause from each side
//! - [`not_`] - De Morgan, renormalized back to CNF through [`or_`]
//!
//! Invariants: a zero-literal clause never enters an expression, and no
//! stored clause is a superset of another (absorption, so double negation
//! is a structural identity). The empty expression itself means
//! "no constraint".

use std::collections::BTreeSet;
use std::fmt;

/// A named term with a negation flag
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Literal {
    pub term: String,
    pub negated: bool,
}

impl Literal {
    /// Positive literal
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            negated: false,
        }
    }

    /// Negated literal
    pub fn negative(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            negated: true,
        }
    }

    /// The same term with the opposite sign
    pub fn inverted(&self) -> Self {
        Self {
            term: self.term.clone(),
            negated: !self.negated,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "!{}", self.term)
        } else {
            write!(f, "{}", self.term)
        }
    }
}

/// A disjunction of literals
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Clause {
    literals: BTreeSet<Literal>,
}

impl Clause {
    /// Clause from any collection of literals
    pub fn new(literals: impl IntoIterator<Item = Literal>) -> Self {
        Self {
            literals: literals.into_iter().collect(),
        }
    }

    /// The literals in canonical order
    pub fn literals(&self) -> impl Iterator<Item = &Literal> {
        self.literals.iter()
    }

    /// Number of distinct literals
    pub fn len(&self) -> usize {
        self.literals.len()
    }

    /// True for the zero-literal clause (never stored in an expression)
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    /// Disjunction of two clauses: union of their literal sets
    pub fn merged(&self, other: &Clause) -> Clause {
        Clause {
            literals: self.literals.union(&other.literals).cloned().collect(),
        }
    }

    /// True if every literal of `self` also appears in `other`, so `self`
    /// implies `other` and `other` is redundant next to it
    pub fn subsumes(&self, other: &Clause) -> bool {
        self.literals.is_subset(&other.literals)
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for lit in &self.literals {
            if !first {
                write!(f, "+")?;
            }
            write!(f, "{lit}")?;
            first = false;
        }
        Ok(())
    }
}

/// A conjunction of clauses: the canonical CNF form
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Expression {
    clauses: BTreeSet<Clause>,
}

impl Expression {
    /// The empty expression: no constraint, matches everything
    pub fn empty() -> Self {
        Self::default()
    }

    /// Expression from clauses. Zero-literal clauses are discarded and
    /// subsumed clauses absorbed (`a,(a+b)` stores only `a`) here and
    /// nowhere else, so both invariants hold at every construction site.
    pub fn new(clauses: impl IntoIterator<Item = Clause>) -> Self {
        let clauses: BTreeSet<Clause> = clauses.into_iter().filter(|c| !c.is_empty()).collect();
        let reduced = clauses
            .iter()
            .filter(|c| !clauses.iter().any(|d| d != *c && d.subsumes(c)))
            .cloned()
            .collect();
        Self { clauses: reduced }
    }

    /// Expression holding a single positive literal
    pub fn literal(term: impl Into<String>) -> Self {
        Self::new([Clause::new([Literal::new(term)])])
    }

    /// The clauses in canonical order
    pub fn clauses(&self) -> impl Iterator<Item = &Clause> {
        self.clauses.iter()
    }

    /// Number of clauses
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// True for the empty (unconstrained) expression
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// All distinct term names, in canonical order
    pub fn terms(&self) -> BTreeSet<&str> {
        self.clauses
            .iter()
            .flat_map(|c| c.literals())
            .map(|l| l.term.as_str())
            .collect()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for clause in &self.clauses {
            if !first {
                write!(f, ",")?;
            }
            if clause.len() > 1 {
                write!(f, "({clause})")?;
            } else {
                write!(f, "{clause}")?;
            }
            first = false;
        }
        Ok(())
    }
}

/// Conjunction: the union of both clause sets
pub fn and_(a: &Expression, b: &Expression) -> Expression {
    Expression::new(a.clauses().chain(b.clauses()).cloned())
}

/// Disjunction: distribute OR over AND.
///
/// Each output clause is the union of one clause from each side. An
/// unconstrained side absorbs the other (`true | b == true`).
pub fn or_(a: &Expression, b: &Expression) -> Expression {
    if a.is_empty() || b.is_empty() {
        return Expression::empty();
    }
    let mut clauses = BTreeSet::new();
    for c in a.clauses() {
        for d in b.clauses() {
            clauses.insert(c.merged(d));
        }
    }
    Expression::new(clauses)
}

/// Negation by De Morgan.
///
/// Negating the conjunction disjoins the negated clauses; negating a
/// clause conjoins its negated literals. The disjunctions renormalize
/// through [`or_`], so the result is CNF again. `not_` of the
/// unconstrained expression stays unconstrained.
pub fn not_(e: &Expression) -> Expression {
    let mut negated_clauses = e.clauses().map(not_clause);
    let Some(first) = negated_clauses.next() else {
        return e.clone();
    };
    negated_clauses.fold(first, |acc, x| or_(&acc, &x))
}

/// Negate one clause into an expression of singleton clauses
fn not_clause(c: &Clause) -> Expression {
    Expression::new(c.literals().map(|l| Clause::new([l.inverted()])))
}
