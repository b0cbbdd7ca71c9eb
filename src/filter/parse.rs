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

//! Boolean expression parser
//!
//! One parser entry point, [`parse`], serving two concrete syntaxes behind
//! a [`Dialect`] flag:
//!
//! - [`Dialect::Query`]: infix boolean text. `&` and `,` are AND, `|` and
//!   `+` are OR, `~` and `!` are NOT, parentheses group. A literal is any
//!   maximal run of non-operator characters, trimmed of surrounding
//!   whitespace, so `second=0 & first=500` is two literals joined by AND.
//! - [`Dialect::Cli`]: the shell-friendly filter syntax. Whitespace joins
//!   terms by OR inside a clause, `&` separates clauses, each term is
//!   `field=value` or `field!=value`.
//!
//! Both dialects produce the same [`Expression`] algebra, so equivalent
//! inputs compile to identical filters regardless of surface.

use std::sync::OnceLock;

use regex::Regex;

use crate::core::{Error, Result};
use crate::filter::expr::{and_, not_, or_, Clause, Expression, Literal};
use crate::filter::spec::{ClauseSpec, TermSpec};

/// Concrete syntax accepted by [`parse`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Infix boolean text with `&`/`,`, `|`/`+`, `!`/`~` and parentheses
    #[default]
    Query,
    /// Space-is-OR, `&`-is-AND clause syntax with `field[!]=value` terms
    Cli,
}

/// Parse an expression in the given dialect
pub fn parse(input: &str, dialect: Dialect) -> Result<Expression> {
    match dialect {
        Dialect::Query => Parser::new(input, tokenize_query(input)?).run(),
        Dialect::Cli => parse_cli(tokenize_cli(input)?),
    }
}

/// Lower a parsed expression into structured filter clauses.
///
/// Every literal must carry a `field=value` form; the literal's negation
/// flag becomes the term's operator. This is the bridge between the string
/// surface and the structured surface, so both compile identically.
pub fn clause_specs(expr: &Expression) -> Result<Vec<ClauseSpec>> {
    expr.clauses()
        .map(|clause| {
            let terms = clause
                .literals()
                .map(|lit| {
                    let (field, value) = lit.term.split_once('=').ok_or_else(|| {
                        Error::MalformedFilterSpec(format!(
                            "term '{}' is missing '='",
                            lit.term
                        ))
                    })?;
                    Ok(if lit.negated {
                        TermSpec::ne(field, value)
                    } else {
                        TermSpec::eq(field, value)
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(ClauseSpec::new(terms))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Term(Literal),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

#[derive(Debug, Clone)]
struct Token {
    tok: Tok,
    offset: usize,
    text: String,
}

/// Operator characters of the query dialect; a literal is a maximal run
/// that starts with neither whitespace nor an operator and contains no
/// operator (internal whitespace is allowed, the run is trimmed at the
/// end).
fn query_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[&,|+~!()]|[^&,|+~!()\s][^&,|+~!()]*")
            .unwrap_or_else(|e| panic!("token pattern: {e}"))
    })
}

fn tokenize_query(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut end = 0;
    for m in query_token_re().find_iter(input) {
        // anything skipped between matches must be whitespace
        if let Some(stray) = input[end..m.start()].chars().find(|c| !c.is_whitespace()) {
            return Err(malformed("unexpected character", &stray.to_string(), end));
        }
        end = m.end();
        let text = m.as_str();
        let tok = match text {
            "&" | "," => Tok::And,
            "|" | "+" => Tok::Or,
            "~" | "!" => Tok::Not,
            "(" => Tok::LParen,
            ")" => Tok::RParen,
            run => Tok::Term(Literal::new(run.trim_end())),
        };
        tokens.push(Token {
            tok,
            offset: m.start(),
            text: text.trim_end().to_string(),
        });
    }
    Ok(tokens)
}

fn tokenize_cli(input: &str) -> Result<Vec<Token>> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut offset = 0;
    while let Some(skip) = input[offset..].find(|c: char| !c.is_whitespace()) {
        let start = offset + skip;
        let len = input[start..]
            .find(char::is_whitespace)
            .unwrap_or(input.len() - start);
        let word = &input[start..start + len];
        offset = start + len;
        let tok = if word == "&" {
            Tok::And
        } else {
            Tok::Term(cli_term(word, start)?)
        };
        tokens.push(Token {
            tok,
            offset: start,
            text: word.to_string(),
        });
    }
    Ok(tokens)
}

/// Assemble CLI tokens into CNF directly: `&` closes a clause, and the
/// terms between separators disjoin. The clause separator therefore binds
/// loosest, the opposite of the query dialect's infix precedence.
fn parse_cli(tokens: Vec<Token>) -> Result<Expression> {
    let mut clauses = Vec::new();
    let mut literals: Vec<Literal> = Vec::new();
    for token in &tokens {
        match &token.tok {
            Tok::Term(lit) => literals.push(lit.clone()),
            _ if literals.is_empty() => {
                return Err(malformed("clause is missing a term", &token.text, token.offset));
            }
            _ => clauses.push(Clause::new(literals.drain(..))),
        }
    }
    match tokens.last() {
        Some(token) if literals.is_empty() => {
            Err(malformed("clause is missing a term", &token.text, token.offset))
        }
        _ => {
            clauses.push(Clause::new(literals));
            Ok(Expression::new(clauses))
        }
    }
}

/// Parse one `field=value` or `field!=value` term of the CLI dialect
fn cli_term(word: &str, offset: usize) -> Result<Literal> {
    let Some(eq) = word.find('=') else {
        return Err(malformed("term is missing '='", word, offset));
    };
    let (field, negated) = match word[..eq].strip_suffix('!') {
        Some(field) if !field.is_empty() => (field, true),
        _ => (&word[..eq], false),
    };
    if field.is_empty() {
        return Err(malformed("term is missing a field name", word, offset));
    }
    let term = format!("{field}={}", &word[eq + 1..]);
    Ok(if negated {
        Literal::negative(term)
    } else {
        Literal::new(term)
    })
}

fn malformed(message: &str, fragment: &str, offset: usize) -> Error {
    Error::MalformedExpression {
        message: message.to_string(),
        fragment: fragment.to_string(),
        offset,
    }
}

/// Recursive-descent evaluator over the query dialect's token stream.
///
/// Precedence, loosest first: OR, AND, NOT.
struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str, tokens: Vec<Token>) -> Self {
        Self {
            input,
            tokens,
            pos: 0,
        }
    }

    fn run(mut self) -> Result<Expression> {
        if self.tokens.is_empty() {
            return Ok(Expression::empty());
        }
        let expr = self.or_expr()?;
        if let Some(tok) = self.tokens.get(self.pos) {
            return Err(malformed("expected operator", &tok.text, tok.offset));
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|t| &t.tok)
    }

    fn or_expr(&mut self) -> Result<Expression> {
        let mut expr = self.and_expr()?;
        while self.peek() == Some(&Tok::Or) {
            self.pos += 1;
            let rhs = self.and_expr()?;
            expr = or_(&expr, &rhs);
        }
        Ok(expr)
    }

    fn and_expr(&mut self) -> Result<Expression> {
        let mut expr = self.not_expr()?;
        while self.peek() == Some(&Tok::And) {
            self.pos += 1;
            let rhs = self.not_expr()?;
            expr = and_(&expr, &rhs);
        }
        Ok(expr)
    }

    fn not_expr(&mut self) -> Result<Expression> {
        if self.peek() == Some(&Tok::Not) {
            self.pos += 1;
            let inner = self.not_expr()?;
            return Ok(not_(&inner));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expression> {
        let Some(token) = self.tokens.get(self.pos).cloned() else {
            return Err(malformed("missing operand", "", self.input.len()));
        };
        match token.tok {
            Tok::Term(lit) => {
                self.pos += 1;
                Ok(Expression::new([Clause::new([lit])]))
            }
            Tok::LParen => {
                self.pos += 1;
                let inner = self.or_expr()?;
                match self.tokens.get(self.pos) {
                    Some(t) if t.tok == Tok::RParen => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    Some(t) => Err(malformed("expected ')'", &t.text, t.offset)),
                    None => Err(malformed("unbalanced '('", &token.text, token.offset)),
                }
            }
            _ => Err(malformed("missing operand", &token.text, token.offset)),
        }
    }
}
