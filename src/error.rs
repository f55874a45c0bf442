//! Error types for grammar construction and parsing
//!
//! Errors come in two layers: [`GrammarError`] covers everything that can go
//! wrong while turning grammar source into a compiled grammar, and
//! [`ParseError`] covers failures while matching input against a compiled
//! grammar. Semantic-construction failures have their own type,
//! [`ConstructError`](crate::construct::ConstructError), which surfaces
//! through [`GrammarError::Construct`] on the bootstrap path.
//!
//! Parse errors are `Clone` because the packrat memo table caches failures:
//! a second attempt to apply the same rule at the same position returns the
//! cached error in O(1).

use crate::char_class::ClassError;
use crate::construct::ConstructError;
use std::fmt;

/// An error produced while matching input against a grammar.
#[derive(Debug, Clone)]
pub enum ParseError {
    /// End of input where a character was required.
    Eof {
        /// Byte position of the attempt.
        pos: usize,
    },

    /// A literal string did not match.
    Literal {
        /// The literal the grammar expected.
        expected: String,
        /// What the input held instead.
        found: String,
    },

    /// A character-class match failed.
    Class {
        /// The character at the match position.
        found: char,
        /// Canonical form of the class that rejected it.
        class: String,
    },

    /// A negative predicate's operand matched.
    NegativePredicate,

    /// Every alternative of an ordered choice failed.
    Choice {
        /// Display form of the right-hand side that failed.
        display: String,
        /// Per-branch failures, in try order.
        branches: Vec<(String, ParseError)>,
        /// Last observation from inside a failed `*`/`+` tail, if any.
        fyi: Option<Box<ParseError>>,
    },

    /// The top rule matched zero bytes of a non-empty input.
    ZeroMatch {
        /// Last observation from inside a failed `*`/`+` tail, if any.
        fyi: Option<Box<ParseError>>,
    },

    /// The top rule succeeded but left input unconsumed.
    UnconsumedTail {
        /// The unconsumed input, possibly truncated.
        preview: String,
        /// 1-based row of the first unconsumed byte.
        row: usize,
        /// 0-based byte column of the first unconsumed byte.
        col: usize,
        /// Last observation from inside a failed `*`/`+` tail, if any.
        fyi: Option<Box<ParseError>>,
    },

    /// `parse_rule` was given a rule name the grammar does not define.
    MissingRule(String),

    /// Invariant violation inside the engine.
    Internal(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Eof { pos } => write!(f, "expecting a char, got EOF at {}", pos),
            ParseError::Literal { expected, found } => {
                write!(f, "expecting literal {:?}, got {:?}", expected, found)
            }
            ParseError::Class { found, class } => {
                write!(f, "character {:?} does not match class {:?}", found, class)
            }
            ParseError::NegativePredicate => write!(f, "negative predicate matched"),
            ParseError::Choice {
                display,
                branches,
                fyi,
            } => {
                writeln!(f, "rhs {} did not apply:{{", display)?;
                for (label, err) in branches {
                    writeln!(f, "{}: {}", label, err)?;
                }
                if let Some(fyi) = fyi {
                    let indented = fyi.to_string().replace('\n', "\n  ");
                    writeln!(f, "Previous fyi error: {}", indented)?;
                }
                write!(f, "}}")
            }
            ParseError::ZeroMatch { fyi } => {
                write!(f, "grammar matched 0 characters")?;
                if let Some(fyi) = fyi {
                    write!(f, ": {}", fyi)?;
                }
                Ok(())
            }
            ParseError::UnconsumedTail {
                preview,
                row,
                col,
                fyi,
            } => {
                write!(
                    f,
                    "{}:{}: some characters remain unconsumed: {:?}",
                    row, col, preview
                )?;
                if let Some(fyi) = fyi {
                    write!(f, "\nPrevious error: {}", fyi)?;
                }
                Ok(())
            }
            ParseError::MissingRule(name) => write!(f, "missing rule {}", name),
            ParseError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for ParseError {}

/// An error produced while building a grammar from PEG source or from a
/// programmatic rule set.
#[derive(Debug)]
pub enum GrammarError {
    /// The grammar source text did not parse.
    Parse(ParseError),

    /// The grammar syntax tree could not be converted to the model.
    Construct(ConstructError),

    /// Two rules share a name.
    DuplicateRule(String),

    /// A rule body references a rule that is never defined.
    UnknownRule(String),

    /// The grammar defines no rules at all.
    EmptyGrammar,

    /// A character-class expression was invalid.
    Class(ClassError),

    /// Invariant violation inside the compiler.
    Internal(String),
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarError::Parse(err) => write!(f, "could not parse grammar source: {}", err),
            GrammarError::Construct(err) => {
                write!(f, "error constructing semantic tree: {}", err)
            }
            GrammarError::DuplicateRule(name) => write!(f, "rule {} is duplicated", name),
            GrammarError::UnknownRule(name) => write!(f, "unknown rule: {}", name),
            GrammarError::EmptyGrammar => write!(f, "grammar must have at least one rule"),
            GrammarError::Class(err) => write!(f, "{}", err),
            GrammarError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for GrammarError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GrammarError::Parse(err) => Some(err),
            GrammarError::Construct(err) => Some(err),
            GrammarError::Class(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ClassError> for GrammarError {
    fn from(err: ClassError) -> Self {
        GrammarError::Class(err)
    }
}
