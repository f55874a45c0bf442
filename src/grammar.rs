//! Grammar model and compilation
//!
//! This module defines the in-memory representation of a parsed PEG grammar
//! and compiles it into the matcher arena the engine interprets.
//!
//! A [`Grammar`] owns its [`Rule`]s in definition order (the first rule is
//! the start rule) plus a name index. A rule's body is an [`Rhs`]: an
//! ordered list of alternatives, each an ordered list of [`Term`]s. Terms
//! are a sum type; postfix `*`, `?`, `+` appear as [`Special`] wrappers
//! around their operand, and `.` is represented as an any-matching
//! character class.
//!
//! Compilation happens once, in two passes: rule names are indexed first,
//! then every right-hand side is flattened into [`Matcher`] records stored
//! in one arena, with rule references resolved to indices. Compiled
//! grammars are immutable and can be shared by any number of concurrent
//! parses.

use crate::bootstrap;
use crate::char_class::CharClass;
use crate::error::GrammarError;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a rule within its grammar.
pub type RuleId = usize;

/// Index of a compiled matcher within the grammar's arena.
pub(crate) type MatcherId = usize;

/// Parser behavior switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserOptions {
    /// Treat unconsumed tail content as acceptable instead of an error.
    pub ignore_unconsumed_tail: bool,
    /// Drop nodes with no captured text, children or annotations from the
    /// tree (the root is always kept).
    pub skip_empty_nodes: bool,
    /// Include the full unconsumed content in error messages instead of a
    /// truncated preview.
    pub long_error_message: bool,
}

impl ParserOptions {
    /// Options with every switch off.
    pub fn new() -> ParserOptions {
        ParserOptions::default()
    }

    /// Sets `ignore_unconsumed_tail`.
    pub fn with_ignore_unconsumed_tail(mut self, value: bool) -> ParserOptions {
        self.ignore_unconsumed_tail = value;
        self
    }

    /// Sets `skip_empty_nodes`.
    pub fn with_skip_empty_nodes(mut self, value: bool) -> ParserOptions {
        self.skip_empty_nodes = value;
        self
    }

    /// Sets `long_error_message`.
    pub fn with_long_error_message(mut self, value: bool) -> ParserOptions {
        self.long_error_message = value;
        self
    }
}

/// The right-hand side of a rule or the contents of a parenthesized or
/// captured expression: alternatives of term sequences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rhs {
    /// Ordered choice over ordered term sequences.
    pub choices: Vec<Vec<Term>>,
}

impl Rhs {
    /// A right-hand side with a single alternative.
    pub fn single(terms: Vec<Term>) -> Rhs {
        Rhs {
            choices: vec![terms],
        }
    }
}

/// One term of a rule body. Exactly one variant per term; postfix operators
/// wrap their operand and `.` is an any-matching class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Term {
    /// A parenthesized sub-expression.
    Parens(Rhs),
    /// A negative predicate `!X`.
    NegPred(Box<Term>),
    /// A positive predicate `&X`.
    Pred(Box<Term>),
    /// A postfix repetition or option.
    Special(Special),
    /// A capture region `<RHS>`.
    Capture(Rhs),
    /// A character class.
    Class(CharClass),
    /// A literal string, match verbatim.
    Literal(String),
    /// A reference to a rule by name.
    Reference(String),
}

/// A term under a postfix `*`, `?` or `+` operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Special {
    /// The operand.
    pub term: Box<Term>,
    /// One of `*`, `?`, `+`.
    pub op: char,
}

impl fmt::Display for Rhs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups: Vec<String> = self.choices.iter().map(|g| group_to_string(g)).collect();
        write!(f, "{}", groups.join(" / "))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Parens(rhs) => write!(f, "({})", rhs),
            Term::NegPred(t) => write!(f, "!{}", t),
            Term::Pred(t) => write!(f, "&{}", t),
            Term::Special(s) => write!(f, "{}", s),
            Term::Capture(rhs) => write!(f, "<{}>", rhs),
            Term::Class(cc) => write!(f, "[{}]", cc),
            Term::Literal(s) => write!(f, "{:?}", s),
            Term::Reference(name) => write!(f, "{}", name),
        }
    }
}

impl fmt::Display for Special {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.term, self.op)
    }
}

/// Renders one term sequence the way it appears in grammar source.
pub(crate) fn group_to_string(terms: &[Term]) -> String {
    let parts: Vec<String> = terms.iter().map(|t| t.to_string()).collect();
    parts.join(" ")
}

/// One PEG rule: `name <- rhs`.
#[derive(Debug, Clone)]
pub struct Rule {
    /// The rule name from the left-hand side.
    pub name: String,
    /// The rule body.
    pub rhs: Rhs,
    /// The compiled entry point for this rule's body.
    pub(crate) matcher: MatcherId,
}

/// A compiled matcher record. Composite matchers reference their parts by
/// arena index; rule references resolve to rule indices.
#[derive(Debug, Clone)]
pub(crate) enum Matcher {
    Literal(String),
    Class(CharClass),
    Seq(Vec<MatcherId>),
    Choice {
        branches: Vec<MatcherId>,
        labels: Vec<String>,
        display: String,
    },
    Star(MatcherId),
    Plus(MatcherId),
    Question(MatcherId),
    Predicate {
        inner: MatcherId,
        positive: bool,
    },
    Capture(MatcherId),
    Rule(RuleId),
}

/// A compiled parsing expression grammar.
#[derive(Debug, Clone)]
pub struct Grammar {
    pub(crate) rules: Vec<Rule>,
    pub(crate) index: HashMap<String, RuleId>,
    pub(crate) matchers: Vec<Matcher>,
    source: String,
    /// The options this grammar parses with.
    pub options: ParserOptions,
}

impl Grammar {
    /// Parses PEG grammar source into a compiled grammar.
    pub fn new(source: &str, options: ParserOptions) -> Result<Grammar, GrammarError> {
        bootstrap::grammar_from_source(source, options)
    }

    /// The grammar source text this grammar was built from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Rule names in definition order; the first is the start rule.
    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.name.as_str())
    }

    /// Looks up a rule by name.
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.index.get(name).and_then(|&id| self.rules.get(id))
    }

    /// Number of rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Compiles a list of named rule bodies into a grammar. Rule references
    /// may be mutually recursive: names are indexed before any body is
    /// compiled.
    pub(crate) fn compile(
        defs: Vec<(String, Rhs)>,
        source: String,
        options: ParserOptions,
    ) -> Result<Grammar, GrammarError> {
        if defs.is_empty() {
            return Err(GrammarError::EmptyGrammar);
        }
        let mut index = HashMap::with_capacity(defs.len());
        for (id, (name, _)) in defs.iter().enumerate() {
            if index.insert(name.clone(), id).is_some() {
                return Err(GrammarError::DuplicateRule(name.clone()));
            }
        }
        let mut grammar = Grammar {
            rules: Vec::new(),
            index,
            matchers: Vec::new(),
            source,
            options,
        };
        let mut rules = Vec::with_capacity(defs.len());
        for (name, rhs) in defs {
            let matcher = grammar.compile_rhs(&rhs)?;
            rules.push(Rule { name, rhs, matcher });
        }
        grammar.rules = rules;
        Ok(grammar)
    }

    fn push(&mut self, matcher: Matcher) -> MatcherId {
        self.matchers.push(matcher);
        self.matchers.len() - 1
    }

    fn compile_rhs(&mut self, rhs: &Rhs) -> Result<MatcherId, GrammarError> {
        if rhs.choices.len() == 1 {
            return self.compile_group(&rhs.choices[0]);
        }
        let mut branches = Vec::with_capacity(rhs.choices.len());
        let mut labels = Vec::with_capacity(rhs.choices.len());
        for terms in &rhs.choices {
            branches.push(self.compile_group(terms)?);
            labels.push(group_to_string(terms));
        }
        Ok(self.push(Matcher::Choice {
            branches,
            labels,
            display: rhs.to_string(),
        }))
    }

    fn compile_group(&mut self, terms: &[Term]) -> Result<MatcherId, GrammarError> {
        if terms.len() == 1 {
            return self.compile_term(&terms[0]);
        }
        let mut items = Vec::with_capacity(terms.len());
        for term in terms {
            items.push(self.compile_term(term)?);
        }
        Ok(self.push(Matcher::Seq(items)))
    }

    fn compile_term(&mut self, term: &Term) -> Result<MatcherId, GrammarError> {
        match term {
            Term::Parens(rhs) => self.compile_rhs(rhs),
            Term::NegPred(inner) => {
                let inner = self.compile_term(inner)?;
                Ok(self.push(Matcher::Predicate {
                    inner,
                    positive: false,
                }))
            }
            Term::Pred(inner) => {
                let inner = self.compile_term(inner)?;
                Ok(self.push(Matcher::Predicate {
                    inner,
                    positive: true,
                }))
            }
            Term::Special(special) => {
                let inner = self.compile_term(&special.term)?;
                match special.op {
                    '*' => Ok(self.push(Matcher::Star(inner))),
                    '?' => Ok(self.push(Matcher::Question(inner))),
                    '+' => Ok(self.push(Matcher::Plus(inner))),
                    other => Err(GrammarError::Internal(format!(
                        "invalid special operator {:?}",
                        other
                    ))),
                }
            }
            Term::Capture(rhs) => {
                let inner = self.compile_rhs(rhs)?;
                Ok(self.push(Matcher::Capture(inner)))
            }
            Term::Class(cc) => Ok(self.push(Matcher::Class(cc.clone()))),
            Term::Literal(s) => Ok(self.push(Matcher::Literal(s.clone()))),
            Term::Reference(name) => match self.index.get(name) {
                Some(&id) => Ok(self.push(Matcher::Rule(id))),
                None => Err(GrammarError::UnknownRule(name.clone())),
            },
        }
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            writeln!(f, "{} <- {}", rule.name, rule.rhs)?;
        }
        Ok(())
    }
}
