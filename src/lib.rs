//! pegtree — a PEG parser engine producing labelled syntax trees
//!
//! A grammar written in PEG notation compiles into an interpretive parser
//! with packrat memoization. Parsing an input yields a tree of labelled
//! [`Node`]s, one per successful rule application, with `<...>` capture
//! regions recording the matched text. The same compiled grammar can also
//! parse backwards from the end of the input, for tail-anchored grammars.
//!
//! ```
//! use pegtree::{Grammar, ParserOptions};
//!
//! let grammar = Grammar::new(
//!     "Greeting <- <[a-z]+> ', ' <[a-z]+> '!'",
//!     ParserOptions::new(),
//! )
//! .unwrap();
//!
//! let result = grammar.parse("hello, world!").unwrap();
//! let tree = result.tree.unwrap();
//! assert_eq!(tree.label, "Greeting");
//! assert_eq!(tree.text, "world");
//! ```
//!
//! Beyond parsing, the crate provides:
//!
//! - a content annotator ([`ParseResult::compute_content`]) that attaches
//!   original-input slices and row/column to every node, losslessly enough
//!   to reconstruct the input from the tree;
//! - a semantic constructor ([`construct`]) that converts syntax trees to
//!   typed domain values through a callback and a typed accessor;
//! - a tree serialization format and extractor ([`tree`]) used heavily in
//!   tests;
//! - batch parsing over a thread pool ([`parallel`]).
//!
//! # Options
//!
//! [`ParserOptions`] tunes a grammar at build time:
//! `skip_empty_nodes` keeps trees terse by dropping nodes that captured
//! nothing, `ignore_unconsumed_tail` accepts prefix matches, and
//! `long_error_message` disables error-preview truncation.
//!
//! # Concurrency
//!
//! A compiled [`Grammar`] is immutable; concurrent parses each own their
//! [`ParseResult`] (node stack, memo table, row/col cache) and share the
//! grammar read-only.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(clippy::all)]

mod bootstrap;
pub mod char_class;
pub mod construct;
pub mod error;
pub mod grammar;
pub mod node;
pub mod parallel;
pub mod parser;
pub mod tree;

pub use char_class::{CharClass, ClassError, SpecialClass};
pub use construct::{construct, Accessor, AccessorOptions, ConstructError, Value};
pub use error::{GrammarError, ParseError};
pub use grammar::{Grammar, ParserOptions, Rhs, Rule, Special, Term};
pub use node::Node;
pub use parser::ParseResult;
