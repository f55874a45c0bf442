//! Batch parsing across threads
//!
//! A compiled grammar is immutable, so independent inputs can be parsed
//! concurrently, each with its own parse state. This module fans a batch of
//! inputs out over the rayon thread pool and collects one tree (with
//! content annotations) or error per input, in input order.

use crate::error::ParseError;
use crate::grammar::Grammar;
use crate::node::Node;
use rayon::prelude::*;

/// Parses every input against the grammar in parallel. Results keep the
/// input order; each successful tree has its content computed.
pub fn parse_batch<'a>(
    grammar: &'a Grammar,
    inputs: &[&'a str],
) -> Vec<Result<Node<'a>, ParseError>> {
    inputs
        .par_iter()
        .map(|input| {
            grammar.parse(input).and_then(|mut result| {
                result.compute_content();
                result
                    .into_tree()
                    .ok_or_else(|| ParseError::Internal("missing tree".to_string()))
            })
        })
        .collect()
}
