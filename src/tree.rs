//! Syntax-tree serialization and extraction
//!
//! The serialization format renders a tree as nested s-expressions:
//!
//! ```text
//! Node       ::= '(' Label ( Node | Annotation | String )* ')'
//! Label      ::= [A-Za-z_][A-Za-z0-9_]*
//! Annotation ::= ':'? Label ( '(' String ')' | Node )
//! String     ::= '"' (\" | !'"' .)* '"'
//! ```
//!
//! A bare string child sets the node's captured text, as does the reserved
//! `text("...")` annotation; `:name("...")` sets a string annotation and
//! `:name(Node)` a subtree annotation. [`parse`] reads this format with a
//! grammar compiled by the engine itself; serialization is the `Display`
//! impl of [`Node`], and [`parse`]-then-`Display` canonicalizes.
//!
//! [`extract`] evaluates a small path language over a tree, useful for
//! tests: space-separated steps `Label`, `[n]` and `Label[n]` walk the
//! tree, and an optional final `text`/`row`/`col`/`pos`/`len`/`num` picks
//! the projection (default `text`). `row` and `col` require a prior
//! [`compute_content`](crate::parser::ParseResult::compute_content).

use crate::bootstrap::unquote_literal;
use crate::error::ParseError;
use crate::grammar::{Grammar, ParserOptions};
use crate::node::Node;
use once_cell::sync::Lazy;
use std::borrow::Cow;
use std::fmt;

const TREE_GRAMMAR_SOURCE: &str = r#"
Node <- _ "(" Label (Node / Annotation / String)* _ ")" _

Label <- _ < [A-Za-z_][A-Za-z0-9_]* >
Annotation <- _ < ":"? > Label ( _ "(" String _ ")" / Node )
String <- _ < '"' ('\"' / !'"' .)* '"' >

_ <- [ \t\n]*
"#;

static TREE_GRAMMAR: Lazy<Grammar> = Lazy::new(|| {
    Grammar::new(
        TREE_GRAMMAR_SOURCE,
        ParserOptions::new().with_skip_empty_nodes(true),
    )
    .expect("tree grammar must compile")
});

/// An error from tree parsing or extraction.
#[derive(Debug)]
pub enum TreeError {
    /// The serialized text did not parse.
    Parse(ParseError),
    /// The parsed text or an extractor expression was not valid.
    Invalid(String),
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::Parse(err) => write!(f, "{}", err),
            TreeError::Invalid(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for TreeError {}

/// Parses the serialization format into a tree. The returned tree owns its
/// strings and carries no position information.
pub fn parse(input: &str) -> Result<Node<'static>, TreeError> {
    let result = TREE_GRAMMAR.parse(input).map_err(TreeError::Parse)?;
    let ast = result
        .tree
        .as_ref()
        .ok_or_else(|| TreeError::Invalid("no tree".to_string()))?;
    rewrite_node(ast)
}

/// Parses then re-serializes, yielding the canonical spelling.
pub fn pretty(input: &str) -> Result<String, TreeError> {
    Ok(parse(input)?.to_string())
}

fn rewrite_node(ast: &Node<'_>) -> Result<Node<'static>, TreeError> {
    if ast.label != "Node" {
        return Err(TreeError::Invalid(format!(
            "expecting Node, got {}",
            ast.label
        )));
    }
    let label = rewrite_label(ast)?;
    let mut node = Node::new(label, 0);
    for raw in ast.children.iter().skip(1) {
        match raw.label.as_str() {
            "String" => {
                node.text = Cow::Owned(unescape(&raw.text)?);
            }
            "Annotation" => {
                let key = rewrite_label(raw)?;
                let (value, subtree) = rewrite_value(raw)?;
                match raw.text.as_ref() {
                    "" => match key.as_str() {
                        "text" | "Text" => node.text = Cow::Owned(value),
                        _ => {
                            return Err(TreeError::Invalid(format!(
                                "unknown fixed annotation {:?}",
                                key
                            )));
                        }
                    },
                    ":" => match subtree {
                        None => {
                            node.annotations.insert(key, value);
                        }
                        Some(subtree) => {
                            node.tree_annotations.insert(key, subtree);
                        }
                    },
                    other => {
                        return Err(TreeError::Invalid(format!(
                            "annotation {} has unexpected character {:?}",
                            key, other
                        )));
                    }
                }
            }
            "Label" => {
                node.text = Cow::Owned(raw.text.to_string());
            }
            _ => node.children.push(rewrite_node(raw)?),
        }
    }
    Ok(node)
}

fn rewrite_label(ast: &Node<'_>) -> Result<String, TreeError> {
    match ast.children.first() {
        Some(first) if first.label == "Label" => Ok(first.text.to_string()),
        Some(first) => Err(TreeError::Invalid(format!(
            "expecting Label, got {}",
            first.label
        ))),
        None => Err(TreeError::Invalid(
            "expecting at least 1 child (Label), got 0".to_string(),
        )),
    }
}

fn rewrite_value(ast: &Node<'_>) -> Result<(String, Option<Node<'static>>), TreeError> {
    if ast.children.len() != 2 {
        return Err(TreeError::Invalid(format!(
            "expecting 2 children in Annotation, got {}",
            ast.children.len()
        )));
    }
    let value = &ast.children[1];
    match value.label.as_str() {
        "Node" => Ok((String::new(), Some(rewrite_node(value)?))),
        "String" => Ok((unescape(&value.text)?, None)),
        other => Err(TreeError::Invalid(format!(
            "expecting Node or String, got {}",
            other
        ))),
    }
}

/// Undoes string escaping. Quoted strings go through the standard unquote;
/// bare text takes the minimal `\n \r \t` replacements.
fn unescape(s: &str) -> Result<String, TreeError> {
    if s.starts_with('"') {
        if s.len() < 2 || !s.ends_with('"') {
            return Err(TreeError::Invalid(format!("unterminated string {:?}", s)));
        }
        return unquote_literal(s).map_err(|err| TreeError::Invalid(err.to_string()));
    }
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => break,
        }
    }
    Ok(out)
}

/// Extracts a single piece of information from a tree as a string.
///
/// The expression is a space-separated chain: `Label` selects the first
/// child with that label, `[n]` the n-th child (0-based), `Label[n]` the
/// n-th child with that label. The final step may instead be a projection:
/// `text` (captured text, the default), `pos`, `len`, `row`, `col`, or
/// `num` (the child count, or the size of the preceding label-filtered
/// list).
pub fn extract(node: &Node<'_>, expr: &str) -> Result<String, TreeError> {
    let parts: Vec<&str> = expr.split(' ').collect();
    let mut cur = node;
    let mut list: Vec<&Node<'_>> = Vec::new();
    for (index, term) in parts.iter().enumerate() {
        let last = index == parts.len() - 1;
        if let Some(open) = term.find('[') {
            let close = term[open + 1..].find(']').ok_or_else(|| {
                TreeError::Invalid(format!("unterminated '[' in term {}", term))
            })?;
            let number: i64 = term[open + 1..open + 1 + close]
                .parse()
                .map_err(|err| TreeError::Invalid(format!("could not parse term {}: {}", term, err)))?;
            if open == 0 {
                if number < 0 || number as usize >= cur.children.len() {
                    return Err(TreeError::Invalid(format!(
                        "index {} out of bounds of {} children ({})",
                        number,
                        cur.label,
                        cur.children.len()
                    )));
                }
                cur = &cur.children[number as usize];
                list.clear();
                continue;
            }
            let label = &term[..open];
            let found = cur
                .children
                .iter()
                .filter(|ch| ch.label == label)
                .nth(number.max(0) as usize);
            match (number >= 0, found) {
                (true, Some(ch)) => {
                    cur = ch;
                    list.clear();
                    continue;
                }
                _ => {
                    return Err(TreeError::Invalid(format!(
                        "could not find {}[{}] in {}",
                        label, number, cur.label
                    )));
                }
            }
        }
        if matches!(*term, "text" | "row" | "col" | "pos" | "len" | "num") {
            if !last {
                return Err(TreeError::Invalid(format!("term {} must be the last", term)));
            }
            return Ok(match *term {
                "text" => cur.text.to_string(),
                "row" => cur.row.to_string(),
                "col" => cur.col.to_string(),
                "pos" => cur.pos.to_string(),
                "len" => cur.len.to_string(),
                _ => {
                    if !list.is_empty() {
                        list.len().to_string()
                    } else {
                        cur.children.len().to_string()
                    }
                }
            });
        }
        list = cur.children.iter().filter(|ch| ch.label == *term).collect();
        if list.is_empty() {
            return Err(TreeError::Invalid(format!(
                "could not find {} in {}",
                term, cur.label
            )));
        }
        cur = list[0];
    }
    Ok(cur.text.to_string())
}
