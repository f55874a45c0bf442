//! The uniform labelled syntax-tree element
//!
//! Every element of a parse tree is a [`Node`]: a label (the producing
//! rule's name), an optional captured text slice, byte coordinates into the
//! original input, optional row/column, ordered children, and two annotation
//! maps. The `Display` impl renders the serialization format understood by
//! [`tree::parse`](crate::tree::parse); [`Node::dump`] adds positions.
//!
//! Captured text and content pieces borrow from the parse input where
//! possible; deserialized trees own their strings.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// One element of a syntax tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node<'a> {
    /// The producing rule's name.
    pub label: String,
    /// Captured text, if the rule defines a capture region.
    pub text: Cow<'a, str>,
    /// Input decomposition computed by the content annotator. When present,
    /// `content.len() == children.len() + 1` and concatenating the pieces
    /// interleaved with the children's content reproduces the input exactly.
    pub content: Vec<Cow<'a, str>>,
    /// Byte position of the first character consumed by this node.
    pub pos: usize,
    /// Number of bytes consumed by this node.
    pub len: usize,
    /// 1-based row of the first consumed character; 0 until computed.
    pub row: usize,
    /// 0-based byte column of the first consumed character.
    pub col: usize,
    /// Child nodes, in input order.
    pub children: Vec<Node<'a>>,
    /// String-valued annotations.
    pub annotations: BTreeMap<String, String>,
    /// Subtree-valued annotations.
    pub tree_annotations: BTreeMap<String, Node<'a>>,
}

/// The content decomposition of a node is absent or inconsistent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentError(pub String);

impl fmt::Display for ContentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ContentError {}

impl<'a> Node<'a> {
    /// Creates an empty node for the given rule label at a byte position.
    pub fn new(label: impl Into<String>, pos: usize) -> Node<'a> {
        Node {
            label: label.into(),
            pos,
            ..Node::default()
        }
    }

    /// Returns the first child at index `start` or later with the label.
    pub fn first(&self, label: &str, start: usize) -> Option<&Node<'a>> {
        self.children
            .iter()
            .skip(start)
            .find(|ch| ch.label == label)
    }

    /// Returns the first child with the label.
    pub fn child(&self, label: &str) -> Option<&Node<'a>> {
        self.first(label, 0)
    }

    /// Returns every child with the label, in order.
    pub fn all(&self, label: &str) -> Vec<&Node<'a>> {
        self.children
            .iter()
            .filter(|ch| ch.label == label)
            .collect()
    }

    /// Rebuilds the exact input covered by this node from its content
    /// decomposition. Requires a prior
    /// [`compute_content`](crate::parser::ParseResult::compute_content).
    pub fn reconstruct_content(&self) -> Result<String, ContentError> {
        let mut buf = String::new();
        self.reconstruct_into(&mut buf)?;
        Ok(buf)
    }

    fn reconstruct_into(&self, buf: &mut String) -> Result<(), ContentError> {
        if self.content.is_empty() {
            return Err(ContentError(format!("empty content: Node {}", self)));
        }
        if self.content.len() != self.children.len() + 1 {
            return Err(ContentError(format!("broken content: Node {}", self.dump())));
        }
        for (piece, ch) in self.content.iter().zip(&self.children) {
            buf.push_str(piece);
            ch.reconstruct_into(buf)?;
        }
        buf.push_str(&self.content[self.children.len()]);
        Ok(())
    }

    /// Full text form including byte positions and, when computed, row/col.
    pub fn dump(&self) -> String {
        self.render("", true)
    }

    /// Serializes to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes from JSON. The resulting tree owns all of its strings.
    pub fn from_json(s: &str) -> Result<Node<'static>, serde_json::Error> {
        serde_json::from_str(s)
    }

    // Renders the node at the given indent level. Child output longer than
    // 40 characters switches the remaining children to one-per-line.
    fn render(&self, indent: &str, full: bool) -> String {
        let mut r = String::new();
        r.push('(');
        r.push_str(&self.label);
        for (k, v) in &self.annotations {
            r.push_str(&format!(" :{}({:?})", k, v));
        }
        let deeper = format!("{}  ", indent);
        for (k, v) in &self.tree_annotations {
            r.push_str(&format!(" :{}{}", k, v.render(&deeper, full)));
        }
        if !self.text.is_empty() {
            r.push_str(&format!(" {:?}", self.text));
        }
        if full {
            r.push_str(&format!(" pos({},{})", self.pos, self.len));
            if self.row != 0 {
                r.push_str(&format!(" rowcol({},{})", self.row, self.col));
            }
        }
        let mut nl = false;
        for ch in &self.children {
            let ss = ch.render(&deeper, full);
            if ss.len() > 40 {
                nl = true;
            }
            if nl {
                r.push('\n');
                r.push_str(indent);
            }
            r.push(' ');
            r.push_str(&ss);
        }
        r.push(')');
        r
    }
}

impl fmt::Display for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render("", false))
    }
}
