//! The parse engine
//!
//! A compiled [`Grammar`] is interpreted against an input string by walking
//! its matcher arena. All per-parse state lives in a [`ParseResult`]: the
//! node stack of rules currently being applied, the packrat memo table, the
//! last FYI error observed inside a failed repetition tail, and a row/col
//! cache for diagnostics. The grammar itself is never mutated, so one
//! grammar may serve any number of concurrent parses.
//!
//! Rule application is memoized on `(position, rule)`: a cached success
//! re-attaches its node to the current parent in O(1), a cached failure
//! returns its error in O(1). Speculative branches may attach children to
//! the node under construction; ordered choice and the `*`/`+` repetitions
//! snapshot the children length before each attempt and truncate on
//! failure.
//!
//! The same arena drives backward parsing: sequences run right to left,
//! literals and classes read the code point ending at the current position,
//! and positions decrease. After a backward parse the finished tree is
//! normalized in place so node positions express start-of-match in forward
//! coordinates.

use crate::error::ParseError;
use crate::grammar::{Grammar, Matcher, MatcherId, RuleId};
use crate::node::Node;
use hashbrown::HashMap;
use std::borrow::Cow;

/// Matching direction for the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

/// The state and outcome of one parse.
///
/// Returned by [`Grammar::parse`], [`Grammar::parse_rule`] and
/// [`Grammar::parse_backward`] on success; `tree` is then always populated.
#[derive(Debug)]
pub struct ParseResult<'a> {
    grammar: &'a Grammar,
    /// The input that was parsed.
    pub source: &'a str,
    /// The finished syntax tree.
    pub tree: Option<Node<'a>>,
    stack: Vec<Node<'a>>,
    memo: HashMap<(usize, RuleId), Result<Node<'a>, ParseError>>,
    fyi: Option<ParseError>,
    row_col: HashMap<usize, (usize, usize)>,
}

impl Grammar {
    /// Parses the input with the start rule.
    pub fn parse<'a>(&'a self, input: &'a str) -> Result<ParseResult<'a>, ParseError> {
        self.parse_rule(input, "")
    }

    /// Parses the input starting at the named rule. An empty name selects
    /// the start rule.
    pub fn parse_rule<'a>(
        &'a self,
        input: &'a str,
        rule_name: &str,
    ) -> Result<ParseResult<'a>, ParseError> {
        let rule = if rule_name.is_empty() {
            0
        } else {
            match self.index.get(rule_name) {
                Some(&id) => id,
                None => return Err(ParseError::MissingRule(rule_name.to_string())),
            }
        };
        let mut r = ParseResult::new(self, input);
        let w = r.apply(rule, 0, Direction::Forward)?;
        if w == 0 && !input.is_empty() {
            return Err(ParseError::ZeroMatch {
                fyi: r.fyi.take().map(Box::new),
            });
        }
        if w != input.len() && !self.options.ignore_unconsumed_tail {
            return Err(r.unconsumed_tail_error(w, input.len()));
        }
        if r.tree.is_none() {
            return Err(ParseError::Internal(format!(
                "no syntax tree, node stack depth {}",
                r.stack.len()
            )));
        }
        Ok(r)
    }

    /// Parses the input backwards from its end with the start rule. Intended
    /// for tail-anchored grammars; the returned tree uses forward
    /// coordinates and forward child order.
    pub fn parse_backward<'a>(&'a self, input: &'a str) -> Result<ParseResult<'a>, ParseError> {
        let mut r = ParseResult::new(self, input);
        let w = r.apply(0, input.len(), Direction::Backward)?;
        if w != input.len() && !self.options.ignore_unconsumed_tail {
            return Err(r.unconsumed_tail_error(0, input.len() - w));
        }
        match r.tree.take() {
            Some(mut tree) => {
                normalize_backward(&mut tree);
                r.tree = Some(tree);
                Ok(r)
            }
            None => Err(ParseError::Internal(format!(
                "no syntax tree, node stack depth {}",
                r.stack.len()
            ))),
        }
    }
}

impl<'a> ParseResult<'a> {
    fn new(grammar: &'a Grammar, source: &'a str) -> ParseResult<'a> {
        ParseResult {
            grammar,
            source,
            tree: None,
            stack: Vec::with_capacity(10),
            memo: HashMap::new(),
            fyi: None,
            row_col: HashMap::new(),
        }
    }

    /// The grammar this result was produced by.
    pub fn grammar(&self) -> &'a Grammar {
        self.grammar
    }

    /// Consumes the result, returning the syntax tree.
    pub fn into_tree(self) -> Option<Node<'a>> {
        self.tree
    }

    /// 1-based row and 0-based byte column of a byte position, cached.
    pub fn row_col(&mut self, pos: usize) -> (usize, usize) {
        let pos = pos.min(self.source.len());
        if let Some(&rc) = self.row_col.get(&pos) {
            return rc;
        }
        let rc = count_row_col(&self.source.as_bytes()[..pos], 1, 0);
        self.row_col.insert(pos, rc);
        rc
    }

    /// Attaches original-input slices and row/col to every node of the
    /// tree. The decomposition is deterministic: one piece before each
    /// child and one after the last, concatenating back to the input.
    pub fn compute_content(&mut self) {
        let source = self.source;
        if let Some(tree) = self.tree.as_mut() {
            compute_content_node(source, tree, 0, 1, 0);
        }
    }

    fn unconsumed_tail_error(&mut self, start: usize, end: usize) -> ParseError {
        let tail = match self.source.get(start..end) {
            Some(tail) => tail,
            None => "",
        };
        let preview = if !self.grammar.options.long_error_message && tail.len() > 13 {
            let mut cut = 10;
            while cut > 0 && !tail.is_char_boundary(cut) {
                cut -= 1;
            }
            format!("{}...", &tail[..cut])
        } else {
            tail.to_string()
        };
        let (row, col) = self.row_col(start);
        ParseError::UnconsumedTail {
            preview,
            row,
            col,
            fyi: self.fyi.take().map(Box::new),
        }
    }

    /// Applies a rule at a position, consulting the memo table first. A
    /// fresh application pushes a node for the rule, runs its matcher, then
    /// memoizes and attaches the node on success.
    fn apply(&mut self, rule: RuleId, pos: usize, dir: Direction) -> Result<usize, ParseError> {
        if let Some(cached) = self.memo.get(&(pos, rule)) {
            let cached = cached.clone();
            return match cached {
                Ok(node) => {
                    log::trace!("memo hit: {} at {} (len {})", node.label, pos, node.len);
                    let w = node.len;
                    self.attach(node);
                    Ok(w)
                }
                Err(err) => Err(err),
            };
        }
        let (label, matcher) = match self.grammar.rules.get(rule) {
            Some(ru) => (ru.name.clone(), ru.matcher),
            None => return Err(ParseError::Internal(format!("invalid rule id {}", rule))),
        };
        log::debug!("applying rule {} at {}", label, pos);
        self.stack.push(Node::new(label, pos));
        let outcome = self.run(matcher, pos, dir);
        let mut node = match self.stack.pop() {
            Some(node) => node,
            None => return Err(ParseError::Internal("node stack underflow".to_string())),
        };
        match outcome {
            Ok(w) => {
                node.len = w;
                self.memo.insert((pos, rule), Ok(node.clone()));
                self.attach(node);
                Ok(w)
            }
            Err(err) => {
                self.memo.insert((pos, rule), Err(err.clone()));
                Err(err)
            }
        }
    }

    /// Attaches a finished node to the current parent, or installs it as
    /// the root when the stack is empty. With `skip_empty_nodes`, nodes
    /// carrying no text, children or annotations are dropped (never the
    /// root).
    fn attach(&mut self, node: Node<'a>) {
        if self.grammar.options.skip_empty_nodes
            && node.text.is_empty()
            && node.children.is_empty()
            && node.annotations.is_empty()
            && node.tree_annotations.is_empty()
            && !self.stack.is_empty()
        {
            log::trace!("not attaching {}", node.label);
            return;
        }
        match self.stack.last_mut() {
            Some(top) => top.children.push(node),
            None => {
                if self.tree.is_some() {
                    log::error!("attempting to attach root node twice");
                    return;
                }
                self.tree = Some(node);
            }
        }
    }

    fn top_children_len(&self) -> Result<usize, ParseError> {
        match self.stack.last() {
            Some(top) => Ok(top.children.len()),
            None => Err(ParseError::Internal("no top node".to_string())),
        }
    }

    fn truncate_top_children(&mut self, len: usize) -> Result<(), ParseError> {
        match self.stack.last_mut() {
            Some(top) => {
                top.children.truncate(len);
                Ok(())
            }
            None => Err(ParseError::Internal("no top node".to_string())),
        }
    }

    /// Interprets one matcher at a position. Returns the number of bytes
    /// consumed (counted leftward for backward parses).
    fn run(&mut self, id: MatcherId, pos: usize, dir: Direction) -> Result<usize, ParseError> {
        let grammar = self.grammar;
        let matcher = match grammar.matchers.get(id) {
            Some(m) => m,
            None => {
                return Err(ParseError::Internal(format!("invalid matcher id {}", id)));
            }
        };
        match matcher {
            Matcher::Literal(lit) => self.match_literal(lit, pos, dir),
            Matcher::Class(cc) => self.match_class(cc, pos, dir),
            Matcher::Seq(items) => {
                let mut ww = 0;
                match dir {
                    Direction::Forward => {
                        for &item in items {
                            ww += self.run(item, pos + ww, dir)?;
                        }
                    }
                    Direction::Backward => {
                        for &item in items.iter().rev() {
                            ww += self.run(item, pos - ww, dir)?;
                        }
                    }
                }
                Ok(ww)
            }
            Matcher::Choice {
                branches,
                labels,
                display,
            } => self.match_choice(branches, labels, display, pos, dir),
            Matcher::Star(inner) => self.match_repeat(*inner, pos, dir, false),
            Matcher::Plus(inner) => self.match_repeat(*inner, pos, dir, true),
            Matcher::Question(inner) => match self.run(*inner, pos, dir) {
                Ok(w) => Ok(w),
                Err(_) => Ok(0),
            },
            Matcher::Predicate { inner, positive } => {
                let result = self.run(*inner, pos, dir);
                if *positive == result.is_ok() {
                    return Ok(0);
                }
                match result {
                    Ok(_) => Err(ParseError::NegativePredicate),
                    Err(err) => Err(err),
                }
            }
            Matcher::Capture(inner) => {
                let w = self.run(*inner, pos, dir)?;
                let (start, end) = match dir {
                    Direction::Forward => (pos, pos + w),
                    Direction::Backward => (pos - w, pos),
                };
                let captured = &self.source[start..end];
                match self.stack.last_mut() {
                    Some(top) => {
                        top.text = Cow::Borrowed(captured);
                        Ok(w)
                    }
                    None => Err(ParseError::Internal(
                        "cannot handle capture without a top node".to_string(),
                    )),
                }
            }
            Matcher::Rule(rule) => self.apply(*rule, pos, dir),
        }
    }

    fn match_literal(&self, lit: &str, pos: usize, dir: Direction) -> Result<usize, ParseError> {
        let bytes = self.source.as_bytes();
        match dir {
            Direction::Forward => {
                if self.source.len() - pos < lit.len()
                    || &bytes[pos..pos + lit.len()] != lit.as_bytes()
                {
                    return Err(ParseError::Literal {
                        expected: lit.to_string(),
                        found: self.source[pos..]
                            .chars()
                            .take(lit.chars().count().max(1))
                            .collect(),
                    });
                }
            }
            Direction::Backward => {
                if pos < lit.len() || &bytes[pos - lit.len()..pos] != lit.as_bytes() {
                    let found: String = self.source[..pos].chars().rev().take(lit.chars().count().max(1)).collect();
                    return Err(ParseError::Literal {
                        expected: lit.to_string(),
                        found: found.chars().rev().collect(),
                    });
                }
            }
        }
        Ok(lit.len())
    }

    fn match_class(&self, cc: &crate::char_class::CharClass, pos: usize, dir: Direction) -> Result<usize, ParseError> {
        let c = match dir {
            Direction::Forward => self.source[pos..].chars().next(),
            Direction::Backward => self.source[..pos].chars().next_back(),
        };
        let c = match c {
            Some(c) => c,
            None => return Err(ParseError::Eof { pos }),
        };
        if cc.matches(c) {
            Ok(c.len_utf8())
        } else {
            Err(ParseError::Class {
                found: c,
                class: cc.to_string(),
            })
        }
    }

    /// Ordered choice: try alternatives left to right, rolling back children
    /// accumulated by a failing branch before each retry. On complete
    /// failure, consolidates the per-branch errors.
    fn match_choice(
        &mut self,
        branches: &[MatcherId],
        labels: &[String],
        display: &str,
        pos: usize,
        dir: Direction,
    ) -> Result<usize, ParseError> {
        let save = self.top_children_len()?;
        let mut details = Vec::new();
        for (i, &branch) in branches.iter().enumerate() {
            if i > 0 {
                self.truncate_top_children(save)?;
            }
            match self.run(branch, pos, dir) {
                Ok(w) => return Ok(w),
                Err(err) => details.push((labels.get(i).cloned().unwrap_or_default(), err)),
            }
        }
        Err(ParseError::Choice {
            display: display.to_string(),
            branches: details,
            fyi: self.fyi.clone().map(Box::new),
        })
    }

    /// Greedy repetition. Each iteration must consume at least one byte;
    /// children appended by the final failing iteration are rolled back.
    /// With `require_first`, the first match is mandatory (`+`).
    fn match_repeat(
        &mut self,
        inner: MatcherId,
        pos: usize,
        dir: Direction,
        require_first: bool,
    ) -> Result<usize, ParseError> {
        let mut ww = 0;
        if require_first {
            ww = self.run(inner, pos, dir)?;
        }
        let mut save = self.top_children_len()?;
        loop {
            let next = match dir {
                Direction::Forward => pos + ww,
                Direction::Backward => pos - ww,
            };
            match self.run(inner, next, dir) {
                Ok(w) if w > 0 => {
                    ww += w;
                    save = self.top_children_len()?;
                }
                Ok(_) => break,
                Err(err) => {
                    if ww == 0 {
                        log::trace!("repetition matched nothing: {}", err);
                        self.fyi = Some(err);
                    }
                    break;
                }
            }
        }
        self.truncate_top_children(save)?;
        Ok(ww)
    }
}

/// Counts rows and byte columns over a byte slice, starting from the given
/// pair. A newline advances the row and resets the column.
fn count_row_col(s: &[u8], mut row: usize, mut col: usize) -> (usize, usize) {
    for &b in s {
        if b == b'\n' {
            row += 1;
            col = 0;
        } else {
            col += 1;
        }
    }
    (row, col)
}

/// Depth-first content/row/col computation. `pos` is where the previous
/// piece ended; returns the updated (row, col) pair.
fn compute_content_node<'a>(
    source: &'a str,
    node: &mut Node<'a>,
    pos: usize,
    row: usize,
    col: usize,
) -> (usize, usize) {
    let (mut row, mut col) = count_row_col(&source.as_bytes()[pos..node.pos], row, col);
    let mut pos = node.pos;
    node.row = row;
    node.col = col;
    node.content.clear();
    let end = node.pos + node.len;
    for ch in &mut node.children {
        let piece = &source[pos..ch.pos];
        let rc = count_row_col(piece.as_bytes(), row, col);
        row = rc.0;
        col = rc.1;
        node.content.push(Cow::Borrowed(piece));
        let rc = compute_content_node(source, ch, ch.pos, row, col);
        row = rc.0;
        col = rc.1;
        pos = ch.pos + ch.len;
    }
    let piece = &source[pos..end];
    let rc = count_row_col(piece.as_bytes(), row, col);
    node.content.push(Cow::Borrowed(piece));
    rc
}

/// Rewrites a backward-parsed tree into forward coordinates: positions
/// become start-of-match and children regain input order.
fn normalize_backward(node: &mut Node<'_>) {
    node.pos -= node.len;
    for ch in &mut node.children {
        normalize_backward(ch);
    }
    node.children.reverse();
}
