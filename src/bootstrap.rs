//! Grammar front-end
//!
//! Parses PEG grammar source into the grammar model. The concrete syntax is
//! itself described by a PEG — the meta-grammar below — which is built
//! programmatically against the model once, compiled by the ordinary
//! engine, and then used to parse user grammars. The resulting syntax tree
//! is converted to the model through the semantic constructor, the same
//! pipeline user code gets.
//!
//! ```text
//! Grammar   <- Rule+ _
//! Rule      <- _ Ident _ '<-' RHS EndOfLine?
//! RHS       <- Terms (_ '/' Terms)*
//! Terms     <- Term+
//! Term      <- Parens / NegPred / Pred / Capture / CharClass / Literal / Ident / Special
//! Parens    <- _ '(' RHS _ ')'
//! NegPred   <- _ '!' Term
//! Pred      <- _ '&' Term
//! Capture   <- _ '<' RHS _ '>'
//! CharClass <- _ '[' <('\\' . / '[' (!']' .)* ']' / !']' .)*> ']'
//! Literal   <- _ <'"' ('\\' . / !'"' .)* '"'> / _ <"'" (!"'" .)* "'">
//! Ident     <- [\t ]* <[A-Za-z_][A-Za-z0-9_]*>
//! Special   <- _ <[*?+.]>
//! EndOfLine <- [ \t]* ('\r\n' / '\r' / '\n')
//! _         <- ([ \t\r\n] / '#' (![\r\n] .)*)*
//! ```
//!
//! Conversion reshapes the raw tree: a postfix `*`, `?` or `+` attaches to
//! the immediately preceding term (rejecting a leading postfix operator),
//! `.` becomes an any-matching character class, double-quoted literals take
//! C-style escapes while single-quoted literals stay raw, and class bodies
//! go through [`CharClass::parse`].

use crate::char_class::{parse_escape, CharClass};
use crate::construct::{construct, Accessor, AccessorOptions, ConstructError, Value};
use crate::error::GrammarError;
use crate::grammar::{Grammar, ParserOptions, Rhs, Special, Term};
use crate::node::Node;
use once_cell::sync::Lazy;
use std::rc::Rc;

/// Canonical text of the meta-grammar, kept as the compiled grammar's
/// source for diagnostics.
const META_SOURCE: &str = r#"Grammar <- Rule+ _
Rule <- _ Ident _ '<-' RHS EndOfLine?
RHS <- Terms (_ '/' Terms)*
Terms <- Term+
Term <- Parens / NegPred / Pred / Capture / CharClass / Literal / Ident / Special
Parens <- _ '(' RHS _ ')'
NegPred <- _ '!' Term
Pred <- _ '&' Term
Capture <- _ '<' RHS _ '>'
CharClass <- _ '[' <('\\' . / '[' (!']' .)* ']' / !']' .)*> ']'
Literal <- _ <'"' ('\\' . / !'"' .)* '"'> / _ <"'" (!"'" .)* "'">
Ident <- [\t ]* <[A-Za-z_][A-Za-z0-9_]*>
Special <- _ <[*?+.]>
EndOfLine <- [ \t]* ('\r\n' / '\r' / '\n')
_ <- ([ \t\r\n] / '#' (![\r\n] .)*)*
"#;

static META: Lazy<Grammar> = Lazy::new(|| {
    Grammar::compile(
        meta_rules(),
        META_SOURCE.to_string(),
        ParserOptions::new().with_skip_empty_nodes(true),
    )
    .expect("built-in meta grammar must compile")
});

// Term constructors for the hand-built meta rules.

fn lit(s: &str) -> Term {
    Term::Literal(s.to_string())
}

fn refer(name: &str) -> Term {
    Term::Reference(name.to_string())
}

fn cls(body: &str) -> Term {
    Term::Class(CharClass::parse(body).expect("built-in char class must parse"))
}

fn dot() -> Term {
    Term::Class(CharClass::any())
}

fn special(term: Term, op: char) -> Term {
    Term::Special(Special {
        term: Box::new(term),
        op,
    })
}

fn star(term: Term) -> Term {
    special(term, '*')
}

fn plus(term: Term) -> Term {
    special(term, '+')
}

fn opt(term: Term) -> Term {
    special(term, '?')
}

fn neg(term: Term) -> Term {
    Term::NegPred(Box::new(term))
}

fn group(choices: Vec<Vec<Term>>) -> Term {
    Term::Parens(Rhs { choices })
}

fn capture(terms: Vec<Term>) -> Term {
    Term::Capture(Rhs::single(terms))
}

fn meta_rules() -> Vec<(String, Rhs)> {
    let ws = || refer("_");

    // ('\\' . / '[' (!']' .)* ']' / !']' .)* — one level of bracket
    // nesting lets the named classes `[[:alpha:]]` through.
    let class_body = star(group(vec![
        vec![lit("\\"), dot()],
        vec![lit("["), star(group(vec![vec![neg(lit("]")), dot()]])), lit("]")],
        vec![neg(lit("]")), dot()],
    ]));

    let double_quoted = vec![
        ws(),
        capture(vec![
            lit("\""),
            star(group(vec![
                vec![lit("\\"), dot()],
                vec![neg(lit("\"")), dot()],
            ])),
            lit("\""),
        ]),
    ];
    let single_quoted = vec![
        ws(),
        capture(vec![
            lit("'"),
            star(group(vec![vec![neg(lit("'")), dot()]])),
            lit("'"),
        ]),
    ];

    vec![
        (
            "Grammar".to_string(),
            Rhs::single(vec![plus(refer("Rule")), ws()]),
        ),
        (
            "Rule".to_string(),
            Rhs::single(vec![
                ws(),
                refer("Ident"),
                ws(),
                lit("<-"),
                refer("RHS"),
                opt(refer("EndOfLine")),
            ]),
        ),
        (
            "RHS".to_string(),
            Rhs::single(vec![
                refer("Terms"),
                star(group(vec![vec![ws(), lit("/"), refer("Terms")]])),
            ]),
        ),
        ("Terms".to_string(), Rhs::single(vec![plus(refer("Term"))])),
        (
            "Term".to_string(),
            Rhs {
                choices: vec![
                    vec![refer("Parens")],
                    vec![refer("NegPred")],
                    vec![refer("Pred")],
                    vec![refer("Capture")],
                    vec![refer("CharClass")],
                    vec![refer("Literal")],
                    vec![refer("Ident")],
                    vec![refer("Special")],
                ],
            },
        ),
        (
            "Parens".to_string(),
            Rhs::single(vec![ws(), lit("("), refer("RHS"), ws(), lit(")")]),
        ),
        (
            "NegPred".to_string(),
            Rhs::single(vec![ws(), lit("!"), refer("Term")]),
        ),
        (
            "Pred".to_string(),
            Rhs::single(vec![ws(), lit("&"), refer("Term")]),
        ),
        (
            "Capture".to_string(),
            Rhs::single(vec![ws(), lit("<"), refer("RHS"), ws(), lit(">")]),
        ),
        (
            "CharClass".to_string(),
            Rhs::single(vec![ws(), lit("["), capture(vec![class_body]), lit("]")]),
        ),
        (
            "Literal".to_string(),
            Rhs {
                choices: vec![double_quoted, single_quoted],
            },
        ),
        (
            "Ident".to_string(),
            Rhs::single(vec![
                star(cls("\t ")),
                capture(vec![cls("A-Za-z_"), star(cls("A-Za-z0-9_"))]),
            ]),
        ),
        (
            "Special".to_string(),
            Rhs::single(vec![ws(), capture(vec![cls("*?+.")])]),
        ),
        (
            "EndOfLine".to_string(),
            Rhs::single(vec![
                star(cls(" \t")),
                group(vec![vec![lit("\r\n")], vec![lit("\r")], vec![lit("\n")]]),
            ]),
        ),
        (
            "_".to_string(),
            Rhs::single(vec![star(group(vec![
                vec![cls(" \t\r\n")],
                vec![lit("#"), star(group(vec![vec![neg(cls("\r\n")), dot()]]))],
            ]))]),
        ),
    ]
}

/// A term as first produced by the conversion callback: either finished, or
/// a postfix operator still waiting for its operand.
#[derive(Debug, Clone)]
enum RawTerm {
    Done(Term),
    Postfix(char),
}

#[derive(Debug, Clone)]
struct RuleDef {
    name: String,
    rhs: Rhs,
}

#[derive(Debug, Clone)]
struct GrammarDef {
    rules: Vec<RuleDef>,
}

/// Parses grammar source and compiles it with the given options.
pub(crate) fn grammar_from_source(
    source: &str,
    options: ParserOptions,
) -> Result<Grammar, GrammarError> {
    let result = META.parse(source).map_err(GrammarError::Parse)?;
    let tree = result
        .tree
        .as_ref()
        .ok_or_else(|| GrammarError::Internal("no grammar syntax tree".to_string()))?;
    let def = convert(tree).map_err(GrammarError::Construct)?;
    let defs = def
        .rules
        .into_iter()
        .map(|rule| (rule.name, rule.rhs))
        .collect();
    Grammar::compile(defs, source.to_string(), options)
}

/// Converts the syntax tree of a grammar into the semantic grammar model.
fn convert(tree: &Node<'_>) -> Result<GrammarDef, ConstructError> {
    let value = construct(
        tree,
        &mut callback,
        AccessorOptions {
            error_on_unused_child: true,
        },
    )?;
    match value {
        Some(Value::Obj(obj)) => match obj.downcast::<GrammarDef>() {
            Ok(def) => Ok((*def).clone()),
            Err(_) => Err(ConstructError::Custom(
                "could not convert value to a grammar".to_string(),
            )),
        },
        _ => Err(ConstructError::Custom(
            "grammar conversion produced no value".to_string(),
        )),
    }
}

fn callback(label: &str, ca: &mut Accessor<'_, '_>) -> Result<Option<Value>, ConstructError> {
    match label {
        "Grammar" => {
            let rules = ca.get_seq::<RuleDef>("Rule")?;
            Ok(Some(Value::obj(GrammarDef {
                rules: rules.iter().map(|r| (**r).clone()).collect(),
            })))
        }
        "Rule" => {
            let name = ca.get_string("Ident")?;
            let rhs = (*ca.get_obj::<Rhs>("RHS")?).clone();
            Ok(Some(Value::obj(RuleDef { name, rhs })))
        }
        "RHS" => {
            let groups = ca.get_seq::<Vec<Term>>("Terms")?;
            Ok(Some(Value::obj(Rhs {
                choices: groups.iter().map(|g| (**g).clone()).collect(),
            })))
        }
        "Terms" => {
            // Attach the postfix specials *?+ to their preceding term.
            let raw = ca.get_seq::<RawTerm>("Term")?;
            let mut terms: Vec<Term> = Vec::with_capacity(raw.len());
            for item in raw {
                match &*item {
                    RawTerm::Done(term) => terms.push(term.clone()),
                    RawTerm::Postfix(op) => {
                        let prev = terms.pop().ok_or_else(|| {
                            ConstructError::Custom(format!(
                                "special character {:?} cannot be first in the rule",
                                op
                            ))
                        })?;
                        terms.push(special(prev, *op));
                    }
                }
            }
            Ok(Some(Value::obj(terms)))
        }
        "Term" => {
            let which = ca.child(0);
            let raw = match which {
                "Parens" => RawTerm::Done(Term::Parens((*ca.get_obj::<Rhs>("Parens")?).clone())),
                "NegPred" => {
                    let inner = finished_term(&ca.get_obj::<RawTerm>("NegPred")?)?;
                    RawTerm::Done(Term::NegPred(Box::new(inner)))
                }
                "Pred" => {
                    let inner = finished_term(&ca.get_obj::<RawTerm>("Pred")?)?;
                    RawTerm::Done(Term::Pred(Box::new(inner)))
                }
                "Capture" => {
                    RawTerm::Done(Term::Capture((*ca.get_obj::<Rhs>("Capture")?).clone()))
                }
                "CharClass" => {
                    RawTerm::Done(Term::Class((*ca.get_obj::<CharClass>("CharClass")?).clone()))
                }
                "Literal" => {
                    let raw = ca.get_string("Literal")?;
                    RawTerm::Done(Term::Literal(unquote_literal(&raw)?))
                }
                "Ident" => RawTerm::Done(Term::Reference(ca.get_string("Ident")?)),
                "Special" => {
                    let text = ca.get_string("Special")?;
                    let op = text.chars().next().ok_or_else(|| {
                        ConstructError::Custom("empty special term".to_string())
                    })?;
                    if op == '.' {
                        RawTerm::Done(Term::Class(CharClass::any()))
                    } else {
                        RawTerm::Postfix(op)
                    }
                }
                other => {
                    return Err(ConstructError::Custom(format!(
                        "unexpected term child: {:?}",
                        other
                    )));
                }
            };
            Ok(Some(Value::obj(raw)))
        }
        "Parens" | "Capture" => Ok(Some(ca.get("RHS")?)),
        "NegPred" | "Pred" => Ok(Some(ca.get("Term")?)),
        "Literal" | "Ident" | "Special" => Ok(Some(Value::str(ca.node().text.to_string()))),
        "CharClass" => match CharClass::parse(&ca.node().text) {
            Ok(cc) => Ok(Some(Value::obj(cc))),
            Err(err) => Err(ConstructError::Custom(format!(
                "error parsing char class: {}",
                err
            ))),
        },
        "EndOfLine" | "_" => Ok(None),
        other => Err(ConstructError::Custom(format!(
            "unexpected label: {}",
            other
        ))),
    }
}

fn finished_term(raw: &Rc<RawTerm>) -> Result<Term, ConstructError> {
    match &**raw {
        RawTerm::Done(term) => Ok(term.clone()),
        RawTerm::Postfix(op) => Err(ConstructError::Custom(format!(
            "special character {:?} cannot be a predicate operand",
            op
        ))),
    }
}

/// Strips the quotes from a raw literal token. Double-quoted literals take
/// the standard escapes; single-quoted literals are verbatim.
pub(crate) fn unquote_literal(raw: &str) -> Result<String, ConstructError> {
    if raw.len() < 2 {
        return Err(ConstructError::Custom(format!(
            "invalid literal token: {:?}",
            raw
        )));
    }
    let body = &raw[1..raw.len() - 1];
    if raw.starts_with('\'') {
        return Ok(body.to_string());
    }
    let mut out = String::with_capacity(body.len());
    let mut pos = 0;
    while pos < body.len() {
        let Some(c) = body[pos..].chars().next() else {
            break;
        };
        if c == '\\' {
            let (value, used) = parse_escape(&body[pos + 1..])
                .map_err(|err| ConstructError::Custom(err.to_string()))?;
            out.push(value);
            pos += 1 + used;
        } else {
            out.push(c);
            pos += c.len_utf8();
        }
    }
    Ok(out)
}
