//! End-to-end scenario: scanning C-style include directives
//!
//! A realistic grammar drives the whole pipeline: parse preprocessor-ish
//! input, annotate content for line numbers, and build a typed domain model
//! through the semantic constructor. The same converter also runs over
//! deserialized trees, which carry no position information.

use pegtree::{
    construct, tree, Accessor, AccessorOptions, ConstructError, Grammar, ParserOptions, Value,
};

const GRAMMAR_SOURCE: &str = r#"
Source <- (IncludeBlock / Using / Line)+
IncludeBlock <- Include+
Include <- '#include' [ \t]* QuoteOpen <(![>"\n] .)+> QuoteClose [ \t]* "\n"
QuoteOpen <- <[<"]>
QuoteClose <- [>"]
Using <- 'using' [ \t]* <(![;\n] .)+> ';' [ \t]* "\n"
Line <- (![\n] .)* "\n"
"#;

#[derive(Debug, Clone, PartialEq, Default)]
struct Include {
    quote_open: char,
    text: String,
    lineno: usize,
}

#[derive(Debug, Clone, PartialEq)]
struct UsingDecl {
    text: String,
    lineno: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Source {
    includes: Vec<Vec<Include>>,
    using: Vec<UsingDecl>,
}

fn callback(label: &str, ca: &mut Accessor<'_, '_>) -> Result<Option<Value>, ConstructError> {
    match label {
        "QuoteOpen" => Ok(Some(Value::str(ca.node().text.to_string()))),
        "QuoteClose" => Ok(None),
        "Include" => {
            let quote = ca.get_string("QuoteOpen")?;
            let quote_open = quote
                .chars()
                .next()
                .ok_or_else(|| ConstructError::Custom("empty quote".to_string()))?;
            Ok(Some(Value::obj(Include {
                quote_open,
                text: ca.node().text.to_string(),
                lineno: ca.node().row,
            })))
        }
        "IncludeBlock" => {
            let includes = ca.get_seq::<Include>("Include")?;
            Ok(Some(Value::obj(
                includes.iter().map(|i| (**i).clone()).collect::<Vec<_>>(),
            )))
        }
        "Using" => Ok(Some(Value::obj(UsingDecl {
            text: ca.node().text.to_string(),
            lineno: ca.node().row,
        }))),
        "Line" => Ok(None),
        "Source" => {
            let includes = ca.get_seq::<Vec<Include>>("IncludeBlock")?;
            let using = ca.get_seq::<UsingDecl>("Using")?;
            Ok(Some(Value::obj(Source {
                includes: includes.iter().map(|b| (**b).clone()).collect(),
                using: using.iter().map(|u| (**u).clone()).collect(),
            })))
        }
        other => Err(ConstructError::Custom(format!(
            "unexpected label: {}",
            other
        ))),
    }
}

fn grammar() -> Grammar {
    Grammar::new(
        GRAMMAR_SOURCE,
        ParserOptions::new().with_skip_empty_nodes(true),
    )
    .unwrap()
}

fn scan(input: &str) -> Source {
    let grammar = grammar();
    let mut result = grammar.parse(input).unwrap();
    result.compute_content();
    let tree = result.tree.as_ref().unwrap();
    let value = construct(
        tree,
        &mut callback,
        AccessorOptions {
            error_on_unused_child: true,
        },
    )
    .unwrap();
    match value {
        Some(Value::Obj(obj)) => (*obj.downcast::<Source>().unwrap()).clone(),
        other => panic!("unexpected value {:?}", other),
    }
}

const INPUT: &str = "\
// copyright
#include <stdio.h>
#include \"my.h\"

using std::string;
// done
";

#[test]
fn includes_and_using_extracted() {
    let source = scan(INPUT);
    assert_eq!(
        source.includes,
        vec![vec![
            Include {
                quote_open: '<',
                text: "stdio.h".to_string(),
                lineno: 2,
            },
            Include {
                quote_open: '"',
                text: "my.h".to_string(),
                lineno: 3,
            },
        ]]
    );
    assert_eq!(
        source.using,
        vec![UsingDecl {
            text: "std::string".to_string(),
            lineno: 5,
        }]
    );
}

#[test]
fn blank_line_splits_blocks() {
    let input = "\
#include <a.h>

#include <b.h>
#include <c.h>
";
    let source = scan(input);
    assert_eq!(source.includes.len(), 2);
    assert_eq!(source.includes[0].len(), 1);
    assert_eq!(source.includes[1].len(), 2);
    assert_eq!(source.includes[1][1].text, "c.h");
    assert_eq!(source.includes[1][1].lineno, 4);
}

#[test]
fn malformed_include_is_a_plain_line() {
    let source = scan("#include <unterminated\n#include <ok.h>\n");
    assert_eq!(source.includes.len(), 1);
    assert_eq!(source.includes[0].len(), 1);
    assert_eq!(source.includes[0][0].text, "ok.h");
}

#[test]
fn content_round_trips_and_extracts() {
    let grammar = grammar();
    let mut result = grammar.parse(INPUT).unwrap();
    result.compute_content();
    let tree = result.tree.unwrap();
    assert_eq!(tree.reconstruct_content().unwrap(), INPUT);
    assert_eq!(
        tree::extract(&tree, "IncludeBlock Include").unwrap(),
        "stdio.h"
    );
    assert_eq!(
        tree::extract(&tree, "IncludeBlock Include[1]").unwrap(),
        "my.h"
    );
    assert_eq!(
        tree::extract(&tree, "IncludeBlock Include[1] QuoteOpen").unwrap(),
        "\""
    );
    assert_eq!(tree::extract(&tree, "Using row").unwrap(), "5");
    assert_eq!(tree::extract(&tree, "IncludeBlock num").unwrap(), "1");
}

#[test]
fn converter_accepts_deserialized_trees() {
    // A serialized tree carries no positions, so line numbers come out
    // zero; everything else converts identically.
    let serialized = r#"
        (Source
            (IncludeBlock
                (Include text("stdio.h") (QuoteOpen text("<")))
                (Include text("my.h") (QuoteOpen text("\""))))
            (Using text("std::vector")))"#;
    let parsed = tree::parse(serialized).unwrap();
    let value = construct(
        &parsed,
        &mut callback,
        AccessorOptions {
            error_on_unused_child: true,
        },
    )
    .unwrap();
    let source = match value {
        Some(Value::Obj(obj)) => (*obj.downcast::<Source>().unwrap()).clone(),
        other => panic!("unexpected value {:?}", other),
    };
    assert_eq!(source.includes[0][0].text, "stdio.h");
    assert_eq!(source.includes[0][0].quote_open, '<');
    assert_eq!(source.includes[0][1].quote_open, '"');
    assert_eq!(source.includes[0][0].lineno, 0);
    assert_eq!(source.using[0].text, "std::vector");
}

#[test]
fn parses_backward_too() {
    // Include lines are anchored on both sides by their quote characters,
    // so a backward parse over pure include input yields the same tree.
    let input = "#include <a.h>\n#include \"b.h\"\n";
    let grammar = grammar();
    let forward = grammar.parse(input).unwrap().into_tree().unwrap();
    let backward = grammar.parse_backward(input).unwrap().into_tree().unwrap();
    assert_eq!(forward, backward);
}
