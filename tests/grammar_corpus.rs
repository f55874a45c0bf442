//! Grammar acceptance corpus
//!
//! Table-driven end-to-end coverage: invalid grammars that must be
//! rejected at build time, valid grammars with accept/reject inputs, and
//! capture grammars with expected root captures. Every accepted input also
//! round-trips through the content annotator back to the original text.

use pegtree::{Grammar, ParserOptions};

const INVALID: &[&str] = &[
    "Ident <- abc <- xyz",
    "#abc",
    "abc <- '",
    "abc <- \"",
    "I <- ?",
    "I <- *",
    "I <- (",
    "I <- )",
    "I <- )(",
    "I <- ('abc'",
    "I <- ( 'abc' ()",
    "I <- ( 'abc' ('x')",
    "A <- B",
    "A <- B \n B <- C",
    "I <- \\x",
    "I <- [z-a]",
    "I <- [a-a]",
    "I <- &",
    "I <- !",
    "",
];

#[test]
fn invalid_grammars_rejected() {
    for source in INVALID {
        assert!(
            Grammar::new(source, ParserOptions::new()).is_err(),
            "grammar {:?} unexpectedly accepted",
            source
        );
    }
}

struct Positive {
    grammar: &'static str,
    outcomes: &'static [(&'static str, bool)],
}

const POSITIVE: &[Positive] = &[
    Positive {
        grammar: "Space1 <- ' '",
        outcomes: &[(" ", true), ("", false), ("  ", false), ("x", false)],
    },
    Positive {
        grammar: "Space3 <- '  '",
        outcomes: &[
            (" ", false),
            ("  ", true),
            ("   ", false),
            ("", false),
            ("x", false),
        ],
    },
    Positive {
        grammar: "Any1 <- . +",
        outcomes: &[
            ("", false),
            (" ", true),
            ("  ", true),
            ("x", true),
            ("xyz\n abc \n efg\n", true),
        ],
    },
    Positive {
        grammar: "Any2 <- . *",
        outcomes: &[
            ("", true),
            (" ", true),
            ("   ", true),
            ("x", true),
            ("xyz\n abc \n efg\n", true),
        ],
    },
    Positive {
        grammar: "Newline1 <- \"\\n\"",
        outcomes: &[
            ("", false),
            (" ", false),
            ("\n", true),
            ("\n\n", false),
            ("xyz\n abc \n efg\n", false),
        ],
    },
    Positive {
        grammar: "Newline2 <- [\\n]",
        outcomes: &[("", false), (" ", false), ("\n", true), ("\n\n", false)],
    },
    Positive {
        // Single quotes are raw: this matches a backslash then an 'n'.
        grammar: "Newline3 <- '\\n'",
        outcomes: &[("", false), ("\n", false), ("\\n", true)],
    },
    Positive {
        grammar: "Tab1 <- \"\\t\"",
        outcomes: &[
            ("", false),
            (" ", false),
            ("\t", true),
            ("\t\t", false),
            ("\txyz", false),
        ],
    },
    Positive {
        grammar: "Letter <- [a-z]",
        outcomes: &[
            ("", false),
            (" ", false),
            ("ab", false),
            ("a", true),
            ("b", true),
            ("1", false),
            ("z", true),
        ],
    },
    Positive {
        grammar: "Space6 <- [\\n\\t ]",
        outcomes: &[
            ("", false),
            (" ", true),
            ("\t", true),
            ("\n", true),
            ("  ", false),
        ],
    },
    Positive {
        grammar: "Caret1 <- [v^]",
        outcomes: &[
            ("", false),
            ("^", true),
            ("v", true),
            ("^^", false),
            ("vv", false),
        ],
    },
    Positive {
        grammar: r#"String <- '"' ( '\"' / !'"' . )* '"'"#,
        outcomes: &[
            (r#""#, false),
            (r#"""#, false),
            (r#""""#, true),
            (r#"" ""#, true),
            (r#""x""#, true),
            (r#""xxxxx""#, true),
            (r#""xx\"xxx""#, true),
            (r#""xx\"x\"xx""#, true),
            (r#""xx"x\"xx""#, false),
            (r#""xx"x"xx""#, false),
            (r#""xx"x""#, false),
            (r#""xx\"x""#, true),
        ],
    },
    Positive {
        grammar: "Caret2 <- [v-]",
        outcomes: &[
            ("", false),
            ("^", false),
            ("v", true),
            ("-", true),
            ("--", false),
        ],
    },
    Positive {
        grammar: "Char <- [^a-x]",
        outcomes: &[
            ("", false),
            (" ", true),
            ("a", false),
            ("x", false),
            ("z", true),
            ("aa", false),
            ("zz", false),
            ("\t", true),
        ],
    },
    Positive {
        grammar: "Ident1 <- [a-zA-Z_][a-zA-Z0-9_]*",
        outcomes: &[
            ("", false),
            (" ", false),
            ("a", true),
            ("aa", true),
            ("Aa", true),
            ("A1", true),
            ("A_1", true),
            ("A1_", true),
            ("_1_", true),
            ("1", false),
            ("1_", false),
            ("_1", true),
            ("\t", false),
        ],
    },
    Positive {
        grammar: "Lit1 <- 'xyz'",
        outcomes: &[
            ("", false),
            ("x", false),
            ("xy", false),
            ("xyz", true),
            ("xyzt", false),
        ],
    },
    Positive {
        grammar: "Lit2 <- 'xy' 'z'",
        outcomes: &[("", false), ("xy", false), ("xyz", true), ("xyzt", false)],
    },
    Positive {
        grammar: "Lit3 <- 'x' 'y' 'z'",
        outcomes: &[("x", false), ("xy", false), ("xyz", true), ("xyzt", false)],
    },
    Positive {
        grammar: "Star1 <- 'x' 'y' '*' 'z'",
        outcomes: &[
            ("xyz", false),
            ("xy*z", true),
            ("xyzt", false),
            ("xyyzt", false),
        ],
    },
    Positive {
        grammar: "Plus1 <- 'x' 'y' + 'z'",
        outcomes: &[
            ("xy", false),
            ("xz", false),
            ("xyz", true),
            ("xyyz", true),
            ("xyzt", false),
            ("xyyyyz", true),
        ],
    },
    Positive {
        grammar: "Star2 <- 'x' 'y' * 'z'",
        outcomes: &[
            ("xy", false),
            ("xz", true),
            ("xyz", true),
            ("xyyz", true),
            ("xyzt", false),
        ],
    },
    Positive {
        grammar: "Quest1 <- 'x' 'y' ? 'z'",
        outcomes: &[
            ("xy", false),
            ("xz", true),
            ("xyz", true),
            ("xyyz", false),
            ("xyzt", false),
        ],
    },
    Positive {
        grammar: "Group1 <- 'x' ( 'y' ) 'z'",
        outcomes: &[("xz", false), ("xyz", true), ("xyyz", false)],
    },
    Positive {
        grammar: "Group2 <- 'x' ( 'y' ) * 'z'",
        outcomes: &[
            ("xz", true),
            ("yz", false),
            ("xyz", true),
            ("xyyz", true),
            ("xyzt", false),
        ],
    },
    Positive {
        grammar: "Group3 <- 'x' ( 'y' 'z' ) * 't' ",
        outcomes: &[
            ("x", false),
            ("xt", true),
            ("xyz", false),
            ("xyzt", true),
            ("xyzyzt", true),
            ("xyzyt", false),
            ("xzyzt", false),
            ("xyzyzyzt", true),
        ],
    },
    Positive {
        grammar: "Group4 <- 'x' ( ('y')* ('z')* ) * 't' ",
        outcomes: &[
            ("x", false),
            ("xt", true),
            ("xyt", true),
            ("xzt", true),
            ("xyzt", true),
            ("xyzyzt", true),
            ("xyzyt", true),
            ("xzyzt", true),
            ("xyzyzyzt", true),
            ("xyyyzzzt", true),
        ],
    },
    Positive {
        grammar: "Ident2 <- Space 'a'+ \n Space <- ' '*",
        outcomes: &[
            ("", false),
            (" ", false),
            ("a", true),
            ("aa", true),
            ("xa", false),
            ("ax", false),
            ("  a", true),
            ("  aaa", true),
            ("  aaa ", false),
            ("    a a", false),
            ("     aa", true),
        ],
    },
    Positive {
        grammar: "Ident3 <- Space 'a'+ / Space 'b'+ \n Space <- ' '*",
        outcomes: &[
            ("", false),
            (" ", false),
            ("a", true),
            ("b", true),
            ("ab", false),
            ("aa", true),
            ("bb", true),
            ("xa", false),
            ("  a", true),
            ("  b", true),
            ("  aaa", true),
            ("  bbb", true),
            ("  aab ", false),
            ("    a b", false),
            ("     bb", true),
        ],
    },
    Positive {
        grammar: "Quoted1 <- \"'\" ( ! \"'\" . )* \"'\"",
        outcomes: &[
            ("", false),
            ("a", false),
            ("''", true),
            ("' '", true),
            ("'a'", true),
            ("'abc'", true),
            ("'''", false),
            (" ''", false),
            ("'' ", false),
        ],
    },
    Positive {
        grammar: "Quoted2 <- 'a' ! 'b' .* ",
        outcomes: &[
            ("", false),
            ("a", true),
            ("ab", false),
            ("aa", true),
            ("acb", true),
            ("abcd", false),
        ],
    },
    Positive {
        grammar: r#"ABString <-  A* B* _
A <- _ 'a'*
B <- _ 'b'*
_ <- (' ' ' '* / "\n" "\n"*)*"#,
        outcomes: &[
            ("", true),
            ("a", true),
            (" a", true),
            ("a ", true),
            (" a ", true),
            ("b", true),
            (" b ", true),
            ("ab", true),
            (" a b ", true),
            (" aaa bbbb ", true),
            ("c", false),
            ("\n", true),
            ("\n\n\n", true),
            ("   \n\n\n", true),
            ("   \n  \n     \n   \n   \n", true),
            ("   \n  \naa     \nb   \n   \n", true),
            ("   \n  \na a     \nb   \n   \n", true),
            ("   \n  \naa     \nb   \n b  \n", true),
            ("   \n  \naa  x   \nb   \n   \n", false),
        ],
    },
    Positive {
        grammar: "Ident4 <- [[:alpha:]][[:alnum:]][[:digit:]]",
        outcomes: &[
            ("", false),
            ("abc", false),
            ("ab1", true),
            ("123", false),
            ("a23", true),
            ("__3", false),
            ("a_3", false),
            ("ab1\n", false),
        ],
    },
];

#[test]
fn positive_grammars() {
    for test in POSITIVE {
        let grammar = match Grammar::new(test.grammar, ParserOptions::new()) {
            Ok(grammar) => grammar,
            Err(err) => panic!("grammar {:?} rejected: {}", test.grammar, err),
        };
        for &(input, ok) in test.outcomes {
            let result = grammar.parse(input);
            match (ok, &result) {
                (true, Err(err)) => panic!(
                    "grammar {:?} rejected input {:?}: {}",
                    test.grammar, input, err
                ),
                (false, Ok(_)) => panic!(
                    "grammar {:?} accepted input {:?}, want rejection",
                    test.grammar, input
                ),
                _ => {}
            }
            if let Ok(mut result) = result {
                result.compute_content();
                let tree = result.tree.expect("accepted parse must build a tree");
                let round_trip = tree
                    .reconstruct_content()
                    .expect("content must reconstruct");
                assert_eq!(
                    round_trip, input,
                    "content round trip for grammar {:?}",
                    test.grammar
                );
            }
        }
    }
}

struct CaptureTest {
    grammar: &'static str,
    outcomes: &'static [(&'static str, bool, &'static str)],
}

const CAPTURE: &[CaptureTest] = &[
    CaptureTest {
        grammar: "X <- 'x' < 'y'* > 'z' ",
        outcomes: &[
            ("", false, ""),
            ("x", false, ""),
            ("xy", false, ""),
            ("xz", true, ""),
            ("xt", false, ""),
            ("xyz", true, "y"),
            ("xyyz", true, "yy"),
            ("xyyytyyyyz", false, ""),
            ("xyyyzt", false, ""),
        ],
    },
    CaptureTest {
        grammar: "X <- Space < Ident > Space \n Space <- ' '* \n Ident <- ('x' / 'y' / 'z')+",
        outcomes: &[
            ("", false, ""),
            (" ", false, ""),
            ("x", true, "x"),
            (" x", true, "x"),
            ("x ", true, "x"),
            (" x ", true, "x"),
            ("xy", true, "xy"),
            ("xt", false, ""),
            ("yz", true, "yz"),
            ("xyz", true, "xyz"),
            ("xyyyyyyyz", true, "xyyyyyyyz"),
            ("xyyyzt", false, ""),
        ],
    },
    CaptureTest {
        grammar: "X <- _ A (_ A)* _\nA <- 'a'+\n_ <- ' '*",
        outcomes: &[
            ("", false, ""),
            (" ", false, ""),
            ("a", true, ""),
            ("aaa", true, ""),
            (" a", true, ""),
            (" a ", true, ""),
            (" aaa ", true, ""),
            ("a a", true, ""),
            ("a  a", true, ""),
            ("   a    a    a   ", true, ""),
            ("a       a", true, ""),
            ("a    aa", true, ""),
            ("a   a   a   aa", true, ""),
        ],
    },
];

#[test]
fn capture_grammars() {
    for test in CAPTURE {
        let grammar = match Grammar::new(test.grammar, ParserOptions::new()) {
            Ok(grammar) => grammar,
            Err(err) => panic!("grammar {:?} rejected: {}", test.grammar, err),
        };
        for &(input, ok, captured) in test.outcomes {
            match grammar.parse(input) {
                Ok(result) => {
                    assert!(ok, "grammar {:?} accepted {:?}", test.grammar, input);
                    let tree = result.tree.expect("accepted parse must build a tree");
                    assert_eq!(
                        tree.text, captured,
                        "capture for grammar {:?} input {:?}",
                        test.grammar, input
                    );
                }
                Err(err) => {
                    assert!(
                        !ok,
                        "grammar {:?} rejected {:?}: {}",
                        test.grammar, input, err
                    );
                }
            }
        }
    }
}

#[test]
fn skip_empty_nodes_drops_trivial_nodes() {
    let source = "Top <- A B\nA <- 'a'*\nB <- <'b'*>";
    let keep = Grammar::new(source, ParserOptions::new()).unwrap();
    let skip = Grammar::new(source, ParserOptions::new().with_skip_empty_nodes(true)).unwrap();

    let tree = keep.parse("b").unwrap().into_tree().unwrap();
    assert_eq!(tree.children.len(), 2);

    let tree = skip.parse("b").unwrap().into_tree().unwrap();
    assert_eq!(tree.children.len(), 1);
    assert_eq!(tree.children[0].label, "B");

    // The root is never dropped, even when empty.
    let empty = Grammar::new("Top <- 'x'*", ParserOptions::new().with_skip_empty_nodes(true))
        .unwrap();
    let tree = empty.parse("").unwrap().into_tree().unwrap();
    assert_eq!(tree.label, "Top");
}
