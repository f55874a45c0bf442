//! Property-based tests using proptest
//!
//! Verifies the engine's universal invariants over generated inputs:
//! char-class canonicalization round-trips, content reconstruction is
//! lossless, re-parsing is idempotent, and node positions stay consistent.

use pegtree::{CharClass, Grammar, Node, ParserOptions};
use proptest::prelude::*;

// =============================================================================
// Character classes
// =============================================================================

fn member_char() -> impl Strategy<Value = char> {
    prop_oneof![
        proptest::char::range('a', 'z'),
        proptest::char::range('0', '9'),
        Just('-'),
        Just('^'),
        Just('\t'),
        Just('\n'),
        Just('é'),
        Just('Я'),
    ]
}

fn range16() -> impl Strategy<Value = (u16, u16)> {
    (b'a' as u16..b'y' as u16).prop_flat_map(|lo| (Just(lo), lo + 1..=b'z' as u16))
}

fn char_class() -> impl Strategy<Value = CharClass> {
    (
        proptest::collection::btree_set(member_char(), 0..5),
        proptest::collection::vec(range16(), 0..3),
        any::<bool>(),
    )
        .prop_filter_map("class must be non-empty", |(set, mut r16, negated)| {
            if set.is_empty() && r16.is_empty() {
                return None;
            }
            r16.sort_unstable();
            Some(CharClass {
                set,
                r16,
                r32: Vec::new(),
                negated,
                special: None,
            })
        })
}

proptest! {
    /// Printing a class and parsing it back yields the same class.
    #[test]
    fn char_class_print_parse_round_trip(cc in char_class()) {
        let printed = cc.to_string();
        let reparsed = CharClass::parse(&printed)
            .unwrap_or_else(|err| panic!("reparse of {:?} failed: {}", printed, err));
        prop_assert_eq!(reparsed, cc);
    }

    /// The canonical form is a fixed point of parse-then-print.
    #[test]
    fn char_class_canonical_fixed_point(cc in char_class()) {
        let once = cc.to_string();
        let twice = CharClass::parse(&once).unwrap().to_string();
        prop_assert_eq!(once, twice);
    }
}

// =============================================================================
// Parsing invariants
// =============================================================================

fn ident_grammar() -> Grammar {
    Grammar::new(
        "Ident <- <[a-zA-Z_][a-zA-Z0-9_]*>",
        ParserOptions::new(),
    )
    .unwrap()
}

fn words_grammar() -> Grammar {
    Grammar::new(
        "Text <- (Word / Gap)+\nWord <- <[a-z]+>\nGap <- [ \\n]+",
        ParserOptions::new().with_skip_empty_nodes(true),
    )
    .unwrap()
}

/// Positions are in bounds, children are ordered and non-overlapping, and
/// each child's range lies within its parent's.
fn check_positions(node: &Node<'_>, input_len: usize) {
    assert!(node.pos + node.len <= input_len, "node out of bounds");
    let mut cursor = node.pos;
    for ch in &node.children {
        assert!(ch.pos >= cursor, "children overlap or out of order");
        assert!(
            ch.pos + ch.len <= node.pos + node.len,
            "child escapes parent range"
        );
        cursor = ch.pos + ch.len;
        check_positions(ch, input_len);
    }
}

proptest! {
    /// Content reconstruction is lossless for every accepted input.
    #[test]
    fn content_round_trip(input in "[a-z \n]{0,40}") {
        let grammar = words_grammar();
        if let Ok(mut result) = grammar.parse(&input) {
            result.compute_content();
            let tree = result.tree.unwrap();
            prop_assert_eq!(&tree.reconstruct_content().unwrap(), &input);
        };
    }

    /// Parsing the same input twice yields structurally equal trees.
    #[test]
    fn packrat_idempotence(input in "[a-z \n]{0,40}") {
        let grammar = words_grammar();
        let first = grammar.parse(&input).map(|r| r.into_tree());
        let second = grammar.parse(&input).map(|r| r.into_tree());
        match (first, second) {
            (Ok(a), Ok(b)) => prop_assert_eq!(a, b),
            (Err(_), Err(_)) => {}
            _ => prop_assert!(false, "parse outcome changed between runs"),
        }
    }

    /// Node positions and child ranges stay consistent.
    #[test]
    fn position_invariants(input in "[a-z \n]{1,40}") {
        let grammar = words_grammar();
        if let Ok(result) = grammar.parse(&input) {
            let tree = result.tree.unwrap();
            check_positions(&tree, input.len());
        };
    }

    /// Identifiers match exactly when they should.
    #[test]
    fn ident_acceptance(input in "[a-zA-Z_][a-zA-Z0-9_]{0,10}") {
        let grammar = ident_grammar();
        let tree = grammar.parse(&input).unwrap().into_tree().unwrap();
        prop_assert_eq!(tree.text.as_ref(), input.as_str());
    }

    /// Inputs starting with a digit are rejected.
    #[test]
    fn ident_rejection(input in "[0-9][a-zA-Z0-9_]{0,10}") {
        let grammar = ident_grammar();
        prop_assert!(grammar.parse(&input).is_err());
    }

    /// The tree serialization format round-trips through its canonical
    /// form.
    #[test]
    fn tree_format_round_trip(label in "[A-Za-z_][A-Za-z0-9_]{0,8}", text in "[a-z]{0,8}") {
        let serialized = if text.is_empty() {
            format!("({})", label)
        } else {
            format!("({} {:?})", label, text)
        };
        let canonical = pegtree::tree::pretty(&serialized).unwrap();
        prop_assert_eq!(&canonical, &serialized);
        prop_assert_eq!(pegtree::tree::pretty(&canonical).unwrap(), canonical);
    }
}
