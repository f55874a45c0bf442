//! Character-class expressions
//!
//! A [`CharClass`] is the semantic form of a `[...]` grammar term: an
//! optional set of individual code points, sorted inclusive ranges (split
//! into 16-bit and wider tables), a negation flag, and an optional named
//! class such as `[:alpha:]`.
//!
//! Parsing and printing round-trip through a canonical form: negation `^`
//! first, then the sorted scalar members (excluding `-` and `^`), then the
//! ranges in ascending order, then `^` if a literal caret is a member, and
//! finally `-` if a literal dash is a member:
//!
//! ```
//! use pegtree::char_class::CharClass;
//!
//! let cc = CharClass::parse("x-zo-pa-c").unwrap();
//! assert_eq!(cc.to_string(), "a-co-px-z");
//! assert_eq!(CharClass::parse(&cc.to_string()).unwrap(), cc);
//! ```
//!
//! Class bodies accept single characters, ranges `a-z`, the escapes
//! `\a \b \f \n \r \t \v \" \' \\ \- \^ \[ \]`, numeric escapes `\xHH`,
//! `\uHHHH` and `\UHHHHHHHH`, a leading `^` to negate, and the bracketed
//! names `[:alpha:]`, `[:digit:]`, `[:space:]`, `[:lower:]`, `[:upper:]`,
//! `[:punct:]`, `[:print:]`, `[:graph:]`, `[:cntrl:]`, `[:alnum:]` and
//! `[:any:]`. A leading or trailing `-` is a literal member; only an
//! interior `-` opens a range.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A named character class with fixed membership semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialClass {
    /// Alphabetic characters.
    Alpha,
    /// Numeric characters.
    Digit,
    /// Whitespace.
    Space,
    /// Lowercase letters.
    Lower,
    /// Uppercase letters.
    Upper,
    /// Punctuation (ASCII-exact; see module notes).
    Punct,
    /// Printable characters including the ASCII space.
    Print,
    /// Graphic characters, including non-ASCII spaces.
    Graph,
    /// Control characters.
    Cntrl,
    /// Letters and digits.
    Alnum,
    /// Every well-formed code point.
    Any,
}

impl SpecialClass {
    /// Maps a bracketed name such as `[:alpha:]` to its class.
    pub fn from_name(name: &str) -> Option<SpecialClass> {
        match name {
            "[:alpha:]" => Some(SpecialClass::Alpha),
            "[:digit:]" => Some(SpecialClass::Digit),
            "[:space:]" => Some(SpecialClass::Space),
            "[:lower:]" => Some(SpecialClass::Lower),
            "[:upper:]" => Some(SpecialClass::Upper),
            "[:punct:]" => Some(SpecialClass::Punct),
            "[:print:]" => Some(SpecialClass::Print),
            "[:graph:]" => Some(SpecialClass::Graph),
            "[:cntrl:]" => Some(SpecialClass::Cntrl),
            "[:alnum:]" => Some(SpecialClass::Alnum),
            "[:any:]" => Some(SpecialClass::Any),
            _ => None,
        }
    }

    /// The bracketed name of this class.
    pub fn name(&self) -> &'static str {
        match self {
            SpecialClass::Alpha => "[:alpha:]",
            SpecialClass::Digit => "[:digit:]",
            SpecialClass::Space => "[:space:]",
            SpecialClass::Lower => "[:lower:]",
            SpecialClass::Upper => "[:upper:]",
            SpecialClass::Punct => "[:punct:]",
            SpecialClass::Print => "[:print:]",
            SpecialClass::Graph => "[:graph:]",
            SpecialClass::Cntrl => "[:cntrl:]",
            SpecialClass::Alnum => "[:alnum:]",
            SpecialClass::Any => "[:any:]",
        }
    }

    /// Membership test for a single code point.
    pub fn matches(&self, c: char) -> bool {
        match self {
            SpecialClass::Alpha => c.is_alphabetic(),
            SpecialClass::Digit => c.is_numeric(),
            SpecialClass::Space => c.is_whitespace(),
            SpecialClass::Lower => c.is_lowercase(),
            SpecialClass::Upper => c.is_uppercase(),
            SpecialClass::Punct => c.is_ascii_punctuation(),
            SpecialClass::Print => printable(c) && (c == ' ' || !c.is_whitespace()),
            SpecialClass::Graph => printable(c),
            SpecialClass::Cntrl => c.is_control(),
            SpecialClass::Alnum => c.is_alphabetic() || c.is_numeric(),
            SpecialClass::Any => true,
        }
    }
}

/// An invalid character-class expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassError {
    /// The class body was empty.
    Empty,
    /// A bracketed name is not one of the known classes.
    UnknownClass(String),
    /// A range's upper bound does not exceed its lower bound.
    InvalidRange {
        /// Lower bound.
        lo: char,
        /// Upper bound.
        hi: char,
    },
    /// A range crosses the 16-bit code point boundary.
    BoundaryRange {
        /// Lower bound.
        lo: char,
        /// Upper bound.
        hi: char,
    },
    /// An escape sequence could not be decoded.
    BadEscape(String),
}

impl fmt::Display for ClassError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassError::Empty => write!(f, "empty char class"),
            ClassError::UnknownClass(name) => write!(f, "unknown char class: {:?}", name),
            ClassError::InvalidRange { lo, hi } => {
                write!(f, "invalid interval in {}-{}", lo, hi)
            }
            ClassError::BoundaryRange { lo, hi } => write!(
                f,
                "invalid char range across 16-bit and 32-bit boundary: {} to {}",
                *lo as u32, *hi as u32
            ),
            ClassError::BadEscape(seq) => write!(f, "invalid escape sequence: {:?}", seq),
        }
    }
}

impl std::error::Error for ClassError {}

/// The semantic form of a `[...]` character-class term.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharClass {
    /// Individual code point members.
    pub set: BTreeSet<char>,
    /// Inclusive ranges below the 16-bit boundary, ascending by lower bound.
    pub r16: Vec<(u16, u16)>,
    /// Inclusive ranges at or above the 16-bit boundary, ascending.
    pub r32: Vec<(u32, u32)>,
    /// Inverts the membership test.
    pub negated: bool,
    /// A named class; combines additively with `set` and the range tables.
    pub special: Option<SpecialClass>,
}

impl CharClass {
    /// The class that matches every well-formed code point (the `.` term).
    pub fn any() -> CharClass {
        CharClass {
            special: Some(SpecialClass::Any),
            ..CharClass::default()
        }
    }

    /// Parses a class body (the text between `[` and `]`).
    pub fn parse(arg: &str) -> Result<CharClass, ClassError> {
        if arg.is_empty() {
            return Err(ClassError::Empty);
        }
        if let Some(rest) = arg.strip_prefix('^') {
            if rest.is_empty() {
                let mut cc = CharClass::default();
                cc.set.insert('^');
                return Ok(cc);
            }
            let carets = arg.bytes().take_while(|&b| b == b'^').count();
            let mut cc = CharClass::parse(rest)?;
            cc.negated = true;
            if carets > 1 {
                cc.set.insert('^');
            }
            return Ok(cc);
        }
        if arg.starts_with('[') && arg.ends_with(']') {
            return match SpecialClass::from_name(arg) {
                Some(special) => Ok(CharClass {
                    special: Some(special),
                    ..CharClass::default()
                }),
                None => Err(ClassError::UnknownClass(arg.to_string())),
            };
        }

        let mut cc = CharClass::default();
        let bytes = arg.as_bytes();
        let mut last: Option<char> = None;
        let mut start: Option<char> = None;
        let mut pos = 0;
        while pos < arg.len() {
            let Some(first) = arg[pos..].chars().next() else {
                break;
            };
            let mut c = first;
            let mut w = first.len_utf8();
            if c == '-' && pos != 0 && pos + w != arg.len() {
                // Interior dash opens a range; leading or trailing dashes
                // are plain members.
                start = last.take();
                pos += w;
                continue;
            }
            if c == '\\' && pos + 1 < arg.len() {
                match bytes[pos + 1] {
                    b'^' | b'-' | b'[' | b']' => {
                        // Class-specific escapes not covered by the standard set.
                        c = bytes[pos + 1] as char;
                        w = 2;
                    }
                    _ => {
                        let (value, used) = parse_escape(&arg[pos + 1..])?;
                        c = value;
                        w = 1 + used;
                    }
                }
            }
            if let Some(lo) = start.take() {
                if c <= lo {
                    return Err(ClassError::InvalidRange { lo, hi: c });
                }
                let (lo32, hi32) = (lo as u32, c as u32);
                if lo32 >= 1 << 16 {
                    cc.r32.push((lo32, hi32));
                } else if hi32 < 1 << 16 {
                    cc.r16.push((lo32 as u16, hi32 as u16));
                } else {
                    return Err(ClassError::BoundaryRange { lo, hi: c });
                }
                last = None;
                pos += w;
                continue;
            }
            if let Some(prev) = last {
                cc.set.insert(prev);
            }
            last = Some(c);
            pos += w;
        }
        if let Some(prev) = last {
            cc.set.insert(prev);
        }
        cc.r16.sort_unstable();
        cc.r32.sort_unstable();
        Ok(cc)
    }

    /// Membership test for a single code point.
    pub fn matches(&self, c: char) -> bool {
        let mut found = match self.special {
            Some(special) => special.matches(c),
            None => false,
        };
        if !found {
            found = self.set.contains(&c);
        }
        if !found {
            let v = c as u32;
            found = if v < 1 << 16 {
                let v = v as u16;
                self.r16.iter().any(|&(lo, hi)| lo <= v && v <= hi)
            } else {
                self.r32.iter().any(|&(lo, hi)| lo <= v && v <= hi)
            };
        }
        if self.negated {
            !found
        } else {
            found
        }
    }
}

impl fmt::Display for CharClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "^")?;
        }
        if let Some(special) = self.special {
            return write!(f, "{}", special.name());
        }
        for &c in &self.set {
            if c == '-' || c == '^' {
                continue;
            }
            if c == ']' {
                write!(f, "\\]")?;
                continue;
            }
            write!(f, "{}", rune_to_string(c))?;
        }
        for &(lo, hi) in &self.r16 {
            let lo = char::from_u32(lo as u32).unwrap_or(char::REPLACEMENT_CHARACTER);
            let hi = char::from_u32(hi as u32).unwrap_or(char::REPLACEMENT_CHARACTER);
            write!(f, "{}-{}", rune_to_string(lo), rune_to_string(hi))?;
        }
        for &(lo, hi) in &self.r32 {
            let lo = char::from_u32(lo).unwrap_or(char::REPLACEMENT_CHARACTER);
            let hi = char::from_u32(hi).unwrap_or(char::REPLACEMENT_CHARACTER);
            write!(f, "{}-{}", rune_to_string(lo), rune_to_string(hi))?;
        }
        if self.set.contains(&'^') {
            // A caret that would end up leading the output must be escaped,
            // or re-parsing would read it as negation.
            let caret_leads = !self.negated
                && self.r16.is_empty()
                && self.r32.is_empty()
                && !self.set.iter().any(|&c| c != '-' && c != '^');
            if caret_leads {
                write!(f, "\\^")?;
            } else {
                write!(f, "^")?;
            }
        }
        if self.set.contains(&'-') {
            write!(f, "-")?;
        }
        Ok(())
    }
}

/// Decodes one standard escape following a backslash.
///
/// `s` is the text after the backslash; returns the decoded code point and
/// the number of bytes consumed from `s`. Handles the short escapes
/// `a b f n r t v \ ' "` and the numeric forms `xHH`, `uHHHH`, `UHHHHHHHH`.
pub(crate) fn parse_escape(s: &str) -> Result<(char, usize), ClassError> {
    let Some(first) = s.chars().next() else {
        return Err(ClassError::BadEscape("\\".to_string()));
    };
    let simple = match first {
        'a' => Some('\u{7}'),
        'b' => Some('\u{8}'),
        'f' => Some('\u{c}'),
        'n' => Some('\n'),
        'r' => Some('\r'),
        't' => Some('\t'),
        'v' => Some('\u{b}'),
        '\\' | '\'' | '"' => Some(first),
        _ => None,
    };
    if let Some(c) = simple {
        return Ok((c, first.len_utf8()));
    }
    let digits = match first {
        'x' => 2,
        'u' => 4,
        'U' => 8,
        _ => return Err(ClassError::BadEscape(format!("\\{}", first))),
    };
    let hex = s
        .get(1..1 + digits)
        .ok_or_else(|| ClassError::BadEscape(format!("\\{}", s)))?;
    let value = u32::from_str_radix(hex, 16)
        .map_err(|_| ClassError::BadEscape(format!("\\{}{}", first, hex)))?;
    let c = char::from_u32(value).ok_or_else(|| ClassError::BadEscape(format!("\\{}{}", first, hex)))?;
    Ok((c, 1 + digits))
}

/// Printability for canonical output. Control characters and the private-use
/// areas print as numeric escapes so the canonical form survives a re-parse.
fn printable(c: char) -> bool {
    if c.is_control() {
        return false;
    }
    !matches!(
        c as u32,
        0xE000..=0xF8FF | 0xF0000..=0xFFFFD | 0x100000..=0x10FFFD
    )
}

/// Canonical single-character spelling used by the class printer.
fn rune_to_string(c: char) -> String {
    match c {
        '\u{7}' => "\\a".to_string(),
        '\u{8}' => "\\b".to_string(),
        '\u{c}' => "\\f".to_string(),
        '\n' => "\\n".to_string(),
        '\r' => "\\r".to_string(),
        '\t' => "\\t".to_string(),
        '\u{b}' => "\\v".to_string(),
        '\\' => "\\\\".to_string(),
        '\'' => "\\'".to_string(),
        c if printable(c) => c.to_string(),
        c if (c as u32) < 0x100 => format!("\\x{:02x}", c as u32),
        c if (c as u32) < 0x10000 => format!("\\u{:04x}", c as u32),
        c => format!("\\U{:08x}", c as u32),
    }
}
