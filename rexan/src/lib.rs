//! A regular expression engine that compiles a pattern straight to a DFA
//! through an annotated syntax tree, without an intermediate NFA.  The
//! surface syntax is parsed by a CLR(1) parser generated from the regex
//! grammar below and driven with semantic dispatch.

use lazy_static::lazy_static;
use std::fmt;

use clr1::{Clr1Parser, Lexeme, ParseTable, Reductions, StackValue};

pub mod ast;
pub mod dfa;
pub mod matching;
pub mod token;

use crate::ast::{Node, SetItem, SyntaxTree};
use crate::dfa::Dfa;
pub use crate::matching::{Match, Matches};

const REGEX_GRAMMAR: &str = "\
    regex: alt | basic.
    alt: regex ALT basic.
    basic: concat | reserved.
    concat: basic reserved.
    reserved: zero_or_more | one_or_more | zero_or_one | atom.
    zero_or_more: atom STAR.
    one_or_more: atom PLUS.
    zero_or_one: atom OPT.
    atom: group | char | wildcard | positive_set | negative_set.
    wildcard: DOT.
    group: LPAREN regex RPAREN.
    char: CHAR | escape_char.
    positive_set: LBRACKET set_items RBRACKET.
    negative_set: LBRACKET NEGATE set_items RBRACKET.
    set_items: set_items set_item | set_item.
    set_item: char TO char | char.
    escape_char: SLASH CHAR.
";

lazy_static! {
    static ref REGEX_TABLE: ParseTable = Clr1Parser::new(REGEX_GRAMMAR, "regex")
        .expect("the regex grammar is well formed")
        .into_table();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    Syntax(clr1::parser::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Syntax(error) => write!(f, "regex syntax: {}", error),
        }
    }
}

impl From<clr1::parser::Error> for Error {
    fn from(error: clr1::parser::Error) -> Self {
        Error::Syntax(error)
    }
}

/// What rides the node stack while a pattern is parsed: lexemes as
/// shifted, bare bytes below the atom level, annotation nodes above it,
/// set items between brackets.
#[derive(Debug)]
enum RegexValue {
    Lexeme(Lexeme),
    Byte(u8),
    Node(Node),
    Item(SetItem),
    Sequence(Vec<RegexValue>),
}

impl From<Lexeme> for RegexValue {
    fn from(lexeme: Lexeme) -> Self {
        RegexValue::Lexeme(lexeme)
    }
}

impl StackValue for RegexValue {
    fn sequence(items: Vec<Self>) -> Self {
        RegexValue::Sequence(items)
    }

    fn into_sequence(self) -> Result<Vec<Self>, Self> {
        match self {
            RegexValue::Sequence(items) => Ok(items),
            other => Err(other),
        }
    }
}

fn expect_node(value: RegexValue) -> Node {
    match value {
        RegexValue::Node(node) => node,
        other => panic!("malformed regex parse: expected a node, got {:?}", other),
    }
}

fn expect_byte(value: RegexValue) -> u8 {
    match value {
        RegexValue::Byte(byte) => byte,
        other => panic!("malformed regex parse: expected a byte, got {:?}", other),
    }
}

fn expect_item(value: RegexValue) -> SetItem {
    match value {
        RegexValue::Item(item) => item,
        other => panic!("malformed regex parse: expected a set item, got {:?}", other),
    }
}

fn lexeme_byte(lexeme: &Lexeme) -> u8 {
    let character = lexeme
        .text()
        .chars()
        .next()
        .expect("lexemes carry their text");
    character as u32 as u8
}

/// The dispatch reducers: they assemble the annotated tree while the
/// parser runs.  Characters stay bare bytes until an atom needs a leaf, so
/// range endpoints inside brackets never allocate positions.
struct AstBuilder {
    tree: SyntaxTree,
}

impl Reductions for AstBuilder {
    type Value = RegexValue;

    fn reduce(&mut self, left_hand_side: &str, mut children: Vec<RegexValue>) -> RegexValue {
        match left_hand_side {
            "regex" | "basic" | "reserved" => children.remove(0),
            "alt" => {
                let first = expect_node(children.remove(0));
                let second = expect_node(children.remove(1));
                RegexValue::Node(self.tree.alternation(first, second))
            }
            "concat" => {
                let first = expect_node(children.remove(0));
                let second = expect_node(children.remove(0));
                RegexValue::Node(self.tree.concatenation(first, second))
            }
            "zero_or_more" => {
                let node = expect_node(children.remove(0));
                RegexValue::Node(self.tree.zero_or_more(node))
            }
            "one_or_more" => {
                let node = expect_node(children.remove(0));
                RegexValue::Node(self.tree.one_or_more(node))
            }
            "zero_or_one" => {
                let node = expect_node(children.remove(0));
                RegexValue::Node(self.tree.zero_or_one(node))
            }
            "atom" => match children.remove(0) {
                RegexValue::Byte(byte) => RegexValue::Node(self.tree.leaf(byte)),
                node @ RegexValue::Node(_) => node,
                other => panic!("malformed regex parse: unexpected atom {:?}", other),
            },
            "group" => children.remove(1),
            "wildcard" => RegexValue::Node(self.tree.wildcard()),
            "char" => match children.remove(0) {
                RegexValue::Lexeme(lexeme) => RegexValue::Byte(lexeme_byte(&lexeme)),
                byte @ RegexValue::Byte(_) => byte,
                other => panic!("malformed regex parse: unexpected char {:?}", other),
            },
            "escape_char" => {
                let lexeme = match children.remove(1) {
                    RegexValue::Lexeme(lexeme) => lexeme,
                    other => panic!("malformed regex parse: unexpected escape {:?}", other),
                };
                RegexValue::Byte(match lexeme_byte(&lexeme) {
                    b's' => b' ',
                    b'r' => b'\r',
                    b'n' => b'\n',
                    other => other,
                })
            }
            "positive_set" => {
                let last = children.len() - 1;
                let items: Vec<SetItem> = children.drain(1..last).map(expect_item).collect();
                RegexValue::Node(self.tree.positive_set(&items))
            }
            "negative_set" => {
                let last = children.len() - 1;
                let items: Vec<SetItem> = children.drain(2..last).map(expect_item).collect();
                RegexValue::Node(self.tree.negative_set(&items))
            }
            "set_items" => RegexValue::Sequence(children),
            "set_item" => {
                if children.len() == 3 {
                    let low = expect_byte(children.remove(0));
                    let high = expect_byte(children.remove(1));
                    RegexValue::Item(SetItem::Range(low, high))
                } else {
                    RegexValue::Item(SetItem::Single(expect_byte(children.remove(0))))
                }
            }
            other => panic!("no reducer for \"{}\"", other),
        }
    }
}

/// A compiled regular expression.
#[derive(Debug, Clone)]
pub struct RegularExpression {
    dfa: Dfa,
}

impl RegularExpression {
    /// Compiles `pattern`.  The pattern is wrapped as `(pattern)#`; the
    /// sentinel `#` is an ordinary leaf whose position, the last one
    /// assigned, marks the accepting compositions.
    pub fn new(pattern: &str) -> Result<Self, Error> {
        let lexemes = token::lex(&format!("({})#", pattern));
        let mut builder = AstBuilder {
            tree: SyntaxTree::new(),
        };
        let mut values = REGEX_TABLE.parse_with(&lexemes, &mut builder)?;
        debug_assert_eq!(values.len(), 1);
        let root = match values.pop() {
            Some(RegexValue::Node(node)) => node,
            _ => panic!("malformed regex parse: no root node"),
        };
        let final_position = builder.tree.last_position();
        let dfa = Dfa::build(&builder.tree, root.firstpos().clone(), final_position);
        Ok(Self { dfa })
    }

    /// Whether the whole of `text` is in the pattern's language.
    pub fn check(&self, text: &str) -> bool {
        let mut state = 0;
        for byte in text.bytes() {
            match self.dfa.transition(state, byte) {
                Some(next_state) => state = next_state,
                None => return false,
            }
        }
        self.dfa.is_accepting(state)
    }

    /// `check` with a match record over the whole input.  The empty string
    /// matches exactly when the initial state accepts.
    pub fn fullmatch(&self, text: &str) -> Option<Match> {
        if self.check(text) {
            Some(Match::new((0, text.len()), text))
        } else {
            None
        }
    }

    pub fn findall(&self, text: &str) -> Vec<Match> {
        self.finditer(text).collect()
    }

    pub fn finditer<'a>(&'a self, text: &'a str) -> Matches<'a> {
        Matches::new(&self.dfa, text)
    }

    pub fn dump_states(&self) -> String {
        self.dfa.dump_states()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_follows_the_language() {
        let regex = RegularExpression::new("a(b|c)*d").unwrap();
        assert!(regex.check("ad"));
        assert!(regex.check("abcbcd"));
        assert!(!regex.check("a"));
        assert!(!regex.check("axd"));
        assert!(!regex.check(""));
    }

    #[test]
    fn findall_scans_left_to_right() {
        let regex = RegularExpression::new("a(b|c)*d").unwrap();
        let matches = regex.findall("abcbd xx ad");
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].span(), (0, 5));
        assert_eq!(matches[0].text(), "abcbd");
        assert_eq!(matches[1].span(), (9, 11));
        assert_eq!(matches[1].text(), "ad");
    }

    #[test]
    fn finditer_is_lazy_but_agrees_with_findall() {
        let regex = RegularExpression::new("ab+").unwrap();
        let text = "ab abb xx abbb";
        let mut iterator = regex.finditer(text);
        assert_eq!(iterator.next().unwrap().text(), "ab");
        let rest: Vec<Match> = iterator.collect();
        let all = regex.findall(text);
        assert_eq!(all.len(), 3);
        assert_eq!(&all[1..], &rest[..]);
    }

    #[test]
    fn empty_runs_are_never_matches() {
        let regex = RegularExpression::new("a*").unwrap();
        let matches = regex.findall("bab");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].span(), (1, 2));
        assert!(regex.findall("").is_empty());
    }

    #[test]
    fn fullmatch_spans_the_whole_input() {
        let regex = RegularExpression::new("a(b|c)*d").unwrap();
        let matched = regex.fullmatch("abcd").unwrap();
        assert_eq!(matched.span(), (0, 4));
        assert_eq!(matched.text(), "abcd");
        assert!(regex.fullmatch("abc").is_none());
        assert!(regex.fullmatch("").is_none());
    }

    #[test]
    fn fullmatch_of_nothing_needs_a_nullable_pattern() {
        let regex = RegularExpression::new("a*").unwrap();
        let matched = regex.fullmatch("").unwrap();
        assert_eq!(matched.span(), (0, 0));
        assert_eq!(matched.text(), "");
        let regex = RegularExpression::new("a+").unwrap();
        assert!(regex.fullmatch("").is_none());
        assert!(regex.fullmatch("aaa").is_some());
    }

    #[test]
    fn repetition_operators() {
        let zero_or_one = RegularExpression::new("ab?c").unwrap();
        assert!(zero_or_one.check("ac"));
        assert!(zero_or_one.check("abc"));
        assert!(!zero_or_one.check("abbc"));
        let one_or_more = RegularExpression::new("ab+c").unwrap();
        assert!(!one_or_more.check("ac"));
        assert!(one_or_more.check("abbbc"));
    }

    #[test]
    fn bracket_sets_and_ranges() {
        let regex = RegularExpression::new("[a-c]+").unwrap();
        assert!(regex.check("abcba"));
        assert!(!regex.check("abd"));
        let regex = RegularExpression::new("[xa-c]+").unwrap();
        assert!(regex.check("xab"));
        let negated = RegularExpression::new("[^a-c]+").unwrap();
        assert!(negated.check("xyz"));
        assert!(!negated.check("xaz"));
    }

    #[test]
    fn wildcard_matches_any_byte() {
        let regex = RegularExpression::new("a.c").unwrap();
        assert!(regex.check("abc"));
        assert!(regex.check("a-c"));
        assert!(regex.check("a.c"));
        assert!(!regex.check("ac"));
    }

    #[test]
    fn escapes_reach_literals_and_whitespace() {
        let regex = RegularExpression::new("a\\s\\+").unwrap();
        assert!(regex.check("a +"));
        assert!(!regex.check("a+"));
        let regex = RegularExpression::new("x\\n").unwrap();
        assert!(regex.check("x\n"));
        let regex = RegularExpression::new("\\(\\)").unwrap();
        assert!(regex.check("()"));
    }

    #[test]
    fn malformed_patterns_are_syntax_errors() {
        assert!(RegularExpression::new("a|").is_err());
        assert!(RegularExpression::new("(ab").is_err());
        assert!(RegularExpression::new("").is_err());
        match RegularExpression::new("*a") {
            Err(Error::Syntax(_)) => (),
            other => panic!("expected a syntax error, got {:?}", other),
        }
    }

    #[test]
    fn dump_states_lists_the_initial_composition() {
        let regex = RegularExpression::new("ab").unwrap();
        let dump = regex.dump_states();
        assert!(dump.starts_with("state {1}:"));
        assert!(dump.contains("upon 'a'"));
    }
}
