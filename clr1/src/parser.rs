// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use crate::table::{ParseTable, TableEntry};
use std::fmt;

/// An input token: a tag naming the terminal it matched and the matched
/// text.  The driver appends the end marker `$` itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexeme {
    tag: String,
    text: String,
}

impl Lexeme {
    pub fn new(tag: &str, text: &str) -> Self {
        Self {
            tag: tag.to_string(),
            text: text.to_string(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    fn end_marker() -> Self {
        Lexeme::new("$", "$")
    }
}

impl From<&str> for Lexeme {
    fn from(tag: &str) -> Self {
        Lexeme::new(tag, tag)
    }
}

impl fmt::Display for Lexeme {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.tag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    NoEntry { state: u32, symbol: String },
    Garbage { unconsumed: usize },
    DispatchRequired,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NoEntry { state, symbol } => {
                write!(f, "no transition in table for ({}, \"{}\")", state, symbol)
            }
            Error::Garbage { unconsumed } => {
                write!(f, "garbage after parsed stream: {} tokens left", unconsumed)
            }
            Error::DispatchRequired => write!(f, "dispatch required to build ast"),
        }
    }
}

/// The raw parse tree built when no reducers are supplied: a node per
/// reduction, a leaf per shifted lexeme and an empty sequence per ε
/// reduction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseTree {
    Leaf(Lexeme),
    Node { lhs: String, children: Vec<ParseTree> },
    Sequence(Vec<ParseTree>),
}

impl From<Lexeme> for ParseTree {
    fn from(lexeme: Lexeme) -> Self {
        ParseTree::Leaf(lexeme)
    }
}

impl StackValue for ParseTree {
    fn sequence(items: Vec<Self>) -> Self {
        ParseTree::Sequence(items)
    }

    fn into_sequence(self) -> Result<Vec<Self>, Self> {
        match self {
            ParseTree::Sequence(items) => Ok(items),
            other => Err(other),
        }
    }
}

/// What the node stack holds.  A value is either a scalar or a sequence;
/// sequences are what ε reductions push and what flattening collapses
/// before reducers run.
pub trait StackValue: From<Lexeme> + Sized {
    fn sequence(items: Vec<Self>) -> Self;
    fn into_sequence(self) -> Result<Vec<Self>, Self>;
}

/// Semantic dispatch: one reducer for all non-terminals, keyed by name,
/// receiving the flattened children in source order.
pub trait Reductions {
    type Value: StackValue;
    fn reduce(&mut self, left_hand_side: &str, children: Vec<Self::Value>) -> Self::Value;
}

fn flatten<V: StackValue>(values: Vec<V>, flat: &mut Vec<V>) {
    for value in values {
        match value.into_sequence() {
            Ok(items) => flatten(items, flat),
            Err(value) => flat.push(value),
        }
    }
}

/// The operating stack: symbol/state pairs over state 0, with the node
/// stack alongside.
#[derive(Debug)]
struct ParseStack<V> {
    states: Vec<(String, u32)>,
    values: Vec<V>,
}

impl<V: StackValue> ParseStack<V> {
    fn new() -> Self {
        Self {
            states: vec![(".start".to_string(), 0)],
            values: vec![],
        }
    }

    fn current_state(&self) -> u32 {
        self.states.last().expect("never empties").1
    }

    fn pop_n(&mut self, n: usize) -> Vec<V> {
        let len = self.states.len();
        self.states.truncate(len - n);
        let len = self.values.len();
        self.values.split_off(len - n)
    }

    fn push_terminal(&mut self, lexeme: Lexeme, new_state: u32) {
        self.states.push((lexeme.tag().to_string(), new_state));
        self.values.push(V::from(lexeme));
    }

    fn push_non_terminal(&mut self, left_hand_side: &str, value: V, new_state: u32) {
        self.values.push(value);
        self.states.push((left_hand_side.to_string(), new_state));
    }
}

impl ParseTable {
    /// Parses into raw trees.  `build_tree` mirrors the generator's
    /// external interface: asking for reduced values here, where no
    /// reducers can be supplied, is the dispatch-required error.
    pub fn parse(&self, lexemes: &[Lexeme], build_tree: bool) -> Result<Vec<ParseTree>, Error> {
        if !build_tree {
            return Err(Error::DispatchRequired);
        }
        self.drive(lexemes, &mut |left_hand_side: &str, children| ParseTree::Node {
            lhs: left_hand_side.to_string(),
            children,
        })
    }

    /// Parses with semantic dispatch: children are flattened and handed to
    /// the caller's reducer, whose return value rides the node stack.
    pub fn parse_with<R: Reductions>(
        &self,
        lexemes: &[Lexeme],
        reductions: &mut R,
    ) -> Result<Vec<R::Value>, Error> {
        self.drive(lexemes, &mut |left_hand_side, children| {
            let mut flat = vec![];
            flatten(children, &mut flat);
            reductions.reduce(left_hand_side, flat)
        })
    }

    fn drive<V: StackValue>(
        &self,
        lexemes: &[Lexeme],
        reduce: &mut dyn FnMut(&str, Vec<V>) -> V,
    ) -> Result<Vec<V>, Error> {
        let mut stream: Vec<Lexeme> = lexemes.to_vec();
        stream.push(Lexeme::end_marker());
        let mut parse_stack = ParseStack::<V>::new();
        let mut index = 0;
        loop {
            let lexeme = &stream[index];
            let entry = match self.entry(parse_stack.current_state(), lexeme.tag()) {
                Some(entry) => entry.clone(),
                None => {
                    return Err(Error::NoEntry {
                        state: parse_stack.current_state(),
                        symbol: lexeme.tag().to_string(),
                    })
                }
            };
            match entry {
                TableEntry::Shift(next_state) => {
                    parse_stack.push_terminal(lexeme.clone(), next_state);
                    index += 1;
                }
                TableEntry::Reduce {
                    left_hand_side,
                    right_hand_side,
                    ..
                } => {
                    let value = if right_hand_side.len() == 1 && right_hand_side[0] == "@" {
                        // ε: nothing on the stacks to pop
                        V::sequence(vec![])
                    } else {
                        let children = parse_stack.pop_n(right_hand_side.len());
                        reduce(&left_hand_side, children)
                    };
                    let top_state = parse_stack.current_state();
                    match self.entry(top_state, &left_hand_side) {
                        Some(TableEntry::Goto(next_state)) => {
                            parse_stack.push_non_terminal(&left_hand_side, value, *next_state);
                        }
                        _ => {
                            return Err(Error::NoEntry {
                                state: top_state,
                                symbol: left_hand_side.clone(),
                            })
                        }
                    }
                }
                TableEntry::Accept => {
                    if index != stream.len() - 1 {
                        return Err(Error::Garbage {
                            unconsumed: stream.len() - 1 - index,
                        });
                    }
                    return Ok(parse_stack.values);
                }
                TableEntry::Goto(_) => {
                    // a lookahead whose tag names a non-terminal
                    return Err(Error::NoEntry {
                        state: parse_stack.current_state(),
                        symbol: lexeme.tag().to_string(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Clr1Parser;

    const ARITHMETIC: &str = "\
        expr: expr PLUS term | term.
        term: term STAR factor | factor.
        factor: LPAREN expr RPAREN | NUM.
    ";

    fn lexemes(tags: &[&str]) -> Vec<Lexeme> {
        tags.iter().map(|tag| Lexeme::from(*tag)).collect()
    }

    #[test]
    fn arithmetic_tree_shape() {
        let parser = Clr1Parser::new(ARITHMETIC, "expr").unwrap();
        let forest = parser
            .parse(&lexemes(&["NUM", "PLUS", "NUM", "STAR", "NUM"]), true)
            .unwrap();
        assert_eq!(forest.len(), 1);
        let (lhs, children) = match &forest[0] {
            ParseTree::Node { lhs, children } => (lhs, children),
            other => panic!("expected a node, got {:?}", other),
        };
        assert_eq!(lhs, "expr");
        assert_eq!(children.len(), 3);
        assert_eq!(children[1], ParseTree::Leaf(Lexeme::from("PLUS")));
        // the right operand binds the multiplication
        match &children[2] {
            ParseTree::Node { lhs, children } => {
                assert_eq!(lhs, "term");
                assert_eq!(children.len(), 3);
                assert_eq!(children[1], ParseTree::Leaf(Lexeme::from("STAR")));
            }
            other => panic!("expected a term node, got {:?}", other),
        }
    }

    #[test]
    fn epsilon_reductions_pop_nothing() {
        let parser =
            Clr1Parser::new("list: items. items: items item | @. item: X.", "list").unwrap();
        let forest = parser.parse(&lexemes(&["X", "X"]), true).unwrap();
        assert_eq!(forest.len(), 1);
        // exactly one empty sequence, at the bottom of the items chain
        let rendering = format!("{:?}", forest[0]);
        assert_eq!(rendering.matches("Sequence([])").count(), 1);
        // the empty input is in this language too
        assert!(parser.parse(&[], true).is_ok());
    }

    #[test]
    fn missing_entry_is_a_parse_error() {
        let parser = Clr1Parser::new(ARITHMETIC, "expr").unwrap();
        let error = parser
            .parse(&lexemes(&["NUM", "NUM"]), true)
            .unwrap_err();
        match error {
            Error::NoEntry { symbol, .. } => assert_eq!(symbol, "NUM"),
            other => panic!("expected a missing entry, got {}", other),
        }
        let error = parser.parse(&lexemes(&["WHAT"]), true).unwrap_err();
        match error {
            Error::NoEntry { state: 0, symbol } => assert_eq!(symbol, "WHAT"),
            other => panic!("expected a missing entry, got {}", other),
        }
    }

    #[test]
    fn garbage_after_accept_is_reported() {
        let parser = Clr1Parser::new("s: A.", "s").unwrap();
        assert!(parser.parse(&lexemes(&["A"]), true).is_ok());
        // a second A never reaches accept: there is no entry for it
        let error = parser.parse(&lexemes(&["A", "A"]), true).unwrap_err();
        match error {
            Error::NoEntry { symbol, .. } => assert_eq!(symbol, "A"),
            other => panic!("expected a missing entry, got {}", other),
        }
        // an explicit early end marker reaches accept with input left over
        let error = parser.parse(&lexemes(&["A", "$", "A"]), true).unwrap_err();
        assert_eq!(error, Error::Garbage { unconsumed: 2 });
    }

    #[test]
    fn tree_mode_must_be_asked_for() {
        let parser = Clr1Parser::new("s: A.", "s").unwrap();
        assert_eq!(
            parser.parse(&lexemes(&["A"]), false).unwrap_err(),
            Error::DispatchRequired
        );
    }
}
