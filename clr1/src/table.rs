// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use crate::grammar::{report_warning, Error, Specification};
use crate::parser::{Lexeme, ParseTree, Reductions};
use crate::production::{GrammarItemKey, GrammarItemSet, Production};
use crate::state::ParserState;
use crate::symbol::{Symbol, Token, TokenSet};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::{self, Write};

/// One slot of the parse table.  Shift/reduce/accept entries live in
/// terminal columns and goto entries in non-terminal columns; reductions
/// carry the production's number and its symbol names so the finished
/// table has no ties back to the grammar's shared data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableEntry {
    Shift(u32),
    Reduce {
        ident: i32,
        left_hand_side: String,
        right_hand_side: Vec<String>,
    },
    Accept,
    Goto(u32),
}

impl TableEntry {
    fn from_production(production: &Production) -> Self {
        TableEntry::Reduce {
            ident: production.ident(),
            left_hand_side: production.left_hand_side().name().to_string(),
            right_hand_side: production.right_hand_side_names(),
        }
    }

    fn emit_text(&self) -> String {
        match self {
            TableEntry::Shift(state) => format!("Shift({})", state),
            TableEntry::Reduce {
                left_hand_side,
                right_hand_side,
                ..
            } => format!("Reduce({:?}, {:?})", left_hand_side, right_hand_side),
            TableEntry::Accept => "Accept".to_string(),
            TableEntry::Goto(state) => format!("Goto({})", state),
        }
    }
}

impl fmt::Display for TableEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TableEntry::Shift(state) => write!(f, "shift and goto state {}", state),
            TableEntry::Reduce {
                left_hand_side,
                right_hand_side,
                ..
            } => write!(
                f,
                "reduce {} -> {}",
                left_hand_side,
                right_hand_side.join(" ")
            ),
            TableEntry::Accept => write!(f, "accept"),
            TableEntry::Goto(state) => write!(f, "goto state {}", state),
        }
    }
}

/// A resolved table collision.  Resolution is deterministic (shift beats
/// reduce, the earlier listed production beats the later one) and never
/// aborts generation; conflicts are reported and recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    ShiftReduce {
        state: u32,
        token: String,
        production: String,
    },
    ReduceReduce {
        state: u32,
        token: String,
        kept: String,
        dropped: String,
    },
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Conflict::ShiftReduce {
                state,
                token,
                production,
            } => write!(
                f,
                "state {}: shift/reduce conflict on \"{}\": resolved in favour of shift over \"{}\"",
                state, token, production
            ),
            Conflict::ReduceReduce {
                state,
                token,
                kept,
                dropped,
            } => write!(
                f,
                "state {}: reduce/reduce conflict on \"{}\": resolved in favour of \"{}\" over \"{}\"",
                state, token, kept, dropped
            ),
        }
    }
}

/// The finished action/goto table.  Plain owned data keyed by state ident
/// and symbol name: build it once, then it is immutable and freely
/// shareable between threads.
#[derive(Debug, Clone)]
pub struct ParseTable {
    entries: BTreeMap<(u32, String), TableEntry>,
    conflicts: Vec<Conflict>,
    state_count: usize,
}

impl ParseTable {
    fn build(parser_states: &[ParserState]) -> Self {
        let mut entries = BTreeMap::new();
        let mut conflicts = vec![];
        for state in parser_states.iter() {
            // first pass: shifts and gotos
            for item_key in state.irreducible_key_set().iter() {
                let symbol = item_key.next_symbol().expect("not reducible");
                let target = state
                    .transition(symbol)
                    .expect("transitions are recorded during state construction");
                let key = (state.ident(), symbol.name().to_string());
                match symbol {
                    Symbol::Terminal(_) => {
                        entries.insert(key, TableEntry::Shift(target.ident()));
                    }
                    Symbol::NonTerminal(_) => {
                        entries.insert(key, TableEntry::Goto(target.ident()));
                    }
                    Symbol::Epsilon => debug_assert!(false, "epsilon is never after the dot"),
                }
            }
            // second pass: reductions and accept, resolving collisions
            for (item_key, look_ahead_set) in state.reducible_items() {
                let production = item_key.production();
                if production.left_hand_side().is_start() {
                    entries.insert((state.ident(), "$".to_string()), TableEntry::Accept);
                } else {
                    for token in look_ahead_set.iter() {
                        resolve_conflict(
                            &mut entries,
                            &mut conflicts,
                            state.ident(),
                            token,
                            production,
                        );
                    }
                }
            }
        }
        Self {
            entries,
            conflicts,
            state_count: parser_states.len(),
        }
    }

    pub fn entry(&self, state: u32, symbol: &str) -> Option<&TableEntry> {
        self.entries.get(&(state, symbol.to_string()))
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    pub fn state_count(&self) -> usize {
        self.state_count
    }

    pub fn dump_table(&self) -> String {
        let mut dump = String::new();
        for ((state, symbol), entry) in self.entries.iter() {
            dump += &format!("state {} on symbol {}: {}\n", state, symbol, entry);
        }
        dump
    }

    /// Writes the table's string form through `wtr`: one line per entry,
    /// ready for an external emission template to wrap.
    pub fn emit<W: Write>(&self, wtr: &mut W) -> io::Result<()> {
        for ((state, symbol), entry) in self.entries.iter() {
            wtr.write_fmt(format_args!(
                "({}, {:?}): {},\n",
                state,
                symbol,
                entry.emit_text()
            ))?;
        }
        Ok(())
    }
}

fn resolve_conflict(
    entries: &mut BTreeMap<(u32, String), TableEntry>,
    conflicts: &mut Vec<Conflict>,
    state: u32,
    token: &Token,
    production: &Production,
) {
    let key = (state, token.name().to_string());
    let candidate = TableEntry::from_production(production);
    let existing = entries.get(&key).cloned();
    match existing {
        None => {
            entries.insert(key, candidate);
        }
        Some(TableEntry::Shift(_)) => {
            let conflict = Conflict::ShiftReduce {
                state,
                token: token.name().to_string(),
                production: production.to_string(),
            };
            report_warning(&conflict.to_string());
            conflicts.push(conflict);
        }
        Some(TableEntry::Reduce {
            ident,
            left_hand_side,
            right_hand_side,
        }) => {
            let incumbent = format!("{}: {}", left_hand_side, right_hand_side.join(" "));
            let conflict = if production.ident() < ident {
                let conflict = Conflict::ReduceReduce {
                    state,
                    token: token.name().to_string(),
                    kept: production.to_string(),
                    dropped: incumbent,
                };
                entries.insert(key, candidate);
                conflict
            } else {
                Conflict::ReduceReduce {
                    state,
                    token: token.name().to_string(),
                    kept: incumbent,
                    dropped: production.to_string(),
                }
            };
            report_warning(&conflict.to_string());
            conflicts.push(conflict);
        }
        Some(TableEntry::Accept) => {
            // a grammar that can cycle back to its start symbol asks to
            // reduce where the augmentation accepts: accept stays
            let conflict = Conflict::ReduceReduce {
                state,
                token: token.name().to_string(),
                kept: "accept".to_string(),
                dropped: production.to_string(),
            };
            report_warning(&conflict.to_string());
            conflicts.push(conflict);
        }
        Some(TableEntry::Goto(_)) => {
            // terminal and non-terminal names can never collide
            panic!("malformed parse table: ({}, {})", state, token)
        }
    }
}

/// A generated parser: the specification it came from, the canonical state
/// collection and the finished table the driver runs on.
#[derive(Debug)]
pub struct Clr1Parser {
    specification: Specification,
    parser_states: Vec<ParserState>,
    table: ParseTable,
}

impl From<Specification> for Clr1Parser {
    /// Builds the canonical collection.  State 0 is the closed augmentation
    /// kernel; each unprocessed state is forked by the symbol after the
    /// dot, goto kernels are closed and matched against every existing
    /// state's whole item set before a fresh ident is allocated.
    fn from(specification: Specification) -> Self {
        let start_item_key = GrammarItemKey::from(specification.augmented_production());
        let mut start_look_ahead_set = TokenSet::new();
        start_look_ahead_set.insert(&Token::End);
        let mut map = BTreeMap::<GrammarItemKey, TokenSet>::new();
        map.insert(start_item_key, start_look_ahead_set);
        let start_items = specification.closure(GrammarItemSet::from(map));
        let mut parser_states = vec![ParserState::new(0, start_items)];
        while let Some(unprocessed_state) = parser_states
            .iter()
            .find(|x| !x.is_processed())
            .cloned()
        {
            unprocessed_state.mark_as_processed();
            let mut already_done = BTreeSet::<Symbol>::new();
            for item_key in unprocessed_state.irreducible_key_set().iter() {
                let symbol = item_key.next_symbol().expect("not reducible").clone();
                if !already_done.insert(symbol.clone()) {
                    continue;
                }
                let kernel = unprocessed_state.generate_goto_kernel(&symbol);
                let item_set = specification.closure(kernel);
                let goto_state = if let Some(equivalent_state) =
                    parser_states.iter().find(|x| x.has_item_set(&item_set))
                {
                    equivalent_state.clone()
                } else {
                    let ident = parser_states.len() as u32;
                    let parser_state = ParserState::new(ident, item_set);
                    parser_states.push(parser_state.clone());
                    parser_state
                };
                unprocessed_state.add_transition(symbol, goto_state);
            }
        }
        let table = ParseTable::build(&parser_states);
        Self {
            specification,
            parser_states,
            table,
        }
    }
}

impl Clr1Parser {
    pub fn new(text: &str, start: &str) -> Result<Self, Error> {
        Ok(Clr1Parser::from(Specification::new(text, start)?))
    }

    pub fn specification(&self) -> &Specification {
        &self.specification
    }

    pub fn table(&self) -> &ParseTable {
        &self.table
    }

    /// Surrenders the table alone, dropping the state collection.  The
    /// table is plain data, so this is the form to keep in a static.
    pub fn into_table(self) -> ParseTable {
        self.table
    }

    pub fn conflicts(&self) -> &[Conflict] {
        self.table.conflicts()
    }

    pub fn state_count(&self) -> usize {
        self.parser_states.len()
    }

    pub fn parse(&self, lexemes: &[Lexeme], build_tree: bool) -> Result<Vec<ParseTree>, crate::parser::Error> {
        self.table.parse(lexemes, build_tree)
    }

    pub fn parse_with<R: Reductions>(
        &self,
        lexemes: &[Lexeme],
        reductions: &mut R,
    ) -> Result<Vec<R::Value>, crate::parser::Error> {
        self.table.parse_with(lexemes, reductions)
    }

    pub fn dump_states(&self) -> String {
        let mut dump = "Productions:\n".to_string();
        dump += &format!("  {}\n", self.specification.augmented_production());
        for production in self.specification.productions() {
            dump += &format!("  {}\n", production);
        }
        for parser_state in self.parser_states.iter() {
            dump += &parser_state.description();
        }
        dump
    }

    pub fn dump_table(&self) -> String {
        self.table.dump_table()
    }

    pub fn emit<W: Write>(&self, wtr: &mut W) -> io::Result<()> {
        self.table.emit(wtr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARITHMETIC: &str = "\
        expr: expr PLUS term | term.
        term: term STAR factor | factor.
        factor: LPAREN expr RPAREN | NUM.
    ";

    #[test]
    fn canonical_collection_has_no_duplicate_states() {
        let parser = Clr1Parser::new(ARITHMETIC, "expr").unwrap();
        assert!(parser.conflicts().is_empty());
        for (index, state) in parser.parser_states.iter().enumerate() {
            for other in parser.parser_states[index + 1..].iter() {
                assert!(
                    !state.has_equal_items(other),
                    "states {} and {} share an item set",
                    state.ident(),
                    other.ident()
                );
            }
        }
    }

    #[test]
    fn table_is_reproducible() {
        let first = Clr1Parser::new(ARITHMETIC, "expr").unwrap();
        let second = Clr1Parser::new(ARITHMETIC, "expr").unwrap();
        assert_eq!(first.dump_table(), second.dump_table());
        assert_eq!(first.dump_states(), second.dump_states());
        let mut first_emission = Vec::new();
        first.emit(&mut first_emission).unwrap();
        let mut second_emission = Vec::new();
        second.emit(&mut second_emission).unwrap();
        assert_eq!(first_emission, second_emission);
        assert!(!first_emission.is_empty());
    }

    #[test]
    fn shift_is_preferred_over_reduce() {
        // the dangling else: after "IF stmt" with ELSE pending the table
        // must shift, and say so exactly once
        let parser = Clr1Parser::new(
            "stmt: IF stmt ELSE stmt | IF stmt | OTHER.",
            "stmt",
        )
        .unwrap();
        let conflicts = parser.conflicts();
        assert_eq!(conflicts.len(), 1);
        match &conflicts[0] {
            Conflict::ShiftReduce { token, .. } => assert_eq!(token, "ELSE"),
            other => panic!("expected a shift/reduce conflict, got {}", other),
        }
        let lexemes: Vec<Lexeme> = vec!["IF", "IF", "OTHER", "ELSE", "OTHER"]
            .into_iter()
            .map(Lexeme::from)
            .collect();
        let forest = parser.parse(&lexemes, true).unwrap();
        assert_eq!(forest.len(), 1);
    }

    #[test]
    fn earlier_production_wins_reduce_reduce() {
        let parser = Clr1Parser::new("a: A | b. b: A.", "a").unwrap();
        let conflicts = parser.conflicts();
        assert_eq!(conflicts.len(), 1);
        match &conflicts[0] {
            Conflict::ReduceReduce { token, kept, .. } => {
                assert_eq!(token, "$");
                assert_eq!(kept, "a: A");
            }
            other => panic!("expected a reduce/reduce conflict, got {}", other),
        }
        let lexemes = vec![Lexeme::from("A")];
        let forest = parser.parse(&lexemes, true).unwrap();
        match &forest[0] {
            ParseTree::Node { lhs, children } => {
                assert_eq!(lhs, "a");
                assert_eq!(children.len(), 1);
            }
            other => panic!("expected a node, got {:?}", other),
        }
    }

    #[test]
    fn cycling_back_to_the_start_symbol_keeps_accept() {
        let parser = Clr1Parser::new("s: a | B. a: s.", "s").unwrap();
        assert_eq!(parser.conflicts().len(), 1);
        match &parser.conflicts()[0] {
            Conflict::ReduceReduce { token, kept, .. } => {
                assert_eq!(token, "$");
                assert_eq!(kept, "accept");
            }
            other => panic!("expected a reduce/reduce conflict, got {}", other),
        }
        let forest = parser.parse(&[Lexeme::from("B")], true).unwrap();
        assert_eq!(forest.len(), 1);
    }

    #[test]
    fn dumps_mention_every_state() {
        let parser = Clr1Parser::new("s: A.", "s").unwrap();
        let dump = parser.dump_states();
        for ident in 0..parser.state_count() {
            assert!(dump.contains(&format!("State<{}>", ident)));
        }
        let dump = parser.dump_table();
        assert!(dump.contains("state 0 on symbol A: shift and goto state"));
        assert!(dump.contains("accept"));
    }
}
