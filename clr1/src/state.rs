// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use crate::production::{GrammarItemKey, GrammarItemSet};
use crate::symbol::{Symbol, TokenSet};
use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

#[derive(Debug)]
pub struct ParserStateData {
    ident: u32,
    grammar_items: RefCell<GrammarItemSet>,
    transitions: RefCell<BTreeMap<Symbol, ParserState>>,
    processed: Cell<bool>,
}

/// A state of the canonical CLR(1) collection.  Two states are the same
/// state exactly when their closed item sets (lookaheads included) are
/// equal; idents are dense and assigned in discovery order.
#[derive(Debug, Clone)]
pub struct ParserState(Rc<ParserStateData>);

impl PartialEq for ParserState {
    fn eq(&self, other: &Self) -> bool {
        self.0.ident == other.0.ident
    }
}

impl Eq for ParserState {}

impl PartialOrd for ParserState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.0.ident.partial_cmp(&other.0.ident)
    }
}

impl Ord for ParserState {
    fn cmp(&self, other: &Self) -> Ordering {
        self.partial_cmp(other).unwrap()
    }
}

impl ParserState {
    pub fn new(ident: u32, grammar_items: GrammarItemSet) -> Self {
        Self(Rc::new(ParserStateData {
            ident,
            grammar_items: RefCell::new(grammar_items),
            transitions: RefCell::new(BTreeMap::new()),
            processed: Cell::new(false),
        }))
    }

    pub fn ident(&self) -> u32 {
        self.0.ident
    }

    pub fn is_processed(&self) -> bool {
        self.0.processed.get()
    }

    pub fn mark_as_processed(&self) {
        self.0.processed.set(true)
    }

    pub fn has_item_set(&self, item_set: &GrammarItemSet) -> bool {
        *self.0.grammar_items.borrow() == *item_set
    }

    pub fn has_equal_items(&self, other: &ParserState) -> bool {
        *self.0.grammar_items.borrow() == *other.0.grammar_items.borrow()
    }

    pub fn irreducible_key_set(&self) -> BTreeSet<GrammarItemKey> {
        self.0.grammar_items.borrow().irreducible_key_set()
    }

    pub fn reducible_items(&self) -> Vec<(GrammarItemKey, TokenSet)> {
        self.0.grammar_items.borrow().reducible_items()
    }

    pub fn generate_goto_kernel(&self, symbol: &Symbol) -> GrammarItemSet {
        self.0.grammar_items.borrow().generate_goto_kernel(symbol)
    }

    pub fn add_transition(&self, symbol: Symbol, state: ParserState) {
        self.0.transitions.borrow_mut().insert(symbol, state);
    }

    pub fn transition(&self, symbol: &Symbol) -> Option<ParserState> {
        self.0.transitions.borrow().get(symbol).cloned()
    }

    pub fn description(&self) -> String {
        let mut string = format!("State<{}>:\n  Grammar Items:\n", self.ident());
        for (key, look_ahead_set) in self.0.grammar_items.borrow().iter() {
            string += &format!("    {}: {}\n", key, look_ahead_set);
        }
        string += "  Transitions:\n";
        if self.0.transitions.borrow().len() == 0 {
            string += "    <none>\n";
        } else {
            for (symbol, state) in self.0.transitions.borrow().iter() {
                string += &format!("    {} -> State<{}>\n", symbol, state.ident());
            }
        }
        string
    }
}
