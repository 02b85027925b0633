// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use crate::symbol::{NonTerminal, Symbol, TokenSet};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

#[derive(Debug)]
pub struct ProductionData {
    ident: i32,
    left_hand_side: NonTerminal,
    right_hand_side: Vec<Symbol>,
}

/// A production of the grammar.  Productions are numbered in grammar text
/// order starting from 0; the augmentation production `.start: start` is
/// numbered -1.  Conflict resolution prefers the smaller number.
#[derive(Debug, Clone)]
pub struct Production(Rc<ProductionData>);

impl Production {
    pub fn new(ident: i32, left_hand_side: NonTerminal, right_hand_side: Vec<Symbol>) -> Self {
        Self(Rc::new(ProductionData {
            ident,
            left_hand_side,
            right_hand_side,
        }))
    }

    pub fn ident(&self) -> i32 {
        self.0.ident
    }

    pub fn len(&self) -> usize {
        self.0.right_hand_side.len()
    }

    /// An epsilon production carries the single marker symbol `@` on its
    /// right hand side.
    pub fn is_epsilon(&self) -> bool {
        matches!(self.0.right_hand_side.as_slice(), [Symbol::Epsilon])
    }

    pub fn left_hand_side(&self) -> &NonTerminal {
        &self.0.left_hand_side
    }

    pub fn right_hand_side_symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.0.right_hand_side.iter()
    }

    pub fn right_hand_side_names(&self) -> Vec<String> {
        self.0
            .right_hand_side
            .iter()
            .map(|symbol| symbol.name().to_string())
            .collect()
    }
}

impl PartialEq for Production {
    fn eq(&self, other: &Self) -> bool {
        self.0.ident == other.0.ident
    }
}

impl Eq for Production {}

impl PartialOrd for Production {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.0.ident.partial_cmp(&other.0.ident)
    }
}

impl Ord for Production {
    fn cmp(&self, other: &Self) -> Ordering {
        self.partial_cmp(other).unwrap()
    }
}

impl std::fmt::Display for Production {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut string = format!("{}:", self.left_hand_side().name());
        for symbol in self.0.right_hand_side.iter() {
            string += &format!(" {}", symbol);
        }
        write!(f, "{}", string)
    }
}

/// A dotted production.  The lookahead set lives beside the key in a
/// `GrammarItemSet`, so two items with the same core share one entry.
#[derive(Debug, PartialOrd, Ord, PartialEq, Eq, Clone)]
pub struct GrammarItemKey {
    production: Production,
    dot: usize,
}

impl From<&Production> for GrammarItemKey {
    fn from(production: &Production) -> Self {
        // an epsilon production has nothing to parse: born reducible
        let dot = if production.is_epsilon() { 1 } else { 0 };
        Self {
            production: production.clone(),
            dot,
        }
    }
}

impl GrammarItemKey {
    pub fn production(&self) -> &Production {
        &self.production
    }

    pub fn shifted(&self) -> Self {
        debug_assert!(self.dot < self.production.len());
        let dot = self.dot + 1;
        Self {
            production: self.production.clone(),
            dot,
        }
    }

    pub fn is_closable(&self) -> bool {
        if let Some(symbol) = self.production.0.right_hand_side.get(self.dot) {
            symbol.is_non_terminal()
        } else {
            false
        }
    }

    pub fn is_reducible(&self) -> bool {
        self.dot >= self.production.0.right_hand_side.len()
    }

    pub fn next_symbol(&self) -> Option<&Symbol> {
        self.production.0.right_hand_side.get(self.dot)
    }

    pub fn next_symbol_is(&self, symbol: &Symbol) -> bool {
        if let Some(next_symbol) = self.next_symbol() {
            next_symbol == symbol
        } else {
            false
        }
    }

    pub fn rhs_tail(&self) -> &[Symbol] {
        &self.production.0.right_hand_side[self.dot + 1..]
    }
}

impl std::fmt::Display for GrammarItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut string = format!("{}:", self.production.0.left_hand_side.name());
        for (index, symbol) in self.production.0.right_hand_side.iter().enumerate() {
            if index == self.dot {
                string += &format!(" . {}", symbol);
            } else {
                string += &format!(" {}", symbol);
            }
        }
        if self.dot >= self.production.0.right_hand_side.len() {
            string += " . ";
        }
        write!(f, "{}", string)
    }
}

/// The items of one parser state: dotted productions mapped to their
/// lookahead sets.  Equality is over the whole map, so states compare
/// lookaheads as well as cores.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct GrammarItemSet(BTreeMap<GrammarItemKey, TokenSet>);

impl From<BTreeMap<GrammarItemKey, TokenSet>> for GrammarItemSet {
    fn from(map: BTreeMap<GrammarItemKey, TokenSet>) -> Self {
        Self(map)
    }
}

impl GrammarItemSet {
    pub fn iter(&self) -> impl Iterator<Item = (&GrammarItemKey, &TokenSet)> {
        self.0.iter()
    }

    pub fn closable_set(&self) -> Vec<(GrammarItemKey, TokenSet)> {
        let mut closables = vec![];
        for (key, set) in self.0.iter().filter(|x| x.0.is_closable()) {
            closables.push((key.clone(), set.clone()));
        }
        closables
    }

    pub fn generate_goto_kernel(&self, symbol: &Symbol) -> GrammarItemSet {
        let mut map = BTreeMap::new();
        for (item_key, look_ahead_set) in self.0.iter() {
            if item_key.next_symbol_is(symbol) {
                map.insert(item_key.shifted(), look_ahead_set.clone());
            }
        }
        GrammarItemSet(map)
    }

    pub fn irreducible_key_set(&self) -> BTreeSet<GrammarItemKey> {
        self.0
            .keys()
            .filter(|x| !x.is_reducible())
            .cloned()
            .collect()
    }

    pub fn reducible_items(&self) -> Vec<(GrammarItemKey, TokenSet)> {
        self.0
            .iter()
            .filter(|x| x.0.is_reducible())
            .map(|(key, set)| (key.clone(), set.clone()))
            .collect()
    }

    pub fn get_mut(&mut self, key: &GrammarItemKey) -> Option<&mut TokenSet> {
        self.0.get_mut(key)
    }

    pub fn insert(&mut self, key: GrammarItemKey, look_ahead_set: TokenSet) -> Option<TokenSet> {
        self.0.insert(key, look_ahead_set)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}
