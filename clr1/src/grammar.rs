// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use crate::production::{GrammarItemKey, GrammarItemSet, Production};
use crate::symbol::{Symbol, SymbolTable, TokenSet};
use std::fmt;
use std::io::{stderr, Write};

pub fn report_error(what: &str) {
    writeln!(stderr(), "Error: {}.", what).expect("what?");
}

pub fn report_warning(what: &str) {
    writeln!(stderr(), "Warning: {}.", what).expect("what?");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    MissingColon(String),
    MissingLeftHandSide(String),
    EmptyAlternative(String),
    MisplacedEpsilon(String),
    InvalidSymbol(String, String),
    UndefinedNonTerminal(String),
    UnknownStartSymbol(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingColon(text) => {
                write!(f, "Production \"{}\" has no colon", text)
            }
            Error::MissingLeftHandSide(text) => {
                write!(f, "Production \"{}\" has no left hand side", text)
            }
            Error::EmptyAlternative(text) => {
                write!(
                    f,
                    "Production \"{}\" has an alternative with no symbols (write \"@\" for an empty one)",
                    text
                )
            }
            Error::MisplacedEpsilon(text) => {
                write!(
                    f,
                    "Production \"{}\" uses \"@\" inside a symbol sequence",
                    text
                )
            }
            Error::InvalidSymbol(name, text) => {
                write!(
                    f,
                    "Symbol \"{}\" in production \"{}\" starts with neither an uppercase nor a lowercase letter",
                    name, text
                )
            }
            Error::UndefinedNonTerminal(name) => {
                write!(f, "Non terminal \"{}\" is used but never defined", name)
            }
            Error::UnknownStartSymbol(name) => {
                write!(f, "Start symbol \"{}\" has no productions", name)
            }
        }
    }
}

/// A grammar read from its textual notation: productions terminated by `.`,
/// alternatives separated by `|`, symbols separated by whitespace and `@`
/// denoting the empty string.  A symbol is a terminal when its first
/// character is uppercase and a non-terminal when it is lowercase.
#[derive(Debug)]
pub struct Specification {
    pub symbol_table: SymbolTable,
    productions: Vec<Production>,
    augmented_production: Production,
}

impl Specification {
    pub fn new(text: &str, start: &str) -> Result<Self, Error> {
        let mut symbol_table = SymbolTable::default();
        let mut productions = vec![];
        for piece in text.replace('\n', "").split('.') {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }
            let (lhs_text, alternatives) = match piece.split_once(':') {
                Some(split) => split,
                None => return Err(Error::MissingColon(piece.to_string())),
            };
            let lhs_name = lhs_text.trim();
            if lhs_name.is_empty() {
                return Err(Error::MissingLeftHandSide(piece.to_string()));
            }
            if !starts_lowercase(lhs_name) {
                return Err(Error::InvalidSymbol(
                    lhs_name.to_string(),
                    piece.to_string(),
                ));
            }
            let left_hand_side = symbol_table.non_terminal_defined(lhs_name);
            for alternative in alternatives.split('|') {
                let names: Vec<&str> = alternative.split_whitespace().collect();
                if names.is_empty() {
                    return Err(Error::EmptyAlternative(piece.to_string()));
                }
                let mut right_hand_side = vec![];
                for name in names.iter() {
                    if *name == "@" {
                        if names.len() > 1 {
                            return Err(Error::MisplacedEpsilon(piece.to_string()));
                        }
                        right_hand_side.push(Symbol::Epsilon);
                    } else if starts_uppercase(name) {
                        right_hand_side.push(Symbol::from(&symbol_table.token_used(name)));
                    } else if starts_lowercase(name) {
                        right_hand_side.push(Symbol::from(&symbol_table.non_terminal_used(name)));
                    } else {
                        return Err(Error::InvalidSymbol(name.to_string(), piece.to_string()));
                    }
                }
                let ident = productions.len() as i32;
                productions.push(Production::new(ident, left_hand_side.clone(), right_hand_side));
            }
        }

        let start_non_terminal = match symbol_table.non_terminal(start) {
            Some(non_terminal) if !non_terminal.is_undefined() => non_terminal.clone(),
            _ => return Err(Error::UnknownStartSymbol(start.to_string())),
        };
        start_non_terminal.mark_used();
        let augmented_production = Production::new(
            -1,
            symbol_table.start_non_terminal().clone(),
            vec![Symbol::from(&start_non_terminal)],
        );

        for non_terminal in symbol_table.non_terminals() {
            if non_terminal.is_undefined() {
                return Err(Error::UndefinedNonTerminal(non_terminal.name().to_string()));
            }
            if non_terminal.is_unused() {
                report_warning(&format!(
                    "Non terminal \"{}\" is not used",
                    non_terminal.name()
                ));
            }
        }

        let specification = Self {
            symbol_table,
            productions,
            augmented_production,
        };
        specification.compute_first_sets();
        Ok(specification)
    }

    pub fn productions(&self) -> impl Iterator<Item = &Production> {
        self.productions.iter()
    }

    pub fn augmented_production(&self) -> &Production {
        &self.augmented_production
    }

    /// The iterative FIRST fixpoint.  Per pass every production contributes
    /// the FIRST data of its right hand side to its left hand side; the
    /// sets only ever grow and the loop stops on the first pass that adds
    /// nothing.
    fn compute_first_sets(&self) {
        let mut additions_made = true;
        while additions_made {
            additions_made = false;
            let all_productions =
                std::iter::once(&self.augmented_production).chain(self.productions.iter());
            for production in all_productions {
                let mut token_set = TokenSet::new();
                let mut transparent = true;
                if production.is_epsilon() {
                    // nothing to scan: the production is transparent
                } else {
                    for symbol in production.right_hand_side_symbols() {
                        match symbol {
                            Symbol::Terminal(token) => {
                                token_set.insert(token);
                                transparent = false;
                                break;
                            }
                            Symbol::NonTerminal(non_terminal) => {
                                let firsts_data = non_terminal.firsts_data();
                                token_set |= &firsts_data.token_set;
                                if !firsts_data.transparent {
                                    transparent = false;
                                    break;
                                }
                            }
                            Symbol::Epsilon => {
                                debug_assert!(false, "epsilon must be the whole alternative");
                            }
                        }
                    }
                }
                if production
                    .left_hand_side()
                    .add_firsts(&token_set, transparent)
                {
                    additions_made = true;
                }
            }
        }
    }

    /// Closes an item set: for every item with the dot before a
    /// non-terminal `B`, every production of `B` joins the set with the
    /// FIRST of the dotted tail followed by the item's lookahead.
    pub fn closure(&self, mut closure_set: GrammarItemSet) -> GrammarItemSet {
        let mut additions_made = true;
        while additions_made {
            additions_made = false;
            // Closables extraction as a new separate map necessary to avoid borrow conflict
            for (item_key, look_ahead_set) in closure_set.closable_set() {
                if let Some(Symbol::NonTerminal(prospective_lhs)) = item_key.next_symbol() {
                    for look_ahead_symbol in look_ahead_set.iter() {
                        let firsts =
                            TokenSet::first_sequence(item_key.rhs_tail(), look_ahead_symbol);
                        for production in self
                            .productions
                            .iter()
                            .filter(|x| x.left_hand_side() == prospective_lhs)
                        {
                            let prospective_key = GrammarItemKey::from(production);
                            if let Some(set) = closure_set.get_mut(&prospective_key) {
                                let len = set.len();
                                *set |= &firsts;
                                additions_made = additions_made || set.len() > len;
                            } else {
                                closure_set.insert(prospective_key, firsts.clone());
                                additions_made = true;
                            }
                        }
                    }
                } else {
                    debug_assert!(false, "closable items have a non terminal next");
                }
            }
        }
        closure_set
    }
}

fn starts_uppercase(name: &str) -> bool {
    name.chars().next().map_or(false, |c| c.is_ascii_uppercase())
}

fn starts_lowercase(name: &str) -> bool {
    name.chars().next().map_or(false, |c| c.is_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Token;
    use std::collections::BTreeMap;

    #[test]
    fn ingestion_rejects_malformed_text() {
        assert_eq!(
            Specification::new("expr NUM.", "expr").unwrap_err(),
            Error::MissingColon("expr NUM".to_string())
        );
        assert_eq!(
            Specification::new(": NUM.", "expr").unwrap_err(),
            Error::MissingLeftHandSide(": NUM".to_string())
        );
        assert_eq!(
            Specification::new("expr: NUM | .", "expr").unwrap_err(),
            Error::EmptyAlternative("expr: NUM |".to_string())
        );
        assert_eq!(
            Specification::new("expr: NUM @ NUM.", "expr").unwrap_err(),
            Error::MisplacedEpsilon("expr: NUM @ NUM".to_string())
        );
        assert_eq!(
            Specification::new("expr: 2UM.", "expr").unwrap_err(),
            Error::InvalidSymbol("2UM".to_string(), "expr: 2UM".to_string())
        );
        assert_eq!(
            Specification::new("expr: other NUM.", "expr").unwrap_err(),
            Error::UndefinedNonTerminal("other".to_string())
        );
        assert_eq!(
            Specification::new("expr: NUM.", "missing").unwrap_err(),
            Error::UnknownStartSymbol("missing".to_string())
        );
    }

    #[test]
    fn production_numbering_follows_text_order() {
        let specification =
            Specification::new("expr: expr PLUS term | term. term: NUM.", "expr").unwrap();
        let idents: Vec<i32> = specification.productions().map(|x| x.ident()).collect();
        assert_eq!(idents, vec![0, 1, 2]);
        assert_eq!(specification.augmented_production().ident(), -1);
        assert_eq!(
            format!("{}", specification.augmented_production()),
            ".start: expr"
        );
    }

    #[test]
    fn first_sets_reach_through_transparent_non_terminals() {
        let specification = Specification::new("s: a B. a: A | @.", "s").unwrap();
        let a_data = specification
            .symbol_table
            .non_terminal("a")
            .unwrap()
            .firsts_data();
        assert!(a_data.transparent);
        assert_eq!(format!("{}", a_data.token_set), "TokenSet{A}");
        let s_data = specification
            .symbol_table
            .non_terminal("s")
            .unwrap()
            .firsts_data();
        assert!(!s_data.transparent);
        assert_eq!(format!("{}", s_data.token_set), "TokenSet{A, B}");
    }

    #[test]
    fn first_sets_handle_self_reference() {
        let specification = Specification::new("list: list X | @.", "list").unwrap();
        let list_data = specification
            .symbol_table
            .non_terminal("list")
            .unwrap()
            .firsts_data();
        assert!(list_data.transparent);
        assert_eq!(format!("{}", list_data.token_set), "TokenSet{X}");
    }

    #[test]
    fn closure_is_a_fixpoint() {
        let specification = Specification::new(
            "expr: expr PLUS term | term. term: term STAR factor | factor. factor: LPAREN expr RPAREN | NUM.",
            "expr",
        )
        .unwrap();
        let start_set = || {
            let mut look_ahead_set = TokenSet::new();
            look_ahead_set.insert(&Token::End);
            let mut map = BTreeMap::new();
            map.insert(
                GrammarItemKey::from(specification.augmented_production()),
                look_ahead_set,
            );
            GrammarItemSet::from(map)
        };
        let once = specification.closure(start_set());
        // every production of the grammar appears with the dot at the start
        assert_eq!(once.len(), 7);
        let twice = specification.closure(specification.closure(start_set()));
        assert_eq!(once, twice);
    }
}
