// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>
use std::{
    cell::{Cell, RefCell},
    cmp::Ordering,
    collections::{btree_set, BTreeMap, BTreeSet},
    fmt,
    iter::FromIterator,
    ops::{BitOr, BitOrAssign},
    rc::Rc,
};

#[derive(Debug, Default)]
pub struct TokenData {
    name: String,
}

/// A terminal symbol.  The end of input marker `$` is a distinguished
/// member of every grammar's terminal set.
#[derive(Debug, Clone)]
pub enum Token {
    Named(Rc<TokenData>),
    End,
}

impl Token {
    pub fn new(name: &str) -> Self {
        let mut token_data = TokenData::default();
        token_data.name = name.to_string();
        Token::Named(Rc::new(token_data))
    }

    pub fn name(&self) -> &str {
        match self {
            Token::Named(token_data) => &token_data.name,
            Token::End => "$",
        }
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for Token {}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.name().partial_cmp(other.name())
    }
}

impl Ord for Token {
    fn cmp(&self, other: &Self) -> Ordering {
        self.partial_cmp(other).unwrap()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TokenSet(BTreeSet<Token>);

impl TokenSet {
    pub fn new() -> Self {
        TokenSet::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.len() == 0
    }

    pub fn contains(&self, token: &Token) -> bool {
        self.0.contains(token)
    }

    pub fn insert(&mut self, token: &Token) -> bool {
        self.0.insert(token.clone())
    }

    pub fn iter(&self) -> btree_set::Iter<Token> {
        self.0.iter()
    }

    /// FIRST of the symbol string `symbols` followed by the single token
    /// `lookahead`.  Transparent (nullable) non-terminals pass the scan on
    /// to their successor; a fully transparent string yields the lookahead.
    pub fn first_sequence(symbols: &[Symbol], lookahead: &Token) -> TokenSet {
        let mut token_set = TokenSet::new();
        for symbol in symbols.iter() {
            match symbol {
                Symbol::Terminal(token) => {
                    token_set.insert(token);
                    return token_set;
                }
                Symbol::NonTerminal(non_terminal) => {
                    let firsts_data = non_terminal.firsts_data();
                    token_set |= &firsts_data.token_set;
                    if !firsts_data.transparent {
                        return token_set;
                    }
                }
                Symbol::Epsilon => {
                    debug_assert!(false, "epsilon must not appear in a symbol string");
                }
            }
        }
        token_set.insert(lookahead);
        token_set
    }
}

impl BitOrAssign<&Self> for TokenSet {
    fn bitor_assign(&mut self, rhs: &Self) {
        self.0 = self.0.bitor(&rhs.0)
    }
}

impl FromIterator<Token> for TokenSet {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = Token>,
    {
        Self(BTreeSet::<Token>::from_iter(iter))
    }
}

impl fmt::Display for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut set_string = "TokenSet{".to_string();
        for (index, item) in self.iter().enumerate() {
            if index == 0 {
                set_string += &format!("{}", item.name());
            } else {
                set_string += &format!(", {}", item.name());
            }
        }
        set_string += "}";
        write!(f, "{}", set_string)
    }
}

/// The FIRST data for a non-terminal: the terminals that can begin one of
/// its derivations and whether it can derive the empty string.
#[derive(Debug, Clone, Default)]
pub struct FirstsData {
    pub token_set: TokenSet,
    pub transparent: bool,
}

impl fmt::Display for FirstsData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:({})", self.token_set, self.transparent)
    }
}

#[derive(Debug, Default)]
pub struct NonTerminalData {
    name: String,
    firsts_data: RefCell<FirstsData>,
    defined: Cell<bool>,
    used: Cell<bool>,
}

impl PartialEq for NonTerminalData {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for NonTerminalData {}

impl PartialOrd for NonTerminalData {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.name.partial_cmp(&other.name)
    }
}

impl Ord for NonTerminalData {
    fn cmp(&self, other: &Self) -> Ordering {
        self.partial_cmp(other).unwrap()
    }
}

/// A non-terminal symbol.  The augmentation non-terminal `.start` is a
/// distinguished variant so that the accept condition can be recognised.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum NonTerminal {
    Named(Rc<NonTerminalData>),
    Start(Rc<NonTerminalData>),
}

impl NonTerminal {
    pub fn new(name: &str) -> Self {
        let mut non_terminal_data = NonTerminalData::default();
        non_terminal_data.name = name.to_string();
        NonTerminal::Named(Rc::new(non_terminal_data))
    }

    pub fn name(&self) -> &str {
        match self {
            NonTerminal::Named(non_terminal_data) | NonTerminal::Start(non_terminal_data) => {
                &non_terminal_data.name
            }
        }
    }

    pub fn is_start(&self) -> bool {
        match self {
            NonTerminal::Start(_) => true,
            _ => false,
        }
    }

    pub fn is_undefined(&self) -> bool {
        match self {
            NonTerminal::Named(non_terminal_data) => !non_terminal_data.defined.get(),
            NonTerminal::Start(_) => false,
        }
    }

    pub fn is_unused(&self) -> bool {
        match self {
            NonTerminal::Named(non_terminal_data) | NonTerminal::Start(non_terminal_data) => {
                !non_terminal_data.used.get()
            }
        }
    }

    pub fn mark_defined(&self) {
        match self {
            NonTerminal::Named(non_terminal_data) | NonTerminal::Start(non_terminal_data) => {
                non_terminal_data.defined.set(true)
            }
        }
    }

    pub fn mark_used(&self) {
        match self {
            NonTerminal::Named(non_terminal_data) | NonTerminal::Start(non_terminal_data) => {
                non_terminal_data.used.set(true)
            }
        }
    }

    pub fn firsts_data(&self) -> FirstsData {
        match self {
            NonTerminal::Named(non_terminal_data) | NonTerminal::Start(non_terminal_data) => {
                non_terminal_data.firsts_data.borrow().clone()
            }
        }
    }

    /// Merges `token_set` (and the transparency flag) into this
    /// non-terminal's FIRST data.  Returns whether anything was added, which
    /// drives the fixpoint iteration; the data never shrinks.
    pub fn add_firsts(&self, token_set: &TokenSet, transparent: bool) -> bool {
        match self {
            NonTerminal::Named(non_terminal_data) | NonTerminal::Start(non_terminal_data) => {
                let mut firsts_data = non_terminal_data.firsts_data.borrow_mut();
                let len = firsts_data.token_set.len();
                firsts_data.token_set |= token_set;
                let additions_made =
                    firsts_data.token_set.len() > len || (transparent && !firsts_data.transparent);
                firsts_data.transparent = firsts_data.transparent || transparent;
                additions_made
            }
        }
    }
}

impl fmt::Display for NonTerminal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Symbol {
    Terminal(Token),
    NonTerminal(NonTerminal),
    Epsilon,
}

impl From<&Token> for Symbol {
    fn from(token: &Token) -> Self {
        Symbol::Terminal(token.clone())
    }
}

impl From<&NonTerminal> for Symbol {
    fn from(non_terminal: &NonTerminal) -> Self {
        Symbol::NonTerminal(non_terminal.clone())
    }
}

impl Symbol {
    pub fn is_non_terminal(&self) -> bool {
        match self {
            Symbol::NonTerminal(_) => true,
            _ => false,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Symbol::Terminal(token) => token.name(),
            Symbol::NonTerminal(non_terminal) => non_terminal.name(),
            Symbol::Epsilon => "@",
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Interns terminals and non-terminals by name so that every occurrence of
/// a symbol shares one underlying datum.
#[derive(Debug)]
pub struct SymbolTable {
    tokens: BTreeMap<String, Token>,
    non_terminals: BTreeMap<String, NonTerminal>,
    start_non_terminal: NonTerminal,
}

impl Default for SymbolTable {
    fn default() -> Self {
        let mut non_terminal_data = NonTerminalData::default();
        non_terminal_data.name = ".start".to_string();
        Self {
            tokens: BTreeMap::new(),
            non_terminals: BTreeMap::new(),
            start_non_terminal: NonTerminal::Start(Rc::new(non_terminal_data)),
        }
    }
}

impl SymbolTable {
    pub fn start_non_terminal(&self) -> &NonTerminal {
        &self.start_non_terminal
    }

    pub fn token_used(&mut self, name: &str) -> Token {
        if let Some(token) = self.tokens.get(name) {
            token.clone()
        } else {
            let token = Token::new(name);
            self.tokens.insert(name.to_string(), token.clone());
            token
        }
    }

    pub fn non_terminal_defined(&mut self, name: &str) -> NonTerminal {
        let non_terminal = self.intern_non_terminal(name);
        non_terminal.mark_defined();
        non_terminal
    }

    pub fn non_terminal_used(&mut self, name: &str) -> NonTerminal {
        let non_terminal = self.intern_non_terminal(name);
        non_terminal.mark_used();
        non_terminal
    }

    fn intern_non_terminal(&mut self, name: &str) -> NonTerminal {
        if let Some(non_terminal) = self.non_terminals.get(name) {
            non_terminal.clone()
        } else {
            let non_terminal = NonTerminal::new(name);
            self.non_terminals
                .insert(name.to_string(), non_terminal.clone());
            non_terminal
        }
    }

    pub fn non_terminal(&self, name: &str) -> Option<&NonTerminal> {
        self.non_terminals.get(name)
    }

    pub fn non_terminals(&self) -> impl Iterator<Item = &NonTerminal> {
        self.non_terminals.values()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_ordering_and_display() {
        let plus = Token::new("PLUS");
        let num = Token::new("NUM");
        assert!(num < plus);
        assert!(Token::End < num);
        assert_eq!(format!("{}", Token::End), "$");
        let mut set = TokenSet::new();
        set.insert(&plus);
        set.insert(&num);
        set.insert(&plus);
        assert_eq!(set.len(), 2);
        assert_eq!(format!("{}", set), "TokenSet{NUM, PLUS}");
    }

    #[test]
    fn interning_shares_data() {
        let mut symbol_table = SymbolTable::default();
        let expr = symbol_table.non_terminal_defined("expr");
        let again = symbol_table.non_terminal_used("expr");
        assert_eq!(expr, again);
        assert!(!again.is_undefined());
        let token_set: TokenSet = vec![Token::new("NUM")].into_iter().collect();
        assert!(expr.add_firsts(&token_set, false));
        assert!(!again.add_firsts(&token_set, false));
        assert_eq!(again.firsts_data().token_set.len(), 1);
    }

    #[test]
    fn first_sequence_skips_transparent_prefix() {
        let mut symbol_table = SymbolTable::default();
        let opt = symbol_table.non_terminal_defined("opt");
        let a_token = symbol_table.token_used("A");
        let mut firsts = TokenSet::new();
        firsts.insert(&a_token);
        opt.add_firsts(&firsts, true);
        let b_token = symbol_table.token_used("B");
        let symbols = [Symbol::from(&opt), Symbol::from(&b_token)];
        let sequence_firsts = TokenSet::first_sequence(&symbols, &Token::End);
        assert!(sequence_firsts.contains(&a_token));
        assert!(sequence_firsts.contains(&b_token));
        assert!(!sequence_firsts.contains(&Token::End));
        let sequence_firsts = TokenSet::first_sequence(&symbols[..1], &Token::End);
        assert!(sequence_firsts.contains(&Token::End));
    }
}
