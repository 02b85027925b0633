use crate::ast::SyntaxTree;
use std::collections::{BTreeMap, BTreeSet};

/// A DFA state: the set of leaf positions it stands for and its outgoing
/// transitions.  States are compared by composition; idents are dense and
/// transitions hold idents, never references.
#[derive(Debug, Clone)]
pub struct DfaState {
    ident: usize,
    composition: BTreeSet<usize>,
    transitions: BTreeMap<u8, usize>,
}

impl DfaState {
    pub fn ident(&self) -> usize {
        self.ident
    }

    pub fn composition(&self) -> &BTreeSet<usize> {
        &self.composition
    }
}

/// The automaton compiled from an annotated syntax tree.  State 0 is the
/// initial state (the root's firstpos); a state accepts when its
/// composition holds the sentinel's position.
#[derive(Debug, Clone)]
pub struct Dfa {
    states: Vec<DfaState>,
    final_position: usize,
}

impl Dfa {
    /// The worklist construction: for each unmarked state and each letter
    /// of the alphabet, the union of the followpos sets of the state's
    /// positions labelled with that letter either names an existing state
    /// or founds a new one.
    pub fn build(tree: &SyntaxTree, initial_composition: BTreeSet<usize>, final_position: usize) -> Self {
        let mut states = vec![DfaState {
            ident: 0,
            composition: initial_composition,
            transitions: BTreeMap::new(),
        }];
        let mut unmarked = 0;
        while unmarked < states.len() {
            let current_composition = states[unmarked].composition.clone();
            for letter in tree.alphabet().iter().cloned() {
                let mut composition = BTreeSet::new();
                for position in current_composition.iter() {
                    if tree.leaf_byte(*position) == Some(letter) {
                        if let Some(followers) = tree.followpos(*position) {
                            composition.extend(followers.iter().cloned());
                        }
                    }
                }
                if composition.is_empty() {
                    continue;
                }
                let target = match states
                    .iter()
                    .position(|state| state.composition == composition)
                {
                    Some(existing) => existing,
                    None => {
                        let ident = states.len();
                        states.push(DfaState {
                            ident,
                            composition,
                            transitions: BTreeMap::new(),
                        });
                        ident
                    }
                };
                states[unmarked].transitions.insert(letter, target);
            }
            unmarked += 1;
        }
        Self {
            states,
            final_position,
        }
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn transition(&self, state: usize, byte: u8) -> Option<usize> {
        self.states[state].transitions.get(&byte).cloned()
    }

    pub fn is_accepting(&self, state: usize) -> bool {
        self.states[state].composition.contains(&self.final_position)
    }

    pub fn dump_states(&self) -> String {
        let mut dump = String::new();
        for state in self.states.iter() {
            dump += &format!("state {:?}:\n----------------\n", state.composition);
            for (byte, target) in state.transitions.iter() {
                dump += &format!(
                    "goto state {:?} upon '{}'\n",
                    self.states[*target].composition,
                    char::from(*byte).escape_default()
                );
            }
            dump += "\n";
        }
        dump
    }
}
