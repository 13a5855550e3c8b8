use std::collections::HashMap;

use super::vm_writer::Segment;

/// A variable's storage class. The class scope declares `Static` and `Field`
/// variables; the subroutine scope declares `Arg` and `Var`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SymbolKind {
    Static,
    Field,
    Arg,
    Var,
}

impl SymbolKind {
    /// The VM segment variables of this kind live in. This is the only place
    /// the kind-to-segment mapping exists.
    pub fn segment(&self) -> Segment {
        match self {
            SymbolKind::Static => Segment::Static,
            SymbolKind::Field => Segment::This,
            SymbolKind::Arg => Segment::Argument,
            SymbolKind::Var => Segment::Local,
        }
    }

    fn counter_slot(&self) -> usize {
        match self {
            SymbolKind::Static => 0,
            SymbolKind::Field => 1,
            SymbolKind::Arg => 2,
            SymbolKind::Var => 3,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub struct SymbolTableEntry<'a> {
    pub kind: SymbolKind,
    pub ty: &'a str,
    pub index: u16,
}

/// One scope's name-to-variable mapping. An entry's index is the number of
/// same-kind `add` calls that preceded it, counted independently of the map
/// contents so that a duplicate declaration (which overwrites the earlier
/// entry, newest wins) still claims a fresh slot.
pub struct SymbolTable<'a> {
    table: HashMap<&'a str, SymbolTableEntry<'a>>,
    counters: [u16; 4],
}

impl<'a> SymbolTable<'a> {
    pub fn new() -> SymbolTable<'a> {
        SymbolTable {
            table: HashMap::new(),
            counters: [0; 4],
        }
    }

    pub fn add(&mut self, kind: SymbolKind, ty: &'a str, name: &'a str) {
        let index = self.count(kind);
        self.counters[kind.counter_slot()] += 1;
        self.table.insert(name, SymbolTableEntry { kind, ty, index });
    }

    pub fn get(&self, name: &str) -> Option<&SymbolTableEntry<'a>> {
        self.table.get(name)
    }

    pub fn count(&self, kind: SymbolKind) -> u16 {
        self.counters[kind.counter_slot()]
    }

    pub fn reset(&mut self) {
        self.table.clear();
        self.counters = [0; 4];
    }
}
