//! Name table: the shared spelling interner for keywords and user
//! identifiers (§4.1).
//!
//! A [`Representation`] is the per-spelling record; its current binding is
//! the tagged sum called for by Design Note 9.2 rather than the original's
//! overloaded integer slot (keyword class / user flag / symbol-table offset
//! / "is main"). Lookup is a `HashMap<Symbol, ReprId>` rather than the
//! original's 8-bit hash-chain, per §4.1's note that the chain walk is an
//! implementation detail, not an externally observable property.

use rucc_util::{define_idx, FxHashMap, Symbol};

use crate::symtab::SymId;

define_idx!(ReprId);

/// Current scope binding of a representation.
///
/// `Unbound` covers both "never seen" and "restored after scope exit" —
/// the name table does not distinguish a keyword from a plain unbound user
/// identifier; keyword-ness is a property of the interned [`Symbol`] itself
/// (`Symbol::is_known`), queried independently by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Unbound,
    Bound(SymId),
}

#[derive(Debug, Clone, Copy)]
pub struct Representation {
    pub symbol: Symbol,
    pub binding: Binding,
}

/// Append-only arena mapping spellings to [`Representation`] records.
#[derive(Default)]
pub struct NameTable {
    reprs: rucc_util::IndexVec<ReprId, Representation>,
    index: FxHashMap<Symbol, ReprId>,
}

impl NameTable {
    pub fn new() -> Self {
        Self {
            reprs: rucc_util::IndexVec::new(),
            index: FxHashMap::default(),
        }
    }

    /// Intern `symbol`, returning its representation handle. Idempotent (P1):
    /// two calls with the same symbol return the same handle and the pool
    /// only grows on the first call.
    pub fn intern(&mut self, symbol: Symbol) -> ReprId {
        if let Some(&id) = self.index.get(&symbol) {
            return id;
        }
        let id = self.reprs.push(Representation {
            symbol,
            binding: Binding::Unbound,
        });
        self.index.insert(symbol, id);
        id
    }

    pub fn symbol(&self, repr: ReprId) -> Symbol {
        self.reprs[repr].symbol
    }

    pub fn spelling(&self, repr: ReprId) -> &'static str {
        self.reprs[repr].symbol.as_str()
    }

    pub fn binding(&self, repr: ReprId) -> Binding {
        self.reprs[repr].binding
    }

    /// Look up the binding for a spelling without interning it, used by
    /// checks that must not side-effect the table (e.g. "has `main` been
    /// defined?" when `main` may never have appeared at all).
    pub fn binding_of_symbol(&self, symbol: Symbol) -> Option<Binding> {
        self.index.get(&symbol).map(|&id| self.reprs[id].binding)
    }

    /// Overwrite the current binding, returning the previous one so the
    /// caller (the scope stack) can restore it on scope exit.
    pub fn set_binding(&mut self, repr: ReprId, binding: Binding) -> Binding {
        std::mem::replace(&mut self.reprs[repr].binding, binding)
    }

    pub fn len(&self) -> usize {
        self.reprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reprs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_idempotent() {
        let mut table = NameTable::new();
        let a = table.intern(Symbol::intern("foo_nt"));
        let b = table.intern(Symbol::intern("foo_nt"));
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn fresh_representation_is_unbound() {
        let mut table = NameTable::new();
        let r = table.intern(Symbol::intern("bar_nt"));
        assert_eq!(table.binding(r), Binding::Unbound);
    }

    #[test]
    fn set_binding_returns_previous() {
        let mut table = NameTable::new();
        let r = table.intern(Symbol::intern("baz_nt"));
        let prev = table.set_binding(r, Binding::Bound(SymId(7)));
        assert_eq!(prev, Binding::Unbound);
        assert_eq!(table.binding(r), Binding::Bound(SymId(7)));
    }
}
