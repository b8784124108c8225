//! Interning, scope, and type layer (§4.1-§4.3, §4.7).
//!
//! This crate owns the two structurally-deduplicated arenas (representation
//! spellings and modes) and the scope discipline that binds one to the
//! other. It has no notion of tokens or AST nodes — the parser (`rucc-par`)
//! drives these structures while building the tree, interleaving `intern`,
//! `bind`, and `add` calls with its own grammar productions (§3 data flow).

pub mod error;
pub mod mode;
pub mod name_table;
pub mod symtab;

pub use error::{SemError, SemResult};
pub use mode::{ModeId, ModeTag, TypeEngine};
pub use name_table::{Binding, NameTable, ReprId, Representation};
pub use symtab::{SymId, SymbolKind, SymbolRecord, SymbolTable};

use rucc_util::Symbol;

/// Aggregates the name table, type engine, and symbol table that together
/// make up the interning/scope layer of a single compilation unit (Design
/// Note 9.3: one value passed by `&mut`, never a process-wide singleton).
#[derive(Default)]
pub struct Sema {
    pub names: NameTable,
    pub modes: TypeEngine,
    pub symbols: SymbolTable,
}

impl Sema {
    pub fn new() -> Self {
        Self {
            names: NameTable::new(),
            modes: TypeEngine::new(),
            symbols: SymbolTable::new(),
        }
    }

    pub fn intern(&mut self, symbol: Symbol) -> ReprId {
        self.names.intern(symbol)
    }

    /// Bind `repr`, consulting the mode arena for the allocation width of
    /// `Variable`/`FunctionParameter` kinds.
    pub fn bind(
        &mut self,
        repr: ReprId,
        kind: SymbolKind,
        mode: Option<ModeId>,
    ) -> SemResult<SymId> {
        let size = mode.map_or(0, |m| self.modes.size_of(m));
        self.symbols.bind(&mut self.names, repr, kind, mode, size)
    }

    pub fn enter_block(&mut self) {
        self.symbols.enter_block();
    }

    pub fn exit_block(&mut self) -> SemResult<()> {
        self.symbols.exit_block(&mut self.names)
    }

    pub fn enter_function(&mut self) {
        self.symbols.enter_function();
    }

    pub fn exit_function(&mut self) -> SemResult<i32> {
        self.symbols.exit_function(&mut self.names)
    }

    /// `goto repr;` (§4.3): binds or reuses `repr`'s label symbol.
    pub fn goto_label(&mut self, repr: ReprId) -> SymId {
        self.symbols.goto_label(&mut self.names, repr)
    }

    /// `repr:` label definition (§4.3): resolves a pending `goto`, or
    /// binds a fresh already-resolved label.
    pub fn define_label(&mut self, repr: ReprId) -> SemResult<SymId> {
        self.symbols.define_label(&mut self.names, repr)
    }

    /// Semantic check (§4.7): `main` must be bound to a function
    /// definition, and every predeclared function must have been defined.
    /// Diagnostics are returned rather than mutating any tree.
    pub fn check(&self) -> Vec<SemError> {
        let mut errors = Vec::new();

        // "main" is looked up, not specially reserved in the table itself
        // (§10: the zero-means-main encoding is the original's overloaded
        // slot; here it is just an ordinary representation).
        let main_is_defined = matches!(
            self.names.binding_of_symbol(Symbol::intern("main")),
            Some(Binding::Bound(sym)) if self.symbols.get(sym).kind == SymbolKind::FunctionDefinition
        );
        if !main_is_defined {
            errors.push(SemError::NoMain);
        }

        for repr in self.symbols.pending_predeclarations() {
            errors.push(SemError::PredeclaredButUndefined(self.names.symbol(repr)));
        }

        for repr in self.symbols.pending_labels() {
            errors.push(SemError::UndefinedLabel(self.names.symbol(repr)));
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_main_is_reported() {
        let sema = Sema::new();
        let errors = sema.check();
        assert!(errors.contains(&SemError::NoMain));
    }

    #[test]
    fn defined_main_clears_no_main() {
        let mut sema = Sema::new();
        let main = sema.intern(Symbol::intern("main"));
        sema.bind(main, SymbolKind::FunctionDefinition, None).unwrap();
        let errors = sema.check();
        assert!(!errors.contains(&SemError::NoMain));
    }

    #[test]
    fn dangling_predeclaration_is_reported() {
        let mut sema = Sema::new();
        let f = sema.intern(Symbol::intern("f_sema_dangling"));
        sema.bind(f, SymbolKind::FunctionPredeclaration, None).unwrap();
        let errors = sema.check();
        assert!(errors.contains(&SemError::PredeclaredButUndefined(sema.names.symbol(f))));
    }

    #[test]
    fn goto_with_no_matching_label_is_reported() {
        let mut sema = Sema::new();
        let l = sema.intern(Symbol::intern("l_sema_dangling_goto"));
        sema.goto_label(l);
        let errors = sema.check();
        assert!(errors.contains(&SemError::UndefinedLabel(sema.names.symbol(l))));
    }

    #[test]
    fn goto_with_a_matching_label_is_not_reported() {
        let mut sema = Sema::new();
        let l = sema.intern(Symbol::intern("l_sema_resolved_goto"));
        sema.goto_label(l);
        sema.define_label(l).unwrap();
        let errors = sema.check();
        assert!(!errors.iter().any(|e| matches!(e, SemError::UndefinedLabel(_))));
    }
}
