//! Scope stack and symbol table (§4.3).
//!
//! A [`SymbolRecord`] is appended every time a representation is bound in
//! some scope; its `previous_binding` field is the shadow chain the
//! original encoded as `i+0`. Scope exit never frees a record — it walks
//! the symbols committed since scope entry and restores each one's
//! representation to its `previous_binding` (P3), exactly mirroring the
//! original's "logical pointer rewind, not a free" (§5).

use rucc_util::{define_idx, FxHashSet, Idx, IndexVec};

use crate::error::{SemError, SemResult};
use crate::mode::ModeId;
use crate::name_table::{Binding, NameTable, ReprId};

define_idx!(SymId);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    FunctionDefinition,
    FunctionPredeclaration,
    Label,
    TypeDefinition,
    FunctionParameter,
}

#[derive(Debug, Clone, Copy)]
pub struct SymbolRecord {
    pub previous_binding: Binding,
    pub repr: ReprId,
    pub mode: Option<ModeId>,
    pub displacement: i32,
    pub kind: SymbolKind,
}

enum ScopeFrameKind {
    Block,
    Function { maxdispl: i32 },
}

struct ScopeFrame {
    kind: ScopeFrameKind,
    saved_cursor: usize,
    saved_displ: i32,
    saved_lg: i32,
}

/// Scope stack + symbol table. Owns the single-threaded allocation state
/// (`displ`, `lg`) the original kept in its global `vm_context` (Design
/// Note 9.3: no process-wide singleton, one value passed by `&mut`).
pub struct SymbolTable {
    symbols: IndexVec<SymId, SymbolRecord>,
    scopes: Vec<ScopeFrame>,
    displ: i32,
    lg: i32,
    /// Functions predeclared but not yet defined (§4.3, §4.7).
    predeclared: FxHashSet<ReprId>,
    /// `goto` targets seen before their matching label (§4.3's zero-mode
    /// sentinel), not yet resolved by a `label:` definition.
    pending_labels: FxHashSet<ReprId>,
}

impl SymbolTable {
    /// Program scope is implicit: globals grow downward from `displ = -3`
    /// (`lg = -1`), per §4.3.
    pub fn new() -> Self {
        Self {
            symbols: IndexVec::new(),
            scopes: Vec::new(),
            displ: -3,
            lg: -1,
            predeclared: FxHashSet::default(),
            pending_labels: FxHashSet::default(),
        }
    }

    fn scope_boundary(&self) -> usize {
        self.scopes.last().map_or(0, |f| f.saved_cursor)
    }

    pub fn enter_block(&mut self) {
        self.scopes.push(ScopeFrame {
            kind: ScopeFrameKind::Block,
            saved_cursor: self.symbols.len(),
            saved_displ: self.displ,
            saved_lg: self.lg,
        });
    }

    pub fn exit_block(&mut self, names: &mut NameTable) -> SemResult<()> {
        let frame = self.scopes.pop().ok_or(SemError::BadScopeExit)?;
        if !matches!(frame.kind, ScopeFrameKind::Block) {
            return Err(SemError::BadScopeExit);
        }
        self.unwind_bindings(names, frame.saved_cursor);
        self.displ = frame.saved_displ;
        self.lg = frame.saved_lg;
        Ok(())
    }

    /// Function scope resets `displ := 3`, `lg := +1` and tracks a
    /// high-water mark used as the frame size on exit.
    pub fn enter_function(&mut self) {
        self.scopes.push(ScopeFrame {
            kind: ScopeFrameKind::Function { maxdispl: 3 },
            saved_cursor: self.symbols.len(),
            saved_displ: self.displ,
            saved_lg: self.lg,
        });
        self.displ = 3;
        self.lg = 1;
    }

    /// Restores the enclosing scope and returns the frame size (the
    /// high-water displacement reached inside the function).
    pub fn exit_function(&mut self, names: &mut NameTable) -> SemResult<i32> {
        let frame = self.scopes.pop().ok_or(SemError::BadScopeExit)?;
        let maxdispl = match frame.kind {
            ScopeFrameKind::Function { maxdispl } => maxdispl,
            ScopeFrameKind::Block => return Err(SemError::BadScopeExit),
        };
        self.unwind_bindings(names, frame.saved_cursor);
        self.displ = frame.saved_displ;
        self.lg = frame.saved_lg;
        Ok(maxdispl)
    }

    fn unwind_bindings(&mut self, names: &mut NameTable, saved_cursor: usize) {
        for idx in (saved_cursor..self.symbols.len()).rev() {
            let sym = SymId(idx as u32);
            let record = self.symbols[sym];
            names.set_binding(record.repr, record.previous_binding);
        }
    }

    /// `ident_add`: bind `repr` to a fresh symbol record in the current
    /// scope. `size` is the allocation width in VM cells for `Variable` /
    /// `FunctionParameter` kinds (ignored otherwise) and is supplied by the
    /// caller via [`crate::mode::TypeEngine::size_of`], keeping the symbol
    /// table decoupled from the mode arena.
    pub fn bind(
        &mut self,
        names: &mut NameTable,
        repr: ReprId,
        kind: SymbolKind,
        mode: Option<ModeId>,
        size: usize,
    ) -> SemResult<SymId> {
        let boundary = self.scope_boundary();
        let current = names.binding(repr);
        if let Binding::Bound(existing) = current {
            if existing.index() >= boundary {
                let existing_kind = self.symbols[existing].kind;
                let is_predecl_resolution = existing_kind == SymbolKind::FunctionPredeclaration
                    && matches!(kind, SymbolKind::FunctionDefinition);
                if !is_predecl_resolution {
                    return Err(SemError::DuplicateDefinition(names.symbol(repr)));
                }
                self.predeclared.remove(&repr);
            }
        }

        let displacement = match kind {
            SymbolKind::Variable | SymbolKind::FunctionParameter => {
                let d = self.displ;
                self.displ += self.lg * size as i32;
                if let Some(frame) = self.scopes.last_mut() {
                    if let ScopeFrameKind::Function { maxdispl } = &mut frame.kind {
                        *maxdispl = (*maxdispl).max(self.displ);
                    }
                }
                d
            }
            _ => 0,
        };

        let record = SymbolRecord {
            previous_binding: current,
            repr,
            mode,
            displacement,
            kind,
        };
        let sym = self.symbols.push(record);
        names.set_binding(repr, Binding::Bound(sym));

        if kind == SymbolKind::FunctionPredeclaration {
            self.predeclared.insert(repr);
        }

        Ok(sym)
    }

    pub fn get(&self, sym: SymId) -> SymbolRecord {
        self.symbols[sym]
    }

    /// Patch a symbol's displacement (a function or label's code address,
    /// resolved after `bind` by the emitter or by a later `goto` target).
    pub fn set_displacement(&mut self, sym: SymId, displacement: i32) {
        self.symbols[sym].displacement = displacement;
    }

    pub fn set_mode(&mut self, sym: SymId, mode: ModeId) {
        self.symbols[sym].mode = Some(mode);
    }

    /// Representations predeclared (functions without a matching
    /// definition) at the current point in compilation.
    pub fn pending_predeclarations(&self) -> impl Iterator<Item = ReprId> + '_ {
        self.predeclared.iter().copied()
    }

    /// `goto repr;`: reuses the label symbol already bound for `repr`
    /// (forward or backward reference to the same label), or binds a fresh
    /// one with the zero-mode sentinel (§4.3) pending a matching
    /// definition. Mirrors the original's "same ident can be a variable
    /// and a label" carve-out: an existing non-label binding is shadowed
    /// rather than rejected, same as a block re-declaring an outer name.
    pub fn goto_label(&mut self, names: &mut NameTable, repr: ReprId) -> SymId {
        if let Binding::Bound(sym) = names.binding(repr) {
            if self.symbols[sym].kind == SymbolKind::Label {
                return sym;
            }
        }
        let record = SymbolRecord {
            previous_binding: names.binding(repr),
            repr,
            mode: None,
            displacement: 0,
            kind: SymbolKind::Label,
        };
        let sym = self.symbols.push(record);
        names.set_binding(repr, Binding::Bound(sym));
        self.pending_labels.insert(repr);
        sym
    }

    /// `repr:` label definition: resolves a pending forward `goto`'s
    /// sentinel (mode `None` -> `Some(ModeId::VOID)`, §4.3), or binds a
    /// fresh already-resolved label if no `goto` referenced it yet. A
    /// second definition of the same label is rejected.
    pub fn define_label(&mut self, names: &mut NameTable, repr: ReprId) -> SemResult<SymId> {
        if let Binding::Bound(sym) = names.binding(repr) {
            if self.symbols[sym].kind == SymbolKind::Label {
                if !self.pending_labels.remove(&repr) {
                    return Err(SemError::DuplicateDefinition(names.symbol(repr)));
                }
                self.symbols[sym].mode = Some(ModeId::VOID);
                return Ok(sym);
            }
        }
        let record = SymbolRecord {
            previous_binding: names.binding(repr),
            repr,
            mode: Some(ModeId::VOID),
            displacement: 0,
            kind: SymbolKind::Label,
        };
        let sym = self.symbols.push(record);
        names.set_binding(repr, Binding::Bound(sym));
        Ok(sym)
    }

    /// `goto` targets still unresolved at the current point in compilation
    /// (§4.7's exactly-parallel check to `pending_predeclarations`).
    pub fn pending_labels(&self) -> impl Iterator<Item = ReprId> + '_ {
        self.pending_labels.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rucc_util::Symbol;

    fn repr(names: &mut NameTable, spelling: &str) -> ReprId {
        names.intern(Symbol::intern(spelling))
    }

    #[test]
    fn scope_round_trip_restores_bindings() {
        let mut names = NameTable::new();
        let mut symtab = SymbolTable::new();
        let x = repr(&mut names, "x_symtab_roundtrip");

        symtab
            .bind(&mut names, x, SymbolKind::Variable, Some(ModeId::INT), 1)
            .unwrap();
        let outer_binding = names.binding(x);

        symtab.enter_block();
        symtab
            .bind(&mut names, x, SymbolKind::Variable, Some(ModeId::INT), 1)
            .unwrap();
        assert_ne!(names.binding(x), outer_binding);
        symtab.exit_block(&mut names).unwrap();

        assert_eq!(names.binding(x), outer_binding);
    }

    #[test]
    fn duplicate_binding_in_same_scope_is_rejected() {
        let mut names = NameTable::new();
        let mut symtab = SymbolTable::new();
        let g = repr(&mut names, "g_symtab_dup");
        symtab
            .bind(&mut names, g, SymbolKind::Variable, Some(ModeId::INT), 1)
            .unwrap();
        let err = symtab
            .bind(&mut names, g, SymbolKind::Variable, Some(ModeId::INT), 1)
            .unwrap_err();
        assert_eq!(err, SemError::DuplicateDefinition(names.symbol(g)));
    }

    #[test]
    fn predeclaration_then_definition_is_allowed_and_clears_pending() {
        let mut names = NameTable::new();
        let mut symtab = SymbolTable::new();
        let f = repr(&mut names, "f_symtab_predecl");
        symtab
            .bind(&mut names, f, SymbolKind::FunctionPredeclaration, None, 0)
            .unwrap();
        assert_eq!(symtab.pending_predeclarations().count(), 1);

        symtab
            .bind(&mut names, f, SymbolKind::FunctionDefinition, None, 0)
            .unwrap();
        assert_eq!(symtab.pending_predeclarations().count(), 0);
    }

    #[test]
    fn function_scope_tracks_frame_size() {
        let mut names = NameTable::new();
        let mut symtab = SymbolTable::new();
        symtab.enter_function();
        let a = repr(&mut names, "a_symtab_frame");
        let b = repr(&mut names, "b_symtab_frame");
        symtab
            .bind(&mut names, a, SymbolKind::FunctionParameter, Some(ModeId::INT), 1)
            .unwrap();
        symtab
            .bind(&mut names, b, SymbolKind::Variable, Some(ModeId::FLOAT), 2)
            .unwrap();
        let frame_size = symtab.exit_function(&mut names).unwrap();
        assert_eq!(frame_size, 3 + 1 + 2);
    }

    #[test]
    fn exit_without_enter_is_bad_scope_exit() {
        let mut names = NameTable::new();
        let mut symtab = SymbolTable::new();
        assert_eq!(symtab.exit_block(&mut names).unwrap_err(), SemError::BadScopeExit);
    }

    #[test]
    fn forward_goto_is_pending_until_the_label_is_defined() {
        let mut names = NameTable::new();
        let mut symtab = SymbolTable::new();
        let l = repr(&mut names, "l_symtab_forward_goto");

        let goto_sym = symtab.goto_label(&mut names, l);
        assert_eq!(symtab.pending_labels().count(), 1);

        let label_sym = symtab.define_label(&mut names, l).unwrap();
        assert_eq!(goto_sym, label_sym);
        assert_eq!(symtab.pending_labels().count(), 0);
        assert_eq!(symtab.get(label_sym).mode, Some(ModeId::VOID));
    }

    #[test]
    fn backward_goto_reuses_the_already_defined_label() {
        let mut names = NameTable::new();
        let mut symtab = SymbolTable::new();
        let l = repr(&mut names, "l_symtab_backward_goto");

        let label_sym = symtab.define_label(&mut names, l).unwrap();
        assert_eq!(symtab.pending_labels().count(), 0);

        let goto_sym = symtab.goto_label(&mut names, l);
        assert_eq!(goto_sym, label_sym);
        assert_eq!(symtab.pending_labels().count(), 0);
    }

    #[test]
    fn redefining_the_same_label_is_rejected() {
        let mut names = NameTable::new();
        let mut symtab = SymbolTable::new();
        let l = repr(&mut names, "l_symtab_redefine");

        symtab.define_label(&mut names, l).unwrap();
        assert_eq!(
            symtab.define_label(&mut names, l).unwrap_err(),
            SemError::DuplicateDefinition(names.symbol(l))
        );
    }

    #[test]
    fn goto_to_an_identifier_already_bound_as_a_variable_still_binds_as_a_label() {
        let mut names = NameTable::new();
        let mut symtab = SymbolTable::new();
        let x = repr(&mut names, "x_symtab_label_shadow");
        symtab
            .bind(&mut names, x, SymbolKind::Variable, Some(ModeId::INT), 1)
            .unwrap();

        let label_sym = symtab.goto_label(&mut names, x);
        assert_eq!(symtab.get(label_sym).kind, SymbolKind::Label);
    }

    // P3: for any number of variables bound inside a block, the binding
    // each of their names had just before `enter_block` is exactly restored
    // after the matching `exit_block`, regardless of how many names or what
    // order they were declared in.
    proptest! {
        #[test]
        fn block_scope_round_trips_for_arbitrary_variable_counts(count in 0usize..12) {
            let mut names = NameTable::new();
            let mut symtab = SymbolTable::new();

            let reprs: Vec<ReprId> = (0..count)
                .map(|i| repr(&mut names, &format!("v_symtab_roundtrip_prop_{i}")))
                .collect();
            let before: Vec<_> = reprs.iter().map(|&r| names.binding(r)).collect();

            symtab.enter_block();
            for &r in &reprs {
                symtab
                    .bind(&mut names, r, SymbolKind::Variable, Some(ModeId::INT), 1)
                    .unwrap();
            }
            symtab.exit_block(&mut names).unwrap();

            let after: Vec<_> = reprs.iter().map(|&r| names.binding(r)).collect();
            prop_assert_eq!(before, after);
        }
    }
}
