//! Type engine: the deduplicated mode (type) arena (§4.2).
//!
//! Composite descriptors are deduplicated by structural equality. The
//! original walks a back-link chain comparing tail bytes and rewinds the
//! write cursor on a match; since `ModeTag` is a plain Rust value we dedup
//! with a `HashMap<ModeTag, ModeId>` instead (permitted by §4.2: the chain
//! walk is 1980s-era memory-budget plumbing, not an observable property —
//! only P2, "same descriptor twice yields the same handle and the pool does
//! not grow," is load-bearing).

use rucc_util::{define_idx, FxHashMap, Symbol};

define_idx!(ModeId);

impl ModeId {
    pub const VOID: ModeId = ModeId(0);
    pub const INT: ModeId = ModeId(1);
    pub const CHAR: ModeId = ModeId(2);
    pub const FLOAT: ModeId = ModeId(3);
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModeTag {
    Void,
    Int,
    Char,
    Float,
    Pointer {
        element: ModeId,
    },
    Array {
        element: ModeId,
        len: Option<usize>,
    },
    Struct {
        name: Symbol,
        fields: Vec<(Symbol, ModeId)>,
    },
    Function {
        ret: ModeId,
        params: Vec<ModeId>,
    },
}

/// Deduplicated mode arena. `type_add`-equivalent operations return the
/// canonical handle for structurally-equal descriptors (I1).
pub struct TypeEngine {
    modes: rucc_util::IndexVec<ModeId, ModeTag>,
    dedup: FxHashMap<ModeTag, ModeId>,
}

impl TypeEngine {
    pub fn new() -> Self {
        let mut modes = rucc_util::IndexVec::new();
        let mut dedup = FxHashMap::default();
        for tag in [ModeTag::Void, ModeTag::Int, ModeTag::Char, ModeTag::Float] {
            let id = modes.push(tag.clone());
            dedup.insert(tag, id);
        }
        Self { modes, dedup }
    }

    /// Add a descriptor, returning the canonical handle (I1). Returns the
    /// existing handle and leaves the pool unchanged (P2) if an
    /// structurally-equal mode was already committed.
    pub fn add(&mut self, tag: ModeTag) -> ModeId {
        if let Some(&id) = self.dedup.get(&tag) {
            return id;
        }
        let id = self.modes.push(tag.clone());
        self.dedup.insert(tag, id);
        id
    }

    pub fn get(&self, mode: ModeId) -> &ModeTag {
        &self.modes[mode]
    }

    /// Size in target-VM stack cells: 2 for the floating mode, the summed
    /// member size for structures, 1 otherwise (§4.2's asymmetry).
    pub fn size_of(&self, mode: ModeId) -> usize {
        match &self.modes[mode] {
            ModeTag::Float => 2,
            ModeTag::Struct { fields, .. } => {
                fields.iter().map(|(_, m)| self.size_of(*m)).sum()
            }
            ModeTag::Array { element, len } => len.unwrap_or(0) * self.size_of(*element),
            _ => 1,
        }
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }
}

impl Default for TypeEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn primitives_are_preseeded() {
        let engine = TypeEngine::new();
        assert_eq!(engine.get(ModeId::INT), &ModeTag::Int);
        assert_eq!(engine.size_of(ModeId::FLOAT), 2);
        assert_eq!(engine.size_of(ModeId::INT), 1);
    }

    #[test]
    fn structurally_equal_structs_dedup() {
        let mut engine = TypeEngine::new();
        let s_name = Symbol::intern("S_mode_test");
        let a_field = Symbol::intern("a_mode_test");
        let b_field = Symbol::intern("b_mode_test");
        let make = |engine: &mut TypeEngine| {
            engine.add(ModeTag::Struct {
                name: s_name,
                fields: vec![(a_field, ModeId::INT), (b_field, ModeId::FLOAT)],
            })
        };
        let before = engine.len();
        let first = make(&mut engine);
        let after_first = engine.len();
        let second = make(&mut engine);
        assert_eq!(first, second);
        assert_eq!(after_first, before + 1);
        assert_eq!(engine.len(), after_first);
        assert_eq!(engine.size_of(first), 3);
    }

    #[test]
    fn distinct_pointees_are_distinct_modes() {
        let mut engine = TypeEngine::new();
        let p_int = engine.add(ModeTag::Pointer { element: ModeId::INT });
        let p_char = engine.add(ModeTag::Pointer { element: ModeId::CHAR });
        assert_ne!(p_int, p_char);
    }

    #[test]
    fn array_size_is_length_times_element_size() {
        let mut engine = TypeEngine::new();
        let arr = engine.add(ModeTag::Array { element: ModeId::FLOAT, len: Some(5) });
        assert_eq!(engine.size_of(arr), 10);
    }

    #[test]
    fn array_of_unknown_length_has_zero_size() {
        let mut engine = TypeEngine::new();
        let arr = engine.add(ModeTag::Array { element: ModeId::INT, len: None });
        assert_eq!(engine.size_of(arr), 0);
    }

    // P2: adding a structurally-equal descriptor a second time returns the
    // same handle and leaves the pool's size unchanged.
    proptest! {
        #[test]
        fn adding_the_same_pointer_descriptor_twice_dedups(
            base in prop_oneof![Just(ModeId::INT), Just(ModeId::CHAR), Just(ModeId::FLOAT), Just(ModeId::VOID)],
        ) {
            let mut engine = TypeEngine::new();
            let before = engine.len();
            let first = engine.add(ModeTag::Pointer { element: base });
            let after_first = engine.len();
            let second = engine.add(ModeTag::Pointer { element: base });
            prop_assert_eq!(first, second);
            prop_assert_eq!(after_first, before + 1);
            prop_assert_eq!(engine.len(), after_first);
        }

        #[test]
        fn adding_the_same_array_descriptor_twice_dedups(
            len in proptest::option::of(0usize..64),
        ) {
            let mut engine = TypeEngine::new();
            let before = engine.len();
            let first = engine.add(ModeTag::Array { element: ModeId::INT, len });
            let after_first = engine.len();
            let second = engine.add(ModeTag::Array { element: ModeId::INT, len });
            prop_assert_eq!(first, second);
            prop_assert_eq!(after_first, before + 1);
            prop_assert_eq!(engine.len(), after_first);
        }
    }
}
