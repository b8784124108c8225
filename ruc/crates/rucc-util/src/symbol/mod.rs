//! Symbol module — interning for RuC identifier spellings.
//!
//! A [`Symbol`] is a compact handle into the global representation string
//! table. Keywords are pre-interned at fixed indices so the lexer and the
//! macro store can recognize them by comparing a plain integer instead of
//! re-hashing a spelling on every token.
//!
//! The compiler core is single-threaded (§5 of the design — no suspension
//! points, one compilation unit per table), so unlike a concurrent compiler
//! front-end this interner needs no locking: it is a thread-local table
//! behind a `RefCell`, not a `DashMap`.

mod interner;

pub use interner::STRING_TABLE;

/// Statistics about the string interner, useful for profiling.
#[derive(Clone, Copy, Debug, Default)]
pub struct InternerStats {
    pub count: usize,
    pub capacity: usize,
}

impl InternerStats {
    pub fn load_factor(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.count as f64 / self.capacity as f64
        }
    }
}

/// An interned RuC identifier or keyword spelling.
///
/// `Symbol` is 4 bytes and compares in O(1); string retrieval is O(1) via
/// the backing arena (unlike the teacher's DashMap-backed interner, whose
/// `get` was a documented O(n) scan — a single-threaded `Vec` arena gives us
/// O(1) for free, so we keep that improvement).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol {
    pub(crate) index: u32,
}

/// Number of symbols reserved for known keywords.
///
/// Must equal the number of entries in [`KEYWORD_SPELLINGS`], since keyword
/// symbols are assigned consecutive indices starting at 0.
pub(crate) const RESERVED_SYMBOLS_END: u32 = 19;

macro_rules! keywords {
    ($($name:ident => $idx:expr, $spelling:literal;)*) => {
        $(
            #[doc = concat!("Known symbol for the `", $spelling, "` keyword.")]
            pub const $name: Symbol = Symbol { index: $idx };
        )*

        pub(crate) const KEYWORD_SPELLINGS: &[(&str, Symbol)] = &[
            $(($spelling, $name)),*
        ];
    };
}

keywords! {
    KW_MAIN => 0, "main";
    KW_VOID => 1, "void";
    KW_INT => 2, "int";
    KW_CHAR => 3, "char";
    KW_FLOAT => 4, "float";
    KW_STRUCT => 5, "struct";
    KW_TYPEDEF => 6, "typedef";
    KW_IF => 7, "if";
    KW_ELSE => 8, "else";
    KW_DO => 9, "do";
    KW_WHILE => 10, "while";
    KW_FOR => 11, "for";
    KW_SWITCH => 12, "switch";
    KW_CASE => 13, "case";
    KW_DEFAULT => 14, "default";
    KW_BREAK => 15, "break";
    KW_CONTINUE => 16, "continue";
    KW_RETURN => 17, "return";
    KW_GOTO => 18, "goto";
}

impl Symbol {
    pub const MAX_INDEX: u32 = u32::MAX;

    /// Intern a spelling, returning its symbol. Two calls with the same
    /// spelling in the same process return the same `Symbol` (P1).
    pub fn intern(string: &str) -> Self {
        STRING_TABLE.with(|table| table.borrow_mut().intern(string))
    }

    /// Look up the spelling for this symbol.
    pub fn as_str(&self) -> &'static str {
        STRING_TABLE.with(|table| {
            table
                .borrow()
                .get(*self)
                .expect("symbol was never interned in this table")
        })
    }

    /// True for pre-interned keyword symbols.
    pub fn is_known(&self) -> bool {
        self.index < RESERVED_SYMBOLS_END
    }

    pub fn as_u32(&self) -> u32 {
        self.index
    }
}

impl std::fmt::Debug for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Symbol({:?})", self.as_str())
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn intern_same_string_is_idempotent() {
        let a = Symbol::intern("frobnicate");
        let b = Symbol::intern("frobnicate");
        assert_eq!(a, b);
    }

    #[test]
    fn intern_different_strings() {
        let a = Symbol::intern("alpha_unique");
        let b = Symbol::intern("beta_unique");
        assert_ne!(a, b);
    }

    #[test]
    fn keywords_are_pre_known() {
        assert!(KW_MAIN.is_known());
        assert_eq!(KW_MAIN.as_str(), "main");
        assert_eq!(Symbol::intern("main"), KW_MAIN);
    }

    #[test]
    fn user_identifier_is_not_known() {
        let s = Symbol::intern("not_a_keyword_xyz");
        assert!(!s.is_known());
    }

    // P1: interning the same spelling twice always returns the same
    // handle, and the second call never grows the table.
    proptest! {
        #[test]
        fn intern_is_idempotent_for_arbitrary_spellings(s in "[a-zA-Z_][a-zA-Z0-9_]{0,40}") {
            let a = Symbol::intern(&s);
            let stats_after_first = STRING_TABLE.with(|t| t.borrow().stats());
            let b = Symbol::intern(&s);
            let stats_after_second = STRING_TABLE.with(|t| t.borrow().stats());
            prop_assert_eq!(a, b);
            prop_assert_eq!(stats_after_first.count, stats_after_second.count);
        }
    }
}
