//! Single-threaded string interner.
//!
//! The compiler core never suspends mid-compilation and never shares a
//! compilation unit across threads (see the concurrency section of the
//! design), so the interner needs no locking: one `RefCell<StringTable>`
//! per thread, lazily seeded with keyword spellings on first touch.

use std::cell::RefCell;
use std::collections::HashMap;

use super::{InternerStats, Symbol, KEYWORD_SPELLINGS, RESERVED_SYMBOLS_END};

thread_local! {
    pub static STRING_TABLE: RefCell<StringTable> = RefCell::new(StringTable::with_keywords());
}

/// Append-only table mapping spellings to [`Symbol`]s.
///
/// Strings are leaked to obtain `'static` lifetime references, matching the
/// table's own lifetime: nothing is ever removed from it over a compilation.
pub struct StringTable {
    index: HashMap<&'static str, u32>,
    strings: Vec<&'static str>,
}

impl StringTable {
    fn with_keywords() -> Self {
        let mut table = Self {
            index: HashMap::with_capacity(64),
            strings: Vec::with_capacity(64),
        };
        for &(spelling, symbol) in KEYWORD_SPELLINGS {
            debug_assert_eq!(table.strings.len() as u32, symbol.index);
            table.index.insert(spelling, symbol.index);
            table.strings.push(spelling);
        }
        debug_assert_eq!(table.strings.len() as u32, RESERVED_SYMBOLS_END);
        table
    }

    pub fn intern(&mut self, string: &str) -> Symbol {
        if let Some(&index) = self.index.get(string) {
            return Symbol { index };
        }
        let interned: &'static str = Box::leak(string.to_string().into_boxed_str());
        let index = self.strings.len() as u32;
        self.strings.push(interned);
        self.index.insert(interned, index);
        Symbol { index }
    }

    pub fn get(&self, symbol: Symbol) -> Option<&'static str> {
        self.strings.get(symbol.index as usize).copied()
    }

    pub fn stats(&self) -> InternerStats {
        InternerStats {
            count: self.strings.len(),
            capacity: self.strings.capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_keywords_occupy_the_low_indices() {
        STRING_TABLE.with(|table| {
            let table = table.borrow();
            assert_eq!(table.get(Symbol { index: 0 }), Some("main"));
        });
    }

    #[test]
    fn new_strings_land_above_the_reserved_range() {
        let sym = Symbol::intern("a_brand_new_identifier");
        assert!(sym.as_u32() >= RESERVED_SYMBOLS_END);
    }

    #[test]
    fn stats_reflect_interned_count() {
        let before = STRING_TABLE.with(|t| t.borrow().stats());
        Symbol::intern("stats_probe_unique_name");
        let after = STRING_TABLE.with(|t| t.borrow().stats());
        assert!(after.count > before.count);
    }
}
