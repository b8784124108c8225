//! Macro store (§4.5): name -> (replacement text, parameter names).
//!
//! Grounded in `original_source/libs/macro/storage.h`'s `storage` type,
//! which backs one shared name->record map for both keywords and
//! `#define`d macros. This reimplementation keeps keyword recognition in
//! `rucc_util::Symbol` (a cheap integer compare via `Symbol::is_known`)
//! rather than re-seeding keywords into this store as macro records —
//! seeding a keyword's spelling with a real replacement would make the
//! preprocessor rewrite every occurrence of e.g. `int` during expansion,
//! not just block redefinition of it. Instead `preprocessor::handle_directive`
//! checks `is_known()` on the name of every `#define`/`#undef` and rejects
//! it with `MacroError::AlreadyDefined` before it ever reaches this store,
//! so a keyword spelling can never be bound here in the first place.
//!
//! The trie is realized as an arena of nodes (`IndexVec<TrieNodeId,
//! TrieNode>`) rather than a literal pointer trie, consistent with how
//! every other pool in this crate family is an arena with integer handles.

use rucc_util::{define_idx, FxHashMap, IndexVec};

use crate::cursor::Cursor;
use crate::error::{LexResult, MacroError};

define_idx!(TrieNodeId);
define_idx!(MacroId);

#[derive(Default)]
struct TrieNode {
    children: FxHashMap<char, TrieNodeId>,
    record: Option<MacroId>,
}

struct MacroRecord {
    name: String,
    replacement: String,
    params: Vec<String>,
}

/// Holds the set of macros currently defined, keyed by a trie over their
/// spellings, plus the paint set used to suppress recursive expansion
/// while a macro's own replacement is being rescanned (§4.8).
pub struct MacroStore {
    trie: IndexVec<TrieNodeId, TrieNode>,
    records: IndexVec<MacroId, MacroRecord>,
    painted: Vec<MacroId>,
}

impl MacroStore {
    pub fn new() -> Self {
        let mut trie = IndexVec::new();
        trie.push(TrieNode::default());
        Self {
            trie,
            records: IndexVec::new(),
            painted: Vec::new(),
        }
    }

    fn find_node(&self, name: &str) -> Option<TrieNodeId> {
        let mut node = TrieNodeId(0);
        for c in name.chars() {
            node = *self.trie[node].children.get(&c)?;
        }
        Some(node)
    }

    fn find_or_create_node(&mut self, name: &str) -> TrieNodeId {
        let mut node = TrieNodeId(0);
        for c in name.chars() {
            node = match self.trie[node].children.get(&c) {
                Some(&next) => next,
                None => {
                    let next = self.trie.push(TrieNode::default());
                    self.trie[node].children.insert(c, next);
                    next
                }
            };
        }
        node
    }

    /// `add`/`add_with_params`: insert a macro, failing if `name` is
    /// already bound.
    pub fn add(&mut self, name: &str, replacement: &str) -> Result<MacroId, MacroError> {
        self.add_with_params(name, replacement, Vec::new())
    }

    pub fn add_with_params(
        &mut self,
        name: &str,
        replacement: &str,
        params: Vec<String>,
    ) -> Result<MacroId, MacroError> {
        let node = self.find_or_create_node(name);
        if self.trie[node].record.is_some() {
            return Err(MacroError::AlreadyDefined(rucc_util::Symbol::intern(name)));
        }
        let id = self.records.push(MacroRecord {
            name: name.to_string(),
            replacement: replacement.to_string(),
            params,
        });
        self.trie[node].record = Some(id);
        Ok(id)
    }

    /// Replace an existing macro's replacement text.
    pub fn set(&mut self, name: &str, replacement: &str) -> Result<(), MacroError> {
        let id = self
            .find_node(name)
            .and_then(|node| self.trie[node].record)
            .ok_or_else(|| MacroError::BadMacroDefinition(rucc_util::Symbol::intern(name)))?;
        self.records[id].replacement = replacement.to_string();
        Ok(())
    }

    /// Unbind `name`; the record itself remains allocated but unreachable.
    pub fn remove(&mut self, name: &str) -> Result<(), MacroError> {
        let node = self
            .find_node(name)
            .filter(|&node| self.trie[node].record.is_some())
            .ok_or_else(|| MacroError::BadMacroDefinition(rucc_util::Symbol::intern(name)))?;
        self.trie[node].record = None;
        Ok(())
    }

    pub fn replacement(&self, id: MacroId) -> &str {
        &self.records[id].replacement
    }

    pub fn params(&self, id: MacroId) -> &[String] {
        &self.records[id].params
    }

    pub fn name(&self, id: MacroId) -> &str {
        &self.records[id].name
    }

    /// Descend the trie greedily over `cursor`'s remaining input, returning
    /// the deepest matching record (if any) and leaving the cursor
    /// positioned just past the matched spelling. Mirrors
    /// `storage_search`'s dual role of tokenizing a name and peeking its
    /// terminator.
    pub fn search(&self, cursor: &mut Cursor) -> Option<MacroId> {
        let mut node = TrieNodeId(0);
        let mut best: Option<(MacroId, crate::cursor::CursorSnapshot)> = None;
        loop {
            let c = cursor.peek_char(0);
            let Some(&next) = self.trie[node].children.get(&c) else {
                break;
            };
            node = next;
            cursor.advance();
            if let Some(record) = self.trie[node].record {
                best = Some((record, cursor.snapshot()));
            }
        }
        match best {
            Some((id, snapshot)) => {
                cursor.restore(snapshot);
                Some(id)
            }
            None => None,
        }
    }

    /// Suppress re-expansion of `id` while its replacement is being
    /// rescanned (§4.8 "painting").
    pub fn paint(&mut self, id: MacroId) {
        self.painted.push(id);
    }

    pub fn unpaint(&mut self, id: MacroId) {
        if let Some(pos) = self.painted.iter().rposition(|&p| p == id) {
            self.painted.remove(pos);
        }
    }

    pub fn is_painted(&self, id: MacroId) -> bool {
        self.painted.contains(&id)
    }
}

impl Default for MacroStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses a parenthesized, comma-separated argument list for a
/// function-like macro invocation, returning the raw (unexpanded) text of
/// each argument (§4.8).
pub fn parse_invocation_args(cursor: &mut Cursor, name: &str) -> LexResult<Vec<String>> {
    cursor.skip_whitespace();
    if cursor.current_char() != '(' {
        return Ok(Vec::new());
    }
    cursor.advance();

    let mut args = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    loop {
        if cursor.is_at_end() {
            return Err(MacroError::UnterminatedMacroArgument(rucc_util::Symbol::intern(name)).into());
        }
        let c = cursor.current_char();
        match c {
            '(' => {
                depth += 1;
                current.push(c);
                cursor.advance();
            }
            ')' if depth == 0 => {
                cursor.advance();
                args.push(current.trim().to_string());
                break;
            }
            ')' => {
                depth -= 1;
                current.push(c);
                cursor.advance();
            }
            ',' if depth == 0 => {
                args.push(current.trim().to_string());
                current.clear();
                cursor.advance();
            }
            _ => {
                current.push(c);
                cursor.advance();
            }
        }
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_search_finds_record() {
        let mut store = MacroStore::new();
        let id = store.add("SQ", "x*x").unwrap();
        let mut cursor = Cursor::new("SQ(1+2)");
        let found = store.search(&mut cursor);
        assert_eq!(found, Some(id));
        assert_eq!(store.replacement(id), "x*x");
    }

    #[test]
    fn search_returns_none_for_unknown_name() {
        let store = MacroStore::new();
        let mut cursor = Cursor::new("UNKNOWN");
        assert_eq!(store.search(&mut cursor), None);
    }

    #[test]
    fn redefining_without_undef_fails() {
        let mut store = MacroStore::new();
        store.add("N", "1").unwrap();
        assert!(store.add("N", "2").is_err());
    }

    #[test]
    fn remove_then_redefine_succeeds() {
        let mut store = MacroStore::new();
        store.add("N", "1").unwrap();
        store.remove("N").unwrap();
        assert!(store.add("N", "2").is_ok());
    }

    #[test]
    fn parses_argument_list_respecting_nested_parens() {
        let mut cursor = Cursor::new("(1+2, f(3,4))");
        let args = parse_invocation_args(&mut cursor, "M").unwrap();
        assert_eq!(args, vec!["1+2".to_string(), "f(3,4)".to_string()]);
    }

    #[test]
    fn unterminated_argument_list_is_an_error() {
        let mut cursor = Cursor::new("(1+2");
        assert!(parse_invocation_args(&mut cursor, "M").is_err());
    }
}
