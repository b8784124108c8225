//! Preprocessor (§4.8): macro directive recognition and textual
//! substitution, interleaved with scanning rather than a separate rewrite
//! pass — mirroring `storage_search`'s dual role of "is this a keyword"
//! and "is this a macro invocation" from the original's lexer.

use rucc_util::Symbol;

use crate::cursor::Cursor;
use crate::error::{LexError, LexResult, MacroError};
use crate::macro_store::{parse_invocation_args, MacroStore};

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn skip_same_line_spaces(cursor: &mut Cursor) {
    while matches!(cursor.current_char(), ' ' | '\t') {
        cursor.advance();
    }
}

fn scan_bare_ident(cursor: &mut Cursor) -> String {
    let mut ident = String::new();
    if is_ident_start(cursor.current_char()) {
        ident.push(cursor.current_char());
        cursor.advance();
        while is_ident_continue(cursor.current_char()) {
            ident.push(cursor.current_char());
            cursor.advance();
        }
    }
    ident
}

fn scan_to_line_end(cursor: &mut Cursor) -> String {
    let mut text = String::new();
    while !cursor.is_at_end() && cursor.current_char() != '\n' {
        text.push(cursor.current_char());
        cursor.advance();
    }
    if cursor.current_char() == '\n' {
        cursor.advance();
    }
    text
}

fn copy_ident(cursor: &mut Cursor, out: &mut String) {
    while is_ident_continue(cursor.current_char()) {
        out.push(cursor.current_char());
        cursor.advance();
    }
}

/// Textually replace every formal-parameter occurrence in `replacement`
/// with the corresponding argument's raw text. No implicit
/// parenthesization — this is the documented textual-substitution
/// semantics of §4.5/§4.8, not a bug.
fn substitute(replacement: &str, params: &[String], args: &[String]) -> String {
    let mut out = String::new();
    let mut chars = replacement.chars().peekable();
    while let Some(&c) = chars.peek() {
        if is_ident_start(c) {
            let mut ident = String::new();
            while let Some(&c2) = chars.peek() {
                if is_ident_continue(c2) {
                    ident.push(c2);
                    chars.next();
                } else {
                    break;
                }
            }
            match params.iter().position(|p| p == &ident) {
                Some(pos) => out.push_str(&args[pos]),
                None => out.push_str(&ident),
            }
        } else {
            out.push(c);
            chars.next();
        }
    }
    out
}

fn handle_directive(cursor: &mut Cursor, store: &mut MacroStore) -> LexResult<()> {
    cursor.advance(); // consume '#'
    skip_same_line_spaces(cursor);
    let keyword = scan_bare_ident(cursor);
    skip_same_line_spaces(cursor);

    match keyword.as_str() {
        "define" => {
            let name = scan_bare_ident(cursor);
            if name.is_empty() {
                return Err(MacroError::BadMacroDefinition(Symbol::intern("")).into());
            }
            if Symbol::intern(&name).is_known() {
                return Err(MacroError::AlreadyDefined(Symbol::intern(&name)).into());
            }
            let mut params = Vec::new();
            if cursor.current_char() == '(' {
                cursor.advance();
                loop {
                    skip_same_line_spaces(cursor);
                    if cursor.current_char() == ')' {
                        cursor.advance();
                        break;
                    }
                    let p = scan_bare_ident(cursor);
                    if p.is_empty() {
                        return Err(MacroError::BadMacroDefinition(Symbol::intern(&name)).into());
                    }
                    params.push(p);
                    skip_same_line_spaces(cursor);
                    match cursor.current_char() {
                        ',' => {
                            cursor.advance();
                        }
                        ')' => {
                            cursor.advance();
                            break;
                        }
                        _ => return Err(MacroError::BadMacroDefinition(Symbol::intern(&name)).into()),
                    }
                }
            }
            skip_same_line_spaces(cursor);
            let replacement = scan_to_line_end(cursor);
            let replacement = replacement.trim();
            let result = if params.is_empty() {
                store.add(&name, replacement)
            } else {
                store.add_with_params(&name, replacement, params)
            };
            result.map_err(LexError::from)?;
        }
        "undef" => {
            let name = scan_bare_ident(cursor);
            scan_to_line_end(cursor);
            if Symbol::intern(&name).is_known() {
                return Err(MacroError::AlreadyDefined(Symbol::intern(&name)).into());
            }
            store.remove(&name).map_err(LexError::from)?;
        }
        _ => return Err(MacroError::BadMacroDefinition(Symbol::intern(&keyword)).into()),
    }
    Ok(())
}

/// Expand all macro invocations and consume all directives in `source`,
/// returning the fully-substituted text the lexer tokenizes.
pub fn preprocess(source: &str, store: &mut MacroStore) -> LexResult<String> {
    let mut out = String::new();
    let mut cursor = Cursor::new(source);
    expand_into(&mut cursor, store, &mut out, true)?;
    Ok(out)
}

fn expand_into(
    cursor: &mut Cursor,
    store: &mut MacroStore,
    out: &mut String,
    top_level: bool,
) -> LexResult<()> {
    while !cursor.is_at_end() {
        if top_level && cursor.column() == 1 && cursor.current_char() == '#' {
            handle_directive(cursor, store)?;
            continue;
        }

        let c = cursor.current_char();

        if c == '"' || c == '\'' {
            let quote = c;
            out.push(c);
            cursor.advance();
            while !cursor.is_at_end() && cursor.current_char() != quote {
                if cursor.current_char() == '\\' {
                    out.push(cursor.current_char());
                    cursor.advance();
                }
                if cursor.is_at_end() {
                    break;
                }
                out.push(cursor.current_char());
                cursor.advance();
            }
            if cursor.current_char() == quote {
                out.push(quote);
                cursor.advance();
            }
            continue;
        }

        if c == '/' && cursor.peek_char(1) == '/' {
            out.push_str(&scan_to_line_end(cursor));
            out.push('\n');
            continue;
        }

        if c == '/' && cursor.peek_char(1) == '*' {
            out.push('/');
            out.push('*');
            cursor.advance();
            cursor.advance();
            while !(cursor.is_at_end() || (cursor.current_char() == '*' && cursor.peek_char(1) == '/')) {
                out.push(cursor.current_char());
                cursor.advance();
            }
            if !cursor.is_at_end() {
                out.push('*');
                out.push('/');
                cursor.advance();
                cursor.advance();
            }
            continue;
        }

        if is_ident_start(c) {
            let snapshot = cursor.snapshot();
            match store.search(cursor) {
                Some(id) if !store.is_painted(id) => {
                    let params = store.params(id).to_vec();
                    let args = if params.is_empty() {
                        Vec::new()
                    } else {
                        parse_invocation_args(cursor, store.name(id))?
                    };
                    if !params.is_empty() && args.len() != params.len() {
                        return Err(MacroError::ArityMismatch {
                            name: Symbol::intern(store.name(id)),
                            expected: params.len(),
                            got: args.len(),
                        }
                        .into());
                    }
                    let substituted = substitute(store.replacement(id), &params, &args);
                    store.paint(id);
                    let mut sub_cursor = Cursor::new(&substituted);
                    let result = expand_into(&mut sub_cursor, store, out, false);
                    store.unpaint(id);
                    result?;
                }
                _ => {
                    cursor.restore(snapshot);
                    copy_ident(cursor, out);
                }
            }
            continue;
        }

        out.push(c);
        cursor.advance();
    }
    Ok(())
}
