//! Lexical analysis: preprocessing (macro expansion) followed by
//! tokenization, per §4.5/§4.8/§4.9.
//!
//! The public entry point is [`lex`], which runs the preprocessor over the
//! raw source text and then tokenizes the result. The two stages are kept
//! separable (`preprocessor::preprocess` / `lexer::Lexer`) so a caller that
//! only needs one of them (tests, tooling) isn't forced through both.

pub mod cursor;
pub mod error;
pub mod lexer;
pub mod macro_store;
pub mod preprocessor;
pub mod token;

pub use cursor::{Cursor, CursorSnapshot};
pub use error::{LexError, LexResult, MacroError};
pub use lexer::Lexer;
pub use macro_store::MacroStore;
pub use token::{Token, TokenKind};

/// Preprocesses then tokenizes `source`, returning every token produced
/// (including a trailing [`TokenKind::Eof`]) plus any errors encountered
/// along the way. Macro errors abort immediately (preprocessing has no
/// resynchronization); lexical errors are collected and lexing continues
/// past them (§4.9).
pub fn lex(source: &str) -> (Vec<Token>, Vec<LexError>) {
    let mut store = MacroStore::new();
    match preprocessor::preprocess(source, &mut store) {
        Ok(expanded) => Lexer::new(&expanded).tokenize(),
        Err(err) => (Vec::new(), vec![err]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_expands_macros_before_tokenizing() {
        let (tokens, errors) = lex("#define TWO 2\nTWO+TWO");
        assert!(errors.is_empty());
        let kinds: Vec<_> = tokens.into_iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::IntLiteral(2),
                TokenKind::Plus,
                TokenKind::IntLiteral(2),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn arbitrary_non_keyword_identifier_lexes_to_a_single_ident_token() {
        use proptest::prelude::*;

        proptest!(|(ident in "[a-zA-Z_][a-zA-Z0-9_]{0,30}")| {
            // Keywords are a closed, known set; only check the general case.
            prop_assume!(!rucc_util::Symbol::intern(&ident).is_known());
            let (tokens, errors) = lex(&ident);
            prop_assert!(errors.is_empty());
            prop_assert_eq!(tokens.len(), 2); // the identifier, then Eof
            prop_assert!(matches!(tokens[0].kind, TokenKind::Ident(_)));
            prop_assert!(tokens[1].kind.is_eof());
        });
    }

    #[test]
    fn arbitrary_decimal_literal_lexes_to_a_single_int_literal_token() {
        use proptest::prelude::*;

        proptest!(|(digits in "[1-9][0-9]{0,8}")| {
            let (tokens, errors) = lex(&digits);
            prop_assert!(errors.is_empty());
            prop_assert_eq!(tokens.len(), 2);
            prop_assert_eq!(tokens[0].kind, TokenKind::IntLiteral(digits.parse().unwrap()));
        });
    }
}
