//! Parser: builds the AST/tree pool (§4.6) from a token stream while
//! interning and binding declarations into the interning/scope layer
//! (`rucc-sem`) as they are recognized (§3's data-flow ordering).

pub mod ast;
pub mod error;
pub mod parser;

pub use ast::{BinOp, Node, NodeId, NodeKind, Tree, UnOp};
pub use error::{ParseError, ParseResult};
pub use parser::Parser;

use rucc_sem::Sema;

/// Lexes then parses `source`, returning the tree, the interning/scope
/// layer built up along the way, and the translation-unit root.
pub fn parse(source: &str) -> ParseResult<(Tree, Sema, NodeId)> {
    parse_with_sema(source, Sema::new())
}

/// Like [`parse`], but binds into an already-populated `Sema` — lets a
/// driver compile several source files as one shared global scope so
/// cross-file redefinitions are caught by the usual scope-binding rules.
pub fn parse_with_sema(source: &str, sema: Sema) -> ParseResult<(Tree, Sema, NodeId)> {
    let (tokens, lex_errors) = rucc_lex::lex(source);
    if let Some(err) = lex_errors.into_iter().next() {
        return Err(ParseError::Lex(err));
    }
    Parser::with_sema(&tokens, sema).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;

    #[test]
    fn parses_simple_main() {
        let (tree, sema, root) = parse("int main(){ return 0; }").unwrap();
        let NodeKind::TranslationUnit(items) = &tree.get(root).kind else {
            panic!("expected translation unit");
        };
        assert_eq!(items.len(), 1);
        let errors = sema.check();
        assert!(errors.is_empty());
    }

    #[test]
    fn predeclared_function_left_undefined_is_reported_by_sema_check() {
        let (_tree, sema, _root) = parse("void f(); int main(){ f(); }").unwrap();
        let errors = sema.check();
        assert!(errors
            .iter()
            .any(|e| matches!(e, rucc_sem::SemError::PredeclaredButUndefined(_))));
    }

    #[test]
    fn duplicate_struct_declaration_dedups_to_the_same_mode() {
        let (tree, _sema, root) =
            parse("struct S{int a; float b;}; struct S{int a; float b;};").unwrap();
        let NodeKind::TranslationUnit(items) = &tree.get(root).kind else {
            panic!("expected translation unit");
        };
        assert_eq!(tree.get(items[0]).ty, tree.get(items[1]).ty);
    }

    #[test]
    fn block_scope_shadow_is_restored_on_exit() {
        let (_tree, sema, _root) = parse("int main(){ int x; { int x; x=1; } }").unwrap();
        assert!(sema.check().is_empty());
    }

    #[test]
    fn calling_an_undefined_identifier_is_rejected() {
        match parse("int main(){ return g(); }") {
            Err(ParseError::UndefinedIdentifier(_)) => {}
            Err(other) => panic!("expected UndefinedIdentifier, got {other:?}"),
            Ok(_) => panic!("expected a parse error"),
        }
    }

    #[test]
    fn goto_to_a_defined_label_is_not_reported_by_sema_check() {
        let (_tree, sema, _root) =
            parse("int main(){ goto done; done: return 0; }").unwrap();
        let errors = sema.check();
        assert!(!errors.iter().any(|e| matches!(e, rucc_sem::SemError::UndefinedLabel(_))));
    }

    #[test]
    fn goto_to_a_never_defined_label_is_reported_by_sema_check() {
        let (_tree, sema, _root) = parse("int main(){ goto nowhere; return 0; }").unwrap();
        let errors = sema.check();
        assert!(errors
            .iter()
            .any(|e| matches!(e, rucc_sem::SemError::UndefinedLabel(_))));
    }

    #[test]
    fn redefining_the_same_label_is_a_parse_error() {
        match parse("int main(){ done: done: return 0; }") {
            Err(ParseError::Sem(rucc_sem::SemError::DuplicateDefinition(_))) => {}
            Err(other) => panic!("expected Sem(DuplicateDefinition), got {other:?}"),
            Ok(_) => panic!("expected a parse error"),
        }
    }
}
