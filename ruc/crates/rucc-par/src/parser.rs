//! Recursive-descent parser (§4.6, §3's data-flow ordering).
//!
//! Grammar productions interleave `Sema::intern`/`bind`/`modes.add` calls
//! with tree construction exactly as §3 describes: a declaration is bound
//! into the interning pools at the point its declarator is recognized, not
//! in a later pass over a finished tree.

use rucc_lex::{Token, TokenKind};
use rucc_sem::{ModeId, ModeTag, Sema, SymbolKind};
use rucc_util::symbol::{
    KW_BREAK, KW_CASE, KW_CHAR, KW_CONTINUE, KW_DEFAULT, KW_DO, KW_ELSE, KW_FLOAT, KW_FOR, KW_GOTO,
    KW_IF, KW_INT, KW_RETURN, KW_STRUCT, KW_SWITCH, KW_VOID, KW_WHILE,
};
use rucc_util::{Span, Symbol};

use crate::ast::{BinOp, NodeId, NodeKind, Tree, UnOp};
use crate::error::{ParseError, ParseResult};

fn merge(a: Span, b: Span) -> Span {
    Span {
        start: a.start,
        end: b.end,
        line: a.line,
        column: a.column,
        file_id: a.file_id,
    }
}

pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    tree: Tree,
    sema: Sema,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self::with_sema(tokens, Sema::new())
    }

    /// Like [`Parser::new`], but binds declarations into an already-populated
    /// `Sema` instead of a fresh one — how a driver compiles several files as
    /// one translation unit's worth of global scope (a second file's `int g;`
    /// collides with the first file's).
    pub fn with_sema(tokens: &'a [Token], sema: Sema) -> Self {
        Self {
            tokens,
            pos: 0,
            tree: Tree::new(),
            sema,
        }
    }

    /// Parses a whole translation unit, returning the populated tree, the
    /// interning/scope layer built up along the way, and the root node.
    pub fn parse(mut self) -> ParseResult<(Tree, Sema, NodeId)> {
        let root = self.parse_translation_unit()?;
        Ok((self.tree, self.sema, root))
    }

    // --- token-stream helpers -------------------------------------------------

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn span(&self) -> Span {
        self.tokens[self.pos.min(self.tokens.len() - 1)].span
    }

    fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: TokenKind, what: &'static str) -> ParseResult<Token> {
        if *self.peek() == kind {
            Ok(self.bump())
        } else {
            Err(ParseError::Expected {
                expected: what,
                found: format!("{:?}", self.peek()),
                span: self.span(),
            })
        }
    }

    fn expect_ident(&mut self) -> ParseResult<(Symbol, Span)> {
        let span = self.span();
        if let TokenKind::Ident(sym) = *self.peek() {
            self.bump();
            Ok((sym, span))
        } else {
            Err(ParseError::Expected {
                expected: "identifier",
                found: format!("{:?}", self.peek()),
                span,
            })
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.bump();
            true
        } else {
            false
        }
    }

    // --- top level --------------------------------------------------------

    fn parse_translation_unit(&mut self) -> ParseResult<NodeId> {
        let start = self.span();
        let mut items = Vec::new();
        while !matches!(self.peek(), TokenKind::Eof) {
            items.push(self.parse_external_decl()?);
        }
        let end = self.span();
        Ok(self.tree.alloc(NodeKind::TranslationUnit(items), merge(start, end)))
    }

    fn is_type_start(&self) -> bool {
        matches!(
            self.peek(),
            TokenKind::Ident(s) if [
                KW_INT, KW_FLOAT, KW_CHAR,
                KW_VOID, KW_STRUCT,
            ].contains(s)
        )
    }

    fn parse_external_decl(&mut self) -> ParseResult<NodeId> {
        let start = self.span();
        let base = self.parse_type_spec()?;

        // A bare struct tag declaration (`struct S { ... };`) introduces a
        // type with no accompanying variable declarator.
        if matches!(self.peek(), TokenKind::Semi) {
            if let ModeTag::Struct { name, .. } = self.sema.modes.get(base).clone() {
                self.bump();
                let end = self.span();
                return Ok(self
                    .tree
                    .alloc_typed(NodeKind::TypeDecl { name, mode: base }, merge(start, end), base));
            }
        }

        let ret_mode = self.parse_pointer_stars(base);
        let (name, _) = self.expect_ident()?;

        if self.eat(&TokenKind::LParen) {
            self.parse_function_tail(name, ret_mode, start)
        } else {
            self.parse_variable_decl_tail(name, ret_mode, start, /* is_stmt */ false)
        }
    }

    // --- types --------------------------------------------------------

    fn parse_type_spec(&mut self) -> ParseResult<ModeId> {
        let span = self.span();
        match *self.peek() {
            TokenKind::Ident(s) if s == KW_INT => {
                self.bump();
                Ok(ModeId::INT)
            }
            TokenKind::Ident(s) if s == KW_FLOAT => {
                self.bump();
                Ok(ModeId::FLOAT)
            }
            TokenKind::Ident(s) if s == KW_CHAR => {
                self.bump();
                Ok(ModeId::CHAR)
            }
            TokenKind::Ident(s) if s == KW_VOID => {
                self.bump();
                Ok(ModeId::VOID)
            }
            TokenKind::Ident(s) if s == KW_STRUCT => {
                self.bump();
                self.parse_struct_type()
            }
            _ => Err(ParseError::Expected {
                expected: "type specifier",
                found: format!("{:?}", self.peek()),
                span,
            }),
        }
    }

    fn parse_struct_type(&mut self) -> ParseResult<ModeId> {
        let (name, _) = self.expect_ident()?;

        if self.eat(&TokenKind::LBrace) {
            let mut fields = Vec::new();
            while !matches!(self.peek(), TokenKind::RBrace) {
                let field_base = self.parse_type_spec()?;
                let field_mode = self.parse_pointer_stars(field_base);
                let (field_name, _) = self.expect_ident()?;
                fields.push((field_name, field_mode));
                self.expect(TokenKind::Semi, "`;`")?;
            }
            self.expect(TokenKind::RBrace, "`}`")?;
            let mode = self.sema.modes.add(ModeTag::Struct { name, fields });
            let repr = self.sema.intern(name);
            // A second `struct NAME { ... }` with identical fields dedups to
            // the same `mode` (§4.2, P2) and re-tags the same binding rather
            // than being rejected as a duplicate definition.
            let already_tagged = matches!(
                self.sema.names.binding(repr),
                rucc_sem::Binding::Bound(sym)
                    if self.sema.symbols.get(sym).kind == SymbolKind::TypeDefinition
                        && self.sema.symbols.get(sym).mode == Some(mode)
            );
            if !already_tagged {
                self.sema
                    .bind(repr, SymbolKind::TypeDefinition, Some(mode))
                    .map_err(ParseError::from)?;
            }
            Ok(mode)
        } else {
            // Reference to a previously-defined struct tag.
            let repr = self.sema.intern(name);
            match self.sema.names.binding(repr) {
                rucc_sem::Binding::Bound(sym)
                    if self.sema.symbols.get(sym).kind == SymbolKind::TypeDefinition =>
                {
                    Ok(self.sema.symbols.get(sym).mode.expect("type definitions always carry a mode"))
                }
                _ => Err(ParseError::UndefinedIdentifier(name)),
            }
        }
    }

    fn parse_pointer_stars(&mut self, mut mode: ModeId) -> ModeId {
        while self.eat(&TokenKind::Star) {
            mode = self.sema.modes.add(ModeTag::Pointer { element: mode });
        }
        mode
    }

    // --- declarations --------------------------------------------------------

    fn parse_function_tail(&mut self, name: Symbol, ret_mode: ModeId, start: Span) -> ParseResult<NodeId> {
        let mut param_names = Vec::new();
        let mut param_modes = Vec::new();
        if !matches!(self.peek(), TokenKind::RParen) {
            loop {
                let pbase = self.parse_type_spec()?;
                let pmode = self.parse_pointer_stars(pbase);
                let (pname, _) = self.expect_ident()?;
                param_names.push(pname);
                param_modes.push(pmode);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "`)`")?;

        let fn_mode = self.sema.modes.add(ModeTag::Function {
            ret: ret_mode,
            params: param_modes.clone(),
        });

        if self.eat(&TokenKind::Semi) {
            let repr = self.sema.intern(name);
            self.sema
                .bind(repr, SymbolKind::FunctionPredeclaration, Some(fn_mode))
                .map_err(ParseError::from)?;
            let end = self.span();
            return Ok(self.tree.alloc_typed(
                NodeKind::FunctionDecl { name, mode: fn_mode, params: param_names, body: None },
                merge(start, end),
                fn_mode,
            ));
        }

        let repr = self.sema.intern(name);
        self.sema
            .bind(repr, SymbolKind::FunctionDefinition, Some(fn_mode))
            .map_err(ParseError::from)?;

        self.sema.enter_function();
        for (pname, pmode) in param_names.iter().zip(param_modes.iter()) {
            let prepr = self.sema.intern(*pname);
            self.sema
                .bind(prepr, SymbolKind::FunctionParameter, Some(*pmode))
                .map_err(ParseError::from)?;
        }
        let body = self.parse_compound_stmt_body()?;
        self.sema.exit_function().map_err(ParseError::from)?;

        let end = self.span();
        Ok(self.tree.alloc_typed(
            NodeKind::FunctionDecl { name, mode: fn_mode, params: param_names, body: Some(body) },
            merge(start, end),
            fn_mode,
        ))
    }

    fn parse_variable_decl_tail(
        &mut self,
        first_name: Symbol,
        first_mode: ModeId,
        start: Span,
        is_stmt: bool,
    ) -> ParseResult<NodeId> {
        let mut decls = vec![self.parse_one_declarator(first_name, first_mode)?];
        while self.eat(&TokenKind::Comma) {
            let (name, _) = self.expect_ident()?;
            decls.push(self.parse_one_declarator(name, first_mode)?);
        }
        self.expect(TokenKind::Semi, "`;`")?;
        let end = self.span();
        if decls.len() == 1 && !is_stmt {
            return Ok(decls.into_iter().next().unwrap());
        }
        // Multiple top-level declarators (or any statement-position decl
        // list) are wrapped in a `List` so translation-unit/body slots stay
        // single-child.
        Ok(self.tree.alloc(NodeKind::List(decls), merge(start, end)))
    }

    fn parse_one_declarator(&mut self, name: Symbol, base_mode: ModeId) -> ParseResult<NodeId> {
        let start = self.span();
        let mut mode = base_mode;
        if self.eat(&TokenKind::LBracket) {
            let len = if let TokenKind::IntLiteral(n) = *self.peek() {
                self.bump();
                Some(n as usize)
            } else {
                None
            };
            self.expect(TokenKind::RBracket, "`]`")?;
            mode = self.sema.modes.add(ModeTag::Array { element: mode, len });
        }

        let init = if self.eat(&TokenKind::Assign) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        let repr = self.sema.intern(name);
        self.sema
            .bind(repr, SymbolKind::Variable, Some(mode))
            .map_err(ParseError::from)?;

        let end = self.span();
        Ok(self.tree.alloc_typed(NodeKind::VariableDecl { name, mode, init }, merge(start, end), mode))
    }

    // --- statements --------------------------------------------------------

    fn parse_compound_stmt(&mut self) -> ParseResult<NodeId> {
        let start = self.span();
        self.expect(TokenKind::LBrace, "`{`")?;
        self.sema.enter_block();
        let stmts = self.parse_stmt_list()?;
        self.expect(TokenKind::RBrace, "`}`")?;
        self.sema.exit_block().map_err(ParseError::from)?;
        let end = self.span();
        Ok(self.tree.alloc(NodeKind::Compound(stmts), merge(start, end)))
    }

    /// Parses `{ stmt* }` without opening its own block scope — used for a
    /// function's top-level body, which shares the scope `enter_function`
    /// already pushed so parameters and locals share one frame.
    fn parse_compound_stmt_body(&mut self) -> ParseResult<NodeId> {
        let start = self.span();
        self.expect(TokenKind::LBrace, "`{`")?;
        let stmts = self.parse_stmt_list()?;
        self.expect(TokenKind::RBrace, "`}`")?;
        let end = self.span();
        Ok(self.tree.alloc(NodeKind::Compound(stmts), merge(start, end)))
    }

    fn parse_stmt_list(&mut self) -> ParseResult<Vec<NodeId>> {
        let mut stmts = Vec::new();
        while !matches!(self.peek(), TokenKind::RBrace) {
            stmts.push(self.parse_statement()?);
        }
        Ok(stmts)
    }

    fn parse_statement(&mut self) -> ParseResult<NodeId> {
        let start = self.span();
        match *self.peek() {
            TokenKind::LBrace => self.parse_compound_stmt(),
            TokenKind::Semi => {
                self.bump();
                Ok(self.tree.alloc(NodeKind::NullStmt, start))
            }
            TokenKind::Ident(s) if s == KW_IF => self.parse_if(start),
            TokenKind::Ident(s) if s == KW_WHILE => self.parse_while(start),
            TokenKind::Ident(s) if s == KW_DO => self.parse_do_while(start),
            TokenKind::Ident(s) if s == KW_FOR => self.parse_for(start),
            TokenKind::Ident(s) if s == KW_SWITCH => self.parse_switch(start),
            TokenKind::Ident(s) if s == KW_CASE => {
                self.bump();
                let value = self.parse_expression()?;
                self.expect(TokenKind::Colon, "`:`")?;
                let stmt = self.parse_statement()?;
                let end = self.span();
                Ok(self.tree.alloc(NodeKind::Case { value, stmt }, merge(start, end)))
            }
            TokenKind::Ident(s) if s == KW_DEFAULT => {
                self.bump();
                self.expect(TokenKind::Colon, "`:`")?;
                let stmt = self.parse_statement()?;
                let end = self.span();
                Ok(self.tree.alloc(NodeKind::Default(stmt), merge(start, end)))
            }
            TokenKind::Ident(s) if s == KW_GOTO => {
                self.bump();
                let (label, _) = self.expect_ident()?;
                self.expect(TokenKind::Semi, "`;`")?;
                let end = self.span();
                let repr = self.sema.intern(label);
                self.sema.goto_label(repr);
                Ok(self.tree.alloc(NodeKind::Goto(label), merge(start, end)))
            }
            TokenKind::Ident(s) if s == KW_CONTINUE => {
                self.bump();
                self.expect(TokenKind::Semi, "`;`")?;
                Ok(self.tree.alloc(NodeKind::Continue, start))
            }
            TokenKind::Ident(s) if s == KW_BREAK => {
                self.bump();
                self.expect(TokenKind::Semi, "`;`")?;
                Ok(self.tree.alloc(NodeKind::Break, start))
            }
            TokenKind::Ident(s) if s == KW_RETURN => {
                self.bump();
                let value = if matches!(self.peek(), TokenKind::Semi) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.expect(TokenKind::Semi, "`;`")?;
                let end = self.span();
                Ok(self.tree.alloc(NodeKind::Return(value), merge(start, end)))
            }
            TokenKind::Ident(label) if matches!(self.peek_at(1), TokenKind::Colon) && !label.is_known() => {
                self.bump();
                self.bump();
                let repr = self.sema.intern(label);
                self.sema.define_label(repr)?;
                let stmt = self.parse_statement()?;
                let end = self.span();
                Ok(self.tree.alloc(NodeKind::Labeled { label, stmt }, merge(start, end)))
            }
            _ if self.is_type_start() => {
                let base = self.parse_type_spec()?;
                let mode = self.parse_pointer_stars(base);
                let (name, _) = self.expect_ident()?;
                let decl = self.parse_variable_decl_tail(name, mode, start, true)?;
                let end = self.span();
                Ok(self.tree.alloc(NodeKind::DeclStmt(decl), merge(start, end)))
            }
            _ => {
                let expr = self.parse_expression()?;
                self.expect(TokenKind::Semi, "`;`")?;
                let end = self.span();
                Ok(self.tree.alloc(NodeKind::ExprStmt(expr), merge(start, end)))
            }
        }
    }

    fn parse_if(&mut self, start: Span) -> ParseResult<NodeId> {
        self.bump();
        self.expect(TokenKind::LParen, "`(`")?;
        let cond = self.parse_expression()?;
        self.expect(TokenKind::RParen, "`)`")?;
        let then_branch = self.parse_statement()?;
        let else_branch = if self.eat(&TokenKind::Ident(KW_ELSE)) {
            Some(self.parse_statement()?)
        } else {
            None
        };
        let end = self.span();
        Ok(self
            .tree
            .alloc(NodeKind::If { cond, then_branch, else_branch }, merge(start, end)))
    }

    fn parse_while(&mut self, start: Span) -> ParseResult<NodeId> {
        self.bump();
        self.expect(TokenKind::LParen, "`(`")?;
        let cond = self.parse_expression()?;
        self.expect(TokenKind::RParen, "`)`")?;
        let body = self.parse_statement()?;
        let end = self.span();
        Ok(self.tree.alloc(NodeKind::While { cond, body }, merge(start, end)))
    }

    fn parse_do_while(&mut self, start: Span) -> ParseResult<NodeId> {
        self.bump();
        let body = self.parse_statement()?;
        self.expect(TokenKind::Ident(KW_WHILE), "`while`")?;
        self.expect(TokenKind::LParen, "`(`")?;
        let cond = self.parse_expression()?;
        self.expect(TokenKind::RParen, "`)`")?;
        self.expect(TokenKind::Semi, "`;`")?;
        let end = self.span();
        Ok(self.tree.alloc(NodeKind::DoWhile { body, cond }, merge(start, end)))
    }

    fn parse_for(&mut self, start: Span) -> ParseResult<NodeId> {
        self.bump();
        self.expect(TokenKind::LParen, "`(`")?;
        let init = if matches!(self.peek(), TokenKind::Semi) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::Semi, "`;`")?;
        let cond = if matches!(self.peek(), TokenKind::Semi) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::Semi, "`;`")?;
        let step = if matches!(self.peek(), TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::RParen, "`)`")?;
        let body = self.parse_statement()?;
        let end = self.span();
        Ok(self.tree.alloc(NodeKind::For { init, cond, step, body }, merge(start, end)))
    }

    fn parse_switch(&mut self, start: Span) -> ParseResult<NodeId> {
        self.bump();
        self.expect(TokenKind::LParen, "`(`")?;
        let cond = self.parse_expression()?;
        self.expect(TokenKind::RParen, "`)`")?;
        let body = self.parse_statement()?;
        let end = self.span();
        Ok(self.tree.alloc(NodeKind::Switch { cond, body }, merge(start, end)))
    }

    // --- expressions --------------------------------------------------------

    fn parse_expression(&mut self) -> ParseResult<NodeId> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> ParseResult<NodeId> {
        let start = self.span();
        let lhs = self.parse_ternary()?;
        if self.eat(&TokenKind::Assign) {
            let rhs = self.parse_assignment()?;
            let end = self.span();
            return Ok(self
                .tree
                .alloc(NodeKind::Binary { op: BinOp::Assign, lhs, rhs }, merge(start, end)));
        }
        Ok(lhs)
    }

    fn parse_ternary(&mut self) -> ParseResult<NodeId> {
        let start = self.span();
        let cond = self.parse_logical_or()?;
        if self.eat(&TokenKind::Question) {
            let then_branch = self.parse_expression()?;
            self.expect(TokenKind::Colon, "`:`")?;
            let else_branch = self.parse_ternary()?;
            let end = self.span();
            return Ok(self
                .tree
                .alloc(NodeKind::Ternary { cond, then_branch, else_branch }, merge(start, end)));
        }
        Ok(cond)
    }

    fn parse_binop_level(
        &mut self,
        next: fn(&mut Self) -> ParseResult<NodeId>,
        ops: &[(TokenKind, BinOp)],
    ) -> ParseResult<NodeId> {
        let start = self.span();
        let mut lhs = next(self)?;
        loop {
            let matched = ops.iter().find(|(tok, _)| self.peek() == tok).cloned();
            match matched {
                Some((_, op)) => {
                    self.bump();
                    let rhs = next(self)?;
                    let end = self.span();
                    lhs = self.tree.alloc(NodeKind::Binary { op, lhs, rhs }, merge(start, end));
                }
                None => break,
            }
        }
        Ok(lhs)
    }

    fn parse_logical_or(&mut self) -> ParseResult<NodeId> {
        self.parse_binop_level(Self::parse_logical_and, &[(TokenKind::OrOr, BinOp::Or)])
    }

    fn parse_logical_and(&mut self) -> ParseResult<NodeId> {
        self.parse_binop_level(Self::parse_equality, &[(TokenKind::AndAnd, BinOp::And)])
    }

    fn parse_equality(&mut self) -> ParseResult<NodeId> {
        self.parse_binop_level(
            Self::parse_relational,
            &[(TokenKind::Eq, BinOp::Eq), (TokenKind::Ne, BinOp::Ne)],
        )
    }

    fn parse_relational(&mut self) -> ParseResult<NodeId> {
        self.parse_binop_level(
            Self::parse_additive,
            &[
                (TokenKind::Lt, BinOp::Lt),
                (TokenKind::Le, BinOp::Le),
                (TokenKind::Gt, BinOp::Gt),
                (TokenKind::Ge, BinOp::Ge),
            ],
        )
    }

    fn parse_additive(&mut self) -> ParseResult<NodeId> {
        self.parse_binop_level(
            Self::parse_multiplicative,
            &[(TokenKind::Plus, BinOp::Add), (TokenKind::Minus, BinOp::Sub)],
        )
    }

    fn parse_multiplicative(&mut self) -> ParseResult<NodeId> {
        self.parse_binop_level(
            Self::parse_unary,
            &[
                (TokenKind::Star, BinOp::Mul),
                (TokenKind::Slash, BinOp::Div),
                (TokenKind::Percent, BinOp::Mod),
            ],
        )
    }

    fn parse_unary(&mut self) -> ParseResult<NodeId> {
        let start = self.span();
        let op = match *self.peek() {
            TokenKind::Minus => Some(UnOp::Neg),
            TokenKind::Not => Some(UnOp::Not),
            TokenKind::Amp => Some(UnOp::Addr),
            TokenKind::Star => Some(UnOp::Deref),
            _ => None,
        };
        match op {
            Some(op) => {
                self.bump();
                let operand = self.parse_unary()?;
                let end = self.span();
                Ok(self.tree.alloc(NodeKind::Unary { op, operand }, merge(start, end)))
            }
            None => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> ParseResult<NodeId> {
        let start = self.span();
        let mut expr = self.parse_primary()?;
        loop {
            match *self.peek() {
                TokenKind::LBracket => {
                    self.bump();
                    let index = self.parse_expression()?;
                    self.expect(TokenKind::RBracket, "`]`")?;
                    let end = self.span();
                    expr = self.tree.alloc(NodeKind::Subscript { array: expr, index }, merge(start, end));
                }
                TokenKind::LParen => {
                    self.bump();
                    let mut args = Vec::new();
                    if !matches!(self.peek(), TokenKind::RParen) {
                        loop {
                            args.push(self.parse_expression()?);
                            if !self.eat(&TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::RParen, "`)`")?;
                    let end = self.span();
                    expr = self.tree.alloc(NodeKind::Call { callee: expr, args }, merge(start, end));
                }
                TokenKind::Dot => {
                    self.bump();
                    let (name, _) = self.expect_ident()?;
                    let end = self.span();
                    expr = self.tree.alloc(NodeKind::Member { base: expr, name }, merge(start, end));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> ParseResult<NodeId> {
        let span = self.span();
        match *self.peek() {
            TokenKind::Ident(sym) => {
                self.bump();
                let repr = self.sema.intern(sym);
                if matches!(self.sema.names.binding(repr), rucc_sem::Binding::Unbound) {
                    return Err(ParseError::UndefinedIdentifier(sym));
                }
                Ok(self.tree.alloc(NodeKind::Ident(sym), span))
            }
            TokenKind::IntLiteral(v) => {
                self.bump();
                Ok(self.tree.alloc_typed(NodeKind::IntLiteral(v), span, ModeId::INT))
            }
            TokenKind::FloatLiteral(v) => {
                self.bump();
                Ok(self.tree.alloc_typed(NodeKind::FloatLiteral(v), span, ModeId::FLOAT))
            }
            TokenKind::CharLiteral(v) => {
                self.bump();
                Ok(self.tree.alloc_typed(NodeKind::CharLiteral(v), span, ModeId::CHAR))
            }
            TokenKind::StringLiteral(v) => {
                self.bump();
                Ok(self.tree.alloc(NodeKind::StringLiteral(v), span))
            }
            TokenKind::LParen => {
                self.bump();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen, "`)`")?;
                Ok(expr)
            }
            _ => Err(ParseError::Expected {
                expected: "expression",
                found: format!("{:?}", self.peek()),
                span,
            }),
        }
    }
}
