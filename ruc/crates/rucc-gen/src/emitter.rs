//! Bytecode emitter: walks the AST built by `rucc-par` and writes a
//! [`BytecodePool`] (§6).
//!
//! Code generation runs as its own pass, strictly after `Sema::check`
//! reports no errors. By the time that pass runs, `SymbolTable`'s block and
//! function frames have already unwound (each `exit_block`/`exit_function`
//! restores the name table per P3) — the scope state that assigned a
//! variable's displacement no longer exists. Rather than reach back into
//! `Sema`, the emitter rebuilds an equivalent displacement mapping itself by
//! walking the same declaration structure the parser walked, mirroring
//! `SymbolTable`'s own bookkeeping: function scope starts at displacement 3
//! and grows upward, global scope starts at -3 and grows downward (each
//! variable's own displacement is the value *before* advancing, exactly as
//! `SymbolTable::bind` hands out). A function's own top-level `Compound`
//! body shares its parameter frame (no extra block, matching the parser's
//! `parse_compound_stmt_body` special case); any nested `Compound` gets a
//! fresh frame.
//!
//! Scope restricted to direct named calls and to indexing/member/address
//! expressions rooted at a plain identifier — the common patterns a closed
//! teaching grammar actually produces. A more general lvalue/address
//! computation would need type annotations on every expression node, which
//! the tree does not carry outside declarations.

use std::collections::HashMap;

use rucc_par::{BinOp, NodeId, NodeKind, Tree, UnOp};
use rucc_sem::{ModeId, ModeTag, Sema};
use rucc_util::Symbol;

use crate::error::{GenError, GenResult};
use crate::op::Op;
use crate::pool::BytecodePool;

/// Function scope: displacement grows upward from 3 (symtab.rs's
/// `enter_function`).
const FUNCTION_BASE_DISPL: i32 = 3;
/// Global scope: displacement grows downward from -3 (symtab.rs's default
/// table construction).
const GLOBAL_BASE_DISPL: i32 = -3;

#[derive(Clone, Copy)]
enum VarLoc {
    Local(i32),
    Global(i32),
}

/// The finished image: the four-part layout of §6.
pub struct BytecodeImage {
    pub cells: Vec<i64>,
    /// Address of `main`, written into the prologue slot (offset 0).
    pub entry: i64,
    /// Offset of the function address table within `cells`.
    pub function_table_offset: usize,
    /// Number of entries in the function address table, in definition order.
    pub function_count: usize,
    /// Address of the synthesized global-initializer procedure, if any
    /// global carried an initializer.
    pub global_init: Option<i64>,
    /// String literal contents, indexed by the literal id pushed as an
    /// operand of `Op::Push` at a `StringLiteral` node (no dedicated string
    /// section exists in the pool itself — §6 fixes the layout to four
    /// parts, none of which is string data).
    pub strings: Vec<&'static str>,
}

struct LoopCtx {
    continue_patches: Vec<usize>,
}

struct Emitter<'a> {
    tree: &'a Tree,
    sema: &'a Sema,
    pool: BytecodePool,
    scopes: Vec<HashMap<Symbol, (i32, ModeId)>>,
    next_displ: i32,
    globals: HashMap<Symbol, (i32, ModeId)>,
    next_global_displ: i32,
    fn_addr: HashMap<Symbol, i64>,
    fn_order: Vec<Symbol>,
    pending_calls: Vec<(usize, Symbol)>,
    goto_labels: HashMap<Symbol, i64>,
    pending_gotos: Vec<(usize, Symbol)>,
    label_addr: HashMap<NodeId, i64>,
    loop_stack: Vec<LoopCtx>,
    break_stack: Vec<Vec<usize>>,
    global_inits: Vec<(i32, NodeId)>,
    strings: Vec<&'static str>,
}

/// Walks `root` (a `TranslationUnit`) and produces its bytecode image.
/// `sema` must already have passed [`rucc_sem::Sema::check`] with no errors.
pub fn generate(tree: &Tree, sema: &Sema, root: NodeId) -> GenResult<BytecodeImage> {
    let mut emitter = Emitter {
        tree,
        sema,
        pool: BytecodePool::new(),
        scopes: Vec::new(),
        next_displ: FUNCTION_BASE_DISPL,
        globals: HashMap::new(),
        next_global_displ: GLOBAL_BASE_DISPL,
        fn_addr: HashMap::new(),
        fn_order: Vec::new(),
        pending_calls: Vec::new(),
        goto_labels: HashMap::new(),
        pending_gotos: Vec::new(),
        label_addr: HashMap::new(),
        loop_stack: Vec::new(),
        break_stack: Vec::new(),
        global_inits: Vec::new(),
        strings: Vec::new(),
    };
    emitter.run(root)
}

fn ident_symbol(tree: &Tree, id: NodeId) -> GenResult<Symbol> {
    match &tree.get(id).kind {
        NodeKind::Ident(sym) => Ok(*sym),
        _ => Err(GenError::UnsupportedIndexTarget),
    }
}

impl<'a> Emitter<'a> {
    fn run(&mut self, root: NodeId) -> GenResult<BytecodeImage> {
        let prologue = self.pool.reserve(1)?;

        let NodeKind::TranslationUnit(items) = &self.tree.get(root).kind else {
            unreachable!("generate is always called on a translation-unit root");
        };
        let items = items.clone();
        for item in items {
            self.gen_top_level(item)?;
        }

        for (off, name) in self.pending_calls.drain(..).collect::<Vec<_>>() {
            let addr = *self.fn_addr.get(&name).expect(
                "sema.check() guarantees every predeclared function is eventually defined",
            );
            self.pool.patch(off, addr)?;
        }

        let function_table_offset = self.pool.size();
        let function_count = self.fn_order.len();
        for name in self.fn_order.clone() {
            let addr = self.fn_addr[&name];
            self.pool.emit(addr)?;
        }

        let global_init = if self.global_inits.is_empty() {
            None
        } else {
            let addr = self.pool.size() as i64;
            for (displ, init) in self.global_inits.clone() {
                self.gen_expr(init)?;
                self.emit_op(Op::StoreGlobal(displ))?;
            }
            self.emit_op(Op::Ret)?;
            Some(addr)
        };

        let main = Symbol::intern("main");
        let entry = *self.fn_addr.get(&main).ok_or(GenError::NoMain)?;
        self.pool.patch(prologue, entry)?;

        Ok(BytecodeImage {
            cells: self.pool.bytecode_view().to_vec(),
            entry,
            function_table_offset,
            function_count,
            global_init,
            strings: std::mem::take(&mut self.strings),
        })
    }

    fn emit_op(&mut self, op: Op) -> GenResult<usize> {
        let start = self.pool.size();
        let mut buf = Vec::with_capacity(op.len());
        op.encode(&mut buf);
        for cell in buf {
            self.pool.emit(cell)?;
        }
        Ok(start)
    }

    fn resolve(&self, sym: Symbol) -> GenResult<(VarLoc, ModeId)> {
        for frame in self.scopes.iter().rev() {
            if let Some(&(displ, mode)) = frame.get(&sym) {
                return Ok((VarLoc::Local(displ), mode));
            }
        }
        if let Some(&(displ, mode)) = self.globals.get(&sym) {
            return Ok((VarLoc::Global(displ), mode));
        }
        Err(GenError::UnresolvedIdentifier(sym))
    }

    fn alloc_local(&mut self, size: usize) -> i32 {
        let d = self.next_displ;
        self.next_displ += size as i32;
        d
    }

    fn alloc_global(&mut self, size: usize) -> i32 {
        let d = self.next_global_displ;
        self.next_global_displ -= size as i32;
        d
    }

    fn struct_field_offset(&self, mode: ModeId, field: Symbol) -> GenResult<(i32, ModeId)> {
        match self.sema.modes.get(mode) {
            ModeTag::Struct { fields, .. } => {
                let mut off = 0i32;
                for (name, fmode) in fields {
                    if *name == field {
                        return Ok((off, *fmode));
                    }
                    off += self.sema.modes.size_of(*fmode) as i32;
                }
                Err(GenError::UnknownField(field))
            }
            _ => Err(GenError::NotAStruct),
        }
    }

    // ---- top level ---------------------------------------------------

    fn gen_top_level(&mut self, id: NodeId) -> GenResult<()> {
        let tree = self.tree;
        match &tree.get(id).kind {
            NodeKind::FunctionDecl { name, mode, params, body } => {
                self.gen_function(*name, *mode, params.clone(), *body)
            }
            NodeKind::VariableDecl { name, mode, init } => {
                self.gen_global_var(*name, *mode, *init)
            }
            NodeKind::List(items) => {
                for item in items.clone() {
                    self.gen_top_level(item)?;
                }
                Ok(())
            }
            NodeKind::TypeDecl { .. } => Ok(()),
            _ => unreachable!("translation-unit items are declarations"),
        }
    }

    fn gen_global_var(&mut self, name: Symbol, mode: ModeId, init: Option<NodeId>) -> GenResult<()> {
        let size = self.sema.modes.size_of(mode);
        let displ = self.alloc_global(size);
        self.globals.insert(name, (displ, mode));
        if let Some(e) = init {
            self.global_inits.push((displ, e));
        }
        Ok(())
    }

    fn gen_function(
        &mut self,
        name: Symbol,
        mode: ModeId,
        params: Vec<Symbol>,
        body: Option<NodeId>,
    ) -> GenResult<()> {
        let Some(body) = body else {
            return Ok(());
        };

        let param_modes = match self.sema.modes.get(mode) {
            ModeTag::Function { params: p, .. } => p.clone(),
            _ => unreachable!("a function declarator always carries a Function mode"),
        };

        let addr = self.pool.size() as i64;
        self.fn_addr.insert(name, addr);
        self.fn_order.push(name);

        self.next_displ = FUNCTION_BASE_DISPL;
        let mut frame = HashMap::new();
        for (pname, pmode) in params.iter().zip(param_modes.iter()) {
            let size = self.sema.modes.size_of(*pmode);
            let displ = self.alloc_local(size);
            frame.insert(*pname, (displ, *pmode));
        }
        self.scopes.push(frame);
        self.goto_labels.clear();

        // The function's own Compound shares this frame (parser's
        // `parse_compound_stmt_body` does not push an extra block), so we
        // emit its statement list directly instead of calling `gen_stmt`
        // on it (which would push a fresh one).
        match &self.tree.get(body).kind {
            NodeKind::Compound(stmts) => {
                for s in stmts.clone() {
                    self.gen_stmt(s)?;
                }
            }
            _ => self.gen_stmt(body)?,
        }
        self.emit_op(Op::Ret)?;

        for (off, label) in self.pending_gotos.drain(..).collect::<Vec<_>>() {
            let addr = *self
                .goto_labels
                .get(&label)
                .ok_or(GenError::UndefinedLabel(label))?;
            self.pool.patch(off, addr)?;
        }

        self.scopes.pop();
        Ok(())
    }

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    // ---- statements ----------------------------------------------------

    fn gen_stmt(&mut self, id: NodeId) -> GenResult<()> {
        let tree = self.tree;
        match tree.get(id).kind.clone() {
            NodeKind::Compound(stmts) => {
                self.push_scope();
                for s in stmts {
                    self.gen_stmt(s)?;
                }
                self.pop_scope();
                Ok(())
            }
            NodeKind::DeclStmt(decl) => self.gen_decl(decl),
            NodeKind::ExprStmt(e) => {
                self.gen_expr(e)?;
                self.emit_op(Op::Pop)?;
                Ok(())
            }
            NodeKind::NullStmt => Ok(()),
            NodeKind::Labeled { label, stmt } => {
                self.goto_labels.insert(label, self.pool.size() as i64);
                self.gen_stmt(stmt)
            }
            NodeKind::Case { value, stmt } => {
                self.label_addr.insert(id, self.pool.size() as i64);
                let _ = value;
                self.gen_stmt(stmt)
            }
            NodeKind::Default(stmt) => {
                self.label_addr.insert(id, self.pool.size() as i64);
                self.gen_stmt(stmt)
            }
            NodeKind::If { cond, then_branch, else_branch } => {
                self.gen_expr(cond)?;
                let jf = self.emit_op(Op::JmpFalse(0))?;
                self.gen_stmt(then_branch)?;
                match else_branch {
                    Some(else_b) => {
                        let jmp = self.emit_op(Op::Jmp(0))?;
                        let else_addr = self.pool.size() as i64;
                        self.pool.patch(jf + 1, else_addr)?;
                        self.gen_stmt(else_b)?;
                        let end = self.pool.size() as i64;
                        self.pool.patch(jmp + 1, end)?;
                    }
                    None => {
                        let end = self.pool.size() as i64;
                        self.pool.patch(jf + 1, end)?;
                    }
                }
                Ok(())
            }
            NodeKind::While { cond, body } => {
                let cond_addr = self.pool.size() as i64;
                self.gen_expr(cond)?;
                let jf = self.emit_op(Op::JmpFalse(0))?;
                self.break_stack.push(Vec::new());
                self.loop_stack.push(LoopCtx { continue_patches: Vec::new() });
                self.gen_stmt(body)?;
                self.emit_op(Op::Jmp(cond_addr))?;
                let end_addr = self.pool.size() as i64;
                self.pool.patch(jf + 1, end_addr)?;
                let ctx = self.loop_stack.pop().unwrap();
                for off in ctx.continue_patches {
                    self.pool.patch(off, cond_addr)?;
                }
                let breaks = self.break_stack.pop().unwrap();
                for off in breaks {
                    self.pool.patch(off, end_addr)?;
                }
                Ok(())
            }
            NodeKind::DoWhile { body, cond } => {
                let body_addr = self.pool.size() as i64;
                self.break_stack.push(Vec::new());
                self.loop_stack.push(LoopCtx { continue_patches: Vec::new() });
                self.gen_stmt(body)?;
                let cond_addr = self.pool.size() as i64;
                self.gen_expr(cond)?;
                self.emit_op(Op::JmpTrue(body_addr))?;
                let end_addr = self.pool.size() as i64;
                let ctx = self.loop_stack.pop().unwrap();
                for off in ctx.continue_patches {
                    self.pool.patch(off, cond_addr)?;
                }
                let breaks = self.break_stack.pop().unwrap();
                for off in breaks {
                    self.pool.patch(off, end_addr)?;
                }
                Ok(())
            }
            NodeKind::For { init, cond, step, body } => {
                self.push_scope();
                if let Some(i) = init {
                    self.gen_expr(i)?;
                    self.emit_op(Op::Pop)?;
                }
                let cond_addr = self.pool.size() as i64;
                let jf = match cond {
                    Some(c) => {
                        self.gen_expr(c)?;
                        Some(self.emit_op(Op::JmpFalse(0))?)
                    }
                    None => None,
                };
                self.break_stack.push(Vec::new());
                self.loop_stack.push(LoopCtx { continue_patches: Vec::new() });
                self.gen_stmt(body)?;
                let step_addr = self.pool.size() as i64;
                if let Some(s) = step {
                    self.gen_expr(s)?;
                    self.emit_op(Op::Pop)?;
                }
                self.emit_op(Op::Jmp(cond_addr))?;
                let end_addr = self.pool.size() as i64;
                if let Some(jf_off) = jf {
                    self.pool.patch(jf_off + 1, end_addr)?;
                }
                let ctx = self.loop_stack.pop().unwrap();
                for off in ctx.continue_patches {
                    self.pool.patch(off, step_addr)?;
                }
                let breaks = self.break_stack.pop().unwrap();
                for off in breaks {
                    self.pool.patch(off, end_addr)?;
                }
                self.pop_scope();
                Ok(())
            }
            NodeKind::Switch { cond, body } => self.gen_switch(cond, body),
            NodeKind::Goto(label) => {
                let off = self.emit_op(Op::Jmp(0))?;
                self.pending_gotos.push((off + 1, label));
                Ok(())
            }
            NodeKind::Continue => {
                if self.loop_stack.is_empty() {
                    return Err(GenError::ContinueOutsideLoop);
                }
                let off = self.emit_op(Op::Jmp(0))?;
                self.loop_stack.last_mut().unwrap().continue_patches.push(off + 1);
                Ok(())
            }
            NodeKind::Break => {
                if self.break_stack.is_empty() {
                    return Err(GenError::BreakOutsideLoop);
                }
                let off = self.emit_op(Op::Jmp(0))?;
                self.break_stack.last_mut().unwrap().push(off + 1);
                Ok(())
            }
            NodeKind::Return(value) => {
                match value {
                    Some(e) => {
                        self.gen_expr(e)?;
                        self.emit_op(Op::RetVal)?;
                    }
                    None => {
                        self.emit_op(Op::Ret)?;
                    }
                }
                Ok(())
            }
            _ => unreachable!("not a statement node"),
        }
    }

    fn gen_decl(&mut self, id: NodeId) -> GenResult<()> {
        let tree = self.tree;
        match tree.get(id).kind.clone() {
            NodeKind::VariableDecl { name, mode, init } => {
                let size = self.sema.modes.size_of(mode);
                let displ = self.alloc_local(size);
                self.scopes.last_mut().unwrap().insert(name, (displ, mode));
                if let Some(e) = init {
                    self.gen_expr(e)?;
                    self.emit_op(Op::StoreLocal(displ))?;
                }
                Ok(())
            }
            NodeKind::List(items) => {
                for item in items {
                    self.gen_decl(item)?;
                }
                Ok(())
            }
            NodeKind::TypeDecl { .. } => Ok(()),
            _ => unreachable!("DeclStmt always wraps a declaration"),
        }
    }

    fn peel_labels(&self, id: NodeId, out: &mut Vec<(Option<i64>, NodeId)>) -> GenResult<()> {
        match &self.tree.get(id).kind {
            NodeKind::Case { value, stmt } => {
                let v = self.const_eval_case_value(*value)?;
                out.push((Some(v), id));
                self.peel_labels(*stmt, out)
            }
            NodeKind::Default(stmt) => {
                out.push((None, id));
                self.peel_labels(*stmt, out)
            }
            _ => Ok(()),
        }
    }

    fn const_eval_case_value(&self, id: NodeId) -> GenResult<i64> {
        match &self.tree.get(id).kind {
            NodeKind::IntLiteral(v) => Ok(*v),
            NodeKind::CharLiteral(c) => Ok(*c as i64),
            NodeKind::Unary { op: UnOp::Neg, operand } => {
                Ok(-self.const_eval_case_value(*operand)?)
            }
            _ => Err(GenError::NonConstantCaseLabel),
        }
    }

    fn top_level_stmts(&self, id: NodeId) -> Vec<NodeId> {
        match &self.tree.get(id).kind {
            NodeKind::Compound(stmts) => stmts.clone(),
            _ => vec![id],
        }
    }

    fn gen_switch(&mut self, cond: NodeId, body: NodeId) -> GenResult<()> {
        let tmp = self.alloc_local(1);
        self.gen_expr(cond)?;
        self.emit_op(Op::StoreLocal(tmp))?;

        let mut labels = Vec::new();
        for s in self.top_level_stmts(body) {
            self.peel_labels(s, &mut labels)?;
        }

        let mut case_list = Vec::new();
        let mut default_id = None;
        for (value, node_id) in labels {
            match value {
                Some(v) => case_list.push((v, node_id)),
                None => default_id = Some(node_id),
            }
        }

        let mut dispatch_patches = Vec::new();
        for (v, node_id) in case_list {
            self.emit_op(Op::LoadLocal(tmp))?;
            self.emit_op(Op::Push(v))?;
            self.emit_op(Op::Eq)?;
            let jt = self.emit_op(Op::JmpFalse(0))?;
            let jmp = self.emit_op(Op::Jmp(0))?;
            let after_cmp = self.pool.size() as i64;
            self.pool.patch(jt + 1, after_cmp)?;
            dispatch_patches.push((jmp + 1, node_id));
        }
        let fallthrough_patch = self.emit_op(Op::Jmp(0))?;

        self.break_stack.push(Vec::new());
        self.gen_stmt(body)?;
        let end_addr = self.pool.size() as i64;
        let breaks = self.break_stack.pop().unwrap();
        for off in breaks {
            self.pool.patch(off, end_addr)?;
        }

        for (off, node_id) in dispatch_patches {
            let addr = *self
                .label_addr
                .get(&node_id)
                .expect("case label must be emitted by gen_stmt(body)");
            self.pool.patch(off, addr)?;
        }
        match default_id {
            Some(node_id) => {
                let addr = *self
                    .label_addr
                    .get(&node_id)
                    .expect("default label must be emitted by gen_stmt(body)");
                self.pool.patch(fallthrough_patch + 1, addr)?;
            }
            None => {
                self.pool.patch(fallthrough_patch + 1, end_addr)?;
            }
        }
        Ok(())
    }

    // ---- expressions ---------------------------------------------------

    fn gen_expr(&mut self, id: NodeId) -> GenResult<()> {
        let tree = self.tree;
        match tree.get(id).kind.clone() {
            NodeKind::IntLiteral(v) => {
                self.emit_op(Op::Push(v))?;
            }
            NodeKind::CharLiteral(c) => {
                self.emit_op(Op::Push(c as i64))?;
            }
            NodeKind::FloatLiteral(f) => {
                self.emit_op(Op::Push(f.to_bits() as i64))?;
            }
            NodeKind::StringLiteral(sym) => {
                let idx = self.strings.len() as i64;
                self.strings.push(sym.as_str());
                self.emit_op(Op::Push(idx))?;
            }
            NodeKind::Ident(sym) => {
                let (loc, _mode) = self.resolve(sym)?;
                match loc {
                    VarLoc::Local(d) => self.emit_op(Op::LoadLocal(d))?,
                    VarLoc::Global(d) => self.emit_op(Op::LoadGlobal(d))?,
                };
            }
            NodeKind::Subscript { array, index } => {
                let elem_mode = self.gen_ident_base_addr(array)?;
                self.gen_expr(index)?;
                let size = self.sema.modes.size_of(elem_mode) as i64;
                self.emit_op(Op::Push(size))?;
                self.emit_op(Op::Mul)?;
                self.emit_op(Op::Add)?;
                self.emit_op(Op::LoadIndirect)?;
            }
            NodeKind::Member { base, name } => {
                let sym = ident_symbol(tree, base)?;
                let (loc, mode) = self.resolve(sym)?;
                let (off, _fmode) = self.struct_field_offset(mode, name)?;
                match loc {
                    VarLoc::Local(d) => self.emit_op(Op::LoadLocal(d + off))?,
                    VarLoc::Global(d) => self.emit_op(Op::LoadGlobal(d + off))?,
                };
            }
            NodeKind::Call { callee, args } => {
                let name = ident_symbol(tree, callee)?;
                for a in args.iter() {
                    self.gen_expr(*a)?;
                }
                let argc = args.len() as i32;
                match self.fn_addr.get(&name) {
                    Some(&addr) => {
                        self.emit_op(Op::Call { target: addr, argc })?;
                    }
                    None => {
                        let off = self.emit_op(Op::Call { target: 0, argc })?;
                        self.pending_calls.push((off + 1, name));
                    }
                }
            }
            NodeKind::Unary { op, operand } => match op {
                UnOp::Neg => {
                    self.gen_expr(operand)?;
                    self.emit_op(Op::Neg)?;
                }
                UnOp::Not => {
                    self.gen_expr(operand)?;
                    self.emit_op(Op::Not)?;
                }
                UnOp::Deref => {
                    self.gen_expr(operand)?;
                    self.emit_op(Op::LoadIndirect)?;
                }
                UnOp::Addr => {
                    let sym = ident_symbol(tree, operand)?;
                    let (loc, _mode) = self.resolve(sym)?;
                    match loc {
                        VarLoc::Local(d) => self.emit_op(Op::LocalAddr(d))?,
                        VarLoc::Global(d) => self.emit_op(Op::GlobalAddr(d))?,
                    };
                }
            },
            NodeKind::Binary { op, lhs, rhs } => {
                if op == BinOp::Assign {
                    self.gen_assign(lhs, rhs)?;
                } else {
                    self.gen_expr(lhs)?;
                    self.gen_expr(rhs)?;
                    let opcode = match op {
                        BinOp::Add => Op::Add,
                        BinOp::Sub => Op::Sub,
                        BinOp::Mul => Op::Mul,
                        BinOp::Div => Op::Div,
                        BinOp::Mod => Op::Mod,
                        BinOp::Eq => Op::Eq,
                        BinOp::Ne => Op::Ne,
                        BinOp::Lt => Op::Lt,
                        BinOp::Le => Op::Le,
                        BinOp::Gt => Op::Gt,
                        BinOp::Ge => Op::Ge,
                        BinOp::And => Op::And,
                        BinOp::Or => Op::Or,
                        BinOp::Assign => unreachable!(),
                    };
                    self.emit_op(opcode)?;
                }
            }
            NodeKind::Ternary { cond, then_branch, else_branch } => {
                self.gen_expr(cond)?;
                let jf = self.emit_op(Op::JmpFalse(0))?;
                self.gen_expr(then_branch)?;
                let jmp = self.emit_op(Op::Jmp(0))?;
                let else_addr = self.pool.size() as i64;
                self.pool.patch(jf + 1, else_addr)?;
                self.gen_expr(else_branch)?;
                let end = self.pool.size() as i64;
                self.pool.patch(jmp + 1, end)?;
            }
            NodeKind::List(_) => return Err(GenError::UnsupportedExpressionList),
            _ => unreachable!("not an expression node"),
        }
        Ok(())
    }

    /// Pushes the address of an array's first element (or the value held by
    /// a pointer variable), returning its element mode. Restricted to a
    /// directly-named variable.
    fn gen_ident_base_addr(&mut self, id: NodeId) -> GenResult<ModeId> {
        let sym = ident_symbol(self.tree, id)?;
        let (loc, mode) = self.resolve(sym)?;
        match self.sema.modes.get(mode).clone() {
            ModeTag::Array { element, .. } => {
                match loc {
                    VarLoc::Local(d) => self.emit_op(Op::LocalAddr(d))?,
                    VarLoc::Global(d) => self.emit_op(Op::GlobalAddr(d))?,
                };
                Ok(element)
            }
            ModeTag::Pointer { element } => {
                match loc {
                    VarLoc::Local(d) => self.emit_op(Op::LoadLocal(d))?,
                    VarLoc::Global(d) => self.emit_op(Op::LoadGlobal(d))?,
                };
                Ok(element)
            }
            _ => Err(GenError::NotIndexable),
        }
    }

    fn gen_assign(&mut self, lhs: NodeId, rhs: NodeId) -> GenResult<()> {
        let tree = self.tree;
        match tree.get(lhs).kind.clone() {
            NodeKind::Ident(sym) => {
                let (loc, _mode) = self.resolve(sym)?;
                self.gen_expr(rhs)?;
                self.emit_op(Op::Dup)?;
                match loc {
                    VarLoc::Local(d) => self.emit_op(Op::StoreLocal(d))?,
                    VarLoc::Global(d) => self.emit_op(Op::StoreGlobal(d))?,
                };
            }
            NodeKind::Member { base, name } => {
                let sym = ident_symbol(tree, base)?;
                let (loc, mode) = self.resolve(sym)?;
                let (off, _fmode) = self.struct_field_offset(mode, name)?;
                self.gen_expr(rhs)?;
                self.emit_op(Op::Dup)?;
                match loc {
                    VarLoc::Local(d) => self.emit_op(Op::StoreLocal(d + off))?,
                    VarLoc::Global(d) => self.emit_op(Op::StoreGlobal(d + off))?,
                };
            }
            NodeKind::Subscript { array, index } => {
                self.gen_expr(rhs)?;
                self.emit_op(Op::Dup)?;
                let elem_mode = self.gen_ident_base_addr(array)?;
                self.gen_expr(index)?;
                let size = self.sema.modes.size_of(elem_mode) as i64;
                self.emit_op(Op::Push(size))?;
                self.emit_op(Op::Mul)?;
                self.emit_op(Op::Add)?;
                self.emit_op(Op::StoreIndirect)?;
            }
            NodeKind::Unary { op: UnOp::Deref, operand } => {
                self.gen_expr(rhs)?;
                self.emit_op(Op::Dup)?;
                self.gen_expr(operand)?;
                self.emit_op(Op::StoreIndirect)?;
            }
            _ => return Err(GenError::InvalidAssignmentTarget),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::OpCode;

    fn compile(src: &str) -> BytecodeImage {
        let (tree, sema, root) = rucc_par::parse(src).expect("parse");
        assert!(sema.check().is_empty(), "sema errors in test fixture");
        generate(&tree, &sema, root).expect("generate")
    }

    #[test]
    fn trivial_main_compiles_to_a_non_empty_pool() {
        let image = compile("int main(){ return 0; }");
        assert!(!image.cells.is_empty());
        assert_eq!(image.entry, 1); // prologue slot occupies offset 0
    }

    #[test]
    fn prologue_slot_points_at_main() {
        let image = compile("int f(){ return 1; } int main(){ return f(); }");
        assert_eq!(image.cells[0], image.entry);
        assert_eq!(image.function_count, 2);
    }

    #[test]
    fn forward_call_patches_the_real_address() {
        let image = compile("int g(); int main(){ return g(); } int g(){ return 5; }");
        let g_addr = image.cells[image.function_table_offset + 1];
        // main's Call instruction (Halt-padded layout: opcode, target, argc)
        // must have been patched to g's real address, not left at 0.
        assert!(image.cells.windows(3).any(|w| w[0] == OpCode::Call as i64 && w[1] == g_addr));
        assert_eq!(image.function_count, 2);
    }

    #[test]
    fn global_initializer_is_emitted_as_its_own_procedure() {
        let image = compile("int g = 7; int main(){ return g; }");
        assert!(image.global_init.is_some());
    }

    #[test]
    fn if_else_and_while_compile_without_error() {
        let src = "int main(){ int i; i = 0; while (i < 10) { if (i == 5) { break; } i = i + 1; } return i; }";
        let image = compile(src);
        assert!(!image.cells.is_empty());
    }

    #[test]
    fn switch_with_fallthrough_and_default_compiles() {
        let src = "int main(){ int x; x = 2; switch (x) { case 1: x = 10; case 2: x = 20; break; default: x = 0; } return x; }";
        let image = compile(src);
        assert!(!image.cells.is_empty());
    }

    #[test]
    fn struct_member_access_computes_field_offset() {
        let src = "struct P { int x; int y; }; int main(){ struct P p; p.x = 1; p.y = 2; return p.x; }";
        let image = compile(src);
        assert!(!image.cells.is_empty());
    }

    #[test]
    fn continue_outside_loop_is_rejected() {
        let (tree, sema, root) = rucc_par::parse("int main(){ continue; return 0; }").unwrap();
        assert!(sema.check().is_empty());
        assert!(matches!(
            generate(&tree, &sema, root),
            Err(GenError::ContinueOutsideLoop)
        ));
    }

    #[test]
    fn array_indexing_round_trips() {
        let src = "int main(){ int a[3]; a[0] = 1; a[1] = 2; return a[0] + a[1]; }";
        let image = compile(src);
        assert!(!image.cells.is_empty());
    }
}
