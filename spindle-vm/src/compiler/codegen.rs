// spindle-vm - Bytecode compiler and register virtual machine for the Spindle programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Code generation: transforms the AST to a program word stream.

use std::collections::HashSet;

use spindle_parser::ast::{BinOp, Expr, ExprKind, LogOp, Stmt, StmtKind, UnOp};
use spindle_parser::lexer::SourcePos;

use crate::opcode::{
    self, ConstKind, FUNCHDR_IDX_ARGC, FUNCHDR_IDX_BODYLEN, FUNCHDR_IDX_NREGS,
    FUNCHDR_IDX_SYMCNT, FUNCHDR_LEN, Opcode, UpvalKind, Word,
};

use super::symtab::SymtabBuilder;
use super::{CompileError, Result};

/// Where an expression result lives. Temporaries are freed by the
/// consumer, in reverse allocation order; locals are never freed by
/// expression code.
#[derive(Debug, Clone, Copy)]
struct ExprLoc {
    reg: u8,
    temp: bool,
}

impl ExprLoc {
    fn temp(reg: u8) -> Self {
        ExprLoc { reg, temp: true }
    }

    fn local(reg: u8) -> Self {
        ExprLoc { reg, temp: false }
    }
}

/// A block-scoped local variable.
struct Local {
    name: String,
    #[allow(dead_code)]
    reg: u8,
}

/// An upvalue captured by the function being compiled.
struct UpvalDesc {
    name: String,
    kind: UpvalKind,
    index: u8,
}

/// Patch lists for the innermost loop.
struct LoopCtx {
    break_patches: Vec<usize>,
    continue_patches: Vec<usize>,
}

/// Per-function compilation state. Functions nest: while a nested
/// function body is being compiled, its enclosing functions sit lower
/// on the `Compiler::funcs` stack with their scopes still live, which
/// is what upvalue resolution walks.
struct FuncScope {
    /// Block scopes, innermost last. Scope 0 holds the parameters.
    scopes: Vec<Vec<Local>>,

    /// Number of declared parameters.
    argc: usize,

    /// Next free register.
    next_reg: u16,

    /// High-water mark of simultaneously live registers; becomes the
    /// register count in the function header.
    max_reg: u16,

    /// Captured upvalues, in descriptor order.
    upvalues: Vec<UpvalDesc>,

    /// Free names assigned somewhere in this function body. These are
    /// resolved as globals throughout the function instead of being
    /// captured: upvalues are copies, so writes through them could
    /// never be observed by the enclosing scope.
    assigned_free: HashSet<String>,

    /// Loop nesting, for break/continue patching.
    loops: Vec<LoopCtx>,
}

impl FuncScope {
    fn new(params: &[String], assigned_free: HashSet<String>, pos: SourcePos) -> Result<Self> {
        if params.len() > u8::MAX as usize {
            return Err(CompileError::TooManyParameters { pos });
        }
        let locals = params
            .iter()
            .enumerate()
            .map(|(i, name)| Local {
                name: name.clone(),
                reg: i as u8,
            })
            .collect();
        Ok(FuncScope {
            scopes: vec![locals],
            argc: params.len(),
            next_reg: params.len() as u16,
            max_reg: params.len() as u16,
            upvalues: Vec::new(),
            assigned_free,
            loops: Vec::new(),
        })
    }

    fn alloc(&mut self, pos: SourcePos) -> Result<u8> {
        if self.next_reg > u8::MAX as u16 {
            return Err(CompileError::TooManyRegisters { pos });
        }
        let reg = self.next_reg as u8;
        self.next_reg += 1;
        self.max_reg = self.max_reg.max(self.next_reg);
        Ok(reg)
    }

    fn free(&mut self, loc: ExprLoc) {
        if loc.temp {
            debug_assert_eq!(self.next_reg, loc.reg as u16 + 1, "temporaries free LIFO");
            self.next_reg -= 1;
        }
    }

    fn resolve_local(&self, name: &str) -> Option<u8> {
        for scope in self.scopes.iter().rev() {
            for local in scope.iter().rev() {
                if local.name == name {
                    return Some(local.reg);
                }
            }
        }
        None
    }

    fn upvalue_index(&self, name: &str) -> Option<u8> {
        self.upvalues
            .iter()
            .position(|u| u.name == name)
            .map(|i| i as u8)
    }
}

/// Compiler for one compilation unit.
pub struct Compiler {
    /// The program image under construction: reserved header, then the
    /// executable section; the symbol table is appended at the end.
    words: Vec<Word>,

    /// Local symbol table builder.
    symtab: SymtabBuilder,

    /// Function compilation stack; last is the function being compiled.
    funcs: Vec<FuncScope>,

    /// Constant names declared in this unit, for duplicate detection.
    consts: HashSet<String>,
}

impl Compiler {
    /// Compile a program (a sequence of top-level statements) into a
    /// program image ready for [`crate::program::Program::from_words`].
    pub fn compile(stmts: &[Stmt]) -> Result<Vec<Word>> {
        let mut c = Compiler {
            words: vec![0; FUNCHDR_LEN],
            symtab: SymtabBuilder::new(),
            funcs: Vec::new(),
            consts: HashSet::new(),
        };

        let pos = stmts.first().map(|s| s.pos).unwrap_or_default();
        c.funcs.push(FuncScope::new(&[], HashSet::new(), pos)?);

        for stmt in stmts {
            c.compile_stmt(stmt)?;
        }
        c.emit_implicit_return(pos)?;

        let scope = c.funcs.pop().expect("top-level scope");
        let bodylen = c.words.len() - FUNCHDR_LEN;
        let nsyms = c.symtab.len();

        let symtab = std::mem::take(&mut c.symtab);
        symtab.finish(&mut c.words);

        c.words[FUNCHDR_IDX_BODYLEN] = bodylen as Word;
        c.words[FUNCHDR_IDX_ARGC] = 0;
        c.words[FUNCHDR_IDX_NREGS] = scope.max_reg.max(1) as Word;
        c.words[FUNCHDR_IDX_SYMCNT] = nsyms as Word;

        Ok(c.words)
    }

    // ========================================================================
    // Emission helpers
    // ========================================================================

    fn here(&self) -> usize {
        self.words.len()
    }

    fn emit(&mut self, word: Word) {
        self.words.push(word);
    }

    /// Emit a jump with a placeholder offset; returns the index of the
    /// offset word for later patching.
    fn emit_jump(&mut self, op: Opcode, reg: u8) -> usize {
        self.emit(opcode::ins_a(op, reg));
        self.emit(0);
        self.here() - 1
    }

    /// Patch the offset word at `offset_idx` to jump to `target`.
    /// Offsets are relative to the instruction after the offset word.
    fn patch_to(&mut self, offset_idx: usize, target: usize) {
        let offset = target as i64 - (offset_idx as i64 + 1);
        self.words[offset_idx] = offset as i32 as Word;
    }

    fn emit_implicit_return(&mut self, pos: SourcePos) -> Result<()> {
        let t = self.alloc(pos)?;
        self.emit(opcode::ins_ab(Opcode::LdConst, t, ConstKind::Nil as u8));
        self.emit(opcode::ins_a(Opcode::Ret, t));
        self.free(ExprLoc::temp(t));
        Ok(())
    }

    fn emit_global_store(&mut self, reg: u8, name: &str) {
        self.emit(opcode::ins_mid(Opcode::GlbVal, reg, name.len() as u16));
        self.words.extend(opcode::pack_cstr(name));
    }

    // ========================================================================
    // Register plumbing
    // ========================================================================

    fn cur(&mut self) -> &mut FuncScope {
        self.funcs.last_mut().expect("no active function scope")
    }

    fn alloc(&mut self, pos: SourcePos) -> Result<u8> {
        self.cur().alloc(pos)
    }

    fn free(&mut self, loc: ExprLoc) {
        self.cur().free(loc);
    }

    fn push_scope(&mut self) {
        self.cur().scopes.push(Vec::new());
    }

    fn pop_scope(&mut self) {
        let cur = self.cur();
        let scope = cur.scopes.pop().expect("unbalanced scope pop");
        cur.next_reg -= scope.len() as u16;
    }

    fn declare_local(&mut self, name: &str, pos: SourcePos) -> Result<u8> {
        let already = {
            let cur = self.funcs.last().expect("no active function scope");
            let scope = cur.scopes.last().expect("no active block scope");
            scope.iter().any(|l| l.name == name)
        };
        if already {
            return Err(CompileError::Redeclaration {
                name: name.to_string(),
                pos,
            });
        }
        let reg = self.alloc(pos)?;
        let cur = self.cur();
        cur.scopes
            .last_mut()
            .expect("no active block scope")
            .push(Local {
                name: name.to_string(),
                reg,
            });
        Ok(reg)
    }

    // ========================================================================
    // Upvalue resolution
    // ========================================================================

    /// Resolve `name` as an upvalue of function `func` (an index into
    /// `self.funcs`), adding capture descriptors along the chain.
    fn resolve_upvalue(
        &mut self,
        func: usize,
        name: &str,
        pos: SourcePos,
    ) -> Result<Option<u8>> {
        if func == 0 {
            return Ok(None);
        }
        let parent = func - 1;

        if let Some(reg) = self.funcs[parent].resolve_local(name) {
            return Ok(Some(self.add_upvalue(func, name, UpvalKind::Local, reg, pos)?));
        }
        if let Some(index) = self.funcs[parent].upvalue_index(name) {
            return Ok(Some(self.add_upvalue(
                func,
                name,
                UpvalKind::Outer,
                index,
                pos,
            )?));
        }
        // A name the parent assigns is a global there, not a capture.
        if self.funcs[parent].assigned_free.contains(name) {
            return Ok(None);
        }
        match self.resolve_upvalue(parent, name, pos)? {
            Some(index) => Ok(Some(self.add_upvalue(
                func,
                name,
                UpvalKind::Outer,
                index,
                pos,
            )?)),
            None => Ok(None),
        }
    }

    fn add_upvalue(
        &mut self,
        func: usize,
        name: &str,
        kind: UpvalKind,
        index: u8,
        pos: SourcePos,
    ) -> Result<u8> {
        if let Some(existing) = self.funcs[func].upvalue_index(name) {
            return Ok(existing);
        }
        let upvalues = &mut self.funcs[func].upvalues;
        if upvalues.len() >= u8::MAX as usize {
            return Err(CompileError::TooManyUpvalues { pos });
        }
        upvalues.push(UpvalDesc {
            name: name.to_string(),
            kind,
            index,
        });
        Ok((upvalues.len() - 1) as u8)
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn compile_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match &stmt.kind {
            StmtKind::Block(stmts) => {
                self.push_scope();
                for s in stmts {
                    self.compile_stmt(s)?;
                }
                self.pop_scope();
                Ok(())
            }

            StmtKind::VarDecl(decls) => {
                for (name, init) in decls {
                    match init {
                        Some(expr) => {
                            let value = self.compile_expr(expr)?;
                            self.free(value);
                            let reg = self.declare_local(name, stmt.pos)?;
                            if reg != value.reg {
                                self.emit(opcode::ins_ab(Opcode::Mov, reg, value.reg));
                            }
                        }
                        None => {
                            // Registers are recycled, so an explicit nil
                            // load is required.
                            let reg = self.declare_local(name, stmt.pos)?;
                            self.emit(opcode::ins_ab(Opcode::LdConst, reg, ConstKind::Nil as u8));
                        }
                    }
                }
                Ok(())
            }

            StmtKind::ConstDecl(decls) => {
                for (name, init) in decls {
                    if !self.consts.insert(name.clone()) {
                        return Err(CompileError::DuplicateConst {
                            name: name.clone(),
                            pos: stmt.pos,
                        });
                    }
                    let value = self.compile_expr(init)?;
                    self.emit_global_store(value.reg, name);
                    self.free(value);
                }
                Ok(())
            }

            StmtKind::If { cond, then, els } => {
                let c = self.compile_expr(cond)?;
                let jfalse = self.emit_jump(Opcode::Jze, c.reg);
                self.free(c);
                self.compile_stmt(then)?;
                match els {
                    Some(els) => {
                        let jend = self.emit_jump(Opcode::Jmp, 0);
                        let else_start = self.here();
                        self.patch_to(jfalse, else_start);
                        self.compile_stmt(els)?;
                        let end = self.here();
                        self.patch_to(jend, end);
                    }
                    None => {
                        let end = self.here();
                        self.patch_to(jfalse, end);
                    }
                }
                Ok(())
            }

            StmtKind::While { cond, body } => {
                let loop_start = self.here();
                self.cur().loops.push(LoopCtx {
                    break_patches: Vec::new(),
                    continue_patches: Vec::new(),
                });

                let c = self.compile_expr(cond)?;
                let jend = self.emit_jump(Opcode::Jze, c.reg);
                self.free(c);

                self.compile_stmt(body)?;

                let jback = self.emit_jump(Opcode::Jmp, 0);
                self.patch_to(jback, loop_start);

                let end = self.here();
                self.patch_to(jend, end);
                self.finish_loop(end, loop_start);
                Ok(())
            }

            StmtKind::DoWhile { body, cond } => {
                let body_start = self.here();
                self.cur().loops.push(LoopCtx {
                    break_patches: Vec::new(),
                    continue_patches: Vec::new(),
                });

                self.compile_stmt(body)?;

                let cond_start = self.here();
                let c = self.compile_expr(cond)?;
                let jback = self.emit_jump(Opcode::Jnz, c.reg);
                self.patch_to(jback, body_start);
                self.free(c);

                let end = self.here();
                self.finish_loop(end, cond_start);
                Ok(())
            }

            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => {
                self.push_scope();
                if let Some(init) = init {
                    self.compile_stmt(init)?;
                }

                let cond_start = self.here();
                self.cur().loops.push(LoopCtx {
                    break_patches: Vec::new(),
                    continue_patches: Vec::new(),
                });

                let jend = match cond {
                    Some(cond) => {
                        let c = self.compile_expr(cond)?;
                        let j = self.emit_jump(Opcode::Jze, c.reg);
                        self.free(c);
                        Some(j)
                    }
                    None => None,
                };

                self.compile_stmt(body)?;

                let step_start = self.here();
                if let Some(step) = step {
                    let s = self.compile_expr(step)?;
                    self.free(s);
                }
                let jback = self.emit_jump(Opcode::Jmp, 0);
                self.patch_to(jback, cond_start);

                let end = self.here();
                if let Some(j) = jend {
                    self.patch_to(j, end);
                }
                self.finish_loop(end, step_start);
                self.pop_scope();
                Ok(())
            }

            StmtKind::Break => {
                let j = self.emit_jump(Opcode::Jmp, 0);
                match self.cur().loops.last_mut() {
                    Some(ctx) => {
                        ctx.break_patches.push(j);
                        Ok(())
                    }
                    None => Err(CompileError::BreakOutsideLoop { pos: stmt.pos }),
                }
            }

            StmtKind::Continue => {
                let j = self.emit_jump(Opcode::Jmp, 0);
                match self.cur().loops.last_mut() {
                    Some(ctx) => {
                        ctx.continue_patches.push(j);
                        Ok(())
                    }
                    None => Err(CompileError::ContinueOutsideLoop { pos: stmt.pos }),
                }
            }

            StmtKind::Return(value) => {
                match value {
                    Some(expr) => {
                        let v = self.compile_expr(expr)?;
                        self.emit(opcode::ins_a(Opcode::Ret, v.reg));
                        self.free(v);
                    }
                    None => {
                        let t = self.alloc(stmt.pos)?;
                        self.emit(opcode::ins_ab(Opcode::LdConst, t, ConstKind::Nil as u8));
                        self.emit(opcode::ins_a(Opcode::Ret, t));
                        self.free(ExprLoc::temp(t));
                    }
                }
                Ok(())
            }

            StmtKind::Empty => Ok(()),

            StmtKind::Expr(expr) => {
                let loc = self.compile_expr(expr)?;
                self.free(loc);
                Ok(())
            }
        }
    }

    /// Resolve break/continue patches of the innermost loop.
    fn finish_loop(&mut self, break_target: usize, continue_target: usize) {
        let ctx = self.cur().loops.pop().expect("unbalanced loop pop");
        for j in ctx.break_patches {
            self.patch_to(j, break_target);
        }
        for j in ctx.continue_patches {
            self.patch_to(j, continue_target);
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn compile_expr(&mut self, expr: &Expr) -> Result<ExprLoc> {
        let pos = expr.pos;
        match &expr.kind {
            ExprKind::Nil => self.load_const(ConstKind::Nil, None, pos),
            ExprKind::Bool(true) => self.load_const(ConstKind::True, None, pos),
            ExprKind::Bool(false) => self.load_const(ConstKind::False, None, pos),
            ExprKind::Int(n) => self.load_const(ConstKind::Int, Some(opcode::pack_i64(*n)), pos),
            ExprKind::Float(x) => {
                self.load_const(ConstKind::Float, Some(opcode::pack_f64(*x)), pos)
            }

            ExprKind::Str(text) => {
                let index = self.symtab.add_string(text, pos)?;
                let t = self.alloc(pos)?;
                self.emit(opcode::ins_mid(Opcode::LdSym, t, index));
                Ok(ExprLoc::temp(t))
            }

            ExprKind::Ident(name) => self.compile_ident(name, pos),

            ExprKind::Argc => {
                let t = self.alloc(pos)?;
                self.emit(opcode::ins_a(Opcode::LdArgc, t));
                Ok(ExprLoc::temp(t))
            }

            ExprKind::ArgRef(n) => {
                let t = self.alloc(pos)?;
                self.emit(opcode::ins_ab(Opcode::LdConst, t, ConstKind::Int as u8));
                let [lo, hi] = opcode::pack_i64(*n);
                self.emit(lo);
                self.emit(hi);
                self.emit(opcode::ins_ab(Opcode::NthArg, t, t));
                Ok(ExprLoc::temp(t))
            }

            ExprKind::ArrayLit(items) => {
                let t = self.alloc(pos)?;
                self.emit(opcode::ins_ab(Opcode::NewArr, t, 0));
                for (i, item) in items.iter().enumerate() {
                    let key =
                        self.load_const(ConstKind::Int, Some(opcode::pack_i64(i as i64)), pos)?;
                    let value = self.compile_expr(item)?;
                    self.emit(opcode::ins_abc(Opcode::ArrSet, t, key.reg, value.reg));
                    self.free(value);
                    self.free(key);
                }
                Ok(ExprLoc::temp(t))
            }

            ExprKind::MapLit(pairs) => {
                let t = self.alloc(pos)?;
                self.emit(opcode::ins_ab(Opcode::NewArr, t, 1));
                for (key_expr, value_expr) in pairs {
                    let key = self.compile_expr(key_expr)?;
                    let value = self.compile_expr(value_expr)?;
                    self.emit(opcode::ins_abc(Opcode::ArrSet, t, key.reg, value.reg));
                    self.free(value);
                    self.free(key);
                }
                Ok(ExprLoc::temp(t))
            }

            ExprKind::FnLit { name, params, body } => {
                self.compile_fn_literal(name.as_deref(), params, body, pos)
            }

            ExprKind::Unary { op, operand } => self.compile_unary(*op, operand, pos),

            ExprKind::Binary { op, lhs, rhs } => {
                let l = self.compile_expr(lhs)?;
                let r = self.compile_expr(rhs)?;
                self.free(r);
                self.free(l);
                let t = self.alloc(pos)?;
                self.emit(opcode::ins_abc(binop_opcode(*op), t, l.reg, r.reg));
                Ok(ExprLoc::temp(t))
            }

            ExprKind::Logical { op, lhs, rhs } => {
                let t = self.alloc(pos)?;
                let l = self.compile_expr(lhs)?;
                self.emit(opcode::ins_ab(Opcode::Mov, t, l.reg));
                self.free(l);
                let jshort = match op {
                    LogOp::And => self.emit_jump(Opcode::Jze, t),
                    LogOp::Or => self.emit_jump(Opcode::Jnz, t),
                };
                let r = self.compile_expr(rhs)?;
                self.emit(opcode::ins_ab(Opcode::Mov, t, r.reg));
                self.free(r);
                let end = self.here();
                self.patch_to(jshort, end);
                Ok(ExprLoc::temp(t))
            }

            ExprKind::Ternary { cond, then, els } => {
                let t = self.alloc(pos)?;
                let c = self.compile_expr(cond)?;
                let jelse = self.emit_jump(Opcode::Jze, c.reg);
                self.free(c);

                let m = self.compile_expr(then)?;
                self.emit(opcode::ins_ab(Opcode::Mov, t, m.reg));
                self.free(m);
                let jend = self.emit_jump(Opcode::Jmp, 0);

                let else_start = self.here();
                self.patch_to(jelse, else_start);
                let e = self.compile_expr(els)?;
                self.emit(opcode::ins_ab(Opcode::Mov, t, e.reg));
                self.free(e);

                let end = self.here();
                self.patch_to(jend, end);
                Ok(ExprLoc::temp(t))
            }

            ExprKind::Assign { target, op, value } => {
                self.compile_assign(target, *op, value, pos)
            }

            ExprKind::Index { object, index } => {
                let obj = self.compile_expr(object)?;
                let key = self.compile_expr(index)?;
                self.free(key);
                self.free(obj);
                let t = self.alloc(pos)?;
                self.emit(opcode::ins_abc(Opcode::ArrGet, t, obj.reg, key.reg));
                Ok(ExprLoc::temp(t))
            }

            ExprKind::Member { object, name } => {
                let obj = self.compile_expr(object)?;
                let key = self.load_string(name, pos)?;
                self.free(key);
                self.free(obj);
                let t = self.alloc(pos)?;
                self.emit(opcode::ins_abc(Opcode::ArrGet, t, obj.reg, key.reg));
                Ok(ExprLoc::temp(t))
            }

            ExprKind::Call { callee, args } => {
                if args.len() > u8::MAX as usize {
                    return Err(CompileError::TooManyArguments { pos });
                }
                let f = self.compile_expr(callee)?;
                let mut arg_locs = Vec::with_capacity(args.len());
                for arg in args {
                    arg_locs.push(self.compile_expr(arg)?);
                }

                let arg_regs: Vec<u8> = arg_locs.iter().map(|l| l.reg).collect();
                for loc in arg_locs.into_iter().rev() {
                    self.free(loc);
                }
                self.free(f);
                let t = self.alloc(pos)?;

                self.emit(opcode::ins_abc(Opcode::Call, t, f.reg, arg_regs.len() as u8));
                for chunk in arg_regs.chunks(opcode::WORD_OCTETS) {
                    let mut word: Word = 0;
                    for (j, &reg) in chunk.iter().enumerate() {
                        word |= (reg as Word) << (8 * j);
                    }
                    self.emit(word);
                }
                Ok(ExprLoc::temp(t))
            }
        }
    }

    fn load_const(
        &mut self,
        kind: ConstKind,
        imm: Option<[Word; 2]>,
        pos: SourcePos,
    ) -> Result<ExprLoc> {
        let t = self.alloc(pos)?;
        self.emit(opcode::ins_ab(Opcode::LdConst, t, kind as u8));
        if let Some([lo, hi]) = imm {
            self.emit(lo);
            self.emit(hi);
        }
        Ok(ExprLoc::temp(t))
    }

    fn load_string(&mut self, text: &str, pos: SourcePos) -> Result<ExprLoc> {
        let index = self.symtab.add_string(text, pos)?;
        let t = self.alloc(pos)?;
        self.emit(opcode::ins_mid(Opcode::LdSym, t, index));
        Ok(ExprLoc::temp(t))
    }

    /// Load a global through a symbol stub.
    fn load_global(&mut self, name: &str, pos: SourcePos) -> Result<ExprLoc> {
        let index = self.symtab.add_stub(name, pos)?;
        let t = self.alloc(pos)?;
        self.emit(opcode::ins_mid(Opcode::LdSym, t, index));
        Ok(ExprLoc::temp(t))
    }

    fn compile_ident(&mut self, name: &str, pos: SourcePos) -> Result<ExprLoc> {
        let cur = self.funcs.len() - 1;

        if let Some(reg) = self.funcs[cur].resolve_local(name) {
            return Ok(ExprLoc::local(reg));
        }
        // Assigned free names resolve as globals for the whole function.
        if self.funcs[cur].assigned_free.contains(name) {
            return self.load_global(name, pos);
        }
        if let Some(index) = self.resolve_upvalue(cur, name, pos)? {
            let t = self.alloc(pos)?;
            self.emit(opcode::ins_ab(Opcode::LdUpval, t, index));
            return Ok(ExprLoc::temp(t));
        }
        self.load_global(name, pos)
    }

    fn compile_unary(&mut self, op: UnOp, operand: &Expr, pos: SourcePos) -> Result<ExprLoc> {
        match op {
            // Unary plus is the identity on numbers; any type mismatch
            // surfaces at the consuming operation.
            UnOp::Plus => self.compile_expr(operand),

            UnOp::Minus | UnOp::LogNot | UnOp::BitNot | UnOp::Sizeof | UnOp::Typeof => {
                let o = self.compile_expr(operand)?;
                self.free(o);
                let t = self.alloc(pos)?;
                let opc = match op {
                    UnOp::Minus => Opcode::Neg,
                    UnOp::LogNot => Opcode::LogNot,
                    UnOp::BitNot => Opcode::BitNot,
                    UnOp::Sizeof => Opcode::Sizeof,
                    UnOp::Typeof => Opcode::Typeof,
                    _ => unreachable!(),
                };
                self.emit(opcode::ins_ab(opc, t, o.reg));
                Ok(ExprLoc::temp(t))
            }

            UnOp::PreInc | UnOp::PreDec | UnOp::PostInc | UnOp::PostDec => {
                self.compile_incdec(op, operand, pos)
            }
        }
    }

    fn compile_incdec(&mut self, op: UnOp, operand: &Expr, pos: SourcePos) -> Result<ExprLoc> {
        let step = if matches!(op, UnOp::PreInc | UnOp::PostInc) {
            Opcode::Inc
        } else {
            Opcode::Dec
        };
        let post = matches!(op, UnOp::PostInc | UnOp::PostDec);

        match &operand.kind {
            ExprKind::Ident(name) => {
                let cur = self.funcs.len() - 1;
                if let Some(reg) = self.funcs[cur].resolve_local(name) {
                    if post {
                        let t = self.alloc(pos)?;
                        self.emit(opcode::ins_ab(Opcode::Mov, t, reg));
                        self.emit(opcode::ins_a(step, reg));
                        Ok(ExprLoc::temp(t))
                    } else {
                        self.emit(opcode::ins_a(step, reg));
                        Ok(ExprLoc::local(reg))
                    }
                } else {
                    // Global increment: load, bump, store back.
                    let t = self.load_global(name, pos)?;
                    if post {
                        let t2 = self.alloc(pos)?;
                        self.emit(opcode::ins_ab(Opcode::Mov, t2, t.reg));
                        self.emit(opcode::ins_a(step, t2));
                        self.emit_global_store(t2, name);
                        self.free(ExprLoc::temp(t2));
                    } else {
                        self.emit(opcode::ins_a(step, t.reg));
                        self.emit_global_store(t.reg, name);
                    }
                    Ok(t)
                }
            }

            ExprKind::Index { .. } | ExprKind::Member { .. } => {
                let t = self.alloc(pos)?;
                let (obj, key) = self.compile_target_parts(operand)?;
                self.emit(opcode::ins_abc(Opcode::ArrGet, t, obj.reg, key.reg));
                if post {
                    let t2 = self.alloc(pos)?;
                    self.emit(opcode::ins_ab(Opcode::Mov, t2, t));
                    self.emit(opcode::ins_a(step, t2));
                    self.emit(opcode::ins_abc(Opcode::ArrSet, obj.reg, key.reg, t2));
                    self.free(ExprLoc::temp(t2));
                } else {
                    self.emit(opcode::ins_a(step, t));
                    self.emit(opcode::ins_abc(Opcode::ArrSet, obj.reg, key.reg, t));
                }
                self.free(key);
                self.free(obj);
                Ok(ExprLoc::temp(t))
            }

            // The parser rejects other operand shapes.
            _ => unreachable!("non-lvalue increment target"),
        }
    }

    /// Compile the object and key of an index or member target.
    fn compile_target_parts(&mut self, target: &Expr) -> Result<(ExprLoc, ExprLoc)> {
        match &target.kind {
            ExprKind::Index { object, index } => {
                let obj = self.compile_expr(object)?;
                let key = self.compile_expr(index)?;
                Ok((obj, key))
            }
            ExprKind::Member { object, name } => {
                let obj = self.compile_expr(object)?;
                let key = self.load_string(name, target.pos)?;
                Ok((obj, key))
            }
            _ => unreachable!("non-container assignment target"),
        }
    }

    fn compile_assign(
        &mut self,
        target: &Expr,
        op: Option<BinOp>,
        value: &Expr,
        pos: SourcePos,
    ) -> Result<ExprLoc> {
        match &target.kind {
            ExprKind::Ident(name) => {
                let cur = self.funcs.len() - 1;
                if let Some(reg) = self.funcs[cur].resolve_local(name) {
                    let v = self.compile_expr(value)?;
                    match op {
                        None => {
                            self.emit(opcode::ins_ab(Opcode::Mov, reg, v.reg));
                            self.free(v);
                        }
                        Some(op) => {
                            let t = self.alloc(pos)?;
                            self.emit(opcode::ins_abc(binop_opcode(op), t, reg, v.reg));
                            self.emit(opcode::ins_ab(Opcode::Mov, reg, t));
                            self.free(ExprLoc::temp(t));
                            self.free(v);
                        }
                    }
                    Ok(ExprLoc::local(reg))
                } else {
                    // Not a local: the name is a global. Writes through
                    // captured copies could never be observed, so
                    // assigned free variables never capture.
                    match op {
                        None => {
                            let t = self.alloc(pos)?;
                            let v = self.compile_expr(value)?;
                            self.emit(opcode::ins_ab(Opcode::Mov, t, v.reg));
                            self.free(v);
                            self.emit_global_store(t, name);
                            Ok(ExprLoc::temp(t))
                        }
                        Some(op) => {
                            let index = self.symtab.add_stub(name, pos)?;
                            let t = self.alloc(pos)?;
                            self.emit(opcode::ins_mid(Opcode::LdSym, t, index));
                            let v = self.compile_expr(value)?;
                            self.emit(opcode::ins_abc(binop_opcode(op), t, t, v.reg));
                            self.free(v);
                            self.emit_global_store(t, name);
                            Ok(ExprLoc::temp(t))
                        }
                    }
                }
            }

            ExprKind::Index { .. } | ExprKind::Member { .. } => {
                let t = self.alloc(pos)?;
                let (obj, key) = self.compile_target_parts(target)?;
                match op {
                    None => {
                        let v = self.compile_expr(value)?;
                        self.emit(opcode::ins_abc(Opcode::ArrSet, obj.reg, key.reg, v.reg));
                        self.emit(opcode::ins_ab(Opcode::Mov, t, v.reg));
                        self.free(v);
                    }
                    Some(op) => {
                        self.emit(opcode::ins_abc(Opcode::ArrGet, t, obj.reg, key.reg));
                        let v = self.compile_expr(value)?;
                        let t2 = self.alloc(pos)?;
                        self.emit(opcode::ins_abc(binop_opcode(op), t2, t, v.reg));
                        self.emit(opcode::ins_abc(Opcode::ArrSet, obj.reg, key.reg, t2));
                        self.emit(opcode::ins_ab(Opcode::Mov, t, t2));
                        self.free(ExprLoc::temp(t2));
                        self.free(v);
                    }
                }
                self.free(key);
                self.free(obj);
                Ok(ExprLoc::temp(t))
            }

            // The parser rejects other assignment targets.
            _ => unreachable!("non-lvalue assignment target"),
        }
    }

    fn compile_fn_literal(
        &mut self,
        name: Option<&str>,
        params: &[String],
        body: &Stmt,
        pos: SourcePos,
    ) -> Result<ExprLoc> {
        self.emit(opcode::ins_abc(Opcode::Function, 0, 0, 0));
        let header = self.here();
        for _ in 0..FUNCHDR_LEN {
            self.emit(0);
        }

        let mut assigned_free = HashSet::new();
        collect_assigned_stmt(body, &mut assigned_free);
        self.funcs
            .push(FuncScope::new(params, assigned_free, pos)?);

        self.compile_stmt(body)?;
        self.emit_implicit_return(pos)?;

        let scope = self.funcs.pop().expect("function scope");
        let bodylen = self.here() - (header + FUNCHDR_LEN);
        let index = self.symtab.add_funcdef(name.unwrap_or(""), header, pos)?;

        self.words[header + FUNCHDR_IDX_BODYLEN] = bodylen as Word;
        self.words[header + FUNCHDR_IDX_ARGC] = scope.argc as Word;
        self.words[header + FUNCHDR_IDX_NREGS] = scope.max_reg.max(1) as Word;
        self.words[header + FUNCHDR_IDX_SYMCNT] = index as Word;

        // Load the function value; wrap it into a closure if the body
        // captured anything.
        let t = self.alloc(pos)?;
        self.emit(opcode::ins_mid(Opcode::LdSym, t, index));
        if !scope.upvalues.is_empty() {
            self.emit(opcode::ins_ab(
                Opcode::Closure,
                t,
                scope.upvalues.len() as u8,
            ));
            for up in &scope.upvalues {
                self.emit((up.kind as Word) | ((up.index as Word) << 8));
            }
        }
        Ok(ExprLoc::temp(t))
    }
}

fn binop_opcode(op: BinOp) -> Opcode {
    match op {
        BinOp::Add => Opcode::Add,
        BinOp::Sub => Opcode::Sub,
        BinOp::Mul => Opcode::Mul,
        BinOp::Div => Opcode::Div,
        BinOp::Mod => Opcode::Mod,
        BinOp::BitAnd => Opcode::And,
        BinOp::BitOr => Opcode::Or,
        BinOp::BitXor => Opcode::Xor,
        BinOp::Shl => Opcode::Shl,
        BinOp::Shr => Opcode::Shr,
        BinOp::Eq => Opcode::Eq,
        BinOp::Ne => Opcode::Ne,
        BinOp::Lt => Opcode::Lt,
        BinOp::Le => Opcode::Le,
        BinOp::Gt => Opcode::Gt,
        BinOp::Ge => Opcode::Ge,
        BinOp::Concat => Opcode::Concat,
    }
}

// ============================================================================
// Assigned-free-variable prescan
// ============================================================================

/// Collect names assigned (or incremented) anywhere in a function body,
/// without descending into nested function literals: those have their
/// own scan.
fn collect_assigned_stmt(stmt: &Stmt, out: &mut HashSet<String>) {
    match &stmt.kind {
        StmtKind::Block(stmts) => {
            for s in stmts {
                collect_assigned_stmt(s, out);
            }
        }
        StmtKind::VarDecl(decls) => {
            for (_, init) in decls {
                if let Some(e) = init {
                    collect_assigned_expr(e, out);
                }
            }
        }
        StmtKind::ConstDecl(decls) => {
            for (_, init) in decls {
                collect_assigned_expr(init, out);
            }
        }
        StmtKind::If { cond, then, els } => {
            collect_assigned_expr(cond, out);
            collect_assigned_stmt(then, out);
            if let Some(e) = els {
                collect_assigned_stmt(e, out);
            }
        }
        StmtKind::While { cond, body } => {
            collect_assigned_expr(cond, out);
            collect_assigned_stmt(body, out);
        }
        StmtKind::DoWhile { body, cond } => {
            collect_assigned_stmt(body, out);
            collect_assigned_expr(cond, out);
        }
        StmtKind::For {
            init,
            cond,
            step,
            body,
        } => {
            if let Some(s) = init {
                collect_assigned_stmt(s, out);
            }
            if let Some(e) = cond {
                collect_assigned_expr(e, out);
            }
            if let Some(e) = step {
                collect_assigned_expr(e, out);
            }
            collect_assigned_stmt(body, out);
        }
        StmtKind::Return(Some(e)) => collect_assigned_expr(e, out),
        StmtKind::Return(None) | StmtKind::Break | StmtKind::Continue | StmtKind::Empty => {}
        StmtKind::Expr(e) => collect_assigned_expr(e, out),
    }
}

fn collect_assigned_expr(expr: &Expr, out: &mut HashSet<String>) {
    match &expr.kind {
        ExprKind::Assign { target, value, .. } => {
            if let ExprKind::Ident(name) = &target.kind {
                out.insert(name.clone());
            } else {
                collect_assigned_expr(target, out);
            }
            collect_assigned_expr(value, out);
        }
        ExprKind::Unary { op, operand } => {
            if matches!(
                op,
                UnOp::PreInc | UnOp::PreDec | UnOp::PostInc | UnOp::PostDec
            ) {
                if let ExprKind::Ident(name) = &operand.kind {
                    out.insert(name.clone());
                    return;
                }
            }
            collect_assigned_expr(operand, out);
        }
        ExprKind::Binary { lhs, rhs, .. } | ExprKind::Logical { lhs, rhs, .. } => {
            collect_assigned_expr(lhs, out);
            collect_assigned_expr(rhs, out);
        }
        ExprKind::Ternary { cond, then, els } => {
            collect_assigned_expr(cond, out);
            collect_assigned_expr(then, out);
            collect_assigned_expr(els, out);
        }
        ExprKind::Index { object, index } => {
            collect_assigned_expr(object, out);
            collect_assigned_expr(index, out);
        }
        ExprKind::Member { object, .. } => collect_assigned_expr(object, out),
        ExprKind::Call { callee, args } => {
            collect_assigned_expr(callee, out);
            for arg in args {
                collect_assigned_expr(arg, out);
            }
        }
        ExprKind::ArrayLit(items) => {
            for item in items {
                collect_assigned_expr(item, out);
            }
        }
        ExprKind::MapLit(pairs) => {
            for (k, v) in pairs {
                collect_assigned_expr(k, out);
                collect_assigned_expr(v, out);
            }
        }
        // Nested functions run their own prescan.
        ExprKind::FnLit { .. } => {}
        ExprKind::Nil
        | ExprKind::Bool(_)
        | ExprKind::Int(_)
        | ExprKind::Float(_)
        | ExprKind::Str(_)
        | ExprKind::Ident(_)
        | ExprKind::Argc
        | ExprKind::ArgRef(_) => {}
    }
}
