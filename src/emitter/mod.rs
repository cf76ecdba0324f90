//! Single pass x86-64 code emitter.
//!
//! Walks the typed tree and writes GNU as (AT&T) syntax. Every
//! expression leaves its scalar result in `%rax`; binary operators stash
//! the left side on the stack and combine out of `%rcx`; `%rdx` is only
//! used by division and the postfix increment shuffle. Unhandled node or
//! type combinations are compiler bugs and abort via panic rather than
//! producing wrong code.

#[cfg(test)]
mod emitter_tests;

use crate::ast::*;
use crate::ctypes::CType;

use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

/// System V integer parameter registers, in order.
const INT_PARAM_REGS: [&str; 6] = ["%rdi", "%rsi", "%rdx", "%rcx", "%r8", "%r9"];

macro_rules! raw {
    ($self:ident, $($arg:tt)*) => {
        writeln!($self.o, $($arg)*)
    };
}

macro_rules! asm {
    ($self:ident, $($arg:tt)*) => {
        writeln!($self.o, "  {}", format_args!($($arg)*))
    };
}

/// Writes the translation unit as assembly text. On any write failure
/// the whole compilation is abandoned; the driver only publishes the
/// output once emission has fully succeeded.
pub fn emit<W: Write>(tu: &TranslationUnit, out: &mut W) -> io::Result<()> {
    let mut e = Emitter {
        o: out,
        label_counter: 0,
        loffsets: HashMap::new(),
    };
    e.translation_unit(tu)
}

struct Emitter<'a, W: Write> {
    o: &'a mut W,
    label_counter: u64,
    /// Frame offset of each local symbol of the function being emitted,
    /// keyed by symbol id.
    loffsets: HashMap<usize, i64>,
}

impl<W: Write> Emitter<'_, W> {
    fn next_label(&mut self) -> String {
        self.label_counter += 1;
        format!(".LL{}", self.label_counter)
    }

    fn translation_unit(&mut self, tu: &TranslationUnit) -> io::Result<()> {
        for init in &tu.anonymous_inits {
            raw!(self, ".data")?;
            raw!(self, "{}:", init.label)?;
            raw!(self, ".string {}", init.val)?;
        }
        for tl in &tu.toplevels {
            match tl {
                TopLevel::Func(f) => self.function(f)?,
                TopLevel::Decl(dl) => {
                    for (sym, init) in dl.symbols.iter().zip(&dl.inits) {
                        let Symbol::Global(g) = sym else {
                            panic!("internal error: local symbol at top level");
                        };
                        self.global(g, dl.storage, init.as_ref())?;
                    }
                }
            }
        }
        Ok(())
    }

    fn global(
        &mut self,
        g: &GSymbol,
        storage: StorageClass,
        init: Option<&FoldedInit>,
    ) -> io::Result<()> {
        // function declarations emit nothing, they are labels elsewhere
        if g.ty.is_func() {
            return Ok(());
        }
        raw!(self, ".data")?;
        if storage != StorageClass::Static {
            raw!(self, ".global {}", g.label)?;
        }
        let Some(init) = init else {
            return raw!(self, ".lcomm {}, {}", g.label, g.ty.size());
        };
        raw!(self, "{}:", g.label)?;
        match init {
            FoldedInit::Const(v) => match g.ty.size() {
                8 => raw!(self, ".quad {v}"),
                4 => raw!(self, ".long {v}"),
                2 => raw!(self, ".short {v}"),
                1 => raw!(self, ".byte {v}"),
                sz => panic!("internal error: global of size {sz}"),
            },
            FoldedInit::GPtr { label, offset } => {
                if *offset > 0 {
                    raw!(self, ".quad {label} + {offset}")
                } else if *offset < 0 {
                    raw!(self, ".quad {label} - {}", -offset)
                } else {
                    raw!(self, ".quad {label}")
                }
            }
            FoldedInit::Str(label) => raw!(self, ".quad {label}"),
        }
    }

    // ------------------------------------------------------------------
    // Functions and frame layout

    fn function(&mut self, f: &Function) -> io::Result<()> {
        raw!(self, ".text")?;
        raw!(self, ".global {}", f.name)?;
        raw!(self, "{}:", f.name)?;
        asm!(self, "pushq %rbp")?;
        asm!(self, "movq %rsp, %rbp")?;
        let frame_size = self.calc_local_offsets(f);
        if frame_size != 0 {
            asm!(self, "sub ${}, %rsp", -frame_size)?;
        }
        for (idx, psym) in f.param_syms.iter().enumerate().take(INT_PARAM_REGS.len()) {
            asm!(
                self,
                "movq {}, {}(%rbp)",
                INT_PARAM_REGS[idx],
                self.loffsets[&psym.id]
            )?;
        }
        for stmt in &f.body {
            self.stmt(stmt)?;
        }
        asm!(self, "leave")?;
        asm!(self, "ret")?;
        Ok(())
    }

    /// Assigns a frame slot to every parameter and every local declared
    /// anywhere in the body. Slots are at least eight bytes, rounded up
    /// to a multiple of eight, at negative offsets from `%rbp`.
    /// Parameters past the sixth already live above the return address.
    fn calc_local_offsets(&mut self, f: &Function) -> i64 {
        self.loffsets.clear();
        let mut loffset: i64 = 0;
        {
            let mut add = |lsym: &LSymbol| {
                let sz = lsym.ty.size().max(8).div_ceil(8) * 8;
                loffset -= sz as i64;
                self.loffsets.insert(lsym.id, loffset);
            };
            for psym in f.param_syms.iter().take(INT_PARAM_REGS.len()) {
                add(psym);
            }
            let mut locals = Vec::new();
            collect_locals(&f.body, &mut locals);
            for lsym in &locals {
                add(lsym);
            }
        }
        for (idx, psym) in f.param_syms.iter().enumerate().skip(INT_PARAM_REGS.len()) {
            let stack_idx = (idx - INT_PARAM_REGS.len()) as i64;
            self.loffsets.insert(psym.id, 16 + 8 * stack_idx);
        }
        loffset
    }

    // ------------------------------------------------------------------
    // Statements

    fn stmt(&mut self, stmt: &Stmt) -> io::Result<()> {
        match stmt {
            Stmt::If(i) => self.if_stmt(i),
            Stmt::While(w) => self.while_stmt(w),
            Stmt::DoWhile(d) => self.do_while(d),
            Stmt::For(f) => self.for_stmt(f),
            Stmt::Switch(sw) => self.switch(sw),
            Stmt::Return(r) => self.ret(r),
            Stmt::Block(b) => {
                for s in &b.body {
                    self.stmt(s)?;
                }
                Ok(())
            }
            Stmt::Expr(es) => self.expr(&es.expr),
            Stmt::Goto(g) => asm!(self, "jmp {}", g.label),
            Stmt::Labeled(l) => {
                raw!(self, "{}:", l.anon_label)?;
                self.stmt(&l.stmt)
            }
            // locals got their slots up front; initializers were lowered
            // to assignments by the parser
            Stmt::Decl(_) | Stmt::Empty(_) => Ok(()),
        }
    }

    fn if_stmt(&mut self, i: &If) -> io::Result<()> {
        self.expr(&i.cond)?;
        asm!(self, "test %rax, %rax")?;
        asm!(self, "jz {}", i.l_else)?;
        self.stmt(&i.then)?;
        match &i.els {
            Some(els) => {
                asm!(self, "jmp {}", i.l_end)?;
                raw!(self, "{}:", i.l_else)?;
                self.stmt(els)?;
                raw!(self, "{}:", i.l_end)
            }
            None => raw!(self, "{}:", i.l_else),
        }
    }

    fn while_stmt(&mut self, w: &While) -> io::Result<()> {
        raw!(self, "{}:", w.l_start)?;
        self.expr(&w.cond)?;
        asm!(self, "test %rax, %rax")?;
        asm!(self, "jz {}", w.l_end)?;
        self.stmt(&w.body)?;
        asm!(self, "jmp {}", w.l_start)?;
        raw!(self, "{}:", w.l_end)
    }

    fn do_while(&mut self, d: &DoWhile) -> io::Result<()> {
        raw!(self, "{}:", d.l_start)?;
        self.stmt(&d.body)?;
        raw!(self, "{}:", d.l_cond)?;
        self.expr(&d.cond)?;
        asm!(self, "test %rax, %rax")?;
        asm!(self, "jz {}", d.l_end)?;
        asm!(self, "jmp {}", d.l_start)?;
        raw!(self, "{}:", d.l_end)
    }

    fn for_stmt(&mut self, f: &For) -> io::Result<()> {
        if let Some(init) = &f.init {
            self.stmt(init)?;
        }
        raw!(self, "{}:", f.l_start)?;
        if let Some(cond) = &f.cond {
            self.expr(cond)?;
            asm!(self, "test %rax, %rax")?;
            asm!(self, "jz {}", f.l_end)?;
        }
        self.stmt(&f.body)?;
        raw!(self, "{}:", f.l_step)?;
        if let Some(step) = &f.step {
            self.expr(step)?;
        }
        asm!(self, "jmp {}", f.l_start)?;
        raw!(self, "{}:", f.l_end)
    }

    fn switch(&mut self, sw: &Switch) -> io::Result<()> {
        self.expr(&sw.expr)?;
        for case in &sw.cases {
            asm!(self, "mov ${}, %rcx", case.val)?;
            asm!(self, "cmp %rax, %rcx")?;
            asm!(self, "je {}", case.label)?;
        }
        match &sw.l_default {
            Some(l_default) => asm!(self, "jmp {l_default}")?,
            None => asm!(self, "jmp {}", sw.l_after)?,
        }
        self.stmt(&sw.body)?;
        raw!(self, "{}:", sw.l_after)
    }

    fn ret(&mut self, r: &Return) -> io::Result<()> {
        if let Some(expr) = &r.expr {
            self.expr(expr)?;
        }
        asm!(self, "leave")?;
        asm!(self, "ret")
    }

    // ------------------------------------------------------------------
    // Expressions

    fn expr(&mut self, expr: &Expr) -> io::Result<()> {
        match expr {
            Expr::Ident(i) => self.ident(i),
            Expr::Call(c) => self.call(c),
            Expr::Constant(c) => {
                if i32::try_from(c.val).is_ok() {
                    asm!(self, "movq ${}, %rax", c.val)
                } else {
                    asm!(self, "movabsq ${}, %rax", c.val)
                }
            }
            Expr::Str(s) => asm!(self, "leaq {}(%rip), %rax", s.label),
            Expr::Unary(u) => self.unop(u),
            Expr::Binary(b) => self.binop(b),
            Expr::Index(i) => self.index(i),
            Expr::Cast(c) => self.cast(c),
            Expr::Selector(s) => self.selector(s),
        }
    }

    /// Leaves the address of an lvalue in `%rax`.
    fn get_addr(&mut self, e: &Expr) -> io::Result<()> {
        match e {
            Expr::Ident(i) => match &i.sym {
                Symbol::Local(l) => {
                    asm!(self, "leaq {}(%rbp), %rax", self.loffsets[&l.id])
                }
                Symbol::Global(g) => asm!(self, "leaq {}(%rip), %rax", g.label),
            },
            // must be a deref, anything else is a frontend bug
            Expr::Unary(u) => {
                assert_eq!(u.op, UnaryOp::Deref, "address of a non lvalue");
                self.expr(&u.operand)
            }
            Expr::Index(idx) => {
                self.expr(&idx.idx)?;
                let sz = idx.ty.size();
                if sz != 1 {
                    asm!(self, "imul ${sz}, %rax")?;
                }
                asm!(self, "pushq %rax")?;
                self.expr(&idx.arr)?;
                asm!(self, "popq %rcx")?;
                asm!(self, "addq %rcx, %rax")
            }
            Expr::Selector(s) => {
                if s.arrow {
                    self.expr(&s.operand)?;
                } else {
                    self.get_addr(&s.operand)?;
                }
                let offset = selector_offset(s);
                if offset != 0 {
                    asm!(self, "addq ${offset}, %rax")?;
                }
                Ok(())
            }
            _ => panic!("internal error: address of a non lvalue"),
        }
    }

    /// Loads the scalar at `(reg)` into `%rax`, sign or zero extending
    /// by the source type. Arrays, structs and functions load as their
    /// address, i.e. not at all.
    fn load_from_ptr(&mut self, reg: &str, ty: &CType) -> io::Result<()> {
        if ty.is_int() {
            let signed = ty.is_signed_int();
            return match (ty.size(), signed) {
                (8, _) => asm!(self, "movq (%{reg}), %rax"),
                (4, true) => asm!(self, "movslq (%{reg}), %rax"),
                (2, true) => asm!(self, "movswq (%{reg}), %rax"),
                (1, true) => asm!(self, "movsbq (%{reg}), %rax"),
                (4, false) => asm!(self, "movl (%{reg}), %eax"),
                (2, false) => asm!(self, "movzwq (%{reg}), %rax"),
                (1, false) => asm!(self, "movzbq (%{reg}), %rax"),
                (sz, _) => panic!("internal error: integer load of size {sz}"),
            };
        }
        match ty {
            CType::Ptr(_) => asm!(self, "movq (%{reg}), %rax"),
            CType::Func(_) | CType::Array(..) | CType::Struct(_) => Ok(()),
            _ => panic!("internal error: load of unsupported type"),
        }
    }

    /// Stores `%rax` through the pointer in `reg`, sized by the type.
    fn store_to_ptr(&mut self, reg: &str, ty: &CType) -> io::Result<()> {
        assert!(ty.is_scalar(), "store of unsupported type");
        match ty.size() {
            8 => asm!(self, "movq %rax, (%{reg})"),
            4 => asm!(self, "movl %eax, (%{reg})"),
            2 => asm!(self, "movw %ax, (%{reg})"),
            1 => asm!(self, "movb %al, (%{reg})"),
            sz => panic!("internal error: scalar store of size {sz}"),
        }
    }

    fn ident(&mut self, i: &Ident) -> io::Result<()> {
        self.get_addr(&Expr::Ident(i.clone()))?;
        self.load_from_ptr("rax", i.sym.ty())
    }

    fn selector(&mut self, s: &Selector) -> io::Result<()> {
        // struct values evaluate to their address and pointers to their
        // value, so both `.` and `->` add the offset to %rax
        self.expr(&s.operand)?;
        let offset = selector_offset(s);
        if offset != 0 {
            asm!(self, "add ${offset}, %rax")?;
        }
        self.load_from_ptr("rax", &s.ty)
    }

    fn index(&mut self, idx: &Index) -> io::Result<()> {
        self.expr(&idx.idx)?;
        let sz = idx.ty.size();
        if sz != 1 {
            asm!(self, "imul ${sz}, %rax")?;
        }
        asm!(self, "push %rax")?;
        self.expr(&idx.arr)?;
        asm!(self, "pop %rcx")?;
        asm!(self, "addq %rcx, %rax")?;
        self.load_from_ptr("rax", &idx.ty)
    }

    fn call(&mut self, c: &Call) -> io::Result<()> {
        let is_int_reg_arg = |a: &Expr| {
            let ty = a.ty().decayed();
            ty.is_int() || ty.is_ptr()
        };
        let mut intargs = Vec::new();
        let mut memargs = Vec::new();
        for arg in &c.args {
            if intargs.len() < INT_PARAM_REGS.len() && is_int_reg_arg(arg) {
                intargs.push(arg);
            } else {
                memargs.push(arg);
            }
        }
        let mut pushed = 0usize;
        for arg in memargs.iter().rev() {
            self.expr(arg)?;
            asm!(self, "push %rax")?;
            pushed += 8;
        }
        for arg in intargs.iter().rev() {
            self.expr(arg)?;
            asm!(self, "push %rax")?;
        }
        for reg in INT_PARAM_REGS.iter().take(intargs.len()) {
            asm!(self, "pop {reg}")?;
        }
        self.expr(&c.callee)?;
        asm!(self, "call *%rax")?;
        if pushed != 0 {
            asm!(self, "add ${pushed}, %rsp")?;
        }
        Ok(())
    }

    /// Integer widening extends from the source width; shrinking and
    /// pointer casts are free because everything lives widened in %rax.
    fn cast(&mut self, c: &Cast) -> io::Result<()> {
        self.expr(&c.operand)?;
        let from = c.operand.ty().decayed();
        let to = &c.ty;
        if to.is_int() && from.is_int() && to.size() > from.size() {
            return match (from.size(), from.is_signed_int()) {
                (4, true) => asm!(self, "movslq %eax, %rax"),
                (2, true) => asm!(self, "movswq %ax, %rax"),
                (1, true) => asm!(self, "movsbq %al, %rax"),
                (4, false) => asm!(self, "movl %eax, %eax"),
                (2, false) => asm!(self, "movzwq %ax, %rax"),
                (1, false) => asm!(self, "movzbq %al, %rax"),
                (sz, _) => panic!("internal error: widening cast from size {sz}"),
            };
        }
        let ok = (to.is_int() || to.is_ptr()) && (from.is_int() || from.is_ptr());
        assert!(ok, "unsupported cast reached the emitter");
        Ok(())
    }

    fn binop(&mut self, b: &Binary) -> io::Result<()> {
        match b.op {
            BinaryOp::Assign => return self.assign(b),
            BinaryOp::LAnd | BinaryOp::LOr => return self.short_circuit(b),
            BinaryOp::Comma => {
                self.expr(&b.l)?;
                return self.expr(&b.r);
            }
            _ => {}
        }
        self.expr(&b.l)?;
        asm!(self, "pushq %rax")?;
        self.expr(&b.r)?;
        asm!(self, "movq %rax, %rcx")?;
        asm!(self, "popq %rax")?;
        match b.op {
            BinaryOp::Add => asm!(self, "addq %rcx, %rax"),
            BinaryOp::Sub => asm!(self, "subq %rcx, %rax"),
            BinaryOp::Mul => asm!(self, "imul %rcx, %rax"),
            BinaryOp::Or => asm!(self, "or %rcx, %rax"),
            BinaryOp::And => asm!(self, "and %rcx, %rax"),
            BinaryOp::Xor => asm!(self, "xor %rcx, %rax"),
            BinaryOp::Div => {
                asm!(self, "cqto")?;
                asm!(self, "idiv %rcx")
            }
            BinaryOp::Rem => {
                asm!(self, "cqto")?;
                asm!(self, "idiv %rcx")?;
                asm!(self, "mov %rdx, %rax")
            }
            BinaryOp::Shl => asm!(self, "sal %cl, %rax"),
            BinaryOp::Shr => asm!(self, "sar %cl, %rax"),
            op if op.is_comparison() => {
                let jcc = match op {
                    BinaryOp::Eql => "jz",
                    BinaryOp::Neq => "jnz",
                    BinaryOp::Lss => "jl",
                    BinaryOp::Gtr => "jg",
                    BinaryOp::Leq => "jle",
                    BinaryOp::Geq => "jge",
                    _ => unreachable!(),
                };
                let l_set = self.next_label();
                let l_after = self.next_label();
                asm!(self, "cmp %rcx, %rax")?;
                asm!(self, "{jcc} {l_set}")?;
                asm!(self, "movq $0, %rax")?;
                asm!(self, "jmp {l_after}")?;
                raw!(self, "{l_set}:")?;
                asm!(self, "movq $1, %rax")?;
                raw!(self, "{l_after}:")
            }
            op => panic!("internal error: unhandled binary operator {op:?}"),
        }
    }

    fn short_circuit(&mut self, b: &Binary) -> io::Result<()> {
        let l_out = self.next_label();
        let l_after = self.next_label();
        let (jcc, early, late) = match b.op {
            BinaryOp::LAnd => ("jz", 0, 1),
            BinaryOp::LOr => ("jnz", 1, 0),
            _ => unreachable!(),
        };
        self.expr(&b.l)?;
        asm!(self, "test %rax, %rax")?;
        asm!(self, "{jcc} {l_out}")?;
        self.expr(&b.r)?;
        asm!(self, "test %rax, %rax")?;
        asm!(self, "{jcc} {l_out}")?;
        asm!(self, "movq ${late}, %rax")?;
        asm!(self, "jmp {l_after}")?;
        raw!(self, "{l_out}:")?;
        asm!(self, "movq ${early}, %rax")?;
        raw!(self, "{l_after}:")
    }

    fn assign(&mut self, b: &Binary) -> io::Result<()> {
        self.expr(&b.r)?;
        asm!(self, "pushq %rax")?;
        self.get_addr(&b.l)?;
        asm!(self, "movq %rax, %rcx")?;
        asm!(self, "popq %rax")?;
        self.store_to_ptr("rcx", &b.l.ty())
    }

    fn unop(&mut self, u: &Unary) -> io::Result<()> {
        match u.op {
            UnaryOp::Addr => self.get_addr(&u.operand),
            UnaryOp::Deref => {
                self.expr(&u.operand)?;
                self.load_from_ptr("rax", &u.ty)
            }
            UnaryOp::Not => {
                self.expr(&u.operand)?;
                asm!(self, "test %rax, %rax")?;
                asm!(self, "setz %al")?;
                asm!(self, "movzbq %al, %rax")
            }
            UnaryOp::Neg => {
                self.expr(&u.operand)?;
                asm!(self, "neg %rax")
            }
            UnaryOp::BNot => {
                self.expr(&u.operand)?;
                asm!(self, "not %rax")
            }
            UnaryOp::Plus => self.expr(&u.operand),
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec => {
                self.incdec(u)
            }
        }
    }

    /// Pointers step by the pointee size, integers by one.
    fn incdec(&mut self, u: &Unary) -> io::Result<()> {
        let ty = u.operand.ty();
        let delta = match ty.pointee() {
            Some(p) => p.size(),
            None => 1,
        };
        let op = match u.op {
            UnaryOp::PreInc | UnaryOp::PostInc => "add",
            _ => "sub",
        };
        let post = matches!(u.op, UnaryOp::PostInc | UnaryOp::PostDec);
        self.get_addr(&u.operand)?;
        asm!(self, "pushq %rax")?;
        self.load_from_ptr("rax", &ty)?;
        if post {
            asm!(self, "mov %rax, %rdx")?;
        }
        asm!(self, "{op} ${delta}, %rax")?;
        asm!(self, "popq %rcx")?;
        self.store_to_ptr("rcx", &ty)?;
        if post {
            asm!(self, "mov %rdx, %rax")?;
        }
        Ok(())
    }
}

/// Byte offset of the selected field inside its struct.
fn selector_offset(s: &Selector) -> i64 {
    let operand_ty = s.operand.ty();
    let st = if s.arrow {
        let decayed = operand_ty.decayed();
        let pointee = decayed.pointee().cloned().expect("checked by the parser");
        pointee.struct_type().cloned()
    } else {
        operand_ty.struct_type().cloned()
    };
    let st = st.expect("checked by the parser");
    let (offset, _) = st.field(&s.field).expect("checked by the parser");
    offset as i64
}

/// Gathers every local symbol declared anywhere in the body, including
/// nested blocks and for-loop initializers, in declaration order.
fn collect_locals(stmts: &[Stmt], out: &mut Vec<Rc<LSymbol>>) {
    for s in stmts {
        collect_locals_stmt(s, out);
    }
}

fn collect_locals_stmt(s: &Stmt, out: &mut Vec<Rc<LSymbol>>) {
    match s {
        Stmt::Decl(dl) => {
            for sym in &dl.symbols {
                if let Symbol::Local(l) = sym {
                    out.push(Rc::clone(l));
                }
            }
        }
        Stmt::Block(b) => collect_locals(&b.body, out),
        Stmt::If(i) => {
            collect_locals_stmt(&i.then, out);
            if let Some(els) = &i.els {
                collect_locals_stmt(els, out);
            }
        }
        Stmt::While(w) => collect_locals_stmt(&w.body, out),
        Stmt::DoWhile(d) => collect_locals_stmt(&d.body, out),
        Stmt::For(f) => {
            if let Some(init) = &f.init {
                collect_locals_stmt(init, out);
            }
            collect_locals_stmt(&f.body, out);
        }
        Stmt::Switch(sw) => collect_locals_stmt(&sw.body, out),
        Stmt::Labeled(l) => collect_locals_stmt(&l.stmt, out),
        Stmt::Goto(_) | Stmt::Return(_) | Stmt::Expr(_) | Stmt::Empty(_) => {}
    }
}
