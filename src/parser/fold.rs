//! Constant folding. To fold an expression is to compute the constant
//! that can replace it without changing the meaning of the program.
//! Folding failure is only fatal where a constant is required: global
//! initializers, array dimensions, and case labels.

use crate::ast::{BinaryOp, Expr, FoldedInit, Symbol, UnaryOp};
use crate::ctypes::CType;

/// Truncates `v` to the width and signedness of `ty`.
fn truncate(v: i64, ty: &CType) -> i64 {
    match ty.size() {
        1 => {
            if ty.is_signed_int() {
                i64::from(v as i8)
            } else {
                i64::from(v as u8)
            }
        }
        2 => {
            if ty.is_signed_int() {
                i64::from(v as i16)
            } else {
                i64::from(v as u16)
            }
        }
        4 => {
            if ty.is_signed_int() {
                i64::from(v as i32)
            } else {
                i64::from(v as u32)
            }
        }
        _ => v,
    }
}

pub fn fold(e: &Expr) -> Result<FoldedInit, String> {
    match e {
        Expr::Constant(c) => Ok(FoldedInit::Const(c.val)),
        Expr::Str(s) => Ok(FoldedInit::Str(s.label.clone())),
        Expr::Cast(c) => match fold(&c.operand)? {
            FoldedInit::Const(v) if c.ty.is_int() => Ok(FoldedInit::Const(truncate(v, &c.ty))),
            other => Ok(other),
        },
        Expr::Unary(u) => fold_unary(u),
        Expr::Binary(b) => fold_binary(b),
        _ => Err("not a valid constant value".to_owned()),
    }
}

/// Folds to a plain integer; addresses are rejected.
pub fn fold_integer(e: &Expr) -> Result<i64, String> {
    match fold(e)? {
        FoldedInit::Const(v) => Ok(v),
        _ => Err("expected an integer constant".to_owned()),
    }
}

fn fold_unary(u: &crate::ast::Unary) -> Result<FoldedInit, String> {
    if u.op == UnaryOp::Addr {
        return fold_addr(&u.operand);
    }
    let FoldedInit::Const(v) = fold(&u.operand)? else {
        return Err("not a valid constant value".to_owned());
    };
    let v = match u.op {
        UnaryOp::Neg => v.wrapping_neg(),
        UnaryOp::BNot => !v,
        UnaryOp::Not => i64::from(v == 0),
        UnaryOp::Plus => v,
        _ => return Err("not a valid constant value".to_owned()),
    };
    Ok(FoldedInit::Const(v))
}

/// `&x` folds when `x` is a global, or a constant-indexed element of a
/// global array; the result is a label with an optional byte offset.
fn fold_addr(operand: &Expr) -> Result<FoldedInit, String> {
    match operand {
        Expr::Ident(ident) => match &ident.sym {
            Symbol::Global(g) => Ok(FoldedInit::GPtr {
                label: g.label.clone(),
                offset: 0,
            }),
            Symbol::Local(_) => Err("'&' requires a static or global identifier".to_owned()),
        },
        Expr::Index(index) => {
            let Expr::Ident(ident) = index.arr.as_ref() else {
                return Err("'&' requires a static or global identifier".to_owned());
            };
            let Symbol::Global(g) = &ident.sym else {
                return Err("'&' requires a static or global identifier".to_owned());
            };
            let idx = fold_integer(&index.idx)?;
            Ok(FoldedInit::GPtr {
                label: g.label.clone(),
                offset: idx * index.ty.size() as i64,
            })
        }
        _ => Err("'&' requires a static or global identifier".to_owned()),
    }
}

fn fold_binary(b: &crate::ast::Binary) -> Result<FoldedInit, String> {
    let l = fold(&b.l)?;
    let r = fold(&b.r)?;
    // label + constant keeps the label and moves the offset
    match (&l, &r, b.op) {
        (FoldedInit::GPtr { label, offset }, FoldedInit::Const(c), BinaryOp::Add) => {
            return Ok(FoldedInit::GPtr {
                label: label.clone(),
                offset: offset + c,
            });
        }
        (FoldedInit::GPtr { label, offset }, FoldedInit::Const(c), BinaryOp::Sub) => {
            return Ok(FoldedInit::GPtr {
                label: label.clone(),
                offset: offset - c,
            });
        }
        (FoldedInit::Const(c), FoldedInit::GPtr { label, offset }, BinaryOp::Add) => {
            return Ok(FoldedInit::GPtr {
                label: label.clone(),
                offset: offset + c,
            });
        }
        _ => {}
    }
    let (FoldedInit::Const(l), FoldedInit::Const(r)) = (l, r) else {
        return Err("not a valid constant value".to_owned());
    };
    let v = match b.op {
        BinaryOp::Add => l.wrapping_add(r),
        BinaryOp::Sub => l.wrapping_sub(r),
        BinaryOp::Mul => l.wrapping_mul(r),
        BinaryOp::Div => {
            if r == 0 {
                return Err("divide by zero in constant expression".to_owned());
            }
            l / r
        }
        BinaryOp::Rem => {
            if r == 0 {
                return Err("divide by zero in constant expression".to_owned());
            }
            l % r
        }
        BinaryOp::And => l & r,
        BinaryOp::Or => l | r,
        BinaryOp::Xor => l ^ r,
        BinaryOp::Shl => l.wrapping_shl(r as u32),
        BinaryOp::Shr => l.wrapping_shr(r as u32),
        BinaryOp::Eql => i64::from(l == r),
        BinaryOp::Neq => i64::from(l != r),
        BinaryOp::Lss => i64::from(l < r),
        BinaryOp::Gtr => i64::from(l > r),
        BinaryOp::Leq => i64::from(l <= r),
        BinaryOp::Geq => i64::from(l >= r),
        BinaryOp::LAnd => i64::from(l != 0 && r != 0),
        BinaryOp::LOr => i64::from(l != 0 || r != 0),
        BinaryOp::Comma => r,
        BinaryOp::Assign => return Err("not a valid constant value".to_owned()),
    };
    Ok(FoldedInit::Const(v))
}
