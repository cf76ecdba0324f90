//! Expression parsing and evaluation for `#if` directives.
//!
//! `defined NAME` and `defined(NAME)` are handled here as atoms. The
//! expression may contain integer constants, most of C's arithmetic
//! operators, and identifiers that are not macros, which all evaluate to
//! zero.

use crate::lexer::{Token, TokenKind};

struct ExprCtx<'a> {
    toks: &'a [Token],
    idx: usize,
    is_defined: &'a dyn Fn(&str) -> bool,
}

impl ExprCtx<'_> {
    fn next(&mut self) -> Option<Token> {
        let t = self.toks.get(self.idx).cloned();
        if t.is_some() {
            self.idx += 1;
        }
        t
    }

    fn peek(&self) -> Option<&Token> {
        self.toks.get(self.idx)
    }
}

fn parse_int_constant(val: &str) -> Result<i64, String> {
    let digits = val.trim_end_matches(|c| matches!(c, 'l' | 'L' | 'u' | 'U'));
    let parsed = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16)
    } else if digits.len() > 1 && digits.starts_with('0') {
        u64::from_str_radix(&digits[1..], 8)
    } else {
        digits.parse::<u64>()
    };
    match parsed {
        Ok(v) => Ok(v as i64),
        Err(_) => Err(format!("bad integer constant {val}")),
    }
}

fn parse_atom(ctx: &mut ExprCtx) -> Result<i64, String> {
    use TokenKind::*;
    let Some(tok) = ctx.next() else {
        return Err("expected integer, char, or defined but got nothing".to_owned());
    };
    let to_check = match tok.kind {
        Not => {
            let v = parse_atom(ctx)?;
            return Ok(i64::from(v == 0));
        }
        BNot => {
            let v = parse_atom(ctx)?;
            return Ok(!v);
        }
        Sub => {
            let v = parse_atom(ctx)?;
            return Ok(v.wrapping_neg());
        }
        Add => return parse_atom(ctx),
        Lparen => {
            let v = parse_expr(ctx)?;
            match ctx.next() {
                Some(t) if t.kind == Rparen => return Ok(v),
                _ => return Err("unclosed parenthesis".to_owned()),
            }
        }
        IntConstant => return parse_int_constant(&tok.val),
        CharConstant => {
            return Err("char literal in preprocessor expression is unimplemented".to_owned())
        }
        Ident if tok.val == "defined" => {
            let Some(arg) = ctx.next() else {
                return Err("expected ( or an identifier after defined".to_owned());
            };
            match arg.kind {
                Lparen => {
                    let Some(name) = ctx.next() else {
                        return Err("malformed defined check".to_owned());
                    };
                    let name = name.val.clone();
                    match ctx.next() {
                        Some(t) if t.kind == Rparen => {}
                        _ => return Err("malformed defined check, missing )".to_owned()),
                    }
                    name
                }
                Ident => arg.val.clone(),
                _ => return Err(format!("malformed defined statement at {}", arg.pos)),
            }
        }
        Ident => tok.val.clone(),
        _ => {
            return Err(format!(
                "expected integer, char, or defined but got {}",
                tok.val
            ))
        }
    };
    Ok(i64::from((ctx.is_defined)(&to_check)))
}

fn get_prec(k: TokenKind) -> i32 {
    use TokenKind::*;
    match k {
        Mul | Rem | Quo => 10,
        Add | Sub => 9,
        Shr | Shl => 8,
        Lss | Gtr | Geq | Leq => 7,
        Eql | Neq => 6,
        And => 5,
        Xor => 4,
        Or => 3,
        LAnd => 2,
        LOr => 1,
        _ => -1,
    }
}

fn eval_binop(k: TokenKind, l: i64, r: i64) -> Result<i64, String> {
    use TokenKind::*;
    let v = match k {
        LOr => i64::from(l != 0 || r != 0),
        LAnd => i64::from(l != 0 && r != 0),
        Or => l | r,
        Xor => l ^ r,
        And => l & r,
        Add => l.wrapping_add(r),
        Sub => l.wrapping_sub(r),
        Mul => l.wrapping_mul(r),
        Shr => l.wrapping_shr(r as u32),
        Shl => l.wrapping_shl(r as u32),
        Quo => {
            if r == 0 {
                return Err("divide by zero in expression".to_owned());
            }
            l / r
        }
        Rem => {
            if r == 0 {
                return Err("divide by zero in expression".to_owned());
            }
            l % r
        }
        Eql => i64::from(l == r),
        Neq => i64::from(l != r),
        Lss => i64::from(l < r),
        Gtr => i64::from(l > r),
        Leq => i64::from(l <= r),
        Geq => i64::from(l >= r),
        _ => return Err(format!("internal error evaluating {k}")),
    };
    Ok(v)
}

/// Precedence climbing, simplified because every operator here is left
/// associative; the preprocessor has no assignment operators.
fn parse_binop(ctx: &mut ExprCtx, prec: i32) -> Result<i64, String> {
    let mut l = parse_atom(ctx)?;
    while let Some(t) = ctx.peek() {
        let p = get_prec(t.kind);
        if p == -1 || p < prec {
            break;
        }
        let kind = t.kind;
        ctx.next();
        let r = parse_binop(ctx, p + 1)?;
        l = eval_binop(kind, l, r)?;
    }
    Ok(l)
}

fn parse_ternary(ctx: &mut ExprCtx) -> Result<i64, String> {
    let cond = parse_binop(ctx, 0)?;
    if ctx.peek().map(|t| t.kind) != Some(TokenKind::Question) {
        return Ok(cond);
    }
    ctx.next();
    let a = parse_expr(ctx)?;
    match ctx.next() {
        Some(t) if t.kind == TokenKind::Colon => {}
        _ => return Err("ternary without :".to_owned()),
    }
    let b = parse_expr(ctx)?;
    Ok(if cond != 0 { a } else { b })
}

fn parse_comma(ctx: &mut ExprCtx) -> Result<i64, String> {
    let mut v = parse_ternary(ctx)?;
    while ctx.peek().map(|t| t.kind) == Some(TokenKind::Comma) {
        ctx.next();
        v = parse_ternary(ctx)?;
    }
    Ok(v)
}

fn parse_expr(ctx: &mut ExprCtx) -> Result<i64, String> {
    parse_comma(ctx)
}

/// Evaluates the token sequence of an `#if` line to a signed 64-bit
/// integer. Trailing tokens after a complete expression are an error.
pub fn eval_if_expr(toks: &[Token], is_defined: &dyn Fn(&str) -> bool) -> Result<i64, String> {
    let mut ctx = ExprCtx {
        toks,
        idx: 0,
        is_defined,
    };
    let ret = parse_expr(&mut ctx)?;
    if let Some(t) = ctx.next() {
        return Err(format!("stray token {}", t.val));
    }
    Ok(ret)
}
