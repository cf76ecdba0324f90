use super::expr::eval_if_expr;
use crate::lexer::{Lexer, Token, TokenKind};

fn lex_expr(src: &str) -> Vec<Token> {
    let mut lx = Lexer::new("testcase.c", src);
    let mut toks = Vec::new();
    loop {
        let t = lx.next().expect("lex error in test expression");
        if t.kind == TokenKind::Eof {
            return toks;
        }
        toks.push(t);
    }
}

fn is_defined(name: &str) -> bool {
    matches!(name, "foo" | "bar" | "baz")
}

#[test]
fn test_expr_eval() {
    let cases: &[(&str, i64, bool)] = &[
        ("1", 1, false),
        ("2", 2, false),
        ("0x1", 0x1, false),
        ("-1", -1, false),
        ("-2", -2, false),
        ("(2)", 2, false),
        ("(-2)", -2, false),
        ("0x1234", 0x1234, false),
        ("foo", 1, false),
        ("bang", 0, false),
        ("defined foo", 1, false),
        ("defined bang", 0, false),
        ("defined(foo)", 1, false),
        ("defined(bang)", 0, false),
        ("defined", 0, true),
        ("defined(bang", 0, true),
        ("defined bang)", 0, true),
        ("0 || 0", 0, false),
        ("1 || 0", 1, false),
        ("0 || 1", 1, false),
        ("1 || 1", 1, false),
        ("0 && 0", 0, false),
        ("1 && 0", 0, false),
        ("0 && 1", 0, false),
        ("1 && 1", 1, false),
        ("0xf0 | 1", 0xf1, false),
        ("0xf0 & 1", 0, false),
        ("0xf0 & 0x1f", 0x10, false),
        ("1 ^ 1", 0, false),
        ("1 == 1", 1, false),
        ("1 == 0", 0, false),
        ("1 != 1", 0, false),
        ("0 != 1", 1, false),
        ("0 > 1", 0, false),
        ("0 < 1", 1, false),
        ("0 > -1", 1, false),
        ("0 < -1", 0, false),
        ("0 >= 1", 0, false),
        ("0 <= 1", 1, false),
        ("0 >= -1", 1, false),
        ("0 <= -1", 0, false),
        ("0 < 0", 0, false),
        ("0 <= 0", 1, false),
        ("0 > 0", 0, false),
        ("0 >= 0", 1, false),
        ("1 << 1", 2, false),
        ("2 >> 1", 1, false),
        ("2 + 1", 3, false),
        ("2 - 3", -1, false),
        ("2 * 3", 6, false),
        ("6 / 3", 2, false),
        ("7 % 3", 1, false),
        ("6 / 0", 0, true),
        ("6 % 0", 0, true),
        ("!0", 1, false),
        ("!5", 0, false),
        ("~0", -1, false),
        ("0,1", 1, false),
        ("1,0", 0, false),
        ("2+2*3+2", 10, false),
        ("(2+2)*(3+2)", 20, false),
        ("2 + 2 + 2 + 2 == 2 + 2 * 3", 1, false),
        ("0 ? 1 : 2", 2, false),
        ("1 ? 1 : 2", 1, false),
        ("(1 ? 1 ? 1337 : 1234 : 2) == 1337", 1, false),
        ("(1 ? 0 ? 1337 : 1234 : 2) == 1234", 1, false),
        ("(0 ? 1 ? 1337 : 1234 : 2) == 2", 1, false),
        ("(0 ? 1 ? 1337 : 1234 : 2 ? 3 : 4) == 3", 1, false),
        ("0 , 1 ? 1 , 0 : 2", 0, false),
        ("1 2", 0, true),
    ];
    for (src, expected, expect_err) in cases {
        let toks = lex_expr(src);
        match eval_if_expr(&toks, &is_defined) {
            Ok(v) => {
                assert!(!expect_err, "{src}: expected an error, got {v}");
                assert_eq!(v, *expected, "{src}");
            }
            Err(e) => assert!(*expect_err, "{src}: unexpected error {e}"),
        }
    }
}
