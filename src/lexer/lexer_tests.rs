use super::*;

fn lex_all(src: &str) -> Vec<Token> {
    let mut lx = Lexer::new("test.c", src);
    let mut out = Vec::new();
    loop {
        let t = lx.next().expect("lex error");
        let done = t.kind == TokenKind::Eof;
        out.push(t);
        if done {
            break;
        }
    }
    out
}

fn kinds(src: &str) -> Vec<TokenKind> {
    lex_all(src).into_iter().map(|t| t.kind).collect()
}

fn vals(src: &str) -> Vec<String> {
    let mut v: Vec<String> = lex_all(src).into_iter().map(|t| t.val).collect();
    v.pop(); // drop the empty EOF value
    v
}

#[test]
fn test_basic() {
    use TokenKind::*;
    assert_eq!(
        kinds("int main(void) { return 0; }"),
        vec![Int, Ident, Lparen, Void, Rparen, Lbrace, Return, IntConstant, Semicolon, Rbrace, Eof]
    );
}

#[test]
fn test_operators() {
    use TokenKind::*;
    assert_eq!(
        kinds("a += b << 2 >>= ->"),
        vec![Ident, AddAssign, Ident, Shl, IntConstant, ShrAssign, Arrow, Eof]
    );
    assert_eq!(kinds("<<="), vec![ShlAssign, Eof]);
    assert_eq!(kinds("..."), vec![Ellipsis, Eof]);
}

#[test]
fn test_positions() {
    let toks = lex_all("int x;\n\ty = 2;");
    assert_eq!((toks[0].pos.line, toks[0].pos.col), (1, 1));
    assert_eq!((toks[1].pos.line, toks[1].pos.col), (1, 5));
    // tab advances the column by 4
    assert_eq!((toks[3].pos.line, toks[3].pos.col), (2, 5));
}

#[test]
fn test_numbers() {
    assert_eq!(vals("123 0x1f 42ul 1.5 .5 1e-3 2E+4f"), vec!["123", "0x1f", "42ul", "1.5", ".5", "1e-3", "2E+4f"]);
    let k = kinds("1.5 2 0x3");
    assert_eq!(
        k,
        vec![TokenKind::FloatConstant, TokenKind::IntConstant, TokenKind::IntConstant, TokenKind::Eof]
    );
}

#[test]
fn test_bad_number_tail() {
    let mut lx = Lexer::new("test.c", "int x = 1foo;");
    let mut last = None;
    for _ in 0..4 {
        last = Some(lx.next());
    }
    assert!(last.unwrap().is_err());
    // after an error the lexer reports end of file
    assert_eq!(lx.next().unwrap().kind, TokenKind::Eof);
}

#[test]
fn test_string_and_char() {
    let toks = lex_all(r#"char *s = "hi\n"; char c = 'a';"#);
    let s = toks.iter().find(|t| t.kind == TokenKind::StringLit).unwrap();
    assert_eq!(s.val, "\"hi\\n\"");
    let c = toks.iter().find(|t| t.kind == TokenKind::CharConstant).unwrap();
    assert_eq!(c.val, "'a'");
}

#[test]
fn test_string_backslash_newline() {
    let toks = lex_all("\"ab\\\ncd\"");
    assert_eq!(toks[0].val, "\"abcd\"");
}

#[test]
fn test_unterminated_string() {
    let mut lx = Lexer::new("test.c", "\"abc");
    assert!(lx.next().is_err());
}

#[test]
fn test_comments() {
    use TokenKind::*;
    assert_eq!(kinds("a /* b\nc */ d // e\nf"), vec![Ident, Ident, Ident, Eof]);
    let toks = lex_all("x /* \n\n */ y");
    // newlines inside the comment still count
    assert_eq!(toks[1].pos.line, 3);
}

#[test]
fn test_line_continuation() {
    use TokenKind::*;
    assert_eq!(kinds("ab\\\ncd"), vec![Ident, Ident, Eof]);
}

#[test]
fn test_directive_tokens() {
    use TokenKind::*;
    assert_eq!(
        kinds("#include <stdio.h>\nint x;"),
        vec![Directive, Header, EndDirective, Int, Ident, Semicolon, Eof]
    );
    let toks = lex_all("#include \"foo.h\"\n");
    assert_eq!(toks[1].val, "\"foo.h\"");
    let toks = lex_all("#include <foo.h>\n");
    assert_eq!(toks[1].val, "<foo.h>");
}

#[test]
fn test_define_tokens() {
    use TokenKind::*;
    // object-like: no marker
    assert_eq!(
        kinds("#define FOO 1\n"),
        vec![Directive, Ident, IntConstant, EndDirective, Eof]
    );
    // function-like: marker between the name and the paren
    assert_eq!(
        kinds("#define SQ(x) ((x)*(x))\n"),
        vec![
            Directive,
            Ident,
            FunclikeDefine,
            Lparen,
            Ident,
            Rparen,
            Lparen,
            Lparen,
            Ident,
            Rparen,
            Mul,
            Lparen,
            Ident,
            Rparen,
            Rparen,
            EndDirective,
            Eof
        ]
    );
    // a space before the paren makes it object-like
    assert_eq!(
        kinds("#define FOO (x)\n"),
        vec![Directive, Ident, Lparen, Ident, Rparen, EndDirective, Eof]
    );
}

#[test]
fn test_directive_ends_at_eof() {
    use TokenKind::*;
    assert_eq!(kinds("#define FOO 1"), vec![Directive, Ident, IntConstant, EndDirective, Eof]);
}

#[test]
fn test_hash_mid_line() {
    use TokenKind::*;
    assert_eq!(kinds("a # b"), vec![Ident, Hash, Ident, Eof]);
}

#[test]
fn test_misplaced_backslash() {
    let mut lx = Lexer::new("test.c", "\\x");
    assert!(lx.next().is_err());
}

#[test]
fn test_unclosed_comment() {
    let mut lx = Lexer::new("test.c", "/* foo");
    assert!(lx.next().is_err());
}

#[test]
fn test_dollar_in_ident() {
    let toks = lex_all("a$b");
    assert_eq!(toks[0].val, "a$b");
}
