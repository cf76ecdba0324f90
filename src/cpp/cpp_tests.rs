use super::*;
use crate::lexer::Lexer;

use std::io;
use std::path::PathBuf;

/// Test searcher serving headers from an in-memory table.
struct FakeSearcher {
    headers: Vec<(&'static str, &'static str)>,
}

impl IncludeSearcher for FakeSearcher {
    fn include_quote(
        &self,
        requesting_file: &str,
        header_path: &str,
    ) -> io::Result<(PathBuf, String)> {
        self.include_angled(requesting_file, header_path)
    }

    fn include_angled(
        &self,
        _requesting_file: &str,
        header_path: &str,
    ) -> io::Result<(PathBuf, String)> {
        for (name, contents) in &self.headers {
            if *name == header_path {
                return Ok((PathBuf::from(name), (*contents).to_string()));
            }
        }
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("header {header_path} not found"),
        ))
    }
}

fn pp(src: &str) -> Preprocessor {
    pp_with_headers(src, Vec::new())
}

fn pp_with_headers(src: &str, headers: Vec<(&'static str, &'static str)>) -> Preprocessor {
    Preprocessor::new(
        Lexer::new("test.c", src),
        Box::new(FakeSearcher { headers }),
    )
}

fn expand_vals(p: &mut Preprocessor) -> Vec<String> {
    let mut out = Vec::new();
    loop {
        let t = p.next().expect("preprocess error");
        if t.kind == TokenKind::Eof {
            return out;
        }
        out.push(t.val);
    }
}

#[test]
fn test_no_directives_passthrough() {
    let mut p = pp("int main(void) { return 0; }");
    assert_eq!(
        expand_vals(&mut p),
        vec!["int", "main", "(", "void", ")", "{", "return", "0", ";", "}"]
    );
}

#[test]
fn test_object_macro() {
    let mut p = pp("#define N 42\nint x = N;");
    assert_eq!(expand_vals(&mut p), vec!["int", "x", "=", "42", ";"]);
}

#[test]
fn test_object_macro_multi_token() {
    let mut p = pp("#define E 1 + 2\nE");
    assert_eq!(expand_vals(&mut p), vec!["1", "+", "2"]);
}

#[test]
fn test_object_macro_position_rewrite() {
    let mut p = pp("#define N 42\nint x = N;");
    let mut last = None;
    loop {
        let t = p.next().unwrap();
        if t.kind == TokenKind::Eof {
            break;
        }
        if t.val == "42" {
            last = Some(t.pos.clone());
        }
    }
    // the replacement token reports the invocation site
    let pos = last.unwrap();
    assert_eq!((pos.line, pos.col), (2, 9));
}

#[test]
fn test_funclike_macro() {
    let mut p = pp("#define SQ(x) ((x)*(x))\nSQ(6)");
    assert_eq!(
        expand_vals(&mut p),
        vec!["(", "(", "6", ")", "*", "(", "6", ")", ")"]
    );
}

#[test]
fn test_funclike_nested_parens() {
    let mut p = pp("#define FST(a, b) a\nFST((1,2), 3)");
    assert_eq!(expand_vals(&mut p), vec!["(", "1", ",", "2", ")"]);
}

#[test]
fn test_funclike_without_parens_not_expanded() {
    let mut p = pp("#define F(x) x\nint F ;");
    assert_eq!(expand_vals(&mut p), vec!["int", "F", ";"]);
}

#[test]
fn test_funclike_arity_mismatch() {
    let mut p = pp("#define F(a, b) a b\nF(1)");
    let mut res = Ok(());
    loop {
        match p.next() {
            Ok(t) if t.kind == TokenKind::Eof => break,
            Ok(_) => {}
            Err(e) => {
                res = Err(e);
                break;
            }
        }
    }
    let err = res.unwrap_err();
    assert!(err.to_string().contains("1 arguments but 2 were expected"));
}

#[test]
fn test_recursive_macro_terminates() {
    // the body's own name carries the hide set after one expansion
    let mut p = pp("#define X X + 1\nX");
    assert_eq!(expand_vals(&mut p), vec!["X", "+", "1"]);
}

#[test]
fn test_mutually_recursive_macros_terminate() {
    let mut p = pp("#define A B\n#define B A\nA");
    assert_eq!(expand_vals(&mut p), vec!["A"]);
}

#[test]
fn test_macro_redefinition_is_error() {
    let mut p = pp("#define A 1\n#define A 2\n");
    assert!(p.next().is_err());
}

#[test]
fn test_duplicate_formal_is_error() {
    let mut p = pp("#define F(a, a) a\n");
    assert!(p.next().is_err());
}

#[test]
fn test_undef() {
    let mut p = pp("#define A 1\n#undef A\nA");
    assert_eq!(expand_vals(&mut p), vec!["A"]);
}

#[test]
fn test_undef_of_undefined_is_error() {
    let mut p = pp("#undef NOPE\n");
    assert!(p.next().is_err());
}

#[test]
fn test_include() {
    let mut p = pp_with_headers(
        "#include <defs.h>\nint x = N;",
        vec![("defs.h", "#define N 7\n")],
    );
    assert_eq!(expand_vals(&mut p), vec!["int", "x", "=", "7", ";"]);
}

#[test]
fn test_include_body_tokens() {
    let mut p = pp_with_headers(
        "#include \"decl.h\"\nint y;",
        vec![("decl.h", "int x;\n")],
    );
    assert_eq!(expand_vals(&mut p), vec!["int", "x", ";", "int", "y", ";"]);
}

#[test]
fn test_include_not_found() {
    let mut p = pp("#include <missing.h>\n");
    assert!(p.next().is_err());
}

#[test]
fn test_if_true_includes_body() {
    let mut p = pp("#if 1\nint x;\n#endif\nint y;");
    assert_eq!(expand_vals(&mut p), vec!["int", "x", ";", "int", "y", ";"]);
}

#[test]
fn test_if_false_skips_body() {
    let mut p = pp("#if 0\nint x;\n#endif\nint y;");
    assert_eq!(expand_vals(&mut p), vec!["int", "y", ";"]);
}

#[test]
fn test_if_expression() {
    let mut p = pp("#define N 4\n#if defined(N) && 2 + 2 == 4\nok\n#endif\n");
    assert_eq!(expand_vals(&mut p), vec!["ok"]);
}

#[test]
fn test_ifdef_and_ifndef() {
    let mut p = pp("#define A 1\n#ifdef A\nyes\n#endif\n#ifndef A\nno\n#endif\n");
    assert_eq!(expand_vals(&mut p), vec!["yes"]);
}

#[test]
fn test_nested_conditional_skip() {
    let mut p = pp("#if 0\n#if 1\ninner\n#endif\nouter\n#endif\ndone");
    assert_eq!(expand_vals(&mut p), vec!["done"]);
}

#[test]
fn test_stray_endif_is_error() {
    let mut p = pp("#endif\n");
    assert!(p.next().is_err());
}

#[test]
fn test_unclosed_conditional_is_error() {
    let mut p = pp("#if 0\nint x;\n");
    assert!(p.next().is_err());
}

#[test]
fn test_error_directive() {
    let mut p = pp("#error \"nope\"\n");
    let err = p.next().unwrap_err();
    assert!(err.to_string().contains("nope"));
}

#[test]
fn test_unknown_directive_is_error() {
    let mut p = pp("#pragma once\n");
    assert!(p.next().is_err());
}
