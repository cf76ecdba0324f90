use super::*;
use crate::ast::{FoldedInit, Stmt, TopLevel};
use crate::cpp::{Preprocessor, StandardIncludeSearcher};
use crate::ctypes::{CType, Primitive};
use crate::lexer::Lexer;

fn parse_src(src: &str) -> Result<crate::ast::TranslationUnit> {
    let pp = Preprocessor::new(
        Lexer::new("test.c", src),
        Box::new(StandardIncludeSearcher::new("")),
    );
    parse(pp)
}

fn parse_ok(src: &str) -> crate::ast::TranslationUnit {
    match parse_src(src) {
        Ok(tu) => tu,
        Err(e) => panic!("parse of {src:?} failed: {e} at {}", e.pos()),
    }
}

fn parse_err(src: &str) -> ParseError {
    match parse_src(src) {
        Ok(_) => panic!("parse of {src:?} unexpectedly succeeded"),
        Err(e) => e,
    }
}

#[test]
fn test_simple_function() {
    let tu = parse_ok("int main(void) { return 42; }");
    assert_eq!(tu.toplevels.len(), 1);
    let TopLevel::Func(f) = &tu.toplevels[0] else {
        panic!("expected a function");
    };
    assert_eq!(f.name, "main");
    assert!(f.param_syms.is_empty());
    assert_eq!(f.body.len(), 1);
}

#[test]
fn test_global_init_folds() {
    let tu = parse_ok("int g = 2 + 3 * 4;");
    let TopLevel::Decl(dl) = &tu.toplevels[0] else {
        panic!("expected a declaration");
    };
    assert_eq!(dl.inits[0], Some(FoldedInit::Const(14)));
}

#[test]
fn test_global_ptr_init_is_label() {
    let tu = parse_ok("static int a; int *p = &a;");
    let TopLevel::Decl(dl) = &tu.toplevels[1] else {
        panic!("expected a declaration");
    };
    assert_eq!(
        dl.inits[0],
        Some(FoldedInit::GPtr {
            label: "a".to_owned(),
            offset: 0
        })
    );
}

#[test]
fn test_global_array_element_addr_init() {
    let tu = parse_ok("int a[4]; int *p = &a[2];");
    let TopLevel::Decl(dl) = &tu.toplevels[1] else {
        panic!("expected a declaration");
    };
    assert_eq!(
        dl.inits[0],
        Some(FoldedInit::GPtr {
            label: "a".to_owned(),
            offset: 8
        })
    );
}

#[test]
fn test_string_literal_is_hoisted() {
    let tu = parse_ok("int main(void) { char *s = \"hi\"; return 0; }");
    assert_eq!(tu.anonymous_inits.len(), 1);
    assert_eq!(tu.anonymous_inits[0].val, "\"hi\"");
    assert!(tu.anonymous_inits[0].label.starts_with(".L"));
}

#[test]
fn test_function_pointer_declarator() {
    let tu = parse_ok("int (*fp)(int);");
    let TopLevel::Decl(dl) = &tu.toplevels[0] else {
        panic!("expected a declaration");
    };
    let CType::Ptr(inner) = dl.symbols[0].ty() else {
        panic!("expected a pointer type");
    };
    let CType::Func(f) = inner.as_ref() else {
        panic!("expected a pointer to function");
    };
    assert_eq!(f.params.len(), 1);
}

#[test]
fn test_array_of_pointers_declarator() {
    let tu = parse_ok("int *a[3];");
    let TopLevel::Decl(dl) = &tu.toplevels[0] else {
        panic!("expected a declaration");
    };
    let CType::Array(elem, 3) = dl.symbols[0].ty() else {
        panic!("expected an array type");
    };
    assert!(elem.is_ptr());
}

#[test]
fn test_array_dimension_folds() {
    let tu = parse_ok("int a[2 + 3];");
    let TopLevel::Decl(dl) = &tu.toplevels[0] else {
        panic!("expected a declaration");
    };
    let CType::Array(_, dim) = dl.symbols[0].ty() else {
        panic!("expected an array type");
    };
    assert_eq!(*dim, 5);
}

#[test]
fn test_typedef() {
    let tu = parse_ok("typedef long myint; myint x;");
    let TopLevel::Decl(dl) = &tu.toplevels[0] else {
        panic!("expected a declaration");
    };
    assert!(matches!(
        dl.symbols[0].ty(),
        CType::Prim(Primitive::Long)
    ));
}

#[test]
fn test_specifier_shapes() {
    let tu = parse_ok("unsigned long long x; short int y; long double z;");
    let tys: Vec<_> = tu
        .toplevels
        .iter()
        .map(|tl| {
            let TopLevel::Decl(dl) = tl else {
                panic!("expected declarations")
            };
            dl.symbols[0].ty().clone()
        })
        .collect();
    assert!(matches!(tys[0], CType::Prim(Primitive::ULLong)));
    assert!(matches!(tys[1], CType::Prim(Primitive::Short)));
    assert!(matches!(tys[2], CType::Prim(Primitive::LDouble)));
}

#[test]
fn test_struct_definition_and_selector() {
    let tu = parse_ok(
        "struct point { int x; int y; };\n\
         struct point p;\n\
         int main(void) { p.x = 1; return p.x; }",
    );
    assert_eq!(tu.toplevels.len(), 2);
}

#[test]
fn test_self_referential_struct() {
    parse_ok("struct list { struct list *next; int v; }; struct list l;");
}

#[test]
fn test_switch_cases_collected() {
    let tu = parse_ok(
        "int main(void) { switch (1) { case 1: return 0; case 2: return 1; default: return 2; } }",
    );
    let TopLevel::Func(f) = &tu.toplevels[0] else {
        panic!("expected a function");
    };
    let Stmt::Switch(sw) = &f.body[0] else {
        panic!("expected a switch");
    };
    assert_eq!(sw.cases.len(), 2);
    assert_eq!(sw.cases[0].val, 1);
    assert_eq!(sw.cases[1].val, 2);
    assert!(sw.l_default.is_some());
}

#[test]
fn test_goto_is_patched_to_synthetic_label() {
    let tu = parse_ok("int main(void) { goto out; out: return 1; }");
    let TopLevel::Func(f) = &tu.toplevels[0] else {
        panic!("expected a function");
    };
    let Stmt::Goto(g) = &f.body[0] else {
        panic!("expected a goto");
    };
    let Stmt::Labeled(l) = &f.body[1] else {
        panic!("expected a labeled statement");
    };
    assert!(g.label.starts_with(".L"));
    assert_eq!(g.label, l.anon_label);
}

#[test]
fn test_sizeof_folds_to_constant() {
    let tu = parse_ok("int main(void) { return sizeof(long); }");
    let TopLevel::Func(f) = &tu.toplevels[0] else {
        panic!("expected a function");
    };
    let Stmt::Return(r) = &f.body[0] else {
        panic!("expected a return");
    };
    let Some(crate::ast::Expr::Constant(c)) = &r.expr else {
        panic!("expected a constant");
    };
    assert_eq!(c.val, 8);
}

#[test]
fn test_local_init_is_lowered_to_assignment() {
    let tu = parse_ok("int main(void) { int x = 5; return x; }");
    let TopLevel::Func(f) = &tu.toplevels[0] else {
        panic!("expected a function");
    };
    assert!(matches!(&f.body[0], Stmt::Decl(_)));
    assert!(matches!(&f.body[1], Stmt::Expr(_)));
}

#[test]
fn test_undeclared_identifier() {
    let e = parse_err("int main(void) { return x; }");
    assert!(e.to_string().contains("not defined"));
}

#[test]
fn test_duplicate_case() {
    let e = parse_err("int main(void) { switch (1) { case 1: case 1: return 0; } }");
    assert!(e.to_string().contains("duplicate case"));
}

#[test]
fn test_case_requires_constant() {
    let e = parse_err("int main(void) { int x; switch (1) { case x: return 0; } }");
    assert!(e.to_string().contains("constant"));
}

#[test]
fn test_break_outside_loop() {
    let e = parse_err("int main(void) { break; }");
    assert!(e.to_string().contains("break"));
}

#[test]
fn test_goto_unknown_label() {
    let e = parse_err("int main(void) { goto nowhere; return 0; }");
    assert!(e.to_string().contains("nowhere"));
}

#[test]
fn test_duplicate_label() {
    let e = parse_err("int main(void) { l: ; l: return 0; }");
    assert!(e.to_string().contains("duplicate label"));
}

#[test]
fn test_deref_non_pointer() {
    let e = parse_err("int main(void) { int x; return *x; }");
    assert!(e.to_string().contains("dereference"));
}

#[test]
fn test_member_of_non_struct() {
    let e = parse_err("int main(void) { int x; return x.f; }");
    assert!(e.to_string().contains("member access"));
}

#[test]
fn test_no_such_field() {
    let e = parse_err("struct s { int a; }; struct s v; int main(void) { return v.b; }");
    assert!(e.to_string().contains("no such field"));
}

#[test]
fn test_call_of_non_function() {
    let e = parse_err("int main(void) { int x; return x(1); }");
    assert!(e.to_string().contains("not a function"));
}

#[test]
fn test_call_arity_checked() {
    let e = parse_err("int f(int a) { return a; } int main(void) { return f(1, 2); }");
    assert!(e.to_string().contains("arguments"));
}

#[test]
fn test_switch_requires_integral() {
    let e = parse_err("int main(void) { int *p; switch (p) { default: return 0; } }");
    assert!(e.to_string().contains("switch"));
}

#[test]
fn test_bad_cast() {
    let e = parse_err(
        "struct s { int a; }; struct s v; int main(void) { return (struct s)1; }",
    );
    assert!(e.to_string().contains("cast"));
}

#[test]
fn test_global_init_must_be_constant() {
    let e = parse_err("int f(void) { return 1; } int g = f();");
    assert!(e.to_string().contains("constant"));
}

#[test]
fn test_redefinition() {
    let e = parse_err("int main(void) { int x; int x; return 0; }");
    assert!(e.to_string().contains("redefinition"));
}

#[test]
fn test_shadowing_allowed_across_scopes() {
    parse_ok("int x; int main(void) { int x = 2; { int x = 3; } return x; }");
}

#[test]
fn test_error_position_points_into_source() {
    let e = parse_err("int main(void) {\n  return bogus;\n}");
    assert_eq!(e.pos().line, 2);
    assert_eq!(e.pos().col, 10);
}
