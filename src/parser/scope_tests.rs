use super::scope::Scope;
use crate::ast::{GSymbol, Symbol};
use crate::ctypes::{CType, Primitive, StructType};

use std::rc::Rc;

fn gsym(name: &str) -> Symbol {
    Symbol::Global(Rc::new(GSymbol {
        label: name.to_owned(),
        ty: CType::Prim(Primitive::Int),
    }))
}

#[test]
fn test_shadowing() {
    let mut s = Scope::new();
    s.define("x", gsym("x_outer")).unwrap();
    s.push();
    s.define("x", gsym("x_inner")).unwrap();
    match s.lookup("x").unwrap() {
        Symbol::Global(g) => assert_eq!(g.label, "x_inner"),
        Symbol::Local(_) => panic!("wrong symbol"),
    }
    s.pop();
    match s.lookup("x").unwrap() {
        Symbol::Global(g) => assert_eq!(g.label, "x_outer"),
        Symbol::Local(_) => panic!("wrong symbol"),
    }
}

#[test]
fn test_redefinition_in_same_scope() {
    let mut s = Scope::new();
    s.define("x", gsym("x")).unwrap();
    assert!(s.define("x", gsym("x")).is_err());
    // a typedef of the same name collides too
    assert!(s
        .define_typedef("x", CType::Prim(Primitive::Int))
        .is_err());
}

#[test]
fn test_typedef_namespace() {
    let mut s = Scope::new();
    s.define_typedef("myint", CType::Prim(Primitive::Int)).unwrap();
    assert!(s.is_typedef_name("myint"));
    assert!(s.lookup("myint").is_none());
    // an inner variable hides the typedef
    s.push();
    s.define("myint", gsym("v")).unwrap();
    assert!(!s.is_typedef_name("myint"));
    s.pop();
    assert!(s.is_typedef_name("myint"));
}

#[test]
fn test_tags_are_separate() {
    let mut s = Scope::new();
    s.define("list", gsym("list")).unwrap();
    s.define_tag("list", Rc::new(StructType::incomplete(Some("list".into()), false)))
        .unwrap();
    assert!(s.lookup("list").is_some());
    assert!(s.lookup_tag("list").is_some());
}
