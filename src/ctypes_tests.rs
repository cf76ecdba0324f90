use crate::ctypes::*;

#[test]
fn test_prim_sizes() {
    assert_eq!(Primitive::Char.size(), 1);
    assert_eq!(Primitive::Short.size(), 2);
    assert_eq!(Primitive::Int.size(), 4);
    assert_eq!(Primitive::Long.size(), 8);
    assert!(Primitive::Char.is_signed());
    assert!(!Primitive::UChar.is_signed());
}

#[test]
fn test_array_and_ptr() {
    let a = CType::Array(Box::new(CType::Prim(Primitive::Int)), 3);
    assert_eq!(a.size(), 12);
    assert_eq!(a.align(), 4);
    let p = CType::Prim(Primitive::Char).ptr_to();
    assert_eq!(p.size(), 8);
}

#[test]
fn test_struct_layout_respects_alignment() {
    let s = StructType::incomplete(None, false);
    s.complete(
        vec!["c".into(), "x".into(), "d".into()],
        vec![
            CType::Prim(Primitive::Char),
            CType::Prim(Primitive::Int),
            CType::Prim(Primitive::Char),
        ],
    );
    // char at 0, int aligned up to 4, trailing char at 8, size
    // rounded to the widest alignment
    assert_eq!(s.field("c").unwrap().0, 0);
    assert_eq!(s.field("x").unwrap().0, 4);
    assert_eq!(s.field("d").unwrap().0, 8);
    assert_eq!(s.size(), 12);
}

#[test]
fn test_union_layout() {
    let u = StructType::incomplete(None, true);
    u.complete(
        vec!["a".into(), "b".into()],
        vec![CType::Prim(Primitive::Char), CType::Prim(Primitive::Long)],
    );
    assert_eq!(u.field("a").unwrap().0, 0);
    assert_eq!(u.field("b").unwrap().0, 0);
    assert_eq!(u.size(), 8);
}
