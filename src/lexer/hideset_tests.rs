use super::HideSet;

#[test]
fn test_add_contains() {
    let hs = HideSet::empty();
    assert!(!hs.contains("FOO"));
    let hs2 = hs.add("FOO");
    assert!(hs2.contains("FOO"));
    // the original is untouched
    assert!(!hs.contains("FOO"));
    // adding again shares the same spine
    let hs3 = hs2.add("FOO");
    assert!(hs3.contains("FOO"));
}

#[test]
fn test_union_intersection() {
    let a = HideSet::empty().add("A").add("B");
    let b = HideSet::empty().add("B").add("C");
    let u = a.union(&b);
    assert!(u.contains("A") && u.contains("B") && u.contains("C"));
    let i = a.intersection(&b);
    assert!(!i.contains("A"));
    assert!(i.contains("B"));
    assert!(!i.contains("C"));
}
