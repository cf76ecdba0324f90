use super::emit;
use crate::cpp::{Preprocessor, StandardIncludeSearcher};
use crate::lexer::Lexer;
use crate::parser;

fn compile(src: &str) -> String {
    let pp = Preprocessor::new(
        Lexer::new("test.c", src),
        Box::new(StandardIncludeSearcher::new("")),
    );
    let tu = match parser::parse(pp) {
        Ok(tu) => tu,
        Err(e) => panic!("parse of {src:?} failed: {e} at {}", e.pos()),
    };
    let mut out = Vec::new();
    emit(&tu, &mut out).expect("emission to a buffer failed");
    String::from_utf8(out).expect("emitted assembly is not utf-8")
}

#[test]
fn test_return_constant() {
    let asm = compile("int main(void) { return 42; }");
    assert!(asm.contains(".text"));
    assert!(asm.contains(".global main"));
    assert!(asm.contains("main:"));
    assert!(asm.contains("pushq %rbp"));
    assert!(asm.contains("movq %rsp, %rbp"));
    assert!(asm.contains("movq $42, %rax"));
    assert!(asm.contains("leave"));
    assert!(asm.contains("ret"));
}

#[test]
fn test_binary_op_uses_stack_discipline() {
    let asm = compile("int main(void) { return 2 + 3; }");
    assert!(asm.contains("pushq %rax"));
    assert!(asm.contains("movq %rax, %rcx"));
    assert!(asm.contains("popq %rax"));
    assert!(asm.contains("addq %rcx, %rax"));
}

#[test]
fn test_division_uses_cqto() {
    let asm = compile("int main(void) { return 7 / 2; }");
    assert!(asm.contains("cqto"));
    assert!(asm.contains("idiv %rcx"));
    let rem = compile("int main(void) { return 7 % 2; }");
    assert!(rem.contains("mov %rdx, %rax"));
}

#[test]
fn test_local_gets_frame_slot() {
    let asm = compile("int main(void) { int x = 5; return x; }");
    assert!(asm.contains("sub $8, %rsp"));
    assert!(asm.contains("leaq -8(%rbp), %rax"));
    // int-sized store and signed load
    assert!(asm.contains("movl %eax, (%rcx)"));
    assert!(asm.contains("movslq (%rax), %rax"));
}

#[test]
fn test_for_loop_decl_gets_slot() {
    // the loop variable lives in the for-init, not a top level decl
    let asm = compile(
        "int main(void) { int s = 0; for (int i = 0; i < 10; i = i + 1) s = s + i; return s; }",
    );
    assert!(asm.contains("sub $16, %rsp"));
    assert!(asm.contains("jz .L"));
    assert!(asm.contains("jmp .L"));
}

#[test]
fn test_param_registers_land_in_slots() {
    let asm = compile("int add(int a, int b) { return a + b; }");
    assert!(asm.contains("movq %rdi, -8(%rbp)"));
    assert!(asm.contains("movq %rsi, -16(%rbp)"));
}

#[test]
fn test_call_is_indirect_through_rax() {
    let asm = compile("int add(int a, int b) { return a + b; } int main(void) { return add(1, 2); }");
    assert!(asm.contains("pop %rdi"));
    assert!(asm.contains("pop %rsi"));
    assert!(asm.contains("leaq add(%rip), %rax"));
    assert!(asm.contains("call *%rax"));
}

#[test]
fn test_stack_args_beyond_six() {
    let asm = compile(
        "int f(int a, int b, int c, int d, int e, int g, int h) { return h; }\n\
         int main(void) { return f(1, 2, 3, 4, 5, 6, 7); }",
    );
    // the seventh parameter is read from above the saved frame pointer
    assert!(asm.contains("leaq 16(%rbp), %rax"));
    // and the call cleans it off the stack
    assert!(asm.contains("add $8, %rsp"));
}

#[test]
fn test_uninitialized_global_is_lcomm() {
    let asm = compile("int a[3];");
    assert!(asm.contains(".lcomm a, 12"));
    assert!(asm.contains(".global a"));
}

#[test]
fn test_static_global_is_not_exported() {
    let asm = compile("static int a; int *p = &a;");
    assert!(!asm.contains(".global a"));
    assert!(asm.contains(".global p"));
    // the pointer initializer is the label of a
    assert!(asm.contains("p:\n.quad a"));
}

#[test]
fn test_global_int_init_directives() {
    let asm = compile("int g = 10; char c = 7; short s = 5; long l = 9;");
    assert!(asm.contains("g:\n.long 10"));
    assert!(asm.contains("c:\n.byte 7"));
    assert!(asm.contains("s:\n.short 5"));
    assert!(asm.contains("l:\n.quad 9"));
}

#[test]
fn test_string_literal_in_data() {
    let asm = compile("int main(void) { char *s = \"hi\"; return 0; }");
    assert!(asm.contains(".string \"hi\""));
}

#[test]
fn test_global_string_ptr_init() {
    let asm = compile("char *greeting = \"hello\";");
    assert!(asm.contains(".string \"hello\""));
    assert!(asm.contains("greeting:\n.quad .L"));
}

#[test]
fn test_global_load_through_rip() {
    let asm = compile("int g = 10; int main(void) { return g; }");
    assert!(asm.contains("leaq g(%rip), %rax"));
    assert!(asm.contains("movslq (%rax), %rax"));
}

#[test]
fn test_index_scales_by_element_size() {
    let asm = compile("int a[3]; int main(void) { a[2] = 1; return a[2]; }");
    assert!(asm.contains("imul $4, %rax"));
    let asm = compile("long a[3]; int main(void) { return a[2]; }");
    assert!(asm.contains("imul $8, %rax"));
    let asm = compile("char a[3]; int main(void) { return a[2]; }");
    assert!(!asm.contains("imul $1, %rax"));
}

#[test]
fn test_if_with_else_jumps_over_else() {
    let asm = compile("int main(void) { int x = 5; if (x > 3) x = 7; else x = 9; return x; }");
    assert!(asm.contains("test %rax, %rax"));
    assert!(asm.contains("jz .L"));
    // the then branch must not fall into the else branch
    assert!(asm.contains("jmp .L"));
}

#[test]
fn test_switch_compares_each_case() {
    let asm = compile(
        "int main(void) { switch (2) { case 1: return 1; case 2: return 2; } return 0; }",
    );
    assert!(asm.contains("mov $1, %rcx"));
    assert!(asm.contains("mov $2, %rcx"));
    assert!(asm.contains("cmp %rax, %rcx"));
    assert!(asm.contains("je .L"));
}

#[test]
fn test_logical_not_is_setz() {
    let asm = compile("int main(void) { int x = 0; return !x; }");
    assert!(asm.contains("setz %al"));
    assert!(asm.contains("movzbq %al, %rax"));
}

#[test]
fn test_comparison_materializes_zero_or_one() {
    let asm = compile("int main(void) { return 2 < 3; }");
    assert!(asm.contains("cmp %rcx, %rax"));
    assert!(asm.contains("jl .LL"));
    assert!(asm.contains("movq $0, %rax"));
    assert!(asm.contains("movq $1, %rax"));
}

#[test]
fn test_widening_cast_sign_extends() {
    let asm = compile("int main(void) { char c = 1; return (long)c; }");
    assert!(asm.contains("movsbq %al, %rax"));
}

#[test]
fn test_deref_loads_by_pointee_size() {
    let asm = compile("char buf[4]; int main(void) { char *p = buf; return *p; }");
    assert!(asm.contains("movsbq (%rax), %rax"));
}

#[test]
fn test_struct_field_offsets() {
    let asm = compile(
        "struct point { int x; int y; } p;\n\
         int main(void) { p.y = 3; return p.y; }",
    );
    // y sits four bytes in
    assert!(asm.contains("addq $4, %rax") || asm.contains("add $4, %rax"));
    assert!(asm.contains(".lcomm p, 8"));
}

#[test]
fn test_arrow_goes_through_pointer() {
    let asm = compile(
        "struct point { int x; int y; } p;\n\
         int main(void) { struct point *q = &p; return q->y; }",
    );
    assert!(asm.contains("add $4, %rax"));
}

#[test]
fn test_postfix_increment_returns_old_value() {
    let asm = compile("int main(void) { int x = 1; return x++; }");
    assert!(asm.contains("mov %rax, %rdx"));
    assert!(asm.contains("add $1, %rax"));
    assert!(asm.contains("mov %rdx, %rax"));
}

#[test]
fn test_pointer_increment_steps_by_pointee_size() {
    let asm = compile("int a[3]; int main(void) { int *p = a; p++; return 0; }");
    assert!(asm.contains("add $4, %rax"));
}

#[test]
fn test_goto_emits_jmp_to_label() {
    let asm = compile("int main(void) { goto out; out: return 1; }");
    assert!(asm.contains("jmp .L1"));
    assert!(asm.contains(".L1:"));
}
