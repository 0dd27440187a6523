use cflat::compile::compile_source;

fn emit(src: &str) -> String {
    compile_source(src).expect("compilation failed")
}

#[test]
fn if_else_with_returns_in_both_arms() {
    let ir = emit("int f(int a) { if (a) return 1; else return 2; }");

    assert!(ir.contains(
        "define i32 @f(i32 %a.arg) {\n\
         entry:\n\
         \x20 %a.addr = alloca i32, align 4\n\
         \x20 store i32 %a.arg, i32* %a.addr\n\
         \x20 %0 = load i32, i32* %a.addr\n\
         \x20 %1 = icmp ne i32 %0, 0\n\
         \x20 br i1 %1, label %if_then_0, label %if_else_0\n\
         if_then_0:\n\
         \x20 ret i32 1\n\
         if_else_0:\n\
         \x20 ret i32 2\n\
         if_end_0:\n\
         \x20 unreachable\n\
         }\n"
    ));
}

#[test]
fn if_without_else_falls_through_to_the_end() {
    let ir = emit("int f(int a) { int r = 0; if (a > 1) r = 1; return r; }");

    assert!(ir.contains("  br i1 %3, label %if_then_0, label %if_end_0\n"));
    assert!(ir.contains(
        "if_then_0:\n  store i32 1, i32* %r.addr.0\n  br label %if_end_0\nif_end_0:\n"
    ));
}

#[test]
fn while_loop_with_break_and_continue() {
    let ir = emit(
        "int f() { int i = 0; while (i < 10) { i++; if (i == 5) continue; if (i == 8) break; } return i; }",
    );

    assert!(ir.contains("  store i32 0, i32* %i.addr.0\n  br label %while_cond_0\nwhile_cond_0:\n"));
    assert!(ir.contains(", label %while_body_0, label %while_end_0\nwhile_body_0:\n"));
    assert!(ir.contains("if_then_1:\n  br label %while_cond_0\nif_end_1:\n"));
    assert!(ir.contains("if_then_2:\n  br label %while_end_0\nif_end_2:\n"));
    assert!(ir.contains("  br label %while_cond_0\nwhile_end_0:\n"));
}

#[test]
fn continue_in_for_runs_the_step() {
    let ir = emit(
        "int f() { int s = 0; for (int i = 0; i < 3; i++) { if (i == 1) continue; s += i; } return s; }",
    );

    assert!(ir.contains("if_then_1:\n  br label %for_inc_0\nif_end_1:\n"));
    assert!(ir.contains("  br label %for_inc_0\nfor_inc_0:\n"));
    assert!(ir.contains("  br label %for_cond_0\nfor_end_0:\n"));
}

#[test]
fn continue_without_step_goes_back_to_the_condition() {
    let ir = emit("void f() { for (;;) { continue; } }");

    assert!(ir.contains(
        "entry:\n\
         \x20 br label %for_cond_0\n\
         for_cond_0:\n\
         \x20 br label %for_body_0\n\
         for_body_0:\n\
         \x20 br label %for_cond_0\n\
         for_end_0:\n\
         \x20 ret void\n\
         }\n"
    ));
}

#[test]
fn break_leaves_only_the_innermost_loop() {
    let ir = emit("void f() { while (1) { while (1) { break; } break; } }");

    assert!(ir.contains(
        "while_cond_1:\n\
         \x20 %1 = icmp ne i32 1, 0\n\
         \x20 br i1 %1, label %while_body_1, label %while_end_1\n\
         while_body_1:\n\
         \x20 br label %while_end_1\n\
         while_end_1:\n\
         \x20 br label %while_end_0\n\
         while_end_0:\n\
         \x20 ret void\n"
    ));
}

#[test]
fn continue_targets_follow_the_loop_kind() {
    let ir = emit(
        "void f(int n) { while (n) { for (;n;) { n--; continue; } do { n--; continue; } while (n); continue; } }",
    );

    assert!(ir.contains("for_body_1:\n"));
    assert!(ir.contains("  br label %for_cond_1\n"));
    assert!(ir.contains("  br label %do_while_cond_2\ndo_while_cond_2:\n"));
    assert!(ir.contains("do_while_end_2:\n  br label %while_cond_0\n"));
}

#[test]
fn do_while_tests_after_the_body() {
    let ir = emit("int f(int n) { do { n--; } while (n > 0); return n; }");

    assert!(ir.contains("  br label %do_while_body_0\ndo_while_body_0:\n"));
    assert!(ir.contains("  br label %do_while_cond_0\ndo_while_cond_0:\n"));
    assert!(ir.contains(", label %do_while_body_0, label %do_while_end_0\ndo_while_end_0:\n"));
}

#[test]
fn code_after_a_terminator_opens_a_fresh_block() {
    let ir = emit("int f() { return 1; return 2; }");

    assert!(ir.contains("  ret i32 1\nunreachable_0:\n  ret i32 2\n}\n"));
}

#[test]
fn label_ids_are_unique_across_functions() {
    let ir = emit("void a() { while (1) {} } void b() { while (1) {} }");

    assert!(ir.contains("while_cond_0:"));
    assert!(ir.contains("while_cond_1:"));
    assert!(!ir.contains("while_cond_2:"));
}

#[test]
fn every_block_ends_in_a_terminator() {
    let ir = emit(
        "int f(int n) { int s = 0; while (n) { if (n % 2) { s += n; } else { s -= 1; } n--; } \
         for (int i = 0; i < 2; ++i) ; return s; }",
    );

    let body: Vec<&str> = ir
        .lines()
        .skip_while(|line| !line.starts_with("define i32 @f("))
        .skip(1)
        .take_while(|line| *line != "}")
        .collect();

    for (i, line) in body.iter().enumerate() {
        if !line.starts_with(' ') && i > 0 {
            let previous = body[i - 1].trim_start();
            assert!(
                previous.starts_with("br ") || previous.starts_with("ret ") || previous == "unreachable",
                "block `{line}` is entered by fall-through after `{previous}`"
            );
        }
    }
}
