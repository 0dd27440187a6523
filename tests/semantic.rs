use cflat::compile::ast::{ExprKind, Item, Program, StmtKind, Type};
use cflat::compile::parser::parse_program;
use cflat::compile::semantic::{self, SemanticError, symbol_table::SymbolTable};

fn check(src: &str) -> Result<Program, SemanticError> {
    let mut program = parse_program(src).expect("parse failed");
    let mut symbols = SymbolTable::new();
    semantic::analyze(&mut program, &mut symbols)?;

    Ok(program)
}

#[test]
fn int_initializer_for_float_is_accepted() {
    check("int main() { float y = 1; return 0; }").unwrap();
}

#[test]
fn void_call_cannot_initialize_or_assign() {
    let err = check("void g() {} int main() { int z = g(); return z; }").unwrap_err();
    assert!(matches!(
        err,
        SemanticError::MismatchedTypes {
            expected: Type::Int,
            got: Type::Void,
            ..
        }
    ));

    let err = check("void g() {} int main() { int z; z = g(); return z; }").unwrap_err();
    assert!(matches!(err, SemanticError::InvalidOperands { .. }));
}

#[test]
fn break_and_continue_need_an_enclosing_loop() {
    let err = check("int main() { break; return 0; }").unwrap_err();
    assert!(matches!(err, SemanticError::InvalidBreak(_)));

    let err = check("int main() { continue; return 0; }").unwrap_err();
    assert!(matches!(err, SemanticError::InvalidContinue(_)));

    let err = check("int main() { while (1) {} break; return 0; }").unwrap_err();
    assert!(matches!(err, SemanticError::InvalidBreak(_)));

    check("int main() { while (1) { if (1) break; else continue; } return 0; }").unwrap();
}

#[test]
fn call_arguments_convert_between_numeric_types() {
    check("int f(int a, float b) { return a; } int main() { return f(1, 2.0); }").unwrap();
    check("int f(int a, float b) { return a; } int main() { return f(1.5, 2); }").unwrap();
}

#[test]
fn call_arity_must_match() {
    let err = check("int f(int a, float b) { return a; } int main() { return f(1); }").unwrap_err();
    assert!(matches!(
        err,
        SemanticError::ArityMismatch {
            expected: 2,
            got: 1,
            ..
        }
    ));
}

#[test]
fn calls_need_a_prior_declaration() {
    let err = check("int main() { return f(); } int f() { return 1; }").unwrap_err();
    assert!(matches!(err, SemanticError::Undeclared { ref name, .. } if name == "f"));

    check("int f(); int main() { return f(); } int f() { return 1; }").unwrap();
}

#[test]
fn block_declarations_die_with_the_block() {
    let err = check("int main() { { int a = 1; } return a; }").unwrap_err();
    assert!(matches!(err, SemanticError::Undeclared { ref name, .. } if name == "a"));

    check("int main() { { int a = 1; } { int a = 2; } return 0; }").unwrap();
}

#[test]
fn nested_blocks_see_enclosing_declarations() {
    check("int main() { int a = 1; { int b = a; { b = a + b; } } return a; }").unwrap();
}

#[test]
fn open_blocks_share_one_namespace() {
    let err = check("int main() { int a; { int a; } return 0; }").unwrap_err();
    assert!(matches!(err, SemanticError::Redeclared { ref name, .. } if name == "a"));

    let err = check("int f(int a) { int a; return a; }").unwrap_err();
    assert!(matches!(err, SemanticError::Redeclared { .. }));
}

#[test]
fn locals_may_shadow_globals() {
    let program = check("float x; int main() { int x = 2; return x; }").unwrap();

    let Item::Function(main) = &program.items[1] else {
        panic!("expected a function");
    };
    let StmtKind::Return(Some(value)) = &main.body.as_ref().unwrap()[1].kind else {
        panic!("expected a return");
    };
    assert_eq!(value.ty, Some(Type::Int));
}

#[test]
fn other_functions_locals_are_invisible() {
    check("int f() { int x = 1; return x; } int g() { int x = 2; return x; }").unwrap();

    let err = check("int f() { int x = 1; return x; } int g() { return x; }").unwrap_err();
    assert!(matches!(err, SemanticError::Undeclared { .. }));
}

#[test]
fn for_init_declarations_are_scoped_to_the_loop() {
    let err = check("int main() { for (int i = 0; i < 3; i++) {} return i; }").unwrap_err();
    assert!(matches!(err, SemanticError::Undeclared { ref name, .. } if name == "i"));

    check("int main() { for (int i = 0; i < 3; i++) {} for (int i = 3; i; i--) {} return 0; }")
        .unwrap();
}

#[test]
fn function_redeclarations() {
    check("int f(int a); int f(int a); int f(int a) { return a; }").unwrap();
    check("int f(int a) { return a; } int f(int a);").unwrap();

    let err = check("int f(int a); float f(int a) { return 1.0; }").unwrap_err();
    assert!(matches!(err, SemanticError::ConflictingDeclaration { .. }));

    let err = check("int f(int a); int f(float a) { return 1; }").unwrap_err();
    assert!(matches!(err, SemanticError::ConflictingDeclaration { .. }));

    let err = check("int f() { return 1; } int f() { return 2; }").unwrap_err();
    assert!(matches!(err, SemanticError::Redefined { .. }));

    let err = check("int f; int f() { return 1; }").unwrap_err();
    assert!(matches!(err, SemanticError::Redeclared { .. }));
}

#[test]
fn return_rules() {
    let err = check("int f() { }").unwrap_err();
    assert!(matches!(err, SemanticError::MissingReturn { .. }));

    let err = check("int f() { return; }").unwrap_err();
    assert!(matches!(err, SemanticError::MissingReturnValue { .. }));

    let err = check("void f() { return 1; }").unwrap_err();
    assert!(matches!(err, SemanticError::UnexpectedReturnValue { .. }));

    check("void g() {} void f() { return g(); }").unwrap();
    check("void f() { }").unwrap();
    check("float f() { return 1; }").unwrap();
}

#[test]
fn names_must_be_used_as_declared() {
    let err = check("int x; int main() { return x(); }").unwrap_err();
    assert!(matches!(err, SemanticError::NotAFunction { .. }));

    let err = check("int f() { return 1; } int main() { return f; }").unwrap_err();
    assert!(matches!(err, SemanticError::NotAVariable { .. }));
}

#[test]
fn void_is_not_a_value_type() {
    let err = check("void x;").unwrap_err();
    assert!(matches!(err, SemanticError::VoidVariable { .. }));

    let err = check("int f(void a) { return 1; }").unwrap_err();
    assert!(matches!(err, SemanticError::VoidVariable { .. }));

    let err = check("void g() {} int main() { if (g()) return 1; return 0; }").unwrap_err();
    assert!(matches!(err, SemanticError::VoidCondition(_)));
}

#[test]
fn duplicate_parameters_are_rejected() {
    let err = check("int f(int a, float a) { return 1; }").unwrap_err();
    assert!(matches!(err, SemanticError::Redeclared { .. }));
}

#[test]
fn operator_operand_rules() {
    let err = check("float x = 1.0 % 2;").unwrap_err();
    assert!(matches!(err, SemanticError::InvalidOperands { .. }));

    let err = check("int main() { float f = 1.0; f %= 2; return 0; }").unwrap_err();
    assert!(matches!(err, SemanticError::InvalidOperands { .. }));

    let err = check("int main() { float f = 1.0; return ~f; }").unwrap_err();
    assert!(matches!(err, SemanticError::InvalidOperand { .. }));

    check("int main() { int i = 1; i %= 2; i += 2.5; return i << 2 | 1; }").unwrap();
}

#[test]
fn int_literals_must_fit() {
    check("int x = 2147483647; int y = 0x7fffffff;").unwrap();

    let err = check("int x = 2147483648;").unwrap_err();
    assert!(matches!(err, SemanticError::IntLiteralOutOfBounds { .. }));

    let err = check("int x = 0x80000000;").unwrap_err();
    assert!(matches!(err, SemanticError::IntLiteralOutOfBounds { .. }));
}

#[test]
fn float_literals_must_be_finite() {
    let huge = format!("float f() {{ return 1{}.0; }}", "0".repeat(400));
    let err = check(&huge).unwrap_err();
    assert!(matches!(err, SemanticError::FloatLiteralOutOfBounds(_)));

    let long = format!("float f() {{ return 1{}.0; }}", "0".repeat(300));
    check(&long).unwrap();
}

#[test]
fn calls_resolve_against_global_functions() {
    check("int f() { return 1; } int main() { int f = 2; return f() + f; }").unwrap();

    let err = check("int main() { int g = 2; return g(); }").unwrap_err();
    assert!(matches!(err, SemanticError::Undeclared { ref name, .. } if name == "g"));
}

#[test]
fn every_node_is_annotated() {
    let program = check("float f(int a) { return a + 1.5; }").unwrap();

    let Item::Function(f) = &program.items[0] else {
        panic!("expected a function");
    };
    let stmt = &f.body.as_ref().unwrap()[0];
    assert_eq!(stmt.ty, Some(Type::Float));

    let StmtKind::Return(Some(value)) = &stmt.kind else {
        panic!("expected a return");
    };
    assert_eq!(value.ty, Some(Type::Float));

    let ExprKind::Binary(_, lhs, rhs) = &value.kind else {
        panic!("expected a binary expression");
    };
    assert_eq!(lhs.ty, Some(Type::Int));
    assert_eq!(rhs.ty, Some(Type::Float));
}

#[test]
fn comparisons_and_logic_are_int_valued() {
    let program = check("int f(float a, float b) { return a < b && !a; }").unwrap();

    let Item::Function(f) = &program.items[0] else {
        panic!("expected a function");
    };
    let StmtKind::Return(Some(value)) = &f.body.as_ref().unwrap()[0].kind else {
        panic!("expected a return");
    };
    assert_eq!(value.ty, Some(Type::Int));
}

#[test]
fn reanalysis_yields_the_same_annotations() {
    let src = "int g = 3; float h(float x) { return x * g; } \
               int main() { int i; for (i = 0; i < g; i++) { h(i); } return i; }";
    let first = check(src).unwrap();

    let mut second = first.clone();
    let mut symbols = SymbolTable::new();
    semantic::analyze(&mut second, &mut symbols).unwrap();

    assert_eq!(first, second);
}

#[test]
fn globals_end_up_in_the_global_frame() {
    let mut program = parse_program("int g; int f(int a) { int local = a; return local; }")
        .expect("parse failed");
    let mut symbols = SymbolTable::new();
    semantic::analyze(&mut program, &mut symbols).unwrap();

    assert_eq!(symbols.depth(), 1);
    assert!(symbols.lookup_global("g").is_some());
    assert!(symbols.lookup_global("f").is_some());
    assert!(symbols.lookup("local").is_none());
    assert!(symbols.lookup("a").is_none());
}
