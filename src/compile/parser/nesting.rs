use crate::{
    compile::ast::{Expr, ExprKind, Item, Program, SourcePos, Stmt, StmtKind, VarDecl},
    infra::Diagnostic,
};

use super::{Spanned, lex::Token};

/// Deepest nesting accepted for brackets, prefix operators and tree nodes.
pub const MAX_NESTING: usize = 256;

fn too_deep(span: &SourcePos) -> Diagnostic {
    Diagnostic::new(
        format!("nesting exceeds {MAX_NESTING} levels"),
        span.clone(),
    )
}

/// Bounds bracket depth and runs of prefix operators before the recursive
/// parser descends into them.
pub fn check_tokens(tokens: &[Spanned<Token<'_>>]) -> Result<(), Diagnostic> {
    let mut brackets = 0usize;
    let mut prefix = 0usize;

    for (token, span) in tokens {
        match token {
            Token::L_ROUND | Token::L_CURLY => {
                brackets += 1;
                prefix = 0;
            }
            Token::R_ROUND | Token::R_CURLY => {
                brackets = brackets.saturating_sub(1);
                prefix = 0;
            }
            Token::BANG | Token::TILDE | Token::MINUS => prefix += 1,
            _ => prefix = 0,
        }

        if brackets + prefix > MAX_NESTING {
            return Err(too_deep(span));
        }
    }

    Ok(())
}

/// Bounds the depth of the parsed tree, which every later pass walks
/// recursively.
pub fn check_program(program: &Program) -> Result<(), Diagnostic> {
    let root = Depth(0);

    for item in program.items.iter() {
        match item {
            Item::Global(decl) => root.decl(decl)?,
            Item::Function(func) => {
                for stmt in func.body.iter().flatten() {
                    root.stmt(stmt)?;
                }
            }
        }
    }

    Ok(())
}

#[derive(Clone, Copy)]
struct Depth(usize);

impl Depth {
    fn descend(self, span: &SourcePos) -> Result<Depth, Diagnostic> {
        if self.0 >= MAX_NESTING {
            return Err(too_deep(span));
        }

        Ok(Depth(self.0 + 1))
    }

    fn decl(self, decl: &VarDecl) -> Result<(), Diagnostic> {
        decl.declarators
            .iter()
            .filter_map(|declarator| declarator.init.as_ref())
            .try_for_each(|init| self.expr(init))
    }

    fn stmt(self, stmt: &Stmt) -> Result<(), Diagnostic> {
        let depth = self.descend(&stmt.span)?;

        match &stmt.kind {
            StmtKind::Block(stmts) => stmts.iter().try_for_each(|stmt| depth.stmt(stmt)),
            StmtKind::Decl(decl) => depth.decl(decl),
            StmtKind::Expr(expr) => depth.expr(expr),
            StmtKind::Empty | StmtKind::Break | StmtKind::Continue => Ok(()),
            StmtKind::If(cond, then, otherwise) => {
                depth.expr(cond)?;
                depth.stmt(then)?;
                otherwise
                    .as_deref()
                    .map_or(Ok(()), |otherwise| depth.stmt(otherwise))
            }
            StmtKind::While(cond, body) => {
                depth.expr(cond)?;
                depth.stmt(body)
            }
            StmtKind::DoWhile(body, cond) => {
                depth.stmt(body)?;
                depth.expr(cond)
            }
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => {
                if let Some(init) = init.as_deref() {
                    depth.stmt(init)?;
                }
                for expr in cond.iter().chain(step.iter()) {
                    depth.expr(expr)?;
                }
                depth.stmt(body)
            }
            StmtKind::Return(value) => value.as_ref().map_or(Ok(()), |value| depth.expr(value)),
        }
    }

    fn expr(self, expr: &Expr) -> Result<(), Diagnostic> {
        let depth = self.descend(&expr.span)?;

        match &expr.kind {
            ExprKind::Int(_) | ExprKind::Float(_) | ExprKind::Ident(_) | ExprKind::Step { .. } => {
                Ok(())
            }
            ExprKind::Call(_, args) => args.iter().try_for_each(|arg| depth.expr(arg)),
            ExprKind::Unary(_, operand) | ExprKind::Assign(_, _, operand) => depth.expr(operand),
            ExprKind::Binary(_, lhs, rhs) => {
                depth.expr(lhs)?;
                depth.expr(rhs)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chumsky::Parser;

    use super::*;
    use crate::compile::parser::{lex::lexer, parse_program};
    use crate::infra::CflatError;

    fn lex(src: &str) -> Vec<Spanned<Token<'_>>> {
        lexer().parse(src).into_result().unwrap()
    }

    #[test]
    fn shallow_programs_pass() {
        let src = "int main() { return -(1 + (2 * 3)); }";
        assert!(check_tokens(&lex(src)).is_ok());

        let program = parse_program(src).unwrap();
        assert!(check_program(&program).is_ok());
    }

    #[test]
    fn brackets_past_the_limit_are_rejected() {
        let src = format!("{}1{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert!(check_tokens(&lex(&src)).is_ok());

        let src = format!("{}1{}", "(".repeat(MAX_NESTING + 1), ")".repeat(MAX_NESTING + 1));
        let err = check_tokens(&lex(&src)).unwrap_err();
        assert_eq!(err.span, MAX_NESTING..MAX_NESTING + 1);
    }

    #[test]
    fn prefix_runs_count_towards_the_limit() {
        let src = format!("{}x", "!".repeat(MAX_NESTING + 1));
        assert!(check_tokens(&lex(&src)).is_err());

        let src = "x - -y; !a; !b; ~c;".repeat(MAX_NESTING);
        assert!(check_tokens(&lex(&src)).is_ok());
    }

    #[test]
    fn long_binary_chains_hit_the_tree_limit() {
        let chain = vec!["1"; MAX_NESTING + 1].join(" + ");
        let src = format!("int x = {chain};");
        assert!(check_tokens(&lex(&src)).is_ok());

        let err = parse_program(&src).unwrap_err();
        assert!(matches!(err, CflatError::ParsingError(ref diagnostics) if diagnostics.len() == 1));
    }
}
