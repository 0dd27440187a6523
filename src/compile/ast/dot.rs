use std::fmt::Write;

use crate::compile::ast::{
    Declarator, Expr, ExprKind, FunctionDecl, Item, Program, Stmt, StmtKind, Type, VarDecl,
};

type NodeId = usize;

/// Renders the syntax tree as a Graphviz digraph. Resolved types are shown
/// next to the node kind once the checker has run.
pub fn export(program: &Program) -> Result<String, std::fmt::Error> {
    let mut exporter = DotExporter {
        dot: String::from("digraph G {\n"),
        next_id: 0,
    };

    let root = exporter.node("Program", None)?;
    for item in program.items.iter() {
        let child = match item {
            Item::Global(decl) => exporter.var_decl(decl, None)?,
            Item::Function(func) => exporter.function(func)?,
        };
        exporter.edge(root, child)?;
    }

    writeln!(&mut exporter.dot, "}}")?;
    Ok(exporter.dot)
}

struct DotExporter {
    dot: String,
    next_id: NodeId,
}

impl DotExporter {
    fn node(&mut self, label: &str, ty: Option<Type>) -> Result<NodeId, std::fmt::Error> {
        let id = self.next_id;
        self.next_id += 1;

        let label = label.replace('"', "\\\"");
        match ty {
            Some(ty) => writeln!(&mut self.dot, "{id} [label=\"{label} : {ty}\"]")?,
            None => writeln!(&mut self.dot, "{id} [label=\"{label}\"]")?,
        }

        Ok(id)
    }

    fn edge(&mut self, from: NodeId, to: NodeId) -> std::fmt::Result {
        writeln!(&mut self.dot, "{from} -> {to}")
    }

    fn function(&mut self, func: &FunctionDecl) -> Result<NodeId, std::fmt::Error> {
        let params = func
            .params
            .iter()
            .map(|param| format!("{} {}", param.ty, param.name))
            .collect::<Vec<_>>()
            .join(", ");

        let kind = if func.body.is_some() { "FunctionDef" } else { "FunctionDecl" };
        let id = self.node(
            &format!("{kind} {} {}({params})", func.ret, func.name),
            None,
        )?;

        for stmt in func.body.iter().flatten() {
            let child = self.stmt(stmt)?;
            self.edge(id, child)?;
        }

        Ok(id)
    }

    fn var_decl(&mut self, decl: &VarDecl, ty: Option<Type>) -> Result<NodeId, std::fmt::Error> {
        let id = self.node(&format!("VarDecl {}", decl.ty), ty)?;

        for Declarator { name, init, .. } in decl.declarators.iter() {
            let child = self.node(name, None)?;
            self.edge(id, child)?;

            if let Some(init) = init {
                let value = self.expr(init)?;
                self.edge(child, value)?;
            }
        }

        Ok(id)
    }

    fn stmt(&mut self, stmt: &Stmt) -> Result<NodeId, std::fmt::Error> {
        let (label, children): (&str, Vec<Child>) = match &stmt.kind {
            StmtKind::Decl(decl) => return self.var_decl(decl, stmt.ty),
            StmtKind::Block(stmts) => ("Block", stmts.iter().map(Child::Stmt).collect()),
            StmtKind::Expr(expr) => ("ExprStmt", vec![Child::Expr(expr)]),
            StmtKind::Empty => ("Empty", vec![]),
            StmtKind::If(cond, then, otherwise) => {
                let mut children = vec![Child::Expr(cond), Child::Stmt(then)];
                children.extend(otherwise.as_deref().map(Child::Stmt));
                ("If", children)
            }
            StmtKind::While(cond, body) => ("While", vec![Child::Expr(cond), Child::Stmt(body)]),
            StmtKind::DoWhile(body, cond) => {
                ("DoWhile", vec![Child::Stmt(body), Child::Expr(cond)])
            }
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => {
                let mut children = Vec::new();
                children.extend(init.as_deref().map(Child::Stmt));
                children.extend(cond.iter().map(Child::Expr));
                children.extend(step.iter().map(Child::Expr));
                children.push(Child::Stmt(body));
                ("For", children)
            }
            StmtKind::Return(value) => ("Return", value.iter().map(Child::Expr).collect()),
            StmtKind::Break => ("Break", vec![]),
            StmtKind::Continue => ("Continue", vec![]),
        };

        let id = self.node(label, stmt.ty)?;
        self.children(id, children)?;

        Ok(id)
    }

    fn expr(&mut self, expr: &Expr) -> Result<NodeId, std::fmt::Error> {
        let (label, children): (String, Vec<Child>) = match &expr.kind {
            ExprKind::Int(literal) => (literal.to_string(), vec![]),
            ExprKind::Float(value) => (value.to_string(), vec![]),
            ExprKind::Ident(name) => (name.clone(), vec![]),
            ExprKind::Call(name, args) => {
                (format!("Call {name}"), args.iter().map(Child::Expr).collect())
            }
            ExprKind::Unary(op, operand) => (op.to_string(), vec![Child::Expr(operand)]),
            ExprKind::Binary(op, lhs, rhs) => {
                (op.to_string(), vec![Child::Expr(lhs), Child::Expr(rhs)])
            }
            ExprKind::Assign(name, op, value) => {
                (format!("{name} {op}"), vec![Child::Expr(value)])
            }
            ExprKind::Step { name, op, prefix } => {
                let label = if *prefix {
                    format!("{op}{name}")
                } else {
                    format!("{name}{op}")
                };
                (label, vec![])
            }
        };

        let id = self.node(&label, expr.ty)?;
        self.children(id, children)?;

        Ok(id)
    }

    fn children(&mut self, id: NodeId, children: Vec<Child>) -> std::fmt::Result {
        for child in children {
            let child = match child {
                Child::Stmt(stmt) => self.stmt(stmt)?,
                Child::Expr(expr) => self.expr(expr)?,
            };
            self.edge(id, child)?;
        }

        Ok(())
    }
}

enum Child<'a> {
    Stmt(&'a Stmt),
    Expr(&'a Expr),
}
