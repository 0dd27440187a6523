use chumsky::input::ValueInput;
use chumsky::prelude::*;

use crate::compile::ast::int_literal::IntLiteral;
use crate::compile::ast::{
    AssignOp, BinaryOp, Declarator, Expr, ExprKind, FunctionDecl, Item, Param, Program,
    SourcePos, StepOp, Stmt, StmtKind, Type, UnaryOp, VarDecl,
};
use crate::compile::parser::lex::Token;

type ErrorParserExtra<'src> = extra::Err<Rich<'src, Token<'src>, SourcePos>>;

fn ident<'src, I>() -> impl Parser<'src, I, String, ErrorParserExtra<'src>> + Clone
where
    I: ValueInput<'src, Token = Token<'src>, Span = SourcePos>,
{
    select! {Token::IDENT(ident) => ident.to_string()}.labelled("identifier")
}

fn type_parser<'src, I>() -> impl Parser<'src, I, Type, ErrorParserExtra<'src>> + Clone
where
    I: ValueInput<'src, Token = Token<'src>, Span = SourcePos>,
{
    choice((
        just(Token::INT).to(Type::Int),
        just(Token::FLOAT).to(Type::Float),
        just(Token::VOID).to(Type::Void),
    ))
    .labelled("type")
}

/// One left-associative precedence level.
fn binary_level<'src, I, P, O>(
    operand: P,
    op: O,
) -> impl Parser<'src, I, Expr, ErrorParserExtra<'src>> + Clone
where
    I: ValueInput<'src, Token = Token<'src>, Span = SourcePos>,
    P: Parser<'src, I, Expr, ErrorParserExtra<'src>> + Clone,
    O: Parser<'src, I, BinaryOp, ErrorParserExtra<'src>> + Clone,
{
    operand
        .clone()
        .foldl(op.then(operand).repeated(), |lhs: Expr, (op, rhs)| {
            let span = lhs.span.start..rhs.span.end;
            Expr::new(ExprKind::Binary(op, lhs.boxed(), rhs.boxed()), span)
        })
}

pub fn expr_parser<'src, I>() -> impl Parser<'src, I, Expr, ErrorParserExtra<'src>> + Clone
where
    I: ValueInput<'src, Token = Token<'src>, Span = SourcePos>,
{
    recursive(|expr| {
        let int = select! {Token::NUM {value, base} => IntLiteral::new(value.to_string(), base)}
            .map_with(|literal, ctx| Expr::new(ExprKind::Int(literal), ctx.span()));

        let float = select! {Token::DECIMAL(value) => value}
            .try_map(|value: &str, span: SourcePos| {
                value
                    .parse::<f64>()
                    .map_err(|_| Rich::custom(span, "invalid float literal"))
            })
            .map_with(|value, ctx| Expr::new(ExprKind::Float(value), ctx.span()));

        let args = expr
            .clone()
            .separated_by(just(Token::COMMA))
            .collect::<Vec<_>>()
            .delimited_by(just(Token::L_ROUND), just(Token::R_ROUND));

        let call = ident()
            .then(args)
            .map_with(|(name, args), ctx| Expr::new(ExprKind::Call(name, args), ctx.span()));

        let step_op = choice((
            just(Token::INCREMENT).to(StepOp::Inc),
            just(Token::DECREMENT).to(StepOp::Dec),
        ));

        let postfix_step = ident().then(step_op.clone()).map_with(|(name, op), ctx| {
            Expr::new(
                ExprKind::Step {
                    name,
                    op,
                    prefix: false,
                },
                ctx.span(),
            )
        });

        let prefix_step = step_op.then(ident()).map_with(|(op, name), ctx| {
            Expr::new(
                ExprKind::Step {
                    name,
                    op,
                    prefix: true,
                },
                ctx.span(),
            )
        });

        let variable = ident().map_with(|name, ctx| Expr::new(ExprKind::Ident(name), ctx.span()));

        let atom = choice((
            int,
            float,
            call,
            postfix_step,
            prefix_step,
            variable,
            expr.clone()
                .delimited_by(just(Token::L_ROUND), just(Token::R_ROUND)),
        ))
        .boxed();

        let unary_op = choice((
            just(Token::MINUS).to(UnaryOp::Neg),
            just(Token::BANG).to(UnaryOp::LogicalNot),
            just(Token::TILDE).to(UnaryOp::BitwiseNot),
        ))
        .map_with(|op, ctx| (op, ctx.span()));

        let unary = unary_op
            .repeated()
            .foldr(atom, |(op, span): (UnaryOp, SourcePos), rhs: Expr| {
                let span = span.start..rhs.span.end;
                Expr::new(ExprKind::Unary(op, rhs.boxed()), span)
            })
            .boxed();

        let product = binary_level(
            unary,
            choice((
                just(Token::STAR).to(BinaryOp::Mul),
                just(Token::SLASH).to(BinaryOp::Div),
                just(Token::PERCENT).to(BinaryOp::Mod),
            )),
        )
        .boxed();

        let sum = binary_level(
            product,
            choice((
                just(Token::PLUS).to(BinaryOp::Add),
                just(Token::MINUS).to(BinaryOp::Sub),
            )),
        )
        .boxed();

        let shift = binary_level(
            sum,
            choice((
                just(Token::SHIFT_LEFT).to(BinaryOp::ShiftLeft),
                just(Token::SHIFT_RIGHT).to(BinaryOp::ShiftRight),
            )),
        )
        .boxed();

        let relational = binary_level(
            shift,
            choice((
                just(Token::LESS).to(BinaryOp::Less),
                just(Token::LESS_EQ).to(BinaryOp::LessEq),
                just(Token::GREATER).to(BinaryOp::Greater),
                just(Token::GREATER_EQ).to(BinaryOp::GreaterEq),
            )),
        )
        .boxed();

        let equality = binary_level(
            relational,
            choice((
                just(Token::EQ_EQ).to(BinaryOp::Eq),
                just(Token::NOT_EQ).to(BinaryOp::NotEq),
            )),
        )
        .boxed();

        let bitwise_and =
            binary_level(equality, just(Token::AMPERSAND).to(BinaryOp::BitwiseAnd)).boxed();
        let bitwise_xor =
            binary_level(bitwise_and, just(Token::CARET).to(BinaryOp::BitwiseXor)).boxed();
        let bitwise_or =
            binary_level(bitwise_xor, just(Token::PIPE).to(BinaryOp::BitwiseOr)).boxed();
        let logical_and =
            binary_level(bitwise_or, just(Token::AND_AND).to(BinaryOp::LogicalAnd)).boxed();
        let logical_or =
            binary_level(logical_and, just(Token::OR_OR).to(BinaryOp::LogicalOr)).boxed();

        let assign_op = choice((
            just(Token::EQ).to(AssignOp::Eq),
            just(Token::ASSIGN_ADD).to(AssignOp::Op(BinaryOp::Add)),
            just(Token::ASSIGN_SUB).to(AssignOp::Op(BinaryOp::Sub)),
            just(Token::ASSIGN_MULT).to(AssignOp::Op(BinaryOp::Mul)),
            just(Token::ASSIGN_DIV).to(AssignOp::Op(BinaryOp::Div)),
            just(Token::ASSIGN_MOD).to(AssignOp::Op(BinaryOp::Mod)),
        ));

        let assignment = ident()
            .then(assign_op)
            .then(expr)
            .map_with(|((name, op), value), ctx| {
                Expr::new(ExprKind::Assign(name, op, value.boxed()), ctx.span())
            });

        choice((assignment, logical_or))
    })
}

fn var_decl_parser<'src, I, P>(expr: P) -> impl Parser<'src, I, VarDecl, ErrorParserExtra<'src>> + Clone
where
    I: ValueInput<'src, Token = Token<'src>, Span = SourcePos>,
    P: Parser<'src, I, Expr, ErrorParserExtra<'src>> + Clone,
{
    let declarator = ident()
        .then(just(Token::EQ).ignore_then(expr).or_not())
        .map_with(|(name, init), ctx| Declarator {
            name,
            init,
            span: ctx.span(),
        });

    type_parser()
        .then(
            declarator
                .separated_by(just(Token::COMMA))
                .at_least(1)
                .collect::<Vec<_>>(),
        )
        .map_with(|(ty, declarators), ctx| VarDecl {
            ty,
            declarators,
            span: ctx.span(),
        })
}

pub fn stmt_parser<'src, I>() -> impl Parser<'src, I, Stmt, ErrorParserExtra<'src>> + Clone
where
    I: ValueInput<'src, Token = Token<'src>, Span = SourcePos>,
{
    recursive(|stmt| {
        let expr = expr_parser().boxed();
        let decl = var_decl_parser(expr.clone()).boxed();

        let block = stmt
            .clone()
            .repeated()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::L_CURLY), just(Token::R_CURLY))
            .map_with(|stmts, ctx| Stmt::new(StmtKind::Block(stmts), ctx.span()));

        let decl_stmt = decl
            .clone()
            .then_ignore(just(Token::SEMICOLON))
            .map_with(|decl, ctx| Stmt::new(StmtKind::Decl(decl), ctx.span()));

        let expr_stmt = expr
            .clone()
            .then_ignore(just(Token::SEMICOLON))
            .map_with(|expr, ctx| Stmt::new(StmtKind::Expr(expr), ctx.span()));

        let empty = just(Token::SEMICOLON).map_with(|_, ctx| Stmt::new(StmtKind::Empty, ctx.span()));

        let cond = expr
            .clone()
            .delimited_by(just(Token::L_ROUND), just(Token::R_ROUND));

        let if_stmt = just(Token::IF)
            .ignore_then(cond.clone())
            .then(stmt.clone())
            .then(just(Token::ELSE).ignore_then(stmt.clone()).or_not())
            .map_with(|((cond, then), otherwise), ctx| {
                Stmt::new(
                    StmtKind::If(cond, then.boxed(), otherwise.map(Stmt::boxed)),
                    ctx.span(),
                )
            });

        let while_stmt = just(Token::WHILE)
            .ignore_then(cond.clone())
            .then(stmt.clone())
            .map_with(|(cond, body), ctx| {
                Stmt::new(StmtKind::While(cond, body.boxed()), ctx.span())
            });

        let do_while_stmt = just(Token::DO)
            .ignore_then(stmt.clone())
            .then_ignore(just(Token::WHILE))
            .then(cond)
            .then_ignore(just(Token::SEMICOLON))
            .map_with(|(body, cond), ctx| {
                Stmt::new(StmtKind::DoWhile(body.boxed(), cond), ctx.span())
            });

        let for_init = choice((
            decl.map_with(|decl, ctx| Stmt::new(StmtKind::Decl(decl), ctx.span())),
            expr.clone()
                .map_with(|expr, ctx| Stmt::new(StmtKind::Expr(expr), ctx.span())),
        ));

        let for_clauses = for_init
            .or_not()
            .then_ignore(just(Token::SEMICOLON))
            .then(expr.clone().or_not())
            .then_ignore(just(Token::SEMICOLON))
            .then(expr.clone().or_not())
            .delimited_by(just(Token::L_ROUND), just(Token::R_ROUND));

        let for_stmt = just(Token::FOR)
            .ignore_then(for_clauses)
            .then(stmt.clone())
            .map_with(|(((init, cond), step), body), ctx| {
                Stmt::new(
                    StmtKind::For {
                        init: init.map(Stmt::boxed),
                        cond,
                        step,
                        body: body.boxed(),
                    },
                    ctx.span(),
                )
            });

        let return_stmt = just(Token::RETURN)
            .ignore_then(expr.or_not())
            .then_ignore(just(Token::SEMICOLON))
            .map_with(|value, ctx| Stmt::new(StmtKind::Return(value), ctx.span()));

        let break_stmt = just(Token::BREAK)
            .then_ignore(just(Token::SEMICOLON))
            .map_with(|_, ctx| Stmt::new(StmtKind::Break, ctx.span()));

        let continue_stmt = just(Token::CONTINUE)
            .then_ignore(just(Token::SEMICOLON))
            .map_with(|_, ctx| Stmt::new(StmtKind::Continue, ctx.span()));

        choice((
            block,
            decl_stmt,
            if_stmt,
            while_stmt,
            do_while_stmt,
            for_stmt,
            return_stmt,
            break_stmt,
            continue_stmt,
            empty,
            expr_stmt,
        ))
        .boxed()
    })
}

pub fn function_parser<'src, I>() -> impl Parser<'src, I, FunctionDecl, ErrorParserExtra<'src>>
where
    I: ValueInput<'src, Token = Token<'src>, Span = SourcePos>,
{
    let param = type_parser()
        .then(ident())
        .map_with(|(ty, name), ctx| Param {
            ty,
            name,
            span: ctx.span(),
        });

    let params = choice((
        just(Token::VOID)
            .then(just(Token::R_ROUND).rewind())
            .to(Vec::new()),
        param.separated_by(just(Token::COMMA)).collect::<Vec<_>>(),
    ))
    .delimited_by(just(Token::L_ROUND), just(Token::R_ROUND));

    let body = stmt_parser()
        .repeated()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::L_CURLY), just(Token::R_CURLY))
        .map(Some);

    let prototype = just(Token::SEMICOLON).to(None);

    type_parser()
        .then(ident())
        .then(params)
        .then(choice((body, prototype)))
        .map_with(|(((ret, name), params), body), ctx| FunctionDecl {
            ret,
            name,
            params,
            body,
            span: ctx.span(),
        })
}

pub fn program_parser<'src, I>() -> impl Parser<'src, I, Program, ErrorParserExtra<'src>>
where
    I: ValueInput<'src, Token = Token<'src>, Span = SourcePos>,
{
    let global = var_decl_parser(expr_parser())
        .then_ignore(just(Token::SEMICOLON))
        .map(Item::Global);

    choice((function_parser().map(Item::Function), global))
        .repeated()
        .collect::<Vec<_>>()
        .map(|items| Program { items })
        .then_ignore(end())
}
