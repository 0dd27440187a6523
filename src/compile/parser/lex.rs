use std::fmt::Display;

use chumsky::prelude::*;

use super::Spanned;

#[derive(Clone, Debug, PartialEq)]
#[allow(non_camel_case_types)]
pub enum Token<'src> {
    IDENT(&'src str),
    INT,
    FLOAT,
    VOID,
    IF,
    ELSE,
    WHILE,
    DO,
    FOR,
    CONTINUE,
    BREAK,
    RETURN,
    NUM { value: &'src str, base: u32 },
    DECIMAL(&'src str),
    L_ROUND,
    R_ROUND,
    L_CURLY,
    R_CURLY,
    SEMICOLON,
    COMMA,
    EQ,
    PLUS,
    MINUS,
    STAR,
    SLASH,
    PERCENT,
    ASSIGN_ADD,
    ASSIGN_SUB,
    ASSIGN_MULT,
    ASSIGN_DIV,
    ASSIGN_MOD,
    INCREMENT,
    DECREMENT,
    EQ_EQ,
    NOT_EQ,
    LESS,
    LESS_EQ,
    GREATER,
    GREATER_EQ,
    AND_AND,
    OR_OR,
    BANG,
    TILDE,
    AMPERSAND,
    PIPE,
    CARET,
    SHIFT_LEFT,
    SHIFT_RIGHT,
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lexeme = match self {
            Self::IDENT(ident) => return write!(f, "{ident}"),
            Self::NUM { value, base: 16 } => return write!(f, "0x{value}"),
            Self::NUM { value, .. } | Self::DECIMAL(value) => return write!(f, "{value}"),
            Self::INT => "int",
            Self::FLOAT => "float",
            Self::VOID => "void",
            Self::IF => "if",
            Self::ELSE => "else",
            Self::WHILE => "while",
            Self::DO => "do",
            Self::FOR => "for",
            Self::CONTINUE => "continue",
            Self::BREAK => "break",
            Self::RETURN => "return",
            Self::L_ROUND => "(",
            Self::R_ROUND => ")",
            Self::L_CURLY => "{",
            Self::R_CURLY => "}",
            Self::SEMICOLON => ";",
            Self::COMMA => ",",
            Self::EQ => "=",
            Self::PLUS => "+",
            Self::MINUS => "-",
            Self::STAR => "*",
            Self::SLASH => "/",
            Self::PERCENT => "%",
            Self::ASSIGN_ADD => "+=",
            Self::ASSIGN_SUB => "-=",
            Self::ASSIGN_MULT => "*=",
            Self::ASSIGN_DIV => "/=",
            Self::ASSIGN_MOD => "%=",
            Self::INCREMENT => "++",
            Self::DECREMENT => "--",
            Self::EQ_EQ => "==",
            Self::NOT_EQ => "!=",
            Self::LESS => "<",
            Self::LESS_EQ => "<=",
            Self::GREATER => ">",
            Self::GREATER_EQ => ">=",
            Self::AND_AND => "&&",
            Self::OR_OR => "||",
            Self::BANG => "!",
            Self::TILDE => "~",
            Self::AMPERSAND => "&",
            Self::PIPE => "|",
            Self::CARET => "^",
            Self::SHIFT_LEFT => "<<",
            Self::SHIFT_RIGHT => ">>",
        };

        write!(f, "{lexeme}")
    }
}

type ErrorParserExtra<'src> = extra::Err<Rich<'src, char, SimpleSpan>>;

fn decimal<'src>() -> impl Parser<'src, &'src str, Token<'src>, ErrorParserExtra<'src>> {
    text::int(10).map(|value: &'src str| Token::NUM { value, base: 10 })
}

fn hexadecimal<'src>() -> impl Parser<'src, &'src str, Token<'src>, ErrorParserExtra<'src>> {
    just("0x")
        .ignore_then(text::int(16))
        .map(|value: &'src str| Token::NUM { value, base: 16 })
}

fn floating<'src>() -> impl Parser<'src, &'src str, Token<'src>, ErrorParserExtra<'src>> {
    text::int(10)
        .then(just('.'))
        .then(text::digits(10).or_not())
        .to_slice()
        .map(Token::DECIMAL)
}

fn operator<'src>() -> impl Parser<'src, &'src str, Token<'src>, ErrorParserExtra<'src>> {
    // longest lexemes first
    let compound = choice((
        just("++").to(Token::INCREMENT),
        just("--").to(Token::DECREMENT),
        just("+=").to(Token::ASSIGN_ADD),
        just("-=").to(Token::ASSIGN_SUB),
        just("*=").to(Token::ASSIGN_MULT),
        just("/=").to(Token::ASSIGN_DIV),
        just("%=").to(Token::ASSIGN_MOD),
        just("==").to(Token::EQ_EQ),
        just("!=").to(Token::NOT_EQ),
        just("<=").to(Token::LESS_EQ),
        just(">=").to(Token::GREATER_EQ),
        just("&&").to(Token::AND_AND),
        just("||").to(Token::OR_OR),
        just("<<").to(Token::SHIFT_LEFT),
        just(">>").to(Token::SHIFT_RIGHT),
    ));

    let single = choice((
        just("=").to(Token::EQ),
        just("+").to(Token::PLUS),
        just("-").to(Token::MINUS),
        just("*").to(Token::STAR),
        just("/").to(Token::SLASH),
        just("%").to(Token::PERCENT),
        just("<").to(Token::LESS),
        just(">").to(Token::GREATER),
        just("!").to(Token::BANG),
        just("~").to(Token::TILDE),
        just("&").to(Token::AMPERSAND),
        just("|").to(Token::PIPE),
        just("^").to(Token::CARET),
    ));

    compound.or(single)
}

pub fn lexer<'src>()
-> impl Parser<'src, &'src str, Vec<Spanned<Token<'src>>>, ErrorParserExtra<'src>> {
    let ident = text::ascii::ident().map(|ident| match ident {
        "int" => Token::INT,
        "float" => Token::FLOAT,
        "void" => Token::VOID,
        "if" => Token::IF,
        "else" => Token::ELSE,
        "while" => Token::WHILE,
        "do" => Token::DO,
        "for" => Token::FOR,
        "continue" => Token::CONTINUE,
        "break" => Token::BREAK,
        "return" => Token::RETURN,
        _ => Token::IDENT(ident),
    });

    let punctuation = choice((
        just("(").to(Token::L_ROUND),
        just(")").to(Token::R_ROUND),
        just("{").to(Token::L_CURLY),
        just("}").to(Token::R_CURLY),
        just(";").to(Token::SEMICOLON),
        just(",").to(Token::COMMA),
    ));

    let comment_single_line = just("//")
        .then(any().and_is(text::newline().not()).repeated())
        .padded()
        .to(())
        .boxed();

    let comment_multi_line = recursive(|comment| {
        just("/*")
            .then(comment.or(any().and_is(just("*/").not()).to(())).repeated())
            .then(just("*/"))
            .padded()
            .to(())
    });

    let comment = choice((comment_single_line, comment_multi_line.boxed())).boxed();

    choice((
        hexadecimal(),
        floating(),
        decimal(),
        ident,
        punctuation,
        operator(),
    ))
    .map_with(|token, ctx| (token, ctx.span().into()))
    .padded_by(comment.repeated())
    .padded()
    .repeated()
    .collect()
    .then_ignore(end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token<'_>> {
        lexer()
            .parse(src)
            .into_result()
            .unwrap()
            .into_iter()
            .map(|(token, _)| token)
            .collect()
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            tokens("int main float do_it"),
            vec![
                Token::INT,
                Token::IDENT("main"),
                Token::FLOAT,
                Token::IDENT("do_it")
            ]
        );
    }

    #[test]
    fn numbers() {
        assert_eq!(
            tokens("12 0x1f 1.5 3."),
            vec![
                Token::NUM { value: "12", base: 10 },
                Token::NUM { value: "1f", base: 16 },
                Token::DECIMAL("1.5"),
                Token::DECIMAL("3."),
            ]
        );
    }

    #[test]
    fn longest_operator_wins() {
        assert_eq!(
            tokens("a<<=b++"),
            vec![
                Token::IDENT("a"),
                Token::SHIFT_LEFT,
                Token::EQ,
                Token::IDENT("b"),
                Token::INCREMENT,
            ]
        );
        assert_eq!(
            tokens("x+=1 && y"),
            vec![
                Token::IDENT("x"),
                Token::ASSIGN_ADD,
                Token::NUM { value: "1", base: 10 },
                Token::AND_AND,
                Token::IDENT("y"),
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        let src = "int /* a /* nested */ comment */ x; // trailing\nreturn";
        assert_eq!(
            tokens(src),
            vec![
                Token::INT,
                Token::IDENT("x"),
                Token::SEMICOLON,
                Token::RETURN
            ]
        );
    }

    #[test]
    fn spans_point_into_the_source() {
        let spanned = lexer().parse("  int x").into_result().unwrap();
        assert_eq!(spanned[0].1, 2..5);
        assert_eq!(spanned[1].1, 6..7);
    }

    #[test]
    fn stray_character_is_an_error() {
        assert!(lexer().parse("int $x;").into_result().is_err());
    }
}
