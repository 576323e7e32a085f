use crate::language::{
    span::Span,
    token::{Token, TokenKind},
};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace1, not_line_ending, one_of},
    combinator::{map, map_res, opt, recognize, value},
    multi::many0_count,
    sequence::{pair, tuple},
    IResult,
};

#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

pub fn lex(source: &str) -> Result<Vec<Token>, Vec<LexError>> {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut remaining = source;

    loop {
        if let Ok((rest, _)) = trivia(remaining) {
            remaining = rest;
        }
        let offset = source.len() - remaining.len();
        if remaining.is_empty() {
            tokens.push(Token {
                kind: TokenKind::Eof,
                span: Span::new(offset, offset),
            });
            break;
        }

        match token(remaining) {
            Ok((rest, kind)) => {
                let end = source.len() - rest.len();
                tokens.push(Token {
                    kind,
                    span: Span::new(offset, end),
                });
                remaining = rest;
            }
            Err(_) => {
                let ch = remaining.chars().next().unwrap_or_default();
                let width = ch.len_utf8().max(1);
                errors.push(LexError {
                    message: format!("Unexpected character `{ch}`"),
                    span: Span::new(offset, offset + width),
                });
                remaining = remaining.get(width..).unwrap_or_default();
            }
        }
    }

    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}

fn trivia(input: &str) -> IResult<&str, &str> {
    recognize(many0_count(alt((
        multispace1,
        recognize(pair(tag("//"), not_line_ending)),
    ))))(input)
}

fn token(input: &str) -> IResult<&str, TokenKind> {
    alt((number, word, symbol))(input)
}

fn number(input: &str) -> IResult<&str, TokenKind> {
    map_res(
        recognize(tuple((
            digit1,
            opt(pair(char('.'), digit1)),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        |text: &str| text.parse::<f64>().map(TokenKind::Number),
    )(input)
}

fn word(input: &str) -> IResult<&str, TokenKind> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0_count(alt((alphanumeric1, tag("_")))),
        )),
        |text: &str| match text {
            "fn" => TokenKind::Fn,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            _ => TokenKind::Identifier(text.to_string()),
        },
    )(input)
}

fn symbol(input: &str) -> IResult<&str, TokenKind> {
    alt((
        value(TokenKind::ColonEq, tag(":=")),
        value(TokenKind::EqEq, tag("==")),
        value(TokenKind::NotEq, tag("!=")),
        value(TokenKind::GreaterEq, tag(">=")),
        value(TokenKind::LessEq, tag("<=")),
        value(TokenKind::Greater, char('>')),
        value(TokenKind::Less, char('<')),
        value(TokenKind::Eq, char('=')),
        value(TokenKind::Plus, char('+')),
        value(TokenKind::Minus, char('-')),
        value(TokenKind::Star, char('*')),
        value(TokenKind::Slash, char('/')),
        value(TokenKind::Percent, char('%')),
        value(TokenKind::LParen, char('(')),
        value(TokenKind::RParen, char(')')),
        value(TokenKind::LBrace, char('{')),
        value(TokenKind::RBrace, char('}')),
        value(TokenKind::Comma, char(',')),
        value(TokenKind::Semi, char(';')),
    ))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source)
            .expect("lex")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn lexes_operators_longest_first() {
        assert_eq!(
            kinds("a := b >= 1 == c != 2 <= d"),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::ColonEq,
                TokenKind::Identifier("b".into()),
                TokenKind::GreaterEq,
                TokenKind::Number(1.0),
                TokenKind::EqEq,
                TokenKind::Identifier("c".into()),
                TokenKind::NotEq,
                TokenKind::Number(2.0),
                TokenKind::LessEq,
                TokenKind::Identifier("d".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_keywords_numbers_and_comments() {
        assert_eq!(
            kinds("while_x // trailing\nwhile (1.5e1) fn"),
            vec![
                TokenKind::Identifier("while_x".into()),
                TokenKind::While,
                TokenKind::LParen,
                TokenKind::Number(15.0),
                TokenKind::RParen,
                TokenKind::Fn,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn minus_is_never_folded_into_number() {
        assert_eq!(
            kinds("a-1"),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::Minus,
                TokenKind::Number(1.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn spans_cover_source_text() {
        let tokens = lex("  x = 42;").expect("lex");
        assert_eq!(tokens[0].span, Span::new(2, 3));
        assert_eq!(tokens[2].span, Span::new(6, 8));
        assert_eq!(tokens[4].span, Span::new(9, 9));
    }

    #[test]
    fn reports_every_unexpected_character() {
        let errors = lex("x = 1 @ 2 $").expect_err("should fail");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].span, Span::new(6, 7));
        assert!(errors[1].message.contains('$'));
    }
}
