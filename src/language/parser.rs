use crate::language::{
    ast::*,
    errors::{SyntaxError, SyntaxErrors},
    lexer::lex,
    span::Span,
    token::{Token, TokenKind},
};

pub fn parse_source(source: &str) -> Result<Program, SyntaxErrors> {
    let tokens = lex(source).map_err(|errors| {
        SyntaxErrors::new(errors.into_iter().map(SyntaxError::from).collect())
    })?;
    parse(&tokens)
}

pub fn parse(tokens: &[Token]) -> Result<Program, SyntaxErrors> {
    if tokens.is_empty() {
        return Ok(Program::default());
    }
    let mut parser = Parser::new(tokens);
    let program = parser.parse_program();
    if parser.errors.is_empty() {
        Ok(program)
    } else {
        Err(SyntaxErrors::new(parser.errors))
    }
}

type ParseResult<T> = Result<T, SyntaxError>;

struct Parser<'a> {
    tokens: &'a [Token],
    position: usize,
    errors: Vec<SyntaxError>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            position: 0,
            errors: Vec::new(),
        }
    }

    fn parse_program(&mut self) -> Program {
        let mut program = Program::default();
        while !self.is_at_end() {
            if self.eat(&TokenKind::Semi) {
                continue;
            }
            let start = self.position;
            match self.parse_statement() {
                Ok(statement) => program.statements.push(statement),
                Err(err) => {
                    self.report_error(err);
                    self.synchronize();
                    if self.position == start {
                        self.advance();
                    }
                }
            }
        }
        program
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        match self.peek_kind() {
            TokenKind::LBrace => self.parse_block().map(Statement::Block),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Fn => self.parse_function(),
            TokenKind::RBrace => Err(self
                .error_here("Unexpected `}` without a matching `{`")
                .with_label("no block is open here")),
            _ => {
                let expr = self.parse_expression()?;
                self.consume(&TokenKind::Semi, "Expected `;` after expression")
                    .map_err(|err| {
                        err.with_help("Every expression statement ends with `;`")
                    })?;
                Ok(Statement::Expr(expr))
            }
        }
    }

    fn parse_block(&mut self) -> ParseResult<Block> {
        self.consume(&TokenKind::LBrace, "Expected `{` to start a block")?;
        let mut block = Block::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            if self.eat(&TokenKind::Semi) {
                continue;
            }
            let start = self.position;
            match self.parse_statement() {
                Ok(statement) => block.push(statement),
                Err(err) => {
                    self.report_error(err);
                    self.synchronize();
                    if self.position == start {
                        self.advance();
                    }
                }
            }
        }
        self.consume(&TokenKind::RBrace, "Expected `}` to close block")?;
        Ok(block)
    }

    fn parse_if(&mut self) -> ParseResult<Statement> {
        self.consume(&TokenKind::If, "Expected `if`")?;
        let condition = self.parse_condition("if")?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.eat(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Statement::If(IfStatement {
            condition,
            then_branch,
            else_branch,
        }))
    }

    fn parse_while(&mut self) -> ParseResult<Statement> {
        self.consume(&TokenKind::While, "Expected `while`")?;
        let condition = self.parse_condition("while")?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::While(WhileStatement { condition, body }))
    }

    fn parse_condition(&mut self, keyword: &str) -> ParseResult<Expr> {
        self.consume(&TokenKind::LParen, &format!("Expected `(` after `{keyword}`"))
            .map_err(|err| err.with_help(format!("Syntax: {keyword} (<condition>) <statement>")))?;
        let condition = self.parse_expression()?;
        self.consume(&TokenKind::RParen, "Expected `)` after condition")?;
        Ok(condition)
    }

    fn parse_function(&mut self) -> ParseResult<Statement> {
        self.consume(&TokenKind::Fn, "Expected `fn`")?;
        let name = self.expect_identifier("Expected function name after `fn`")?;
        self.consume(&TokenKind::LParen, "Expected `(` after function name")?;

        let mut params: Vec<String> = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let span = self.peek().span;
                let param = self.expect_identifier("Expected parameter name")?;
                if params.contains(&param) {
                    self.report_error(
                        SyntaxError::new(format!("Duplicate parameter `{param}`"), span)
                            .with_label("already declared in this parameter list"),
                    );
                } else {
                    params.push(param);
                }
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(&TokenKind::RParen, "Expected `)` after parameters")?;
        let body = self
            .parse_block()
            .map_err(|err| err.with_help(format!("Syntax: fn {name}(a, b) {{ ... }}")))?;
        Ok(Statement::Function(FunctionDef { name, params, body }))
    }

    fn parse_expression(&mut self) -> ParseResult<Expr> {
        if let TokenKind::Identifier(name) = self.peek_kind() {
            match self.peek_next_kind() {
                Some(TokenKind::Eq) => {
                    let name = name.clone();
                    self.advance();
                    self.advance();
                    let value = self.parse_expression()?;
                    return Ok(Expr::assign(name, value));
                }
                Some(TokenKind::ColonEq) => {
                    let name = name.clone();
                    self.advance();
                    self.advance();
                    let value = self.parse_expression()?;
                    return Ok(Expr::deferred(name, value));
                }
                _ => {}
            }
        }

        let expr = self.parse_equality()?;
        if matches!(self.peek_kind(), TokenKind::Eq | TokenKind::ColonEq) {
            return Err(self
                .error_here("Left side of an assignment must be a variable name")
                .with_help("Try: name = <value>; or name := <expression>;"));
        }
        Ok(expr)
    }

    fn parse_equality(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_relation()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::Ne,
                _ => break,
            };
            self.advance();
            let right = self.parse_relation()?;
            expr = Expr::binary(op, expr, right);
        }
        Ok(expr)
    }

    fn parse_relation(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_additive()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Greater => BinaryOp::Gt,
                TokenKind::Less => BinaryOp::Lt,
                TokenKind::GreaterEq => BinaryOp::Ge,
                TokenKind::LessEq => BinaryOp::Le,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            expr = Expr::binary(op, expr, right);
        }
        Ok(expr)
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_term()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            expr = Expr::binary(op, expr, right);
        }
        Ok(expr)
    }

    fn parse_term(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Rem,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            expr = Expr::binary(op, expr, right);
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        if self.eat(&TokenKind::Minus) {
            let operand = self.parse_unary()?;
            return Ok(Expr::binary(BinaryOp::Sub, Expr::Number(0.0), operand));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Number(value) => {
                self.advance();
                Ok(Expr::Number(value))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                if self.eat(&TokenKind::LParen) {
                    let args = self.parse_arguments()?;
                    Ok(Expr::call(name, args))
                } else {
                    Ok(Expr::Identifier(name))
                }
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.consume(&TokenKind::RParen, "Expected `)` after expression")?;
                Ok(expr)
            }
            TokenKind::Eof => Err(SyntaxError::new(
                "Unexpected end of input while reading expression",
                token.span,
            )),
            other => Err(SyntaxError::new(
                format!("Unexpected {} in expression", other.describe()),
                token.span,
            )
            .with_label("expected a number, variable or `(`")),
        }
    }

    fn parse_arguments(&mut self) -> ParseResult<Vec<Expr>> {
        let mut args = Vec::new();
        if self.eat(&TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.consume(&TokenKind::RParen, "Expected `)` after arguments")?;
        Ok(args)
    }

    fn expect_identifier(&mut self, message: &str) -> ParseResult<String> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(SyntaxError::new(
                format!("{message}: found {}", other.describe()),
                token.span,
            )
            .with_label(message.to_string())),
        }
    }

    fn consume(&mut self, expected: &TokenKind, message: &str) -> ParseResult<()> {
        if self.eat(expected) {
            return Ok(());
        }
        let found = self.peek();
        let span = if matches!(expected, TokenKind::Semi) {
            self.previous_span().after()
        } else {
            found.span
        };
        Err(
            SyntaxError::new(format!("{message}: found {}", found.kind.describe()), span)
                .with_label(message.to_string()),
        )
    }

    fn eat(&mut self, expected: &TokenKind) -> bool {
        if self.check(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, expected: &TokenKind) -> bool {
        self.peek_kind() == expected
    }

    fn peek(&self) -> &'a Token {
        let tokens = self.tokens;
        let last = tokens.len().saturating_sub(1);
        &tokens[self.position.min(last)]
    }

    fn peek_kind(&self) -> &'a TokenKind {
        &self.peek().kind
    }

    fn peek_next_kind(&self) -> Option<&'a TokenKind> {
        self.tokens.get(self.position + 1).map(|token| &token.kind)
    }

    fn advance(&mut self) -> &'a Token {
        let token = self.peek();
        if !self.is_at_end() {
            self.position += 1;
        }
        token
    }

    fn previous_span(&self) -> Span {
        self.position
            .checked_sub(1)
            .and_then(|index| self.tokens.get(index))
            .map(|token| token.span)
            .unwrap_or_default()
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn error_here(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(message, self.peek().span)
    }

    fn report_error(&mut self, err: SyntaxError) {
        self.errors.push(err);
    }

    fn synchronize(&mut self) {
        while !self.is_at_end() {
            match self.peek_kind() {
                TokenKind::Semi => {
                    self.advance();
                    break;
                }
                TokenKind::RBrace => break,
                _ => {
                    self.advance();
                }
            }
        }
    }
}
