//! Recursive-descent parser for stepwise scripts.
//!
//! Turns the token stream produced by [`super::lexer`] into the syntax tree
//! in [`super::ast`].
//!
//! # Key responsibilities
//! - Parse whole programs ([`parse_program`]) for the compiler.
//! - Parse a single expression ([`parse_expression`]) for the debugger's
//!   evaluator, rejecting anything that is not exactly one expression.

use crate::runtime::ast::{BinaryOp, Expr, ExprKind, FnDecl, Literal, LogicalOp, Stmt, UnaryOp};
use crate::runtime::error::SyntaxError;
use crate::runtime::lexer::{tokenize, Token, TokenKind};

type ParseResult<T> = Result<T, SyntaxError>;

/// Deepest syntax tree the parser will build.
pub const MAX_NESTING: usize = 100;

/// Parse a complete program.
pub fn parse_program(source: &str) -> ParseResult<Vec<Stmt>> {
    let mut parser = Parser::new(tokenize(source)?);
    let mut statements = Vec::new();
    while !parser.at(&TokenKind::Eof) {
        statements.push(parser.statement()?);
    }
    Ok(statements)
}

/// Parse source text that must consist of exactly one expression.
pub fn parse_expression(source: &str) -> ParseResult<Expr> {
    let mut parser = Parser::new(tokenize(source)?);
    let expr = parser.expression()?;
    if !parser.at(&TokenKind::Eof) {
        return Err(parser.unexpected("end of expression"));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Nesting of the node being built. Restored on success only; an error
    /// ends the parse.
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn descend(&mut self) -> ParseResult<()> {
        if self.depth >= MAX_NESTING {
            return Err(SyntaxError::new(self.peek().line, "nested too deeply"));
        }
        self.depth += 1;
        Ok(())
    }

    fn peek(&self) -> &Token {
        // `tokenize` always terminates the stream with `Eof`, and `advance`
        // never moves past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_second(&self) -> &TokenKind {
        let index = (self.pos + 1).min(self.tokens.len() - 1);
        &self.tokens[index].kind
    }

    fn at(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> ParseResult<Token> {
        if self.at(&kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        let token = self.peek();
        let found = match &token.kind {
            TokenKind::Eof => "end of input".to_string(),
            other => describe(other),
        };
        SyntaxError::new(token.line, format!("expected {}, found {}", expected, found))
    }

    fn identifier(&mut self, what: &str) -> ParseResult<String> {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    // ── statements ──────────────────────────────────────────────────────────

    fn statement(&mut self) -> ParseResult<Stmt> {
        let depth = self.depth;
        self.descend()?;
        let stmt = self.statement_body()?;
        self.depth = depth;
        Ok(stmt)
    }

    fn statement_body(&mut self) -> ParseResult<Stmt> {
        let line = self.peek().line;
        match &self.peek().kind {
            TokenKind::Fn if matches!(self.peek_second(), TokenKind::Ident(_)) => {
                self.advance();
                let name = self.identifier("function name")?;
                Ok(Stmt::Fn(self.function_rest(Some(name), line)?))
            }
            TokenKind::If => self.if_statement(),
            TokenKind::While => {
                self.advance();
                let cond = self.expression()?;
                let body = self.block()?;
                Ok(Stmt::While { cond, body, line })
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.at(&TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.expect(TokenKind::Semicolon, "';' after return")?;
                Ok(Stmt::Return { value, line })
            }
            TokenKind::Ident(name) if self.peek_second() == &TokenKind::Assign => {
                let name = name.clone();
                self.advance();
                self.advance();
                let value = self.expression()?;
                self.expect(TokenKind::Semicolon, "';' after assignment")?;
                Ok(Stmt::Assign { name, value, line })
            }
            _ => {
                let expr = self.expression()?;
                self.expect(TokenKind::Semicolon, "';' after expression")?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.expect(TokenKind::If, "'if'")?.line;
        let cond = self.expression()?;
        let then = self.block()?;
        let otherwise = if self.eat(&TokenKind::Else) {
            if self.at(&TokenKind::If) {
                vec![self.statement()?]
            } else {
                self.block()?
            }
        } else {
            Vec::new()
        };
        Ok(Stmt::If {
            cond,
            then,
            otherwise,
            line,
        })
    }

    fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut statements = Vec::new();
        while !self.at(&TokenKind::RBrace) {
            if self.at(&TokenKind::Eof) {
                return Err(self.unexpected("'}'"));
            }
            statements.push(self.statement()?);
        }
        self.advance();
        Ok(statements)
    }

    /// Parameters and body of a function, after `fn` and its optional name.
    fn function_rest(&mut self, name: Option<String>, line: u32) -> ParseResult<FnDecl> {
        self.expect(TokenKind::LParen, "'(' after fn")?;
        let mut params = Vec::new();
        if !self.at(&TokenKind::RParen) {
            loop {
                let param = self.identifier("parameter name")?;
                if params.contains(&param) {
                    return Err(SyntaxError::new(
                        self.peek().line,
                        format!("duplicate parameter '{}'", param),
                    ));
                }
                params.push(param);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')' after parameters")?;
        self.expect(TokenKind::LBrace, "'{' before function body")?;
        let mut body = Vec::new();
        while !self.at(&TokenKind::RBrace) {
            if self.at(&TokenKind::Eof) {
                return Err(self.unexpected("'}'"));
            }
            body.push(self.statement()?);
        }
        let end_line = self.advance().line;
        Ok(FnDecl {
            name,
            params,
            body,
            line,
            end_line,
        })
    }

    // ── expressions ─────────────────────────────────────────────────────────

    fn expression(&mut self) -> ParseResult<Expr> {
        let depth = self.depth;
        self.descend()?;
        let expr = self.logical(LogicalOp::Or)?;
        self.depth = depth;
        Ok(expr)
    }

    fn logical(&mut self, op: LogicalOp) -> ParseResult<Expr> {
        let (token, operand): (TokenKind, fn(&mut Self) -> ParseResult<Expr>) = match op {
            LogicalOp::Or => (TokenKind::Or, |p| p.logical(LogicalOp::And)),
            LogicalOp::And => (TokenKind::And, Self::equality),
        };
        let depth = self.depth;
        let mut lhs = operand(self)?;
        while self.at(&token) {
            self.descend()?;
            let line = self.advance().line;
            let rhs = operand(self)?;
            lhs = Expr {
                kind: ExprKind::Logical(op, Box::new(lhs), Box::new(rhs)),
                line,
            };
        }
        self.depth = depth;
        Ok(lhs)
    }

    fn binary_level(
        &mut self,
        operators: &[(TokenKind, BinaryOp)],
        operand: fn(&mut Self) -> ParseResult<Expr>,
    ) -> ParseResult<Expr> {
        let depth = self.depth;
        let mut lhs = operand(self)?;
        loop {
            let Some(op) = operators
                .iter()
                .find(|(token, _)| self.at(token))
                .map(|(_, op)| *op)
            else {
                self.depth = depth;
                return Ok(lhs);
            };
            self.descend()?;
            let line = self.advance().line;
            let rhs = operand(self)?;
            lhs = Expr {
                kind: ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)),
                line,
            };
        }
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        self.binary_level(
            &[(TokenKind::EqEq, BinaryOp::Eq), (TokenKind::BangEq, BinaryOp::Ne)],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        self.binary_level(
            &[
                (TokenKind::Lt, BinaryOp::Lt),
                (TokenKind::Le, BinaryOp::Le),
                (TokenKind::Gt, BinaryOp::Gt),
                (TokenKind::Ge, BinaryOp::Ge),
            ],
            Self::term,
        )
    }

    fn term(&mut self) -> ParseResult<Expr> {
        self.binary_level(
            &[(TokenKind::Plus, BinaryOp::Add), (TokenKind::Minus, BinaryOp::Sub)],
            Self::factor,
        )
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        self.binary_level(
            &[
                (TokenKind::Star, BinaryOp::Mul),
                (TokenKind::Slash, BinaryOp::Div),
                (TokenKind::Percent, BinaryOp::Mod),
            ],
            Self::unary,
        )
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        let op = match self.peek().kind {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Bang | TokenKind::Not => UnaryOp::Not,
            _ => return self.postfix(),
        };
        let depth = self.depth;
        self.descend()?;
        let line = self.advance().line;
        let operand = self.unary()?;
        self.depth = depth;
        Ok(Expr {
            kind: ExprKind::Unary(op, Box::new(operand)),
            line,
        })
    }

    fn postfix(&mut self) -> ParseResult<Expr> {
        let depth = self.depth;
        let mut expr = self.primary()?;
        loop {
            if self.at(&TokenKind::LParen) || self.at(&TokenKind::LBracket) {
                self.descend()?;
            }
            if self.at(&TokenKind::LParen) {
                let line = self.advance().line;
                let args = self.sequence(TokenKind::RParen, "')' after arguments")?;
                expr = Expr {
                    kind: ExprKind::Call(Box::new(expr), args),
                    line,
                };
            } else if self.at(&TokenKind::LBracket) {
                let line = self.advance().line;
                let index = self.expression()?;
                self.expect(TokenKind::RBracket, "']' after index")?;
                expr = Expr {
                    kind: ExprKind::Index(Box::new(expr), Box::new(index)),
                    line,
                };
            } else {
                self.depth = depth;
                return Ok(expr);
            }
        }
    }

    /// Comma-separated expressions up to and including `close`.
    fn sequence(&mut self, close: TokenKind, what: &str) -> ParseResult<Vec<Expr>> {
        let mut items = Vec::new();
        if !self.at(&close) {
            loop {
                items.push(self.expression()?);
                if !self.eat(&TokenKind::Comma) || self.at(&close) {
                    break;
                }
            }
        }
        self.expect(close, what)?;
        Ok(items)
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let line = self.peek().line;
        let kind = match &self.peek().kind {
            TokenKind::Int(i) => ExprKind::Literal(Literal::Int(*i)),
            TokenKind::Float(x) => ExprKind::Literal(Literal::Float(*x)),
            TokenKind::Str(s) => ExprKind::Literal(Literal::Str(s.clone())),
            TokenKind::True => ExprKind::Literal(Literal::Bool(true)),
            TokenKind::False => ExprKind::Literal(Literal::Bool(false)),
            TokenKind::Nil => ExprKind::Literal(Literal::Nil),
            TokenKind::Ident(name) => ExprKind::Name(name.clone()),
            TokenKind::LParen => {
                self.advance();
                let inner = self.expression()?;
                self.expect(TokenKind::RParen, "')'")?;
                return Ok(inner);
            }
            TokenKind::LBracket => {
                self.advance();
                let items = self.sequence(TokenKind::RBracket, "']' after list items")?;
                return Ok(Expr {
                    kind: ExprKind::List(items),
                    line,
                });
            }
            TokenKind::Fn => {
                self.advance();
                let decl = self.function_rest(None, line)?;
                return Ok(Expr {
                    kind: ExprKind::Lambda(decl),
                    line,
                });
            }
            _ => return Err(self.unexpected("an expression")),
        };
        self.advance();
        Ok(Expr { kind, line })
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Int(i) => format!("integer {}", i),
        TokenKind::Float(x) => format!("float {}", x),
        TokenKind::Str(s) => format!("string {:?}", s),
        TokenKind::Ident(name) => format!("'{}'", name),
        other => format!("{:?}", other).to_lowercase(),
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────
