// spindle-parser - Recursive-descent parser for Spindle
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Hand-written recursive-descent parser for Spindle.
//!
//! Operator precedence, lowest to highest: assignment, ternary `?:`,
//! `||`, `&&`, `|`, `^`, `&`, equality, comparison, shifts, `..`
//! (right-associative), additive, multiplicative, unary, postfix.

use std::fmt;

use crate::ast::{BinOp, Expr, ExprKind, LogOp, Stmt, StmtKind, UnOp};
use crate::lexer::{Lexeme, Lexer, LexerError, SourcePos, Token};

/// Parse error with position information.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "syntax error near {}:{}: {}",
            self.line, self.column, self.message
        )
    }
}

impl std::error::Error for ParseError {}

impl From<LexerError> for ParseError {
    fn from(e: LexerError) -> Self {
        ParseError {
            message: e.message,
            line: e.line,
            column: e.column,
        }
    }
}

/// Result type for parsing.
pub type Result<T> = std::result::Result<T, ParseError>;

/// The Spindle parser.
pub struct Parser {
    tokens: Vec<Lexeme>,
    pos: usize,
}

impl Parser {
    /// Create a parser for the given source. Fails on lexer errors.
    pub fn new(source: &str) -> Result<Self> {
        let tokens = Lexer::new(source).tokenize()?;
        Ok(Parser { tokens, pos: 0 })
    }

    /// Parse a whole program: a sequence of statements up to EOF.
    pub fn parse_program(&mut self) -> Result<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while !self.check(&Token::Eof) {
            stmts.push(self.statement()?);
        }
        Ok(stmts)
    }

    /// Parse a single expression, requiring that it consume all input.
    ///
    /// Used by the expression evaluation entry point, which wraps the
    /// result in a synthesized `return` statement.
    pub fn parse_expression(&mut self) -> Result<Expr> {
        let expr = self.expression()?;
        // A trailing semicolon is tolerated.
        self.match_token(&Token::Semicolon);
        if !self.check(&Token::Eof) {
            return Err(self.error(format!("unexpected '{}' after expression", self.peek())));
        }
        Ok(expr)
    }

    /// Convenience: parse a source string into a program in one call.
    pub fn parse_str(source: &str) -> Result<Vec<Stmt>> {
        Parser::new(source)?.parse_program()
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn statement(&mut self) -> Result<Stmt> {
        let pos = self.here();
        match self.peek() {
            Token::LBrace => self.block(),
            Token::Var => self.var_decl(),
            Token::Const => self.const_decl(),
            Token::If => self.if_stmt(),
            Token::While => self.while_stmt(),
            Token::Do => self.do_while_stmt(),
            Token::For => self.for_stmt(),
            Token::Break => {
                self.advance();
                self.expect(&Token::Semicolon, "';' after 'break'")?;
                Ok(Stmt { kind: StmtKind::Break, pos })
            }
            Token::Continue => {
                self.advance();
                self.expect(&Token::Semicolon, "';' after 'continue'")?;
                Ok(Stmt { kind: StmtKind::Continue, pos })
            }
            Token::Return => {
                self.advance();
                let value = if self.check(&Token::Semicolon) {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.expect(&Token::Semicolon, "';' after return value")?;
                Ok(Stmt { kind: StmtKind::Return(value), pos })
            }
            Token::Semicolon => {
                self.advance();
                Ok(Stmt { kind: StmtKind::Empty, pos })
            }
            _ => {
                let expr = self.expression()?;
                self.expect(&Token::Semicolon, "';' after expression")?;
                Ok(Stmt { kind: StmtKind::Expr(expr), pos })
            }
        }
    }

    fn block(&mut self) -> Result<Stmt> {
        let pos = self.here();
        self.expect(&Token::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while !self.check(&Token::RBrace) {
            if self.check(&Token::Eof) {
                return Err(self.error("unexpected end of input in block".to_string()));
            }
            stmts.push(self.statement()?);
        }
        self.expect(&Token::RBrace, "'}'")?;
        Ok(Stmt { kind: StmtKind::Block(stmts), pos })
    }

    fn var_decl(&mut self) -> Result<Stmt> {
        let pos = self.here();
        self.expect(&Token::Var, "'var'")?;
        let mut decls = Vec::new();
        loop {
            let name = self.ident("variable name after 'var'")?;
            let init = if self.match_token(&Token::Assign) {
                Some(self.assignment()?)
            } else {
                None
            };
            decls.push((name, init));
            if !self.match_token(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::Semicolon, "';' after variable declaration")?;
        Ok(Stmt { kind: StmtKind::VarDecl(decls), pos })
    }

    fn const_decl(&mut self) -> Result<Stmt> {
        let pos = self.here();
        self.expect(&Token::Const, "'const'")?;
        let mut decls = Vec::new();
        loop {
            let name = self.ident("constant name after 'const'")?;
            self.expect(&Token::Assign, "'=' after constant name")?;
            let init = self.assignment()?;
            decls.push((name, init));
            if !self.match_token(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::Semicolon, "';' after constant declaration")?;
        Ok(Stmt { kind: StmtKind::ConstDecl(decls), pos })
    }

    fn if_stmt(&mut self) -> Result<Stmt> {
        let pos = self.here();
        self.expect(&Token::If, "'if'")?;
        self.expect(&Token::LParen, "'(' after 'if'")?;
        let cond = self.expression()?;
        self.expect(&Token::RParen, "')' after condition")?;
        let then = Box::new(self.statement()?);
        let els = if self.match_token(&Token::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt { kind: StmtKind::If { cond, then, els }, pos })
    }

    fn while_stmt(&mut self) -> Result<Stmt> {
        let pos = self.here();
        self.expect(&Token::While, "'while'")?;
        self.expect(&Token::LParen, "'(' after 'while'")?;
        let cond = self.expression()?;
        self.expect(&Token::RParen, "')' after condition")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt { kind: StmtKind::While { cond, body }, pos })
    }

    fn do_while_stmt(&mut self) -> Result<Stmt> {
        let pos = self.here();
        self.expect(&Token::Do, "'do'")?;
        let body = Box::new(self.statement()?);
        self.expect(&Token::While, "'while' after do-body")?;
        self.expect(&Token::LParen, "'(' after 'while'")?;
        let cond = self.expression()?;
        self.expect(&Token::RParen, "')' after condition")?;
        self.expect(&Token::Semicolon, "';' after do-while")?;
        Ok(Stmt { kind: StmtKind::DoWhile { body, cond }, pos })
    }

    fn for_stmt(&mut self) -> Result<Stmt> {
        let pos = self.here();
        self.expect(&Token::For, "'for'")?;
        self.expect(&Token::LParen, "'(' after 'for'")?;

        let init = if self.match_token(&Token::Semicolon) {
            None
        } else if self.check(&Token::Var) {
            Some(Box::new(self.var_decl()?))
        } else {
            let e = self.expression()?;
            let epos = e.pos;
            self.expect(&Token::Semicolon, "';' after for-initializer")?;
            Some(Box::new(Stmt { kind: StmtKind::Expr(e), pos: epos }))
        };

        let cond = if self.check(&Token::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(&Token::Semicolon, "';' after for-condition")?;

        let step = if self.check(&Token::RParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(&Token::RParen, "')' after for-header")?;

        let body = Box::new(self.statement()?);
        Ok(Stmt { kind: StmtKind::For { init, cond, step, body }, pos })
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        let lhs = self.ternary()?;

        let op = match self.peek() {
            Token::Assign => None,
            Token::PlusEq => Some(BinOp::Add),
            Token::MinusEq => Some(BinOp::Sub),
            Token::StarEq => Some(BinOp::Mul),
            Token::SlashEq => Some(BinOp::Div),
            Token::PercentEq => Some(BinOp::Mod),
            Token::AmpEq => Some(BinOp::BitAnd),
            Token::PipeEq => Some(BinOp::BitOr),
            Token::CaretEq => Some(BinOp::BitXor),
            Token::ShlEq => Some(BinOp::Shl),
            Token::ShrEq => Some(BinOp::Shr),
            Token::ConcatEq => Some(BinOp::Concat),
            _ => return Ok(lhs),
        };
        let pos = lhs.pos;

        if !is_lvalue(&lhs) {
            return Err(self.error("invalid assignment target".to_string()));
        }
        self.advance();
        let value = self.assignment()?;
        Ok(Expr {
            kind: ExprKind::Assign {
                target: Box::new(lhs),
                op,
                value: Box::new(value),
            },
            pos,
        })
    }

    fn ternary(&mut self) -> Result<Expr> {
        let cond = self.logical_or()?;
        if !self.match_token(&Token::Question) {
            return Ok(cond);
        }
        let pos = cond.pos;
        let then = self.expression()?;
        self.expect(&Token::Colon, "':' in conditional expression")?;
        let els = self.ternary()?;
        Ok(Expr {
            kind: ExprKind::Ternary {
                cond: Box::new(cond),
                then: Box::new(then),
                els: Box::new(els),
            },
            pos,
        })
    }

    fn logical_or(&mut self) -> Result<Expr> {
        let mut lhs = self.logical_and()?;
        while self.match_token(&Token::PipePipe) {
            let rhs = self.logical_and()?;
            let pos = lhs.pos;
            lhs = Expr {
                kind: ExprKind::Logical {
                    op: LogOp::Or,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                pos,
            };
        }
        Ok(lhs)
    }

    fn logical_and(&mut self) -> Result<Expr> {
        let mut lhs = self.bit_or()?;
        while self.match_token(&Token::AmpAmp) {
            let rhs = self.bit_or()?;
            let pos = lhs.pos;
            lhs = Expr {
                kind: ExprKind::Logical {
                    op: LogOp::And,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                pos,
            };
        }
        Ok(lhs)
    }

    fn bit_or(&mut self) -> Result<Expr> {
        let mut lhs = self.bit_xor()?;
        while self.match_token(&Token::Pipe) {
            let rhs = self.bit_xor()?;
            lhs = binary(BinOp::BitOr, lhs, rhs);
        }
        Ok(lhs)
    }

    fn bit_xor(&mut self) -> Result<Expr> {
        let mut lhs = self.bit_and()?;
        while self.match_token(&Token::Caret) {
            let rhs = self.bit_and()?;
            lhs = binary(BinOp::BitXor, lhs, rhs);
        }
        Ok(lhs)
    }

    fn bit_and(&mut self) -> Result<Expr> {
        let mut lhs = self.equality()?;
        while self.match_token(&Token::Amp) {
            let rhs = self.equality()?;
            lhs = binary(BinOp::BitAnd, lhs, rhs);
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut lhs = self.comparison()?;
        loop {
            let op = match self.peek() {
                Token::EqEq => BinOp::Eq,
                Token::BangEq => BinOp::Ne,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.comparison()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut lhs = self.shift()?;
        loop {
            let op = match self.peek() {
                Token::Lt => BinOp::Lt,
                Token::Le => BinOp::Le,
                Token::Gt => BinOp::Gt,
                Token::Ge => BinOp::Ge,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.shift()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn shift(&mut self) -> Result<Expr> {
        let mut lhs = self.concat()?;
        loop {
            let op = match self.peek() {
                Token::Shl => BinOp::Shl,
                Token::Shr => BinOp::Shr,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.concat()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    /// `..` is right-associative and binds looser than additive operators.
    fn concat(&mut self) -> Result<Expr> {
        let lhs = self.additive()?;
        if self.match_token(&Token::DotDot) {
            let rhs = self.concat()?;
            return Ok(binary(BinOp::Concat, lhs, rhs));
        }
        Ok(lhs)
    }

    fn additive(&mut self) -> Result<Expr> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn multiplicative(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::Percent => BinOp::Mod,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn unary(&mut self) -> Result<Expr> {
        let pos = self.here();
        let op = match self.peek() {
            Token::Plus => UnOp::Plus,
            Token::Minus => UnOp::Minus,
            Token::Bang => UnOp::LogNot,
            Token::Tilde => UnOp::BitNot,
            Token::Sizeof => UnOp::Sizeof,
            Token::Typeof => UnOp::Typeof,
            Token::PlusPlus => UnOp::PreInc,
            Token::MinusMinus => UnOp::PreDec,
            _ => return self.postfix(),
        };
        self.advance();
        let operand = self.unary()?;
        if matches!(op, UnOp::PreInc | UnOp::PreDec) && !is_lvalue(&operand) {
            return Err(self.error("operand of '++'/'--' must be assignable".to_string()));
        }
        Ok(Expr {
            kind: ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            pos,
        })
    }

    fn postfix(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;
        loop {
            match self.peek() {
                Token::LParen => {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check(&Token::RParen) {
                        loop {
                            args.push(self.assignment()?);
                            if !self.match_token(&Token::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(&Token::RParen, "')' after call arguments")?;
                    let pos = expr.pos;
                    expr = Expr {
                        kind: ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        pos,
                    };
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.expression()?;
                    self.expect(&Token::RBracket, "']' after subscript")?;
                    let pos = expr.pos;
                    expr = Expr {
                        kind: ExprKind::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                        pos,
                    };
                }
                Token::Dot => {
                    self.advance();
                    let name = self.ident("member name after '.'")?;
                    let pos = expr.pos;
                    expr = Expr {
                        kind: ExprKind::Member {
                            object: Box::new(expr),
                            name,
                        },
                        pos,
                    };
                }
                Token::PlusPlus | Token::MinusMinus => {
                    if !is_lvalue(&expr) {
                        return Err(
                            self.error("operand of '++'/'--' must be assignable".to_string())
                        );
                    }
                    let op = if self.check(&Token::PlusPlus) {
                        UnOp::PostInc
                    } else {
                        UnOp::PostDec
                    };
                    self.advance();
                    let pos = expr.pos;
                    expr = Expr {
                        kind: ExprKind::Unary {
                            op,
                            operand: Box::new(expr),
                        },
                        pos,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        let pos = self.here();
        let kind = match self.peek().clone() {
            Token::Nil => {
                self.advance();
                ExprKind::Nil
            }
            Token::True => {
                self.advance();
                ExprKind::Bool(true)
            }
            Token::False => {
                self.advance();
                ExprKind::Bool(false)
            }
            Token::Int(n) => {
                self.advance();
                ExprKind::Int(n)
            }
            Token::Float(n) => {
                self.advance();
                ExprKind::Float(n)
            }
            Token::Str(s) => {
                self.advance();
                ExprKind::Str(s)
            }
            Token::Ident(name) => {
                self.advance();
                ExprKind::Ident(name)
            }
            Token::Argc => {
                self.advance();
                ExprKind::Argc
            }
            Token::ArgRef(n) => {
                self.advance();
                ExprKind::ArgRef(n)
            }
            Token::LParen => {
                self.advance();
                let expr = self.expression()?;
                self.expect(&Token::RParen, "')' after expression")?;
                return Ok(expr);
            }
            Token::Fn => return self.fn_literal(),
            Token::LBracket => return self.array_literal(),
            Token::LBrace => return self.map_literal(),
            other => {
                return Err(self.error(format!("unexpected '{}' in expression", other)));
            }
        };
        Ok(Expr { kind, pos })
    }

    fn fn_literal(&mut self) -> Result<Expr> {
        let pos = self.here();
        self.expect(&Token::Fn, "'fn'")?;

        let name = match self.peek() {
            Token::Ident(_) => Some(self.ident("function name")?),
            _ => None,
        };

        self.expect(&Token::LParen, "'(' after 'fn'")?;
        let mut params = Vec::new();
        if !self.check(&Token::RParen) {
            loop {
                params.push(self.ident("parameter name")?);
                if !self.match_token(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RParen, "')' after parameters")?;

        let body = Box::new(self.block()?);
        Ok(Expr {
            kind: ExprKind::FnLit { name, params, body },
            pos,
        })
    }

    fn array_literal(&mut self) -> Result<Expr> {
        let pos = self.here();
        self.expect(&Token::LBracket, "'['")?;
        let mut items = Vec::new();
        if !self.check(&Token::RBracket) {
            loop {
                items.push(self.assignment()?);
                if !self.match_token(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RBracket, "']' after array literal")?;
        Ok(Expr { kind: ExprKind::ArrayLit(items), pos })
    }

    fn map_literal(&mut self) -> Result<Expr> {
        let pos = self.here();
        self.expect(&Token::LBrace, "'{'")?;
        let mut pairs = Vec::new();
        if !self.check(&Token::RBrace) {
            loop {
                // A bare identifier key is shorthand for a string key.
                let key = match (self.peek().clone(), self.peek_next()) {
                    (Token::Ident(name), Token::Colon) => {
                        let kpos = self.here();
                        self.advance();
                        Expr { kind: ExprKind::Str(name), pos: kpos }
                    }
                    _ => self.assignment()?,
                };
                self.expect(&Token::Colon, "':' after hashmap key")?;
                let value = self.assignment()?;
                pairs.push((key, value));
                if !self.match_token(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RBrace, "'}' after hashmap literal")?;
        Ok(Expr { kind: ExprKind::MapLit(pairs), pos })
    }

    // ========================================================================
    // Token plumbing
    // ========================================================================

    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn peek_next(&self) -> Token {
        self.tokens
            .get(self.pos + 1)
            .map(|l| l.token.clone())
            .unwrap_or(Token::Eof)
    }

    fn here(&self) -> SourcePos {
        self.tokens[self.pos].pos
    }

    fn advance(&mut self) -> &Lexeme {
        let lexeme = &self.tokens[self.pos];
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        lexeme
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == token
    }

    fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, what: &str) -> Result<()> {
        if self.match_token(token) {
            Ok(())
        } else {
            Err(self.error(format!("expected {}, found '{}'", what, self.peek())))
        }
    }

    fn ident(&mut self, what: &str) -> Result<String> {
        match self.peek().clone() {
            Token::Ident(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(self.error(format!("expected {}, found '{}'", what, other))),
        }
    }

    fn error(&self, message: String) -> ParseError {
        let pos = self.here();
        ParseError {
            message,
            line: pos.line,
            column: pos.column,
        }
    }
}

fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    let pos = lhs.pos;
    Expr {
        kind: ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        pos,
    }
}

fn is_lvalue(expr: &Expr) -> bool {
    matches!(
        expr.kind,
        ExprKind::Ident(_) | ExprKind::Index { .. } | ExprKind::Member { .. }
    )
}
