//! Recursive-descent parser for SL.
//!
//! SL has no nested arithmetic expressions or grouping parentheses: a
//! condition or assignment right-hand side is a single value, or exactly
//! one binary operator applied to two values. This mirrors the grammar in
//! the language surface (no `(`/`)` for expression grouping; those
//! punctuation marks are reserved for procedure headers/calls and array
//! indexing).

use crate::ast::{Command, Condition, Declaration, Expr, Formal, Identifier, Main, ProcedureDef, Program};
use crate::errors::{CompileError, SourceLocation};
use crate::lexer::{Lexer, SpannedToken, Token};

pub struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, CompileError> {
        let tokens = Lexer::new(source).tokenize()?;
        Ok(Parser { tokens, pos: 0 })
    }

    pub fn parse(&mut self) -> Result<Program, CompileError> {
        let mut procedures = Vec::new();
        while self.check(&Token::Procedure) {
            procedures.push(self.parse_procedure()?);
        }
        let main = self.parse_main()?;
        self.expect_eof()?;
        Ok(Program { procedures, main })
    }

    // --- token stream helpers ---

    fn current(&self) -> &SpannedToken {
        &self.tokens[self.pos]
    }

    fn line(&self) -> usize {
        self.current().line
    }

    fn check(&self, token: &Token) -> bool {
        &self.current().token == token
    }

    fn advance(&mut self) -> SpannedToken {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, token: Token) -> Result<SpannedToken, CompileError> {
        if self.current().token == token {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("{:?}", token)))
        }
    }

    fn expect_ident(&mut self) -> Result<(String, usize), CompileError> {
        let line = self.line();
        match self.current().token.clone() {
            Token::Ident(name) => {
                self.advance();
                Ok((name, line))
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn expect_num(&mut self) -> Result<i64, CompileError> {
        match self.current().token.clone() {
            Token::Num(n) => {
                self.advance();
                Ok(n)
            }
            _ => Err(self.unexpected("integer literal")),
        }
    }

    fn expect_eof(&mut self) -> Result<(), CompileError> {
        if self.current().token == Token::Eof {
            Ok(())
        } else {
            Err(self.unexpected("end of file"))
        }
    }

    fn unexpected(&self, expected: &str) -> CompileError {
        CompileError::syntax(
            format!(
                "unexpected token {:?} (expected {})",
                self.current().token,
                expected
            ),
            Some(SourceLocation::new(self.line())),
        )
    }

    // --- top-level constructs ---

    fn parse_procedure(&mut self) -> Result<ProcedureDef, CompileError> {
        let line = self.line();
        self.expect(Token::Procedure)?;
        let (name, _) = self.expect_ident()?;
        self.expect(Token::LParen)?;
        let formals = self.parse_formals()?;
        self.expect(Token::RParen)?;
        self.expect(Token::Is)?;
        let declarations = if self.check(&Token::In) {
            Vec::new()
        } else {
            self.parse_declarations()?
        };
        self.expect(Token::In)?;
        let commands = self.parse_commands()?;
        self.expect(Token::End)?;
        Ok(ProcedureDef {
            name,
            formals,
            declarations,
            commands,
            line,
        })
    }

    fn parse_main(&mut self) -> Result<Main, CompileError> {
        self.expect(Token::Program)?;
        self.expect(Token::Is)?;
        let declarations = if self.check(&Token::In) {
            Vec::new()
        } else {
            self.parse_declarations()?
        };
        self.expect(Token::In)?;
        let commands = self.parse_commands()?;
        self.expect(Token::End)?;
        Ok(Main {
            declarations,
            commands,
        })
    }

    fn parse_formals(&mut self) -> Result<Vec<Formal>, CompileError> {
        let mut formals = Vec::new();
        if self.check(&Token::RParen) {
            return Ok(formals);
        }
        formals.push(self.parse_formal()?);
        while self.check(&Token::Comma) {
            self.advance();
            formals.push(self.parse_formal()?);
        }
        Ok(formals)
    }

    fn parse_formal(&mut self) -> Result<Formal, CompileError> {
        let formal = match self.current().token {
            Token::MarkerInput => {
                self.advance();
                let (name, _) = self.expect_ident()?;
                Formal::Input { name }
            }
            Token::MarkerOutput => {
                self.advance();
                let (name, _) = self.expect_ident()?;
                Formal::Output { name }
            }
            Token::MarkerArray => {
                self.advance();
                let (name, _) = self.expect_ident()?;
                Formal::Array { name }
            }
            _ => {
                let (name, _) = self.expect_ident()?;
                Formal::Scalar { name }
            }
        };
        Ok(formal)
    }

    fn parse_declarations(&mut self) -> Result<Vec<Declaration>, CompileError> {
        let mut decls = vec![self.parse_declaration()?];
        while self.check(&Token::Comma) {
            self.advance();
            decls.push(self.parse_declaration()?);
        }
        Ok(decls)
    }

    fn parse_declaration(&mut self) -> Result<Declaration, CompileError> {
        let (name, line) = self.expect_ident()?;
        if self.check(&Token::LBracket) {
            self.advance();
            let lo = self.parse_signed_num()?;
            self.expect(Token::Colon)?;
            let hi = self.parse_signed_num()?;
            self.expect(Token::RBracket)?;
            Ok(Declaration::Array { name, lo, hi, line })
        } else {
            Ok(Declaration::Var { name, line })
        }
    }

    /// Array bounds may be written with a leading `-` even though the
    /// language has no unary-minus expression operator.
    fn parse_signed_num(&mut self) -> Result<i64, CompileError> {
        if self.check(&Token::Minus) {
            self.advance();
            Ok(-self.expect_num()?)
        } else {
            self.expect_num()
        }
    }

    fn parse_commands(&mut self) -> Result<Vec<Command>, CompileError> {
        let mut commands = vec![self.parse_command()?];
        while self.starts_command() {
            commands.push(self.parse_command()?);
        }
        Ok(commands)
    }

    fn starts_command(&self) -> bool {
        matches!(
            self.current().token,
            Token::Ident(_)
                | Token::If
                | Token::While
                | Token::Repeat
                | Token::For
                | Token::Read
                | Token::Write
        )
    }

    fn parse_command(&mut self) -> Result<Command, CompileError> {
        let line = self.line();
        match self.current().token.clone() {
            Token::If => self.parse_if(line),
            Token::While => self.parse_while(line),
            Token::Repeat => self.parse_repeat(line),
            Token::For => self.parse_for(line),
            Token::Read => self.parse_read(line),
            Token::Write => self.parse_write(line),
            Token::Ident(_) => self.parse_assign_or_call(line),
            _ => Err(self.unexpected("command")),
        }
    }

    fn parse_if(&mut self, line: usize) -> Result<Command, CompileError> {
        self.expect(Token::If)?;
        let cond = self.parse_condition()?;
        self.expect(Token::Then)?;
        let then_branch = self.parse_commands()?;
        let else_branch = if self.check(&Token::Else) {
            self.advance();
            let branch = self.parse_commands()?;
            self.expect(Token::Endif)?;
            branch
        } else {
            self.expect(Token::Endif)?;
            Vec::new()
        };
        Ok(Command::If {
            cond,
            then_branch,
            else_branch,
            line,
        })
    }

    fn parse_while(&mut self, line: usize) -> Result<Command, CompileError> {
        self.expect(Token::While)?;
        let cond = self.parse_condition()?;
        self.expect(Token::Do)?;
        let body = self.parse_commands()?;
        self.expect(Token::Endwhile)?;
        Ok(Command::While { cond, body, line })
    }

    fn parse_repeat(&mut self, line: usize) -> Result<Command, CompileError> {
        self.expect(Token::Repeat)?;
        let body = self.parse_commands()?;
        self.expect(Token::Until)?;
        let cond = self.parse_condition()?;
        self.expect(Token::Semicolon)?;
        Ok(Command::Repeat { body, cond, line })
    }

    fn parse_for(&mut self, line: usize) -> Result<Command, CompileError> {
        self.expect(Token::For)?;
        let (iterator, _) = self.expect_ident()?;
        self.expect(Token::From)?;
        let from = self.parse_value()?;
        let downto = if self.check(&Token::To) {
            self.advance();
            false
        } else {
            self.expect(Token::Downto)?;
            true
        };
        let to = self.parse_value()?;
        self.expect(Token::Do)?;
        let body = self.parse_commands()?;
        self.expect(Token::Endfor)?;
        if downto {
            Ok(Command::ForDownTo {
                iterator,
                from,
                to,
                body,
                line,
            })
        } else {
            Ok(Command::ForTo {
                iterator,
                from,
                to,
                body,
                line,
            })
        }
    }

    fn parse_read(&mut self, line: usize) -> Result<Command, CompileError> {
        self.expect(Token::Read)?;
        let target = self.parse_identifier()?;
        self.expect(Token::Semicolon)?;
        Ok(Command::Read { target, line })
    }

    fn parse_write(&mut self, line: usize) -> Result<Command, CompileError> {
        self.expect(Token::Write)?;
        let value = self.parse_expression()?;
        self.expect(Token::Semicolon)?;
        Ok(Command::Write { value, line })
    }

    /// Disambiguate `ident := expr ;` from `ident ( args ) ;` with one
    /// token of lookahead after parsing the identifier.
    fn parse_assign_or_call(&mut self, line: usize) -> Result<Command, CompileError> {
        let (name, ident_line) = self.expect_ident()?;
        if self.check(&Token::LParen) {
            self.advance();
            let actuals = self.parse_call_args()?;
            self.expect(Token::RParen)?;
            self.expect(Token::Semicolon)?;
            return Ok(Command::Call { name, actuals, line });
        }

        let target = self.parse_identifier_tail(name, ident_line)?;
        self.expect(Token::Assign)?;
        let value = self.parse_expression()?;
        self.expect(Token::Semicolon)?;
        Ok(Command::Assign {
            target,
            value,
            line,
        })
    }

    fn parse_call_args(&mut self) -> Result<Vec<String>, CompileError> {
        let mut args = Vec::new();
        if self.check(&Token::RParen) {
            return Ok(args);
        }
        let (first, _) = self.expect_ident()?;
        args.push(first);
        while self.check(&Token::Comma) {
            self.advance();
            let (name, _) = self.expect_ident()?;
            args.push(name);
        }
        Ok(args)
    }

    // --- expressions, conditions, identifiers ---

    fn parse_expression(&mut self) -> Result<Expr, CompileError> {
        let left = self.parse_value()?;
        let ctor: Option<fn(Box<Expr>, Box<Expr>) -> Expr> = match self.current().token {
            Token::Plus => Some(Expr::Add),
            Token::Minus => Some(Expr::Sub),
            Token::Star => Some(Expr::Mul),
            Token::Slash => Some(Expr::Div),
            Token::Percent => Some(Expr::Mod),
            _ => None,
        };
        let Some(ctor) = ctor else {
            return Ok(left);
        };
        self.advance();
        let right = self.parse_value()?;
        Ok(ctor(Box::new(left), Box::new(right)))
    }

    fn parse_condition(&mut self) -> Result<Condition, CompileError> {
        let left = self.parse_value()?;
        let ctor: fn(Expr, Expr) -> Condition = match self.current().token {
            Token::Eq => Condition::Eq,
            Token::Neq => Condition::Neq,
            Token::Lt => Condition::Lt,
            Token::Gt => Condition::Gt,
            Token::Leq => Condition::Le,
            Token::Geq => Condition::Ge,
            _ => return Err(self.unexpected("relational operator")),
        };
        self.advance();
        let right = self.parse_value()?;
        Ok(ctor(left, right))
    }

    fn parse_value(&mut self) -> Result<Expr, CompileError> {
        if let Token::Num(n) = self.current().token {
            self.advance();
            return Ok(Expr::Num(n));
        }
        let identifier = self.parse_identifier()?;
        Ok(Expr::Id(identifier))
    }

    fn parse_identifier(&mut self) -> Result<Identifier, CompileError> {
        let (name, line) = self.expect_ident()?;
        self.parse_identifier_tail(name, line)
    }

    fn parse_identifier_tail(
        &mut self,
        name: String,
        line: usize,
    ) -> Result<Identifier, CompileError> {
        if !self.check(&Token::LBracket) {
            return Ok(Identifier::Scalar { name, line });
        }
        self.advance();
        let identifier = match self.current().token.clone() {
            Token::Num(n) => {
                self.advance();
                Identifier::IndexedByConst {
                    array: name,
                    index: n,
                    line,
                }
            }
            Token::Ident(index_var) => {
                self.advance();
                Identifier::IndexedByVar {
                    array: name,
                    index_var,
                    line,
                }
            }
            _ => return Err(self.unexpected("array index")),
        };
        self.expect(Token::RBracket)?;
        Ok(identifier)
    }
}
