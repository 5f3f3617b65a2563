#[cfg(test)]
mod test;

pub mod tree_node;

use quick_error::quick_error;
use tokenizer::{
    self, Tokenizer,
    token::{Keyword, Symbol, Token, TokenType},
};
use tree_node::*;

quick_error! {
    #[derive(Debug)]
    pub enum Error {
        TokenizerError(err: tokenizer::Error) {
            from()
            display("{}", err)
            source(err)
        }
        UnexpectedToken(token: Token) {
            display("Unexpected token: `{}`", token.token_type)
        }
        InvalidSyntax(token: Token, reason: String) {
            display("Invalid syntax near `{}`: {}", token.token_type, reason)
        }
        UnexpectedEOF {
            display("Unexpected EOF")
        }
    }
}

impl Error {
    /// The source region the error points at, if it has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            Error::TokenizerError(err) => err
                .position()
                .map(|(line, column)| Span::new(line, column, 1)),
            Error::UnexpectedToken(token) | Error::InvalidSyntax(token, _) => {
                Some(Span::from(token))
            }
            Error::UnexpectedEOF => None,
        }
    }
}

macro_rules! self_matches_peek {
    ($self:ident, $pattern:pat) => {
        matches!($self.tokenizer.peek_next()?, Some(Token { token_type: $pattern, .. }))
    };
    ($self:ident, $pattern:pat if $cond:expr) => {
        matches!($self.tokenizer.peek_next()?, Some(Token { token_type: $pattern, .. }) if $cond)
    };
}

macro_rules! token_from_option {
    ($token:expr) => {
        match $token {
            Some(token) => token,
            None => return Err(Error::UnexpectedEOF),
        }
    };
}

macro_rules! extract_token_data {
    ($token:expr, $pattern:pat, $extraction:expr) => {
        match $token.token_type {
            $pattern => $extraction,
            _ => return Err(Error::UnexpectedToken($token.clone())),
        }
    };
}

macro_rules! token_matches {
    ($token:expr, $pattern:pat) => {
        matches!($token.token_type, $pattern)
    };
}

pub struct Parser {
    tokenizer: Tokenizer,
    current_token: Option<Token>,
}

impl Parser {
    pub fn new(tokenizer: Tokenizer) -> Self {
        Parser {
            tokenizer,
            current_token: None,
        }
    }

    /// Parses a whole program: `[DECLARE declarations] BEGIN commands END`.
    pub fn parse_all(&mut self) -> Result<Program, Error> {
        let declarations = if self_matches_peek!(self, TokenType::Keyword(Keyword::Declare)) {
            self.assign_next()?;
            self.declarations()?
        } else {
            Vec::new()
        };

        self.expect_keyword(Keyword::Begin)?;
        let statements = self.commands(&[Keyword::End])?;
        self.expect_keyword(Keyword::End)?;

        let eof = token_from_option!(self.get_next()?);
        if !token_matches!(eof, TokenType::EOF) {
            return Err(Error::UnexpectedToken(eof));
        }

        Ok(Program {
            declarations,
            statements,
        })
    }

    /// Assigns the next token in the tokenizer to the current token
    fn assign_next(&mut self) -> Result<(), Error> {
        self.current_token = self.tokenizer.next_token()?;
        Ok(())
    }

    /// Calls `assign_next` and returns the next token in the tokenizer
    fn get_next(&mut self) -> Result<Option<Token>, Error> {
        self.assign_next()?;
        Ok(self.current_token.clone())
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<Token, Error> {
        let token = token_from_option!(self.get_next()?);
        match token.token_type {
            TokenType::Keyword(k) if k == keyword => Ok(token),
            _ => Err(Error::UnexpectedToken(token)),
        }
    }

    fn expect_symbol(&mut self, symbol: Symbol) -> Result<Token, Error> {
        let token = token_from_option!(self.get_next()?);
        match token.token_type {
            TokenType::Symbol(s) if s == symbol => Ok(token),
            _ => Err(Error::UnexpectedToken(token)),
        }
    }

    fn declarations(&mut self) -> Result<Vec<Declaration>, Error> {
        let mut declarations = vec![self.declaration()?];

        while self_matches_peek!(self, TokenType::Symbol(Symbol::Comma)) {
            self.assign_next()?;
            declarations.push(self.declaration()?);
        }

        Ok(declarations)
    }

    /// `name` or `name(begin:end)`
    fn declaration(&mut self) -> Result<Declaration, Error> {
        let token = token_from_option!(self.get_next()?);
        let name = extract_token_data!(token, TokenType::Identifier(ref name), name.clone());
        let span = Span::from(&token);

        if !self_matches_peek!(self, TokenType::Symbol(Symbol::LParen)) {
            return Ok(Declaration::Number { name, span });
        }

        self.assign_next()?;
        let begin = self.signed_number()?;
        self.expect_symbol(Symbol::Colon)?;
        let end = self.signed_number()?;
        self.expect_symbol(Symbol::RParen)?;

        Ok(Declaration::Array {
            name,
            begin,
            end,
            span,
        })
    }

    /// Parses commands until the upcoming token is one of `terminators`, which is left unconsumed.
    fn commands(&mut self, terminators: &[Keyword]) -> Result<Vec<Statement>, Error> {
        let mut statements = Vec::new();

        while !self_matches_peek!(self, TokenType::Keyword(k) if terminators.contains(&k)) {
            statements.push(self.command()?);
        }

        if statements.is_empty() {
            let token = token_from_option!(self.tokenizer.peek_next()?);
            return Err(Error::InvalidSyntax(
                token,
                String::from("expected at least one command"),
            ));
        }

        Ok(statements)
    }

    fn command(&mut self) -> Result<Statement, Error> {
        let token = token_from_option!(self.tokenizer.peek_next()?);

        match token.token_type {
            TokenType::Identifier(_) => self.assignment(),
            TokenType::Keyword(Keyword::If) => self.if_statement(),
            TokenType::Keyword(Keyword::While) => {
                self.assign_next()?;
                let condition = self.condition()?;
                self.while_statement(condition)
            }
            TokenType::Keyword(Keyword::Do) => self.do_while_statement(),
            TokenType::Keyword(Keyword::For) => self.for_statement(),
            TokenType::Keyword(Keyword::Read) => {
                self.assign_next()?;
                let target = self.identifier()?;
                self.expect_symbol(Symbol::Semicolon)?;
                Ok(Statement::Read(target))
            }
            TokenType::Keyword(Keyword::Write) => {
                self.assign_next()?;
                let expression = self.expression()?;
                self.expect_symbol(Symbol::Semicolon)?;
                Ok(Statement::Write(expression))
            }
            TokenType::EOF => Err(Error::UnexpectedEOF),
            _ => Err(Error::UnexpectedToken(token)),
        }
    }

    /// `identifier := expression;`
    fn assignment(&mut self) -> Result<Statement, Error> {
        let target = self.identifier()?;
        self.expect_symbol(Symbol::Assign)?;
        let expression = self.expression()?;
        self.expect_symbol(Symbol::Semicolon)?;

        Ok(Statement::Assign { target, expression })
    }

    /// `IF condition THEN commands [ELSE commands] ENDIF`
    fn if_statement(&mut self) -> Result<Statement, Error> {
        self.expect_keyword(Keyword::If)?;
        let condition = self.condition()?;
        self.expect_keyword(Keyword::Then)?;
        let then_branch = self.commands(&[Keyword::Else, Keyword::EndIf])?;

        let else_branch = if self_matches_peek!(self, TokenType::Keyword(Keyword::Else)) {
            self.assign_next()?;
            Some(self.commands(&[Keyword::EndIf])?)
        } else {
            None
        };
        self.expect_keyword(Keyword::EndIf)?;

        Ok(Statement::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    /// The rest of `WHILE condition DO commands ENDWHILE`, once the condition is known.
    fn while_statement(&mut self, condition: Condition) -> Result<Statement, Error> {
        self.expect_keyword(Keyword::Do)?;
        let body = self.commands(&[Keyword::EndWhile])?;
        self.expect_keyword(Keyword::EndWhile)?;

        Ok(Statement::While { condition, body })
    }

    /// `DO commands WHILE condition ENDDO`
    ///
    /// A `WHILE` inside the body may also open a nested while-loop. The two only differ in
    /// the token after the condition: `DO` continues a nested loop, `ENDDO` closes this one.
    fn do_while_statement(&mut self) -> Result<Statement, Error> {
        self.expect_keyword(Keyword::Do)?;
        let mut body = Vec::new();

        loop {
            if !self_matches_peek!(self, TokenType::Keyword(Keyword::While)) {
                body.push(self.command()?);
                continue;
            }

            let while_token = token_from_option!(self.get_next()?);
            let condition = self.condition()?;

            if self_matches_peek!(self, TokenType::Keyword(Keyword::Do)) {
                body.push(self.while_statement(condition)?);
                continue;
            }

            self.expect_keyword(Keyword::EndDo)?;
            if body.is_empty() {
                return Err(Error::InvalidSyntax(
                    while_token,
                    String::from("expected at least one command"),
                ));
            }
            return Ok(Statement::DoWhile { body, condition });
        }
    }

    /// `FOR iterator FROM value TO|DOWNTO value DO commands ENDFOR`
    fn for_statement(&mut self) -> Result<Statement, Error> {
        self.expect_keyword(Keyword::For)?;

        let token = token_from_option!(self.get_next()?);
        let name = extract_token_data!(token, TokenType::Identifier(ref name), name.clone());
        let iterator = Identifier::scalar(name, Span::from(&token));

        self.expect_keyword(Keyword::From)?;
        let from = self.value()?;

        let token = token_from_option!(self.get_next()?);
        let direction = extract_token_data!(
            token,
            TokenType::Keyword(keyword @ (Keyword::To | Keyword::Downto)),
            if keyword == Keyword::To {
                Direction::Up
            } else {
                Direction::Down
            }
        );

        let to = self.value()?;
        self.expect_keyword(Keyword::Do)?;
        let body = self.commands(&[Keyword::EndFor])?;
        self.expect_keyword(Keyword::EndFor)?;

        Ok(Statement::For {
            iterator,
            from,
            to,
            direction,
            body,
        })
    }

    /// `value` or `value op value`
    fn expression(&mut self) -> Result<Expression, Error> {
        let left = self.value()?;

        let op = match self.tokenizer.peek_next()? {
            Some(Token {
                token_type: TokenType::Symbol(symbol),
                ..
            }) if symbol.is_operator() => match symbol {
                Symbol::Plus => Operator::Add,
                Symbol::Minus => Operator::Subtract,
                Symbol::Asterisk => Operator::Multiply,
                Symbol::Slash => Operator::Divide,
                _ => Operator::Modulo,
            },
            _ => return Ok(Expression::Value(left)),
        };
        self.assign_next()?;

        let right = self.value()?;
        Ok(Expression::Binary { op, left, right })
    }

    /// `value relation value`
    fn condition(&mut self) -> Result<Condition, Error> {
        let left = self.value()?;

        let token = token_from_option!(self.get_next()?);
        let relation = extract_token_data!(
            token,
            TokenType::Symbol(symbol),
            match symbol {
                Symbol::Equal => Relation::Equal,
                Symbol::NotEqual => Relation::NotEqual,
                Symbol::LessThan => Relation::Less,
                Symbol::GreaterThan => Relation::Greater,
                Symbol::LessThanOrEqual => Relation::LessOrEqual,
                Symbol::GreaterThanOrEqual => Relation::GreaterOrEqual,
                _ => return Err(Error::UnexpectedToken(token)),
            }
        );

        let right = self.value()?;
        Ok(Condition {
            relation,
            left,
            right,
        })
    }

    /// A literal, optionally negative, or an identifier.
    fn value(&mut self) -> Result<Value, Error> {
        if self_matches_peek!(self, TokenType::Identifier(_)) {
            return Ok(Value::Identifier(self.identifier()?));
        }
        Ok(Value::Number(self.signed_number()?))
    }

    /// `name`, `name(index)` or `name(number)`
    fn identifier(&mut self) -> Result<Identifier, Error> {
        let token = token_from_option!(self.get_next()?);
        let name = extract_token_data!(token, TokenType::Identifier(ref name), name.clone());
        let span = Span::from(&token);

        if !self_matches_peek!(self, TokenType::Symbol(Symbol::LParen)) {
            return Ok(Identifier::scalar(name, span));
        }
        self.assign_next()?;

        let kind = if self_matches_peek!(self, TokenType::Identifier(_)) {
            let token = token_from_option!(self.get_next()?);
            let index = extract_token_data!(token, TokenType::Identifier(ref name), name.clone());
            IdentifierKind::IndexedByVariable(Box::new(Identifier::scalar(
                index,
                Span::from(&token),
            )))
        } else {
            IdentifierKind::IndexedByNumber(self.signed_number()?)
        };

        let closing = self.expect_symbol(Symbol::RParen)?;

        Ok(Identifier {
            name,
            kind,
            span: span.to(Span::from(&closing)),
        })
    }

    /// `['-'] number`, checked against the signed 64-bit range.
    fn signed_number(&mut self) -> Result<i64, Error> {
        let mut token = token_from_option!(self.get_next()?);
        let negative = token_matches!(token, TokenType::Symbol(Symbol::Minus));
        if negative {
            token = token_from_option!(self.get_next()?);
        }

        let magnitude = extract_token_data!(token, TokenType::Number(n), n);

        let value = if negative {
            0i64.checked_sub_unsigned(magnitude)
        } else {
            i64::try_from(magnitude).ok()
        };

        value.ok_or_else(|| {
            Error::InvalidSyntax(token, String::from("number out of 64-bit signed range"))
        })
    }
}
