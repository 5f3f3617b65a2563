pub mod token;

use quick_error::quick_error;
use std::{
    io::{BufReader, Cursor, Read, Seek, SeekFrom},
    path::PathBuf,
};
use token::{Keyword, Symbol, Token, TokenType};

quick_error! {
    #[derive(Debug)]
    pub enum Error {
        IOError(err: std::io::Error) {
            from()
            display("IO Error: {}", err)
            source(err)
        }
        NumberParseError(err: std::num::ParseIntError, line: usize, column: usize) {
            display("Number literal is out of range: {}", err)
            source(err)
        }
        UnknownSymbolError(char: char, line: usize, column: usize) {
            display("Unknown symbol `{}`", char)
        }
        UnterminatedCommentError(line: usize, column: usize) {
            display("Unterminated comment")
        }
    }
}

impl Error {
    /// The source position the error points at, if it has one.
    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            Error::IOError(_) => None,
            Error::NumberParseError(_, line, column)
            | Error::UnknownSymbolError(_, line, column)
            | Error::UnterminatedCommentError(line, column) => Some((*line, *column)),
        }
    }
}

pub trait Tokenize: Read + Seek {}

impl<T> Tokenize for T where T: Read + Seek {}

pub struct Tokenizer {
    reader: BufReader<Box<dyn Tokenize>>,
    char_buffer: [u8; 1],
    line: usize,
    column: usize,
    returned_eof: bool,
}

impl Tokenizer {
    pub fn from_path(input_file: impl Into<PathBuf>) -> Result<Self, Error> {
        let file = std::fs::File::open(input_file.into())?;
        let reader = BufReader::new(Box::new(file) as Box<dyn Tokenize>);

        Ok(Self {
            reader,
            line: 1,
            column: 1,
            char_buffer: [0],
            returned_eof: false,
        })
    }
}

impl From<String> for Tokenizer {
    fn from(input: String) -> Self {
        let reader = BufReader::new(Box::new(Cursor::new(input)) as Box<dyn Tokenize>);

        Self {
            reader,
            line: 1,
            column: 1,
            char_buffer: [0],
            returned_eof: false,
        }
    }
}

impl From<&str> for Tokenizer {
    fn from(input: &str) -> Self {
        Self::from(input.to_owned())
    }
}

impl Tokenizer {
    /// Reads one character and advances the position, `None` at end of input.
    fn next_char(&mut self) -> Result<Option<char>, Error> {
        let bytes_read = self.reader.read(&mut self.char_buffer)?;

        if bytes_read == 0 {
            return Ok(None);
        }

        let c = self.char_buffer[0] as char;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Ok(Some(c))
    }

    /// The character `next_char` would return. The position is left untouched.
    fn peek_next_char(&mut self) -> Result<Option<char>, Error> {
        let start = self.reader.stream_position()?;

        if self.reader.read(&mut self.char_buffer)? == 0 {
            return Ok(None);
        }
        self.reader.seek(SeekFrom::Start(start))?;
        Ok(Some(self.char_buffer[0] as char))
    }

    /// Skips a `[ ... ]` comment. The opening bracket has already been consumed.
    fn skip_comment(&mut self, line: usize, column: usize) -> Result<(), Error> {
        while let Some(next_char) = self.next_char()? {
            if next_char == ']' {
                return Ok(());
            }
        }
        Err(Error::UnterminatedCommentError(line, column))
    }

    /// Returns the next token in the stream.
    /// After the last real token a single `EOF` token is produced, then `None`.
    pub fn next_token(&mut self) -> Result<Option<Token>, Error> {
        while let Some(next_char) = self.next_char()? {
            if next_char.is_whitespace() {
                continue;
            }

            // the column counter already moved past `next_char`
            let line = self.line;
            let column = self.column - 1;

            match next_char {
                '[' => {
                    self.skip_comment(line, column)?;
                    continue;
                }
                '0'..='9' => {
                    return self.tokenize_number(next_char, line, column).map(Some);
                }
                char if char.is_ascii_alphabetic() || char == '_' => {
                    return Ok(Some(self.tokenize_keyword_or_identifier(
                        next_char, line, column,
                    )?));
                }
                _ => return self.tokenize_symbol(next_char, line, column).map(Some),
            }
        }
        if self.returned_eof {
            Ok(None)
        } else {
            self.returned_eof = true;
            Ok(Some(Token::new(TokenType::EOF, self.line, self.column, 0)))
        }
    }

    /// The token `next_token` would return, without consuming it.
    pub fn peek_next(&mut self) -> Result<Option<Token>, Error> {
        let start = self.reader.stream_position()?;
        let (line, column, returned_eof) = (self.line, self.column, self.returned_eof);

        let token = self.next_token()?;

        self.reader.seek(SeekFrom::Start(start))?;
        (self.line, self.column, self.returned_eof) = (line, column, returned_eof);
        Ok(token)
    }

    fn tokenize_symbol(
        &mut self,
        first_symbol: char,
        line: usize,
        column: usize,
    ) -> Result<Token, Error> {
        macro_rules! symbol {
            ($symbol:ident) => {
                Ok(Token::new(
                    TokenType::Symbol(Symbol::$symbol),
                    line,
                    column,
                    self.column - column,
                ))
            };
        }

        match first_symbol {
            // single character symbols
            '(' => symbol!(LParen),
            ')' => symbol!(RParen),
            ',' => symbol!(Comma),
            ';' => symbol!(Semicolon),
            '+' => symbol!(Plus),
            '-' => symbol!(Minus),
            '*' => symbol!(Asterisk),
            '/' => symbol!(Slash),
            '%' => symbol!(Percent),
            '=' => symbol!(Equal),

            // multi-character symbols
            ':' if self.peek_next_char()? == Some('=') => {
                self.next_char()?;
                symbol!(Assign)
            }
            ':' => symbol!(Colon),

            '<' if self.peek_next_char()? == Some('=') => {
                self.next_char()?;
                symbol!(LessThanOrEqual)
            }
            '<' => symbol!(LessThan),

            '>' if self.peek_next_char()? == Some('=') => {
                self.next_char()?;
                symbol!(GreaterThanOrEqual)
            }
            '>' => symbol!(GreaterThan),

            '!' if self.peek_next_char()? == Some('=') => {
                self.next_char()?;
                symbol!(NotEqual)
            }

            _ => Err(Error::UnknownSymbolError(first_symbol, line, column)),
        }
    }

    /// Tokenizes an unsigned integer literal
    fn tokenize_number(
        &mut self,
        first_char: char,
        line: usize,
        column: usize,
    ) -> Result<Token, Error> {
        let mut primary = String::with_capacity(16);
        primary.push(first_char);

        while let Some(next_char) = self.peek_next_char()? {
            if !next_char.is_ascii_digit() {
                break;
            }
            primary.push(next_char);
            self.next_char()?;
        }

        let number = primary
            .parse::<u64>()
            .map_err(|e| Error::NumberParseError(e, line, column))?;

        Ok(Token::new(
            TokenType::Number(number),
            line,
            column,
            self.column - column,
        ))
    }

    /// Tokenizes a keyword or an identifier. Keywords win over identifiers.
    fn tokenize_keyword_or_identifier(
        &mut self,
        first_char: char,
        line: usize,
        column: usize,
    ) -> Result<Token, Error> {
        let mut buffer = String::with_capacity(16);
        buffer.push(first_char);

        while let Some(next_char) = self.peek_next_char()? {
            if !(next_char.is_ascii_alphanumeric() || next_char == '_') {
                break;
            }
            buffer.push(next_char);
            self.next_char()?;
        }

        let length = self.column - column;
        let token_type = match Keyword::lookup(&buffer) {
            Some(keyword) => TokenType::Keyword(keyword),
            None => TokenType::Identifier(buffer),
        };

        Ok(Token::new(token_type, line, column, length))
    }
}
