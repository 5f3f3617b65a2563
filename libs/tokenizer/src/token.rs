#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Token {
    /// The type of the token
    pub token_type: TokenType,
    /// The line where the token was found
    pub line: usize,
    /// The column where the token was found
    pub column: usize,
    /// How many characters of source the token covers
    pub length: usize,
}

impl Token {
    pub fn new(token_type: TokenType, line: usize, column: usize, length: usize) -> Self {
        Self {
            token_type,
            line,
            column,
            length,
        }
    }
}

#[derive(Debug, PartialEq, Hash, Eq, Clone)]
pub enum TokenType {
    /// Represents an unsigned integer literal. Signs are handled by the parser.
    Number(u64),
    /// Represents a keyword token
    Keyword(Keyword),
    /// Represents an identifier token
    Identifier(String),
    /// Represents a symbol token
    Symbol(Symbol),
    /// Represents an end of file token
    EOF,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenType::Number(n) => write!(f, "{}", n),
            TokenType::Keyword(k) => write!(f, "{}", k),
            TokenType::Identifier(i) => write!(f, "{}", i),
            TokenType::Symbol(s) => write!(f, "{}", s),
            TokenType::EOF => write!(f, "end of file"),
        }
    }
}

#[derive(Debug, PartialEq, Hash, Eq, Clone, Copy)]
pub enum Symbol {
    // Single Character Symbols
    /// Represents the `(` symbol
    LParen,
    /// Represents the `)` symbol
    RParen,
    /// Represents the `:` symbol
    Colon,
    /// Represents the `,` symbol
    Comma,
    /// Represents the `;` symbol
    Semicolon,
    /// Represents the `+` symbol
    Plus,
    /// Represents the `-` symbol
    Minus,
    /// Represents the `*` symbol
    Asterisk,
    /// Represents the `/` symbol
    Slash,
    /// Represents the `%` symbol
    Percent,
    /// Represents the `=` symbol
    Equal,
    /// Represents the `<` symbol
    LessThan,
    /// Represents the `>` symbol
    GreaterThan,

    // Multi-Character Symbols
    /// Represents the `:=` symbol
    Assign,
    /// Represents the `!=` symbol
    NotEqual,
    /// Represents the `<=` symbol
    LessThanOrEqual,
    /// Represents the `>=` symbol
    GreaterThanOrEqual,
}

impl Symbol {
    pub fn is_operator(&self) -> bool {
        matches!(
            self,
            Symbol::Plus | Symbol::Minus | Symbol::Asterisk | Symbol::Slash | Symbol::Percent
        )
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Symbol::Equal
                | Symbol::NotEqual
                | Symbol::LessThan
                | Symbol::GreaterThan
                | Symbol::LessThanOrEqual
                | Symbol::GreaterThanOrEqual
        )
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            Symbol::LParen => "(",
            Symbol::RParen => ")",
            Symbol::Colon => ":",
            Symbol::Comma => ",",
            Symbol::Semicolon => ";",
            Symbol::Plus => "+",
            Symbol::Minus => "-",
            Symbol::Asterisk => "*",
            Symbol::Slash => "/",
            Symbol::Percent => "%",
            Symbol::Equal => "=",
            Symbol::LessThan => "<",
            Symbol::GreaterThan => ">",
            Symbol::Assign => ":=",
            Symbol::NotEqual => "!=",
            Symbol::LessThanOrEqual => "<=",
            Symbol::GreaterThanOrEqual => ">=",
        };
        write!(f, "{symbol}")
    }
}

#[derive(Debug, PartialEq, Hash, Eq, Clone, Copy)]
pub enum Keyword {
    /// Opens the declaration section
    Declare,
    Begin,
    End,
    If,
    Then,
    Else,
    EndIf,
    While,
    Do,
    EndWhile,
    EndDo,
    For,
    From,
    To,
    Downto,
    EndFor,
    Read,
    Write,
}

impl Keyword {
    /// Keywords are matched case-insensitively.
    pub fn lookup(word: &str) -> Option<Self> {
        let keyword = match word.to_ascii_uppercase().as_str() {
            "DECLARE" => Keyword::Declare,
            "BEGIN" => Keyword::Begin,
            "END" => Keyword::End,
            "IF" => Keyword::If,
            "THEN" => Keyword::Then,
            "ELSE" => Keyword::Else,
            "ENDIF" => Keyword::EndIf,
            "WHILE" => Keyword::While,
            "DO" => Keyword::Do,
            "ENDWHILE" => Keyword::EndWhile,
            "ENDDO" => Keyword::EndDo,
            "FOR" => Keyword::For,
            "FROM" => Keyword::From,
            "TO" => Keyword::To,
            "DOWNTO" => Keyword::Downto,
            "ENDFOR" => Keyword::EndFor,
            "READ" => Keyword::Read,
            "WRITE" => Keyword::Write,
            _ => return None,
        };
        Some(keyword)
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", format!("{:?}", self).to_ascii_uppercase())
    }
}
