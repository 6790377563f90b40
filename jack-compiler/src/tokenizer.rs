//! Lexer for the Jack language.
//!
//! The whole source is read into memory and scanned by longest match:
//! whitespace and comments are skipped, then a symbol, integer, string
//! or word is consumed. A word that appears in the reserved-word table
//! is a keyword; because the scanner always takes the maximal
//! identifier first, `classify` never lexes as `class` + `ify`.
//!
//! The tokenizer exposes one token of lookahead: [`Tokenizer::advance`]
//! moves to the next token and the typed accessors read the current
//! one, failing when its kind does not match.

use std::fmt;

use phf::phf_map;

/// The 21 reserved words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Class,
    Constructor,
    Function,
    Method,
    Field,
    Static,
    Var,
    Int,
    Char,
    Boolean,
    Void,
    True,
    False,
    Null,
    This,
    Let,
    Do,
    If,
    Else,
    While,
    Return,
}

static KEYWORDS: phf::Map<&'static str, Keyword> = phf_map! {
    "class" => Keyword::Class,
    "constructor" => Keyword::Constructor,
    "function" => Keyword::Function,
    "method" => Keyword::Method,
    "field" => Keyword::Field,
    "static" => Keyword::Static,
    "var" => Keyword::Var,
    "int" => Keyword::Int,
    "char" => Keyword::Char,
    "boolean" => Keyword::Boolean,
    "void" => Keyword::Void,
    "true" => Keyword::True,
    "false" => Keyword::False,
    "null" => Keyword::Null,
    "this" => Keyword::This,
    "let" => Keyword::Let,
    "do" => Keyword::Do,
    "if" => Keyword::If,
    "else" => Keyword::Else,
    "while" => Keyword::While,
    "return" => Keyword::Return,
};

impl Keyword {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Constructor => "constructor",
            Self::Function => "function",
            Self::Method => "method",
            Self::Field => "field",
            Self::Static => "static",
            Self::Var => "var",
            Self::Int => "int",
            Self::Char => "char",
            Self::Boolean => "boolean",
            Self::Void => "void",
            Self::True => "true",
            Self::False => "false",
            Self::Null => "null",
            Self::This => "this",
            Self::Let => "let",
            Self::Do => "do",
            Self::If => "if",
            Self::Else => "else",
            Self::While => "while",
            Self::Return => "return",
        }
    }
}

/// The 19 punctuation characters.
const SYMBOLS: &str = "{}()[].,;+-*/&|<>=~";

/// Largest Jack integer constant.
const MAX_INT: u16 = 32767;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Keyword(Keyword),
    Symbol(char),
    Identifier(String),
    IntConst(u16),
    StringConst(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keyword(k) => write!(f, "{}", k.as_str()),
            Self::Symbol(c) => write!(f, "{c}"),
            Self::Identifier(s) => write!(f, "{s}"),
            Self::IntConst(n) => write!(f, "{n}"),
            Self::StringConst(s) => write!(f, "\"{s}\""),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    /// Character that starts no token.
    UnknownToken(char),
    /// String constant missing its closing quote on the same line.
    UnterminatedString,
    /// `/*` without a matching `*/`.
    UnterminatedComment,
    /// Integer constant above 32767.
    IntOutOfRange(String),
    /// `advance` called with no tokens left.
    UnexpectedEof,
    /// Typed accessor called on a token of a different kind.
    WrongTokenKind {
        expected: &'static str,
        found: String,
    },
}

impl std::error::Error for TokenizeError {}

impl fmt::Display for TokenizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownToken(c) => write!(f, "unrecognized character '{c}'"),
            Self::UnterminatedString => write!(f, "unterminated string constant"),
            Self::UnterminatedComment => write!(f, "unterminated block comment"),
            Self::IntOutOfRange(s) => write!(f, "integer constant {s} out of range (max {MAX_INT})"),
            Self::UnexpectedEof => write!(f, "unexpected end of input"),
            Self::WrongTokenKind { expected, found } => {
                write!(f, "expected {expected}, found \"{found}\"")
            }
        }
    }
}

pub struct Tokenizer {
    source: Vec<char>,
    pos: usize,
    current: Option<Token>,
}

impl Tokenizer {
    #[must_use]
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            pos: 0,
            current: None,
        }
    }

    /// True when another token remains after whitespace and comments.
    pub fn has_more_tokens(&mut self) -> Result<bool, TokenizeError> {
        self.skip_ignored()?;
        Ok(self.pos < self.source.len())
    }

    /// Scans the next token and makes it current.
    pub fn advance(&mut self) -> Result<(), TokenizeError> {
        self.skip_ignored()?;

        let c = *self
            .source
            .get(self.pos)
            .ok_or(TokenizeError::UnexpectedEof)?;

        let token = if SYMBOLS.contains(c) {
            self.pos += 1;
            Token::Symbol(c)
        } else if c.is_ascii_digit() {
            self.scan_int()?
        } else if c == '"' {
            self.scan_string()?
        } else if c == '_' || c.is_ascii_alphabetic() {
            self.scan_word()
        } else {
            return Err(TokenizeError::UnknownToken(c));
        };

        self.current = Some(token);
        Ok(())
    }

    /// The current token, if `advance` has produced one.
    #[must_use]
    pub fn current(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    pub fn keyword(&self) -> Result<Keyword, TokenizeError> {
        match self.current {
            Some(Token::Keyword(k)) => Ok(k),
            _ => Err(self.wrong_kind("a keyword")),
        }
    }

    pub fn symbol(&self) -> Result<char, TokenizeError> {
        match self.current {
            Some(Token::Symbol(c)) => Ok(c),
            _ => Err(self.wrong_kind("a symbol")),
        }
    }

    pub fn identifier(&self) -> Result<&str, TokenizeError> {
        match &self.current {
            Some(Token::Identifier(s)) => Ok(s),
            _ => Err(self.wrong_kind("an identifier")),
        }
    }

    pub fn int_val(&self) -> Result<u16, TokenizeError> {
        match self.current {
            Some(Token::IntConst(n)) => Ok(n),
            _ => Err(self.wrong_kind("an integer constant")),
        }
    }

    pub fn string_val(&self) -> Result<&str, TokenizeError> {
        match &self.current {
            Some(Token::StringConst(s)) => Ok(s),
            _ => Err(self.wrong_kind("a string constant")),
        }
    }

    fn wrong_kind(&self, expected: &'static str) -> TokenizeError {
        TokenizeError::WrongTokenKind {
            expected,
            found: self
                .current
                .as_ref()
                .map_or_else(|| "end of input".to_string(), ToString::to_string),
        }
    }

    /// Skips whitespace, `//` line comments and `/* */` block comments
    /// (including `/** */` doc comments). Block comments do not nest.
    fn skip_ignored(&mut self) -> Result<(), TokenizeError> {
        loop {
            match self.source.get(self.pos) {
                Some(c) if c.is_whitespace() => self.pos += 1,
                Some('/') if self.source.get(self.pos + 1) == Some(&'/') => {
                    while let Some(&c) = self.source.get(self.pos) {
                        self.pos += 1;
                        if c == '\n' {
                            break;
                        }
                    }
                }
                Some('/') if self.source.get(self.pos + 1) == Some(&'*') => {
                    self.pos += 2;
                    loop {
                        match self.source.get(self.pos) {
                            Some('*') if self.source.get(self.pos + 1) == Some(&'/') => {
                                self.pos += 2;
                                break;
                            }
                            Some(_) => self.pos += 1,
                            None => return Err(TokenizeError::UnterminatedComment),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn scan_int(&mut self) -> Result<Token, TokenizeError> {
        let start = self.pos;
        while self
            .source
            .get(self.pos)
            .is_some_and(char::is_ascii_digit)
        {
            self.pos += 1;
        }
        let lexeme: String = self.source[start..self.pos].iter().collect();
        // One past MAX_INT is admitted: 32768 only makes sense under
        // unary minus, where `neg` wraps it to -32768.
        match lexeme.parse::<u16>() {
            Ok(n) if n <= MAX_INT + 1 => Ok(Token::IntConst(n)),
            _ => Err(TokenizeError::IntOutOfRange(lexeme)),
        }
    }

    fn scan_string(&mut self) -> Result<Token, TokenizeError> {
        self.pos += 1; // opening quote
        let start = self.pos;
        loop {
            match self.source.get(self.pos) {
                Some('"') => break,
                Some('\n') | None => return Err(TokenizeError::UnterminatedString),
                Some(_) => self.pos += 1,
            }
        }
        let value: String = self.source[start..self.pos].iter().collect();
        self.pos += 1; // closing quote
        Ok(Token::StringConst(value))
    }

    fn scan_word(&mut self) -> Token {
        let start = self.pos;
        while self
            .source
            .get(self.pos)
            .is_some_and(|c| *c == '_' || c.is_ascii_alphanumeric())
        {
            self.pos += 1;
        }
        let word: String = self.source[start..self.pos].iter().collect();
        match KEYWORDS.get(word.as_str()) {
            Some(&keyword) => Token::Keyword(keyword),
            None => Token::Identifier(word),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(source: &str) -> Result<Vec<Token>, TokenizeError> {
        let mut tokenizer = Tokenizer::new(source);
        let mut tokens = Vec::new();
        while tokenizer.has_more_tokens()? {
            tokenizer.advance()?;
            tokens.push(tokenizer.current().unwrap().clone());
        }
        Ok(tokens)
    }

    #[test]
    fn keywords_symbols_and_identifiers() {
        let tokens = tokenize("class Point { field int x; }").unwrap();
        assert_eq!(
            tokens,
            [
                Token::Keyword(Keyword::Class),
                Token::Identifier("Point".to_string()),
                Token::Symbol('{'),
                Token::Keyword(Keyword::Field),
                Token::Keyword(Keyword::Int),
                Token::Identifier("x".to_string()),
                Token::Symbol(';'),
                Token::Symbol('}'),
            ]
        );
    }

    #[test]
    fn keyword_prefix_is_still_an_identifier() {
        let tokens = tokenize("classify whileTrue do_").unwrap();
        assert_eq!(
            tokens,
            [
                Token::Identifier("classify".to_string()),
                Token::Identifier("whileTrue".to_string()),
                Token::Identifier("do_".to_string()),
            ]
        );
    }

    #[test]
    fn integer_constants() {
        let tokens = tokenize("0 1 32767").unwrap();
        assert_eq!(
            tokens,
            [
                Token::IntConst(0),
                Token::IntConst(1),
                Token::IntConst(32767),
            ]
        );
    }

    #[test]
    fn integer_32768_tokenizes_for_unary_minus() {
        // The bit pattern is already the two's-complement -32768; the
        // engine applies `neg` on top of it.
        assert_eq!(tokenize("32768").unwrap(), [Token::IntConst(32768)]);
    }

    #[test]
    fn integer_above_wraparound_range_is_rejected() {
        assert_eq!(
            tokenize("32769"),
            Err(TokenizeError::IntOutOfRange("32769".to_string()))
        );
    }

    #[test]
    fn string_constants() {
        let tokens = tokenize("\"hello world\" \"\"").unwrap();
        assert_eq!(
            tokens,
            [
                Token::StringConst("hello world".to_string()),
                Token::StringConst(String::new()),
            ]
        );
    }

    #[test]
    fn unterminated_string_is_rejected() {
        assert_eq!(tokenize("\"oops"), Err(TokenizeError::UnterminatedString));
        assert_eq!(
            tokenize("\"line\nbreak\""),
            Err(TokenizeError::UnterminatedString)
        );
    }

    #[test]
    fn comments_are_skipped() {
        let source = "\
// line comment
let /* inline */ x = 1; /** doc
spanning lines */ return;
";
        let tokens = tokenize(source).unwrap();
        assert_eq!(tokens[0], Token::Keyword(Keyword::Let));
        assert_eq!(tokens.last(), Some(&Token::Symbol(';')));
        // let x = 1 ; return ;
        assert_eq!(tokens.len(), 7);
    }

    #[test]
    fn unterminated_block_comment_is_rejected() {
        assert_eq!(
            tokenize("let x; /* dangling"),
            Err(TokenizeError::UnterminatedComment)
        );
    }

    #[test]
    fn unknown_character_is_rejected() {
        assert_eq!(tokenize("let x = #;"), Err(TokenizeError::UnknownToken('#')));
    }

    #[test]
    fn typed_accessors_check_the_kind() {
        let mut tokenizer = Tokenizer::new("class 42");
        tokenizer.advance().unwrap();
        assert_eq!(tokenizer.keyword(), Ok(Keyword::Class));
        assert!(matches!(
            tokenizer.int_val(),
            Err(TokenizeError::WrongTokenKind { .. })
        ));

        tokenizer.advance().unwrap();
        assert_eq!(tokenizer.int_val(), Ok(42));
        assert!(tokenizer.symbol().is_err());
    }
}
