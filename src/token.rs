//! Lexer for JSON-RNC source text.
//!
//! Produces a lazy stream of positioned tokens ending with a single `Eof`.
//! Whitespace and `#` line comments are dropped; any character that starts
//! no token becomes an `Undef` token so the parser can report it in place.
use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

// ------------------------------- Tokens ----------------------------------- //

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // reserved words
    Integer,
    Number,
    String,
    Boolean,
    Null,
    Start,
    // literals
    Ident,
    StringLit,
    RegexLit,
    NumberLit,
    // punctuation
    Question,
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    OpenParen,
    CloseParen,
    VertBar,
    Equal,
    At,
    Comma,
    Colon,
    Eof,
    Undef,
}

impl TokenKind {
    /// Keyword kinds for the five primitive type names.
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            TokenKind::Integer | TokenKind::Number | TokenKind::String | TokenKind::Boolean | TokenKind::Null
        )
    }

    fn reserved(word: &str) -> Option<TokenKind> {
        match word {
            "integer" => Some(TokenKind::Integer),
            "number" => Some(TokenKind::Number),
            "string" => Some(TokenKind::String),
            "boolean" => Some(TokenKind::Boolean),
            "null" => Some(TokenKind::Null),
            "start" => Some(TokenKind::Start),
            _ => None,
        }
    }

    fn punctuation(c: char) -> Option<TokenKind> {
        let kind = match c {
            '?' => TokenKind::Question,
            '{' => TokenKind::OpenBrace,
            '}' => TokenKind::CloseBrace,
            '[' => TokenKind::OpenBracket,
            ']' => TokenKind::CloseBracket,
            '(' => TokenKind::OpenParen,
            ')' => TokenKind::CloseParen,
            '|' => TokenKind::VertBar,
            '=' => TokenKind::Equal,
            '@' => TokenKind::At,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            _ => return None,
        };
        Some(kind)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// 1-based.
    pub line: usize,
    /// 0-based, in characters from the start of the line.
    pub column: usize,
}

impl Token {
    /// Text with the surrounding delimiters of a string or regex literal removed.
    pub fn unquoted(&self) -> &str {
        match self.kind {
            TokenKind::StringLit | TokenKind::RegexLit if self.text.len() >= 2 => {
                &self.text[1..self.text.len() - 1]
            }
            _ => &self.text,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{}:{}:{}", self.kind, self.text, self.line, self.column)
    }
}

// -------------------------------- Lexer ----------------------------------- //

pub struct Lexer<'a> {
    src: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    line_start: usize,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, chars: src.char_indices().peekable(), line: 1, line_start: 0, done: false }
    }

    fn column_of(&self, offset: usize) -> usize {
        self.src[self.line_start..offset].chars().count()
    }

    fn token(&self, kind: TokenKind, start: usize, end: usize) -> Token {
        Token { kind, text: self.src[start..end].to_string(), line: self.line, column: self.column_of(start) }
    }

    fn end_offset(&mut self) -> usize {
        self.chars.peek().map(|(i, _)| *i).unwrap_or(self.src.len())
    }

    fn skip_trivia(&mut self) {
        while let Some(&(i, c)) = self.chars.peek() {
            match c {
                '\n' => {
                    self.chars.next();
                    self.line += 1;
                    self.line_start = i + 1;
                }
                '#' => {
                    while let Some(&(_, c)) = self.chars.peek() {
                        if c == '\n' { break; }
                        self.chars.next();
                    }
                }
                c if c.is_whitespace() => {
                    self.chars.next();
                }
                _ => break,
            }
        }
    }

    /// Closing delimiter search for quoted strings and regexes; never crosses a newline
    /// for regexes. Returns the offset just past the closing delimiter.
    fn scan_delimited(&self, start: usize, delim: char, escapes: bool) -> Option<usize> {
        let mut it = self.src[start + 1..].char_indices();
        while let Some((i, c)) = it.next() {
            match c {
                '\\' if escapes => {
                    it.next();
                }
                '\n' if !escapes => return None,
                c if c == delim => return Some(start + 1 + i + c.len_utf8()),
                _ => {}
            }
        }
        None
    }

    fn advance_to(&mut self, end: usize) {
        while let Some(&(i, c)) = self.chars.peek() {
            if i >= end { break; }
            if c == '\n' {
                self.line += 1;
                self.line_start = i + 1;
            }
            self.chars.next();
        }
    }

    fn lex_word(&mut self, start: usize) -> Token {
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' { self.chars.next(); } else { break; }
        }
        let end = self.end_offset();
        let kind = TokenKind::reserved(&self.src[start..end]).unwrap_or(TokenKind::Ident);
        self.token(kind, start, end)
    }

    fn lex_number(&mut self, start: usize) -> Token {
        let mut seen_dot = false;
        while let Some(&(_, c)) = self.chars.peek() {
            match c {
                '0'..='9' => {
                    self.chars.next();
                }
                '.' if !seen_dot => {
                    seen_dot = true;
                    self.chars.next();
                }
                _ => break,
            }
        }
        let end = self.end_offset();
        self.token(TokenKind::NumberLit, start, end)
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.done {
            return None;
        }
        self.skip_trivia();
        let Some(&(start, c)) = self.chars.peek() else {
            self.done = true;
            return Some(Token { kind: TokenKind::Eof, text: " ".into(), line: self.line, column: 0 });
        };
        let delimited = match c {
            '"' | '\'' => self.scan_delimited(start, c, true).map(|end| (TokenKind::StringLit, end)),
            '/' => self.scan_delimited(start, '/', false).map(|end| (TokenKind::RegexLit, end)),
            _ => None,
        };
        if let Some((kind, end)) = delimited {
            let token = self.token(kind, start, end);
            self.advance_to(end);
            return Some(token);
        }
        self.chars.next();
        let token = match c {
            '0'..='9' => self.lex_number(start),
            '-' if matches!(self.chars.peek(), Some((_, '0'..='9'))) => self.lex_number(start),
            c if c.is_ascii_alphabetic() || c == '_' => self.lex_word(start),
            c => {
                let kind = TokenKind::punctuation(c).unwrap_or(TokenKind::Undef);
                self.token(kind, start, start + c.len_utf8())
            }
        };
        Some(token)
    }
}

pub fn tokenize(src: &str) -> Lexer<'_> {
    Lexer::new(src)
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).map(|t| t.kind).collect()
    }

    #[test]
    fn reserved_words_and_punctuation() {
        use TokenKind::*;
        assert_eq!(
            kinds("start = {name: string, age?: integer}"),
            vec![Start, Equal, OpenBrace, Ident, Colon, String, Comma, Ident, Question, Colon, Integer, CloseBrace, Eof]
        );
    }

    #[test]
    fn comments_and_whitespace_are_dropped() {
        let toks: Vec<Token> = tokenize("# heading\n  person = null # trailing\n").collect();
        assert_eq!(toks.len(), 4);
        assert_eq!(toks[0].text, "person");
        assert_eq!((toks[0].line, toks[0].column), (2, 2));
        assert_eq!(toks[3].kind, TokenKind::Eof);
    }

    #[test]
    fn quoted_strings_keep_escapes() {
        let toks: Vec<Token> = tokenize(r#"'it\'s' "a\"b""#).collect();
        assert_eq!(toks[0].kind, TokenKind::StringLit);
        assert_eq!(toks[0].unquoted(), r"it\'s");
        assert_eq!(toks[1].unquoted(), r#"a\"b"#);
    }

    #[test]
    fn regex_literal_is_shortest_match_on_one_line() {
        let toks: Vec<Token> = tokenize("/[a-z]+/ /x/").collect();
        assert_eq!(toks[0].kind, TokenKind::RegexLit);
        assert_eq!(toks[0].unquoted(), "[a-z]+");
        assert_eq!(toks[1].unquoted(), "x");
    }

    #[test]
    fn numbers_including_negative_and_decimal() {
        let toks: Vec<Token> = tokenize("10 -3 2.5 7.").collect();
        let texts: Vec<&str> = toks.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["10", "-3", "2.5", "7.", " "]);
        assert!(toks[..4].iter().all(|t| t.kind == TokenKind::NumberLit));
    }

    #[test]
    fn unknown_characters_become_undef() {
        let toks: Vec<Token> = tokenize("a ; b").collect();
        assert_eq!(toks[1].kind, TokenKind::Undef);
        assert_eq!(toks[1].text, ";");
        assert_eq!(toks[1].column, 2);
        assert_eq!(toks[2].kind, TokenKind::Ident);
    }

    #[test]
    fn unterminated_string_yields_undef_quote() {
        let toks: Vec<Token> = tokenize("\"abc").collect();
        assert_eq!(toks[0].kind, TokenKind::Undef);
        assert_eq!(toks[1].kind, TokenKind::Ident);
    }

    #[test]
    fn columns_count_characters_after_multibyte_text() {
        let toks: Vec<Token> = tokenize("'é' x").collect();
        assert_eq!(toks[1].column, 4);
    }

    #[test]
    fn multiline_string_advances_line_counter() {
        let toks: Vec<Token> = tokenize("'a\nb' c").collect();
        assert_eq!(toks[1].line, 2);
        assert_eq!(toks[1].column, 3);
    }

    #[test]
    fn stream_ends_after_single_eof() {
        let mut lexer = tokenize("");
        assert_eq!(lexer.next().map(|t| t.kind), Some(TokenKind::Eof));
        assert!(lexer.next().is_none());
    }
}
