use super::tokens::{Kind, Token, KEYWORDS};
use crate::common::{Cursor, Span, EOF_CHAR};

/// Segments a Jack source buffer into classified tokens. Whitespace, `// ...`
/// line comments and `/* ... */` block comments (doc comments included) are
/// consumed between tokens and never surface. Block comments do not nest.
pub struct Tokenizer<'a> {
    src: &'a str,
    cursor: Cursor<'a>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(src: &'a str) -> Tokenizer<'a> {
        Tokenizer {
            src,
            cursor: Cursor::new(src),
        }
    }

    pub fn next_token(&mut self) -> Token<'a> {
        if let Err(token) = self.eat_trivia() {
            return token;
        }

        let start = self.cursor.pos;
        match self.cursor.c {
            c if symbol_char(c) => self.tokenize_symbol(),
            '0'..='9' => self.tokenize_int_constant(),
            '"' => self.tokenize_string_constant(),
            c if ident_start_char(c) => self.tokenize_keyword_or_identifier(),
            EOF_CHAR => Token::eof(start),
            _ => {
                self.cursor.advance();
                Token::invalid(
                    &self.src[start..self.cursor.pos],
                    Span::new(start, self.cursor.pos),
                )
            }
        }
    }

    /// Consumes any run of whitespace and comments before the next token.
    /// An unterminated block comment is returned as the `Invalid` token it
    /// becomes, since no token boundary can follow it.
    fn eat_trivia(&mut self) -> Result<(), Token<'a>> {
        loop {
            if self.cursor.c.is_whitespace() {
                self.cursor.advance();
            } else if self.cursor.c == '/' && self.cursor.peek() == '/' {
                self.cursor.eat_while(|c| c != '\n');
            } else if self.cursor.c == '/' && self.cursor.peek() == '*' {
                self.eat_block_comment()?;
            } else {
                return Ok(());
            }
        }
    }

    fn eat_block_comment(&mut self) -> Result<(), Token<'a>> {
        let start = self.cursor.pos;
        self.cursor.advance();
        self.cursor.advance();

        while !(self.cursor.c == '*' && self.cursor.peek() == '/') && self.cursor.c != EOF_CHAR {
            self.cursor.advance();
        }

        if self.cursor.c == EOF_CHAR {
            return Err(Token::invalid(
                &self.src[start..self.cursor.pos],
                Span::new(start, self.cursor.pos),
            ));
        }

        // Consume the closing `*/`
        self.cursor.advance();
        self.cursor.advance();
        Ok(())
    }

    fn tokenize_symbol(&mut self) -> Token<'a> {
        let span = Span::new(self.cursor.pos, self.cursor.pos + 1);
        self.cursor.advance();
        Token {
            kind: Kind::Symbol(&self.src[span.start..span.end]),
            span,
        }
    }

    fn tokenize_int_constant(&mut self) -> Token<'a> {
        let span = self.cursor.eat_while(|c| c.is_ascii_digit());
        Token {
            kind: Kind::IntConst(&self.src[span.start..span.end]),
            span,
        }
    }

    fn tokenize_string_constant(&mut self) -> Token<'a> {
        let start = self.cursor.pos;
        self.cursor.advance();

        self.cursor.eat_while(|c| c != '"' && c != '\n');

        // A newline or end of input before the closing quote makes the whole
        // run invalid; string constants have no escape sequences to recover
        // through.
        if self.cursor.c != '"' {
            return Token::invalid(
                &self.src[start..self.cursor.pos],
                Span::new(start, self.cursor.pos),
            );
        }

        self.cursor.advance();
        let span = Span::new(start, self.cursor.pos);
        // Quotes are not part of the token literal
        let literal = &self.src[span.start + 1..span.end - 1];
        Token {
            kind: Kind::StrConst(literal),
            span,
        }
    }

    fn tokenize_keyword_or_identifier(&mut self) -> Token<'a> {
        let span = self.cursor.eat_while(ident_char);
        let literal = &self.src[span.start..span.end];
        let kind = if KEYWORDS.contains(literal) {
            Kind::Keyword(literal)
        } else {
            Kind::Ident(literal)
        };
        Token { kind, span }
    }
}

fn ident_start_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn symbol_char(c: char) -> bool {
    matches!(
        c,
        '(' | ')'
            | '['
            | ']'
            | '{'
            | '}'
            | '.'
            | ','
            | ';'
            | '+'
            | '-'
            | '*'
            | '/'
            | '&'
            | '|'
            | '<'
            | '>'
            | '='
            | '~'
    )
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_token() {
            Token {
                kind: Kind::EOF, ..
            } => None,
            token => Some(token),
        }
    }
}
