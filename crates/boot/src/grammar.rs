use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Word(String),
    QuotedString(String),
    LBrace,
    RBrace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

fn err(line: usize, column: usize, message: impl Into<String>) -> SyntaxError {
    SyntaxError {
        line,
        column,
        message: message.into(),
    }
}

/// Tokenizes the line-oriented grammar: keywords and bare words, quoted
/// strings with no embedded newlines, and brace tokens. Whitespace, blank
/// lines, and `#`-comments are skipped.
pub fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut tokens = Vec::new();

    for (line_idx, raw_line) in source.lines().enumerate() {
        let line = line_idx + 1;
        let chars: Vec<char> = raw_line.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];

            if c.is_whitespace() {
                i += 1;
                continue;
            }

            if c == '#' {
                break;
            }

            let column = i + 1;

            if c == '{' {
                tokens.push(Token {
                    kind: TokenKind::LBrace,
                    line,
                    column,
                });
                i += 1;
                continue;
            }

            if c == '}' {
                tokens.push(Token {
                    kind: TokenKind::RBrace,
                    line,
                    column,
                });
                i += 1;
                continue;
            }

            if c == '"' {
                let mut value = String::new();
                i += 1;
                let mut closed = false;
                while i < chars.len() {
                    if chars[i] == '"' {
                        closed = true;
                        i += 1;
                        break;
                    }
                    value.push(chars[i]);
                    i += 1;
                }
                if !closed {
                    return Err(err(line, column, "unterminated quoted string"));
                }
                tokens.push(Token {
                    kind: TokenKind::QuotedString(value),
                    line,
                    column,
                });
                continue;
            }

            let start = i;
            while i < chars.len()
                && !chars[i].is_whitespace()
                && chars[i] != '{'
                && chars[i] != '}'
                && chars[i] != '#'
            {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            tokens.push(Token {
                kind: TokenKind::Word(word),
                line,
                column,
            });
        }
    }

    Ok(tokens)
}

pub struct TokenStream {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenStream {
    pub fn new(tokens: Vec<Token>) -> Self {
        TokenStream { tokens, pos: 0 }
    }

    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    pub fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn last_position(&self) -> (usize, usize) {
        self.tokens
            .last()
            .map(|t| (t.line, t.column))
            .unwrap_or((1, 1))
    }

    pub fn expect_word(&mut self) -> Result<(String, usize, usize), SyntaxError> {
        match self.advance() {
            Some(Token {
                kind: TokenKind::Word(w),
                line,
                column,
            }) => Ok((w, line, column)),
            Some(t) => Err(err(t.line, t.column, "expected a bare word")),
            None => {
                let (line, column) = self.last_position();
                Err(err(line, column, "unexpected end of input, expected a word"))
            }
        }
    }

    pub fn expect_value(&mut self) -> Result<(String, usize, usize), SyntaxError> {
        match self.advance() {
            Some(Token {
                kind: TokenKind::Word(w),
                line,
                column,
            }) => Ok((w, line, column)),
            Some(Token {
                kind: TokenKind::QuotedString(s),
                line,
                column,
            }) => Ok((s, line, column)),
            Some(t) => Err(err(t.line, t.column, "expected a value")),
            None => {
                let (line, column) = self.last_position();
                Err(err(line, column, "unexpected end of input, expected a value"))
            }
        }
    }

    pub fn expect_lbrace(&mut self) -> Result<(), SyntaxError> {
        match self.advance() {
            Some(Token {
                kind: TokenKind::LBrace,
                ..
            }) => Ok(()),
            Some(t) => Err(err(t.line, t.column, "expected '{'")),
            None => {
                let (line, column) = self.last_position();
                Err(err(line, column, "unexpected end of input, expected '{'"))
            }
        }
    }

    pub fn at_rbrace(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token {
                kind: TokenKind::RBrace,
                ..
            })
        )
    }

    pub fn consume_rbrace(&mut self) -> Result<(), SyntaxError> {
        match self.advance() {
            Some(Token {
                kind: TokenKind::RBrace,
                ..
            }) => Ok(()),
            Some(t) => Err(err(t.line, t.column, "expected '}'")),
            None => {
                let (line, column) = self.last_position();
                Err(err(line, column, "unexpected end of input, expected '}'"))
            }
        }
    }
}
