//! Hand-rolled lexer (spec §6 grammar). Scans source text into a flat token
//! stream up front, the way the teacher's own parser tokenises before
//! walking the result (`compiler/src/parser.rs`'s `tokenize`), rather than
//! lexing lazily alongside parsing.

use serotonin_core::error::{Result, SerotoninError, SourceSpan};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    /// An identifier immediately followed by `!` with no intervening
    /// whitespace — a macro invocation name, e.g. `autoperm!`.
    MacroBang(String),
    Number(u8),
    CharLit(u8),
    StringLit(Vec<u8>),
    /// Verbatim BF between backticks.
    BfBlock(String),
    /// Raw, whitespace-preserved text captured between `{` and `}`, handed
    /// to the following `name!` as its macro body.
    BraceText(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Eq,      // ==
    EqQuery, // ==?
    EqBang,  // ==!
    Semi,
    At,       // @
    Question, // ?
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: SourceSpan,
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Lexer {
            chars: src.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn span(&self) -> SourceSpan {
        SourceSpan::new(self.line, self.column)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }
}

/// Tokenise a whole source file. Comments (`#` to end of line) are dropped
/// here, never surfacing as tokens.
pub fn lex(src: &str) -> Result<Vec<Token>> {
    let mut lexer = Lexer::new(src);
    let mut tokens = Vec::new();

    loop {
        skip_whitespace_and_comments(&mut lexer);
        let span = lexer.span();
        let Some(c) = lexer.peek() else {
            tokens.push(Token { kind: TokenKind::Eof, span });
            break;
        };

        let kind = match c {
            '(' => {
                lexer.bump();
                TokenKind::LParen
            }
            ')' => {
                lexer.bump();
                TokenKind::RParen
            }
            '[' => {
                lexer.bump();
                TokenKind::LBracket
            }
            ']' => {
                lexer.bump();
                TokenKind::RBracket
            }
            ';' => {
                lexer.bump();
                TokenKind::Semi
            }
            '@' => {
                lexer.bump();
                TokenKind::At
            }
            '?' => {
                lexer.bump();
                TokenKind::Question
            }
            '=' => lex_eq(&mut lexer, span)?,
            '`' => lex_bf_block(&mut lexer, span)?,
            '{' => lex_brace_text(&mut lexer, span)?,
            '"' => TokenKind::StringLit(lex_string(&mut lexer, span)?),
            '\'' => TokenKind::CharLit(lex_char(&mut lexer, span)?),
            c if c.is_ascii_digit() => lex_number(&mut lexer, span)?,
            c if is_ident_start(c) => lex_ident_or_macro(&mut lexer),
            other => {
                return Err(SerotoninError::lex(
                    format!("unexpected character '{other}'"),
                    Some(span),
                ));
            }
        };

        tokens.push(Token { kind, span });
    }

    Ok(tokens)
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || "+-*/_<>=.".contains(c)
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || "+-*/_<>=.".contains(c)
}

fn skip_whitespace_and_comments(lexer: &mut Lexer<'_>) {
    loop {
        match lexer.peek() {
            Some(c) if c.is_whitespace() => {
                lexer.bump();
            }
            Some('#') => {
                while let Some(c) = lexer.peek() {
                    if c == '\n' {
                        break;
                    }
                    lexer.bump();
                }
            }
            _ => break,
        }
    }
}

fn lex_eq(lexer: &mut Lexer<'_>, span: SourceSpan) -> Result<TokenKind> {
    lexer.bump(); // first '='
    let second = lexer.bump();
    if second != Some('=') {
        return Err(SerotoninError::lex("expected '==' (rule kind marker)", Some(span)));
    }
    match lexer.peek() {
        Some('?') => {
            lexer.bump();
            Ok(TokenKind::EqQuery)
        }
        Some('!') => {
            lexer.bump();
            Ok(TokenKind::EqBang)
        }
        _ => Ok(TokenKind::Eq),
    }
}

fn lex_bf_block(lexer: &mut Lexer<'_>, span: SourceSpan) -> Result<TokenKind> {
    lexer.bump(); // opening backtick
    let mut out = String::new();
    loop {
        match lexer.bump() {
            Some('`') => break,
            Some(c) => {
                if !"+-<>[].,".contains(c) {
                    return Err(SerotoninError::lex(
                        format!("invalid character '{c}' in verbatim BF block"),
                        Some(span),
                    ));
                }
                out.push(c);
            }
            None => {
                return Err(SerotoninError::lex("unterminated verbatim BF block", Some(span)));
            }
        }
    }
    Ok(TokenKind::BfBlock(out))
}

fn lex_brace_text(lexer: &mut Lexer<'_>, span: SourceSpan) -> Result<TokenKind> {
    lexer.bump(); // '{'
    let mut depth = 1usize;
    let mut out = String::new();
    loop {
        match lexer.bump() {
            Some('{') => {
                depth += 1;
                out.push('{');
            }
            Some('}') => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
                out.push('}');
            }
            Some(c) => out.push(c),
            None => return Err(SerotoninError::brace_unclosed(Some(span))),
        }
    }
    Ok(TokenKind::BraceText(out))
}

fn lex_string(lexer: &mut Lexer<'_>, span: SourceSpan) -> Result<Vec<u8>> {
    lexer.bump(); // opening quote
    let mut out = Vec::new();
    loop {
        match lexer.bump() {
            Some('"') => break,
            Some('\\') => out.push(lex_escape(lexer, span)?),
            Some(c) => push_utf8(&mut out, c),
            None => return Err(SerotoninError::lex("unterminated string literal", Some(span))),
        }
    }
    Ok(out)
}

fn lex_char(lexer: &mut Lexer<'_>, span: SourceSpan) -> Result<u8> {
    lexer.bump(); // opening quote
    let byte = match lexer.bump() {
        Some('\\') => lex_escape(lexer, span)?,
        Some(c) => {
            let mut buf = [0u8; 4];
            let bytes = c.encode_utf8(&mut buf).as_bytes();
            if bytes.len() != 1 {
                return Err(SerotoninError::lex(
                    "character literal must be a single byte",
                    Some(span),
                ));
            }
            bytes[0]
        }
        None => return Err(SerotoninError::lex("unterminated character literal", Some(span))),
    };
    match lexer.bump() {
        Some('\'') => Ok(byte),
        _ => Err(SerotoninError::lex("unterminated character literal", Some(span))),
    }
}

fn lex_escape(lexer: &mut Lexer<'_>, span: SourceSpan) -> Result<u8> {
    match lexer.bump() {
        Some('n') => Ok(b'\n'),
        Some('t') => Ok(b'\t'),
        Some('\\') => Ok(b'\\'),
        Some('\'') => Ok(b'\''),
        Some('"') => Ok(b'"'),
        Some('x') => {
            let hi = lexer.bump().ok_or_else(|| SerotoninError::lex("truncated \\x escape", Some(span)))?;
            let lo = lexer.bump().ok_or_else(|| SerotoninError::lex("truncated \\x escape", Some(span)))?;
            let digits: String = [hi, lo].iter().collect();
            u8::from_str_radix(&digits, 16)
                .map_err(|_| SerotoninError::lex(format!("invalid \\x escape '\\x{digits}'"), Some(span)))
        }
        Some(other) => Err(SerotoninError::lex(format!("unknown escape '\\{other}'"), Some(span))),
        None => Err(SerotoninError::lex("truncated escape sequence", Some(span))),
    }
}

fn push_utf8(out: &mut Vec<u8>, c: char) {
    let mut buf = [0u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

fn lex_number(lexer: &mut Lexer<'_>, span: SourceSpan) -> Result<TokenKind> {
    let mut digits = String::new();
    while let Some(c) = lexer.peek() {
        if c.is_ascii_digit() {
            digits.push(c);
            lexer.bump();
        } else {
            break;
        }
    }
    digits
        .parse::<u16>()
        .ok()
        .filter(|n| *n <= 255)
        .map(|n| TokenKind::Number(n as u8))
        .ok_or_else(|| SerotoninError::lex(format!("numeric literal '{digits}' out of range 0..=255"), Some(span)))
}

fn lex_ident_or_macro(lexer: &mut Lexer<'_>) -> TokenKind {
    let mut name = String::new();
    while let Some(c) = lexer.peek() {
        if is_ident_continue(c) {
            name.push(c);
            lexer.bump();
        } else {
            break;
        }
    }
    if lexer.peek() == Some('!') {
        lexer.bump();
        TokenKind::MacroBang(name)
    } else {
        TokenKind::Ident(name)
    }
}
