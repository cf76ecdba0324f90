mod cursor;
pub mod hideset;
#[cfg(test)]
mod hideset_tests;
mod lexer_error;
#[cfg(test)]
mod lexer_tests;
mod token;

use cursor::Cursor;
pub use hideset::HideSet;
pub use lexer_error::{InnerLexError, LexError};
pub use token::{keyword_lookup, FilePos, Token, TokenKind};

use std::collections::VecDeque;
use std::rc::Rc;

/// Pull-based lexer over a single source buffer.
///
/// No preprocessing is done here; this is pure tokenization of the raw
/// file contents. Directive structure is surfaced as pseudo tokens
/// ([`TokenKind::Directive`], [`TokenKind::EndDirective`],
/// [`TokenKind::Header`], [`TokenKind::FunclikeDefine`]) so the
/// preprocessor never has to re-scan text.
pub struct Lexer {
    cursor: Cursor,
    pending: VecDeque<Token>,
    /// At the beginning of a line, not counting whitespace.
    bol: bool,
    /// Currently inside a `#` directive line.
    in_directive: bool,
    done: bool,
    marked: FilePos,
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

fn is_ident_tail(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit() || c == '$'
}

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\r' | '\n' | '\t' | '\x0c')
}

impl Lexer {
    pub fn new(file: impl Into<Rc<str>>, source: &str) -> Self {
        let file = file.into();
        let cursor = Cursor::new(Rc::clone(&file), source);
        let marked = FilePos::start_of(file);
        Self {
            cursor,
            pending: VecDeque::new(),
            bol: true,
            in_directive: false,
            done: false,
            marked,
        }
    }

    /// Returns the next token, or a positioned lexical error. After an
    /// error has been reported every subsequent call yields `Eof`.
    pub fn next(&mut self) -> Result<Token, LexError> {
        loop {
            if let Some(t) = self.pending.pop_front() {
                return Ok(t);
            }
            if self.done {
                return Ok(Token::new(TokenKind::Eof, "", self.cursor.pos()));
            }
            if let Err(e) = self.lex_one() {
                self.done = true;
                self.pending.clear();
                return Err(e);
            }
        }
    }

    fn push(&mut self, kind: TokenKind, val: impl Into<String>) {
        self.push_at(self.marked.clone(), kind, val);
    }

    fn push_at(&mut self, pos: FilePos, kind: TokenKind, val: impl Into<String>) {
        if kind != TokenKind::EndDirective {
            self.bol = false;
        }
        self.pending.push_back(Token::new(kind, val, pos));
    }

    fn err(&self, inner: InnerLexError) -> LexError {
        inner.at(self.cursor.pos())
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.cursor.peek() {
            if !is_space(c) {
                break;
            }
            self.cursor.take();
            if c == '\n' {
                self.bol = true;
                if self.in_directive {
                    self.in_directive = false;
                    let pos = self.cursor.pos();
                    self.push_at(pos, TokenKind::EndDirective, "");
                }
            }
        }
    }

    fn lex_one(&mut self) -> Result<(), LexError> {
        self.skip_whitespace();
        if !self.pending.is_empty() {
            return Ok(());
        }
        self.marked = self.cursor.pos();
        let Some(first) = self.cursor.take() else {
            if self.in_directive {
                self.in_directive = false;
                self.push(TokenKind::EndDirective, "");
            }
            self.push(TokenKind::Eof, "");
            self.done = true;
            return Ok(());
        };
        use TokenKind::*;
        match first {
            c if is_ident_start(c) => self.read_ident(c),
            c if c.is_ascii_digit() => self.read_number(c, false)?,
            '#' => {
                if self.bol {
                    self.read_directive()?;
                } else {
                    self.push(Hash, "#");
                }
            }
            '\'' => self.read_char_constant()?,
            '"' => self.read_string()?,
            '(' => self.push(Lparen, "("),
            ')' => self.push(Rparen, ")"),
            '[' => self.push(Lbrack, "["),
            ']' => self.push(Rbrack, "]"),
            '{' => self.push(Lbrace, "{"),
            '}' => self.push(Rbrace, "}"),
            ',' => self.push(Comma, ","),
            ';' => self.push(Semicolon, ";"),
            ':' => self.push(Colon, ":"),
            '?' => self.push(Question, "?"),
            '~' => self.push(BNot, "~"),
            '.' => match self.cursor.peek() {
                Some(c) if c.is_ascii_digit() => self.read_number('.', true)?,
                Some('.') => {
                    self.cursor.take();
                    if self.cursor.peek() == Some('.') {
                        self.cursor.take();
                        self.push(Ellipsis, "...");
                    } else {
                        self.cursor.unread();
                        self.push(Period, ".");
                    }
                }
                _ => self.push(Period, "."),
            },
            '+' => match self.cursor.peek() {
                Some('+') => {
                    self.cursor.take();
                    self.push(Inc, "++");
                }
                Some('=') => {
                    self.cursor.take();
                    self.push(AddAssign, "+=");
                }
                _ => self.push(Add, "+"),
            },
            '-' => match self.cursor.peek() {
                Some('>') => {
                    self.cursor.take();
                    self.push(Arrow, "->");
                }
                Some('-') => {
                    self.cursor.take();
                    self.push(Dec, "--");
                }
                Some('=') => {
                    self.cursor.take();
                    self.push(SubAssign, "-=");
                }
                _ => self.push(Sub, "-"),
            },
            '*' => {
                if self.cursor.peek() == Some('=') {
                    self.cursor.take();
                    self.push(MulAssign, "*=");
                } else {
                    self.push(Mul, "*");
                }
            }
            '%' => {
                if self.cursor.peek() == Some('=') {
                    self.cursor.take();
                    self.push(RemAssign, "%=");
                } else {
                    self.push(Rem, "%");
                }
            }
            '^' => {
                if self.cursor.peek() == Some('=') {
                    self.cursor.take();
                    self.push(XorAssign, "^=");
                } else {
                    self.push(Xor, "^");
                }
            }
            '=' => {
                if self.cursor.peek() == Some('=') {
                    self.cursor.take();
                    self.push(Eql, "==");
                } else {
                    self.push(Assign, "=");
                }
            }
            '!' => {
                if self.cursor.peek() == Some('=') {
                    self.cursor.take();
                    self.push(Neq, "!=");
                } else {
                    self.push(Not, "!");
                }
            }
            '&' => match self.cursor.peek() {
                Some('&') => {
                    self.cursor.take();
                    self.push(LAnd, "&&");
                }
                Some('=') => {
                    self.cursor.take();
                    self.push(AndAssign, "&=");
                }
                _ => self.push(And, "&"),
            },
            '|' => match self.cursor.peek() {
                Some('|') => {
                    self.cursor.take();
                    self.push(LOr, "||");
                }
                Some('=') => {
                    self.cursor.take();
                    self.push(OrAssign, "|=");
                }
                _ => self.push(Or, "|"),
            },
            '<' => match self.cursor.peek() {
                Some('<') => {
                    self.cursor.take();
                    if self.cursor.peek() == Some('=') {
                        self.cursor.take();
                        self.push(ShlAssign, "<<=");
                    } else {
                        self.push(Shl, "<<");
                    }
                }
                Some('=') => {
                    self.cursor.take();
                    self.push(Leq, "<=");
                }
                _ => self.push(Lss, "<"),
            },
            '>' => match self.cursor.peek() {
                Some('>') => {
                    self.cursor.take();
                    if self.cursor.peek() == Some('=') {
                        self.cursor.take();
                        self.push(ShrAssign, ">>=");
                    } else {
                        self.push(Shr, ">>");
                    }
                }
                Some('=') => {
                    self.cursor.take();
                    self.push(Geq, ">=");
                }
                _ => self.push(Gtr, ">"),
            },
            '\\' => {
                if self.cursor.peek() == Some('\n') {
                    self.cursor.take();
                    self.bol = true;
                } else {
                    return Err(self.err(InnerLexError::MisplacedBackslash));
                }
            }
            '/' => match self.cursor.peek() {
                Some('*') => {
                    self.cursor.take();
                    self.skip_block_comment()?;
                }
                Some('/') => {
                    self.cursor.take();
                    while let Some(c) = self.cursor.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.cursor.take();
                    }
                }
                Some('=') => {
                    self.cursor.take();
                    self.push(QuoAssign, "/=");
                }
                _ => self.push(Quo, "/"),
            },
            c => return Err(InnerLexError::BadChar(c).at(self.marked.clone())),
        }
        Ok(())
    }

    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        loop {
            let Some(c) = self.cursor.take() else {
                return Err(self.err(InnerLexError::UnclosedComment));
            };
            if c == '\n' {
                self.bol = true;
            }
            if c == '*' {
                let Some(close) = self.cursor.take() else {
                    return Err(self.err(InnerLexError::UnclosedComment));
                };
                if close == '/' {
                    return Ok(());
                }
                // put it back so newlines are not lost
                self.cursor.unread();
            }
        }
    }

    fn read_ident(&mut self, first: char) {
        let mut buf = String::new();
        buf.push(first);
        while let Some(c) = self.cursor.take() {
            if is_ident_tail(c) {
                buf.push(c);
            } else {
                self.cursor.unread();
                break;
            }
        }
        let kind = keyword_lookup(&buf).unwrap_or(TokenKind::Ident);
        self.push(kind, buf);
    }

    fn read_number(&mut self, first: char, started_with_period: bool) -> Result<(), LexError> {
        enum State {
            Second,
            Dec,
            Hex,
            IntTail,
            FloatStart,
            FloatAfterE,
            FloatAfterESign,
            FloatTail,
        }
        use State::*;
        let mut buf = String::new();
        buf.push(first);
        let mut kind = TokenKind::IntConstant;
        let mut state = if started_with_period {
            kind = TokenKind::FloatConstant;
            FloatStart
        } else {
            Second
        };
        let bad_int = |buf: &str, pos: FilePos| InnerLexError::BadIntConstant(buf.to_owned()).at(pos);
        let bad_float =
            |buf: &str, pos: FilePos| InnerLexError::BadFloatConstant(buf.to_owned()).at(pos);
        loop {
            let Some(r) = self.cursor.take() else { break };
            match state {
                Second => {
                    if r == 'x' || r == 'X' {
                        state = Hex;
                        buf.push(r);
                    } else if r.is_ascii_digit() {
                        state = Dec;
                        buf.push(r);
                    } else if r == 'e' || r == 'E' {
                        state = FloatAfterE;
                        kind = TokenKind::FloatConstant;
                        buf.push(r);
                    } else if r == '.' {
                        state = FloatStart;
                        kind = TokenKind::FloatConstant;
                        buf.push(r);
                    } else if matches!(r, 'l' | 'L' | 'u' | 'U') {
                        state = IntTail;
                        buf.push(r);
                    } else if is_ident_start(r) {
                        return Err(bad_int(&buf, self.cursor.pos()));
                    } else {
                        self.cursor.unread();
                        break;
                    }
                }
                Dec => {
                    if r.is_ascii_digit() {
                        buf.push(r);
                    } else if matches!(r, 'l' | 'L' | 'u' | 'U') {
                        state = IntTail;
                        buf.push(r);
                    } else if r == 'e' || r == 'E' {
                        state = FloatAfterE;
                        kind = TokenKind::FloatConstant;
                        buf.push(r);
                    } else if r == '.' {
                        state = FloatStart;
                        kind = TokenKind::FloatConstant;
                        buf.push(r);
                    } else if is_ident_start(r) {
                        return Err(bad_int(&buf, self.cursor.pos()));
                    } else {
                        self.cursor.unread();
                        break;
                    }
                }
                Hex => {
                    if r.is_ascii_hexdigit() {
                        buf.push(r);
                    } else if matches!(r, 'l' | 'L' | 'u' | 'U') {
                        state = IntTail;
                        buf.push(r);
                    } else if is_ident_start(r) {
                        return Err(bad_int(&buf, self.cursor.pos()));
                    } else {
                        self.cursor.unread();
                        break;
                    }
                }
                IntTail => {
                    if matches!(r, 'l' | 'L' | 'u' | 'U') {
                        buf.push(r);
                    } else if is_ident_start(r) {
                        return Err(bad_int(&buf, self.cursor.pos()));
                    } else {
                        self.cursor.unread();
                        break;
                    }
                }
                FloatStart => {
                    if r.is_ascii_digit() {
                        buf.push(r);
                    } else if r == 'e' || r == 'E' {
                        state = FloatAfterE;
                        buf.push(r);
                    } else if matches!(r, 'f' | 'F' | 'l' | 'L') {
                        state = FloatTail;
                        buf.push(r);
                    } else if is_ident_start(r) {
                        return Err(bad_float(&buf, self.cursor.pos()));
                    } else {
                        self.cursor.unread();
                        break;
                    }
                }
                FloatAfterE => {
                    if r == '+' || r == '-' || r.is_ascii_digit() {
                        state = FloatAfterESign;
                        buf.push(r);
                    } else {
                        return Err(bad_float(&buf, self.cursor.pos()));
                    }
                }
                FloatAfterESign => {
                    if r.is_ascii_digit() {
                        buf.push(r);
                    } else if matches!(r, 'f' | 'F' | 'l' | 'L') {
                        state = FloatTail;
                        buf.push(r);
                    } else if is_ident_start(r) {
                        return Err(bad_float(&buf, self.cursor.pos()));
                    } else {
                        self.cursor.unread();
                        break;
                    }
                }
                FloatTail => {
                    if matches!(r, 'f' | 'F' | 'l' | 'L') {
                        buf.push(r);
                    } else if is_ident_start(r) {
                        return Err(bad_float(&buf, self.cursor.pos()));
                    } else {
                        self.cursor.unread();
                        break;
                    }
                }
            }
        }
        self.push(kind, buf);
        Ok(())
    }

    /// Reads a string or character literal. The delimiters stay in the
    /// value and escape sequences are preserved literally; interpreting
    /// them is the parser's job. A backslash-newline continues the
    /// literal without inserting anything.
    fn read_quoted(
        &mut self,
        terminator: char,
        unterminated: InnerLexError,
    ) -> Result<String, LexError> {
        let mut buf = String::new();
        buf.push(terminator);
        loop {
            let Some(c) = self.cursor.take() else {
                return Err(unterminated.at(self.marked.clone()));
            };
            if c == '\\' {
                let Some(esc) = self.cursor.take() else {
                    return Err(unterminated.at(self.marked.clone()));
                };
                match esc {
                    '\r' => {}
                    '\n' => self.bol = true,
                    _ => {
                        buf.push('\\');
                        buf.push(esc);
                    }
                }
            } else if c == terminator {
                buf.push(c);
                return Ok(buf);
            } else {
                buf.push(c);
            }
        }
    }

    fn read_string(&mut self) -> Result<(), LexError> {
        let val = self.read_quoted('"', InnerLexError::UnterminatedString)?;
        self.push(TokenKind::StringLit, val);
        Ok(())
    }

    fn read_char_constant(&mut self) -> Result<(), LexError> {
        let val = self.read_quoted('\'', InnerLexError::UnterminatedChar)?;
        self.push(TokenKind::CharConstant, val);
        Ok(())
    }

    fn read_directive(&mut self) -> Result<(), LexError> {
        let directive_line = self.cursor.pos().line;
        self.skip_whitespace();
        if self.cursor.pos().line != directive_line {
            // a lone `#` on its own line is silently dropped
            return Ok(());
        }
        let Some(first) = self.cursor.take() else {
            return Err(self.err(InnerLexError::EofInDirective));
        };
        if !first.is_ascii_alphabetic() {
            // not a directive after all; the parser will complain about
            // whatever comes next
            self.cursor.unread();
            return Ok(());
        }
        self.in_directive = true;
        let mut name = String::new();
        name.push(first);
        while let Some(c) = self.cursor.take() {
            if c.is_ascii_alphabetic() {
                name.push(c);
            } else {
                self.cursor.unread();
                break;
            }
        }
        self.push(TokenKind::Directive, name.clone());
        match name.as_str() {
            "include" => self.read_header()?,
            "define" => self.read_define_tail()?,
            _ => {}
        }
        Ok(())
    }

    /// After `#define`, reads the macro name and distinguishes a
    /// function-like macro (a `(` with no intervening space) from a
    /// regular one.
    fn read_define_tail(&mut self) -> Result<(), LexError> {
        let line = self.cursor.pos().line;
        self.skip_whitespace();
        if self.cursor.pos().line != line {
            return Err(self.err(InnerLexError::NoIdentAfterDefine));
        }
        self.marked = self.cursor.pos();
        let Some(first) = self.cursor.take() else {
            return Err(self.err(InnerLexError::NoIdentAfterDefine));
        };
        if !is_ident_start(first) {
            return Err(self.err(InnerLexError::NoIdentAfterDefine));
        }
        self.read_ident(first);
        match self.cursor.take() {
            Some('(') => {
                self.push(TokenKind::FunclikeDefine, "");
                self.cursor.unread();
            }
            Some(_) => self.cursor.unread(),
            None => {}
        }
        Ok(())
    }

    fn read_header(&mut self) -> Result<(), LexError> {
        let line = self.cursor.pos().line;
        self.skip_whitespace();
        if self.cursor.pos().line != line {
            return Err(self.err(InnerLexError::NoHeaderAfterInclude));
        }
        self.marked = self.cursor.pos();
        let terminator = match self.cursor.take() {
            Some('"') => '"',
            Some('<') => '>',
            _ => return Err(self.err(InnerLexError::BadHeaderStart)),
        };
        let mut buf = String::new();
        buf.push(if terminator == '>' { '<' } else { '"' });
        loop {
            let Some(c) = self.cursor.take() else {
                return Err(self.err(InnerLexError::EofInHeader));
            };
            if c == '\n' {
                return Err(self.err(InnerLexError::NewlineInHeader));
            }
            buf.push(c);
            if c == terminator {
                break;
            }
        }
        self.push(TokenKind::Header, buf);
        Ok(())
    }
}
