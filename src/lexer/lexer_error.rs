use super::token::FilePos;

use std::{error, fmt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InnerLexError {
    BadChar(char),
    MisplacedBackslash,
    UnclosedComment,
    BadIntConstant(String),
    BadFloatConstant(String),
    UnterminatedString,
    UnterminatedChar,
    EofInDirective,
    NoIdentAfterDefine,
    NoHeaderAfterInclude,
    BadHeaderStart,
    NewlineInHeader,
    EofInHeader,
}

/// A lexical error with the position it occurred at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    inner: InnerLexError,
    pos: FilePos,
}

impl LexError {
    pub fn pos(&self) -> &FilePos {
        &self.pos
    }
}

impl InnerLexError {
    pub(super) fn at(self, pos: FilePos) -> LexError {
        LexError { inner: self, pos }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl fmt::Display for InnerLexError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::BadChar(c) => write!(f, "unexpected character {c:?}"),
            Self::MisplacedBackslash => write!(f, "misplaced '\\'"),
            Self::UnclosedComment => write!(f, "unclosed comment"),
            Self::BadIntConstant(s) => write!(f, "invalid integer constant {s}"),
            Self::BadFloatConstant(s) => write!(f, "invalid floating point constant {s}"),
            Self::UnterminatedString => write!(f, "end of file in string literal"),
            Self::UnterminatedChar => write!(f, "end of file in character literal"),
            Self::EofInDirective => write!(f, "end of file in directive"),
            Self::NoIdentAfterDefine => write!(f, "no identifier after #define"),
            Self::NoHeaderAfterInclude => write!(f, "no header after #include"),
            Self::BadHeaderStart => write!(f, "bad start to header include"),
            Self::NewlineInHeader => write!(f, "new line in header include"),
            Self::EofInHeader => write!(f, "end of file in header include"),
        }
    }
}

impl error::Error for LexError {}
impl error::Error for InnerLexError {}
