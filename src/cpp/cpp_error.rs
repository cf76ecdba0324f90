use crate::lexer::{FilePos, LexError, TokenKind};

use std::{error, fmt};

#[derive(Debug)]
pub enum InnerCppError {
    Lex(LexError),
    UnknownDirective(String),
    StrayEndif,
    UnclosedConditional,
    TokenAfterEndif,
    ExpectedNewline(String),
    MacroRedefinition(String),
    DuplicateMacroParam(String),
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    EofInMacroArgs,
    ExpectedMacroName(TokenKind),
    ExpectedMacroParam(TokenKind),
    BadMacroParamList(TokenKind),
    UndefOfUndefined(String),
    ExpectedHeader(TokenKind),
    IncludeFailed(String, String),
    IncludeDepthExceeded,
    ExpectedMessageString(TokenKind),
    ErrorDirective(String),
    BadIfExpr(String),
}

/// A preprocessing error with the position it occurred at.
#[derive(Debug)]
pub struct CppError {
    inner: InnerCppError,
    pos: FilePos,
}

impl CppError {
    pub fn pos(&self) -> &FilePos {
        &self.pos
    }
}

impl InnerCppError {
    pub(super) fn at(self, pos: FilePos) -> CppError {
        CppError { inner: self, pos }
    }
}

impl From<LexError> for CppError {
    fn from(e: LexError) -> Self {
        let pos = e.pos().clone();
        CppError {
            inner: InnerCppError::Lex(e),
            pos,
        }
    }
}

impl fmt::Display for CppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl fmt::Display for InnerCppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use InnerCppError as E;
        match self {
            E::Lex(e) => write!(f, "{e}"),
            E::UnknownDirective(name) => write!(f, "unknown directive #{name}"),
            E::StrayEndif => write!(f, "stray #endif"),
            E::UnclosedConditional => write!(f, "unclosed preprocessor conditional"),
            E::TokenAfterEndif => write!(f, "unexpected token after #endif"),
            E::ExpectedNewline(dir) => write!(f, "expected newline after #{dir}"),
            E::MacroRedefinition(name) => write!(f, "macro redefinition {name}"),
            E::DuplicateMacroParam(name) => {
                write!(f, "duplicate macro parameter {name}")
            }
            E::ArityMismatch {
                name,
                expected,
                got,
            } => write!(
                f,
                "macro {name} invoked with {got} arguments but {expected} were expected"
            ),
            E::EofInMacroArgs => write!(f, "end of file while reading macro arguments"),
            E::ExpectedMacroName(k) => write!(f, "#define expected an identifier, but got {k}"),
            E::ExpectedMacroParam(k) => write!(f, "expected macro parameter, but got {k}"),
            E::BadMacroParamList(k) => {
                write!(f, "in macro parameter list expected ',' or ')', but got {k}")
            }
            E::UndefOfUndefined(name) => {
                write!(f, "cannot undefine {name}, not defined")
            }
            E::ExpectedHeader(k) => write!(f, "expected a header, but got {k}"),
            E::IncludeFailed(header, err) => {
                write!(f, "error during include of {header}: {err}")
            }
            E::IncludeDepthExceeded => write!(f, "maximum include depth exceeded"),
            E::ExpectedMessageString(k) => write!(f, "expected a string, but got {k}"),
            E::ErrorDirective(msg) => write!(f, "#error {msg}"),
            E::BadIfExpr(msg) => write!(f, "bad #if expression: {msg}"),
        }
    }
}

impl error::Error for CppError {}
