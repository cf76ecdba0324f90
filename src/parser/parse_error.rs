use crate::cpp::CppError;
use crate::lexer::{FilePos, TokenKind};

use std::{error, fmt};

#[derive(Debug)]
pub enum InnerParseError {
    Cpp(CppError),
    ExpectedButGot(TokenKind, TokenKind),
    ExpectedIdent(TokenKind),
    UnexpectedToken(String),
    UndeclaredIdentifier(String),
    Redefinition(String),
    InvalidTypeSpecifiers,
    MultipleStorageClasses,
    StorageClassInField,
    StorageClassInBlock,
    TypedefFunctionDefinition,
    ParamNameOmitted(String),
    StructParamUnsupported,
    DuplicateField(String),
    IncompleteType(String),
    BadIntLiteral(String),
    BadCharConstant(String),
    FloatUnsupported,
    DerefNonPointer,
    AddrOfNonLvalue,
    NotAssignable,
    SubscriptNonArray,
    NonIntegerSubscript,
    SelectorOnNonStruct,
    ArrowOnNonPointer,
    NoSuchField(String),
    CallOfNonFunction,
    ExpectedArgsCountButGot(usize, usize),
    BadOperands(&'static str),
    BadCast,
    NonScalarCondition,
    NonIntegralSwitch,
    NotConstant(String),
    DuplicateCase(i64),
    MultipleDefaults,
    CaseOutsideSwitch,
    DefaultOutsideSwitch,
    BreakOutsideLoop,
    ContinueOutsideLoop,
    DuplicateLabel(String),
    UnknownLabel(String),
    SizeofRequiresType,
    ArrayOfFunctions,
}

/// A parse or type error with the position it occurred at.
#[derive(Debug)]
pub struct ParseError {
    inner: InnerParseError,
    pos: FilePos,
}

impl ParseError {
    pub fn pos(&self) -> &FilePos {
        &self.pos
    }
}

impl InnerParseError {
    pub(super) fn at(self, pos: FilePos) -> ParseError {
        ParseError { inner: self, pos }
    }
}

impl From<CppError> for ParseError {
    fn from(e: CppError) -> Self {
        let pos = e.pos().clone();
        ParseError {
            inner: InnerParseError::Cpp(e),
            pos,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl fmt::Display for InnerParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use InnerParseError as E;
        match self {
            E::Cpp(e) => write!(f, "{e}"),
            E::ExpectedButGot(expected, got) => {
                write!(f, "expected {expected}, but got {got}")
            }
            E::ExpectedIdent(got) => write!(f, "expected identifier, but got {got}"),
            E::UnexpectedToken(val) => write!(f, "unexpected token {val}"),
            E::UndeclaredIdentifier(name) => write!(f, "{name} is not defined"),
            E::Redefinition(name) => write!(f, "redefinition of {name}"),
            E::InvalidTypeSpecifiers => write!(f, "invalid combination of type specifiers"),
            E::MultipleStorageClasses => {
                write!(f, "more than one storage class in declaration")
            }
            E::StorageClassInField => write!(f, "storage class in struct field"),
            E::StorageClassInBlock => {
                write!(f, "this storage class is not supported at block scope")
            }
            E::TypedefFunctionDefinition => {
                write!(f, "typedef is not allowed on a function definition")
            }
            E::ParamNameOmitted(func) => {
                write!(f, "parameter name omitted in definition of {func}")
            }
            E::StructParamUnsupported => {
                write!(f, "struct parameters passed by value are not supported")
            }
            E::DuplicateField(name) => write!(f, "duplicate field {name}"),
            E::IncompleteType(name) => write!(f, "{name} has incomplete type"),
            E::BadIntLiteral(s) => write!(f, "bad integer literal {s}"),
            E::BadCharConstant(s) => write!(f, "bad character constant {s}"),
            E::FloatUnsupported => {
                write!(f, "floating point arithmetic is not supported")
            }
            E::DerefNonPointer => write!(f, "dereference of a non pointer"),
            E::AddrOfNonLvalue => write!(f, "'&' requires an addressable operand"),
            E::NotAssignable => write!(f, "expression is not assignable"),
            E::SubscriptNonArray => {
                write!(f, "subscript of something that is not an array or pointer")
            }
            E::NonIntegerSubscript => write!(f, "array subscript is not an integer"),
            E::SelectorOnNonStruct => {
                write!(f, "member access on something that is not a struct or union")
            }
            E::ArrowOnNonPointer => {
                write!(f, "'->' on something that is not a pointer to a struct or union")
            }
            E::NoSuchField(name) => write!(f, "no such field {name}"),
            E::CallOfNonFunction => write!(f, "call of something that is not a function"),
            E::ExpectedArgsCountButGot(expected, got) => {
                write!(f, "call with {got} arguments, but {expected} were expected")
            }
            E::BadOperands(op) => write!(f, "invalid operand types for {op}"),
            E::BadCast => write!(f, "invalid cast"),
            E::NonScalarCondition => {
                write!(f, "condition must have scalar type")
            }
            E::NonIntegralSwitch => {
                write!(f, "switch expression must have integer type")
            }
            E::NotConstant(what) => write!(f, "{what} must be a constant expression"),
            E::DuplicateCase(v) => write!(f, "duplicate case {v}"),
            E::MultipleDefaults => write!(f, "more than one default in switch"),
            E::CaseOutsideSwitch => write!(f, "case not inside a switch"),
            E::DefaultOutsideSwitch => write!(f, "default not inside a switch"),
            E::BreakOutsideLoop => {
                write!(f, "break outside of a loop or switch")
            }
            E::ContinueOutsideLoop => write!(f, "continue outside of a loop"),
            E::DuplicateLabel(name) => write!(f, "duplicate label {name}"),
            E::UnknownLabel(name) => write!(f, "goto to undefined label {name}"),
            E::SizeofRequiresType => {
                write!(f, "sizeof requires a parenthesized type")
            }
            E::ArrayOfFunctions => write!(f, "array of functions"),
        }
    }
}

impl error::Error for ParseError {}
