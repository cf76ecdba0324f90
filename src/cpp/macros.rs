use super::cpp_error::InnerCppError;
use crate::lexer::Token;

use std::collections::HashMap;

/// A `#define NAME …` replacement sequence.
#[derive(Debug, Clone)]
pub struct ObjMacro {
    pub tokens: Vec<Token>,
}

impl ObjMacro {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }
}

/// A `#define NAME(a, b) …` macro: the formal parameter names mapped to
/// their zero-based positions, plus the replacement sequence.
#[derive(Debug, Clone)]
pub struct FuncMacro {
    params: HashMap<String, usize>,
    pub nargs: usize,
    pub tokens: Vec<Token>,
}

impl FuncMacro {
    /// `params` must be identifier tokens; duplicate formals are an error.
    pub fn new(params: &[Token], tokens: Vec<Token>) -> Result<Self, InnerCppError> {
        let mut map = HashMap::new();
        for (idx, p) in params.iter().enumerate() {
            if map.insert(p.val.clone(), idx).is_some() {
                return Err(InnerCppError::DuplicateMacroParam(p.val.clone()));
            }
        }
        Ok(Self {
            nargs: params.len(),
            params: map,
            tokens,
        })
    }

    /// Position of `tok` in the formal parameter list, if it names one.
    pub fn param_index(&self, tok: &Token) -> Option<usize> {
        self.params.get(&tok.val).copied()
    }
}
