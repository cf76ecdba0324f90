mod cpp_error;
#[cfg(test)]
mod cpp_tests;
pub mod expr;
#[cfg(test)]
mod expr_tests;
mod include;
mod macros;

pub use cpp_error::{CppError, InnerCppError};
pub use include::{IncludeSearcher, StandardIncludeSearcher};
use macros::{FuncMacro, ObjMacro};

use crate::lexer::{Lexer, Token, TokenKind};

use std::collections::{HashMap, VecDeque};

const MAX_INCLUDE_DEPTH: usize = 100;

/// The preprocessor drives a stack of lexers, one per open `#include`,
/// and yields fully macro-expanded, directive-free tokens.
///
/// It can only be run once; create a new one to reuse.
pub struct Preprocessor {
    /// Stack of active lexers. The top is the current include; only the
    /// bottommost reaching end of file terminates preprocessing.
    lexers: Vec<Lexer>,
    /// Pushed-back tokens, taking precedence over the lexer stack.
    /// Expansion injects replacement sequences at the front.
    pushback: VecDeque<Token>,
    obj_macros: HashMap<String, ObjMacro>,
    func_macros: HashMap<String, FuncMacro>,
    /// Positions of the `#if`/`#ifdef` directives whose bodies are
    /// currently being included; tracks nesting for `#endif`.
    cond_stack: Vec<crate::lexer::FilePos>,
    searcher: Box<dyn IncludeSearcher>,
}

impl Preprocessor {
    pub fn new(lexer: Lexer, searcher: Box<dyn IncludeSearcher>) -> Self {
        Self {
            lexers: vec![lexer],
            pushback: VecDeque::new(),
            obj_macros: HashMap::new(),
            func_macros: HashMap::new(),
            cond_stack: Vec::new(),
            searcher,
        }
    }

    /// Returns the next fully expanded token. Directives are consumed
    /// and handled internally; the parser never sees them.
    pub fn next(&mut self) -> Result<Token, CppError> {
        loop {
            let tok = self.next_expand()?;
            match tok.kind {
                TokenKind::Directive => self.handle_directive(&tok)?,
                TokenKind::Eof => {
                    if let Some(open) = self.cond_stack.last() {
                        return Err(InnerCppError::UnclosedConditional.at(open.clone()));
                    }
                    return Ok(tok);
                }
                _ => return Ok(tok),
            }
        }
    }

    /// Next token with no macro expansion and no directive handling.
    /// Pops exhausted include lexers off the stack.
    fn next_raw(&mut self) -> Result<Token, CppError> {
        if let Some(t) = self.pushback.pop_front() {
            return Ok(t);
        }
        loop {
            let lexer = self.lexers.last_mut().expect("lexer stack is never empty");
            let t = lexer.next()?;
            if t.kind == TokenKind::Eof && self.lexers.len() > 1 {
                self.lexers.pop();
                continue;
            }
            return Ok(t);
        }
    }

    fn unget(&mut self, t: Token) {
        self.pushback.push_front(t);
    }

    fn unget_all(&mut self, toks: Vec<Token>) {
        for t in toks.into_iter().rev() {
            self.pushback.push_front(t);
        }
    }

    fn is_defined(&self, name: &str) -> bool {
        self.obj_macros.contains_key(name) || self.func_macros.contains_key(name)
    }

    /// Next token with macro expansion applied. An identifier whose hide
    /// set contains its own name is never re-expanded.
    fn next_expand(&mut self) -> Result<Token, CppError> {
        loop {
            let t = self.next_raw()?;
            if t.kind != TokenKind::Ident || t.hs.contains(&t.val) {
                return Ok(t);
            }
            if let Some(m) = self.obj_macros.get(&t.val) {
                let mut repl = m.tokens.clone();
                for r in &mut repl {
                    r.hs = r.hs.union(&t.hs).add(&t.val);
                    r.pos = t.pos.clone();
                }
                self.unget_all(repl);
                continue;
            }
            if self.func_macros.contains_key(&t.val) {
                let opening = self.next_raw()?;
                if opening.kind != TokenKind::Lparen {
                    self.unget(opening);
                    return Ok(t);
                }
                self.expand_funclike(&t)?;
                continue;
            }
            return Ok(t);
        }
    }

    /// Expands a function-like macro invocation; the name token and the
    /// opening paren have been consumed.
    fn expand_funclike(&mut self, invocation: &Token) -> Result<(), CppError> {
        let (args, rparen) = self.read_macro_args(invocation)?;
        let macro_ = &self.func_macros[&invocation.val];
        if args.len() != macro_.nargs {
            return Err(InnerCppError::ArityMismatch {
                name: invocation.val.clone(),
                expected: macro_.nargs,
                got: args.len(),
            }
            .at(invocation.pos.clone()));
        }
        let hs = invocation
            .hs
            .intersection(&rparen.hs)
            .add(&invocation.val);
        let mut expanded = Vec::new();
        for body_tok in &macro_.tokens {
            if let Some(idx) = macro_.param_index(body_tok) {
                expanded.extend(args[idx].iter().cloned());
            } else {
                let mut t = body_tok.clone();
                t.pos = invocation.pos.clone();
                expanded.push(t);
            }
        }
        for t in &mut expanded {
            t.hs = t.hs.union(&hs);
        }
        self.unget_all(expanded);
        Ok(())
    }

    /// Reads the arguments of a macro invocation, not including the
    /// opening paren but consuming the closing one. Commas split
    /// arguments only at paren depth one; nested parens are captured
    /// literally. Returns the argument sequences and the closing paren.
    fn read_macro_args(
        &mut self,
        invocation: &Token,
    ) -> Result<(Vec<Vec<Token>>, Token), CppError> {
        let mut depth = 1usize;
        let mut args: Vec<Vec<Token>> = vec![Vec::new()];
        loop {
            let t = self.next_raw()?;
            match t.kind {
                TokenKind::Eof => {
                    return Err(InnerCppError::EofInMacroArgs.at(invocation.pos.clone()))
                }
                TokenKind::Lparen => {
                    depth += 1;
                    args.last_mut().unwrap().push(t);
                }
                TokenKind::Rparen => {
                    depth -= 1;
                    if depth == 0 {
                        // `F()` on a zero-parameter macro reads as one
                        // empty argument
                        if args.len() == 1 && args[0].is_empty() {
                            args.clear();
                        }
                        return Ok((args, t));
                    }
                    args.last_mut().unwrap().push(t);
                }
                TokenKind::Comma if depth == 1 => args.push(Vec::new()),
                _ => args.last_mut().unwrap().push(t),
            }
        }
    }

    /// Reads raw tokens up to the end of the current directive line.
    fn read_to_end_of_directive(&mut self) -> Result<Vec<Token>, CppError> {
        let mut toks = Vec::new();
        loop {
            let t = self.next_raw()?;
            match t.kind {
                TokenKind::EndDirective => return Ok(toks),
                TokenKind::Eof => return Ok(toks),
                _ => toks.push(t),
            }
        }
    }

    fn expect_end_of_directive(&mut self, directive: &str) -> Result<(), CppError> {
        let t = self.next_raw()?;
        if t.kind != TokenKind::EndDirective {
            return Err(InnerCppError::ExpectedNewline(directive.to_owned()).at(t.pos));
        }
        Ok(())
    }

    fn handle_directive(&mut self, dir: &Token) -> Result<(), CppError> {
        match dir.val.as_str() {
            "define" => self.handle_define(),
            "undef" => self.handle_undef(),
            "include" => self.handle_include(),
            "if" => self.handle_if(dir),
            "ifdef" => self.handle_ifdef(dir, false),
            "ifndef" => self.handle_ifdef(dir, true),
            "endif" => self.handle_endif(dir),
            "error" => self.handle_error(dir),
            "warning" => self.handle_warning(),
            _ => Err(InnerCppError::UnknownDirective(dir.val.clone()).at(dir.pos.clone())),
        }
    }

    fn handle_define(&mut self) -> Result<(), CppError> {
        let ident = self.next_raw()?;
        if ident.kind != TokenKind::Ident {
            return Err(InnerCppError::ExpectedMacroName(ident.kind).at(ident.pos));
        }
        if self.is_defined(&ident.val) {
            return Err(InnerCppError::MacroRedefinition(ident.val).at(ident.pos));
        }
        let t = self.next_raw()?;
        if t.kind == TokenKind::FunclikeDefine {
            self.handle_funclike_define(ident)
        } else {
            self.unget(t);
            let tokens = self.read_to_end_of_directive()?;
            self.obj_macros.insert(ident.val, ObjMacro::new(tokens));
            Ok(())
        }
    }

    fn handle_funclike_define(&mut self, ident: Token) -> Result<(), CppError> {
        let paren = self.next_raw()?;
        assert_eq!(
            paren.kind,
            TokenKind::Lparen,
            "function-like define marker without an opening paren"
        );
        let mut params = Vec::new();
        loop {
            let t = self.next_raw()?;
            if t.kind == TokenKind::Rparen {
                break;
            }
            if t.kind != TokenKind::Ident {
                return Err(InnerCppError::ExpectedMacroParam(t.kind).at(t.pos));
            }
            params.push(t);
            let sep = self.next_raw()?;
            match sep.kind {
                TokenKind::Comma => {}
                TokenKind::Rparen => break,
                _ => return Err(InnerCppError::BadMacroParamList(sep.kind).at(sep.pos)),
            }
        }
        let tokens = self.read_to_end_of_directive()?;
        let macro_ = FuncMacro::new(&params, tokens).map_err(|e| e.at(ident.pos.clone()))?;
        self.func_macros.insert(ident.val, macro_);
        Ok(())
    }

    fn handle_undef(&mut self) -> Result<(), CppError> {
        let ident = self.next_raw()?;
        if ident.kind != TokenKind::Ident {
            return Err(InnerCppError::ExpectedMacroName(ident.kind).at(ident.pos));
        }
        if !self.is_defined(&ident.val) {
            return Err(InnerCppError::UndefOfUndefined(ident.val).at(ident.pos));
        }
        self.obj_macros.remove(&ident.val);
        self.func_macros.remove(&ident.val);
        self.expect_end_of_directive("undef")
    }

    fn handle_include(&mut self) -> Result<(), CppError> {
        let tok = self.next_raw()?;
        if tok.kind != TokenKind::Header {
            return Err(InnerCppError::ExpectedHeader(tok.kind).at(tok.pos));
        }
        let header = &tok.val;
        let path = &header[1..header.len() - 1];
        let resolved = if header.starts_with('<') {
            self.searcher.include_angled(&tok.pos.file, path)
        } else {
            self.searcher.include_quote(&tok.pos.file, path)
        };
        let (resolved_path, contents) = resolved.map_err(|e| {
            InnerCppError::IncludeFailed(header.clone(), e.to_string()).at(tok.pos.clone())
        })?;
        self.expect_end_of_directive("include")?;
        if self.lexers.len() >= MAX_INCLUDE_DEPTH {
            return Err(InnerCppError::IncludeDepthExceeded.at(tok.pos));
        }
        let name = resolved_path.to_string_lossy().into_owned();
        self.lexers.push(Lexer::new(name, &contents));
        Ok(())
    }

    fn handle_if(&mut self, dir: &Token) -> Result<(), CppError> {
        let toks = self.read_to_end_of_directive()?;
        let defined = |name: &str| self.is_defined(name);
        let value = expr::eval_if_expr(&toks, &defined)
            .map_err(|msg| InnerCppError::BadIfExpr(msg).at(dir.pos.clone()))?;
        if value != 0 {
            self.cond_stack.push(dir.pos.clone());
            Ok(())
        } else {
            self.skip_till_endif(dir)
        }
    }

    fn handle_ifdef(&mut self, dir: &Token, negate: bool) -> Result<(), CppError> {
        let ident = self.next_raw()?;
        if ident.kind != TokenKind::Ident {
            return Err(InnerCppError::ExpectedMacroName(ident.kind).at(ident.pos));
        }
        self.expect_end_of_directive(&dir.val)?;
        if self.is_defined(&ident.val) != negate {
            self.cond_stack.push(dir.pos.clone());
            Ok(())
        } else {
            self.skip_till_endif(dir)
        }
    }

    fn handle_endif(&mut self, dir: &Token) -> Result<(), CppError> {
        if self.cond_stack.pop().is_none() {
            return Err(InnerCppError::StrayEndif.at(dir.pos.clone()));
        }
        let end = self.next_raw()?;
        if end.kind != TokenKind::EndDirective {
            return Err(InnerCppError::TokenAfterEndif.at(end.pos));
        }
        Ok(())
    }

    /// Skips a failed conditional block, without expansion, up to and
    /// including the matching `#endif` and its newline. Nested
    /// conditionals bump the depth.
    fn skip_till_endif(&mut self, dir: &Token) -> Result<(), CppError> {
        let mut depth = 1usize;
        loop {
            let t = self.next_raw()?;
            match t.kind {
                TokenKind::Eof => {
                    return Err(InnerCppError::UnclosedConditional.at(dir.pos.clone()))
                }
                TokenKind::Directive => match t.val.as_str() {
                    "if" | "ifdef" | "ifndef" => depth += 1,
                    "endif" => {
                        depth -= 1;
                        if depth == 0 {
                            let end = self.next_raw()?;
                            if end.kind != TokenKind::EndDirective {
                                return Err(InnerCppError::TokenAfterEndif.at(end.pos));
                            }
                            return Ok(());
                        }
                    }
                    _ => {}
                },
                _ => {}
            }
        }
    }

    fn handle_error(&mut self, dir: &Token) -> Result<(), CppError> {
        let tok = self.next_raw()?;
        if tok.kind != TokenKind::StringLit {
            return Err(InnerCppError::ExpectedMessageString(tok.kind).at(tok.pos));
        }
        Err(InnerCppError::ErrorDirective(tok.val).at(dir.pos.clone()))
    }

    fn handle_warning(&mut self) -> Result<(), CppError> {
        let tok = self.next_raw()?;
        if tok.kind != TokenKind::StringLit {
            return Err(InnerCppError::ExpectedMessageString(tok.kind).at(tok.pos));
        }
        eprintln!("{}: warning: {}", tok.pos, tok.val);
        self.expect_end_of_directive("warning")
    }
}
