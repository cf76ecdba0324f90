//! Recursive descent parser for the preprocessed token stream.
//!
//! The parser resolves names against lexical scopes, attaches a type to
//! every expression as it is built, folds the constants the grammar
//! requires to be constant, and reserves the synthetic labels the
//! emitter uses for control flow.

pub mod fold;
mod parse_error;
#[cfg(test)]
mod parser_tests;
mod scope;
#[cfg(test)]
mod scope_tests;

pub use parse_error::{InnerParseError, ParseError};

use crate::ast::*;
use crate::cpp::Preprocessor;
use crate::ctypes::{CType, FuncType, Primitive, StructType};
use crate::lexer::{FilePos, Token, TokenKind};
use scope::Scope;

use std::collections::HashMap;
use std::rc::Rc;

pub type Result<T> = std::result::Result<T, ParseError>;

/// Parses a whole translation unit off the preprocessor.
pub fn parse(pp: Preprocessor) -> Result<TranslationUnit> {
    Parser::new(pp)?.parse_translation_unit()
}

struct SwitchCtx {
    cases: Vec<SwitchCase>,
    default: Option<Label>,
    l_after: Label,
}

/// The parsed spine of a declarator: pointer prefixes, an optional
/// parenthesized inner declarator, and the array/function suffixes.
/// Types are folded outside-in after the whole spine is read, so there
/// is no forward reference to tie off.
struct Declarator {
    nptr: usize,
    name: Option<String>,
    inner: Option<Box<Declarator>>,
    suffixes: Vec<DeclSuffix>,
}

enum DeclSuffix {
    Arr(usize),
    Fun(Vec<CType>, Vec<String>, bool),
}

struct Parser {
    pp: Preprocessor,
    curt: Token,
    nextt: Token,
    scope: Scope,
    // per-function state
    labels: HashMap<String, Label>,
    pending_gotos: Vec<(String, FilePos)>,
    breaks: Vec<Label>,
    continues: Vec<Label>,
    switches: Vec<SwitchCtx>,
    label_counter: u64,
    lsym_counter: usize,
    anon_inits: Vec<StringInit>,
}

impl Parser {
    fn new(mut pp: Preprocessor) -> Result<Self> {
        let curt = pp.next()?;
        let nextt = pp.next()?;
        Ok(Self {
            pp,
            curt,
            nextt,
            scope: Scope::new(),
            labels: HashMap::new(),
            pending_gotos: Vec::new(),
            breaks: Vec::new(),
            continues: Vec::new(),
            switches: Vec::new(),
            label_counter: 0,
            lsym_counter: 0,
            anon_inits: Vec::new(),
        })
    }

    fn bump(&mut self) -> Result<Token> {
        let next = self.pp.next()?;
        let old = std::mem::replace(&mut self.curt, std::mem::replace(&mut self.nextt, next));
        Ok(old)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.curt.kind == kind {
            self.bump()
        } else {
            Err(InnerParseError::ExpectedButGot(kind, self.curt.kind).at(self.curt.pos.clone()))
        }
    }

    fn accept(&mut self, kind: TokenKind) -> Result<bool> {
        if self.curt.kind == kind {
            self.bump()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn pos(&self) -> FilePos {
        self.curt.pos.clone()
    }

    fn next_label(&mut self) -> Label {
        self.label_counter += 1;
        format!(".L{}", self.label_counter)
    }

    fn new_lsymbol(&mut self, ty: CType) -> Rc<LSymbol> {
        let id = self.lsym_counter;
        self.lsym_counter += 1;
        Rc::new(LSymbol { id, ty })
    }

    fn parse_translation_unit(mut self) -> Result<TranslationUnit> {
        let mut toplevels = Vec::new();
        while self.curt.kind != TokenKind::Eof {
            self.parse_toplevel(&mut toplevels)?;
        }
        Ok(TranslationUnit {
            toplevels,
            anonymous_inits: self.anon_inits,
        })
    }

    // ------------------------------------------------------------------
    // Declarations

    fn parse_toplevel(&mut self, toplevels: &mut Vec<TopLevel>) -> Result<()> {
        let pos = self.pos();
        let (storage, base) = self.parse_decl_specifiers()?;
        // e.g. a bare `struct foo { ... };`
        if self.accept(TokenKind::Semicolon)? {
            return Ok(());
        }
        let spine = self.parse_declarator_spine()?;
        let (name, ty) = fold_declarator(spine, base.clone()).map_err(|e| e.at(pos.clone()))?;
        if ty.is_func() && self.curt.kind == TokenKind::Lbrace {
            if storage == Some(StorageClass::Typedef) {
                return Err(InnerParseError::TypedefFunctionDefinition.at(pos));
            }
            let name = name.ok_or_else(|| {
                InnerParseError::ExpectedIdent(TokenKind::Lbrace).at(pos.clone())
            })?;
            let func = self.parse_function(name, ty, pos)?;
            toplevels.push(TopLevel::Func(func));
            return Ok(());
        }

        let storage = storage.unwrap_or(StorageClass::Auto);
        let mut symbols = Vec::new();
        let mut inits = Vec::new();
        let mut decl = Some((name, ty));
        loop {
            let (name, ty) = match decl.take() {
                Some(d) => d,
                None => {
                    let dpos = self.pos();
                    let spine = self.parse_declarator_spine()?;
                    fold_declarator(spine, base.clone()).map_err(|e| e.at(dpos))?
                }
            };
            let name =
                name.ok_or_else(|| InnerParseError::ExpectedIdent(self.curt.kind).at(self.pos()))?;
            if storage == StorageClass::Typedef {
                self.scope
                    .define_typedef(&name, ty)
                    .map_err(|_| InnerParseError::Redefinition(name.clone()).at(pos.clone()))?;
            } else {
                self.check_object_type(&name, &ty, &pos)?;
                let sym = Rc::new(GSymbol {
                    label: name.clone(),
                    ty: ty.clone(),
                });
                self.define_global(&name, Symbol::Global(Rc::clone(&sym)), &pos)?;
                let init = if self.accept(TokenKind::Assign)? {
                    let e = self.parse_braced_initializer()?;
                    let folded = fold::fold(&e).map_err(|_| {
                        InnerParseError::NotConstant(format!("initializer of {name}"))
                            .at(e.pos().clone())
                    })?;
                    Some(folded)
                } else {
                    None
                };
                symbols.push(Symbol::Global(sym));
                inits.push(init);
            }
            if !self.accept(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::Semicolon)?;
        if !symbols.is_empty() {
            toplevels.push(TopLevel::Decl(DeclList {
                storage,
                symbols,
                inits,
                pos,
            }));
        }
        Ok(())
    }

    /// Objects may not have void, function, or incomplete struct type.
    fn check_object_type(&self, name: &str, ty: &CType, pos: &FilePos) -> Result<()> {
        if ty.is_void() {
            return Err(InnerParseError::IncompleteType(name.to_owned()).at(pos.clone()));
        }
        if let Some(s) = ty.struct_type() {
            if !s.is_complete() {
                return Err(InnerParseError::IncompleteType(name.to_owned()).at(pos.clone()));
            }
        }
        Ok(())
    }

    /// Defines a global, tolerating a redeclaration of a function name so
    /// that a definition can follow its own prototype.
    fn define_global(&mut self, name: &str, sym: Symbol, pos: &FilePos) -> Result<()> {
        if self.scope.define(name, sym.clone()).is_err() {
            let existing_is_func = self
                .scope
                .lookup(name)
                .map(|s| s.ty().is_func())
                .unwrap_or(false);
            if existing_is_func && sym.ty().is_func() {
                self.scope.redefine(name, sym);
                return Ok(());
            }
            return Err(InnerParseError::Redefinition(name.to_owned()).at(pos.clone()));
        }
        Ok(())
    }

    fn parse_function(&mut self, name: String, ty: CType, pos: FilePos) -> Result<Function> {
        let ftype = Rc::clone(ty.func_type().expect("checked by the caller"));
        let sym = Symbol::Global(Rc::new(GSymbol {
            label: name.clone(),
            ty: ty.clone(),
        }));
        self.define_global(&name, sym, &pos)?;

        self.labels.clear();
        self.pending_gotos.clear();
        self.scope.push();
        let mut param_syms = Vec::new();
        for (pname, pty) in ftype.param_names.iter().zip(&ftype.params) {
            if pname.is_empty() {
                return Err(InnerParseError::ParamNameOmitted(name.clone()).at(pos.clone()));
            }
            if pty.is_struct() {
                return Err(InnerParseError::StructParamUnsupported.at(pos.clone()));
            }
            let lsym = self.new_lsymbol(pty.clone());
            self.scope
                .define(pname, Symbol::Local(Rc::clone(&lsym)))
                .map_err(|_| InnerParseError::Redefinition(pname.clone()).at(pos.clone()))?;
            param_syms.push(lsym);
        }
        self.expect(TokenKind::Lbrace)?;
        let mut body = Vec::new();
        while self.curt.kind != TokenKind::Rbrace {
            self.parse_block_item(&mut body)?;
        }
        self.expect(TokenKind::Rbrace)?;
        self.scope.pop();

        // goto fix-up: every pending target must have been declared by now
        for (target, gpos) in std::mem::take(&mut self.pending_gotos) {
            if !self.labels.contains_key(&target) {
                return Err(InnerParseError::UnknownLabel(target).at(gpos));
            }
        }
        patch_gotos(&mut body, &self.labels);

        Ok(Function {
            name,
            ftype,
            param_syms,
            body,
            pos,
        })
    }

    /// Consumes declaration specifiers: at most one storage class,
    /// qualifiers (accepted and ignored), and either a counted shape of
    /// type tokens, a struct/union specifier, or a typedef name.
    fn parse_decl_specifiers(&mut self) -> Result<(Option<StorageClass>, CType)> {
        let pos = self.pos();
        let mut storage: Option<StorageClass> = None;
        let mut nvoid = 0usize;
        let mut nchar = 0usize;
        let mut nshort = 0usize;
        let mut nint = 0usize;
        let mut nlong = 0usize;
        let mut nfloat = 0usize;
        let mut ndouble = 0usize;
        let mut signed = false;
        let mut unsigned = false;
        let mut ntype = 0usize;
        let mut other: Option<CType> = None;
        loop {
            let k = self.curt.kind;
            if k.is_storage_class() {
                if storage.is_some() {
                    return Err(InnerParseError::MultipleStorageClasses.at(self.pos()));
                }
                storage = Some(match k {
                    TokenKind::Static => StorageClass::Static,
                    TokenKind::Extern => StorageClass::Extern,
                    TokenKind::Typedef => StorageClass::Typedef,
                    TokenKind::Register => StorageClass::Register,
                    _ => StorageClass::Auto,
                });
                self.bump()?;
            } else if k.is_qualifier() {
                self.bump()?;
            } else if k.is_type_token() {
                if other.is_some() {
                    return Err(InnerParseError::InvalidTypeSpecifiers.at(self.pos()));
                }
                ntype += 1;
                match k {
                    TokenKind::Void => nvoid += 1,
                    TokenKind::Char => nchar += 1,
                    TokenKind::Short => nshort += 1,
                    TokenKind::Int => nint += 1,
                    TokenKind::Long => nlong += 1,
                    TokenKind::Float => nfloat += 1,
                    TokenKind::Double => ndouble += 1,
                    TokenKind::Signed => signed = true,
                    TokenKind::Unsigned => unsigned = true,
                    _ => unreachable!(),
                }
                self.bump()?;
            } else if k == TokenKind::Struct || k == TokenKind::Union {
                if other.is_some() || ntype > 0 {
                    return Err(InnerParseError::InvalidTypeSpecifiers.at(self.pos()));
                }
                other = Some(self.parse_struct_specifier(k == TokenKind::Union)?);
            } else if k == TokenKind::Ident
                && other.is_none()
                && ntype == 0
                && self.scope.is_typedef_name(&self.curt.val)
            {
                other = Some(self.scope.lookup_typedef(&self.curt.val).unwrap());
                self.bump()?;
            } else {
                break;
            }
        }
        if let Some(ty) = other {
            return Ok((storage, ty));
        }
        if signed && unsigned {
            return Err(InnerParseError::InvalidTypeSpecifiers.at(pos));
        }
        let prim = match (nvoid, nchar, nshort, nint, nlong, nfloat, ndouble) {
            (1, 0, 0, 0, 0, 0, 0) => Primitive::Void,
            (0, 1, 0, 0, 0, 0, 0) => {
                if unsigned {
                    Primitive::UChar
                } else {
                    Primitive::Char
                }
            }
            (0, 0, 1, 0 | 1, 0, 0, 0) => {
                if unsigned {
                    Primitive::UShort
                } else {
                    Primitive::Short
                }
            }
            (0, 0, 0, 1, 0, 0, 0) => {
                if unsigned {
                    Primitive::UInt
                } else {
                    Primitive::Int
                }
            }
            (0, 0, 0, 0 | 1, 1, 0, 0) => {
                if unsigned {
                    Primitive::ULong
                } else {
                    Primitive::Long
                }
            }
            (0, 0, 0, 0 | 1, 2, 0, 0) => {
                if unsigned {
                    Primitive::ULLong
                } else {
                    Primitive::LLong
                }
            }
            (0, 0, 0, 0, 0, 1, 0) => Primitive::Float,
            (0, 0, 0, 0, 0, 0, 1) => Primitive::Double,
            (0, 0, 0, 0, 1, 0, 1) => Primitive::LDouble,
            // implicit int: `unsigned x;` or a bare storage class
            (0, 0, 0, 0, 0, 0, 0) if signed || unsigned || storage.is_some() => {
                if unsigned {
                    Primitive::UInt
                } else {
                    Primitive::Int
                }
            }
            _ => return Err(InnerParseError::InvalidTypeSpecifiers.at(pos)),
        };
        if unsigned && !CType::Prim(prim).is_int() {
            return Err(InnerParseError::InvalidTypeSpecifiers.at(pos));
        }
        Ok((storage, CType::Prim(prim)))
    }

    fn parse_struct_specifier(&mut self, is_union: bool) -> Result<CType> {
        let pos = self.pos();
        self.bump()?; // struct or union keyword
        let tag = if self.curt.kind == TokenKind::Ident {
            Some(self.bump()?.val)
        } else {
            None
        };
        if self.curt.kind != TokenKind::Lbrace {
            // reference to a previously declared (or forward declared) tag
            let Some(tag) = tag else {
                return Err(InnerParseError::ExpectedIdent(self.curt.kind).at(pos));
            };
            if let Some(existing) = self.scope.lookup_tag(&tag) {
                return Ok(CType::Struct(existing));
            }
            let st = Rc::new(StructType::incomplete(Some(tag.clone()), is_union));
            self.scope
                .define_tag(&tag, Rc::clone(&st))
                .map_err(|_| InnerParseError::Redefinition(tag).at(pos))?;
            return Ok(CType::Struct(st));
        }
        self.bump()?; // {
        let st = match &tag {
            Some(t) => {
                if let Some(existing) = self.scope.lookup_tag_here(t) {
                    if existing.is_complete() {
                        return Err(InnerParseError::Redefinition(t.clone()).at(pos));
                    }
                    existing
                } else {
                    let st = Rc::new(StructType::incomplete(tag.clone(), is_union));
                    self.scope
                        .define_tag(t, Rc::clone(&st))
                        .expect("tag was just checked");
                    st
                }
            }
            None => Rc::new(StructType::incomplete(None, is_union)),
        };
        let mut names: Vec<String> = Vec::new();
        let mut types = Vec::new();
        while self.curt.kind != TokenKind::Rbrace {
            let fpos = self.pos();
            let (fstorage, fbase) = self.parse_decl_specifiers()?;
            if fstorage.is_some() {
                return Err(InnerParseError::StorageClassInField.at(fpos));
            }
            loop {
                let dpos = self.pos();
                let spine = self.parse_declarator_spine()?;
                let (fname, fty) =
                    fold_declarator(spine, fbase.clone()).map_err(|e| e.at(dpos.clone()))?;
                let fname = fname
                    .ok_or_else(|| InnerParseError::ExpectedIdent(self.curt.kind).at(dpos.clone()))?;
                if names.iter().any(|n| *n == fname) {
                    return Err(InnerParseError::DuplicateField(fname).at(dpos));
                }
                self.check_object_type(&fname, &fty, &dpos)?;
                names.push(fname);
                types.push(fty);
                if !self.accept(TokenKind::Comma)? {
                    break;
                }
            }
            self.expect(TokenKind::Semicolon)?;
        }
        self.expect(TokenKind::Rbrace)?;
        st.complete(names, types);
        Ok(CType::Struct(st))
    }

    /// True if `kind`/`val` can start a type name here; used to tell a
    /// cast from a parenthesized expression.
    fn starts_type(&self, kind: TokenKind, val: &str) -> bool {
        kind.is_type_token()
            || kind.is_qualifier()
            || kind == TokenKind::Struct
            || kind == TokenKind::Union
            || (kind == TokenKind::Ident && self.scope.is_typedef_name(val))
    }

    fn parse_declarator_spine(&mut self) -> Result<Declarator> {
        let mut nptr = 0usize;
        while self.curt.kind == TokenKind::Mul {
            self.bump()?;
            while self.curt.kind.is_qualifier() {
                self.bump()?;
            }
            nptr += 1;
        }
        let (name, inner) = match self.curt.kind {
            TokenKind::Ident => (Some(self.bump()?.val), None),
            TokenKind::Lparen
                if !self.starts_type(self.nextt.kind, &self.nextt.val)
                    && self.nextt.kind != TokenKind::Rparen =>
            {
                self.bump()?;
                let d = self.parse_declarator_spine()?;
                self.expect(TokenKind::Rparen)?;
                (None, Some(Box::new(d)))
            }
            _ => (None, None),
        };
        let mut suffixes = Vec::new();
        loop {
            if self.accept(TokenKind::Lbrack)? {
                let dim_expr = self.parse_assignment_expr()?;
                let dim = fold::fold_integer(&dim_expr).map_err(|_| {
                    InnerParseError::NotConstant("array dimension".to_owned())
                        .at(dim_expr.pos().clone())
                })?;
                self.expect(TokenKind::Rbrack)?;
                suffixes.push(DeclSuffix::Arr(dim.max(0) as usize));
            } else if self.curt.kind == TokenKind::Lparen {
                self.bump()?;
                let (ptypes, pnames, variadic) = self.parse_params()?;
                suffixes.push(DeclSuffix::Fun(ptypes, pnames, variadic));
            } else {
                break;
            }
        }
        Ok(Declarator {
            nptr,
            name,
            inner,
            suffixes,
        })
    }

    /// Parameter list, after the opening paren. `(void)` and `()` both
    /// mean no parameters; array and function parameters decay to
    /// pointers.
    fn parse_params(&mut self) -> Result<(Vec<CType>, Vec<String>, bool)> {
        let mut ptypes = Vec::new();
        let mut pnames = Vec::new();
        let mut variadic = false;
        if self.accept(TokenKind::Rparen)? {
            return Ok((ptypes, pnames, variadic));
        }
        if self.curt.kind == TokenKind::Void && self.nextt.kind == TokenKind::Rparen {
            self.bump()?;
            self.bump()?;
            return Ok((ptypes, pnames, variadic));
        }
        loop {
            if self.curt.kind == TokenKind::Ellipsis {
                self.bump()?;
                variadic = true;
                break;
            }
            let ppos = self.pos();
            let (pstorage, base) = self.parse_decl_specifiers()?;
            match pstorage {
                None | Some(StorageClass::Register) => {}
                Some(_) => return Err(InnerParseError::StorageClassInBlock.at(ppos)),
            }
            let spine = self.parse_declarator_spine()?;
            let (name, ty) = fold_declarator(spine, base).map_err(|e| e.at(ppos))?;
            ptypes.push(ty.decayed());
            pnames.push(name.unwrap_or_default());
            if !self.accept(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::Rparen)?;
        Ok((ptypes, pnames, variadic))
    }

    /// `specifiers abstract-declarator`, as used by casts and sizeof.
    fn parse_type_name(&mut self) -> Result<CType> {
        let pos = self.pos();
        let (storage, base) = self.parse_decl_specifiers()?;
        if storage.is_some() {
            return Err(InnerParseError::StorageClassInBlock.at(pos));
        }
        let spine = self.parse_declarator_spine()?;
        let (name, ty) = fold_declarator(spine, base).map_err(|e| e.at(pos.clone()))?;
        if let Some(name) = name {
            return Err(InnerParseError::UnexpectedToken(name).at(pos));
        }
        Ok(ty)
    }

    // ------------------------------------------------------------------
    // Statements

    fn is_decl_start(&self) -> bool {
        let k = self.curt.kind;
        k.is_storage_class()
            || k.is_qualifier()
            || k.is_type_token()
            || k == TokenKind::Struct
            || k == TokenKind::Union
            || (k == TokenKind::Ident
                && self.scope.is_typedef_name(&self.curt.val)
                // `t:` is a label even if t names a typedef
                && self.nextt.kind != TokenKind::Colon)
    }

    fn parse_block_item(&mut self, stmts: &mut Vec<Stmt>) -> Result<()> {
        if self.is_decl_start() {
            self.parse_local_decl(stmts)
        } else {
            let s = self.parse_stmt()?;
            stmts.push(s);
            Ok(())
        }
    }

    /// A declaration statement inside a function body. Initializers are
    /// lowered to assignments placed right after the declaration node.
    fn parse_local_decl(&mut self, stmts: &mut Vec<Stmt>) -> Result<()> {
        let pos = self.pos();
        let (storage, base) = self.parse_decl_specifiers()?;
        match storage {
            None | Some(StorageClass::Auto) | Some(StorageClass::Register) => {}
            Some(StorageClass::Typedef) => {
                // local typedefs scope like any other declaration
                loop {
                    let dpos = self.pos();
                    let spine = self.parse_declarator_spine()?;
                    let (name, ty) =
                        fold_declarator(spine, base.clone()).map_err(|e| e.at(dpos.clone()))?;
                    let name = name
                        .ok_or_else(|| InnerParseError::ExpectedIdent(self.curt.kind).at(dpos))?;
                    self.scope
                        .define_typedef(&name, ty)
                        .map_err(|_| InnerParseError::Redefinition(name).at(pos.clone()))?;
                    if !self.accept(TokenKind::Comma)? {
                        break;
                    }
                }
                self.expect(TokenKind::Semicolon)?;
                return Ok(());
            }
            Some(_) => return Err(InnerParseError::StorageClassInBlock.at(pos)),
        }
        if self.accept(TokenKind::Semicolon)? {
            // e.g. a block-local `struct foo { ... };`
            return Ok(());
        }
        let mut symbols = Vec::new();
        let mut assigns = Vec::new();
        loop {
            let dpos = self.pos();
            let spine = self.parse_declarator_spine()?;
            let (name, ty) = fold_declarator(spine, base.clone()).map_err(|e| e.at(dpos.clone()))?;
            let name =
                name.ok_or_else(|| InnerParseError::ExpectedIdent(self.curt.kind).at(dpos.clone()))?;
            let sym = if ty.is_func() {
                // a block-scoped function declaration refers to the
                // global of the same name
                Symbol::Global(Rc::new(GSymbol {
                    label: name.clone(),
                    ty: ty.clone(),
                }))
            } else {
                self.check_object_type(&name, &ty, &dpos)?;
                Symbol::Local(self.new_lsymbol(ty.clone()))
            };
            self.scope
                .define(&name, sym.clone())
                .map_err(|_| InnerParseError::Redefinition(name.clone()).at(dpos.clone()))?;
            if self.accept(TokenKind::Assign)? {
                let init = self.parse_braced_initializer()?;
                let target = Expr::Ident(Ident {
                    sym: sym.clone(),
                    pos: dpos.clone(),
                });
                let assign = self.mk_assign(target, init, dpos.clone())?;
                assigns.push(Stmt::Expr(ExprStmt {
                    expr: assign,
                    pos: dpos,
                }));
            }
            symbols.push(sym);
            if !self.accept(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::Semicolon)?;
        stmts.push(Stmt::Decl(DeclList {
            storage: storage.unwrap_or(StorageClass::Auto),
            inits: symbols.iter().map(|_| None).collect(),
            symbols,
            pos,
        }));
        stmts.extend(assigns);
        Ok(())
    }

    /// A scalar initializer, optionally wrapped in one level of braces.
    fn parse_braced_initializer(&mut self) -> Result<Expr> {
        if self.accept(TokenKind::Lbrace)? {
            let e = self.parse_assignment_expr()?;
            self.expect(TokenKind::Rbrace)?;
            Ok(e)
        } else {
            self.parse_assignment_expr()
        }
    }

    fn check_scalar_cond(&self, cond: &Expr) -> Result<()> {
        if cond.ty().decayed().is_scalar() {
            Ok(())
        } else {
            Err(InnerParseError::NonScalarCondition.at(cond.pos().clone()))
        }
    }

    fn parse_paren_expr(&mut self) -> Result<Expr> {
        self.expect(TokenKind::Lparen)?;
        let e = self.parse_expr(1)?;
        self.expect(TokenKind::Rparen)?;
        Ok(e)
    }

    fn parse_stmt(&mut self) -> Result<Stmt> {
        let pos = self.pos();
        match self.curt.kind {
            TokenKind::Lbrace => {
                self.bump()?;
                self.scope.push();
                let mut body = Vec::new();
                while self.curt.kind != TokenKind::Rbrace {
                    self.parse_block_item(&mut body)?;
                }
                self.expect(TokenKind::Rbrace)?;
                self.scope.pop();
                Ok(Stmt::Block(Block { body, pos }))
            }
            TokenKind::If => {
                self.bump()?;
                let cond = self.parse_paren_expr()?;
                self.check_scalar_cond(&cond)?;
                let then = Box::new(self.parse_stmt()?);
                let els = if self.accept(TokenKind::Else)? {
                    Some(Box::new(self.parse_stmt()?))
                } else {
                    None
                };
                Ok(Stmt::If(If {
                    cond,
                    then,
                    els,
                    l_else: self.next_label(),
                    l_end: self.next_label(),
                    pos,
                }))
            }
            TokenKind::While => {
                self.bump()?;
                let cond = self.parse_paren_expr()?;
                self.check_scalar_cond(&cond)?;
                let l_start = self.next_label();
                let l_end = self.next_label();
                self.continues.push(l_start.clone());
                self.breaks.push(l_end.clone());
                let body = Box::new(self.parse_stmt()?);
                self.continues.pop();
                self.breaks.pop();
                Ok(Stmt::While(While {
                    cond,
                    body,
                    l_start,
                    l_end,
                    pos,
                }))
            }
            TokenKind::Do => {
                self.bump()?;
                let l_start = self.next_label();
                let l_cond = self.next_label();
                let l_end = self.next_label();
                self.continues.push(l_cond.clone());
                self.breaks.push(l_end.clone());
                let body = Box::new(self.parse_stmt()?);
                self.continues.pop();
                self.breaks.pop();
                self.expect(TokenKind::While)?;
                let cond = self.parse_paren_expr()?;
                self.check_scalar_cond(&cond)?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::DoWhile(DoWhile {
                    body,
                    cond,
                    l_start,
                    l_cond,
                    l_end,
                    pos,
                }))
            }
            TokenKind::For => {
                self.bump()?;
                self.expect(TokenKind::Lparen)?;
                self.scope.push();
                let init = if self.accept(TokenKind::Semicolon)? {
                    None
                } else if self.is_decl_start() {
                    let ipos = self.pos();
                    let mut items = Vec::new();
                    self.parse_local_decl(&mut items)?;
                    Some(Box::new(Stmt::Block(Block {
                        body: items,
                        pos: ipos,
                    })))
                } else {
                    let e = self.parse_expr(1)?;
                    self.expect(TokenKind::Semicolon)?;
                    let epos = e.pos().clone();
                    Some(Box::new(Stmt::Expr(ExprStmt { expr: e, pos: epos })))
                };
                let cond = if self.curt.kind == TokenKind::Semicolon {
                    None
                } else {
                    let c = self.parse_expr(1)?;
                    self.check_scalar_cond(&c)?;
                    Some(c)
                };
                self.expect(TokenKind::Semicolon)?;
                let step = if self.curt.kind == TokenKind::Rparen {
                    None
                } else {
                    Some(self.parse_expr(1)?)
                };
                self.expect(TokenKind::Rparen)?;
                let l_start = self.next_label();
                let l_step = self.next_label();
                let l_end = self.next_label();
                self.continues.push(l_step.clone());
                self.breaks.push(l_end.clone());
                let body = Box::new(self.parse_stmt()?);
                self.continues.pop();
                self.breaks.pop();
                self.scope.pop();
                Ok(Stmt::For(For {
                    init,
                    cond,
                    step,
                    body,
                    l_start,
                    l_step,
                    l_end,
                    pos,
                }))
            }
            TokenKind::Switch => {
                self.bump()?;
                let expr = self.parse_paren_expr()?;
                if !expr.ty().is_int() {
                    return Err(InnerParseError::NonIntegralSwitch.at(expr.pos().clone()));
                }
                let l_after = self.next_label();
                self.switches.push(SwitchCtx {
                    cases: Vec::new(),
                    default: None,
                    l_after: l_after.clone(),
                });
                self.breaks.push(l_after.clone());
                let body = Box::new(self.parse_stmt()?);
                self.breaks.pop();
                let ctx = self.switches.pop().expect("switch context pushed above");
                Ok(Stmt::Switch(Switch {
                    expr,
                    body,
                    cases: ctx.cases,
                    l_default: ctx.default,
                    l_after,
                    pos,
                }))
            }
            TokenKind::Case => {
                self.bump()?;
                let e = self.parse_assignment_expr()?;
                let val = fold::fold_integer(&e).map_err(|_| {
                    InnerParseError::NotConstant("case label".to_owned()).at(e.pos().clone())
                })?;
                self.expect(TokenKind::Colon)?;
                let label = self.next_label();
                {
                    let Some(ctx) = self.switches.last_mut() else {
                        return Err(InnerParseError::CaseOutsideSwitch.at(pos));
                    };
                    if ctx.cases.iter().any(|c| c.val == val) {
                        return Err(InnerParseError::DuplicateCase(val).at(pos));
                    }
                    ctx.cases.push(SwitchCase {
                        val,
                        label: label.clone(),
                    });
                }
                let stmt = Box::new(self.parse_stmt()?);
                Ok(Stmt::Labeled(LabeledStmt {
                    anon_label: label,
                    stmt,
                    pos,
                }))
            }
            TokenKind::Default => {
                self.bump()?;
                self.expect(TokenKind::Colon)?;
                let label = self.next_label();
                {
                    let Some(ctx) = self.switches.last_mut() else {
                        return Err(InnerParseError::DefaultOutsideSwitch.at(pos));
                    };
                    if ctx.default.is_some() {
                        return Err(InnerParseError::MultipleDefaults.at(pos));
                    }
                    ctx.default = Some(label.clone());
                }
                let stmt = Box::new(self.parse_stmt()?);
                Ok(Stmt::Labeled(LabeledStmt {
                    anon_label: label,
                    stmt,
                    pos,
                }))
            }
            TokenKind::Goto => {
                self.bump()?;
                let target = self.expect(TokenKind::Ident).map_err(|_| {
                    InnerParseError::ExpectedIdent(self.curt.kind).at(self.pos())
                })?;
                self.expect(TokenKind::Semicolon)?;
                self.pending_gotos.push((target.val.clone(), pos.clone()));
                Ok(Stmt::Goto(Goto {
                    label: target.val,
                    pos,
                }))
            }
            TokenKind::Break => {
                self.bump()?;
                self.expect(TokenKind::Semicolon)?;
                let Some(label) = self.breaks.last() else {
                    return Err(InnerParseError::BreakOutsideLoop.at(pos));
                };
                Ok(Stmt::Goto(Goto {
                    label: label.clone(),
                    pos,
                }))
            }
            TokenKind::Continue => {
                self.bump()?;
                self.expect(TokenKind::Semicolon)?;
                let Some(label) = self.continues.last() else {
                    return Err(InnerParseError::ContinueOutsideLoop.at(pos));
                };
                Ok(Stmt::Goto(Goto {
                    label: label.clone(),
                    pos,
                }))
            }
            TokenKind::Return => {
                self.bump()?;
                let expr = if self.accept(TokenKind::Semicolon)? {
                    None
                } else {
                    let e = self.parse_expr(1)?;
                    self.expect(TokenKind::Semicolon)?;
                    Some(e)
                };
                Ok(Stmt::Return(Return { expr, pos }))
            }
            TokenKind::Semicolon => {
                self.bump()?;
                Ok(Stmt::Empty(pos))
            }
            TokenKind::Ident if self.nextt.kind == TokenKind::Colon => {
                let name = self.bump()?.val;
                self.bump()?; // :
                if self.labels.contains_key(&name) {
                    return Err(InnerParseError::DuplicateLabel(name).at(pos));
                }
                let anon = self.next_label();
                self.labels.insert(name, anon.clone());
                let stmt = Box::new(self.parse_stmt()?);
                Ok(Stmt::Labeled(LabeledStmt {
                    anon_label: anon,
                    stmt,
                    pos,
                }))
            }
            _ => {
                let expr = self.parse_expr(1)?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Expr(ExprStmt { expr, pos }))
            }
        }
    }

    // ------------------------------------------------------------------
    // Expressions

    fn parse_assignment_expr(&mut self) -> Result<Expr> {
        self.parse_expr(2)
    }

    /// Precedence climbing over the binary operator ladder. Assignment
    /// is right associative, everything else is left associative.
    fn parse_expr(&mut self, min_prec: u8) -> Result<Expr> {
        let mut left = self.parse_factor()?;
        loop {
            let k = self.curt.kind;
            let prec = binop_prec(k);
            if prec == 0 || prec < min_prec {
                break;
            }
            let pos = self.pos();
            if k == TokenKind::Assign {
                self.bump()?;
                let r = self.parse_expr(prec)?;
                left = self.mk_assign(left, r, pos)?;
            } else if k.is_compound_assign() {
                self.bump()?;
                let r = self.parse_expr(prec)?;
                let op = binop_from_token(k.compound_to_single());
                let combined = self.mk_binary(op, left.clone(), r, pos.clone())?;
                left = self.mk_assign(left, combined, pos)?;
            } else if k == TokenKind::Comma {
                self.bump()?;
                let r = self.parse_expr(prec + 1)?;
                let ty = r.ty();
                left = Expr::Binary(Binary {
                    op: BinaryOp::Comma,
                    l: Box::new(left),
                    r: Box::new(r),
                    ty,
                    pos,
                });
            } else {
                self.bump()?;
                let r = self.parse_expr(prec + 1)?;
                left = self.mk_binary(binop_from_token(k), left, r, pos)?;
            }
        }
        Ok(left)
    }

    fn mk_assign(&self, l: Expr, r: Expr, pos: FilePos) -> Result<Expr> {
        if !l.is_lvalue() {
            return Err(InnerParseError::NotAssignable.at(pos));
        }
        let lt = l.ty();
        let rt = r.ty().decayed();
        if !(lt.is_scalar() && rt.is_scalar()) {
            return Err(InnerParseError::BadOperands("=").at(pos));
        }
        Ok(Expr::Binary(Binary {
            op: BinaryOp::Assign,
            l: Box::new(l),
            r: Box::new(r),
            ty: lt,
            pos,
        }))
    }

    fn mk_binary(&self, op: BinaryOp, l: Expr, r: Expr, pos: FilePos) -> Result<Expr> {
        let lt = l.ty().decayed();
        let rt = r.ty().decayed();
        let ty = if op.is_comparison() || op == BinaryOp::LAnd || op == BinaryOp::LOr {
            if !(lt.is_scalar() && rt.is_scalar()) {
                return Err(InnerParseError::BadOperands(binop_name(op)).at(pos));
            }
            CType::Prim(Primitive::Int)
        } else {
            if !(lt.is_int() && rt.is_int()) {
                return Err(InnerParseError::BadOperands(binop_name(op)).at(pos));
            }
            common_int_type(&lt, &rt)
        };
        Ok(Expr::Binary(Binary {
            op,
            l: Box::new(l),
            r: Box::new(r),
            ty,
            pos,
        }))
    }

    fn parse_factor(&mut self) -> Result<Expr> {
        let pos = self.pos();
        match self.curt.kind {
            TokenKind::Lparen => {
                if self.starts_type(self.nextt.kind, &self.nextt.val) {
                    self.bump()?;
                    let ty = self.parse_type_name()?;
                    self.expect(TokenKind::Rparen)?;
                    let operand = self.parse_factor()?;
                    check_cast(&ty, &operand.ty().decayed(), &pos)?;
                    Ok(Expr::Cast(Cast {
                        operand: Box::new(operand),
                        ty,
                        pos,
                    }))
                } else {
                    self.bump()?;
                    let e = self.parse_expr(1)?;
                    self.expect(TokenKind::Rparen)?;
                    self.parse_postfix(e)
                }
            }
            TokenKind::Mul => {
                self.bump()?;
                let operand = self.parse_factor()?;
                let ty = operand.ty().decayed();
                let Some(pointee) = ty.pointee().cloned() else {
                    return Err(InnerParseError::DerefNonPointer.at(pos));
                };
                Ok(Expr::Unary(Unary {
                    op: UnaryOp::Deref,
                    operand: Box::new(operand),
                    ty: pointee,
                    pos,
                }))
            }
            TokenKind::And => {
                self.bump()?;
                let operand = self.parse_factor()?;
                if !operand.is_lvalue() {
                    return Err(InnerParseError::AddrOfNonLvalue.at(pos));
                }
                let ty = operand.ty().ptr_to();
                Ok(Expr::Unary(Unary {
                    op: UnaryOp::Addr,
                    operand: Box::new(operand),
                    ty,
                    pos,
                }))
            }
            TokenKind::Sub => self.parse_int_unary(UnaryOp::Neg, pos),
            TokenKind::Add => self.parse_int_unary(UnaryOp::Plus, pos),
            TokenKind::BNot => self.parse_int_unary(UnaryOp::BNot, pos),
            TokenKind::Not => {
                self.bump()?;
                let operand = self.parse_factor()?;
                if !operand.ty().decayed().is_scalar() {
                    return Err(InnerParseError::BadOperands("!").at(pos));
                }
                Ok(Expr::Unary(Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                    ty: CType::Prim(Primitive::Int),
                    pos,
                }))
            }
            TokenKind::Inc => self.parse_incdec(UnaryOp::PreInc, pos),
            TokenKind::Dec => self.parse_incdec(UnaryOp::PreDec, pos),
            TokenKind::Sizeof => {
                self.bump()?;
                if self.curt.kind != TokenKind::Lparen
                    || !self.starts_type(self.nextt.kind, &self.nextt.val)
                {
                    return Err(InnerParseError::SizeofRequiresType.at(pos));
                }
                self.bump()?;
                let ty = self.parse_type_name()?;
                self.expect(TokenKind::Rparen)?;
                Ok(Expr::Constant(Constant {
                    val: ty.size() as i64,
                    ty: CType::Prim(Primitive::ULong),
                    pos,
                }))
            }
            TokenKind::Ident => {
                let Some(sym) = self.scope.lookup(&self.curt.val) else {
                    return Err(
                        InnerParseError::UndeclaredIdentifier(self.curt.val.clone()).at(pos)
                    );
                };
                self.bump()?;
                self.parse_postfix(Expr::Ident(Ident { sym, pos }))
            }
            TokenKind::IntConstant => {
                let tok = self.bump()?;
                let (val, ty) = parse_int_literal(&tok.val)
                    .ok_or_else(|| InnerParseError::BadIntLiteral(tok.val.clone()).at(pos.clone()))?;
                self.parse_postfix(Expr::Constant(Constant { val, ty, pos }))
            }
            TokenKind::CharConstant => {
                let tok = self.bump()?;
                let val = unescape_char_constant(&tok.val).ok_or_else(|| {
                    InnerParseError::BadCharConstant(tok.val.clone()).at(pos.clone())
                })?;
                // character constants have type int
                Ok(Expr::Constant(Constant {
                    val,
                    ty: CType::Prim(Primitive::Int),
                    pos,
                }))
            }
            TokenKind::StringLit => {
                let tok = self.bump()?;
                let label = self.next_label();
                self.anon_inits.push(StringInit {
                    label: label.clone(),
                    val: tok.val,
                });
                self.parse_postfix(Expr::Str(Str { label, pos }))
            }
            TokenKind::FloatConstant => Err(InnerParseError::FloatUnsupported.at(pos)),
            _ => Err(InnerParseError::UnexpectedToken(self.curt.val.clone()).at(pos)),
        }
    }

    fn parse_int_unary(&mut self, op: UnaryOp, pos: FilePos) -> Result<Expr> {
        self.bump()?;
        let operand = self.parse_factor()?;
        let ty = operand.ty();
        if !ty.is_int() {
            return Err(InnerParseError::BadOperands(unop_name(op)).at(pos));
        }
        Ok(Expr::Unary(Unary {
            op,
            operand: Box::new(operand),
            ty,
            pos,
        }))
    }

    fn parse_incdec(&mut self, op: UnaryOp, pos: FilePos) -> Result<Expr> {
        self.bump()?;
        let operand = self.parse_factor()?;
        self.check_incdec_operand(&operand, op, &pos)?;
        let ty = operand.ty();
        Ok(Expr::Unary(Unary {
            op,
            operand: Box::new(operand),
            ty,
            pos,
        }))
    }

    fn check_incdec_operand(&self, operand: &Expr, op: UnaryOp, pos: &FilePos) -> Result<()> {
        if !operand.is_lvalue() {
            return Err(InnerParseError::NotAssignable.at(pos.clone()));
        }
        if !operand.ty().is_scalar() {
            return Err(InnerParseError::BadOperands(unop_name(op)).at(pos.clone()));
        }
        Ok(())
    }

    fn parse_postfix(&mut self, mut e: Expr) -> Result<Expr> {
        loop {
            let pos = self.pos();
            match self.curt.kind {
                TokenKind::Lbrack => {
                    self.bump()?;
                    let idx = self.parse_expr(1)?;
                    self.expect(TokenKind::Rbrack)?;
                    let arr_ty = e.ty().decayed();
                    let Some(elem) = arr_ty.pointee().cloned() else {
                        return Err(InnerParseError::SubscriptNonArray.at(pos));
                    };
                    if !idx.ty().is_int() {
                        return Err(InnerParseError::NonIntegerSubscript.at(idx.pos().clone()));
                    }
                    e = Expr::Index(Index {
                        arr: Box::new(e),
                        idx: Box::new(idx),
                        ty: elem,
                        pos,
                    });
                }
                TokenKind::Lparen => {
                    self.bump()?;
                    let Some(ftype) = e.ty().func_type().cloned() else {
                        return Err(InnerParseError::CallOfNonFunction.at(pos));
                    };
                    let mut args = Vec::new();
                    if self.curt.kind != TokenKind::Rparen {
                        loop {
                            args.push(self.parse_assignment_expr()?);
                            if !self.accept(TokenKind::Comma)? {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::Rparen)?;
                    let arity_ok = if ftype.variadic {
                        args.len() >= ftype.params.len()
                    } else {
                        args.len() == ftype.params.len()
                    };
                    if !arity_ok {
                        return Err(InnerParseError::ExpectedArgsCountButGot(
                            ftype.params.len(),
                            args.len(),
                        )
                        .at(pos));
                    }
                    e = Expr::Call(Call {
                        callee: Box::new(e),
                        args,
                        ty: ftype.ret.clone(),
                        pos,
                    });
                }
                TokenKind::Period => {
                    self.bump()?;
                    let field = self.expect(TokenKind::Ident)?.val;
                    let ty = e.ty();
                    let Some(st) = ty.struct_type() else {
                        return Err(InnerParseError::SelectorOnNonStruct.at(pos));
                    };
                    let Some((_, fty)) = st.field(&field) else {
                        return Err(InnerParseError::NoSuchField(field).at(pos));
                    };
                    e = Expr::Selector(Selector {
                        operand: Box::new(e),
                        field,
                        arrow: false,
                        ty: fty,
                        pos,
                    });
                }
                TokenKind::Arrow => {
                    self.bump()?;
                    let field = self.expect(TokenKind::Ident)?.val;
                    let ty = e.ty().decayed();
                    let pointee = ty.pointee();
                    let Some(st) = pointee.and_then(CType::struct_type) else {
                        return Err(InnerParseError::ArrowOnNonPointer.at(pos));
                    };
                    let Some((_, fty)) = st.field(&field) else {
                        return Err(InnerParseError::NoSuchField(field).at(pos));
                    };
                    e = Expr::Selector(Selector {
                        operand: Box::new(e),
                        field,
                        arrow: true,
                        ty: fty,
                        pos,
                    });
                }
                TokenKind::Inc | TokenKind::Dec => {
                    let op = if self.curt.kind == TokenKind::Inc {
                        UnaryOp::PostInc
                    } else {
                        UnaryOp::PostDec
                    };
                    self.bump()?;
                    self.check_incdec_operand(&e, op, &pos)?;
                    let ty = e.ty();
                    e = Expr::Unary(Unary {
                        op,
                        operand: Box::new(e),
                        ty,
                        pos,
                    });
                }
                _ => return Ok(e),
            }
        }
    }
}

fn binop_prec(k: TokenKind) -> u8 {
    use TokenKind::*;
    match k {
        Comma => 1,
        Assign | AddAssign | SubAssign | MulAssign | QuoAssign | RemAssign | AndAssign
        | OrAssign | XorAssign | ShlAssign | ShrAssign => 2,
        LOr => 4,
        LAnd => 5,
        Or => 6,
        Xor => 7,
        And => 8,
        Eql | Neq => 9,
        Lss | Gtr | Leq | Geq => 10,
        Shl | Shr => 11,
        Add | Sub => 12,
        Mul | Quo | Rem => 13,
        _ => 0,
    }
}

fn binop_from_token(k: TokenKind) -> BinaryOp {
    use TokenKind::*;
    match k {
        Add => BinaryOp::Add,
        Sub => BinaryOp::Sub,
        Mul => BinaryOp::Mul,
        Quo => BinaryOp::Div,
        Rem => BinaryOp::Rem,
        And => BinaryOp::And,
        Or => BinaryOp::Or,
        Xor => BinaryOp::Xor,
        Shl => BinaryOp::Shl,
        Shr => BinaryOp::Shr,
        Eql => BinaryOp::Eql,
        Neq => BinaryOp::Neq,
        Lss => BinaryOp::Lss,
        Gtr => BinaryOp::Gtr,
        Leq => BinaryOp::Leq,
        Geq => BinaryOp::Geq,
        LAnd => BinaryOp::LAnd,
        LOr => BinaryOp::LOr,
        _ => unreachable!("not a binary operator token: {k}"),
    }
}

fn binop_name(op: BinaryOp) -> &'static str {
    use BinaryOp::*;
    match op {
        Assign => "=",
        Add => "+",
        Sub => "-",
        Mul => "*",
        Div => "/",
        Rem => "%",
        And => "&",
        Or => "|",
        Xor => "^",
        Shl => "<<",
        Shr => ">>",
        Eql => "==",
        Neq => "!=",
        Lss => "<",
        Gtr => ">",
        Leq => "<=",
        Geq => ">=",
        LAnd => "&&",
        LOr => "||",
        Comma => ",",
    }
}

fn unop_name(op: UnaryOp) -> &'static str {
    use UnaryOp::*;
    match op {
        Addr => "&",
        Deref => "*",
        Neg => "-",
        Plus => "+",
        Not => "!",
        BNot => "~",
        PreInc | PostInc => "++",
        PreDec | PostDec => "--",
    }
}

/// Arithmetic on two integer types: equal types keep their type,
/// anything mixed widens to long.
fn common_int_type(l: &CType, r: &CType) -> CType {
    match (l, r) {
        (CType::Prim(a), CType::Prim(b)) if a == b => l.clone(),
        _ => CType::Prim(Primitive::Long),
    }
}

fn check_cast(to: &CType, from: &CType, pos: &FilePos) -> Result<()> {
    let ok = (to.is_int() && (from.is_int() || from.is_ptr()))
        || (to.is_ptr() && (from.is_int() || from.is_ptr()));
    if ok {
        Ok(())
    } else {
        Err(InnerParseError::BadCast.at(pos.clone()))
    }
}

/// Folds the declarator spine around the base type, outermost suffix
/// first, then recurses into a parenthesized inner declarator with the
/// wrapped type as its base.
fn fold_declarator(
    d: Declarator,
    base: CType,
) -> std::result::Result<(Option<String>, CType), InnerParseError> {
    let mut ty = base;
    for _ in 0..d.nptr {
        ty = ty.ptr_to();
    }
    for s in d.suffixes.into_iter().rev() {
        ty = match s {
            DeclSuffix::Arr(dim) => {
                if ty.is_func() {
                    return Err(InnerParseError::ArrayOfFunctions);
                }
                CType::Array(Box::new(ty), dim)
            }
            DeclSuffix::Fun(params, param_names, variadic) => CType::Func(Rc::new(FuncType {
                ret: ty,
                params,
                param_names,
                variadic,
            })),
        };
    }
    match d.inner {
        Some(inner) => fold_declarator(*inner, ty),
        None => Ok((d.name, ty)),
    }
}

/// Decodes an integer literal with its suffixes into a value and a type.
fn parse_int_literal(val: &str) -> Option<(i64, CType)> {
    let digits = val.trim_end_matches(|c| matches!(c, 'l' | 'L' | 'u' | 'U'));
    let suffix = &val[digits.len()..];
    let is_unsigned = suffix.contains(['u', 'U']);
    let is_long = suffix.contains(['l', 'L']);
    let parsed = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).ok()?
    } else if digits.len() > 1 && digits.starts_with('0') {
        u64::from_str_radix(&digits[1..], 8).ok()?
    } else {
        digits.parse::<u64>().ok()?
    };
    let ty = if is_unsigned {
        if !is_long && u32::try_from(parsed).is_ok() {
            Primitive::UInt
        } else {
            Primitive::ULong
        }
    } else if !is_long && i32::try_from(parsed).is_ok() {
        Primitive::Int
    } else {
        Primitive::Long
    };
    Some((parsed as i64, CType::Prim(ty)))
}

/// Interprets a character constant like `'a'` or `'\n'`.
fn unescape_char_constant(val: &str) -> Option<i64> {
    let inner = val.strip_prefix('\'')?.strip_suffix('\'')?;
    let mut chars = inner.chars();
    let first = chars.next()?;
    let c = if first == '\\' {
        let esc = chars.next()?;
        match esc {
            'n' => '\n' as i64,
            't' => '\t' as i64,
            'r' => '\r' as i64,
            '0' => 0,
            '\\' => '\\' as i64,
            '\'' => '\'' as i64,
            '"' => '"' as i64,
            _ => return None,
        }
    } else {
        first as i64
    };
    if chars.next().is_some() {
        return None;
    }
    Some(c)
}

/// Rewrites user goto targets to their synthetic labels once the whole
/// function has been parsed. Break and continue jumps already carry
/// synthetic labels and are left alone.
fn patch_gotos(stmts: &mut [Stmt], labels: &HashMap<String, Label>) {
    for s in stmts {
        patch_goto_stmt(s, labels);
    }
}

fn patch_goto_stmt(s: &mut Stmt, labels: &HashMap<String, Label>) {
    match s {
        Stmt::Goto(g) => {
            if !g.label.starts_with(".L") {
                g.label = labels
                    .get(&g.label)
                    .expect("pending gotos were checked")
                    .clone();
            }
        }
        Stmt::If(i) => {
            patch_goto_stmt(&mut i.then, labels);
            if let Some(els) = &mut i.els {
                patch_goto_stmt(els, labels);
            }
        }
        Stmt::While(w) => patch_goto_stmt(&mut w.body, labels),
        Stmt::DoWhile(d) => patch_goto_stmt(&mut d.body, labels),
        Stmt::For(f) => {
            if let Some(init) = &mut f.init {
                patch_goto_stmt(init, labels);
            }
            patch_goto_stmt(&mut f.body, labels);
        }
        Stmt::Switch(sw) => patch_goto_stmt(&mut sw.body, labels),
        Stmt::Block(b) => patch_gotos(&mut b.body, labels),
        Stmt::Labeled(l) => patch_goto_stmt(&mut l.stmt, labels),
        Stmt::Return(_) | Stmt::Expr(_) | Stmt::Decl(_) | Stmt::Empty(_) => {}
    }
}
