use crate::ast::Symbol;
use crate::ctypes::{CType, StructType};

use std::collections::HashMap;
use std::rc::Rc;

/// A parent-linked name table carrying the three namespaces the parser
/// tracks: ordinary identifiers (variables, functions), typedef names,
/// and struct/union tags. Ordinary identifiers and typedef names share
/// one namespace as C requires; tags live in their own.
#[derive(Default)]
pub struct Scope {
    parent: Option<Box<Scope>>,
    ords: HashMap<String, OrdEntry>,
    tags: HashMap<String, Rc<StructType>>,
}

#[derive(Clone)]
enum OrdEntry {
    Sym(Symbol),
    Typedef(CType),
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a fresh innermost scope.
    pub fn push(&mut self) {
        let parent = std::mem::take(self);
        self.parent = Some(Box::new(parent));
    }

    /// Closes the innermost scope; declarations made in it vanish.
    pub fn pop(&mut self) {
        let parent = self.parent.take().expect("popped the file scope");
        *self = *parent;
    }

    /// Defines an ordinary identifier in the innermost scope.
    /// Redefinition within one scope level is an error; shadowing an
    /// outer scope is fine.
    pub fn define(&mut self, name: &str, sym: Symbol) -> Result<(), String> {
        self.define_ord(name, OrdEntry::Sym(sym))
    }

    pub fn define_typedef(&mut self, name: &str, ty: CType) -> Result<(), String> {
        self.define_ord(name, OrdEntry::Typedef(ty))
    }

    fn define_ord(&mut self, name: &str, entry: OrdEntry) -> Result<(), String> {
        if self.ords.contains_key(name) {
            return Err(format!("redefinition of {name}"));
        }
        self.ords.insert(name.to_owned(), entry);
        Ok(())
    }

    /// Replaces an existing ordinary definition at this level; used for
    /// a function definition following its own declaration.
    pub fn redefine(&mut self, name: &str, sym: Symbol) {
        self.ords.insert(name.to_owned(), OrdEntry::Sym(sym));
    }

    pub fn lookup(&self, name: &str) -> Option<Symbol> {
        match self.ords.get(name) {
            Some(OrdEntry::Sym(sym)) => Some(sym.clone()),
            Some(OrdEntry::Typedef(_)) => None,
            None => self.parent.as_ref()?.lookup(name),
        }
    }

    /// Resolves `name` as a typedef, walking outward.
    pub fn lookup_typedef(&self, name: &str) -> Option<CType> {
        match self.ords.get(name) {
            Some(OrdEntry::Typedef(ty)) => Some(ty.clone()),
            Some(OrdEntry::Sym(_)) => None,
            None => self.parent.as_ref()?.lookup_typedef(name),
        }
    }

    /// True if `name` means a typedef where it is used.
    pub fn is_typedef_name(&self, name: &str) -> bool {
        self.lookup_typedef(name).is_some()
    }

    pub fn define_tag(&mut self, tag: &str, ty: Rc<StructType>) -> Result<(), String> {
        if self.tags.contains_key(tag) {
            return Err(format!("redefinition of tag {tag}"));
        }
        self.tags.insert(tag.to_owned(), ty);
        Ok(())
    }

    /// Looks a tag up in the innermost scope only.
    pub fn lookup_tag_here(&self, tag: &str) -> Option<Rc<StructType>> {
        self.tags.get(tag).cloned()
    }

    pub fn lookup_tag(&self, tag: &str) -> Option<Rc<StructType>> {
        if let Some(t) = self.tags.get(tag) {
            return Some(Rc::clone(t));
        }
        self.parent.as_ref()?.lookup_tag(tag)
    }
}
