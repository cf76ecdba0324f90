//! The C type model: primitives, pointers, arrays, struct/unions and
//! function types.

use std::cell::RefCell;
use std::rc::Rc;

/// All the primitive C types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Void,
    Enum,
    // Signed
    Char,
    Short,
    Int,
    Long,
    LLong,
    // Unsigned
    Bool,
    UChar,
    UShort,
    UInt,
    ULong,
    ULLong,
    // Floats
    Float,
    Double,
    LDouble,
}

impl Primitive {
    pub fn size(self) -> usize {
        use Primitive::*;
        match self {
            Void => 0,
            Bool | Char | UChar => 1,
            Short | UShort => 2,
            Enum | Int | UInt | Float => 4,
            Long | ULong | LLong | ULLong | Double => 8,
            LDouble => 16,
        }
    }

    pub fn align(self) -> usize {
        self.size().max(1)
    }

    pub fn is_int(self) -> bool {
        use Primitive::*;
        matches!(
            self,
            Enum | Char | Short | Int | Long | LLong | Bool | UChar | UShort | UInt | ULong | ULLong
        )
    }

    /// `char` is signed in this implementation.
    pub fn is_signed(self) -> bool {
        use Primitive::*;
        matches!(self, Enum | Char | Short | Int | Long | LLong)
    }
}

/// Struct or union. The body is filled in after the tag is introduced so
/// that self referential types (`struct list { struct list *next; }`)
/// can resolve the tag while the fields are still being parsed.
#[derive(Debug)]
pub struct StructType {
    pub tag: Option<String>,
    pub is_union: bool,
    body: RefCell<Option<StructBody>>,
}

#[derive(Debug)]
pub struct StructBody {
    pub names: Vec<String>,
    pub types: Vec<CType>,
}

impl StructType {
    pub fn incomplete(tag: Option<String>, is_union: bool) -> Self {
        Self {
            tag,
            is_union,
            body: RefCell::new(None),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.body.borrow().is_some()
    }

    pub fn complete(&self, names: Vec<String>, types: Vec<CType>) {
        *self.body.borrow_mut() = Some(StructBody { names, types });
    }

    /// Byte offset and type of a named field. Offsets respect each
    /// field's natural alignment; union members all sit at offset zero.
    pub fn field(&self, name: &str) -> Option<(usize, CType)> {
        let body = self.body.borrow();
        let body = body.as_ref()?;
        let mut offset = 0usize;
        for (n, ty) in body.names.iter().zip(&body.types) {
            if !self.is_union {
                offset = round_up(offset, ty.align());
            }
            if n == name {
                return Some((if self.is_union { 0 } else { offset }, ty.clone()));
            }
            if !self.is_union {
                offset += ty.size();
            }
        }
        None
    }

    pub fn size(&self) -> usize {
        let body = self.body.borrow();
        let Some(body) = body.as_ref() else { return 0 };
        if self.is_union {
            let max = body.types.iter().map(CType::size).max().unwrap_or(0);
            return round_up(max, self.align());
        }
        let mut offset = 0usize;
        for ty in &body.types {
            offset = round_up(offset, ty.align());
            offset += ty.size();
        }
        round_up(offset, self.align())
    }

    pub fn align(&self) -> usize {
        let body = self.body.borrow();
        let Some(body) = body.as_ref() else { return 1 };
        body.types.iter().map(CType::align).max().unwrap_or(1)
    }
}

fn round_up(n: usize, align: usize) -> usize {
    if align == 0 {
        return n;
    }
    n.div_ceil(align) * align
}

#[derive(Debug, Clone)]
pub struct FuncType {
    pub ret: CType,
    pub params: Vec<CType>,
    pub param_names: Vec<String>,
    pub variadic: bool,
}

#[derive(Debug, Clone)]
pub enum CType {
    Prim(Primitive),
    Ptr(Box<CType>),
    Array(Box<CType>, usize),
    Struct(Rc<StructType>),
    Func(Rc<FuncType>),
}

impl CType {
    pub fn ptr_to(self) -> Self {
        CType::Ptr(Box::new(self))
    }

    pub fn size(&self) -> usize {
        match self {
            CType::Prim(p) => p.size(),
            CType::Ptr(_) => 8,
            CType::Array(elem, dim) => elem.size() * dim,
            CType::Struct(s) => s.size(),
            CType::Func(_) => panic!("internal error: size of function type"),
        }
    }

    pub fn align(&self) -> usize {
        match self {
            CType::Prim(p) => p.align(),
            CType::Ptr(_) => 8,
            CType::Array(elem, _) => elem.align(),
            CType::Struct(s) => s.align(),
            CType::Func(_) => panic!("internal error: align of function type"),
        }
    }

    pub fn is_ptr(&self) -> bool {
        matches!(self, CType::Ptr(_))
    }

    pub fn is_int(&self) -> bool {
        matches!(self, CType::Prim(p) if p.is_int())
    }

    pub fn is_signed_int(&self) -> bool {
        matches!(self, CType::Prim(p) if p.is_signed())
    }

    pub fn is_scalar(&self) -> bool {
        self.is_int() || self.is_ptr()
    }

    pub fn is_array(&self) -> bool {
        matches!(self, CType::Array(..))
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, CType::Struct(_))
    }

    pub fn is_func(&self) -> bool {
        matches!(self, CType::Func(_))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, CType::Prim(Primitive::Void))
    }

    pub fn is_float(&self) -> bool {
        matches!(
            self,
            CType::Prim(Primitive::Float | Primitive::Double | Primitive::LDouble)
        )
    }

    /// Target of a pointer, element of an array.
    pub fn pointee(&self) -> Option<&CType> {
        match self {
            CType::Ptr(t) => Some(t),
            CType::Array(t, _) => Some(t),
            _ => None,
        }
    }

    pub fn struct_type(&self) -> Option<&Rc<StructType>> {
        match self {
            CType::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn func_type(&self) -> Option<&Rc<FuncType>> {
        match self {
            CType::Func(f) => Some(f),
            CType::Ptr(inner) => match inner.as_ref() {
                CType::Func(f) => Some(f),
                _ => None,
            },
            _ => None,
        }
    }

    /// Arrays and functions decay to pointers when used as values.
    #[must_use]
    pub fn decayed(&self) -> CType {
        match self {
            CType::Array(elem, _) => CType::Ptr(elem.clone()),
            CType::Func(_) => self.clone().ptr_to(),
            other => other.clone(),
        }
    }
}
