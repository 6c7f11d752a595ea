//! Type representation shared by the checker, IR generator, and emitter
//!
//! A single `Type` enum rather than the teacher's per-kind structs,
//! since spec 3 and 4.6 both describe a flat, closed set of type forms
//! with one C99 lowering each.

use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Bool,
    Byte,
    Void,
    Usize,
    Pointer(Box<Type>),
    /// `[T: N]` or `[T; N]` — `size` is already constant-folded (spec 3 invariant).
    Array { elem: Box<Type>, size: i64 },
    Tuple(Vec<Type>),
    /// `!T`
    ErrorUnion(Box<Type>),
    Atomic(Box<Type>),
    Fn { params: Vec<Type>, ret: Box<Type> },
    /// User struct/enum/interface name.
    Named(Rc<str>),
}

impl Type {
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Type::I8 | Type::I16 | Type::I32 | Type::I64 | Type::U8 | Type::U16 | Type::U32 | Type::U64 | Type::Usize | Type::Byte
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Type::F32 | Type::F64)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// The canonical fragment used to build tuple struct names and
    /// error-union struct names (spec 3 / spec 6: `tuple_i32_bool`,
    /// `err_union_<base-c-type>`). Must be stable and collision-free
    /// across the closed set of `Type` forms.
    pub fn type_key(&self) -> String {
        match self {
            Type::I8 => "i8".into(),
            Type::I16 => "i16".into(),
            Type::I32 => "i32".into(),
            Type::I64 => "i64".into(),
            Type::U8 => "u8".into(),
            Type::U16 => "u16".into(),
            Type::U32 => "u32".into(),
            Type::U64 => "u64".into(),
            Type::F32 => "f32".into(),
            Type::F64 => "f64".into(),
            Type::Bool => "bool".into(),
            Type::Byte => "byte".into(),
            Type::Void => "void".into(),
            Type::Usize => "usize".into(),
            Type::Pointer(t) => format!("ptr_{}", t.type_key()),
            Type::Array { elem, size } => format!("arr{size}_{}", elem.type_key()),
            Type::Tuple(elems) => format!("tuple_{}", elems.iter().map(|e| e.type_key()).collect::<Vec<_>>().join("_")),
            Type::ErrorUnion(t) => format!("errunion_{}", t.type_key()),
            Type::Atomic(t) => format!("atomic_{}", t.type_key()),
            Type::Fn { .. } => "fnptr".into(),
            Type::Named(n) => n.to_string(),
        }
    }

    /// Name of the synthesized tuple struct for this type, assuming
    /// `self` is a `Type::Tuple` (spec 6: `tuple_<typekey1>[_<typekey2>...]`).
    pub fn tuple_struct_name(elems: &[Type]) -> String {
        format!("tuple_{}", elems.iter().map(|e| e.type_key()).collect::<Vec<_>>().join("_"))
    }

    /// Name of the synthesized error-union struct for base type `base`
    /// (spec 4.6: `err_union_<T>`).
    pub fn err_union_struct_name(base: &Type) -> String {
        format!("err_union_{}", base.c_type_name())
    }

    /// The C99 spelling for this type (spec 4.6 type mapping table).
    /// Pointer and array forms render the element type here; the
    /// emitter still needs the declarator-specific syntax (`T *name`,
    /// `T name[N]`) which lives in `emit.rs`.
    pub fn c_type_name(&self) -> String {
        match self {
            Type::I8 => "int8_t".into(),
            Type::I16 => "int16_t".into(),
            Type::I32 => "int32_t".into(),
            Type::I64 => "int64_t".into(),
            Type::U8 => "uint8_t".into(),
            Type::U16 => "uint16_t".into(),
            Type::U32 => "uint32_t".into(),
            Type::U64 => "uint64_t".into(),
            Type::F32 => "float".into(),
            Type::F64 => "double".into(),
            Type::Bool => "bool".into(),
            Type::Byte => "uint8_t".into(),
            Type::Void => "void".into(),
            Type::Usize => "size_t".into(),
            Type::Pointer(t) => format!("{} *", t.c_type_name()),
            Type::Array { elem, .. } => elem.c_type_name(),
            Type::Tuple(elems) => Type::tuple_struct_name(elems),
            Type::ErrorUnion(t) => Type::err_union_struct_name(t),
            Type::Atomic(t) => format!("_Atomic {}", t.c_type_name()),
            Type::Fn { .. } => "void *".into(),
            Type::Named(n) => n.to_string(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Pointer(t) => write!(f, "*{t}"),
            Type::Array { elem, size } => write!(f, "[{elem}: {size}]"),
            Type::Tuple(elems) => {
                write!(f, "(")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, ")")
            }
            Type::ErrorUnion(t) => write!(f, "!{t}"),
            Type::Atomic(t) => write!(f, "atomic {t}"),
            Type::Fn { params, ret } => {
                write!(f, "fn(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") {ret}")
            }
            Type::Named(n) => write!(f, "{n}"),
            other => write!(f, "{}", other.type_key()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuple_struct_name_matches_spec_example() {
        assert_eq!(Type::tuple_struct_name(&[Type::I32, Type::Bool]), "tuple_i32_bool");
    }

    #[test]
    fn err_union_struct_name_uses_c_type() {
        assert_eq!(Type::err_union_struct_name(&Type::I32), "err_union_int32_t");
    }

    #[test]
    fn same_shape_tuples_produce_identical_key() {
        let a = Type::Tuple(vec![Type::I32, Type::Bool]);
        let b = Type::Tuple(vec![Type::I32, Type::Bool]);
        assert_eq!(a.type_key(), b.type_key());
    }
}
