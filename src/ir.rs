//! Tagged intermediate representation (spec 3, 4.5)
//!
//! A flat-ish instruction graph: every instruction carries a unique id
//! from a per-generator counter (spec 3's "Lifecycle" note), and nested
//! bodies (then/else/loop body/catch body) are plain `Vec<Ir>` owned by
//! the enclosing instruction, matching "Function body is a dense array
//! of instruction pointers; nested bodies ... are arrays of pointers
//! owned by the enclosing instruction" under ordinary Rust ownership
//! (spec 9's re-architecture hint: arena indices are unnecessary once
//! back-edges are avoided by using a tree rather than a graph).

use crate::ast::BinOp;
use crate::types::Type;

#[derive(Debug, Clone)]
pub struct Ir {
    pub id: u64,
    pub kind: IrKind,
}

#[derive(Debug, Clone)]
pub enum ConstLit {
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone)]
pub enum IrKind {
    Constant(ConstLit),
    /// A leaf reference to a named value (parameter, local, global).
    /// Not separately named in spec 3's instruction list, but required
    /// as the leaf form every other instruction's operands bottom out
    /// in; see `DESIGN.md`.
    Ident { name: String, ty: Type },
    VarDecl { name: String, ty: Type, init: Option<Box<Ir>>, is_const: bool },
    Assign { target: Box<Ir>, value: Box<Ir> },
    BinaryOp { op: BinOp, lhs: Box<Ir>, rhs: Box<Ir>, ty: Type },
    UnaryOp { op: crate::ast::UnOp, operand: Box<Ir>, ty: Type },
    /// `as`/`as!`; `fallible` distinguishes the error-union-producing
    /// form (spec 4.3) from a plain reinterpretation.
    Cast { value: Box<Ir>, target_ty: Type, fallible: bool },
    Call { name: String, args: Vec<Ir>, ty: Type },
    Return { value: Option<Box<Ir>> },
    If { cond: Box<Ir>, then_body: Vec<Ir>, else_body: Vec<Ir> },
    While { cond: Box<Ir>, body: Vec<Ir> },
    /// Lowered index-driven loop; `index_name` is always present even
    /// for the by-value `|name|` form (it drives the emitted C `for`).
    For { array: Box<Ir>, index_name: String, elem_name: String, by_ref: bool, elem_ty: Type, size: i64, body: Vec<Ir> },
    Block(Vec<Ir>),
    /// `break`/`continue`; not separately named in spec 3's instruction
    /// list (grouped there under loop control) but needed as distinct
    /// leaf forms for the emitter. See `DESIGN.md`.
    Break,
    Continue,
    MemberAccess { object: Box<Ir>, field: String, ty: Type },
    Subscript { object: Box<Ir>, index: Box<Ir>, ty: Type },
    StructInit { type_name: String, fields: Vec<(String, Ir)> },
    ArrayLit { elem_ty: Type, elements: Vec<Ir> },
    StructDecl { name: String, fields: Vec<(String, Type)> },
    EnumDecl { name: String, underlying: Option<Type>, variants: Vec<(String, Option<i64>)> },
    FuncDef {
        name: String,
        params: Vec<(String, Type)>,
        return_type: Type,
        body: Vec<Ir>,
        is_extern: bool,
        has_varargs: bool,
        is_test: bool,
    },
    TryCatch { scrutinee: Box<Ir>, error_var: Option<String>, catch_body: Vec<Ir> },
    ErrorValue { name: String },
    ErrorUnion { value: Box<Ir> },
    StringInterpolation {
        text_segments: Vec<String>,
        /// One entry per interpolated slot, parallel to `formats`/`const_slots`.
        values: Vec<Ir>,
        formats: Vec<String>,
        const_slots: Vec<Option<String>>,
        buffer_size: usize,
    },
    Defer { body: Vec<Ir> },
    Errdefer { body: Vec<Ir> },
}

pub struct IrModule {
    pub struct_decls: Vec<Ir>,
    pub enum_decls: Vec<Ir>,
    /// Top-level `const`/`var` declarations, emitted as C globals. Not
    /// named in spec 4.6's emission order; placed after type
    /// declarations and before function prototypes (documented in
    /// `DESIGN.md`).
    pub globals: Vec<Ir>,
    pub functions: Vec<Ir>,
    pub tests: Vec<Ir>,
    /// `error.Name` -> stable non-zero numeric code, assigned in
    /// declaration order across all `error { ... }` blocks. `0` is
    /// reserved for "no error" so every error-union struct's default
    /// zero value reads as success.
    pub error_ids: std::collections::HashMap<String, u32>,
}

/// Monotonic id source shared across one IR generation pass (spec 3:
/// "assigned from a per-generator counter").
#[derive(Default)]
pub struct IdCounter(u64);

impl IdCounter {
    pub fn next(&mut self) -> u64 {
        let id = self.0;
        self.0 += 1;
        id
    }
}
