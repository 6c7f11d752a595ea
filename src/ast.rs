//! Abstract syntax tree
//!
//! Spec 3 describes a single tagged node with a kind field and a variant
//! payload; spec 9's re-architecture hint asks for "a sum type or a
//! tagged visitor interface... do not expose kind-casts that bypass the
//! variant." Rust enums give us that directly, so `Decl`/`Stmt`/`Expr`
//! are plain sum types rather than one flat struct with an `Any`-style
//! payload. Every node still carries a [`Loc`] (spec 3 invariant: "every
//! node carries source location for diagnostics").

use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub struct Loc {
    pub file: Rc<str>,
    pub line: usize,
    pub column: usize,
}

impl Loc {
    pub fn new(file: Rc<str>, line: usize, column: usize) -> Self {
        Loc { file, line, column }
    }
}

impl std::fmt::Display for Loc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Type syntax as written by the programmer (spec 4.3's `Type` grammar
/// production), resolved into [`crate::types::Type`] by the checker.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Named(String),
    Pointer(Box<TypeExpr>),
    Ref(Box<TypeExpr>),
    /// `[T: N]` or `[T; N]`; the size is an expression so it can be any
    /// constant-foldable integer expression (spec 3 invariant).
    Array { elem: Box<TypeExpr>, size: Box<Expr> },
    Tuple(Vec<TypeExpr>),
    ErrorUnion(Box<TypeExpr>),
    Atomic(Box<TypeExpr>),
    Fn { params: Vec<TypeExpr>, ret: Box<TypeExpr> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub decls: Vec<Decl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: TypeExpr,
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: TypeExpr,
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub name: String,
    pub value: Option<Expr>,
    pub loc: Loc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarDeclKind {
    Const,
    Var,
    /// `let` with or without `mut`.
    Let { is_mut: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclNode {
    pub kind: VarDeclKind,
    pub name: String,
    pub type_ann: Option<TypeExpr>,
    pub value: Expr,
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Fn {
        name: String,
        params: Vec<Param>,
        has_varargs: bool,
        return_type: TypeExpr,
        /// `None` for `extern fn` declarations.
        body: Option<Block>,
        is_extern: bool,
        loc: Loc,
    },
    Struct {
        name: String,
        fields: Vec<Field>,
        loc: Loc,
    },
    Enum {
        name: String,
        underlying: Option<TypeExpr>,
        variants: Vec<Variant>,
        loc: Loc,
    },
    Interface {
        name: String,
        methods: Vec<InterfaceMethod>,
        loc: Loc,
    },
    Impl {
        struct_name: String,
        interface_name: String,
        methods: Vec<Decl>,
        loc: Loc,
    },
    Var(VarDeclNode),
    /// `error Name { VariantA, VariantB, ... }` — spec 3 lists `error` as
    /// a declaration kind; the grammar for it is not spelled out beyond
    /// that, so it is modeled analogously to `enum` (a named set of
    /// error variants referenced as `error.VariantA`).
    Error {
        name: String,
        variants: Vec<String>,
        loc: Loc,
    },
    Test {
        name: String,
        body: Block,
        loc: Loc,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceMethod {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: TypeExpr,
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForIter {
    /// `for (start, end) |i| { ... }` or `for (start) |i| { ... }`.
    Range(Expr, Option<Expr>),
    /// `for arr |item| { ... }`.
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Var(VarDeclNode),
    Return { value: Option<Expr>, loc: Loc },
    If {
        cond: Expr,
        then_branch: Block,
        else_branch: Option<Box<ElseBranch>>,
        loc: Loc,
    },
    While { cond: Expr, body: Block, loc: Loc },
    For {
        iter: ForIter,
        by_ref: bool,
        var: String,
        index_var: Option<String>,
        body: Block,
        loc: Loc,
    },
    Defer { body: Block, loc: Loc },
    Errdefer { body: Block, loc: Loc },
    Block(Block),
    Break { loc: Loc },
    Continue { loc: Loc },
    Assign { target: Expr, value: Expr, loc: Loc },
    Expr { expr: Expr, loc: Loc },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElseBranch {
    Block(Block),
    If(Box<Stmt>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    AddSat,
    SubSat,
    MulSat,
    AddWrap,
    SubWrap,
    MulWrap,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
}

impl BinOp {
    pub fn is_comparison_or_logical(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge | BinOp::And | BinOp::Or
        )
    }

    /// The explicit overflow-aware sibling a plain `+ - *` must be
    /// rewritten to once the checker demands one (spec 4.4-c).
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::AddSat => "+|",
            BinOp::SubSat => "-|",
            BinOp::MulSat => "*|",
            BinOp::AddWrap => "+%",
            BinOp::SubWrap => "-%",
            BinOp::MulWrap => "*%",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
    AddrOf,
    Deref,
    Try,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormatSpec {
    pub flags: String,
    pub width: Option<u32>,
    pub precision: Option<u32>,
    pub ty: Option<char>,
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchArm {
    pub pattern: Pattern,
    pub body: Expr,
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Literal(Expr),
    /// Binds the scrutinee (or, inside a struct pattern, the named
    /// field) to a fresh local.
    Ident(String),
    Struct {
        type_name: Option<String>,
        fields: Vec<(String, Pattern)>,
    },
    /// The catch-all `else` arm (spec 4.5: "`else` arm uses a
    /// boolean-true condition").
    Else,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64, Loc),
    Float(f64, Loc),
    Bool(bool, Loc),
    Null(Loc),
    Str(String, Loc),
    Ident(String, Loc),
    /// `error.Name`.
    ErrorLit(String, Loc),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        loc: Loc,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
        loc: Loc,
    },
    Cast {
        value: Box<Expr>,
        target: TypeExpr,
        /// `as!` rather than `as` (spec 4.3: yields an error-union result type).
        fallible: bool,
        loc: Loc,
    },
    Call { callee: Box<Expr>, args: Vec<Expr>, loc: Loc },
    Member { object: Box<Expr>, field: String, loc: Loc },
    Subscript { object: Box<Expr>, index: Box<Expr>, loc: Loc },
    StructInit {
        type_name: String,
        field_names: Vec<String>,
        field_values: Vec<Expr>,
        loc: Loc,
    },
    ArrayLit { elements: Vec<Expr>, loc: Loc },
    TupleLit { elements: Vec<Expr>, loc: Loc },
    /// String interpolation; spec 3 invariant:
    /// `text_segments.len() ∈ {interp_exprs.len(), interp_exprs.len() + 1}`.
    Interp {
        text_segments: Vec<String>,
        interp_exprs: Vec<Expr>,
        format_specs: Vec<Option<FormatSpec>>,
        loc: Loc,
    },
    Catch {
        scrutinee: Box<Expr>,
        error_var: Option<String>,
        body: Block,
        loc: Loc,
    },
    Match {
        scrutinee: Box<Expr>,
        arms: Vec<MatchArm>,
        loc: Loc,
    },
}

impl Expr {
    pub fn loc(&self) -> &Loc {
        match self {
            Expr::Int(_, l)
            | Expr::Float(_, l)
            | Expr::Bool(_, l)
            | Expr::Null(l)
            | Expr::Str(_, l)
            | Expr::Ident(_, l)
            | Expr::ErrorLit(_, l) => l,
            Expr::Binary { loc, .. }
            | Expr::Unary { loc, .. }
            | Expr::Cast { loc, .. }
            | Expr::Call { loc, .. }
            | Expr::Member { loc, .. }
            | Expr::Subscript { loc, .. }
            | Expr::StructInit { loc, .. }
            | Expr::ArrayLit { loc, .. }
            | Expr::TupleLit { loc, .. }
            | Expr::Interp { loc, .. }
            | Expr::Catch { loc, .. }
            | Expr::Match { loc, .. } => loc,
        }
    }

    /// True for identifier/member/subscript forms — the lvalue-eligible
    /// expression kinds (spec 3: "Lvalue expression").
    pub fn is_lvalue(&self) -> bool {
        matches!(self, Expr::Ident(..) | Expr::Member { .. } | Expr::Subscript { .. })
    }
}
