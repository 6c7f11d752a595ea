//! Two-pass type checker (spec 4.4)
//!
//! Pass 1 collects function/struct/enum/error signatures (so forward
//! references between functions in the same file check successfully,
//! spec 8's "two-pass order" property); pass 2 walks every body,
//! inferring expression types and running the six safety checks.
//! Modeled on the teacher's `TypeChecker` walk, generalized to this
//! language's constraint-propagating conditions and richer type set.

use crate::ast::*;
use crate::constraints::{ConstraintSet, Range};
use crate::diagnostic::{Diagnostic, DiagnosticBag, Phase};
use crate::types::Type;
use std::collections::HashMap;

/// Loop-variable names exempted from the "declared but never modified"
/// warning (spec 4.4-a; spec 9 flags this whitelist as ad hoc and a
/// principled successor should track real escape analysis instead —
/// kept as specified since this spec does not redesign that check).
const UNUSED_VAR_WHITELIST: &[&str] = &["i", "j", "k", "next", "current", "prev", "temp", "tmp", "list", "obj", "data", "self"];

#[derive(Debug, Clone)]
pub struct FunctionSig {
    pub name: String,
    pub param_types: Vec<Type>,
    pub return_type: Type,
    pub is_extern: bool,
    pub has_varargs: bool,
    pub loc: Loc,
}

#[derive(Debug, Clone)]
struct Symbol {
    ty: Type,
    is_mut: bool,
    is_const: bool,
    is_initialized: bool,
    is_modified: bool,
    scope_level: usize,
    loc: Loc,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ConstValue {
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// Standalone constant folder (spec 4.4's "small pure evaluator"),
/// reused by the IR generator for string-interpolation slot constants
/// without needing a live `TypeChecker`.
pub(crate) fn const_eval(expr: &Expr) -> Option<ConstValue> {
    match expr {
        Expr::Int(v, _) => Some(ConstValue::Int(*v)),
        Expr::Float(v, _) => Some(ConstValue::Float(*v)),
        Expr::Bool(v, _) => Some(ConstValue::Bool(*v)),
        Expr::Unary { op: UnOp::Neg, operand, .. } => match const_eval(operand)? {
            ConstValue::Int(v) => v.checked_neg().map(ConstValue::Int),
            ConstValue::Float(v) => Some(ConstValue::Float(-v)),
            ConstValue::Bool(_) => None,
        },
        Expr::Unary { op: UnOp::Not, operand, .. } => match const_eval(operand)? {
            ConstValue::Bool(v) => Some(ConstValue::Bool(!v)),
            _ => None,
        },
        Expr::Binary { op, lhs, rhs, .. } => {
            let l = const_eval(lhs)?;
            let r = const_eval(rhs)?;
            const_fold_binary(*op, l, r)
        }
        _ => None,
    }
}

pub struct CheckedProgram {
    pub program: Program,
    pub functions: HashMap<String, FunctionSig>,
    pub structs: HashMap<String, Vec<(String, Type)>>,
    pub enums: HashMap<String, Option<Type>>,
    pub error_sets: HashMap<String, Vec<String>>,
    /// `(struct_name, source_method_name) -> emitted_name`, populated by
    /// the `drop` → `drop_T` rename (spec 4.4 pass 1).
    pub method_renames: HashMap<(String, String), String>,
}

pub fn check_program(program: Program) -> (CheckedProgram, DiagnosticBag) {
    let mut checker = TypeChecker::new();
    checker.pass1(&program);
    checker.pass2(&program);
    (
        CheckedProgram {
            program,
            functions: checker.functions,
            structs: checker.structs,
            enums: checker.enums,
            error_sets: checker.error_sets,
            method_renames: checker.method_renames,
        },
        checker.diagnostics,
    )
}

struct TypeChecker {
    diagnostics: DiagnosticBag,
    functions: HashMap<String, FunctionSig>,
    structs: HashMap<String, Vec<(String, Type)>>,
    enums: HashMap<String, Option<Type>>,
    error_sets: HashMap<String, Vec<String>>,
    method_renames: HashMap<(String, String), String>,
    scopes: Vec<HashMap<String, Symbol>>,
    scope_levels: Vec<usize>,
    next_function_scope: usize,
    constraints: ConstraintSet,
}

impl TypeChecker {
    fn new() -> Self {
        TypeChecker {
            diagnostics: DiagnosticBag::new(),
            functions: HashMap::new(),
            structs: HashMap::new(),
            enums: HashMap::new(),
            error_sets: HashMap::new(),
            method_renames: HashMap::new(),
            scopes: vec![HashMap::new()],
            scope_levels: vec![0],
            next_function_scope: 1000,
            constraints: ConstraintSet::new(),
        }
    }

    fn error(&mut self, loc: &Loc, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::error(Phase::Semantic, loc.file.clone(), loc.line, loc.column, message));
    }

    fn warn(&mut self, loc: &Loc, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::warning(Phase::Semantic, loc.file.clone(), loc.line, loc.column, message));
    }

    fn resolve_type(&mut self, ty: &TypeExpr) -> Type {
        match ty {
            TypeExpr::Named(n) => match n.as_str() {
                "i8" => Type::I8,
                "i16" => Type::I16,
                "i32" => Type::I32,
                "i64" => Type::I64,
                "u8" => Type::U8,
                "u16" => Type::U16,
                "u32" => Type::U32,
                "u64" => Type::U64,
                "f32" => Type::F32,
                "f64" => Type::F64,
                "bool" => Type::Bool,
                "byte" => Type::Byte,
                "void" => Type::Void,
                "usize" => Type::Usize,
                other => Type::Named(other.into()),
            },
            TypeExpr::Pointer(inner) | TypeExpr::Ref(inner) => Type::Pointer(Box::new(self.resolve_type(inner))),
            TypeExpr::Array { elem, size } => {
                let elem_ty = self.resolve_type(elem);
                let size_val = match self.const_eval(size) {
                    Some(ConstValue::Int(v)) => v,
                    _ => {
                        self.error(size.loc(), "array size must be a constant integer expression");
                        0
                    }
                };
                if size_val <= 0 {
                    self.error(size.loc(), format!("array size must be > 0, got {size_val}"));
                }
                Type::Array { elem: Box::new(elem_ty), size: size_val }
            }
            TypeExpr::Tuple(elems) => Type::Tuple(elems.iter().map(|e| self.resolve_type(e)).collect()),
            TypeExpr::ErrorUnion(inner) => Type::ErrorUnion(Box::new(self.resolve_type(inner))),
            TypeExpr::Atomic(inner) => Type::Atomic(Box::new(self.resolve_type(inner))),
            TypeExpr::Fn { params, ret } => Type::Fn {
                params: params.iter().map(|p| self.resolve_type(p)).collect(),
                ret: Box::new(self.resolve_type(ret)),
            },
        }
    }

    /// Rewrite a bare `Self` named type to the enclosing struct's name
    /// (spec 4.4 pass 1).
    fn resolve_type_with_self(&mut self, ty: &TypeExpr, self_name: &str) -> Type {
        if let TypeExpr::Named(n) = ty {
            if n == "Self" {
                return Type::Named(self_name.into());
            }
        }
        self.resolve_type(ty)
    }

    // --- Pass 1: signatures --------------------------------------------------

    fn pass1(&mut self, program: &Program) {
        for decl in &program.decls {
            self.pass1_decl(decl, None);
        }
    }

    fn pass1_decl(&mut self, decl: &Decl, self_name: Option<&str>) {
        match decl {
            Decl::Fn { name, params, return_type, is_extern, has_varargs, loc, .. } => {
                let param_types: Vec<Type> = params
                    .iter()
                    .map(|p| match self_name {
                        Some(s) => self.resolve_type_with_self(&p.ty, s),
                        None => self.resolve_type(&p.ty),
                    })
                    .collect();
                let ret_ty = match self_name {
                    Some(s) => self.resolve_type_with_self(return_type, s),
                    None => self.resolve_type(return_type),
                };

                let mut emitted_name = name.clone();
                if let Some(s) = self_name {
                    if name == "drop" && param_types.len() == 1 {
                        if let Some(t) = drop_target_type_name(&param_types[0]) {
                            emitted_name = format!("drop_{t}");
                            self.method_renames.insert((s.to_string(), name.clone()), emitted_name.clone());
                        }
                    }
                }

                if self.functions.contains_key(&emitted_name) {
                    self.error(loc, format!("function '{emitted_name}' is already defined"));
                } else {
                    self.functions.insert(
                        emitted_name.clone(),
                        FunctionSig {
                            name: emitted_name,
                            param_types,
                            return_type: ret_ty,
                            is_extern: *is_extern,
                            has_varargs: *has_varargs,
                            loc: loc.clone(),
                        },
                    );
                }
            }
            Decl::Struct { name, fields, .. } => {
                let resolved: Vec<(String, Type)> = fields.iter().map(|f| (f.name.clone(), self.resolve_type(&f.ty))).collect();
                self.structs.insert(name.clone(), resolved);
            }
            Decl::Enum { name, underlying, .. } => {
                let u = underlying.as_ref().map(|t| self.resolve_type(t));
                self.enums.insert(name.clone(), u);
            }
            Decl::Error { name, variants, .. } => {
                self.error_sets.insert(name.clone(), variants.clone());
            }
            Decl::Impl { struct_name, methods, .. } => {
                for m in methods {
                    self.pass1_decl(m, Some(struct_name));
                }
            }
            Decl::Interface { .. } | Decl::Test { .. } | Decl::Var(_) => {}
        }
    }

    // --- Pass 2: bodies -------------------------------------------------------

    fn pass2(&mut self, program: &Program) {
        for decl in &program.decls {
            self.pass2_decl(decl, None);
        }
    }

    fn pass2_decl(&mut self, decl: &Decl, self_name: Option<&str>) {
        match decl {
            Decl::Fn { name, params, body, is_extern, .. } => {
                if *is_extern {
                    return;
                }
                let Some(body) = body else { return };
                let level = self.next_function_scope;
                self.next_function_scope += 1;
                self.scopes.push(HashMap::new());
                self.scope_levels.push(level);

                let sig_name = self_name
                    .and_then(|s| self.method_renames.get(&(s.to_string(), name.clone())).cloned())
                    .unwrap_or_else(|| name.clone());
                let ret_ty = self.functions.get(&sig_name).map(|f| f.return_type.clone()).unwrap_or(Type::Void);

                for (param, ty) in params.iter().zip(
                    self.functions
                        .get(&sig_name)
                        .map(|f| f.param_types.clone())
                        .unwrap_or_default()
                        .into_iter(),
                ) {
                    self.declare(&param.name, ty, false, false, true, &param.loc);
                }

                for stmt in &body.stmts {
                    self.check_stmt(stmt, &ret_ty);
                }
                self.warn_unused_vars();
                self.scopes.pop();
                self.scope_levels.pop();
            }
            Decl::Impl { struct_name, methods, .. } => {
                for m in methods {
                    self.pass2_decl(m, Some(struct_name));
                }
            }
            Decl::Var(v) => {
                let declared_ty = v.type_ann.as_ref().map(|t| self.resolve_type(t));
                let value_ty = self.check_expr(&v.value);
                let ty = declared_ty.unwrap_or(value_ty.clone());
                if !self.assignment_compatible(&v.value, &value_ty, &ty) {
                    self.error(&v.loc, format!("cannot initialize '{}' of type {ty} from expression of type {value_ty}", v.name));
                }
                self.declare(&v.name, ty, matches!(v.kind, VarDeclKind::Let { is_mut: true } | VarDeclKind::Var), matches!(v.kind, VarDeclKind::Const), true, &v.loc);
            }
            Decl::Test { body, .. } => {
                self.scopes.push(HashMap::new());
                self.scope_levels.push(self.next_function_scope);
                self.next_function_scope += 1;
                for stmt in &body.stmts {
                    self.check_stmt(stmt, &Type::Void);
                }
                self.scopes.pop();
                self.scope_levels.pop();
            }
            Decl::Struct { .. } | Decl::Enum { .. } | Decl::Interface { .. } | Decl::Error { .. } => {}
        }
    }

    // --- scope helpers --------------------------------------------------------

    fn declare(&mut self, name: &str, ty: Type, is_mut: bool, is_const: bool, is_initialized: bool, loc: &Loc) {
        let level = *self.scope_levels.last().unwrap();
        let scope = self.scopes.last_mut().unwrap();
        if scope.contains_key(name) {
            self.diagnostics.push(Diagnostic::error(
                Phase::Semantic,
                loc.file.clone(),
                loc.line,
                loc.column,
                format!("'{name}' is already declared in this scope"),
            ));
            return;
        }
        scope.insert(
            name.to_string(),
            Symbol { ty, is_mut, is_const, is_initialized, is_modified: false, scope_level: level, loc: loc.clone() },
        );
    }

    fn lookup(&self, name: &str) -> Option<&Symbol> {
        for scope in self.scopes.iter().rev() {
            if let Some(s) = scope.get(name) {
                return Some(s);
            }
        }
        None
    }

    fn lookup_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(s) = scope.get_mut(name) {
                return Some(s);
            }
        }
        None
    }

    fn enter_block_scope(&mut self) {
        let level = self.scope_levels.last().unwrap() + 1;
        self.scopes.push(HashMap::new());
        self.scope_levels.push(level);
    }

    fn exit_block_scope(&mut self) {
        self.warn_unused_vars_top();
        self.scopes.pop();
        self.scope_levels.pop();
    }

    fn warn_unused_vars(&mut self) {
        self.warn_unused_vars_top();
    }

    fn warn_unused_vars_top(&mut self) {
        let Some(scope) = self.scopes.last() else { return };
        let mut warnings = Vec::new();
        for (name, sym) in scope {
            if !sym.is_mut || sym.is_const {
                continue;
            }
            if UNUSED_VAR_WHITELIST.contains(&name.as_str()) {
                continue;
            }
            if !sym.is_modified {
                warnings.push((name.clone(), sym.loc.clone()));
            }
        }
        for (name, loc) in warnings {
            self.warn(&loc, format!("variable '{name}' is declared but never modified"));
        }
    }

    // --- statements -------------------------------------------------------------

    fn check_stmt(&mut self, stmt: &Stmt, ret_ty: &Type) {
        match stmt {
            Stmt::Var(v) => {
                let declared_ty = v.type_ann.as_ref().map(|t| self.resolve_type(t));
                let value_ty = self.check_expr(&v.value);
                let ty = declared_ty.unwrap_or(value_ty.clone());
                if !self.assignment_compatible(&v.value, &value_ty, &ty) {
                    self.error(&v.loc, format!("cannot initialize '{}' of type {ty} from expression of type {value_ty}", v.name));
                }
                self.declare(&v.name, ty, matches!(v.kind, VarDeclKind::Let { is_mut: true } | VarDeclKind::Var), matches!(v.kind, VarDeclKind::Const), true, &v.loc);
            }
            Stmt::Return { value, loc } => {
                let actual = value.as_ref().map(|e| self.check_expr(e)).unwrap_or(Type::Void);
                if let Some(v) = value {
                    if !self.assignment_compatible(v, &actual, ret_ty) {
                        self.error(loc, format!("return type mismatch: expected {ret_ty}, got {actual}"));
                    }
                }
            }
            Stmt::If { cond, then_branch, else_branch, loc } => {
                let cond_ty = self.check_expr(cond);
                if cond_ty != Type::Bool {
                    self.error(loc, format!("'if' condition must be bool, got {cond_ty}"));
                }
                let saved = self.constraints.clone();
                let mut then_constraints = saved.clone();
                std::mem::swap(&mut self.constraints, &mut then_constraints);
                self.propagate_condition(cond);
                self.enter_block_scope();
                for s in &then_branch.stmts {
                    self.check_stmt(s, ret_ty);
                }
                self.exit_block_scope();
                self.constraints = saved.clone();
                match else_branch {
                    Some(b) => match b.as_ref() {
                        ElseBranch::Block(block) => {
                            self.enter_block_scope();
                            for s in &block.stmts {
                                self.check_stmt(s, ret_ty);
                            }
                            self.exit_block_scope();
                        }
                        ElseBranch::If(s) => self.check_stmt(s, ret_ty),
                    },
                    None => {}
                }
                self.constraints = saved;
            }
            Stmt::While { cond, body, loc } => {
                let cond_ty = self.check_expr(cond);
                if cond_ty != Type::Bool {
                    self.error(loc, format!("'while' condition must be bool, got {cond_ty}"));
                }
                let saved = self.constraints.clone();
                self.propagate_condition(cond);
                self.enter_block_scope();
                for s in &body.stmts {
                    self.check_stmt(s, ret_ty);
                }
                self.exit_block_scope();
                self.constraints = saved;
            }
            Stmt::For { iter, var, index_var, body, .. } => {
                match iter {
                    ForIter::Range(a, b) => {
                        self.check_expr(a);
                        if let Some(b) = b {
                            self.check_expr(b);
                        }
                    }
                    ForIter::Expr(e) => {
                        self.check_expr(e);
                    }
                }
                self.enter_block_scope();
                self.declare(var, Type::I32, true, false, true, &body.loc);
                if let Some(iv) = index_var {
                    self.declare(iv, Type::Usize, false, false, true, &body.loc);
                }
                for s in &body.stmts {
                    self.check_stmt(s, ret_ty);
                }
                self.exit_block_scope();
            }
            Stmt::Defer { body, .. } | Stmt::Errdefer { body, .. } => {
                self.enter_block_scope();
                for s in &body.stmts {
                    self.check_stmt(s, ret_ty);
                }
                self.exit_block_scope();
            }
            Stmt::Block(b) => {
                self.enter_block_scope();
                for s in &b.stmts {
                    self.check_stmt(s, ret_ty);
                }
                self.exit_block_scope();
            }
            Stmt::Break { .. } | Stmt::Continue { .. } => {}
            Stmt::Assign { target, value, loc } => {
                let target_ty = self.check_expr(target);
                let value_ty = self.check_expr(value);
                if !self.assignment_compatible(value, &value_ty, &target_ty) {
                    self.error(loc, format!("cannot assign value of type {value_ty} to destination of type {target_ty}"));
                }
                if let Expr::Ident(name, _) = target {
                    if let Some(sym) = self.lookup(name) {
                        if sym.is_const {
                            self.error(loc, format!("cannot assign to const variable '{name}'"));
                        }
                    }
                    if let Some(sym) = self.lookup_mut(name) {
                        sym.is_modified = true;
                        sym.is_initialized = true;
                    }
                }
            }
            Stmt::Expr { expr, .. } => {
                self.check_expr(expr);
            }
        }
    }

    /// Derive constraints from a branch condition and merge them into
    /// the active set (spec 4.4's then-branch propagation rules).
    fn propagate_condition(&mut self, cond: &Expr) {
        if let Expr::Binary { op, lhs, rhs, .. } = cond {
            match op {
                BinOp::And => {
                    self.propagate_condition(lhs);
                    self.propagate_condition(rhs);
                }
                BinOp::Lt | BinOp::Le => {
                    if let (Expr::Ident(name, _), Some(ConstValue::Int(k))) = (lhs.as_ref(), self.const_eval(rhs)) {
                        let hi = if *op == BinOp::Le { k + 1 } else { k };
                        self.constraints.add_range(name, Range::new(i64::MIN, hi));
                    }
                }
                BinOp::Gt | BinOp::Ge => {
                    if let (Expr::Ident(name, _), Some(ConstValue::Int(k))) = (lhs.as_ref(), self.const_eval(rhs)) {
                        let lo = if *op == BinOp::Ge { k } else { k + 1 };
                        self.constraints.add_range(name, Range::new(lo, i64::MAX));
                    }
                }
                BinOp::Ne => {
                    if let (Expr::Ident(name, _), Some(ConstValue::Int(0))) = (lhs.as_ref(), self.const_eval(rhs)) {
                        self.constraints.add_nonzero(name);
                    }
                }
                _ => {}
            }
        }
    }

    // --- expressions -----------------------------------------------------------

    /// Spec 4.4's flat "expression → type" inference table. Structural
    /// resolution (struct fields, array element types, function return
    /// types) is handled separately by the dedicated checks below; this
    /// is deliberately the coarse fallback the spec itself specifies.
    fn check_expr(&mut self, expr: &Expr) -> Type {
        match expr {
            Expr::Int(_, _) => Type::I32,
            Expr::Float(_, _) => Type::F64,
            Expr::Bool(_, _) => Type::Bool,
            Expr::Null(_) => Type::Void,
            Expr::Str(_, _) => Type::Array { elem: Box::new(Type::Byte), size: -1 },
            Expr::Ident(name, loc) => {
                if let Some(sym) = self.lookup(name) {
                    if matches!(sym.ty, Type::Array { .. }) || sym.is_const {
                        // arrays/consts are exempt from the uninitialized-use check (spec 4.4-e)
                    } else if !sym.is_initialized {
                        self.error(loc, format!("use of '{name}' before initialization"));
                    }
                    sym.ty.clone()
                } else {
                    self.error(loc, format!("'{name}' is not defined"));
                    Type::Void
                }
            }
            Expr::ErrorLit(name, loc) => {
                if !self.error_sets.values().any(|vs| vs.iter().any(|v| v == name)) {
                    self.error(loc, format!("'error.{name}' does not name a known error variant"));
                }
                Type::ErrorUnion(Box::new(Type::Void))
            }
            Expr::Binary { op, lhs, rhs, loc } => {
                let lt = self.check_expr(lhs);
                let rt = self.check_expr(rhs);
                self.check_binary_safety(*op, lhs, rhs, loc);
                if op.is_comparison_or_logical() {
                    Type::Bool
                } else {
                    let _ = rt;
                    lt
                }
            }
            Expr::Unary { op, operand, loc } => {
                let ty = self.check_expr(operand);
                if *op == UnOp::AddrOf {
                    if let Expr::Ident(name, _) = operand.as_ref() {
                        if let Some(sym) = self.lookup_mut(name) {
                            sym.is_modified = true;
                        }
                    }
                }
                let _ = loc;
                ty
            }
            Expr::Cast { value, target, .. } => {
                self.check_expr(value);
                self.resolve_type(target)
            }
            Expr::Call { callee, args, loc } => self.check_call(callee, args, loc),
            Expr::Member { object, field, loc } => self.check_member(object, field, loc),
            Expr::Subscript { object, index, loc } => self.check_subscript(object, index, loc),
            Expr::StructInit { type_name, field_names, field_values, loc } => {
                self.check_struct_init(type_name, field_names, field_values, loc);
                Type::Named(type_name.clone().into())
            }
            Expr::ArrayLit { elements, loc } => {
                let elem_ty = elements.first().map(|e| self.check_expr(e)).unwrap_or(Type::Void);
                for e in elements.iter().skip(1) {
                    self.check_expr(e);
                }
                Type::Array { elem: Box::new(elem_ty), size: elements.len() as i64 }
                    .tap_empty_array_error(self, elements.is_empty(), loc)
            }
            Expr::TupleLit { elements, .. } => Type::Tuple(elements.iter().map(|e| self.check_expr(e)).collect()),
            Expr::Interp { interp_exprs, .. } => {
                for e in interp_exprs {
                    self.check_expr(e);
                }
                Type::Array { elem: Box::new(Type::Byte), size: -1 }
            }
            Expr::Catch { scrutinee, body, .. } => {
                self.check_expr(scrutinee);
                self.enter_block_scope();
                for s in &body.stmts {
                    self.check_stmt(s, &Type::Void);
                }
                self.exit_block_scope();
                Type::Void
            }
            Expr::Match { scrutinee, arms, .. } => {
                self.check_expr(scrutinee);
                for arm in arms {
                    self.check_expr(&arm.body);
                }
                Type::Void
            }
        }
    }

    fn check_binary_safety(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr, loc: &Loc) {
        match op {
            BinOp::Div | BinOp::Mod => {
                if let Some(v) = self.const_eval(rhs) {
                    if matches!(v, ConstValue::Int(0)) {
                        self.error(loc, format!("division by constant zero in '{} {}'", lhs_desc(lhs), op.symbol()));
                    }
                } else if let Expr::Ident(name, _) = rhs {
                    if !self.constraints.prove_nonzero(name) {
                        self.error(loc, format!("divisor '{name}' needs a proof of being nonzero"));
                    }
                } else {
                    self.error(loc, format!("divisor of '{}' is not provably nonzero", op.symbol()));
                }
            }
            BinOp::Add | BinOp::Sub | BinOp::Mul => {
                let lhs_const = self.const_eval(lhs);
                let rhs_const = self.const_eval(rhs);
                if lhs_const.is_none() && rhs_const.is_none() {
                    self.error(
                        loc,
                        format!(
                            "integer operation '{}' may overflow; use an explicit wrapping (+%/-%/*%), saturating (+|/-|/*|), or try variant",
                            op.symbol()
                        ),
                    );
                } else if let (Some(ConstValue::Int(a)), Some(ConstValue::Int(b))) = (lhs_const, rhs_const) {
                    let folded = match op {
                        BinOp::Add => a.checked_add(b),
                        BinOp::Sub => a.checked_sub(b),
                        BinOp::Mul => a.checked_mul(b),
                        _ => unreachable!(),
                    };
                    if folded.is_none() {
                        self.error(loc, format!("constant integer operation '{}' overflows", op.symbol()));
                    }
                }
            }
            _ => {}
        }
    }

    fn check_call(&mut self, callee: &Expr, args: &[Expr], loc: &Loc) -> Type {
        let Expr::Ident(name, _) = callee else {
            self.check_expr(callee);
            for a in args {
                self.check_expr(a);
            }
            return Type::Void;
        };
        // `@sizeof`/`@alignof`/`@mc_type`-style builtins (spec 4.2, 4.6
        // point 4) take a type name as their argument, which parses as a
        // bare `Expr::Ident` — checking it as a value expression below
        // would misreport it as an undefined variable. Bail out before
        // the argument loop runs.
        if name.starts_with('@') {
            return Type::Void;
        }
        for a in args {
            self.check_expr(a);
        }
        // Method-call desugaring target names resolve through `functions`
        // directly once the IR generator rewrites `obj.m(args)`; a bare
        // call checks against the function table here.
        let Some(sig) = self.functions.get(name).cloned() else {
            self.error(loc, format!("call to undefined function '{name}'"));
            return Type::Void;
        };
        let min_arity = sig.param_types.len();
        let arity_ok = if sig.has_varargs { args.len() >= min_arity.saturating_sub(1) } else { args.len() == min_arity };
        if !arity_ok {
            self.error(loc, format!("'{name}' expects {min_arity} argument(s), got {}", args.len()));
        }
        for (i, param_ty) in sig.param_types.iter().enumerate() {
            let Some(arg) = args.get(i) else { break };
            let arg_ty = self.check_expr(arg);
            if !self.assignment_compatible(arg, &arg_ty, param_ty) {
                self.error(arg.loc(), format!("argument {} to '{name}': expected {param_ty}, got {arg_ty}", i + 1));
            }
            if matches!(param_ty, Type::Pointer(_)) {
                if let Expr::Unary { op: UnOp::AddrOf, operand, .. } = arg {
                    if let Expr::Ident(vname, _) = operand.as_ref() {
                        if let Some(sym) = self.lookup_mut(vname) {
                            sym.is_modified = true;
                        }
                    }
                }
            }
        }
        sig.return_type
    }

    fn check_member(&mut self, object: &Expr, field: &str, loc: &Loc) -> Type {
        let obj_ty = self.check_expr(object);
        match &obj_ty {
            Type::Named(struct_name) => {
                if let Some(fields) = self.structs.get(struct_name.as_ref()) {
                    if let Some((_, fty)) = fields.iter().find(|(fname, _)| fname == field) {
                        return fty.clone();
                    }
                    self.error(loc, format!("unknown field '{field}' on struct '{struct_name}'"));
                }
                Type::Void
            }
            Type::Tuple(elems) => {
                if let Some(idx) = field.strip_prefix('_').and_then(|n| n.parse::<usize>().ok()) {
                    if let Some(t) = elems.get(idx) {
                        return t.clone();
                    }
                }
                self.error(loc, format!("unknown tuple field '{field}'"));
                Type::Void
            }
            _ => Type::Void,
        }
    }

    fn check_subscript(&mut self, object: &Expr, index: &Expr, loc: &Loc) -> Type {
        let obj_ty = self.check_expr(object);
        let idx_ty = self.check_expr(index);
        let _ = idx_ty;
        let Type::Array { elem, size } = &obj_ty else {
            return Type::Void;
        };
        if *size < 0 {
            return (**elem).clone();
        }
        if let Some(ConstValue::Int(i)) = self.const_eval(index) {
            if i < 0 || i >= *size {
                self.error(loc, format!("array index {i} out of bounds for size {size}"));
            }
        } else if let Expr::Ident(name, _) = index {
            if !self.constraints.prove_range(name, 0, *size) {
                self.error(loc, format!("array index '{name}' is not provably within [0, {size})"));
            }
        } else {
            self.error(loc, "array index is not provably within bounds");
        }
        (**elem).clone()
    }

    fn check_struct_init(&mut self, type_name: &str, field_names: &[String], field_values: &[Expr], loc: &Loc) {
        if field_names.len() != field_values.len() {
            self.error(loc, "struct literal field-names and field-values must share length");
        }
        let Some(fields) = self.structs.get(type_name).cloned() else {
            self.error(loc, format!("unknown struct type '{type_name}'"));
            for v in field_values {
                self.check_expr(v);
            }
            return;
        };
        for (name, value) in field_names.iter().zip(field_values) {
            let vty = self.check_expr(value);
            match fields.iter().find(|(fname, _)| fname == name) {
                Some((_, fty)) => {
                    if !self.assignment_compatible(value, &vty, fty) {
                        self.error(value.loc(), format!("field '{name}' of '{type_name}': expected {fty}, got {vty}"));
                    }
                }
                None => self.error(value.loc(), format!("unknown field '{name}' on struct '{type_name}'")),
            }
        }
    }

    /// Exact-match, plus the two integer-literal relaxations (spec 4.4).
    fn assignment_compatible(&self, src_expr: &Expr, src_ty: &Type, dst_ty: &Type) -> bool {
        if src_ty == dst_ty {
            return true;
        }
        if matches!(src_expr, Expr::Int(..)) && dst_ty.is_numeric() {
            return true;
        }
        if matches!(src_expr, Expr::Interp { .. }) && matches!(dst_ty, Type::Array { elem, .. } if **elem == Type::Byte) {
            return true;
        }
        if matches!(src_expr, Expr::Str(..)) && matches!(dst_ty, Type::Array { elem, .. } if **elem == Type::Byte) {
            return true;
        }
        // `error.Name` carries a placeholder `!void` type until it meets a
        // concrete error-union destination (return, var decl, arg, field).
        if matches!(src_expr, Expr::ErrorLit(..)) && matches!(dst_ty, Type::ErrorUnion(_)) {
            return true;
        }
        matches!((src_ty, dst_ty), (Type::Void, _) | (_, Type::Void))
    }

    fn const_eval(&self, expr: &Expr) -> Option<ConstValue> {
        const_eval(expr)
    }
}

fn const_fold_binary(op: BinOp, l: ConstValue, r: ConstValue) -> Option<ConstValue> {
    use ConstValue::*;
    match (op, l, r) {
        (BinOp::Add, Int(a), Int(b)) => a.checked_add(b).map(Int),
        (BinOp::Sub, Int(a), Int(b)) => a.checked_sub(b).map(Int),
        (BinOp::Mul, Int(a), Int(b)) => a.checked_mul(b).map(Int),
        (BinOp::Div, Int(a), Int(b)) if b != 0 => a.checked_div(b).map(Int),
        (BinOp::Mod, Int(a), Int(b)) if b != 0 => a.checked_rem(b).map(Int),
        (BinOp::Add, Float(a), Float(b)) => Some(Float(a + b)),
        (BinOp::Sub, Float(a), Float(b)) => Some(Float(a - b)),
        (BinOp::Mul, Float(a), Float(b)) => Some(Float(a * b)),
        (BinOp::Div, Float(a), Float(b)) if b != 0.0 => Some(Float(a / b)),
        (BinOp::Eq, Int(a), Int(b)) => Some(Bool(a == b)),
        (BinOp::Ne, Int(a), Int(b)) => Some(Bool(a != b)),
        (BinOp::Lt, Int(a), Int(b)) => Some(Bool(a < b)),
        (BinOp::Le, Int(a), Int(b)) => Some(Bool(a <= b)),
        (BinOp::Gt, Int(a), Int(b)) => Some(Bool(a > b)),
        (BinOp::Ge, Int(a), Int(b)) => Some(Bool(a >= b)),
        (BinOp::And, Bool(a), Bool(b)) => Some(Bool(a && b)),
        (BinOp::Or, Bool(a), Bool(b)) => Some(Bool(a || b)),
        _ => None,
    }
}

fn lhs_desc(e: &Expr) -> String {
    match e {
        Expr::Ident(n, _) => n.clone(),
        _ => "<expr>".to_string(),
    }
}

/// `drop_T` naming (spec 4.4 pass 1): `T` or `*T` named-type parameter.
fn drop_target_type_name(ty: &Type) -> Option<String> {
    match ty {
        Type::Named(n) => Some(n.to_string()),
        Type::Pointer(inner) => match inner.as_ref() {
            Type::Named(n) => Some(n.to_string()),
            _ => None,
        },
        _ => None,
    }
}

trait TapEmptyArray {
    fn tap_empty_array_error(self, checker: &mut TypeChecker, is_empty: bool, loc: &Loc) -> Self;
}

impl TapEmptyArray for Type {
    fn tap_empty_array_error(self, checker: &mut TypeChecker, is_empty: bool, loc: &Loc) -> Self {
        if is_empty {
            checker.error(loc, "array literal must not be empty (zero-length arrays are rejected at type check)");
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use std::rc::Rc;

    fn check(src: &str) -> DiagnosticBag {
        let (tokens, lex_diags) = Lexer::new(src, Rc::from("t.uya")).tokenize();
        assert!(lex_diags.is_empty());
        let (program, parse_diags) = Parser::new(tokens).parse_program();
        assert!(parse_diags.is_empty(), "{}", parse_diags.format());
        let (_, diags) = check_program(program);
        diags
    }

    #[test]
    fn unproved_overflow_is_rejected() {
        let diags = check("fn add(a: i32, b: i32) i32 { return a + b; }");
        assert!(diags.has_errors());
    }

    #[test]
    fn wrapping_operator_is_accepted() {
        let diags = check("fn add(a: i32, b: i32) i32 { return a +% b; }");
        assert!(!diags.has_errors());
    }

    #[test]
    fn array_index_proven_in_range_compiles() {
        let src = "fn sum(a: [i32: 4]) i32 { var s: i32 = 0; var i: i32 = 0; while i < 4 { s = s +% a[i]; i = i +% 1; } return s; }";
        let diags = check(src);
        assert!(!diags.has_errors(), "{}", diags.format());
    }

    #[test]
    fn division_by_unproved_name_is_rejected() {
        let diags = check("fn d(x: i32, y: i32) i32 { return x / y; }");
        assert!(diags.has_errors());
    }

    #[test]
    fn division_guarded_by_nonzero_check_passes() {
        let src = "fn d(x: i32, y: i32) i32 { if y != 0 { return x / y; } else { return 0; } }";
        let diags = check(src);
        assert!(!diags.has_errors(), "{}", diags.format());
    }

    #[test]
    fn const_reassignment_is_rejected() {
        let diags = check("fn f() i32 { const x: i32 = 1; x = 2; return x; }");
        assert!(diags.has_errors());
    }

    #[test]
    fn division_by_constant_zero_is_rejected() {
        let diags = check("fn f(x: i32) i32 { return x / 0; }");
        assert!(diags.has_errors());
    }
}
