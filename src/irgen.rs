//! AST → IR lowering (spec 4.5)
//!
//! Consumes a [`CheckedProgram`] (already validated, so lowering never
//! re-raises diagnostics) and produces an [`IrModule`]. Tuple struct
//! declarations are synthesized on demand and deduplicated by their
//! canonical type-name key; `match` lowers to a right-growing `If`
//! chain; string interpolation lowers with a precomputed buffer-size
//! estimate.

use crate::ast::{self, BinOp, Decl, Expr, ForIter, Pattern, Stmt, UnOp};
use crate::ir::{ConstLit, IdCounter, Ir, IrKind, IrModule};
use crate::types::Type;
use crate::typechecker::{const_eval, CheckedProgram, ConstValue};
use std::collections::{HashMap, HashSet};

pub fn lower_program(checked: &CheckedProgram) -> IrModule {
    let mut gen = IrGen {
        checked,
        ids: IdCounter::default(),
        tuple_structs: Vec::new(),
        seen_tuples: HashSet::new(),
        scopes: vec![HashMap::new()],
    };

    let mut struct_decls = Vec::new();
    let mut enum_decls = Vec::new();
    let mut globals = Vec::new();
    let mut functions = Vec::new();
    let mut tests = Vec::new();
    let mut error_ids: HashMap<String, u32> = HashMap::new();
    let mut next_error_id: u32 = 1;
    for decl in &checked.program.decls {
        if let Decl::Error { variants, .. } = decl {
            for v in variants {
                error_ids.entry(v.clone()).or_insert_with(|| {
                    let id = next_error_id;
                    next_error_id += 1;
                    id
                });
            }
        }
    }

    for decl in &checked.program.decls {
        match decl {
            Decl::Struct { name, .. } => {
                if let Some(fields) = checked.structs.get(name) {
                    struct_decls.push(gen.mk(IrKind::StructDecl { name: name.clone(), fields: fields.clone() }));
                }
            }
            Decl::Enum { name, variants, .. } => {
                let underlying = checked.enums.get(name).cloned().flatten();
                let resolved_variants = variants
                    .iter()
                    .map(|v| (v.name.clone(), v.value.as_ref().and_then(|e| match const_eval(e) {
                        Some(ConstValue::Int(n)) => Some(n),
                        _ => None,
                    })))
                    .collect();
                enum_decls.push(gen.mk(IrKind::EnumDecl { name: name.clone(), underlying, variants: resolved_variants }));
            }
            Decl::Var(v) => {
                let ty = gen.var_type(v);
                let init = Some(Box::new(gen.lower_expr(&v.value)));
                globals.push(gen.mk(IrKind::VarDecl {
                    name: v.name.clone(),
                    ty,
                    init,
                    is_const: matches!(v.kind, ast::VarDeclKind::Const),
                }));
            }
            Decl::Fn { name, params, body, is_extern, has_varargs, return_type: _, .. } => {
                if let Some(f) = gen.lower_fn(name, params, body.as_ref(), *is_extern, *has_varargs, false) {
                    functions.push(f);
                }
            }
            Decl::Impl { struct_name, methods, .. } => {
                for m in methods {
                    if let Decl::Fn { name, params, body, is_extern, has_varargs, .. } = m {
                        let emitted = checked
                            .method_renames
                            .get(&(struct_name.clone(), name.clone()))
                            .cloned()
                            .unwrap_or_else(|| name.clone());
                        if let Some(f) = gen.lower_fn(&emitted, params, body.as_ref(), *is_extern, *has_varargs, false) {
                            functions.push(f);
                        }
                    }
                }
            }
            Decl::Test { name, body, .. } => {
                if let Some(f) = gen.lower_fn(name, &[], Some(body), false, false, true) {
                    tests.push(f);
                }
            }
            Decl::Interface { .. } | Decl::Error { .. } => {}
        }
    }

    struct_decls.splice(0..0, gen.tuple_structs.drain(..));
    IrModule { struct_decls, enum_decls, globals, functions, tests, error_ids }
}

struct IrGen<'a> {
    checked: &'a CheckedProgram,
    ids: IdCounter,
    tuple_structs: Vec<Ir>,
    seen_tuples: HashSet<String>,
    scopes: Vec<HashMap<String, Type>>,
}

impl<'a> IrGen<'a> {
    fn mk(&mut self, kind: IrKind) -> Ir {
        Ir { id: self.ids.next(), kind }
    }

    fn declare_local(&mut self, name: &str, ty: Type) {
        self.scopes.last_mut().unwrap().insert(name.to_string(), ty);
    }

    fn lookup_local(&self, name: &str) -> Type {
        for scope in self.scopes.iter().rev() {
            if let Some(t) = scope.get(name) {
                return t.clone();
            }
        }
        Type::Void
    }

    fn var_type(&mut self, v: &ast::VarDeclNode) -> Type {
        match &v.type_ann {
            Some(t) => self.resolve_type(t),
            None => self.infer_type(&v.value),
        }
    }

    fn resolve_type(&self, ty: &ast::TypeExpr) -> Type {
        match ty {
            ast::TypeExpr::Named(n) => match n.as_str() {
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
            ast::TypeExpr::Pointer(inner) | ast::TypeExpr::Ref(inner) => Type::Pointer(Box::new(self.resolve_type(inner))),
            ast::TypeExpr::Array { elem, size } => {
                let size_val = match const_eval(size) {
                    Some(ConstValue::Int(v)) => v,
                    _ => 0,
                };
                Type::Array { elem: Box::new(self.resolve_type(elem)), size: size_val }
            }
            ast::TypeExpr::Tuple(elems) => Type::Tuple(elems.iter().map(|e| self.resolve_type(e)).collect()),
            ast::TypeExpr::ErrorUnion(inner) => Type::ErrorUnion(Box::new(self.resolve_type(inner))),
            ast::TypeExpr::Atomic(inner) => Type::Atomic(Box::new(self.resolve_type(inner))),
            ast::TypeExpr::Fn { params, ret } => Type::Fn {
                params: params.iter().map(|p| self.resolve_type(p)).collect(),
                ret: Box::new(self.resolve_type(ret)),
            },
        }
    }

    /// Mirrors the checker's flat inference table (spec 4.4); see
    /// `typechecker::check_expr` for the authoritative rule text.
    fn infer_type(&self, expr: &Expr) -> Type {
        match expr {
            Expr::Int(..) => Type::I32,
            Expr::Float(..) => Type::F64,
            Expr::Bool(..) => Type::Bool,
            Expr::Str(..) => Type::Array { elem: Box::new(Type::Byte), size: -1 },
            Expr::Ident(name, _) => self.lookup_local(name),
            Expr::Interp { .. } => Type::Array { elem: Box::new(Type::Byte), size: -1 },
            Expr::Binary { op, lhs, .. } => {
                if op.is_comparison_or_logical() {
                    Type::Bool
                } else {
                    self.infer_type(lhs)
                }
            }
            Expr::Unary { operand, .. } => self.infer_type(operand),
            Expr::Member { object, field, .. } => {
                if let Type::Named(sname) = self.infer_type(object) {
                    if let Some(fields) = self.checked.structs.get(sname.as_ref()) {
                        if let Some((_, t)) = fields.iter().find(|(n, _)| n == field) {
                            return t.clone();
                        }
                    }
                }
                Type::Void
            }
            Expr::Subscript { object, .. } => match self.infer_type(object) {
                Type::Array { elem, .. } => *elem,
                _ => Type::Void,
            },
            Expr::Cast { target, .. } => self.resolve_type(target),
            _ => Type::Void,
        }
    }

    fn lower_fn(
        &mut self,
        name: &str,
        params: &[ast::Param],
        body: Option<&ast::Block>,
        is_extern: bool,
        has_varargs: bool,
        is_test: bool,
    ) -> Option<Ir> {
        let sig = self.checked.functions.get(name);
        let return_type = sig.map(|s| s.return_type.clone()).unwrap_or(Type::Void);
        let param_types: Vec<Type> = match sig {
            Some(s) => s.param_types.clone(),
            None => params.iter().map(|p| self.resolve_type(&p.ty)).collect(),
        };
        let lowered_params: Vec<(String, Type)> = params.iter().map(|p| p.name.clone()).zip(param_types.clone()).collect();

        if is_extern {
            return Some(self.mk(IrKind::FuncDef {
                name: name.to_string(),
                params: lowered_params,
                return_type,
                body: Vec::new(),
                is_extern: true,
                has_varargs,
                is_test,
            }));
        }
        let body = body?;
        self.scopes.push(HashMap::new());
        for (n, t) in &lowered_params {
            self.declare_local(n, t.clone());
        }
        let lowered_body = self.lower_block(body);
        self.scopes.pop();
        Some(self.mk(IrKind::FuncDef {
            name: name.to_string(),
            params: lowered_params,
            return_type,
            body: lowered_body,
            is_extern: false,
            has_varargs,
            is_test,
        }))
    }

    fn lower_block(&mut self, block: &ast::Block) -> Vec<Ir> {
        block.stmts.iter().map(|s| self.lower_stmt(s)).collect()
    }

    fn lower_stmt(&mut self, stmt: &Stmt) -> Ir {
        match stmt {
            Stmt::Var(v) => {
                let ty = self.var_type(v);
                let init = Some(Box::new(self.lower_expr(&v.value)));
                self.declare_local(&v.name, ty.clone());
                self.mk(IrKind::VarDecl { name: v.name.clone(), ty, init, is_const: matches!(v.kind, ast::VarDeclKind::Const) })
            }
            Stmt::Return { value, .. } => {
                let value = value.as_ref().map(|e| Box::new(self.lower_expr(e)));
                self.mk(IrKind::Return { value })
            }
            Stmt::If { cond, then_branch, else_branch, .. } => {
                let cond = Box::new(self.lower_expr(cond));
                self.scopes.push(HashMap::new());
                let then_body = self.lower_block(then_branch);
                self.scopes.pop();
                let else_body = match else_branch {
                    Some(b) => match b.as_ref() {
                        ast::ElseBranch::Block(blk) => {
                            self.scopes.push(HashMap::new());
                            let r = self.lower_block(blk);
                            self.scopes.pop();
                            r
                        }
                        ast::ElseBranch::If(s) => vec![self.lower_stmt(s)],
                    },
                    None => Vec::new(),
                };
                self.mk(IrKind::If { cond, then_body, else_body })
            }
            Stmt::While { cond, body, .. } => {
                let cond = Box::new(self.lower_expr(cond));
                self.scopes.push(HashMap::new());
                let body = self.lower_block(body);
                self.scopes.pop();
                self.mk(IrKind::While { cond, body })
            }
            Stmt::For { iter, by_ref, var, index_var, body, .. } => self.lower_for(iter, *by_ref, var, index_var.as_deref(), body),
            Stmt::Defer { body, .. } => {
                self.scopes.push(HashMap::new());
                let body = self.lower_block(body);
                self.scopes.pop();
                self.mk(IrKind::Defer { body })
            }
            Stmt::Errdefer { body, .. } => {
                self.scopes.push(HashMap::new());
                let body = self.lower_block(body);
                self.scopes.pop();
                self.mk(IrKind::Errdefer { body })
            }
            Stmt::Block(b) => {
                self.scopes.push(HashMap::new());
                let body = self.lower_block(b);
                self.scopes.pop();
                self.mk(IrKind::Block(body))
            }
            Stmt::Break { .. } => self.mk(IrKind::Break),
            Stmt::Continue { .. } => self.mk(IrKind::Continue),
            Stmt::Assign { target, value, .. } => {
                let target_ir = Box::new(self.lower_expr(target));
                let value_ir = Box::new(self.lower_expr(value));
                self.mk(IrKind::Assign { target: target_ir, value: value_ir })
            }
            Stmt::Expr { expr, .. } => self.lower_expr(expr),
        }
    }

    fn lower_for(&mut self, iter: &ForIter, by_ref: bool, var: &str, index_var: Option<&str>, body: &ast::Block) -> Ir {
        let (array_ir, elem_ty, size) = match iter {
            ForIter::Expr(e) => {
                let arr_ty = self.infer_type(e);
                let (elem_ty, size) = match &arr_ty {
                    Type::Array { elem, size } => ((**elem).clone(), *size),
                    _ => (Type::Void, 0),
                };
                (self.lower_expr(e), elem_ty, size)
            }
            ForIter::Range(start, end) => {
                let start_ir = self.lower_expr(start);
                let size = end
                    .as_ref()
                    .and_then(const_eval)
                    .and_then(|v| if let ConstValue::Int(n) = v { Some(n) } else { None })
                    .unwrap_or(0);
                (start_ir, Type::I32, size)
            }
        };
        self.scopes.push(HashMap::new());
        self.declare_local(var, elem_ty.clone());
        let index_name = index_var.map(|s| s.to_string()).unwrap_or_else(|| "_uya_idx".to_string());
        if let Some(iv) = index_var {
            self.declare_local(iv, Type::Usize);
        }
        let body = self.lower_block(body);
        self.scopes.pop();
        self.mk(IrKind::For { array: Box::new(array_ir), index_name, elem_name: var.to_string(), by_ref, elem_ty, size, body })
    }

    fn ensure_tuple_struct_decl(&mut self, elems: &[Type]) -> String {
        let name = Type::tuple_struct_name(elems);
        if self.seen_tuples.insert(name.clone()) {
            let fields = elems.iter().enumerate().map(|(i, t)| (format!("_{i}"), t.clone())).collect();
            let decl = self.mk(IrKind::StructDecl { name: name.clone(), fields });
            self.tuple_structs.push(decl);
        }
        name
    }

    fn lower_expr(&mut self, expr: &Expr) -> Ir {
        match expr {
            Expr::Int(v, _) => self.mk(IrKind::Constant(ConstLit::Int(*v))),
            Expr::Float(v, _) => self.mk(IrKind::Constant(ConstLit::Float(*v))),
            Expr::Bool(v, _) => self.mk(IrKind::Constant(ConstLit::Bool(*v))),
            Expr::Null(_) => self.mk(IrKind::Constant(ConstLit::Null)),
            Expr::Str(s, _) => {
                let ty = Type::Array { elem: Box::new(Type::Byte), size: s.len() as i64 + 1 };
                self.mk(IrKind::Ident { name: format!("\"{s}\""), ty })
            }
            Expr::Ident(name, _) => {
                let ty = self.lookup_local(name);
                self.mk(IrKind::Ident { name: name.clone(), ty })
            }
            Expr::ErrorLit(name, _) => self.mk(IrKind::ErrorValue { name: name.clone() }),
            Expr::Binary { op, lhs, rhs, .. } => {
                let ty = if op.is_comparison_or_logical() { Type::Bool } else { self.infer_type(lhs) };
                let lhs = Box::new(self.lower_expr(lhs));
                let rhs = Box::new(self.lower_expr(rhs));
                self.mk(IrKind::BinaryOp { op: *op, lhs, rhs, ty })
            }
            Expr::Unary { op, operand, .. } => {
                if *op == UnOp::Try {
                    let value = Box::new(self.lower_expr(operand));
                    return self.mk(IrKind::ErrorUnion { value });
                }
                let ty = self.infer_type(operand);
                let operand = Box::new(self.lower_expr(operand));
                self.mk(IrKind::UnaryOp { op: *op, operand, ty })
            }
            Expr::Cast { value, target, fallible, .. } => {
                let target_ty = self.resolve_type(target);
                let value = Box::new(self.lower_expr(value));
                self.mk(IrKind::Cast { value, target_ty, fallible: *fallible })
            }
            Expr::Call { callee, args, .. } => self.lower_call(callee, args),
            Expr::Member { object, field, .. } => {
                let ty = self.infer_type(expr);
                let object = Box::new(self.lower_expr(object));
                self.mk(IrKind::MemberAccess { object, field: field.clone(), ty })
            }
            Expr::Subscript { object, index, .. } => {
                let ty = self.infer_type(expr);
                let object = Box::new(self.lower_expr(object));
                let index = Box::new(self.lower_expr(index));
                self.mk(IrKind::Subscript { object, index, ty })
            }
            Expr::StructInit { type_name, field_names, field_values, .. } => {
                let fields = field_names
                    .iter()
                    .cloned()
                    .zip(field_values.iter().map(|v| self.lower_expr(v)))
                    .collect();
                self.mk(IrKind::StructInit { type_name: type_name.clone(), fields })
            }
            Expr::ArrayLit { elements, .. } => {
                let elem_ty = elements.first().map(|e| self.infer_type(e)).unwrap_or(Type::Void);
                let lowered = elements.iter().map(|e| self.lower_expr(e)).collect();
                self.mk(IrKind::ArrayLit { elem_ty, elements: lowered })
            }
            Expr::TupleLit { elements, .. } => {
                let elem_types: Vec<Type> = elements.iter().map(|e| self.infer_type(e)).collect();
                let name = self.ensure_tuple_struct_decl(&elem_types);
                let fields = elements.iter().enumerate().map(|(i, e)| (format!("_{i}"), self.lower_expr(e))).collect();
                self.mk(IrKind::StructInit { type_name: name, fields })
            }
            Expr::Interp { text_segments, interp_exprs, format_specs, .. } => self.lower_interpolation(text_segments, interp_exprs, format_specs),
            Expr::Catch { scrutinee, error_var, body, .. } => {
                let scrutinee = Box::new(self.lower_expr(scrutinee));
                self.scopes.push(HashMap::new());
                if let Some(ev) = error_var {
                    self.declare_local(ev, Type::ErrorUnion(Box::new(Type::Void)));
                }
                let catch_body = self.lower_block(body);
                self.scopes.pop();
                self.mk(IrKind::TryCatch { scrutinee, error_var: error_var.clone(), catch_body })
            }
            Expr::Match { scrutinee, arms, .. } => self.lower_match(scrutinee, arms),
        }
    }

    fn lower_call(&mut self, callee: &Expr, args: &[Expr]) -> Ir {
        // Method-call desugaring (spec 4.4): `obj.name(args)` where
        // `name` is a known function becomes `name(&obj, args)`.
        if let Expr::Member { object, field, .. } = callee {
            let obj_ty = self.infer_type(object);
            let emitted = match &obj_ty {
                Type::Named(sname) => self
                    .checked
                    .method_renames
                    .get(&(sname.to_string(), field.clone()))
                    .cloned()
                    .unwrap_or_else(|| field.clone()),
                _ => field.clone(),
            };
            if self.checked.functions.contains_key(&emitted) {
                let ty = self.checked.functions.get(&emitted).map(|f| f.return_type.clone()).unwrap_or(Type::Void);
                let obj_ir = self.lower_expr(object);
                let self_arg = if matches!(obj_ty, Type::Pointer(_)) {
                    obj_ir
                } else {
                    let inner_ty = obj_ty.clone();
                    self.mk(IrKind::UnaryOp { op: UnOp::AddrOf, operand: Box::new(obj_ir), ty: Type::Pointer(Box::new(inner_ty)) })
                };
                let mut lowered_args = vec![self_arg];
                lowered_args.extend(args.iter().map(|a| self.lower_expr(a)));
                return self.mk(IrKind::Call { name: emitted, args: lowered_args, ty });
            }
        }
        let (name, ty) = match callee {
            Expr::Ident(n, _) => (n.clone(), self.checked.functions.get(n).map(|f| f.return_type.clone()).unwrap_or(Type::Void)),
            other => (format!("{other:?}"), Type::Void),
        };
        let args = args.iter().map(|a| self.lower_expr(a)).collect();
        self.mk(IrKind::Call { name, args, ty })
    }

    /// Right-growing `If` chain (spec 4.5): the first arm is outermost,
    /// each subsequent arm nests inside the previous arm's else-branch,
    /// and the trailing `else` arm (if any) supplies the innermost
    /// else-body. Struct patterns AND-chain field comparisons and bind
    /// identifier sub-patterns as `VarDecl`s at the top of the then-body.
    fn lower_match(&mut self, scrutinee: &Expr, arms: &[ast::MatchArm]) -> Ir {
        let scrutinee_ty = self.infer_type(scrutinee);
        let scrutinee_ir = self.lower_expr(scrutinee);
        self.build_match_chain(&scrutinee_ir, &scrutinee_ty, arms)
    }

    fn build_match_chain(&mut self, scrutinee: &Ir, scrutinee_ty: &Type, arms: &[ast::MatchArm]) -> Ir {
        let Some((arm, rest)) = arms.split_first() else {
            return self.mk(IrKind::Block(Vec::new()));
        };
        if matches!(arm.pattern, Pattern::Else) {
            let body = self.lower_expr(&arm.body);
            return self.mk(IrKind::Block(vec![body]));
        }
        let (cond, bindings) = self.lower_pattern_cond(&arm.pattern, scrutinee, scrutinee_ty);
        self.scopes.push(HashMap::new());
        for (name, ty) in &bindings {
            self.declare_local(name, ty.clone());
        }
        let mut then_body = bindings
            .into_iter()
            .map(|(name, ty)| {
                let field_access = self.mk(IrKind::MemberAccess { object: Box::new(scrutinee.clone()), field: name.clone(), ty: ty.clone() });
                self.mk(IrKind::VarDecl { name, ty, init: Some(Box::new(field_access)), is_const: false })
            })
            .collect::<Vec<_>>();
        then_body.push(self.lower_expr(&arm.body));
        self.scopes.pop();
        let else_body = vec![self.build_match_chain(scrutinee, scrutinee_ty, rest)];
        self.mk(IrKind::If { cond: Box::new(cond), then_body, else_body })
    }

    /// Lowers one match pattern into a boolean condition IR plus the
    /// `(field_name, type)` identifier bindings it introduces.
    fn lower_pattern_cond(&mut self, pattern: &Pattern, scrutinee: &Ir, scrutinee_ty: &Type) -> (Ir, Vec<(String, Type)>) {
        match pattern {
            Pattern::Literal(e) => {
                let ty = self.infer_type(e);
                let value = self.lower_expr(e);
                (self.mk(IrKind::BinaryOp { op: BinOp::Eq, lhs: Box::new(scrutinee.clone()), rhs: Box::new(value), ty }), Vec::new())
            }
            Pattern::Ident(name) => (self.mk(IrKind::Constant(ConstLit::Bool(true))), vec![(name.clone(), scrutinee_ty.clone())]),
            Pattern::Else => (self.mk(IrKind::Constant(ConstLit::Bool(true))), Vec::new()),
            Pattern::Struct { fields, .. } => {
                let struct_fields = if let Type::Named(n) = scrutinee_ty { self.checked.structs.get(n.as_ref()).cloned() } else { None };
                let mut cond = self.mk(IrKind::Constant(ConstLit::Bool(true)));
                let mut bindings = Vec::new();
                for (fname, fpat) in fields {
                    let fty = struct_fields
                        .as_ref()
                        .and_then(|fs| fs.iter().find(|(n, _)| n == fname).map(|(_, t)| t.clone()))
                        .unwrap_or(Type::Void);
                    let access = self.mk(IrKind::MemberAccess { object: Box::new(scrutinee.clone()), field: fname.clone(), ty: fty.clone() });
                    let (sub_cond, mut sub_bindings) = self.lower_pattern_cond(fpat, &access, &fty);
                    cond = self.mk(IrKind::BinaryOp { op: BinOp::And, lhs: Box::new(cond), rhs: Box::new(sub_cond), ty: Type::Bool });
                    bindings.append(&mut sub_bindings);
                }
                (cond, bindings)
            }
        }
    }

    /// String-interpolation buffer sizing (spec 4.5): per-slot size
    /// bounds by category, `+2` for the `#` alt-form flag, summed with
    /// literal text lengths and rounded up to the next multiple of 8
    /// (minimum 8).
    fn lower_interpolation(&mut self, text_segments: &[String], interp_exprs: &[Expr], format_specs: &[Option<ast::FormatSpec>]) -> Ir {
        let mut values = Vec::new();
        let mut formats = Vec::new();
        let mut const_slots = Vec::new();
        let mut total: usize = text_segments.iter().map(|s| s.len()).sum();

        for (expr, spec) in interp_exprs.iter().zip(format_specs.iter()) {
            let ty = self.infer_type(expr);
            let fmt = build_printf_format(&ty, spec);
            let slot_size = slot_byte_bound(&ty, spec);
            total += slot_size;
            const_slots.push(const_eval(expr).map(|v| format_const_slot(v)));
            formats.push(fmt);
            values.push(self.lower_expr(expr));
        }
        let buffer_size = ((total + 1).div_ceil(8) * 8).max(8);
        self.mk(IrKind::StringInterpolation { text_segments: text_segments.to_vec(), values, formats, const_slots, buffer_size })
    }
}

fn slot_byte_bound(ty: &Type, spec: &Option<ast::FormatSpec>) -> usize {
    let base = match ty {
        Type::I64 | Type::U64 | Type::Usize => 21,
        t if t.is_float() => 24,
        t if t.is_integer() => 11,
        _ => 21,
    };
    let hex_pad = spec.as_ref().filter(|s| s.flags.contains('#')).map(|_| 2).unwrap_or(0);
    let width = spec.as_ref().and_then(|s| s.width).unwrap_or(0) as usize;
    (base + hex_pad).max(width)
}

fn build_printf_format(ty: &Type, spec: &Option<ast::FormatSpec>) -> String {
    let mut fmt = String::from("%");
    if let Some(s) = spec {
        fmt.push_str(&s.flags);
        if let Some(w) = s.width {
            fmt.push_str(&w.to_string());
        }
        if let Some(p) = s.precision {
            fmt.push('.');
            fmt.push_str(&p.to_string());
        }
    }
    let ty_char = spec.as_ref().and_then(|s| s.ty).unwrap_or(match ty {
        t if t.is_float() => 'f',
        t if t.is_integer() => 'd',
        Type::Bool => 'd',
        _ => 's',
    });
    fmt.push(ty_char);
    fmt
}

fn format_const_slot(v: ConstValue) -> String {
    match v {
        ConstValue::Int(i) => i.to_string(),
        ConstValue::Float(f) => f.to_string(),
        ConstValue::Bool(b) => (b as i32).to_string(),
    }
}
