//! C99 code generation (spec 4.6, 6)
//!
//! Walks an [`IrModule`] and renders portable C99 text: a fixed
//! prelude, forward type declarations (including synthesized tuple and
//! error-union structs), function prototypes, then definitions.
//! Variable/function naming follows spec 6 exactly (`uya_main`,
//! `uya_alignof`, `__uya_memcpy`/`__uya_memcmp`, `@test$<name>` test
//! entry points).

use crate::ast::{BinOp, UnOp};
use crate::ir::{ConstLit, Ir, IrKind, IrModule};
use crate::types::Type;
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

/// A `defer`/`errdefer` registered but not yet run, threaded through a
/// function body by reference so a `return` nested arbitrarily deep
/// still sees every ancestor scope's cleanups (spec 4.6: "at every exit
/// path ... their bodies are emitted in reverse registration order").
type DeferStack = Vec<(bool, Vec<Ir>)>;

const PRELUDE: &str = r#"#include <stdint.h>
#include <stdbool.h>
#include <stddef.h>
#include <stdarg.h>
#include <stdio.h>

#define uya_alignof(T) ((size_t)offsetof(struct { char c; T x; }, x))

static inline void __uya_memcpy(void *dst, const void *src, size_t n) {
    unsigned char *d = (unsigned char *)dst;
    const unsigned char *s = (const unsigned char *)src;
    for (size_t i = 0; i < n; i++) {
        d[i] = s[i];
    }
}

static inline int __uya_memcmp(const void *a, const void *b, size_t n) {
    const unsigned char *pa = (const unsigned char *)a;
    const unsigned char *pb = (const unsigned char *)b;
    for (size_t i = 0; i < n; i++) {
        if (pa[i] != pb[i]) {
            return (int)pa[i] - (int)pb[i];
        }
    }
    return 0;
}
"#;

pub struct EmitConfig {
    pub line_directives: bool,
    pub source_file: String,
}

impl Default for EmitConfig {
    fn default() -> Self {
        EmitConfig { line_directives: false, source_file: "input.uya".into() }
    }
}

pub fn emit_module(module: &IrModule, cfg: &EmitConfig) -> String {
    let mut e = Emitter { out: String::new(), indent: 0, err_unions: HashSet::new(), cfg, error_ids: &module.error_ids };
    e.emit_prelude();
    e.emit_type_decls(module);
    e.emit_prototypes(module);
    for f in &module.globals {
        e.emit_global(f);
    }
    for f in &module.functions {
        e.emit_top_fn(f);
    }
    for t in &module.tests {
        e.emit_top_fn(t);
    }
    e.out
}

struct Emitter<'a> {
    out: String,
    indent: usize,
    err_unions: HashSet<String>,
    cfg: &'a EmitConfig,
    error_ids: &'a HashMap<String, u32>,
}

impl<'a> Emitter<'a> {
    fn line(&mut self, s: impl AsRef<str>) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(s.as_ref());
        self.out.push('\n');
    }

    fn emit_prelude(&mut self) {
        self.out.push_str(PRELUDE);
        self.out.push('\n');
    }

    fn emit_type_decls(&mut self, module: &IrModule) {
        for decl in &module.struct_decls {
            self.emit_struct_decl(decl);
        }
        for decl in &module.enum_decls {
            self.emit_enum_decl(decl);
        }
        // Every error-union struct used anywhere in the module must be
        // typedef'd at file scope before any function body that might
        // construct or reference one lazily (`render_value_for_ty`,
        // fallible casts, `catch`) — declaring it the first time it's
        // encountered mid-body would nest the typedef inside that
        // function instead, hiding it from every other translation
        // unit scope that also needs it.
        let mut types = Vec::new();
        for f in &module.globals {
            collect_types_from_ir(f, &mut types);
        }
        for f in module.functions.iter().chain(module.tests.iter()) {
            collect_types_from_ir(f, &mut types);
        }
        for ty in &types {
            if let Type::ErrorUnion(base) = ty {
                self.ensure_err_union(base);
            }
        }
        self.out.push('\n');
    }

    fn emit_struct_decl(&mut self, ir: &Ir) {
        let IrKind::StructDecl { name, fields } = &ir.kind else { return };
        let mut s = format!("typedef struct {name} {{\n");
        for (fname, fty) in fields {
            let _ = writeln!(s, "    {};", c_field_decl(fty, fname));
        }
        let _ = writeln!(s, "}} {name};\n");
        self.out.push_str(&s);
    }

    fn emit_enum_decl(&mut self, ir: &Ir) {
        let IrKind::EnumDecl { name, underlying, variants } = &ir.kind else { return };
        let base = underlying.as_ref().map(|t| t.c_type_name()).unwrap_or_else(|| "int32_t".to_string());
        let mut s = format!("typedef {base} {name};\n");
        let mut next = 0i64;
        for (vname, value) in variants {
            let v = value.unwrap_or(next);
            let _ = writeln!(s, "#define {name}_{vname} (({base}){v})");
            next = v + 1;
        }
        s.push('\n');
        self.out.push_str(&s);
    }

    fn ensure_err_union(&mut self, base: &Type) -> String {
        let name = Type::err_union_struct_name(base);
        if self.err_unions.insert(name.clone()) {
            let c_base = base.c_type_name();
            let decl = format!(
                "typedef struct {{\n    uint32_t error_id;\n    {c_base} value;\n}} {name};\n\n"
            );
            self.out.push_str(&decl);
        }
        name
    }

    fn emit_prototypes(&mut self, module: &IrModule) {
        for f in &module.functions {
            if let IrKind::FuncDef { name, params, return_type, is_extern, has_varargs, .. } = &f.kind {
                let c_name = emitted_fn_name(name);
                let proto = fn_signature(&c_name, params, return_type, *has_varargs);
                if *is_extern {
                    self.line(format!("extern {proto};"));
                } else {
                    self.line(format!("{proto};"));
                }
            }
        }
        self.out.push('\n');
    }

    fn emit_global(&mut self, ir: &Ir) {
        if let IrKind::VarDecl { name, ty, init, is_const } = &ir.kind {
            let qualifier = if *is_const { "const " } else { "" };
            let mut s = format!("{qualifier}{} = ", c_field_decl(ty, name));
            if let Some(init) = init {
                s.push_str(&self.render_value_for_ty(init, ty));
            } else {
                s.push_str("{0}");
            }
            s.push(';');
            self.line(s);
        }
        self.out.push('\n');
    }

    fn emit_top_fn(&mut self, ir: &Ir) {
        let IrKind::FuncDef { name, params, return_type, body, is_extern, has_varargs, is_test } = &ir.kind else {
            return;
        };
        if *is_extern {
            return;
        }
        let c_name = if *is_test { test_entry_name(name) } else { emitted_fn_name(name) };
        self.line(format!("{} {{", fn_signature(&c_name, params, return_type, *has_varargs)));
        self.indent += 1;
        if self.cfg.line_directives {
            self.line(format!("#line 1 \"{}\"", self.cfg.source_file));
        }
        let mut defers: DeferStack = Vec::new();
        self.emit_body(body, return_type, &mut defers);
        self.indent -= 1;
        self.line("}");
        self.out.push('\n');
    }

    /// Emits a statement sequence, then (on ordinary fallthrough, not a
    /// `return`) the plain `defer`s registered directly in this sequence,
    /// in reverse order. `errdefer`s registered here are dropped on
    /// fallthrough — they only fire on an error-carrying `return` (spec
    /// 4.4/4.6). `defers` is shared with every enclosing scope so a
    /// `return` nested inside still sees all of them; this call only
    /// ever removes what it itself pushed.
    fn emit_body(&mut self, body: &[Ir], ret_ty: &Type, defers: &mut DeferStack) {
        let start = defers.len();
        for s in body {
            self.emit_stmt(s, ret_ty, defers);
        }
        for i in (start..defers.len()).rev() {
            let (is_errdefer, dbody) = defers[i].clone();
            if !is_errdefer {
                self.emit_block(&dbody, ret_ty, &mut Vec::new());
            }
        }
        defers.truncate(start);
    }

    fn emit_block(&mut self, body: &[Ir], ret_ty: &Type, defers: &mut DeferStack) {
        self.line("{");
        self.indent += 1;
        self.emit_body(body, ret_ty, defers);
        self.indent -= 1;
        self.line("}");
    }

    /// Emits every currently active defer/errdefer, innermost (most
    /// recently registered) first, ahead of a `return`. Must run after
    /// `_uya_ret` is bound so `errdefer` bodies (and the error-path
    /// guard itself) can observe it.
    fn emit_active_defers(&mut self, defers: &DeferStack, ret_ty: &Type) {
        let is_err_union = matches!(ret_ty, Type::ErrorUnion(_));
        for (is_errdefer, body) in defers.iter().rev() {
            if *is_errdefer {
                if is_err_union {
                    self.line("if (_uya_ret.error_id != 0) {");
                    self.indent += 1;
                    for s in body {
                        self.emit_stmt(s, ret_ty, &mut Vec::new());
                    }
                    self.indent -= 1;
                    self.line("}");
                }
            } else {
                self.emit_block(body, ret_ty, &mut Vec::new());
            }
        }
    }

    fn emit_stmt(&mut self, ir: &Ir, ret_ty: &Type, defers: &mut DeferStack) {
        match &ir.kind {
            IrKind::VarDecl { name, ty, init, is_const } => {
                let qualifier = if *is_const { "const " } else { "" };
                let mut s = format!("{qualifier}{}", c_field_decl(ty, name));
                if let Some(init) = init {
                    let rendered = self.render_value_for_ty(init, ty);
                    let _ = write!(s, " = {rendered}");
                }
                s.push(';');
                self.line(s);
            }
            IrKind::Assign { target, value } => {
                let target_ty = ir_ty(target);
                let rendered = self.render_value_for_ty(value, &target_ty);
                self.line(format!("{} = {};", self.expr_str(target), rendered));
            }
            IrKind::Return { value } => {
                // `_uya_ret` binds the value before any deferred cleanup
                // runs, so defers can observe it without racing the
                // caller's read of the return slot (spec 4.6).
                match value {
                    Some(v) if !matches!(ret_ty, Type::Void) => {
                        let rendered = self.render_value_for_ty(v, ret_ty);
                        self.line("{");
                        self.indent += 1;
                        self.line(format!("{} _uya_ret = {rendered};", ret_ty.c_type_name()));
                        self.emit_active_defers(defers, ret_ty);
                        self.line("return _uya_ret;");
                        self.indent -= 1;
                        self.line("}");
                    }
                    Some(v) => {
                        self.line(format!("{};", self.expr_str(v)));
                        self.emit_active_defers(defers, ret_ty);
                        self.line("return;");
                    }
                    None => {
                        self.emit_active_defers(defers, ret_ty);
                        self.line("return;");
                    }
                }
            }
            IrKind::If { cond, then_body, else_body } => {
                self.line(format!("if ({}) {{", self.expr_str(cond)));
                self.indent += 1;
                self.emit_body(then_body, ret_ty, defers);
                self.indent -= 1;
                if else_body.is_empty() {
                    self.line("}");
                } else {
                    self.line("} else {");
                    self.indent += 1;
                    self.emit_body(else_body, ret_ty, defers);
                    self.indent -= 1;
                    self.line("}");
                }
            }
            IrKind::While { cond, body } => {
                self.line(format!("while ({}) {{", self.expr_str(cond)));
                self.indent += 1;
                self.emit_body(body, ret_ty, defers);
                self.indent -= 1;
                self.line("}");
            }
            IrKind::For { array, index_name, elem_name, by_ref, elem_ty, size, body } => {
                self.line(format!("for (size_t {index_name} = 0; {index_name} < {size}; {index_name}++) {{"));
                self.indent += 1;
                let arr_expr = self.expr_str(array);
                if *by_ref {
                    self.line(format!("{} *{elem_name} = &{arr_expr}[{index_name}];", elem_ty.c_type_name()));
                } else {
                    self.line(format!("{} {elem_name} = {arr_expr}[{index_name}];", elem_ty.c_type_name()));
                }
                self.emit_body(body, ret_ty, defers);
                self.indent -= 1;
                self.line("}");
            }
            IrKind::Block(body) => self.emit_block(body, ret_ty, defers),
            IrKind::Break => self.line("break;"),
            IrKind::Continue => self.line("continue;"),
            IrKind::Defer { body } => defers.push((false, body.clone())),
            IrKind::Errdefer { body } => defers.push((true, body.clone())),
            IrKind::TryCatch { scrutinee, error_var, catch_body } => {
                let tmp = "_uya_try";
                let base_ty = error_union_base(scrutinee);
                let err_ty_name = self.ensure_err_union(&base_ty);
                let rendered = self.render_value_for_ty(scrutinee, &Type::ErrorUnion(Box::new(base_ty.clone())));
                self.line(format!("{{ {err_ty_name} {tmp} = {rendered};"));
                self.line(format!("if ({tmp}.error_id != 0) {{"));
                self.indent += 1;
                if let Some(ev) = error_var {
                    self.line(format!("uint32_t {ev} = {tmp}.error_id;"));
                }
                self.emit_body(catch_body, ret_ty, defers);
                self.indent -= 1;
                self.line("} }");
            }
            IrKind::StringInterpolation { .. } => {
                self.line(format!("{};", self.expr_str(ir)));
            }
            _ => {
                self.line(format!("{};", self.expr_str(ir)));
            }
        }
    }

    /// Renders `ir` coerced to `ty`. Plain values fall through to
    /// [`Emitter::expr_str`] unchanged; when `ty` is an error union this
    /// additionally builds the `{error_id, value}` literal for a bare
    /// `error.Name` value or a `try`-wrapped success, so
    /// those two forms are only ever constructed where the destination
    /// type (return, var decl, assignment, catch scrutinee) is known.
    fn render_value_for_ty(&mut self, ir: &Ir, ty: &Type) -> String {
        if let Type::ErrorUnion(base) = ty {
            let err_ty_name = self.ensure_err_union(base);
            match &ir.kind {
                IrKind::ErrorValue { name } => return self.error_wrap(&err_ty_name, base, name),
                IrKind::ErrorUnion { value } => {
                    if let Type::ErrorUnion(inner_base) = ir_ty(value) {
                        if inner_base == *base {
                            // `value` already lowers to an err-union-shaped
                            // expression of the right base (e.g. a call to
                            // a function also returning `!base`) — pass
                            // through rather than double-wrapping.
                            return self.expr_str(value);
                        }
                    }
                    let v = self.expr_str(value);
                    return self.success_wrap(&err_ty_name, base, &v);
                }
                _ => {
                    let v = self.expr_str(ir);
                    return self.success_wrap(&err_ty_name, base, &v);
                }
            }
        }
        self.expr_str(ir)
    }

    fn error_wrap(&self, err_ty_name: &str, base: &Type, name: &str) -> String {
        let code = self.error_ids.get(name).copied().unwrap_or(0);
        format!("({err_ty_name}){{ .error_id = {code}, .value = {} }}", zero_value(base))
    }

    fn success_wrap(&self, err_ty_name: &str, base: &Type, value_expr: &str) -> String {
        format!("({err_ty_name}){{ .error_id = 0, .value = ({})({value_expr}) }}", base.c_type_name())
    }

    fn expr_str(&mut self, ir: &Ir) -> String {
        match &ir.kind {
            IrKind::Constant(c) => match c {
                ConstLit::Int(v) => v.to_string(),
                ConstLit::Float(v) => format!("{v}"),
                ConstLit::Bool(v) => (if *v { "true" } else { "false" }).to_string(),
                ConstLit::Null => "NULL".to_string(),
            },
            IrKind::Ident { name, .. } => name.clone(),
            IrKind::ErrorValue { name } => {
                // Reached only when no typed destination was known to
                // `render_value_for_ty` (e.g. a bare `error.Name` used
                // where the checker couldn't pin a base type); falls
                // back to the raw numeric code.
                let code = self.error_ids.get(name).copied().unwrap_or(0);
                format!("/* error.{name} */ {code}")
            }
            IrKind::BinaryOp { op, lhs, rhs, ty } => binary_expr(*op, &self.expr_str(lhs), &self.expr_str(rhs), ty),
            IrKind::UnaryOp { op, operand, .. } => {
                let v = self.expr_str(operand);
                match op {
                    UnOp::Neg => format!("(-{v})"),
                    UnOp::Not => format!("(!{v})"),
                    UnOp::AddrOf => format!("(&{v})"),
                    UnOp::Deref => format!("(*{v})"),
                    // Lowering intercepts `try` into `IrKind::ErrorUnion`
                    // before this node can be built (see `irgen.rs`); kept
                    // for exhaustiveness, unwrapping if the operand did
                    // turn out to be error-union-shaped.
                    UnOp::Try => {
                        if matches!(ir_ty(operand), Type::ErrorUnion(_)) {
                            format!("({v}).value")
                        } else {
                            v
                        }
                    }
                }
            }
            IrKind::Cast { value, target_ty, fallible } => {
                if *fallible {
                    let err_ty_name = self.ensure_err_union(target_ty);
                    let v = self.expr_str(value);
                    self.success_wrap(&err_ty_name, target_ty, &v)
                } else {
                    let v = self.expr_str(value);
                    format!("({}){v}", target_ty.c_type_name())
                }
            }
            IrKind::Call { name, args, .. } => {
                let rendered: Vec<String> = args.iter().map(|a| self.expr_str(a)).collect();
                format!("{}({})", emitted_fn_name(name), rendered.join(", "))
            }
            IrKind::MemberAccess { object, field, .. } => format!("{}.{field}", self.expr_str(object)),
            IrKind::Subscript { object, index, .. } => format!("{}[{}]", self.expr_str(object), self.expr_str(index)),
            IrKind::StructInit { type_name, fields } => {
                let rendered: Vec<String> = fields.iter().map(|(n, v)| format!(".{n} = {}", self.expr_str(v))).collect();
                format!("({type_name}){{ {} }}", rendered.join(", "))
            }
            IrKind::ArrayLit { elem_ty, elements } => {
                let rendered: Vec<String> = elements.iter().map(|e| self.expr_str(e)).collect();
                format!("({}[]){{ {} }}", elem_ty.c_type_name(), rendered.join(", "))
            }
            IrKind::StringInterpolation { text_segments, values, formats, const_slots, buffer_size } => {
                self.render_interpolation(text_segments, values, formats, const_slots, *buffer_size)
            }
            // Reached only without a typed destination (see
            // `render_value_for_ty`); best-effort using the wrapped
            // value's own inferred type as the error-union base.
            IrKind::ErrorUnion { value } => {
                let base = match ir_ty(value) {
                    Type::ErrorUnion(b) => *b,
                    other => other,
                };
                let err_ty_name = self.ensure_err_union(&base);
                if matches!(ir_ty(value), Type::ErrorUnion(_)) {
                    self.expr_str(value)
                } else {
                    let v = self.expr_str(value);
                    self.success_wrap(&err_ty_name, &base, &v)
                }
            }
            IrKind::If { .. } | IrKind::While { .. } | IrKind::For { .. } | IrKind::Block(_) | IrKind::Return { .. } | IrKind::VarDecl { .. } | IrKind::Assign { .. } | IrKind::Defer { .. } | IrKind::Errdefer { .. } | IrKind::Break | IrKind::Continue | IrKind::TryCatch { .. } | IrKind::StructDecl { .. } | IrKind::EnumDecl { .. } | IrKind::FuncDef { .. } => {
                String::new()
            }
        }
    }

    /// Builds the running-offset `snprintf`/`memcpy` sequence into a
    /// stack buffer (spec 4.6). Const-foldable slots are baked directly
    /// into the literal text rather than formatted at runtime.
    fn render_interpolation(&mut self, text_segments: &[String], values: &[Ir], formats: &[String], const_slots: &[Option<String>], buffer_size: usize) -> String {
        let buf = "_uya_buf";
        let mut parts = Vec::new();
        parts.push(format!("char {buf}[{buffer_size}]; size_t _uya_off = 0;"));
        for (i, seg) in text_segments.iter().enumerate() {
            if !seg.is_empty() {
                parts.push(format!(
                    "__uya_memcpy({buf} + _uya_off, \"{}\", {}); _uya_off += {};",
                    escape_c_string(seg),
                    seg.len(),
                    seg.len()
                ));
            }
            if let Some(value) = values.get(i) {
                match &const_slots[i] {
                    Some(lit) => {
                        parts.push(format!(
                            "_uya_off += snprintf({buf} + _uya_off, sizeof({buf}) - _uya_off, \"{}\", {lit});",
                            formats[i]
                        ));
                    }
                    None => {
                        let v = self.expr_str(value);
                        parts.push(format!(
                            "_uya_off += snprintf({buf} + _uya_off, sizeof({buf}) - _uya_off, \"{}\", {v});",
                            formats[i]
                        ));
                    }
                }
            }
        }
        parts.push(format!("{buf}[_uya_off < sizeof({buf}) ? _uya_off : sizeof({buf}) - 1] = '\\0';"));
        format!("({{ {} {buf}; }})", parts.join(" "))
    }
}

/// Walks every `Type` reachable from `ir` (declarations, signatures,
/// operand types) into `out`, so [`Emitter::emit_type_decls`] can
/// typedef every error-union struct the module will ever need before
/// any function body is emitted.
fn collect_types_from_ir(ir: &Ir, out: &mut Vec<Type>) {
    match &ir.kind {
        IrKind::Ident { ty, .. } => out.push(ty.clone()),
        IrKind::VarDecl { ty, init, .. } => {
            out.push(ty.clone());
            if let Some(i) = init {
                collect_types_from_ir(i, out);
            }
        }
        IrKind::Assign { target, value } => {
            collect_types_from_ir(target, out);
            collect_types_from_ir(value, out);
        }
        IrKind::BinaryOp { lhs, rhs, ty, .. } => {
            out.push(ty.clone());
            collect_types_from_ir(lhs, out);
            collect_types_from_ir(rhs, out);
        }
        IrKind::UnaryOp { operand, ty, .. } => {
            out.push(ty.clone());
            collect_types_from_ir(operand, out);
        }
        IrKind::Cast { value, target_ty, .. } => {
            out.push(target_ty.clone());
            collect_types_from_ir(value, out);
        }
        IrKind::Call { args, ty, .. } => {
            out.push(ty.clone());
            for a in args {
                collect_types_from_ir(a, out);
            }
        }
        IrKind::Return { value } => {
            if let Some(v) = value {
                collect_types_from_ir(v, out);
            }
        }
        IrKind::If { cond, then_body, else_body } => {
            collect_types_from_ir(cond, out);
            for s in then_body {
                collect_types_from_ir(s, out);
            }
            for s in else_body {
                collect_types_from_ir(s, out);
            }
        }
        IrKind::While { cond, body } => {
            collect_types_from_ir(cond, out);
            for s in body {
                collect_types_from_ir(s, out);
            }
        }
        IrKind::For { array, elem_ty, body, .. } => {
            out.push(elem_ty.clone());
            collect_types_from_ir(array, out);
            for s in body {
                collect_types_from_ir(s, out);
            }
        }
        IrKind::Block(body) => {
            for s in body {
                collect_types_from_ir(s, out);
            }
        }
        IrKind::MemberAccess { object, ty, .. } => {
            out.push(ty.clone());
            collect_types_from_ir(object, out);
        }
        IrKind::Subscript { object, index, ty } => {
            out.push(ty.clone());
            collect_types_from_ir(object, out);
            collect_types_from_ir(index, out);
        }
        IrKind::StructInit { fields, .. } => {
            for (_, v) in fields {
                collect_types_from_ir(v, out);
            }
        }
        IrKind::ArrayLit { elem_ty, elements } => {
            out.push(elem_ty.clone());
            for e in elements {
                collect_types_from_ir(e, out);
            }
        }
        IrKind::TryCatch { scrutinee, catch_body, .. } => {
            out.push(error_union_base(scrutinee));
            collect_types_from_ir(scrutinee, out);
            for s in catch_body {
                collect_types_from_ir(s, out);
            }
        }
        IrKind::ErrorUnion { value } => collect_types_from_ir(value, out),
        IrKind::StringInterpolation { values, .. } => {
            for v in values {
                collect_types_from_ir(v, out);
            }
        }
        IrKind::Defer { body } | IrKind::Errdefer { body } => {
            for s in body {
                collect_types_from_ir(s, out);
            }
        }
        IrKind::FuncDef { params, return_type, body, .. } => {
            out.push(return_type.clone());
            for (_, t) in params {
                out.push(t.clone());
            }
            for s in body {
                collect_types_from_ir(s, out);
            }
        }
        IrKind::StructDecl { fields, .. } => {
            for (_, t) in fields {
                out.push(t.clone());
            }
        }
        IrKind::EnumDecl { underlying, .. } => {
            if let Some(t) = underlying {
                out.push(t.clone());
            }
        }
        IrKind::Constant(_) | IrKind::ErrorValue { .. } | IrKind::Break | IrKind::Continue => {}
    }
}

fn emitted_fn_name(name: &str) -> String {
    if name == "main" {
        "uya_main".to_string()
    } else {
        name.to_string()
    }
}

fn test_entry_name(name: &str) -> String {
    let sanitized: String = name.chars().map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' }).collect();
    format!("test_dollar_{sanitized}")
}

fn fn_signature(c_name: &str, params: &[(String, Type)], return_type: &Type, has_varargs: bool) -> String {
    let mut parts: Vec<String> = params.iter().map(|(n, t)| c_field_decl(t, n)).collect();
    if has_varargs {
        parts.push("...".to_string());
    }
    if parts.is_empty() {
        parts.push("void".to_string());
    }
    format!("{} {c_name}({})", return_type.c_type_name(), parts.join(", "))
}

/// Renders a `T name` / `T name[N]` / `T *name` declarator (spec 4.6:
/// array and pointer forms need declarator-specific syntax beyond
/// `Type::c_type_name`'s flat type spelling).
fn c_field_decl(ty: &Type, name: &str) -> String {
    match ty {
        Type::Array { elem, size } if *size >= 0 => format!("{} {name}[{size}]", elem.c_type_name()),
        Type::Array { elem, .. } => format!("{} *{name}", elem.c_type_name()),
        Type::Pointer(inner) => format!("{} *{name}", inner.c_type_name()),
        other => format!("{} {name}", other.c_type_name()),
    }
}

/// Best-effort recovery of an IR node's result type, for sites (like
/// `catch`'s scrutinee) where the emitter needs a `Type` but the IR
/// node is a bare leaf. Error-union scrutinees always lower to a node
/// that carries a `ty` field (`Ident`/`Call`/`MemberAccess`/`Subscript`),
/// since `try` itself wraps its operand in `ErrorUnion` around one of
/// those; `Void` is an inert fallback, never reached in practice.
fn ir_ty(ir: &Ir) -> Type {
    match &ir.kind {
        IrKind::Ident { ty, .. }
        | IrKind::Call { ty, .. }
        | IrKind::MemberAccess { ty, .. }
        | IrKind::Subscript { ty, .. }
        | IrKind::BinaryOp { ty, .. }
        | IrKind::UnaryOp { ty, .. } => ty.clone(),
        IrKind::Cast { target_ty, .. } => target_ty.clone(),
        IrKind::ErrorUnion { value } => ir_ty(value),
        _ => Type::Void,
    }
}

/// The base `T` of the error union a `try`/`catch` scrutinee represents,
/// unwrapping one `ErrorUnion` layer if `ir_ty` finds one (a call to a
/// function declared `!T`) and otherwise using the node's own type
/// as-is (a value about to be wrapped as a fresh success).
fn error_union_base(ir: &Ir) -> Type {
    match ir_ty(ir) {
        Type::ErrorUnion(base) => *base,
        other => other,
    }
}

/// A type's default-initialized spelling, used for the unused `.value`
/// field of an error-carrying union literal.
fn zero_value(ty: &Type) -> String {
    match ty {
        Type::F32 | Type::F64 => "0.0".to_string(),
        Type::Bool => "false".to_string(),
        Type::Pointer(_) => "NULL".to_string(),
        Type::Array { .. } | Type::Tuple(_) | Type::Named(_) => "{0}".to_string(),
        _ => "0".to_string(),
    }
}

fn binary_expr(op: BinOp, lhs: &str, rhs: &str, ty: &Type) -> String {
    match op {
        BinOp::AddSat => saturating_expr("add", lhs, rhs, ty),
        BinOp::SubSat => saturating_expr("sub", lhs, rhs, ty),
        BinOp::MulSat => saturating_expr("mul", lhs, rhs, ty),
        BinOp::AddWrap => format!("(({}) ({lhs} + {rhs}))", ty.c_type_name()),
        BinOp::SubWrap => format!("(({}) ({lhs} - {rhs}))", ty.c_type_name()),
        BinOp::MulWrap => format!("(({}) ({lhs} * {rhs}))", ty.c_type_name()),
        _ => format!("({lhs} {} {rhs})", op.symbol()),
    }
}

/// Branchless saturating arithmetic: clamp to the type's min/max after
/// computing in a wider intermediate (spec 4.6).
fn saturating_expr(kind: &str, lhs: &str, rhs: &str, ty: &Type) -> String {
    let op = match kind {
        "add" => "+",
        "sub" => "-",
        _ => "*",
    };
    let (min, max) = int_bounds(ty);
    let wide = "int64_t";
    format!("(({}) ((({wide})({lhs}) {op} ({wide})({rhs})) > ({max}) ? ({max}) : ((({wide})({lhs}) {op} ({wide})({rhs})) < ({min}) ? ({min}) : (({wide})({lhs}) {op} ({wide})({rhs})))))", ty.c_type_name())
}

fn int_bounds(ty: &Type) -> (i64, i64) {
    match ty {
        Type::I8 => (i8::MIN as i64, i8::MAX as i64),
        Type::I16 => (i16::MIN as i64, i16::MAX as i64),
        Type::I32 => (i32::MIN as i64, i32::MAX as i64),
        Type::I64 => (i64::MIN, i64::MAX),
        Type::U8 | Type::Byte => (0, u8::MAX as i64),
        Type::U16 => (0, u16::MAX as i64),
        Type::U32 => (0, u32::MAX as i64),
        Type::U64 => (0, i64::MAX),
        _ => (i32::MIN as i64, i32::MAX as i64),
    }
}

fn escape_c_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use crate::typechecker::check_program;
    use crate::irgen::lower_program;
    use std::rc::Rc;

    fn compile(src: &str) -> String {
        let (tokens, _) = Lexer::new(src, Rc::from("t.uya")).tokenize();
        let (program, parse_diags) = Parser::new(tokens).parse_program();
        assert!(parse_diags.is_empty(), "{}", parse_diags.format());
        let (checked, diags) = check_program(program);
        assert!(!diags.has_errors(), "{}", diags.format());
        let module = lower_program(&checked);
        emit_module(&module, &EmitConfig::default())
    }

    #[test]
    fn main_function_renamed_to_uya_main() {
        let out = compile("fn main() i32 { return 0; }");
        assert!(out.contains("uya_main"));
    }

    #[test]
    fn wrapping_add_renders_cast_expression() {
        let out = compile("fn add(a: i32, b: i32) i32 { return a +% b; }");
        assert!(out.contains("int32_t"));
    }

    #[test]
    fn test_block_gets_dollar_sanitized_entry_name() {
        let out = compile(r#"test "adds numbers" { var x: i32 = 1; }"#);
        assert!(out.contains("test_dollar_adds_numbers"));
    }
}
