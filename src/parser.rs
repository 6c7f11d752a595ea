//! Recursive-descent parser (spec 4.3)
//!
//! One token of lookahead, `peek`/`expect`/`match_kind` in the teacher's
//! `Parser { tokens, pos }` shape, but operating over the upfront token
//! vector the lexer produces rather than a live lexer handle. Spec 4.3's
//! struct-init-vs-block disambiguation calls for "saving the lexer
//! state, peeking two tokens, and restoring" — pre-tokenizing makes that
//! trivial index lookahead instead, which is simpler than the teacher's
//! live-lexer backtrack and recorded as a deliberate simplification in
//! DESIGN.md rather than a silent deviation.

use crate::ast::*;
use crate::diagnostic::{Diagnostic, DiagnosticBag, Phase};
use crate::token::{Keyword, Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    diagnostics: DiagnosticBag,
    /// Suppressed inside `if`/`while`/`for` conditions and builtin
    /// arguments, where a following `{` can never be a struct literal.
    allow_struct_init: bool,
}

type PResult<T> = Option<T>;

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0, diagnostics: DiagnosticBag::new(), allow_struct_init: true }
    }

    pub fn parse_program(mut self) -> (Program, DiagnosticBag) {
        let mut decls = Vec::new();
        while !self.at_eof() {
            match self.parse_top_decl() {
                Some(d) => decls.push(d),
                None => self.recover_to_top_decl(),
            }
        }
        (Program { decls }, self.diagnostics)
    }

    // --- token stream helpers -------------------------------------------------

    fn cur(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn at_eof(&self) -> bool {
        self.cur().is_eof()
    }

    fn loc(&self) -> Loc {
        let t = self.cur();
        Loc::new(t.file.clone(), t.line, t.column)
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.cur().kind) == std::mem::discriminant(kind)
    }

    fn check_kw(&self, kw: Keyword) -> bool {
        matches!(&self.cur().kind, TokenKind::Keyword(k) if *k == kw)
    }

    fn match_kw(&mut self, kw: Keyword) -> bool {
        if self.check_kw(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_kind(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&mut self, message: impl Into<String>) {
        let t = self.cur();
        self.diagnostics
            .push(Diagnostic::error(Phase::Syntactic, t.file.clone(), t.line, t.column, message));
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> PResult<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            self.error(format!("expected {what}, got {:?}", self.cur().kind));
            None
        }
    }

    fn expect_kw(&mut self, kw: Keyword, what: &str) -> PResult<()> {
        if self.match_kw(kw) {
            Some(())
        } else {
            self.error(format!("expected {what}, got {:?}", self.cur().kind));
            None
        }
    }

    fn expect_ident(&mut self, what: &str) -> PResult<String> {
        if let TokenKind::Ident(name) = &self.cur().kind {
            let name = name.clone();
            self.advance();
            Some(name)
        } else {
            self.error(format!("expected {what}, got {:?}", self.cur().kind));
            None
        }
    }

    /// Skip forward to a token that plausibly starts a new top-level
    /// declaration or statement, so one bad declaration doesn't hide the
    /// rest of the file's diagnostics (spec 4.3 error recovery).
    fn recover_to_top_decl(&mut self) {
        self.advance();
        while !self.at_eof() {
            if matches!(
                self.cur().kind,
                TokenKind::Keyword(
                    Keyword::Fn | Keyword::Extern | Keyword::Struct | Keyword::Enum | Keyword::Interface
                        | Keyword::Impl | Keyword::Error | Keyword::Const | Keyword::Var | Keyword::Let | Keyword::Test
                )
            ) {
                return;
            }
            self.advance();
        }
    }

    fn recover_to_stmt(&mut self) {
        self.advance();
        while !self.at_eof() {
            if matches!(self.cur().kind, TokenKind::Semicolon) {
                self.advance();
                return;
            }
            if matches!(
                self.cur().kind,
                TokenKind::Keyword(
                    Keyword::If | Keyword::While | Keyword::For | Keyword::Return | Keyword::Break
                        | Keyword::Continue | Keyword::Defer | Keyword::Errdefer | Keyword::Const | Keyword::Var | Keyword::Let
                ) | TokenKind::RBrace
            ) {
                return;
            }
            self.advance();
        }
    }

    // --- top-level declarations ------------------------------------------------

    fn parse_top_decl(&mut self) -> PResult<Decl> {
        match &self.cur().kind {
            TokenKind::Keyword(Keyword::Fn) => self.parse_fn_decl(),
            TokenKind::Keyword(Keyword::Extern) => self.parse_extern_decl(),
            TokenKind::Keyword(Keyword::Struct) => self.parse_struct_decl(),
            TokenKind::Keyword(Keyword::Enum) => self.parse_enum_decl(),
            TokenKind::Keyword(Keyword::Interface) => self.parse_interface_decl(),
            TokenKind::Keyword(Keyword::Impl) => self.parse_impl_decl(),
            TokenKind::Keyword(Keyword::Error) => self.parse_error_decl(),
            TokenKind::Keyword(Keyword::Const) | TokenKind::Keyword(Keyword::Var) | TokenKind::Keyword(Keyword::Let) => {
                let v = self.parse_var_decl()?;
                self.expect(&TokenKind::Semicolon, "';'")?;
                Some(Decl::Var(v))
            }
            TokenKind::Keyword(Keyword::Test) => self.parse_test_block(),
            // Bare `Ident : Ident { ... }` impl block without the `impl` keyword (spec 4.3: `ImplDecl := ('impl')? Ident ':' Ident ...`).
            TokenKind::Ident(_) if matches!(self.at(1).map(|t| &t.kind), Some(TokenKind::Colon)) => self.parse_impl_decl(),
            other => {
                self.error(format!("expected a top-level declaration, got {other:?}"));
                None
            }
        }
    }

    fn parse_params(&mut self) -> PResult<(Vec<Param>, bool)> {
        self.expect(&TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        let mut has_varargs = false;
        if !self.check(&TokenKind::RParen) {
            loop {
                if self.match_kind(&TokenKind::DotDotDot) {
                    has_varargs = true;
                    break;
                }
                let loc = self.loc();
                let name = self.expect_ident("a parameter name")?;
                self.expect(&TokenKind::Colon, "':'")?;
                let ty = self.parse_type()?;
                params.push(Param { name, ty, loc });
                if !self.match_kind(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "')'")?;
        Some((params, has_varargs))
    }

    fn parse_fn_decl(&mut self) -> PResult<Decl> {
        let loc = self.loc();
        self.expect_kw(Keyword::Fn, "'fn'")?;
        let name = self.expect_ident("a function name")?;
        let (params, has_varargs) = self.parse_params()?;
        let return_type = self.parse_type()?;
        let body = self.parse_block()?;
        Some(Decl::Fn {
            name,
            params,
            has_varargs,
            return_type,
            body: Some(body),
            is_extern: false,
            loc,
        })
    }

    fn parse_extern_decl(&mut self) -> PResult<Decl> {
        let loc = self.loc();
        self.expect_kw(Keyword::Extern, "'extern'")?;
        self.expect_kw(Keyword::Fn, "'fn'")?;
        let name = self.expect_ident("a function name")?;
        let (params, has_varargs) = self.parse_params()?;
        let return_type = self.parse_type()?;
        self.expect(&TokenKind::Semicolon, "';'")?;
        Some(Decl::Fn {
            name,
            params,
            has_varargs,
            return_type,
            body: None,
            is_extern: true,
            loc,
        })
    }

    fn parse_struct_decl(&mut self) -> PResult<Decl> {
        let loc = self.loc();
        self.expect_kw(Keyword::Struct, "'struct'")?;
        let name = self.expect_ident("a struct name")?;
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut fields = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_eof() {
            let floc = self.loc();
            let fname = self.expect_ident("a field name")?;
            self.expect(&TokenKind::Colon, "':'")?;
            let ty = self.parse_type()?;
            fields.push(Field { name: fname, ty, loc: floc });
            if !self.match_kind(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace, "'}'")?;
        Some(Decl::Struct { name, fields, loc })
    }

    fn parse_enum_decl(&mut self) -> PResult<Decl> {
        let loc = self.loc();
        self.expect_kw(Keyword::Enum, "'enum'")?;
        let name = self.expect_ident("an enum name")?;
        let underlying = if self.match_kind(&TokenKind::Colon) { Some(self.parse_type()?) } else { None };
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut variants = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_eof() {
            let vloc = self.loc();
            let vname = self.expect_ident("a variant name")?;
            let value = if self.match_kind(&TokenKind::Eq) { Some(self.parse_expr()?) } else { None };
            variants.push(Variant { name: vname, value, loc: vloc });
            if !self.match_kind(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace, "'}'")?;
        Some(Decl::Enum { name, underlying, variants, loc })
    }

    fn parse_interface_decl(&mut self) -> PResult<Decl> {
        let loc = self.loc();
        self.expect_kw(Keyword::Interface, "'interface'")?;
        let name = self.expect_ident("an interface name")?;
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut methods = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_eof() {
            let mloc = self.loc();
            self.expect_kw(Keyword::Fn, "'fn'")?;
            let mname = self.expect_ident("a method name")?;
            let (params, _) = self.parse_params()?;
            let return_type = self.parse_type()?;
            self.expect(&TokenKind::Semicolon, "';'")?;
            methods.push(InterfaceMethod { name: mname, params, return_type, loc: mloc });
        }
        self.expect(&TokenKind::RBrace, "'}'")?;
        Some(Decl::Interface { name, methods, loc })
    }

    fn parse_impl_decl(&mut self) -> PResult<Decl> {
        let loc = self.loc();
        self.match_kw(Keyword::Impl);
        let struct_name = self.expect_ident("a struct name")?;
        self.expect(&TokenKind::Colon, "':'")?;
        let interface_name = self.expect_ident("an interface name")?;
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut methods = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_eof() {
            match self.parse_fn_decl() {
                Some(d) => methods.push(d),
                None => self.recover_to_stmt(),
            }
        }
        self.expect(&TokenKind::RBrace, "'}'")?;
        Some(Decl::Impl { struct_name, interface_name, methods, loc })
    }

    fn parse_error_decl(&mut self) -> PResult<Decl> {
        let loc = self.loc();
        self.expect_kw(Keyword::Error, "'error'")?;
        let name = self.expect_ident("an error set name")?;
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut variants = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_eof() {
            variants.push(self.expect_ident("an error variant name")?);
            if !self.match_kind(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace, "'}'")?;
        Some(Decl::Error { name, variants, loc })
    }

    fn parse_test_block(&mut self) -> PResult<Decl> {
        let loc = self.loc();
        self.expect_kw(Keyword::Test, "'test'")?;
        let name = match &self.cur().kind {
            TokenKind::Str(s) => {
                let s = s.clone();
                self.advance();
                s
            }
            other => {
                self.error(format!("expected a string literal test name, got {other:?}"));
                return None;
            }
        };
        let body = self.parse_block()?;
        Some(Decl::Test { name, body, loc })
    }

    fn parse_var_decl(&mut self) -> PResult<VarDeclNode> {
        let loc = self.loc();
        let kind = if self.match_kw(Keyword::Const) {
            VarDeclKind::Const
        } else if self.match_kw(Keyword::Var) {
            VarDeclKind::Var
        } else if self.match_kw(Keyword::Let) {
            VarDeclKind::Let { is_mut: self.match_kw(Keyword::Mut) }
        } else {
            self.error("expected 'const', 'var', or 'let'");
            return None;
        };
        let name = self.expect_ident("a variable name")?;
        let type_ann = if self.match_kind(&TokenKind::Colon) { Some(self.parse_type()?) } else { None };
        self.expect(&TokenKind::Eq, "'='")?;
        let value = self.parse_expr()?;
        Some(VarDeclNode { kind, name, type_ann, value, loc })
    }

    // --- types -------------------------------------------------------------

    fn parse_type(&mut self) -> PResult<TypeExpr> {
        if self.match_kind(&TokenKind::Bang) {
            return Some(TypeExpr::ErrorUnion(Box::new(self.parse_type()?)));
        }
        if self.match_kw(Keyword::Atomic) {
            return Some(TypeExpr::Atomic(Box::new(self.parse_type()?)));
        }
        if self.match_kind(&TokenKind::Star) {
            return Some(TypeExpr::Pointer(Box::new(self.parse_type()?)));
        }
        if self.match_kind(&TokenKind::Amp) {
            return Some(TypeExpr::Ref(Box::new(self.parse_type()?)));
        }
        if self.match_kind(&TokenKind::LBracket) {
            let elem = self.parse_type()?;
            if !self.match_kind(&TokenKind::Colon) && !self.match_kind(&TokenKind::Semicolon) {
                self.error("expected ':' or ';' in array type");
                return None;
            }
            let size = self.parse_expr()?;
            self.expect(&TokenKind::RBracket, "']'")?;
            return Some(TypeExpr::Array { elem: Box::new(elem), size: Box::new(size) });
        }
        if self.match_kw(Keyword::Fn) {
            self.expect(&TokenKind::LParen, "'('")?;
            let mut params = Vec::new();
            if !self.check(&TokenKind::RParen) {
                loop {
                    params.push(self.parse_type()?);
                    if !self.match_kind(&TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(&TokenKind::RParen, "')'")?;
            let ret = self.parse_type()?;
            return Some(TypeExpr::Fn { params, ret: Box::new(ret) });
        }
        if self.match_kind(&TokenKind::LParen) {
            let mut elems = Vec::new();
            if !self.check(&TokenKind::RParen) {
                loop {
                    elems.push(self.parse_type()?);
                    if !self.match_kind(&TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(&TokenKind::RParen, "')'")?;
            return Some(TypeExpr::Tuple(elems));
        }
        let name = self.expect_ident("a type")?;
        Some(TypeExpr::Named(name))
    }

    // --- statements ----------------------------------------------------------

    fn parse_block(&mut self) -> PResult<Block> {
        let loc = self.loc();
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_eof() {
            match self.parse_stmt() {
                Some(s) => stmts.push(s),
                None => self.recover_to_stmt(),
            }
        }
        self.expect(&TokenKind::RBrace, "'}'")?;
        Some(Block { stmts, loc })
    }

    fn parse_stmt(&mut self) -> PResult<Stmt> {
        match &self.cur().kind {
            TokenKind::Keyword(Keyword::Const | Keyword::Var | Keyword::Let) => {
                let v = self.parse_var_decl()?;
                self.expect(&TokenKind::Semicolon, "';'")?;
                Some(Stmt::Var(v))
            }
            TokenKind::Keyword(Keyword::Return) => {
                let loc = self.loc();
                self.advance();
                let value = if self.check(&TokenKind::Semicolon) { None } else { Some(self.parse_expr()?) };
                self.expect(&TokenKind::Semicolon, "';'")?;
                Some(Stmt::Return { value, loc })
            }
            TokenKind::Keyword(Keyword::If) => self.parse_if_stmt(),
            TokenKind::Keyword(Keyword::While) => self.parse_while_stmt(),
            TokenKind::Keyword(Keyword::For) => self.parse_for_stmt(),
            TokenKind::Keyword(Keyword::Defer) => {
                let loc = self.loc();
                self.advance();
                let body = self.parse_block()?;
                Some(Stmt::Defer { body, loc })
            }
            TokenKind::Keyword(Keyword::Errdefer) => {
                let loc = self.loc();
                self.advance();
                let body = self.parse_block()?;
                Some(Stmt::Errdefer { body, loc })
            }
            TokenKind::Keyword(Keyword::Break) => {
                let loc = self.loc();
                self.advance();
                self.expect(&TokenKind::Semicolon, "';'")?;
                Some(Stmt::Break { loc })
            }
            TokenKind::Keyword(Keyword::Continue) => {
                let loc = self.loc();
                self.advance();
                self.expect(&TokenKind::Semicolon, "';'")?;
                Some(Stmt::Continue { loc })
            }
            TokenKind::LBrace => Some(Stmt::Block(self.parse_block()?)),
            _ => self.parse_expr_or_assign_stmt(),
        }
    }

    fn parse_if_stmt(&mut self) -> PResult<Stmt> {
        let loc = self.loc();
        self.expect_kw(Keyword::If, "'if'")?;
        let cond = self.parse_expr_no_struct_init()?;
        let then_branch = self.parse_block()?;
        let else_branch = if self.match_kw(Keyword::Else) {
            if self.check_kw(Keyword::If) {
                Some(Box::new(ElseBranch::If(self.parse_if_stmt()?)))
            } else {
                Some(Box::new(ElseBranch::Block(self.parse_block()?)))
            }
        } else {
            None
        };
        Some(Stmt::If { cond, then_branch, else_branch, loc })
    }

    fn parse_while_stmt(&mut self) -> PResult<Stmt> {
        let loc = self.loc();
        self.expect_kw(Keyword::While, "'while'")?;
        let cond = self.parse_expr_no_struct_init()?;
        let body = self.parse_block()?;
        Some(Stmt::While { cond, body, loc })
    }

    fn parse_for_stmt(&mut self) -> PResult<Stmt> {
        let loc = self.loc();
        self.expect_kw(Keyword::For, "'for'")?;
        let iter = if self.match_kind(&TokenKind::LParen) {
            let first = self.parse_expr()?;
            let second = if self.match_kind(&TokenKind::Comma) { Some(self.parse_expr()?) } else { None };
            self.expect(&TokenKind::RParen, "')'")?;
            ForIter::Range(first, second)
        } else {
            ForIter::Expr(self.parse_expr_no_struct_init()?)
        };
        self.expect(&TokenKind::Pipe, "'|'")?;
        let by_ref = self.match_kind(&TokenKind::Amp);
        let var = self.expect_ident("a loop variable name")?;
        let index_var = if self.match_kind(&TokenKind::Comma) { Some(self.expect_ident("an index variable name")?) } else { None };
        self.expect(&TokenKind::Pipe, "'|'")?;
        let body = self.parse_block()?;
        Some(Stmt::For { iter, by_ref, var, index_var, body, loc })
    }

    fn parse_expr_or_assign_stmt(&mut self) -> PResult<Stmt> {
        let loc = self.loc();
        let expr = self.parse_expr()?;
        if self.match_kind(&TokenKind::Eq) {
            if !expr.is_lvalue() {
                self.error("left-hand side of assignment is not an lvalue");
                return None;
            }
            let value = self.parse_expr()?;
            self.expect(&TokenKind::Semicolon, "';'")?;
            return Some(Stmt::Assign { target: expr, value, loc });
        }
        self.expect(&TokenKind::Semicolon, "';'")?;
        Some(Stmt::Expr { expr, loc })
    }

    // --- expressions ---------------------------------------------------------
    //
    // Precedence, low to high (spec 4.3): or, and, equality, relational,
    // bit-or, bit-xor, bit-and, shift, additive, multiplicative, cast,
    // unary, postfix. Assignment is handled at the statement layer above.

    fn parse_expr(&mut self) -> PResult<Expr> {
        self.allow_struct_init = true;
        self.parse_or()
    }

    /// Used for `if`/`while`/`for` conditions, where a bare `{` must
    /// start the body block rather than a struct literal (spec 4.3:
    /// struct-init disambiguation is about the immediate `Ident {`
    /// pairing, but condition contexts never allow a bare struct-init at
    /// the top level since the following `{` is always the body).
    fn parse_expr_no_struct_init(&mut self) -> PResult<Expr> {
        self.allow_struct_init = false;
        let e = self.parse_or();
        self.allow_struct_init = true;
        e
    }

    fn parse_or(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.check(&TokenKind::OrOr) {
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::Binary { op: BinOp::Or, lhs: Box::new(lhs), rhs: Box::new(rhs), loc };
        }
        Some(lhs)
    }

    fn parse_and(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_equality()?;
        while self.check(&TokenKind::AndAnd) {
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_equality()?;
            lhs = Expr::Binary { op: BinOp::And, lhs: Box::new(lhs), rhs: Box::new(rhs), loc };
        }
        Some(lhs)
    }

    fn parse_equality(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.cur().kind {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::NotEq => BinOp::Ne,
                _ => break,
            };
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_relational()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), loc };
        }
        Some(lhs)
    }

    fn parse_relational(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_bitor()?;
        loop {
            let op = match self.cur().kind {
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Le => BinOp::Le,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Ge => BinOp::Ge,
                _ => break,
            };
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_bitor()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), loc };
        }
        Some(lhs)
    }

    fn parse_bitor(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_bitxor()?;
        while self.check(&TokenKind::Pipe) {
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_bitxor()?;
            lhs = Expr::Binary { op: BinOp::BitOr, lhs: Box::new(lhs), rhs: Box::new(rhs), loc };
        }
        Some(lhs)
    }

    fn parse_bitxor(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_bitand()?;
        while self.check(&TokenKind::Caret) {
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_bitand()?;
            lhs = Expr::Binary { op: BinOp::BitXor, lhs: Box::new(lhs), rhs: Box::new(rhs), loc };
        }
        Some(lhs)
    }

    fn parse_bitand(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_shift()?;
        while self.check(&TokenKind::Amp) {
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_shift()?;
            lhs = Expr::Binary { op: BinOp::BitAnd, lhs: Box::new(lhs), rhs: Box::new(rhs), loc };
        }
        Some(lhs)
    }

    fn parse_shift(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.cur().kind {
                TokenKind::Shl => BinOp::Shl,
                TokenKind::Shr => BinOp::Shr,
                _ => break,
            };
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), loc };
        }
        Some(lhs)
    }

    fn parse_additive(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.cur().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                TokenKind::PlusPipe => BinOp::AddSat,
                TokenKind::MinusPipe => BinOp::SubSat,
                TokenKind::PlusPercent => BinOp::AddWrap,
                TokenKind::MinusPercent => BinOp::SubWrap,
                _ => break,
            };
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), loc };
        }
        Some(lhs)
    }

    fn parse_multiplicative(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_cast()?;
        loop {
            let op = match self.cur().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                TokenKind::StarPipe => BinOp::MulSat,
                TokenKind::StarPercent => BinOp::MulWrap,
                _ => break,
            };
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_cast()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), loc };
        }
        Some(lhs)
    }

    fn parse_cast(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let fallible = match self.cur().kind {
                TokenKind::Keyword(Keyword::As) => false,
                TokenKind::Keyword(Keyword::AsBang) => true,
                _ => break,
            };
            let loc = self.loc();
            self.advance();
            let target = self.parse_type()?;
            lhs = Expr::Cast { value: Box::new(lhs), target, fallible, loc };
        }
        Some(lhs)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let loc = self.loc();
        let op = match self.cur().kind {
            TokenKind::Bang => Some(UnOp::Not),
            TokenKind::Minus => Some(UnOp::Neg),
            TokenKind::Amp => Some(UnOp::AddrOf),
            TokenKind::Star => Some(UnOp::Deref),
            TokenKind::Keyword(Keyword::Try) => Some(UnOp::Try),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            return Some(Expr::Unary { op, operand: Box::new(operand), loc });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match &self.cur().kind {
                TokenKind::LParen => {
                    let loc = self.loc();
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check(&TokenKind::RParen) {
                        loop {
                            args.push(self.parse_expr()?);
                            if !self.match_kind(&TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(&TokenKind::RParen, "')'")?;
                    expr = Expr::Call { callee: Box::new(expr), args, loc };
                }
                TokenKind::Dot => {
                    let loc = self.loc();
                    self.advance();
                    let field = self.expect_ident("a field name")?;
                    expr = Expr::Member { object: Box::new(expr), field, loc };
                }
                TokenKind::LBracket => {
                    let loc = self.loc();
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(&TokenKind::RBracket, "']'")?;
                    expr = Expr::Subscript { object: Box::new(expr), index: Box::new(index), loc };
                }
                TokenKind::Keyword(Keyword::Catch) => {
                    let loc = self.loc();
                    self.advance();
                    let error_var = if self.match_kind(&TokenKind::Pipe) {
                        let name = self.expect_ident("an error variable name")?;
                        self.expect(&TokenKind::Pipe, "'|'")?;
                        Some(name)
                    } else {
                        None
                    };
                    let body = self.parse_block()?;
                    expr = Expr::Catch { scrutinee: Box::new(expr), error_var, body, loc };
                }
                _ => break,
            }
        }
        Some(expr)
    }

    /// Two-token lookahead for struct-init-vs-block (spec 4.3): `{`
    /// begins a struct literal only if it is immediately followed by
    /// `Ident ':'`. Assumes `self.cur()` is the `{`.
    fn looks_like_struct_init(&self) -> bool {
        matches!(self.at(1).map(|t| &t.kind), Some(TokenKind::Ident(_))) && matches!(self.at(2).map(|t| &t.kind), Some(TokenKind::Colon))
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let loc = self.loc();
        match self.cur().kind.clone() {
            TokenKind::Int(v) => {
                self.advance();
                Some(Expr::Int(v, loc))
            }
            TokenKind::Float(v) => {
                self.advance();
                Some(Expr::Float(v, loc))
            }
            TokenKind::Bool(v) => {
                self.advance();
                Some(Expr::Bool(v, loc))
            }
            TokenKind::Null => {
                self.advance();
                Some(Expr::Null(loc))
            }
            TokenKind::Str(s) => {
                self.advance();
                Some(Expr::Str(s, loc))
            }
            TokenKind::RawStr(s) => {
                self.advance();
                Some(Expr::Str(s, loc))
            }
            TokenKind::InterpText(_) => self.parse_interpolation(),
            TokenKind::Builtin(name) => {
                self.advance();
                self.expect(&TokenKind::LParen, "'('")?;
                let mut args = Vec::new();
                if !self.check(&TokenKind::RParen) {
                    loop {
                        args.push(self.parse_builtin_arg()?);
                        if !self.match_kind(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&TokenKind::RParen, "')'")?;
                Some(Expr::Call { callee: Box::new(Expr::Ident(format!("@{name}"), loc.clone())), args, loc })
            }
            TokenKind::Keyword(Keyword::Error) => {
                self.advance();
                self.expect(&TokenKind::Dot, "'.'")?;
                let name = self.expect_ident("an error variant name")?;
                Some(Expr::ErrorLit(name, loc))
            }
            TokenKind::Keyword(Keyword::Match) => self.parse_match(),
            TokenKind::Ident(name) => {
                self.advance();
                if self.allow_struct_init && self.check(&TokenKind::LBrace) && self.looks_like_struct_init() {
                    return self.parse_struct_init(name, loc);
                }
                Some(Expr::Ident(name, loc))
            }
            TokenKind::LBracket => {
                self.advance();
                let mut elements = Vec::new();
                if !self.check(&TokenKind::RBracket) {
                    loop {
                        elements.push(self.parse_expr()?);
                        if !self.match_kind(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&TokenKind::RBracket, "']'")?;
                Some(Expr::ArrayLit { elements, loc })
            }
            TokenKind::LParen => {
                self.advance();
                if self.match_kind(&TokenKind::RParen) {
                    return Some(Expr::TupleLit { elements: Vec::new(), loc });
                }
                let first = self.parse_expr()?;
                if self.match_kind(&TokenKind::Comma) {
                    let mut elements = vec![first];
                    if !self.check(&TokenKind::RParen) {
                        loop {
                            elements.push(self.parse_expr()?);
                            if !self.match_kind(&TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(&TokenKind::RParen, "')'")?;
                    return Some(Expr::TupleLit { elements, loc });
                }
                self.expect(&TokenKind::RParen, "')'")?;
                Some(first)
            }
            other => {
                self.error(format!("unexpected token {other:?} in expression"));
                None
            }
        }
    }

    /// Builtin arguments may be either an expression or a bare type name
    /// (`@sizeof(T)`); bare identifiers parse the same way in both roles,
    /// so this is just `parse_expr` with struct-init suppressed (a type
    /// name is never followed by a struct literal in argument position).
    fn parse_builtin_arg(&mut self) -> PResult<Expr> {
        self.parse_expr_no_struct_init()
    }

    fn parse_struct_init(&mut self, type_name: String, loc: Loc) -> PResult<Expr> {
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut field_names = Vec::new();
        let mut field_values = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_eof() {
            let fname = self.expect_ident("a field name")?;
            self.expect(&TokenKind::Colon, "':'")?;
            let fvalue = self.parse_expr()?;
            field_names.push(fname);
            field_values.push(fvalue);
            if !self.match_kind(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace, "'}'")?;
        Some(Expr::StructInit { type_name, field_names, field_values, loc })
    }

    fn parse_match(&mut self) -> PResult<Expr> {
        let loc = self.loc();
        self.expect_kw(Keyword::Match, "'match'")?;
        let scrutinee = Box::new(self.parse_expr_no_struct_init()?);
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut arms = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_eof() {
            let aloc = self.loc();
            let pattern = self.parse_pattern()?;
            self.expect(&TokenKind::FatArrow, "'=>'")?;
            let body = self.parse_expr()?;
            arms.push(MatchArm { pattern, body, loc: aloc });
            if !self.match_kind(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace, "'}'")?;
        Some(Expr::Match { scrutinee, arms, loc })
    }

    fn parse_pattern(&mut self) -> PResult<Pattern> {
        if self.check_kw(Keyword::Else) {
            self.advance();
            return Some(Pattern::Else);
        }
        if let TokenKind::Ident(name) = self.cur().kind.clone() {
            if matches!(self.at(1).map(|t| &t.kind), Some(TokenKind::LBrace)) {
                self.advance();
                self.advance();
                let mut fields = Vec::new();
                while !self.check(&TokenKind::RBrace) && !self.at_eof() {
                    let fname = self.expect_ident("a field name")?;
                    let fpat = if self.match_kind(&TokenKind::Colon) { self.parse_pattern()? } else { Pattern::Ident(fname.clone()) };
                    fields.push((fname, fpat));
                    if !self.match_kind(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::RBrace, "'}'")?;
                return Some(Pattern::Struct { type_name: Some(name), fields });
            }
            self.advance();
            return Some(Pattern::Ident(name));
        }
        let e = self.parse_unary()?;
        Some(Pattern::Literal(e))
    }

    /// Consume the `InterpText InterpOpen Expr [InterpSpec] InterpClose
    /// ... InterpEnd` token sequence the lexer produces for one string
    /// literal (spec 4.2 points 3-6) and assemble an `Expr::Interp`.
    fn parse_interpolation(&mut self) -> PResult<Expr> {
        let loc = self.loc();
        let mut text_segments = Vec::new();
        let mut interp_exprs = Vec::new();
        let mut format_specs = Vec::new();
        loop {
            match self.cur().kind.clone() {
                TokenKind::InterpText(s) => {
                    text_segments.push(s);
                    self.advance();
                }
                TokenKind::InterpEnd => {
                    self.advance();
                    break;
                }
                TokenKind::InterpOpen => {
                    self.advance();
                    let e = self.parse_expr()?;
                    interp_exprs.push(e);
                    let spec = if let TokenKind::InterpSpec(text) = self.cur().kind.clone() {
                        let sloc = self.loc();
                        self.advance();
                        Some(parse_format_spec(&text, sloc))
                    } else {
                        None
                    };
                    format_specs.push(spec);
                    self.expect(&TokenKind::InterpClose, "'}' closing interpolation")?;
                }
                other => {
                    self.error(format!("unexpected token {other:?} inside string interpolation"));
                    return None;
                }
            }
        }
        Some(Expr::Interp { text_segments, interp_exprs, format_specs, loc })
    }
}

/// `[flags]? [width]? ('.' precision)? type?` (spec 4.3).
pub fn parse_format_spec(text: &str, loc: Loc) -> FormatSpec {
    let mut chars = text.chars().peekable();
    let mut flags = String::new();
    while matches!(chars.peek(), Some('#') | Some('0') | Some('-') | Some('+') | Some(' ')) {
        flags.push(chars.next().unwrap());
    }
    let mut width_s = String::new();
    while matches!(chars.peek(), Some(c) if c.is_ascii_digit()) {
        width_s.push(chars.next().unwrap());
    }
    let width = if width_s.is_empty() { None } else { width_s.parse().ok() };
    let precision = if chars.peek() == Some(&'.') {
        chars.next();
        let mut p = String::new();
        while matches!(chars.peek(), Some(c) if c.is_ascii_digit()) {
            p.push(chars.next().unwrap());
        }
        p.parse().ok()
    } else {
        None
    };
    let ty = chars.next().filter(|c| c.is_ascii_alphabetic());
    FormatSpec { flags, width, precision, ty, loc }
}
