//! The parser: tokens to the arena AST.
//!
//! Recursive descent for statements with precedence climbing for expressions
//! (in `expr.rs`). The parser also computes the static scope information the
//! machine consumes at scope entry: `var`/function hoisting per function,
//! lexical declarations per block, strictness, and tail-call marks for
//! strict-mode `return` positions.

mod expr;

use ahash::{AHashMap, AHashSet};

use crate::{
    ast::{
        BlockData, BlockScopeInfo, CatchClause, ChunkId, ClassDef, ClassId, CodeStore, DeclKind, Expr, ExprId,
        ForHead, ForInitStmt, FuncBody, FuncDef, ImportDecl, ImportName, ExportName, LexDecl, Pat, PatId,
        ProgramInfo, Stmt, StmtId, SwitchCase,
    },
    error::{CodeLoc, ParseError},
    intern::{FuncId, Interns, PrivateId, StaticStrings, StringId},
    lexer::{Kw, P, Token, TokenKind, lex},
};

type PResult<T> = Result<T, ParseError>;

/// Per-function collection of hoisted declarations.
#[derive(Debug, Default)]
struct FnCollect {
    vars: Vec<StringId>,
}

/// Saved parser context across function boundaries.
struct FnCtx {
    in_async: bool,
    in_generator: bool,
    strict: bool,
    tail_barrier: u32,
    loop_depth: u32,
    switch_depth: u32,
    labels_len: usize,
    in_class_ctor: bool,
}

pub(crate) struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    pub(super) code: &'a mut CodeStore,
    pub(super) interns: &'a mut Interns,
    chunk: ChunkId,
    is_module: bool,
    strict: bool,
    in_async: bool,
    in_generator: bool,
    /// Nesting depth of functions (0 = top level of the chunk).
    fn_depth: u32,
    /// Non-zero while inside constructs where a `return`-position call is not
    /// a proper tail call (try blocks, for-in/of bodies).
    tail_barrier: u32,
    loop_depth: u32,
    switch_depth: u32,
    labels: Vec<StringId>,
    in_class_ctor: bool,
    /// Expressions that were explicitly parenthesized (for the `**` operand
    /// and `??` mixing restrictions).
    pub(super) paren_exprs: AHashSet<ExprId>,
    /// Location of a `{a = b}` cover production awaiting conversion to a
    /// destructuring pattern; an error if it survives to statement level.
    pub(super) pending_cover_init: Option<CodeLoc>,
    /// Private-name scopes of enclosing class bodies.
    private_scopes: Vec<AHashMap<StringId, PrivateId>>,
    fn_stack: Vec<FnCollect>,
    has_tla: bool,
}

/// Parses one chunk (script or module body) into the code store.
pub(crate) fn parse_program(
    source: &str,
    is_module: bool,
    code: &mut CodeStore,
    interns: &mut Interns,
) -> PResult<ProgramInfo> {
    let tokens = lex(source, interns)?;
    let chunk = code.add_chunk(source.to_owned());
    let mut parser = Parser {
        tokens,
        pos: 0,
        code,
        interns,
        chunk,
        is_module,
        strict: is_module,
        in_async: false,
        in_generator: false,
        fn_depth: 0,
        tail_barrier: 0,
        loop_depth: 0,
        switch_depth: 0,
        labels: Vec::new(),
        in_class_ctor: false,
        paren_exprs: AHashSet::new(),
        pending_cover_init: None,
        private_scopes: Vec::new(),
        fn_stack: vec![FnCollect::default()],
        has_tla: false,
    };
    parser.run()
}

impl Parser<'_> {
    fn run(mut self) -> PResult<ProgramInfo> {
        let mut body = Vec::new();
        if self.parse_directives(&mut body)? {
            self.strict = true;
        }
        while !self.at_eof() {
            body.push(self.parse_stmt()?);
        }
        let fn_decls = self.top_level_fn_decls(&body);
        let scope = self.build_block_scope(&body);
        let collect = self.fn_stack.pop().expect("program collector");
        Ok(ProgramInfo {
            chunk: self.chunk,
            body,
            is_module: self.is_module,
            strict: self.strict,
            var_names: dedup(collect.vars),
            fn_decls,
            lex: scope.lex,
            has_tla: self.has_tla,
        })
    }

    // === token access ===

    pub(super) fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    pub(super) fn peek_at(&self, n: usize) -> &Token {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    pub(super) fn kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    pub(super) fn loc(&self) -> CodeLoc {
        CodeLoc {
            line: self.peek().line,
            column: self.peek().col,
        }
    }

    pub(super) fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    pub(super) fn at_eof(&self) -> bool {
        matches!(self.kind(), TokenKind::Eof)
    }

    pub(super) fn err(&self, message: impl Into<String>) -> ParseError {
        let t = self.peek();
        ParseError::new(message, t.line, t.col)
    }

    pub(super) fn unexpected(&self) -> ParseError {
        self.err(format!("unexpected token {}", describe(&self.peek().kind)))
    }

    pub(super) fn is(&self, p: P) -> bool {
        matches!(self.kind(), TokenKind::Punct(q) if *q == p)
    }

    pub(super) fn is_kw(&self, kw: Kw) -> bool {
        matches!(self.kind(), TokenKind::Kw(k) if *k == kw)
    }

    pub(super) fn eat(&mut self, p: P) -> bool {
        if self.is(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(super) fn eat_kw(&mut self, kw: Kw) -> bool {
        if self.is_kw(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(super) fn expect(&mut self, p: P) -> PResult<()> {
        if self.eat(p) {
            Ok(())
        } else {
            Err(self.err(format!("expected {} but found {}", describe_punct(p), describe(&self.peek().kind))))
        }
    }

    pub(super) fn expect_kw(&mut self, kw: Kw) -> PResult<()> {
        if self.eat_kw(kw) {
            Ok(())
        } else {
            Err(self.err(format!("expected '{}'", <&'static str>::from(kw))))
        }
    }

    /// True when the current token is the identifier with the given content.
    pub(super) fn is_ident(&self, name: StaticStrings) -> bool {
        matches!(self.kind(), TokenKind::Ident(id) if *id == name.id())
    }

    pub(super) fn eat_ident(&mut self, name: StaticStrings) -> bool {
        if self.is_ident(name) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consumes an identifier (allowing `yield`/`await` where the context
    /// permits them as names).
    pub(super) fn expect_ident_name(&mut self) -> PResult<StringId> {
        match self.kind().clone() {
            TokenKind::Ident(id) => {
                self.advance();
                Ok(id)
            }
            TokenKind::Kw(Kw::Yield) if !self.in_generator && !self.strict => {
                self.advance();
                Ok(self.interns.intern("yield"))
            }
            TokenKind::Kw(Kw::Await) if !self.in_async && !self.is_module => {
                self.advance();
                Ok(self.interns.intern("await"))
            }
            TokenKind::Kw(Kw::Let) if !self.strict => {
                self.advance();
                Ok(self.interns.intern("let"))
            }
            _ => Err(self.err(format!("expected identifier but found {}", describe(&self.peek().kind)))),
        }
    }

    /// Any identifier-like token usable as a property name (keywords allowed).
    pub(super) fn prop_name_token(&mut self) -> Option<StringId> {
        match self.kind().clone() {
            TokenKind::Ident(id) => {
                self.advance();
                Some(id)
            }
            TokenKind::Kw(kw) => {
                self.advance();
                Some(self.interns.intern(<&'static str>::from(kw)))
            }
            _ => None,
        }
    }

    /// Automatic semicolon insertion: a real `;`, or a `}`/EOF, or a line
    /// terminator before the offending token.
    pub(super) fn expect_semi(&mut self) -> PResult<()> {
        if self.eat(P::Semi) {
            return Ok(());
        }
        if self.is(P::RBrace) || self.at_eof() || self.peek().newline_before {
            return Ok(());
        }
        Err(self.err(format!("expected ';' but found {}", describe(&self.peek().kind))))
    }

    fn check_cover_init(&mut self) -> PResult<()> {
        if let Some(loc) = self.pending_cover_init.take() {
            return Err(ParseError::new("invalid shorthand property initializer", loc.line, loc.column));
        }
        Ok(())
    }

    // === context ===

    fn save_fn_ctx(&mut self, is_async: bool, is_generator: bool, is_class_ctor: bool) -> FnCtx {
        let saved = FnCtx {
            in_async: self.in_async,
            in_generator: self.in_generator,
            strict: self.strict,
            tail_barrier: self.tail_barrier,
            loop_depth: self.loop_depth,
            switch_depth: self.switch_depth,
            labels_len: self.labels.len(),
            in_class_ctor: self.in_class_ctor,
        };
        self.in_async = is_async;
        self.in_generator = is_generator;
        self.tail_barrier = 0;
        self.loop_depth = 0;
        self.switch_depth = 0;
        self.in_class_ctor = is_class_ctor;
        saved
    }

    fn restore_fn_ctx(&mut self, saved: FnCtx) {
        self.in_async = saved.in_async;
        self.in_generator = saved.in_generator;
        self.strict = saved.strict;
        self.tail_barrier = saved.tail_barrier;
        self.loop_depth = saved.loop_depth;
        self.switch_depth = saved.switch_depth;
        self.labels.truncate(saved.labels_len);
        self.in_class_ctor = saved.in_class_ctor;
    }

    pub(super) fn in_async_ctx(&self) -> bool {
        self.in_async || (self.is_module && self.fn_depth == 0)
    }

    pub(super) fn in_generator_ctx(&self) -> bool {
        self.in_generator
    }

    pub(super) fn is_strict(&self) -> bool {
        self.strict
    }

    pub(super) fn note_tla(&mut self) {
        if self.fn_depth == 0 {
            self.has_tla = true;
        }
    }

    pub(super) fn chunk_id(&self) -> ChunkId {
        self.chunk
    }

    /// End byte of the most recently consumed token.
    pub(super) fn prev_end_byte(&self) -> u32 {
        self.tokens[self.pos.saturating_sub(1)].end_byte
    }

    pub(super) fn in_async_raw(&self) -> bool {
        self.in_async
    }

    pub(super) fn set_async_generator(&mut self, is_async: bool, is_generator: bool) {
        self.in_async = is_async;
        self.in_generator = is_generator;
    }

    /// Parses an arrow function's `{ ... }` body; parameters were parsed by
    /// the caller during arrow lookahead.
    pub(super) fn parse_arrow_block_inner(
        &mut self,
        params: Vec<PatId>,
        rest: Option<PatId>,
        simple: bool,
        is_async: bool,
        start_byte: u32,
        loc: CodeLoc,
    ) -> PResult<FuncId> {
        let saved = self.save_fn_ctx(is_async, false, false);
        self.fn_depth += 1;
        self.fn_stack.push(FnCollect::default());
        let result = (|| {
            self.expect(P::LBrace)?;
            let mut body = Vec::new();
            if self.parse_directives(&mut body)? {
                self.strict = true;
            }
            while !self.is(P::RBrace) {
                if self.at_eof() {
                    return Err(self.err("unexpected end of input in function body"));
                }
                body.push(self.parse_stmt()?);
            }
            let end_tok = self.advance();
            Ok((body, end_tok.end_byte, self.strict))
        })();
        self.fn_depth -= 1;
        let collect = self.fn_stack.pop().expect("arrow collector");
        self.restore_fn_ctx(saved);
        let (body, end, strict) = result?;
        let fn_decls = self.top_level_fn_decls(&body);
        let scope = self.build_block_scope(&body);
        Ok(self.code.add_func(FuncDef {
            name: None,
            params,
            rest,
            body: FuncBody::Block(body),
            is_async,
            is_generator: false,
            is_arrow: true,
            is_strict: strict,
            simple_params: simple,
            var_names: dedup(collect.vars),
            fn_decls,
            lex: scope.lex,
            chunk: self.chunk,
            span: (start_byte, end),
            loc,
        }))
    }

    pub(super) fn resolve_private(&self, name: StringId) -> Option<PrivateId> {
        self.private_scopes.iter().rev().find_map(|scope| scope.get(&name).copied())
    }

    /// Registers a `var` name with the enclosing function.
    pub(super) fn declare_var(&mut self, name: StringId) {
        self.fn_stack.last_mut().expect("function collector").vars.push(name);
    }

    // === directives ===

    /// Parses leading string-literal directive statements; returns whether a
    /// `"use strict"` directive was seen.
    fn parse_directives(&mut self, out: &mut Vec<StmtId>) -> PResult<bool> {
        let mut strict = false;
        loop {
            let TokenKind::Str(id) = *self.kind() else { break };
            let next = &self.peek_at(1);
            let ends = matches!(next.kind, TokenKind::Punct(P::Semi) | TokenKind::Punct(P::RBrace) | TokenKind::Eof)
                || next.newline_before;
            if !ends {
                break;
            }
            if self.interns.str(id) == "use strict" {
                strict = true;
            }
            let loc = self.loc();
            self.advance();
            self.eat(P::Semi);
            let expr = self.code.add_expr(Expr::Str(id));
            out.push(self.code.add_stmt(Stmt::Expr(expr), loc));
        }
        Ok(strict)
    }

    // === statements ===

    pub(super) fn parse_stmt(&mut self) -> PResult<StmtId> {
        let loc = self.loc();
        match self.kind().clone() {
            TokenKind::Punct(P::LBrace) => self.parse_block(),
            TokenKind::Punct(P::Semi) => {
                self.advance();
                Ok(self.code.add_stmt(Stmt::Empty, loc))
            }
            TokenKind::Kw(Kw::Var) => self.parse_var_stmt(DeclKind::Var),
            TokenKind::Kw(Kw::Let) => self.parse_var_stmt(DeclKind::Let),
            TokenKind::Kw(Kw::Const) => self.parse_var_stmt(DeclKind::Const),
            TokenKind::Kw(Kw::Function) => self.parse_func_decl(false),
            TokenKind::Kw(Kw::Class) => self.parse_class_decl(),
            TokenKind::Kw(Kw::If) => self.parse_if(),
            TokenKind::Kw(Kw::While) => self.parse_while(),
            TokenKind::Kw(Kw::Do) => self.parse_do_while(),
            TokenKind::Kw(Kw::For) => self.parse_for(),
            TokenKind::Kw(Kw::Switch) => self.parse_switch(),
            TokenKind::Kw(Kw::Try) => self.parse_try(),
            TokenKind::Kw(Kw::Throw) => self.parse_throw(),
            TokenKind::Kw(Kw::Return) => self.parse_return(),
            TokenKind::Kw(Kw::Break) => self.parse_break_continue(true),
            TokenKind::Kw(Kw::Continue) => self.parse_break_continue(false),
            TokenKind::Kw(Kw::Debugger) => {
                self.advance();
                self.expect_semi()?;
                Ok(self.code.add_stmt(Stmt::Debugger, loc))
            }
            TokenKind::Kw(Kw::With) => Err(self.err("'with' statements are not supported")),
            TokenKind::Kw(Kw::Import)
                if !matches!(self.peek_at(1).kind, TokenKind::Punct(P::LParen | P::Dot)) =>
            {
                self.parse_import_decl()
            }
            TokenKind::Kw(Kw::Export) => self.parse_export_decl(),
            TokenKind::Ident(id) if matches!(self.peek_at(1).kind, TokenKind::Punct(P::Colon)) => {
                self.advance();
                self.advance();
                self.labels.push(id);
                let body = self.parse_stmt()?;
                self.labels.pop();
                Ok(self.code.add_stmt(Stmt::Labeled { label: id, body }, loc))
            }
            TokenKind::Ident(id)
                if id == StaticStrings::Async.id()
                    && matches!(self.peek_at(1).kind, TokenKind::Kw(Kw::Function))
                    && !self.peek_at(1).newline_before =>
            {
                self.advance();
                self.parse_func_decl(true)
            }
            _ => {
                let expr = self.parse_expr()?;
                self.check_cover_init()?;
                self.expect_semi()?;
                Ok(self.code.add_stmt(Stmt::Expr(expr), loc))
            }
        }
    }

    fn parse_block(&mut self) -> PResult<StmtId> {
        let loc = self.loc();
        self.expect(P::LBrace)?;
        let mut stmts = Vec::new();
        while !self.is(P::RBrace) {
            if self.at_eof() {
                return Err(self.err("unexpected end of input, expected '}'"));
            }
            stmts.push(self.parse_stmt()?);
        }
        self.expect(P::RBrace)?;
        let scope = self.build_block_scope(&stmts);
        Ok(self.code.add_stmt(Stmt::Block(Box::new(BlockData { stmts, scope })), loc))
    }

    /// Computes a block's lexical scope info by scanning its parsed
    /// statements: `let`/`const`/`class` names plus block-level function
    /// declarations.
    fn build_block_scope(&self, stmts: &[StmtId]) -> BlockScopeInfo {
        let mut info = BlockScopeInfo::default();
        for &id in stmts {
            self.scope_entry(id, &mut info);
        }
        info
    }

    fn scope_entry(&self, id: StmtId, info: &mut BlockScopeInfo) {
        match self.code.stmt(id) {
            Stmt::VarDecl { kind: DeclKind::Let, decls } => {
                for (pat, _) in decls {
                    collect_pat_names(self.code, *pat, false, &mut info.lex);
                }
            }
            Stmt::VarDecl { kind: DeclKind::Const, decls } => {
                for (pat, _) in decls {
                    collect_pat_names(self.code, *pat, true, &mut info.lex);
                }
            }
            Stmt::Class { name, .. } => info.lex.push(LexDecl { name: *name, is_const: false }),
            Stmt::Func { name, func } => info.funcs.push((*name, *func)),
            Stmt::ExportDecl(inner) => self.scope_entry(*inner, info),
            _ => {}
        }
    }

    /// Function declarations at the top level of a statement list (hoisted
    /// to the function/program entry).
    fn top_level_fn_decls(&self, stmts: &[StmtId]) -> Vec<(StringId, FuncId)> {
        let mut out = Vec::new();
        for &id in stmts {
            match self.code.stmt(id) {
                Stmt::Func { name, func } => out.push((*name, *func)),
                Stmt::ExportDecl(inner) => {
                    if let Stmt::Func { name, func } = self.code.stmt(*inner) {
                        out.push((*name, *func));
                    }
                }
                _ => {}
            }
        }
        out
    }

    fn parse_var_stmt(&mut self, kind: DeclKind) -> PResult<StmtId> {
        let loc = self.loc();
        self.advance();
        let decls = self.parse_var_declarators(kind)?;
        self.expect_semi()?;
        Ok(self.code.add_stmt(Stmt::VarDecl { kind, decls }, loc))
    }

    fn parse_var_declarators(&mut self, kind: DeclKind) -> PResult<Vec<(PatId, Option<ExprId>)>> {
        let mut decls = Vec::new();
        loop {
            let pat = self.parse_binding_pattern()?;
            if kind == DeclKind::Var {
                let mut names = Vec::new();
                collect_pat_names(self.code, pat, false, &mut names);
                for decl in names {
                    self.declare_var(decl.name);
                }
            }
            let init = if self.eat(P::Assign) {
                Some(self.parse_assign()?)
            } else {
                if kind == DeclKind::Const {
                    return Err(self.err("missing initializer in const declaration"));
                }
                if !matches!(self.code.pat(pat), Pat::Ident(_)) {
                    return Err(self.err("missing initializer in destructuring declaration"));
                }
                None
            };
            decls.push((pat, init));
            if !self.eat(P::Comma) {
                break;
            }
        }
        Ok(decls)
    }

    fn parse_func_decl(&mut self, is_async: bool) -> PResult<StmtId> {
        let loc = self.loc();
        let start = self.peek().byte;
        self.expect_kw(Kw::Function)?;
        let is_generator = self.eat(P::Star);
        let name = self.expect_ident_name()?;
        if !self.strict {
            // sloppy-mode function declarations also create a var binding on
            // the enclosing function (annex B block-function semantics)
            self.declare_var(name);
        }
        let func = self.parse_function_rest(Some(name), is_async, is_generator, false, start, loc)?;
        Ok(self.code.add_stmt(Stmt::Func { name, func }, loc))
    }

    /// Parses parameter list + body after the name position.
    pub(super) fn parse_function_rest(
        &mut self,
        name: Option<StringId>,
        is_async: bool,
        is_generator: bool,
        is_class_ctor: bool,
        start_byte: u32,
        loc: CodeLoc,
    ) -> PResult<FuncId> {
        let saved = self.save_fn_ctx(is_async, is_generator, is_class_ctor);
        self.fn_depth += 1;
        self.fn_stack.push(FnCollect::default());
        let result = self.parse_params_and_body(name, is_async, is_generator, start_byte, loc);
        self.fn_depth -= 1;
        let collect = self.fn_stack.pop().expect("function collector");
        self.restore_fn_ctx(saved);
        let func = result?;
        self.code.funcs[func.index()].var_names = dedup(collect.vars);
        Ok(func)
    }

    fn parse_params_and_body(
        &mut self,
        name: Option<StringId>,
        is_async: bool,
        is_generator: bool,
        start_byte: u32,
        loc: CodeLoc,
    ) -> PResult<FuncId> {
        self.expect(P::LParen)?;
        let (params, rest, simple) = self.parse_params()?;
        self.expect(P::LBrace)?;
        let mut body = Vec::new();
        if self.parse_directives(&mut body)? {
            self.strict = true;
        }
        while !self.is(P::RBrace) {
            if self.at_eof() {
                return Err(self.err("unexpected end of input in function body"));
            }
            body.push(self.parse_stmt()?);
        }
        let end_tok = self.advance(); // }
        let fn_decls = self.top_level_fn_decls(&body);
        let scope = self.build_block_scope(&body);
        Ok(self.code.add_func(FuncDef {
            name,
            params,
            rest,
            body: FuncBody::Block(body),
            is_async,
            is_generator,
            is_arrow: false,
            is_strict: self.strict,
            simple_params: simple,
            var_names: Vec::new(), // filled by caller from the collector
            fn_decls,
            lex: scope.lex,
            chunk: self.chunk,
            span: (start_byte, end_tok.end_byte),
            loc,
        }))
    }

    /// Parses a parenthesized parameter list (after `(`, consumes `)`).
    pub(super) fn parse_params(&mut self) -> PResult<(Vec<PatId>, Option<PatId>, bool)> {
        let mut params = Vec::new();
        let mut rest = None;
        let mut simple = true;
        while !self.is(P::RParen) {
            if self.eat(P::DotDotDot) {
                simple = false;
                rest = Some(self.parse_binding_pattern()?);
                break;
            }
            let mut pat = self.parse_binding_pattern()?;
            if !matches!(self.code.pat(pat), Pat::Ident(_)) {
                simple = false;
            }
            if self.eat(P::Assign) {
                simple = false;
                let init = self.parse_assign()?;
                pat = self.code.add_pat(Pat::Default { pat, init });
            }
            params.push(pat);
            if !self.eat(P::Comma) {
                break;
            }
        }
        self.expect(P::RParen)?;
        Ok((params, rest, simple))
    }

    fn parse_if(&mut self) -> PResult<StmtId> {
        let loc = self.loc();
        self.advance();
        self.expect(P::LParen)?;
        let test = self.parse_expr()?;
        self.expect(P::RParen)?;
        let cons = self.parse_stmt()?;
        let alt = if self.eat_kw(Kw::Else) { Some(self.parse_stmt()?) } else { None };
        Ok(self.code.add_stmt(Stmt::If { test, cons, alt }, loc))
    }

    fn parse_loop_body(&mut self) -> PResult<StmtId> {
        self.loop_depth += 1;
        let body = self.parse_stmt();
        self.loop_depth -= 1;
        body
    }

    fn parse_while(&mut self) -> PResult<StmtId> {
        let loc = self.loc();
        self.advance();
        self.expect(P::LParen)?;
        let test = self.parse_expr()?;
        self.expect(P::RParen)?;
        let body = self.parse_loop_body()?;
        Ok(self.code.add_stmt(Stmt::While { test, body }, loc))
    }

    fn parse_do_while(&mut self) -> PResult<StmtId> {
        let loc = self.loc();
        self.advance();
        let body = self.parse_loop_body()?;
        self.expect_kw(Kw::While)?;
        self.expect(P::LParen)?;
        let test = self.parse_expr()?;
        self.expect(P::RParen)?;
        // the semicolon after do/while is always optional
        self.eat(P::Semi);
        Ok(self.code.add_stmt(Stmt::DoWhile { body, test }, loc))
    }

    fn parse_for(&mut self) -> PResult<StmtId> {
        let loc = self.loc();
        self.advance();
        let is_await = self.eat_kw(Kw::Await);
        if is_await && !self.in_async_ctx() {
            return Err(self.err("'for await' is only allowed in async contexts"));
        }
        if is_await {
            self.note_tla();
        }
        self.expect(P::LParen)?;

        // empty init
        if self.eat(P::Semi) {
            if is_await {
                return Err(self.err("'for await' requires a for-of loop"));
            }
            return self.parse_classic_for(None, loc);
        }

        if let TokenKind::Kw(kw @ (Kw::Var | Kw::Let | Kw::Const)) = *self.kind() {
            let kind = match kw {
                Kw::Var => DeclKind::Var,
                Kw::Let => DeclKind::Let,
                _ => DeclKind::Const,
            };
            self.advance();
            let pat = self.parse_binding_pattern()?;
            if kind == DeclKind::Var {
                let mut names = Vec::new();
                collect_pat_names(self.code, pat, false, &mut names);
                for decl in names {
                    self.declare_var(decl.name);
                }
            }
            if self.eat_kw(Kw::In) {
                let object = self.parse_expr()?;
                self.expect(P::RParen)?;
                return self.finish_for_each(ForHead::Decl { kind, pat }, object, kind, pat, loc, ForEach::In);
            }
            if self.eat_ident(StaticStrings::Of) {
                let iterable = self.parse_assign()?;
                self.expect(P::RParen)?;
                let each = if is_await { ForEach::OfAwait } else { ForEach::Of };
                return self.finish_for_each(ForHead::Decl { kind, pat }, iterable, kind, pat, loc, each);
            }
            if is_await {
                return Err(self.err("'for await' requires a for-of loop"));
            }
            // classic for with declarations
            let mut decls = Vec::new();
            let init = if self.eat(P::Assign) { Some(self.parse_assign()?) } else { None };
            if init.is_none() && (kind == DeclKind::Const || !matches!(self.code.pat(pat), Pat::Ident(_))) {
                return Err(self.err("missing initializer in for-loop declaration"));
            }
            decls.push((pat, init));
            while self.eat(P::Comma) {
                let pat = self.parse_binding_pattern()?;
                if kind == DeclKind::Var {
                    let mut names = Vec::new();
                    collect_pat_names(self.code, pat, false, &mut names);
                    for decl in names {
                        self.declare_var(decl.name);
                    }
                }
                let init = if self.eat(P::Assign) { Some(self.parse_assign()?) } else { None };
                decls.push((pat, init));
            }
            self.expect(P::Semi)?;
            return self.parse_classic_for(Some(ForInitStmt::Decl { kind, decls }), loc);
        }

        // expression head
        let expr = self.parse_expr_no_in()?;
        if self.eat_kw(Kw::In) {
            let pat = self.expr_to_pattern(expr)?;
            let object = self.parse_expr()?;
            self.expect(P::RParen)?;
            return self.finish_for_each_pat(ForHead::Pat(pat), object, loc, ForEach::In);
        }
        if self.eat_ident(StaticStrings::Of) {
            let pat = self.expr_to_pattern(expr)?;
            let iterable = self.parse_assign()?;
            self.expect(P::RParen)?;
            let each = if is_await { ForEach::OfAwait } else { ForEach::Of };
            return self.finish_for_each_pat(ForHead::Pat(pat), iterable, loc, each);
        }
        if is_await {
            return Err(self.err("'for await' requires a for-of loop"));
        }
        self.check_cover_init()?;
        self.expect(P::Semi)?;
        self.parse_classic_for(Some(ForInitStmt::Expr(expr)), loc)
    }

    fn parse_classic_for(&mut self, init: Option<ForInitStmt>, loc: CodeLoc) -> PResult<StmtId> {
        let test = if self.is(P::Semi) { None } else { Some(self.parse_expr()?) };
        self.expect(P::Semi)?;
        let update = if self.is(P::RParen) { None } else { Some(self.parse_expr()?) };
        self.expect(P::RParen)?;
        let body = self.parse_loop_body()?;
        let mut scope = Vec::new();
        if let Some(ForInitStmt::Decl { kind: kind @ (DeclKind::Let | DeclKind::Const), decls }) = &init {
            let is_const = *kind == DeclKind::Const;
            for (pat, _) in decls {
                collect_pat_names(self.code, *pat, is_const, &mut scope);
            }
        }
        Ok(self.code.add_stmt(Stmt::For { init, test, update, body, scope }, loc))
    }

    fn finish_for_each(
        &mut self,
        head: ForHead,
        object: ExprId,
        kind: DeclKind,
        pat: PatId,
        loc: CodeLoc,
        each: ForEach,
    ) -> PResult<StmtId> {
        let mut scope = Vec::new();
        if kind != DeclKind::Var {
            collect_pat_names(self.code, pat, kind == DeclKind::Const, &mut scope);
        }
        self.tail_barrier += 1;
        let body = self.parse_loop_body();
        self.tail_barrier -= 1;
        let body = body?;
        Ok(self.code.add_stmt(
            match each {
                ForEach::In => Stmt::ForIn { head, object, body, scope },
                ForEach::Of => Stmt::ForOf { head, iterable: object, body, scope, is_await: false },
                ForEach::OfAwait => Stmt::ForOf { head, iterable: object, body, scope, is_await: true },
            },
            loc,
        ))
    }

    fn finish_for_each_pat(&mut self, head: ForHead, object: ExprId, loc: CodeLoc, each: ForEach) -> PResult<StmtId> {
        self.tail_barrier += 1;
        let body = self.parse_loop_body();
        self.tail_barrier -= 1;
        let body = body?;
        Ok(self.code.add_stmt(
            match each {
                ForEach::In => Stmt::ForIn { head, object, body, scope: Vec::new() },
                ForEach::Of => Stmt::ForOf { head, iterable: object, body, scope: Vec::new(), is_await: false },
                ForEach::OfAwait => Stmt::ForOf { head, iterable: object, body, scope: Vec::new(), is_await: true },
            },
            loc,
        ))
    }

    fn parse_switch(&mut self) -> PResult<StmtId> {
        let loc = self.loc();
        self.advance();
        self.expect(P::LParen)?;
        let disc = self.parse_expr()?;
        self.expect(P::RParen)?;
        self.expect(P::LBrace)?;
        self.switch_depth += 1;
        let mut cases = Vec::new();
        let mut seen_default = false;
        let mut all_stmts = Vec::new();
        while !self.is(P::RBrace) {
            let test = if self.eat_kw(Kw::Case) {
                let t = self.parse_expr()?;
                Some(t)
            } else if self.eat_kw(Kw::Default) {
                if seen_default {
                    self.switch_depth -= 1;
                    return Err(self.err("more than one default clause in switch statement"));
                }
                seen_default = true;
                None
            } else {
                self.switch_depth -= 1;
                return Err(self.unexpected());
            };
            self.expect(P::Colon)?;
            let mut body = Vec::new();
            while !self.is(P::RBrace) && !self.is_kw(Kw::Case) && !self.is_kw(Kw::Default) {
                let stmt = match self.parse_stmt() {
                    Ok(s) => s,
                    Err(e) => {
                        self.switch_depth -= 1;
                        return Err(e);
                    }
                };
                body.push(stmt);
                all_stmts.push(stmt);
            }
            cases.push(SwitchCase { test, body });
        }
        self.switch_depth -= 1;
        self.expect(P::RBrace)?;
        let scope = self.build_block_scope(&all_stmts);
        Ok(self.code.add_stmt(Stmt::Switch { disc, cases, scope }, loc))
    }

    fn parse_try(&mut self) -> PResult<StmtId> {
        let loc = self.loc();
        self.advance();
        self.tail_barrier += 1;
        let result = (|| {
            let block = self.parse_block()?;
            let catch = if self.eat_kw(Kw::Catch) {
                let param = if self.eat(P::LParen) {
                    let p = self.parse_binding_pattern()?;
                    self.expect(P::RParen)?;
                    Some(p)
                } else {
                    None
                };
                let body = self.parse_block()?;
                Some(CatchClause { param, body })
            } else {
                None
            };
            let finally = if self.eat_kw(Kw::Finally) { Some(self.parse_block()?) } else { None };
            if catch.is_none() && finally.is_none() {
                return Err(self.err("missing catch or finally after try"));
            }
            Ok((block, catch, finally))
        })();
        self.tail_barrier -= 1;
        let (block, catch, finally) = result?;
        Ok(self.code.add_stmt(Stmt::Try { block, catch, finally }, loc))
    }

    fn parse_throw(&mut self) -> PResult<StmtId> {
        let loc = self.loc();
        self.advance();
        if self.peek().newline_before {
            return Err(self.err("illegal newline after throw"));
        }
        let expr = self.parse_expr()?;
        self.expect_semi()?;
        Ok(self.code.add_stmt(Stmt::Throw(expr), loc))
    }

    fn parse_return(&mut self) -> PResult<StmtId> {
        let loc = self.loc();
        if self.fn_depth == 0 {
            return Err(self.err("'return' outside of function"));
        }
        self.advance();
        let arg = if self.is(P::Semi) || self.is(P::RBrace) || self.at_eof() || self.peek().newline_before {
            None
        } else {
            let e = self.parse_expr()?;
            if self.strict && self.tail_barrier == 0 {
                self.mark_tail_calls(e);
            }
            Some(e)
        };
        self.expect_semi()?;
        Ok(self.code.add_stmt(Stmt::Return(arg), loc))
    }

    /// Marks calls in tail position of `expr` for frame-reuse execution.
    pub(super) fn mark_tail_calls(&mut self, expr: ExprId) {
        match self.code.expr(expr) {
            Expr::Call { optional: false, .. } => {
                if let Expr::Call { tail, .. } = &mut self.code.exprs[expr.index()] {
                    *tail = true;
                }
            }
            Expr::Cond { cons, alt, .. } => {
                let (cons, alt) = (*cons, *alt);
                self.mark_tail_calls(cons);
                self.mark_tail_calls(alt);
            }
            Expr::Logical { right, .. } => {
                let right = *right;
                self.mark_tail_calls(right);
            }
            Expr::Seq(exprs) => {
                if let Some(&last) = exprs.last() {
                    self.mark_tail_calls(last);
                }
            }
            _ => {}
        }
    }

    fn parse_break_continue(&mut self, is_break: bool) -> PResult<StmtId> {
        let loc = self.loc();
        self.advance();
        let label = match *self.kind() {
            TokenKind::Ident(id) if !self.peek().newline_before => {
                if !self.labels.contains(&id) {
                    return Err(self.err(format!("undefined label '{}'", self.interns.str(id))));
                }
                self.advance();
                Some(id)
            }
            _ => None,
        };
        if label.is_none() {
            if is_break && self.loop_depth == 0 && self.switch_depth == 0 {
                return Err(self.err("illegal break statement"));
            }
            if !is_break && self.loop_depth == 0 {
                return Err(self.err("illegal continue statement"));
            }
        }
        self.expect_semi()?;
        Ok(self
            .code
            .add_stmt(if is_break { Stmt::Break(label) } else { Stmt::Continue(label) }, loc))
    }

    // === classes ===

    fn parse_class_decl(&mut self) -> PResult<StmtId> {
        let loc = self.loc();
        let class = self.parse_class()?;
        let Some(name) = self.code.class(class).name else {
            return Err(self.err("class declarations require a name"));
        };
        Ok(self.code.add_stmt(Stmt::Class { name, class }, loc))
    }

    /// Parses `class ...` (declaration or expression form).
    pub(super) fn parse_class(&mut self) -> PResult<ClassId> {
        self.expect_kw(Kw::Class)?;
        let saved_strict = self.strict;
        self.strict = true;
        let name = match *self.kind() {
            TokenKind::Ident(id) => {
                self.advance();
                Some(id)
            }
            _ => None,
        };
        let parent = if self.eat_kw(Kw::Extends) {
            Some(self.parse_unary_chain()?)
        } else {
            None
        };
        // pre-scan the class body for private names so references resolve
        // lexically even before their declaration
        self.expect(P::LBrace)?;
        let private_names = self.scan_private_names();
        self.private_scopes.push(private_names);
        let result = self.parse_class_body(name, parent);
        self.private_scopes.pop();
        self.strict = saved_strict;
        result
    }

    /// Collects `#name` declarations in the upcoming class body (balanced
    /// brace scan; only member-position names are declared).
    fn scan_private_names(&mut self) -> AHashMap<StringId, PrivateId> {
        let mut map = AHashMap::new();
        let mut depth = 0usize;
        let mut i = self.pos;
        let mut at_member_start = true;
        while i < self.tokens.len() {
            match &self.tokens[i].kind {
                TokenKind::Punct(P::LBrace | P::LParen | P::LBracket) => {
                    depth += 1;
                    at_member_start = false;
                }
                TokenKind::Punct(P::RBrace) if depth == 0 => break,
                TokenKind::Punct(P::RBrace | P::RParen | P::RBracket) => {
                    depth -= 1;
                    at_member_start = depth == 0;
                }
                TokenKind::Punct(P::Semi) if depth == 0 => at_member_start = true,
                TokenKind::PrivateIdent(name) if depth == 0 => {
                    let name = *name;
                    map.entry(name).or_insert_with(|| {
                        self.code.add_private_name(crate::ast::PrivateName { name })
                    });
                    at_member_start = false;
                }
                TokenKind::Ident(id)
                    if depth == 0
                        && at_member_start
                        && (*id == StaticStrings::Get.id() || *id == StaticStrings::Set.id()) =>
                {
                    // get/set modifiers keep us at member-name position
                }
                _ => at_member_start = false,
            }
            i += 1;
        }
        map
    }

    fn parse_class_body(&mut self, name: Option<StringId>, parent: Option<ExprId>) -> PResult<ClassId> {
        use crate::ast::{ClassKey, ClassMember, ClassMemberKind, MethodKind};
        let mut ctor = None;
        let mut members = Vec::new();
        while !self.is(P::RBrace) {
            if self.at_eof() {
                return Err(self.err("unexpected end of input in class body"));
            }
            if self.eat(P::Semi) {
                continue;
            }
            let loc = self.loc();
            let start = self.peek().byte;
            // `static` modifier (but `static` can also be a member name)
            let is_static = self.is_ident(StaticStrings::Static)
                && !matches!(
                    self.peek_at(1).kind,
                    TokenKind::Punct(P::Assign | P::Semi | P::LParen | P::RBrace)
                )
                && {
                    self.advance();
                    true
                };
            // static initialization block
            if is_static && self.is(P::LBrace) {
                let func = self.parse_static_block(start, loc)?;
                members.push(ClassMember {
                    is_static: true,
                    key: ClassKey::Static(StaticStrings::Empty.id()),
                    kind: ClassMemberKind::StaticBlock { func },
                });
                continue;
            }
            let mut is_async = false;
            let mut is_generator = false;
            let mut accessor = None;
            if self.is_ident(StaticStrings::Async)
                && !self.peek_at(1).newline_before
                && !matches!(self.peek_at(1).kind, TokenKind::Punct(P::Assign | P::Semi | P::LParen | P::RBrace))
            {
                self.advance();
                is_async = true;
            }
            if self.eat(P::Star) {
                is_generator = true;
            }
            if !is_async
                && !is_generator
                && (self.is_ident(StaticStrings::Get) || self.is_ident(StaticStrings::Set))
                && !matches!(
                    self.peek_at(1).kind,
                    TokenKind::Punct(P::Assign | P::Semi | P::LParen | P::RBrace | P::Eq)
                )
            {
                accessor = Some(if self.is_ident(StaticStrings::Get) { MethodKind::Get } else { MethodKind::Set });
                self.advance();
            }
            let key = self.parse_class_member_key()?;
            if self.is(P::LParen) {
                // method
                let is_ctor = !is_static
                    && accessor.is_none()
                    && matches!(key, ClassKey::Static(id) if self.interns.str(id) == "constructor");
                let func =
                    self.parse_function_rest(class_key_name(&key), is_async, is_generator, is_ctor, start, loc)?;
                if is_ctor {
                    if ctor.is_some() {
                        return Err(self.err("a class may only have one constructor"));
                    }
                    ctor = Some(func);
                } else {
                    members.push(ClassMember {
                        is_static,
                        key,
                        kind: ClassMemberKind::Method {
                            func,
                            kind: accessor.unwrap_or(MethodKind::Method),
                        },
                    });
                }
            } else {
                // field
                let init = if self.eat(P::Assign) {
                    let saved = self.save_fn_ctx(false, false, false);
                    self.fn_depth += 1;
                    self.fn_stack.push(FnCollect::default());
                    let value = self.parse_assign();
                    self.fn_depth -= 1;
                    self.fn_stack.pop();
                    self.restore_fn_ctx(saved);
                    let value = value?;
                    let end = self.tokens[self.pos.saturating_sub(1)].end_byte;
                    Some(self.code.add_func(FuncDef {
                        name: None,
                        params: Vec::new(),
                        rest: None,
                        body: FuncBody::Expr(value),
                        is_async: false,
                        is_generator: false,
                        is_arrow: false,
                        is_strict: true,
                        simple_params: true,
                        var_names: Vec::new(),
                        fn_decls: Vec::new(),
                        lex: Vec::new(),
                        chunk: self.chunk,
                        span: (start, end),
                        loc,
                    }))
                } else {
                    None
                };
                self.expect_semi()?;
                members.push(ClassMember {
                    is_static,
                    key,
                    kind: ClassMemberKind::Field { init },
                });
            }
        }
        self.expect(P::RBrace)?;
        let ctor = match ctor {
            Some(ctor) => Some(ctor),
            None => Some(self.synthesize_default_ctor(name, parent.is_some())),
        };
        Ok(self.code.add_class(ClassDef { name, parent, ctor, members }))
    }

    /// Builds the implicit constructor: empty for base classes,
    /// `constructor(...args) { super(...args); }` for derived ones.
    fn synthesize_default_ctor(&mut self, name: Option<StringId>, derived: bool) -> FuncId {
        let loc = self.loc();
        let end = self.prev_end_byte();
        let (body, rest) = if derived {
            let args_name = self.interns.intern("args");
            let args_pat = self.code.add_pat(crate::ast::Pat::Ident(args_name));
            let args_ident = self.code.add_expr(Expr::Ident(args_name));
            let super_call = self
                .code
                .add_expr(Expr::SuperCall(vec![crate::ast::Arg::Spread(args_ident)]));
            let stmt = self.code.add_stmt(Stmt::Expr(super_call), loc);
            (vec![stmt], Some(args_pat))
        } else {
            (Vec::new(), None)
        };
        self.code.add_func(FuncDef {
            name,
            params: Vec::new(),
            rest,
            body: FuncBody::Block(body),
            is_async: false,
            is_generator: false,
            is_arrow: false,
            is_strict: true,
            simple_params: rest.is_none(),
            var_names: Vec::new(),
            fn_decls: Vec::new(),
            lex: Vec::new(),
            chunk: self.chunk,
            span: (end, end),
            loc,
        })
    }

    fn parse_class_member_key(&mut self) -> PResult<crate::ast::ClassKey> {
        use crate::ast::ClassKey;
        match self.kind().clone() {
            TokenKind::PrivateIdent(name) => {
                self.advance();
                let id = self.resolve_private(name).ok_or_else(|| self.err("undeclared private name"))?;
                Ok(ClassKey::Private(id))
            }
            TokenKind::Str(id) => {
                self.advance();
                Ok(ClassKey::Static(id))
            }
            TokenKind::Num(n) => {
                self.advance();
                let s = crate::types::number::to_js_string(n);
                Ok(ClassKey::Static(self.interns.intern(&s)))
            }
            TokenKind::Punct(P::LBracket) => {
                self.advance();
                let expr = self.parse_assign()?;
                self.expect(P::RBracket)?;
                Ok(ClassKey::Computed(expr))
            }
            _ => {
                let id = self.prop_name_token().ok_or_else(|| self.unexpected())?;
                Ok(ClassKey::Static(id))
            }
        }
    }

    fn parse_static_block(&mut self, start: u32, loc: CodeLoc) -> PResult<FuncId> {
        let saved = self.save_fn_ctx(false, false, false);
        self.fn_depth += 1;
        self.fn_stack.push(FnCollect::default());
        let result = (|| {
            self.expect(P::LBrace)?;
            let mut body = Vec::new();
            while !self.is(P::RBrace) {
                if self.at_eof() {
                    return Err(self.err("unexpected end of input in static block"));
                }
                body.push(self.parse_stmt()?);
            }
            let end_tok = self.advance();
            Ok((body, end_tok.end_byte))
        })();
        self.fn_depth -= 1;
        let collect = self.fn_stack.pop().expect("static block collector");
        self.restore_fn_ctx(saved);
        let (body, end) = result?;
        let fn_decls = self.top_level_fn_decls(&body);
        let scope = self.build_block_scope(&body);
        Ok(self.code.add_func(FuncDef {
            name: None,
            params: Vec::new(),
            rest: None,
            body: FuncBody::Block(body),
            is_async: false,
            is_generator: false,
            is_arrow: false,
            is_strict: true,
            simple_params: true,
            var_names: dedup(collect.vars),
            fn_decls,
            lex: scope.lex,
            chunk: self.chunk,
            span: (start, end),
            loc,
        }))
    }

    // === modules ===

    fn parse_import_decl(&mut self) -> PResult<StmtId> {
        let loc = self.loc();
        if !self.is_module {
            return Err(self.err("import declarations may only appear in modules"));
        }
        self.expect_kw(Kw::Import)?;
        // import "m";
        if let TokenKind::Str(spec) = *self.kind() {
            self.advance();
            self.expect_semi()?;
            return Ok(self.code.add_stmt(
                Stmt::Import(Box::new(ImportDecl {
                    specifier: spec,
                    default: None,
                    namespace: None,
                    named: Vec::new(),
                })),
                loc,
            ));
        }
        let mut default = None;
        let mut namespace = None;
        let mut named = Vec::new();
        if let TokenKind::Ident(id) = *self.kind() {
            self.advance();
            default = Some(id);
            if self.eat(P::Comma) {
                self.parse_import_clause_rest(&mut namespace, &mut named)?;
            }
        } else {
            self.parse_import_clause_rest(&mut namespace, &mut named)?;
        }
        if !self.eat_ident(StaticStrings::From) {
            return Err(self.err("expected 'from'"));
        }
        let TokenKind::Str(spec) = *self.kind() else {
            return Err(self.err("expected module specifier string"));
        };
        self.advance();
        self.expect_semi()?;
        Ok(self.code.add_stmt(
            Stmt::Import(Box::new(ImportDecl {
                specifier: spec,
                default,
                namespace,
                named,
            })),
            loc,
        ))
    }

    fn parse_import_clause_rest(
        &mut self,
        namespace: &mut Option<StringId>,
        named: &mut Vec<ImportName>,
    ) -> PResult<()> {
        if self.eat(P::Star) {
            if !self.eat_ident(StaticStrings::As) {
                return Err(self.err("expected 'as'"));
            }
            *namespace = Some(self.expect_ident_name()?);
            return Ok(());
        }
        self.expect(P::LBrace)?;
        while !self.is(P::RBrace) {
            let imported = match self.kind().clone() {
                TokenKind::Str(id) => {
                    self.advance();
                    id
                }
                _ => self.prop_name_token().ok_or_else(|| self.unexpected())?,
            };
            let local = if self.eat_ident(StaticStrings::As) {
                self.expect_ident_name()?
            } else {
                imported
            };
            named.push(ImportName { imported, local });
            if !self.eat(P::Comma) {
                break;
            }
        }
        self.expect(P::RBrace)?;
        Ok(())
    }

    fn parse_export_decl(&mut self) -> PResult<StmtId> {
        let loc = self.loc();
        if !self.is_module {
            return Err(self.err("export declarations may only appear in modules"));
        }
        self.expect_kw(Kw::Export)?;
        // export default ...
        if self.eat_kw(Kw::Default) {
            let expr = match self.kind().clone() {
                TokenKind::Kw(Kw::Function) => {
                    let start = self.peek().byte;
                    self.advance();
                    let is_generator = self.eat(P::Star);
                    let name = match *self.kind() {
                        TokenKind::Ident(id) => {
                            self.advance();
                            Some(id)
                        }
                        _ => None,
                    };
                    let func = self.parse_function_rest(name, false, is_generator, false, start, loc)?;
                    self.code.add_expr(Expr::Function(func))
                }
                TokenKind::Kw(Kw::Class) => {
                    let class = self.parse_class()?;
                    self.code.add_expr(Expr::Class(class))
                }
                _ => {
                    let e = self.parse_assign()?;
                    self.expect_semi()?;
                    e
                }
            };
            return Ok(self.code.add_stmt(Stmt::ExportDefault(expr), loc));
        }
        // export * [as ns] from "m"
        if self.eat(P::Star) {
            let alias = if self.eat_ident(StaticStrings::As) {
                Some(self.expect_ident_name()?)
            } else {
                None
            };
            if !self.eat_ident(StaticStrings::From) {
                return Err(self.err("expected 'from'"));
            }
            let TokenKind::Str(spec) = *self.kind() else {
                return Err(self.err("expected module specifier string"));
            };
            self.advance();
            self.expect_semi()?;
            return Ok(self.code.add_stmt(Stmt::ExportAll { from: spec, alias }, loc));
        }
        // export { a, b as c } [from "m"]
        if self.eat(P::LBrace) {
            let mut specifiers = Vec::new();
            while !self.is(P::RBrace) {
                let local = self.prop_name_token().ok_or_else(|| self.unexpected())?;
                let exported = if self.eat_ident(StaticStrings::As) {
                    match self.kind().clone() {
                        TokenKind::Str(id) => {
                            self.advance();
                            id
                        }
                        _ => self.prop_name_token().ok_or_else(|| self.unexpected())?,
                    }
                } else {
                    local
                };
                specifiers.push(ExportName { local, exported });
                if !self.eat(P::Comma) {
                    break;
                }
            }
            self.expect(P::RBrace)?;
            let from = if self.eat_ident(StaticStrings::From) {
                let TokenKind::Str(spec) = *self.kind() else {
                    return Err(self.err("expected module specifier string"));
                };
                self.advance();
                Some(spec)
            } else {
                None
            };
            self.expect_semi()?;
            return Ok(self.code.add_stmt(Stmt::ExportNamed { specifiers, from }, loc));
        }
        // export <declaration>
        let inner = self.parse_stmt()?;
        match self.code.stmt(inner) {
            Stmt::VarDecl { .. } | Stmt::Func { .. } | Stmt::Class { .. } => {}
            _ => return Err(self.err("unsupported export declaration")),
        }
        Ok(self.code.add_stmt(Stmt::ExportDecl(inner), loc))
    }
}

enum ForEach {
    In,
    Of,
    OfAwait,
}

fn class_key_name(key: &crate::ast::ClassKey) -> Option<StringId> {
    match key {
        crate::ast::ClassKey::Static(id) => Some(*id),
        _ => None,
    }
}

/// Collects the identifiers bound by a pattern as lexical declarations.
pub(crate) fn collect_pat_names(code: &CodeStore, pat: PatId, is_const: bool, out: &mut Vec<LexDecl>) {
    match code.pat(pat) {
        Pat::Ident(name) => out.push(LexDecl { name: *name, is_const }),
        Pat::Expr(_) => {}
        Pat::Array { elems, rest } => {
            for elem in elems.iter().flatten() {
                collect_pat_names(code, *elem, is_const, out);
            }
            if let Some(rest) = rest {
                collect_pat_names(code, *rest, is_const, out);
            }
        }
        Pat::Object { props, rest } => {
            for prop in props {
                collect_pat_names(code, prop.value, is_const, out);
            }
            if let Some(rest) = rest {
                collect_pat_names(code, *rest, is_const, out);
            }
        }
        Pat::Default { pat, .. } => collect_pat_names(code, *pat, is_const, out),
    }
}

fn dedup(mut names: Vec<StringId>) -> Vec<StringId> {
    let mut seen = AHashSet::new();
    names.retain(|n| seen.insert(*n));
    names
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Eof => "end of input".to_owned(),
        TokenKind::Ident(_) => "identifier".to_owned(),
        TokenKind::PrivateIdent(_) => "private name".to_owned(),
        TokenKind::Kw(kw) => format!("'{}'", <&'static str>::from(*kw)),
        TokenKind::Num(_) | TokenKind::BigInt(_) => "number".to_owned(),
        TokenKind::Str(_) => "string".to_owned(),
        TokenKind::Template(_) | TokenKind::TemplateHead(_) | TokenKind::TemplateMiddle(_) | TokenKind::TemplateTail(_) => {
            "template".to_owned()
        }
        TokenKind::Regex { .. } => "regular expression".to_owned(),
        TokenKind::Punct(p) => format!("'{}'", describe_punct(*p)),
    }
}

fn describe_punct(p: P) -> &'static str {
    match p {
        P::LParen => "(",
        P::RParen => ")",
        P::LBracket => "[",
        P::RBracket => "]",
        P::LBrace => "{",
        P::RBrace => "}",
        P::Semi => ";",
        P::Comma => ",",
        P::Dot => ".",
        P::DotDotDot => "...",
        P::Arrow => "=>",
        P::Colon => ":",
        P::Question => "?",
        P::QuestionDot => "?.",
        P::QuestionQuestion => "??",
        P::QuestionQuestionEq => "??=",
        P::Assign => "=",
        P::Eq => "==",
        P::StrictEq => "===",
        P::NotEq => "!=",
        P::StrictNotEq => "!==",
        P::Lt => "<",
        P::Gt => ">",
        P::LtEq => "<=",
        P::GtEq => ">=",
        P::Plus => "+",
        P::Minus => "-",
        P::Star => "*",
        P::StarStar => "**",
        P::Slash => "/",
        P::Percent => "%",
        P::PlusPlus => "++",
        P::MinusMinus => "--",
        P::PlusEq => "+=",
        P::MinusEq => "-=",
        P::StarEq => "*=",
        P::StarStarEq => "**=",
        P::SlashEq => "/=",
        P::PercentEq => "%=",
        P::Shl => "<<",
        P::Shr => ">>",
        P::UShr => ">>>",
        P::ShlEq => "<<=",
        P::ShrEq => ">>=",
        P::UShrEq => ">>>=",
        P::Amp => "&",
        P::Pipe => "|",
        P::Caret => "^",
        P::AmpEq => "&=",
        P::PipeEq => "|=",
        P::CaretEq => "^=",
        P::AmpAmp => "&&",
        P::PipePipe => "||",
        P::AmpAmpEq => "&&=",
        P::PipePipeEq => "||=",
        P::Bang => "!",
        P::Tilde => "~",
    }
}
