//! Expression parsing: precedence climbing with the ECMAScript
//! special cases — right-associative `**` (with the unary-operand
//! restriction), the `??` mixing ban, optional-chain boundaries, arrow
//! lookahead, and the cover grammar that turns expressions into
//! destructuring patterns.

use super::{PResult, Parser};
use crate::{
    ast::{
        Arg, ArrayElem, AssignOp, BinOp, Expr, ExprId, LogicalOp, MemberKey, ObjPatProp, Pat, PatId, PropDef,
        PropName, Quasi, UnaryOp,
    },
    error::CodeLoc,
    intern::{StaticStrings, StringId},
    lexer::{Kw, P, TokenKind},
    regexp::RegexFlags,
    types::number::to_js_string,
};

impl Parser<'_> {
    /// Full expression (comma operator allowed).
    pub(super) fn parse_expr(&mut self) -> PResult<ExprId> {
        let first = self.parse_assign()?;
        if !self.is(P::Comma) {
            return Ok(first);
        }
        let mut exprs = vec![first];
        while self.eat(P::Comma) {
            exprs.push(self.parse_assign()?);
        }
        Ok(self.code.add_expr(Expr::Seq(exprs)))
    }

    /// Expression with the `in` operator disallowed (for-statement heads).
    pub(super) fn parse_expr_no_in(&mut self) -> PResult<ExprId> {
        let first = self.parse_assign_no_in()?;
        if !self.is(P::Comma) {
            return Ok(first);
        }
        let mut exprs = vec![first];
        while self.eat(P::Comma) {
            exprs.push(self.parse_assign_no_in()?);
        }
        Ok(self.code.add_expr(Expr::Seq(exprs)))
    }

    pub(super) fn parse_assign(&mut self) -> PResult<ExprId> {
        self.parse_assign_inner(true)
    }

    fn parse_assign_no_in(&mut self) -> PResult<ExprId> {
        self.parse_assign_inner(false)
    }

    fn parse_assign_inner(&mut self, allow_in: bool) -> PResult<ExprId> {
        if self.in_generator_ctx() && self.is_kw(Kw::Yield) {
            return self.parse_yield();
        }
        if let Some(arrow) = self.try_parse_arrow()? {
            return Ok(arrow);
        }
        let lhs = self.parse_cond(allow_in)?;
        let op = match self.kind() {
            TokenKind::Punct(P::Assign) => AssignOp::Assign,
            TokenKind::Punct(P::PlusEq) => AssignOp::Bin(BinOp::Add),
            TokenKind::Punct(P::MinusEq) => AssignOp::Bin(BinOp::Sub),
            TokenKind::Punct(P::StarEq) => AssignOp::Bin(BinOp::Mul),
            TokenKind::Punct(P::SlashEq) => AssignOp::Bin(BinOp::Div),
            TokenKind::Punct(P::PercentEq) => AssignOp::Bin(BinOp::Rem),
            TokenKind::Punct(P::StarStarEq) => AssignOp::Bin(BinOp::Exp),
            TokenKind::Punct(P::ShlEq) => AssignOp::Bin(BinOp::Shl),
            TokenKind::Punct(P::ShrEq) => AssignOp::Bin(BinOp::Shr),
            TokenKind::Punct(P::UShrEq) => AssignOp::Bin(BinOp::UShr),
            TokenKind::Punct(P::AmpEq) => AssignOp::Bin(BinOp::BitAnd),
            TokenKind::Punct(P::PipeEq) => AssignOp::Bin(BinOp::BitOr),
            TokenKind::Punct(P::CaretEq) => AssignOp::Bin(BinOp::BitXor),
            TokenKind::Punct(P::AmpAmpEq) => AssignOp::Logical(LogicalOp::And),
            TokenKind::Punct(P::PipePipeEq) => AssignOp::Logical(LogicalOp::Or),
            TokenKind::Punct(P::QuestionQuestionEq) => AssignOp::Logical(LogicalOp::Nullish),
            _ => return Ok(lhs),
        };
        self.advance();
        let target = if op == AssignOp::Assign {
            self.expr_to_pattern(lhs)?
        } else {
            // compound assignment requires a simple target
            match self.code.expr(lhs) {
                Expr::Ident(name) => {
                    let name = *name;
                    self.code.add_pat(Pat::Ident(name))
                }
                Expr::Member { .. } | Expr::SuperMember { .. } => self.code.add_pat(Pat::Expr(lhs)),
                _ => return Err(self.err("invalid assignment target")),
            }
        };
        let value = self.parse_assign_inner(allow_in)?;
        Ok(self.code.add_expr(Expr::Assign { op, target, value }))
    }

    fn parse_yield(&mut self) -> PResult<ExprId> {
        self.advance();
        let delegate = self.eat(P::Star);
        let has_arg = if delegate {
            true
        } else {
            !(self.peek().newline_before
                || matches!(
                    self.kind(),
                    TokenKind::Punct(P::Semi | P::RParen | P::RBracket | P::RBrace | P::Comma | P::Colon)
                        | TokenKind::Eof
                ))
        };
        let arg = if has_arg { Some(self.parse_assign()?) } else { None };
        Ok(self.code.add_expr(Expr::Yield { arg, delegate }))
    }

    // === arrows ===

    /// Detects and parses an arrow function at the current position.
    fn try_parse_arrow(&mut self) -> PResult<Option<ExprId>> {
        let start = self.peek().byte;
        let loc = self.loc();
        // async arrows
        if self.is_ident(StaticStrings::Async) && !self.peek_at(1).newline_before {
            match &self.peek_at(1).kind {
                TokenKind::Ident(_)
                    if matches!(self.peek_at(2).kind, TokenKind::Punct(P::Arrow)) =>
                {
                    self.advance();
                    let name = self.expect_ident_name()?;
                    let pat = self.code.add_pat(Pat::Ident(name));
                    self.expect(P::Arrow)?;
                    return Ok(Some(self.parse_arrow_body(vec![pat], None, true, true, start, loc)?));
                }
                TokenKind::Punct(P::LParen) if self.arrow_after_parens(1) => {
                    self.advance();
                    self.advance(); // (
                    let (params, rest, simple) = self.parse_params()?;
                    self.expect(P::Arrow)?;
                    return Ok(Some(self.parse_arrow_body(params, rest, simple, true, start, loc)?));
                }
                _ => {}
            }
        }
        // `x =>`
        if let TokenKind::Ident(name) = *self.kind()
            && matches!(self.peek_at(1).kind, TokenKind::Punct(P::Arrow))
            && !self.peek_at(1).newline_before
        {
            self.advance();
            self.advance();
            let pat = self.code.add_pat(Pat::Ident(name));
            return Ok(Some(self.parse_arrow_body(vec![pat], None, true, false, start, loc)?));
        }
        // `( params ) =>`
        if self.is(P::LParen) && self.arrow_after_parens(0) {
            self.advance(); // (
            let (params, rest, simple) = self.parse_params()?;
            self.expect(P::Arrow)?;
            return Ok(Some(self.parse_arrow_body(params, rest, simple, false, start, loc)?));
        }
        Ok(None)
    }

    /// Whether the parenthesized group starting `n` tokens ahead is followed
    /// by `=>`.
    fn arrow_after_parens(&self, n: usize) -> bool {
        let mut depth = 0usize;
        let mut i = n;
        loop {
            match &self.peek_at(i).kind {
                TokenKind::Punct(P::LParen) => depth += 1,
                TokenKind::Punct(P::RParen) => {
                    depth -= 1;
                    if depth == 0 {
                        return matches!(self.peek_at(i + 1).kind, TokenKind::Punct(P::Arrow));
                    }
                }
                TokenKind::Eof => return false,
                _ => {}
            }
            i += 1;
        }
    }

    fn parse_arrow_body(
        &mut self,
        params: Vec<PatId>,
        rest: Option<PatId>,
        simple: bool,
        is_async: bool,
        start_byte: u32,
        loc: CodeLoc,
    ) -> PResult<ExprId> {
        use crate::ast::{FuncBody, FuncDef};
        self.pending_cover_init = None;
        let func = if self.is(P::LBrace) {
            let func = self.parse_arrow_block_body(params, rest, simple, is_async, start_byte, loc)?;
            func
        } else {
            // concise body
            let saved = self.save_arrow_ctx(is_async);
            let body = self.parse_assign();
            self.restore_arrow_ctx(saved);
            let body = body?;
            if self.is_strict() {
                self.mark_tail_calls(body);
            }
            let end = self.prev_end_byte();
            self.code.add_func(FuncDef {
                name: None,
                params,
                rest,
                body: FuncBody::Expr(body),
                is_async,
                is_generator: false,
                is_arrow: true,
                is_strict: self.is_strict(),
                simple_params: simple,
                var_names: Vec::new(),
                fn_decls: Vec::new(),
                lex: Vec::new(),
                chunk: self.chunk_id(),
                span: (start_byte, end),
                loc,
            })
        };
        Ok(self.code.add_expr(Expr::Function(func)))
    }

    // === conditional / binary ===

    fn parse_cond(&mut self, allow_in: bool) -> PResult<ExprId> {
        let test = self.parse_binary(0, allow_in)?;
        if !self.eat(P::Question) {
            return Ok(test);
        }
        let cons = self.parse_assign()?;
        self.expect(P::Colon)?;
        let alt = self.parse_assign_inner(allow_in)?;
        Ok(self.code.add_expr(Expr::Cond { test, cons, alt }))
    }

    fn parse_binary(&mut self, min_bp: u8, allow_in: bool) -> PResult<ExprId> {
        // `#x in obj` brand check
        if let TokenKind::PrivateIdent(name) = *self.kind()
            && matches!(self.peek_at(1).kind, TokenKind::Kw(Kw::In))
        {
            if !allow_in {
                return Err(self.err("unexpected private name"));
            }
            let id = self
                .resolve_private(name)
                .ok_or_else(|| self.err("undeclared private name"))?;
            self.advance();
            self.advance();
            let obj = self.parse_binary(RELATIONAL_BP + 1, allow_in)?;
            return Ok(self.code.add_expr(Expr::PrivateIn { name: id, obj }));
        }
        let (mut lhs, mut lhs_unary) = self.parse_unary(allow_in)?;
        loop {
            let Some(op) = self.peek_bin_op(allow_in) else { break };
            let bp = op.bp();
            if bp < min_bp {
                break;
            }
            if let Op::Bin(BinOp::Exp) = op
                && lhs_unary
            {
                return Err(self.err("unparenthesized unary expression cannot be on the left of '**'"));
            }
            self.advance();
            // `**` is right-associative; everything else left
            let next_min = if matches!(op, Op::Bin(BinOp::Exp)) { bp } else { bp + 1 };
            let rhs = self.parse_binary(next_min, allow_in)?;
            lhs = match op {
                Op::Bin(op) => self.code.add_expr(Expr::Binary { op, left: lhs, right: rhs }),
                Op::Logical(op) => {
                    self.check_nullish_mixing(op, lhs)?;
                    self.check_nullish_mixing(op, rhs)?;
                    self.code.add_expr(Expr::Logical { op, left: lhs, right: rhs })
                }
            };
            lhs_unary = false;
        }
        Ok(lhs)
    }

    /// `??` cannot be mixed with `&&`/`||` without parentheses.
    fn check_nullish_mixing(&self, op: LogicalOp, operand: ExprId) -> PResult<()> {
        if self.paren_exprs.contains(&operand) {
            return Ok(());
        }
        let conflict = match self.code.expr(operand) {
            Expr::Logical { op: inner, .. } => match (op, inner) {
                (LogicalOp::Nullish, LogicalOp::And | LogicalOp::Or) => true,
                (LogicalOp::And | LogicalOp::Or, LogicalOp::Nullish) => true,
                _ => false,
            },
            _ => false,
        };
        if conflict {
            Err(self.err("nullish coalescing cannot be mixed with '&&' or '||' without parentheses"))
        } else {
            Ok(())
        }
    }

    fn peek_bin_op(&self, allow_in: bool) -> Option<Op> {
        let op = match self.kind() {
            TokenKind::Kw(Kw::In) if allow_in => Op::Bin(BinOp::In),
            TokenKind::Kw(Kw::Instanceof) => Op::Bin(BinOp::InstanceOf),
            TokenKind::Punct(p) => match p {
                P::QuestionQuestion => Op::Logical(LogicalOp::Nullish),
                P::PipePipe => Op::Logical(LogicalOp::Or),
                P::AmpAmp => Op::Logical(LogicalOp::And),
                P::Pipe => Op::Bin(BinOp::BitOr),
                P::Caret => Op::Bin(BinOp::BitXor),
                P::Amp => Op::Bin(BinOp::BitAnd),
                P::Eq => Op::Bin(BinOp::Eq),
                P::NotEq => Op::Bin(BinOp::NotEq),
                P::StrictEq => Op::Bin(BinOp::StrictEq),
                P::StrictNotEq => Op::Bin(BinOp::StrictNotEq),
                P::Lt => Op::Bin(BinOp::Lt),
                P::Gt => Op::Bin(BinOp::Gt),
                P::LtEq => Op::Bin(BinOp::LtEq),
                P::GtEq => Op::Bin(BinOp::GtEq),
                P::Shl => Op::Bin(BinOp::Shl),
                P::Shr => Op::Bin(BinOp::Shr),
                P::UShr => Op::Bin(BinOp::UShr),
                P::Plus => Op::Bin(BinOp::Add),
                P::Minus => Op::Bin(BinOp::Sub),
                P::Star => Op::Bin(BinOp::Mul),
                P::Slash => Op::Bin(BinOp::Div),
                P::Percent => Op::Bin(BinOp::Rem),
                P::StarStar => Op::Bin(BinOp::Exp),
                _ => return None,
            },
            _ => return None,
        };
        Some(op)
    }

    // === unary / postfix ===

    fn parse_unary(&mut self, allow_in: bool) -> PResult<(ExprId, bool)> {
        let op = match self.kind() {
            TokenKind::Kw(Kw::Delete) => Some(UnaryOp::Delete),
            TokenKind::Kw(Kw::Void) => Some(UnaryOp::Void),
            TokenKind::Kw(Kw::Typeof) => Some(UnaryOp::Typeof),
            TokenKind::Punct(P::Plus) => Some(UnaryOp::Plus),
            TokenKind::Punct(P::Minus) => Some(UnaryOp::Neg),
            TokenKind::Punct(P::Tilde) => Some(UnaryOp::BitNot),
            TokenKind::Punct(P::Bang) => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let (expr, _) = self.parse_unary(allow_in)?;
            if op == UnaryOp::Delete && self.is_strict() {
                if let Expr::Ident(_) = self.code.expr(expr) {
                    return Err(self.err("delete of an unqualified identifier in strict mode"));
                }
            }
            return Ok((self.code.add_expr(Expr::Unary { op, expr }), true));
        }
        if matches!(self.kind(), TokenKind::Punct(P::PlusPlus | P::MinusMinus)) {
            let inc = self.is(P::PlusPlus);
            self.advance();
            let (target, _) = self.parse_unary(allow_in)?;
            self.check_update_target(target)?;
            return Ok((self.code.add_expr(Expr::Update { inc, prefix: true, target }), false));
        }
        if self.is_kw(Kw::Await) {
            if !self.in_async_ctx() {
                return Err(self.err("'await' is only allowed in async functions and module top level"));
            }
            self.advance();
            self.note_tla();
            let (arg, _) = self.parse_unary(allow_in)?;
            return Ok((self.code.add_expr(Expr::Await(arg)), true));
        }
        let expr = self.parse_postfix()?;
        Ok((expr, false))
    }

    fn check_update_target(&self, target: ExprId) -> PResult<()> {
        match self.code.expr(target) {
            Expr::Ident(_) | Expr::Member { .. } | Expr::SuperMember { .. } => Ok(()),
            _ => Err(self.err("invalid increment/decrement target")),
        }
    }

    fn parse_postfix(&mut self) -> PResult<ExprId> {
        let expr = self.parse_member_call(true)?;
        if matches!(self.kind(), TokenKind::Punct(P::PlusPlus | P::MinusMinus)) && !self.peek().newline_before {
            let inc = self.is(P::PlusPlus);
            self.advance();
            self.check_update_target(expr)?;
            return Ok(self.code.add_expr(Expr::Update { inc, prefix: false, target: expr }));
        }
        Ok(expr)
    }

    /// LeftHandSideExpression without binary operators (`extends` clause).
    pub(super) fn parse_unary_chain(&mut self) -> PResult<ExprId> {
        self.parse_member_call(true)
    }

    // === member / call chains ===

    fn parse_member_call(&mut self, allow_call: bool) -> PResult<ExprId> {
        let mut expr = self.parse_primary()?;
        let mut saw_optional = false;
        loop {
            match self.kind().clone() {
                TokenKind::Punct(P::Dot) => {
                    self.advance();
                    let key = self.parse_member_name()?;
                    expr = self.code.add_expr(Expr::Member { obj: expr, key, optional: false });
                }
                TokenKind::Punct(P::QuestionDot) => {
                    saw_optional = true;
                    self.advance();
                    match self.kind().clone() {
                        TokenKind::Punct(P::LParen) => {
                            if !allow_call {
                                return Err(self.unexpected());
                            }
                            self.advance();
                            let args = self.parse_args()?;
                            expr = self.code.add_expr(Expr::Call { callee: expr, args, optional: true, tail: false });
                        }
                        TokenKind::Punct(P::LBracket) => {
                            self.advance();
                            let key = self.parse_expr()?;
                            self.expect(P::RBracket)?;
                            expr = self.code.add_expr(Expr::Member {
                                obj: expr,
                                key: MemberKey::Computed(key),
                                optional: true,
                            });
                        }
                        _ => {
                            let key = self.parse_member_name()?;
                            expr = self.code.add_expr(Expr::Member { obj: expr, key, optional: true });
                        }
                    }
                }
                TokenKind::Punct(P::LBracket) => {
                    self.advance();
                    let key = self.parse_expr()?;
                    self.expect(P::RBracket)?;
                    expr = self.code.add_expr(Expr::Member { obj: expr, key: MemberKey::Computed(key), optional: false });
                }
                TokenKind::Punct(P::LParen) if allow_call => {
                    self.advance();
                    let args = self.parse_args()?;
                    expr = self.code.add_expr(Expr::Call { callee: expr, args, optional: false, tail: false });
                }
                TokenKind::Template(part) => {
                    if saw_optional {
                        return Err(self.err("tagged template in optional chain"));
                    }
                    self.advance();
                    let quasis = vec![Quasi { cooked: part.cooked, raw: part.raw }];
                    expr = self.code.add_expr(Expr::TaggedTemplate { tag: expr, quasis, exprs: Vec::new() });
                }
                TokenKind::TemplateHead(part) => {
                    if saw_optional {
                        return Err(self.err("tagged template in optional chain"));
                    }
                    self.advance();
                    let (quasis, exprs) = self.parse_template_parts(Quasi { cooked: part.cooked, raw: part.raw })?;
                    expr = self.code.add_expr(Expr::TaggedTemplate { tag: expr, quasis, exprs });
                }
                _ => break,
            }
        }
        if saw_optional {
            expr = self.code.add_expr(Expr::Chain(expr));
        }
        Ok(expr)
    }

    fn parse_member_name(&mut self) -> PResult<MemberKey> {
        if let TokenKind::PrivateIdent(name) = *self.kind() {
            self.advance();
            let id = self
                .resolve_private(name)
                .ok_or_else(|| self.err("undeclared private name"))?;
            return Ok(MemberKey::Private(id));
        }
        let name = self.prop_name_token().ok_or_else(|| self.unexpected())?;
        Ok(MemberKey::Static(name))
    }

    fn parse_args(&mut self) -> PResult<Vec<Arg>> {
        let mut args = Vec::new();
        while !self.is(P::RParen) {
            if self.eat(P::DotDotDot) {
                args.push(Arg::Spread(self.parse_assign()?));
            } else {
                args.push(Arg::Item(self.parse_assign()?));
            }
            if !self.eat(P::Comma) {
                break;
            }
        }
        self.expect(P::RParen)?;
        Ok(args)
    }

    // === primary ===

    fn parse_primary(&mut self) -> PResult<ExprId> {
        let loc = self.loc();
        let start = self.peek().byte;
        match self.kind().clone() {
            TokenKind::Num(n) => {
                self.advance();
                Ok(self.code.add_expr(Expr::Num(n)))
            }
            TokenKind::BigInt(b) => {
                self.advance();
                Ok(self.code.add_expr(Expr::BigInt(b)))
            }
            TokenKind::Str(id) => {
                self.advance();
                Ok(self.code.add_expr(Expr::Str(id)))
            }
            TokenKind::Regex { source, flags } => {
                self.advance();
                let flags = RegexFlags::parse(&flags).map_err(|msg| self.err(msg))?;
                Ok(self.code.add_expr(Expr::Regex { pattern: source.into_boxed_str(), flags }))
            }
            TokenKind::Template(part) => {
                self.advance();
                if part.cooked.is_none() {
                    return Err(self.err("invalid escape sequence in template literal"));
                }
                Ok(self.code.add_expr(Expr::Template {
                    quasis: vec![Quasi { cooked: part.cooked, raw: part.raw }],
                    exprs: Vec::new(),
                }))
            }
            TokenKind::TemplateHead(part) => {
                self.advance();
                let (quasis, exprs) = self.parse_template_parts(Quasi { cooked: part.cooked, raw: part.raw })?;
                if quasis.iter().any(|q| q.cooked.is_none()) {
                    return Err(self.err("invalid escape sequence in template literal"));
                }
                Ok(self.code.add_expr(Expr::Template { quasis, exprs }))
            }
            TokenKind::Kw(Kw::True) => {
                self.advance();
                Ok(self.code.add_expr(Expr::Bool(true)))
            }
            TokenKind::Kw(Kw::False) => {
                self.advance();
                Ok(self.code.add_expr(Expr::Bool(false)))
            }
            TokenKind::Kw(Kw::Null) => {
                self.advance();
                Ok(self.code.add_expr(Expr::Null))
            }
            TokenKind::Kw(Kw::This) => {
                self.advance();
                Ok(self.code.add_expr(Expr::This))
            }
            TokenKind::Kw(Kw::Super) => {
                self.advance();
                match self.kind().clone() {
                    TokenKind::Punct(P::LParen) => {
                        self.advance();
                        let args = self.parse_args()?;
                        Ok(self.code.add_expr(Expr::SuperCall(args)))
                    }
                    TokenKind::Punct(P::Dot) => {
                        self.advance();
                        let name = self.prop_name_token().ok_or_else(|| self.unexpected())?;
                        Ok(self.code.add_expr(Expr::SuperMember { key: MemberKey::Static(name) }))
                    }
                    TokenKind::Punct(P::LBracket) => {
                        self.advance();
                        let key = self.parse_expr()?;
                        self.expect(P::RBracket)?;
                        Ok(self.code.add_expr(Expr::SuperMember { key: MemberKey::Computed(key) }))
                    }
                    _ => Err(self.err("'super' must be followed by a call or member access")),
                }
            }
            TokenKind::Kw(Kw::New) => self.parse_new(),
            TokenKind::Kw(Kw::Import) => {
                self.advance();
                if self.eat(P::Dot) {
                    if !self.eat_ident(StaticStrings::Meta) {
                        return Err(self.err("expected 'meta' after 'import.'"));
                    }
                    return Ok(self.code.add_expr(Expr::ImportMeta));
                }
                self.expect(P::LParen)?;
                let arg = self.parse_assign()?;
                self.eat(P::Comma);
                self.expect(P::RParen)?;
                Ok(self.code.add_expr(Expr::DynamicImport(arg)))
            }
            TokenKind::Kw(Kw::Function) => {
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
                Ok(self.code.add_expr(Expr::Function(func)))
            }
            TokenKind::Kw(Kw::Class) => {
                let class = self.parse_class()?;
                Ok(self.code.add_expr(Expr::Class(class)))
            }
            TokenKind::Ident(id)
                if id == StaticStrings::Async.id()
                    && matches!(self.peek_at(1).kind, TokenKind::Kw(Kw::Function))
                    && !self.peek_at(1).newline_before =>
            {
                self.advance();
                self.advance();
                let is_generator = self.eat(P::Star);
                let name = match *self.kind() {
                    TokenKind::Ident(id) => {
                        self.advance();
                        Some(id)
                    }
                    _ => None,
                };
                let func = self.parse_function_rest(name, true, is_generator, false, start, loc)?;
                Ok(self.code.add_expr(Expr::Function(func)))
            }
            TokenKind::Ident(id) => {
                self.advance();
                Ok(self.code.add_expr(Expr::Ident(id)))
            }
            TokenKind::Kw(Kw::Yield | Kw::Await | Kw::Let) => {
                // usable as identifiers in the right contexts
                let name = self.expect_ident_name()?;
                Ok(self.code.add_expr(Expr::Ident(name)))
            }
            TokenKind::Punct(P::LParen) => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(P::RParen)?;
                self.paren_exprs.insert(expr);
                Ok(expr)
            }
            TokenKind::Punct(P::LBracket) => self.parse_array_literal(),
            TokenKind::Punct(P::LBrace) => self.parse_object_literal(),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_new(&mut self) -> PResult<ExprId> {
        self.expect_kw(Kw::New)?;
        if self.eat(P::Dot) {
            if !self.eat_ident(StaticStrings::Target) {
                return Err(self.err("expected 'target' after 'new.'"));
            }
            return Ok(self.code.add_expr(Expr::NewTarget));
        }
        // callee is a MemberExpression: calls bind to `new`, not the callee
        let callee = self.parse_new_callee()?;
        let args = if self.eat(P::LParen) { self.parse_args()? } else { Vec::new() };
        Ok(self.code.add_expr(Expr::New { callee, args }))
    }

    /// Member chain without call parentheses (for `new` callees).
    fn parse_new_callee(&mut self) -> PResult<ExprId> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.kind().clone() {
                TokenKind::Punct(P::Dot) => {
                    self.advance();
                    let key = self.parse_member_name()?;
                    expr = self.code.add_expr(Expr::Member { obj: expr, key, optional: false });
                }
                TokenKind::Punct(P::LBracket) => {
                    self.advance();
                    let key = self.parse_expr()?;
                    self.expect(P::RBracket)?;
                    expr = self.code.add_expr(Expr::Member { obj: expr, key: MemberKey::Computed(key), optional: false });
                }
                TokenKind::Punct(P::QuestionDot) => {
                    return Err(self.err("optional chaining cannot be used in a 'new' callee"));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_template_parts(&mut self, head: Quasi) -> PResult<(Vec<Quasi>, Vec<ExprId>)> {
        let mut quasis = vec![head];
        let mut exprs = Vec::new();
        loop {
            exprs.push(self.parse_expr()?);
            match self.kind().clone() {
                TokenKind::TemplateMiddle(part) => {
                    self.advance();
                    quasis.push(Quasi { cooked: part.cooked, raw: part.raw });
                }
                TokenKind::TemplateTail(part) => {
                    self.advance();
                    quasis.push(Quasi { cooked: part.cooked, raw: part.raw });
                    return Ok((quasis, exprs));
                }
                _ => return Err(self.err("unterminated template substitution")),
            }
        }
    }

    fn parse_array_literal(&mut self) -> PResult<ExprId> {
        self.expect(P::LBracket)?;
        let mut elems = Vec::new();
        loop {
            if self.is(P::RBracket) {
                break;
            }
            if self.eat(P::Comma) {
                elems.push(ArrayElem::Hole);
                continue;
            }
            if self.eat(P::DotDotDot) {
                elems.push(ArrayElem::Spread(self.parse_assign()?));
            } else {
                elems.push(ArrayElem::Item(self.parse_assign()?));
            }
            if !self.eat(P::Comma) {
                break;
            }
        }
        self.expect(P::RBracket)?;
        Ok(self.code.add_expr(Expr::Array(elems)))
    }

    fn parse_object_literal(&mut self) -> PResult<ExprId> {
        self.expect(P::LBrace)?;
        let mut props = Vec::new();
        while !self.is(P::RBrace) {
            if self.eat(P::DotDotDot) {
                props.push(PropDef::Spread(self.parse_assign()?));
                if !self.eat(P::Comma) {
                    break;
                }
                continue;
            }
            let loc = self.loc();
            let start = self.peek().byte;
            // get/set accessor?
            let accessor = if (self.is_ident(StaticStrings::Get) || self.is_ident(StaticStrings::Set))
                && !matches!(
                    self.peek_at(1).kind,
                    TokenKind::Punct(P::Comma | P::Colon | P::RBrace | P::LParen | P::Assign)
                ) {
                let is_get = self.is_ident(StaticStrings::Get);
                self.advance();
                Some(is_get)
            } else {
                None
            };
            let is_async = accessor.is_none()
                && self.is_ident(StaticStrings::Async)
                && !self.peek_at(1).newline_before
                && !matches!(
                    self.peek_at(1).kind,
                    TokenKind::Punct(P::Comma | P::Colon | P::RBrace | P::LParen | P::Assign)
                )
                && {
                    self.advance();
                    true
                };
            let is_generator = accessor.is_none() && self.eat(P::Star);
            let key = self.parse_prop_name()?;
            if let Some(is_get) = accessor {
                let func = self.parse_function_rest(prop_key_name(&key), false, false, false, start, loc)?;
                props.push(if is_get { PropDef::Get { key, func } } else { PropDef::Set { key, func } });
            } else if self.is(P::LParen) {
                let func =
                    self.parse_function_rest(prop_key_name(&key), is_async, is_generator, false, start, loc)?;
                props.push(PropDef::Method { key, func });
            } else if is_async || is_generator {
                return Err(self.err("expected method body"));
            } else if self.eat(P::Colon) {
                let value = self.parse_assign()?;
                match key {
                    PropName::Static(id) if id == StaticStrings::DunderProto.id() => {
                        props.push(PropDef::Proto(value));
                    }
                    _ => props.push(PropDef::Init { key, value }),
                }
            } else {
                // shorthand (possibly with a cover initializer)
                let PropName::Static(name) = key else {
                    return Err(self.err("computed property requires a value"));
                };
                if self.eat(P::Assign) {
                    // cover grammar: only valid as a destructuring pattern
                    self.pending_cover_init.get_or_insert(loc);
                    let target = self.code.add_pat(Pat::Ident(name));
                    let value = self.parse_assign()?;
                    let assign = self.code.add_expr(Expr::Assign {
                        op: AssignOp::Assign,
                        target,
                        value,
                    });
                    props.push(PropDef::Init { key, value: assign });
                } else {
                    let value = self.code.add_expr(Expr::Ident(name));
                    props.push(PropDef::Init { key, value });
                }
            }
            if !self.eat(P::Comma) {
                break;
            }
        }
        self.expect(P::RBrace)?;
        Ok(self.code.add_expr(Expr::Object(props)))
    }

    fn parse_prop_name(&mut self) -> PResult<PropName> {
        match self.kind().clone() {
            TokenKind::Str(id) => {
                self.advance();
                Ok(PropName::Static(id))
            }
            TokenKind::Num(n) => {
                self.advance();
                let s = to_js_string(n);
                Ok(PropName::Static(self.interns.intern(&s)))
            }
            TokenKind::Punct(P::LBracket) => {
                self.advance();
                let expr = self.parse_assign()?;
                self.expect(P::RBracket)?;
                Ok(PropName::Computed(expr))
            }
            _ => {
                let id = self.prop_name_token().ok_or_else(|| self.unexpected())?;
                Ok(PropName::Static(id))
            }
        }
    }

    // === patterns ===

    /// Binding patterns (declarations and parameters).
    pub(super) fn parse_binding_pattern(&mut self) -> PResult<PatId> {
        match self.kind().clone() {
            TokenKind::Punct(P::LBracket) => {
                self.advance();
                let mut elems = Vec::new();
                let mut rest = None;
                loop {
                    if self.is(P::RBracket) {
                        break;
                    }
                    if self.eat(P::Comma) {
                        elems.push(None);
                        continue;
                    }
                    if self.eat(P::DotDotDot) {
                        rest = Some(self.parse_binding_pattern()?);
                        break;
                    }
                    let mut pat = self.parse_binding_pattern()?;
                    if self.eat(P::Assign) {
                        let init = self.parse_assign()?;
                        pat = self.code.add_pat(Pat::Default { pat, init });
                    }
                    elems.push(Some(pat));
                    if !self.eat(P::Comma) {
                        break;
                    }
                }
                self.expect(P::RBracket)?;
                Ok(self.code.add_pat(Pat::Array { elems, rest }))
            }
            TokenKind::Punct(P::LBrace) => {
                self.advance();
                let mut props = Vec::new();
                let mut rest = None;
                while !self.is(P::RBrace) {
                    if self.eat(P::DotDotDot) {
                        let name = self.expect_ident_name()?;
                        rest = Some(self.code.add_pat(Pat::Ident(name)));
                        break;
                    }
                    let key = self.parse_prop_name()?;
                    let mut value = if self.eat(P::Colon) {
                        self.parse_binding_pattern()?
                    } else {
                        let PropName::Static(name) = key else {
                            return Err(self.err("computed property requires a binding"));
                        };
                        self.code.add_pat(Pat::Ident(name))
                    };
                    if self.eat(P::Assign) {
                        let init = self.parse_assign()?;
                        value = self.code.add_pat(Pat::Default { pat: value, init });
                    }
                    props.push(ObjPatProp { key, value });
                    if !self.eat(P::Comma) {
                        break;
                    }
                }
                self.expect(P::RBrace)?;
                Ok(self.code.add_pat(Pat::Object { props, rest }))
            }
            _ => {
                let name = self.expect_ident_name()?;
                if self.is_strict() && self.is_restricted_name(name) {
                    return Err(self.err("invalid binding name in strict mode"));
                }
                Ok(self.code.add_pat(Pat::Ident(name)))
            }
        }
    }

    fn is_restricted_name(&self, name: StringId) -> bool {
        let s = self.interns.str(name);
        s == "eval" || s == "arguments"
    }

    /// Converts an already-parsed expression into an assignment pattern
    /// (the cover grammar resolution for `[a, b] = c` and arrow params).
    pub(super) fn expr_to_pattern(&mut self, expr: ExprId) -> PResult<PatId> {
        self.pending_cover_init = None;
        self.expr_to_pattern_inner(expr)
    }

    fn expr_to_pattern_inner(&mut self, expr: ExprId) -> PResult<PatId> {
        match self.code.expr(expr) {
            Expr::Ident(name) => {
                let name = *name;
                Ok(self.code.add_pat(Pat::Ident(name)))
            }
            Expr::Member { .. } | Expr::SuperMember { .. } => Ok(self.code.add_pat(Pat::Expr(expr))),
            Expr::Assign { op: AssignOp::Assign, target, value } => {
                let (target, value) = (*target, *value);
                Ok(self.code.add_pat(Pat::Default { pat: target, init: value }))
            }
            Expr::Array(elems) => {
                let elems = elems.clone();
                let mut pats = Vec::new();
                let mut rest = None;
                let count = elems.len();
                for (i, elem) in elems.into_iter().enumerate() {
                    match elem {
                        ArrayElem::Hole => pats.push(None),
                        ArrayElem::Item(e) => pats.push(Some(self.expr_to_pattern_inner(e)?)),
                        ArrayElem::Spread(e) => {
                            if i + 1 != count {
                                return Err(self.err("rest element must be last"));
                            }
                            rest = Some(self.expr_to_pattern_inner(e)?);
                        }
                    }
                }
                Ok(self.code.add_pat(Pat::Array { elems: pats, rest }))
            }
            Expr::Object(props) => {
                let props: Vec<PropDef> = props.clone();
                let mut out = Vec::new();
                let mut rest = None;
                let count = props.len();
                for (i, prop) in props.into_iter().enumerate() {
                    match prop {
                        PropDef::Init { key, value } => {
                            out.push(ObjPatProp { key, value: self.expr_to_pattern_inner(value)? });
                        }
                        PropDef::Proto(value) => {
                            let key = PropName::Static(StaticStrings::DunderProto.id());
                            out.push(ObjPatProp { key, value: self.expr_to_pattern_inner(value)? });
                        }
                        PropDef::Spread(e) => {
                            if i + 1 != count {
                                return Err(self.err("rest element must be last"));
                            }
                            rest = Some(self.expr_to_pattern_inner(e)?);
                        }
                        PropDef::Get { .. } | PropDef::Set { .. } | PropDef::Method { .. } => {
                            return Err(self.err("invalid destructuring target"));
                        }
                    }
                }
                Ok(self.code.add_pat(Pat::Object { props: out, rest }))
            }
            _ => Err(self.err("invalid assignment target")),
        }
    }

    // === small helpers used by parse_arrow_body ===

    fn save_arrow_ctx(&mut self, is_async: bool) -> (bool, bool) {
        let saved = (self.in_async_raw(), self.in_generator_ctx());
        self.set_async_generator(is_async, false);
        saved
    }

    fn restore_arrow_ctx(&mut self, saved: (bool, bool)) {
        self.set_async_generator(saved.0, saved.1);
    }

    fn parse_arrow_block_body(
        &mut self,
        params: Vec<PatId>,
        rest: Option<PatId>,
        simple: bool,
        is_async: bool,
        start_byte: u32,
        loc: CodeLoc,
    ) -> PResult<crate::intern::FuncId> {
        self.parse_arrow_block_inner(params, rest, simple, is_async, start_byte, loc)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Bin(BinOp),
    Logical(LogicalOp),
}

const RELATIONAL_BP: u8 = 8;

impl Op {
    fn bp(self) -> u8 {
        match self {
            Self::Logical(LogicalOp::Nullish) => 1,
            Self::Logical(LogicalOp::Or) => 2,
            Self::Logical(LogicalOp::And) => 3,
            Self::Bin(BinOp::BitOr) => 4,
            Self::Bin(BinOp::BitXor) => 5,
            Self::Bin(BinOp::BitAnd) => 6,
            Self::Bin(BinOp::Eq | BinOp::NotEq | BinOp::StrictEq | BinOp::StrictNotEq) => 7,
            Self::Bin(BinOp::Lt | BinOp::Gt | BinOp::LtEq | BinOp::GtEq | BinOp::In | BinOp::InstanceOf) => {
                RELATIONAL_BP
            }
            Self::Bin(BinOp::Shl | BinOp::Shr | BinOp::UShr) => 9,
            Self::Bin(BinOp::Add | BinOp::Sub) => 10,
            Self::Bin(BinOp::Mul | BinOp::Div | BinOp::Rem) => 11,
            Self::Bin(BinOp::Exp) => 12,
        }
    }
}

fn prop_key_name(key: &PropName) -> Option<StringId> {
    match key {
        PropName::Static(id) => Some(*id),
        PropName::Computed(_) => None,
    }
}
