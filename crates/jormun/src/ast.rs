//! The arena AST.
//!
//! Parsed nodes live in flat vectors inside [`CodeStore`] and are addressed
//! by `u32` ids, so the machine's control steps stay `Copy`-small and
//! functions are just ids plus metadata. All parse units (scripts and
//! modules) share one store; chunk ids only matter for source-text slices
//! (`Function.prototype.toString`) and error locations.

use num_bigint::BigInt;

use crate::{
    error::CodeLoc,
    intern::{FuncId, PrivateId, StringId},
    regexp::RegexFlags,
};

macro_rules! arena_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub(crate) struct $name(pub u32);

        impl $name {
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

arena_id!(ExprId);
arena_id!(StmtId);
arena_id!(PatId);
arena_id!(ClassId);
arena_id!(ChunkId);

/// Binary operators (non-short-circuiting).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Exp,
    Shl,
    Shr,
    UShr,
    BitAnd,
    BitOr,
    BitXor,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    In,
    InstanceOf,
}

/// Short-circuiting operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogicalOp {
    And,
    Or,
    Nullish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
    Typeof,
    Void,
    Delete,
}

/// Compound-assignment operators; `None` is plain `=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AssignOp {
    Assign,
    Bin(BinOp),
    Logical(LogicalOp),
}

/// One element of an array literal.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ArrayElem {
    Hole,
    Item(ExprId),
    Spread(ExprId),
}

/// One call/new argument.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Arg {
    Item(ExprId),
    Spread(ExprId),
}

/// A property key as written in source.
#[derive(Debug, Clone, Copy)]
pub(crate) enum PropName {
    /// Identifier, string literal, or numeric literal (already canonicalized
    /// to its string form at parse time).
    Static(StringId),
    Computed(ExprId),
}

/// One property of an object literal.
#[derive(Debug, Clone, Copy)]
pub(crate) enum PropDef {
    /// `key: value` (including shorthand, which parses to `key: key`).
    Init { key: PropName, value: ExprId },
    Get { key: PropName, func: FuncId },
    Set { key: PropName, func: FuncId },
    Method { key: PropName, func: FuncId },
    Spread(ExprId),
    /// `__proto__: value` sets the prototype rather than defining a property.
    Proto(ExprId),
}

/// Member access key.
#[derive(Debug, Clone, Copy)]
pub(crate) enum MemberKey {
    Static(StringId),
    Computed(ExprId),
    Private(PrivateId),
}

/// A cooked/raw template segment (ids into the interner).
#[derive(Debug, Clone, Copy)]
pub(crate) struct Quasi {
    /// `None` when the segment held an invalid escape (only legal tagged).
    pub cooked: Option<StringId>,
    pub raw: StringId,
}

#[derive(Debug)]
pub(crate) enum Expr {
    Null,
    Bool(bool),
    Num(f64),
    BigInt(Box<BigInt>),
    Str(StringId),
    Ident(StringId),
    This,
    NewTarget,
    ImportMeta,
    Array(Vec<ArrayElem>),
    Object(Vec<PropDef>),
    Function(FuncId),
    Class(ClassId),
    Template {
        quasis: Vec<Quasi>,
        exprs: Vec<ExprId>,
    },
    TaggedTemplate {
        tag: ExprId,
        quasis: Vec<Quasi>,
        exprs: Vec<ExprId>,
    },
    Regex {
        pattern: Box<str>,
        flags: RegexFlags,
    },
    Unary {
        op: UnaryOp,
        expr: ExprId,
    },
    /// `++x`, `x--`, ...
    Update {
        inc: bool,
        prefix: bool,
        target: ExprId,
    },
    Binary {
        op: BinOp,
        left: ExprId,
        right: ExprId,
    },
    Logical {
        op: LogicalOp,
        left: ExprId,
        right: ExprId,
    },
    Cond {
        test: ExprId,
        cons: ExprId,
        alt: ExprId,
    },
    Assign {
        op: AssignOp,
        target: PatId,
        value: ExprId,
    },
    Seq(Vec<ExprId>),
    Call {
        callee: ExprId,
        args: Vec<Arg>,
        /// `?.()`
        optional: bool,
        /// Marked by the parser for strict-mode tail-call optimization.
        tail: bool,
    },
    New {
        callee: ExprId,
        args: Vec<Arg>,
    },
    Member {
        obj: ExprId,
        key: MemberKey,
        /// `?.`
        optional: bool,
    },
    /// Optional-chain boundary: a nullish receiver anywhere in `expr`
    /// short-circuits the whole chain to `undefined`.
    Chain(ExprId),
    SuperCall(Vec<Arg>),
    SuperMember {
        key: MemberKey,
    },
    Yield {
        arg: Option<ExprId>,
        delegate: bool,
    },
    Await(ExprId),
    /// Dynamic `import(specifier)`.
    DynamicImport(ExprId),
    /// `#name in obj` (ES2022 ergonomic brand check).
    PrivateIn {
        name: PrivateId,
        obj: ExprId,
    },
}

/// Destructuring patterns and assignment targets.
#[derive(Debug)]
pub(crate) enum Pat {
    Ident(StringId),
    /// A member-expression assignment target (`a.b = ...`).
    Expr(ExprId),
    Array {
        elems: Vec<Option<PatId>>,
        rest: Option<PatId>,
    },
    Object {
        props: Vec<ObjPatProp>,
        rest: Option<PatId>,
    },
    /// `pat = default`.
    Default {
        pat: PatId,
        init: ExprId,
    },
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ObjPatProp {
    pub key: PropName,
    pub value: PatId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeclKind {
    Var,
    Let,
    Const,
}

/// A lexical declaration hoisted to the top of its scope (TDZ until
/// initialized).
#[derive(Debug, Clone, Copy)]
pub(crate) struct LexDecl {
    pub name: StringId,
    pub is_const: bool,
}

/// A block's static scope info: lexical declarations plus block-scoped
/// function declarations (installed eagerly on scope entry).
#[derive(Debug, Default)]
pub(crate) struct BlockScopeInfo {
    pub lex: Vec<LexDecl>,
    pub funcs: Vec<(StringId, FuncId)>,
}

#[derive(Debug)]
pub(crate) struct BlockData {
    pub stmts: Vec<StmtId>,
    pub scope: BlockScopeInfo,
}

/// The binding form at the head of `for-in`/`for-of`.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ForHead {
    Decl { kind: DeclKind, pat: PatId },
    Pat(PatId),
}

#[derive(Debug)]
pub(crate) struct SwitchCase {
    /// `None` for `default:`.
    pub test: Option<ExprId>,
    pub body: Vec<StmtId>,
}

#[derive(Debug)]
pub(crate) struct CatchClause {
    /// ES2019 optional catch binding.
    pub param: Option<PatId>,
    /// A `Stmt::Block`.
    pub body: StmtId,
}

/// A named import: `imported as local`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ImportName {
    pub imported: StringId,
    pub local: StringId,
}

#[derive(Debug)]
pub(crate) struct ImportDecl {
    pub specifier: StringId,
    pub default: Option<StringId>,
    pub namespace: Option<StringId>,
    pub named: Vec<ImportName>,
}

/// A named export specifier: `local as exported`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ExportName {
    pub local: StringId,
    pub exported: StringId,
}

#[derive(Debug)]
pub(crate) enum Stmt {
    Empty,
    Debugger,
    Expr(ExprId),
    VarDecl {
        kind: DeclKind,
        decls: Vec<(PatId, Option<ExprId>)>,
    },
    Func {
        name: StringId,
        func: FuncId,
    },
    Class {
        name: StringId,
        class: ClassId,
    },
    Return(Option<ExprId>),
    If {
        test: ExprId,
        cons: StmtId,
        alt: Option<StmtId>,
    },
    Block(Box<BlockData>),
    While {
        test: ExprId,
        body: StmtId,
    },
    DoWhile {
        body: StmtId,
        test: ExprId,
    },
    For {
        init: Option<ForInitStmt>,
        test: Option<ExprId>,
        update: Option<ExprId>,
        body: StmtId,
        /// `let`/`const` names declared by the init, scoped to the loop.
        scope: Vec<LexDecl>,
    },
    ForIn {
        head: ForHead,
        object: ExprId,
        body: StmtId,
        scope: Vec<LexDecl>,
    },
    ForOf {
        head: ForHead,
        iterable: ExprId,
        body: StmtId,
        scope: Vec<LexDecl>,
        is_await: bool,
    },
    Break(Option<StringId>),
    Continue(Option<StringId>),
    Labeled {
        label: StringId,
        body: StmtId,
    },
    Switch {
        disc: ExprId,
        cases: Vec<SwitchCase>,
        scope: BlockScopeInfo,
    },
    Throw(ExprId),
    Try {
        block: StmtId,
        catch: Option<CatchClause>,
        finally: Option<StmtId>,
    },
    Import(Box<ImportDecl>),
    /// `export { a, b as c }` / `export { a } from "m"`.
    ExportNamed {
        specifiers: Vec<ExportName>,
        from: Option<StringId>,
    },
    /// `export <decl>`; the inner statement is also executed normally.
    ExportDecl(StmtId),
    /// `export default <expr>`.
    ExportDefault(ExprId),
    /// `export * from "m"` / `export * as ns from "m"`.
    ExportAll {
        from: StringId,
        alias: Option<StringId>,
    },
}

/// The `for(init; ...)` initializer.
#[derive(Debug)]
pub(crate) enum ForInitStmt {
    Expr(ExprId),
    Decl {
        kind: DeclKind,
        decls: Vec<(PatId, Option<ExprId>)>,
    },
}

#[derive(Debug)]
pub(crate) enum FuncBody {
    Block(Vec<StmtId>),
    /// Concise arrow body.
    Expr(ExprId),
}

/// A parsed function: parameters, body, and the static scope information the
/// machine needs at call time.
#[derive(Debug)]
pub(crate) struct FuncDef {
    pub name: Option<StringId>,
    /// Parameter patterns in order; a trailing rest parameter is split out.
    pub params: Vec<PatId>,
    pub rest: Option<PatId>,
    pub body: FuncBody,
    pub is_async: bool,
    pub is_generator: bool,
    pub is_arrow: bool,
    pub is_strict: bool,
    /// Parameters are all plain identifiers without defaults (enables the
    /// mapped `arguments` object).
    pub simple_params: bool,
    /// `var`-declared names (hoisted, initialized `undefined`).
    pub var_names: Vec<StringId>,
    /// Function declarations hoisted to the top of the body.
    pub fn_decls: Vec<(StringId, FuncId)>,
    /// Top-level lexical declarations of the body.
    pub lex: Vec<LexDecl>,
    pub chunk: ChunkId,
    /// Byte span of the whole definition in its chunk's source.
    pub span: (u32, u32),
    pub loc: CodeLoc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MethodKind {
    Method,
    Get,
    Set,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum ClassKey {
    Static(StringId),
    Computed(ExprId),
    Private(PrivateId),
}

#[derive(Debug)]
pub(crate) enum ClassMemberKind {
    Method { func: FuncId, kind: MethodKind },
    /// Field; the initializer is compiled as an implicit zero-argument
    /// method run with the instance as `this`.
    Field { init: Option<FuncId> },
    StaticBlock { func: FuncId },
}

#[derive(Debug)]
pub(crate) struct ClassMember {
    pub is_static: bool,
    pub key: ClassKey,
    pub kind: ClassMemberKind,
}

#[derive(Debug)]
pub(crate) struct ClassDef {
    pub name: Option<StringId>,
    pub parent: Option<ExprId>,
    pub ctor: Option<FuncId>,
    pub members: Vec<ClassMember>,
}

/// A resolved private name: its source text (without `#`) for error
/// messages and brand association by id.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PrivateName {
    pub name: StringId,
}

/// Result of parsing one chunk (script or module body).
#[derive(Debug)]
pub(crate) struct ProgramInfo {
    pub chunk: ChunkId,
    pub body: Vec<StmtId>,
    pub is_module: bool,
    pub strict: bool,
    pub var_names: Vec<StringId>,
    pub fn_decls: Vec<(StringId, FuncId)>,
    pub lex: Vec<LexDecl>,
    /// Module contains top-level `await`.
    pub has_tla: bool,
}

/// Owns every parsed node for one interpreter.
#[derive(Debug, Default)]
pub(crate) struct CodeStore {
    pub sources: Vec<String>,
    pub exprs: Vec<Expr>,
    pub stmts: Vec<Stmt>,
    /// Location of each statement, parallel to `stmts`.
    pub stmt_locs: Vec<CodeLoc>,
    pub pats: Vec<Pat>,
    pub funcs: Vec<FuncDef>,
    pub classes: Vec<ClassDef>,
    pub private_names: Vec<PrivateName>,
}

impl CodeStore {
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    pub fn stmt_loc(&self, id: StmtId) -> CodeLoc {
        self.stmt_locs[id.index()]
    }

    pub fn pat(&self, id: PatId) -> &Pat {
        &self.pats[id.index()]
    }

    pub fn func(&self, id: FuncId) -> &FuncDef {
        &self.funcs[id.index()]
    }

    pub fn class(&self, id: ClassId) -> &ClassDef {
        &self.classes[id.index()]
    }

    pub fn private_name(&self, id: PrivateId) -> PrivateName {
        self.private_names[id.index()]
    }

    /// The source text of a function definition, for
    /// `Function.prototype.toString`.
    pub fn func_source(&self, id: FuncId) -> &str {
        let def = self.func(id);
        let src = &self.sources[def.chunk.index()];
        &src[def.span.0 as usize..def.span.1 as usize]
    }

    pub fn add_expr(&mut self, expr: Expr) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(expr);
        id
    }

    pub fn add_stmt(&mut self, stmt: Stmt, loc: CodeLoc) -> StmtId {
        let id = StmtId(self.stmts.len() as u32);
        self.stmts.push(stmt);
        self.stmt_locs.push(loc);
        id
    }

    pub fn add_pat(&mut self, pat: Pat) -> PatId {
        let id = PatId(self.pats.len() as u32);
        self.pats.push(pat);
        id
    }

    pub fn add_func(&mut self, func: FuncDef) -> FuncId {
        let id = FuncId(self.funcs.len() as u32);
        self.funcs.push(func);
        id
    }

    pub fn add_class(&mut self, class: ClassDef) -> ClassId {
        let id = ClassId(self.classes.len() as u32);
        self.classes.push(class);
        id
    }

    pub fn add_private_name(&mut self, name: PrivateName) -> PrivateId {
        let id = PrivateId(self.private_names.len() as u32);
        self.private_names.push(name);
        id
    }

    pub fn add_chunk(&mut self, source: String) -> ChunkId {
        let id = ChunkId(self.sources.len() as u32);
        self.sources.push(source);
        id
    }
}
