//! The module loader: resolver/loader callbacks, module records, linking
//! with live bindings, cyclic and top-level-await evaluation, namespace
//! objects, `import.meta`, and dynamic `import()`.
//!
//! Lifecycle per module: fetch source, parse, recursively register
//! dependencies (cycles allowed), link (bindings hoisted into the module
//! scope; imports become indirections into the exporter), then evaluate.
//! A module containing top-level `await` evaluates as a coroutine and its
//! record carries the evaluation promise; dependents wait through the
//! microtask queue.

use ahash::AHashMap;

use crate::{
    ast::{Stmt, StmtId},
    coroutine::{AsyncRun, CoroDone},
    env::{Binding, FnScopeData, Scope, ScopeKind, ThisState},
    error::{CodeLoc, ExcKind, RunError, RunResult, SimpleException},
    heap::{HeapData, HeapId},
    intern::{StaticStrings, StringId},
    jobs::{PromiseState, Reaction},
    machine::{Exit, Frame, FrameKind, Interp, Machine, MachineKind, ProgramId},
    object::{JsObject, Key, ObjectKind, Property},
    parser,
    value::Value,
};

/// Identifies a module record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub(crate) struct ModuleId(pub u32);

/// Where an exported name's value lives.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ExportTarget {
    /// A binding in this module's own scope.
    Local(StringId),
    /// Re-export: the exporter's exported name.
    Indirect { module: ModuleId, name: StringId },
    /// `export * as ns from "m"`.
    Namespace(ModuleId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ModuleStatus {
    /// Parsed, dependencies registered.
    Registered,
    /// Scope created, bindings hoisted, exports resolved.
    Linked,
    /// Body running (or waiting on an async cycle edge).
    Evaluating,
    /// Waiting for async dependencies to settle.
    WaitingDeps,
    Evaluated,
    Failed,
}

#[derive(Debug)]
pub(crate) struct ModuleRecord {
    /// The resolver-produced module id (also `import.meta.url`).
    pub key: String,
    pub status: ModuleStatus,
    pub program: ProgramId,
    pub scope: Option<HeapId>,
    pub namespace: Option<HeapId>,
    pub meta: Option<HeapId>,
    /// Static dependencies: specifier -> module.
    pub requests: AHashMap<StringId, ModuleId>,
    pub deps: Vec<ModuleId>,
    pub exports: AHashMap<StringId, ExportTarget>,
    pub star_exports: Vec<ModuleId>,
    /// Evaluation promise; present for TLA modules and async-dependent ones.
    pub eval_promise: Option<HeapId>,
    /// Unsettled async dependencies.
    pub pending_deps: usize,
    /// The stored failure for re-imports of a failed module.
    pub failure: Option<Value>,
}

type ResolverFn = dyn Fn(&str, Option<&str>) -> Result<String, String>;
type LoaderFn = dyn FnMut(&str) -> Result<String, String>;

/// All module state plus the host callbacks.
#[derive(Default)]
pub(crate) struct ModuleRegistry {
    pub records: Vec<ModuleRecord>,
    pub by_key: AHashMap<String, ModuleId>,
    pub resolver: Option<Box<ResolverFn>>,
    pub loader: Option<Box<LoaderFn>>,
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("records", &self.records)
            .field("resolver", &self.resolver.is_some())
            .field("loader", &self.loader.is_some())
            .finish()
    }
}

impl ModuleRegistry {
    pub fn get(&self, id: ModuleId) -> &ModuleRecord {
        &self.records[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: ModuleId) -> &mut ModuleRecord {
        &mut self.records[id.0 as usize]
    }
}

impl Interp {
    fn module_error(&self, message: String) -> RunError {
        RunError::Simple(SimpleException::new(ExcKind::Error, message))
    }

    /// Resolves and loads a module (and, recursively, its static
    /// dependencies), returning its record id. Cached by key.
    pub(crate) fn load_module(&mut self, specifier: &str, importer: Option<&str>) -> RunResult<ModuleId> {
        let key = match &self.modules.resolver {
            Some(resolver) => resolver(specifier, importer)
                .map_err(|e| self.module_error(format!("Cannot resolve module '{specifier}': {e}")))?,
            None => specifier.to_owned(),
        };
        if let Some(id) = self.modules.by_key.get(&key) {
            return Ok(*id);
        }
        let source = match &mut self.modules.loader {
            Some(loader) => {
                loader(&key).map_err(|e| self.module_error(format!("Cannot load module '{key}': {e}")))?
            }
            None => return Err(self.module_error(format!("No module loader registered (importing '{key}')"))),
        };
        let info = parser::parse_program(&source, true, &mut self.code, &mut self.interns)?;
        let program = self.add_program(info);
        let id = ModuleId(self.modules.records.len() as u32);
        self.modules.records.push(ModuleRecord {
            key: key.clone(),
            status: ModuleStatus::Registered,
            program,
            scope: None,
            namespace: None,
            meta: None,
            requests: AHashMap::new(),
            deps: Vec::new(),
            exports: AHashMap::new(),
            star_exports: Vec::new(),
            eval_promise: None,
            pending_deps: 0,
            failure: None,
        });
        self.modules.by_key.insert(key.clone(), id);
        // register dependencies (cycles hit the cache above)
        let specifiers = self.module_specifiers(program);
        for spec in specifiers {
            let spec_str = self.interns.str(spec).to_owned();
            let dep = self.load_module(&spec_str, Some(&key))?;
            let record = self.modules.get_mut(id);
            record.requests.insert(spec, dep);
            if !record.deps.contains(&dep) {
                record.deps.push(dep);
            }
        }
        self.link_module(id)?;
        Ok(id)
    }

    /// The static import/export specifiers of a parsed module body.
    fn module_specifiers(&self, program: ProgramId) -> Vec<StringId> {
        let mut out = Vec::new();
        for &stmt in &self.programs[program.0 as usize].body {
            match self.code.stmt(stmt) {
                Stmt::Import(decl) => out.push(decl.specifier),
                Stmt::ExportNamed { from: Some(spec), .. } => out.push(*spec),
                Stmt::ExportAll { from, .. } => out.push(*from),
                _ => {}
            }
        }
        out
    }

    /// Creates the module scope, hoists bindings, wires imports to their
    /// exporters, and builds the export table.
    fn link_module(&mut self, id: ModuleId) -> RunResult<()> {
        let program = self.modules.get(id).program;
        let scope_data = Scope::new(
            Some(self.realm.global_scope),
            ScopeKind::Module(id, FnScopeData::new(ThisState::Bound(Value::Undefined), Value::Undefined)),
        );
        let scope = self.heap.alloc(HeapData::Scope(scope_data))?;
        self.modules.get_mut(id).scope = Some(scope);

        // hoist vars, functions, lexicals
        let info = &self.programs[program.0 as usize];
        let var_names = info.var_names.clone();
        let fn_decls = info.fn_decls.clone();
        let lex = info.lex.clone();
        let body: Vec<StmtId> = info.body.clone();
        for name in var_names {
            self.heap.scope_mut(scope).bindings.insert(name, Binding::var(Value::Undefined));
        }
        for (name, func) in fn_decls {
            let closure = self.make_closure(func, scope, Some(name))?;
            self.heap.scope_mut(scope).bindings.insert(name, Binding::var(closure));
        }
        for decl in lex {
            let binding = if decl.is_const { Binding::uninit_const() } else { Binding::uninit_let() };
            self.heap.scope_mut(scope).bindings.insert(decl.name, binding);
        }

        // imports and the export table
        for stmt in body {
            match self.code.stmt(stmt) {
                Stmt::Import(decl) => {
                    let dep = self.modules.get(id).requests[&decl.specifier];
                    let default = decl.default;
                    let namespace = decl.namespace;
                    let named = decl.named.clone();
                    if let Some(local) = default {
                        self.heap.scope_mut(scope).bindings.insert(
                            local,
                            Binding::Indirect { module: dep, name: StaticStrings::DefaultExport.id() },
                        );
                    }
                    for name in named {
                        self.heap.scope_mut(scope).bindings.insert(
                            name.local,
                            Binding::Indirect { module: dep, name: name.imported },
                        );
                    }
                    if let Some(local) = namespace {
                        let ns = self.module_namespace(dep)?;
                        self.heap.scope_mut(scope).bindings.insert(local, Binding::var(Value::Ref(ns)));
                    }
                }
                Stmt::ExportDefault(_) => {
                    let name = StaticStrings::DefaultExport.id();
                    self.heap.scope_mut(scope).bindings.insert(name, Binding::uninit_const());
                    self.modules.get_mut(id).exports.insert(name, ExportTarget::Local(name));
                }
                Stmt::ExportNamed { specifiers, from } => {
                    let specifiers = specifiers.clone();
                    let from = *from;
                    match from {
                        None => {
                            for s in specifiers {
                                self.modules
                                    .get_mut(id)
                                    .exports
                                    .insert(s.exported, ExportTarget::Local(s.local));
                            }
                        }
                        Some(spec) => {
                            let dep = self.modules.get(id).requests[&spec];
                            for s in specifiers {
                                self.modules.get_mut(id).exports.insert(
                                    s.exported,
                                    ExportTarget::Indirect { module: dep, name: s.local },
                                );
                            }
                        }
                    }
                }
                Stmt::ExportAll { from, alias } => {
                    let alias = *alias;
                    let dep = self.modules.get(id).requests[from];
                    match alias {
                        Some(name) => {
                            self.modules.get_mut(id).exports.insert(name, ExportTarget::Namespace(dep));
                        }
                        None => self.modules.get_mut(id).star_exports.push(dep),
                    }
                }
                Stmt::ExportDecl(inner) => {
                    let mut names = Vec::new();
                    self.export_decl_names(*inner, &mut names);
                    for name in names {
                        self.modules.get_mut(id).exports.insert(name, ExportTarget::Local(name));
                    }
                }
                _ => {}
            }
        }
        self.modules.get_mut(id).status = ModuleStatus::Linked;
        Ok(())
    }

    fn export_decl_names(&self, stmt: StmtId, out: &mut Vec<StringId>) {
        match self.code.stmt(stmt) {
            Stmt::VarDecl { decls, .. } => {
                let mut lex = Vec::new();
                for (pat, _) in decls {
                    parser::collect_pat_names(&self.code, *pat, false, &mut lex);
                }
                out.extend(lex.into_iter().map(|d| d.name));
            }
            Stmt::Func { name, .. } | Stmt::Class { name, .. } => out.push(*name),
            _ => {}
        }
    }

    /// Evaluates a module; `Some(promise)` when completion is asynchronous.
    pub(crate) fn evaluate_module(&mut self, id: ModuleId) -> RunResult<Option<HeapId>> {
        match self.modules.get(id).status {
            ModuleStatus::Evaluated => Ok(self.modules.get(id).eval_promise),
            ModuleStatus::Failed => {
                let reason = self.modules.get(id).failure.unwrap_or(Value::Undefined);
                Err(RunError::Throw(reason))
            }
            ModuleStatus::Evaluating | ModuleStatus::WaitingDeps => Ok(self.modules.get(id).eval_promise),
            ModuleStatus::Registered => Err(self.module_error(format!(
                "module '{}' evaluated before linking",
                self.modules.get(id).key
            ))),
            ModuleStatus::Linked => {
                self.modules.get_mut(id).status = ModuleStatus::Evaluating;
                let deps = self.modules.get(id).deps.clone();
                let mut pending = Vec::new();
                for dep in deps {
                    if let Some(p) = self.evaluate_module(dep)?
                        && self.promise_state(p) == PromiseState::Pending
                    {
                        pending.push(p);
                    }
                }
                if pending.is_empty() {
                    return self.run_module_body(id);
                }
                let promise = self.make_pending_promise()?;
                let record = self.modules.get_mut(id);
                record.eval_promise = Some(promise);
                record.pending_deps = pending.len();
                record.status = ModuleStatus::WaitingDeps;
                for p in pending {
                    self.register_reaction(p, Reaction::ModuleDep { module: id });
                }
                Ok(Some(promise))
            }
        }
    }

    /// Runs the module body itself, as a coroutine when it contains
    /// top-level await.
    fn run_module_body(&mut self, id: ModuleId) -> RunResult<Option<HeapId>> {
        let record = self.modules.get(id);
        let (program, scope, existing_promise) = (record.program, record.scope, record.eval_promise);
        let scope = scope.expect("linked module has a scope");
        let has_tla = self.programs[program.0 as usize].has_tla;
        let mut machine = Machine::empty(MachineKind::Module, scope);
        machine.frames.push(Frame {
            ctrl_base: 0,
            vals_base: 0,
            caller_env: scope,
            func: None,
            strict: true,
            kind: FrameKind::Module,
            loc: CodeLoc { line: 1, column: 1 },
        });
        machine.ctrl.push(crate::machine::Step::Seq {
            list: crate::machine::StmtListRef::Program(program),
            idx: 0,
        });
        if has_tla {
            let promise = match existing_promise {
                Some(p) => p,
                None => self.make_pending_promise()?,
            };
            self.modules.get_mut(id).eval_promise = Some(promise);
            let coro = self.coros.insert(AsyncRun {
                machine: Some(Box::new(machine)),
                promise,
                done: CoroDone::Module(id),
            });
            self.drive_coroutine(coro, None)?;
            return Ok(Some(promise));
        }
        match self.run_machine(&mut machine) {
            Ok(Exit::Done(_)) => {
                self.modules.get_mut(id).status = ModuleStatus::Evaluated;
                if let Some(p) = existing_promise {
                    self.resolve_promise(p, Value::Undefined)?;
                }
                Ok(existing_promise)
            }
            Ok(_) => unreachable!("module machine without TLA cannot suspend"),
            Err(err) => {
                if !err.is_catchable() {
                    return Err(err);
                }
                let reason = self.exception_value(err)?;
                let record = self.modules.get_mut(id);
                record.status = ModuleStatus::Failed;
                record.failure = Some(reason);
                if let Some(p) = existing_promise {
                    self.reject_promise(p, reason)?;
                    Ok(existing_promise)
                } else {
                    Err(RunError::Throw(reason))
                }
            }
        }
    }

    /// One async dependency of a waiting module settled.
    pub(crate) fn module_dep_settled(&mut self, id: ModuleId, rejected: bool, value: Value) -> RunResult<()> {
        if rejected {
            let record = self.modules.get_mut(id);
            record.status = ModuleStatus::Failed;
            record.failure = Some(value);
            if let Some(p) = record.eval_promise {
                self.reject_promise(p, value)?;
            }
            return Ok(());
        }
        let record = self.modules.get_mut(id);
        record.pending_deps = record.pending_deps.saturating_sub(1);
        if record.pending_deps == 0 && record.status == ModuleStatus::WaitingDeps {
            record.status = ModuleStatus::Evaluating;
            self.run_module_body(id)?;
        }
        Ok(())
    }

    /// A TLA module's coroutine settled its promise.
    pub(crate) fn module_eval_finished(&mut self, id: ModuleId) -> RunResult<()> {
        let promise = self.modules.get(id).eval_promise;
        let status = match promise.map(|p| self.promise_state(p)) {
            Some(PromiseState::Rejected(reason)) => {
                self.modules.get_mut(id).failure = Some(reason);
                ModuleStatus::Failed
            }
            _ => ModuleStatus::Evaluated,
        };
        self.modules.get_mut(id).status = status;
        Ok(())
    }

    // === binding access ===

    /// Reads a module's export by its exported name (live binding).
    pub(crate) fn read_module_binding(&mut self, id: ModuleId, exported: StringId) -> RunResult<Value> {
        match self.lookup_export(id, exported)? {
            Some(v) => Ok(v),
            None => Err(RunError::Simple(SimpleException::new(
                ExcKind::SyntaxError,
                format!(
                    "The requested module '{}' does not provide an export named '{}'",
                    self.modules.get(id).key,
                    self.interns.str(exported)
                ),
            ))),
        }
    }

    fn lookup_export(&mut self, id: ModuleId, exported: StringId) -> RunResult<Option<Value>> {
        let target = self.modules.get(id).exports.get(&exported).copied();
        match target {
            Some(ExportTarget::Local(local)) => {
                let scope = self.modules.get(id).scope.expect("linked module");
                match self.heap.scope(scope).bindings.get(&local) {
                    Some(Binding::Slot { initialized: false, .. }) => Err(RunError::reference_err(format!(
                        "Cannot access '{}' before initialization",
                        self.interns.str(local)
                    ))),
                    Some(Binding::Slot { value, .. }) => Ok(Some(*value)),
                    Some(Binding::Indirect { module, name }) => {
                        let (module, name) = (*module, *name);
                        self.read_module_binding(module, name).map(Some)
                    }
                    None => Ok(Some(Value::Undefined)),
                }
            }
            Some(ExportTarget::Indirect { module, name }) => self.lookup_export(module, name),
            Some(ExportTarget::Namespace(module)) => {
                let ns = self.module_namespace(module)?;
                Ok(Some(Value::Ref(ns)))
            }
            None => {
                let stars = self.modules.get(id).star_exports.clone();
                for star in stars {
                    if let Some(v) = self.lookup_export(star, exported)? {
                        return Ok(Some(v));
                    }
                }
                Ok(None)
            }
        }
    }

    pub(crate) fn module_has_export(&self, id: ModuleId, name: StringId) -> bool {
        let record = self.modules.get(id);
        if record.exports.contains_key(&name) {
            return true;
        }
        record
            .star_exports
            .iter()
            .any(|star| self.module_has_export(*star, name))
    }

    /// Namespace-object property read (exotic hook).
    pub(crate) fn module_namespace_get(&mut self, id: ModuleId, name: StringId) -> RunResult<Option<Value>> {
        if !self.module_has_export(id, name) {
            return Ok(None);
        }
        self.lookup_export(id, name)
    }

    /// The (cached) namespace exotic object.
    pub(crate) fn module_namespace(&mut self, id: ModuleId) -> RunResult<HeapId> {
        if let Some(ns) = self.modules.get(id).namespace {
            return Ok(ns);
        }
        let obj = JsObject::new(None, ObjectKind::ModuleNamespace(id));
        let ns = self.heap.alloc(HeapData::Object(obj))?;
        self.modules.get_mut(id).namespace = Some(ns);
        Ok(ns)
    }

    /// `import.meta` for the module governing the current scope chain.
    pub(crate) fn resolve_import_meta(&mut self, m: &Machine) -> RunResult<Value> {
        let Some(id) = self.current_module(m) else {
            return Err(RunError::syntax_err("import.meta is only valid inside a module"));
        };
        if let Some(meta) = self.modules.get(id).meta {
            return Ok(Value::Ref(meta));
        }
        let key = self.modules.get(id).key.clone();
        let mut obj = JsObject::new(None, ObjectKind::Ordinary);
        let url = Value::string(&mut self.heap, key)?;
        obj.define(Key::Str(StaticStrings::Url.id()), Property::data(url));
        let meta = self.heap.alloc(HeapData::Object(obj))?;
        self.modules.get_mut(id).meta = Some(meta);
        Ok(Value::Ref(meta))
    }

    fn current_module(&self, m: &Machine) -> Option<ModuleId> {
        let mut cur = Some(m.env);
        while let Some(id) = cur {
            let scope = self.heap.scope(id);
            if let ScopeKind::Module(mid, _) = &scope.kind {
                return Some(*mid);
            }
            cur = scope.parent;
        }
        None
    }

    /// Dynamic `import(specifier)`: returns a promise for the namespace.
    pub(crate) fn step_dynamic_import(&mut self, m: &Machine, spec: Value) -> RunResult<Value> {
        let result = self.make_pending_promise()?;
        let spec = match self.to_string_rust(spec) {
            Ok(s) => s,
            Err(err) => {
                let reason = self.exception_value(err)?;
                self.reject_promise(result, reason)?;
                return Ok(Value::Ref(result));
            }
        };
        let importer = self.current_module(m).map(|id| self.modules.get(id).key.clone());
        let outcome = self
            .load_module(&spec, importer.as_deref())
            .and_then(|id| Ok((id, self.evaluate_module(id)?)));
        match outcome {
            Err(err) => {
                if !err.is_catchable() {
                    return Err(err);
                }
                let reason = self.exception_value(err)?;
                self.reject_promise(result, reason)?;
            }
            Ok((id, None)) => {
                let ns = self.module_namespace(id)?;
                self.resolve_promise(result, Value::Ref(ns))?;
            }
            Ok((id, Some(eval_promise))) => {
                self.register_reaction(eval_promise, Reaction::DynamicImport { module: id, result });
            }
        }
        Ok(Value::Ref(result))
    }

    /// A dynamically imported module's evaluation settled.
    pub(crate) fn dynamic_import_settled(
        &mut self,
        module: ModuleId,
        result: HeapId,
        rejected: bool,
        value: Value,
    ) -> RunResult<()> {
        if rejected {
            self.reject_promise(result, value)
        } else {
            let ns = self.module_namespace(module)?;
            self.resolve_promise(result, Value::Ref(ns))
        }
    }
}
