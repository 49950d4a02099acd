//! The module loader: resolver/loader callbacks, named/default/namespace
//! imports, live bindings, cycles, dynamic import, and top-level await.

use std::collections::HashMap;

use jormun::{Interpreter, JsValue};
use pretty_assertions::assert_eq;

/// An interpreter wired to an in-memory module map.
fn with_modules(modules: &[(&str, &str)]) -> Interpreter {
    let map: HashMap<String, String> = modules
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    let mut interp = Interpreter::new();
    interp.set_module_resolver(|specifier, _importer| Ok(specifier.to_owned()));
    interp.set_module_loader(move |id| {
        map.get(id).cloned().ok_or_else(|| format!("unknown module {id}"))
    });
    interp
}

#[test]
fn named_and_default_imports() {
    let mut interp = with_modules(&[
        ("math", "export const pi = 3; export function twice(x) { return x * 2 } export default 'dflt';"),
        (
            "main",
            "import dflt, {pi, twice as dbl} from 'math'; export const out = dflt + ':' + dbl(pi);",
        ),
    ]);
    let v = interp.eval_async("import('main').then(m => m.out)").unwrap();
    assert_eq!(v, JsValue::String("dflt:6".to_owned()));
}

#[test]
fn namespace_imports_expose_all_exports() {
    let mut interp = with_modules(&[
        ("lib", "export const a = 1; export const b = 2;"),
        ("main", "import * as ns from 'lib'; export const sum = ns.a + ns.b;"),
    ]);
    let v = interp.eval_async("import('main').then(m => m.sum)").unwrap();
    assert_eq!(v, JsValue::Number(3.0));
}

#[test]
fn live_bindings_observe_exporter_mutation() {
    let mut interp = with_modules(&[
        ("counter", "export let n = 1; export function bump() { n += 1 }"),
        ("main", "import {n, bump} from 'counter'; bump(); bump(); export const seen = n;"),
    ]);
    let v = interp.eval_async("import('main').then(m => m.seen)").unwrap();
    assert_eq!(v, JsValue::Number(3.0));
}

#[test]
fn module_cache_evaluates_once() {
    let mut interp = with_modules(&[
        ("tracked", "globalThis.evals = (globalThis.evals ?? 0) + 1; export const x = 1;"),
        ("a", "import {x} from 'tracked'; export const ax = x;"),
        ("b", "import {x} from 'tracked'; export const bx = x;"),
        ("main", "import {ax} from 'a'; import {bx} from 'b'; export const total = ax + bx;"),
    ]);
    let v = interp.eval_async("import('main').then(m => m.total)").unwrap();
    assert_eq!(v, JsValue::Number(2.0));
    assert_eq!(interp.eval("globalThis.evals").unwrap(), JsValue::Number(1.0));
}

#[test]
fn cycles_resolve_with_hoisted_bindings() {
    let mut interp = with_modules(&[
        ("a", "import {bname} from 'b'; export var aname = 'A'; export var fromB = bname;"),
        ("b", "import {aname} from 'a'; export var bname = 'B' + (aname === undefined ? '?' : aname);"),
    ]);
    let v = interp.eval_async("import('a').then(m => m.fromB)").unwrap();
    assert_eq!(v, JsValue::String("B?".to_owned()));
}

#[test]
fn function_exports_work_across_cycles() {
    let mut interp = with_modules(&[
        ("even", "import {isOdd} from 'odd'; export function isEven(n) { return n === 0 || isOdd(n - 1) }"),
        ("odd", "import {isEven} from 'even'; export function isOdd(n) { return n !== 0 && isEven(n - 1) }"),
        ("main", "import {isEven} from 'even'; export const result = isEven(10);"),
    ]);
    let v = interp.eval_async("import('main').then(m => m.result)").unwrap();
    assert_eq!(v, JsValue::Bool(true));
}

#[test]
fn re_exports_and_star_exports() {
    let mut interp = with_modules(&[
        ("base", "export const v = 'base-v'; export const w = 'base-w';"),
        ("hub", "export {v as renamed} from 'base'; export * from 'base';"),
        ("main", "import {renamed, w} from 'hub'; export const out = renamed + '+' + w;"),
    ]);
    let v = interp.eval_async("import('main').then(m => m.out)").unwrap();
    assert_eq!(v, JsValue::String("base-v+base-w".to_owned()));
}

#[test]
fn import_meta_url_is_the_module_id() {
    let mut interp = with_modules(&[("whoami", "export const me = import.meta.url;")]);
    let v = interp.eval_async("import('whoami').then(m => m.me)").unwrap();
    assert_eq!(v, JsValue::String("whoami".to_owned()));
}

#[test]
fn top_level_await_delays_dependents() {
    let mut interp = with_modules(&[
        ("slow", "export const v = await Promise.resolve(41);"),
        ("main", "import {v} from 'slow'; export const out = v + 1;"),
    ]);
    let v = interp.eval_async("import('main').then(m => m.out)").unwrap();
    assert_eq!(v, JsValue::Number(42.0));
}

#[test]
fn preload_module_evaluates_eagerly() {
    let mut interp = with_modules(&[("boot", "globalThis.booted = true; export const ok = 1;")]);
    interp.preload_module("boot").unwrap();
    assert_eq!(interp.eval("globalThis.booted").unwrap(), JsValue::Bool(true));
}

#[test]
fn preload_surfaces_module_failures() {
    let mut interp = with_modules(&[("bad", "throw new RangeError('module exploded');")]);
    let err = interp.preload_module("bad").unwrap_err();
    assert_eq!(err.kind, Some(jormun::ExcKind::RangeError));
}

#[test]
fn missing_export_is_an_error() {
    let mut interp = with_modules(&[
        ("lib", "export const real = 1;"),
        ("main", "import {phantom} from 'lib'; export const out = phantom;"),
    ]);
    let err = interp.eval_async("import('main').then(m => m.out)").unwrap_err();
    assert_eq!(err.kind, Some(jormun::ExcKind::SyntaxError));
}

#[test]
fn dynamic_import_rejects_unknown_modules() {
    let mut interp = with_modules(&[]);
    let v = interp
        .eval_async("import('nowhere').then(() => 'loaded', e => 'failed')")
        .unwrap();
    assert_eq!(v, JsValue::String("failed".to_owned()));
}

#[test]
fn import_declarations_outside_modules_are_syntax_errors() {
    let err = Interpreter::new().eval("import {x} from 'y';").unwrap_err();
    assert_eq!(err.kind, Some(jormun::ExcKind::SyntaxError));
}
