//! Core language semantics: operators, coercion, control flow, scoping,
//! destructuring, and the statement grammar.

use jormun::{Interpreter, JsValue};
use pretty_assertions::assert_eq;

fn eval(src: &str) -> JsValue {
    Interpreter::new().eval(src).unwrap()
}

fn num(src: &str) -> f64 {
    match eval(src) {
        JsValue::Number(n) => n,
        other => panic!("expected number from {src}, got {other:?}"),
    }
}

fn s(src: &str) -> String {
    match eval(src) {
        JsValue::String(s) => s,
        other => panic!("expected string from {src}, got {other:?}"),
    }
}

#[test]
fn arithmetic_and_precedence() {
    assert_eq!(num("1 + 2 * 3"), 7.0);
    assert_eq!(num("(1 + 2) * 3"), 9.0);
    assert_eq!(num("10 % 3"), 1.0);
    assert_eq!(num("7 / 2"), 3.5);
    assert_eq!(num("2 ** 3 ** 2"), 512.0, "** is right-associative");
    assert_eq!(num("(-2) ** 3"), -8.0);
}

#[test]
fn unparenthesized_unary_before_exponent_is_rejected() {
    assert!(Interpreter::new().eval("-2 ** 3").is_err());
}

#[test]
fn string_concatenation_coerces() {
    assert_eq!(s("1 + '2'"), "12");
    assert_eq!(s("'v' + null"), "vnull");
    assert_eq!(s("'' + undefined"), "undefined");
    assert_eq!(num("'3' * '4'"), 12.0);
    assert_eq!(num("+'0x10'"), 16.0);
}

#[test]
fn abstract_equality_table() {
    assert_eq!(eval("null == undefined"), JsValue::Bool(true));
    assert_eq!(eval("null == 0"), JsValue::Bool(false));
    assert_eq!(eval("1 == '1'"), JsValue::Bool(true));
    assert_eq!(eval("true == 1"), JsValue::Bool(true));
    assert_eq!(eval("[1] == 1"), JsValue::Bool(true), "object to primitive");
    assert_eq!(eval("NaN == NaN"), JsValue::Bool(false));
    assert_eq!(eval("0 === -0"), JsValue::Bool(true));
    assert_eq!(eval("Object.is(0, -0)"), JsValue::Bool(false));
    assert_eq!(eval("Object.is(NaN, NaN)"), JsValue::Bool(true));
}

#[test]
fn bigint_arithmetic_and_mixing() {
    assert_eq!(s("(2n ** 64n).toString()"), "18446744073709551616");
    assert_eq!(eval("10n / 3n == 3n"), JsValue::Bool(true));
    assert!(Interpreter::new().eval("1n + 1").is_err(), "mixing BigInt and Number throws");
    assert_eq!(eval("2n < 3"), JsValue::Bool(true), "comparison crosses types");
    assert_eq!(eval("2n == 2"), JsValue::Bool(true));
    // cross-type comparison is by exact mathematical value, beyond 2^53
    assert_eq!(eval("9007199254740993n == 9007199254740992"), JsValue::Bool(false));
    assert_eq!(eval("9007199254740993n > 9007199254740992"), JsValue::Bool(true));
    assert_eq!(eval("3n > 2.5 && 2n < 2.5"), JsValue::Bool(true));
}

#[test]
fn logical_and_nullish_operators() {
    assert_eq!(num("null ?? 5"), 5.0);
    assert_eq!(num("0 ?? 5"), 0.0, "?? only checks nullish");
    assert_eq!(num("0 || 5"), 5.0);
    assert_eq!(num("1 && 2"), 2.0);
    assert_eq!(num("let a = null; a ??= 7; a"), 7.0);
    assert_eq!(num("let b = 1; b ||= 9; b"), 1.0);
    assert_eq!(num("let c = 1; c &&= 9; c"), 9.0);
}

#[test]
fn nullish_mixing_requires_parentheses() {
    assert!(Interpreter::new().eval("1 && 2 ?? 3").is_err());
    assert_eq!(num("(1 && 2) ?? 3"), 2.0);
}

#[test]
fn optional_chaining_short_circuits_whole_chain() {
    assert_eq!(eval("let o = null; o?.a.b.c"), JsValue::Undefined);
    assert_eq!(eval("let o = {}; o.missing?.deeply.nested"), JsValue::Undefined);
    assert_eq!(num("let o = {a: {b: 5}}; o?.a.b"), 5.0);
    assert_eq!(eval("let o = {}; o.f?.()"), JsValue::Undefined, "optional call");
}

#[test]
fn ternary_and_comma() {
    assert_eq!(s("true ? 'y' : 'n'"), "y");
    assert_eq!(num("(1, 2, 3)"), 3.0);
}

#[test]
fn typeof_operator() {
    assert_eq!(s("typeof 1"), "number");
    assert_eq!(s("typeof 'x'"), "string");
    assert_eq!(s("typeof undefined"), "undefined");
    assert_eq!(s("typeof null"), "object");
    assert_eq!(s("typeof {}"), "object");
    assert_eq!(s("typeof (() => 1)"), "function");
    assert_eq!(s("typeof 1n"), "bigint");
    assert_eq!(s("typeof Symbol()"), "symbol");
    assert_eq!(s("typeof neverDeclared"), "undefined", "typeof does not throw");
}

#[test]
fn bitwise_operators_are_int32() {
    assert_eq!(num("5 & 3"), 1.0);
    assert_eq!(num("5 | 3"), 7.0);
    assert_eq!(num("5 ^ 3"), 6.0);
    assert_eq!(num("~0"), -1.0);
    assert_eq!(num("1 << 31"), -2147483648.0);
    assert_eq!(num("-1 >>> 0"), 4294967295.0);
    assert_eq!(num("-8 >> 1"), -4.0);
}

#[test]
fn update_expressions() {
    assert_eq!(num("let i = 5; i++"), 5.0);
    assert_eq!(num("let i = 5; ++i"), 6.0);
    assert_eq!(num("let i = 5; i--; i"), 4.0);
    assert_eq!(num("let o = {n: 1}; o.n++; o.n"), 2.0);
}

#[test]
fn template_literals() {
    assert_eq!(s("let x = 6; `${x} * 7 = ${x * 7}`"), "6 * 7 = 42");
    assert_eq!(s("`outer ${`inner ${1 + 1}`}`"), "outer inner 2");
    assert_eq!(s("`multi\nline`"), "multi\nline");
}

#[test]
fn tagged_templates_get_cooked_and_raw() {
    let src = r"
function tag(strings, a) { return strings[0] + '|' + strings.raw[1] + '|' + a }
tag`x${42}y\n`
";
    assert_eq!(s(src), "x|y\\n|42");
}

#[test]
fn destructuring_declarations() {
    assert_eq!(num("const [a, b = 10, ...rest] = [1, undefined, 3, 4]; a + b + rest.length"), 13.0);
    assert_eq!(num("const {x, y: z = 2, ...others} = {x: 1, w: 5}; x + z + others.w"), 8.0);
    assert_eq!(num("const [{deep: [v]}] = [{deep: [9]}]; v"), 9.0);
    assert_eq!(num("let a, b; [a, b] = [b, a] = [1, 2]; a + b * 10"), 21.0);
    assert_eq!(num("const [x = 1] = []; x"), 1.0);
}

#[test]
fn destructuring_swap() {
    assert_eq!(s("let a = 'l', b = 'r'; [a, b] = [b, a]; a + b"), "rl");
}

#[test]
fn spread_in_calls_and_literals() {
    assert_eq!(num("Math.max(...[1, 9, 3])"), 9.0);
    assert_eq!(s("[0, ...[1, 2], 3].join('')"), "0123");
    assert_eq!(num("({...{a: 1}, b: 2}).a"), 1.0);
    assert!(Interpreter::new().eval("[...5]").is_err(), "spread of non-iterable");
}

#[test]
fn loops_and_labels() {
    assert_eq!(num("let s = 0; for (let i = 1; i <= 4; i++) s += i; s"), 10.0);
    assert_eq!(num("let n = 0; while (n < 5) n++; n"), 5.0);
    assert_eq!(num("let n = 0; do { n++ } while (false); n"), 1.0);
    let labeled = r"
let hits = 0;
outer: for (let i = 0; i < 3; i++) {
  for (let j = 0; j < 3; j++) {
    if (j === 1) continue outer;
    hits++;
  }
}
hits";
    assert_eq!(num(labeled), 3.0);
    let brk = r"
let last = 0;
outer: for (let i = 0; i < 10; i++) {
  for (let j = 0; j < 10; j++) {
    last = i * 10 + j;
    if (i === 1 && j === 2) break outer;
  }
}
last";
    assert_eq!(num(brk), 12.0);
}

#[test]
fn for_in_enumerates_string_keys() {
    assert_eq!(s("let out = []; for (const k in {a: 1, b: 2}) out.push(k); out.join(',')"), "a,b");
    // inherited enumerables appear after own keys
    let src = r"
const base = {inherited: 1};
const obj = Object.create(base);
obj.own = 2;
let out = [];
for (const k in obj) out.push(k);
out.join(',')";
    assert_eq!(s(src), "own,inherited");
}

#[test]
fn for_of_iterates_values() {
    assert_eq!(num("let t = 0; for (const v of [1, 2, 3]) t += v; t"), 6.0);
    assert_eq!(s("let out = ''; for (const c of 'abc') out += c + '.'; out"), "a.b.c.");
}

#[test]
fn switch_matching_and_fallthrough() {
    let src = r"
function f(x) {
  switch (x) {
    case 1: return 'one';
    case 2:
    case 3: return 'few';
    default: return 'many';
  }
}
f(1) + ',' + f(2) + ',' + f(3) + ',' + f(9)";
    assert_eq!(s(src), "one,few,few,many");
    assert_eq!(num("let r = 0; switch (2) { case 1: r += 1; case 2: r += 2; case 3: r += 4; } r"), 6.0);
}

#[test]
fn try_catch_finally_paths() {
    assert_eq!(s("let log = ''; try { log += 't'; throw 1 } catch { log += 'c' } finally { log += 'f' } log"), "tcf");
    assert_eq!(
        s("function f() { try { return 'try' } finally { } } f()"),
        "try"
    );
    // finally replaces the pending completion
    assert_eq!(
        s("function f() { try { return 'a' } finally { return 'b' } } f()"),
        "b"
    );
    assert_eq!(num("let n = 0; for (let i = 0; i < 3; i++) { try { continue } finally { n++ } } n"), 3.0);
    // ES2019 optional catch binding
    assert_eq!(num("let n = 0; try { throw 'x' } catch { n = 1 } n"), 1.0);
}

#[test]
fn tdz_and_const_rules() {
    let err = Interpreter::new().eval("{ x; let x = 1; }").unwrap_err();
    assert_eq!(err.kind, Some(jormun::ExcKind::ReferenceError));
    let err = Interpreter::new().eval("const c = 1; c = 2;").unwrap_err();
    assert_eq!(err.kind, Some(jormun::ExcKind::TypeError));
    // const contents stay mutable
    assert_eq!(num("const o = {n: 1}; o.n = 5; o.n"), 5.0);
}

#[test]
fn var_hoisting_and_function_scope() {
    assert_eq!(eval("function f() { return v; var v = 1 } f()"), JsValue::Undefined);
    assert_eq!(num("function f() { { var v = 7 } return v } f()"), 7.0);
    assert_eq!(num("function f() { return g(); function g() { return 3 } } f()"), 3.0);
}

#[test]
fn block_scoping_and_shadowing() {
    assert_eq!(num("let x = 1; { let x = 2; } x"), 1.0);
    // per-iteration let bindings are captured individually
    let src = r"
const fns = [];
for (let i = 0; i < 3; i++) fns.push(() => i);
fns[0]() + fns[1]() + fns[2]()";
    assert_eq!(num(src), 3.0);
}

#[test]
fn strict_mode_assignment_to_undeclared_throws() {
    let err = Interpreter::new().eval("'use strict'; undeclaredTarget = 5;").unwrap_err();
    assert_eq!(err.kind, Some(jormun::ExcKind::ReferenceError));
    // sloppy mode creates a global
    assert_eq!(num("sloppyTarget = 5; sloppyTarget"), 5.0);
}

#[test]
fn in_and_instanceof() {
    assert_eq!(eval("'a' in {a: 1}"), JsValue::Bool(true));
    assert_eq!(eval("0 in [7]"), JsValue::Bool(true));
    assert_eq!(eval("[] instanceof Array"), JsValue::Bool(true));
    assert_eq!(eval("[] instanceof Object"), JsValue::Bool(true));
    assert_eq!(eval("({}) instanceof Array"), JsValue::Bool(false));
}

#[test]
fn asi_inserts_and_withholds() {
    assert_eq!(num("let a = 1\nlet b = 2\na + b"), 3.0);
    // restricted production: return followed by a newline returns undefined
    assert_eq!(eval("function f() { return\n5 } f()"), JsValue::Undefined);
}

#[test]
fn getter_setter_and_proto_in_literals() {
    assert_eq!(num("const o = {get six() { return 6 }}; o.six"), 6.0);
    assert_eq!(
        eval("const p = {greet() { return 1 }}; const o = {__proto__: p}; o.greet()"),
        JsValue::Number(1.0)
    );
    assert_eq!(num("const k = 'dyn'; const o = {[k + 'amic']: 4}; o.dynamic"), 4.0);
}

#[test]
fn numeric_literals() {
    assert_eq!(num("0x10 + 0o10 + 0b10"), 26.0);
    assert_eq!(num("1_000_000"), 1_000_000.0);
    assert_eq!(num("0.1 + 0.2"), 0.1 + 0.2);
}

#[test]
fn hashbang_is_ignored() {
    assert_eq!(num("#!/usr/bin/env jormun\n40 + 2"), 42.0);
}
