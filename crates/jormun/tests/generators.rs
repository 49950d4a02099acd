//! Generators: the re-entrant coroutine protocol, value injection,
//! `return`/`throw` resumption, and `yield*` delegation.

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
fn next_injects_the_yield_expression_value() {
    let src = r"
function* g() {
  const a = yield 'first';
  const b = yield a + '-second';
  return b + '-end';
}
const it = g();
const r1 = it.next().value;
const r2 = it.next('A').value;
const r3 = it.next('B').value;
r1 + '|' + r2 + '|' + r3";
    assert_eq!(s(src), "first|A-second|B-end");
}

#[test]
fn generators_suspend_mid_loop() {
    let src = r"
function* naturals() { let n = 0; while (true) yield n++; }
const it = naturals();
it.next(); it.next();
it.next().value";
    assert_eq!(num(src), 2.0);
}

#[test]
fn early_return_runs_finally_blocks() {
    let src = r"
let log = '';
function* g() {
  try { yield 1; yield 2; } finally { log += 'cleanup'; }
}
const it = g();
it.next();
const r = it.return(99);
log + ':' + r.value + ':' + r.done";
    assert_eq!(s(src), "cleanup:99:true");
}

#[test]
fn throw_resumes_at_the_yield_site() {
    let src = r"
function* g() {
  try { yield 'a'; } catch (e) { yield 'caught:' + e; }
  yield 'after';
}
const it = g();
it.next();
it.throw('boom').value + '|' + it.next().value";
    assert_eq!(s(src), "caught:boom|after");
}

#[test]
fn throw_into_unguarded_generator_propagates() {
    let err = Interpreter::new()
        .eval("function* g() { yield 1 } const it = g(); it.next(); it.throw(new TypeError('x'))")
        .unwrap_err();
    assert_eq!(err.kind, Some(jormun::ExcKind::TypeError));
}

#[test]
fn yield_star_delegates_and_collects_the_inner_return() {
    let src = r"
function* inner() { yield 1; yield 2; return 'inner-done'; }
function* outer() {
  const got = yield* inner();
  yield got;
}
[...outer()].join(',')";
    assert_eq!(s(src), "1,2,inner-done");
}

#[test]
fn yield_star_forwards_injected_values() {
    let src = r"
function* inner() { const v = yield 'from-inner'; yield 'saw:' + v; }
function* outer() { yield* inner(); }
const it = outer();
it.next();
it.next('hello').value";
    assert_eq!(s(src), "saw:hello");
}

#[test]
fn generators_are_iterable_everywhere() {
    assert_eq!(num("function* g() { yield 1; yield 2; yield 3 } let t = 0; for (const v of g()) t += v; t"), 6.0);
    assert_eq!(num("function* g() { yield 4; yield 5 } Math.max(...g())"), 5.0);
    assert_eq!(num("function* g() { yield 7; yield 8 } const [, b] = g(); b"), 8.0);
}

#[test]
fn generator_state_guards() {
    // resuming a running generator is a TypeError
    let err = Interpreter::new()
        .eval("let it; function* g() { it.next() } it = g(); it.next()")
        .unwrap_err();
    assert_eq!(err.kind, Some(jormun::ExcKind::TypeError));
}

#[test]
fn yield_inside_expressions_and_arguments() {
    let src = r"
function* g() { return (yield 1) + (yield 2); }
const it = g();
it.next(); it.next(10);
it.next(20).value";
    assert_eq!(num(src), 30.0);
}

#[test]
fn yield_in_destructuring_default() {
    let src = r"
function* g() { const [a = yield 'need'] = [undefined]; yield 'got:' + a; }
const it = g();
const ask = it.next().value;
ask + '|' + it.next('X').value";
    assert_eq!(s(src), "need|got:X");
}

#[test]
fn generator_methods_count_toward_object_literals_and_classes() {
    assert_eq!(s("const o = { *pair() { yield 'l'; yield 'r'; } }; [...o.pair()].join('+')"), "l+r");
    assert_eq!(s("class C { *walk() { yield 'a'; yield 'b'; } } [...new C().walk()].join('')"), "ab");
}

#[test]
fn async_generators_drive_for_await() {
    let mut interp = Interpreter::new();
    let src = r"
async function* stream() { yield 1; yield await Promise.resolve(2); yield 3; }
async function consume() {
  let total = 0;
  for await (const v of stream()) total += v;
  return total;
}
consume()";
    assert_eq!(interp.eval_async(src).unwrap(), JsValue::Number(6.0));
}
