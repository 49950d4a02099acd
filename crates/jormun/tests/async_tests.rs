//! Async functions, promises, microtask ordering, and timers.

use jormun::{Interpreter, JsValue};
use pretty_assertions::assert_eq;

fn eval_async(src: &str) -> JsValue {
    Interpreter::new().eval_async(src).unwrap()
}

fn num(src: &str) -> f64 {
    match eval_async(src) {
        JsValue::Number(n) => n,
        other => panic!("expected number from {src}, got {other:?}"),
    }
}

fn s(src: &str) -> String {
    match eval_async(src) {
        JsValue::String(s) => s,
        other => panic!("expected string from {src}, got {other:?}"),
    }
}

#[test]
fn await_unwraps_values_and_promises() {
    assert_eq!(num("(async () => (await 1) + (await Promise.resolve(2)))()"), 3.0);
}

#[test]
fn async_functions_return_promises() {
    assert_eq!(
        eval_async("async function f() { return 5 } f() instanceof Promise"),
        JsValue::Bool(true)
    );
    assert_eq!(num("async function f() { return 5 } f()"), 5.0, "eval_async settles the result");
}

#[test]
fn async_rejection_is_catchable() {
    let src = r"
async function fails() { throw new RangeError('nope') }
async function main() {
  try { await fails(); return 'unreachable' }
  catch (e) { return e.name + ':' + e.message }
}
main()";
    assert_eq!(s(src), "RangeError:nope");
}

#[test]
fn unhandled_async_rejection_surfaces() {
    let err = Interpreter::new()
        .eval_async("async function f() { throw new TypeError('boom') } f()")
        .unwrap_err();
    assert_eq!(err.kind, Some(jormun::ExcKind::TypeError));
    assert_eq!(err.message, "boom");
}

#[test]
fn synchronous_section_runs_before_suspension() {
    let src = r"
let log = '';
async function f() { log += 'a'; await null; log += 'c'; }
f();
log += 'b';
log";
    // eval_async drains microtasks after the script body
    assert_eq!(s(src), "ab");
    let full = r"
let log = '';
async function f() { log += 'a'; await null; log += 'c'; }
f().then(() => log)";
    assert_eq!(s(full), "abc");
}

#[test]
fn microtask_fifo_ordering() {
    let src = r"
let log = [];
Promise.resolve().then(() => log.push(1));
Promise.resolve().then(() => log.push(2));
queueMicrotask(() => log.push(3));
Promise.resolve().then(() => log.push(4)).then(() => log.join(','))";
    assert_eq!(s(src), "1,2,3,4");
}

#[test]
fn reactions_fire_in_registration_order() {
    let src = r"
let log = [];
const p = Promise.resolve('v');
p.then(() => log.push('first'));
p.then(() => log.push('second'));
p.then(() => log.join('-'))";
    assert_eq!(s(src), "first-second");
}

#[test]
fn then_chaining_transforms_values() {
    assert_eq!(num("Promise.resolve(1).then(v => v + 1).then(v => v * 10)"), 20.0);
    // a handler returning a promise is adopted
    assert_eq!(num("Promise.resolve(1).then(v => Promise.resolve(v + 41))"), 42.0);
    // catch recovers and the chain continues fulfilled
    assert_eq!(num("Promise.reject('x').catch(() => 7).then(v => v + 1)"), 8.0);
}

#[test]
fn finally_passes_values_through() {
    let src = r"
let ran = false;
Promise.resolve(3).finally(() => { ran = true; 99 }).then(v => v + (ran ? 100 : 0))";
    assert_eq!(num(src), 103.0);
}

#[test]
fn promise_all_preserves_input_order() {
    let src = r"
const slow = new Promise(resolve => queueMicrotask(() => resolve('slow')));
Promise.all([slow, Promise.resolve('fast'), 'plain']).then(vs => vs.join(','))";
    assert_eq!(s(src), "slow,fast,plain");
}

#[test]
fn promise_all_rejects_on_first_failure() {
    let src = r"
Promise.all([Promise.resolve(1), Promise.reject('why'), Promise.resolve(3)])
  .then(() => 'fulfilled', e => 'rejected:' + e)";
    assert_eq!(s(src), "rejected:why");
}

#[test]
fn promise_all_settled_reports_both_outcomes() {
    let src = r"
Promise.allSettled([Promise.resolve(1), Promise.reject('bad')])
  .then(rs => rs.map(r => r.status).join(',') + '|' + rs[0].value + '|' + rs[1].reason)";
    assert_eq!(s(src), "fulfilled,rejected|1|bad");
}

#[test]
fn promise_any_aggregates_total_rejection() {
    let src = r"
Promise.any([Promise.reject('a'), Promise.reject('b')])
  .catch(e => e instanceof AggregateError ? e.errors.join('+') : 'wrong')";
    assert_eq!(s(src), "a+b");
}

#[test]
fn promise_race_adopts_first_settlement() {
    assert_eq!(num("Promise.race([Promise.resolve(1), Promise.resolve(2)])"), 1.0);
    let src = "Promise.race([Promise.reject('lost'), Promise.resolve('won')]).catch(e => 'caught:' + e)";
    assert_eq!(s(src), "caught:lost");
}

#[test]
fn executor_resolve_and_reject() {
    assert_eq!(num("new Promise(resolve => resolve(11))"), 11.0);
    let src = "new Promise((_, reject) => reject('r')).catch(e => 'got:' + e)";
    assert_eq!(s(src), "got:r");
    // a throwing executor rejects
    let src = "new Promise(() => { throw 'thrown' }).catch(e => 'got:' + e)";
    assert_eq!(s(src), "got:thrown");
}

#[test]
fn thenables_are_adopted() {
    let src = r"
const thenable = { then(resolve) { resolve('adopted') } };
Promise.resolve(thenable)";
    assert_eq!(s(src), "adopted");
}

#[test]
fn await_in_loops() {
    let src = r"
async function f() {
  let total = 0;
  for (let i = 1; i <= 4; i++) total += await Promise.resolve(i);
  return total;
}
f()";
    assert_eq!(num(src), 10.0);
}

#[test]
fn timers_fire_after_microtasks_and_in_due_order() {
    let mut interp = Interpreter::new();
    interp
        .eval_async(
            r"
globalThis.log = [];
setTimeout(() => log.push('t10'), 10);
setTimeout(() => log.push('t0a'), 0);
setTimeout(() => log.push('t0b'), 0);
Promise.resolve().then(() => log.push('micro'));
",
        )
        .unwrap();
    assert!(interp.has_pending_timers());
    interp.run_timers(1e15).unwrap();
    assert_eq!(
        interp.eval("log.join(',')").unwrap(),
        JsValue::String("micro,t0a,t0b,t10".to_owned())
    );
    assert!(!interp.has_pending_timers());
}

#[test]
fn clear_timeout_cancels() {
    let mut interp = Interpreter::new();
    interp
        .eval(
            r"
globalThis.fired = false;
const id = setTimeout(() => { fired = true }, 0);
clearTimeout(id);
",
        )
        .unwrap();
    interp.run_timers(1e15).unwrap();
    assert_eq!(interp.eval("fired").unwrap(), JsValue::Bool(false));
}

#[test]
fn intervals_rearm_until_cleared() {
    let mut interp = Interpreter::new();
    interp
        .eval(
            r"
globalThis.count = 0;
globalThis.id = setInterval(() => { count++; if (count === 3) clearInterval(id); }, 5);
",
        )
        .unwrap();
    // each pump runs due entries; the interval re-arms relative to the clock
    for i in 1..=5 {
        interp.run_timers(1e15 + f64::from(i) * 10.0).unwrap();
    }
    assert_eq!(interp.eval("count").unwrap(), JsValue::Number(3.0));
}

#[test]
fn top_level_await_in_eval_is_rejected() {
    // scripts are not async contexts; await at top level is module-only
    assert!(Interpreter::new().eval("await 1").is_err());
}
