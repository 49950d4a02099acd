//! The end-to-end scenarios and universal invariants every build must hold.

use jormun::{Interpreter, JsValue};
use pretty_assertions::assert_eq;

fn eval(src: &str) -> JsValue {
    Interpreter::new().eval(src).unwrap()
}

fn eval_async(src: &str) -> JsValue {
    Interpreter::new().eval_async(src).unwrap()
}

#[test]
fn string_at_negative() {
    assert_eq!(eval(r#""hello".at(-1)"#), JsValue::String("o".to_owned()));
}

#[test]
fn to_reversed_is_non_mutating() {
    assert_eq!(
        eval("[1,2,3].toReversed().toString()"),
        JsValue::String("3,2,1".to_owned())
    );
    assert_eq!(
        eval("const a = [1,2,3]; a.toReversed(); a.toString()"),
        JsValue::String("1,2,3".to_owned())
    );
}

#[test]
fn json_stringify_drops_undefined_members() {
    assert_eq!(
        eval("JSON.stringify({a:1,b:undefined,c:3})"),
        JsValue::String(r#"{"a":1,"c":3}"#.to_owned())
    );
}

#[test]
fn accessor_pair_on_object_literal() {
    let src = "let obj = {_v:0, get value(){return this._v}, set value(x){this._v=x*2}}; obj.value = 10; obj.value";
    assert_eq!(eval(src), JsValue::Number(20.0));
}

#[test]
fn generator_protocol_scenario() {
    let src = r"function* g(){yield 1; yield 2; return 42}
let it=g();
[it.next(),it.next(),it.next()].map(r=>r.value+','+r.done).join(';')";
    assert_eq!(eval(src), JsValue::String("1,false;2,false;42,true".to_owned()));
}

#[test]
fn promise_any_takes_first_fulfillment() {
    let src = "Promise.any([Promise.reject('a'), Promise.resolve(42), Promise.reject('b')]).then(v=>v)";
    assert_eq!(eval_async(src), JsValue::Number(42.0));
}

#[test]
fn regex_d_flag_indices() {
    let src = r"const r=/a(?<n>b)c/d.exec('zzabczz'); r.indices[1][0]+','+r.indices[1][1]";
    assert_eq!(eval(src), JsValue::String("3,4".to_owned()));
}

#[test]
fn static_private_counter() {
    let src = "class C { static #n = 0; static inc(){ return ++C.#n } } C.inc(); C.inc(); C.inc()";
    assert_eq!(eval(src), JsValue::Number(3.0));
}

#[test]
fn tail_call_hundred_thousand() {
    let src = r#""use strict"; function f(n){ return n===0 ? "done" : f(n-1) } f(100000)"#;
    assert_eq!(eval(src), JsValue::String("done".to_owned()));
}

// === universal invariants ===

#[test]
fn tail_recursion_two_hundred_thousand() {
    let src = r#""use strict"; function f(n){ return n===0 ? n : f(n-1) } f(200000)"#;
    assert_eq!(eval(src), JsValue::Number(0.0));
}

#[test]
fn delete_removes_membership() {
    assert_eq!(eval("let o = {}; o.k = 1; delete o.k; 'k' in o"), JsValue::Bool(false));
}

#[test]
fn json_round_trip_is_structural() {
    let src = r#"
const v = {a: [1, 2.5, "x"], b: {nested: true, n: null}};
JSON.stringify(JSON.parse(JSON.stringify(v))) === JSON.stringify(v)
"#;
    assert_eq!(eval(src), JsValue::Bool(true));
}

#[test]
fn regex_literal_and_constructor_agree() {
    let src = r#"
const lit = /pa.t/gi;
const dyn = new RegExp("pa.t", "gi");
lit.source === dyn.source && lit.flags === dyn.flags
"#;
    assert_eq!(eval(src), JsValue::Bool(true));
}

#[test]
fn finished_generator_keeps_returning_done() {
    let src = r"
function* g(){ yield 1 }
const it = g();
it.next(); it.next();
const a = it.next(); const b = it.next();
a.value === undefined && a.done === true && b.value === undefined && b.done === true
";
    assert_eq!(eval(src), JsValue::Bool(true));
}

#[test]
fn empty_promise_combinators() {
    assert_eq!(
        eval_async("Promise.all([]).then(v => v.length)"),
        JsValue::Number(0.0)
    );
    assert_eq!(
        eval_async("Promise.allSettled([]).then(v => v.length)"),
        JsValue::Number(0.0)
    );
    assert_eq!(
        eval_async("Promise.any([]).catch(e => e instanceof AggregateError)"),
        JsValue::Bool(true)
    );
}

#[test]
fn typeof_is_stable_and_identity_holds() {
    assert_eq!(
        eval("let x = {v: 1}; typeof x === typeof x && x === x"),
        JsValue::Bool(true)
    );
    assert_eq!(eval("let n = NaN; n === n"), JsValue::Bool(false));
}
