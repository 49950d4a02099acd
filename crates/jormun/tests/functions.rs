//! Functions: closures, parameters, `this` binding, `arguments`,
//! call/apply/bind, and recursion depth.

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

#[test]
fn closures_capture_by_reference() {
    let src = r"
function counter() {
  let n = 0;
  return { inc: () => ++n, get: () => n };
}
const c = counter();
c.inc(); c.inc(); c.inc();
c.get()";
    assert_eq!(num(src), 3.0);
}

#[test]
fn default_and_rest_parameters() {
    assert_eq!(num("function f(a, b = a * 2) { return a + b } f(3)"), 9.0);
    assert_eq!(num("function f(...rest) { return rest.length } f(1, 2, 3)"), 3.0);
    assert_eq!(num("function f(a, ...rest) { return rest[0] } f(1, 2, 3)"), 2.0);
    assert_eq!(num("function f({x, y = 4}) { return x + y } f({x: 1})"), 5.0);
}

#[test]
fn arguments_object() {
    assert_eq!(num("function f() { return arguments.length } f(1, 2, 3)"), 3.0);
    assert_eq!(num("function f() { return arguments[1] } f('a', 7)"), 7.0);
    // sloppy-mode aliasing with simple parameters
    assert_eq!(num("function f(a) { arguments[0] = 9; return a } f(1)"), 9.0);
    // strict mode breaks the alias
    assert_eq!(num("function f(a) { 'use strict'; arguments[0] = 9; return a } f(1)"), 1.0);
    // spreading arguments works through its iterator
    assert_eq!(num("function f() { return [...arguments].length } f(1, 2)"), 2.0);
}

#[test]
fn arrow_functions_capture_this() {
    let src = r"
const obj = {
  n: 5,
  viaArrow() { return (() => this.n)(); },
  viaFunction() { return (function () { return this })() === undefined; }
};
obj.viaArrow()";
    assert_eq!(num(src), 5.0);
    let strict = r"
'use strict';
const obj = { probe() { return (function () { return this })() === undefined } };
obj.probe()";
    assert_eq!(eval(strict), JsValue::Bool(true));
}

#[test]
fn method_this_binding() {
    assert_eq!(num("const o = {n: 2, double() { return this.n * 2 }}; o.double()"), 4.0);
    // extracting the method loses the receiver
    let src = "'use strict'; const o = {n: 2, f() { return this }}; const g = o.f; g() === undefined";
    assert_eq!(eval(src), JsValue::Bool(true));
}

#[test]
fn call_apply_bind() {
    assert_eq!(num("function f(a, b) { return this.base + a + b } f.call({base: 10}, 1, 2)"), 13.0);
    assert_eq!(num("function f(a, b) { return this.base + a + b } f.apply({base: 10}, [3, 4])"), 17.0);
    let src = r"
function f(a, b) { return this.base + a + b }
const bound = f.bind({base: 100}, 1);
bound(2)";
    assert_eq!(num(src), 103.0);
    assert_eq!(eval("function F(v) { this.v = v } const B = F.bind(null); new B(3).v"), JsValue::Number(3.0));
}

#[test]
fn function_name_and_length() {
    assert_eq!(eval("function foo(a, b, c = 1) {} foo.name + ':' + foo.length"), JsValue::String("foo:2".to_owned()));
    assert_eq!(eval("const anon = () => 1; anon.name"), JsValue::String("anon".to_owned()));
}

#[test]
fn function_to_string_is_source() {
    assert_eq!(
        eval("function tiny(){ return 1 } tiny.toString()"),
        JsValue::String("function tiny(){ return 1 }".to_owned())
    );
}

#[test]
fn new_target_and_construction() {
    assert_eq!(eval("function F() { this.seen = new.target === F } new F().seen"), JsValue::Bool(true));
    assert_eq!(eval("function F() { return new.target } F() === undefined"), JsValue::Bool(true));
    // an object returned from the constructor replaces `this`
    assert_eq!(num("function F() { return {v: 9} } new F().v"), 9.0);
    assert_eq!(num("function F() { this.v = 1; return 42 } new F().v"), 1.0);
}

#[test]
fn non_tail_recursion_still_works_deeply() {
    assert_eq!(num("function sum(n) { return n === 0 ? 0 : n + sum(n - 1) } sum(5000)"), 12_502_500.0);
}

#[test]
fn deep_tail_calls_through_ternary_and_logical() {
    assert_eq!(
        eval(r#""use strict"; function f(n) { return n === 0 ? "end" : (true && f(n - 1)) } f(150000)"#),
        JsValue::String("end".to_owned())
    );
}

#[test]
fn immediately_invoked_function_expressions() {
    assert_eq!(num("(function () { return 8 })()"), 8.0);
    assert_eq!(num("(() => 9)()"), 9.0);
    assert_eq!(num("(async () => 1, 5)"), 5.0);
}

#[test]
fn higher_order_functions() {
    let src = r"
const compose = (f, g) => x => f(g(x));
const inc = x => x + 1;
const dbl = x => x * 2;
compose(inc, dbl)(5)";
    assert_eq!(num(src), 11.0);
}
