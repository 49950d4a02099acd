//! The remaining global surface: Math, number parsing, URI coding,
//! Object statics, Map/Set/WeakMap/WeakSet, typed arrays, Date, Symbol,
//! and console capture.

use std::{cell::RefCell, rc::Rc};

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
fn math_functions_and_constants() {
    assert_eq!(num("Math.abs(-4)"), 4.0);
    assert_eq!(num("Math.floor(2.9) + Math.ceil(2.1)"), 5.0);
    assert_eq!(num("Math.round(2.5)"), 3.0);
    assert_eq!(num("Math.round(-2.5)"), -2.0, "half rounds toward +Infinity");
    assert_eq!(num("Math.max(1, 9, 3)"), 9.0);
    assert_eq!(num("Math.min()"), f64::INFINITY);
    assert_eq!(num("Math.sign(-3)"), -1.0);
    assert_eq!(num("Math.trunc(-2.7)"), -2.0);
    assert_eq!(num("Math.sqrt(144)"), 12.0);
    assert_eq!(num("Math.hypot(3, 4)"), 5.0);
    assert!(num("Math.PI") > 3.14 && num("Math.PI") < 3.15);
    let r = num("Math.random()");
    assert!((0.0..1.0).contains(&r));
}

#[test]
fn number_parsing_globals() {
    assert_eq!(num("parseInt('42px')"), 42.0);
    assert_eq!(num("parseInt('0x1F')"), 31.0);
    assert_eq!(num("parseInt('ff', 16)"), 255.0);
    assert_eq!(num("parseInt('-10')"), -10.0);
    assert!(matches!(eval("parseInt('zz')"), JsValue::Number(n) if n.is_nan()));
    assert_eq!(num("parseFloat('3.14abc')"), 3.14);
    assert_eq!(num("parseFloat('1e2!')"), 100.0);
    assert_eq!(eval("isNaN('not a number')"), JsValue::Bool(true));
    assert_eq!(eval("isFinite('12')"), JsValue::Bool(true));
    assert_eq!(eval("Number.isInteger(5.0) && !Number.isInteger(5.5)"), JsValue::Bool(true));
    assert_eq!(eval("Number.isNaN('x')"), JsValue::Bool(false), "no coercion in Number.isNaN");
}

#[test]
fn number_formatting_methods() {
    assert_eq!(s("(3.14159).toFixed(2)"), "3.14");
    assert_eq!(s("(255).toString(16)"), "ff");
    assert_eq!(s("(8).toString(2)"), "1000");
    assert_eq!(s("(1e21).toString()"), "1e+21");
    assert_eq!(s("(0.000001).toString()"), "0.000001");
    assert_eq!(s("(123).toString()"), "123");
}

#[test]
fn uri_coding_round_trips() {
    assert_eq!(s("encodeURIComponent('a b&c')"), "a%20b%26c");
    assert_eq!(s("encodeURI('http://x/y z')"), "http://x/y%20z");
    assert_eq!(s("decodeURIComponent('a%20b%26c')"), "a b&c");
    assert_eq!(s("decodeURIComponent(encodeURIComponent('héllo'))"), "héllo");
    assert_eq!(
        Interpreter::new().eval("decodeURIComponent('%ZZ')").unwrap_err().kind,
        Some(jormun::ExcKind::UriError)
    );
}

#[test]
fn object_statics() {
    assert_eq!(s("Object.keys({b: 1, a: 2}).join(',')"), "b,a");
    assert_eq!(s("Object.values({x: 'v', y: 'w'}).join('')"), "vw");
    assert_eq!(s("Object.entries({k: 9}).map(e => e[0] + '=' + e[1]).join()"), "k=9");
    assert_eq!(num("Object.assign({a: 1}, {b: 2}, {a: 3}).a"), 3.0);
    assert_eq!(eval("Object.hasOwn({x: 1}, 'x')"), JsValue::Bool(true));
    assert_eq!(eval("Object.hasOwn(Object.create({inh: 1}), 'inh')"), JsValue::Bool(false));
    assert_eq!(num("Object.create({base: 6}).base"), 6.0);
    assert_eq!(eval("Object.getPrototypeOf([]) === Array.prototype"), JsValue::Bool(true));
    assert_eq!(
        s("Object.fromEntries([['a', 1], ['b', 2]]) && JSON.stringify(Object.fromEntries([['a', 1]]))"),
        r#"{"a":1}"#
    );
    // integer-like keys order first, ascending
    assert_eq!(s("Object.keys({b: 0, 2: 0, a: 0, 1: 0}).join(',')"), "1,2,b,a");
}

#[test]
fn freeze_and_seal() {
    assert_eq!(num("'use strict'; const o = Object.seal({a: 1}); o.a = 5; o.a"), 5.0);
    let err = Interpreter::new().eval("'use strict'; const o = Object.freeze({a: 1}); o.a = 5;").unwrap_err();
    assert_eq!(err.kind, Some(jormun::ExcKind::TypeError));
    assert_eq!(num("const o = Object.freeze({a: 1}); o.a = 5; o.a"), 1.0, "sloppy writes fail silently");
    let err = Interpreter::new().eval("'use strict'; const o = Object.seal({}); o.fresh = 1;").unwrap_err();
    assert_eq!(err.kind, Some(jormun::ExcKind::TypeError));
}

#[test]
fn define_property_and_descriptors() {
    let src = r"
const o = {};
Object.defineProperty(o, 'ro', {value: 7, writable: false, enumerable: false, configurable: false});
o.ro = 9;
o.ro + ',' + Object.keys(o).length";
    assert_eq!(s(src), "7,0");
    let src = r"
const o = {};
Object.defineProperty(o, 'v', {get() { return 'from-getter' }});
o.v";
    assert_eq!(s(src), "from-getter");
    let src = "const d = Object.getOwnPropertyDescriptor({a: 5}, 'a'); d.value + ',' + d.writable";
    assert_eq!(s(src), "5,true");
}

#[test]
fn set_prototype_of_rejects_cycles() {
    let err = Interpreter::new()
        .eval("const a = {}; const b = Object.create(a); Object.setPrototypeOf(a, b)")
        .unwrap_err();
    assert_eq!(err.kind, Some(jormun::ExcKind::TypeError));
}

#[test]
fn map_basics_and_key_identity() {
    let src = r"
const m = new Map([['k', 1]]);
m.set('k2', 2).set(NaN, 'nan-entry');
m.get('k') + ',' + m.size + ',' + m.get(NaN) + ',' + m.has('missing')";
    assert_eq!(s(src), "1,3,nan-entry,false");
    assert_eq!(eval("const m = new Map(); m.set(-0, 'z'); m.get(0)"), JsValue::String("z".to_owned()));
    let src = r"
const key = {};
const m = new Map();
m.set(key, 'obj');
m.get(key) + ',' + m.get({})";
    assert_eq!(s(src), "obj,undefined");
}

#[test]
fn map_iteration_order_and_deletion() {
    let src = r"
const m = new Map([['a', 1], ['b', 2], ['c', 3]]);
m.delete('b');
m.set('d', 4);
[...m.keys()].join('')";
    assert_eq!(s(src), "acd");
    let src = r"
const m = new Map([['a', 1], ['b', 2]]);
let out = '';
m.forEach((v, k) => { out += k + v; if (k === 'a') m.set('late', 9); });
out";
    assert_eq!(s(src), "a1b2late9", "entries added during iteration are visited");
}

#[test]
fn set_basics() {
    assert_eq!(num("const s = new Set([1, 2, 2, 3]); s.size"), 3.0);
    assert_eq!(eval("const s = new Set(); s.add('x'); s.has('x') && !s.has('y')"), JsValue::Bool(true));
    assert_eq!(s("[...new Set('banana')].join('')"), "ban");
    assert_eq!(num("const s = new Set([1]); s.delete(1); s.size"), 0.0);
}

#[test]
fn weak_collections_demand_object_keys() {
    assert_eq!(
        eval("const k = {}; const wm = new WeakMap(); wm.set(k, 5); wm.get(k)"),
        JsValue::Number(5.0)
    );
    let err = Interpreter::new().eval("new WeakMap().set('prim', 1)").unwrap_err();
    assert_eq!(err.kind, Some(jormun::ExcKind::TypeError));
    assert_eq!(eval("const o = {}; const ws = new WeakSet([o]); ws.has(o)"), JsValue::Bool(true));
}

#[test]
fn typed_array_element_semantics() {
    // wrapping on Int8
    assert_eq!(num("const t = new Int8Array(2); t[0] = 200; t[0]"), -56.0);
    // clamping on Uint8Clamped, with half-to-even rounding
    assert_eq!(s("const t = new Uint8ClampedArray(3); t[0] = 300; t[1] = -20; t[2] = 2.5; [...t].join(',')"), "255,0,2");
    // out-of-range writes are dropped and create no properties
    let src = "const t = new Int8Array(2); t[5] = 7; t.length + ',' + (t[5] === undefined) + ',' + (5 in t)";
    assert_eq!(s(src), "2,true,false");
    assert_eq!(num("new Float64Array([1.5, 2.5])[1]"), 2.5);
    assert_eq!(s("const t = new BigInt64Array(1); t[0] = -2n; t[0].toString()"), "-2");
    assert_eq!(num("new Uint16Array(new ArrayBuffer(8)).length"), 4.0);
    assert_eq!(num("new ArrayBuffer(16).byteLength"), 16.0);
    assert_eq!(s("[...new Uint8Array([7, 8])].join('-')"), "7-8");
}

#[test]
fn date_basics() {
    assert_eq!(num("new Date(0).getTime()"), 0.0);
    assert_eq!(s("new Date(0).toISOString()"), "1970-01-01T00:00:00.000Z");
    assert_eq!(num("new Date(2024, 0, 15).getMonth()"), 0.0);
    assert_eq!(num("new Date('2024-03-05').getDate()"), 5.0);
    assert!(num("Date.now()") > 1.0e12, "clock starts at the host time");
    assert!(matches!(eval("new Date('garbage').getTime()"), JsValue::Number(n) if n.is_nan()));
}

#[test]
fn symbols_and_well_knowns() {
    assert_eq!(eval("Symbol('a') === Symbol('a')"), JsValue::Bool(false));
    assert_eq!(eval("Symbol.for('k') === Symbol.for('k')"), JsValue::Bool(true));
    assert_eq!(s("Symbol.keyFor(Symbol.for('reg'))"), "reg");
    assert_eq!(s("Symbol('desc').description"), "desc");
    assert_eq!(num("const k = Symbol('key'); const o = {[k]: 5}; o[k]"), 5.0);
    // symbol keys stay out of JSON and Object.keys
    assert_eq!(s("const o = {[Symbol('hidden')]: 1, shown: 2}; JSON.stringify(o)"), r#"{"shown":2}"#);
    let src = r"
class Range {
  static [Symbol.hasInstance](v) { return typeof v === 'number' }
}
(5 instanceof Range) + ''";
    assert_eq!(s(src), "true");
    let src = r"
const obj = {[Symbol.toPrimitive](hint) { return hint === 'number' ? 99 : 'str' }};
(+obj) + '|' + `${obj}`";
    assert_eq!(s(src), "99|str");
}

#[test]
fn custom_iterables_via_symbol_iterator() {
    let src = r"
const range = {
  from: 1, to: 4,
  [Symbol.iterator]() {
    let n = this.from - 1;
    const last = this.to;
    return { next: () => ({ value: n + 1, done: ++n > last }) };
  }
};
[...range].join('+')";
    assert_eq!(s(src), "1+2+3+4");
}

#[test]
fn console_output_is_captured() {
    struct SharedPrint(Rc<RefCell<String>>);
    impl jormun::PrintWriter for SharedPrint {
        fn write_line(&mut self, _stream: jormun::ConsoleStream, line: &str) {
            self.0.borrow_mut().push_str(line);
            self.0.borrow_mut().push('\n');
        }
    }
    let collected = Rc::new(RefCell::new(String::new()));
    let mut interp = Interpreter::new();
    interp.set_print_writer(Box::new(SharedPrint(collected.clone())));
    interp.eval("console.log('hello', 1, [1, 2], {a: true}); console.error('bad')").unwrap();
    let out = collected.borrow().clone();
    assert_eq!(out, "hello 1 [ 1, 2 ] { a: true }\nbad\n");
}

#[test]
fn global_this_is_self_referential() {
    assert_eq!(eval("globalThis === globalThis.globalThis"), JsValue::Bool(true));
    assert_eq!(num("globalThis.parseInt('7')"), 7.0);
    assert_eq!(eval("typeof undefined === 'undefined' && Number.isNaN(NaN) && Infinity > 1e308"), JsValue::Bool(true));
}

#[test]
fn heap_stats_report_live_objects() {
    let mut interp = Interpreter::new();
    let before = interp.heap_stats().live_objects;
    interp.eval("globalThis.keepAlive = [{}, {}, {}]").unwrap();
    let after = interp.heap_stats().live_objects;
    assert!(after > before);
}
