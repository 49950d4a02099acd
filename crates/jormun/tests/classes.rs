//! Classes: methods, accessors, inheritance, `super`, private members,
//! static members and blocks, field initializers.

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
fn basic_class_with_constructor_and_method() {
    let src = r"
class Point {
  constructor(x, y) { this.x = x; this.y = y; }
  norm2() { return this.x * this.x + this.y * this.y }
}
new Point(3, 4).norm2()";
    assert_eq!(num(src), 25.0);
}

#[test]
fn methods_live_on_the_prototype() {
    let src = r"
class C { m() { return 1 } }
const c = new C();
Object.getPrototypeOf(c) === C.prototype && !Object.hasOwn(c, 'm') && C.prototype.m === c.m";
    assert_eq!(eval(src), JsValue::Bool(true));
}

#[test]
fn field_initializers_run_per_instance() {
    let src = r"
class Box { items = []; }
const a = new Box(), b = new Box();
a.items.push(1);
b.items.length";
    assert_eq!(num(src), 0.0);
}

#[test]
fn getters_setters_and_static_members() {
    let src = r"
class Temp {
  static zero = 273.15;
  constructor(k) { this._k = k; }
  get celsius() { return this._k - Temp.zero }
  set celsius(c) { this._k = c + Temp.zero }
}
const t = new Temp(300);
t.celsius = 100;
t._k";
    assert_eq!(num(src), 373.15);
    assert_eq!(num("class S { static make() { return new S() } tag() { return 7 } } S.make().tag()"), 7.0);
}

#[test]
fn inheritance_and_super() {
    let src = r"
class Animal {
  constructor(name) { this.name = name; }
  speak() { return this.name + ' makes a sound' }
}
class Dog extends Animal {
  constructor(name) { super(name); }
  speak() { return super.speak() + ': woof' }
}
new Dog('Rex').speak()";
    assert_eq!(s(src), "Rex makes a sound: woof");
}

#[test]
fn implicit_derived_constructor_forwards_arguments() {
    let src = r"
class Base { constructor(a, b) { this.sum = a + b } }
class Child extends Base {}
new Child(4, 5).sum";
    assert_eq!(num(src), 9.0);
}

#[test]
fn instanceof_walks_the_chain() {
    let src = r"
class A {}
class B extends A {}
const b = new B();
b instanceof B && b instanceof A && b instanceof Object";
    assert_eq!(eval(src), JsValue::Bool(true));
}

#[test]
fn this_before_super_is_an_error() {
    let err = Interpreter::new()
        .eval("class A {} class B extends A { constructor() { this.x = 1; super(); } } new B()")
        .unwrap_err();
    assert_eq!(err.kind, Some(jormun::ExcKind::ReferenceError));
}

#[test]
fn private_fields_and_methods() {
    let src = r"
class Counter {
  #count = 0;
  #bump() { return ++this.#count }
  inc() { return this.#bump() }
  has(obj) { return #count in obj }
}
const c = new Counter();
c.inc(); c.inc();
c.inc()";
    assert_eq!(num(src), 3.0);
    // brand check distinguishes instances of other classes
    let brand = r"
class A { #x = 1; static check(o) { return #x in o } }
A.check(new A()) + ',' + A.check({})";
    assert_eq!(s(brand), "true,false");
}

#[test]
fn private_access_on_foreign_object_throws() {
    let err = Interpreter::new()
        .eval("class A { #x = 1; read(o) { return o.#x } } new A().read({})")
        .unwrap_err();
    assert_eq!(err.kind, Some(jormun::ExcKind::TypeError));
}

#[test]
fn static_blocks_run_in_order() {
    let src = r"
class Config {
  static values = [];
  static { Config.values.push('first'); }
  static { Config.values.push('second'); }
}
Config.values.join(',')";
    assert_eq!(s(src), "first,second");
}

#[test]
fn static_blocks_bind_this_to_the_constructor() {
    let src = r"
class C {
  static tag = 'c';
  static seen;
  static { C.seen = this.tag; }
}
C.seen";
    assert_eq!(s(src), "c");
}

#[test]
fn computed_method_names() {
    let src = r"
const key = 'dyn';
class C { [key + 'Method']() { return 5 } }
new C().dynMethod()";
    assert_eq!(num(src), 5.0);
}

#[test]
fn class_expressions_and_name_binding() {
    assert_eq!(num("const C = class { v() { return 2 } }; new C().v()"), 2.0);
    // the inner binding is visible to members
    assert_eq!(
        num("const C = class Named { static make() { return new Named() } v() { return 3 } }; C.make().v()"),
        3.0
    );
}

#[test]
fn class_declarations_are_tdz_bound() {
    let err = Interpreter::new().eval("new C(); class C {}").unwrap_err();
    assert_eq!(err.kind, Some(jormun::ExcKind::ReferenceError));
}

#[test]
fn extending_null_and_calling_without_new() {
    let err = Interpreter::new().eval("class C {} C()").unwrap_err();
    assert_eq!(err.kind, Some(jormun::ExcKind::TypeError));
    assert_eq!(eval("class N extends null {} typeof N"), JsValue::String("function".to_owned()));
}

#[test]
fn getter_on_class_with_inherited_access() {
    let src = r"
class Base { get kind() { return 'base' } }
class Sub extends Base { get label() { return super.kind + '+sub' } }
new Sub().label";
    assert_eq!(s(src), "base+sub");
}
