//! The error taxonomy: which conditions throw which constructors, plus
//! `cause`, thrown non-errors, and catch/finally interplay.

use jormun::{ExcKind, Interpreter, JsValue};
use pretty_assertions::assert_eq;

fn eval(src: &str) -> JsValue {
    Interpreter::new().eval(src).unwrap()
}

fn kind_of(src: &str) -> Option<ExcKind> {
    Interpreter::new().eval(src).unwrap_err().kind
}

#[test]
fn condition_to_constructor_table() {
    assert_eq!(kind_of("null.x"), Some(ExcKind::TypeError));
    assert_eq!(kind_of("undefined.x"), Some(ExcKind::TypeError));
    assert_eq!(kind_of("const n = 5; n()"), Some(ExcKind::TypeError));
    assert_eq!(kind_of("new 42"), Some(ExcKind::TypeError));
    assert_eq!(kind_of("totallyUndeclared"), Some(ExcKind::ReferenceError));
    assert_eq!(kind_of("{ probe; let probe = 1 }"), Some(ExcKind::ReferenceError));
    assert_eq!(kind_of("const c = 1; c = 2"), Some(ExcKind::TypeError));
    assert_eq!(kind_of("[...42]"), Some(ExcKind::TypeError));
    assert_eq!(kind_of("'x'.matchAll(/x/)"), Some(ExcKind::TypeError));
    assert_eq!(kind_of("'x'.replaceAll(/x/, 'y')"), Some(ExcKind::TypeError));
    assert_eq!(kind_of("[1].with(9, 'x')"), Some(ExcKind::RangeError));
    assert_eq!(kind_of("BigInt(1.5)"), Some(ExcKind::TypeError));
    assert_eq!(kind_of("BigInt(NaN)"), Some(ExcKind::TypeError));
    assert_eq!(kind_of("const o = {}; o.self = o; JSON.stringify(o)"), Some(ExcKind::TypeError));
    assert_eq!(kind_of("new Array(-1)"), Some(ExcKind::RangeError));
    assert_eq!(kind_of("1n + 2"), Some(ExcKind::TypeError));
}

#[test]
fn syntax_errors_carry_positions() {
    let err = Interpreter::new().eval("let x = \n  'unterminated").unwrap_err();
    assert_eq!(err.kind, Some(ExcKind::SyntaxError));
    let loc = err.loc.expect("lexer errors have locations");
    assert_eq!(loc.line, 2);
    assert_eq!(loc.column, 3);
}

#[test]
fn error_objects_have_name_message_stack() {
    let src = r"
const e = new TypeError('broken');
e.name + '|' + e.message + '|' + (typeof e.stack) + '|' + (e instanceof TypeError) + '|' + (e instanceof Error)";
    assert_eq!(
        eval(src),
        JsValue::String("TypeError|broken|string|true|true".to_owned())
    );
}

#[test]
fn error_cause_option() {
    assert_eq!(
        eval("new Error('outer', {cause: 'inner'}).cause"),
        JsValue::String("inner".to_owned())
    );
    assert_eq!(eval("'cause' in new Error('no-cause')"), JsValue::Bool(false));
}

#[test]
fn thrown_values_arrive_unchanged() {
    assert_eq!(eval("try { throw 42 } catch (e) { e }"), JsValue::Number(42.0));
    assert_eq!(
        eval("try { throw {custom: true} } catch (e) { e.custom }"),
        JsValue::Bool(true)
    );
    assert_eq!(eval("try { throw null } catch (e) { e === null }"), JsValue::Bool(true));
}

#[test]
fn catch_binding_destructures() {
    assert_eq!(
        eval("try { throw {code: 404, msg: 'gone'} } catch ({code}) { code }"),
        JsValue::Number(404.0)
    );
}

#[test]
fn errors_propagate_through_frames() {
    let src = r"
function inner() { throw new RangeError('deep') }
function outer() { inner() }
try { outer() } catch (e) { e.name + ':' + e.message }";
    assert_eq!(eval(src), JsValue::String("RangeError:deep".to_owned()));
}

#[test]
fn finally_overrides_throw_with_return() {
    assert_eq!(
        eval("function f() { try { throw 'x' } finally { return 'saved' } } f()"),
        JsValue::String("saved".to_owned())
    );
}

#[test]
fn rethrow_from_catch_reaches_outer_try() {
    let src = r"
let trace = '';
try {
  try { throw 'inner' } catch (e) { trace += 'c1:'; throw 'outer' }
} catch (e) { trace += 'c2:' + e }
trace";
    assert_eq!(eval(src), JsValue::String("c1:c2:outer".to_owned()));
}

#[test]
fn aggregate_error_shape() {
    let src = "const e = new AggregateError(['a', 'b'], 'multi'); e.message + '|' + e.errors.length";
    assert_eq!(eval(src), JsValue::String("multi|2".to_owned()));
}

#[test]
fn uncaught_error_message_surfaces_to_the_host() {
    let err = Interpreter::new().eval("throw new SyntaxError('fake')").unwrap_err();
    assert_eq!(err.kind, Some(ExcKind::SyntaxError));
    assert_eq!(err.message, "fake");
    let err = Interpreter::new().eval("throw 'bare string'").unwrap_err();
    assert_eq!(err.kind, None);
    assert_eq!(err.message, "bare string");
}

#[test]
fn resource_limits_stop_runaway_code() {
    let mut interp = Interpreter::with_limits(jormun::ResourceLimits {
        max_steps: Some(100_000),
        ..jormun::ResourceLimits::default()
    });
    let err = interp.eval("while (true) {}").unwrap_err();
    assert!(err.resource_limit);
    // resource errors are not maskable by JS try/catch
    let mut interp = Interpreter::with_limits(jormun::ResourceLimits {
        max_steps: Some(100_000),
        ..jormun::ResourceLimits::default()
    });
    let err = interp.eval("try { while (true) {} } catch (e) { 'caught' }").unwrap_err();
    assert!(err.resource_limit);
}

#[test]
fn call_depth_limit_raises_cleanly() {
    let mut interp = Interpreter::with_limits(jormun::ResourceLimits {
        max_call_depth: Some(100),
        ..jormun::ResourceLimits::default()
    });
    // non-tail recursion exhausts the frame allowance
    let err = interp.eval("function f(n) { return 1 + f(n + 1) } f(0)").unwrap_err();
    assert!(err.resource_limit);
}
