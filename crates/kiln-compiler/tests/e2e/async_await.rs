//! Async callables

use super::harness::*;

fn expect_fulfilled(module: &kiln_syntax::ast::Module, expected: Value) {
    let (value, _) = run(module).unwrap();
    match settled(&value) {
        PromiseState::Fulfilled(result) => assert_eq!(result, expected),
        PromiseState::Rejected(reason) => panic!("promise rejected with {:?}", reason),
    }
}

#[test]
fn test_await_settled_value() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("inner").asynchronous().body(vec![b.return_(Some(b.num(20.0)))])),
        b.function_decl(b.function("outer").asynchronous().body(vec![
            b.let_("a", Some(b.await_(b.call_fn("inner", vec![])))),
            b.return_(Some(b.add(b.ident("a"), b.num(22.0)))),
        ])),
        b.return_(Some(b.call_fn("outer", vec![]))),
    ]);
    expect_fulfilled(&module, Value::Number(42.0));
}

#[test]
fn test_await_plain_value() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("f").asynchronous().body(vec![b.return_(Some(b.add(
            b.await_(b.num(40.0)),
            b.await_(b.num(2.0)),
        )))])),
        b.return_(Some(b.call_fn("f", vec![]))),
    ]);
    expect_fulfilled(&module, Value::Number(42.0));
}

#[test]
fn test_return_preserved_through_suspension_in_finally() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("f").asynchronous().body(vec![b.try_finally(
            vec![b.return_(Some(b.str_("X")))],
            vec![
                b.expr(b.await_(b.method_call(b.ident("Promise"), "resolve", vec![b.num(1.0)]))),
                b.expr(b.call_fn("log", vec![b.str_("finally")])),
            ],
        )])),
        b.return_(Some(b.call_fn("f", vec![]))),
    ]);
    let (value, output) = run(&module).unwrap();
    assert_eq!(output, vec!["finally"]);
    match settled(&value) {
        PromiseState::Fulfilled(result) => assert_eq!(result, Value::string("X")),
        PromiseState::Rejected(reason) => panic!("promise rejected with {:?}", reason),
    }
}

#[test]
fn test_rejected_await_is_catchable() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("f").asynchronous().body(vec![b.try_catch(
            vec![
                b.expr(b.await_(b.method_call(b.ident("Promise"), "reject", vec![b.str_("bad")]))),
                b.return_(Some(b.str_("no"))),
            ],
            "e",
            vec![b.return_(Some(b.add(b.str_("caught "), b.ident("e"))))],
        )])),
        b.return_(Some(b.call_fn("f", vec![]))),
    ]);
    expect_fulfilled(&module, Value::string("caught bad"));
}

#[test]
fn test_throw_rejects_promise() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("f").asynchronous().body(vec![
            b.expr(b.await_(b.num(1.0))),
            b.throw(b.str_("x")),
        ])),
        b.return_(Some(b.call_fn("f", vec![]))),
    ]);
    let (value, _) = run(&module).unwrap();
    assert!(matches!(settled(&value), PromiseState::Rejected(reason) if reason == Value::string("x")));
}

#[test]
fn test_async_arrow_captures() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.let_("base", Some(b.num(40.0))),
        b.const_(
            "f",
            b.func_expr(b.arrow().asynchronous().param("n").expr_body(
                b.add(b.ident("base"), b.await_(b.ident("n"))),
            )),
        ),
        b.return_(Some(b.call_fn("f", vec![b.num(2.0)]))),
    ]);
    expect_fulfilled(&module, Value::Number(42.0));
}

#[test]
fn test_async_generator_next_returns_promise() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("g").generator().asynchronous().body(vec![
            b.let_("v", Some(b.await_(b.method_call(b.ident("Promise"), "resolve", vec![b.num(1.0)])))),
            b.expr(b.yield_(Some(b.add(b.ident("v"), b.num(1.0))))),
        ])),
        b.let_("it", Some(b.call_fn("g", vec![]))),
        b.return_(Some(b.method_call(b.ident("it"), "next", vec![]))),
    ]);
    let (value, _) = run(&module).unwrap();
    let PromiseState::Fulfilled(result) = settled(&value) else {
        panic!("promise rejected");
    };
    assert_eq!(result.get_property("value"), Value::Number(2.0));
    assert_eq!(result.get_property("done"), Value::Bool(false));
}
