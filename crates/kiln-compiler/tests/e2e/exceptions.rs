//! Protected regions: try, catch and finally

use super::harness::*;

#[test]
fn test_catch_thrown_value() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![b.try_catch(
        vec![b.throw(b.num(42.0))],
        "e",
        vec![b.return_(Some(b.ident("e")))],
    )]);
    expect_number(&module, 42.0);
}

#[test]
fn test_exception_propagates_out_of_callee() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("fail").body(vec![b.throw(b.str_("deep"))])),
        b.function_decl(b.function("middle").body(vec![
            b.expr(b.call_fn("fail", vec![])),
            b.return_(Some(b.str_("unreachable"))),
        ])),
        b.try_catch(
            vec![b.expr(b.call_fn("middle", vec![]))],
            "e",
            vec![b.return_(Some(b.add(b.str_("caught "), b.ident("e"))))],
        ),
    ]);
    expect_value(&module, Value::string("caught deep"));
}

#[test]
fn test_finally_overrides_exception() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("f").body(vec![b.try_finally(
            vec![b.throw(b.str_("A"))],
            vec![b.throw(b.str_("B"))],
        )])),
        b.try_catch(
            vec![b.expr(b.call_fn("f", vec![]))],
            "e",
            vec![b.return_(Some(b.ident("e")))],
        ),
    ]);
    expect_value(&module, Value::string("B"));
}

#[test]
fn test_finally_return_wins() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("f").body(vec![b.try_finally(
            vec![b.return_(Some(b.num(1.0)))],
            vec![b.return_(Some(b.num(2.0)))],
        )])),
        b.return_(Some(b.call_fn("f", vec![]))),
    ]);
    expect_number(&module, 2.0);
}

#[test]
fn test_nested_finally_order() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("f").body(vec![b.try_finally(
            vec![b.try_finally(
                vec![
                    b.expr(b.call_fn("log", vec![b.str_("a")])),
                    b.return_(Some(b.num(1.0))),
                ],
                vec![b.expr(b.call_fn("log", vec![b.str_("b")]))],
            )],
            vec![b.expr(b.call_fn("log", vec![b.str_("c")]))],
        )])),
        b.expr(b.call_fn("log", vec![b.call_fn("f", vec![])])),
    ]);
    expect_output(&module, &["a", "b", "c", "1"]);
}

#[test]
fn test_catch_then_finally() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![b.try_catch_finally(
        vec![
            b.expr(b.call_fn("log", vec![b.str_("try")])),
            b.throw(b.str_("oops")),
        ],
        "e",
        vec![b.expr(b.call_fn("log", vec![b.add(b.str_("catch "), b.ident("e"))]))],
        vec![b.expr(b.call_fn("log", vec![b.str_("finally")]))],
    )]);
    expect_output(&module, &["try", "catch oops", "finally"]);
}

#[test]
fn test_throw_from_catch_runs_finally() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![b.try_catch_finally(
        vec![b.throw(b.str_("first"))],
        "e",
        vec![b.throw(b.str_("second"))],
        vec![b.expr(b.call_fn("log", vec![b.str_("finally")]))],
    )]);
    let err = run(&module).unwrap_err();
    assert_eq!(err.thrown(), Some(&Value::string("second")));
}

#[test]
fn test_break_through_finally() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.let_("i", Some(b.num(0.0))),
        b.while_(
            b.bool_(true),
            b.block(vec![b.try_finally(
                vec![
                    b.expr(b.assign(b.ident("i"), b.add(b.ident("i"), b.num(1.0)))),
                    b.if_(
                        b.strict_eq(b.ident("i"), b.num(3.0)),
                        b.block(vec![b.break_(None)]),
                        None,
                    ),
                ],
                vec![b.expr(b.call_fn("log", vec![b.add(b.str_("f"), b.ident("i"))]))],
            )]),
        ),
        b.return_(Some(b.ident("i"))),
    ]);
    let (value, output) = run(&module).unwrap();
    assert_eq!(value, Value::Number(3.0));
    assert_eq!(output, vec!["f1", "f2", "f3"]);
}

#[test]
fn test_continue_through_finally() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.let_("sum", Some(b.num(0.0))),
        b.for_let(
            "i",
            b.num(0.0),
            b.lt(b.ident("i"), b.num(4.0)),
            b.increment(b.ident("i")),
            b.block(vec![b.try_finally(
                vec![
                    b.if_(
                        b.strict_eq(b.ident("i"), b.num(1.0)),
                        b.block(vec![b.continue_(None)]),
                        None,
                    ),
                    b.expr(b.assign(b.ident("sum"), b.add(b.ident("sum"), b.ident("i")))),
                ],
                vec![b.expr(b.call_fn("log", vec![b.ident("i")]))],
            )]),
        ),
        b.return_(Some(b.ident("sum"))),
    ]);
    let (value, output) = run(&module).unwrap();
    assert_eq!(value, Value::Number(5.0));
    assert_eq!(output, vec!["0", "1", "2", "3"]);
}

#[test]
fn test_runtime_errors_are_catchable() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.let_("x", Some(b.undefined())),
        b.try_catch(
            vec![b.expr(b.call_fn("x", vec![]))],
            "e",
            vec![b.return_(Some(b.str_("caught")))],
        ),
    ]);
    expect_value(&module, Value::string("caught"));
}

#[test]
fn test_uncaught_exception_surfaces() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![b.throw(b.str_("oops"))]);
    expect_thrown(&module, Value::string("oops"));
}

#[test]
fn test_unknown_global_is_reference_error() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![b.return_(Some(b.ident("missing")))]);
    let err = run(&module).unwrap_err();
    assert!(matches!(err, ExecError::ReferenceError(ref name) if name == "missing"));
}
