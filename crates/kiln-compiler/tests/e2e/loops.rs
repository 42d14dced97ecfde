//! Loops, iteration and per-iteration bindings

use super::harness::*;

#[test]
fn test_per_iteration_closures() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.let_("fns", Some(b.array(vec![]))),
        b.for_let(
            "i",
            b.num(0.0),
            b.lt(b.ident("i"), b.num(3.0)),
            b.increment(b.ident("i")),
            b.block(vec![b.expr(b.method_call(
                b.ident("fns"),
                "push",
                vec![b.func_expr(b.arrow().expr_body(b.ident("i")))],
            ))]),
        ),
        b.return_(Some(b.array(vec![
            b.call(b.index(b.ident("fns"), b.num(0.0)), vec![]),
            b.call(b.index(b.ident("fns"), b.num(1.0)), vec![]),
            b.call(b.index(b.ident("fns"), b.num(2.0)), vec![]),
        ]))),
    ]);
    expect_display(&module, "0,1,2");
}

#[test]
fn test_for_of_binding_per_iteration() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.let_("fns", Some(b.array(vec![]))),
        b.for_of(
            VariableKind::Const,
            b.pat("s"),
            b.str_("ab"),
            b.block(vec![b.expr(b.method_call(
                b.ident("fns"),
                "push",
                vec![b.func_expr(b.arrow().expr_body(b.ident("s")))],
            ))]),
        ),
        b.return_(Some(b.add(
            b.call(b.index(b.ident("fns"), b.num(0.0)), vec![]),
            b.call(b.index(b.ident("fns"), b.num(1.0)), vec![]),
        ))),
    ]);
    expect_value(&module, Value::string("ab"));
}

#[test]
fn test_break_closes_generator() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("nums").generator().body(vec![b.try_finally(
            vec![
                b.expr(b.yield_(Some(b.num(1.0)))),
                b.expr(b.yield_(Some(b.num(2.0)))),
                b.expr(b.yield_(Some(b.num(3.0)))),
            ],
            vec![b.expr(b.call_fn("log", vec![b.str_("closed")]))],
        )])),
        b.let_("sum", Some(b.num(0.0))),
        b.for_of(
            VariableKind::Const,
            b.pat("n"),
            b.call_fn("nums", vec![]),
            b.block(vec![
                b.expr(b.assign(b.ident("sum"), b.add(b.ident("sum"), b.ident("n")))),
                b.if_(
                    b.strict_eq(b.ident("n"), b.num(2.0)),
                    b.block(vec![b.break_(None)]),
                    None,
                ),
            ]),
        ),
        b.expr(b.call_fn("log", vec![b.ident("sum")])),
    ]);
    expect_output(&module, &["closed", "3"]);
}

#[test]
fn test_return_from_for_of_closes_generator() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("nums").generator().body(vec![b.try_finally(
            vec![b.expr(b.yield_(Some(b.num(1.0)))), b.expr(b.yield_(Some(b.num(2.0))))],
            vec![b.expr(b.call_fn("log", vec![b.str_("closed")]))],
        )])),
        b.function_decl(b.function("first").body(vec![
            b.for_of(
                VariableKind::Const,
                b.pat("n"),
                b.call_fn("nums", vec![]),
                b.block(vec![b.return_(Some(b.ident("n")))]),
            ),
            b.return_(Some(b.num(-1.0))),
        ])),
        b.expr(b.call_fn("log", vec![b.call_fn("first", vec![])])),
    ]);
    expect_output(&module, &["closed", "1"]);
}

#[test]
fn test_labeled_continue() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.let_("count", Some(b.num(0.0))),
        b.labeled(
            "outer",
            b.for_let(
                "i",
                b.num(0.0),
                b.lt(b.ident("i"), b.num(3.0)),
                b.increment(b.ident("i")),
                b.block(vec![b.for_let(
                    "j",
                    b.num(0.0),
                    b.lt(b.ident("j"), b.num(3.0)),
                    b.increment(b.ident("j")),
                    b.block(vec![
                        b.if_(
                            b.strict_eq(b.ident("j"), b.num(1.0)),
                            b.block(vec![b.continue_(Some("outer"))]),
                            None,
                        ),
                        b.expr(b.increment(b.ident("count"))),
                    ]),
                )]),
            ),
        ),
        b.return_(Some(b.ident("count"))),
    ]);
    expect_number(&module, 3.0);
}

#[test]
fn test_do_while_and_destructuring() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.let_("n", Some(b.num(0.0))),
        b.do_while(
            b.block(vec![b.expr(b.increment(b.ident("n")))]),
            b.lt(b.ident("n"), b.num(5.0)),
        ),
        b.declare(
            VariableKind::Const,
            b.array_pat(vec![Some(b.pat("a")), None, Some(b.pat("c"))]),
            Some(b.array(vec![b.num(1.0), b.num(2.0), b.num(3.0)])),
        ),
        b.return_(Some(b.add(b.ident("n"), b.add(b.ident("a"), b.ident("c"))))),
    ]);
    expect_number(&module, 9.0);
}

#[test]
fn test_for_in_closures_capture_each_key() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.let_("fns", Some(b.array(vec![]))),
        b.for_in(
            VariableKind::Let,
            "key",
            b.object(vec![("b", b.num(1.0)), ("a", b.num(2.0)), ("c", b.num(3.0))]),
            b.block(vec![b.expr(b.method_call(
                b.ident("fns"),
                "push",
                vec![b.func_expr(b.arrow().expr_body(b.ident("key")))],
            ))]),
        ),
        b.return_(Some(b.add(
            b.add(
                b.call(b.index(b.ident("fns"), b.num(0.0)), vec![]),
                b.call(b.index(b.ident("fns"), b.num(1.0)), vec![]),
            ),
            b.call(b.index(b.ident("fns"), b.num(2.0)), vec![]),
        ))),
    ]);
    expect_value(&module, Value::string("bac"));
}

#[test]
fn test_for_in_over_array_indices_with_break() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.const_("items", b.array(vec![b.str_("x"), b.str_("y"), b.str_("z")])),
        b.for_in(
            VariableKind::Const,
            "i",
            b.ident("items"),
            b.block(vec![
                b.if_(b.strict_eq(b.ident("i"), b.str_("2")), b.block(vec![b.break_(None)]), None),
                b.expr(b.call_fn("log", vec![b.add(b.ident("i"), b.index(b.ident("items"), b.ident("i")))])),
            ]),
        ),
        b.for_in(VariableKind::Const, "k", b.null(), b.block(vec![b.expr(b.call_fn("log", vec![b.ident("k")]))])),
    ]);
    expect_output(&module, &["0x", "1y"]);
}
