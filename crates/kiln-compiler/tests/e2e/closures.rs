//! Closures and captured bindings

use super::harness::*;

#[test]
fn test_closure_reads_module_and_function_bindings() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.var("g", Some(b.num(1.0))),
        b.function_decl(b.function("outer").body(vec![
            b.var("o", Some(b.num(2.0))),
            b.function_decl(
                b.function("inner")
                    .body(vec![b.return_(Some(b.add(b.ident("g"), b.ident("o"))))]),
            ),
            b.return_(Some(b.call_fn("inner", vec![]))),
        ])),
        b.return_(Some(b.call_fn("outer", vec![]))),
    ]);
    expect_number(&module, 3.0);
}

#[test]
fn test_counter_keeps_state_between_calls() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("makeCounter").body(vec![
            b.let_("count", Some(b.num(0.0))),
            b.return_(Some(b.func_expr(b.anonymous().body(vec![
                b.expr(b.assign(b.ident("count"), b.add(b.ident("count"), b.num(1.0)))),
                b.return_(Some(b.ident("count"))),
            ])))),
        ])),
        b.let_("c", Some(b.call_fn("makeCounter", vec![]))),
        b.expr(b.call_fn("c", vec![])),
        b.expr(b.call_fn("c", vec![])),
        b.return_(Some(b.call_fn("c", vec![]))),
    ]);
    expect_number(&module, 3.0);
}

#[test]
fn test_counters_do_not_share_records() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("makeCounter").body(vec![
            b.let_("count", Some(b.num(0.0))),
            b.return_(Some(b.func_expr(
                b.arrow().expr_body(b.assign(
                    b.ident("count"),
                    b.add(b.ident("count"), b.num(1.0)),
                )),
            ))),
        ])),
        b.let_("a", Some(b.call_fn("makeCounter", vec![]))),
        b.let_("c", Some(b.call_fn("makeCounter", vec![]))),
        b.expr(b.call_fn("a", vec![])),
        b.expr(b.call_fn("a", vec![])),
        b.return_(Some(b.call_fn("c", vec![]))),
    ]);
    expect_number(&module, 1.0);
}

#[test]
fn test_closure_writes_are_visible_to_creator() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.let_("total", Some(b.num(0.0))),
        b.const_(
            "addTo",
            b.func_expr(b.arrow().param("n").expr_body(b.assign(
                b.ident("total"),
                b.add(b.ident("total"), b.ident("n")),
            ))),
        ),
        b.expr(b.call_fn("addTo", vec![b.num(40.0)])),
        b.expr(b.call_fn("addTo", vec![b.num(2.0)])),
        b.return_(Some(b.ident("total"))),
    ]);
    expect_number(&module, 42.0);
}

#[test]
fn test_captured_parameter() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("adder").param("x").body(vec![b.return_(Some(
            b.func_expr(b.arrow().param("y").expr_body(b.add(b.ident("x"), b.ident("y")))),
        ))])),
        b.return_(Some(b.call(b.call_fn("adder", vec![b.num(40.0)]), vec![b.num(2.0)]))),
    ]);
    expect_number(&module, 42.0);
}

#[test]
fn test_three_levels_of_nesting() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.let_("a", Some(b.num(100.0))),
        b.function_decl(b.function("f").body(vec![
            b.let_("x", Some(b.num(10.0))),
            b.function_decl(b.function("g").body(vec![
                b.let_("y", Some(b.num(1.0))),
                b.return_(Some(b.func_expr(b.arrow().expr_body(
                    b.add(b.add(b.ident("a"), b.ident("x")), b.ident("y")),
                )))),
            ])),
            b.return_(Some(b.call_fn("g", vec![]))),
        ])),
        b.return_(Some(b.call(b.call_fn("f", vec![]), vec![]))),
    ]);
    expect_number(&module, 111.0);
}

#[test]
fn test_named_function_expression_recursion() {
    let b = AstBuilder::new("main");
    let fact = b.function("fact").param("n").body(vec![b.return_(Some(b.cond(
        b.lt(b.ident("n"), b.num(2.0)),
        b.num(1.0),
        b.mul(b.ident("n"), b.call_fn("fact", vec![b.sub(b.ident("n"), b.num(1.0))])),
    )))]);
    let module = b.module(vec![
        b.const_("f", b.func_expr(fact)),
        b.return_(Some(b.call_fn("f", vec![b.num(5.0)]))),
    ]);
    expect_number(&module, 120.0);
}

#[test]
fn test_default_parameters() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(
            b.function("greet")
                .param("name")
                .param_default("greeting", b.str_("hello"))
                .body(vec![b.return_(Some(b.add(
                    b.add(b.ident("greeting"), b.str_(" ")),
                    b.ident("name"),
                )))]),
        ),
        b.return_(Some(b.call_fn("greet", vec![b.str_("kiln")]))),
    ]);
    expect_value(&module, Value::string("hello kiln"));
}

#[test]
fn test_destructured_parameters() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(
            b.function("sum")
                .param_pattern(
                    b.object_pat(vec![("a", b.pat("a"), None), ("b", b.pat("b"), Some(b.num(2.0)))]),
                    None,
                )
                .body(vec![b.return_(Some(b.add(b.ident("a"), b.ident("b"))))]),
        ),
        b.return_(Some(b.call_fn("sum", vec![b.object(vec![("a", b.num(40.0))])]))),
    ]);
    expect_number(&module, 42.0);
}
