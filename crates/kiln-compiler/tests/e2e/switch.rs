//! Switch statements: case selection, fallthrough and breaks

use super::harness::*;

fn log(b: &AstBuilder, text: &str) -> kiln_syntax::ast::Statement {
    b.expr(b.call_fn("log", vec![b.str_(text)]))
}

#[test]
fn test_cases_fall_through_until_break() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("describe").param("x").body(vec![b.switch(
            b.ident("x"),
            vec![
                b.case(b.num(1.0), vec![log(&b, "one")]),
                b.case(b.num(2.0), vec![log(&b, "two"), b.break_(None)]),
                b.default_case(vec![log(&b, "other")]),
                b.case(b.num(3.0), vec![log(&b, "three")]),
            ],
        )])),
        b.expr(b.call_fn("describe", vec![b.num(1.0)])),
        b.expr(b.call_fn("describe", vec![b.num(3.0)])),
        b.expr(b.call_fn("describe", vec![b.num(9.0)])),
    ]);
    // a trailing case after default is still matched by its test
    expect_output(&module, &["one", "two", "three", "other", "three"]);
}

#[test]
fn test_cases_compare_strictly() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.let_("result", Some(b.str_("none"))),
        b.switch(
            b.str_("1"),
            vec![
                b.case(b.num(1.0), vec![b.expr(b.assign(b.ident("result"), b.str_("number"))), b.break_(None)]),
                b.case(b.str_("1"), vec![b.expr(b.assign(b.ident("result"), b.str_("string"))), b.break_(None)]),
            ],
        ),
        b.return_(Some(b.ident("result"))),
    ]);
    expect_value(&module, Value::string("string"));
}

#[test]
fn test_break_inside_switch_runs_finally() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("run").param("x").body(vec![
            b.switch(
                b.ident("x"),
                vec![
                    b.case(
                        b.num(1.0),
                        vec![
                            b.try_finally(
                                vec![log(&b, "one"), b.break_(None)],
                                vec![log(&b, "cleanup")],
                            ),
                            log(&b, "unreachable"),
                        ],
                    ),
                    b.case(b.num(2.0), vec![log(&b, "two")]),
                    b.default_case(vec![log(&b, "default")]),
                ],
            ),
            log(&b, "after"),
        ])),
        b.expr(b.call_fn("run", vec![b.num(1.0)])),
        b.expr(b.call_fn("run", vec![b.num(2.0)])),
    ]);
    expect_output(&module, &["one", "cleanup", "after", "two", "default", "after"]);
}

#[test]
fn test_continue_passes_through_switch_to_loop() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![b.for_let(
        "i",
        b.num(0.0),
        b.lt(b.ident("i"), b.num(3.0)),
        b.increment(b.ident("i")),
        b.block(vec![
            b.switch(
                b.ident("i"),
                vec![
                    b.case(b.num(1.0), vec![b.continue_(None)]),
                    b.default_case(vec![b.expr(b.call_fn("log", vec![b.ident("i")]))]),
                ],
            ),
            log(&b, "end"),
        ]),
    )]);
    expect_output(&module, &["0", "end", "2", "end"]);
}

#[test]
fn test_labeled_break_leaves_loop_from_switch() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.let_("seen", Some(b.num(0.0))),
        b.labeled(
            "scan",
            b.for_let(
                "i",
                b.num(0.0),
                b.lt(b.ident("i"), b.num(10.0)),
                b.increment(b.ident("i")),
                b.block(vec![b.switch(
                    b.ident("i"),
                    vec![
                        b.case(b.num(4.0), vec![b.break_(Some("scan"))]),
                        b.default_case(vec![b.expr(b.increment(b.ident("seen")))]),
                    ],
                )]),
            ),
        ),
        b.return_(Some(b.ident("seen"))),
    ]);
    expect_number(&module, 4.0);
}

#[test]
fn test_case_bindings_are_captured() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("pick").param("x").body(vec![b.switch(
            b.ident("x"),
            vec![
                b.case(
                    b.str_("a"),
                    vec![
                        b.let_("tag", Some(b.str_("first"))),
                        b.return_(Some(b.func_expr(b.arrow().expr_body(b.ident("tag"))))),
                    ],
                ),
                b.default_case(vec![b.return_(Some(b.func_expr(b.arrow().expr_body(b.str_("none")))))]),
            ],
        )])),
        b.return_(Some(b.add(
            b.call(b.call_fn("pick", vec![b.str_("a")]), vec![]),
            b.call(b.call_fn("pick", vec![b.str_("z")]), vec![]),
        ))),
    ]);
    expect_value(&module, Value::string("firstnone"));
}

#[test]
fn test_yield_inside_switch_case() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("g").generator().param("x").body(vec![
            b.switch(
                b.ident("x"),
                vec![b.case(
                    b.num(1.0),
                    vec![b.try_finally(
                        vec![b.expr(b.yield_(Some(b.str_("in case")))), log(&b, "resumed")],
                        vec![log(&b, "fin")],
                    )],
                )],
            ),
            b.return_(Some(b.str_("done"))),
        ])),
        b.return_(Some(b.call_fn("g", vec![b.num(1.0)]))),
    ]);
    with_interpreter(&module, |interp, generator| {
        let step = resume(interp, &generator, ResumeKind::Next, Value::Undefined);
        assert_eq!(step, GeneratorStep::Yielded(Value::string("in case")));
        let step = resume(interp, &generator, ResumeKind::Next, Value::Undefined);
        assert_eq!(step, GeneratorStep::Completed(Value::string("done")));
        assert_eq!(interp.output(), vec!["resumed", "fin"]);
    });
}
