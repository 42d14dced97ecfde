//! Generators lowered to resumable state machines

use super::harness::*;

fn next(interpreter: &mut Interpreter<'_>, generator: &Value, value: Value) -> GeneratorStep {
    resume(interpreter, generator, ResumeKind::Next, value)
}

#[test]
fn test_resume_values_flow_into_yield_expressions() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("g").generator().body(vec![
            b.expr(b.yield_(Some(b.num(1.0)))),
            b.const_("x", b.yield_(Some(b.num(2.0)))),
            b.return_(Some(b.ident("x"))),
        ])),
        b.return_(Some(b.call_fn("g", vec![]))),
    ]);
    with_interpreter(&module, |interp, generator| {
        assert_eq!(next(interp, &generator, Value::Undefined), GeneratorStep::Yielded(Value::Number(1.0)));
        assert_eq!(next(interp, &generator, Value::Undefined), GeneratorStep::Yielded(Value::Number(2.0)));
        assert_eq!(next(interp, &generator, Value::Number(42.0)), GeneratorStep::Completed(Value::Number(42.0)));
        assert_eq!(next(interp, &generator, Value::Undefined), GeneratorStep::Completed(Value::Undefined));
    });
}

#[test]
fn test_generator_body_does_not_run_until_first_resume() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("g").generator().body(vec![
            b.expr(b.call_fn("log", vec![b.str_("started")])),
            b.expr(b.yield_(None)),
        ])),
        b.return_(Some(b.call_fn("g", vec![]))),
    ]);
    with_interpreter(&module, |interp, generator| {
        assert!(interp.output().is_empty());
        next(interp, &generator, Value::Undefined);
        assert_eq!(interp.output(), vec!["started"]);
    });
}

#[test]
fn test_forced_close_runs_finally() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("g").generator().body(vec![b.try_finally(
            vec![b.expr(b.yield_(Some(b.num(1.0))))],
            vec![b.expr(b.call_fn("log", vec![b.str_("sideEffect")]))],
        )])),
        b.return_(Some(b.call_fn("g", vec![]))),
    ]);
    with_interpreter(&module, |interp, generator| {
        assert_eq!(next(interp, &generator, Value::Undefined), GeneratorStep::Yielded(Value::Number(1.0)));
        assert!(interp.output().is_empty());
        let step = resume(interp, &generator, ResumeKind::Return, Value::Number(5.0));
        assert_eq!(step, GeneratorStep::Completed(Value::Number(5.0)));
        assert_eq!(interp.output(), vec!["sideEffect"]);
    });
}

#[test]
fn test_forced_close_before_start_skips_body() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("g").generator().body(vec![b.try_finally(
            vec![b.expr(b.yield_(Some(b.num(1.0))))],
            vec![b.expr(b.call_fn("log", vec![b.str_("sideEffect")]))],
        )])),
        b.return_(Some(b.call_fn("g", vec![]))),
    ]);
    with_interpreter(&module, |interp, generator| {
        let step = resume(interp, &generator, ResumeKind::Return, Value::Number(5.0));
        assert_eq!(step, GeneratorStep::Completed(Value::Number(5.0)));
        assert!(interp.output().is_empty());
        assert_eq!(next(interp, &generator, Value::Undefined), GeneratorStep::Completed(Value::Undefined));
    });
}

#[test]
fn test_finally_runs_once_after_resumed_try_body() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("g").generator().body(vec![
            b.try_finally(
                vec![
                    b.expr(b.call_fn("log", vec![b.str_("body")])),
                    b.expr(b.yield_(Some(b.num(1.0)))),
                    b.expr(b.call_fn("log", vec![b.str_("after")])),
                ],
                vec![b.expr(b.call_fn("log", vec![b.str_("finally")]))],
            ),
            b.expr(b.call_fn("log", vec![b.str_("end")])),
        ])),
        b.return_(Some(b.call_fn("g", vec![]))),
    ]);
    with_interpreter(&module, |interp, generator| {
        next(interp, &generator, Value::Undefined);
        assert_eq!(interp.output(), vec!["body"]);
        assert_eq!(next(interp, &generator, Value::Undefined), GeneratorStep::Completed(Value::Undefined));
        assert_eq!(interp.output(), vec!["body", "after", "finally", "end"]);
    });
}

#[test]
fn test_thrown_resume_is_caught_at_suspension_point() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("g").generator().body(vec![
            b.try_catch(
                vec![b.expr(b.yield_(Some(b.num(1.0))))],
                "e",
                vec![b.expr(b.yield_(Some(b.add(b.ident("e"), b.str_("!")))))],
            ),
            b.return_(Some(b.str_("end"))),
        ])),
        b.return_(Some(b.call_fn("g", vec![]))),
    ]);
    with_interpreter(&module, |interp, generator| {
        next(interp, &generator, Value::Undefined);
        let step = resume(interp, &generator, ResumeKind::Throw, Value::string("boom"));
        assert_eq!(step, GeneratorStep::Yielded(Value::string("boom!")));
        assert_eq!(next(interp, &generator, Value::Undefined), GeneratorStep::Completed(Value::string("end")));
    });
}

#[test]
fn test_uncaught_thrown_resume_completes_generator() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("g").generator().body(vec![
            b.expr(b.yield_(Some(b.num(1.0)))),
            b.expr(b.yield_(Some(b.num(2.0)))),
        ])),
        b.return_(Some(b.call_fn("g", vec![]))),
    ]);
    with_interpreter(&module, |interp, generator| {
        next(interp, &generator, Value::Undefined);
        let err = interp
            .resume_generator(&generator, ResumeKind::Throw, Value::string("boom"))
            .unwrap_err();
        assert_eq!(err.thrown(), Some(&Value::string("boom")));
        assert_eq!(next(interp, &generator, Value::Undefined), GeneratorStep::Completed(Value::Undefined));
    });
}

#[test]
fn test_yield_in_loop_keeps_locals() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("range").generator().param("n").body(vec![b.for_let(
            "i",
            b.num(0.0),
            b.lt(b.ident("i"), b.ident("n")),
            b.increment(b.ident("i")),
            b.block(vec![b.expr(b.yield_(Some(b.mul(b.ident("i"), b.num(10.0)))))]),
        )])),
        b.let_("out", Some(b.array(vec![]))),
        b.for_of(
            VariableKind::Const,
            b.pat("v"),
            b.call_fn("range", vec![b.num(3.0)]),
            b.block(vec![b.expr(b.method_call(b.ident("out"), "push", vec![b.ident("v")]))]),
        ),
        b.return_(Some(b.ident("out"))),
    ]);
    expect_display(&module, "0,10,20");
}

#[test]
fn test_generator_methods_return_iterator_results() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("g").generator().body(vec![
            b.expr(b.yield_(Some(b.num(1.0)))),
            b.return_(Some(b.num(2.0))),
        ])),
        b.let_("it", Some(b.call_fn("g", vec![]))),
        b.let_("first", Some(b.method_call(b.ident("it"), "next", vec![]))),
        b.let_("second", Some(b.method_call(b.ident("it"), "next", vec![]))),
        b.return_(Some(b.array(vec![
            b.member(b.ident("first"), "value"),
            b.member(b.ident("first"), "done"),
            b.member(b.ident("second"), "value"),
            b.member(b.ident("second"), "done"),
        ]))),
    ]);
    expect_display(&module, "1,false,2,true");
}

#[test]
fn test_delegation_collects_inner_result() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("inner").generator().body(vec![
            b.expr(b.yield_(Some(b.num(1.0)))),
            b.expr(b.yield_(Some(b.num(2.0)))),
            b.return_(Some(b.str_("inner done"))),
        ])),
        b.function_decl(b.function("outer").generator().body(vec![
            b.let_("r", Some(b.yield_star(b.call_fn("inner", vec![])))),
            b.expr(b.yield_(Some(b.ident("r")))),
        ])),
        b.let_("out", Some(b.array(vec![]))),
        b.for_of(
            VariableKind::Const,
            b.pat("v"),
            b.call_fn("outer", vec![]),
            b.block(vec![b.expr(b.method_call(b.ident("out"), "push", vec![b.ident("v")]))]),
        ),
        b.return_(Some(b.ident("out"))),
    ]);
    expect_display(&module, "1,2,inner done");
}

#[test]
fn test_delegation_over_array() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("g").generator().body(vec![
            b.expr(b.yield_star(b.array(vec![b.num(1.0), b.num(2.0)]))),
            b.expr(b.yield_(Some(b.num(3.0)))),
        ])),
        b.let_("out", Some(b.array(vec![]))),
        b.for_of(
            VariableKind::Const,
            b.pat("v"),
            b.call_fn("g", vec![]),
            b.block(vec![b.expr(b.method_call(b.ident("out"), "push", vec![b.ident("v")]))]),
        ),
        b.return_(Some(b.ident("out"))),
    ]);
    expect_display(&module, "1,2,3");
}

#[test]
fn test_delegation_forwards_sent_values() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("inner").generator().body(vec![
            b.const_("a", b.yield_(Some(b.str_("first")))),
            b.return_(Some(b.mul(b.ident("a"), b.num(2.0)))),
        ])),
        b.function_decl(b.function("outer").generator().body(vec![b.return_(Some(
            b.yield_star(b.call_fn("inner", vec![])),
        ))])),
        b.return_(Some(b.call_fn("outer", vec![]))),
    ]);
    with_interpreter(&module, |interp, generator| {
        assert_eq!(next(interp, &generator, Value::Undefined), GeneratorStep::Yielded(Value::string("first")));
        assert_eq!(next(interp, &generator, Value::Number(21.0)), GeneratorStep::Completed(Value::Number(42.0)));
    });
}

#[test]
fn test_delegation_forwards_return_and_closes_inner() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("inner").generator().body(vec![b.try_finally(
            vec![b.expr(b.yield_(Some(b.num(1.0)))), b.expr(b.yield_(Some(b.num(2.0))))],
            vec![b.expr(b.call_fn("log", vec![b.str_("inner cleanup")]))],
        )])),
        b.function_decl(b.function("outer").generator().body(vec![
            b.expr(b.yield_star(b.call_fn("inner", vec![]))),
            b.expr(b.call_fn("log", vec![b.str_("unreachable")])),
        ])),
        b.return_(Some(b.call_fn("outer", vec![]))),
    ]);
    with_interpreter(&module, |interp, generator| {
        assert_eq!(next(interp, &generator, Value::Undefined), GeneratorStep::Yielded(Value::Number(1.0)));
        let step = resume(interp, &generator, ResumeKind::Return, Value::Number(7.0));
        assert_eq!(step, GeneratorStep::Completed(Value::Number(7.0)));
        assert_eq!(interp.output(), vec!["inner cleanup"]);
    });
}

#[test]
fn test_forced_close_runs_nested_finally_blocks_inner_first() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("g").generator().body(vec![b.try_finally(
            vec![b.try_finally(
                vec![b.expr(b.yield_(Some(b.num(1.0))))],
                vec![b.expr(b.call_fn("log", vec![b.str_("inner")]))],
            )],
            vec![b.expr(b.call_fn("log", vec![b.str_("outer")]))],
        )])),
        b.return_(Some(b.call_fn("g", vec![]))),
    ]);
    with_interpreter(&module, |interp, generator| {
        assert_eq!(next(interp, &generator, Value::Undefined), GeneratorStep::Yielded(Value::Number(1.0)));
        let step = resume(interp, &generator, ResumeKind::Return, Value::Number(7.0));
        assert_eq!(step, GeneratorStep::Completed(Value::Number(7.0)));
        assert_eq!(interp.output(), vec!["inner", "outer"]);
    });
}

#[test]
fn test_delegation_forwards_throw_to_inner_handler() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("inner").generator().body(vec![
            b.try_catch(
                vec![b.expr(b.yield_(Some(b.str_("a"))))],
                "e",
                vec![b.expr(b.yield_(Some(b.add(b.str_("caught "), b.ident("e")))))],
            ),
            b.return_(Some(b.str_("done"))),
        ])),
        b.function_decl(b.function("outer").generator().body(vec![
            b.const_("r", b.yield_star(b.call_fn("inner", vec![]))),
            b.return_(Some(b.add(b.str_("r="), b.ident("r")))),
        ])),
        b.return_(Some(b.call_fn("outer", vec![]))),
    ]);
    with_interpreter(&module, |interp, generator| {
        assert_eq!(next(interp, &generator, Value::Undefined), GeneratorStep::Yielded(Value::string("a")));
        let step = resume(interp, &generator, ResumeKind::Throw, Value::string("Z"));
        assert_eq!(step, GeneratorStep::Yielded(Value::string("caught Z")));
        assert_eq!(next(interp, &generator, Value::Undefined), GeneratorStep::Completed(Value::string("r=done")));
    });
}

#[test]
fn test_throw_into_finally_replaces_pending_return() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("g").generator().body(vec![b.try_finally(
            vec![b.return_(Some(b.str_("X")))],
            vec![b.expr(b.yield_(Some(b.num(1.0))))],
        )])),
        b.return_(Some(b.call_fn("g", vec![]))),
    ]);
    with_interpreter(&module, |interp, generator| {
        assert_eq!(next(interp, &generator, Value::Undefined), GeneratorStep::Yielded(Value::Number(1.0)));
        let err = interp
            .resume_generator(&generator, ResumeKind::Throw, Value::string("B"))
            .unwrap_err();
        assert_eq!(err.thrown(), Some(&Value::string("B")));
        assert_eq!(next(interp, &generator, Value::Undefined), GeneratorStep::Completed(Value::Undefined));
    });
}

#[test]
fn test_thrown_resume_in_later_loop_iteration() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.function_decl(b.function("g").generator().body(vec![
            b.for_let(
                "i",
                b.num(0.0),
                b.lt(b.ident("i"), b.num(3.0)),
                b.increment(b.ident("i")),
                b.block(vec![b.try_catch_finally(
                    vec![b.expr(b.yield_(Some(b.ident("i"))))],
                    "e",
                    vec![b.expr(b.call_fn("log", vec![b.str_("caught")]))],
                    vec![b.expr(b.call_fn("log", vec![b.str_("fin")]))],
                )]),
            ),
            b.return_(Some(b.str_("end"))),
        ])),
        b.return_(Some(b.call_fn("g", vec![]))),
    ]);
    with_interpreter(&module, |interp, generator| {
        for i in 0..3 {
            assert_eq!(next(interp, &generator, Value::Undefined), GeneratorStep::Yielded(Value::Number(i as f64)));
        }
        let step = resume(interp, &generator, ResumeKind::Throw, Value::string("x"));
        assert_eq!(step, GeneratorStep::Completed(Value::string("end")));
        assert_eq!(interp.output(), vec!["fin", "fin", "caught", "fin"]);
    });
}
