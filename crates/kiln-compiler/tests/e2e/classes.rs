//! Classes, constructors and methods

use super::harness::*;

#[test]
fn test_fields_constructor_and_methods() {
    let b = AstBuilder::new("main");
    let class = b
        .class("Counter")
        .field("count", Some(b.num(0.0)))
        .constructor(b.anonymous().param("start").body(vec![b.expr(b.assign(
            b.member(b.this(), "count"),
            b.ident("start"),
        ))]))
        .method(
            "increment",
            b.anonymous().body(vec![
                b.expr(b.assign(
                    b.member(b.this(), "count"),
                    b.add(b.member(b.this(), "count"), b.num(1.0)),
                )),
                b.return_(Some(b.member(b.this(), "count"))),
            ]),
        )
        .static_method(
            "create",
            b.anonymous().body(vec![b.return_(Some(b.new_(b.ident("Counter"), vec![b.num(10.0)])))]),
        )
        .build();
    let module = b.module(vec![
        b.class_decl(class),
        b.let_("c", Some(b.method_call(b.ident("Counter"), "create", vec![]))),
        b.expr(b.method_call(b.ident("c"), "increment", vec![])),
        b.return_(Some(b.method_call(b.ident("c"), "increment", vec![]))),
    ]);
    expect_number(&module, 12.0);
}

#[test]
fn test_method_reads_captured_binding_through_receiver() {
    let b = AstBuilder::new("main");
    let class = b
        .class("Greeter")
        .method(
            "greet",
            b.anonymous().param("name").body(vec![b.return_(Some(b.add(b.ident("prefix"), b.ident("name"))))]),
        )
        .build();
    let module = b.module(vec![
        b.function_decl(b.function("make").param("prefix").body(vec![
            b.class_decl(class),
            b.return_(Some(b.new_(b.ident("Greeter"), vec![]))),
        ])),
        b.return_(Some(b.method_call(b.call_fn("make", vec![b.str_("hi ")]), "greet", vec![b.str_("bob")]))),
    ]);
    expect_value(&module, Value::string("hi bob"));
}

#[test]
fn test_instances_of_different_closures_keep_their_chains() {
    let b = AstBuilder::new("main");
    let class = b
        .class("Box")
        .method("get", b.anonymous().body(vec![b.return_(Some(b.ident("v")))]))
        .build();
    let module = b.module(vec![
        b.function_decl(b.function("boxed").param("v").body(vec![
            b.class_decl(class),
            b.return_(Some(b.new_(b.ident("Box"), vec![]))),
        ])),
        b.let_("a", Some(b.call_fn("boxed", vec![b.num(1.0)]))),
        b.let_("c", Some(b.call_fn("boxed", vec![b.num(2.0)]))),
        b.return_(Some(b.array(vec![
            b.method_call(b.ident("a"), "get", vec![]),
            b.method_call(b.ident("c"), "get", vec![]),
        ]))),
    ]);
    expect_display(&module, "1,2");
}

#[test]
fn test_arrow_in_method_sees_receiver() {
    let b = AstBuilder::new("main");
    let class = b
        .class("Point")
        .field("x", Some(b.num(7.0)))
        .method(
            "getter",
            b.anonymous().body(vec![b.return_(Some(b.func_expr(
                b.arrow().expr_body(b.member(b.this(), "x")),
            )))]),
        )
        .build();
    let module = b.module(vec![
        b.class_decl(class),
        b.let_("p", Some(b.new_(b.ident("Point"), vec![]))),
        b.let_("get", Some(b.method_call(b.ident("p"), "getter", vec![]))),
        b.return_(Some(b.call_fn("get", vec![]))),
    ]);
    expect_number(&module, 7.0);
}

#[test]
fn test_instanceof_and_static_fields() {
    let b = AstBuilder::new("main");
    let class = b.class("Unit").static_field("kind", Some(b.str_("unit"))).build();
    let module = b.module(vec![
        b.class_decl(class),
        b.let_("u", Some(b.new_(b.ident("Unit"), vec![]))),
        b.return_(Some(b.array(vec![
            b.binary(kiln_syntax::ast::BinaryOperator::InstanceOf, b.ident("u"), b.ident("Unit")),
            b.member(b.ident("Unit"), "kind"),
        ]))),
    ]);
    expect_display(&module, "true,unit");
}

#[test]
fn test_class_called_without_new_throws() {
    let b = AstBuilder::new("main");
    let module = b.module(vec![
        b.class_decl(b.class("C").build()),
        b.try_catch(
            vec![b.expr(b.call_fn("C", vec![]))],
            "e",
            vec![b.return_(Some(b.ident("e")))],
        ),
    ]);
    let (value, _) = run(&module).unwrap();
    assert!(value.as_str().unwrap().contains("without 'new'"));
}
