//! Account storage, references into storage and capabilities.

use bumpalo::Bump;
use ingot::ast::{Declaration, Expr, Statement};
use ingot::interpreter::RuntimeError;
use ingot::values::PathValue;
use ingot::{
    Address, AstBuilder, CompositeKind, CountingGauge, ExecutionError, Interpreter, MemoryKind,
    NumberKind, PathDomain, StaticType, Value,
};
use pretty_assertions::assert_eq;
use std::rc::Rc;

const INT: StaticType<'static> = StaticType::Number(NumberKind::Int);

fn declarations<'a>(b: &AstBuilder<'a>) -> Vec<Declaration<'a>> {
    vec![
        b.composite("Vault", CompositeKind::Resource)
            .field("balance", INT)
            .build(),
        b.composite("Config", CompositeKind::Structure)
            .field("value", INT)
            .build(),
    ]
}

fn vault_type<'a>(b: &AstBuilder<'a>) -> StaticType<'a> {
    b.composite_type("Vault", CompositeKind::Resource)
}

/// `let account = getAuthAccount(0x1)`
fn account<'a>(b: &AstBuilder<'a>) -> Statement<'a> {
    b.let_("account", b.call(b.ident("getAuthAccount"), &[b.address(1)]))
}

/// `account.function<type_arguments>(arguments)`
fn account_call<'a>(
    b: &AstBuilder<'a>,
    function: &str,
    type_arguments: &[StaticType<'a>],
    arguments: &[(Option<&str>, &'a Expr<'a>)],
) -> &'a Expr<'a> {
    b.call_labeled(b.member(b.ident("account"), function), type_arguments, arguments)
}

/// `account.save(<-value, to: /storage/identifier)`
fn save<'a>(b: &AstBuilder<'a>, value: &'a Expr<'a>, identifier: &str) -> Statement<'a> {
    b.expr_stmt(account_call(
        b,
        "save",
        &[],
        &[(None, b.mv(value)), (Some("to"), b.storage_path(identifier))],
    ))
}

fn save_vault<'a>(b: &AstBuilder<'a>, balance: i128) -> Statement<'a> {
    save(b, b.create("Vault", &[b.int(balance)]), "vault")
}

/// `account.borrow<&Vault>(from: path)`
fn borrow_vault<'a>(b: &AstBuilder<'a>, path: &'a Expr<'a>) -> &'a Expr<'a> {
    let reference = b.reference_type(vault_type(b));
    account_call(b, "borrow", &[reference], &[(Some("from"), path)])
}

fn run_main<'a>(
    b: &AstBuilder<'a>,
    return_type: StaticType<'a>,
    body: &[Statement<'a>],
    gauge: Rc<CountingGauge>,
) -> (Interpreter<'a>, Result<Value<'a>, ExecutionError>) {
    let mut all = declarations(b);
    all.push(b.fun("main", &[], return_type, body));
    let program = b.program(&all).expect("builder is unmetered");
    let mut interpreter = Interpreter::builder(program)
        .memory_gauge(gauge)
        .build()
        .expect("declarations");
    let result = interpreter.invoke("main", vec![]);
    (interpreter, result)
}

fn stored<'a>(interpreter: &Interpreter<'a>, identifier: &str) -> Option<Value<'a>> {
    let path = PathValue::new(PathDomain::Storage, identifier);
    interpreter.storage().get(Address::from_u64(1), &path)
}

#[test]
fn test_save_and_borrow() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let gauge = Rc::new(CountingGauge::new());
    let body = [
        account(&b),
        save_vault(&b, 10),
        b.let_("vault", borrow_vault(&b, b.storage_path("vault"))),
        b.ret(b.member(b.force(b.ident("vault")), "balance")),
    ];
    let (interpreter, result) = run_main(&b, INT, &body, gauge.clone());
    assert_eq!(result.unwrap().to_string(), "10");
    assert_eq!(gauge.get(MemoryKind::StorageReference), 1);

    match stored(&interpreter, "vault") {
        Some(Value::Composite(vault)) => {
            assert_eq!(vault.name, "Vault");
            assert_eq!(vault.owner(), Some(Address::from_u64(1)));
        }
        other => panic!("expected a stored vault, got {:?}", other),
    }
}

#[test]
fn test_owner_through_reference() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let body = [
        account(&b),
        save_vault(&b, 10),
        b.ret(b.member(
            b.force(borrow_vault(&b, b.storage_path("vault"))),
            "owner",
        )),
    ];
    let return_type = b.optional_type(StaticType::Address);
    let (_, result) = run_main(&b, return_type, &body, Rc::default());
    assert_eq!(result.unwrap().to_string(), "0x0000000000000001");
}

#[test]
fn test_borrow_empty_path_is_metered() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let gauge = Rc::new(CountingGauge::new());
    let body = [account(&b), b.ret(borrow_vault(&b, b.storage_path("vault")))];
    let return_type = b.optional_type(b.reference_type(vault_type(&b)));
    let (_, result) = run_main(&b, return_type, &body, gauge.clone());
    assert_eq!(result.unwrap().to_string(), "nil");
    assert_eq!(gauge.get(MemoryKind::StorageReference), 1);
}

#[test]
fn test_load_moves_out_of_storage() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let load = account_call(
        &b,
        "load",
        &[vault_type(&b)],
        &[(Some("from"), b.storage_path("vault"))],
    );
    let body = [
        account(&b),
        save_vault(&b, 10),
        b.let_move("vault", b.force(load)),
        b.let_("balance", b.member(b.ident("vault"), "balance")),
        b.expr_stmt(b.destroy(b.ident("vault"))),
        b.ret(b.ident("balance")),
    ];
    let (interpreter, result) = run_main(&b, INT, &body, Rc::default());
    assert_eq!(result.unwrap().to_string(), "10");
    assert!(stored(&interpreter, "vault").is_none());
}

#[test]
fn test_load_with_other_type_leaves_value() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let load = account_call(&b, "load", &[INT], &[(Some("from"), b.storage_path("vault"))]);
    let body = [account(&b), save_vault(&b, 10), b.ret(load)];
    let return_type = b.optional_type(INT);
    let (interpreter, result) = run_main(&b, return_type, &body, Rc::default());
    assert_eq!(result.unwrap().to_string(), "nil");
    assert!(stored(&interpreter, "vault").is_some());
}

#[test]
fn test_save_over_existing_object() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let body = [
        account(&b),
        save_vault(&b, 10),
        save_vault(&b, 20),
        b.ret_void(),
    ];
    let (interpreter, result) = run_main(&b, StaticType::Void, &body, Rc::default());
    let err = result.unwrap_err();
    match err.runtime() {
        Some(RuntimeError::StorageOverwrite { address, path }) => {
            assert_eq!(address, "0x0000000000000001");
            assert_eq!(path, "/storage/vault");
        }
        _ => panic!("expected a storage overwrite, got {}", err),
    }
    // The first object is untouched.
    match stored(&interpreter, "vault") {
        Some(Value::Composite(vault)) => {
            assert_eq!(vault.field("balance").unwrap().to_string(), "10");
        }
        other => panic!("expected a stored vault, got {:?}", other),
    }
}

#[test]
fn test_save_to_public_path_fails() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let save_public = b.expr_stmt(account_call(
        &b,
        "save",
        &[],
        &[
            (None, b.mv(b.create("Vault", &[b.int(1)]))),
            (Some("to"), b.public_path("vault")),
        ],
    ));
    let body = [account(&b), save_public, b.ret_void()];
    let (_, result) = run_main(&b, StaticType::Void, &body, Rc::default());
    let err = result.unwrap_err();
    assert!(
        err.to_string().contains("cannot save to /public/vault"),
        "unexpected error: {}",
        err
    );
}

#[test]
fn test_copy_structure() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let config = b.composite_type("Config", CompositeKind::Structure);
    let copy = account_call(&b, "copy", &[config], &[(Some("from"), b.storage_path("config"))]);
    let body = [
        account(&b),
        save(&b, b.call(b.ident("Config"), &[b.int(5)]), "config"),
        b.var("first", b.force(copy)),
        b.assign(b.member(b.ident("first"), "value"), INT, b.int(6)),
        b.let_("second", b.force(copy)),
        b.ret(b.member(b.ident("second"), "value")),
    ];
    let (_, result) = run_main(&b, INT, &body, Rc::default());
    assert_eq!(result.unwrap().to_string(), "5");
}

#[test]
fn test_copy_resource_is_nil() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let copy = account_call(
        &b,
        "copy",
        &[vault_type(&b)],
        &[(Some("from"), b.storage_path("vault"))],
    );
    let body = [account(&b), save_vault(&b, 10), b.ret(copy)];
    let return_type = b.optional_type(vault_type(&b));
    let (_, result) = run_main(&b, return_type, &body, Rc::default());
    assert_eq!(result.unwrap().to_string(), "nil");
}

/// `account.link<&Vault>(/public/vault, target: /storage/vault)`
fn link_vault<'a>(b: &AstBuilder<'a>) -> &'a Expr<'a> {
    let reference = b.reference_type(vault_type(b));
    account_call(
        b,
        "link",
        &[reference],
        &[(None, b.public_path("vault")), (Some("target"), b.storage_path("vault"))],
    )
}

#[test]
fn test_borrow_through_capability() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let gauge = Rc::new(CountingGauge::new());
    let reference = b.reference_type(vault_type(&b));
    let body = [
        account(&b),
        save_vault(&b, 10),
        b.expr_stmt(link_vault(&b)),
        b.let_(
            "capability",
            account_call(&b, "getCapability", &[], &[(None, b.public_path("vault"))]),
        ),
        b.let_(
            "vault",
            b.force(b.call_generic(b.member(b.ident("capability"), "borrow"), &[reference], &[])),
        ),
        b.ret(b.member(b.ident("vault"), "balance")),
    ];
    let (_, result) = run_main(&b, INT, &body, gauge.clone());
    assert_eq!(result.unwrap().to_string(), "10");
    assert_eq!(gauge.get(MemoryKind::Link), 1);
    // one from `link`, one from `getCapability`
    assert_eq!(gauge.get(MemoryKind::Capability), 2);
    assert_eq!(gauge.get(MemoryKind::StorageReference), 1);
}

#[test]
fn test_link_to_occupied_path() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let body = [
        account(&b),
        save_vault(&b, 10),
        b.expr_stmt(link_vault(&b)),
        b.ret(link_vault(&b)),
    ];
    let return_type = b.optional_type(b.capability_type(b.reference_type(vault_type(&b))));
    let (_, result) = run_main(&b, return_type, &body, Rc::default());
    assert_eq!(result.unwrap().to_string(), "nil");
}

#[test]
fn test_check_and_unlink() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let reference = b.reference_type(vault_type(&b));
    let config_reference = b.reference_type(b.composite_type("Config", CompositeKind::Structure));
    let check = |ty| b.call_generic(b.member(b.ident("capability"), "check"), &[ty], &[]);
    let body = [
        account(&b),
        save_vault(&b, 10),
        b.expr_stmt(link_vault(&b)),
        b.let_(
            "capability",
            account_call(&b, "getCapability", &[], &[(None, b.public_path("vault"))]),
        ),
        b.let_("linked", check(reference)),
        b.let_("other", check(config_reference)),
        b.expr_stmt(account_call(&b, "unlink", &[], &[(None, b.public_path("vault"))])),
        b.ret(b.array(
            b.array_type(StaticType::Bool),
            &[b.ident("linked"), b.ident("other"), check(reference)],
        )),
    ];
    let (interpreter, result) = run_main(&b, b.array_type(StaticType::Bool), &body, Rc::default());
    assert_eq!(result.unwrap().to_string(), "[true, false, false]");
    // Unlinking leaves the stored object alone.
    assert!(stored(&interpreter, "vault").is_some());
}

/// `account.link<&Vault>(path, target: target)`
fn link<'a>(b: &AstBuilder<'a>, path: &'a Expr<'a>, target: &'a Expr<'a>) -> Statement<'a> {
    let reference = b.reference_type(vault_type(b));
    b.expr_stmt(account_call(
        b,
        "link",
        &[reference],
        &[(None, path), (Some("target"), target)],
    ))
}

#[test]
fn test_borrow_through_link_chain() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let reference = b.reference_type(vault_type(&b));
    let body = [
        account(&b),
        save_vault(&b, 7),
        link(&b, b.public_path("vault"), b.private_path("vault")),
        link(&b, b.private_path("vault"), b.storage_path("vault")),
        b.let_(
            "capability",
            account_call(&b, "getCapability", &[], &[(None, b.public_path("vault"))]),
        ),
        b.let_(
            "vault",
            b.force(b.call_generic(b.member(b.ident("capability"), "borrow"), &[reference], &[])),
        ),
        b.ret(b.member(b.ident("vault"), "balance")),
    ];
    let (_, result) = run_main(&b, INT, &body, Rc::default());
    assert_eq!(result.unwrap().to_string(), "7");
}

#[test]
fn test_cyclic_links_borrow_nil() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let reference = b.reference_type(vault_type(&b));
    let body = [
        account(&b),
        save_vault(&b, 7),
        link(&b, b.public_path("a"), b.private_path("b")),
        link(&b, b.private_path("b"), b.public_path("a")),
        b.let_(
            "capability",
            account_call(&b, "getCapability", &[], &[(None, b.public_path("a"))]),
        ),
        b.let_(
            "borrowed",
            b.call_generic(b.member(b.ident("capability"), "borrow"), &[reference], &[]),
        ),
        b.if_(
            b.call_generic(b.member(b.ident("capability"), "check"), &[reference], &[]),
            &[b.ret(b.string("checked"))],
            None,
        ),
        b.ret(b.conditional(
            b.eq(b.ident("borrowed"), b.nil()),
            b.string("nil"),
            b.string("borrowed"),
        )),
    ];
    let (interpreter, result) = run_main(&b, StaticType::String, &body, Rc::default());
    assert_eq!(result.unwrap().to_string(), "\"nil\"");
    assert!(stored(&interpreter, "vault").is_some());
}
