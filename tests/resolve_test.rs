use mongocell::prelude::*;
use mongocell::config::Config;
use mongocell::parser::split_query_body;
use pretty_assertions::assert_eq;
use serde_json::json;

fn shop() -> SessionDefaults<'static> {
    SessionDefaults::new("prod").with_current_database("shop")
}

#[test]
fn test_chain_shapes_resolve_same_target() {
    let inputs = [
        "c['shop']['orders'].find({})",
        "c['shop'].orders.find({})",
        "c.shop.orders.find({})",
        "db['orders'].find({})",
        "db.orders.find({})",
        "c.db['orders'].find({})",
        "c.db.orders.find({})",
    ];
    for input in inputs {
        let cmd = resolve(input, InputKind::Chain, &shop()).expect(input);
        assert_eq!(cmd.database.as_deref(), Some("shop"), "{}", input);
        assert_eq!(cmd.collection.as_deref(), Some("orders"), "{}", input);
        assert_eq!(cmd.source_form, SourceForm::Chain);
        assert_eq!(cmd.instance, "prod");
    }
}

#[test]
fn test_chain_query_and_filter() {
    let cmd = resolve(
        "db['events'].find_one({'_id': {'$in': ['a', 'b']}}, {\"_id\": 1})",
        InputKind::Chain,
        &shop(),
    )
    .unwrap();

    assert_eq!(cmd.operation, Operation::FindOne);
    assert_eq!(
        cmd.query_values(),
        vec![&json!({"_id": {"$in": ["a", "b"]}}), &json!({"_id": 1})]
    );
}

#[test]
fn test_commas_inside_literals_do_not_split() {
    let args = split_query_body("{'tags': ['a, b', 'c']}, {'x': {'y': 1, 'z': 2}}").unwrap();
    assert_eq!(args.len(), 2);
    assert_eq!(args[0].value, json!({"tags": ["a, b", "c"]}));
    assert_eq!(args[1].text, "{'x': {'y': 1, 'z': 2}}");
}

#[test]
fn test_chain_errors() {
    let cases = [
        ("db['orders']", ErrorKind::MissingParentheses),
        ("db['orders'].aggregate([])", ErrorKind::UnsupportedMethod),
        ("c.db.find({})", ErrorKind::UnresolvedCollection),
        ("db['orders'].find({'a': 1)", ErrorKind::UnbalancedDelimiter),
        ("db['orders'].find({}, {}, {})", ErrorKind::TooManyQueryArgs),
    ];
    for (input, kind) in cases {
        let err = resolve(input, InputKind::Chain, &shop()).unwrap_err();
        assert_eq!(err.kind(), kind, "{}", input);
    }
}

#[test]
fn test_chain_without_default_database() {
    let err = resolve("db.orders.find({})", InputKind::Chain, &SessionDefaults::new("prod"))
        .unwrap_err();
    assert_eq!(err, ParseError::MissingDefaultDatabase);

    let cmd = resolve("c['shop'].orders.find({})", InputKind::Chain, &SessionDefaults::new("prod"))
        .unwrap();
    assert_eq!(cmd.database.as_deref(), Some("shop"));
}

#[test]
fn test_flagged_line_and_cell() {
    let cmd = resolve("show_collections -i dev -d shop", InputKind::Line, &shop()).unwrap();
    assert_eq!(cmd.operation, Operation::ShowCollections);
    assert_eq!(cmd.instance, "dev");
    assert_eq!(cmd.database.as_deref(), Some("shop"));
    assert_eq!(cmd.source_form, SourceForm::Flagged);

    let cell = "count_documents -i dev -d shop -c orders\n{\"status\": \"open\"}";
    let cmd = resolve(cell, InputKind::Cell, &shop()).unwrap();
    assert_eq!(cmd.operation, Operation::CountDocuments);
    assert_eq!(cmd.collection.as_deref(), Some("orders"));
    assert_eq!(cmd.query_values(), vec![&json!({"status": "open"})]);
}

#[test]
fn test_flagged_errors() {
    let err = resolve("show_dbs", InputKind::Line, &shop()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CommandSyntax);

    let err = resolve("find -i dev -d shop -c orders", InputKind::Cell, &shop()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LineCountMismatch);
    assert!(err.to_string().contains("Did you forget to include a query?"));

    let err = resolve("drop -i dev -d shop -c orders\n{}", InputKind::Cell, &shop()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CommandSyntax);
}

#[test]
fn test_deep_nesting_is_rejected_not_fatal() {
    let depth = 10_000;
    let nested = format!("{}{}", "[".repeat(depth), "]".repeat(depth));

    let cell = format!("find -i prod -d shop -c orders\n{}", nested);
    let err = resolve(&cell, InputKind::Cell, &shop()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::QueryBodyParse);

    let chain = format!("db.orders.find({})", nested);
    let err = resolve(&chain, InputKind::Chain, &shop()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::QueryBodyParse);
}

#[test]
fn test_surrogate_pair_escape() {
    let cmd = resolve(r"db.orders.find({'a': '\ud83d\ude00'})", InputKind::Chain, &shop()).unwrap();
    assert_eq!(cmd.query_values(), vec![&json!({"a": "\u{1F600}"})]);
}

#[test]
fn test_resolution_is_idempotent() {
    let inputs = [
        ("db['orders'].find({'a': [1, 2.5, true, null]})", InputKind::Chain),
        ("show_dbs -i prod", InputKind::Line),
        ("find -i prod -d shop -c orders\n{}, {'_id': 0}", InputKind::Cell),
    ];
    for (input, kind) in inputs {
        let first = resolve(input, kind, &shop()).unwrap();
        let second = resolve(input, kind, &shop()).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn test_session_commands_through_catalog_backend() {
    let config = Config::from_toml(
        r#"
        default_instance = "prod"

        [instances.prod.databases]
        local = []
        shop = ["orders", "customers"]
        "#,
    )
    .unwrap();
    let mut session = config.session(None).unwrap();
    assert_eq!(session.current_database(), Some("local"));

    let cmd = resolve("use shop", InputKind::Chain, &session.defaults()).unwrap();
    let response = dispatch(&cmd, &mut CatalogBackend::new(&mut session)).unwrap();
    assert_eq!(
        render(&cmd, response),
        Rendered::Text("Changed current db (db) to shop".to_string())
    );
    assert_eq!(session.current_database(), Some("shop"));

    let err = resolve("use nowhere", InputKind::Chain, &session.defaults()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownDatabase);

    let cmd = resolve("show_collections -i prod -d shop", InputKind::Line, &session.defaults())
        .unwrap();
    let response = dispatch(&cmd, &mut CatalogBackend::new(&mut session)).unwrap();
    assert_eq!(
        render(&cmd, response),
        Rendered::Markdown(
            "#### Collections in `shop` in `prod` instance\n***\n* orders\n* customers\n\n"
                .to_string()
        )
    );
}

#[test]
fn test_data_commands_need_a_driver() {
    let mut session = Session::new("prod").with_default_database(Some("shop"));
    let cmd = resolve("db.orders.find({})", InputKind::Chain, &session.defaults()).unwrap();

    let err = dispatch(&cmd, &mut CatalogBackend::new(&mut session)).unwrap_err();
    assert!(!err.is_fatal());
    assert!(matches!(err, DispatchError::Backend(msg) if msg.contains("driver")));
}
