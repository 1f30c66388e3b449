use federation_composition::{compose, CompositionError, Subgraph};

fn subgraph(name: &str, schema: &str) -> Subgraph {
    Subgraph::new(name, &format!("https://{name}.internal"), schema)
}

#[test]
fn unparsable_subgraph_is_fatal() {
    let result = compose(vec![subgraph("broken", "type Query {")]);
    let errors = result.errors();
    assert_eq!(errors.len(), 1);
    let message = errors[0].to_string();
    assert!(message.starts_with("The subgraph \"broken\" could not be federated"), "{message}");
}

#[test]
fn any_normalization_failure_aborts_the_whole_batch() {
    let result = compose(vec![
        subgraph("good", "type Query { a: String }"),
        subgraph("bad", "type Query { b: Missing }"),
    ]);
    assert!(!result.is_success());
    let message = result.errors()[0].to_string();
    assert!(message.contains("\"bad\""), "{message}");
    assert!(message.contains("\"Missing\""), "{message}");
}

#[test]
fn extension_merging_is_order_independent() {
    let base_first = compose(vec![subgraph(
        "a",
        r#"
        type Query { a: String }
        extend type Query { b: String }
        "#,
    )]);
    let extension_first = compose(vec![subgraph(
        "a",
        r#"
        extend type Query { b: String }
        type Query { a: String }
        "#,
    )]);
    let base_first = base_first.into_result().expect("base-first should compose");
    let extension_first = extension_first.into_result().expect("extension-first should compose");
    assert_eq!(base_first.federated_schema, extension_first.federated_schema);
    assert!(base_first.federated_schema.contains("a: String"));
    assert!(base_first.federated_schema.contains("b: String"));
}

#[test]
fn extension_without_base_is_fatal() {
    let result = compose(vec![subgraph(
        "a",
        r#"
        type Query { thing: String }
        extend type Thing { x: Int }
        "#,
    )]);
    let message = result.errors()[0].to_string();
    assert!(message.contains("\"Thing\" is an extension, but no base"), "{message}");
}

#[test]
fn extends_directive_is_the_extension_spelling() {
    let result = compose(vec![subgraph(
        "a",
        r#"
        type Query { thing: String }
        type Thing @extends { x: Int }
        "#,
    )]);
    let message = result.errors()[0].to_string();
    assert!(message.contains("\"Thing\" is an extension, but no base"), "{message}");
}

#[test]
fn root_operation_types_may_be_extension_only() {
    let result = compose(vec![subgraph("a", "extend type Query { a: String }")]);
    assert!(result.is_success(), "{:?}", result.errors());
}

#[test]
fn empty_object_type_is_fatal() {
    let result = compose(vec![subgraph("a", "type Query { t: Thing } type Thing")]);
    let message = result.errors()[0].to_string();
    assert!(message.contains("The Object \"Thing\" must define at least one field."), "{message}");
}

#[test]
fn empty_query_root_is_allowed() {
    let result = compose(vec![subgraph("a", "type Query")]);
    assert!(result.is_success(), "{:?}", result.errors());
}

#[test]
fn shareable_type_sugar_expands_to_every_directly_declared_field() {
    let partner = r#"
        type Object @shareable { a: String b: String }
    "#;
    let sugared = compose(vec![
        subgraph("a", "type Object @shareable { a: String b: String }"),
        subgraph("b", partner),
    ]);
    let explicit = compose(vec![
        subgraph("a", "type Object { a: String @shareable b: String @shareable }"),
        subgraph("b", partner),
    ]);
    let sugared = sugared.into_result().expect("type-level sugar should compose");
    let explicit = explicit.into_result().expect("field-level directives should compose");
    assert_eq!(sugared.federated_schema, explicit.federated_schema);
}

#[test]
fn shareable_sugar_does_not_cover_extension_blocks() {
    // The extend block does not repeat @shareable, so "b" is unshareable in
    // subgraph a while "a" is covered by the sugar.
    let result = compose(vec![
        subgraph(
            "a",
            r#"
            type Object @shareable { a: String }
            extend type Object { b: String }
            "#,
        ),
        subgraph("b", "type Object { a: String @shareable b: String }"),
    ]);
    assert!(!result.is_success());
    let has_shareability_error = result.errors().iter().any(|error| match error {
        CompositionError::InvalidFieldShareability { field_errors, .. } => {
            field_errors.iter().any(|field| field.field_name == "b")
                && field_errors.iter().all(|field| field.field_name != "a")
        }
        _ => false,
    });
    assert!(has_shareability_error, "{:?}", result.errors());
}

#[test]
fn subgraph_protocol_fields_are_stripped_from_root_types() {
    let result = compose(vec![subgraph(
        "a",
        r#"
        type Query { a: String _service: String _entities: String }
        "#,
    )])
    .into_result()
    .expect("should compose");
    assert!(!result.federated_schema.contains("_service"));
    assert!(!result.federated_schema.contains("_entities"));
    let configuration = &result.subgraph_configurations_by_name["a"];
    let query = &configuration.configuration_data_by_type_name["Query"];
    assert!(query.field_names.contains("a"));
    assert!(!query.field_names.contains("_service"));
}

#[test]
fn undefined_type_reference_is_fatal() {
    let result = compose(vec![subgraph("a", "type Query { t: Missing }")]);
    let message = result.errors()[0].to_string();
    assert!(
        message.contains("The type \"Missing\" was referenced in the schema, but it was never defined."),
        "{message}"
    );
}

#[test]
fn undefined_directive_is_fatal() {
    let result = compose(vec![subgraph("a", "type Query { a: String @mystery }")]);
    let message = result.errors()[0].to_string();
    assert!(message.contains("@mystery"), "{message}");
    assert!(message.contains("never defined"), "{message}");
}

#[test]
fn subgraph_defined_directives_extend_the_known_table() {
    let result = compose(vec![subgraph(
        "a",
        r#"
        directive @mystery(level: Int) on FIELD_DEFINITION
        type Query { a: String @mystery(level: 3) }
        "#,
    )]);
    assert!(result.is_success(), "{:?}", result.errors());
}

#[test]
fn key_fields_may_not_take_arguments() {
    let result = compose(vec![subgraph(
        "a",
        r#"
        type Query { e: Entity }
        type Entity @key(fields: "id") { id(format: String): ID! }
        "#,
    )]);
    let message = result.errors()[0].to_string();
    assert!(message.contains("@key"), "{message}");
    assert!(message.contains("defines arguments"), "{message}");
}

#[test]
fn malformed_field_set_echoes_the_input() {
    let result = compose(vec![subgraph(
        "a",
        r#"
        type Query { e: Entity }
        type Entity @key(fields: "id {") { id: ID! }
        "#,
    )]);
    let message = result.errors()[0].to_string();
    assert!(message.contains("id {"), "{message}");
}

#[test]
fn duplicate_field_definitions_are_fatal() {
    let result = compose(vec![subgraph(
        "a",
        r#"
        type Query { a: String }
        extend type Query { a: Int }
        "#,
    )]);
    let message = result.errors()[0].to_string();
    assert!(
        message.contains("must only define the field definition \"a\" once"),
        "{message}"
    );
}

#[test]
fn duplicate_identical_keys_are_deduplicated_not_an_error() {
    let result = compose(vec![subgraph(
        "a",
        r#"
        type Query { e: Entity }
        type Entity @key(fields: "id") @key(fields: "  id ") { id: ID! }
        "#,
    )])
    .into_result()
    .expect("duplicate identical keys should compose");
    let configuration = &result.subgraph_configurations_by_name["a"];
    let entity = &configuration.configuration_data_by_type_name["Entity"];
    assert_eq!(entity.keys.len(), 1);
    assert_eq!(entity.keys[0].selection_set, "id");
}

#[test]
fn configure_description_without_any_description_is_invalid() {
    let result = compose(vec![subgraph(
        "a",
        "type Query @configureDescription(propagateToFederatedGraph: true) { a: String }",
    )]);
    let message = result.errors()[0].to_string();
    assert!(message.contains("configureDescription"), "{message}");
    assert!(message.contains("Neither a description"), "{message}");
}

#[test]
fn implementing_type_must_cover_interface_fields_within_the_subgraph() {
    let result = compose(vec![subgraph(
        "a",
        r#"
        type Query { n: Named }
        interface Named { id: ID! name: String }
        type Named1 implements Named { id: ID! }
        "#,
    )]);
    let message = result.errors()[0].to_string();
    assert!(message.contains("\"Named1\""), "{message}");
    assert!(message.contains("\"name\""), "{message}");
}
