use federation_composition::{compose, Subgraph};

fn subgraph(name: &str, schema: &str) -> Subgraph {
    Subgraph::new(name, &format!("https://{name}.internal"), schema)
}

#[test]
fn configuration_data_marks_root_nodes_and_keys() {
    let result = compose(vec![
        subgraph(
            "users",
            r#"
            type Query { me: User }
            type User @key(fields: "id") { id: ID! name: String! }
            "#,
        ),
        subgraph(
            "reviews",
            "type User @key(fields: \"id\") { id: ID! reviewCount: Int! }",
        ),
    ])
    .into_result()
    .expect("should compose");

    let users = &result.subgraph_configurations_by_name["users"];
    assert_eq!(users.routing_url, "https://users.internal");

    let query = &users.configuration_data_by_type_name["Query"];
    assert!(query.is_root_node);
    assert!(query.field_names.contains("me"));
    assert!(query.keys.is_empty());

    let user = &users.configuration_data_by_type_name["User"];
    assert!(user.is_root_node);
    assert_eq!(user.keys.len(), 1);
    assert_eq!(user.keys[0].field_name, "");
    assert_eq!(user.keys[0].selection_set, "id");
    assert!(user.field_names.contains("id"));
    assert!(user.field_names.contains("name"));

    let reviews_user = &result.subgraph_configurations_by_name["reviews"].configuration_data_by_type_name["User"];
    assert!(reviews_user.field_names.contains("reviewCount"));
    assert!(!reviews_user.field_names.contains("name"));
}

#[test]
fn external_key_fields_stay_router_addressable() {
    let result = compose(vec![subgraph(
        "a",
        r#"
        type Query { e: Entity }
        type Entity @key(fields: "id") { id: ID! @external name: String }
        "#,
    )])
    .into_result()
    .expect("should compose");
    let entity = &result.subgraph_configurations_by_name["a"].configuration_data_by_type_name["Entity"];
    assert!(entity.field_names.contains("id"), "{:?}", entity.field_names);
    assert!(entity.external_field_names.contains("id"));
}

#[test]
fn non_key_external_fields_are_excluded_from_field_names() {
    let result = compose(vec![
        subgraph(
            "a",
            r#"
            type Query { e: Entity @provides(fields: "name") }
            type Entity @key(fields: "id") { id: ID! name: String @external }
            "#,
        ),
        subgraph("b", "type Entity @key(fields: \"id\") { id: ID! name: String }"),
    ])
    .into_result()
    .expect("should compose");
    let entity = &result.subgraph_configurations_by_name["a"].configuration_data_by_type_name["Entity"];
    assert!(!entity.field_names.contains("name"), "{:?}", entity.field_names);
    assert!(entity.external_field_names.contains("name"));
}

#[test]
fn provides_and_requires_are_recorded_per_field() {
    let result = compose(vec![
        subgraph(
            "a",
            r#"
            type Query { e: Entity @provides(fields: "weight") }
            type Entity @key(fields: "id") { id: ID! weight: Float @external }
            "#,
        ),
        subgraph(
            "b",
            r#"
            type Entity @key(fields: "id") {
              id: ID!
              weight: Float
              shippingCost: String @requires(fields: "weight")
            }
            "#,
        ),
    ])
    .into_result()
    .expect("should compose");

    let query = &result.subgraph_configurations_by_name["a"].configuration_data_by_type_name["Query"];
    assert_eq!(query.provides.len(), 1);
    assert_eq!(query.provides[0].field_name, "e");
    assert_eq!(query.provides[0].selection_set, "weight");

    let entity = &result.subgraph_configurations_by_name["b"].configuration_data_by_type_name["Entity"];
    assert_eq!(entity.requires.len(), 1);
    assert_eq!(entity.requires[0].field_name, "shippingCost");
    assert_eq!(entity.requires[0].selection_set, "weight");
}

#[test]
fn overridden_fields_leave_the_source_subgraph_configuration() {
    let result = compose(vec![
        subgraph(
            "a",
            r#"
            type Query { e: Entity }
            type Entity @key(fields: "id") { id: ID! name: String }
            "#,
        ),
        subgraph(
            "b",
            "type Entity @key(fields: \"id\") { id: ID! name: String @override(from: \"a\") }",
        ),
    ])
    .into_result()
    .expect("should compose");
    let source = &result.subgraph_configurations_by_name["a"].configuration_data_by_type_name["Entity"];
    assert!(!source.field_names.contains("name"), "{:?}", source.field_names);
    assert!(source.field_names.contains("id"));
    let target = &result.subgraph_configurations_by_name["b"].configuration_data_by_type_name["Entity"];
    assert!(target.field_names.contains("name"));
}

#[test]
fn authorization_data_flows_into_field_configurations() {
    let result = compose(vec![subgraph(
        "a",
        r#"
        type Query {
          user(id: ID!): String @authenticated @requiresScopes(scopes: [["read:users"]])
        }
        "#,
    )])
    .into_result()
    .expect("should compose");

    assert_eq!(result.field_configurations.len(), 1);
    let field = &result.field_configurations[0];
    assert_eq!(field.type_name, "Query");
    assert_eq!(field.field_name, "user");
    assert_eq!(field.argument_names, vec!["id".to_owned()]);
    assert!(field.requires_authentication);
    assert_eq!(field.required_scopes, vec![vec!["read:users".to_owned()]]);

    assert_eq!(result.argument_configurations.len(), 1);
    assert_eq!(result.argument_configurations[0].argument_names, vec!["id".to_owned()]);

    assert!(
        result.federated_schema.contains("@authenticated @requiresScopes(scopes: [[\"read:users\"]])"),
        "{}",
        result.federated_schema
    );
}

#[test]
fn type_level_authorization_covers_every_field() {
    let result = compose(vec![subgraph(
        "a",
        r#"
        type Query { e: Entity }
        type Entity @key(fields: "id") @authenticated { id: ID! name: String }
        "#,
    )])
    .into_result()
    .expect("should compose");
    assert!(result
        .field_configurations
        .iter()
        .filter(|field| field.type_name == "Entity")
        .all(|field| field.requires_authentication));
}

#[test]
fn custom_root_operation_types_are_renamed() {
    let result = compose(vec![subgraph(
        "a",
        r#"
        schema { query: RootQuery }
        type RootQuery { x: String }
        "#,
    )])
    .into_result()
    .expect("should compose");
    assert!(result.federated_schema.contains("type Query"), "{}", result.federated_schema);
    assert!(!result.federated_schema.contains("RootQuery"), "{}", result.federated_schema);
    let configuration = &result.subgraph_configurations_by_name["a"];
    assert!(configuration.configuration_data_by_type_name.contains_key("Query"));
    assert!(!configuration.configuration_data_by_type_name.contains_key("RootQuery"));
}

#[test]
fn configuration_data_serializes_in_camel_case() {
    let result = compose(vec![subgraph(
        "a",
        r#"
        type Query { e: Entity }
        type Entity @key(fields: "id") { id: ID! }
        "#,
    )])
    .into_result()
    .expect("should compose");
    let entity = &result.subgraph_configurations_by_name["a"].configuration_data_by_type_name["Entity"];
    let json = serde_json::to_value(entity).expect("should serialize");
    assert_eq!(json["typeName"], "Entity");
    assert_eq!(json["isRootNode"], true);
    assert_eq!(json["fieldNames"][0], "id");
    assert_eq!(json["keys"][0]["selectionSet"], "id");
}

#[test]
fn entity_interface_configuration_lists_concrete_types() {
    let result = compose(vec![
        subgraph(
            "a",
            r#"
            type Query { media: Media }
            interface Media @key(fields: "id") { id: ID! title: String }
            type Book implements Media @key(fields: "id") { id: ID! title: String }
            "#,
        ),
        subgraph(
            "b",
            "type Media @interfaceObject @key(fields: \"id\") { id: ID! reviewCount: Int! }",
        ),
    ])
    .into_result()
    .expect("should compose");

    let media_a = &result.subgraph_configurations_by_name["a"].configuration_data_by_type_name["Media"];
    assert!(media_a.is_root_node);
    assert!(media_a.entity_interface_concrete_type_names.contains("Book"));
    assert!(!media_a.is_interface_object);

    let media_b = &result.subgraph_configurations_by_name["b"].configuration_data_by_type_name["Media"];
    assert!(media_b.is_interface_object);
}
