use federation_composition::{compose, CompositionError, CompositionWarning, Subgraph};

fn subgraph(name: &str, schema: &str) -> Subgraph {
    Subgraph::new(name, &format!("https://{name}.internal"), schema)
}

// #1.1
#[test]
fn most_restrictive_compatible_argument_type_wins() {
    let result = compose(vec![
        subgraph("a", "type Object @shareable { field(input: Float): String }"),
        subgraph("b", "type Object @shareable { field(input: Float!): String }"),
    ])
    .into_result()
    .expect("compatible argument types should compose");
    assert!(
        result.federated_schema.contains("field(input: Float!): String"),
        "{}",
        result.federated_schema
    );
}

// #1.2
#[test]
fn most_restrictive_compatible_argument_type_wins_reversed() {
    let result = compose(vec![
        subgraph("b", "type Object @shareable { field(input: Float!): String }"),
        subgraph("a", "type Object @shareable { field(input: Float): String }"),
    ])
    .into_result()
    .expect("compatible argument types should compose");
    assert!(
        result.federated_schema.contains("field(input: Float!): String"),
        "{}",
        result.federated_schema
    );
}

#[test]
fn incompatible_named_field_types_are_an_error() {
    let result = compose(vec![
        subgraph("a", "type Object @shareable { field: String }"),
        subgraph("b", "type Object @shareable { field: Int }"),
    ]);
    assert!(result
        .errors()
        .iter()
        .any(|error| matches!(error, CompositionError::IncompatibleFieldTypes { field_path, .. } if field_path == "Object.field")));
}

#[test]
fn input_object_fields_merge_by_intersection() {
    let result = compose(vec![
        subgraph(
            "a",
            r#"
            type Query { tm(input: TechnicalMachine): String }
            input TechnicalMachine { move: String! number: Int! name: String }
            "#,
        ),
        subgraph(
            "b",
            "input TechnicalMachine { move: String number: Int cost: Float reusable: Boolean }",
        ),
    ])
    .into_result()
    .expect("input intersection should compose");
    let schema = &result.federated_schema;
    assert!(schema.contains("move: String!"), "{schema}");
    assert!(schema.contains("number: Int!"), "{schema}");
    assert!(!schema.contains("cost"), "{schema}");
    assert!(!schema.contains("reusable"), "{schema}");
    assert!(!schema.contains("name: String"), "{schema}");
}

#[test]
fn required_input_field_dropped_by_intersection_is_an_error() {
    let result = compose(vec![
        subgraph(
            "a",
            r#"
            type Query { tm(input: TechnicalMachine): String }
            input TechnicalMachine { move: String! }
            "#,
        ),
        subgraph("b", "input TechnicalMachine { number: Int! }"),
    ]);
    assert!(!result.is_success());
    let message = result
        .errors()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n");
    assert!(message.contains("required"), "{message}");
    assert!(message.contains("\"move\"") || message.contains("\"number\""), "{message}");
}

#[test]
fn unshareable_duplicate_entity_field_is_an_error() {
    let result = compose(vec![
        subgraph("a", "type Entity @key(fields: \"id\") { id: ID! name: String }"),
        subgraph("b", "type Entity @key(fields: \"id\") { id: ID! name: String }"),
    ]);
    assert!(!result.is_success());
    let shareability = result.errors().iter().find_map(|error| match error {
        CompositionError::InvalidFieldShareability { type_name, field_errors } => {
            Some((type_name.clone(), field_errors.clone()))
        }
        _ => None,
    });
    let (type_name, field_errors) = shareability.expect("expected a shareability error");
    assert_eq!(type_name, "Entity");
    // The key field "id" is implicitly shareable; only "name" conflicts.
    assert_eq!(field_errors.len(), 1);
    assert_eq!(field_errors[0].field_name, "name");
}

#[test]
fn one_unshareable_instance_is_tolerated() {
    let result = compose(vec![
        subgraph("a", "type Entity @key(fields: \"id\") { id: ID! name: String @shareable }"),
        subgraph("b", "type Entity @key(fields: \"id\") { id: ID! name: String }"),
    ]);
    assert!(result.is_success(), "{:?}", result.errors());
}

#[test]
fn override_resolves_the_shareability_conflict() {
    let result = compose(vec![
        subgraph("a", "type Entity @key(fields: \"id\") { id: ID! name: String }"),
        subgraph(
            "b",
            "type Entity @key(fields: \"id\") { id: ID! name: String @override(from: \"a\") }",
        ),
    ]);
    assert!(result.is_success(), "{:?}", result.errors());
}

#[test]
fn override_target_must_be_a_composed_subgraph() {
    let result = compose(vec![
        subgraph("a", "type Entity @key(fields: \"id\") { id: ID! }"),
        subgraph(
            "b",
            "type Entity @key(fields: \"id\") { id: ID! name: String @override(from: \"nope\") }",
        ),
    ]);
    assert!(result.errors().iter().any(|error| matches!(
        error,
        CompositionError::InvalidOverrideTargetSubgraphName { target_subgraph_name, .. }
            if target_subgraph_name == "nope"
    )));
}

#[test]
fn a_field_may_only_be_overridden_by_one_subgraph() {
    let result = compose(vec![
        subgraph("c", "type Entity @key(fields: \"id\") { id: ID! name: String }"),
        subgraph(
            "a",
            "type Entity @key(fields: \"id\") { id: ID! name: String @override(from: \"c\") }",
        ),
        subgraph(
            "b",
            "type Entity @key(fields: \"id\") { id: ID! name: String @override(from: \"c\") }",
        ),
    ]);
    assert!(result
        .errors()
        .iter()
        .any(|error| matches!(error, CompositionError::DuplicateOverriddenFields { .. })));
}

#[test]
fn overriding_the_declaring_subgraph_is_a_warning() {
    let result = compose(vec![subgraph(
        "a",
        "type Entity @key(fields: \"id\") { id: ID! name: String @override(from: \"a\") }",
    )]);
    assert!(result.is_success(), "{:?}", result.errors());
    assert!(result.warnings().iter().any(|warning| matches!(
        warning,
        CompositionWarning::EquivalentSourceAndTargetOverride { subgraph_name, .. }
            if subgraph_name == "a"
    )));
}

#[test]
fn output_only_enum_values_merge_by_union() {
    let result = compose(vec![
        subgraph("a", "type Query { e: E } enum E { A B }"),
        subgraph("b", "enum E { B C }"),
    ])
    .into_result()
    .expect("output-only enums should compose");
    assert!(
        result.federated_schema.contains("enum E {\n  A\n  B\n  C\n}"),
        "{}",
        result.federated_schema
    );
}

#[test]
fn input_position_enum_values_merge_by_intersection() {
    let result = compose(vec![
        subgraph("a", "type Query { f(e: E): String } enum E { A B }"),
        subgraph("b", "enum E { B C }"),
    ])
    .into_result()
    .expect("input-only enums should compose");
    assert!(
        result.federated_schema.contains("enum E {\n  B\n}"),
        "{}",
        result.federated_schema
    );
}

#[test]
fn inconsistent_enum_in_both_positions_is_an_error() {
    let result = compose(vec![
        subgraph("a", "type Query { f(e: E): E } enum E { A B }"),
        subgraph("b", "enum E { B }"),
    ]);
    let error = result
        .errors()
        .iter()
        .find(|error| matches!(error, CompositionError::IncompatibleSharedEnum { .. }))
        .expect("expected an incompatible shared enum error");
    insta::assert_snapshot!(
        error.to_string(),
        @r###"Enum "E" was used as both an input and output but was inconsistently defined across inclusive subgraphs."###
    );
}

#[test]
fn enum_value_removal_is_tolerated_under_inaccessible() {
    let result = compose(vec![
        subgraph("a", "type Query { f(e: E): E } enum E { A @inaccessible B }"),
        subgraph("b", "enum E { B }"),
    ])
    .into_result()
    .expect("inaccessible removals should compose");
    assert!(
        result.federated_schema.contains("enum E {\n  B\n}"),
        "{}",
        result.federated_schema
    );
}

#[test]
fn union_members_merge_by_union() {
    let result = compose(vec![
        subgraph("a", "type Query { u: U } union U = A type A @shareable { x: String }"),
        subgraph("b", "union U = A | B type A @shareable { x: String } type B { y: String }"),
    ]);
    let result = result.into_result().expect("unions should merge by union");
    assert!(result.federated_schema.contains("union U = A | B"), "{}", result.federated_schema);
}

#[test]
fn inaccessible_interface_field_may_be_supplied_by_another_subgraph() {
    let shared = r#"
        type Query { n: Named }
        interface Named { id: ID! secret: String @inaccessible }
        type Named1 implements Named @key(fields: "id") { id: ID! }
    "#;
    let with_supplier = compose(vec![
        subgraph("a", shared),
        subgraph("b", "type Named1 @key(fields: \"id\") { id: ID! secret: String }"),
    ]);
    assert!(with_supplier.is_success(), "{:?}", with_supplier.errors());

    let without_supplier = compose(vec![subgraph("a", shared)]);
    assert!(without_supplier.errors().iter().any(|error| matches!(
        error,
        CompositionError::UnimplementedInterfaceFields { type_name, .. } if type_name == "Named1"
    )));
}

#[test]
fn invalid_interface_field_implementation_is_an_error() {
    let result = compose(vec![subgraph(
        "a",
        r#"
        type Query { n: Named }
        interface Named { id: ID! }
        type Named1 implements Named { id: String! }
        "#,
    )]);
    // Normalization only checks presence; the merged pass checks types.
    let message = result
        .errors()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n");
    assert!(message.contains("\"Named1\""), "{message}");
    assert!(message.contains("\"String!\""), "{message}");
}

#[test]
fn covariant_interface_field_implementation_is_valid() {
    let result = compose(vec![subgraph(
        "a",
        r#"
        type Query { n: Named }
        interface Named { neighbor: Named }
        type Named1 implements Named { neighbor: Named1! }
        "#,
    )]);
    assert!(result.is_success(), "{:?}", result.errors());
}

#[test]
fn identical_argument_defaults_are_kept() {
    let result = compose(vec![
        subgraph("a", "type Object @shareable { f(limit: Int = 10): String }"),
        subgraph("b", "type Object @shareable { f(limit: Int = 10): String }"),
    ])
    .into_result()
    .expect("matching defaults should compose");
    assert!(
        result.federated_schema.contains("f(limit: Int = 10): String"),
        "{}",
        result.federated_schema
    );
}

#[test]
fn int_defaults_coerce_to_float_arguments() {
    let result = compose(vec![
        subgraph("a", "type Object @shareable { f(ratio: Float = 1): String }"),
        subgraph("b", "type Object @shareable { f(ratio: Float = 1.0): String }"),
    ]);
    assert!(result.is_success(), "{:?}", result.errors());
}

#[test]
fn conflicting_argument_defaults_are_an_error() {
    let result = compose(vec![
        subgraph("a", "type Object @shareable { f(limit: Int = 10): String }"),
        subgraph("b", "type Object @shareable { f(limit: Int = 20): String }"),
    ]);
    assert!(result.errors().iter().any(|error| matches!(
        error,
        CompositionError::IncompatibleInputValueDefaultValues { path, .. }
            if path == "Object.f(limit:)"
    )));
}

#[test]
fn omitted_optional_argument_default_drops_the_default_silently() {
    let result = compose(vec![
        subgraph("a", "type Object @shareable { f(limit: Int = 10): String }"),
        subgraph("b", "type Object @shareable { f(limit: Int): String }"),
    ])
    .into_result()
    .expect("omitted defaults should compose");
    assert!(
        result.federated_schema.contains("f(limit: Int): String"),
        "{}",
        result.federated_schema
    );
}

#[test]
fn required_argument_missing_in_a_sibling_subgraph_is_an_error() {
    let result = compose(vec![
        subgraph("a", "type Object @shareable { f(id: ID!): String }"),
        subgraph("b", "type Object @shareable { f: String }"),
    ]);
    assert!(result.errors().iter().any(|error| matches!(
        error,
        CompositionError::InvalidRequiredInputValue { path, .. } if path == "Object.f"
    )));
}

#[test]
fn type_kind_must_agree_across_subgraphs() {
    let result = compose(vec![
        subgraph("a", "type Query { t: T } type T { x: Int }"),
        subgraph("b", "interface T { x: Int }"),
    ]);
    assert!(result.errors().iter().any(|error| matches!(
        error,
        CompositionError::IncompatibleParentKind { type_name, subgraph_name, .. }
            if type_name == "T" && subgraph_name == "b"
    )));
}

#[test]
fn entity_interface_implementers_must_agree() {
    let result = compose(vec![
        subgraph(
            "a",
            r#"
            type Query { i: I }
            interface I @key(fields: "id") { id: ID! }
            type A1 implements I @key(fields: "id") { id: ID! }
            type B1 implements I @key(fields: "id") { id: ID! }
            "#,
        ),
        subgraph(
            "b",
            r#"
            interface I @key(fields: "id") { id: ID! }
            type A1 implements I @key(fields: "id") { id: ID! }
            "#,
        ),
    ]);
    assert!(result.errors().iter().any(|error| matches!(
        error,
        CompositionError::UndefinedEntityInterfaceImplementations { interface_name, .. }
            if interface_name == "I"
    )));
}

#[test]
fn interface_object_contributes_fields_to_concrete_types() {
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
            r#"
            type Media @interfaceObject @key(fields: "id") { id: ID! reviewCount: Int! }
            "#,
        ),
    ])
    .into_result()
    .expect("interface objects should compose");
    // The contributed field appears on the interface and on the implementer.
    assert_eq!(result.federated_schema.matches("reviewCount: Int!").count(), 2, "{}", result.federated_schema);
}

#[test]
fn plain_description_of_the_first_defining_subgraph_wins() {
    let result = compose(vec![
        subgraph("a", "\"from a\" type Object @shareable { x: String }"),
        subgraph("b", "\"from b\" type Object @shareable { x: String }"),
    ])
    .into_result()
    .expect("descriptions should compose");
    assert!(result.federated_schema.contains("from a"), "{}", result.federated_schema);
    assert!(!result.federated_schema.contains("from b"), "{}", result.federated_schema);
}

#[test]
fn conflicting_description_opt_ins_are_an_error() {
    let result = compose(vec![
        subgraph("a", "\"from a\" type Object @shareable @configureDescription { x: String }"),
        subgraph("b", "\"from b\" type Object @shareable @configureDescription { x: String }"),
    ]);
    assert!(result.errors().iter().any(|error| matches!(
        error,
        CompositionError::DescriptionPropagationConflict { path, .. } if path == "Object"
    )));
}

#[test]
fn identical_description_opt_ins_are_not_a_conflict() {
    let result = compose(vec![
        subgraph("a", "\"shared docs\" type Object @shareable @configureDescription { x: String }"),
        subgraph("b", "\"shared docs\" type Object @shareable @configureDescription { x: String }"),
    ]);
    assert!(result.is_success(), "{:?}", result.errors());
}

#[test]
fn description_override_replaces_the_element_description() {
    let result = compose(vec![subgraph(
        "a",
        "\"internal docs\" type Query @configureDescription(description: \"public docs\") { x: String }",
    )])
    .into_result()
    .expect("description overrides should compose");
    assert!(result.federated_schema.contains("public docs"), "{}", result.federated_schema);
    assert!(!result.federated_schema.contains("internal docs"), "{}", result.federated_schema);
}

#[test]
fn suppressed_descriptions_are_dropped_with_a_warning() {
    let result = compose(vec![subgraph(
        "a",
        "\"hidden docs\" type Query @configureDescription(propagateToFederatedGraph: false) { x: String }",
    )]);
    assert!(result.is_success(), "{:?}", result.errors());
    let federated = result.clone().into_result().unwrap();
    assert!(!federated.federated_schema.contains("hidden docs"));
    assert!(result
        .warnings()
        .iter()
        .any(|warning| matches!(warning, CompositionWarning::DescriptionDropped { path } if path == "Query")));
}

#[test]
fn composition_is_deterministic() {
    let make = || {
        vec![
            subgraph("a", "type Query { e: Entity } type Entity @key(fields: \"id\") { id: ID! name: String }"),
            subgraph("b", "type Entity @key(fields: \"id\") { id: ID! age: Int }"),
        ]
    };
    let first = compose(make()).into_result().expect("should compose");
    let second = compose(make()).into_result().expect("should compose");
    assert_eq!(first.federated_schema, second.federated_schema);
    assert_eq!(first.client_schema, second.client_schema);
}

#[test]
fn merged_schema_is_independent_of_subgraph_order() {
    let a = subgraph(
        "a",
        "type Query { e: Entity } type Entity @key(fields: \"id\") { id: ID! name: String }",
    );
    let b = subgraph("b", "type Entity @key(fields: \"id\") { id: ID! age: Int }");
    let forward = compose(vec![a.clone(), b.clone()]).into_result().expect("should compose");
    let reversed = compose(vec![b, a]).into_result().expect("should compose");
    assert_eq!(forward.federated_schema, reversed.federated_schema);
    assert_eq!(forward.client_schema, reversed.client_schema);
}
