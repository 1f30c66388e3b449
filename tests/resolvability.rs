use federation_composition::{compose, CompositionError, Subgraph};

fn subgraph(name: &str, schema: &str) -> Subgraph {
    Subgraph::new(name, &format!("https://{name}.internal"), schema)
}

// #1.1
#[test]
fn entity_fields_resolve_through_shared_keys() {
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
    ]);
    assert!(result.is_success(), "{:?}", result.errors());
}

// #1.2
#[test]
fn entity_fields_resolve_through_shared_keys_reversed() {
    let result = compose(vec![
        subgraph(
            "reviews",
            "type User @key(fields: \"id\") { id: ID! reviewCount: Int! }",
        ),
        subgraph(
            "users",
            r#"
            type Query { me: User }
            type User @key(fields: "id") { id: ID! name: String! }
            "#,
        ),
    ]);
    assert!(result.is_success(), "{:?}", result.errors());
}

#[test]
fn disjoint_keys_leave_fields_unresolvable() {
    let run = |first: Subgraph, second: Subgraph| {
        let result = compose(vec![first, second]);
        let unresolvable: Vec<String> = result
            .errors()
            .iter()
            .filter_map(|error| match error {
                CompositionError::UnresolvableField { field_name, parent_type_name, .. } => {
                    Some(format!("{parent_type_name}.{field_name}"))
                }
                _ => None,
            })
            .collect();
        unresolvable
    };
    let a = subgraph(
        "a",
        r#"
        type Query { e: Entity }
        type Entity @key(fields: "id") { id: ID! name: String }
        "#,
    );
    let b = subgraph(
        "b",
        "type Entity @key(fields: \"uuid\") { uuid: ID! age: Int }",
    );

    let forward = run(a.clone(), b.clone());
    assert!(forward.contains(&"Entity.uuid".to_owned()), "{forward:?}");
    assert!(forward.contains(&"Entity.age".to_owned()), "{forward:?}");

    let reversed = run(b, a);
    assert!(reversed.contains(&"Entity.age".to_owned()), "{reversed:?}");
}

#[test]
fn non_resolvable_keys_do_not_create_entry_points() {
    let resolvable = compose(vec![
        subgraph(
            "a",
            r#"
            type Query { e: Entity }
            type Entity @key(fields: "id") { id: ID! name: String }
            "#,
        ),
        subgraph(
            "b",
            "type Entity @key(fields: \"id\", resolvable: true) { id: ID! age: Int }",
        ),
    ]);
    assert!(resolvable.is_success(), "{:?}", resolvable.errors());

    let non_resolvable = compose(vec![
        subgraph(
            "a",
            r#"
            type Query { e: Entity }
            type Entity @key(fields: "id") { id: ID! name: String }
            "#,
        ),
        subgraph(
            "b",
            "type Entity @key(fields: \"id\", resolvable: false) { id: ID! age: Int }",
        ),
    ]);
    assert!(non_resolvable.errors().iter().any(|error| matches!(
        error,
        CompositionError::UnresolvableField { field_name, .. } if field_name == "age"
    )));
}

#[test]
fn transitive_key_jumps_reach_distant_subgraphs() {
    // a can only reach c through b: a and b share the "id" key, b and c
    // share the "uuid" key.
    let result = compose(vec![
        subgraph(
            "a",
            r#"
            type Query { e: Entity }
            type Entity @key(fields: "id") { id: ID! }
            "#,
        ),
        subgraph(
            "b",
            "type Entity @key(fields: \"id\") @key(fields: \"uuid\") { id: ID! uuid: ID! }",
        ),
        subgraph(
            "c",
            "type Entity @key(fields: \"uuid\") { uuid: ID! nested: String }",
        ),
    ]);
    assert!(result.is_success(), "{:?}", result.errors());
}

#[test]
fn recursive_types_terminate() {
    let result = compose(vec![subgraph(
        "a",
        r#"
        type Query { tree: Node }
        type Node { value: String children: Node }
        "#,
    )]);
    assert!(result.is_success(), "{:?}", result.errors());
}

#[test]
fn mutually_recursive_types_terminate() {
    let result = compose(vec![subgraph(
        "a",
        r#"
        type Query { ping: Ping }
        type Ping { pong: Pong }
        type Pong { ping: Ping }
        "#,
    )]);
    assert!(result.is_success(), "{:?}", result.errors());
}

#[test]
fn dead_union_branches_are_pruned_without_error() {
    let result = compose(vec![
        subgraph(
            "a",
            r#"
            type Query { u: U }
            union U = A
            type A @shareable { x: String }
            "#,
        ),
        subgraph(
            "b",
            r#"
            union U = A | C
            type A @shareable { x: String }
            type C { y: String }
            "#,
        ),
    ]);
    // C is only defined in b, which no root path reaches; the branch is
    // dead, not broken.
    assert!(result.is_success(), "{:?}", result.errors());
}

#[test]
fn provides_grants_resolvability_for_external_fields() {
    let with_provides = compose(vec![
        subgraph(
            "a",
            r#"
            type Query { e: Entity @provides(fields: "name") }
            type Entity @key(fields: "id") { id: ID! name: String @external }
            "#,
        ),
        subgraph(
            "b",
            "type Entity @key(fields: \"id\", resolvable: false) { id: ID! name: String }",
        ),
    ]);
    assert!(with_provides.is_success(), "{:?}", with_provides.errors());

    let without_provides = compose(vec![
        subgraph(
            "a",
            r#"
            type Query { e: Entity }
            type Entity @key(fields: "id") { id: ID! name: String @external }
            "#,
        ),
        subgraph(
            "b",
            "type Entity @key(fields: \"id\", resolvable: false) { id: ID! name: String }",
        ),
    ]);
    assert!(without_provides.errors().iter().any(|error| matches!(
        error,
        CompositionError::UnresolvableField { field_name, .. } if field_name == "name"
    )));
}

#[test]
fn unresolvable_field_errors_carry_the_root_path() {
    let result = compose(vec![
        subgraph(
            "a",
            r#"
            type Query { e: Entity }
            type Entity @key(fields: "id") { id: ID! }
            "#,
        ),
        subgraph(
            "b",
            "type Entity @key(fields: \"other\") { other: ID! age: Int }",
        ),
    ]);
    let error = result
        .errors()
        .iter()
        .find(|error| matches!(
            error,
            CompositionError::UnresolvableField { field_name, .. } if field_name == "age"
        ))
        .expect("expected an unresolvable field error");
    let message = error.to_string();
    assert!(message.contains("Query.e"), "{message}");
    assert!(message.contains("\"Entity.age\""), "{message}");
    assert!(message.contains("\"b\""), "{message}");
}
