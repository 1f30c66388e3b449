use federation_composition::{compose, compose_with_contracts, CompositionError, Subgraph};
use indexmap::{IndexMap, IndexSet};

fn subgraph(name: &str, schema: &str) -> Subgraph {
    Subgraph::new(name, &format!("https://{name}.internal"), schema)
}

fn contracts(entries: &[(&str, &[&str])]) -> IndexMap<String, IndexSet<String>> {
    entries
        .iter()
        .map(|(name, tags)| {
            (
                (*name).to_owned(),
                tags.iter().map(|tag| (*tag).to_owned()).collect(),
            )
        })
        .collect()
}

#[test]
fn excluded_tags_become_inaccessible_in_the_router_schema() {
    let results = compose_with_contracts(
        vec![subgraph(
            "a",
            "type Query { public: String secret: String @tag(name: \"internal\") }",
        )],
        contracts(&[("partner", &["internal"])]),
    );
    let result = results["partner"].clone().into_result().expect("contract should compose");
    assert!(
        result.federated_schema.contains("secret: String @inaccessible @tag(name: \"internal\")"),
        "{}",
        result.federated_schema
    );
    assert!(result.client_schema.contains("public: String"), "{}", result.client_schema);
    assert!(!result.client_schema.contains("secret"), "{}", result.client_schema);
}

#[test]
fn untagged_composition_is_unaffected() {
    let result = compose(vec![subgraph(
        "a",
        "type Query { public: String secret: String @tag(name: \"internal\") }",
    )])
    .into_result()
    .expect("base composition should succeed");
    assert!(result.client_schema.contains("secret: String"), "{}", result.client_schema);
}

#[test]
fn a_type_losing_every_field_is_fatal() {
    let results = compose_with_contracts(
        vec![subgraph(
            "a",
            "type Query { only: String @tag(name: \"internal\") }",
        )],
        contracts(&[("partner", &["internal"])]),
    );
    assert!(results["partner"].errors().iter().any(|error| matches!(
        error,
        CompositionError::AllFieldDefinitionsAreInaccessible { type_name, .. } if type_name == "Query"
    )));
}

#[test]
fn contracts_are_computed_independently() {
    let results = compose_with_contracts(
        vec![subgraph(
            "a",
            r#"
            type Query {
              everyone: String
              internal: String @tag(name: "internal")
              beta: String @tag(name: "beta")
            }
            "#,
        )],
        contracts(&[("partner", &["internal"]), ("stable", &["beta"])]),
    );
    assert_eq!(results.len(), 2);
    let partner = results["partner"].clone().into_result().expect("partner contract");
    let stable = results["stable"].clone().into_result().expect("stable contract");
    assert!(!partner.client_schema.contains("internal: String"), "{}", partner.client_schema);
    assert!(partner.client_schema.contains("beta: String"), "{}", partner.client_schema);
    assert!(!stable.client_schema.contains("beta: String"), "{}", stable.client_schema);
    assert!(stable.client_schema.contains("internal: String"), "{}", stable.client_schema);
}

#[test]
fn tagged_types_disappear_from_the_contract_client_schema() {
    let results = compose_with_contracts(
        vec![subgraph(
            "a",
            r#"
            type Query { public: String extra: Extra }
            type Extra @tag(name: "internal") { x: String }
            "#,
        )],
        contracts(&[("partner", &["internal"])]),
    );
    let result = results["partner"].clone().into_result().expect("contract should compose");
    assert!(!result.client_schema.contains("type Extra"), "{}", result.client_schema);
    assert!(result.federated_schema.contains("type Extra @inaccessible"), "{}", result.federated_schema);
}

#[test]
fn a_failed_batch_fails_every_contract() {
    let results = compose_with_contracts(
        vec![subgraph("a", "type Query {")],
        contracts(&[("partner", &["internal"]), ("stable", &["beta"])]),
    );
    assert!(!results["partner"].is_success());
    assert!(!results["stable"].is_success());
}
