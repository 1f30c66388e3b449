//! Composition of federated GraphQL subgraph schemas.
//!
//! This crate is a schema composition compiler: it takes a batch of
//! independently authored subgraph schema documents, annotated with the
//! federation directives (`@key`, `@external`, `@shareable`, `@override`,
//! `@provides`, `@requires`, `@interfaceObject`, `@tag`, `@inaccessible`,
//! `@authenticated`, `@requiresScopes`, `@configureDescription`), and
//! produces one consistent federated schema, a client-facing schema with
//! inaccessible elements removed, and the per-subgraph runtime
//! configuration a router needs to plan fetches.
//!
//! Composition is a pure, deterministic function: the same subgraph list in
//! the same order always yields byte-identical schema text and identical
//! error lists. Errors are plain values accumulated into ordered lists;
//! nothing throws as control flow.
//!
//! ```
//! use federation_composition::{compose, Subgraph};
//!
//! let result = compose(vec![
//!     Subgraph::new("users", "https://users.internal", r#"
//!         type Query { me: User }
//!         type User @key(fields: "id") { id: ID! name: String! }
//!     "#),
//!     Subgraph::new("reviews", "https://reviews.internal", r#"
//!         type User @key(fields: "id") { id: ID! reviewCount: Int! }
//!     "#),
//! ]);
//! let federated = result.into_result().expect("composition should succeed");
//! assert!(federated.federated_schema.contains("reviewCount"));
//! ```

use indexmap::{IndexMap, IndexSet};

mod contracts;
mod definitions;
mod directives;
mod emit;
mod error;
mod field_set;
mod merge;
mod normalize;
mod resolvability;
mod result;

pub use crate::definitions::{
    ArgumentConfiguration, ConfigurationData, FieldConfiguration, OperationKind,
    RequiredFieldConfiguration, SubgraphConfiguration, TypeKind,
};
pub use crate::error::{
    CompositionError, CompositionErrors, CompositionWarning, InterfaceImplementationErrors,
    MissingRequiredInputValue, RequiredInputValueKind, ShareabilityFieldError,
};
pub use crate::result::{CompositionResult, FederationResult};

use crate::definitions::NormalizedSubgraph;
use crate::merge::FederationContext;

/// One subgraph to be composed: a unique, non-empty name, the routing URL
/// the router will call, and the schema document text.
#[derive(Clone, Debug)]
pub struct Subgraph {
    pub name: String,
    pub url: String,
    pub schema: String,
}

impl Subgraph {
    pub fn new(name: &str, url: &str, schema: &str) -> Self {
        Self {
            name: name.to_owned(),
            url: url.to_owned(),
            schema: schema.to_owned(),
        }
    }
}

/// Composes a batch of subgraphs into one federated schema.
pub fn compose(subgraphs: Vec<Subgraph>) -> CompositionResult {
    let mut warnings = Vec::new();
    let subgraphs = match validate_subgraph_batch(subgraphs, &mut warnings) {
        Ok(subgraphs) => subgraphs,
        Err(error) => return CompositionResult::failure(vec![error], warnings),
    };

    let normalized = match normalize_batch(&subgraphs) {
        Ok(normalized) => normalized,
        Err(errors) => return CompositionResult::failure(errors, warnings),
    };

    let mut ctx = merge::merge_subgraphs(&normalized);
    let resolvability_errors = resolvability::analyze_resolvability(&ctx);
    ctx.errors.extend(resolvability_errors);
    warnings.append(&mut ctx.warnings);

    if ctx.has_errors() {
        return CompositionResult::failure(ctx.errors, warnings);
    }
    CompositionResult::success(emit::emit_federation_result(&ctx, &normalized), warnings)
}

/// Composes the batch once, then produces one independent result per
/// contract, excluding every element tagged with any of the contract's tag
/// set. Contracts do not interact with one another.
pub fn compose_with_contracts(
    subgraphs: Vec<Subgraph>,
    tag_exclusions_by_contract_name: IndexMap<String, IndexSet<String>>,
) -> IndexMap<String, CompositionResult> {
    let mut warnings = Vec::new();
    let prepared: Result<(Vec<NormalizedSubgraph>, FederationContext), Vec<CompositionError>> = (|| {
        let subgraphs = validate_subgraph_batch(subgraphs, &mut warnings).map_err(|error| vec![error])?;
        let normalized = normalize_batch(&subgraphs)?;
        let mut ctx = merge::merge_subgraphs(&normalized);
        let resolvability_errors = resolvability::analyze_resolvability(&ctx);
        ctx.errors.extend(resolvability_errors);
        warnings.append(&mut ctx.warnings);
        Ok((normalized, ctx))
    })();

    let mut results = IndexMap::new();
    match prepared {
        Err(errors) => {
            for contract_name in tag_exclusions_by_contract_name.keys() {
                results.insert(
                    contract_name.clone(),
                    CompositionResult::failure(errors.clone(), warnings.clone()),
                );
            }
        }
        Ok((normalized, ctx)) => {
            for (contract_name, exclude_tags) in &tag_exclusions_by_contract_name {
                let mut contract_ctx = ctx.clone();
                contracts::apply_tag_exclusions(&mut contract_ctx, exclude_tags);
                let result = if contract_ctx.has_errors() {
                    CompositionResult::failure(contract_ctx.errors, warnings.clone())
                } else {
                    CompositionResult::success(
                        emit::emit_federation_result(&contract_ctx, &normalized),
                        warnings.clone(),
                    )
                };
                results.insert(contract_name.clone(), result);
            }
        }
    }
    results
}

/// Enforces unique, non-empty subgraph names. Unnamed subgraphs are cited by
/// ordinal and temporarily renamed so later errors can refer to them.
fn validate_subgraph_batch(
    mut subgraphs: Vec<Subgraph>,
    warnings: &mut Vec<CompositionWarning>,
) -> Result<Vec<Subgraph>, CompositionError> {
    let mut unnamed_ordinals = Vec::new();
    for (index, subgraph) in subgraphs.iter_mut().enumerate() {
        if subgraph.name.is_empty() {
            let ordinal = index + 1;
            unnamed_ordinals.push(ordinal);
            subgraph.name = format!("subgraph-{ordinal}");
        }
    }

    let mut seen: IndexSet<&str> = IndexSet::new();
    let mut duplicate_names: IndexSet<String> = IndexSet::new();
    for subgraph in &subgraphs {
        if !seen.insert(subgraph.name.as_str()) {
            duplicate_names.insert(subgraph.name.clone());
        }
    }

    if !duplicate_names.is_empty() || !unnamed_ordinals.is_empty() {
        return Err(CompositionError::InvalidSubgraphNames {
            duplicate_names: duplicate_names.into_iter().collect(),
            unnamed_ordinals,
        });
    }

    for subgraph in &subgraphs {
        if url::Url::parse(&subgraph.url).is_err() {
            warnings.push(CompositionWarning::InvalidRoutingUrl {
                subgraph_name: subgraph.name.clone(),
                url: subgraph.url.clone(),
            });
        }
    }

    Ok(subgraphs)
}

/// Normalizes every subgraph in input order. Any failure aborts the whole
/// batch; each failed subgraph contributes one wrapped error.
fn normalize_batch(subgraphs: &[Subgraph]) -> Result<Vec<NormalizedSubgraph>, Vec<CompositionError>> {
    let mut normalized = Vec::new();
    let mut errors = Vec::new();
    for subgraph in subgraphs {
        match normalize::normalize_subgraph(&subgraph.name, &subgraph.url, &subgraph.schema) {
            Ok(result) => normalized.push(result),
            Err(subgraph_errors) => errors.push(CompositionError::SubgraphValidationFailure {
                subgraph_name: subgraph.name.clone(),
                errors: subgraph_errors,
            }),
        }
    }
    if errors.is_empty() {
        Ok(normalized)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_unnamed_subgraphs_are_cited_by_ordinal() {
        let result = compose(vec![
            Subgraph::new("", "https://one.internal", "type Query { a: String }"),
            Subgraph::new("", "https://two.internal", "type Query { b: String }"),
        ]);
        let errors = result.errors();
        assert_eq!(errors.len(), 1);
        let message = errors[0].to_string();
        assert!(message.contains("1st"), "{message}");
        assert!(message.contains("2nd"), "{message}");
    }

    #[test]
    fn invalid_routing_url_is_a_warning_not_an_error() {
        let result = compose(vec![Subgraph::new("a", "not a url", "type Query { a: String }")]);
        assert!(result.is_success());
        assert_eq!(result.warnings().len(), 1);
    }
}
