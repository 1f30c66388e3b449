//! Post-merge validation of object fields: `@override` resolution and the
//! shareability rule for fields defined in more than one subgraph.

use indexmap::IndexSet;

use crate::definitions::{FieldData, ParentDefinitionData};
use crate::error::{CompositionError, CompositionWarning, ShareabilityFieldError};

use super::context::{FederationContext, OverrideRemoval};

pub(super) fn validate_overrides_and_shareability(ctx: &mut FederationContext) {
    let subgraph_names = ctx.subgraph_names.clone();
    let entity_interface_names: IndexSet<String> = ctx.entity_interfaces.keys().cloned().collect();

    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut removals = Vec::new();
    let mut duplicate_overrides: Vec<(String, Vec<String>)> = Vec::new();

    for parent in ctx.parents.values_mut() {
        let ParentDefinitionData::Object(data) = parent else {
            continue;
        };
        // Entity interfaces and their stand-ins resolve through the
        // interface machinery; plain shareability does not apply.
        if entity_interface_names.contains(&data.type_name) {
            continue;
        }

        let mut field_errors = Vec::new();
        for field in data.fields.values_mut() {
            resolve_overrides(
                field,
                &subgraph_names,
                &mut errors,
                &mut warnings,
                &mut removals,
                &mut duplicate_overrides,
            );
            if let Some(field_error) = check_shareability(field) {
                field_errors.push(field_error);
            }
        }
        if !field_errors.is_empty() {
            errors.push(CompositionError::InvalidFieldShareability {
                type_name: data.type_name.clone(),
                field_errors,
            });
        }
    }

    ctx.errors.extend(errors);
    ctx.warnings.extend(warnings);
    ctx.override_removals.extend(removals);
    if !duplicate_overrides.is_empty() {
        ctx.errors.push(CompositionError::DuplicateOverriddenFields {
            field_errors: duplicate_overrides,
        });
    }
}

fn resolve_overrides(
    field: &mut FieldData,
    subgraph_names: &IndexSet<String>,
    errors: &mut Vec<CompositionError>,
    warnings: &mut Vec<CompositionWarning>,
    removals: &mut Vec<OverrideRemoval>,
    duplicate_overrides: &mut Vec<(String, Vec<String>)>,
) {
    let field_path = field.path();

    // A subgraph overriding itself has no effect; the directive is dropped.
    let self_overrides: Vec<String> = field
        .override_from_by_subgraph_name
        .iter()
        .filter(|(subgraph, from)| subgraph == from)
        .map(|(subgraph, _)| subgraph.clone())
        .collect();
    for subgraph in self_overrides {
        field.override_from_by_subgraph_name.shift_remove(&subgraph);
        warnings.push(CompositionWarning::EquivalentSourceAndTargetOverride {
            subgraph_name: subgraph,
            field_path: field_path.clone(),
        });
    }

    let invalid_targets: Vec<String> = field
        .override_from_by_subgraph_name
        .iter()
        .filter(|(_, from)| !subgraph_names.contains(from.as_str()))
        .map(|(subgraph, _)| subgraph.clone())
        .collect();
    for subgraph in invalid_targets {
        let from = field
            .override_from_by_subgraph_name
            .shift_remove(&subgraph)
            .unwrap_or_default();
        errors.push(CompositionError::InvalidOverrideTargetSubgraphName {
            target_subgraph_name: from,
            host_path: field_path.clone(),
        });
    }

    if field.override_from_by_subgraph_name.len() > 1 {
        duplicate_overrides.push((
            field_path,
            field.override_from_by_subgraph_name.keys().cloned().collect(),
        ));
        return;
    }

    // The overridden subgraph loses the field in its router configuration;
    // key fields stay addressable and are filtered out at emission.
    for from in field.override_from_by_subgraph_name.values() {
        if field.subgraph_names.contains(from.as_str()) {
            removals.push(OverrideRemoval {
                subgraph_name: from.clone(),
                type_name: field.parent_type_name.clone(),
                field_name: field.field_name.clone(),
            });
        }
    }
}

/// A field defined in more than one subgraph must be shareable in all but at
/// most one of them; a resolved `@override` removes the overridden instance
/// from consideration, as do purely external instances.
fn check_shareability(field: &FieldData) -> Option<ShareabilityFieldError> {
    let overridden: IndexSet<&String> = field.override_from_by_subgraph_name.values().collect();
    let mut defining = Vec::new();
    let mut non_shareable = Vec::new();
    for subgraph_name in &field.subgraph_names {
        if field.is_external_in(subgraph_name) || overridden.contains(subgraph_name) {
            continue;
        }
        defining.push(subgraph_name.clone());
        let shareable = field
            .is_shareable_by_subgraph_name
            .get(subgraph_name)
            .copied()
            .unwrap_or(false);
        if !shareable {
            non_shareable.push(subgraph_name.clone());
        }
    }
    if defining.len() > 1 && non_shareable.len() > 1 {
        Some(ShareabilityFieldError {
            field_name: field.field_name.clone(),
            defining_subgraph_names: defining,
            non_shareable_subgraph_names: non_shareable,
        })
    } else {
        None
    }
}
