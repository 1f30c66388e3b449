//! Input-position merge algebra: field arguments and input-object fields
//! merge by intersection, default values must agree, and enums merge by
//! union or intersection depending on how they are used across the composed
//! graph.

use apollo_compiler::ast;
use indexmap::{IndexMap, IndexSet};

use crate::definitions::ParentDefinitionData;
use crate::directives::value_to_string;
use crate::error::{
    CompositionError, MissingRequiredInputValue, RequiredInputValueKind,
};

use super::context::FederationContext;

/// Canonical comparison form of a default value. Int literals coerce to the
/// Float form when the target type is Float, so `1` and `1.0` agree; any
/// other kind difference (or value difference) is a mismatch.
fn canonical_default(value: &ast::Value, target_is_float: bool) -> String {
    match value {
        ast::Value::Int(num) if target_is_float => {
            let text = format!("{num}");
            match text.parse::<f64>() {
                Ok(float) => format!("float:{float}"),
                Err(_) => format!("int:{text}"),
            }
        }
        ast::Value::Float(num) => {
            let text = format!("{num}");
            match text.parse::<f64>() {
                Ok(float) => format!("float:{float}"),
                Err(_) => format!("float:{text}"),
            }
        }
        other => format!("{}:{}", crate::directives::value_kind_name(other), value_to_string(other)),
    }
}

/// Resolves the merged default value of one input position. Returns the
/// composed default; pushes an error when subgraphs disagree.
#[allow(clippy::too_many_arguments)]
fn merge_default_values(
    prefix: &str,
    path: &str,
    target_is_float: bool,
    defaults_by_subgraph: &IndexMap<String, Option<ast::Value>>,
    defining_subgraph_count: usize,
    errors: &mut Vec<CompositionError>,
) -> Option<ast::Value> {
    let provided: Vec<(&String, &ast::Value)> = defaults_by_subgraph
        .iter()
        .filter_map(|(subgraph, value)| value.as_ref().map(|value| (subgraph, value)))
        .collect();
    let Some((_, first_value)) = provided.first() else {
        return None;
    };
    let expected = canonical_default(first_value, target_is_float);
    let conflicting: Vec<(&String, &ast::Value)> = provided
        .iter()
        .filter(|(_, value)| canonical_default(value, target_is_float) != expected)
        .copied()
        .collect();
    if !conflicting.is_empty() {
        errors.push(CompositionError::IncompatibleInputValueDefaultValues {
            prefix: prefix.to_owned(),
            path: path.to_owned(),
            subgraph_names: conflicting.iter().map(|(subgraph, _)| (*subgraph).clone()).collect(),
            expected_default: value_to_string(first_value),
            actual_default: value_to_string(conflicting[0].1),
        });
        return None;
    }
    // A subgraph omitting the default on an optional input drops the default
    // silently.
    if provided.len() == defining_subgraph_count {
        Some((*first_value).clone())
    } else {
        None
    }
}

fn is_float_type(ty: &ast::Type) -> bool {
    ty.inner_named_type().as_str() == "Float"
}

/// Field arguments merge by intersection across the subgraphs defining the
/// field; a required argument missing from one of them is an error.
pub(super) fn merge_field_arguments(ctx: &mut FederationContext) {
    let mut errors = Vec::new();
    for parent in ctx.parents.values_mut() {
        let (ParentDefinitionData::Object(data) | ParentDefinitionData::Interface(data)) = parent else {
            continue;
        };
        for field in data.fields.values_mut() {
            let field_path = format!("{}.{}", data.type_name, field.field_name);
            let defining_subgraphs = field.subgraph_names.clone();
            let mut missing_required = Vec::new();
            let mut dropped_arguments = Vec::new();

            for argument in field.arguments.values_mut() {
                let omitted: Vec<String> = defining_subgraphs
                    .iter()
                    .filter(|subgraph| !argument.subgraph_names.contains(*subgraph))
                    .cloned()
                    .collect();
                if !omitted.is_empty() {
                    let required_in: Vec<String> = argument
                        .type_by_subgraph_name
                        .iter()
                        .filter(|(subgraph, ty)| {
                            ty.is_non_null()
                                && argument
                                    .default_value_by_subgraph_name
                                    .get(*subgraph)
                                    .map_or(true, |default| default.is_none())
                        })
                        .map(|(subgraph, _)| subgraph.clone())
                        .collect();
                    if required_in.is_empty() {
                        dropped_arguments.push(argument.argument_name.clone());
                    } else {
                        missing_required.push(MissingRequiredInputValue {
                            name: argument.argument_name.clone(),
                            required_subgraph_names: required_in,
                            omitted_subgraph_names: omitted,
                        });
                    }
                    continue;
                }
                argument.default_value = merge_default_values(
                    "argument",
                    &format!("{field_path}({}:)", argument.argument_name),
                    is_float_type(&argument.ty),
                    &argument.default_value_by_subgraph_name,
                    argument.subgraph_names.len(),
                    &mut errors,
                );
            }

            for argument_name in dropped_arguments {
                field.arguments.shift_remove(&argument_name);
            }
            if !missing_required.is_empty() {
                errors.push(CompositionError::InvalidRequiredInputValue {
                    kind: RequiredInputValueKind::Argument,
                    path: field_path,
                    missing: missing_required,
                });
            }
        }
    }
    ctx.errors.extend(errors);
}

/// Input objects merge by intersection of their fields.
pub(super) fn merge_input_objects(ctx: &mut FederationContext) {
    let mut errors = Vec::new();
    for parent in ctx.parents.values_mut() {
        let ParentDefinitionData::InputObject(data) = parent else {
            continue;
        };
        let type_subgraphs = data.subgraph_names.clone();
        let mut missing_required = Vec::new();
        let mut dropped_fields = Vec::new();

        for field in data.fields.values_mut() {
            let omitted: Vec<String> = type_subgraphs
                .iter()
                .filter(|subgraph| !field.subgraph_names.contains(*subgraph))
                .cloned()
                .collect();
            if !omitted.is_empty() {
                if field.required_in_subgraph_names.is_empty() {
                    dropped_fields.push(field.field_name.clone());
                } else {
                    missing_required.push(MissingRequiredInputValue {
                        name: field.field_name.clone(),
                        required_subgraph_names: field.required_in_subgraph_names.iter().cloned().collect(),
                        omitted_subgraph_names: omitted,
                    });
                }
                continue;
            }
            field.default_value = merge_default_values(
                "input field",
                &format!("{}.{}", data.type_name, field.field_name),
                is_float_type(&field.ty),
                &field.default_value_by_subgraph_name,
                field.subgraph_names.len(),
                &mut errors,
            );
        }

        for field_name in dropped_fields {
            data.fields.shift_remove(&field_name);
        }
        if !missing_required.is_empty() {
            errors.push(CompositionError::InvalidRequiredInputValue {
                kind: RequiredInputValueKind::InputField,
                path: data.type_name.clone(),
                missing: missing_required,
            });
        }
    }
    ctx.errors.extend(errors);
}

/// Enum values merge by union when the enum only ever appears in output
/// positions, and by intersection as soon as it appears in an input
/// position. A removal that would also change the enum in output positions
/// is tolerated only when every removed value is `@inaccessible` somewhere.
pub(super) fn merge_enums(ctx: &mut FederationContext) {
    let mut input_named_types: IndexSet<String> = IndexSet::new();
    let mut output_named_types: IndexSet<String> = IndexSet::new();
    for parent in ctx.parents.values() {
        match parent {
            ParentDefinitionData::Object(data) | ParentDefinitionData::Interface(data) => {
                for field in data.fields.values() {
                    output_named_types.insert(field.ty.inner_named_type().to_string());
                    for argument in field.arguments.values() {
                        input_named_types.insert(argument.ty.inner_named_type().to_string());
                    }
                }
            }
            ParentDefinitionData::InputObject(data) => {
                for field in data.fields.values() {
                    input_named_types.insert(field.ty.inner_named_type().to_string());
                }
            }
            _ => {}
        }
    }

    let mut errors = Vec::new();
    for parent in ctx.parents.values_mut() {
        let ParentDefinitionData::Enum(data) = parent else {
            continue;
        };
        if !input_named_types.contains(&data.type_name) {
            continue;
        }
        let subgraph_count = data.subgraph_names.len();
        let removed: Vec<String> = data
            .values
            .values()
            .filter(|value| value.subgraph_names.len() < subgraph_count)
            .map(|value| value.value_name.clone())
            .collect();
        if removed.is_empty() {
            continue;
        }
        if output_named_types.contains(&data.type_name) {
            let all_removed_inaccessible = removed.iter().all(|value_name| {
                data.values
                    .get(value_name)
                    .is_some_and(|value| value.is_inaccessible)
            });
            if !all_removed_inaccessible {
                errors.push(CompositionError::IncompatibleSharedEnum {
                    parent_name: data.type_name.clone(),
                });
                continue;
            }
        }
        for value_name in removed {
            data.values.shift_remove(&value_name);
        }
    }
    ctx.errors.extend(errors);
}

pub(super) fn check_unions(ctx: &mut FederationContext) {
    let mut errors = Vec::new();
    for parent in ctx.parents.values() {
        let ParentDefinitionData::Union(data) = parent else {
            continue;
        };
        if data.members.is_empty() || data.members_by_subgraph_name.values().any(IndexSet::is_empty) {
            errors.push(CompositionError::NoDefinedUnionMembers {
                type_name: data.type_name.clone(),
            });
        }
    }
    ctx.errors.extend(errors);
}
