//! Interface-implementation conformance over the merged registry: every
//! implementing type (concrete or interface) must carry every accessible
//! interface field with a covariant-or-equal return type and compatible
//! arguments.

use apollo_compiler::ast;
use indexmap::IndexMap;

use crate::definitions::{FieldData, ParentDefinitionData};
use crate::error::{CompositionError, InterfaceImplementationErrors};

use super::context::FederationContext;

pub(super) fn validate_implementations(ctx: &mut FederationContext) {
    let mut errors = Vec::new();
    for parent in ctx.parents.values() {
        let (ParentDefinitionData::Object(data) | ParentDefinitionData::Interface(data)) = parent else {
            continue;
        };
        let mut by_interface = Vec::new();
        for interface_name in &data.implements {
            let Some(ParentDefinitionData::Interface(interface_data)) = ctx.parents.get(interface_name) else {
                // Missing interfaces were reported during normalization;
                // kind mismatches during the merge upserts.
                continue;
            };
            let mut unimplemented_fields = Vec::new();
            let mut invalid_field_implementations = Vec::new();
            for interface_field in interface_data.fields.values() {
                let Some(implemented) = data.fields.get(&interface_field.field_name) else {
                    // The per-subgraph check tolerates @inaccessible fields
                    // missing locally; at this point no subgraph supplied an
                    // implementation at all, which is an error regardless.
                    unimplemented_fields.push(interface_field.field_name.clone());
                    continue;
                };
                validate_field_implementation(
                    &ctx.parents,
                    interface_field,
                    implemented,
                    &mut invalid_field_implementations,
                );
            }
            if !unimplemented_fields.is_empty() || !invalid_field_implementations.is_empty() {
                by_interface.push(InterfaceImplementationErrors {
                    interface_name: interface_name.clone(),
                    unimplemented_fields,
                    invalid_field_implementations,
                });
            }
        }
        if !by_interface.is_empty() {
            errors.push(CompositionError::UnimplementedInterfaceFields {
                type_name: data.type_name.clone(),
                kind: data.kind,
                by_interface,
            });
        }
    }
    ctx.errors.extend(errors);
}

fn validate_field_implementation(
    parents: &IndexMap<String, ParentDefinitionData>,
    interface_field: &FieldData,
    implemented: &FieldData,
    invalid: &mut Vec<String>,
) {
    let field_name = &interface_field.field_name;

    if !is_covariant_output(parents, &interface_field.ty, &implemented.ty) {
        invalid.push(format!(
            "The implemented field \"{field_name}\" returns the type \"{}\", which is not \
             compatible with the expected type \"{}\".",
            implemented.ty, interface_field.ty
        ));
    }

    let mut unimplemented_arguments = Vec::new();
    let mut invalid_arguments = Vec::new();
    for interface_argument in interface_field.arguments.values() {
        if !interface_argument.is_required() {
            continue;
        }
        match implemented.arguments.get(&interface_argument.argument_name) {
            None => unimplemented_arguments.push(interface_argument.argument_name.clone()),
            Some(implemented_argument) => {
                if !input_type_accepts(&implemented_argument.ty, &interface_argument.ty) {
                    invalid_arguments.push(format!(
                        "\"{}\" (expected type \"{}\", found \"{}\")",
                        interface_argument.argument_name, interface_argument.ty, implemented_argument.ty
                    ));
                }
            }
        }
    }
    // The implementer must not add required arguments of its own.
    for implemented_argument in implemented.arguments.values() {
        if implemented_argument.is_required()
            && !interface_field.arguments.contains_key(&implemented_argument.argument_name)
        {
            invalid_arguments.push(format!(
                "\"{}\" (required argument not declared by the interface)",
                implemented_argument.argument_name
            ));
        }
    }

    if !unimplemented_arguments.is_empty() {
        invalid.push(format!(
            "The implemented field \"{field_name}\" does not define the required argument{}: {}.",
            if unimplemented_arguments.len() > 1 { "s" } else { "" },
            unimplemented_arguments
                .iter()
                .map(|name| format!("\"{name}\""))
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }
    if !invalid_arguments.is_empty() {
        invalid.push(format!(
            "The implemented field \"{field_name}\" defines invalid argument{}: {}.",
            if invalid_arguments.len() > 1 { "s" } else { "" },
            invalid_arguments.join(", ")
        ));
    }
}

/// Output covariance: the implemented type may be the same as the interface
/// type, a non-null version of it, an object/interface implementing it, or a
/// member of the expected union — recursively through list wrappers.
fn is_covariant_output(
    parents: &IndexMap<String, ParentDefinitionData>,
    expected: &ast::Type,
    actual: &ast::Type,
) -> bool {
    use ast::Type::*;
    match (expected, actual) {
        (NonNullNamed(e), NonNullNamed(a)) => is_covariant_named(parents, e.as_str(), a.as_str()),
        (Named(e), Named(a) | NonNullNamed(a)) => is_covariant_named(parents, e.as_str(), a.as_str()),
        (NonNullList(e), NonNullList(a)) => is_covariant_output(parents, e, a),
        (List(e), List(a) | NonNullList(a)) => is_covariant_output(parents, e, a),
        _ => false,
    }
}

fn is_covariant_named(
    parents: &IndexMap<String, ParentDefinitionData>,
    expected: &str,
    actual: &str,
) -> bool {
    if expected == actual {
        return true;
    }
    match parents.get(expected) {
        Some(ParentDefinitionData::Interface(_)) => match parents.get(actual) {
            Some(ParentDefinitionData::Object(data) | ParentDefinitionData::Interface(data)) => {
                data.implements.contains(expected)
            }
            _ => false,
        },
        Some(ParentDefinitionData::Union(data)) => {
            data.members.contains(actual)
                && matches!(parents.get(actual), Some(ParentDefinitionData::Object(_)))
        }
        _ => false,
    }
}

/// Input permissiveness: the implemented argument type must accept every
/// value the interface argument accepts, so it may only loosen nullability.
fn input_type_accepts(wider: &ast::Type, narrower: &ast::Type) -> bool {
    use ast::Type::*;
    match (wider, narrower) {
        (Named(w), Named(n) | NonNullNamed(n)) => w == n,
        (NonNullNamed(w), NonNullNamed(n)) => w == n,
        (List(w), List(n) | NonNullList(n)) => input_type_accepts(w, n),
        (NonNullList(w), NonNullList(n)) => input_type_accepts(w, n),
        _ => false,
    }
}
