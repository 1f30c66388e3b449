//! Entity interfaces and `@interfaceObject`: a type declared
//! `@interfaceObject` in one subgraph stands in for an interface defined
//! elsewhere, and its fields are contributed to every concrete implementing
//! type system-wide. The concrete implementer sets declared across the
//! interface-defining subgraphs must agree.

use indexmap::IndexSet;

use crate::definitions::{FieldData, ParentDefinitionData};
use crate::error::CompositionError;
use crate::normalize::merge_scopes;

use super::context::FederationContext;

pub(super) fn federate_entity_interfaces(ctx: &mut FederationContext) {
    let interface_names: Vec<String> = ctx.entity_interfaces.keys().cloned().collect();
    let mut errors = Vec::new();

    for interface_name in interface_names {
        let by_subgraph = ctx.entity_interfaces.get(&interface_name).cloned().unwrap_or_default();

        // The union of concrete implementers across the subgraphs that
        // define the actual interface.
        let mut all_concrete: IndexSet<String> = IndexSet::new();
        for data in by_subgraph.values() {
            if !data.is_interface_object {
                all_concrete.extend(data.concrete_type_names.iter().cloned());
            }
        }

        let mut missing_by_subgraph: Vec<(String, Vec<String>)> = Vec::new();
        for (subgraph_name, data) in &by_subgraph {
            if data.is_interface_object {
                continue;
            }
            let missing: Vec<String> = all_concrete
                .iter()
                .filter(|concrete| !data.concrete_type_names.contains(*concrete))
                .cloned()
                .collect();
            if !missing.is_empty() {
                missing_by_subgraph.push((subgraph_name.clone(), missing));
            }
        }
        if !missing_by_subgraph.is_empty() {
            errors.push(CompositionError::UndefinedEntityInterfaceImplementations {
                interface_name: interface_name.clone(),
                missing_by_subgraph,
            });
            continue;
        }

        contribute_interface_fields(ctx, &interface_name, &all_concrete);
    }

    ctx.errors.extend(errors);
}

/// Copies the merged entity-interface fields onto every concrete implementer
/// that does not define them itself, propagates the interface's
/// authorization data, and inherits the `@interfaceObject` subgraphs' keys
/// so the concrete types stay reachable through them.
fn contribute_interface_fields(
    ctx: &mut FederationContext,
    interface_name: &str,
    concrete_type_names: &IndexSet<String>,
) {
    let Some(ParentDefinitionData::Interface(interface_data)) = ctx.parents.get(interface_name) else {
        return;
    };
    let interface_fields: Vec<FieldData> = interface_data.fields.values().cloned().collect();
    let interface_requires_authentication = interface_data.requires_authentication;
    let interface_scopes = interface_data.required_scopes.clone();
    let interface_object_keys: Vec<_> = interface_data
        .interface_object_subgraph_names
        .iter()
        .filter_map(|subgraph_name| {
            interface_data
                .keys_by_subgraph_name
                .get(subgraph_name)
                .map(|keys| (subgraph_name.clone(), keys.clone()))
        })
        .collect();

    for concrete_type_name in concrete_type_names {
        let Some(ParentDefinitionData::Object(concrete)) = ctx.parents.get_mut(concrete_type_name) else {
            continue;
        };
        concrete.requires_authentication |= interface_requires_authentication;
        merge_scopes(&mut concrete.required_scopes, interface_scopes.clone());
        // A concrete type can be entered through the interface object's
        // keys even though the stand-in subgraph never declares it.
        for (subgraph_name, keys) in &interface_object_keys {
            concrete.subgraph_names.insert(subgraph_name.clone());
            concrete
                .keys_by_subgraph_name
                .entry(subgraph_name.clone())
                .or_insert_with(|| keys.clone());
        }
        for interface_field in &interface_fields {
            match concrete.fields.get_mut(&interface_field.field_name) {
                Some(existing) => {
                    existing.requires_authentication |= interface_field.requires_authentication;
                    merge_scopes(&mut existing.required_scopes, interface_field.required_scopes.clone());
                }
                None => {
                    let mut contributed = interface_field.clone();
                    contributed.parent_type_name = concrete_type_name.clone();
                    concrete.fields.insert(contributed.field_name.clone(), contributed);
                }
            }
        }
    }
}
