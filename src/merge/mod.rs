//! The federation pass: folds every normalized subgraph registry into one
//! merged registry, applying the per-kind merge algebra, then runs the
//! cross-subgraph validations (shareability, overrides, interface
//! conformance, enum/input algebra, entity interfaces, descriptions).

use apollo_compiler::ast;
use indexmap::{IndexMap, IndexSet};

use crate::definitions::{
    ArgumentData, CompositeTypeData, EnumTypeData, EnumValueData, FieldData, InputFieldData,
    InputObjectTypeData, NormalizedSubgraph, ParentDefinitionData, ScalarTypeData,
    SubgraphCompositeData, SubgraphDefinition, SubgraphEnumData, SubgraphFieldData,
    SubgraphInputObjectData, SubgraphInputValueData, SubgraphScalarData, SubgraphUnionData,
    TypeKind, UnionTypeData,
};
use crate::directives::ast_name;
use crate::error::CompositionError;
use crate::normalize::merge_scopes;

mod context;
mod description;
mod entity_interface;
mod inputs;
mod interface;
mod object;

pub(crate) use context::{FederationContext, OverrideRemoval};

pub(crate) fn merge_subgraphs(subgraphs: &[NormalizedSubgraph]) -> FederationContext {
    let mut ctx = FederationContext::new();
    ctx.subgraph_names = subgraphs.iter().map(|subgraph| subgraph.name.clone()).collect();

    // The federated schema always uses the conventional root type names;
    // custom-named subgraph roots are renamed on the way in.
    for subgraph in subgraphs {
        for kind in subgraph.operation_root_types.keys() {
            ctx.root_type_names
                .entry(*kind)
                .or_insert_with(|| kind.default_type_name().to_owned());
        }
    }

    for subgraph in subgraphs {
        tracing::debug!(subgraph = subgraph.name.as_str(), "merging subgraph registry");
        let renames = root_renames(subgraph);
        for (type_name, definition) in &subgraph.definitions {
            let federated_type_name = renames
                .get(type_name.as_str())
                .cloned()
                .unwrap_or_else(|| type_name.clone());
            upsert_definition(&mut ctx, subgraph, &federated_type_name, definition, &renames);
        }
        for (interface_name, data) in &subgraph.entity_interfaces {
            ctx.entity_interfaces
                .entry(interface_name.clone())
                .or_default()
                .insert(subgraph.name.clone(), data.clone());
        }
    }

    object::validate_overrides_and_shareability(&mut ctx);
    inputs::merge_field_arguments(&mut ctx);
    inputs::merge_input_objects(&mut ctx);
    inputs::merge_enums(&mut ctx);
    inputs::check_unions(&mut ctx);
    entity_interface::federate_entity_interfaces(&mut ctx);
    interface::validate_implementations(&mut ctx);
    description::resolve_descriptions(&mut ctx);

    ctx
}

fn root_renames(subgraph: &NormalizedSubgraph) -> IndexMap<String, String> {
    let mut renames = IndexMap::new();
    for (kind, root_type_name) in &subgraph.operation_root_types {
        let canonical = kind.default_type_name();
        if root_type_name != canonical {
            renames.insert(root_type_name.clone(), canonical.to_owned());
        }
    }
    renames
}

fn renamed(renames: &IndexMap<String, String>, name: &str) -> String {
    renames.get(name).cloned().unwrap_or_else(|| name.to_owned())
}

/// Rebuilds a type reference with root renames applied to the inner name.
fn rewrite_type(ty: &ast::Type, renames: &IndexMap<String, String>) -> ast::Type {
    if renames.is_empty() {
        return ty.clone();
    }
    match ty {
        ast::Type::Named(name) => ast::Type::Named(ast_name(&renamed(renames, name.as_str()))),
        ast::Type::NonNullNamed(name) => ast::Type::NonNullNamed(ast_name(&renamed(renames, name.as_str()))),
        ast::Type::List(inner) => ast::Type::List(Box::new(rewrite_type(inner, renames))),
        ast::Type::NonNullList(inner) => ast::Type::NonNullList(Box::new(rewrite_type(inner, renames))),
    }
}

/// Merges two compatible type references to the most restrictive form:
/// non-null wins over nullable at every wrapping level; named types and list
/// shapes must agree. Returns `None` when the types are incompatible.
pub(crate) fn merge_types(left: &ast::Type, right: &ast::Type) -> Option<ast::Type> {
    use ast::Type::*;
    match (left, right) {
        (Named(a), Named(b)) if a == b => Some(Named(a.clone())),
        (NonNullNamed(a), Named(b))
        | (Named(a), NonNullNamed(b))
        | (NonNullNamed(a), NonNullNamed(b))
            if a == b =>
        {
            Some(NonNullNamed(a.clone()))
        }
        (List(a), List(b)) => merge_types(a, b).map(|inner| List(Box::new(inner))),
        (NonNullList(a), List(b)) | (List(a), NonNullList(b)) | (NonNullList(a), NonNullList(b)) => {
            merge_types(a, b).map(|inner| NonNullList(Box::new(inner)))
        }
        _ => None,
    }
}

fn upsert_definition(
    ctx: &mut FederationContext,
    subgraph: &NormalizedSubgraph,
    federated_type_name: &str,
    definition: &SubgraphDefinition,
    renames: &IndexMap<String, String>,
) {
    // An @interfaceObject type is an object standing in for an interface
    // defined elsewhere; its contribution merges into the interface parent.
    let interface_object = matches!(definition, SubgraphDefinition::Object(_))
        && subgraph
            .entity_interfaces
            .get(federated_type_name)
            .is_some_and(|data| data.is_interface_object);

    let incoming_kind = if interface_object { TypeKind::Interface } else { definition.kind() };

    if let Some(existing) = ctx.parents.get(federated_type_name) {
        let existing_kind = existing.kind();
        if existing_kind != incoming_kind {
            ctx.errors.push(CompositionError::IncompatibleParentKind {
                type_name: federated_type_name.to_owned(),
                expected_kind: existing_kind,
                actual_kind: incoming_kind,
                subgraph_name: subgraph.name.clone(),
            });
            return;
        }
    }

    match definition {
        SubgraphDefinition::Object(data) | SubgraphDefinition::Interface(data) => {
            upsert_composite(ctx, subgraph, federated_type_name, data, incoming_kind, interface_object, renames)
        }
        SubgraphDefinition::Union(data) => upsert_union(ctx, subgraph, federated_type_name, data, renames),
        SubgraphDefinition::Enum(data) => upsert_enum(ctx, subgraph, federated_type_name, data),
        SubgraphDefinition::InputObject(data) => upsert_input_object(ctx, subgraph, federated_type_name, data),
        SubgraphDefinition::Scalar(data) => upsert_scalar(ctx, subgraph, federated_type_name, data),
    }
}

fn upsert_composite(
    ctx: &mut FederationContext,
    subgraph: &NormalizedSubgraph,
    federated_type_name: &str,
    data: &SubgraphCompositeData,
    kind: TypeKind,
    interface_object: bool,
    renames: &IndexMap<String, String>,
) {
    let is_root_type = ctx.is_root_type(federated_type_name);
    let parent = ctx.parents.entry(federated_type_name.to_owned()).or_insert_with(|| {
        let composite = CompositeTypeData {
            type_name: federated_type_name.to_owned(),
            kind,
            description_by_subgraph_name: IndexMap::new(),
            fields: IndexMap::new(),
            implements: IndexSet::new(),
            subgraph_names: IndexSet::new(),
            is_root_type,
            is_entity: false,
            is_inaccessible: false,
            tags: IndexSet::new(),
            keys_by_subgraph_name: IndexMap::new(),
            interface_object_subgraph_names: IndexSet::new(),
            requires_authentication: false,
            required_scopes: Vec::new(),
        };
        if kind == TypeKind::Interface {
            ParentDefinitionData::Interface(composite)
        } else {
            ParentDefinitionData::Object(composite)
        }
    });
    let (ParentDefinitionData::Object(merged) | ParentDefinitionData::Interface(merged)) = parent else {
        return;
    };

    merged.subgraph_names.insert(subgraph.name.clone());
    if !data.description.is_empty() {
        merged
            .description_by_subgraph_name
            .insert(subgraph.name.clone(), data.description.clone());
    }
    merged
        .implements
        .extend(data.implements.iter().map(|name| renamed(renames, name)));
    merged.is_entity |= data.is_entity;
    merged.is_inaccessible |= data.is_inaccessible;
    merged.tags.extend(data.tags.iter().cloned());
    if !data.keys.is_empty() {
        merged
            .keys_by_subgraph_name
            .insert(subgraph.name.clone(), data.keys.clone());
    }
    if interface_object {
        merged.interface_object_subgraph_names.insert(subgraph.name.clone());
    }
    merged.requires_authentication |= data.requires_authentication;
    merge_scopes(&mut merged.required_scopes, data.required_scopes.clone());

    // Key fields are implicitly shareable: declaring the same key in several
    // subgraphs is the point of an entity.
    let key_field_names = subgraph.key_field_names_by_type_name.get(&data.type_name);
    for field in data.fields.values() {
        let implicitly_shareable =
            key_field_names.is_some_and(|names| names.contains(&field.field_name));
        upsert_field(&mut ctx.errors, merged, &subgraph.name, field, implicitly_shareable, renames);
    }
}

fn upsert_field(
    errors: &mut Vec<CompositionError>,
    parent: &mut CompositeTypeData,
    subgraph_name: &str,
    field: &SubgraphFieldData,
    implicitly_shareable: bool,
    renames: &IndexMap<String, String>,
) {
    let federated_ty = rewrite_type(&field.ty, renames);
    let parent_type_name = parent.type_name.clone();
    let merged = parent.fields.entry(field.field_name.clone()).or_insert_with(|| FieldData {
        field_name: field.field_name.clone(),
        parent_type_name,
        ty: federated_ty.clone(),
        type_by_subgraph_name: IndexMap::new(),
        arguments: IndexMap::new(),
        is_shareable_by_subgraph_name: IndexMap::new(),
        is_external_by_subgraph_name: IndexMap::new(),
        override_from_by_subgraph_name: IndexMap::new(),
        provides_by_subgraph_name: IndexMap::new(),
        requires_by_subgraph_name: IndexMap::new(),
        description_by_subgraph_name: IndexMap::new(),
        subgraph_names: IndexSet::new(),
        is_inaccessible: false,
        tags: IndexSet::new(),
        requires_authentication: false,
        required_scopes: Vec::new(),
        deprecation: None,
    });

    match merge_types(&merged.ty, &federated_ty) {
        Some(ty) => merged.ty = ty,
        None => errors.push(CompositionError::IncompatibleFieldTypes {
            field_path: merged.path(),
            expected_type: merged.ty.to_string(),
            actual_type: federated_ty.to_string(),
        }),
    }

    merged.subgraph_names.insert(subgraph_name.to_owned());
    merged
        .type_by_subgraph_name
        .insert(subgraph_name.to_owned(), federated_ty);
    merged
        .is_shareable_by_subgraph_name
        .insert(subgraph_name.to_owned(), field.is_shareable || implicitly_shareable);
    merged
        .is_external_by_subgraph_name
        .insert(subgraph_name.to_owned(), field.is_external);
    if let Some(from) = &field.override_from {
        merged
            .override_from_by_subgraph_name
            .insert(subgraph_name.to_owned(), from.clone());
    }
    if let Some(provides) = &field.provides {
        merged
            .provides_by_subgraph_name
            .insert(subgraph_name.to_owned(), provides.clone());
    }
    if let Some(requires) = &field.requires {
        merged
            .requires_by_subgraph_name
            .insert(subgraph_name.to_owned(), requires.clone());
    }
    if !field.description.is_empty() {
        merged
            .description_by_subgraph_name
            .insert(subgraph_name.to_owned(), field.description.clone());
    }
    merged.is_inaccessible |= field.is_inaccessible;
    merged.tags.extend(field.tags.iter().cloned());
    merged.requires_authentication |= field.requires_authentication;
    merge_scopes(&mut merged.required_scopes, field.required_scopes.clone());
    if merged.deprecation.is_none() {
        merged.deprecation = field.deprecation.clone();
    }

    for argument in field.arguments.values() {
        upsert_argument(errors, merged, subgraph_name, argument, renames);
    }
}

fn upsert_argument(
    errors: &mut Vec<CompositionError>,
    field: &mut FieldData,
    subgraph_name: &str,
    argument: &SubgraphInputValueData,
    renames: &IndexMap<String, String>,
) {
    let federated_ty = rewrite_type(&argument.ty, renames);
    let field_path = field.path();
    let merged = field.arguments.entry(argument.name.clone()).or_insert_with(|| ArgumentData {
        argument_name: argument.name.clone(),
        ty: federated_ty.clone(),
        type_by_subgraph_name: IndexMap::new(),
        default_value: None,
        default_value_by_subgraph_name: IndexMap::new(),
        description_by_subgraph_name: IndexMap::new(),
        subgraph_names: IndexSet::new(),
        is_inaccessible: false,
        tags: IndexSet::new(),
        deprecation: None,
    });

    match merge_types(&merged.ty, &federated_ty) {
        Some(ty) => merged.ty = ty,
        None => errors.push(CompositionError::IncompatibleArgumentTypes {
            argument_name: argument.name.clone(),
            host_path: field_path,
            expected_type: merged.ty.to_string(),
            actual_type: federated_ty.to_string(),
        }),
    }

    merged.subgraph_names.insert(subgraph_name.to_owned());
    merged
        .type_by_subgraph_name
        .insert(subgraph_name.to_owned(), federated_ty);
    merged
        .default_value_by_subgraph_name
        .insert(subgraph_name.to_owned(), argument.default_value.clone());
    if !argument.description.is_empty() {
        merged
            .description_by_subgraph_name
            .insert(subgraph_name.to_owned(), argument.description.clone());
    }
    merged.is_inaccessible |= argument.is_inaccessible;
    merged.tags.extend(argument.tags.iter().cloned());
    if merged.deprecation.is_none() {
        merged.deprecation = argument.deprecation.clone();
    }
}

fn upsert_union(
    ctx: &mut FederationContext,
    subgraph: &NormalizedSubgraph,
    federated_type_name: &str,
    data: &SubgraphUnionData,
    renames: &IndexMap<String, String>,
) {
    let parent = ctx.parents.entry(federated_type_name.to_owned()).or_insert_with(|| {
        ParentDefinitionData::Union(UnionTypeData {
            type_name: federated_type_name.to_owned(),
            description_by_subgraph_name: IndexMap::new(),
            members: IndexSet::new(),
            members_by_subgraph_name: IndexMap::new(),
            subgraph_names: IndexSet::new(),
            is_inaccessible: false,
            tags: IndexSet::new(),
        })
    });
    let ParentDefinitionData::Union(merged) = parent else { return };
    merged.subgraph_names.insert(subgraph.name.clone());
    if !data.description.is_empty() {
        merged
            .description_by_subgraph_name
            .insert(subgraph.name.clone(), data.description.clone());
    }
    let members: IndexSet<String> = data.members.iter().map(|name| renamed(renames, name)).collect();
    merged.members.extend(members.iter().cloned());
    merged.members_by_subgraph_name.insert(subgraph.name.clone(), members);
    merged.is_inaccessible |= data.is_inaccessible;
    merged.tags.extend(data.tags.iter().cloned());
}

fn upsert_enum(
    ctx: &mut FederationContext,
    subgraph: &NormalizedSubgraph,
    federated_type_name: &str,
    data: &SubgraphEnumData,
) {
    let parent = ctx.parents.entry(federated_type_name.to_owned()).or_insert_with(|| {
        ParentDefinitionData::Enum(EnumTypeData {
            type_name: federated_type_name.to_owned(),
            description_by_subgraph_name: IndexMap::new(),
            values: IndexMap::new(),
            subgraph_names: IndexSet::new(),
            is_inaccessible: false,
            tags: IndexSet::new(),
        })
    });
    let ParentDefinitionData::Enum(merged) = parent else { return };
    merged.subgraph_names.insert(subgraph.name.clone());
    if !data.description.is_empty() {
        merged
            .description_by_subgraph_name
            .insert(subgraph.name.clone(), data.description.clone());
    }
    merged.is_inaccessible |= data.is_inaccessible;
    merged.tags.extend(data.tags.iter().cloned());
    for value in data.values.values() {
        let merged_value = merged.values.entry(value.value_name.clone()).or_insert_with(|| EnumValueData {
            value_name: value.value_name.clone(),
            description_by_subgraph_name: IndexMap::new(),
            subgraph_names: IndexSet::new(),
            is_inaccessible: false,
            tags: IndexSet::new(),
            deprecation: None,
        });
        merged_value.subgraph_names.insert(subgraph.name.clone());
        if !value.description.is_empty() {
            merged_value
                .description_by_subgraph_name
                .insert(subgraph.name.clone(), value.description.clone());
        }
        merged_value.is_inaccessible |= value.is_inaccessible;
        merged_value.tags.extend(value.tags.iter().cloned());
        if merged_value.deprecation.is_none() {
            merged_value.deprecation = value.deprecation.clone();
        }
    }
}

fn upsert_input_object(
    ctx: &mut FederationContext,
    subgraph: &NormalizedSubgraph,
    federated_type_name: &str,
    data: &SubgraphInputObjectData,
) {
    let parent = ctx.parents.entry(federated_type_name.to_owned()).or_insert_with(|| {
        ParentDefinitionData::InputObject(InputObjectTypeData {
            type_name: federated_type_name.to_owned(),
            description_by_subgraph_name: IndexMap::new(),
            fields: IndexMap::new(),
            subgraph_names: IndexSet::new(),
            is_inaccessible: false,
            tags: IndexSet::new(),
        })
    });
    let ParentDefinitionData::InputObject(merged) = parent else { return };
    merged.subgraph_names.insert(subgraph.name.clone());
    if !data.description.is_empty() {
        merged
            .description_by_subgraph_name
            .insert(subgraph.name.clone(), data.description.clone());
    }
    merged.is_inaccessible |= data.is_inaccessible;
    merged.tags.extend(data.tags.iter().cloned());
    for field in data.fields.values() {
        let field_path = format!("{federated_type_name}.{}", field.name);
        let merged_field = merged.fields.entry(field.name.clone()).or_insert_with(|| InputFieldData {
            field_name: field.name.clone(),
            parent_type_name: federated_type_name.to_owned(),
            ty: field.ty.clone(),
            type_by_subgraph_name: IndexMap::new(),
            default_value: None,
            default_value_by_subgraph_name: IndexMap::new(),
            description_by_subgraph_name: IndexMap::new(),
            subgraph_names: IndexSet::new(),
            required_in_subgraph_names: IndexSet::new(),
            is_inaccessible: false,
            tags: IndexSet::new(),
            deprecation: None,
        });
        match merge_types(&merged_field.ty, &field.ty) {
            Some(ty) => merged_field.ty = ty,
            None => ctx.errors.push(CompositionError::IncompatibleFieldTypes {
                field_path,
                expected_type: merged_field.ty.to_string(),
                actual_type: field.ty.to_string(),
            }),
        }
        merged_field.subgraph_names.insert(subgraph.name.clone());
        merged_field
            .type_by_subgraph_name
            .insert(subgraph.name.clone(), field.ty.clone());
        merged_field
            .default_value_by_subgraph_name
            .insert(subgraph.name.clone(), field.default_value.clone());
        if field.is_required() {
            merged_field.required_in_subgraph_names.insert(subgraph.name.clone());
        }
        if !field.description.is_empty() {
            merged_field
                .description_by_subgraph_name
                .insert(subgraph.name.clone(), field.description.clone());
        }
        merged_field.is_inaccessible |= field.is_inaccessible;
        merged_field.tags.extend(field.tags.iter().cloned());
        if merged_field.deprecation.is_none() {
            merged_field.deprecation = field.deprecation.clone();
        }
    }
}

fn upsert_scalar(
    ctx: &mut FederationContext,
    subgraph: &NormalizedSubgraph,
    federated_type_name: &str,
    data: &SubgraphScalarData,
) {
    let parent = ctx.parents.entry(federated_type_name.to_owned()).or_insert_with(|| {
        ParentDefinitionData::Scalar(ScalarTypeData {
            type_name: federated_type_name.to_owned(),
            description_by_subgraph_name: IndexMap::new(),
            subgraph_names: IndexSet::new(),
            is_inaccessible: false,
            tags: IndexSet::new(),
            specified_by_url: None,
        })
    });
    let ParentDefinitionData::Scalar(merged) = parent else { return };
    merged.subgraph_names.insert(subgraph.name.clone());
    if !data.description.is_empty() {
        merged
            .description_by_subgraph_name
            .insert(subgraph.name.clone(), data.description.clone());
    }
    merged.is_inaccessible |= data.is_inaccessible;
    merged.tags.extend(data.tags.iter().cloned());
    if merged.specified_by_url.is_none() {
        merged.specified_by_url = data.specified_by_url.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> ast::Type {
        ast::Type::Named(ast_name(name))
    }

    fn non_null(name: &str) -> ast::Type {
        ast::Type::NonNullNamed(ast_name(name))
    }

    #[test]
    fn non_null_wins_over_nullable() {
        let merged = merge_types(&named("Float"), &non_null("Float")).unwrap();
        assert_eq!(merged, non_null("Float"));
    }

    #[test]
    fn incompatible_named_types_do_not_merge() {
        assert!(merge_types(&named("String"), &named("Int")).is_none());
    }

    #[test]
    fn list_shapes_must_agree() {
        let list_of_int = ast::Type::List(Box::new(named("Int")));
        assert!(merge_types(&list_of_int, &named("Int")).is_none());
        let non_null_list = ast::Type::NonNullList(Box::new(non_null("Int")));
        let merged = merge_types(&list_of_int, &non_null_list).unwrap();
        assert_eq!(merged, ast::Type::NonNullList(Box::new(non_null("Int"))));
    }
}
