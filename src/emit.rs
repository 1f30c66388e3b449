//! Assembly of the composition artifacts: the router-facing federated
//! schema, the client schema (inaccessible elements removed, federation
//! directives stripped), the per-subgraph router configuration, and the
//! flat field/argument configuration lists.
//!
//! Emission order is canonical, not input order: directive definitions,
//! then the schema definition, then types sorted by name with fields, enum
//! values, union members and arguments sorted by name. This is what makes
//! composing `[A, B]` and `[B, A]` byte-identical for valid inputs.

use apollo_compiler::ast;
use apollo_compiler::schema::Name;
use apollo_compiler::Node;
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;

use crate::definitions::{
    ArgumentConfiguration, ArgumentData, CompositeTypeData, ConfigurationData, Deprecation,
    FieldConfiguration, FieldData, InputFieldData, NormalizedSubgraph, ParentDefinitionData,
    SubgraphConfiguration,
};
use crate::directives::{ast_name, DirectiveLocationKind, DIRECTIVE_SPECS_BY_NAME};
use crate::directives::{
    AUTHENTICATED, DEPRECATED, FIELD_SET_SCALAR, INACCESSIBLE, KEY, REQUIRES_SCOPES, SCOPE_SCALAR,
    SPECIFIED_BY, TAG,
};
use crate::merge::FederationContext;
use crate::normalize::merge_scopes;
use crate::result::FederationResult;

/// Which of the two output schemas is being rendered.
#[derive(Clone, Copy, PartialEq, Eq)]
enum SchemaAudience {
    Router,
    Client,
}

pub(crate) fn emit_federation_result(
    ctx: &FederationContext,
    subgraphs: &[NormalizedSubgraph],
) -> FederationResult {
    tracing::debug!("emitting federated schema and router configuration");
    let federated_schema = render_schema(ctx, SchemaAudience::Router);
    let client_schema = render_schema(ctx, SchemaAudience::Client);
    let subgraph_configurations_by_name = build_subgraph_configurations(ctx, subgraphs);
    let (field_configurations, argument_configurations) = build_field_configurations(ctx);

    FederationResult {
        federated_schema,
        client_schema,
        subgraph_configurations_by_name,
        field_configurations,
        argument_configurations,
    }
}

fn render_schema(ctx: &FederationContext, audience: SchemaAudience) -> String {
    let mut document = ast::Document::new();

    if audience == SchemaAudience::Router {
        for definition in federation_baseline_definitions() {
            document.definitions.push(definition);
        }
    }

    if !ctx.root_type_names.is_empty() {
        // Fixed query/mutation/subscription order, independent of which
        // subgraph introduced each root.
        let mut root_operations = Vec::new();
        for (kind, operation_type) in [
            (crate::definitions::OperationKind::Query, ast::OperationType::Query),
            (crate::definitions::OperationKind::Mutation, ast::OperationType::Mutation),
            (crate::definitions::OperationKind::Subscription, ast::OperationType::Subscription),
        ] {
            if let Some(type_name) = ctx.root_type_names.get(&kind) {
                root_operations.push(Node::new((operation_type, ast_name(type_name))));
            }
        }
        document
            .definitions
            .push(ast::Definition::SchemaDefinition(Node::new(ast::SchemaDefinition {
                description: None,
                directives: ast::DirectiveList::default(),
                root_operations,
            })));
    }

    let type_names: Vec<&String> = ctx.parents.keys().sorted().collect();
    for type_name in type_names {
        let parent = &ctx.parents[type_name.as_str()];
        if audience == SchemaAudience::Client && client_hides_type(parent) {
            continue;
        }
        if let Some(definition) = render_type(ctx, parent, audience) {
            document.definitions.push(definition);
        }
    }

    document.to_string()
}

/// A type disappears from the client schema when it is inaccessible itself
/// or when every one of its fields is.
fn client_hides_type(parent: &ParentDefinitionData) -> bool {
    if parent.is_inaccessible() {
        return true;
    }
    match parent {
        ParentDefinitionData::Object(data) | ParentDefinitionData::Interface(data) => {
            !data.fields.is_empty() && data.fields.values().all(|field| field.is_inaccessible)
        }
        ParentDefinitionData::Enum(data) => data.values.values().all(|value| value.is_inaccessible),
        _ => false,
    }
}

fn render_type(
    ctx: &FederationContext,
    parent: &ParentDefinitionData,
    audience: SchemaAudience,
) -> Option<ast::Definition> {
    let type_name = parent.type_name();
    let description = description_node(ctx, type_name);
    Some(match parent {
        ParentDefinitionData::Object(data) => {
            ast::Definition::ObjectTypeDefinition(Node::new(ast::ObjectTypeDefinition {
                description,
                name: ast_name(type_name),
                implements_interfaces: sorted_names(&data.implements),
                directives: composite_directives(data, audience),
                fields: render_fields(ctx, data, audience),
            }))
        }
        ParentDefinitionData::Interface(data) => {
            ast::Definition::InterfaceTypeDefinition(Node::new(ast::InterfaceTypeDefinition {
                description,
                name: ast_name(type_name),
                implements_interfaces: sorted_names(&data.implements),
                directives: composite_directives(data, audience),
                fields: render_fields(ctx, data, audience),
            }))
        }
        ParentDefinitionData::Union(data) => {
            let mut directives = Vec::new();
            push_common_directives(&mut directives, data.is_inaccessible, &data.tags, audience);
            ast::Definition::UnionTypeDefinition(Node::new(ast::UnionTypeDefinition {
                description,
                name: ast_name(type_name),
                directives: ast::DirectiveList(directives),
                members: data.members.iter().sorted().map(|member| ast_name(member)).collect(),
            }))
        }
        ParentDefinitionData::Enum(data) => {
            let mut directives = Vec::new();
            push_common_directives(&mut directives, data.is_inaccessible, &data.tags, audience);
            let values = data
                .values
                .values()
                .filter(|value| audience == SchemaAudience::Router || !value.is_inaccessible)
                .sorted_by(|a, b| a.value_name.cmp(&b.value_name))
                .map(|value| {
                    let mut value_directives = Vec::new();
                    push_common_directives(&mut value_directives, value.is_inaccessible, &value.tags, audience);
                    push_deprecated(&mut value_directives, &value.deprecation);
                    Node::new(ast::EnumValueDefinition {
                        description: description_node(ctx, &format!("{type_name}.{}", value.value_name)),
                        value: ast_name(&value.value_name),
                        directives: ast::DirectiveList(value_directives),
                    })
                })
                .collect();
            ast::Definition::EnumTypeDefinition(Node::new(ast::EnumTypeDefinition {
                description,
                name: ast_name(type_name),
                directives: ast::DirectiveList(directives),
                values,
            }))
        }
        ParentDefinitionData::InputObject(data) => {
            let mut directives = Vec::new();
            push_common_directives(&mut directives, data.is_inaccessible, &data.tags, audience);
            let fields = data
                .fields
                .values()
                .filter(|field| audience == SchemaAudience::Router || !field.is_inaccessible)
                .sorted_by(|a, b| a.field_name.cmp(&b.field_name))
                .map(|field| render_input_field(ctx, type_name, field, audience))
                .collect();
            ast::Definition::InputObjectTypeDefinition(Node::new(ast::InputObjectTypeDefinition {
                description,
                name: ast_name(type_name),
                directives: ast::DirectiveList(directives),
                fields,
            }))
        }
        ParentDefinitionData::Scalar(data) => {
            let mut directives = Vec::new();
            push_common_directives(&mut directives, data.is_inaccessible, &data.tags, audience);
            if let Some(url) = &data.specified_by_url {
                directives.push(directive(SPECIFIED_BY, vec![("url", string_value(url))]));
            }
            ast::Definition::ScalarTypeDefinition(Node::new(ast::ScalarTypeDefinition {
                description,
                name: ast_name(type_name),
                directives: ast::DirectiveList(directives),
            }))
        }
    })
}

fn render_fields(
    ctx: &FederationContext,
    data: &CompositeTypeData,
    audience: SchemaAudience,
) -> Vec<Node<ast::FieldDefinition>> {
    data.fields
        .values()
        .filter(|field| audience == SchemaAudience::Router || !field.is_inaccessible)
        .sorted_by(|a, b| a.field_name.cmp(&b.field_name))
        .map(|field| {
            let mut directives = Vec::new();
            push_common_directives(&mut directives, field.is_inaccessible, &field.tags, audience);
            push_deprecated(&mut directives, &field.deprecation);
            if audience == SchemaAudience::Router {
                push_authorization_directives(
                    &mut directives,
                    field.requires_authentication,
                    &field.required_scopes,
                );
            }
            Node::new(ast::FieldDefinition {
                description: description_node(ctx, &field.path()),
                name: ast_name(&field.field_name),
                arguments: render_arguments(ctx, field, audience),
                ty: field.ty.clone(),
                directives: ast::DirectiveList(directives),
            })
        })
        .collect()
}

fn render_arguments(
    ctx: &FederationContext,
    field: &FieldData,
    audience: SchemaAudience,
) -> Vec<Node<ast::InputValueDefinition>> {
    field
        .arguments
        .values()
        .filter(|argument| audience == SchemaAudience::Router || !argument.is_inaccessible)
        .sorted_by(|a, b| a.argument_name.cmp(&b.argument_name))
        .map(|argument| render_argument(ctx, field, argument, audience))
        .collect()
}

fn render_argument(
    ctx: &FederationContext,
    field: &FieldData,
    argument: &ArgumentData,
    audience: SchemaAudience,
) -> Node<ast::InputValueDefinition> {
    let mut directives = Vec::new();
    push_common_directives(&mut directives, argument.is_inaccessible, &argument.tags, audience);
    push_deprecated(&mut directives, &argument.deprecation);
    Node::new(ast::InputValueDefinition {
        description: description_node(ctx, &format!("{}({}:)", field.path(), argument.argument_name)),
        name: ast_name(&argument.argument_name),
        ty: Node::new(argument.ty.clone()),
        default_value: argument.default_value.clone().map(Node::new),
        directives: ast::DirectiveList(directives),
    })
}

fn render_input_field(
    ctx: &FederationContext,
    type_name: &str,
    field: &InputFieldData,
    audience: SchemaAudience,
) -> Node<ast::InputValueDefinition> {
    let mut directives = Vec::new();
    push_common_directives(&mut directives, field.is_inaccessible, &field.tags, audience);
    push_deprecated(&mut directives, &field.deprecation);
    Node::new(ast::InputValueDefinition {
        description: description_node(ctx, &format!("{type_name}.{}", field.field_name)),
        name: ast_name(&field.field_name),
        ty: Node::new(field.ty.clone()),
        default_value: field.default_value.clone().map(Node::new),
        directives: ast::DirectiveList(directives),
    })
}

/// Type-level directives on objects and interfaces: entity keys plus the
/// common accessibility/tag/authorization set.
fn composite_directives(data: &CompositeTypeData, audience: SchemaAudience) -> ast::DirectiveList {
    let mut directives = Vec::new();
    if audience == SchemaAudience::Router {
        let mut canonical_keys: IndexMap<&str, bool> = IndexMap::new();
        for keys in data.keys_by_subgraph_name.values() {
            for key in keys {
                *canonical_keys.entry(key.canonical.as_str()).or_insert(false) |= key.resolvable;
            }
        }
        for (canonical, resolvable) in canonical_keys.iter().sorted() {
            let mut arguments = vec![("fields", string_value(canonical))];
            if !*resolvable {
                arguments.push(("resolvable", ast::Value::Boolean(false)));
            }
            directives.push(directive(KEY, arguments));
        }
    }
    push_common_directives(&mut directives, data.is_inaccessible, &data.tags, audience);
    if audience == SchemaAudience::Router {
        push_authorization_directives(&mut directives, data.requires_authentication, &data.required_scopes);
    }
    ast::DirectiveList(directives)
}

fn push_common_directives(
    directives: &mut Vec<Node<ast::Directive>>,
    is_inaccessible: bool,
    tags: &IndexSet<String>,
    audience: SchemaAudience,
) {
    if audience != SchemaAudience::Router {
        return;
    }
    if is_inaccessible {
        directives.push(directive(INACCESSIBLE, vec![]));
    }
    for tag in tags.iter().sorted() {
        directives.push(directive(TAG, vec![("name", string_value(tag))]));
    }
}

fn push_authorization_directives(
    directives: &mut Vec<Node<ast::Directive>>,
    requires_authentication: bool,
    required_scopes: &[Vec<String>],
) {
    if requires_authentication {
        directives.push(directive(AUTHENTICATED, vec![]));
    }
    if !required_scopes.is_empty() {
        // OR branches render in sorted order so the schema text does not
        // depend on which subgraph contributed which branch.
        let or_scopes = required_scopes
            .iter()
            .sorted()
            .map(|and_scopes| {
                Node::new(ast::Value::List(
                    and_scopes.iter().map(|scope| Node::new(string_value(scope))).collect(),
                ))
            })
            .collect();
        directives.push(directive(REQUIRES_SCOPES, vec![("scopes", ast::Value::List(or_scopes))]));
    }
}

/// `@deprecated` survives into both output schemas.
fn push_deprecated(directives: &mut Vec<Node<ast::Directive>>, deprecation: &Option<Deprecation>) {
    if let Some(deprecation) = deprecation {
        let arguments = match &deprecation.reason {
            Some(reason) => vec![("reason", string_value(reason))],
            None => vec![],
        };
        directives.push(directive(DEPRECATED, arguments));
    }
}

fn description_node(ctx: &FederationContext, path: &str) -> Option<apollo_compiler::NodeStr> {
    ctx.descriptions_by_path.get(path).map(|text| text.as_str().into())
}

fn sorted_names(names: &IndexSet<String>) -> Vec<Name> {
    names.iter().sorted().map(|name| ast_name(name)).collect()
}

fn string_value(text: &str) -> ast::Value {
    ast::Value::String(text.into())
}

fn directive(name: &str, arguments: Vec<(&str, ast::Value)>) -> Node<ast::Directive> {
    Node::new(ast::Directive {
        name: ast_name(name),
        arguments: arguments
            .into_iter()
            .map(|(argument_name, value)| {
                Node::new(ast::Argument {
                    name: ast_name(argument_name),
                    value: Node::new(value),
                })
            })
            .collect(),
    })
}

fn ast_location(location: DirectiveLocationKind) -> ast::DirectiveLocation {
    use ast::DirectiveLocation;
    match location {
        DirectiveLocationKind::Schema => DirectiveLocation::Schema,
        DirectiveLocationKind::Scalar => DirectiveLocation::Scalar,
        DirectiveLocationKind::Object => DirectiveLocation::Object,
        DirectiveLocationKind::FieldDefinition => DirectiveLocation::FieldDefinition,
        DirectiveLocationKind::ArgumentDefinition => DirectiveLocation::ArgumentDefinition,
        DirectiveLocationKind::Interface => DirectiveLocation::Interface,
        DirectiveLocationKind::Union => DirectiveLocation::Union,
        DirectiveLocationKind::Enum => DirectiveLocation::Enum,
        DirectiveLocationKind::EnumValue => DirectiveLocation::EnumValue,
        DirectiveLocationKind::InputObject => DirectiveLocation::InputObject,
        DirectiveLocationKind::InputFieldDefinition => DirectiveLocation::InputFieldDefinition,
    }
}

/// The federation directive definitions and scalars the router schema
/// carries so it parses standalone.
fn federation_baseline_definitions() -> Vec<ast::Definition> {
    let mut definitions = Vec::new();

    let retained = [AUTHENTICATED, INACCESSIBLE, KEY, REQUIRES_SCOPES, TAG];
    for directive_name in retained {
        let spec = DIRECTIVE_SPECS_BY_NAME[directive_name];
        let arguments = match directive_name {
            KEY => vec![
                Node::new(ast::InputValueDefinition {
                    description: None,
                    name: ast_name("fields"),
                    ty: Node::new(ast::Type::NonNullNamed(ast_name(FIELD_SET_SCALAR))),
                    default_value: None,
                    directives: ast::DirectiveList::default(),
                }),
                Node::new(ast::InputValueDefinition {
                    description: None,
                    name: ast_name("resolvable"),
                    ty: Node::new(ast::Type::Named(ast_name("Boolean"))),
                    default_value: Some(Node::new(ast::Value::Boolean(true))),
                    directives: ast::DirectiveList::default(),
                }),
            ],
            REQUIRES_SCOPES => vec![Node::new(ast::InputValueDefinition {
                description: None,
                name: ast_name("scopes"),
                ty: Node::new(ast::Type::NonNullList(Box::new(ast::Type::NonNullList(Box::new(
                    ast::Type::NonNullNamed(ast_name(SCOPE_SCALAR)),
                ))))),
                default_value: None,
                directives: ast::DirectiveList::default(),
            })],
            TAG => vec![Node::new(ast::InputValueDefinition {
                description: None,
                name: ast_name("name"),
                ty: Node::new(ast::Type::NonNullNamed(ast_name("String"))),
                default_value: None,
                directives: ast::DirectiveList::default(),
            })],
            _ => vec![],
        };
        definitions.push(ast::Definition::DirectiveDefinition(Node::new(ast::DirectiveDefinition {
            description: None,
            name: ast_name(directive_name),
            arguments,
            repeatable: spec.repeatable,
            locations: spec.locations.iter().map(|location| ast_location(*location)).collect(),
        })));
    }

    for scalar_name in [FIELD_SET_SCALAR, SCOPE_SCALAR] {
        definitions.push(ast::Definition::ScalarTypeDefinition(Node::new(ast::ScalarTypeDefinition {
            description: None,
            name: ast_name(scalar_name),
            directives: ast::DirectiveList::default(),
        })));
    }

    definitions
}

// ---------------------------------------------------------------------------
// Router configuration assembly
// ---------------------------------------------------------------------------

fn build_subgraph_configurations(
    ctx: &FederationContext,
    subgraphs: &[NormalizedSubgraph],
) -> IndexMap<String, SubgraphConfiguration> {
    let mut configurations = IndexMap::new();
    for subgraph in subgraphs {
        let renames: IndexMap<String, String> = subgraph
            .operation_root_types
            .iter()
            .filter(|(kind, type_name)| type_name.as_str() != kind.default_type_name())
            .map(|(kind, type_name)| (type_name.clone(), kind.default_type_name().to_owned()))
            .collect();

        let mut configuration_data_by_type_name: IndexMap<String, ConfigurationData> = IndexMap::new();
        for (type_name, configuration) in &subgraph.configuration_data_by_type_name {
            let federated_type_name = renames.get(type_name).cloned().unwrap_or_else(|| type_name.clone());
            let mut configuration = configuration.clone();
            configuration.type_name = federated_type_name.clone();
            configuration_data_by_type_name.insert(federated_type_name, configuration);
        }

        // Fields overridden by another subgraph are no longer resolved here;
        // key fields stay addressable.
        for removal in &ctx.override_removals {
            if removal.subgraph_name != subgraph.name {
                continue;
            }
            let original_type_name = renames
                .iter()
                .find(|(_, federated)| **federated == removal.type_name)
                .map(|(original, _)| original.as_str())
                .unwrap_or(removal.type_name.as_str());
            let is_key_field = subgraph
                .key_field_names_by_type_name
                .get(original_type_name)
                .is_some_and(|names| names.contains(&removal.field_name));
            if is_key_field {
                continue;
            }
            if let Some(configuration) = configuration_data_by_type_name.get_mut(&removal.type_name) {
                configuration.field_names.shift_remove(&removal.field_name);
            }
        }

        configurations.insert(
            subgraph.name.clone(),
            SubgraphConfiguration {
                subgraph_name: subgraph.name.clone(),
                routing_url: subgraph.url.clone(),
                configuration_data_by_type_name,
            },
        );
    }
    configurations
}

fn build_field_configurations(
    ctx: &FederationContext,
) -> (Vec<FieldConfiguration>, Vec<ArgumentConfiguration>) {
    let mut field_configurations = Vec::new();
    let mut argument_configurations = Vec::new();

    for type_name in ctx.parents.keys().sorted() {
        let parent = &ctx.parents[type_name.as_str()];
        let (ParentDefinitionData::Object(data) | ParentDefinitionData::Interface(data)) = parent else {
            continue;
        };
        for field in data.fields.values().sorted_by(|a, b| a.field_name.cmp(&b.field_name)) {
            let argument_names: Vec<String> = field.arguments.keys().sorted().cloned().collect();
            let requires_authentication = field.requires_authentication || data.requires_authentication;
            let mut required_scopes = field.required_scopes.clone();
            merge_scopes(&mut required_scopes, data.required_scopes.clone());

            if !argument_names.is_empty() {
                argument_configurations.push(ArgumentConfiguration {
                    type_name: type_name.clone(),
                    field_name: field.field_name.clone(),
                    argument_names: argument_names.clone(),
                });
            }
            if !argument_names.is_empty() || requires_authentication || !required_scopes.is_empty() {
                field_configurations.push(FieldConfiguration {
                    type_name: type_name.clone(),
                    field_name: field.field_name.clone(),
                    argument_names,
                    requires_authentication,
                    required_scopes,
                });
            }
        }
    }

    (field_configurations, argument_configurations)
}
